//! Shopper session: picks the cart repository and handles login/logout.
//!
//! The repository is chosen once when the session starts or changes
//! authentication; the [`CartFacade`] it builds is what callers use.

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use tracing::instrument;

use crate::api::{BackendClient, CartApi, CatalogCache};
use crate::cart::{
    CartFacade, CartMode, CartReconciler, LocalCartStore, MergeReport, RemoteCartStore,
};
use crate::compare::CompareList;
use crate::config::StorefrontConfig;
use crate::error::{CartError, add_breadcrumb};
use crate::storage::{self, KeyValueStorage, StorageError, keys};

const MERGE_FAILED: &str = "Failed to sync guest cart items";

/// One shopper's session.
pub struct ShopSession {
    client: BackendClient,
    storage: Arc<dyn KeyValueStorage>,
    catalog: CatalogCache,
    cart: CartFacade,
    compare: CompareList,
}

impl ShopSession {
    /// Start a session.
    ///
    /// A token in the configuration, or one stored by an earlier login, makes
    /// this an account session; otherwise it is a guest session. Account
    /// sessions show the cached snapshot until the first refresh completes.
    /// A failed first refresh is recorded on the cart, not returned.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built or the stored
    /// token cannot be read.
    #[instrument(skip_all, fields(base_url = %config.api_base_url))]
    pub async fn start(
        config: &StorefrontConfig,
        storage: Arc<dyn KeyValueStorage>,
    ) -> Result<Self, CartError> {
        let client = BackendClient::new(config)?.anonymous();
        let catalog = CatalogCache::new(Arc::new(client.clone()), config.catalog_ttl);

        let token = match &config.auth_token {
            Some(token) => Some(token.clone()),
            None => storage::read_json::<String>(storage.as_ref(), keys::AUTH_TOKEN)?
                .filter(|t| !t.trim().is_empty())
                .map(SecretString::from),
        };

        let cart = match token {
            Some(token) => account_facade(&client, token, &storage),
            None => guest_facade(&storage, &catalog),
        };

        let mut session = Self {
            client,
            compare: CompareList::new(Arc::clone(&storage)),
            storage,
            catalog,
            cart,
        };
        tracing::info!(mode = ?session.mode(), "Session started");

        let _ = session.cart.refresh().await;
        Ok(session)
    }

    /// Guest or account.
    #[must_use]
    pub fn mode(&self) -> CartMode {
        self.cart.mode()
    }

    /// The cart.
    #[must_use]
    pub const fn cart(&self) -> &CartFacade {
        &self.cart
    }

    /// The cart, for mutations.
    pub const fn cart_mut(&mut self) -> &mut CartFacade {
        &mut self.cart
    }

    /// The product comparison list.
    #[must_use]
    pub const fn compare(&self) -> &CompareList {
        &self.compare
    }

    /// The shared catalog cache.
    #[must_use]
    pub const fn catalog(&self) -> &CatalogCache {
        &self.catalog
    }

    /// Switch to an account session after a successful login.
    ///
    /// Stores the token, merges the guest cart into the account cart, then
    /// shows the account cart. A failed merge leaves the guest cart stored
    /// and sets the cart error; the session still switches.
    ///
    /// # Errors
    ///
    /// Returns an error if the token cannot be stored; the session is
    /// unchanged in that case.
    #[instrument(skip_all)]
    pub async fn login(&mut self, token: SecretString) -> Result<MergeReport, CartError> {
        add_breadcrumb("auth", "Login", None);
        storage::write_json(self.storage.as_ref(), keys::AUTH_TOKEN, token.expose_secret())?;

        let api: Arc<dyn CartApi> = Arc::new(self.client.with_token(token));
        let local = LocalCartStore::new(Arc::clone(&self.storage));

        let merged = CartReconciler::new(local, Arc::clone(&api)).merge().await;

        self.cart = CartFacade::new(Box::new(
            RemoteCartStore::new(api).with_snapshot(Arc::clone(&self.storage)),
        ));
        let _ = self.cart.refresh().await;

        match merged {
            Ok(report) => Ok(report),
            Err(e) => {
                e.report("cart.merge");
                self.cart.set_error(e.user_message(MERGE_FAILED));
                Ok(MergeReport::default())
            }
        }
    }

    /// Return to a guest session.
    ///
    /// Forgets the token and the cached account cart.
    ///
    /// # Errors
    ///
    /// Returns an error if local storage cannot be updated.
    #[instrument(skip_all)]
    pub async fn logout(&mut self) -> Result<(), StorageError> {
        add_breadcrumb("auth", "Logout", None);
        self.storage.remove(keys::AUTH_TOKEN)?;
        self.storage.remove(keys::CACHED_CART)?;

        self.cart = guest_facade(&self.storage, &self.catalog);
        let _ = self.cart.refresh().await;
        Ok(())
    }
}

fn guest_facade(storage: &Arc<dyn KeyValueStorage>, catalog: &CatalogCache) -> CartFacade {
    CartFacade::new(Box::new(
        LocalCartStore::new(Arc::clone(storage)).with_catalog(catalog.clone()),
    ))
}

fn account_facade(
    client: &BackendClient,
    token: SecretString,
    storage: &Arc<dyn KeyValueStorage>,
) -> CartFacade {
    let store = RemoteCartStore::new(Arc::new(client.with_token(token)))
        .with_snapshot(Arc::clone(storage));
    let cached = store.cached();
    CartFacade::with_lines(Box::new(store), cached)
}
