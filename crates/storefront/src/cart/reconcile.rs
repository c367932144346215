//! Guest-to-account cart merge, run once per login.
//!
//! Guest lines are added to the account cart unless the account already holds
//! the same `(product_id, size)` key. On a clash the server's line wins and the
//! guest quantity is dropped, not summed. Each add is independent; the guest
//! cart is deleted once every line has been attempted.

use std::collections::HashSet;
use std::sync::Arc;

use adroit_core::LineKey;
use tracing::instrument;

use super::LocalCartStore;
use crate::api::CartApi;
use crate::error::{CartError, add_breadcrumb};

/// Where a reconciler is in its single run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergePhase {
    #[default]
    Idle,
    Merging,
    Done,
}

/// What a merge did with each guest line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// Lines added to the account cart.
    pub added: Vec<LineKey>,
    /// Lines already present on the account; guest quantity dropped.
    pub skipped: Vec<LineKey>,
    /// Lines whose add failed, with the error message.
    pub failed: Vec<(LineKey, String)>,
}

impl MergeReport {
    /// Whether the merge touched nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.skipped.is_empty() && self.failed.is_empty()
    }
}

/// Moves a guest cart into an account cart.
pub struct CartReconciler {
    local: LocalCartStore,
    api: Arc<dyn CartApi>,
    phase: MergePhase,
}

impl CartReconciler {
    /// Create a reconciler for one login.
    #[must_use]
    pub fn new(local: LocalCartStore, api: Arc<dyn CartApi>) -> Self {
        Self {
            local,
            api,
            phase: MergePhase::Idle,
        }
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> MergePhase {
        self.phase
    }

    /// Merge the guest cart into the account cart.
    ///
    /// Runs at most once; later calls return an empty report. An empty guest
    /// cart makes no backend calls.
    ///
    /// # Errors
    ///
    /// Returns an error if the guest cart cannot be read or the account cart
    /// cannot be fetched. The guest cart is kept in both cases.
    #[instrument(skip(self), fields(phase = ?self.phase))]
    pub async fn merge(&mut self) -> Result<MergeReport, CartError> {
        if self.phase != MergePhase::Idle {
            tracing::debug!("Merge already ran for this login");
            return Ok(MergeReport::default());
        }
        self.phase = MergePhase::Merging;
        let result = self.run().await;
        self.phase = MergePhase::Done;
        result
    }

    async fn run(&self) -> Result<MergeReport, CartError> {
        let guest = self.local.load()?;
        if guest.is_empty() {
            return Ok(MergeReport::default());
        }

        add_breadcrumb("cart", "Merge guest cart", None);

        let existing: HashSet<LineKey> = self
            .api
            .view_cart()
            .await?
            .into_iter()
            .filter_map(|item| {
                let product_id = item.product_id.normalize().ok()?;
                Some(LineKey::new(product_id, item.size))
            })
            .collect();

        let mut report = MergeReport::default();
        for line in &guest {
            let key = line.key();
            if existing.contains(&key) {
                tracing::debug!(
                    product_id = %key.product_id,
                    size = %key.size,
                    guest_quantity = line.quantity,
                    "Account already has line, keeping server quantity"
                );
                report.skipped.push(key);
                continue;
            }

            match self
                .api
                .add_item(line.product_id, line.quantity, &line.size)
                .await
            {
                Ok(()) => report.added.push(key),
                Err(e) => {
                    e.report("cart.merge");
                    report.failed.push((key, e.to_string()));
                }
            }
        }

        if let Err(e) = self.local.discard() {
            tracing::warn!(error = %e, "Failed to delete guest cart after merge");
        }

        tracing::info!(
            added = report.added.len(),
            skipped = report.skipped.len(),
            failed = report.failed.len(),
            "Guest cart merged"
        );
        Ok(report)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use adroit_core::{CartLine, ProductId, Size};

    use super::*;
    use crate::cart::CartRepository;
    use crate::cart::fake::FakeCartApi;
    use crate::storage::{KeyValueStorage, MemoryStorage, keys};

    async fn guest_with(lines: &[(i32, &str, u32)]) -> (Arc<MemoryStorage>, LocalCartStore) {
        let storage = Arc::new(MemoryStorage::new());
        let local = LocalCartStore::new(storage.clone());
        for (id, size, quantity) in lines {
            local
                .add(CartLine::new(ProductId::new(*id), Size::new(size), *quantity))
                .await
                .unwrap();
        }
        (storage, local)
    }

    #[tokio::test]
    async fn test_existing_line_keeps_server_quantity() {
        let (storage, local) = guest_with(&[(7, "M", 2)]).await;
        let api = Arc::new(FakeCartApi::with_items(vec![FakeCartApi::item("7", "M", 1)]));
        let mut reconciler = CartReconciler::new(local, api.clone());

        let report = reconciler.merge().await.unwrap();

        assert_eq!(report.skipped, vec![LineKey::new(ProductId::new(7), Size::new("M"))]);
        assert!(report.added.is_empty());
        assert_eq!(api.quantity_of(ProductId::new(7), "M"), Some(1));
        assert_eq!(storage.get(keys::GUEST_CART).unwrap(), None);
        assert_eq!(reconciler.phase(), MergePhase::Done);
    }

    #[tokio::test]
    async fn test_new_line_is_added_with_guest_quantity_and_size() {
        let (storage, local) = guest_with(&[(3, "XL", 4)]).await;
        let api = Arc::new(FakeCartApi::with_items(vec![FakeCartApi::item("7", "M", 1)]));
        let mut reconciler = CartReconciler::new(local, api.clone());

        let report = reconciler.merge().await.unwrap();

        assert_eq!(report.added, vec![LineKey::new(ProductId::new(3), Size::new("XL"))]);
        assert_eq!(api.quantity_of(ProductId::new(3), "XL"), Some(4));
        assert_eq!(storage.get(keys::GUEST_CART).unwrap(), None);
    }

    #[tokio::test]
    async fn test_catalog_code_on_server_matches_numeric_guest_line() {
        let (_, local) = guest_with(&[(7, "M", 2)]).await;
        let api = Arc::new(FakeCartApi::with_items(vec![FakeCartApi::item("PRO007", "M", 1)]));
        let mut reconciler = CartReconciler::new(local, api.clone());

        let report = reconciler.merge().await.unwrap();

        assert_eq!(report.skipped.len(), 1);
        assert!(!api.calls().iter().any(|c| c.starts_with("add")));
    }

    #[tokio::test]
    async fn test_same_product_other_size_is_added() {
        let (_, local) = guest_with(&[(7, "L", 1)]).await;
        let api = Arc::new(FakeCartApi::with_items(vec![FakeCartApi::item("7", "M", 1)]));
        let mut reconciler = CartReconciler::new(local, api.clone());

        let report = reconciler.merge().await.unwrap();

        assert_eq!(report.added.len(), 1);
        assert_eq!(api.quantity_of(ProductId::new(7), "L"), Some(1));
        assert_eq!(api.quantity_of(ProductId::new(7), "M"), Some(1));
    }

    #[tokio::test]
    async fn test_failed_add_does_not_stop_others() {
        let (storage, local) = guest_with(&[(1, "M", 1), (2, "M", 1), (3, "M", 1)]).await;
        let api = Arc::new(FakeCartApi::default());
        api.fail_add_of(ProductId::new(2));
        let mut reconciler = CartReconciler::new(local, api.clone());

        let report = reconciler.merge().await.unwrap();

        assert_eq!(report.added.len(), 2);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0.product_id, ProductId::new(2));
        // Guest cart is gone even though one add failed
        assert_eq!(storage.get(keys::GUEST_CART).unwrap(), None);
    }

    #[tokio::test]
    async fn test_empty_guest_cart_makes_no_calls() {
        let (_, local) = guest_with(&[]).await;
        let api = Arc::new(FakeCartApi::default());
        let mut reconciler = CartReconciler::new(local, api.clone());

        let report = reconciler.merge().await.unwrap();

        assert!(report.is_empty());
        assert!(api.calls().is_empty());
        assert_eq!(reconciler.phase(), MergePhase::Done);
    }

    #[tokio::test]
    async fn test_view_failure_keeps_guest_cart() {
        let (storage, local) = guest_with(&[(1, "M", 1)]).await;
        let api = Arc::new(FakeCartApi::default());
        api.set_fail_view(true);
        let mut reconciler = CartReconciler::new(local, api.clone());

        assert!(reconciler.merge().await.is_err());
        assert!(storage.get(keys::GUEST_CART).unwrap().is_some());
        assert_eq!(reconciler.phase(), MergePhase::Done);
    }

    #[tokio::test]
    async fn test_merge_runs_once() {
        let (_, local) = guest_with(&[(1, "M", 1)]).await;
        let api = Arc::new(FakeCartApi::default());
        let mut reconciler = CartReconciler::new(local.clone(), api.clone());

        reconciler.merge().await.unwrap();
        local
            .add(CartLine::new(ProductId::new(9), Size::default(), 1))
            .await
            .unwrap();
        let second = reconciler.merge().await.unwrap();

        assert!(second.is_empty());
        assert_eq!(api.quantity_of(ProductId::new(9), "M"), None);
    }
}
