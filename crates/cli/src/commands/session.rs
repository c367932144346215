//! Session commands.
//!
//! # Usage
//!
//! ```bash
//! adroit-cli session login <token>
//! adroit-cli session status
//! adroit-cli session logout
//! ```

use adroit_storefront::ShopSession;
use adroit_storefront::config::validate_auth_token;

use super::CliError;

/// Log in and merge the guest cart.
pub async fn login(session: &mut ShopSession, token: String) -> Result<(), CliError> {
    let token = validate_auth_token(token)?;
    let report = session.login(token).await?;

    tracing::info!(
        "Logged in: {} guest line(s) added, {} already in account, {} failed",
        report.added.len(),
        report.skipped.len(),
        report.failed.len()
    );
    for (key, error) in &report.failed {
        tracing::warn!("Could not move {} [{}]: {error}", key.product_id, key.size);
    }
    if let Some(error) = session.cart().error() {
        tracing::warn!("{error}");
    }
    super::cart::show(session);
    Ok(())
}

/// Log out.
pub async fn logout(session: &mut ShopSession) -> Result<(), CliError> {
    session.logout().await?;
    tracing::info!("Logged out");
    Ok(())
}

/// Print the session mode.
pub fn status(session: &ShopSession) {
    tracing::info!(
        "{:?} session, {} line(s) in cart",
        session.mode(),
        session.cart().count()
    );
}
