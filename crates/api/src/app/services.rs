//! Infrastructure wiring shared by every handler.

use anyhow::Context;

use vitrine_auth::TokenCodec;
use vitrine_infra::{AdminProfileRepo, ContactRepo, SubscriptionRepo, UserRepo};

use crate::config::Config;

/// Repositories plus the token codec, built once at startup and shared via
/// an `Extension<Arc<AppServices>>` layer.
pub struct AppServices {
    pub users: UserRepo,
    pub subscriptions: SubscriptionRepo,
    pub contacts: ContactRepo,
    pub admin_profiles: AdminProfileRepo,
    pub tokens: TokenCodec,
}

pub async fn build_services(config: Config) -> anyhow::Result<AppServices> {
    let pool = vitrine_infra::connect(&config.database_url)
        .await
        .with_context(|| format!("failed to open database at {}", config.database_url))?;

    tracing::info!(database_url = %config.database_url, "database ready");

    Ok(AppServices {
        users: UserRepo::new(pool.clone()),
        subscriptions: SubscriptionRepo::new(pool.clone()),
        contacts: ContactRepo::new(pool.clone()),
        admin_profiles: AdminProfileRepo::new(pool),
        tokens: TokenCodec::new(
            config.jwt_secret.as_bytes(),
            config.jwt_refresh_secret.as_bytes(),
            config.access_ttl,
            config.refresh_ttl,
        ),
    })
}
