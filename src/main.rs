use anyhow::Context;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use pursuva::app::AppShell;
use pursuva::identity::LocalIdentityClient;
use pursuva::profile::{FileProfileStore, ProfilePatch, ProfileStore, Role};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Init logging
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap();
    fmt().with_env_filter(filter).init();

    // Startup banner at info level so something always prints at default verbosity
    let rust_log = std::env::var("RUST_LOG").unwrap_or_else(|_| "<unset>".to_string());
    let data_root = std::env::var("PURSUVA_DATA_FOLDER").unwrap_or_else(|_| "data".to_string());
    info!(
        target: "pursuva",
        "Pursuva starting: RUST_LOG='{}', data_root='{}'",
        rust_log, data_root
    );

    ensure_default_admin(&data_root).await?;

    let mut shell = AppShell::new(&data_root)?;
    shell.run().await
}

/// Seed a first-run admin account and profile so the admin surface is
/// reachable on a fresh data folder. A no-op when the account exists.
async fn ensure_default_admin(data_root: &str) -> anyhow::Result<()> {
    let email =
        std::env::var("PURSUVA_ADMIN_EMAIL").unwrap_or_else(|_| "admin@pursuva.io".to_string());
    let password =
        std::env::var("PURSUVA_ADMIN_PASSWORD").unwrap_or_else(|_| "pursuva".to_string());

    let client = LocalIdentityClient::new(data_root)
        .with_context(|| format!("opening identity registry under {}", data_root))?;
    let identity = client.ensure_account(&email, &password, Some("Pursuva Admin"))?;

    let store = FileProfileStore::new(data_root)
        .with_context(|| format!("opening profile store under {}", data_root))?;
    if store.get(&identity.uid).await?.is_none() {
        store
            .set(
                &identity.uid,
                ProfilePatch {
                    email: Some(identity.email.clone()),
                    display_name: identity.display_name.clone(),
                    role: Some(Role::Admin),
                    groups: None,
                    enrolled_courses: None,
                },
            )
            .await?;
        info!(target: "pursuva", "seeded admin profile for '{}'", email);
    }
    Ok(())
}
