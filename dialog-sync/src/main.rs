use dialog_sync::config::AppConfig;
use dialog_sync::credentials::{CredentialResolver, missing_config};
use dialog_sync::database::Database;
use dialog_sync::logging::init_logging;
use dialog_sync::remote::{RemoteClient, RemoteClientConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env();

    let (_logging, _guard) = init_logging(&config.log_filter, config.log_dir.as_deref())?;

    // Initialize database
    let db = Database::open(&config.database_url).await?;
    tracing::info!(database = %config.database_url, "Database ready");

    let client = RemoteClient::new(RemoteClientConfig::from_app(&config))?;
    tracing::info!(
        domain = client.domain(),
        mode = ?config.plugin.sdk_mode(),
        "Remote client configured"
    );

    let credentials = CredentialResolver::without_broker().resolve(&config.plugin).await;
    let issues = missing_config(&credentials);
    db.pool.close().await;
    db.write_pool.close().await;

    if !issues.is_empty() {
        for issue in &issues {
            tracing::warn!(field = %issue.field, "{issue}");
        }
        anyhow::bail!("{} credential setting(s) missing or invalid", issues.len());
    }

    tracing::info!(
        partner_id = %credentials.partner_id,
        chat_mode = credentials.feature_flags.chat_mode,
        "dialog-sync configuration is complete"
    );
    Ok(())
}
