use receipt_bot::bot;
use receipt_bot::config::BotConfig;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = match BotConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("{e}");
            return Err(e.into());
        }
    };

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        api = %config.api_base,
        webapp = %config.webapp_url,
        forward_timeout_secs = config.forward_timeout.as_secs(),
        "Starting receipt bot"
    );

    bot::run(config).await?;

    tracing::info!("Bot stopped");
    Ok(())
}
