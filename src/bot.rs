//! Dispatch loop: channel stream in, one task per message, replies out.

use std::future::Future;
use std::sync::Arc;

use futures::StreamExt;
use tokio::task::JoinSet;

use crate::channels::{Channel, IncomingMessage, TelegramChannel};
use crate::config::BotConfig;
use crate::error::Result;
use crate::relay::Relay;

/// Wire the relay and Telegram channel from `config`, then serve until Ctrl+C.
pub async fn run(config: BotConfig) -> Result<()> {
    let relay = Relay::from_config(&config)?;
    let telegram = TelegramChannel::new(config.bot_token, config.poll_timeout);

    let relay = match telegram.get_me().await?.username {
        Some(username) => {
            tracing::info!(bot = %username, "Authenticated with Telegram");
            relay.with_bot_username(username)
        }
        None => relay,
    };

    serve(Arc::new(telegram), Arc::new(relay)).await
}

/// Serve `channel` until Ctrl+C or until its stream ends.
pub async fn serve(channel: Arc<dyn Channel>, relay: Arc<Relay>) -> Result<()> {
    serve_until(channel, relay, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
        tracing::info!("Ctrl+C received, shutting down...");
    })
    .await
}

/// Serve `channel` until `shutdown` resolves or its stream ends.
///
/// In-flight messages are allowed to finish before the channel is shut down.
pub async fn serve_until<F>(channel: Arc<dyn Channel>, relay: Arc<Relay>, shutdown: F) -> Result<()>
where
    F: Future<Output = ()>,
{
    channel.health_check().await?;
    let mut messages = channel.start().await?;
    let mut tasks = JoinSet::new();
    tokio::pin!(shutdown);

    tracing::info!(channel = channel.name(), "Receipt bot ready and listening");

    loop {
        tokio::select! {
            biased;
            _ = &mut shutdown => break,
            msg = messages.next() => {
                let Some(message) = msg else {
                    tracing::info!("Channel stream ended, shutting down...");
                    break;
                };
                tasks.spawn(handle_one(Arc::clone(&channel), Arc::clone(&relay), message));
            }
            Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                log_join(joined);
            }
        }
    }

    while let Some(joined) = tasks.join_next().await {
        log_join(joined);
    }

    channel.shutdown().await?;
    Ok(())
}

async fn handle_one(channel: Arc<dyn Channel>, relay: Arc<Relay>, message: IncomingMessage) {
    let Some(response) = relay.handle(&message).await else {
        return;
    };

    if let Err(e) = channel.respond(&message, response).await {
        tracing::error!(chat_id = %message.chat_id, "Failed to deliver reply: {e}");
    }
}

fn log_join(joined: std::result::Result<(), tokio::task::JoinError>) {
    if let Err(e) = joined {
        tracing::error!("Message task failed: {e}");
    }
}
