use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio::sync::Notify;
use tracing::{debug, info, warn};

const RESUBSCRIBE_DELAY: Duration = Duration::from_secs(5);

/// Wakes the extractor for every message published on `channel`.
/// The extractor's interval keeps sweeping if Redis is unavailable.
pub async fn listen_for_uploads(client: redis::Client, channel: String, wake: Arc<Notify>) {
    loop {
        match subscribe(&client, &channel, &wake).await {
            Ok(()) => warn!(
                channel = %channel,
                "Upload notification stream closed, resubscribing"
            ),
            Err(e) => warn!(channel = %channel, "Upload notification listener failed: {e}"),
        }
        tokio::time::sleep(RESUBSCRIBE_DELAY).await;
    }
}

async fn subscribe(
    client: &redis::Client,
    channel: &str,
    wake: &Notify,
) -> redis::RedisResult<()> {
    let mut pubsub = client.get_async_pubsub().await?;
    pubsub.subscribe(channel).await?;
    info!(channel, "Listening for upload notifications");

    let mut messages = pubsub.on_message();
    while let Some(message) = messages.next().await {
        let deck_id: String = message.get_payload().unwrap_or_default();
        debug!(channel, deck_id = %deck_id, "Upload notification received");
        wake.notify_one();
    }
    Ok(())
}
