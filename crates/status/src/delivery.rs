use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};

use occam_core::alert::{Alert, DeliveryChannel as ChannelKind};
use occam_core::OccamResult;

/// Maximum number of channel deliveries dispatched concurrently for a single
/// alert.
const DISPATCH_CONCURRENCY: usize = 32;

/// A destination an alert can be delivered to. Implementations wrap a
/// concrete transport (email, webhook, structured log); `kind` identifies
/// which closed-set `ChannelKind` a given implementation represents so a
/// delivery failure can be attributed back to it.
#[async_trait]
pub trait DeliveryChannel: Send + Sync {
    fn kind(&self) -> ChannelKind;
    async fn deliver(&self, alert: &Alert) -> OccamResult<()>;
}

/// Outcome of delivering one alert to one channel.
#[derive(Debug)]
pub struct DeliveryOutcome {
    pub channel: ChannelKind,
    pub result: OccamResult<()>,
}

/// Send `alert` to every registered channel concurrently. A failure on one
/// channel never prevents delivery to the others: every channel is attempted
/// and every outcome is reported, caller decides what to do with partial
/// failures.
pub async fn dispatch(channels: &[Arc<dyn DeliveryChannel>], alert: &Alert) -> Vec<DeliveryOutcome> {
    stream::iter(channels.iter().cloned())
        .map(|channel| async move {
            let result = channel.deliver(alert).await;
            if let Err(err) = &result {
                tracing::warn!(channel = ?channel.kind(), alert = %alert.dedup_key, error = %err, "alert delivery failed");
            }
            DeliveryOutcome { channel: channel.kind(), result }
        })
        .buffer_unordered(DISPATCH_CONCURRENCY)
        .collect()
        .await
}

/// Send a batch of alerts, each to every registered channel. Alerts are
/// dispatched concurrently with each other as well as across channels.
pub async fn dispatch_batch(channels: &[Arc<dyn DeliveryChannel>], alerts: &[Alert]) -> Vec<Vec<DeliveryOutcome>> {
    stream::iter(alerts.iter())
        .map(|alert| dispatch(channels, alert))
        .buffer_unordered(DISPATCH_CONCURRENCY)
        .collect()
        .await
}
