//! Bounded channel carrying progress snapshots to a UI consumer.

use tokio::sync::mpsc;

use crate::config::PipelineConfig;

use super::progress::ProgressSnapshot;

/// Sending half handed to the ingestor.
pub type ProgressSender = mpsc::Sender<ProgressSnapshot>;

/// Receiving half held by the consumer (progress bar, UI list).
pub type ProgressReceiver = mpsc::Receiver<ProgressSnapshot>;

/// Create a bounded progress channel with the configured buffer size.
///
/// When the buffer is full the ingestor waits for the consumer, so a slow
/// renderer never accumulates an unbounded backlog.
pub fn progress_channel(config: &PipelineConfig) -> (ProgressSender, ProgressReceiver) {
    mpsc::channel(config.progress_buffer)
}
