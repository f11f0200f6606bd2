//! Detached background work that must never fail the caller.

use std::future::Future;

use tokio::task::JoinHandle;
use tracing::Instrument;

use crate::error::Result;
use crate::trace::TraceEvent;

/// Spawn `fut` on the runtime. Its error, if any, is reported as a
/// `BackgroundTaskFailed` event and otherwise dropped.
pub fn spawn_detached<F>(task: &'static str, fut: F) -> JoinHandle<()>
where
    F: Future<Output = Result<()>> + Send + 'static,
{
    let span = tracing::debug_span!("background", task);
    tokio::spawn(
        async move {
            if let Err(e) = fut.await {
                TraceEvent::BackgroundTaskFailed {
                    task: task.into(),
                    error: e.to_string(),
                }
                .emit();
            }
        }
        .instrument(span),
    )
}
