//! Event loop: pull envelopes from the source, hand each one to the worker
//! pool, go back for the next. Handling is never awaited here.

use std::sync::Arc;

use msync_reconcile::{Dispatcher, WorkerPool};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::source::EventSource;

/// Runs until `cancel` fires or the source closes. Returns how many
/// envelopes were handed off.
pub async fn run_event_loop<S: EventSource>(
    mut source: S,
    dispatcher: Arc<Dispatcher>,
    pool: WorkerPool,
    cancel: CancellationToken,
) -> u64 {
    let mut handed_off = 0u64;
    info!("event loop started");

    loop {
        let env = tokio::select! {
            _ = cancel.cancelled() => {
                info!(handed_off, "event loop stopped");
                return handed_off;
            }
            env = source.next() => env,
        };

        let Some(env) = env else {
            info!(handed_off, "event source closed");
            return handed_off;
        };

        debug!(sub_type = %env.sub_type, "received event");
        let dispatcher = Arc::clone(&dispatcher);
        pool.submit(async move { dispatcher.handle(env).await });
        handed_off += 1;
    }
}
