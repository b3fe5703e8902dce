use std::future::Future;

use tokio::task::{JoinError, JoinHandle};

use crate::error::FeedError;
use crate::execution::dispatcher::DispatchStats;

/// Wait for shutdown, the feed ending, or the dispatcher ending, whichever comes first
///
/// On shutdown the feed task is aborted, which closes the message queue; the
/// dispatcher then drains what is queued and its stats are returned. If the
/// dispatcher ends first (it only does so by panicking while the feed still
/// holds the queue), the feed is aborted and the join error is returned.
pub async fn supervise<S>(
    mut feed: JoinHandle<Result<u64, FeedError>>,
    mut dispatcher: JoinHandle<DispatchStats>,
    shutdown: S,
) -> Result<DispatchStats, JoinError>
where
    S: Future<Output = ()>,
{
    tokio::pin!(shutdown);

    tokio::select! {
        _ = &mut shutdown => {
            tracing::info!("⚠️  Shutdown requested, stopping feed...");
            feed.abort();
        }
        result = &mut feed => {
            match result {
                Ok(Ok(forwarded)) => tracing::warn!(forwarded, "Feed ended"),
                Ok(Err(e)) => tracing::error!(error = %e, "Feed failed"),
                Err(e) => tracing::error!(error = %e, "Feed task exited"),
            }
        }
        result = &mut dispatcher => {
            tracing::error!("Dispatcher exited before the feed, stopping feed");
            feed.abort();
            return result;
        }
    }

    dispatcher.await
}
