//! Per-side prefetch worker.
//!
//! Each loaded side owns exactly one worker task, fed cursor positions
//! over an unbounded channel. The caller never waits on the worker: a
//! cursor notification is a send, nothing more.
//!
//! The worker is deliberately forgetful. When it wakes up it drains the
//! channel down to the newest position, and while sweeping a
//! neighborhood it re-checks the side's generation before every read.
//! A position that has been superseded is abandoned mid-sweep; a read
//! that was already in flight when the cursor moved is allowed to
//! finish, and its slice is cached and announced like any other.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::engine::SideContext;
use crate::notify::SliceOrigin;
use crate::slice::{Axis, SliceKey};

use super::neighborhood::prefetch_neighborhood;

/// One cursor movement, as seen by the prefetch worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrefetchRequest {
    /// Axis the user is navigating along
    pub axis: Axis,
    /// Cursor position on that axis
    pub origin: usize,
    /// Neighbors to fetch on each side of the cursor
    pub radius: usize,
    /// Side generation this request belongs to
    pub generation: u64,
}

/// Spawn the worker task for one side and return its request channel.
///
/// The worker exits when every sender is dropped or when the side's
/// stop flag is raised.
pub(crate) fn spawn_prefetch_worker(
    ctx: Arc<SideContext>,
) -> mpsc::UnboundedSender<PrefetchRequest> {
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(run_worker(ctx, rx));
    tx
}

async fn run_worker(ctx: Arc<SideContext>, mut rx: mpsc::UnboundedReceiver<PrefetchRequest>) {
    while let Some(mut request) = rx.recv().await {
        // Only the newest cursor position matters; drop any backlog
        while let Ok(newer) = rx.try_recv() {
            request = newer;
        }
        if ctx.stopped() {
            break;
        }
        prefetch_around(&ctx, request).await;
    }
    debug!(side = %ctx.side(), "prefetch worker stopped");
}

async fn prefetch_around(ctx: &SideContext, request: PrefetchRequest) {
    let extent = ctx.reader().extent(request.axis);

    for index in prefetch_neighborhood(request.origin, request.radius, extent) {
        // Checked before every read: a newer cursor position or an
        // unload abandons the rest of this sweep
        if ctx.stopped() || ctx.generation() != request.generation {
            debug!(
                side = %ctx.side(),
                axis = %request.axis,
                origin = request.origin,
                "prefetch sweep superseded"
            );
            return;
        }

        let key = SliceKey::new(request.axis, index);
        if ctx.cache().contains(&key).await {
            continue;
        }

        match ctx.reader().read_slice(request.axis, index).await {
            Ok(snapshot) => {
                ctx.cache().put(snapshot.clone()).await;
                ctx.hub()
                    .publish(ctx.side(), SliceOrigin::Prefetch, &snapshot)
                    .await;
                debug!(side = %ctx.side(), %key, "prefetched slice");
            }
            Err(e) => {
                // Best effort: a failed neighbor never disturbs the
                // request path or the rest of the sweep
                warn!(side = %ctx.side(), %key, error = %e, "prefetch read failed");
            }
        }
    }
}
