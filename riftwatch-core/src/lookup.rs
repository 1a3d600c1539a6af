//! Parallel history lookups for a roster.
//!
//! ## Architecture
//!
//! ```text
//! RosterBatch ──► run_batch ──┬─► fetch_history(A) ─► aggregate ─► on_item_settled(A)
//!                             ├─► fetch_history(B) ─► aggregate ─► on_item_settled(B)
//!                             └─► ...
//!                                  (all settled) ──► on_batch_complete()
//! ```
//!
//! Lookups are polled together on one task, so "parallel" means concurrently
//! pending, not multi-threaded. Each item reports as soon as it settles, in
//! whatever order the network returns. A failure is confined to its own item.
//!
//! [`LookupCoordinator`] runs batches in the background and stamps each one
//! with a per-role generation. Nothing is cancelled when a newer roster
//! arrives; the session simply ignores updates from a superseded generation.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use futures::stream::{FuturesUnordered, StreamExt};

use crate::error::Result;
use crate::session::{SessionUpdate, UpdateSender};
use crate::stats;
use crate::types::{Aggregate, MatchRecord, PlayerIdentity, RosterBatch, RosterRole};

/// Outcome of one player's lookup.
pub type LookupResult = Result<Aggregate>;

/// Something that can fetch a player's recent matches, most recent first.
pub trait HistorySource: Send + Sync + 'static {
    fn fetch_history(
        &self,
        identity: &PlayerIdentity,
    ) -> impl Future<Output = Result<Vec<MatchRecord>>> + Send;
}

impl<S: HistorySource> HistorySource for Arc<S> {
    fn fetch_history(
        &self,
        identity: &PlayerIdentity,
    ) -> impl Future<Output = Result<Vec<MatchRecord>>> + Send {
        (**self).fetch_history(identity)
    }
}

/// Look up every player in `batch` concurrently.
///
/// `on_item_settled` fires once per roster entry as soon as that lookup
/// settles. `on_batch_complete` fires exactly once, after every item has
/// settled, including for an empty roster.
pub async fn run_batch<S, F, C>(
    source: &S,
    batch: &RosterBatch,
    mut on_item_settled: F,
    on_batch_complete: C,
) where
    S: HistorySource,
    F: FnMut(&PlayerIdentity, LookupResult),
    C: FnOnce(),
{
    let mut pending: FuturesUnordered<_> = batch
        .identities()
        .map(|identity| async move {
            let result = source
                .fetch_history(identity)
                .await
                .map(|matches| stats::aggregate(identity, &matches));
            (identity, result)
        })
        .collect();

    while let Some((identity, result)) = pending.next().await {
        if let Err(e) = &result {
            tracing::debug!(player = %identity, error = %e, "History lookup failed");
        }
        on_item_settled(identity, result);
    }

    on_batch_complete();
}

/// Runs roster batches in the background and tracks their generations.
pub struct LookupCoordinator<S> {
    source: Arc<S>,
    generations: HashMap<RosterRole, u64>,
}

impl<S: HistorySource> LookupCoordinator<S> {
    pub fn new(source: S) -> Self {
        Self {
            source: Arc::new(source),
            generations: HashMap::new(),
        }
    }

    /// Current generation for `role`; 0 before any batch.
    pub fn generation(&self, role: RosterRole) -> u64 {
        self.generations.get(&role).copied().unwrap_or(0)
    }

    /// Start a batch, returning the generation its updates will carry.
    ///
    /// Results arrive on `updates` as [`SessionUpdate::ItemSettled`] followed
    /// by one [`SessionUpdate::BatchComplete`]. Must be called from within a
    /// tokio runtime.
    pub fn dispatch(&mut self, batch: RosterBatch, updates: UpdateSender) -> u64 {
        let role = batch.role;
        let generation = {
            let g = self.generations.entry(role).or_insert(0);
            *g += 1;
            *g
        };

        tracing::info!(
            role = role.noun(),
            generation,
            players = batch.len(),
            "Dispatching roster lookups"
        );

        let source = Arc::clone(&self.source);
        tokio::spawn(async move {
            run_batch(
                &source,
                &batch,
                |identity, result| {
                    let _ = updates.send(SessionUpdate::ItemSettled {
                        role,
                        generation,
                        identity: identity.clone(),
                        result,
                    });
                },
                || {
                    let _ = updates.send(SessionUpdate::BatchComplete { role, generation });
                },
            )
            .await;
        });

        generation
    }
}
