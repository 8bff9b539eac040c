//! Reconciliation sweep
//!
//! Finds every order without a placement timestamp and retries placement for
//! each one. A failing order is counted and logged; it never stops the rest of
//! the pass. `SweepScheduler` runs passes on a fixed interval.

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Notify, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use super::placement::{PlacementReconciler, PlacementReport};
use crate::error::Result;
use crate::persistence::OrderStore;

/// An order whose attempt failed during a sweep
#[derive(Debug, Clone, Serialize)]
pub struct SweepFailure {
    pub order_id: Uuid,
    pub error: String,
}

/// Outcome of one sweep pass
#[derive(Debug, Clone, Default, Serialize)]
pub struct SweepReport {
    pub discovered: usize,
    pub placed: usize,
    pub rejected: usize,
    pub already_placed: usize,
    pub failed: Vec<SweepFailure>,
    /// Another pass of the same sweep was still running
    pub skipped: bool,
}

impl SweepReport {
    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }
}

/// Clears the in-progress flag when a pass ends, including on early return.
struct PassGuard<'a>(&'a AtomicBool);

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

pub struct ReconciliationSweep {
    store: Arc<dyn OrderStore>,
    reconciler: Arc<PlacementReconciler>,
    concurrency: usize,
    in_progress: AtomicBool,
}

impl ReconciliationSweep {
    pub fn new(
        store: Arc<dyn OrderStore>,
        reconciler: Arc<PlacementReconciler>,
        concurrency: usize,
    ) -> Self {
        Self {
            store,
            reconciler,
            concurrency: concurrency.max(1),
            in_progress: AtomicBool::new(false),
        }
    }

    /// Retry placement for every unplaced order.
    ///
    /// Only a failure to list unplaced orders fails the pass. Each order is
    /// attempted at most once per pass.
    #[instrument(skip(self))]
    pub async fn sweep_unplaced_orders(&self) -> Result<SweepReport> {
        if self.in_progress.swap(true, Ordering::SeqCst) {
            warn!("Reconciliation sweep already running, skipping");
            return Ok(SweepReport {
                skipped: true,
                ..Default::default()
            });
        }
        let _guard = PassGuard(&self.in_progress);

        let orders = self.store.find_unplaced().await?;
        let mut report = SweepReport {
            discovered: orders.len(),
            ..Default::default()
        };

        if orders.is_empty() {
            debug!("No unplaced orders");
            return Ok(report);
        }

        info!("Sweeping {} unplaced orders", orders.len());

        let reconciler = &self.reconciler;
        let results: Vec<_> = stream::iter(orders)
            .map(|order| async move {
                let result = reconciler.attempt_placement(&order).await;
                (order.id, result)
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        for (order_id, result) in results {
            match result {
                Ok(PlacementReport::Placed { .. }) => report.placed += 1,
                Ok(PlacementReport::Rejected { .. }) => report.rejected += 1,
                Ok(PlacementReport::AlreadyPlaced) => report.already_placed += 1,
                Err(e) => {
                    error!("Placement attempt for order {} failed: {}", order_id, e);
                    report.failed.push(SweepFailure {
                        order_id,
                        error: e.to_string(),
                    });
                }
            }
        }

        info!(
            "Sweep complete: discovered={}, placed={}, rejected={}, already_placed={}, failed={}",
            report.discovered,
            report.placed,
            report.rejected,
            report.already_placed,
            report.failed.len()
        );

        Ok(report)
    }
}

/// Cumulative statistics over all scheduled passes
#[derive(Debug, Clone, Default, Serialize)]
pub struct SweepStats {
    pub passes: u64,
    pub failed_passes: u64,
    pub orders_placed: u64,
    pub orders_rejected: u64,
    pub attempt_errors: u64,
    pub last_run: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

/// Runs the reconciliation sweep on a fixed interval
pub struct SweepScheduler {
    sweep: Arc<ReconciliationSweep>,
    interval: Duration,
    running: Arc<AtomicBool>,
    shutdown: Arc<Notify>,
    stats: Arc<RwLock<SweepStats>>,
}

impl SweepScheduler {
    pub fn new(sweep: Arc<ReconciliationSweep>, interval: Duration) -> Self {
        Self {
            sweep,
            interval,
            running: Arc::new(AtomicBool::new(false)),
            shutdown: Arc::new(Notify::new()),
            stats: Arc::new(RwLock::new(SweepStats::default())),
        }
    }

    pub async fn get_stats(&self) -> SweepStats {
        self.stats.read().await.clone()
    }

    /// Start the sweep loop. The first pass runs immediately.
    ///
    /// Returns `None` if the scheduler is already running.
    pub fn start(&self) -> Option<JoinHandle<()>> {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("Sweep scheduler already running");
            return None;
        }

        info!(
            "Starting reconciliation sweep scheduler (interval: {}s)",
            self.interval.as_secs()
        );

        let sweep = self.sweep.clone();
        let running = self.running.clone();
        let shutdown = self.shutdown.clone();
        let stats = self.stats.clone();
        let period = self.interval;

        Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            while running.load(Ordering::SeqCst) {
                tokio::select! {
                    _ = interval.tick() => {}
                    _ = shutdown.notified() => break,
                }

                if !running.load(Ordering::SeqCst) {
                    break;
                }

                let result = sweep.sweep_unplaced_orders().await;
                let mut s = stats.write().await;
                s.passes += 1;
                s.last_run = Some(Utc::now());
                match result {
                    Ok(report) => {
                        s.orders_placed += report.placed as u64;
                        s.orders_rejected += report.rejected as u64;
                        s.attempt_errors += report.failed.len() as u64;
                    }
                    Err(e) => {
                        error!("Reconciliation sweep failed: {}", e);
                        s.failed_passes += 1;
                        s.last_error = Some(e.to_string());
                    }
                }
            }

            info!("Sweep scheduler stopped");
        }))
    }

    /// Stop the sweep loop after the current pass
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.shutdown.notify_one();
        info!("Sweep scheduler stop requested");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CreateOrder, Order, OrderSide};
    use crate::exchange::PaperExchange;
    use crate::persistence::InMemoryOrderStore;

    fn sweep_over(store: &InMemoryOrderStore) -> Arc<ReconciliationSweep> {
        let store: Arc<dyn OrderStore> = Arc::new(store.clone());
        let reconciler = Arc::new(PlacementReconciler::new(
            store.clone(),
            Arc::new(PaperExchange::new()),
            Duration::from_secs(1),
        ));
        Arc::new(ReconciliationSweep::new(store, reconciler, 2))
    }

    #[tokio::test]
    async fn empty_store_sweeps_nothing() {
        let store = InMemoryOrderStore::new();
        let report = sweep_over(&store).sweep_unplaced_orders().await.unwrap();
        assert_eq!(report.discovered, 0);
        assert!(!report.skipped);
    }

    #[tokio::test]
    async fn overlapping_pass_is_skipped() {
        let store = InMemoryOrderStore::new();
        let sweep = sweep_over(&store);

        sweep.in_progress.store(true, Ordering::SeqCst);
        assert!(sweep.sweep_unplaced_orders().await.unwrap().skipped);

        sweep.in_progress.store(false, Ordering::SeqCst);
        assert!(!sweep.sweep_unplaced_orders().await.unwrap().skipped);
    }

    #[tokio::test]
    async fn scheduler_runs_and_stops() {
        let store = InMemoryOrderStore::new();
        let order = Order::from_request(CreateOrder::market(OrderSide::Buy, "XRPUSDT00006", 5));
        store.insert(&order).await.unwrap();

        let scheduler = SweepScheduler::new(sweep_over(&store), Duration::from_secs(3600));
        let handle = scheduler.start().expect("scheduler should start");
        assert!(scheduler.start().is_none());

        tokio::time::sleep(Duration::from_millis(100)).await;
        scheduler.stop();
        handle.await.unwrap();

        let stats = scheduler.get_stats().await;
        assert_eq!(stats.passes, 1);
        assert_eq!(stats.orders_placed, 1);
        assert!(store.find_by_id(order.id).await.unwrap().unwrap().is_placed());
    }
}
