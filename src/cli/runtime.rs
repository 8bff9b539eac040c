//! Wiring for CLI commands: builds the store, gateway and services from
//! `AppConfig` and dispatches the parsed command.

use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use super::output::{self, OutputMode};
use super::{Cli, Commands, StoreKind};
use crate::adapters::PostgresStore;
use crate::config::AppConfig;
use crate::error::Result;
use crate::exchange::build_gateway;
use crate::persistence::{InMemoryOrderStore, OrderStore};
use crate::services::{OrderService, PlacementReconciler, ReconciliationSweep, SweepScheduler};

/// Services shared by every command
pub struct Runtime {
    pub config: AppConfig,
    pub postgres: Option<PostgresStore>,
    pub orders: OrderService,
    pub sweep: Arc<ReconciliationSweep>,
}

impl Runtime {
    pub async fn build(config: AppConfig, store_kind: StoreKind, dry_run: bool) -> Result<Self> {
        let (postgres, store) = match store_kind {
            StoreKind::Postgres => {
                let pg =
                    PostgresStore::new(&config.database.url, config.database.max_connections)
                        .await?;
                let store: Arc<dyn OrderStore> = Arc::new(pg.clone());
                (Some(pg), store)
            }
            StoreKind::Memory => {
                warn!("Using in-memory order store; orders are lost on exit");
                let store: Arc<dyn OrderStore> = Arc::new(InMemoryOrderStore::new());
                (None, store)
            }
        };

        let gateway = build_gateway(&config.exchange, dry_run)?;
        let reconciler = Arc::new(PlacementReconciler::new(
            store.clone(),
            gateway,
            Duration::from_millis(config.exchange.timeout_ms),
        ));
        let orders = OrderService::new(store.clone(), reconciler.clone());
        let sweep = Arc::new(ReconciliationSweep::new(
            store,
            reconciler,
            config.reconciler.sweep_concurrency,
        ));

        Ok(Self {
            config,
            postgres,
            orders,
            sweep,
        })
    }
}

/// Execute a parsed command against an already loaded configuration.
pub async fn run(cli: Cli, config: AppConfig) -> anyhow::Result<()> {
    let mode = OutputMode::from_json_flag(cli.json);
    let runtime = Runtime::build(config, cli.store, cli.dry_run).await?;

    match &cli.command {
        Commands::Migrate => match &runtime.postgres {
            Some(pg) => {
                pg.migrate().await?;
                println!("Migrations applied");
            }
            None => println!("In-memory store needs no migrations"),
        },
        Commands::Create { .. } => {
            if let Some(request) = cli.command.create_request() {
                let creation = runtime.orders.submit_order(request).await?;
                output::print_order(&creation.order, mode)?;
                if let Err(e) = &creation.placement {
                    eprintln!("Placement failed, order left for reconciliation: {e}");
                }
            }
        }
        Commands::Get { id } => match runtime.orders.get_order(*id).await? {
            Some(order) => output::print_order(&order, mode)?,
            None => anyhow::bail!("order {id} not found"),
        },
        Commands::Sweep => {
            let report = runtime.sweep.sweep_unplaced_orders().await?;
            output::print_sweep_report(&report, mode)?;
        }
        Commands::Run => {
            let scheduler = SweepScheduler::new(
                runtime.sweep.clone(),
                Duration::from_secs(runtime.config.reconciler.sweep_interval_secs),
            );
            let handle = scheduler.start();

            tokio::signal::ctrl_c().await?;
            info!("Shutdown signal received");
            scheduler.stop();
            if let Some(handle) = handle {
                handle.await?;
            }

            let stats = scheduler.get_stats().await;
            info!(
                "Reconciliation stopped after {} passes (placed={}, rejected={}, errors={}, failed_passes={})",
                stats.passes,
                stats.orders_placed,
                stats.orders_rejected,
                stats.attempt_errors,
                stats.failed_passes
            );
        }
    }

    Ok(())
}
