pub mod orders;
pub mod placement;
pub mod sweep;

pub use orders::{OrderCreation, OrderService};
pub use placement::{PlacementReconciler, PlacementReport};
pub use sweep::{ReconciliationSweep, SweepFailure, SweepReport, SweepScheduler, SweepStats};
