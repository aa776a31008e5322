/// Monitoring engine module - handles execution of monitoring checks
///
/// This module is responsible for:
/// - Probing monitor targets over HTTP (`checker`)
/// - Deciding when a monitor is down or has recovered (`health`)
/// - Running one full probe cycle for a monitor (`executor`)
/// - Selecting due monitors on a fixed cadence (`scheduler`)
/// - Rebuilding the recent-history sparkline for dashboards (`slots`)
pub mod checker;
pub mod executor;
pub mod health;
pub mod scheduler;
pub mod slots;
pub mod types;

pub use checker::{Checker, HttpChecker};
pub use executor::MonitoringExecutor;
pub use health::{AlertKind, Transition, evaluate};
pub use scheduler::MonitoringScheduler;
pub use slots::{Slot, generate_slots, load_slots};
pub use types::{MonitorStatus, ProbeOutcome};
