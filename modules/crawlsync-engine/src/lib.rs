pub mod diff;
pub mod master;
pub mod reconciler;
pub mod register;
pub mod requeue;
pub mod spec;
pub mod stats;

pub use reconciler::{Reconciler, RunOutcome, Strategy};
pub use spec::{ReconcileDeps, ReconcileSpec};
