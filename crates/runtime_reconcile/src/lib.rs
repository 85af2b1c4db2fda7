//! Reconciliation cycles for declarative trees.
//!
//! [`TreeInstance`] binds one tree to one surface and runs diff-then-commit
//! cycles under a [`QueuePolicy`]. [`start_reconcile_runtime`] moves a set
//! of instances onto a worker thread driven by bus commands.

mod config;
mod cycle;
mod runtime;

pub use crate::config::{ConfigError, QueuePolicy, ReconcilerConfig};
pub use crate::cycle::{Admission, CycleReport, CycleState, ReconcileError, TreeInstance};
pub use crate::runtime::start_reconcile_runtime;
