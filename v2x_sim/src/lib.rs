//! V2X Security Simulation Harness
//!
//! Drives the simulation core through preset scenarios, checks structural
//! invariants every tick, and exports sampled snapshots for offline viewing.
//!
//! All randomness derives from a single 64-bit seed: a scenario run with the
//! same seed produces the same traffic, the same attacks, and the same
//! defense outcomes every time.

mod exporter;
mod runner;
pub mod scenarios;

pub use exporter::{ExportError, SimExport, SimFrame};
pub use runner::{ScenarioMetrics, ScenarioResult, ScenarioRunner};
