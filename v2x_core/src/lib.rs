//! V2X Security Simulation Core
//!
//! Deterministic, time-stepped model of a connected-vehicle fleet under
//! attack:
//! 1. **Traffic**: vehicles navigating a road graph with traffic lights
//! 2. **Attacks**: a catalog of V2X attack archetypes with per-target blast
//!    radius and probabilistic defense resolution
//! 3. **Telemetry**: beacons, V2V links, anomaly detection, and append-only
//!    educational log streams

pub mod attack;
pub mod catalog;
pub mod defense;
pub mod error;
pub mod lights;
pub mod logs;
pub mod road;
pub mod vehicle;
pub mod world;

// Re-export key types for convenience
pub use catalog::{AttackKind, DefenseKind, DefenseLevel, Sophistication, VehicleKind};
pub use defense::{DefenseConfig, DefenseSetting};
pub use error::ParseError;
pub use road::{BfsPathProvider, MapBounds, NodeId, PathProvider, RoadNetwork};
pub use vehicle::{Vehicle, VehicleClass, VehicleStatus, TICK_SECS};
pub use world::{ParamsPatch, SimConfig, SimParams, SimulationWorld, Snapshot, VehiclePatch};
