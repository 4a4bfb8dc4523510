//! Vehicle record and the per-tick motion model.

use crate::catalog::{DefenseLevel, VehicleKind};
use crate::lights::TrafficLightController;
use crate::road::{NodeId, PathProvider, RoadNetwork};
use nalgebra::Point2;
use rand::Rng;
use serde::Serialize;
use tracing::debug;

/// Simulated wall time per tick, in seconds.
pub const TICK_SECS: f64 = 0.1;

/// Fraction of `max_speed` a vehicle actually drives in the grid.
const CRUISE_FACTOR: f64 = 0.6;

/// Degrees of latitude per kilometer, for converting km/h into map units.
const KM_PER_DEGREE: f64 = 111.0;

/// Progress along an edge past which a red light holds the vehicle.
const LIGHT_HOLD_PROGRESS: f64 = 0.8;

/// Wire-visible vehicle class. `Attacker` replaces the rolled class when a
/// vehicle is converted into the attacker at world generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VehicleClass {
    Passenger,
    Truck,
    Emergency,
    Bus,
    Attacker,
}

impl From<VehicleKind> for VehicleClass {
    fn from(kind: VehicleKind) -> Self {
        match kind {
            VehicleKind::Passenger => VehicleClass::Passenger,
            VehicleKind::Truck => VehicleClass::Truck,
            VehicleKind::Emergency => VehicleClass::Emergency,
            VehicleKind::Bus => VehicleClass::Bus,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VehicleStatus {
    Moving,
    Stopped,
    Arrived,
}

/// Mutable vehicle record. Owned exclusively by the world.
#[derive(Debug, Clone, Serialize)]
pub struct Vehicle {
    pub id: String,
    #[serde(rename = "type")]
    pub class: VehicleClass,
    pub lat: f64,
    pub lon: f64,
    pub speed: f64,
    pub heading: f64,
    pub trust_score: f64,
    pub is_attacker: bool,
    pub max_speed: f64,
    pub color: String,
    pub defense_level: DefenseLevel,
    pub messages_sent: u64,
    pub messages_received: u64,
    pub anomalies_detected: u64,
    pub current_node: NodeId,
    pub target_node: NodeId,
    pub destination: NodeId,
    pub path: Vec<NodeId>,
    pub status: VehicleStatus,
    /// Intra-edge progress, always in [0, 1].
    pub progress: f64,
    /// Attacker-side hack meter against `target_vehicle`, in [0, 100].
    pub hack_progress: f64,
    pub target_vehicle: Option<String>,
    pub waiting_at_light: bool,
    pub hack_recovery_timer: u32,
}

impl Vehicle {
    pub fn position(&self) -> Point2<f64> {
        Point2::new(self.lat, self.lon)
    }

    /// Straight-line map distance to another vehicle, in degrees.
    pub fn distance_to(&self, other: &Vehicle) -> f64 {
        (self.position() - other.position()).norm()
    }

    /// Drops any in-progress hack against another vehicle.
    pub fn clear_hack_state(&mut self) {
        self.target_vehicle = None;
        self.hack_progress = 0.0;
    }

    /// Counts down a hacked vehicle's recovery timer; resumes motion at zero.
    pub fn tick_recovery(&mut self) {
        if self.status == VehicleStatus::Stopped && !self.is_attacker && self.hack_recovery_timer > 0
        {
            self.hack_recovery_timer -= 1;
            if self.hack_recovery_timer == 0 {
                self.status = VehicleStatus::Moving;
                debug!(vehicle = %self.id, "recovered from hack, resuming");
            }
        }
    }
}

/// Bearing from `from` toward `to`, in degrees clockwise from north.
fn bearing(from: Point2<f64>, to: Point2<f64>) -> f64 {
    let dy = to.x - from.x;
    let dx = to.y - from.y;
    dx.atan2(dy).to_degrees().rem_euclid(360.0)
}

/// Advances one `Moving` vehicle along its current edge for one tick.
///
/// Handles red-light holds near intersections, arrival at the target node,
/// re-routing at the destination, and defensive path recovery when the
/// vehicle's position desynchronizes from its path.
pub fn advance_vehicle<R: Rng>(
    v: &mut Vehicle,
    net: &RoadNetwork,
    lights: &TrafficLightController,
    provider: &dyn PathProvider,
    speed_multiplier: f64,
    rng: &mut R,
) {
    // Hold at a red light when approaching the intersection.
    if v.progress > LIGHT_HOLD_PROGRESS && lights.is_red(&v.target_node) {
        v.waiting_at_light = true;
        return;
    }
    v.waiting_at_light = false;

    let (start_pos, end_pos) = match (net.position(&v.current_node), net.position(&v.target_node)) {
        (Some(s), Some(e)) => (s, e),
        // Nodes vanished (regeneration race); leave the vehicle in place.
        _ => return,
    };

    let edge_dist = (end_pos - start_pos).norm();

    let speed_kmh = v.max_speed * CRUISE_FACTOR;
    let speed_deg_per_sec = (speed_kmh / KM_PER_DEGREE) / 3600.0;
    let move_dist = speed_deg_per_sec * TICK_SECS * speed_multiplier;

    v.speed = speed_kmh;

    if edge_dist > 0.0 {
        v.progress += move_dist / edge_dist;
    } else {
        // Degenerate zero-length edge: treat as already crossed.
        v.progress = 1.0;
    }

    if v.progress >= 1.0 {
        arrive_at_target(v, net, provider, end_pos, rng);
    } else {
        let delta = end_pos - start_pos;
        v.lat = start_pos.x + delta.x * v.progress;
        v.lon = start_pos.y + delta.y * v.progress;
        v.heading = bearing(start_pos, end_pos);
    }
}

/// Snaps the vehicle onto its target node and picks the next edge.
fn arrive_at_target<R: Rng>(
    v: &mut Vehicle,
    net: &RoadNetwork,
    provider: &dyn PathProvider,
    node_pos: Point2<f64>,
    rng: &mut R,
) {
    v.current_node = v.target_node.clone();
    v.lat = node_pos.x;
    v.lon = node_pos.y;
    v.progress = 0.0;

    if v.current_node == v.destination {
        // Destination reached: pick a fresh one and resume if routable.
        v.status = VehicleStatus::Arrived;
        let nodes = net.node_ids();
        if let Some(next) = nodes.get(rng.gen_range(0..nodes.len())) {
            v.destination = next.clone();
        }
        v.path = provider
            .shortest_path(net, &v.current_node, &v.destination)
            .unwrap_or_default();
        if v.path.len() > 1 {
            v.target_node = v.path[1].clone();
            v.status = VehicleStatus::Moving;
        }
    } else {
        match v.path.iter().position(|n| *n == v.current_node) {
            Some(idx) if idx + 1 < v.path.len() => {
                v.target_node = v.path[idx + 1].clone();
            }
            // Off-path or at the path's end: recompute from scratch.
            _ => {
                v.path = provider
                    .shortest_path(net, &v.current_node, &v.destination)
                    .unwrap_or_default();
                v.target_node = if v.path.len() > 1 {
                    v.path[1].clone()
                } else {
                    v.current_node.clone()
                };
            }
        }
    }

    if let Some(next_pos) = net.position(&v.target_node) {
        v.heading = bearing(v.position(), next_pos);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::road::BfsPathProvider;
    use approx::assert_relative_eq;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn test_vehicle(net: &RoadNetwork, from: &str, to: &str) -> Vehicle {
        let path = BfsPathProvider.shortest_path(net, from, to).unwrap();
        let pos = net.position(from).unwrap();
        Vehicle {
            id: "v_0".to_string(),
            class: VehicleClass::Passenger,
            lat: pos.x,
            lon: pos.y,
            speed: 0.0,
            heading: 0.0,
            trust_score: 0.9,
            is_attacker: false,
            max_speed: 60.0,
            color: "blue".to_string(),
            defense_level: DefenseLevel::Medium,
            messages_sent: 0,
            messages_received: 0,
            anomalies_detected: 0,
            current_node: from.to_string(),
            target_node: path[1].clone(),
            destination: to.to_string(),
            path,
            status: VehicleStatus::Moving,
            progress: 0.0,
            hack_progress: 0.0,
            target_vehicle: None,
            waiting_at_light: false,
            hack_recovery_timer: 0,
        }
    }

    #[test]
    fn test_progress_advances_and_position_interpolates() {
        let net = RoadNetwork::lower_manhattan();
        let lights = TrafficLightController::default();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut v = test_vehicle(&net, "church_fulton", "church_murray");

        let start = net.position("church_fulton").unwrap();
        advance_vehicle(&mut v, &net, &lights, &BfsPathProvider, 1.0, &mut rng);

        assert!(v.progress > 0.0 && v.progress < 1.0);
        assert!(v.position() != start);
        assert_relative_eq!(v.speed, 36.0); // 60 km/h * 0.6
    }

    #[test]
    fn test_progress_stays_in_unit_interval_over_long_run() {
        let net = RoadNetwork::lower_manhattan();
        let lights = TrafficLightController::default();
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let mut v = test_vehicle(&net, "greenwich_battery", "bway_murray");

        for _ in 0..5_000 {
            if v.status == VehicleStatus::Moving {
                advance_vehicle(&mut v, &net, &lights, &BfsPathProvider, 4.0, &mut rng);
            }
            assert!(
                (0.0..=1.0).contains(&v.progress),
                "progress escaped unit interval: {}",
                v.progress
            );
        }
    }

    #[test]
    fn test_red_light_holds_vehicle() {
        let net = RoadNetwork::lower_manhattan();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut lights = TrafficLightController::generate(&net, &mut rng);
        // church_vesey is a 4-way intersection, so it carries a light.
        lights.force_state("church_vesey", crate::lights::LightState::Red);

        let mut v = test_vehicle(&net, "church_fulton", "church_murray");
        assert_eq!(v.target_node, "church_vesey");
        v.progress = 0.9;

        advance_vehicle(&mut v, &net, &lights, &BfsPathProvider, 1.0, &mut rng);
        assert!(v.waiting_at_light);
        assert_relative_eq!(v.progress, 0.9);

        // Light turns green: the next tick advances again.
        lights.force_state("church_vesey", crate::lights::LightState::Green);
        advance_vehicle(&mut v, &net, &lights, &BfsPathProvider, 1.0, &mut rng);
        assert!(!v.waiting_at_light);
        assert!(v.progress > 0.9 || v.progress == 0.0);
    }

    #[test]
    fn test_arrival_snaps_and_advances_path() {
        let net = RoadNetwork::lower_manhattan();
        let lights = TrafficLightController::default();
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let mut v = test_vehicle(&net, "church_fulton", "church_murray");
        v.progress = 0.999;

        // Large multiplier forces crossing the node this tick.
        advance_vehicle(&mut v, &net, &lights, &BfsPathProvider, 50.0, &mut rng);

        assert_eq!(v.current_node, "church_vesey");
        assert_eq!(v.target_node, "church_barclay");
        let snapped = net.position("church_vesey").unwrap();
        assert_relative_eq!(v.lat, snapped.x);
        assert_relative_eq!(v.lon, snapped.y);
        assert_relative_eq!(v.progress, 0.0);
    }

    #[test]
    fn test_desynchronized_path_recovers() {
        let net = RoadNetwork::lower_manhattan();
        let lights = TrafficLightController::default();
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let mut v = test_vehicle(&net, "church_fulton", "church_murray");
        // Corrupt the path so the current node can never be found on it.
        v.path = vec!["greenwich_battery".to_string()];
        v.progress = 0.999;

        advance_vehicle(&mut v, &net, &lights, &BfsPathProvider, 50.0, &mut rng);

        // Path was recomputed from the new current node.
        assert_eq!(v.current_node, "church_vesey");
        assert!(v.path.first().map(String::as_str) == Some("church_vesey"));
        assert!(net.contains_edge(&v.current_node, &v.target_node));
    }

    #[test]
    fn test_recovery_timer_resumes_motion() {
        let net = RoadNetwork::lower_manhattan();
        let mut v = test_vehicle(&net, "church_fulton", "church_murray");
        v.status = VehicleStatus::Stopped;
        v.speed = 0.0;
        v.hack_recovery_timer = 3;

        for _ in 0..2 {
            v.tick_recovery();
            assert_eq!(v.status, VehicleStatus::Stopped);
        }
        v.tick_recovery();
        assert_eq!(v.status, VehicleStatus::Moving);
    }

    #[test]
    fn test_bearing_cardinal_directions() {
        let origin = Point2::new(0.0, 0.0);
        assert_relative_eq!(bearing(origin, Point2::new(1.0, 0.0)), 0.0); // north
        assert_relative_eq!(bearing(origin, Point2::new(0.0, 1.0)), 90.0); // east
        assert_relative_eq!(bearing(origin, Point2::new(-1.0, 0.0)), 180.0); // south
        assert_relative_eq!(bearing(origin, Point2::new(0.0, -1.0)), 270.0); // west
    }
}
