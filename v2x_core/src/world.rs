//! SimulationWorld: the aggregate root.
//!
//! Owns the road network, lights, vehicles, attack engine, and log streams.
//! `step()` advances everything by one tick and returns a full snapshot;
//! `snapshot()` returns the same shape without advancing. All mutation goes
//! through one `&mut self` surface: callers serialize access (single writer).

use crate::attack::AttackEngine;
use crate::catalog::{
    attack_summaries, defense_summaries, AttackKind, AttackSummary, DefenseKind, DefenseLevel,
    DefenseSummary, Sophistication, VehicleKind,
};
use crate::defense::{default_defense_config, DefenseConfig};
use crate::lights::{TrafficLight, TrafficLightController};
use crate::logs::{Anomaly, AttackLog, AttackOutcome, BeaconMessage, DefenseLog, V2vLink};
use crate::road::{BfsPathProvider, MapBounds, NodeId, PathProvider, RoadNetwork};
use crate::vehicle::{advance_vehicle, Vehicle, VehicleClass, VehicleStatus, TICK_SECS};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Attack/defense rolls draw from a separately-derived stream so changing
/// the motion draw count does not perturb attack outcomes.
const ROLL_SEED_SALT: u64 = 0x9e3779b97f4a7c15;

/// Snapshot caps: most-recent-N retained for viewers.
const ATTACK_LOG_CAP: usize = 20;
const DEFENSE_LOG_CAP: usize = 20;
const OUTCOME_LOG_CAP: usize = 10;
const ANOMALY_CAP: usize = 10;

/// Hack recovery span in ticks (~5 simulated seconds).
const HACK_RECOVERY_TICKS: u32 = 50;

/// Structural configuration for a world instance.
#[derive(Debug, Clone, Copy)]
pub struct SimConfig {
    /// Master seed; all randomness derives from it.
    pub seed: u64,
    /// Requested vehicle population (may come up short on bad path draws).
    pub vehicle_count: usize,
    /// Leading vehicles converted into attackers.
    pub attacker_count: usize,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            vehicle_count: 10,
            attacker_count: 1,
        }
    }
}

/// Live tunable parameters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SimParams {
    pub global_speed_multiplier: f64,
    pub message_frequency: f64,
    pub detection_sensitivity: f64,
    pub communication_range: f64,
}

impl Default for SimParams {
    fn default() -> Self {
        Self {
            global_speed_multiplier: 0.5,
            message_frequency: 1.0,
            detection_sensitivity: 0.7,
            communication_range: 0.005,
        }
    }
}

/// Partial parameter update. Every recognized field is enumerated here;
/// unknown keys are rejected at deserialization.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParamsPatch {
    pub global_speed_multiplier: Option<f64>,
    pub message_frequency: Option<f64>,
    pub detection_sensitivity: Option<f64>,
    pub communication_range: Option<f64>,
}

/// Partial per-vehicle update. Same explicit-field policy as `ParamsPatch`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VehiclePatch {
    pub defense_level: Option<DefenseLevel>,
    pub max_speed: Option<f64>,
    pub trust_score: Option<f64>,
    pub color: Option<String>,
}

/// Road data as exposed to viewers.
#[derive(Debug, Clone, Serialize)]
pub struct RoadsSnapshot {
    pub nodes: BTreeMap<NodeId, (f64, f64)>,
    pub edges: Vec<(NodeId, NodeId)>,
    pub lights: BTreeMap<NodeId, TrafficLight>,
}

/// Full world state handed to viewers every tick. All fields are always
/// present; `messages` is empty on a paused (non-advancing) snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub step: u64,
    pub vehicles: Vec<Vehicle>,
    pub messages: Vec<BeaconMessage>,
    pub v2v_communications: Vec<V2vLink>,
    pub anomalies: Vec<Anomaly>,
    pub active_attack: Option<AttackKind>,
    pub params: SimParams,
    pub bounds: MapBounds,
    pub roads: RoadsSnapshot,
    pub attack_logs: Vec<AttackLog>,
    pub defense_logs: Vec<DefenseLog>,
    pub outcome_logs: Vec<AttackOutcome>,
    pub active_attacks_count: usize,
    pub defense_config: DefenseConfig,
    pub attack_sophistication: Sophistication,
    pub available_attacks: BTreeMap<AttackKind, AttackSummary>,
    pub available_defenses: BTreeMap<DefenseKind, DefenseSummary>,
}

/// The aggregate root. One instance per simulation; exclusively owns all
/// mutable collections.
pub struct SimulationWorld {
    config: SimConfig,
    params: SimParams,
    bounds: MapBounds,
    is_running: bool,
    tick: u64,
    road: RoadNetwork,
    lights: TrafficLightController,
    vehicles: Vec<Vehicle>,
    engine: AttackEngine,
    defense_config: DefenseConfig,
    provider: Box<dyn PathProvider + Send>,
    /// This tick's anomaly window (most recent 10).
    anomalies: Vec<Anomaly>,
    /// This tick's proximity links.
    v2v_links: Vec<V2vLink>,
    /// World generation and motion draws.
    world_rng: ChaCha8Rng,
    /// Attack, defense, and hack draws.
    roll_rng: ChaCha8Rng,
}

impl SimulationWorld {
    pub fn new(config: SimConfig) -> Self {
        Self::with_provider(config, Box::new(BfsPathProvider))
    }

    /// Builds a world with a custom shortest-path provider.
    pub fn with_provider(config: SimConfig, provider: Box<dyn PathProvider + Send>) -> Self {
        let mut world = Self {
            config,
            params: SimParams::default(),
            bounds: MapBounds::default(),
            is_running: false,
            tick: 0,
            road: RoadNetwork::lower_manhattan(),
            lights: TrafficLightController::default(),
            vehicles: Vec::new(),
            engine: AttackEngine::new(),
            defense_config: default_defense_config(),
            provider,
            anomalies: Vec::new(),
            v2v_links: Vec::new(),
            world_rng: ChaCha8Rng::seed_from_u64(config.seed),
            roll_rng: ChaCha8Rng::seed_from_u64(config.seed.wrapping_mul(ROLL_SEED_SALT)),
        };
        world.regenerate();
        world
    }

    /// Simulated wall clock in seconds.
    pub fn now(&self) -> f64 {
        self.tick as f64 * TICK_SECS
    }

    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    pub fn is_running(&self) -> bool {
        self.is_running
    }

    pub fn params(&self) -> &SimParams {
        &self.params
    }

    pub fn vehicles(&self) -> &[Vehicle] {
        &self.vehicles
    }

    pub fn active_attack(&self) -> Option<AttackKind> {
        self.engine.active_kind()
    }

    // ── Control surface ─────────────────────────────────────────────────

    pub fn start(&mut self) {
        self.is_running = true;
    }

    pub fn stop(&mut self) {
        self.is_running = false;
    }

    /// Discards all simulation state and regenerates the world from the
    /// seed. Operator settings (params, defense configuration, attack
    /// sophistication) survive a reset.
    pub fn reset(&mut self) {
        self.is_running = false;
        self.tick = 0;
        self.engine.reset();
        self.anomalies.clear();
        self.v2v_links.clear();
        self.world_rng = ChaCha8Rng::seed_from_u64(self.config.seed);
        self.roll_rng =
            ChaCha8Rng::seed_from_u64(self.config.seed.wrapping_mul(ROLL_SEED_SALT));
        self.regenerate();
        info!(vehicles = self.vehicles.len(), "world reset");
    }

    /// Selects or clears the demonstrated attack type.
    pub fn set_attack(&mut self, kind: Option<AttackKind>, sophistication: Sophistication) {
        let tick = self.tick;
        let now = self.now();
        let range = self.params.communication_range;
        self.engine.set_active_attack(
            kind,
            sophistication,
            tick,
            now,
            &mut self.vehicles,
            range,
            &mut self.roll_rng,
        );
    }

    /// Applies every field present in the patch; absent fields are kept.
    pub fn update_params(&mut self, patch: ParamsPatch) {
        if let Some(v) = patch.global_speed_multiplier {
            self.params.global_speed_multiplier = v;
        }
        if let Some(v) = patch.message_frequency {
            self.params.message_frequency = v;
        }
        if let Some(v) = patch.detection_sensitivity {
            self.params.detection_sensitivity = v;
        }
        if let Some(v) = patch.communication_range {
            self.params.communication_range = v;
        }
    }

    /// Patches one vehicle; silently does nothing for an unknown id.
    pub fn update_vehicle(&mut self, vehicle_id: &str, patch: VehiclePatch) {
        let Some(v) = self.vehicles.iter_mut().find(|v| v.id == vehicle_id) else {
            return;
        };
        if let Some(level) = patch.defense_level {
            v.defense_level = level;
        }
        if let Some(speed) = patch.max_speed {
            v.max_speed = speed;
        }
        if let Some(trust) = patch.trust_score {
            v.trust_score = trust;
        }
        if let Some(color) = patch.color {
            v.color = color;
        }
    }

    /// Reconfigures one defense mechanism; strength clamps to [0, 100].
    pub fn configure_defense(
        &mut self,
        kind: DefenseKind,
        enabled: Option<bool>,
        strength: Option<f64>,
    ) {
        if let Some(setting) = self.defense_config.get_mut(&kind) {
            if let Some(enabled) = enabled {
                setting.enabled = enabled;
            }
            if let Some(strength) = strength {
                setting.strength = strength.clamp(0.0, 100.0);
            }
        }
    }

    // ── Tick ────────────────────────────────────────────────────────────

    /// Advances the world one tick and returns the resulting snapshot.
    pub fn step(&mut self) -> Snapshot {
        self.tick += 1;
        let now = self.now();
        self.v2v_links.clear();
        let mut messages = Vec::new();
        let mut new_anomalies = Vec::new();

        self.lights.advance();

        self.engine.process_due(
            self.tick,
            now,
            &self.vehicles,
            &self.defense_config,
            self.params.communication_range,
            &mut self.roll_rng,
        );

        let beacon_due = self.beacon_due();

        for idx in 0..self.vehicles.len() {
            self.vehicles[idx].tick_recovery();
            if self.vehicles[idx].status == VehicleStatus::Stopped {
                continue;
            }

            if self.vehicles[idx].is_attacker && self.engine.active_kind().is_some() {
                self.run_attacker_logic(idx, now, &mut new_anomalies);
            } else {
                self.vehicles[idx].clear_hack_state();
            }

            if self.vehicles[idx].status == VehicleStatus::Moving {
                advance_vehicle(
                    &mut self.vehicles[idx],
                    &self.road,
                    &self.lights,
                    &*self.provider,
                    self.params.global_speed_multiplier,
                    &mut self.world_rng,
                );
            }

            if beacon_due {
                let beacon = self.emit_beacon(idx, now);
                if let Some(anomaly) = self.check_beacon(idx, &beacon, now) {
                    self.vehicles[idx].anomalies_detected += 1;
                    new_anomalies.push(anomaly);
                }
                messages.push(beacon);
            }
        }

        self.scan_v2v_links();

        // Only the most recent window of this tick's anomalies is retained.
        if new_anomalies.len() > ANOMALY_CAP {
            new_anomalies.drain(..new_anomalies.len() - ANOMALY_CAP);
        }
        self.anomalies = new_anomalies;

        self.assemble_snapshot(messages)
    }

    /// Current state without advancing anything (used while paused).
    pub fn snapshot(&self) -> Snapshot {
        self.assemble_snapshot(Vec::new())
    }

    // ── Internals ───────────────────────────────────────────────────────

    fn regenerate(&mut self) {
        self.road = RoadNetwork::lower_manhattan();
        self.lights = TrafficLightController::generate(&self.road, &mut self.world_rng);
        self.vehicles = self.generate_vehicles();
    }

    fn generate_vehicles(&mut self) -> Vec<Vehicle> {
        let nodes = self.road.node_ids();
        let mut vehicles = Vec::with_capacity(self.config.vehicle_count);

        for i in 0..self.config.vehicle_count {
            let mut kind = VehicleKind::ALL[self.world_rng.gen_range(0..VehicleKind::ALL.len())];
            // Freight-heavy traffic mix.
            if self.world_rng.gen::<f64>() < 0.4 {
                kind = VehicleKind::Truck;
            }
            let spec = kind.spec();

            let start = nodes[self.world_rng.gen_range(0..nodes.len())].clone();
            let mut end = start.clone();
            let mut path: Vec<NodeId> = Vec::new();
            let mut attempts = 0;
            while (end == start || path.len() < 2) && attempts < 10 {
                end = nodes[self.world_rng.gen_range(0..nodes.len())].clone();
                path = self
                    .provider
                    .shortest_path(&self.road, &start, &end)
                    .unwrap_or_default();
                attempts += 1;
            }
            if path.len() < 2 {
                // Unreachable destination draws: this candidate is skipped.
                continue;
            }

            let pos = self
                .road
                .position(&start)
                .expect("start node comes from the network");

            let defense_level = match self.world_rng.gen::<f64>() {
                r if r < 0.3 => DefenseLevel::Low,
                r if r < 0.75 => DefenseLevel::Medium,
                _ => DefenseLevel::High,
            };

            vehicles.push(Vehicle {
                id: format!("v_{}", i),
                class: VehicleClass::from(kind),
                lat: pos.x,
                lon: pos.y,
                speed: 0.0,
                heading: 0.0,
                trust_score: spec.trust,
                is_attacker: false,
                max_speed: spec.max_speed,
                color: spec.color.to_string(),
                defense_level,
                messages_sent: 0,
                messages_received: 0,
                anomalies_detected: 0,
                current_node: start.clone(),
                target_node: path[1].clone(),
                destination: end,
                path,
                status: VehicleStatus::Moving,
                progress: 0.0,
                hack_progress: 0.0,
                target_vehicle: None,
                waiting_at_light: false,
                hack_recovery_timer: 0,
            });
        }

        // Convert the leading vehicles into attackers. The attacker keeps its
        // rolled motion profile but guards itself with high self-defense.
        for v in vehicles.iter_mut().take(self.config.attacker_count) {
            v.is_attacker = true;
            v.trust_score = 0.3;
            v.color = "red".to_string();
            v.class = VehicleClass::Attacker;
            v.defense_level = DefenseLevel::High;
        }

        debug!(count = vehicles.len(), "vehicle population generated");
        vehicles
    }

    fn beacon_due(&self) -> bool {
        if self.params.message_frequency <= 0.0 {
            return false;
        }
        let interval = (10.0 / self.params.message_frequency).round().max(1.0) as u64;
        self.tick % interval == 0
    }

    /// Attacker targeting and hack progression against one victim at a time.
    fn run_attacker_logic(&mut self, attacker_idx: usize, now: f64, anomalies: &mut Vec<Anomaly>) {
        let range = self.params.communication_range;
        let active_kind = self.engine.active_kind();
        let sophistication = self.engine.sophistication();

        // Acquire a target: a random moving non-attacker within range.
        if self.vehicles[attacker_idx].target_vehicle.is_none() {
            let nearby: Vec<usize> = (0..self.vehicles.len())
                .filter(|&j| {
                    j != attacker_idx
                        && !self.vehicles[j].is_attacker
                        && self.vehicles[j].status == VehicleStatus::Moving
                        && self.vehicles[attacker_idx].distance_to(&self.vehicles[j]) < range
                })
                .collect();
            if !nearby.is_empty() {
                let pick = nearby[self.roll_rng.gen_range(0..nearby.len())];
                let target_id = self.vehicles[pick].id.clone();
                let attacker = &mut self.vehicles[attacker_idx];
                attacker.target_vehicle = Some(target_id);
                attacker.hack_progress = 0.0;
            }
        }

        let Some(target_id) = self.vehicles[attacker_idx].target_vehicle.clone() else {
            return;
        };
        let Some(target_idx) = self.vehicles.iter().position(|v| v.id == target_id) else {
            self.vehicles[attacker_idx].clear_hack_state();
            return;
        };

        if self.vehicles[target_idx].status != VehicleStatus::Moving {
            self.vehicles[attacker_idx].clear_hack_state();
            return;
        }

        // The lock holds out to 1.2x communication range.
        let dist = self.vehicles[attacker_idx].distance_to(&self.vehicles[target_idx]);
        if dist >= range * 1.2 {
            self.vehicles[attacker_idx].clear_hack_state();
            return;
        }

        let defense_spec = self.vehicles[target_idx].defense_level.spec();
        let hack_speed = 1.5 * sophistication.attack_speed_multiplier()
            / defense_spec.hack_multiplier.max(0.1);

        let (attacker, target) = pair_mut(&mut self.vehicles, attacker_idx, target_idx);
        attacker.hack_progress += hack_speed;

        // Hardened targets get a chance to shake the attacker off once the
        // hack is well underway.
        if attacker.hack_progress > 70.0
            && defense_spec.resist_chance > 0.0
            && self.roll_rng.gen::<f64>() < defense_spec.resist_chance * 0.05
        {
            let attacker_id = attacker.id.clone();
            attacker.clear_hack_state();
            target.anomalies_detected += 1;
            anomalies.push(Anomaly {
                id: format!("a_{}_{}", self.tick, target.id),
                timestamp: now,
                sender: attacker_id,
                attack_type: active_kind,
                reason: format!("Attack REPELLED by target defenses ({})", defense_spec.name),
                severity: "medium".to_string(),
            });
        } else if attacker.hack_progress >= 100.0 {
            target.status = VehicleStatus::Stopped;
            target.speed = 0.0;
            target.hack_recovery_timer = HACK_RECOVERY_TICKS;
            target.anomalies_detected += 1;
            let attacker_id = attacker.id.clone();
            attacker.clear_hack_state();
            debug!(attacker = %attacker_id, target = %target.id, "vehicle hacked");
            anomalies.push(Anomaly {
                id: format!("a_{}_{}", self.tick, target.id),
                timestamp: now,
                sender: attacker_id,
                attack_type: active_kind,
                reason: format!("Vehicle {} HACKED (defense: {})", target.id, defense_spec.name),
                severity: "high".to_string(),
            });
        }
    }

    fn emit_beacon(&mut self, idx: usize, now: f64) -> BeaconMessage {
        let v = &mut self.vehicles[idx];
        v.messages_sent += 1;
        BeaconMessage {
            id: format!("msg_{}_{}", self.tick, v.id),
            sender_id: v.id.clone(),
            kind: "BSM".to_string(),
            timestamp: now,
            lat: v.lat,
            lon: v.lon,
            speed: v.speed,
            heading: v.heading,
        }
    }

    /// Local plausibility check on an emitted beacon. Thresholds tighten as
    /// detection sensitivity rises.
    fn check_beacon(&self, idx: usize, msg: &BeaconMessage, now: f64) -> Option<Anomaly> {
        let sensitivity = self.params.detection_sensitivity;
        let v = &self.vehicles[idx];

        let speed_threshold = 200.0 - sensitivity * 80.0;
        let freshness_threshold = 10.0 - sensitivity * 6.0;

        let reason = if msg.speed > speed_threshold {
            format!(
                "Impossible speed: {:.0} km/h (threshold: {:.0})",
                msg.speed, speed_threshold
            )
        } else if msg.timestamp < now - freshness_threshold {
            format!("Replayed message (older than {:.0}s)", freshness_threshold)
        } else {
            return None;
        };

        Some(Anomaly {
            id: format!("a_{}_{}", self.tick, v.id),
            timestamp: now,
            sender: v.id.clone(),
            attack_type: if v.is_attacker {
                self.engine.active_kind()
            } else {
                None
            },
            reason,
            severity: if v.is_attacker { "high" } else { "medium" }.to_string(),
        })
    }

    /// O(n^2) pairwise proximity scan recording V2V link events.
    fn scan_v2v_links(&mut self) {
        let range = self.params.communication_range;
        for i in 0..self.vehicles.len() {
            for j in (i + 1)..self.vehicles.len() {
                let dist = self.vehicles[i].distance_to(&self.vehicles[j]);
                if dist < range {
                    self.v2v_links.push(V2vLink {
                        from: self.vehicles[i].id.clone(),
                        to: self.vehicles[j].id.clone(),
                        kind: "BSM".to_string(),
                        distance: dist,
                    });
                    self.vehicles[i].messages_received += 1;
                    self.vehicles[j].messages_received += 1;
                }
            }
        }
    }

    fn assemble_snapshot(&self, messages: Vec<BeaconMessage>) -> Snapshot {
        let roads = RoadsSnapshot {
            nodes: self
                .road
                .positions()
                .iter()
                .map(|(id, p)| (id.clone(), (p.x, p.y)))
                .collect(),
            edges: self.road.edges(),
            lights: self.lights.lights().clone(),
        };

        Snapshot {
            step: self.tick,
            vehicles: self.vehicles.clone(),
            messages,
            v2v_communications: self.v2v_links.clone(),
            anomalies: self.anomalies.clone(),
            active_attack: self.engine.active_kind(),
            params: self.params,
            bounds: self.bounds,
            roads,
            attack_logs: tail(self.engine.attack_logs(), ATTACK_LOG_CAP),
            defense_logs: tail(self.engine.defense_logs(), DEFENSE_LOG_CAP),
            outcome_logs: tail(self.engine.outcome_logs(), OUTCOME_LOG_CAP),
            active_attacks_count: self.engine.active_count(),
            defense_config: self.defense_config.clone(),
            attack_sophistication: self.engine.sophistication(),
            available_attacks: attack_summaries(),
            available_defenses: defense_summaries(),
        }
    }
}

/// Most recent `cap` entries of an append-only stream, order preserved.
fn tail<T: Clone>(items: &[T], cap: usize) -> Vec<T> {
    items[items.len().saturating_sub(cap)..].to_vec()
}

/// Disjoint mutable borrows of two vehicles.
fn pair_mut(vehicles: &mut [Vehicle], a: usize, b: usize) -> (&mut Vehicle, &mut Vehicle) {
    assert_ne!(a, b, "attacker never targets itself");
    if a < b {
        let (left, right) = vehicles.split_at_mut(b);
        (&mut left[a], &mut right[0])
    } else {
        let (left, right) = vehicles.split_at_mut(a);
        (&mut right[0], &mut left[b])
    }
}
