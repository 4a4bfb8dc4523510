//! Attack lifecycle: initiation, scheduled resolution, re-triggering.
//!
//! The engine owns the three educational log streams and the set of
//! in-flight attacks. An attack instance moves `initiated -> blocked |
//! succeeded` through defense evaluation, or `initiated -> cancelled` when
//! the operator clears the active attack type. Terminal states are final and
//! the working entry is deleted in the same tick.

use crate::catalog::{AttackKind, Sophistication};
use crate::defense::{self, DefenseConfig};
use crate::logs::{short_id, AttackLog, AttackOutcome, AttackStatus, DefenseLog, OutcomeResult};
use crate::vehicle::Vehicle;
use rand::Rng;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Maximum vehicles recorded as targets of one attack instance.
const MAX_TARGETS: usize = 3;

/// Working state of one in-flight attack. Exists only between initiation and
/// resolution.
#[derive(Debug, Clone)]
pub struct ActiveAttack {
    pub attack_id: String,
    pub attacker_id: String,
    /// Tick at which the attack resolves.
    pub resolution_tick: u64,
    /// Re-trigger interval hint while the attack type stays selected.
    pub repeat_interval: u64,
}

/// Owns in-flight attacks and the attack / defense / outcome log streams.
#[derive(Debug, Default)]
pub struct AttackEngine {
    active_kind: Option<AttackKind>,
    sophistication: Sophistication,
    active: BTreeMap<String, ActiveAttack>,
    attack_logs: Vec<AttackLog>,
    defense_logs: Vec<DefenseLog>,
    outcome_logs: Vec<AttackOutcome>,
}

impl AttackEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Discards all logs and in-flight state (world reset). The selected
    /// sophistication tier is an operator setting and survives.
    pub fn reset(&mut self) {
        let sophistication = self.sophistication;
        *self = Self::default();
        self.sophistication = sophistication;
    }

    pub fn active_kind(&self) -> Option<AttackKind> {
        self.active_kind
    }

    pub fn sophistication(&self) -> Sophistication {
        self.sophistication
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn attack_logs(&self) -> &[AttackLog] {
        &self.attack_logs
    }

    pub fn defense_logs(&self) -> &[DefenseLog] {
        &self.defense_logs
    }

    pub fn outcome_logs(&self) -> &[AttackOutcome] {
        &self.outcome_logs
    }

    /// Selects or clears the globally active attack type.
    ///
    /// Clearing transitions every in-flight attack to `cancelled` without
    /// defense evaluation (an explicit stop is not a defensive win) and wipes
    /// all attacker targeting state. Selecting initiates one attack from the
    /// first attacker vehicle.
    pub fn set_active_attack<R: Rng>(
        &mut self,
        kind: Option<AttackKind>,
        sophistication: Sophistication,
        tick: u64,
        now: f64,
        vehicles: &mut [Vehicle],
        communication_range: f64,
        rng: &mut R,
    ) {
        self.active_kind = kind;
        self.sophistication = sophistication;

        match kind {
            None => {
                for v in vehicles.iter_mut() {
                    v.clear_hack_state();
                }
                for (attack_id, _) in std::mem::take(&mut self.active) {
                    if let Some(log) = self.attack_log_mut(&attack_id) {
                        log.status = AttackStatus::Cancelled;
                    }
                    debug!(attack = %attack_id, "attack cancelled by operator");
                }
            }
            Some(kind) => {
                let attacker_id = match vehicles.iter().find(|v| v.is_attacker) {
                    Some(a) => a.id.clone(),
                    None => return,
                };
                let resolution_delay = rng.gen_range(30..=60);
                let repeat_interval = rng.gen_range(40..=80);
                if let Some(attack_id) = self.initiate_attack(
                    kind,
                    &attacker_id,
                    sophistication,
                    tick + resolution_delay,
                    repeat_interval,
                    now,
                    vehicles,
                    communication_range,
                ) {
                    info!(
                        attack = %attack_id,
                        kind = %kind,
                        attacker = %attacker_id,
                        "attack initiated"
                    );
                }
            }
        }
    }

    /// Creates an `initiated` attack log plus its working entry.
    ///
    /// Targets are all non-attacker vehicles within double communication
    /// range of the attacker, in discovery order, capped at three. Returns
    /// `None` for an unknown attacker or when that attacker already has an
    /// in-flight attack (at most one active attack per attacker).
    #[allow(clippy::too_many_arguments)]
    pub fn initiate_attack(
        &mut self,
        kind: AttackKind,
        attacker_id: &str,
        sophistication: Sophistication,
        resolution_tick: u64,
        repeat_interval: u64,
        now: f64,
        vehicles: &[Vehicle],
        communication_range: f64,
    ) -> Option<String> {
        let attacker = vehicles.iter().find(|v| v.id == attacker_id)?;
        if self.active.values().any(|a| a.attacker_id == attacker_id) {
            return None;
        }

        let mut targets = Vec::new();
        for v in vehicles {
            if v.id != attacker_id && !v.is_attacker {
                if attacker.distance_to(v) < communication_range * 2.0 {
                    targets.push(v.id.clone());
                    if targets.len() == MAX_TARGETS {
                        break;
                    }
                }
            }
        }

        let log = AttackLog::initiated(kind, attacker_id, targets, sophistication, now);
        let attack_id = log.id.clone();
        self.attack_logs.push(log);
        self.active.insert(
            attack_id.clone(),
            ActiveAttack {
                attack_id: attack_id.clone(),
                attacker_id: attacker_id.to_string(),
                resolution_tick,
                repeat_interval,
            },
        );
        Some(attack_id)
    }

    /// Resolves every attack whose scheduled tick has arrived; while an
    /// attack type stays selected, immediately re-initiates from the same
    /// attacker so the journal keeps flowing.
    pub fn process_due<R: Rng>(
        &mut self,
        tick: u64,
        now: f64,
        vehicles: &[Vehicle],
        config: &DefenseConfig,
        communication_range: f64,
        rng: &mut R,
    ) {
        let due: Vec<ActiveAttack> = self
            .active
            .values()
            .filter(|a| a.resolution_tick <= tick)
            .cloned()
            .collect();

        for entry in due {
            self.resolve(&entry.attack_id, now, vehicles, config, rng);

            if let Some(kind) = self.active_kind {
                let resolution_delay = rng.gen_range(40..=80);
                let repeat_interval = rng.gen_range(40..=80);
                if let Some(new_id) = self.initiate_attack(
                    kind,
                    &entry.attacker_id,
                    self.sophistication,
                    tick + resolution_delay,
                    repeat_interval,
                    now,
                    vehicles,
                    communication_range,
                ) {
                    debug!(attack = %new_id, kind = %kind, "attack re-triggered");
                }
            }
        }
    }

    /// Runs defense evaluation, finalizes the attack log, records the
    /// outcome, and deletes the working entry. Idempotent: resolving an
    /// unknown or already-resolved id is a no-op.
    pub fn resolve<R: Rng>(
        &mut self,
        attack_id: &str,
        now: f64,
        vehicles: &[Vehicle],
        config: &DefenseConfig,
        rng: &mut R,
    ) {
        if self.active.remove(attack_id).is_none() {
            return;
        }
        let log_idx = match self.attack_logs.iter().rposition(|l| l.id == attack_id) {
            Some(idx) => idx,
            None => return,
        };

        // Targets are re-read live, not from the initiation snapshot.
        let (defense_logs, blocked) =
            defense::evaluate(&self.attack_logs[log_idx], vehicles, config, now, rng);

        let attack_log = &mut self.attack_logs[log_idx];
        attack_log.status = if blocked {
            AttackStatus::Blocked
        } else {
            AttackStatus::Succeeded
        };

        let outcome = build_outcome(attack_log, &defense_logs, vehicles, blocked, now);
        info!(
            attack = %attack_id,
            blocked,
            defenses = defense_logs.len(),
            "attack resolved"
        );

        self.defense_logs.extend(defense_logs);
        self.outcome_logs.push(outcome);
    }

    fn attack_log_mut(&mut self, attack_id: &str) -> Option<&mut AttackLog> {
        self.attack_logs.iter_mut().rev().find(|l| l.id == attack_id)
    }
}

/// Builds the narrative outcome record for one resolved attack.
fn build_outcome(
    attack: &AttackLog,
    defense_logs: &[DefenseLog],
    vehicles: &[Vehicle],
    blocked: bool,
    now: f64,
) -> AttackOutcome {
    let attack_name = attack.attack_type.profile().name;
    let target_list = if attack.target_ids.is_empty() {
        "no targets".to_string()
    } else {
        attack.target_ids[..attack.target_ids.len().min(3)].join(", ")
    };

    let succeeded: Vec<&str> = defense_logs
        .iter()
        .filter(|d| d.success)
        .map(|d| d.defense_type.profile().name)
        .collect();
    let failed: Vec<&str> = defense_logs
        .iter()
        .filter(|d| !d.success)
        .map(|d| d.defense_type.profile().name)
        .collect();

    let first_target_level = vehicles
        .iter()
        .find(|v| attack.target_ids.first() == Some(&v.id))
        .map(|v| v.defense_level.spec().name);

    let (result, impact_description, learning_points) = if blocked {
        let impact = format!(
            "{} against {} was blocked. Triggered: {}. No vehicles were harmed.",
            attack_name,
            target_list,
            succeeded[..succeeded.len().min(3)].join(", ")
        );
        let learning = match first_target_level {
            Some(level) => format!(
                "The targets' defense level ({}) held against a '{}' tier attack. {} of {} defenses succeeded.",
                level,
                attack.sophistication,
                succeeded.len(),
                defense_logs.len()
            ),
            None => format!(
                "Layered defense ({} mechanisms) stopped the attack.",
                succeeded.len()
            ),
        };
        (OutcomeResult::Blocked, impact, learning)
    } else {
        let impact = format!(
            "{} went through against {}. Failed: {}. Vehicles may have received falsified data.",
            attack_name,
            target_list,
            failed[..failed.len().min(3)].join(", ")
        );
        let learning = match first_target_level {
            Some(level) => format!(
                "The '{}' attack tier exceeded the defense level ({}). {} of {} defenses fell short. Raising the defense level is recommended.",
                attack.sophistication,
                level,
                failed.len(),
                defense_logs.len()
            ),
            None => format!(
                "A '{}' tier attack slipped past {} defense mechanisms.",
                attack.sophistication,
                failed.len()
            ),
        };
        (OutcomeResult::FullSuccess, impact, learning)
    };

    AttackOutcome {
        id: short_id("out"),
        timestamp: now,
        attack_id: attack.id.clone(),
        defense_ids: defense_logs.iter().map(|d| d.id.clone()).collect(),
        result,
        impact_description,
        learning_points,
        attack_succeeded: !blocked,
        defenses_triggered: defense_logs.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defense::default_defense_config;
    use crate::road::{BfsPathProvider, PathProvider, RoadNetwork};
    use crate::vehicle::{VehicleClass, VehicleStatus};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn fleet() -> Vec<Vehicle> {
        let net = RoadNetwork::lower_manhattan();
        let nodes = ["church_fulton", "church_vesey", "church_barclay", "bway_murray"];
        nodes
            .iter()
            .enumerate()
            .map(|(i, node)| {
                let pos = net.position(node).unwrap();
                let path = BfsPathProvider
                    .shortest_path(&net, node, "greenwich_battery")
                    .unwrap();
                Vehicle {
                    id: format!("v_{}", i),
                    class: if i == 0 {
                        VehicleClass::Attacker
                    } else {
                        VehicleClass::Passenger
                    },
                    lat: pos.x,
                    lon: pos.y,
                    speed: 0.0,
                    heading: 0.0,
                    trust_score: 0.9,
                    is_attacker: i == 0,
                    max_speed: 60.0,
                    color: "blue".to_string(),
                    defense_level: crate::catalog::DefenseLevel::Medium,
                    messages_sent: 0,
                    messages_received: 0,
                    anomalies_detected: 0,
                    current_node: node.to_string(),
                    target_node: path[1].clone(),
                    destination: "greenwich_battery".to_string(),
                    path,
                    status: VehicleStatus::Moving,
                    progress: 0.0,
                    hack_progress: 0.0,
                    target_vehicle: None,
                    waiting_at_light: false,
                    hack_recovery_timer: 0,
                }
            })
            .collect()
    }

    #[test]
    fn test_initiate_targets_within_double_range() {
        let vehicles = fleet();
        let mut engine = AttackEngine::new();
        // Wide range: everyone qualifies, capped at 3 but only 3 exist.
        let id = engine
            .initiate_attack(
                AttackKind::Sybil,
                "v_0",
                Sophistication::Medium,
                50,
                40,
                0.0,
                &vehicles,
                1.0,
            )
            .unwrap();
        let log = engine.attack_logs().last().unwrap();
        assert_eq!(log.id, id);
        assert_eq!(log.target_ids, vec!["v_1", "v_2", "v_3"]);
        assert_eq!(engine.active_count(), 1);

        // Zero range: no targets, but the attack still initiates.
        let mut empty_engine = AttackEngine::new();
        empty_engine
            .initiate_attack(
                AttackKind::Sybil,
                "v_0",
                Sophistication::Medium,
                50,
                40,
                0.0,
                &vehicles,
                0.0,
            )
            .unwrap();
        assert!(empty_engine.attack_logs().last().unwrap().target_ids.is_empty());
    }

    #[test]
    fn test_initiate_unknown_attacker_fails() {
        let vehicles = fleet();
        let mut engine = AttackEngine::new();
        let id = engine.initiate_attack(
            AttackKind::Sybil,
            "v_99",
            Sophistication::Medium,
            50,
            40,
            0.0,
            &vehicles,
            1.0,
        );
        assert!(id.is_none());
        assert_eq!(engine.active_count(), 0);
    }

    #[test]
    fn test_one_active_attack_per_attacker() {
        let vehicles = fleet();
        let mut engine = AttackEngine::new();
        assert!(engine
            .initiate_attack(
                AttackKind::Sybil,
                "v_0",
                Sophistication::Medium,
                50,
                40,
                0.0,
                &vehicles,
                1.0
            )
            .is_some());
        assert!(engine
            .initiate_attack(
                AttackKind::Sybil,
                "v_0",
                Sophistication::Medium,
                60,
                40,
                0.0,
                &vehicles,
                1.0
            )
            .is_none());
        assert_eq!(engine.active_count(), 1);
    }

    #[test]
    fn test_cancel_bypasses_defense_evaluation() {
        let mut vehicles = fleet();
        let mut engine = AttackEngine::new();
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        engine.set_active_attack(
            Some(AttackKind::Sybil),
            Sophistication::High,
            0,
            0.0,
            &mut vehicles,
            1.0,
            &mut rng,
        );
        assert_eq!(engine.active_count(), 1);

        engine.set_active_attack(
            None,
            Sophistication::Medium,
            5,
            0.5,
            &mut vehicles,
            1.0,
            &mut rng,
        );
        assert_eq!(engine.active_count(), 0);
        assert_eq!(
            engine.attack_logs().last().unwrap().status,
            AttackStatus::Cancelled
        );
        // No defense rolls, no outcome.
        assert!(engine.defense_logs().is_empty());
        assert!(engine.outcome_logs().is_empty());
        // Targeting state wiped on every vehicle.
        assert!(vehicles.iter().all(|v| v.target_vehicle.is_none()));
    }

    #[test]
    fn test_resolution_is_terminal_and_idempotent() {
        let vehicles = fleet();
        let config = default_defense_config();
        let mut engine = AttackEngine::new();
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let id = engine
            .initiate_attack(
                AttackKind::Sybil,
                "v_0",
                Sophistication::Medium,
                10,
                40,
                0.0,
                &vehicles,
                1.0,
            )
            .unwrap();

        engine.resolve(&id, 1.0, &vehicles, &config, &mut rng);
        let status = engine.attack_logs().last().unwrap().status;
        assert!(matches!(status, AttackStatus::Blocked | AttackStatus::Succeeded));
        assert_eq!(engine.active_count(), 0);
        assert_eq!(engine.outcome_logs().len(), 1);

        // Second resolve is a no-op: no duplicate outcome, status unchanged.
        engine.resolve(&id, 2.0, &vehicles, &config, &mut rng);
        assert_eq!(engine.outcome_logs().len(), 1);
        assert_eq!(engine.attack_logs().last().unwrap().status, status);
    }

    #[test]
    fn test_outcome_references_only_its_own_defense_logs() {
        let vehicles = fleet();
        let config = default_defense_config();
        let mut engine = AttackEngine::new();
        let mut rng = ChaCha8Rng::seed_from_u64(13);
        let id = engine
            .initiate_attack(
                AttackKind::Sybil,
                "v_0",
                Sophistication::High,
                10,
                40,
                0.0,
                &vehicles,
                1.0,
            )
            .unwrap();
        engine.resolve(&id, 1.0, &vehicles, &config, &mut rng);

        let outcome = engine.outcome_logs().last().unwrap();
        assert_eq!(outcome.attack_id, id);
        for def_id in &outcome.defense_ids {
            let log = engine
                .defense_logs()
                .iter()
                .find(|d| &d.id == def_id)
                .expect("outcome references recorded defense log");
            assert_eq!(log.attack_id, id);
        }
    }

    #[test]
    fn test_process_due_retriggers_while_type_selected() {
        let mut vehicles = fleet();
        let config = default_defense_config();
        let mut engine = AttackEngine::new();
        let mut rng = ChaCha8Rng::seed_from_u64(17);
        engine.set_active_attack(
            Some(AttackKind::DosFlooding),
            Sophistication::Medium,
            0,
            0.0,
            &mut vehicles,
            1.0,
            &mut rng,
        );

        // Run well past the first resolution window.
        engine.process_due(100, 10.0, &vehicles, &config, 1.0, &mut rng);

        assert_eq!(engine.outcome_logs().len(), 1);
        // A fresh attack instance is already in flight.
        assert_eq!(engine.active_count(), 1);
        assert_eq!(engine.attack_logs().len(), 2);
        assert_eq!(
            engine.attack_logs().last().unwrap().status,
            AttackStatus::Initiated
        );
    }

    #[test]
    fn test_process_due_stops_when_cleared() {
        let mut vehicles = fleet();
        let config = default_defense_config();
        let mut engine = AttackEngine::new();
        let mut rng = ChaCha8Rng::seed_from_u64(19);
        engine.set_active_attack(
            Some(AttackKind::Sybil),
            Sophistication::Medium,
            0,
            0.0,
            &mut vehicles,
            1.0,
            &mut rng,
        );
        engine.active_kind = None; // operator cleared between schedule and due

        engine.process_due(100, 10.0, &vehicles, &config, 1.0, &mut rng);
        assert_eq!(engine.active_count(), 0);
        assert_eq!(engine.attack_logs().len(), 1);
    }
}
