//! Append-only educational log records.
//!
//! Every record copies the catalog text it references at creation time, so a
//! log entry never changes meaning after the fact.

use crate::catalog::{AttackKind, DefenseKind, Sophistication};
use serde::Serialize;
use uuid::Uuid;

/// Short prefixed id for log entries, e.g. `atk_1f2e3d4c`.
pub fn short_id(prefix: &str) -> String {
    let uuid = Uuid::new_v4().simple().to_string();
    format!("{}_{}", prefix, &uuid[..8])
}

/// Lifecycle of one attack instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AttackStatus {
    Initiated,
    Blocked,
    Succeeded,
    Cancelled,
}

impl AttackStatus {
    /// Terminal states admit no further transitions.
    pub fn is_terminal(self) -> bool {
        !matches!(self, AttackStatus::Initiated)
    }
}

/// Per-sophistication context copied from the attack catalog at initiation.
#[derive(Debug, Clone, Serialize)]
pub struct AttackData {
    pub bypass_chance: f64,
    pub sophistication_desc: String,
}

/// One attack instance. Immutable once created except for `status`.
#[derive(Debug, Clone, Serialize)]
pub struct AttackLog {
    pub id: String,
    pub timestamp: f64,
    pub attack_type: AttackKind,
    pub attacker_id: String,
    /// Up to 3 vehicles within double communication range at initiation,
    /// in discovery order.
    pub target_ids: Vec<String>,
    pub sophistication: Sophistication,
    pub status: AttackStatus,
    pub description: String,
    pub severity: String,
    pub icon: String,
    pub attack_data: AttackData,
    pub educational_context: String,
}

impl AttackLog {
    /// Builds an `initiated` log, snapshotting catalog text for `kind`.
    pub fn initiated(
        kind: AttackKind,
        attacker_id: &str,
        target_ids: Vec<String>,
        sophistication: Sophistication,
        timestamp: f64,
    ) -> Self {
        let profile = kind.profile();
        let tier = profile.tier(sophistication);
        Self {
            id: short_id("atk"),
            timestamp,
            attack_type: kind,
            attacker_id: attacker_id.to_string(),
            target_ids,
            sophistication,
            status: AttackStatus::Initiated,
            description: profile.description.to_string(),
            severity: profile.severity.to_string(),
            icon: profile.icon.to_string(),
            attack_data: AttackData {
                bypass_chance: tier.bypass_chance,
                sophistication_desc: tier.description.to_string(),
            },
            educational_context: profile.educational_notes.to_string(),
        }
    }
}

/// One defense mechanism's verdict against one attack.
#[derive(Debug, Clone, Serialize)]
pub struct DefenseLog {
    pub id: String,
    pub timestamp: f64,
    pub defense_type: DefenseKind,
    pub attack_id: String,
    pub attacker_id: String,
    pub action_taken: String,
    pub success: bool,
    pub detection_time: f64,
    /// Adjusted effectiveness / 100.
    pub confidence: f64,
    pub explanation: String,
    pub icon: String,
}

/// Final verdict of one attack vs. defense interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeResult {
    Blocked,
    FullSuccess,
}

/// Summary tying an attack to all of its defense verdicts.
#[derive(Debug, Clone, Serialize)]
pub struct AttackOutcome {
    pub id: String,
    pub timestamp: f64,
    pub attack_id: String,
    pub defense_ids: Vec<String>,
    pub result: OutcomeResult,
    pub impact_description: String,
    pub learning_points: String,
    pub attack_succeeded: bool,
    pub defenses_triggered: usize,
}

/// Periodic vehicle status beacon (Basic Safety Message).
#[derive(Debug, Clone, Serialize)]
pub struct BeaconMessage {
    pub id: String,
    pub sender_id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub timestamp: f64,
    pub lat: f64,
    pub lon: f64,
    pub speed: f64,
    pub heading: f64,
}

/// A vehicle pair that exchanged beacons this tick.
#[derive(Debug, Clone, Serialize)]
pub struct V2vLink {
    pub from: String,
    pub to: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub distance: f64,
}

/// A detected anomaly (impossible beacon contents or a hack event).
#[derive(Debug, Clone, Serialize)]
pub struct Anomaly {
    pub id: String,
    pub timestamp: f64,
    pub sender: String,
    /// The active attack key, or `None` when the origin is unknown.
    #[serde(rename = "type", serialize_with = "attack_type_or_unknown")]
    pub attack_type: Option<AttackKind>,
    pub reason: String,
    pub severity: String,
}

/// Anomalies of unknown origin carry the literal key `"unknown"` on the
/// wire, not `null`.
fn attack_type_or_unknown<S>(
    kind: &Option<AttackKind>,
    serializer: S,
) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    match kind {
        Some(kind) => kind.serialize(serializer),
        None => serializer.serialize_str("unknown"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_id_shape() {
        let id = short_id("atk");
        assert!(id.starts_with("atk_"));
        assert_eq!(id.len(), "atk_".len() + 8);
    }

    #[test]
    fn test_attack_log_snapshots_catalog_text() {
        let log = AttackLog::initiated(
            AttackKind::Sybil,
            "v_0",
            vec!["v_1".to_string()],
            Sophistication::High,
            1.5,
        );
        assert_eq!(log.status, AttackStatus::Initiated);
        assert_eq!(log.attack_data.bypass_chance, 0.75);
        assert_eq!(log.severity, "high");
        assert!(log.description.contains("fake vehicles"));
    }

    #[test]
    fn test_anomaly_unknown_origin_serializes_as_unknown() {
        let mut anomaly = Anomaly {
            id: "a_1_v_2".to_string(),
            timestamp: 0.1,
            sender: "v_2".to_string(),
            attack_type: None,
            reason: "Impossible speed: 250 km/h (threshold: 144)".to_string(),
            severity: "medium".to_string(),
        };
        let json = serde_json::to_value(&anomaly).unwrap();
        assert_eq!(json["type"], "unknown");

        anomaly.attack_type = Some(AttackKind::Sybil);
        let json = serde_json::to_value(&anomaly).unwrap();
        assert_eq!(json["type"], "sybil");
    }

    #[test]
    fn test_terminal_states() {
        assert!(!AttackStatus::Initiated.is_terminal());
        assert!(AttackStatus::Blocked.is_terminal());
        assert!(AttackStatus::Succeeded.is_terminal());
        assert!(AttackStatus::Cancelled.is_terminal());
    }
}
