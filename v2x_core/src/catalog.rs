//! Static catalogs: attack archetypes, defense mechanisms, vehicle types,
//! and defense levels.
//!
//! The catalogs are closed enumerations resolved at compile time. Log records
//! copy the descriptive text they need at creation, so a catalog entry is
//! never referenced mutably from anywhere.

use crate::error::ParseError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Attacker skill tier. Scales both hack aggressiveness and how hard the
/// attack is for defenses to catch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sophistication {
    Low,
    Medium,
    High,
}

impl Sophistication {
    /// Multiplier applied to the attacker's per-tick hack progress.
    pub fn attack_speed_multiplier(self) -> f64 {
        match self {
            Sophistication::Low => 0.6,
            Sophistication::Medium => 1.0,
            Sophistication::High => 1.8,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Sophistication::Low => "low",
            Sophistication::Medium => "medium",
            Sophistication::High => "high",
        }
    }
}

impl Default for Sophistication {
    fn default() -> Self {
        Sophistication::Medium
    }
}

impl fmt::Display for Sophistication {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Sophistication {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(Sophistication::Low),
            "medium" => Ok(Sophistication::Medium),
            "high" => Ok(Sophistication::High),
            _ => Err(ParseError::UnknownSophistication(s.to_string())),
        }
    }
}

/// Per-vehicle self-protection tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DefenseLevel {
    Low,
    Medium,
    High,
}

/// How a defense level shapes hack resistance and defense effectiveness.
#[derive(Debug, Clone, Copy)]
pub struct DefenseLevelSpec {
    /// Human-readable label used in narrative log strings.
    pub name: &'static str,
    /// Divides the attacker's hack speed (higher = slower to hack).
    pub hack_multiplier: f64,
    /// Chance per resistance roll to throw the attacker off entirely.
    pub resist_chance: f64,
    /// Multiplier on defense-mechanism effectiveness against this target.
    pub defense_bonus: f64,
}

impl DefenseLevel {
    pub fn spec(self) -> &'static DefenseLevelSpec {
        match self {
            DefenseLevel::Low => &DefenseLevelSpec {
                name: "Low",
                hack_multiplier: 1.5,
                resist_chance: 0.0,
                defense_bonus: 0.7,
            },
            DefenseLevel::Medium => &DefenseLevelSpec {
                name: "Medium",
                hack_multiplier: 1.0,
                resist_chance: 0.15,
                defense_bonus: 1.0,
            },
            DefenseLevel::High => &DefenseLevelSpec {
                name: "High",
                hack_multiplier: 0.35,
                resist_chance: 0.4,
                defense_bonus: 1.5,
            },
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DefenseLevel::Low => "low",
            DefenseLevel::Medium => "medium",
            DefenseLevel::High => "high",
        }
    }
}

impl fmt::Display for DefenseLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Non-attacker vehicle classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VehicleKind {
    Passenger,
    Truck,
    Emergency,
    Bus,
}

/// Per-class movement and trust parameters.
#[derive(Debug, Clone, Copy)]
pub struct VehicleSpec {
    pub max_speed: f64,
    pub acceleration: f64,
    pub color: &'static str,
    pub trust: f64,
    pub icon: &'static str,
}

impl VehicleKind {
    pub const ALL: [VehicleKind; 4] = [
        VehicleKind::Passenger,
        VehicleKind::Truck,
        VehicleKind::Emergency,
        VehicleKind::Bus,
    ];

    pub fn spec(self) -> &'static VehicleSpec {
        match self {
            VehicleKind::Passenger => &VehicleSpec {
                max_speed: 60.0,
                acceleration: 3.0,
                color: "blue",
                trust: 0.9,
                icon: "car",
            },
            VehicleKind::Truck => &VehicleSpec {
                max_speed: 40.0,
                acceleration: 2.0,
                color: "green",
                trust: 0.85,
                icon: "truck",
            },
            VehicleKind::Emergency => &VehicleSpec {
                max_speed: 80.0,
                acceleration: 5.0,
                color: "red",
                trust: 0.95,
                icon: "emergency",
            },
            VehicleKind::Bus => &VehicleSpec {
                max_speed: 35.0,
                acceleration: 1.5,
                color: "orange",
                trust: 0.88,
                icon: "bus",
            },
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            VehicleKind::Passenger => "passenger",
            VehicleKind::Truck => "truck",
            VehicleKind::Emergency => "emergency",
            VehicleKind::Bus => "bus",
        }
    }
}

/// The catalog of V2X attack archetypes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttackKind {
    PositionFalsification,
    GpsSpoofing,
    Sybil,
    MessageReplay,
    DosFlooding,
    VelocitySpoofing,
    CertificateReplay,
    FalseEmergency,
    MessageSuppression,
    Illusion,
}

/// One sophistication tier of an attack archetype.
#[derive(Debug, Clone, Copy)]
pub struct SophisticationTier {
    pub description: &'static str,
    pub bypass_chance: f64,
}

/// Descriptive and numeric data for one attack archetype.
#[derive(Debug, Clone, Copy)]
pub struct AttackProfile {
    pub name: &'static str,
    pub category: &'static str,
    pub description: &'static str,
    pub severity: &'static str,
    pub real_world_example: &'static str,
    pub target_layer: &'static [&'static str],
    pub educational_notes: &'static str,
    pub icon: &'static str,
    /// Tiers indexed low, medium, high.
    pub tiers: [SophisticationTier; 3],
}

impl AttackProfile {
    pub fn tier(&self, sophistication: Sophistication) -> &SophisticationTier {
        &self.tiers[sophistication as usize]
    }
}

impl AttackKind {
    pub const ALL: [AttackKind; 10] = [
        AttackKind::PositionFalsification,
        AttackKind::GpsSpoofing,
        AttackKind::Sybil,
        AttackKind::MessageReplay,
        AttackKind::DosFlooding,
        AttackKind::VelocitySpoofing,
        AttackKind::CertificateReplay,
        AttackKind::FalseEmergency,
        AttackKind::MessageSuppression,
        AttackKind::Illusion,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AttackKind::PositionFalsification => "position_falsification",
            AttackKind::GpsSpoofing => "gps_spoofing",
            AttackKind::Sybil => "sybil",
            AttackKind::MessageReplay => "message_replay",
            AttackKind::DosFlooding => "dos_flooding",
            AttackKind::VelocitySpoofing => "velocity_spoofing",
            AttackKind::CertificateReplay => "certificate_replay",
            AttackKind::FalseEmergency => "false_emergency",
            AttackKind::MessageSuppression => "message_suppression",
            AttackKind::Illusion => "illusion",
        }
    }

    pub fn profile(self) -> &'static AttackProfile {
        match self {
            AttackKind::PositionFalsification => &AttackProfile {
                name: "Position falsification",
                category: "message_manipulation",
                description: "The attacker broadcasts false GPS coordinates in BSM messages, appearing to be somewhere it is not.",
                severity: "high",
                real_world_example: "An attacker can fake a blocked lane, forcing surrounding vehicles to brake or change lanes.",
                target_layer: &["application"],
                educational_notes: "One of the most common V2X attacks. Position data is critical for collision avoidance.",
                icon: "📍",
                tiers: [
                    SophisticationTier { description: "Random positions, easy to detect", bypass_chance: 0.1 },
                    SophisticationTier { description: "Nearby positions with plausible motion", bypass_chance: 0.4 },
                    SophisticationTier { description: "Gradual position drift, hard to detect", bypass_chance: 0.7 },
                ],
            },
            AttackKind::GpsSpoofing => &AttackProfile {
                name: "GPS spoofing",
                category: "sensor_manipulation",
                description: "Systematic spoofing of GPS signals that makes vehicles believe they are in the wrong place.",
                severity: "critical",
                real_world_example: "In 2013 researchers spoofed the GPS of a yacht, inducing navigation errors. The same applies to V2X.",
                target_layer: &["physical", "application"],
                educational_notes: "GPS spoofing compromises the entire positioning system. Unlike position falsification, the sensor itself is attacked.",
                icon: "🛰️",
                tiers: [
                    SophisticationTier { description: "GPS drift of a single vehicle", bypass_chance: 0.2 },
                    SophisticationTier { description: "Coordinated spoofing of several vehicles", bypass_chance: 0.5 },
                    SophisticationTier { description: "Gradual drift mimicking natural error", bypass_chance: 0.8 },
                ],
            },
            AttackKind::Sybil => &AttackProfile {
                name: "Sybil attack",
                category: "identity",
                description: "The attacker fabricates many fake vehicles to manipulate traffic information.",
                severity: "high",
                real_world_example: "Can fake a traffic jam by simulating many vehicles, steering route decisions.",
                target_layer: &["network", "application"],
                educational_notes: "Named after a psychiatric case study. In V2X a Sybil attack can overwhelm decision-making systems.",
                icon: "👥",
                tiers: [
                    SophisticationTier { description: "2-3 fake vehicles in one spot", bypass_chance: 0.15 },
                    SophisticationTier { description: "Distributed fake vehicles with motion", bypass_chance: 0.45 },
                    SophisticationTier { description: "Realistic coordinated fake vehicles", bypass_chance: 0.75 },
                ],
            },
            AttackKind::MessageReplay => &AttackProfile {
                name: "Message replay",
                category: "message_manipulation",
                description: "The attacker captures legitimate V2X messages and retransmits them later, faking presence.",
                severity: "medium",
                real_world_example: "Recording BSM messages near an intersection and replaying them so a vehicle seems to be there.",
                target_layer: &["application"],
                educational_notes: "Replay attacks exploit missing freshness checks. Timestamps are the key defense.",
                icon: "🔁",
                tiers: [
                    SophisticationTier { description: "Stale messages with obvious timestamps", bypass_chance: 0.1 },
                    SophisticationTier { description: "Messages only a few seconds old", bypass_chance: 0.3 },
                    SophisticationTier { description: "Timestamps rewritten in flight", bypass_chance: 0.6 },
                ],
            },
            AttackKind::DosFlooding => &AttackProfile {
                name: "DoS network flooding",
                category: "network",
                description: "The attacker floods the V2X network with junk messages, drowning out legitimate communication.",
                severity: "critical",
                real_world_example: "Network flooding can keep emergency warnings from reaching vehicles.",
                target_layer: &["network"],
                educational_notes: "DoS attacks introduce delays beyond safety-critical thresholds (100ms for warnings).",
                icon: "💥",
                tiers: [
                    SophisticationTier { description: "Plain message spam", bypass_chance: 0.2 },
                    SophisticationTier { description: "Targeted flooding of specific message types", bypass_chance: 0.5 },
                    SophisticationTier { description: "Adaptive flooding that dodges rate limits", bypass_chance: 0.8 },
                ],
            },
            AttackKind::VelocitySpoofing => &AttackProfile {
                name: "Velocity spoofing",
                category: "message_manipulation",
                description: "The attacker broadcasts false speed and acceleration data, misleading nearby vehicles.",
                severity: "high",
                real_world_example: "A fake emergency-braking report can provoke rear-end collisions.",
                target_layer: &["application"],
                educational_notes: "Speed and acceleration drive collision math. False data can trigger emergency braking.",
                icon: "⚡",
                tiers: [
                    SophisticationTier { description: "Impossible speed (500 km/h)", bypass_chance: 0.05 },
                    SophisticationTier { description: "Inflated but plausible speed", bypass_chance: 0.35 },
                    SophisticationTier { description: "Small deviations accumulating over time", bypass_chance: 0.65 },
                ],
            },
            AttackKind::CertificateReplay => &AttackProfile {
                name: "Certificate replay",
                category: "cryptographic",
                description: "The attacker signs V2X messages with expired or revoked certificates.",
                severity: "high",
                real_world_example: "Using the certificate of a decommissioned vehicle as a disguise.",
                target_layer: &["application", "cryptographic"],
                educational_notes: "IEEE 1609.2 mandates certificate checks. Revocation lists (CRLs) must be kept current.",
                icon: "🔐",
                tiers: [
                    SophisticationTier { description: "Obviously expired certificate", bypass_chance: 0.1 },
                    SophisticationTier { description: "Recently revoked certificate", bypass_chance: 0.4 },
                    SophisticationTier { description: "Valid-looking certificate with subtle flaws", bypass_chance: 0.7 },
                ],
            },
            AttackKind::FalseEmergency => &AttackProfile {
                name: "False emergency signal",
                category: "message_manipulation",
                description: "The attacker broadcasts fake ambulance warnings to clear the road ahead.",
                severity: "high",
                real_world_example: "Fake emergency signals can cause dangerous lane changes.",
                target_layer: &["application"],
                educational_notes: "Emergency-vehicle priority is a critical V2X function. False signals erode trust in it.",
                icon: "🚨",
                tiers: [
                    SophisticationTier { description: "A single false signal", bypass_chance: 0.25 },
                    SophisticationTier { description: "Coordinated false scenario", bypass_chance: 0.55 },
                    SophisticationTier { description: "Simulated approach of an ambulance", bypass_chance: 0.75 },
                ],
            },
            AttackKind::MessageSuppression => &AttackProfile {
                name: "Signal jamming",
                category: "network",
                description: "The attacker jams the V2X radio channel, blocking message reception.",
                severity: "critical",
                real_world_example: "Jamming intersection warnings can lead to collisions.",
                target_layer: &["physical", "network"],
                educational_notes: "Radio jamming is hard to defend in software. It needs physical security and frequency hopping.",
                icon: "📡",
                tiers: [
                    SophisticationTier { description: "Continuous wideband noise", bypass_chance: 0.3 },
                    SophisticationTier { description: "Selective channel jamming", bypass_chance: 0.6 },
                    SophisticationTier { description: "Reactive, trigger-driven jamming", bypass_chance: 0.85 },
                ],
            },
            AttackKind::Illusion => &AttackProfile {
                name: "Illusion attack",
                category: "message_manipulation",
                description: "Several attackers coordinate to fabricate an entirely false traffic scene.",
                severity: "critical",
                real_world_example: "Faking a highway jam to reroute traffic.",
                target_layer: &["application", "network"],
                educational_notes: "Most dangerous combined with a Sybil attack. Hard to detect without external verification.",
                icon: "🎭",
                tiers: [
                    SophisticationTier { description: "Uncoordinated false reports", bypass_chance: 0.2 },
                    SophisticationTier { description: "Coordinated scenario with gaps", bypass_chance: 0.5 },
                    SophisticationTier { description: "A perfect illusion, every detail in place", bypass_chance: 0.9 },
                ],
            },
        }
    }
}

impl fmt::Display for AttackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AttackKind {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AttackKind::ALL
            .iter()
            .find(|k| k.as_str() == s)
            .copied()
            .ok_or_else(|| ParseError::UnknownAttack(s.to_string()))
    }
}

/// The catalog of defense mechanisms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefenseKind {
    CryptographicVerification,
    PlausibilityCheck,
    TrustManagement,
    MisbehaviorDetection,
    CollaborativeVerification,
    RateLimiting,
    TimestampValidation,
}

/// Descriptive and numeric data for one defense mechanism.
#[derive(Debug, Clone, Copy)]
pub struct DefenseProfile {
    pub name: &'static str,
    pub category: &'static str,
    pub description: &'static str,
    /// Base effectiveness (percent) against low/medium/high sophistication.
    pub effectiveness: [f64; 3],
    /// Nominal detection latency in seconds.
    pub detection_time: f64,
    pub false_positive_rate: f64,
    pub educational_notes: &'static str,
    pub icon: &'static str,
    pub applicable_to: &'static [AttackKind],
}

impl DefenseProfile {
    pub fn effectiveness(&self, sophistication: Sophistication) -> f64 {
        self.effectiveness[sophistication as usize]
    }

    pub fn applies_to(&self, attack: AttackKind) -> bool {
        self.applicable_to.contains(&attack)
    }
}

impl DefenseKind {
    pub const ALL: [DefenseKind; 7] = [
        DefenseKind::CryptographicVerification,
        DefenseKind::PlausibilityCheck,
        DefenseKind::TrustManagement,
        DefenseKind::MisbehaviorDetection,
        DefenseKind::CollaborativeVerification,
        DefenseKind::RateLimiting,
        DefenseKind::TimestampValidation,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DefenseKind::CryptographicVerification => "cryptographic_verification",
            DefenseKind::PlausibilityCheck => "plausibility_check",
            DefenseKind::TrustManagement => "trust_management",
            DefenseKind::MisbehaviorDetection => "misbehavior_detection",
            DefenseKind::CollaborativeVerification => "collaborative_verification",
            DefenseKind::RateLimiting => "rate_limiting",
            DefenseKind::TimestampValidation => "timestamp_validation",
        }
    }

    pub fn profile(self) -> &'static DefenseProfile {
        match self {
            DefenseKind::CryptographicVerification => &DefenseProfile {
                name: "Cryptographic signature verification",
                category: "cryptographic",
                description: "Verifies digital signatures of V2X messages against IEEE 1609.2 certificates and the PKI.",
                effectiveness: [90.0, 70.0, 40.0],
                detection_time: 0.05,
                false_positive_rate: 0.01,
                educational_notes: "The first line of defense. Every V2X message must be signed; invalid signatures are rejected outright.",
                icon: "🔒",
                applicable_to: &[
                    AttackKind::CertificateReplay,
                    AttackKind::MessageReplay,
                    AttackKind::Sybil,
                ],
            },
            DefenseKind::PlausibilityCheck => &DefenseProfile {
                name: "Plausibility check",
                category: "behavioral",
                description: "Checks message contents against physical limits (speed caps, acceleration, position).",
                effectiveness: [95.0, 75.0, 50.0],
                detection_time: 0.1,
                false_positive_rate: 0.05,
                educational_notes: "Asks whether the data is physically possible. Speeds above 200 km/h on city streets or instant teleportation are suspect.",
                icon: "⚗️",
                applicable_to: &[
                    AttackKind::PositionFalsification,
                    AttackKind::VelocitySpoofing,
                    AttackKind::GpsSpoofing,
                    AttackKind::FalseEmergency,
                ],
            },
            DefenseKind::TrustManagement => &DefenseProfile {
                name: "Trust and reputation system",
                category: "behavioral",
                description: "Maintains a per-vehicle trust level from behavioral history. Repeated anomalies lower trust.",
                effectiveness: [60.0, 80.0, 85.0],
                detection_time: 2.0,
                false_positive_rate: 0.10,
                educational_notes: "Long-term, profile-based defense. Skilled attackers first earn trust, then attack.",
                icon: "⭐",
                applicable_to: &[
                    AttackKind::PositionFalsification,
                    AttackKind::VelocitySpoofing,
                    AttackKind::GpsSpoofing,
                    AttackKind::Illusion,
                ],
            },
            DefenseKind::MisbehaviorDetection => &DefenseProfile {
                name: "Intrusion detection system (IDS)",
                category: "behavioral",
                description: "Machine-learning anomaly detection that spots unusual patterns in V2X traffic.",
                effectiveness: [85.0, 70.0, 55.0],
                detection_time: 0.5,
                false_positive_rate: 0.15,
                educational_notes: "Statistical models of normal traffic flag deviations. Can catch previously unseen attacks.",
                icon: "🛡️",
                applicable_to: &[
                    AttackKind::DosFlooding,
                    AttackKind::Illusion,
                    AttackKind::MessageSuppression,
                    AttackKind::Sybil,
                ],
            },
            DefenseKind::CollaborativeVerification => &DefenseProfile {
                name: "Collaborative verification (V2V)",
                category: "collaborative",
                description: "Cross-checks reported information with neighboring vehicles to expose inconsistencies.",
                effectiveness: [70.0, 85.0, 75.0],
                detection_time: 1.0,
                false_positive_rate: 0.08,
                educational_notes: "If most vehicles agree and one does not, that one is suspect. Requires honest neighbors.",
                icon: "🤝",
                applicable_to: &[
                    AttackKind::PositionFalsification,
                    AttackKind::GpsSpoofing,
                    AttackKind::Sybil,
                    AttackKind::Illusion,
                ],
            },
            DefenseKind::RateLimiting => &DefenseProfile {
                name: "Message rate limiting",
                category: "network",
                description: "Caps the message rate of every vehicle to blunt DoS attacks.",
                effectiveness: [90.0, 70.0, 45.0],
                detection_time: 0.2,
                false_positive_rate: 0.05,
                educational_notes: "IEEE 1609.4 defines maximum message rates. Exceeding the thresholds indicates a DoS attack.",
                icon: "⏱️",
                applicable_to: &[AttackKind::DosFlooding, AttackKind::Sybil],
            },
            DefenseKind::TimestampValidation => &DefenseProfile {
                name: "Timestamp freshness validation",
                category: "cryptographic",
                description: "Validates message timestamps to catch replayed and stale data.",
                effectiveness: [95.0, 65.0, 40.0],
                detection_time: 0.05,
                false_positive_rate: 0.03,
                educational_notes: "Messages older than a threshold (typically 1-2 seconds) are rejected. Clock sync is critical.",
                icon: "⏰",
                applicable_to: &[AttackKind::MessageReplay],
            },
        }
    }
}

impl fmt::Display for DefenseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DefenseKind {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DefenseKind::ALL
            .iter()
            .find(|k| k.as_str() == s)
            .copied()
            .ok_or_else(|| ParseError::UnknownDefense(s.to_string()))
    }
}

/// Catalog summary handed to viewers in every snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct AttackSummary {
    pub name: &'static str,
    pub icon: &'static str,
    pub severity: &'static str,
    pub description: &'static str,
}

/// Catalog summary handed to viewers in every snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct DefenseSummary {
    pub name: &'static str,
    pub icon: &'static str,
    #[serde(rename = "type")]
    pub category: &'static str,
    pub description: &'static str,
}

/// Summaries of all attack archetypes, keyed by wire name.
pub fn attack_summaries() -> BTreeMap<AttackKind, AttackSummary> {
    AttackKind::ALL
        .iter()
        .map(|&kind| {
            let p = kind.profile();
            (
                kind,
                AttackSummary {
                    name: p.name,
                    icon: p.icon,
                    severity: p.severity,
                    description: p.description,
                },
            )
        })
        .collect()
}

/// Summaries of all defense mechanisms, keyed by wire name.
pub fn defense_summaries() -> BTreeMap<DefenseKind, DefenseSummary> {
    DefenseKind::ALL
        .iter()
        .map(|&kind| {
            let p = kind.profile();
            (
                kind,
                DefenseSummary {
                    name: p.name,
                    icon: p.icon,
                    category: p.category,
                    description: p.description,
                },
            )
        })
        .collect()
}
