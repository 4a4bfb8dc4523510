//! Scenario presets for the simulation harness.

use v2x_core::{AttackKind, ParamsPatch, Sophistication};

/// Scenario identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioId {
    /// Regular traffic flow without attacks
    Normal,

    /// Dense traffic with an extended communication range
    Heavy,

    /// High-speed traffic with relaxed anomaly detection
    Highway,

    /// Sybil attack demonstration at high detection sensitivity
    AttackDemo,

    /// Message-replay attack against sluggish detection
    Replay,

    /// DoS flooding with a crowded radio environment
    Flood,
}

/// Everything a preset changes relative to the default world.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScenarioPreset {
    /// Parameter overrides applied before the run starts.
    pub params: ParamsPatch,
    /// Attack switched on for the whole run, if any.
    pub attack: Option<(AttackKind, Sophistication)>,
}

impl ScenarioId {
    /// Returns a list of all scenarios.
    pub fn all() -> Vec<ScenarioId> {
        vec![
            ScenarioId::Normal,
            ScenarioId::Heavy,
            ScenarioId::Highway,
            ScenarioId::AttackDemo,
            ScenarioId::Replay,
            ScenarioId::Flood,
        ]
    }

    /// Returns the scenario name.
    pub fn name(&self) -> &'static str {
        match self {
            ScenarioId::Normal => "normal",
            ScenarioId::Heavy => "heavy",
            ScenarioId::Highway => "highway",
            ScenarioId::AttackDemo => "attack_demo",
            ScenarioId::Replay => "replay",
            ScenarioId::Flood => "flood",
        }
    }

    /// Returns a description of the scenario.
    pub fn description(&self) -> &'static str {
        match self {
            ScenarioId::Normal => "Regular traffic flow without attacks",
            ScenarioId::Heavy => "Dense traffic with many V2V interactions",
            ScenarioId::Highway => "High-speed traffic simulation",
            ScenarioId::AttackDemo => "Sybil attack against high detection sensitivity",
            ScenarioId::Replay => "Message replay against low detection sensitivity",
            ScenarioId::Flood => "DoS flooding with extended communication range",
        }
    }

    /// Returns the overrides this scenario applies to a fresh world.
    pub fn preset(&self) -> ScenarioPreset {
        match self {
            ScenarioId::Normal => ScenarioPreset {
                params: ParamsPatch {
                    global_speed_multiplier: Some(1.0),
                    detection_sensitivity: Some(0.7),
                    ..Default::default()
                },
                attack: None,
            },
            ScenarioId::Heavy => ScenarioPreset {
                params: ParamsPatch {
                    global_speed_multiplier: Some(0.5),
                    communication_range: Some(0.008),
                    ..Default::default()
                },
                attack: None,
            },
            ScenarioId::Highway => ScenarioPreset {
                params: ParamsPatch {
                    global_speed_multiplier: Some(2.0),
                    detection_sensitivity: Some(0.5),
                    ..Default::default()
                },
                attack: None,
            },
            ScenarioId::AttackDemo => ScenarioPreset {
                params: ParamsPatch {
                    detection_sensitivity: Some(0.9),
                    ..Default::default()
                },
                attack: Some((AttackKind::Sybil, Sophistication::Medium)),
            },
            ScenarioId::Replay => ScenarioPreset {
                params: ParamsPatch {
                    detection_sensitivity: Some(0.3),
                    ..Default::default()
                },
                attack: Some((AttackKind::MessageReplay, Sophistication::High)),
            },
            ScenarioId::Flood => ScenarioPreset {
                params: ParamsPatch {
                    communication_range: Some(0.01),
                    ..Default::default()
                },
                attack: Some((AttackKind::DosFlooding, Sophistication::Low)),
            },
        }
    }

    /// Returns true if the scenario demonstrates an attack.
    pub fn has_attack(&self) -> bool {
        self.preset().attack.is_some()
    }
}

impl std::fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ScenarioId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "normal" => Ok(ScenarioId::Normal),
            "heavy" => Ok(ScenarioId::Heavy),
            "highway" | "highspeed" => Ok(ScenarioId::Highway),
            "attack_demo" | "attackdemo" => Ok(ScenarioId::AttackDemo),
            "replay" => Ok(ScenarioId::Replay),
            "flood" => Ok(ScenarioId::Flood),
            _ => Err(format!("Unknown scenario: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_round_trips() {
        for id in ScenarioId::all() {
            assert_eq!(id.name().parse::<ScenarioId>().unwrap(), id);
        }
        assert!("carmageddon".parse::<ScenarioId>().is_err());
    }

    #[test]
    fn test_attack_presets_carry_an_attack() {
        assert!(ScenarioId::AttackDemo.has_attack());
        assert!(ScenarioId::Flood.has_attack());
        assert!(!ScenarioId::Normal.has_attack());
        assert!(!ScenarioId::Heavy.has_attack());
    }
}
