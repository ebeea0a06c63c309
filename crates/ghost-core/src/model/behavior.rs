use core::fmt;
use core::str::FromStr;
use serde::{Deserialize, Serialize};

/// How strongly a ghost prefers moves that keep its distance from the pursuer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BehaviorMode {
    #[default]
    #[serde(alias = "confused")]
    Neutral,
    #[serde(alias = "afraid")]
    Cautious,
    #[serde(alias = "scared")]
    Evasive,
}

impl BehaviorMode {
    pub const ALL: [BehaviorMode; 3] = [
        BehaviorMode::Neutral,
        BehaviorMode::Cautious,
        BehaviorMode::Evasive,
    ];

    /// Weight given to a fleeing move relative to any other admissible move.
    pub const fn intensity(self) -> f64 {
        match self {
            BehaviorMode::Neutral => 1.0,
            BehaviorMode::Cautious => 2.0,
            BehaviorMode::Evasive => 8.0,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            BehaviorMode::Neutral => "neutral",
            BehaviorMode::Cautious => "cautious",
            BehaviorMode::Evasive => "evasive",
        }
    }
}

impl FromStr for BehaviorMode {
    type Err = UnknownBehavior;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "neutral" | "confused" => Ok(BehaviorMode::Neutral),
            "cautious" | "afraid" => Ok(BehaviorMode::Cautious),
            "evasive" | "scared" => Ok(BehaviorMode::Evasive),
            _ => Err(UnknownBehavior(value.to_string())),
        }
    }
}

impl fmt::Display for BehaviorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown behavior mode '{0}' (expected neutral, cautious or evasive)")]
pub struct UnknownBehavior(pub String);

#[cfg(test)]
mod tests {
    use super::BehaviorMode;

    #[test]
    fn intensities_follow_mode_order() {
        assert_eq!(BehaviorMode::Neutral.intensity(), 1.0);
        assert_eq!(BehaviorMode::Cautious.intensity(), 2.0);
        assert_eq!(BehaviorMode::Evasive.intensity(), 8.0);
    }

    #[test]
    fn parses_canonical_and_legacy_names() {
        assert_eq!("neutral".parse::<BehaviorMode>(), Ok(BehaviorMode::Neutral));
        assert_eq!("Afraid".parse::<BehaviorMode>(), Ok(BehaviorMode::Cautious));
        assert_eq!(" SCARED ".parse::<BehaviorMode>(), Ok(BehaviorMode::Evasive));
        assert!("sleepy".parse::<BehaviorMode>().is_err());
    }

    #[test]
    fn deserializes_legacy_aliases() {
        let mode: BehaviorMode = serde_json::from_str("\"confused\"").unwrap();
        assert_eq!(mode, BehaviorMode::Neutral);
        let mode: BehaviorMode = serde_json::from_str("\"evasive\"").unwrap();
        assert_eq!(mode, BehaviorMode::Evasive);
        assert_eq!(
            serde_json::to_string(&BehaviorMode::Cautious).unwrap(),
            "\"cautious\""
        );
    }

    #[test]
    fn display_matches_as_str() {
        for mode in BehaviorMode::ALL {
            assert_eq!(mode.to_string(), mode.as_str());
        }
    }
}
