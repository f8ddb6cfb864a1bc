//! Engine-wide tunables.
//!
//! One serde-friendly [`EngineConfig`] feeds the per-component configs.
//! Every field is optional in JSON; missing fields take the defaults below.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::classify::ClassifierConfig;
use crate::conflict::DetectionOptions;
use crate::error::{Result, SchedulingError};
use crate::recurrence::DEFAULT_MAX_OCCURRENCES;
use crate::slots::SlotFinderConfig;
use crate::timezone::ZoneId;

/// Upper bound for either horizon, about ten years.
pub const MAX_HORIZON_DAYS: u32 = 3660;

/// Upper bound for the slot step: one day.
pub const MAX_SLOT_STEP_MINUTES: u32 = 24 * 60;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Disjoint appointments closer than this are `Adjacent`.
    pub adjacent_gap_minutes: u32,
    pub slot_step_minutes: u32,
    /// How far ahead the slot finder looks.
    pub search_horizon_days: u32,
    /// Default window for recurring expansion during detection.
    pub recurrence_horizon_days: u32,
    pub max_occurrences: u16,
    pub default_time_zone: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            adjacent_gap_minutes: 15,
            slot_step_minutes: 15,
            search_horizon_days: 14,
            recurrence_horizon_days: 90,
            max_occurrences: DEFAULT_MAX_OCCURRENCES,
            default_time_zone: "UTC".to_string(),
        }
    }
}

impl EngineConfig {
    /// Parse and validate a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: EngineConfig = serde_json::from_str(json)
            .map_err(|e| SchedulingError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("slot_step_minutes", self.slot_step_minutes),
            ("search_horizon_days", self.search_horizon_days),
            ("recurrence_horizon_days", self.recurrence_horizon_days),
            ("max_occurrences", u32::from(self.max_occurrences)),
        ];
        if let Some((name, _)) = positive.iter().find(|(_, value)| *value == 0) {
            return Err(SchedulingError::InvalidConfig(format!(
                "{name} must be greater than zero"
            )));
        }

        let bounded = [
            ("slot_step_minutes", self.slot_step_minutes, MAX_SLOT_STEP_MINUTES),
            ("search_horizon_days", self.search_horizon_days, MAX_HORIZON_DAYS),
            ("recurrence_horizon_days", self.recurrence_horizon_days, MAX_HORIZON_DAYS),
        ];
        if let Some((name, value, max)) = bounded.iter().find(|(_, value, max)| value > max) {
            return Err(SchedulingError::InvalidConfig(format!(
                "{name} must be at most {max}, got {value}"
            )));
        }
        self.default_zone().map(|_| ())
    }

    pub fn default_zone(&self) -> Result<ZoneId> {
        ZoneId::parse(&self.default_time_zone)
    }

    pub fn classifier(&self) -> ClassifierConfig {
        ClassifierConfig {
            adjacent_gap: Duration::minutes(i64::from(self.adjacent_gap_minutes)),
        }
    }

    pub fn slot_finder(&self) -> SlotFinderConfig {
        SlotFinderConfig {
            step: Duration::minutes(i64::from(self.slot_step_minutes)),
            horizon: Duration::days(i64::from(self.search_horizon_days)),
        }
    }

    pub fn detection(&self) -> DetectionOptions {
        DetectionOptions {
            classifier: self.classifier(),
            horizon: None,
            recurrence_horizon: Duration::days(i64::from(self.recurrence_horizon_days)),
            max_occurrences: self.max_occurrences,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_components() {
        let config = EngineConfig::default();
        assert_eq!(config.classifier(), ClassifierConfig::default());
        assert_eq!(config.slot_finder(), SlotFinderConfig::default());
        assert_eq!(config.detection(), DetectionOptions::default());
        assert_eq!(config.default_zone().unwrap(), ZoneId::UTC);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let json = r#"{"adjacent_gap_minutes": 30, "default_time_zone": "Europe/London"}"#;
        let config = EngineConfig::from_json_str(json).unwrap();
        assert_eq!(config.classifier().adjacent_gap, Duration::minutes(30));
        assert_eq!(config.slot_step_minutes, 15);
        assert_eq!(config.default_zone().unwrap().name(), "Europe/London");
    }

    #[test]
    fn test_zero_step_rejected() {
        let err = EngineConfig::from_json_str(r#"{"slot_step_minutes": 0}"#).unwrap_err();
        assert!(err.to_string().contains("slot_step_minutes"), "got: {err}");
    }

    #[test]
    fn test_out_of_range_horizons_rejected() {
        for json in [
            r#"{"search_horizon_days": 4000000000}"#,
            r#"{"recurrence_horizon_days": 4000000000}"#,
            r#"{"slot_step_minutes": 2000}"#,
        ] {
            let err = EngineConfig::from_json_str(json).unwrap_err();
            assert!(
                matches!(&err, SchedulingError::InvalidConfig(msg) if msg.contains("at most")),
                "{json}: {err}"
            );
        }
    }

    #[test]
    fn test_horizon_at_bound_accepted() {
        let json = format!(r#"{{"recurrence_horizon_days": {MAX_HORIZON_DAYS}}}"#);
        assert!(EngineConfig::from_json_str(&json).is_ok());
    }

    #[test]
    fn test_bad_zone_rejected() {
        assert!(matches!(
            EngineConfig::from_json_str(r#"{"default_time_zone": "Mars/Olympus"}"#),
            Err(SchedulingError::InvalidTimeZone(_))
        ));
    }

    #[test]
    fn test_malformed_json_rejected() {
        assert!(matches!(
            EngineConfig::from_json_str("{"),
            Err(SchedulingError::InvalidConfig(_))
        ));
    }
}
