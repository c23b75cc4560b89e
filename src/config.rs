use crate::error::{ModelError, ModelResult};
use serde::{Deserialize, Serialize};

pub const DEFAULT_MINUTES_PER_DAY: i32 = 480;
pub const DEFAULT_MINUTES_PER_WEEK: i32 = 2400;
pub const DEFAULT_MINUTES_PER_MONTH: i32 = 9600;
pub const DEFAULT_MINUTES_PER_YEAR: i32 = 115_200;
pub const DEFAULT_DAYS_PER_MONTH: i32 = 20;

/// Build-time settings for a [`crate::ProjectFile`].
///
/// The time values are system defaults: project properties override them, and
/// calendars override those in turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub minutes_per_day: i32,
    pub minutes_per_week: i32,
    pub minutes_per_month: i32,
    pub minutes_per_year: i32,
    pub days_per_month: i32,
    /// Memoise calendar resolutions per (calendar, date). Only honoured when the
    /// `resolve-cache` feature is enabled.
    pub cache_resolutions: bool,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            minutes_per_day: DEFAULT_MINUTES_PER_DAY,
            minutes_per_week: DEFAULT_MINUTES_PER_WEEK,
            minutes_per_month: DEFAULT_MINUTES_PER_MONTH,
            minutes_per_year: DEFAULT_MINUTES_PER_YEAR,
            days_per_month: DEFAULT_DAYS_PER_MONTH,
            cache_resolutions: true,
        }
    }
}

impl ModelConfig {
    pub fn from_json_str(json: &str) -> ModelResult<Self> {
        let config: ModelConfig = serde_json::from_str(json)
            .map_err(|err| ModelError::UnsupportedInput(format!("model config: {err}")))?;
        config.validate()?;
        Ok(config)
    }

    pub(crate) fn validate(&self) -> ModelResult<()> {
        let values = [
            ("minutes_per_day", self.minutes_per_day),
            ("minutes_per_week", self.minutes_per_week),
            ("minutes_per_month", self.minutes_per_month),
            ("minutes_per_year", self.minutes_per_year),
            ("days_per_month", self.days_per_month),
        ];
        for (name, value) in values {
            if value <= 0 {
                return Err(ModelError::UnsupportedInput(format!(
                    "model config {name} must be positive (got {value})"
                )));
            }
        }
        Ok(())
    }

    pub fn time_defaults(&self) -> TimeDefaults {
        TimeDefaults {
            minutes_per_day: self.minutes_per_day,
            minutes_per_week: self.minutes_per_week,
            minutes_per_month: self.minutes_per_month,
            minutes_per_year: self.minutes_per_year,
            days_per_month: self.days_per_month,
        }
    }
}

/// Resolved time-unit conversion factors used by [`crate::Duration::convert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeDefaults {
    pub minutes_per_day: i32,
    pub minutes_per_week: i32,
    pub minutes_per_month: i32,
    pub minutes_per_year: i32,
    pub days_per_month: i32,
}

impl Default for TimeDefaults {
    fn default() -> Self {
        ModelConfig::default().time_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config = ModelConfig::from_json_str(r#"{"minutes_per_day": 420}"#).unwrap();
        assert_eq!(config.minutes_per_day, 420);
        assert_eq!(config.minutes_per_week, DEFAULT_MINUTES_PER_WEEK);
        assert!(config.cache_resolutions);
    }

    #[test]
    fn non_positive_values_are_rejected() {
        let err = ModelConfig::from_json_str(r#"{"days_per_month": 0}"#).unwrap_err();
        assert!(matches!(err, ModelError::UnsupportedInput(_)));
    }
}
