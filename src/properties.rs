use crate::config::{ModelConfig, TimeDefaults};
use crate::error::{EntityKind, ModelError, ModelResult};
use crate::raw::RawRecord;
use chrono::NaiveDateTime;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Project-wide header fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProjectProperties {
    pub author: Option<String>,
    pub last_author: Option<String>,
    pub project_title: Option<String>,
    pub company_name: Option<String>,
    pub start_date: Option<NaiveDateTime>,
    pub finish_date: Option<NaiveDateTime>,
    pub default_calendar_unique_id: Option<i32>,
    pub minutes_per_day: Option<i32>,
    pub minutes_per_week: Option<i32>,
    pub minutes_per_month: Option<i32>,
    pub minutes_per_year: Option<i32>,
    pub days_per_month: Option<i32>,
    /// User-defined document properties, passed through untyped.
    pub custom_properties: BTreeMap<String, Value>,
}

impl ProjectProperties {
    pub(crate) fn from_raw(record: &RawRecord) -> ModelResult<Self> {
        let kind = EntityKind::Properties;
        let positive = |field: &str| -> ModelResult<Option<i32>> {
            match record.integer(kind, field)? {
                Some(value) if value <= 0 => Err(ModelError::invalid_field(
                    kind,
                    field,
                    format!("must be positive, got {value}"),
                )),
                other => Ok(other),
            }
        };

        let custom_properties = record
            .record(kind, "custom_properties")?
            .map(|custom| {
                custom
                    .fields()
                    .map(|(name, value)| (name.to_owned(), value.clone()))
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            author: record.string(kind, "author")?,
            last_author: record.string(kind, "last_author")?,
            project_title: record.string(kind, "project_title")?,
            company_name: record.string(kind, "company_name")?,
            start_date: record.timestamp(kind, "start_date")?,
            finish_date: record.timestamp(kind, "finish_date")?,
            default_calendar_unique_id: record.integer(kind, "default_calendar_unique_id")?,
            minutes_per_day: positive("minutes_per_day")?,
            minutes_per_week: positive("minutes_per_week")?,
            minutes_per_month: positive("minutes_per_month")?,
            minutes_per_year: positive("minutes_per_year")?,
            days_per_month: positive("days_per_month")?,
            custom_properties,
        })
    }

    /// Time conversion factors: each property value when set, else the
    /// configured default.
    pub fn time_defaults(&self, config: &ModelConfig) -> TimeDefaults {
        let base = config.time_defaults();
        TimeDefaults {
            minutes_per_day: self.minutes_per_day.unwrap_or(base.minutes_per_day),
            minutes_per_week: self.minutes_per_week.unwrap_or(base.minutes_per_week),
            minutes_per_month: self.minutes_per_month.unwrap_or(base.minutes_per_month),
            minutes_per_year: self.minutes_per_year.unwrap_or(base.minutes_per_year),
            days_per_month: self.days_per_month.unwrap_or(base.days_per_month),
        }
    }
}
