//! Raw records as produced by the parsing engine.
//!
//! A record is a flat map from field name to a primitive JSON value. Calendar
//! structures and task relation lists arrive as nested arrays of records. The
//! typed accessors here are the only place raw values are interpreted; a field
//! that is absent or `null` reads as `None`, a field with the wrong shape is an
//! [`ModelError::InvalidField`].

use crate::config::TimeDefaults;
use crate::duration::{Duration, TimeUnit};
use crate::error::{EntityKind, ModelError, ModelResult};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

const TIMESTAMP_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];
const TIME_FORMATS: [&str; 2] = ["%H:%M:%S", "%H:%M"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawRecord(Map<String, Value>);

impl RawRecord {
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Builder-style insert, handy when assembling records in code.
    pub fn with(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.insert(field, value);
        self
    }

    pub fn insert(&mut self, field: &str, value: impl Into<Value>) {
        self.0.insert(field.to_string(), value.into());
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field).filter(|value| !value.is_null())
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub(crate) fn unique_id(&self, kind: EntityKind) -> ModelResult<i32> {
        self.integer(kind, "unique_id")?
            .ok_or_else(|| ModelError::invalid_field(kind, "unique_id", "missing unique id"))
    }

    pub(crate) fn integer(&self, kind: EntityKind, field: &str) -> ModelResult<Option<i32>> {
        let Some(value) = self.get(field) else {
            return Ok(None);
        };
        let parsed = match value {
            Value::Number(number) => number
                .as_i64()
                .or_else(|| {
                    number
                        .as_f64()
                        .filter(|f| f.fract() == 0.0)
                        .map(|f| f as i64)
                })
                .and_then(|n| i32::try_from(n).ok()),
            _ => None,
        };
        parsed
            .map(Some)
            .ok_or_else(|| ModelError::invalid_field(kind, field, format!("expected integer, got {value}")))
    }

    pub(crate) fn float(&self, kind: EntityKind, field: &str) -> ModelResult<Option<f64>> {
        let Some(value) = self.get(field) else {
            return Ok(None);
        };
        value
            .as_f64()
            .map(Some)
            .ok_or_else(|| ModelError::invalid_field(kind, field, format!("expected number, got {value}")))
    }

    pub(crate) fn string(&self, kind: EntityKind, field: &str) -> ModelResult<Option<String>> {
        let Some(value) = self.get(field) else {
            return Ok(None);
        };
        value
            .as_str()
            .map(|s| Some(s.to_string()))
            .ok_or_else(|| ModelError::invalid_field(kind, field, format!("expected string, got {value}")))
    }

    pub(crate) fn boolean(&self, kind: EntityKind, field: &str) -> ModelResult<bool> {
        let Some(value) = self.get(field) else {
            return Ok(false);
        };
        value
            .as_bool()
            .ok_or_else(|| ModelError::invalid_field(kind, field, format!("expected boolean, got {value}")))
    }

    pub(crate) fn date(&self, kind: EntityKind, field: &str) -> ModelResult<Option<NaiveDate>> {
        let Some(text) = self.string(kind, field)? else {
            return Ok(None);
        };
        parse_date(&text)
            .map(Some)
            .ok_or_else(|| ModelError::invalid_field(kind, field, format!("unparseable date '{text}'")))
    }

    pub(crate) fn timestamp(
        &self,
        kind: EntityKind,
        field: &str,
    ) -> ModelResult<Option<NaiveDateTime>> {
        let Some(text) = self.string(kind, field)? else {
            return Ok(None);
        };
        parse_timestamp(&text)
            .map(Some)
            .ok_or_else(|| ModelError::invalid_field(kind, field, format!("unparseable timestamp '{text}'")))
    }

    pub(crate) fn time(&self, kind: EntityKind, field: &str) -> ModelResult<Option<NaiveTime>> {
        let Some(text) = self.string(kind, field)? else {
            return Ok(None);
        };
        parse_time(&text)
            .map(Some)
            .ok_or_else(|| ModelError::invalid_field(kind, field, format!("unparseable time '{text}'")))
    }

    /// Reads a duration written as seconds, honouring a sibling `<field>_units`.
    pub(crate) fn duration(
        &self,
        kind: EntityKind,
        field: &str,
        defaults: &TimeDefaults,
    ) -> ModelResult<Option<Duration>> {
        let Some(seconds) = self.float(kind, field)? else {
            return Ok(None);
        };
        let duration = Duration::from_seconds(seconds);
        let units_field = format!("{field}_units");
        match self.string(kind, &units_field)? {
            Some(units) => {
                let units: TimeUnit = units
                    .parse()
                    .map_err(|detail: String| ModelError::invalid_field(kind, &units_field, detail))?;
                Ok(Some(duration.convert(units, defaults)))
            }
            None => Ok(Some(duration)),
        }
    }

    pub(crate) fn record(&self, kind: EntityKind, field: &str) -> ModelResult<Option<RawRecord>> {
        let Some(value) = self.get(field) else {
            return Ok(None);
        };
        match value {
            Value::Object(map) => Ok(Some(RawRecord(map.clone()))),
            other => Err(ModelError::invalid_field(
                kind,
                field,
                format!("expected object, got {other}"),
            )),
        }
    }

    pub(crate) fn records(&self, kind: EntityKind, field: &str) -> ModelResult<Vec<RawRecord>> {
        let Some(value) = self.get(field) else {
            return Ok(Vec::new());
        };
        let Value::Array(items) = value else {
            return Err(ModelError::invalid_field(
                kind,
                field,
                format!("expected array, got {value}"),
            ));
        };
        items
            .iter()
            .map(|item| match item {
                Value::Object(map) => Ok(RawRecord(map.clone())),
                other => Err(ModelError::invalid_field(
                    kind,
                    field,
                    format!("expected array of objects, found {other}"),
                )),
            })
            .collect()
    }

    pub(crate) fn strings(&self, kind: EntityKind, field: &str) -> ModelResult<Vec<String>> {
        let Some(value) = self.get(field) else {
            return Ok(Vec::new());
        };
        let Value::Array(items) = value else {
            return Err(ModelError::invalid_field(
                kind,
                field,
                format!("expected array, got {value}"),
            ));
        };
        items
            .iter()
            .map(|item| {
                item.as_str().map(ToOwned::to_owned).ok_or_else(|| {
                    ModelError::invalid_field(kind, field, format!("expected string, found {item}"))
                })
            })
            .collect()
    }
}

impl From<Map<String, Value>> for RawRecord {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// The complete record set handed over by the engine for one project.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawProject {
    #[serde(alias = "property_values")]
    pub properties: RawRecord,
    pub calendars: Vec<RawRecord>,
    pub resources: Vec<RawRecord>,
    pub tasks: Vec<RawRecord>,
    pub assignments: Vec<RawRecord>,
}

pub(crate) fn parse_date(text: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d")
        .ok()
        .or_else(|| parse_timestamp(text).map(|ts| ts.date()))
}

pub(crate) fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .map(|date| date.and_time(NaiveTime::MIN))
        })
}

/// `24:00` is accepted as the end-of-day marker and maps to midnight.
pub(crate) fn parse_time(text: &str) -> Option<NaiveTime> {
    let text = text.trim();
    if text == "24:00" || text == "24:00:00" {
        return Some(NaiveTime::MIN);
    }
    TIME_FORMATS
        .iter()
        .find_map(|format| NaiveTime::parse_from_str(text, format).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> RawRecord {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn null_reads_as_absent() {
        let rec = record(json!({"name": null}));
        assert_eq!(rec.string(EntityKind::Task, "name").unwrap(), None);
    }

    #[test]
    fn integer_rejects_strings() {
        let rec = record(json!({"unique_id": "7"}));
        let err = rec.unique_id(EntityKind::Task).unwrap_err();
        assert!(matches!(err, ModelError::InvalidField { .. }));
    }

    #[test]
    fn integral_floats_are_integers() {
        let rec = record(json!({"id": 3.0}));
        assert_eq!(rec.integer(EntityKind::Task, "id").unwrap(), Some(3));
    }

    #[test]
    fn timestamps_accept_engine_and_plain_forms() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 4)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap();
        assert_eq!(parse_timestamp("2024-03-04T08:00:00.0"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-04 08:00"), Some(expected));
        assert_eq!(
            parse_timestamp("2024-03-04"),
            Some(expected.date().and_time(NaiveTime::MIN))
        );
        assert_eq!(parse_date("2024-03-04T08:00:00"), Some(expected.date()));
    }

    #[test]
    fn end_of_day_time_maps_to_midnight() {
        assert_eq!(parse_time("24:00"), Some(NaiveTime::MIN));
        assert_eq!(
            parse_time("17:30"),
            NaiveTime::from_hms_opt(17, 30, 0)
        );
        assert_eq!(parse_time("5pm"), None);
    }

    #[test]
    fn duration_honours_units_field() {
        let rec = record(json!({"lag": 28800, "lag_units": "d"}));
        let lag = rec
            .duration(EntityKind::Task, "lag", &TimeDefaults::default())
            .unwrap()
            .unwrap();
        assert_eq!(lag, Duration::new(1.0, TimeUnit::Days));
    }
}
