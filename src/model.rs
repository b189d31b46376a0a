use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::geo::{ft_to_m, m_to_ft, Coord, GeoPoint};

/// Set of selected `PathRecord::id`s. Ordered so iteration is deterministic.
pub type SelectionSet = BTreeSet<i64>;

/// One recorded flight.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PathRecord {
    #[serde(deserialize_with = "de_i64_from_any")]
    pub id: i64,
    #[serde(default, deserialize_with = "de_opt_i64_from_any")]
    pub year: Option<i64>,
    #[serde(default, alias = "aircraft_registration", deserialize_with = "de_opt_text")]
    pub aircraft_registration: Option<String>,
    #[serde(default, alias = "aircraft_type", deserialize_with = "de_opt_text")]
    pub aircraft_type: Option<String>,
    #[serde(default, alias = "start_airport", deserialize_with = "de_opt_text")]
    pub start_airport: Option<String>,
    #[serde(default, alias = "end_airport", deserialize_with = "de_opt_text")]
    pub end_airport: Option<String>,
}

/// One GPS-to-GPS leg of a flight. `time_seconds` is relative to the path
/// start and stamps the leg's end coordinate.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", from = "SegmentWire")]
pub struct Segment {
    pub path_id: i64,
    pub coords: [Coord; 2],
    pub altitude_ft: f64,
    pub altitude_m: f64,
    pub groundspeed_knots: Option<f64>,
    pub time_seconds: Option<f64>,
}

impl Segment {
    pub fn start(&self) -> GeoPoint {
        GeoPoint::from(self.coords[0])
    }

    pub fn end(&self) -> GeoPoint {
        GeoPoint::from(self.coords[1])
    }

    /// Groundspeed when it is present and positive; idle samples read as `None`.
    pub fn moving_speed(&self) -> Option<f64> {
        self.groundspeed_knots.filter(|gs| *gs > 0.0)
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SegmentWire {
    #[serde(alias = "path_id", deserialize_with = "de_i64_from_any")]
    path_id: i64,
    coords: [Coord; 2],
    #[serde(default, alias = "altitude_ft", deserialize_with = "de_opt_f64_from_any")]
    altitude_ft: Option<f64>,
    #[serde(default, alias = "altitude_m", deserialize_with = "de_opt_f64_from_any")]
    altitude_m: Option<f64>,
    #[serde(
        default,
        alias = "groundspeed_knots",
        alias = "groundspeed",
        deserialize_with = "de_opt_f64_from_any"
    )]
    groundspeed_knots: Option<f64>,
    #[serde(
        default,
        alias = "time",
        alias = "time_seconds",
        deserialize_with = "de_opt_f64_from_any"
    )]
    time_seconds: Option<f64>,
}

impl From<SegmentWire> for Segment {
    fn from(wire: SegmentWire) -> Self {
        let (altitude_ft, altitude_m) = match (wire.altitude_ft, wire.altitude_m) {
            (Some(ft), Some(m)) => (ft, m),
            (Some(ft), None) => (ft, ft_to_m(ft)),
            (None, Some(m)) => (m_to_ft(m), m),
            (None, None) => (0.0, 0.0),
        };
        Segment {
            path_id: wire.path_id,
            coords: wire.coords,
            altitude_ft,
            altitude_m,
            groundspeed_knots: wire.groundspeed_knots,
            time_seconds: wire.time_seconds,
        }
    }
}

/// Aircraft details from the full-statistics source.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AircraftInfo {
    pub registration: String,
    #[serde(default, alias = "aircraft_type", alias = "type", deserialize_with = "de_opt_text")]
    pub aircraft_type: Option<String>,
    #[serde(default, deserialize_with = "de_opt_text")]
    pub model: Option<String>,
}

/// Everything loaded for one resolution/year key.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    #[serde(default)]
    pub paths: Vec<PathRecord>,
    #[serde(default)]
    pub segments: Vec<Segment>,
    #[serde(default)]
    pub aircraft: Vec<AircraftInfo>,
    #[serde(default, alias = "display_segments")]
    pub display_segments: Vec<Segment>,
}

/// One component of a [`FilterCriteria`]: either the `"all"` wildcard or a
/// specific value.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum Criterion {
    #[default]
    All,
    Only(String),
}

impl Criterion {
    /// Only the exact string `"all"` is the wildcard, so a registration
    /// spelled `ALL` stays filterable. A blank value also means no filter.
    pub fn parse(value: &str) -> Self {
        let trimmed = value.trim();
        if trimmed.is_empty() || trimmed == "all" {
            Criterion::All
        } else {
            Criterion::Only(trimmed.to_string())
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Criterion::All)
    }

    /// Absent values never match a specific criterion.
    pub fn matches(&self, value: Option<&str>) -> bool {
        match self {
            Criterion::All => true,
            Criterion::Only(wanted) => value.map(|v| v == wanted).unwrap_or(false),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Criterion::All => "all",
            Criterion::Only(value) => value,
        }
    }
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FilterCriteria {
    pub year: Criterion,
    pub aircraft: Criterion,
}

impl FilterCriteria {
    pub fn new(year: &str, aircraft: &str) -> Self {
        Self {
            year: Criterion::parse(year),
            aircraft: Criterion::parse(aircraft),
        }
    }

    pub fn all() -> Self {
        Self::default()
    }

    pub fn matches(&self, record: &PathRecord) -> bool {
        let year = record.year.map(|y| y.to_string());
        self.year.matches(year.as_deref())
            && self
                .aircraft
                .matches(record.aircraft_registration.as_deref())
    }
}

fn de_i64_from_any<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    de_opt_i64_from_any(deserializer)?
        .ok_or_else(|| serde::de::Error::custom("expected an integer id"))
}

fn de_opt_i64_from_any<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Number(number) => {
            if let Some(value) = number.as_i64() {
                Ok(Some(value))
            } else if let Some(value) = number.as_f64() {
                Ok(Some(value as i64))
            } else {
                Ok(None)
            }
        }
        Value::String(text) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                Ok(None)
            } else if let Ok(value) = trimmed.parse::<i64>() {
                Ok(Some(value))
            } else if let Ok(value) = trimmed.parse::<f64>() {
                Ok(Some(value as i64))
            } else {
                Ok(None)
            }
        }
        Value::Null => Ok(None),
        other => Err(serde::de::Error::custom(format!(
            "expected number or null, got {other}"
        ))),
    }
}

fn de_opt_f64_from_any<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Number(number) => number
            .as_f64()
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom("expected float-compatible number")),
        Value::String(text) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                Ok(None)
            } else {
                Ok(trimmed.parse::<f64>().ok())
            }
        }
        Value::Null => Ok(None),
        other => Err(serde::de::Error::custom(format!(
            "expected number or null, got {other}"
        ))),
    }
}

fn de_opt_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(text) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                Ok(None)
            } else {
                Ok(Some(trimmed.to_string()))
            }
        }
        Value::Number(number) => Ok(Some(number.to_string())),
        Value::Null => Ok(None),
        other => Err(serde::de::Error::custom(format!(
            "expected string or null, got {other}"
        ))),
    }
}
