use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::FetchError;

/// A city to request weather for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CityConfig {
    pub name: String,
    #[serde(deserialize_with = "loose_f64")]
    pub latitude: f64,
    #[serde(deserialize_with = "loose_f64")]
    pub longitude: f64,
}

impl CityConfig {
    pub fn new(name: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self { name: name.into(), latitude, longitude }
    }

    /// Convert one raw city entry.
    ///
    /// Attributes nested under a `$` key (as emitted by XML-to-object
    /// converters) are read from there instead of the entry itself.
    pub fn from_value(value: &Value) -> Result<Self, FetchError> {
        let attrs = value.get("$").filter(|v| v.is_object()).unwrap_or(value);

        CityConfig::deserialize(attrs).map_err(|e| FetchError::InvalidCity(e.to_string()))
    }
}

/// The 07:00 sample of one city, as returned to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherRecord {
    pub city: String,
    pub latitude: f64,
    pub longitude: f64,
    pub elevation: f64,
    pub utc_offset_seconds: i32,
    pub timezone: String,
    pub timezone_abbreviation: String,
    pub time: String,
    /// `None` when the API reported `null` (or nothing) for the matched hour.
    pub temperature_2m: Option<f64>,
    pub humidity_2m: Option<f64>,
}

/// Body of an hourly forecast request.
#[derive(Debug, Clone, Deserialize)]
pub struct ForecastResponse {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub elevation: f64,
    #[serde(default)]
    pub utc_offset_seconds: i32,
    #[serde(default)]
    pub timezone: String,
    #[serde(default)]
    pub timezone_abbreviation: String,
    #[serde(default)]
    pub hourly: Option<HourlySeries>,
}

/// Parallel hourly arrays sharing the `time` index.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HourlySeries {
    #[serde(default)]
    pub time: Vec<String>,
    #[serde(default)]
    pub temperature_2m: Vec<Option<f64>>,
    #[serde(default)]
    pub relative_humidity_2m: Vec<Option<f64>>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrText {
    Number(f64),
    Text(String),
}

/// Coordinates coming from hand-edited or converted config may be strings.
fn loose_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    match NumberOrText::deserialize(deserializer)? {
        NumberOrText::Number(n) => Ok(n),
        NumberOrText::Text(s) => s
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("expected a number, got {s:?}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn city_from_plain_object() {
        let city = CityConfig::from_value(&json!({
            "name": "Hanoi", "latitude": 21.0285, "longitude": 105.8542
        }))
        .unwrap();

        assert_eq!(city, CityConfig::new("Hanoi", 21.0285, 105.8542));
    }

    #[test]
    fn city_accepts_numeric_strings_and_integers() {
        let city = CityConfig::from_value(&json!({
            "name": "Da Nang", "latitude": " 16.0544 ", "longitude": 108
        }))
        .unwrap();

        assert_eq!(city.latitude, 16.0544);
        assert_eq!(city.longitude, 108.0);
    }

    #[test]
    fn city_reads_attribute_bag() {
        let city = CityConfig::from_value(&json!({
            "$": { "name": "Hue", "latitude": "16.4637", "longitude": "107.5909" }
        }))
        .unwrap();

        assert_eq!(city.name, "Hue");
        assert_eq!(city.longitude, 107.5909);
    }

    #[test]
    fn city_without_coordinates_is_invalid() {
        let err = CityConfig::from_value(&json!({ "name": "Nowhere" })).unwrap_err();
        assert!(matches!(err, FetchError::InvalidCity(_)));

        let err = CityConfig::from_value(&json!(42)).unwrap_err();
        assert!(matches!(err, FetchError::InvalidCity(_)));
    }

    #[test]
    fn city_with_garbage_coordinate_is_invalid() {
        let err = CityConfig::from_value(&json!({
            "name": "Hanoi", "latitude": "north", "longitude": 105.8
        }))
        .unwrap_err();

        assert!(err.to_string().contains("north"));
    }

    #[test]
    fn forecast_response_tolerates_missing_hourly() {
        let parsed: ForecastResponse = serde_json::from_value(json!({
            "latitude": 21.0, "longitude": 105.75, "elevation": 14.0,
            "utc_offset_seconds": 25200, "timezone": "Asia/Bangkok",
            "timezone_abbreviation": "+07"
        }))
        .unwrap();

        assert!(parsed.hourly.is_none());
    }

    #[test]
    fn forecast_response_keeps_null_samples() {
        let parsed: ForecastResponse = serde_json::from_value(json!({
            "latitude": 21.0, "longitude": 105.75, "elevation": 14.0,
            "utc_offset_seconds": 25200, "timezone": "Asia/Bangkok",
            "timezone_abbreviation": "+07",
            "hourly": {
                "time": ["2024-05-01T00:00", "2024-05-01T01:00"],
                "temperature_2m": [27.1, null],
                "relative_humidity_2m": [80, 82]
            }
        }))
        .unwrap();

        let hourly = parsed.hourly.unwrap();
        assert_eq!(hourly.temperature_2m, vec![Some(27.1), None]);
        assert_eq!(hourly.relative_humidity_2m, vec![Some(80.0), Some(82.0)]);
    }
}
