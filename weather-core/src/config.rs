use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{
    error::ConfigShapeError,
    model::CityConfig,
    retry::{DEFAULT_INITIAL_DELAY_MS, DEFAULT_MAX_DELAY_MS, DEFAULT_MAX_RETRIES, RetryConfig},
};

pub const DEFAULT_API_URL: &str = "https://api.open-meteo.com/v1/forecast";
pub const DEFAULT_HOURLY: &str = "temperature_2m,relative_humidity_2m";

/// Query parameters forwarded to the weather API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiParameters {
    /// Comma-joined hourly metric names, e.g. "temperature_2m,relative_humidity_2m".
    pub hourly: String,
}

impl Default for ApiParameters {
    fn default() -> Self {
        Self { hourly: DEFAULT_HOURLY.to_string() }
    }
}

/// Everything the fetcher needs to know about the weather API.
///
/// Example TOML:
/// [weather_api]
/// url = "https://api.open-meteo.com/v1/forecast"
///
/// [weather_api.parameters]
/// hourly = "temperature_2m,relative_humidity_2m"
///
/// [[weather_api.cities]]
/// name = "Hanoi"
/// latitude = 21.0285
/// longitude = 105.8542
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherApiConfig {
    #[serde(default = "default_api_url")]
    pub url: String,

    #[serde(default)]
    pub parameters: ApiParameters,

    #[serde(default, skip_serializing_if = "CitiesConfig::is_null")]
    pub cities: CitiesConfig,
}

impl Default for WeatherApiConfig {
    fn default() -> Self {
        Self {
            url: default_api_url(),
            parameters: ApiParameters::default(),
            cities: CitiesConfig::default(),
        }
    }
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

/// The city list exactly as written in the config file.
///
/// Hand-written and converted configs disagree on how a list of cities looks,
/// so the raw value is kept and resolved by [`CitiesConfig::normalize`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CitiesConfig(Value);

/// Accepted layouts of the city list.
#[derive(Debug, Clone, PartialEq)]
pub enum CityListShape {
    /// `[{...}, {...}]`
    List(Vec<Value>),
    /// `{ name, latitude, longitude }`
    Single(Value),
    /// `{ "0": {...}, "1": {...} }`, values taken in document order.
    Keyed(Vec<Value>),
    Invalid(Value),
}

impl CitiesConfig {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn from_cities(cities: &[CityConfig]) -> Self {
        let items = cities
            .iter()
            .map(|c| {
                serde_json::json!({
                    "name": c.name,
                    "latitude": c.latitude,
                    "longitude": c.longitude,
                })
            })
            .collect();

        Self(Value::Array(items))
    }

    pub fn raw(&self) -> &Value {
        &self.0
    }

    pub fn is_null(&self) -> bool {
        self.0.is_null()
    }

    pub fn shape(&self) -> CityListShape {
        let mut value = &self.0;

        // `cities.city` wrapper, as produced by XML-style configs.
        if let Some(inner) = value.get("city").filter(|v| is_truthy(v)) {
            value = inner;
        }

        match value {
            Value::Array(items) => CityListShape::List(items.clone()),
            Value::Object(map) if looks_like_city(map) => CityListShape::Single(value.clone()),
            Value::Object(map) => CityListShape::Keyed(map.values().cloned().collect()),
            other => CityListShape::Invalid(other.clone()),
        }
    }

    /// Resolve the configured list into raw per-city entries, in order.
    ///
    /// Entries are not validated here; a malformed entry only fails its own city.
    pub fn normalize(&self) -> Result<Vec<Value>, ConfigShapeError> {
        match self.shape() {
            CityListShape::List(items) | CityListShape::Keyed(items) => Ok(items),
            CityListShape::Single(city) => Ok(vec![city]),
            CityListShape::Invalid(found) => Err(ConfigShapeError { found: found.to_string() }),
        }
    }
}

fn looks_like_city(map: &serde_json::Map<String, Value>) -> bool {
    map.contains_key("$") || (map.contains_key("latitude") && map.contains_key("longitude"))
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// HTTP client settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            max_retries: DEFAULT_MAX_RETRIES,
            initial_delay_ms: DEFAULT_INITIAL_DELAY_MS,
            max_delay_ms: DEFAULT_MAX_DELAY_MS,
            user_agent: concat!("morning-weather/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig::new(self.max_retries, self.initial_delay_ms, self.max_delay_ms)
    }
}

/// Top-level configuration stored on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub weather_api: WeatherApiConfig,

    #[serde(default)]
    pub http: HttpConfig,
}

impl Config {
    /// Load config from `path`, or from the platform config file when `None`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = resolve_path(path)?;
        if !path.exists() {
            return Err(anyhow!(
                "Config file not found: {}\n\
                 Hint: run `morning-weather configure` first.",
                path.display()
            ));
        }

        Self::load_from(&path)
    }

    /// Like [`Config::load`], but an absent file yields the defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        let path = resolve_path(path)?;
        if !path.exists() {
            return Ok(Self::default());
        }

        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&contents, is_json(path))
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn parse(contents: &str, json: bool) -> Result<Self> {
        if json {
            Ok(serde_json::from_str(contents)?)
        } else {
            Ok(toml::from_str(contents)?)
        }
    }

    /// Save config to `path` (or the platform config file), creating parent directories as needed.
    pub fn save(&self, path: Option<&Path>) -> Result<PathBuf> {
        let path = resolve_path(path)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let contents = if is_json(&path) {
            serde_json::to_string_pretty(self).context("Failed to serialize configuration to JSON")?
        } else {
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?
        };

        fs::write(&path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(path)
    }

    /// Path to the platform config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "morning-weather", "morning-weather")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }
}

fn resolve_path(path: Option<&Path>) -> Result<PathBuf> {
    match path {
        Some(p) => Ok(p.to_path_buf()),
        None => Config::config_file_path(),
    }
}

fn is_json(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn hanoi() -> Value {
        json!({ "name": "Hanoi", "latitude": 21.0285, "longitude": 105.8542 })
    }

    fn saigon() -> Value {
        json!({ "name": "Ho Chi Minh City", "latitude": 10.8231, "longitude": 106.6297 })
    }

    #[test]
    fn bare_array_is_used_as_is() {
        let cities = CitiesConfig::new(json!([hanoi(), saigon()]));
        assert_eq!(cities.normalize().unwrap(), vec![hanoi(), saigon()]);
    }

    #[test]
    fn city_wrapper_is_unwrapped() {
        let cities = CitiesConfig::new(json!({ "city": [hanoi(), saigon()] }));
        assert_eq!(cities.normalize().unwrap(), vec![hanoi(), saigon()]);
    }

    #[test]
    fn wrapped_single_city_becomes_one_element_list() {
        let cities = CitiesConfig::new(json!({ "city": hanoi() }));
        assert_eq!(cities.shape(), CityListShape::Single(hanoi()));
        assert_eq!(cities.normalize().unwrap(), vec![hanoi()]);
    }

    #[test]
    fn attribute_bag_counts_as_single_city() {
        let city = json!({ "$": { "name": "Hue", "latitude": "16.46", "longitude": "107.59" } });
        let cities = CitiesConfig::new(json!({ "city": city.clone() }));
        assert_eq!(cities.normalize().unwrap(), vec![city]);
    }

    #[test]
    fn keyed_map_yields_values_in_document_order() {
        let cities = CitiesConfig::new(json!({ "b": saigon(), "a": hanoi() }));
        assert_eq!(cities.shape(), CityListShape::Keyed(vec![saigon(), hanoi()]));
    }

    #[test]
    fn falsy_city_field_is_not_unwrapped() {
        let cities = CitiesConfig::new(json!({ "city": null, "0": hanoi() }));
        assert_eq!(cities.normalize().unwrap(), vec![Value::Null, hanoi()]);
    }

    #[test]
    fn scalar_cities_are_rejected() {
        for raw in [json!(7), json!("Hanoi"), json!(true), Value::Null] {
            let err = CitiesConfig::new(raw).normalize().unwrap_err();
            assert!(err.to_string().contains("cities config is not valid"));
        }
    }

    #[test]
    fn from_cities_roundtrips_through_normalize() {
        let list = vec![CityConfig::new("Hanoi", 21.0285, 105.8542)];
        let raw = CitiesConfig::from_cities(&list).normalize().unwrap();
        let parsed: Vec<_> = raw.iter().map(|v| CityConfig::from_value(v).unwrap()).collect();
        assert_eq!(parsed, list);
    }

    #[test]
    fn parses_toml_with_array_of_tables() {
        let cfg = Config::parse(
            r#"
            [weather_api]
            url = "https://example.test/v1/forecast"

            [weather_api.parameters]
            hourly = "temperature_2m"

            [[weather_api.cities]]
            name = "Hanoi"
            latitude = 21.0285
            longitude = 105.8542
            "#,
            false,
        )
        .unwrap();

        assert_eq!(cfg.weather_api.url, "https://example.test/v1/forecast");
        assert_eq!(cfg.weather_api.parameters.hourly, "temperature_2m");
        assert_eq!(cfg.weather_api.cities.normalize().unwrap().len(), 1);
        assert_eq!(cfg.http, HttpConfig::default());
    }

    #[test]
    fn parses_toml_keyed_tables() {
        let cfg = Config::parse(
            r#"
            [weather_api.cities.north]
            name = "Hanoi"
            latitude = 21.0285
            longitude = 105.8542

            [weather_api.cities.south]
            name = "Can Tho"
            latitude = "10.0452"
            longitude = "105.7469"
            "#,
            false,
        )
        .unwrap();

        let entries = cfg.weather_api.cities.normalize().unwrap();
        let names: Vec<_> = entries
            .iter()
            .map(|v| CityConfig::from_value(v).unwrap().name)
            .collect();
        assert_eq!(names, ["Hanoi", "Can Tho"]);
        assert_eq!(cfg.weather_api.url, DEFAULT_API_URL);
    }

    #[test]
    fn parses_json_config() {
        let cfg = Config::parse(
            r#"{ "weather_api": { "cities": { "city": { "name": "Hanoi", "latitude": 21, "longitude": 105 } } },
                 "http": { "max_retries": 0 } }"#,
            true,
        )
        .unwrap();

        assert_eq!(cfg.weather_api.cities.normalize().unwrap().len(), 1);
        assert_eq!(cfg.http.max_retries, 0);
        assert_eq!(cfg.http.timeout_secs, 30);
    }

    #[test]
    fn missing_cities_is_invalid_not_a_parse_error() {
        let cfg = Config::parse("[weather_api]\nurl = \"http://localhost\"\n", false).unwrap();
        assert!(cfg.weather_api.cities.is_null());
        assert!(cfg.weather_api.cities.normalize().is_err());
    }

    #[test]
    fn default_http_config_matches_default_retry_policy() {
        assert_eq!(HttpConfig::default().retry_config(), RetryConfig::default());
    }

    #[test]
    fn http_config_builds_retry_policy() {
        let http = HttpConfig { max_retries: 5, initial_delay_ms: 10, max_delay_ms: 40, ..HttpConfig::default() };
        let retry = http.retry_config();

        assert_eq!(retry.max_retries, 5);
        assert_eq!(retry.delay_for_attempt(3), Duration::from_millis(40));
        assert_eq!(http.timeout(), Duration::from_secs(30));
    }
}
