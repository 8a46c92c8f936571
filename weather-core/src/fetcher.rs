//! Per-city retrieval of the 07:00 hourly sample.
//!
//! Cities are fetched one after another. A failing city never aborts the
//! run: [`WeatherFetcher::fetch_all`] reports one outcome per city and
//! [`WeatherFetcher::fetch_weather_data`] logs and drops the failures.

use chrono::{NaiveDate, Utc};
use serde_json::Value;

use crate::{
    config::WeatherApiConfig,
    error::{ConfigShapeError, FetchError},
    model::{CityConfig, ForecastResponse, WeatherRecord},
    provider::ForecastProvider,
};

/// Hour of the day whose sample is reported.
pub const TARGET_HOUR: &str = "07";

/// Timezone requested from the API for every city.
pub const REQUEST_TIMEZONE: &str = "Asia/Ho_Chi_Minh";

/// Result of processing one configured city.
#[derive(Debug)]
pub struct CityOutcome {
    pub city: String,
    pub result: Result<WeatherRecord, FetchError>,
}

impl CityOutcome {
    /// Log a failed outcome at the level its error calls for and keep the record, if any.
    pub fn into_record(self) -> Option<WeatherRecord> {
        let city = self.city;
        match self.result {
            Ok(record) => Some(record),
            Err(err) if err.is_silent() => {
                tracing::debug!(%city, reason = %err, "Skipping city");
                None
            }
            Err(err) if err.is_warning() => {
                tracing::warn!(%city, reason = %err, "No 07:00 data found");
                None
            }
            Err(err) => {
                tracing::error!(%city, error = %err, "Error fetching weather data");
                None
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct WeatherFetcher<P> {
    provider: P,
}

impl<P: ForecastProvider> WeatherFetcher<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Fetch today's (UTC) 07:00 record for every configured city.
    ///
    /// Never fails: an unusable city list yields an empty vector and
    /// per-city failures are logged and skipped.
    pub async fn fetch_weather_data(&self, config: &WeatherApiConfig) -> Vec<WeatherRecord> {
        self.fetch_weather_data_on(config, Utc::now().date_naive()).await
    }

    pub async fn fetch_weather_data_on(
        &self,
        config: &WeatherApiConfig,
        today: NaiveDate,
    ) -> Vec<WeatherRecord> {
        let outcomes = match self.fetch_all(config, today).await {
            Ok(outcomes) => outcomes,
            Err(err) => {
                tracing::error!(error = %err, "Cannot fetch weather data");
                return Vec::new();
            }
        };

        let total = outcomes.len();
        let records: Vec<_> = outcomes.into_iter().filter_map(CityOutcome::into_record).collect();
        tracing::info!(cities = total, records = records.len(), %today, "Weather fetch finished");

        records
    }

    /// One outcome per configured city, in configuration order.
    pub async fn fetch_all(
        &self,
        config: &WeatherApiConfig,
        today: NaiveDate,
    ) -> Result<Vec<CityOutcome>, ConfigShapeError> {
        let entries = config.cities.normalize()?;
        let mut outcomes = Vec::with_capacity(entries.len());

        for (index, entry) in entries.iter().enumerate() {
            let outcome = match CityConfig::from_value(entry) {
                Ok(city) => {
                    let result = self.fetch_city(&city, config, today).await;
                    CityOutcome { city: city.name, result }
                }
                Err(err) => CityOutcome { city: entry_label(entry, index), result: Err(err) },
            };
            outcomes.push(outcome);
        }

        Ok(outcomes)
    }

    pub async fn fetch_city(
        &self,
        city: &CityConfig,
        api: &WeatherApiConfig,
        today: NaiveDate,
    ) -> Result<WeatherRecord, FetchError> {
        let url = build_request_url(&api.url, city, &api.parameters.hourly);
        let response = self.provider.fetch_forecast(&url).await?;

        extract_target_record(&city.name, response, today)
    }
}

pub fn build_request_url(base: &str, city: &CityConfig, hourly: &str) -> String {
    format!(
        "{base}?latitude={}&longitude={}&hourly={hourly}&timezone={}",
        city.latitude,
        city.longitude,
        REQUEST_TIMEZONE.replace('/', "%2F"),
    )
}

/// `YYYY-MM-DDT07` for the given day.
pub fn target_hour_prefix(date: NaiveDate) -> String {
    format!("{}T{TARGET_HOUR}", date.format("%Y-%m-%d"))
}

pub fn find_target_index<S: AsRef<str>>(times: &[S], prefix: &str) -> Option<usize> {
    times.iter().position(|t| t.as_ref().starts_with(prefix))
}

/// Pick the sample at `today`'s target hour out of an hourly response.
pub fn extract_target_record(
    city: &str,
    response: ForecastResponse,
    today: NaiveDate,
) -> Result<WeatherRecord, FetchError> {
    let hourly = response
        .hourly
        .filter(|h| !h.time.is_empty())
        .ok_or(FetchError::NoHourlyData)?;

    let target = target_hour_prefix(today);
    let index = find_target_index(hourly.time.as_slice(), &target)
        .ok_or(FetchError::MissingTargetHour { target })?;

    let temperature_2m = sample_at(&hourly.temperature_2m, index);
    let humidity_2m = sample_at(&hourly.relative_humidity_2m, index);

    Ok(WeatherRecord {
        city: city.to_string(),
        latitude: response.latitude,
        longitude: response.longitude,
        elevation: response.elevation,
        utc_offset_seconds: response.utc_offset_seconds,
        timezone: response.timezone,
        timezone_abbreviation: response.timezone_abbreviation,
        time: hourly.time[index].clone(),
        temperature_2m,
        humidity_2m,
    })
}

/// Missing and `null` samples are both reported as `None`.
fn sample_at(series: &[Option<f64>], index: usize) -> Option<f64> {
    series.get(index).copied().flatten()
}

fn entry_label(entry: &Value, index: usize) -> String {
    entry
        .get("name")
        .or_else(|| entry.get("$").and_then(|attrs| attrs.get("name")))
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| format!("city #{}", index + 1))
}
