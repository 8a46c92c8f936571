use async_trait::async_trait;
use std::fmt::Debug;

use crate::{error::FetchError, model::ForecastResponse};

pub mod open_meteo;

pub use open_meteo::OpenMeteoProvider;

/// Source of hourly forecasts, one request per city.
#[async_trait]
pub trait ForecastProvider: Send + Sync + Debug {
    async fn fetch_forecast(&self, url: &str) -> Result<ForecastResponse, FetchError>;
}

