//! Core library for `morning-weather`.
//!
//! This crate defines:
//! - Configuration loading and city-list normalization
//! - The forecast provider abstraction and its Open-Meteo client
//! - The fetcher that extracts each city's 07:00 sample
//!
//! It is used by `morning-weather-cli`, but can also be embedded in other
//! binaries or services.

pub mod config;
pub mod error;
pub mod fetcher;
pub mod model;
pub mod provider;
pub mod retry;

pub use config::{ApiParameters, CitiesConfig, CityListShape, Config, HttpConfig, WeatherApiConfig};
pub use error::{ConfigShapeError, FetchError};
pub use fetcher::{CityOutcome, WeatherFetcher};
pub use model::{CityConfig, ForecastResponse, HourlySeries, WeatherRecord};
pub use provider::{ForecastProvider, OpenMeteoProvider};
pub use retry::RetryConfig;
