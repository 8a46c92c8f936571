use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{ArgAction, Parser, Subcommand};
use inquire::{Confirm, CustomType, Text};
use morning_weather_core::{
    CitiesConfig, CityConfig, Config, OpenMeteoProvider, WeatherFetcher, WeatherRecord,
};
use std::path::PathBuf;

use crate::output::{format_cities, format_records};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "morning-weather", version, about = "Fetch the 07:00 weather sample for configured cities")]
pub struct Cli {
    /// Config file to use instead of the platform default (.toml or .json).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v, -vv). `RUST_LOG` takes precedence.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch the 07:00 sample for every configured city.
    Fetch {
        /// Day to look up (YYYY-MM-DD); defaults to today in UTC.
        #[arg(long, value_parser = parse_date)]
        date: Option<NaiveDate>,

        /// Print records as JSON instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Show the configured cities after normalization.
    Cities,

    /// Interactively set the API endpoint, hourly parameters and cities.
    Configure,

    /// Print the config file path in use.
    ConfigPath,
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        let path = self.config.as_deref();
        tracing::debug!(config = ?path, command = ?self.command, "Running command");

        match self.command {
            Command::Fetch { date, json } => {
                let cfg = Config::load(path)?;
                let provider = OpenMeteoProvider::new(&cfg.http)
                    .context("Failed to build HTTP client")?;
                let fetcher = WeatherFetcher::new(provider);

                let today = date.unwrap_or_else(|| Utc::now().date_naive());
                let records = fetcher.fetch_weather_data_on(&cfg.weather_api, today).await;

                print_records(&records, json)?;
            }
            Command::Cities => {
                let cfg = Config::load(path)?;
                let entries = cfg.weather_api.cities.normalize()?;
                let cities: Vec<_> = entries
                    .iter()
                    .map(|v| CityConfig::from_value(v).map_err(|e| e.to_string()))
                    .collect();

                println!("{}", format_cities(&cities));
            }
            Command::Configure => {
                let mut cfg = Config::load_or_default(path)?;
                configure(&mut cfg)?;
                let saved = cfg.save(path)?;
                println!("Configuration saved to {}", saved.display());
            }
            Command::ConfigPath => {
                let resolved = match path {
                    Some(p) => p.to_path_buf(),
                    None => Config::config_file_path()?,
                };
                println!("{}", resolved.display());
            }
        }

        Ok(())
    }
}

fn print_records(records: &[WeatherRecord], json: bool) -> Result<()> {
    if json {
        let text = serde_json::to_string_pretty(records).context("Failed to serialize records")?;
        println!("{text}");
    } else {
        print!("{}", format_records(records));
    }
    Ok(())
}

fn configure(cfg: &mut Config) -> Result<()> {
    let api = &mut cfg.weather_api;

    let url = Text::new("Weather API URL:").with_default(&api.url).prompt()?;
    let hourly = Text::new("Hourly parameters (comma separated):")
        .with_default(&api.parameters.hourly)
        .prompt()?;
    api.url = url.trim().to_string();
    api.parameters.hourly = hourly.trim().to_string();

    let existing: Vec<CityConfig> = api
        .cities
        .normalize()
        .map(|entries| entries.iter().filter_map(|v| CityConfig::from_value(v).ok()).collect())
        .unwrap_or_default();

    let mut cities = Vec::new();
    if !existing.is_empty() {
        let keep = Confirm::new(&format!("Keep the {} configured cities?", existing.len()))
            .with_default(true)
            .prompt()?;
        if keep {
            cities = existing;
        }
    }

    while Confirm::new("Add a city?").with_default(cities.is_empty()).prompt()? {
        let name = Text::new("City name:").prompt()?;
        let latitude = CustomType::<f64>::new("Latitude:")
            .with_error_message("Please enter a number")
            .prompt()?;
        let longitude = CustomType::<f64>::new("Longitude:")
            .with_error_message("Please enter a number")
            .prompt()?;

        cities.push(CityConfig::new(name.trim(), latitude, longitude));
    }

    api.cities = CitiesConfig::from_cities(&cities);
    Ok(())
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| format!("expected YYYY-MM-DD: {e}"))
}
