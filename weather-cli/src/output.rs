use morning_weather_core::{CityConfig, WeatherRecord};

pub fn format_records(records: &[WeatherRecord]) -> String {
    if records.is_empty() {
        return "No 07:00 weather data available.\n".to_string();
    }

    let width = records.iter().map(|r| r.city.chars().count()).max().unwrap_or(0).max(4);

    let mut out = format!("{:<width$}  {:<16}  {:>8}  {:>8}  {}\n", "City", "Time", "Temp", "Humidity", "Timezone");
    for r in records {
        out.push_str(&format!(
            "{:<width$}  {:<16}  {:>8}  {:>8}  {} ({})\n",
            r.city,
            r.time,
            reading(r.temperature_2m, 1, "°C"),
            reading(r.humidity_2m, 0, "%"),
            r.timezone,
            r.timezone_abbreviation,
        ));
    }

    out
}

/// `-` stands in for a sample the API left empty.
fn reading(value: Option<f64>, precision: usize, unit: &str) -> String {
    match value {
        Some(v) => format!("{v:.precision$}{unit}"),
        None => "-".to_string(),
    }
}

pub fn format_cities(cities: &[Result<CityConfig, String>]) -> String {
    if cities.is_empty() {
        return "No cities configured.".to_string();
    }

    cities
        .iter()
        .enumerate()
        .map(|(i, city)| match city {
            Ok(c) => format!("{:>3}. {} ({}, {})", i + 1, c.name, c.latitude, c.longitude),
            Err(e) => format!("{:>3}. <invalid: {e}>", i + 1),
        })
        .collect::<Vec<_>>()
        .join("\n")
}
