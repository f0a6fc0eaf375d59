use serde::{Deserialize, Serialize};

/// One record of a live-feed batch as written to the raw zone.
///
/// Field names are the feed's own; harmonization maps `date` onto `datetime_utc`
/// and ignores `city` and `wind_speed`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveObservation {
    pub city: String,
    pub temp_c: f64,
    pub humidity: f64,
    /// km/h
    pub wind_speed: f64,
    /// Observation time, `YYYY-MM-DD HH:MM:SS` (UTC).
    pub date: String,
    /// ISO-8601 instant with a trailing `Z`, identical for every record of a batch.
    pub ingestion_timestamp: String,
}

impl LiveObservation {
    fn new(city: &str, temp_c: f64, humidity: f64, wind_speed: f64, date: &str) -> Self {
        Self {
            city: city.to_string(),
            temp_c,
            humidity,
            wind_speed,
            date: date.to_string(),
            ingestion_timestamp: String::new(),
        }
    }
}

/// The fixed batch returned by the simulated weather API.
pub(crate) fn simulated_api_response() -> Vec<LiveObservation> {
    vec![
        LiveObservation::new("Rabat", 20.1, 75.0, 5.5, "2025-12-14 12:00:00"),
        LiveObservation::new("Paris", 6.3, 88.0, 10.2, "2025-12-14 13:00:00"),
        LiveObservation::new("Casablanca", 18.0, 70.0, 4.0, "2025-12-14 14:00:00"),
    ]
}
