pub mod datetime;
pub mod live_observation;
pub mod source;
pub mod weather_record;
