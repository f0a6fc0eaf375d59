//! Fixtures shared by the unit tests.

use std::path::Path;

pub const HISTORY_HEADER: &str = "Formatted Date,Summary,Precip Type,Temperature (C),Apparent Temperature (C),Humidity,Wind Speed (km/h),Wind Bearing (degrees),Visibility (km),Loud Cover,Pressure (millibars),Daily Summary";

/// Three historical rows; the second has no temperature, the third has no humidity or pressure.
pub const HISTORY_ROWS: [&str; 3] = [
    "2006-04-01 00:00:00.000 +0200,Partly Cloudy,rain,9.472222222222221,7.388888888888887,0.89,14.1197,251.0,15.8263,0.0,1015.13,Partly cloudy throughout the day.",
    "2006-04-01 01:00:00.000 +0200,Partly Cloudy,rain,,7.227777777777776,0.86,14.2646,259.0,15.8263,0.0,1015.63,Partly cloudy throughout the day.",
    "2006-04-01 02:00:00.000 +0200,Mostly Cloudy,rain,9.377777777777778,9.377777777777778,,3.9284,204.0,14.9569,0.0,,Partly cloudy throughout the day.",
];

pub fn write_history_csv(path: &Path, rows: &[&str]) {
    let mut content = String::from(HISTORY_HEADER);
    for row in rows {
        content.push('\n');
        content.push_str(row);
    }
    content.push('\n');
    std::fs::write(path, content).unwrap();
}
