use chrono::NaiveDate;
use gtfs_structures::{Exception, Gtfs, Trip};

use crate::timetable::Minutes;

const EARTH_RADIUS_METRES: f64 = 6_371_000.0;

pub const fn const_unwrap<T: Copy>(x: Option<T>) -> T {
    if let Some(x) = x { x } else { panic!("Failed to const unwrap.") }
}

/// Formats minutes after midnight as HH:MM. Hours past a day keep counting (25:10).
pub fn format_minutes(mins: Minutes) -> String {
    let sign = if mins < 0 { "-" } else { "" };
    let mins = mins.unsigned_abs();
    format!("{sign}{:02}:{:02}", mins / 60, mins % 60)
}

/// Great-circle distance between two (longitude, latitude) points in degrees.
pub fn haversine_metres((lon_a, lat_a): (f64, f64), (lon_b, lat_b): (f64, f64)) -> f64 {
    let (lat_a, lat_b) = (lat_a.to_radians(), lat_b.to_radians());
    let d_lat = lat_b - lat_a;
    let d_lon = (lon_b - lon_a).to_radians();
    let h = (d_lat / 2.0).sin().powi(2) + lat_a.cos() * lat_b.cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_METRES * h.sqrt().asin()
}

pub fn does_trip_run(gtfs: &Gtfs, trip: &Trip, date: NaiveDate) -> bool {
    let service = trip.service_id.as_str();
    // Exceptions override the weekly calendar.
    if let Some(exception) = gtfs
        .calendar_dates
        .get(service)
        .and_then(|dates| dates.iter().find(|calendar_date| calendar_date.date == date))
    {
        return matches!(exception.exception_type, Exception::Added);
    }
    gtfs.calendar
        .get(service)
        .is_some_and(|calendar| calendar.valid_weekday(date) && calendar.start_date <= date && date <= calendar.end_date)
}
