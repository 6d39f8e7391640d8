use chrono::{Datelike, NaiveDateTime, Timelike};
use sensormesh_core::models::{CalendarField, CalendarGranularity};

/// Numeric value of one calendar field
pub fn calendar_value(field: CalendarField, timestamp: NaiveDateTime) -> f64 {
    match field {
        CalendarField::DayOfWeek => timestamp.weekday().num_days_from_monday() as f64,
        CalendarField::DayOfMonth => timestamp.day() as f64,
        CalendarField::HourOfDay => timestamp.hour() as f64,
        CalendarField::IsoWeek => timestamp.iso_week().week() as f64,
    }
}

/// Calendar cells of a row, in schema order
pub fn calendar_cells(granularity: CalendarGranularity, timestamp: NaiveDateTime) -> Vec<Option<f64>> {
    granularity.fields().iter().map(|&field| Some(calendar_value(field, timestamp))).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_daily_fields() {
        // Wednesday 3 January 2018, ISO week 1
        let ts = NaiveDate::from_ymd_opt(2018, 1, 3).unwrap().and_hms_opt(17, 0, 0).unwrap();
        assert_eq!(calendar_cells(CalendarGranularity::Daily, ts), vec![Some(2.0), Some(3.0), Some(1.0)]);
    }

    #[test]
    fn test_hourly_fields() {
        let ts = NaiveDate::from_ymd_opt(2018, 1, 7).unwrap().and_hms_opt(17, 30, 0).unwrap();
        assert_eq!(calendar_cells(CalendarGranularity::Hourly, ts), vec![Some(6.0), Some(7.0), Some(17.0)]);
    }

    #[test]
    fn test_iso_week_wraps_year() {
        // 31 December 2018 belongs to ISO week 1 of 2019
        let ts = NaiveDate::from_ymd_opt(2018, 12, 31).unwrap().and_hms_opt(0, 0, 0).unwrap();
        assert_eq!(calendar_value(CalendarField::IsoWeek, ts), 1.0);
    }
}
