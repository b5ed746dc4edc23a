//! On-disk layout of the daily attendance log.
//!
//! One CSV file per calendar date, named after the date, with a fixed header.

use chrono::NaiveDate;

/// Header row written when a daily log is created.
pub const LOG_HEADER: [&str; 4] = ["Date", "ID", "Name", "Attendance"];

/// File name prefix shared by all daily logs.
pub const LOG_FILE_PREFIX: &str = "daily_attendance_";

/// File name extension of daily logs.
pub const LOG_FILE_EXTENSION: &str = "csv";

/// File name of the log for `date`, e.g. `daily_attendance_2024-01-15.csv`.
#[must_use]
pub fn log_file_name(date: NaiveDate) -> String {
    format!(
        "{LOG_FILE_PREFIX}{}.{LOG_FILE_EXTENSION}",
        date.format("%Y-%m-%d")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_file_name() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        assert_eq!(log_file_name(date), "daily_attendance_2024-01-05.csv");
    }

    #[test]
    fn test_header_columns() {
        assert_eq!(LOG_HEADER.join(","), "Date,ID,Name,Attendance");
    }
}
