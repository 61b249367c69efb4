// Calendar date range shared by every section loader
use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DateRangeError {
    #[error("Por favor seleccione fechas válidas")]
    Missing,
    #[error("Fecha no válida: {0}")]
    Unparsable(String),
    #[error("La fecha de inicio debe ser anterior a la fecha de fin")]
    Inverted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, DateRangeError> {
        if start > end {
            return Err(DateRangeError::Inverted);
        }
        Ok(Self { start, end })
    }

    /// Range covering the last `days` days ending on `today`
    pub fn last_days(today: NaiveDate, days: u64) -> Self {
        let start = today.checked_sub_days(Days::new(days)).unwrap_or(NaiveDate::MIN);
        Self { start, end: today }
    }

    /// Validates raw filter input (both values required, `start <= end`)
    pub fn parse(start: Option<&str>, end: Option<&str>) -> Result<Self, DateRangeError> {
        let start = start.map(str::trim).filter(|s| !s.is_empty());
        let end = end.map(str::trim).filter(|s| !s.is_empty());
        let (Some(start), Some(end)) = (start, end) else {
            return Err(DateRangeError::Missing);
        };

        let start = NaiveDate::parse_from_str(start, DATE_FORMAT)
            .map_err(|_| DateRangeError::Unparsable(start.to_string()))?;
        let end = NaiveDate::parse_from_str(end, DATE_FORMAT)
            .map_err(|_| DateRangeError::Unparsable(end.to_string()))?;

        Self::new(start, end)
    }

    pub fn start_param(&self) -> String {
        self.start.format(DATE_FORMAT).to_string()
    }

    pub fn end_param(&self) -> String {
        self.end.format(DATE_FORMAT).to_string()
    }

    /// `start_date`/`end_date` pairs appended to every data request
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        vec![
            ("start_date".to_string(), self.start_param()),
            ("end_date".to_string(), self.end_param()),
        ]
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.start_param(), self.end_param())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_last_days() {
        let range = DateRange::last_days(date(2024, 3, 31), 30);
        assert_eq!(range.start, date(2024, 3, 1));
        assert_eq!(range.end, date(2024, 3, 31));
    }

    #[test]
    fn test_parse_valid() {
        let range = DateRange::parse(Some("2024-01-01"), Some("2024-01-31")).unwrap();
        assert_eq!(range.start_param(), "2024-01-01");
        assert_eq!(range.end_param(), "2024-01-31");
    }

    #[test]
    fn test_parse_same_day_is_valid() {
        assert!(DateRange::parse(Some("2024-01-05"), Some("2024-01-05")).is_ok());
    }

    #[test]
    fn test_parse_rejects_missing_and_inverted() {
        assert_eq!(DateRange::parse(None, Some("2024-01-01")), Err(DateRangeError::Missing));
        assert_eq!(DateRange::parse(Some(" "), Some("2024-01-01")), Err(DateRangeError::Missing));
        assert_eq!(
            DateRange::parse(Some("2024-02-01"), Some("2024-01-01")),
            Err(DateRangeError::Inverted)
        );
        assert!(matches!(
            DateRange::parse(Some("01/02/2024"), Some("2024-01-01")),
            Err(DateRangeError::Unparsable(_))
        ));
    }
}
