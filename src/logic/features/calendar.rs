//! Calendar features - pure functions of the transaction date

use chrono::{Datelike, NaiveDate};

use super::schema;
use crate::logic::error::{PredictError, PredictResult};

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parse `YYYY-MM-DD`
pub fn parse_date(date: &str) -> PredictResult<NaiveDate> {
    NaiveDate::parse_from_str(date, DATE_FORMAT).map_err(|_| {
        PredictError::invalid_input(format!("date '{}' must be a valid YYYY-MM-DD date", date))
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarFeatures {
    pub month: u32,
    pub day: u32,
    /// Monday = 0 .. Sunday = 6
    pub weekday: u32,
    pub quarter: u32,
    pub is_weekend: bool,
    pub is_month_start: bool,
    pub is_month_end: bool,
}

impl CalendarFeatures {
    pub fn from_date(date: NaiveDate) -> Self {
        let month = date.month();
        let day = date.day();
        let weekday = date.weekday().num_days_from_monday();

        Self {
            month,
            day,
            weekday,
            quarter: (month - 1) / 3 + 1,
            is_weekend: weekday >= 5,
            is_month_start: day <= 3,
            // Fixed cut-off, not the real last day of the month
            is_month_end: day >= 28,
        }
    }

    /// (column, value) pairs in schema naming
    pub fn entries(&self) -> [(&'static str, f64); 8] {
        let flag = |b: bool| if b { 1.0 } else { 0.0 };
        [
            (schema::MONTH, self.month as f64),
            (schema::DAY, self.day as f64),
            (schema::WEEKDAY, self.weekday as f64),
            (schema::QUARTER, self.quarter as f64),
            (schema::IS_WEEKEND, flag(self.is_weekend)),
            (schema::IS_MONTH_END, flag(self.is_month_end)),
            (schema::IS_MONTH_START, flag(self.is_month_start)),
            (schema::DAYS_FROM_MONTH_START, self.day as f64),
        ]
    }
}
