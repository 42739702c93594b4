//! Daily close-price series with first-class missing observations.

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricePoint {
    pub date: NaiveDate,
    /// `None` marks a session with no usable close.
    pub close: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceSeries {
    pub points: Vec<PricePoint>,
}

impl PriceSeries {
    /// Builds a series, sorting by date. Later duplicates of a date win.
    pub fn new(mut points: Vec<PricePoint>) -> Self {
        points.sort_by_key(|p| p.date);
        points.dedup_by(|later, earlier| {
            if later.date == earlier.date {
                *earlier = *later;
                true
            } else {
                false
            }
        });
        Self { points }
    }

    pub fn from_closes(start: NaiveDate, closes: &[f64]) -> Self {
        let points = closes
            .iter()
            .enumerate()
            .map(|(i, &close)| PricePoint {
                date: start + Duration::days(i as i64),
                close: Some(close),
            })
            .collect();
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Non-missing closes in date order.
    pub fn observations(&self) -> Vec<f64> {
        self.points.iter().filter_map(|p| p.close).collect()
    }

    /// Close of the final session, `None` if that session is missing.
    pub fn latest_close(&self) -> Option<f64> {
        self.points.last().and_then(|p| p.close)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.points.last().map(|p| p.date)
    }

    /// Last non-missing close of each week, keyed by the week-end date.
    /// Weeks without any observation are absent from the map.
    pub fn resample_weekly(&self, anchor: Weekday) -> BTreeMap<NaiveDate, f64> {
        let mut weekly = BTreeMap::new();
        for point in &self.points {
            if let Some(close) = point.close {
                weekly.insert(week_ending(point.date, anchor), close);
            }
        }
        weekly
    }
}

/// The first `anchor` weekday on or after `date`.
pub fn week_ending(date: NaiveDate, anchor: Weekday) -> NaiveDate {
    let target = anchor.num_days_from_monday() as i64;
    let current = date.weekday().num_days_from_monday() as i64;
    date + Duration::days((target - current).rem_euclid(7))
}

pub fn parse_weekday(value: &str) -> Option<Weekday> {
    match value.trim().to_lowercase().as_str() {
        "mon" | "monday" => Some(Weekday::Mon),
        "tue" | "tuesday" => Some(Weekday::Tue),
        "wed" | "wednesday" => Some(Weekday::Wed),
        "thu" | "thursday" => Some(Weekday::Thu),
        "fri" | "friday" => Some(Weekday::Fri),
        "sat" | "saturday" => Some(Weekday::Sat),
        "sun" | "sunday" => Some(Weekday::Sun),
        _ => None,
    }
}
