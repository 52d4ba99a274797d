//! Common types used across the platform

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Supported languages for labels and messages
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Spanish,
    English,
}

impl Language {
    pub fn code(&self) -> &'static str {
        match self {
            Language::Spanish => "es",
            Language::English => "en",
        }
    }

    /// Parse a language code, falling back to Spanish for anything unknown
    pub fn from_code(code: &str) -> Self {
        match code.trim().to_ascii_lowercase().as_str() {
            "en" | "english" => Language::English,
            _ => Language::Spanish,
        }
    }

    /// Abbreviated month name (1-based month)
    pub fn month_abbrev(&self, month: u32) -> &'static str {
        const ES: [&str; 12] = [
            "ene", "feb", "mar", "abr", "may", "jun", "jul", "ago", "sep", "oct", "nov", "dic",
        ];
        const EN: [&str; 12] = [
            "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
        ];
        let idx = (month.clamp(1, 12) - 1) as usize;
        match self {
            Language::Spanish => ES[idx],
            Language::English => EN[idx],
        }
    }
}

/// Inclusive date range for queries
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// A range covering a single day
    pub fn single_day(day: NaiveDate) -> Self {
        Self {
            start: day,
            end: day,
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

/// Lifecycle of a query-driven view.
///
/// `Loading` is re-entered on every new query. A view never holds two
/// in-flight queries: a newer query supersedes the older one.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", content = "data", rename_all = "snake_case")]
pub enum QueryState<T> {
    Idle,
    Loading,
    Success(T),
    Empty,
    Error(String),
}

impl<T> Default for QueryState<T> {
    fn default() -> Self {
        QueryState::Idle
    }
}

impl<T> QueryState<T> {
    /// Wrap a finished result, choosing `Empty` when the payload has nothing to show
    pub fn finished(value: T, is_empty: bool) -> Self {
        if is_empty {
            QueryState::Empty
        } else {
            QueryState::Success(value)
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, QueryState::Loading)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            QueryState::Success(_) | QueryState::Empty | QueryState::Error(_)
        )
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            QueryState::Success(value) => Some(value),
            _ => None,
        }
    }

    /// Phase name without the payload
    pub fn phase(&self) -> &'static str {
        match self {
            QueryState::Idle => "idle",
            QueryState::Loading => "loading",
            QueryState::Success(_) => "success",
            QueryState::Empty => "empty",
            QueryState::Error(_) => "error",
        }
    }
}
