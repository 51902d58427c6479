use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

use super::types::{Cell, DateColumn, Row};

/// Buddhist-era years are Gregorian + 543; anything above this is treated as BE.
const BUDDHIST_ERA_THRESHOLD: i32 = 2400;
const BUDDHIST_ERA_OFFSET: i32 = 543;

const TOTAL_MARKER_TH: &str = "รวม";
const TOTAL_MARKER_EN: &str = "total";

static YEAR_DASH_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\d{4}-").expect("Failed to compile YEAR_DASH_RE")
});

static CALENDAR_DATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d{4})-(\d{1,2})-(\d{1,2})").expect("Failed to compile CALENDAR_DATE_RE")
});

static SEPARATED_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[^\s-]-[^\s-]").expect("Failed to compile SEPARATED_RE")
});

/// A year-month-day label as written in the sheet, era untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CalendarDate {
    pub year: i32,
    pub month: u32,
    pub day: u32,
}

impl CalendarDate {
    pub fn to_gregorian(&self) -> Option<NaiveDate> {
        let year = if self.year > BUDDHIST_ERA_THRESHOLD {
            self.year - BUDDHIST_ERA_OFFSET
        } else {
            self.year
        };
        NaiveDate::from_ymd_opt(year, self.month, self.day)
    }
}

/// Classification of a cell's text as a date label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateToken {
    /// Full `YYYY-M-D` date.
    Calendar(CalendarDate),
    /// A 4-digit year followed by a dash, without a parseable month/day.
    YearPrefixed,
    /// Some other dash-separated token such as `05-Jan`.
    Separated,
    NoMatch,
}

impl DateToken {
    pub fn is_year_dash(&self) -> bool {
        matches!(self, DateToken::Calendar(_) | DateToken::YearPrefixed)
    }

    pub fn is_date_like(&self) -> bool {
        !matches!(self, DateToken::NoMatch)
    }

    pub fn calendar(&self) -> Option<CalendarDate> {
        match self {
            DateToken::Calendar(date) => Some(*date),
            _ => None,
        }
    }
}

pub fn parse_date_token(text: &str) -> DateToken {
    if YEAR_DASH_RE.is_match(text) {
        return CALENDAR_DATE_RE
            .captures(text)
            .and_then(|caps| {
                Some(CalendarDate {
                    year: caps[1].parse().ok()?,
                    month: caps[2].parse().ok()?,
                    day: caps[3].parse().ok()?,
                })
            })
            .map_or(DateToken::YearPrefixed, DateToken::Calendar);
    }
    if SEPARATED_RE.is_match(text) {
        return DateToken::Separated;
    }
    DateToken::NoMatch
}

/// How strictly a header scan recognises date labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateMatch {
    /// Only the 4-digit-year-dash form.
    YearDash,
    /// Any dash-separated token.
    Lenient,
}

impl DateMatch {
    pub fn accepts(&self, token: &DateToken) -> bool {
        match self {
            DateMatch::YearDash => token.is_year_dash(),
            DateMatch::Lenient => token.is_date_like(),
        }
    }
}

/// Where the header row was found, and which matching located it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderRow {
    pub index: usize,
    /// `None` when no row matched and row 0 was assumed.
    pub matched_by: Option<DateMatch>,
}

fn row_has_date(row: &Row, mode: DateMatch) -> bool {
    row.iter()
        .any(|cell| mode.accepts(&parse_date_token(&cell.text())))
}

/// Finds the first row carrying a date label, trying each mode in turn.
pub fn find_header_row(sheet: &[Row], modes: &[DateMatch]) -> HeaderRow {
    for &mode in modes {
        if let Some(index) = sheet.iter().position(|row| row_has_date(row, mode)) {
            tracing::debug!("Header row found at index {} ({:?})", index, mode);
            return HeaderRow {
                index,
                matched_by: Some(mode),
            };
        }
    }
    HeaderRow {
        index: 0,
        matched_by: None,
    }
}

/// Collects date columns from a header row, left to right.
///
/// `width` is the number of adjacent columns each date occupies; the
/// columns it covers past the labelled one are not inspected.
pub fn date_columns(header: &Row, mode: DateMatch, width: usize) -> Vec<DateColumn> {
    let mut columns = Vec::new();
    let mut col = 0;
    while col < header.len() {
        let label = header[col].text();
        let token = parse_date_token(&label);
        if mode.accepts(&token) {
            columns.push(DateColumn {
                label: label.trim().to_string(),
                columns: (col..col + width).collect(),
            });
            col += width;
        } else {
            col += 1;
        }
    }
    columns
}

pub fn contains_total_marker(text: &str) -> bool {
    text.contains(TOTAL_MARKER_TH) || text.to_lowercase().contains(TOTAL_MARKER_EN)
}

pub fn row_has_total_marker(row: &Row) -> bool {
    row.iter().any(|cell| contains_total_marker(&cell.text()))
}

/// Interprets a cell as a non-negative integer count.
///
/// Numbers truncate toward zero, text is parsed after dropping thousands
/// separators (falling back to its leading digits), and everything that
/// still is not a number becomes 0. Negative values clamp to 0.
pub fn coerce_non_negative_int(cell: &Cell) -> u64 {
    match cell {
        Cell::Number(n) => float_to_count(*n),
        Cell::Text(s) => parse_count(s).unwrap_or(0),
        Cell::Empty => 0,
    }
}

/// True when the cell holds something that is not a number.
pub fn is_non_numeric(cell: &Cell) -> bool {
    match cell {
        Cell::Number(n) => !n.is_finite(),
        Cell::Text(s) => !s.trim().is_empty() && parse_count(s).is_none(),
        Cell::Empty => false,
    }
}

fn float_to_count(n: f64) -> u64 {
    if n.is_finite() && n > 0.0 {
        n.trunc() as u64
    } else {
        0
    }
}

fn parse_count(text: &str) -> Option<u64> {
    let cleaned: String = text.trim().chars().filter(|c| *c != ',').collect();
    if let Ok(n) = cleaned.parse::<f64>() {
        return Some(float_to_count(n));
    }
    let digits: String = cleaned.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}
