use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;
use thiserror::Error;

/// A single spreadsheet value as it comes out of the decoder.
///
/// Deserializes untagged so that JSON grids such as
/// `["C1", "Ward A", 10, null]` map directly onto a row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum Cell {
    Number(f64),
    Text(String),
    #[default]
    Empty,
}

pub type Row = Vec<Cell>;
pub type Sheet = Vec<Row>;

static EMPTY: Cell = Cell::Empty;

/// Cell lookup that treats ragged rows as padded with empties.
pub fn cell_at(row: &[Cell], col: usize) -> &Cell {
    row.get(col).unwrap_or(&EMPTY)
}

impl Cell {
    /// Textual form of the cell, the same text a spreadsheet would show.
    pub fn text(&self) -> String {
        match self {
            Cell::Number(n) if n.fract() == 0.0 && n.abs() < i64::MAX as f64 => {
                format!("{}", *n as i64)
            }
            Cell::Number(n) => n.to_string(),
            Cell::Text(s) => s.clone(),
            Cell::Empty => String::new(),
        }
    }

    pub fn is_blank(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            Cell::Number(_) => false,
        }
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::Number(value)
    }
}

impl From<i64> for Cell {
    fn from(value: i64) -> Self {
        Cell::Number(value as f64)
    }
}

/// One entry of a sheet's date-column map.
///
/// Flat sheets carry a single column index per date, banded sheets the
/// `(remain, new, transferred-in)` triplet.
#[derive(Debug, Clone, PartialEq)]
pub struct DateColumn {
    pub label: String,
    pub columns: SmallVec<[usize; 3]>,
}

impl DateColumn {
    pub fn first_column(&self) -> usize {
        self.columns[0]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub date: String,
    pub value: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepartmentRow {
    pub code: String,
    pub name: String,
    pub values: Vec<Cell>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionResult {
    pub chart_data: Vec<TrendPoint>,
    pub table_data: Vec<DepartmentRow>,
    pub dates: Vec<String>,
    pub total_today: u64,
}

impl ExtractionResult {
    pub fn new(chart_data: Vec<TrendPoint>, table_data: Vec<DepartmentRow>) -> Self {
        let dates = chart_data.iter().map(|p| p.date.clone()).collect();
        let total_today = chart_data.last().map_or(0, |p| p.value);
        Self {
            chart_data,
            table_data,
            dates,
            total_today,
        }
    }

    pub fn value_on(&self, date: &str) -> Option<u64> {
        self.chart_data
            .iter()
            .find(|p| p.date == date)
            .map(|p| p.value)
    }
}

/// Degradations applied while extracting. None of these abort extraction.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractionIssue {
    #[error("no header row with date labels, fell back to row 0")]
    MissingHeaderRow,

    #[error("no usable total row, trend values default to 0")]
    MissingTotalRow,

    #[error("{count} non-numeric cell(s) counted as 0")]
    NonNumericCell { count: usize },

    #[error("sheet has too few rows to extract")]
    EmptySheet,
}

/// Result of an extractor together with what it had to paper over.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Extraction {
    pub result: ExtractionResult,
    pub issues: Vec<ExtractionIssue>,
}

impl Extraction {
    pub fn empty() -> Self {
        Self {
            result: ExtractionResult::default(),
            issues: vec![ExtractionIssue::EmptySheet],
        }
    }

    pub fn log_issues(&self, layout: &str) {
        for issue in &self.issues {
            tracing::warn!("{} sheet: {}", layout, issue);
        }
    }
}

impl fmt::Display for ExtractionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} dates, {} departments, total today {}",
            self.dates.len(),
            self.table_data.len(),
            self.total_today
        )
    }
}
