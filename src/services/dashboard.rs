use chrono::{DateTime, NaiveDate, Utc};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::HashSet;

use crate::error::AppError;
use crate::models::{Category, CategoryFilter, Layout, TaggedSheet, TotalRowHints};
use crate::services::census::utils::{coerce_non_negative_int, parse_date_token};
use crate::services::census::{extract_category, ExtractionResult};

/// Ranking size when every category is shown together.
const TOP_DEPARTMENTS: usize = 10;
/// Departments above this many patients are flagged busy.
const BUSY_THRESHOLD: u64 = 40;

#[derive(Debug, Clone, Serialize)]
pub struct CategoryReport {
    pub category: Category,
    pub label: &'static str,
    pub layout: Layout,
    pub result: ExtractionResult,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DepartmentStatus {
    Normal,
    Busy,
}

impl DepartmentStatus {
    fn for_value(value: u64) -> Self {
        if value > BUSY_THRESHOLD {
            DepartmentStatus::Busy
        } else {
            DepartmentStatus::Normal
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedDepartment {
    pub category: Category,
    pub code: String,
    pub name: String,
    pub value: u64,
    pub status: DepartmentStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryCount {
    pub category: Category,
    pub label: &'static str,
    pub value: u64,
}

/// Headline numbers for one selected date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailySnapshot {
    pub date: String,
    pub display_date: Option<NaiveDate>,
    pub total_patients: u64,
    pub counts: Vec<CategoryCount>,
    pub opd_special_combined: u64,
    pub change_percent: Option<f64>,
    pub departments: Vec<RankedDepartment>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardReport {
    pub generated_at: DateTime<Utc>,
    pub categories: Vec<CategoryReport>,
    pub snapshot: Option<DailySnapshot>,
}

/// Runs the extractor for every tagged sheet, one category each.
pub fn extract_all(sheets: &[TaggedSheet], hints: &TotalRowHints) -> Result<Vec<CategoryReport>, AppError> {
    let mut seen = HashSet::new();
    if let Some(dup) = sheets.iter().find(|s| !seen.insert(s.category)) {
        return Err(AppError::UnknownSheetMapping(format!(
            "category {} supplied more than once",
            dup.category
        )));
    }

    let mut reports: Vec<CategoryReport> = sheets
        .par_iter()
        .map(|sheet| {
            let extraction = extract_category(sheet.category, &sheet.rows, hints);
            CategoryReport {
                category: sheet.category,
                label: sheet.category.label(),
                layout: sheet.category.layout(),
                warnings: extraction.issues.iter().map(|i| i.to_string()).collect(),
                result: extraction.result,
            }
        })
        .collect();
    reports.sort_by_key(|r| r.category);
    Ok(reports)
}

/// Every date seen in any category, chronological when all labels parse.
pub fn date_axis(reports: &[CategoryReport]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut axis: Vec<String> = reports
        .iter()
        .flat_map(|r| r.result.dates.iter())
        .filter(|d| seen.insert(d.as_str()))
        .cloned()
        .collect();

    let parsed: Option<Vec<_>> = axis
        .iter()
        .map(|d| parse_date_token(d).calendar())
        .collect();
    if let Some(mut keyed) = parsed.map(|dates| dates.into_iter().zip(axis.clone()).collect::<Vec<_>>()) {
        keyed.sort_by_key(|(date, _)| *date);
        axis = keyed.into_iter().map(|(_, label)| label).collect();
    }
    axis
}

fn departments_on(report: &CategoryReport, date: &str) -> Vec<RankedDepartment> {
    let Some(index) = report.result.dates.iter().position(|d| d == date) else {
        return Vec::new();
    };
    report
        .result
        .table_data
        .iter()
        .map(|row| {
            let value = row.values.get(index).map_or(0, coerce_non_negative_int);
            RankedDepartment {
                category: report.category,
                code: row.code.clone(),
                name: row.name.clone(),
                value,
                status: DepartmentStatus::for_value(value),
            }
        })
        .collect()
}

fn total_on(reports: &[CategoryReport], date: &str) -> u64 {
    reports
        .iter()
        .map(|r| r.result.value_on(date).unwrap_or(0))
        .fold(0u64, u64::saturating_add)
}

/// Builds the headline view for `date`, or the latest date when unset.
///
/// Returns `None` when no category has any dates.
pub fn build_snapshot(
    reports: &[CategoryReport],
    date: Option<&str>,
    filter: CategoryFilter,
) -> Result<Option<DailySnapshot>, AppError> {
    let axis = date_axis(reports);
    let position = match date {
        Some(wanted) => Some(
            axis.iter()
                .position(|d| d == wanted.trim())
                .ok_or_else(|| AppError::InvalidInput(format!("date '{}' not found in any sheet", wanted)))?,
        ),
        None => axis.len().checked_sub(1),
    };
    let Some(position) = position else {
        return Ok(None);
    };
    let date = axis[position].as_str();

    let counts: Vec<CategoryCount> = reports
        .iter()
        .map(|r| CategoryCount {
            category: r.category,
            label: r.label,
            value: r.result.value_on(date).unwrap_or(0),
        })
        .collect();
    let count_of = |category: Category| {
        counts
            .iter()
            .find(|c| c.category == category)
            .map_or(0, |c| c.value)
    };

    let total_patients = total_on(reports, date);
    let change_percent = position
        .checked_sub(1)
        .map(|prev| total_on(reports, &axis[prev]))
        .filter(|&prev| prev > 0)
        .map(|prev| {
            let change = (total_patients as f64 - prev as f64) / prev as f64 * 100.0;
            (change * 10.0).round() / 10.0
        });

    let mut departments: Vec<RankedDepartment> = reports
        .iter()
        .filter(|r| match filter {
            CategoryFilter::All => true,
            CategoryFilter::Only(category) => r.category == category,
        })
        .flat_map(|r| departments_on(r, date))
        .collect();
    departments.sort_by(|a, b| b.value.cmp(&a.value));
    if filter == CategoryFilter::All {
        departments.truncate(TOP_DEPARTMENTS);
    }

    Ok(Some(DailySnapshot {
        date: date.to_string(),
        display_date: parse_date_token(date).calendar().and_then(|d| d.to_gregorian()),
        total_patients,
        opd_special_combined: count_of(Category::OpdSpecial)
            .saturating_add(count_of(Category::OpdPremium)),
        counts,
        change_percent,
        departments,
    }))
}

pub fn build_report(
    reports: Vec<CategoryReport>,
    date: Option<&str>,
    filter: CategoryFilter,
) -> Result<DashboardReport, AppError> {
    let snapshot = build_snapshot(&reports, date, filter)?;
    if let Some(snapshot) = &snapshot {
        tracing::info!(
            "Snapshot for {}: {} patients across {} categories",
            snapshot.date,
            snapshot.total_patients,
            reports.len()
        );
    }
    Ok(DashboardReport {
        generated_at: Utc::now(),
        categories: reports,
        snapshot,
    })
}
