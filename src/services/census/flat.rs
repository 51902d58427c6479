use super::types::*;
use super::utils::*;
use super::SheetExtractor;

/// Extractor for sheets with one column per date and a grand-total row.
///
/// The caller supplies the 1-based spreadsheet row where the total is
/// expected; it is only trusted when that row actually carries a value
/// under the first date.
#[derive(Debug, Clone, Copy)]
pub struct FlatExtractor {
    expected_total_row: usize,
}

impl FlatExtractor {
    pub fn new(expected_total_row: usize) -> Self {
        Self { expected_total_row }
    }

    fn locate_total_row(&self, sheet: &[Row], dates: &[DateColumn]) -> Option<usize> {
        if let (Some(first), Some(index)) = (dates.first(), self.expected_total_row.checked_sub(1)) {
            let usable = sheet
                .get(index)
                .map_or(false, |row| !cell_at(row, first.first_column()).is_blank());
            if usable {
                tracing::debug!("Using configured total row {}", self.expected_total_row);
                return Some(index);
            }
        }

        let found = sheet.iter().position(row_has_total_marker);
        if let Some(index) = found {
            tracing::debug!(
                "Configured total row {} unusable, found marker at index {}",
                self.expected_total_row,
                index
            );
        }
        found
    }
}

impl SheetExtractor for FlatExtractor {
    fn layout(&self) -> &'static str {
        "flat"
    }

    fn extract(&self, sheet: &[Row]) -> Extraction {
        if sheet.is_empty() {
            return Extraction::empty();
        }
        let mut issues = Vec::new();

        let header = find_header_row(sheet, &[DateMatch::YearDash, DateMatch::Lenient]);
        if header.matched_by.is_none() {
            issues.push(ExtractionIssue::MissingHeaderRow);
        }
        let mode = header.matched_by.unwrap_or(DateMatch::YearDash);
        let dates = date_columns(&sheet[header.index], mode, 1);

        let total_row = self.locate_total_row(sheet, &dates);
        let chart_data: Vec<TrendPoint> = match total_row {
            Some(index) => {
                let row = &sheet[index];
                let non_numeric = dates
                    .iter()
                    .filter(|d| is_non_numeric(cell_at(row, d.first_column())))
                    .count();
                if non_numeric > 0 {
                    issues.push(ExtractionIssue::NonNumericCell { count: non_numeric });
                }
                dates
                    .iter()
                    .map(|d| TrendPoint {
                        date: d.label.clone(),
                        value: coerce_non_negative_int(cell_at(row, d.first_column())),
                    })
                    .collect()
            }
            None => {
                issues.push(ExtractionIssue::MissingTotalRow);
                dates
                    .iter()
                    .map(|d| TrendPoint {
                        date: d.label.clone(),
                        value: 0,
                    })
                    .collect()
            }
        };

        let table_data = sheet
            .iter()
            .enumerate()
            .skip(header.index + 1)
            .filter(|(index, _)| Some(*index) != total_row)
            .filter(|(_, row)| !cell_at(row, 1).is_blank())
            .map(|(_, row)| DepartmentRow {
                code: cell_at(row, 0).text(),
                name: cell_at(row, 1).text(),
                values: dates
                    .iter()
                    .map(|d| cell_at(row, d.first_column()).clone())
                    .collect(),
            })
            .collect();

        Extraction {
            result: ExtractionResult::new(chart_data, table_data),
            issues,
        }
    }
}

/// Extracts a flat daily-total sheet. Never fails; see [`FlatExtractor`].
pub fn extract_flat(sheet: &[Row], expected_total_row: usize) -> ExtractionResult {
    FlatExtractor::new(expected_total_row).run(sheet)
}
