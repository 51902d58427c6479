use super::types::*;
use super::utils::*;
use super::SheetExtractor;

/// Columns per date: carried-over, newly admitted, transferred in.
const BAND_WIDTH: usize = 3;
/// Header, sub-header and at least one ward row.
const MIN_ROWS: usize = 3;
/// Data starts below the fixed "remain / new / transferred-in" sub-header.
const SUB_HEADER_ROWS: usize = 1;

/// Extractor for the inpatient ward sheet, where each date label spans a
/// band of three columns and the daily total is summed over the wards.
#[derive(Debug, Clone, Copy, Default)]
pub struct BandedExtractor;

impl BandedExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl SheetExtractor for BandedExtractor {
    fn layout(&self) -> &'static str {
        "banded"
    }

    fn extract(&self, sheet: &[Row]) -> Extraction {
        if sheet.len() < MIN_ROWS {
            return Extraction::empty();
        }
        let mut issues = Vec::new();

        // Sub-header rows contain unrelated dashed labels, so no lenient pass here.
        let header = find_header_row(sheet, &[DateMatch::YearDash]);
        if header.matched_by.is_none() {
            issues.push(ExtractionIssue::MissingHeaderRow);
        }
        let dates = date_columns(&sheet[header.index], DateMatch::YearDash, BAND_WIDTH);

        let wards: Vec<&Row> = sheet
            .iter()
            .skip(header.index + 1 + SUB_HEADER_ROWS)
            .filter(|row| {
                let name = cell_at(row, 1);
                !name.is_blank() && !contains_total_marker(&name.text())
            })
            .collect();
        tracing::debug!("Banded sheet: {} dates, {} ward rows", dates.len(), wards.len());

        let mut non_numeric = 0;
        let mut totals = vec![0u64; dates.len()];
        let table_data = wards
            .iter()
            .map(|row| {
                let values = dates
                    .iter()
                    .zip(totals.iter_mut())
                    .map(|(date, total)| {
                        let sum: u64 = date
                            .columns
                            .iter()
                            .map(|&col| {
                                let cell = cell_at(row, col);
                                if is_non_numeric(cell) {
                                    non_numeric += 1;
                                }
                                coerce_non_negative_int(cell)
                            })
                            .fold(0u64, u64::saturating_add);
                        *total = total.saturating_add(sum);
                        Cell::Number(sum as f64)
                    })
                    .collect();
                DepartmentRow {
                    code: cell_at(row, 0).text(),
                    name: cell_at(row, 1).text(),
                    values,
                }
            })
            .collect();

        if non_numeric > 0 {
            issues.push(ExtractionIssue::NonNumericCell { count: non_numeric });
        }

        let chart_data = dates
            .iter()
            .zip(totals)
            .map(|(date, value)| TrendPoint {
                date: date.label.clone(),
                value,
            })
            .collect();

        Extraction {
            result: ExtractionResult::new(chart_data, table_data),
            issues,
        }
    }
}

/// Extracts a banded inpatient sheet. Never fails; see [`BandedExtractor`].
pub fn extract_banded(sheet: &[Row]) -> ExtractionResult {
    BandedExtractor::new().run(sheet)
}
