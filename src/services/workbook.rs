use bytes::{Bytes, BytesMut};
use calamine::{open_workbook_from_rs, Data, Range, Reader, Xlsx};
use futures_util::StreamExt;
use reqwest::Client;
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::io::Cursor;

use crate::error::AppError;
use crate::models::{Category, TaggedSheet};
use crate::services::census::{Cell, Row, Sheet};

/// A worksheet as decoded, before it is assigned a category.
#[derive(Debug, Clone)]
pub struct NamedSheet {
    pub name: String,
    pub rows: Sheet,
}

/// Which workbook sheet holds which category, keyed by category.
///
/// An empty mapping means the legacy positional order of [`Category::ALL`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(transparent)]
pub struct SheetMapping(BTreeMap<Category, String>);

impl SheetMapping {
    pub fn new(entries: impl IntoIterator<Item = (Category, String)>) -> Self {
        Self(entries.into_iter().collect())
    }

    pub fn is_positional(&self) -> bool {
        self.0.is_empty()
    }

    /// Assigns decoded sheets to categories, failing on anything ambiguous.
    pub fn resolve(&self, sheets: Vec<NamedSheet>) -> Result<Vec<TaggedSheet>, AppError> {
        if self.is_positional() {
            if sheets.len() < Category::ALL.len() {
                return Err(AppError::UnknownSheetMapping(format!(
                    "workbook has {} sheet(s), expected at least {} for positional mapping",
                    sheets.len(),
                    Category::ALL.len()
                )));
            }
            tracing::warn!("No sheet mapping supplied, assigning categories by position");
            return Ok(Category::ALL
                .into_iter()
                .zip(sheets)
                .map(|(category, sheet)| {
                    tracing::debug!("Sheet '{}' -> {}", sheet.name, category);
                    TaggedSheet {
                        category,
                        rows: sheet.rows,
                    }
                })
                .collect());
        }

        let missing: Vec<&str> = Category::ALL
            .iter()
            .filter(|&c| !self.0.contains_key(c))
            .map(|c| c.id())
            .collect();
        if !missing.is_empty() {
            return Err(AppError::UnknownSheetMapping(format!(
                "no sheet mapped for: {}",
                missing.join(", ")
            )));
        }

        let mut seen = HashSet::new();
        let mut by_name: BTreeMap<String, Sheet> = BTreeMap::new();
        for sheet in sheets {
            by_name.insert(sheet.name, sheet.rows);
        }

        self.0
            .iter()
            .map(|(category, name)| {
                if !seen.insert(name.as_str()) {
                    return Err(AppError::UnknownSheetMapping(format!(
                        "sheet '{}' is mapped to more than one category",
                        name
                    )));
                }
                let rows = by_name.get(name).cloned().ok_or_else(|| {
                    AppError::UnknownSheetMapping(format!(
                        "sheet '{}' for {} not found in workbook",
                        name, category
                    ))
                })?;
                Ok(TaggedSheet {
                    category: *category,
                    rows,
                })
            })
            .collect()
    }
}

pub fn cell_from_data(value: &Data) -> Cell {
    match value {
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Float(f) => Cell::Number(*f),
        Data::String(s) => Cell::Text(s.clone()),
        Data::Bool(b) => Cell::Text(if *b { "TRUE" } else { "FALSE" }.to_string()),
        Data::DateTime(d) => match d.as_datetime() {
            Some(dt) => Cell::Text(dt.format("%Y-%m-%d").to_string()),
            None => Cell::Number(d.as_f64()),
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::Text(s.clone()),
        Data::Error(_) | Data::Empty => Cell::Empty,
    }
}

/// Converts a calamine range into rows anchored at A1.
///
/// calamine starts a range at the first non-empty cell; padding it back
/// keeps row indices equal to spreadsheet row numbers minus one.
pub fn range_to_sheet(range: &Range<Data>) -> Sheet {
    let (row_offset, col_offset) = match range.start() {
        Some((row, col)) => (row as usize, col as usize),
        None => return Vec::new(),
    };

    let mut sheet: Sheet = vec![Vec::new(); row_offset];
    sheet.extend(range.rows().map(|cells| {
        let mut row: Row = vec![Cell::Empty; col_offset];
        row.extend(cells.iter().map(cell_from_data));
        row
    }));
    sheet
}

pub fn decode_workbook(file_data: Bytes) -> Result<Vec<NamedSheet>, AppError> {
    let start = std::time::Instant::now();
    tracing::info!("Opening workbook ({} KB)", file_data.len() / 1024);

    let cursor = Cursor::new(file_data);
    let mut workbook: Xlsx<_> = open_workbook_from_rs(cursor)
        .map_err(|e| {
            tracing::error!("Failed to open Excel file: {}", e);
            AppError::FileProcessingError(format!("Failed to open Excel file: {}", e))
        })?;

    let sheet_names = workbook.sheet_names().to_vec();
    tracing::info!("Found {} sheets: {:?}", sheet_names.len(), sheet_names);

    let mut sheets = Vec::with_capacity(sheet_names.len());
    for name in sheet_names {
        let range = workbook.worksheet_range(&name)?;
        let rows = range_to_sheet(&range);
        tracing::debug!("Sheet '{}': {} rows", name, rows.len());
        sheets.push(NamedSheet { name, rows });
    }

    tracing::info!("Workbook decoded in {:?}", start.elapsed());
    Ok(sheets)
}

pub async fn load_file_from_url(client: &Client, url: &str, max_size: usize) -> Result<Bytes, AppError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| AppError::HttpError(format!("Failed to fetch file: {}", e)))?;

    if !response.status().is_success() {
        return Err(AppError::HttpError(
            format!("Failed to fetch file. Status: {}", response.status())
        ));
    }

    if response.content_length().map_or(false, |len| len as usize > max_size) {
        return Err(AppError::InvalidInput(format!("File exceeds {} bytes", max_size)));
    }

    let mut body = BytesMut::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk
            .map_err(|e| AppError::HttpError(format!("Failed to read response bytes: {}", e)))?;
        if body.len() + chunk.len() > max_size {
            return Err(AppError::InvalidInput(format!("File exceeds {} bytes", max_size)));
        }
        body.extend_from_slice(&chunk);
    }

    Ok(body.freeze())
}
