use calamine::{open_workbook, Data, Range, Reader, Xlsx};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use tracing::{debug, warn};

use crate::config::{DATA_SHEET, DATA_START_ROW, DEFINITIONS_SHEET, ID_HEADER_ROW};

/// A sanitized observation value. Numeric cells stay numeric, text stays text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CellValue {
    Number(f64),
    Text(String),
}

/// One dated observation for a series. A `None` value marks a missing,
/// blank, or sentinel ("-") cell, which is distinct from zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub date: String,
    pub value: Option<CellValue>,
}

/// Metadata for one series, keyed externally by its identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesDefinition {
    pub group: Option<String>,
    pub name: Option<String>,
    pub unit: Option<String>,
    pub note: Option<String>,
}

/// All observations for one series, in sheet order.
pub type Series = Vec<Observation>;

/// Definitions keyed by uppercased series identifier. The key is optional:
/// a metadata row with a blank identifier still lands in the map, under
/// `None` (a quirk of the source sheets, preserved deliberately).
pub type DefinitionMap = BTreeMap<Option<String>, SeriesDefinition>;

/// Observation series keyed by uppercased series identifier.
pub type SeriesMap = BTreeMap<String, Series>;

/// Everything extracted from one applicable workbook.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkbookExtract {
    pub definitions: DefinitionMap,
    pub observations: SeriesMap,
}

/// Parser for RBNZ statistical workbooks (one downloaded xlsx file)
///
/// # Expected "Data" sheet structure:
/// ```text
/// Rows 0-3: Title and publication notes
/// Row 4:    Series identifiers (col 1 onward; col 0 blank)
/// Row 5+:   Date label in col 0, one observation per identifier column
/// ```
///
/// The "Series Definitions" sheet is a plain table: one header row, then
/// group | name | id | unit | note.
pub struct WorkbookImporter {
    workbook_path: PathBuf,
}

impl WorkbookImporter {
    pub fn new(workbook_path: impl Into<PathBuf>) -> Self {
        Self {
            workbook_path: workbook_path.into(),
        }
    }

    /// Extract definitions and observations from the workbook.
    ///
    /// Returns `None` when the file cannot be opened as a workbook or lacks
    /// either expected sheet. Such files contribute nothing to the run; this
    /// is a no-op, not an error.
    pub fn import(&self) -> Option<WorkbookExtract> {
        let mut workbook: Xlsx<BufReader<File>> = match open_workbook(&self.workbook_path) {
            Ok(wb) => wb,
            Err(e) => {
                warn!("Skipping unreadable workbook {:?}: {e}", self.workbook_path);
                return None;
            }
        };

        let data = match workbook.worksheet_range(DATA_SHEET) {
            Ok(range) => range,
            Err(_) => {
                debug!(
                    "Workbook {:?} has no {DATA_SHEET:?} sheet, skipping",
                    self.workbook_path
                );
                return None;
            }
        };

        let definitions = match workbook.worksheet_range(DEFINITIONS_SHEET) {
            Ok(range) => range,
            Err(_) => {
                debug!(
                    "Workbook {:?} has no {DEFINITIONS_SHEET:?} sheet, skipping",
                    self.workbook_path
                );
                return None;
            }
        };

        Some(WorkbookExtract {
            definitions: extract_definitions(&definitions),
            observations: extract_observations(&data),
        })
    }
}

/// Extract the per-series observation lists from a "Data" sheet range.
pub fn extract_observations(range: &Range<Data>) -> SeriesMap {
    let mut series = SeriesMap::new();
    let Some((end_row, _)) = range.end() else {
        return series;
    };

    let columns = column_ids(range);
    if columns.is_empty() {
        return series;
    }

    // Date axis: column 0 from the first data row down to the first blank
    // cell. A hole truncates the axis even when later rows still hold data;
    // this matches the source layout exactly and is not extended past blanks.
    let mut dates = Vec::new();
    for row in DATA_START_ROW..=end_row {
        match cell_text(range, row, 0) {
            Some(label) => dates.push(label),
            None => break,
        }
    }

    for (offset, date) in dates.iter().enumerate() {
        let row = DATA_START_ROW + offset as u32;
        for (col, id) in &columns {
            let value = sanitize_value(range.get_value((row, *col)));
            series.entry(id.clone()).or_default().push(Observation {
                date: date.clone(),
                value,
            });
        }
    }

    series
}

/// Extract series metadata from a "Series Definitions" sheet range.
///
/// The first row is a header. Identifiers and units are uppercased; all
/// fields are trimmed. A row with a blank identifier still overwrites the
/// `None` entry.
pub fn extract_definitions(range: &Range<Data>) -> DefinitionMap {
    let mut definitions = DefinitionMap::new();
    let Some((end_row, _)) = range.end() else {
        return definitions;
    };

    for row in 1..=end_row {
        let id = cell_text(range, row, 2).map(|s| s.to_uppercase());
        definitions.insert(
            id,
            SeriesDefinition {
                group: cell_text(range, row, 0),
                name: cell_text(range, row, 1),
                unit: cell_text(range, row, 3).map(|s| s.to_uppercase()),
                note: cell_text(range, row, 4),
            },
        );
    }

    definitions
}

/// Column-to-identifier assignments from the header row.
///
/// Cells from column 1 onward with a non-empty value become identifiers.
/// Blank headers are dropped, which shifts every later identifier one data
/// column left: the column an identifier reads from is its position among
/// the non-empty headers (1-based), not the raw column its header sits in.
/// Building the `(column, id)` pairs once keeps that rule visible.
fn column_ids(range: &Range<Data>) -> Vec<(u32, String)> {
    let mut ids: Vec<(u32, String)> = Vec::new();
    let Some((_, end_col)) = range.end() else {
        return ids;
    };

    for col in 1..=end_col {
        if let Some(text) = cell_text(range, ID_HEADER_ROW, col) {
            ids.push((ids.len() as u32 + 1, text.to_uppercase()));
        }
    }

    ids
}

/// Sanitize one observation cell. Missing, blank, whitespace-only, and the
/// literal "-" sentinel all collapse to `None`; anything else passes through
/// with its cell type intact.
pub fn sanitize_value(cell: Option<&Data>) -> Option<CellValue> {
    match cell {
        None | Some(Data::Empty) => None,
        Some(Data::Float(f)) => Some(CellValue::Number(*f)),
        Some(Data::Int(i)) => Some(CellValue::Number(*i as f64)),
        Some(Data::String(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() || trimmed == "-" {
                None
            } else {
                Some(CellValue::Text(s.clone()))
            }
        }
        Some(other) => {
            let text = other.to_string();
            let trimmed = text.trim();
            if trimmed.is_empty() || trimmed == "-" {
                None
            } else {
                Some(CellValue::Text(text))
            }
        }
    }
}

/// Trimmed, non-empty text rendering of a cell, or `None`.
fn cell_text(range: &Range<Data>, row: u32, col: u32) -> Option<String> {
    match range.get_value((row, col)) {
        None | Some(Data::Empty) => None,
        Some(data) => {
            let text = data.to_string();
            let trimmed = text.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
    }
}
