use crate::column_mapping::ColumnMapping;
use crate::models::*;
use anyhow::{Context, Result};
use calamine::{open_workbook_auto, Data, Reader};
use rayon::prelude::*;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

/// Stands in for any cell that is missing or blank after trimming.
pub const NOT_AVAILABLE: &str = "This value is not available in the intake form";

#[derive(Debug, Clone, Default)]
pub struct DocumentProcessor {
    mapping: ColumnMapping,
}

impl DocumentProcessor {
    pub fn new(mapping: ColumnMapping) -> Self {
        Self { mapping }
    }

    /// Reads every record of `sheet` and turns each one into a document.
    pub fn process_spreadsheet(&self, path: &Path, sheet: &str) -> Result<Vec<Document>> {
        let records = read_records(path, sheet)?;
        let documents = self.to_documents(&records);

        log::info!("Processed {} intake records from {}", documents.len(), path.display());
        Ok(documents)
    }

    pub fn to_documents(&self, records: &[IntakeRecord]) -> Vec<Document> {
        records
            .par_iter()
            .map(|record| self.to_document(record))
            .collect()
    }

    pub fn to_document(&self, record: &IntakeRecord) -> Document {
        let mut lines = Vec::with_capacity(record.cells.len());
        let mut metadata = BTreeMap::new();

        for (column, cell) in &record.cells {
            let value = normalize_value(cell);
            lines.push(format!("{}: {}", self.mapping.label(column), value));
            metadata.insert(column.clone(), value);
        }

        Document {
            row: record.row,
            text: lines.join("\n"),
            metadata,
        }
    }
}

fn normalize_value(cell: &CellValue) -> String {
    let text = cell.to_text();
    let trimmed = text.trim();
    if trimmed.is_empty() {
        NOT_AVAILABLE.to_string()
    } else {
        trimmed.to_string()
    }
}

pub fn read_records(path: &Path, sheet: &str) -> Result<Vec<IntakeRecord>> {
    let mut workbook = open_workbook_auto(path)
        .with_context(|| format!("failed to open spreadsheet {}", path.display()))?;
    let range = workbook
        .worksheet_range(sheet)
        .with_context(|| format!("sheet {:?} not found in {}", sheet, path.display()))?;

    Ok(records_from_rows(range.rows()))
}

/// First row is the header, every later row with any content is a record.
pub fn records_from_rows<'a, I>(mut rows: I) -> Vec<IntakeRecord>
where
    I: Iterator<Item = &'a [Data]>,
{
    let header = match rows.next() {
        Some(header) => header_keys(header),
        None => return Vec::new(),
    };

    let mut records = Vec::new();
    for (row, cells) in rows.enumerate() {
        let values: Vec<CellValue> = cells.iter().map(cell_value).collect();
        if values.iter().all(|v| v.to_text().trim().is_empty()) {
            continue;
        }

        let cells = header
            .iter()
            .enumerate()
            .map(|(idx, key)| {
                let value = values.get(idx).cloned().unwrap_or(CellValue::Empty);
                (key.clone(), value)
            })
            .collect();
        records.push(IntakeRecord::new(row, cells));
    }

    records
}

fn header_keys(header: &[Data]) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();

    header
        .iter()
        .enumerate()
        .map(|(idx, cell)| {
            let text = cell_value(cell).to_text();
            let base = match text.trim() {
                "" => format!("Unnamed: {}", idx),
                name => name.to_string(),
            };

            let count = seen.entry(base.clone()).or_insert(0);
            let key = if *count == 0 {
                base
            } else {
                format!("{}.{}", base, count)
            };
            *count += 1;
            key
        })
        .collect()
}

fn cell_value(cell: &Data) -> CellValue {
    match cell {
        Data::Empty => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Float(f) => CellValue::Float(*f),
        Data::Int(i) => CellValue::Int(*i),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(dt) => CellValue::Text(
            dt.as_datetime()
                .map(|ts| ts.to_string())
                .unwrap_or_else(|| dt.to_string()),
        ),
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
        // Formula errors such as #N/A count as missing.
        _ => CellValue::Empty,
    }
}
