use calamine::{open_workbook_auto_from_rs, Data, Reader};
use rust_xlsxwriter::{Format, Workbook};
use std::collections::HashMap;
use std::fs;
use std::io::Cursor;
use std::path::Path;
use tracing::{debug, info};

use crate::constants::EXPORT_FILE_SUFFIX;
use crate::error::{AppError, Result};
use crate::types::{Cell, Table};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";
const DATETIME_NUM_FORMAT: &str = "yyyy-mm-dd hh:mm:ss";

pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Input formats the reader understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetFormat {
    Workbook,
    Csv,
}

impl SheetFormat {
    pub fn from_file_name(name: &str) -> Result<Self> {
        let ext = Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => Ok(SheetFormat::Workbook),
            "csv" => Ok(SheetFormat::Csv),
            _ => Err(AppError::UnsupportedFormat(name.to_string())),
        }
    }
}

pub fn read_table(path: &Path) -> Result<Table> {
    let name = path.to_string_lossy().to_string();
    let bytes = fs::read(path)?;
    read_table_from_bytes(&name, bytes)
}

/// Parse the first worksheet (or the CSV body); the first row holds headers
pub fn read_table_from_bytes(file_name: &str, bytes: Vec<u8>) -> Result<Table> {
    let table = match SheetFormat::from_file_name(file_name)? {
        SheetFormat::Workbook => read_workbook(bytes)?,
        SheetFormat::Csv => read_csv(&bytes)?,
    };
    info!(file = %file_name, rows = table.len(), columns = table.headers().len(), "Loaded table");
    Ok(table)
}

fn read_workbook(bytes: Vec<u8>) -> Result<Table> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| AppError::Spreadsheet("No worksheet found".to_string()))??;

    let mut rows = range.rows();
    let Some(header_row) = rows.next() else {
        return Ok(Table::default());
    };
    let headers = header_names(header_row.iter().map(|c| c.to_string()));
    let body = rows.map(|row| row.iter().map(cell_from_data).collect()).collect();
    Ok(Table::new(headers, body))
}

fn cell_from_data(data: &Data) -> Cell {
    match data {
        Data::Empty | Data::Error(_) => Cell::Empty,
        Data::String(s) => Cell::Text(s.clone()),
        Data::Int(i) => Cell::Int(*i),
        Data::Float(f) => Cell::Float(*f),
        Data::Bool(b) => Cell::Bool(*b),
        Data::DateTime(dt) => dt
            .as_datetime()
            .map(Cell::DateTime)
            .unwrap_or_else(|| Cell::Float(dt.as_f64())),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::Text(s.clone()),
    }
}

fn read_csv(bytes: &[u8]) -> Result<Table> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(bytes);
    let headers = header_names(reader.headers()?.iter().map(|h| h.to_string()));
    let mut body = Vec::new();
    for record in reader.records() {
        body.push(record?.iter().map(cell_from_csv).collect());
    }
    Ok(Table::new(headers, body))
}

fn cell_from_csv(field: &str) -> Cell {
    if field.is_empty() {
        return Cell::Empty;
    }
    if let Ok(i) = field.parse::<i64>() {
        return Cell::Int(i);
    }
    if field.bytes().any(|b| b.is_ascii_digit()) {
        if let Ok(f) = field.parse::<f64>() {
            return Cell::Float(f);
        }
    }
    Cell::Text(field.to_string())
}

/// Blank headers become `Unnamed: <idx>`, repeats get a `.N` suffix
fn header_names(raw: impl Iterator<Item = String>) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    raw.enumerate()
        .map(|(idx, name)| {
            let base = if name.trim().is_empty() { format!("Unnamed: {}", idx) } else { name };
            let count = seen.entry(base.clone()).or_insert(0);
            let unique = if *count == 0 { base } else { format!("{}.{}", base, count) };
            *count += 1;
            unique
        })
        .collect()
}

/// Serialize a table as UTF-8 CSV with a BOM so spreadsheet apps pick the encoding
pub fn to_csv_bytes(table: &Table) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(UTF8_BOM.to_vec());
    writer.write_record(table.headers())?;
    for row in table.rows() {
        writer.write_record(row.iter().map(|c| c.to_string()))?;
    }
    writer
        .into_inner()
        .map_err(|e| AppError::Io(e.into_error()))
}

pub fn write_csv(table: &Table, path: &Path) -> Result<()> {
    let bytes = to_csv_bytes(table)?;
    fs::write(path, bytes)?;
    debug!(path = %path.display(), rows = table.len(), "Wrote CSV export");
    Ok(())
}

fn xlsx_row(idx: usize) -> Result<u32> {
    u32::try_from(idx).map_err(|_| AppError::Spreadsheet(format!("row {} out of range", idx)))
}

fn xlsx_col(idx: usize) -> Result<u16> {
    u16::try_from(idx).map_err(|_| AppError::Spreadsheet(format!("column {} out of range", idx)))
}

/// Serialize a table as a single-sheet workbook. Numbers stay numeric and
/// timestamps are real date cells shown as `yyyy-mm-dd hh:mm:ss`.
pub fn to_xlsx_bytes(table: &Table) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();
    let datetime_format = Format::new().set_num_format(DATETIME_NUM_FORMAT);

    let worksheet = workbook.add_worksheet();
    for (col, header) in table.headers().iter().enumerate() {
        worksheet.write_string_with_format(0, xlsx_col(col)?, header, &header_format)?;
    }
    for (idx, row) in table.rows().iter().enumerate() {
        let r = xlsx_row(idx + 1)?;
        for (col, cell) in row.iter().enumerate() {
            let c = xlsx_col(col)?;
            match cell {
                Cell::Empty => {}
                Cell::Text(s) if s.is_empty() => {}
                Cell::Text(s) => {
                    worksheet.write_string(r, c, s)?;
                }
                Cell::Int(i) => {
                    worksheet.write_number(r, c, *i as f64)?;
                }
                Cell::Float(v) => {
                    worksheet.write_number(r, c, *v)?;
                }
                Cell::Bool(b) => {
                    worksheet.write_boolean(r, c, *b)?;
                }
                Cell::DateTime(dt) => {
                    worksheet.write_datetime_with_format(r, c, dt, &datetime_format)?;
                }
            }
        }
    }
    worksheet.autofit();

    Ok(workbook.save_to_buffer()?)
}

pub fn write_xlsx(table: &Table, path: &Path) -> Result<()> {
    let bytes = to_xlsx_bytes(table)?;
    fs::write(path, bytes)?;
    debug!(path = %path.display(), rows = table.len(), "Wrote xlsx export");
    Ok(())
}

/// Write an export, picking the format from the extension (`.xlsx` or `.csv`)
pub fn write_table(table: &Table, path: &Path) -> Result<()> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "xlsx" => write_xlsx(table, path),
        "csv" => write_csv(table, path),
        _ => Err(AppError::UnsupportedFormat(path.display().to_string())),
    }
}

/// `report.xls` -> `report_обработанный.xlsx`
pub fn export_file_name(input_name: &str) -> String {
    let stem = Path::new(input_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("result");
    format!("{}{}.xlsx", stem, EXPORT_FILE_SUFFIX)
}
