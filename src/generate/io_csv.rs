// Primitives for reading CSV files, and the reader used for uploads.

use log::{debug, info};

use crate::generate::io_xlsx::read_xlsx_table;
use crate::generate::*;

const BOM: &[u8] = b"\xEF\xBB\xBF";

/// Reads uploads by extension: `.csv` as CSV, anything else as Excel.
#[derive(Debug, Clone, Default)]
pub struct SheetReader {}

impl SpreadsheetReader for SheetReader {
    fn parse(&self, upload: &Upload) -> Result<Table, BoxError> {
        let is_csv = upload.filename.to_lowercase().ends_with(".csv");
        info!(
            "SheetReader::parse: {} ({} bytes) as {}",
            upload.filename,
            upload.bytes.len(),
            if is_csv { "csv" } else { "xlsx" }
        );
        let table = if is_csv {
            read_csv_table(&upload.bytes)?
        } else {
            read_xlsx_table(&upload.bytes)?
        };
        Ok(table)
    }
}

/// Reads a CSV file whose first line holds the headers.
/// The separator is a semicolon if the header line has more of them than commas.
pub fn read_csv_table(bytes: &[u8]) -> CliResult<Table> {
    let bytes = bytes.strip_prefix(BOM).unwrap_or(bytes);
    let delimiter = detect_delimiter(bytes);
    debug!("read_csv_table: delimiter: {:?}", delimiter as char);
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(bytes);

    let mut headers: Vec<String> = Vec::new();
    let mut rows: Vec<Vec<Value>> = Vec::new();
    for (idx, line_r) in rdr.records().enumerate() {
        let line = line_r.context(CsvParseSnafu {})?;
        if idx == 0 {
            headers = line.iter().map(|s| s.to_string()).collect();
            continue;
        }
        rows.push(line.iter().map(read_field).collect());
    }
    debug!("read_csv_table: headers: {:?} rows: {}", headers, rows.len());
    Ok(Table { headers, rows })
}

fn detect_delimiter(bytes: &[u8]) -> u8 {
    let first_line = bytes.split(|b| *b == b'\n').next().unwrap_or(&[]);
    let count = |c: u8| first_line.iter().filter(|b| **b == c).count();
    if count(b';') > count(b',') {
        b';'
    } else {
        b','
    }
}

fn read_field(s: &str) -> Value {
    if s.trim().is_empty() {
        Value::Missing
    } else {
        Value::Text(s.to_string())
    }
}
