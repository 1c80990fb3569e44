use std::io::Cursor;

use calamine::{DataType, Reader, Xlsx};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use log::debug;

use crate::generate::*;

/// Reads the first worksheet of an Excel file. The first row holds the headers.
pub fn read_xlsx_table(bytes: &[u8]) -> CliResult<Table> {
    let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes)).context(OpeningExcelSnafu {})?;
    let wrange = workbook
        .worksheet_range_at(0)
        .context(EmptyExcelSnafu {})?
        .context(OpeningExcelSnafu {})?;

    let mut iter = wrange.rows();
    let headers: Vec<String> = match iter.next() {
        Some(row) => row.iter().map(header_name).collect(),
        None => Vec::new(),
    };
    debug!("read_xlsx_table: headers: {:?}", headers);
    let rows: Vec<Vec<Value>> = iter.map(|row| row.iter().map(read_cell).collect()).collect();
    debug!("read_xlsx_table: {} rows", rows.len());
    Ok(Table { headers, rows })
}

fn header_name(cell: &DataType) -> String {
    match read_cell(cell) {
        Value::Missing => String::new(),
        v => v.to_string(),
    }
}

fn read_cell(cell: &DataType) -> Value {
    match cell {
        DataType::String(s) if s.trim().is_empty() => Value::Missing,
        DataType::String(s) => Value::Text(s.clone()),
        DataType::Int(i) => Value::Int(*i),
        DataType::Float(f) => Value::Number(*f),
        DataType::Bool(b) => Value::Bool(*b),
        DataType::DateTime(serial) => excel_date(*serial),
        DataType::Error(_) | DataType::Empty => Value::Missing,
        #[allow(unreachable_patterns)]
        _ => Value::Missing,
    }
}

// Serial of 10000-01-01, one day past the last date Excel can hold.
const MAX_EXCEL_SERIAL: f64 = 2958466.0;

/// Converts an Excel serial date (days since 1899-12-30, time as the fraction).
/// Serials out of Excel's range are kept as plain numbers.
fn excel_date(serial: f64) -> Value {
    if !(0.0..MAX_EXCEL_SERIAL).contains(&serial) {
        return Value::Number(serial);
    }
    let epoch: Option<NaiveDateTime> =
        NaiveDate::from_ymd_opt(1899, 12, 30).and_then(|d| d.and_hms_opt(0, 0, 0));
    let seconds = (serial * 86400.0).round() as i64;
    let offset = Duration::try_seconds(seconds);
    match epoch
        .zip(offset)
        .and_then(|(e, d)| e.checked_add_signed(d))
    {
        Some(dt) if seconds % 86400 == 0 => Value::Date(dt.date()),
        Some(dt) => Value::DateTime(dt),
        None => Value::Number(serial),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generate::io_csv::SheetReader;
    use std::io::Write;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    /// A single-sheet workbook. Cell style 1 is a date format.
    fn xlsx_bytes(sheet_data: &str) -> Vec<u8> {
        let workbook = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="Planilha1" sheetId="1" r:id="rId1"/></sheets></workbook>"#;
        let rels = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/></Relationships>"#;
        let styles = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><cellXfs count="2"><xf numFmtId="0"/><xf numFmtId="14"/></cellXfs></styleSheet>"#;
        let sheet = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>{}</sheetData></worksheet>"#,
            sheet_data
        );
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, content) in [
            ("[Content_Types].xml", "<Types/>".to_string()),
            ("xl/workbook.xml", workbook.to_string()),
            ("xl/_rels/workbook.xml.rels", rels.to_string()),
            ("xl/styles.xml", styles.to_string()),
            ("xl/worksheets/sheet1.xml", sheet),
        ] {
            writer.start_file(name, SimpleFileOptions::default()).unwrap();
            writer.write_all(content.as_bytes()).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    fn text_cell(r: &str, text: &str) -> String {
        format!(r#"<c r="{}" t="inlineStr"><is><t>{}</t></is></c>"#, r, text)
    }

    #[test]
    fn first_sheet_as_table() {
        let header = [
            text_cell("A1", "PROCESSO"),
            text_cell("B1", " Servidor "),
            text_cell("C1", "SIAPE"),
            text_cell("D1", "DATA DA GQ"),
            text_cell("E1", "CPF"),
        ]
        .concat();
        let first = [
            text_cell("A2", "23000.000123/2024-11"),
            text_cell("B2", "Ana Maria"),
            r#"<c r="C2"><v>1234567</v></c>"#.to_string(),
            r#"<c r="D2" s="1"><v>45356</v></c>"#.to_string(),
        ]
        .concat();
        let second = [
            text_cell("A3", "23000.000124/2024-11"),
            text_cell("B3", "Rui"),
            r#"<c r="C3"><v>7654321</v></c>"#.to_string(),
            r#"<c r="D3" s="1"><v>45357</v></c>"#.to_string(),
            text_cell("E3", "123.456.789-00"),
        ]
        .concat();
        let bytes = xlsx_bytes(&format!(
            r#"<row r="1">{}</row><row r="2">{}</row><row r="3">{}</row>"#,
            header, first, second
        ));

        let table = read_xlsx_table(&bytes).unwrap();
        assert_eq!(
            table.normalized_headers(),
            vec!["PROCESSO", "SERVIDOR", "SIAPE", "DATA DA GQ", "CPF"]
        );
        assert_eq!(table.rows.len(), 2);

        let records = table.records();
        let ana = &records[0];
        assert_eq!(ana.get("SERVIDOR"), Some(&Value::from("Ana Maria")));
        assert_eq!(ana.get("SIAPE").unwrap().to_string(), "1234567");
        assert_eq!(
            ana.get("DATA DA GQ"),
            Some(&Value::Date(NaiveDate::from_ymd_opt(2024, 3, 5).unwrap()))
        );
        assert_eq!(ana.get("CPF"), Some(&Value::Missing));
        assert_eq!(records[1].get("CPF"), Some(&Value::from("123.456.789-00")));
    }

    #[test]
    fn xlsx_uploads_through_the_sheet_reader() {
        let bytes = xlsx_bytes(&format!(
            r#"<row r="1">{}</row><row r="2">{}</row>"#,
            text_cell("A1", "PROCESSO"),
            text_cell("A2", "23000.1/2024")
        ));
        let upload = Upload {
            filename: "lote.xlsx".to_string(),
            bytes,
        };
        let table = SheetReader {}.parse(&upload).unwrap();
        assert_eq!(table.headers, vec!["PROCESSO"]);
        assert_eq!(table.rows, vec![vec![Value::from("23000.1/2024")]]);
    }

    #[test]
    fn serials_out_of_range_stay_numbers() {
        assert_eq!(excel_date(1.0e15), Value::Number(1.0e15));
        assert_eq!(excel_date(-1.0), Value::Number(-1.0));
        assert_eq!(excel_date(f64::NAN).to_string(), Value::Number(f64::NAN).to_string());
        assert_eq!(
            read_cell(&DataType::DateTime(1.0e15)),
            Value::Number(1.0e15)
        );
    }

    #[test]
    fn excel_serial_dates() {
        assert_eq!(
            excel_date(45356.0),
            Value::Date(NaiveDate::from_ymd_opt(2024, 3, 5).unwrap())
        );
        assert_eq!(
            excel_date(45356.5),
            Value::DateTime(
                NaiveDate::from_ymd_opt(2024, 3, 5)
                    .unwrap()
                    .and_hms_opt(12, 0, 0)
                    .unwrap()
            )
        );
    }

    #[test]
    fn cells() {
        assert_eq!(read_cell(&DataType::Empty), Value::Missing);
        assert_eq!(read_cell(&DataType::String("  ".to_string())), Value::Missing);
        assert_eq!(read_cell(&DataType::Float(1234567.0)).to_string(), "1234567");
        assert_eq!(header_name(&DataType::String(" Servidor ".to_string())), " Servidor ");
        assert_eq!(header_name(&DataType::Empty), "");
    }

    #[test]
    fn not_an_excel_file() {
        assert!(matches!(
            read_xlsx_table(b"PROCESSO;CPF"),
            Err(CliError::OpeningExcel { .. })
        ));
    }
}
