use std::fs;
use std::path::{Path, PathBuf};

use log::debug;

use crate::generate::*;

pub fn simplify_file_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or(path)
        .to_string()
}

/// Parses `KEY=VALUE` pairs into a record. Empty values are absent.
pub fn parse_fields(fields: &[String]) -> CliResult<Record> {
    let mut record = Record::new();
    for field in fields {
        let (key, value) = field
            .split_once('=')
            .context(InvalidFieldSnafu { field: field.as_str() })?;
        let key = key.trim();
        ensure!(!key.is_empty(), InvalidFieldSnafu { field: field.as_str() });
        if value.trim().is_empty() {
            record.insert(key, Value::Missing);
        } else {
            record.insert(key, value);
        }
    }
    debug!("parse_fields: {:?}", record);
    Ok(record)
}

pub fn read_upload(path: &str) -> CliResult<Upload> {
    let bytes = fs::read(path).context(OpeningInputSnafu { path })?;
    Ok(Upload {
        filename: simplify_file_name(path),
        bytes,
    })
}

/// Writes an attachment under its own name in `dir`.
pub fn write_attachment(dir: &Path, attachment: &Attachment) -> CliResult<PathBuf> {
    let path = dir.join(simplify_file_name(&attachment.filename));
    fs::write(&path, &attachment.bytes).context(WritingOutputSnafu {
        path: path.display().to_string(),
    })?;
    Ok(path)
}
