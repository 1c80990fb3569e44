// ********* Input data structures ***********

use std::collections::{BTreeMap, HashSet};
use std::fmt::Display;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use snafu::{OptionExt, Snafu};

/// A raw value, as typed in a form or read from a spreadsheet cell.
#[derive(PartialEq, Debug, Clone)]
pub enum Value {
    Text(String),
    Int(i64),
    Number(f64),
    Bool(bool),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    /// Missing data: an empty cell, a cell in error, or an explicit null.
    /// The resolver never returns it.
    Missing,
}

impl Value {
    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }

    /// Missing values and text made only of whitespace.
    pub fn is_blank(&self) -> bool {
        match self {
            Value::Missing => true,
            Value::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Text(s) => write!(f, "{}", s),
            Value::Int(i) => write!(f, "{}", i),
            // Spreadsheets store registration numbers as floats.
            Value::Number(x) if x.fract() == 0.0 && x.abs() < 1e15 => write!(f, "{}", *x as i64),
            Value::Number(x) => write!(f, "{}", x),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Value::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
            Value::Missing => Ok(()),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Value {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Value {
        Value::Text(s)
    }
}

impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Value {
        Value::Date(d)
    }
}

/// The fields of one form submission or one spreadsheet row.
///
/// Records built from spreadsheets have upper-case keys (see [Table::records]).
/// Form records keep the keys they were submitted with.
#[derive(PartialEq, Debug, Clone, Default)]
pub struct Record {
    fields: BTreeMap<String, Value>,
}

impl Record {
    pub fn new() -> Record {
        Record::default()
    }

    pub fn from_pairs<K, V, I>(pairs: I) -> Record
    where
        K: Into<String>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        Record {
            fields: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter()
    }

    /// A copy of this record with `overrides` laid on top of it.
    /// On a key collision the override wins.
    pub fn merged_with(&self, overrides: &Record) -> Record {
        let mut fields = self.fields.clone();
        for (k, v) in overrides.fields.iter() {
            fields.insert(k.clone(), v.clone());
        }
        Record { fields }
    }
}

/// A spreadsheet as returned by a reader, before any normalization.
#[derive(PartialEq, Debug, Clone, Default)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl Table {
    /// The headers, trimmed and in upper case.
    pub fn normalized_headers(&self) -> Vec<String> {
        self.headers.iter().map(|h| normalize_header(h)).collect()
    }

    /// One record per row, keyed by the normalized headers.
    ///
    /// Cells past the last header are dropped and short rows are padded with
    /// missing values.
    pub fn records(&self) -> Vec<Record> {
        let headers = self.normalized_headers();
        self.rows
            .iter()
            .map(|row| {
                let mut record = Record::new();
                for (idx, header) in headers.iter().enumerate() {
                    let cell = row.get(idx).cloned().unwrap_or(Value::Missing);
                    record.insert(header.clone(), cell);
                }
                record
            })
            .collect()
    }
}

pub fn normalize_header(header: &str) -> String {
    header.trim().to_uppercase()
}

/// An uploaded file, as received by the transport layer.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Upload {
    pub filename: String,
    pub bytes: Vec<u8>,
}

// ******** Output data structures *********

pub const DOCX_MEDIA_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
pub const ZIP_MEDIA_TYPE: &str = "application/zip";

/// A downloadable file handed back to the transport layer.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Attachment {
    pub filename: String,
    pub media_type: &'static str,
    pub bytes: Vec<u8>,
}

/// A spreadsheet row that did not produce a document.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct SkippedRow {
    /// Zero-based data row index (the header row is not counted).
    pub index: usize,
    pub reason: String,
}

#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct BatchSummary {
    /// Names of the archive entries, in row order.
    pub generated: Vec<String>,
    pub skipped: Vec<SkippedRow>,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct BatchOutcome {
    pub attachment: Attachment,
    pub summary: BatchSummary,
}

/// Errors reported by the external collaborators (template store, reader, archive).
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Failures of a single ordinance builder call.
///
/// They are not fatal: the handlers either report them to the user or skip
/// the row that caused them.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum BuildError {
    #[snafu(display("no {family} template for sub-type {sub_type:?}"))]
    UnknownSubType {
        family: Family,
        sub_type: Option<String>,
    },
    #[snafu(display("could not load the {family} template {path}: {reason}"))]
    TemplateUnavailable {
        family: Family,
        path: String,
        reason: String,
    },
}

/// Errors that stop a request. Every handler returns one of these instead of
/// letting a failure escape.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum HandlerError {
    #[snafu(display("no spreadsheet file was uploaded"))]
    NoSpreadsheet {},
    #[snafu(display("could not read the spreadsheet {filename}: {reason}"))]
    UnreadableSpreadsheet { filename: String, reason: String },
    #[snafu(display("missing columns in the spreadsheet: {}", quoted(columns)))]
    MissingColumns { columns: Vec<String> },
    #[snafu(display("could not create the document: {source}"))]
    ModelNotFound { source: BuildError },
    #[snafu(display("no ordinance could be generated ({} rows skipped)", skipped.len()))]
    EmptyBatch { skipped: Vec<SkippedRow> },
    #[snafu(display("unexpected failure while {stage}: {reason}"))]
    Unexpected { stage: String, reason: String },
}

impl HandlerError {
    /// The HTTP status a transport layer should answer with.
    pub fn status(&self) -> u16 {
        match self {
            HandlerError::NoSpreadsheet {}
            | HandlerError::UnreadableSpreadsheet { .. }
            | HandlerError::MissingColumns { .. }
            | HandlerError::EmptyBatch { .. } => 400,
            HandlerError::ModelNotFound { .. } | HandlerError::Unexpected { .. } => 500,
        }
    }

    /// The message shown to the user. Unexpected failures are not detailed.
    pub fn user_message(&self) -> String {
        match self {
            HandlerError::ModelNotFound { .. } => {
                "Could not create the document. Check that the matching Word template exists."
                    .to_string()
            }
            HandlerError::EmptyBatch { .. } => {
                "No ordinance could be generated. Check the spreadsheet data and the templates."
                    .to_string()
            }
            HandlerError::Unexpected { .. } => {
                "An unexpected error occurred while generating the documents.".to_string()
            }
            other => {
                let mut msg = other.to_string();
                if let Some(first) = msg.get_mut(0..1) {
                    first.make_ascii_uppercase();
                }
                msg
            }
        }
    }
}

fn quoted(columns: &[String]) -> String {
    columns
        .iter()
        .map(|c| format!("'{}'", c))
        .collect::<Vec<String>>()
        .join(", ")
}

// ********* Configuration **********

/// The ordinance families.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum Family {
    /// Classification ("gratificação de qualificação").
    Gq,
    /// Transfer ("remoção").
    Removal,
    /// Vacancy ("vacância").
    Vacancy,
    /// Inclusion in or exclusion from GSISTE.
    Gsiste,
}

impl Family {
    pub const ALL: [Family; 4] = [Family::Gq, Family::Removal, Family::Vacancy, Family::Gsiste];

    pub fn name(&self) -> &'static str {
        match self {
            Family::Gq => "gq",
            Family::Removal => "remocao",
            Family::Vacancy => "vacancia",
            Family::Gsiste => "gsiste",
        }
    }

    /// The prefix of the generated file names.
    pub fn label(&self) -> &'static str {
        match self {
            Family::Gq => "Portaria_GQ",
            Family::Removal => "Portaria_Remocao",
            Family::Vacancy => "Portaria_Vacancia",
            Family::Gsiste => "Portaria_GSISTE",
        }
    }

    /// The field that selects the template variant, for the families that have some.
    pub fn discriminator(&self) -> Option<&'static str> {
        match self {
            Family::Gq => None,
            Family::Removal => Some("TIPO_REMOCAO"),
            Family::Vacancy => Some("TIPO_VACANCIA"),
            Family::Gsiste => Some("TIPO_GSISTE"),
        }
    }

    pub fn archive_name(&self) -> &'static str {
        match self {
            Family::Gq => "portarias_gq.zip",
            Family::Removal => "portarias_remocao.zip",
            Family::Vacancy => "portarias_vacancia.zip",
            Family::Gsiste => "portarias_gsiste.zip",
        }
    }
}

impl Display for Family {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(Debug, Snafu)]
pub enum ParseFamilyError {
    #[snafu(display("unknown ordinance family {name:?} (expected one of gq, remocao, vacancia, gsiste)"))]
    UnknownFamily { name: String },
}

impl FromStr for Family {
    type Err = ParseFamilyError;

    fn from_str(s: &str) -> Result<Family, ParseFamilyError> {
        match s.trim().to_lowercase().as_str() {
            "gq" => Ok(Family::Gq),
            "remocao" | "removal" | "movimentacao" => Ok(Family::Removal),
            "vacancia" | "vacancy" => Ok(Family::Vacancy),
            "gsiste" => Ok(Family::Gsiste),
            _ => UnknownFamilySnafu { name: s }.fail(),
        }
    }
}

/// Where the Word templates of every family live.
///
/// Paths are relative to the template store. The catalog is built once at
/// start-up and only read afterwards.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct TemplateCatalog {
    pub gq: String,
    pub removal: BTreeMap<String, String>,
    pub vacancy: BTreeMap<String, String>,
    pub gsiste: BTreeMap<String, String>,
}

impl Default for TemplateCatalog {
    fn default() -> TemplateCatalog {
        fn table(prefix: &str, keys: &[&str]) -> BTreeMap<String, String> {
            keys.iter()
                .map(|k| (k.to_string(), format!("{}_{}.docx", prefix, k)))
                .collect()
        }
        TemplateCatalog {
            gq: "Portariagq.docx".to_string(),
            removal: table(
                "remocao",
                &[
                    "oficio_com_ajuda",
                    "oficio_sem_ajuda",
                    "a_pedido",
                    "a_pedido_conjuge",
                ],
            ),
            vacancy: table("vacancia", &["a_pedido", "inacumulavel"]),
            gsiste: table(
                "gsiste",
                &[
                    "concessao_622",
                    "concessao_654",
                    "exclusao_622",
                    "exclusao_654",
                ],
            ),
        }
    }
}

impl TemplateCatalog {
    fn variants(&self, family: Family) -> Option<&BTreeMap<String, String>> {
        match family {
            Family::Gq => None,
            Family::Removal => Some(&self.removal),
            Family::Vacancy => Some(&self.vacancy),
            Family::Gsiste => Some(&self.gsiste),
        }
    }

    /// The template of a family. The sub-type is ignored by families without variants.
    pub fn template_path(&self, family: Family, sub_type: Option<&str>) -> Result<&str, BuildError> {
        match self.variants(family) {
            None => Ok(self.gq.as_str()),
            Some(table) => sub_type
                .and_then(|s| table.get(s))
                .map(|p| p.as_str())
                .context(UnknownSubTypeSnafu {
                    family,
                    sub_type: sub_type.map(|s| s.to_string()),
                }),
        }
    }

    /// The known sub-types of a family, sorted.
    pub fn sub_types(&self, family: Family) -> Vec<&str> {
        self.variants(family)
            .map(|t| t.keys().map(|k| k.as_str()).collect())
            .unwrap_or_default()
    }

    /// All the template paths, without duplicates.
    pub fn paths(&self) -> HashSet<&str> {
        let mut res: HashSet<&str> = HashSet::new();
        res.insert(self.gq.as_str());
        for family in Family::ALL {
            if let Some(t) = self.variants(family) {
                res.extend(t.values().map(|p| p.as_str()));
            }
        }
        res
    }
}
