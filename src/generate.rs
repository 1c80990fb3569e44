use log::{info, warn};

use portarias::*;
use snafu::{prelude::*, Snafu};

use std::path::{Path, PathBuf};

use crate::args::Args;
use crate::generate::config_reader::*;
use crate::generate::io_common::*;
use crate::generate::io_csv::SheetReader;
use crate::generate::io_docx::DocxTemplateStore;
use crate::generate::io_zip::ZipArchiveWriter;

pub mod config_reader;
pub mod io_common;
pub mod io_csv;
pub mod io_docx;
pub mod io_xlsx;
pub mod io_zip;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum CliError {
    #[snafu(display("Error opening configuration file {path}"))]
    OpeningConfig {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing configuration file {path}: {source}"))]
    ParsingConfig {
        source: serde_json::Error,
        path: String,
    },
    #[snafu(display("{source}"))]
    UnknownKind { source: ParseFamilyError },
    #[snafu(display("Invalid field {field:?}: expected KEY=VALUE"))]
    InvalidField { field: String },
    #[snafu(display("Error opening input file {path}"))]
    OpeningInput {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error writing {path}"))]
    WritingOutput {
        source: std::io::Error,
        path: String,
    },

    #[snafu(display("Error opening the Excel file: {source}"))]
    OpeningExcel { source: calamine::XlsxError },
    #[snafu(display("The Excel file has no worksheet"))]
    EmptyExcel {},
    #[snafu(display("Error reading the CSV file: {source}"))]
    CsvParse { source: csv::Error },
    #[snafu(display("Error opening the document package: {source}"))]
    OpeningPackage { source: zip::result::ZipError },
    #[snafu(display("Error reading {name} in the document package"))]
    ReadingEntry {
        source: std::io::Error,
        name: String,
    },
    #[snafu(display("Malformed XML in {part}: {reason}"))]
    Xml { part: String, reason: String },
    #[snafu(display("Error writing the archive: {source}"))]
    WritingArchive { source: zip::result::ZipError },
    #[snafu(display("Error writing {name} in the archive"))]
    WritingEntry {
        source: std::io::Error,
        name: String,
    },

    #[snafu(display("{source}"))]
    Handler { source: HandlerError },
}

pub type CliResult<T> = Result<T, CliError>;

impl CliError {
    /// 1 for the errors reported by the handlers, 2 for the configuration and usage errors.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Handler { .. } => 1,
            _ => 2,
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            CliError::Handler { source } => source.user_message(),
            other => other.to_string(),
        }
    }
}

pub fn run(args: &Args) -> CliResult<()> {
    let settings = match &args.config {
        Some(path) => read_config(path)?,
        None => TemplateSettings::default(),
    };
    let family: Family = args.kind.parse().context(UnknownKindSnafu {})?;
    let fields = parse_fields(&args.field)?;

    let template_dir: PathBuf = args
        .template_dir
        .clone()
        .or_else(|| settings.template_directory.clone())
        .unwrap_or_else(|| ".".to_string())
        .into();
    let catalog = settings.catalog();
    check_templates(&catalog, &template_dir);
    let generator = Generator::new(catalog, DocxTemplateStore::new(template_dir));

    let attachment = match &args.input {
        None => handle_single(&generator, family, &fields).context(HandlerSnafu {})?,
        Some(input) => {
            let upload = read_upload(input)?;
            let archive_name = args
                .archive_name
                .clone()
                .unwrap_or_else(|| family.archive_name().to_string());
            let outcome = handle_batch(
                &generator,
                family,
                &fields,
                Some(&upload),
                &SheetReader::default(),
                ZipArchiveWriter::default(),
                &archive_name,
            )
            .context(HandlerSnafu {})?;
            for skipped in outcome.summary.skipped.iter() {
                warn!("row {} skipped: {}", skipped.index, skipped.reason);
            }
            outcome.attachment
        }
    };

    let out_dir = args.out.clone().unwrap_or_else(|| ".".to_string());
    let path = write_attachment(Path::new(&out_dir), &attachment)?;
    info!("run: wrote {} bytes", attachment.bytes.len());
    println!("{} ({})", path.display(), attachment.media_type);
    Ok(())
}

// Missing templates only fail the ordinances that need them.
fn check_templates(catalog: &TemplateCatalog, dir: &Path) {
    let mut paths: Vec<&str> = catalog.paths().into_iter().collect();
    paths.sort_unstable();
    for p in paths {
        if !dir.join(p).is_file() {
            warn!("template {:?} not found in {}", p, dir.display());
        }
    }
}
