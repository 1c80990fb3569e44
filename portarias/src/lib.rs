mod config;
use log::{debug, error, info, warn};
use snafu::{ensure, OptionExt, ResultExt};

use std::collections::HashSet;

pub mod builder;
pub mod columns;
pub mod filler;
pub mod manual;
pub mod resolve;

#[cfg(test)]
pub(crate) mod testing;

pub use crate::builder::{Generator, Ordinance};
pub use crate::config::*;
pub use crate::filler::{fill, TextUnits, TokenMap};

// **** Collaborators ****

/// A template loaded in memory, that can be filled and written back.
pub trait Template: TextUnits {
    fn save(&self) -> Result<Vec<u8>, BoxError>;
}

/// Where templates come from. Every call to `load` returns a fresh copy.
pub trait TemplateStore {
    type Document: Template;

    fn load(&self, path: &str) -> Result<Self::Document, BoxError>;
}

/// Reads an uploaded spreadsheet into a table.
pub trait SpreadsheetReader {
    fn parse(&self, upload: &Upload) -> Result<Table, BoxError>;
}

/// Accumulates the generated documents into an in-memory archive.
pub trait ArchiveWriter {
    fn write_entry(&mut self, name: &str, bytes: &[u8]) -> Result<(), BoxError>;

    fn finalize(self) -> Result<Vec<u8>, BoxError>;
}

// **** Handlers ****

/// Generates one ordinance from the fields of a form.
///
/// Unknown sub-types and unavailable templates are reported as
/// [HandlerError::ModelNotFound].
pub fn handle_single<S: TemplateStore>(
    generator: &Generator<S>,
    family: Family,
    fields: &Record,
) -> Result<Attachment, HandlerError> {
    info!("handle_single: family: {} fields: {}", family, fields.len());
    let ordinance = generator
        .build(family, fields)
        .context(ModelNotFoundSnafu {})?;
    let bytes = match ordinance.document.save() {
        Ok(b) => b,
        Err(e) => {
            error!(
                "handle_single: could not save {}: {:?}",
                ordinance.filename, e
            );
            return UnexpectedSnafu {
                stage: format!("saving {}", ordinance.filename),
                reason: e.to_string(),
            }
            .fail();
        }
    };
    info!(
        "handle_single: generated {} ({} bytes)",
        ordinance.filename,
        bytes.len()
    );
    Ok(Attachment {
        filename: ordinance.filename,
        media_type: DOCX_MEDIA_TYPE,
        bytes,
    })
}

/// Generates one ordinance per row of a spreadsheet and packs them in an archive.
///
/// Arguments:
/// * `shared` the form fields. They take precedence over the cells of every row.
/// * `upload` the spreadsheet. Its absence is an error.
/// * `archive_name` the file name of the returned archive
///
/// The columns are checked before any document is generated. Afterwards, a
/// row that fails is logged and skipped, and the batch carries on.
pub fn handle_batch<S, R, A>(
    generator: &Generator<S>,
    family: Family,
    shared: &Record,
    upload: Option<&Upload>,
    reader: &R,
    mut archive: A,
    archive_name: &str,
) -> Result<BatchOutcome, HandlerError>
where
    S: TemplateStore,
    R: SpreadsheetReader + ?Sized,
    A: ArchiveWriter,
{
    let upload = upload.context(NoSpreadsheetSnafu {})?;
    let table = match reader.parse(upload) {
        Ok(t) => t,
        Err(e) => {
            warn!("handle_batch: could not read {}: {}", upload.filename, e);
            return UnreadableSpreadsheetSnafu {
                filename: upload.filename.clone(),
                reason: e.to_string(),
            }
            .fail();
        }
    };
    let headers = table.normalized_headers();
    info!(
        "handle_batch: {}: {} rows, columns: {:?}",
        upload.filename,
        table.rows.len(),
        headers
    );

    let sub_type = builder::sub_type(family, shared);
    let missing = columns::missing_columns(family, &headers, sub_type.as_deref());
    if !missing.is_empty() {
        warn!("handle_batch: missing columns: {:?}", missing);
    }
    ensure!(missing.is_empty(), MissingColumnsSnafu { columns: missing });

    let mut summary = BatchSummary::default();
    let mut used_names: HashSet<String> = HashSet::new();
    for (idx, row) in table.records().iter().enumerate() {
        if row.iter().all(|(_, v)| v.is_blank()) {
            debug!("handle_batch: row {}: empty, ignored", idx);
            continue;
        }
        let record = row.merged_with(shared);
        match generate_entry(generator, family, &record, &mut archive, &mut used_names) {
            Ok(name) => {
                info!("handle_batch: row {}: added {}", idx, name);
                summary.generated.push(name);
            }
            Err(reason) => {
                error!("handle_batch: row {}: skipped: {}", idx, reason);
                summary.skipped.push(SkippedRow { index: idx, reason });
            }
        }
    }

    if summary.generated.is_empty() {
        warn!(
            "handle_batch: no document generated, {} rows skipped",
            summary.skipped.len()
        );
        return EmptyBatchSnafu {
            skipped: summary.skipped,
        }
        .fail();
    }

    let bytes = match archive.finalize() {
        Ok(b) => b,
        Err(e) => {
            error!("handle_batch: could not finalize {}: {:?}", archive_name, e);
            return UnexpectedSnafu {
                stage: format!("writing {}", archive_name),
                reason: e.to_string(),
            }
            .fail();
        }
    };
    info!(
        "handle_batch: {} completed: {} documents, {} rows skipped",
        archive_name,
        summary.generated.len(),
        summary.skipped.len()
    );
    Ok(BatchOutcome {
        attachment: Attachment {
            filename: archive_name.to_string(),
            media_type: ZIP_MEDIA_TYPE,
            bytes,
        },
        summary,
    })
}

// The fault boundary of one row: every failure becomes the reason of the skip.
fn generate_entry<S: TemplateStore, A: ArchiveWriter>(
    generator: &Generator<S>,
    family: Family,
    record: &Record,
    archive: &mut A,
    used_names: &mut HashSet<String>,
) -> Result<String, String> {
    let ordinance = generator
        .build(family, record)
        .map_err(|e| e.to_string())?;
    let bytes = ordinance
        .document
        .save()
        .map_err(|e| format!("could not save {}: {}", ordinance.filename, e))?;
    let name = unique_entry_name(&ordinance.filename, used_names);
    archive
        .write_entry(&name, &bytes)
        .map_err(|e| format!("could not add {} to the archive: {}", name, e))?;
    used_names.insert(name.clone());
    Ok(name)
}

/// `name`, or `name` with a `_2`, `_3`, ... suffix before the extension if it is taken.
fn unique_entry_name(name: &str, used: &HashSet<String>) -> String {
    if !used.contains(name) {
        return name.to_string();
    }
    let (stem, ext) = match name.rfind('.') {
        Some(pos) => name.split_at(pos),
        None => (name, ""),
    };
    (2..)
        .map(|n| format!("{}_{}{}", stem, n, ext))
        .find(|candidate| !used.contains(candidate))
        .unwrap_or_else(|| name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::*;

    fn gq_headers() -> Vec<String> {
        ["PROCESSO", "TIPO DE GQ", "NOME DO SERVIDOR", "CPF", "SIAPE", "DATA DA GQ"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    fn gq_row(name: &str) -> Vec<Value> {
        vec![
            Value::from("23000.1/2024"),
            Value::from("GQI"),
            Value::from(name),
            Value::from("111.222.333-44"),
            Value::Int(7654321),
            Value::from("2024-01-15"),
        ]
    }

    fn removal_table() -> Table {
        let headers = [
            "processo",
            "servidor",
            "cpf",
            "siape",
            "cargo",
            "lotacaoorigem",
            "lotacaodestino",
            "tipo_remocao",
        ];
        let row = |name: &str, sub_type: &str| -> Vec<Value> {
            vec![
                Value::from("23000.2/2024"),
                Value::from(name),
                Value::from("111.222.333-44"),
                Value::Number(1234567.0),
                Value::from("Professor"),
                Value::from("Campus A"),
                Value::from("Campus B"),
                Value::from(sub_type),
            ]
        };
        Table {
            headers: headers.iter().map(|s| s.to_string()).collect(),
            rows: vec![
                row("Ana", "a_pedido"),
                row("Bruno", "transferencia"),
                row("Carla", "a_pedido_conjuge"),
            ],
        }
    }

    fn upload() -> Upload {
        Upload {
            filename: "planilha.xlsx".to_string(),
            bytes: vec![],
        }
    }

    #[test]
    fn single_success() {
        let generator = fake_generator();
        let fields = Record::from_pairs([
            ("PROCESSO", "23000.1/2024"),
            ("GQ", "gqiii"),
            ("SERVIDOR", "Ana Souza"),
        ]);
        let att = handle_single(&generator, Family::Gq, &fields).unwrap();
        assert_eq!(att.filename, "Portaria_GQ_Ana_Souza_20240305102030.docx");
        assert_eq!(att.media_type, DOCX_MEDIA_TYPE);
        let text = String::from_utf8(att.bytes).unwrap();
        assert_eq!(
            text,
            "Processo 23000.1/2024\nConcede GQ3 a Ana Souza, CPF , SIAPE , a partir de ."
        );
    }

    #[test]
    fn single_unknown_sub_type_is_model_not_found() {
        let generator = fake_generator();
        let fields = Record::from_pairs([("TIPO_GSISTE", "inclusao")]);
        let e = handle_single(&generator, Family::Gsiste, &fields).unwrap_err();
        assert!(matches!(e, HandlerError::ModelNotFound { .. }));
        assert_eq!(e.status(), 500);
        assert!(!e.user_message().contains("inclusao"));
    }

    #[test]
    fn single_save_failure_is_unexpected() {
        let generator = broken_generator();
        let e = handle_single(&generator, Family::Gq, &Record::new()).unwrap_err();
        assert!(matches!(e, HandlerError::Unexpected { .. }));
        assert_eq!(
            e.user_message(),
            "An unexpected error occurred while generating the documents."
        );
    }

    #[test]
    fn batch_skips_failing_row() {
        let generator = fake_generator();
        let reader = FakeReader::new(removal_table());
        let outcome = handle_batch(
            &generator,
            Family::Removal,
            &Record::new(),
            Some(&upload()),
            &reader,
            FakeArchive::default(),
            "portarias_remocao.zip",
        )
        .unwrap();
        assert_eq!(outcome.attachment.filename, "portarias_remocao.zip");
        assert_eq!(outcome.attachment.media_type, ZIP_MEDIA_TYPE);
        assert_eq!(
            outcome.summary.generated,
            vec![
                "Portaria_Remocao_Ana_20240305102030.docx".to_string(),
                "Portaria_Remocao_Carla_20240305102030.docx".to_string(),
            ]
        );
        assert_eq!(outcome.summary.skipped.len(), 1);
        assert_eq!(outcome.summary.skipped[0].index, 1);
        assert!(outcome.summary.skipped[0].reason.contains("transferencia"));
        let listing = String::from_utf8(outcome.attachment.bytes).unwrap();
        assert_eq!(listing.lines().count(), 2);
    }

    #[test]
    fn batch_all_rows_fail() {
        let generator = fake_generator();
        let mut table = removal_table();
        for row in table.rows.iter_mut() {
            row[7] = Value::from("transferencia");
        }
        let e = handle_batch(
            &generator,
            Family::Removal,
            &Record::new(),
            Some(&upload()),
            &FakeReader::new(table),
            FakeArchive::default(),
            "portarias_remocao.zip",
        )
        .unwrap_err();
        match e {
            HandlerError::EmptyBatch { ref skipped } => assert_eq!(skipped.len(), 3),
            ref other => panic!("unexpected {:?}", other),
        }
        assert_eq!(e.status(), 400);
    }

    #[test]
    fn batch_shared_fields_override_rows() {
        let generator = fake_generator();
        let mut table = removal_table();
        for row in table.rows.iter_mut() {
            row[7] = Value::Missing;
        }
        let shared = Record::from_pairs([("TIPO_REMOCAO", "oficio_sem_ajuda")]);
        let outcome = handle_batch(
            &generator,
            Family::Removal,
            &shared,
            Some(&upload()),
            &FakeReader::new(table),
            FakeArchive::default(),
            "lote.zip",
        )
        .unwrap();
        assert_eq!(outcome.summary.generated.len(), 3);
        assert!(outcome.summary.skipped.is_empty());
    }

    #[test]
    fn batch_without_upload() {
        let generator = fake_generator();
        let e = handle_batch(
            &generator,
            Family::Gq,
            &Record::new(),
            None,
            &FakeReader::new(Table::default()),
            FakeArchive::default(),
            "portarias_gq.zip",
        )
        .unwrap_err();
        assert!(matches!(e, HandlerError::NoSpreadsheet {}));
        assert_eq!(e.user_message(), "No spreadsheet file was uploaded");
    }

    #[test]
    fn batch_unreadable_spreadsheet() {
        let generator = fake_generator();
        let e = handle_batch(
            &generator,
            Family::Gq,
            &Record::new(),
            Some(&upload()),
            &FakeReader::failing("not a zip file"),
            FakeArchive::default(),
            "portarias_gq.zip",
        )
        .unwrap_err();
        assert!(matches!(e, HandlerError::UnreadableSpreadsheet { .. }));
        assert_eq!(e.status(), 400);
    }

    #[test]
    fn batch_missing_columns_uses_shared_sub_type() {
        let generator = fake_generator();
        let table = Table {
            headers: [
                "PROCESSO", "CARGO", "CLASSE", "PADRAO", "NOME", "CPF", "SIAPE", "VACANCIA",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            rows: vec![],
        };
        let shared = Record::from_pairs([("TIPO_VACANCIA", "Inacumulavel")]);
        let e = handle_batch(
            &generator,
            Family::Vacancy,
            &shared,
            Some(&upload()),
            &FakeReader::new(table),
            FakeArchive::default(),
            "portarias_vacancia.zip",
        )
        .unwrap_err();
        match e {
            HandlerError::MissingColumns { ref columns } => {
                assert_eq!(columns, &vec!["NOVOCARG".to_string(), "NOVOORG".to_string()])
            }
            ref other => panic!("unexpected {:?}", other),
        }
        assert_eq!(
            e.user_message(),
            "Missing columns in the spreadsheet: 'NOVOCARG', 'NOVOORG'"
        );
    }

    #[test]
    fn batch_duplicate_names_and_blank_rows() {
        let generator = fake_generator();
        let table = Table {
            headers: gq_headers(),
            rows: vec![
                gq_row("Ana"),
                vec![Value::Missing, Value::from(" ")],
                gq_row("Ana"),
                gq_row("Ana"),
            ],
        };
        let outcome = handle_batch(
            &generator,
            Family::Gq,
            &Record::new(),
            Some(&upload()),
            &FakeReader::new(table),
            FakeArchive::default(),
            "portarias_gq.zip",
        )
        .unwrap();
        assert_eq!(
            outcome.summary.generated,
            vec![
                "Portaria_GQ_Ana_20240305102030.docx".to_string(),
                "Portaria_GQ_Ana_20240305102030_2.docx".to_string(),
                "Portaria_GQ_Ana_20240305102030_3.docx".to_string(),
            ]
        );
        assert!(outcome.summary.skipped.is_empty());
    }

    #[test]
    fn batch_archive_failures() {
        let generator = fake_generator();
        let table = Table {
            headers: gq_headers(),
            rows: vec![gq_row("Ana")],
        };
        let e = handle_batch(
            &generator,
            Family::Gq,
            &Record::new(),
            Some(&upload()),
            &FakeReader::new(table.clone()),
            FakeArchive::failing_finalize(),
            "portarias_gq.zip",
        )
        .unwrap_err();
        assert!(matches!(e, HandlerError::Unexpected { .. }));
        assert_eq!(e.status(), 500);

        let e = handle_batch(
            &generator,
            Family::Gq,
            &Record::new(),
            Some(&upload()),
            &FakeReader::new(table),
            FakeArchive::failing_entries(),
            "portarias_gq.zip",
        )
        .unwrap_err();
        assert!(matches!(e, HandlerError::EmptyBatch { .. }));
    }

    #[test]
    fn unique_names() {
        let mut used: HashSet<String> = HashSet::new();
        assert_eq!(unique_entry_name("a.docx", &used), "a.docx");
        used.insert("a.docx".to_string());
        used.insert("a_2.docx".to_string());
        assert_eq!(unique_entry_name("a.docx", &used), "a_3.docx");
        used.insert("noext".to_string());
        assert_eq!(unique_entry_name("noext", &used), "noext_2");
    }
}
