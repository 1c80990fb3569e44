// In-memory collaborators for the unit tests.

use std::collections::HashMap;

use chrono::{NaiveDate, NaiveDateTime};

use crate::*;

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct FakeDocument {
    pub units: Vec<String>,
    pub broken: bool,
}

impl TextUnits for FakeDocument {
    fn text_units(&mut self) -> Vec<&mut String> {
        self.units.iter_mut().collect()
    }
}

impl Template for FakeDocument {
    fn save(&self) -> Result<Vec<u8>, BoxError> {
        if self.broken {
            return Err("disk full".into());
        }
        Ok(self.units.join("\n").into_bytes())
    }
}

#[derive(Default)]
pub struct FakeStore {
    templates: HashMap<String, FakeDocument>,
}

impl FakeStore {
    pub fn with(mut self, path: &str, units: &[&str]) -> FakeStore {
        self.templates.insert(
            path.to_string(),
            FakeDocument {
                units: units.iter().map(|s| s.to_string()).collect(),
                broken: false,
            },
        );
        self
    }

    pub fn with_broken(mut self, path: &str) -> FakeStore {
        self.templates.insert(
            path.to_string(),
            FakeDocument {
                units: vec!["#PROCESSO".to_string()],
                broken: true,
            },
        );
        self
    }
}

impl TemplateStore for FakeStore {
    type Document = FakeDocument;

    fn load(&self, path: &str) -> Result<FakeDocument, BoxError> {
        match self.templates.get(path) {
            Some(d) => Ok(d.clone()),
            None => Err(format!("{} not found", path).into()),
        }
    }
}

pub fn fixed_clock() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, 5)
        .unwrap()
        .and_hms_opt(10, 20, 30)
        .unwrap()
}

/// Every default template, except `remocao_oficio_com_ajuda.docx`.
pub fn fake_store() -> FakeStore {
    let removal = ["Remove #SERVIDOR de #LOTACAOORIGEM para #LOTACAODESTINO#CLAUSULA_VIGENCIA"];
    let vacancy = [
        "Vacância de #NOME (#CARGO #CLASSE/#PADRAO) em #VACANCIA",
        "#NOVOCARG #NOVOORG",
    ];
    let gsiste = ["#SERVIDOR, #LOTACAO", "Exclusão em #EXCLUSAO"];
    FakeStore::default()
        .with(
            "Portariagq.docx",
            &[
                "Processo #PROCESSO",
                "Concede #GQ a #SERVIDOR, CPF #CPF, SIAPE #SIAPE, a partir de #DATAGQ.",
            ],
        )
        .with("remocao_oficio_sem_ajuda.docx", &removal)
        .with("remocao_a_pedido.docx", &removal)
        .with("remocao_a_pedido_conjuge.docx", &removal)
        .with("vacancia_a_pedido.docx", &vacancy)
        .with("vacancia_inacumulavel.docx", &vacancy)
        .with("gsiste_concessao_622.docx", &gsiste)
        .with("gsiste_concessao_654.docx", &gsiste)
        .with("gsiste_exclusao_622.docx", &gsiste)
        .with("gsiste_exclusao_654.docx", &gsiste)
}

pub fn fake_generator() -> Generator<FakeStore> {
    Generator::new(TemplateCatalog::default(), fake_store()).with_clock(fixed_clock)
}

/// A generator whose GQ template cannot be saved.
pub fn broken_generator() -> Generator<FakeStore> {
    let catalog = TemplateCatalog {
        gq: "broken.docx".to_string(),
        ..TemplateCatalog::default()
    };
    Generator::new(catalog, FakeStore::default().with_broken("broken.docx")).with_clock(fixed_clock)
}

pub struct FakeReader {
    table: Result<Table, String>,
}

impl FakeReader {
    pub fn new(table: Table) -> FakeReader {
        FakeReader { table: Ok(table) }
    }

    pub fn failing(reason: &str) -> FakeReader {
        FakeReader {
            table: Err(reason.to_string()),
        }
    }
}

impl SpreadsheetReader for FakeReader {
    fn parse(&self, _upload: &Upload) -> Result<Table, BoxError> {
        self.table.clone().map_err(|e| e.into())
    }
}

/// Finalizes to the list of its entry names, one per line.
#[derive(Default)]
pub struct FakeArchive {
    names: Vec<String>,
    fail_entries: bool,
    fail_finalize: bool,
}

impl FakeArchive {
    pub fn failing_entries() -> FakeArchive {
        FakeArchive {
            fail_entries: true,
            ..FakeArchive::default()
        }
    }

    pub fn failing_finalize() -> FakeArchive {
        FakeArchive {
            fail_finalize: true,
            ..FakeArchive::default()
        }
    }
}

impl ArchiveWriter for FakeArchive {
    fn write_entry(&mut self, name: &str, _bytes: &[u8]) -> Result<(), BoxError> {
        if self.fail_entries {
            return Err(format!("cannot write {}", name).into());
        }
        self.names.push(name.to_string());
        Ok(())
    }

    fn finalize(self) -> Result<Vec<u8>, BoxError> {
        if self.fail_finalize {
            return Err("archive closed".into());
        }
        Ok(self.names.join("\n").into_bytes())
    }
}
