//! Canonical fields, their accepted column names, and the column validators.

use std::collections::HashSet;

use log::debug;

use crate::config::*;
use crate::resolve::{format_date, resolve, resolve_text};

/// A canonical field and the column names accepted for it, by priority.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub struct FieldSpec {
    pub label: &'static str,
    pub aliases: &'static [&'static str],
}

impl FieldSpec {
    pub const fn new(label: &'static str, aliases: &'static [&'static str]) -> FieldSpec {
        FieldSpec { label, aliases }
    }

    pub fn value<'a>(&self, record: &'a Record) -> Option<&'a Value> {
        resolve(record, self.aliases)
    }

    pub fn text(&self, record: &Record) -> String {
        resolve_text(record, self.aliases)
    }

    pub fn date(&self, record: &Record) -> String {
        format_date(self.value(record))
    }

    fn is_present(&self, columns: &HashSet<String>) -> bool {
        self.aliases.iter().any(|a| columns.contains(*a))
    }
}

pub const PROCESSO: FieldSpec = FieldSpec::new("PROCESSO", &["PROCESSO"]);
pub const CPF: FieldSpec = FieldSpec::new("CPF", &["CPF"]);
pub const SIAPE: FieldSpec = FieldSpec::new("SIAPE", &["SIAPE"]);
pub const CARGO: FieldSpec = FieldSpec::new("CARGO", &["CARGO"]);

pub const TIPO_GQ: FieldSpec = FieldSpec::new("TIPO DE GQ", &["TIPO DE GQ", "GQ"]);
pub const GQ_SUBJECT: FieldSpec =
    FieldSpec::new("NOME DO SERVIDOR", &["NOME DO SERVIDOR", "SERVIDOR"]);
pub const DATA_GQ: FieldSpec = FieldSpec::new("DATA DA GQ", &["DATA DA GQ", "DATAGQ"]);

pub const REMOVAL_SUBJECT: FieldSpec = FieldSpec::new("SERVIDOR", &["SERVIDOR", "NOME DO SERVIDOR"]);
pub const LOTACAO_ORIGEM: FieldSpec = FieldSpec::new("LOTACAOORIGEM", &["LOTACAOORIGEM"]);
pub const LOTACAO_DESTINO: FieldSpec = FieldSpec::new("LOTACAODESTINO", &["LOTACAODESTINO"]);
/// Optional: never required by the validator.
pub const DATA_VIGENCIA: FieldSpec = FieldSpec::new("DATA_VIGENCIA", &["DATA_VIGENCIA"]);

pub const CLASSE: FieldSpec = FieldSpec::new("CLASSE", &["CLASSE"]);
pub const PADRAO: FieldSpec = FieldSpec::new("PADRAO", &["PADRAO"]);
pub const VACANCY_SUBJECT: FieldSpec = FieldSpec::new("NOME", &["NOME", "SERVIDOR"]);
pub const VACANCIA: FieldSpec = FieldSpec::new("VACANCIA", &["VACANCIA"]);
pub const NOVO_CARGO: FieldSpec = FieldSpec::new("NOVOCARG", &["NOVOCARG"]);
pub const NOVO_ORGAO: FieldSpec = FieldSpec::new("NOVOORG", &["NOVOORG"]);

pub const GSISTE_SUBJECT: FieldSpec = FieldSpec::new("SERVIDOR", &["SERVIDOR"]);
pub const LOTACAO: FieldSpec = FieldSpec::new("LOTACAO", &["LOTACAO"]);
pub const EXCLUSAO: FieldSpec = FieldSpec::new("EXCLUSAO", &["EXCLUSAO"]);

pub const GQ_COLUMNS: &[FieldSpec] = &[PROCESSO, TIPO_GQ, GQ_SUBJECT, CPF, SIAPE, DATA_GQ];

pub const REMOVAL_COLUMNS: &[FieldSpec] = &[
    PROCESSO,
    REMOVAL_SUBJECT,
    CPF,
    SIAPE,
    CARGO,
    LOTACAO_ORIGEM,
    LOTACAO_DESTINO,
];

pub const VACANCY_COLUMNS: &[FieldSpec] = &[
    PROCESSO,
    CARGO,
    CLASSE,
    PADRAO,
    VACANCY_SUBJECT,
    CPF,
    SIAPE,
    VACANCIA,
];

/// Extra columns of the vacancy for holding a non-cumulable position.
pub const VACANCY_INACUMULAVEL_COLUMNS: &[FieldSpec] = &[NOVO_CARGO, NOVO_ORGAO];

pub const GSISTE_COLUMNS: &[FieldSpec] = &[PROCESSO, GSISTE_SUBJECT, SIAPE, CARGO, LOTACAO];

pub const GSISTE_EXCLUSION_COLUMNS: &[FieldSpec] = &[EXCLUSAO];

pub const INACUMULAVEL: &str = "inacumulavel";

/// GSISTE exclusion sub-types all carry this marker (`exclusao_622`, ...).
pub fn is_exclusion(sub_type: &str) -> bool {
    sub_type.contains("exclusao")
}

/// The field holding the name of the person an ordinance is about.
pub fn subject_field(family: Family) -> FieldSpec {
    match family {
        Family::Gq => GQ_SUBJECT,
        Family::Removal => REMOVAL_SUBJECT,
        Family::Vacancy => VACANCY_SUBJECT,
        Family::Gsiste => GSISTE_SUBJECT,
    }
}

/// The fields a spreadsheet must provide, in declaration order.
pub fn required_columns(family: Family, sub_type: Option<&str>) -> Vec<FieldSpec> {
    let mut res: Vec<FieldSpec> = match family {
        Family::Gq => GQ_COLUMNS.to_vec(),
        Family::Removal => REMOVAL_COLUMNS.to_vec(),
        Family::Vacancy => VACANCY_COLUMNS.to_vec(),
        Family::Gsiste => GSISTE_COLUMNS.to_vec(),
    };
    match (family, sub_type) {
        (Family::Vacancy, Some(INACUMULAVEL)) => res.extend_from_slice(VACANCY_INACUMULAVEL_COLUMNS),
        (Family::Gsiste, Some(s)) if is_exclusion(s) => {
            res.extend_from_slice(GSISTE_EXCLUSION_COLUMNS)
        }
        _ => {}
    }
    res
}

/// The labels of the required fields that none of the columns provides.
///
/// An empty result means the spreadsheet can be processed.
pub fn missing_columns<S: AsRef<str>>(
    family: Family,
    columns: &[S],
    sub_type: Option<&str>,
) -> Vec<String> {
    let present: HashSet<String> = columns
        .iter()
        .map(|c| normalize_header(c.as_ref()))
        .collect();
    let missing: Vec<String> = required_columns(family, sub_type)
        .iter()
        .filter(|f| !f.is_present(&present))
        .map(|f| f.label.to_string())
        .collect();
    debug!(
        "missing_columns: family: {} sub_type: {:?} missing: {:?}",
        family, sub_type, missing
    );
    missing
}
