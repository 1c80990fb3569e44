use chrono::{Local, NaiveDateTime, SubsecRound};
use log::{debug, error, info, warn};
use crate::columns::*;
use crate::config::*;
use crate::filler::{fill, TokenMap};
use crate::TemplateStore;

/// Name used when a record does not say who the ordinance is about.
pub const UNKNOWN_SUBJECT: &str = "ServidorDesconhecido";

/// A filled document and the name it should be delivered under.
pub struct Ordinance<D> {
    pub filename: String,
    pub document: D,
    pub tokens: TokenMap,
}

/// Builds ordinances of every family from one template store.
///
/// A generator holds no mutable state: each call loads its own copy of the
/// template, so it can be shared between concurrent requests.
///
/// ```
/// # use portarias::*;
/// # struct Lines(Vec<String>);
/// # impl TextUnits for Lines {
/// #     fn text_units(&mut self) -> Vec<&mut String> { self.0.iter_mut().collect() }
/// # }
/// # impl Template for Lines {
/// #     fn save(&self) -> Result<Vec<u8>, BoxError> { Ok(self.0.join("\n").into_bytes()) }
/// # }
/// # struct NoTemplates;
/// # impl TemplateStore for NoTemplates {
/// #     type Document = Lines;
/// #     fn load(&self, path: &str) -> Result<Lines, BoxError> {
/// #         Err(format!("{} not found", path).into())
/// #     }
/// # }
/// let generator = Generator::new(TemplateCatalog::default(), NoTemplates);
/// let record = Record::from_pairs([("TIPO_REMOCAO", "desconhecido")]);
/// let res = generator.build(Family::Removal, &record);
/// assert!(matches!(res, Err(BuildError::UnknownSubType { .. })));
/// ```
pub struct Generator<S> {
    catalog: TemplateCatalog,
    store: S,
    clock: fn() -> NaiveDateTime,
}

impl<S: TemplateStore> Generator<S> {
    pub fn new(catalog: TemplateCatalog, store: S) -> Generator<S> {
        Generator {
            catalog,
            store,
            clock: local_now,
        }
    }

    /// Replaces the clock used to stamp the file names.
    pub fn with_clock(self, clock: fn() -> NaiveDateTime) -> Generator<S> {
        Generator { clock, ..self }
    }

    pub fn catalog(&self) -> &TemplateCatalog {
        &self.catalog
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Fills the template of the family with the values of the record.
    pub fn build(
        &self,
        family: Family,
        record: &Record,
    ) -> Result<Ordinance<S::Document>, BuildError> {
        let sub_type = sub_type(family, record);
        let path = match self.catalog.template_path(family, sub_type.as_deref()) {
            Ok(p) => p,
            Err(e) => {
                warn!("build: {}", e);
                return Err(e);
            }
        };
        let mut document = match self.store.load(path) {
            Ok(d) => d,
            Err(e) => {
                error!(
                    "build: could not load the {} template {:?} (sub-type {:?}): {}",
                    family, path, sub_type, e
                );
                return TemplateUnavailableSnafu {
                    family,
                    path,
                    reason: e.to_string(),
                }
                .fail();
            }
        };
        info!("build: {} template {:?} loaded", family, path);

        let tokens = token_map(family, record, sub_type.as_deref());
        let modified = fill(&mut document, &tokens);
        debug!(
            "build: {} template {:?}: {} text units filled",
            family, path, modified
        );

        let filename = ordinance_filename(family, &subject_name(family, record), (self.clock)());
        Ok(Ordinance {
            filename,
            document,
            tokens,
        })
    }
}

/// The current local time, to the second.
pub fn local_now() -> NaiveDateTime {
    Local::now().naive_local().trunc_subsecs(0)
}

/// The sub-type named by the record, trimmed and in lower case.
/// Always `None` for families without variants.
pub fn sub_type(family: Family, record: &Record) -> Option<String> {
    let key = family.discriminator()?;
    record
        .get(key)
        .filter(|v| !v.is_blank())
        .map(|v| v.to_string().trim().to_lowercase())
}

/// The name of the person the ordinance is about, never empty.
pub fn subject_name(family: Family, record: &Record) -> String {
    subject_field(family)
        .value(record)
        .filter(|v| !v.is_blank())
        .map(|v| v.to_string())
        .unwrap_or_else(|| UNKNOWN_SUBJECT.to_string())
}

/// `<label>_<subject>_<YYYYMMDDHHMMSS>.docx`, with the spaces of the subject
/// turned into underscores.
pub fn ordinance_filename(family: Family, subject: &str, at: NaiveDateTime) -> String {
    let subject: String = subject
        .chars()
        .map(|c| match c {
            ' ' | '/' | '\\' => '_',
            c => c,
        })
        .collect();
    format!(
        "{}_{}_{}.docx",
        family.label(),
        subject,
        at.format("%Y%m%d%H%M%S")
    )
}

/// Maps a GQ grade written in roman numerals to its short code.
pub fn grade_code(raw: &str) -> &'static str {
    match raw.trim().to_uppercase().as_str() {
        "GQI" => "GQ1",
        "GQII" => "GQ2",
        "GQIII" => "GQ3",
        _ => "",
    }
}

/// All the replacements of one ordinance.
pub fn token_map(family: Family, record: &Record, sub_type: Option<&str>) -> TokenMap {
    let subject = subject_name(family, record);
    match family {
        Family::Gq => gq_tokens(record, &subject),
        Family::Removal => removal_tokens(record, &subject),
        Family::Vacancy => vacancy_tokens(record, &subject),
        Family::Gsiste => gsiste_tokens(record, &subject, sub_type),
    }
}

fn gq_tokens(record: &Record, subject: &str) -> TokenMap {
    let mut tokens = TokenMap::new();
    tokens.insert("#PROCESSO", PROCESSO.text(record));
    tokens.insert("#GQ", grade_code(&TIPO_GQ.text(record)));
    tokens.insert("#SERVIDOR", subject);
    tokens.insert("#CPF", CPF.text(record));
    tokens.insert("#SIAPE", SIAPE.text(record));
    tokens.insert("#DATAGQ", DATA_GQ.date(record));
    tokens
}

fn removal_tokens(record: &Record, subject: &str) -> TokenMap {
    let mut tokens = TokenMap::new();
    tokens.insert("#PROCESSO", PROCESSO.text(record));
    tokens.insert("#SERVIDOR", subject);
    tokens.insert("#CPF", CPF.text(record));
    tokens.insert("#SIAPE", SIAPE.text(record));
    tokens.insert("#CARGO", CARGO.text(record));
    tokens.insert("#LOTACAOORIGEM", LOTACAO_ORIGEM.text(record));
    tokens.insert("#LOTACAODESTINO", LOTACAO_DESTINO.text(record));
    let clause = match DATA_VIGENCIA.value(record) {
        Some(v) if !v.is_blank() => format!(", a partir de {}.", DATA_VIGENCIA.date(record)),
        _ => ".".to_string(),
    };
    tokens.insert("#CLAUSULA_VIGENCIA", clause);
    tokens
}

fn vacancy_tokens(record: &Record, subject: &str) -> TokenMap {
    let mut tokens = TokenMap::new();
    tokens.insert("#PROCESSO", PROCESSO.text(record));
    tokens.insert("#CARGO", CARGO.text(record));
    tokens.insert("#CLASSE", CLASSE.text(record));
    tokens.insert("#PADRAO", PADRAO.text(record));
    tokens.insert("#NOME", subject);
    tokens.insert("#CPF", CPF.text(record));
    tokens.insert("#SIAPE", SIAPE.text(record));
    tokens.insert("#VACANCIA", VACANCIA.date(record));
    tokens.insert("#NOVOCARG", NOVO_CARGO.text(record));
    tokens.insert("#NOVOORG", NOVO_ORGAO.text(record));
    tokens
}

fn gsiste_tokens(record: &Record, subject: &str, sub_type: Option<&str>) -> TokenMap {
    let mut tokens = TokenMap::new();
    tokens.insert("#PROCESSO", PROCESSO.text(record));
    tokens.insert("#SERVIDOR", subject);
    tokens.insert("#SIAPE", SIAPE.text(record));
    tokens.insert("#CARGO", CARGO.text(record));
    tokens.insert("#LOTACAO", LOTACAO.text(record));
    if sub_type.map_or(false, is_exclusion) {
        tokens.insert("#EXCLUSAO", EXCLUSAO.date(record));
    }
    tokens
}
