use std::collections::BTreeMap;
use std::fs;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::generate::*;

/// The JSON configuration of the templates. Every key is optional.
#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct TemplateSettings {
    #[serde(rename = "templateDirectory")]
    pub template_directory: Option<String>,
    pub gq: Option<String>,
    pub removal: Option<BTreeMap<String, String>>,
    pub vacancy: Option<BTreeMap<String, String>>,
    pub gsiste: Option<BTreeMap<String, String>>,
}

impl TemplateSettings {
    /// The default catalog, with the entries of this configuration laid on top.
    pub fn catalog(&self) -> TemplateCatalog {
        let mut catalog = TemplateCatalog::default();
        if let Some(gq) = &self.gq {
            catalog.gq = gq.clone();
        }
        for (overrides, table) in [
            (&self.removal, &mut catalog.removal),
            (&self.vacancy, &mut catalog.vacancy),
            (&self.gsiste, &mut catalog.gsiste),
        ] {
            for (sub_type, path) in overrides.iter().flatten() {
                table.insert(sub_type.trim().to_lowercase(), path.clone());
            }
        }
        debug!("catalog: {:?}", catalog);
        catalog
    }
}

pub fn read_config(path: &str) -> CliResult<TemplateSettings> {
    let contents = fs::read_to_string(path).context(OpeningConfigSnafu { path })?;
    let settings: TemplateSettings =
        serde_json::from_str(&contents).context(ParsingConfigSnafu { path })?;
    info!("read_config: {}: {:?}", path, settings);
    Ok(settings)
}
