use serde::{Deserialize, Serialize};
use std::{fs::File, io::BufReader, path::Path};

use crate::{
    backend::Backend,
    objective::{select_objective, Objective},
    protocol::SelectionContext,
    Error, InternalResult,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectorConfig {
    #[serde(default)]
    pub backend: Backend,

    #[serde(default)]
    pub differential_privacy: bool,

    #[serde(default)]
    pub output_count: Option<usize>,

    #[serde(default = "default_objective")]
    pub objective: Option<String>,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            differential_privacy: false,
            output_count: None,
            objective: default_objective(),
        }
    }
}

impl SelectorConfig {
    pub fn context(&self) -> SelectionContext {
        SelectionContext {
            backend: self.backend,
            differential_privacy: self.differential_privacy,
            output_count: self.output_count,
        }
    }

    /// Selects the configured objective on the configured back-end.
    pub fn objective(&self) -> InternalResult<Option<Objective>> {
        let Some(text) = self.objective.as_deref() else {
            return Ok(None);
        };
        Ok(select_objective(text, self.backend, &self.context())?)
    }
}

pub fn from_file<T: for<'de> Deserialize<'de>, P: AsRef<Path>>(path: P) -> InternalResult<T> {
    let file = File::open(path)
        .map_err(|e| Error::config(format!("Failed to open config file: {}", e)))?;
    let reader = BufReader::new(file);
    let config = serde_json::from_reader(reader)
        .map_err(|e| Error::config(format!("Failed to parse config file: {}", e)))?;
    Ok(config)
}

pub fn from_str<T: for<'de> Deserialize<'de>>(s: &str) -> InternalResult<T> {
    let config = serde_json::from_str(s)
        .map_err(|e| Error::config(format!("Failed to parse config: {}", e)))?;
    Ok(config)
}

fn default_objective() -> Option<String> {
    None
}
