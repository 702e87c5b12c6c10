//! Batch configuration

use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use som_validation::IdentificationConfig;
use tracing::debug;

use crate::{Error, Result};

/// Names of the property set and attribute holding an entity's identifier
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IdentificationSettings {
    pub property_set: String,
    pub attribute: String,
}

/// Settings of one batch run
///
/// Loaded from YAML or JSON; command line flags are applied on top before
/// [`ModelcheckConfig::validate`] runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelcheckConfig {
    /// Project name stored with every issue
    pub project: String,
    /// Schema project file (JSON or YAML)
    pub schema: PathBuf,
    /// Issue database; a file in the temp directory named after the project when absent
    #[serde(default)]
    pub database: Option<PathBuf>,
    #[serde(default)]
    pub identification: IdentificationSettings,
    /// Export target for the issues of the run; `.json` selects JSON, anything else CSV
    #[serde(default)]
    pub export: Option<PathBuf>,
    /// Overrides today's date as the run date
    #[serde(default)]
    pub run_date: Option<NaiveDate>,
}

impl ModelcheckConfig {
    pub fn new(project: impl Into<String>, schema: impl Into<PathBuf>) -> Self {
        Self {
            project: project.into(),
            schema: schema.into(),
            database: None,
            identification: IdentificationSettings::default(),
            export: None,
            run_date: None,
        }
    }

    #[must_use]
    pub fn with_identification(
        mut self,
        property_set: impl Into<String>,
        attribute: impl Into<String>,
    ) -> Self {
        self.identification = IdentificationSettings {
            property_set: property_set.into(),
            attribute: attribute.into(),
        };
        self
    }

    #[must_use]
    pub fn with_database(mut self, path: impl Into<PathBuf>) -> Self {
        self.database = Some(path.into());
        self
    }

    #[must_use]
    pub fn with_export(mut self, path: impl Into<PathBuf>) -> Self {
        self.export = Some(path.into());
        self
    }

    #[must_use]
    pub fn with_run_date(mut self, run_date: NaiveDate) -> Self {
        self.run_date = Some(run_date);
        self
    }

    /// Load a config file; `.yaml`/`.yml` is read as YAML, anything else as
    /// JSON. Relative paths inside the file are taken relative to the file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] when the file cannot be read and
    /// [`Error::Config`] when it does not parse.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::io("read config", path.display().to_string(), e.to_string()))?;

        let mut config: Self = if path
            .extension()
            .is_some_and(|e| e == "yaml" || e == "yml")
        {
            serde_yaml::from_str(&content)
                .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?
        } else {
            serde_json::from_str(&content)
                .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?
        };

        if let Some(base) = path.parent() {
            config.resolve_relative_to(base);
        }
        debug!(project = %config.project, "Loaded config from {}", path.display());
        Ok(config)
    }

    fn resolve_relative_to(&mut self, base: &Path) {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        resolve(&mut self.schema);
        if let Some(database) = self.database.as_mut() {
            resolve(database);
        }
        if let Some(export) = self.export.as_mut() {
            resolve(export);
        }
    }

    /// Check the merged config before any model file is touched.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for a blank project, a missing schema file
    /// or blank identification names.
    pub fn validate(&self) -> Result<()> {
        if self.project.trim().is_empty() {
            return Err(Error::Config("project name is empty".to_string()));
        }
        if !self.schema.is_file() {
            return Err(Error::Config(format!(
                "schema file '{}' does not exist",
                self.schema.display()
            )));
        }
        self.identification_config()?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`Error::Identification`] when either name is blank.
    pub fn identification_config(&self) -> Result<IdentificationConfig> {
        Ok(IdentificationConfig::new(
            &self.identification.property_set,
            &self.identification.attribute,
        )?)
    }

    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.database.clone().unwrap_or_else(|| {
            let stem: String = self
                .project
                .chars()
                .map(|c| if c.is_alphanumeric() || c == '-' { c } else { '_' })
                .collect();
            std::env::temp_dir().join(format!("{stem}.db"))
        })
    }

    #[must_use]
    pub fn run_date(&self) -> NaiveDate {
        self.run_date.unwrap_or_else(|| Local::now().date_naive())
    }
}
