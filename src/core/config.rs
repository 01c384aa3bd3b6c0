use anyhow::{Context, Result, bail};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};
use tracing::debug;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct FundConfig {
    pub number: String,
    pub name: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum WorkbookConfig {
    /// A directory with one CSV file per table
    Csv { path: String },
    /// A fjall keyspace with one partition per table
    Fjall { path: String },
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct TableNames {
    pub net_asset_values: String,
    pub budget: String,
    pub prospectus_rates: String,
    pub result: String,
    pub history: String,
}

impl Default for TableNames {
    fn default() -> Self {
        TableNames {
            net_asset_values: "net asset values".to_string(),
            budget: "budget".to_string(),
            prospectus_rates: "prospectus rates".to_string(),
            result: "TER".to_string(),
            history: "run history".to_string(),
        }
    }
}

fn default_result_row() -> usize {
    1
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    pub fund: FundConfig,
    pub workbook: Option<WorkbookConfig>,
    #[serde(default)]
    pub tables: TableNames,
    /// Fixed annual day-count base. Falls back to the number of NAV rows.
    pub day_base: Option<u32>,
    /// Row index (0 is the header) overwritten with the latest result.
    #[serde(default = "default_result_row")]
    pub result_row: usize,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("io", "ter", "ter")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn default_data_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("io", "ter", "ter")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.data_dir().to_path_buf())
    }

    /// Workbook location, defaulting to a CSV directory in the data dir.
    pub fn workbook_config(&self) -> Result<WorkbookConfig> {
        if let Some(workbook) = &self.workbook {
            return Ok(workbook.clone());
        }
        let path = Self::default_data_path()?.join("workbook");
        Ok(WorkbookConfig::Csv {
            path: path.to_string_lossy().into_owned(),
        })
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        config
            .validate()
            .with_context(|| format!("Invalid config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    /// Checks settings that deserialize fine but cannot be used.
    pub fn validate(&self) -> Result<()> {
        if self.result_row == 0 {
            bail!("result_row must be at least 1, row 0 holds the header");
        }
        if self.day_base == Some(0) {
            bail!("day_base must be greater than zero");
        }
        Ok(())
    }
}
