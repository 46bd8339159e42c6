use gridnote_engine::{SerializerOptions, TableAction};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Bullet characters markdown accepts for list items.
const BULLETS: [char; 3] = ['-', '*', '+'];

/// Upper bound for either dimension of a newly inserted table.
pub const MAX_TABLE_DIMENSION: usize = 64;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {config_path}: {source}")]
    ConfigReadError {
        config_path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {config_path}: {source}")]
    ConfigParseError {
        config_path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Invalid setting {key}: {reason}")]
    InvalidSetting { key: &'static str, reason: String },
}

/// Defaults for the "Insert table" action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableSettings {
    pub default_rows: usize,
    pub default_cols: usize,
    pub with_header: bool,
}

impl Default for TableSettings {
    fn default() -> Self {
        Self {
            default_rows: 3,
            default_cols: 3,
            with_header: true,
        }
    }
}

/// Markdown output style.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkdownSettings {
    pub bullet: char,
    pub pad_table_cells: bool,
}

impl Default for MarkdownSettings {
    fn default() -> Self {
        let options = SerializerOptions::default();
        Self {
            bullet: options.bullet,
            pad_table_cells: options.pad_table_cells,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub table: TableSettings,
    pub markdown: MarkdownSettings,
}

impl Config {
    pub fn load_from_path<P: AsRef<Path>>(config_path: P) -> Result<Option<Self>, ConfigError> {
        let config_path = config_path.as_ref();
        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(config_path).map_err(|source| {
            ConfigError::ConfigReadError {
                config_path: config_path.to_path_buf(),
                source,
            }
        })?;

        let config: Config =
            toml::from_str(&content).map_err(|source| ConfigError::ConfigParseError {
                config_path: config_path.to_path_buf(),
                source,
            })?;
        config.validate()?;

        Ok(Some(config))
    }

    pub fn load() -> Result<Option<Self>, ConfigError> {
        let config_path = Self::config_path();
        Self::load_from_path(&config_path)
    }

    pub fn save_to_path<P: AsRef<Path>>(&self, config_path: P) -> anyhow::Result<()> {
        self.validate()?;
        let config_path = config_path.as_ref();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = Self::config_path();
        self.save_to_path(&config_path)
    }

    pub fn config_path() -> PathBuf {
        let config_dir = shellexpand::tilde("~/.config/gridnote");
        PathBuf::from(config_dir.as_ref()).join("config.toml")
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (key, value) in [
            ("table.default_rows", self.table.default_rows),
            ("table.default_cols", self.table.default_cols),
        ] {
            if value == 0 || value > MAX_TABLE_DIMENSION {
                return Err(ConfigError::InvalidSetting {
                    key,
                    reason: format!("{value} is outside 1..={MAX_TABLE_DIMENSION}"),
                });
            }
        }
        if !BULLETS.contains(&self.markdown.bullet) {
            return Err(ConfigError::InvalidSetting {
                key: "markdown.bullet",
                reason: format!("'{}' is not one of - * +", self.markdown.bullet),
            });
        }
        Ok(())
    }

    pub fn serializer_options(&self) -> SerializerOptions {
        SerializerOptions {
            bullet: self.markdown.bullet,
            pad_table_cells: self.markdown.pad_table_cells,
        }
    }

    /// The menu's insert action sized from the table defaults.
    pub fn insert_table_action(&self) -> TableAction {
        TableAction::InsertTable {
            rows: self.table.default_rows,
            cols: self.table.default_cols,
            with_header: self.table.with_header,
        }
    }
}
