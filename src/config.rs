use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::consolidate::AttendanceSchema;

/// Settings file looked up in the base directory when none is given
pub const SETTINGS_FILE: &str = "consolidator.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("base directory not found: {}", .0.display())]
    MissingBaseDir(PathBuf),
    #[error("failed to read settings {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid settings {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid schema: {0}")]
    Schema(String),
}

/// Where everything lives. Relative paths resolve against `base_dir`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    #[serde(skip)]
    pub base_dir: PathBuf,
    pub children_dir: PathBuf,
    pub output_file: PathBuf,
    pub backup_dir: PathBuf,
    pub backup_file: String,
    pub log_file: PathBuf,
    pub preview_prefix: String,
    pub schema: AttendanceSchema,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            base_dir: PathBuf::from("."),
            children_dir: PathBuf::from("filhas"),
            output_file: PathBuf::from("PLANILHA_MAE.xlsx"),
            backup_dir: PathBuf::from("backup"),
            backup_file: "PLANILHA_MAE_BACKUP.xlsx".to_string(),
            log_file: PathBuf::from("log_compilacao.txt"),
            preview_prefix: "PLANILHA_TEMP_".to_string(),
            schema: AttendanceSchema::default(),
        }
    }
}

impl Settings {
    /// Load settings for `base_dir`.
    ///
    /// An explicit `config` path must exist. Without one, `consolidator.json`
    /// in the base directory is used if present, otherwise the defaults.
    pub fn load(base_dir: &Path, config: Option<&Path>) -> Result<Self, ConfigError> {
        if !base_dir.is_dir() {
            return Err(ConfigError::MissingBaseDir(base_dir.to_path_buf()));
        }

        let mut settings = match config {
            Some(path) => Self::from_file(path)?,
            None => {
                let default_path = base_dir.join(SETTINGS_FILE);
                if default_path.exists() {
                    Self::from_file(&default_path)?
                } else {
                    Settings::default()
                }
            }
        };

        settings.base_dir = base_dir.to_path_buf();
        settings.schema.validate().map_err(ConfigError::Schema)?;
        tracing::debug!(base_dir = %base_dir.display(), "settings loaded");
        Ok(settings)
    }

    fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    pub fn children_path(&self) -> PathBuf {
        self.resolve(&self.children_dir)
    }

    pub fn output_path(&self) -> PathBuf {
        self.resolve(&self.output_file)
    }

    pub fn backup_path(&self) -> PathBuf {
        self.resolve(&self.backup_dir).join(&self.backup_file)
    }

    pub fn log_path(&self) -> PathBuf {
        self.resolve(&self.log_file)
    }

    /// Previews are written next to the primary output
    pub fn preview_dir(&self) -> PathBuf {
        self.output_path()
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.base_dir.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_resolve_against_base_dir() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load(dir.path(), None).unwrap();

        assert_eq!(settings.children_path(), dir.path().join("filhas"));
        assert_eq!(settings.output_path(), dir.path().join("PLANILHA_MAE.xlsx"));
        assert_eq!(
            settings.backup_path(),
            dir.path().join("backup").join("PLANILHA_MAE_BACKUP.xlsx")
        );
        assert_eq!(settings.log_path(), dir.path().join("log_compilacao.txt"));
        assert_eq!(settings.preview_dir(), dir.path());
    }

    #[test]
    fn test_partial_settings_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(SETTINGS_FILE),
            r#"{ "children_dir": "entrada", "output_file": "/tmp/mae.xlsx" }"#,
        )
        .unwrap();

        let settings = Settings::load(dir.path(), None).unwrap();

        assert_eq!(settings.children_path(), dir.path().join("entrada"));
        assert_eq!(settings.output_path(), PathBuf::from("/tmp/mae.xlsx"));
        assert_eq!(settings.preview_prefix, "PLANILHA_TEMP_");
        assert_eq!(settings.schema, AttendanceSchema::default());
    }

    #[test]
    fn test_missing_base_dir() {
        let dir = tempfile::tempdir().unwrap();
        let err = Settings::load(&dir.path().join("nope"), None).unwrap_err();
        assert!(matches!(err, ConfigError::MissingBaseDir(_)));
    }

    #[test]
    fn test_explicit_config_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let err = Settings::load(dir.path(), Some(dir.path().join("custom.json").as_path())).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_invalid_json_and_schema() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            Settings::load(dir.path(), Some(path.as_path())).unwrap_err(),
            ConfigError::Parse { .. }
        ));

        fs::write(&path, r#"{ "schema": { "fields": [], "completion_field": "X", "duration_field": "Y", "sector_field": "Z", "truthy_tokens": [] } }"#).unwrap();
        assert!(matches!(
            Settings::load(dir.path(), Some(path.as_path())).unwrap_err(),
            ConfigError::Schema(_)
        ));
    }
}
