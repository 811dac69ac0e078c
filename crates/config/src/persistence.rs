//! Reading and writing the resilience config file
//!
//! Saves go through a temp file in the target directory and a rename, so a
//! crash mid-write leaves either the old file or the new one. The previous
//! file is kept next to it as `<name>.toml.backup`.

use crate::error::join_errors;
use crate::{Config, ConfigError, ConfigResult};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Handle to one config file on disk
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of the copy kept from the previous save
    pub fn backup_path(&self) -> PathBuf {
        self.path.with_extension("toml.backup")
    }

    /// Reads the config file
    ///
    /// A missing file yields the defaults so a fresh install runs with the
    /// built-in retry and breaker settings. An empty or malformed file is an
    /// error. Out-of-range values are logged and returned as written.
    pub fn load(&self) -> ConfigResult<Config> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                log::info!("No config at {}, using defaults", self.path.display());
                return Ok(Config::default());
            }
            Err(source) => return Err(self.read_error(source)),
        };

        if text.trim().is_empty() {
            return Err(self.read_error(io::Error::new(
                io::ErrorKind::InvalidData,
                "config file is empty",
            )));
        }

        let config: Config = toml::from_str(&text).map_err(|source| ConfigError::ParseError {
            path: self.path.clone(),
            source,
        })?;

        if let Err(errors) = config.validate() {
            log::warn!(
                "{} has invalid settings: {}",
                self.path.display(),
                join_errors(&errors)
            );
        }

        log::debug!(
            "Loaded config from {} ({} service overrides)",
            self.path.display(),
            config.services.len()
        );
        Ok(config)
    }

    /// Reads the config file, using the defaults if it cannot be read
    pub fn load_or_default(&self) -> Config {
        self.load().unwrap_or_else(|e| {
            log::warn!("{e}; falling back to default resilience settings");
            Config::default()
        })
    }

    /// Validates and writes the config, replacing the file atomically
    pub fn save(&self, config: &Config) -> ConfigResult<()> {
        config
            .validate()
            .map_err(|errors| ConfigError::ValidationError(join_errors(&errors)))?;

        let text = toml::to_string_pretty(config)?;
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        fs::create_dir_all(dir).map_err(|source| ConfigError::DirectoryCreationError {
            path: dir.to_path_buf(),
            source,
        })?;

        if self.path.exists() {
            fs::copy(&self.path, self.backup_path())
                .map_err(|source| ConfigError::BackupError { source })?;
        }

        let mut temp = NamedTempFile::new_in(dir)?;
        temp.write_all(text.as_bytes())?;
        temp.flush()?;
        temp.persist(&self.path)
            .map_err(|e| ConfigError::WriteError {
                path: self.path.clone(),
                source: e.error,
            })?;

        log::info!("Saved resilience config to {}", self.path.display());
        Ok(())
    }

    fn read_error(&self, source: io::Error) -> ConfigError {
        ConfigError::ReadError {
            path: self.path.clone(),
            source,
        }
    }
}
