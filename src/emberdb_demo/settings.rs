// Copyright 2024 Vincent Chan
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//	http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Settings of the demo.
//!
//! `database_path` is taken from the command line flag or the
//! `EMBERDB_DATABASE_PATH` environment variable (both resolved by clap),
//! then from the `database_path` key of a TOML settings file.

use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use serde::Deserialize;
use thiserror::Error;

pub const SETTINGS_FILE_NAME: &str = "emberdb-demo.toml";

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub database_path: PathBuf,
}

#[derive(Debug, Default, Clone)]
pub struct LoadOptions {
    /// Value given by `--database-path` or the environment.
    pub database_path: Option<PathBuf>,
    /// Value given by `--config`. The file must exist.
    pub config_path: Option<PathBuf>,
    /// Directory searched for the default settings file, the current
    /// directory when unset.
    pub working_dir: Option<PathBuf>,
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to resolve working directory: {source}")]
    WorkingDirectory { source: io::Error },
    #[error("settings file {path} not found")]
    FileNotFound { path: PathBuf },
    #[error("failed to read settings {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("failed to parse settings {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("database_path is not set, pass --database-path, set EMBERDB_DATABASE_PATH or add it to {}", .path.display())]
    MissingDatabasePath { path: PathBuf },
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawSettings {
    database_path: Option<PathBuf>,
}

impl Settings {

    pub fn new(database_path: impl Into<PathBuf>) -> Settings {
        Settings {
            database_path: database_path.into(),
        }
    }

    pub fn load(options: LoadOptions) -> Result<Settings, SettingsError> {
        if let Some(database_path) = options.database_path {
            return Ok(Settings::new(database_path));
        }

        let file_path = match options.config_path {
            Some(path) => {
                if !path.exists() {
                    return Err(SettingsError::FileNotFound { path });
                }
                path
            }
            None => {
                let working_dir = match options.working_dir {
                    Some(dir) => dir,
                    None => env::current_dir().map_err(|source| SettingsError::WorkingDirectory { source })?,
                };
                working_dir.join(SETTINGS_FILE_NAME)
            }
        };

        let raw = if file_path.exists() {
            load_file(&file_path)?
        } else {
            RawSettings::default()
        };

        match raw.database_path {
            Some(database_path) => Ok(Settings::new(relative_to(&file_path, database_path))),
            None => Err(SettingsError::MissingDatabasePath { path: file_path }),
        }
    }

}

fn load_file(path: &Path) -> Result<RawSettings, SettingsError> {
    let contents = fs::read_to_string(path).map_err(|source| SettingsError::Io {
        path: path.into(),
        source,
    })?;
    toml::from_str(&contents).map_err(|source| SettingsError::Parse {
        path: path.into(),
        source,
    })
}

/// Relative paths in a settings file are relative to that file.
fn relative_to(file_path: &Path, value: PathBuf) -> PathBuf {
    if value.is_absolute() {
        return value;
    }
    match file_path.parent() {
        Some(dir) => dir.join(value),
        None => value,
    }
}
