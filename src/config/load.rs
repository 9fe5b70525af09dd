//! Loading configuration files and resolving architecture databases.

use std::fs;
use std::path::{Path, PathBuf};

use serde_yaml::Mapping;
use tracing::debug;

use super::schema::{ArchConfig, ArchEntry, NetworkConfig};
use super::validate::validate_config;
use crate::error::{HeatNnError, Result};
use crate::network::ArchSpec;

/// Environment variable naming the directory of architecture databases.
pub const ARCHS_DIR_ENV: &str = "ARCHS_DIR";

/// Reads a YAML file into any deserializable type.
pub fn read_yaml<T, P>(path: P) -> Result<T>
where
    T: serde::de::DeserializeOwned,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .map_err(|e| HeatNnError::io(format!("reading {}", path.display()), e))?;
    serde_yaml::from_str(&content).map_err(|source| HeatNnError::Yaml {
        path: path.to_path_buf(),
        source,
    })
}

impl NetworkConfig {
    /// Parses a configuration from YAML text without validating it.
    pub fn from_yaml_str(yaml: &str) -> Result<NetworkConfig> {
        serde_yaml::from_str(yaml).map_err(|source| HeatNnError::Yaml {
            path: PathBuf::from("<inline>"),
            source,
        })
    }

    /// Loads and validates a configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<NetworkConfig> {
        let cfg: NetworkConfig = read_yaml(path.as_ref())?;
        validate_config(&cfg)?;
        debug!(path = %path.as_ref().display(), "configuration loaded");
        Ok(cfg)
    }
}

impl ArchConfig {
    /// Turns the architecture selection into a concrete [`ArchSpec`].
    ///
    /// With a `db_file`, the entry `name` is read from `archs_dir/db_file`
    /// (`archs_dir` defaults to `$ARCHS_DIR`). Config args are merged into
    /// the entry args; on key collisions the database value wins.
    pub fn resolve(&self, archs_dir: Option<&Path>) -> Result<ArchSpec> {
        match (&self.db_file, &self.name) {
            (Some(db_file), Some(name)) => {
                let dir = match archs_dir {
                    Some(dir) => dir.to_path_buf(),
                    None => std::env::var_os(ARCHS_DIR_ENV).map(PathBuf::from).ok_or_else(|| {
                        HeatNnError::Config(format!(
                            "arch.db_file is set but ${ARCHS_DIR_ENV} is not defined"
                        ))
                    })?,
                };
                let db_path = dir.join(db_file);
                let mut db: Mapping = read_yaml(&db_path)?;
                let entry_value = db
                    .remove(name.as_str())
                    .ok_or_else(|| HeatNnError::ArchNotFound {
                        name: name.clone(),
                        db: db_path.clone(),
                    })?;
                let entry: ArchEntry = serde_yaml::from_value(entry_value).map_err(|source| {
                    HeatNnError::Yaml { path: db_path.clone(), source }
                })?;

                let merged = merge_args(&self.args, &entry.args);
                debug!(arch = %name, db = %db_path.display(), "architecture resolved from database");
                ArchSpec::from_mapping(entry.kind, merged)
            }
            _ => {
                let kind = self.kind.ok_or_else(|| {
                    HeatNnError::Config("arch needs db_file + name or an inline type".into())
                })?;
                ArchSpec::from_mapping(kind, self.args.clone())
            }
        }
    }
}

/// `{**base, **overrides}`: every key of `overrides` replaces the one in `base`.
fn merge_args(base: &Mapping, overrides: &Mapping) -> Mapping {
    let mut merged = base.clone();
    for (key, value) in overrides {
        merged.insert(key.clone(), value.clone());
    }
    merged
}
