use crate::error::{Error, Result};

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Default location of the engine config file.
pub const DEFAULT_CONFIG_PATH: &str = "/mongod-config/mongod.conf";

#[derive(Debug, Default, Deserialize)]
struct NetSection {
    port: Option<u16>,
}

#[derive(Debug, Default, Deserialize)]
struct ReplicationSection {
    #[serde(rename = "replSetName")]
    repl_set_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(default)]
    net: Option<NetSection>,

    #[serde(default)]
    replication: Option<ReplicationSection>,
}

/// The parts of the mongod config file the agent needs.
///
/// The file itself is handed to mongod unchanged, so only these settings are
/// read and everything else is ignored.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MongodConfig {
    path: PathBuf,
    port: Option<u16>,
    replica_set_name: String,
}

impl MongodConfig {
    /// Loads a JSON or YAML config file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if it does not
    /// set `replication.replSetName`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::Io("failed to read mongod config", e))?;

        Self::parse(path, &contents)
    }

    fn parse(path: &Path, contents: &str) -> Result<Self> {
        // YAML is a superset of JSON, so one parser covers both formats.
        let raw: RawConfig = serde_yaml::from_str(contents).map_err(|source| Error::Config {
            path: path.to_path_buf(),
            source,
        })?;

        let replica_set_name = raw
            .replication
            .and_then(|replication| replication.repl_set_name)
            .filter(|name| !name.trim().is_empty())
            .ok_or_else(|| Error::MissingReplicaSetName(path.to_path_buf()))?;

        Ok(Self {
            path: path.to_path_buf(),
            port: raw.net.and_then(|net| net.port),
            replica_set_name,
        })
    }

    /// Path the config was loaded from.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `net.port`, if set.
    #[must_use]
    pub const fn port(&self) -> Option<u16> {
        self.port
    }

    /// `replication.replSetName`.
    #[must_use]
    pub fn replica_set_name(&self) -> &str {
        &self.replica_set_name
    }
}
