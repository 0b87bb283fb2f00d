//!
//! Configuration supplied by the embedding system.
//!
//! The interface layer never inspects the host itself. Facts about the host
//! release are parsed from text the caller provides (typically the contents of
//! `/etc/os-release`) and handed to the interface constructors.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Identity of the host distribution release.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReleaseInfo {
    /// `ID=` from os-release, e.g. `ubuntu`.
    pub id: String,
    /// `VERSION_ID=` from os-release, e.g. `16.04`. Empty on rolling releases.
    #[serde(default)]
    pub version_id: String,
}

impl ReleaseInfo {
    pub fn new(id: impl Into<String>, version_id: impl Into<String>) -> Self {
        ReleaseInfo { id: id.into(), version_id: version_id.into() }
    }

    /// Parses os-release formatted text.
    ///
    /// Only `ID` is mandatory. Values may be single or double quoted; comments
    /// and blank lines are skipped.
    pub fn from_os_release(text: &str) -> Result<Self, ConfigError> {
        let mut id = None;
        let mut version_id = String::new();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let value = unquote(value.trim());
            match key.trim() {
                "ID" => id = Some(value.to_string()),
                "VERSION_ID" => version_id = value.to_string(),
                _ => {}
            }
        }
        let id = id.filter(|id| !id.is_empty()).ok_or(ConfigError::MissingField("ID"))?;
        Ok(ReleaseInfo { id, version_id })
    }

    pub fn is(&self, id: &str, version_id: &str) -> bool {
        self.id == id && self.version_id == version_id
    }
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = value.strip_prefix(quote).and_then(|v| v.strip_suffix(quote)) {
            return inner;
        }
    }
    value
}

/// Settings used when building the interface registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfacesConfig {
    pub release: ReleaseInfo,
    /// True on classic (non Ubuntu Core) systems.
    #[serde(default = "default_on_classic")]
    pub on_classic: bool,
}

fn default_on_classic() -> bool {
    true
}

impl Default for InterfacesConfig {
    fn default() -> Self {
        InterfacesConfig { release: ReleaseInfo::default(), on_classic: default_on_classic() }
    }
}

impl InterfacesConfig {
    pub fn new(release: ReleaseInfo, on_classic: bool) -> Self {
        InterfacesConfig { release, on_classic }
    }

    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))
    }
}
