//! PackageManifest document model
//!
//! A package manifest maps channel names to the CSV each channel currently
//! points at. Fields serialize in a fixed order so regenerating with the
//! same inputs yields identical bytes.

use semver::Version;
use serde::{Deserialize, Serialize};

use crate::csv::csv_name;

/// Channel used when none is given
pub const DEFAULT_CHANNEL: &str = "alpha";

/// Package manifest file name for an operator
pub fn package_file_name(operator_name: &str) -> String {
    format!("{}.package.yaml", operator_name)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageManifest {
    #[serde(default)]
    pub channels: Vec<PackageChannel>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub default_channel: String,

    #[serde(default)]
    pub package_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageChannel {
    #[serde(rename = "currentCSV", default)]
    pub current_csv: String,

    pub name: String,
}

impl PackageManifest {
    /// A manifest with a single channel pointing at `version`
    ///
    /// The channel falls back to `DEFAULT_CHANNEL` and becomes the default.
    pub fn new(operator_name: &str, channel: &str, version: &Version) -> Self {
        let channel = if channel.is_empty() { DEFAULT_CHANNEL } else { channel };
        Self {
            channels: vec![PackageChannel {
                current_csv: csv_name(operator_name, version),
                name: channel.to_string(),
            }],
            default_channel: channel.to_string(),
            package_name: operator_name.to_string(),
        }
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }

    pub fn channel(&self, name: &str) -> Option<&PackageChannel> {
        self.channels.iter().find(|c| c.name == name)
    }

    pub fn has_channel(&self, name: &str) -> bool {
        self.channel(name).is_some()
    }

    /// Point `channel` at `current_csv`, adding the channel if missing
    pub fn set_channel(&mut self, channel: &str, current_csv: String) {
        match self.channels.iter_mut().find(|c| c.name == channel) {
            Some(existing) => existing.current_csv = current_csv,
            None => self.channels.push(PackageChannel {
                current_csv,
                name: channel.to_string(),
            }),
        }
    }

    /// Order channels by name
    pub fn sort_channels(&mut self) {
        self.channels.sort_by(|a, b| a.name.cmp(&b.name));
    }
}
