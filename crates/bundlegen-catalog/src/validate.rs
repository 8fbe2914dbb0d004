//! Structural validation of package manifests

use std::collections::BTreeSet;

use crate::error::ValidationError;
use crate::package::PackageManifest;

/// Check a package manifest is usable by a catalog
///
/// Checks run in order and the first failure is returned.
pub fn validate_package_manifest(
    manifest: Option<&PackageManifest>,
) -> Result<(), ValidationError> {
    let manifest = manifest.ok_or(ValidationError::MissingManifest)?;

    if manifest.channels.is_empty() {
        return Err(ValidationError::EmptyChannels);
    }

    if let Some(channel) = manifest.channels.iter().find(|c| c.current_csv.is_empty()) {
        return Err(ValidationError::ChannelMissingCsv {
            channel: channel.name.clone(),
        });
    }

    let mut seen = BTreeSet::new();
    for channel in &manifest.channels {
        if !seen.insert(channel.name.as_str()) {
            return Err(ValidationError::DuplicateChannel {
                channel: channel.name.clone(),
            });
        }
    }

    if !manifest.has_channel(&manifest.default_channel) {
        return Err(ValidationError::DefaultChannelMismatch {
            default_channel: manifest.default_channel.clone(),
        });
    }

    Ok(())
}
