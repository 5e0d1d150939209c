use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageManifest {
    pub name: String,
    pub version: String,
    pub author: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl PackageManifest {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read package manifest from {}", path.display()))?;

        let manifest: PackageManifest = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse package manifest JSON from {}", path.display()))?;

        Ok(manifest)
    }

    // CDN-facing URLs use the floating `latest` channel when no version is declared
    pub fn version_or_latest(&self) -> &str {
        if self.version.is_empty() {
            "latest"
        } else {
            &self.version
        }
    }
}
