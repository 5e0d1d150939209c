use anyhow::{Context, Result, anyhow, bail};
use std::fs;
use std::path::{Path, PathBuf};

use crate::manifest::PackageManifest;

pub struct VersionCheck {
    manifest_path: PathBuf,
    source_path: Option<PathBuf>,
    artifact_path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionTriple {
    pub manifest: String,
    pub source: String,
    pub artifact: String,
}

impl VersionTriple {
    pub fn assert_parity(&self) -> Result<()> {
        if self.manifest != self.source {
            bail!(
                "Version mismatch between package (v{}) and source entry (v{})",
                self.manifest,
                self.source
            );
        }

        if self.manifest != self.artifact {
            bail!(
                "Version mismatch between package (v{}) and build (v{})",
                self.manifest,
                self.artifact
            );
        }

        // implied by the two checks above, kept for a clearer message when
        // the manifest itself is the drifting value
        if self.source != self.artifact {
            bail!(
                "Version mismatch between source entry (v{}) and build (v{})",
                self.source,
                self.artifact
            );
        }

        Ok(())
    }
}

impl VersionCheck {
    pub fn new(manifest_path: impl AsRef<Path>) -> Self {
        Self {
            manifest_path: manifest_path.as_ref().to_path_buf(),
            source_path: None,
            artifact_path: None,
        }
    }

    pub fn source_path(mut self, path: impl AsRef<Path>) -> Self {
        self.source_path = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn artifact_path(mut self, path: impl AsRef<Path>) -> Self {
        self.artifact_path = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn run(&self) -> Result<VersionTriple> {
        let manifest = PackageManifest::load(&self.manifest_path)?;

        let source_path = self
            .source_path
            .clone()
            .unwrap_or_else(|| PathBuf::from("lib/env/data.js"));
        let artifact_path = self
            .artifact_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(format!("dist/node/{}.cjs", manifest.name)));

        let triple = VersionTriple {
            manifest: manifest.version,
            source: read_version_marker(&source_path)?,
            artifact: read_version_marker(&artifact_path)?,
        };

        println!("Checking versions...");
        println!("----------------------------");
        println!("Package version: v{}", triple.manifest);
        println!("Source version: v{}", triple.source);
        println!("Build version: v{}", triple.artifact);
        println!("----------------------------");

        triple.assert_parity()?;

        println!("✓ PASSED");

        Ok(triple)
    }
}

pub fn read_version_marker(path: &Path) -> Result<String> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read version marker from {}", path.display()))?;

    extract_version_marker(&content)
        .ok_or_else(|| anyhow!("No VERSION marker found in {}", path.display()))
}

// Artifacts are never executed; the embedded `VERSION = "x.y.z"` constant
// is read as plain text. The Node CJS bundle is not minified, so the
// assignment survives bundling verbatim.
fn extract_version_marker(content: &str) -> Option<String> {
    content.lines().find_map(version_from_line)
}

fn version_from_line(line: &str) -> Option<String> {
    let idx = line.find("VERSION")?;
    let rest = line[idx + "VERSION".len()..].trim_start();
    let rest = rest.strip_prefix('=')?.trim_start();

    let mut chars = rest.chars();
    let quote = chars.next()?;
    if quote != '"' && quote != '\'' {
        return None;
    }

    let version: String = chars.take_while(|&c| c != quote).collect();
    if version.is_empty() { None } else { Some(version) }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup(pkg: &str, src: &str, art: &str) -> (tempfile::TempDir, VersionCheck) {
        let dir = tempfile::tempdir().unwrap();

        fs::write(
            dir.path().join("package.json"),
            format!(r#"{{"name":"axios","version":"{pkg}","author":"Dev"}}"#),
        )
        .unwrap();

        fs::write(
            dir.path().join("data.js"),
            format!("export const VERSION = \"{src}\";\n"),
        )
        .unwrap();

        fs::write(
            dir.path().join("axios.cjs"),
            format!(
                "// Axios v{art} Copyright (c) 2026 Dev and contributors\n'use strict';\nconst VERSION = '{art}';\nmodule.exports.VERSION = VERSION;\n"
            ),
        )
        .unwrap();

        let check = VersionCheck::new(dir.path().join("package.json"))
            .source_path(dir.path().join("data.js"))
            .artifact_path(dir.path().join("axios.cjs"));

        (dir, check)
    }

    #[test]
    fn test_matching_versions_pass() {
        let (_dir, check) = setup("1.2.3", "1.2.3", "1.2.3");
        let triple = check.run().unwrap();
        assert_eq!(
            triple,
            VersionTriple {
                manifest: "1.2.3".to_string(),
                source: "1.2.3".to_string(),
                artifact: "1.2.3".to_string(),
            }
        );
    }

    #[test]
    fn test_source_mismatch_names_both_values() {
        let (_dir, check) = setup("1.2.3", "1.2.4", "1.2.3");
        let err = check.run().unwrap_err().to_string();
        assert!(err.contains("package (v1.2.3)"));
        assert!(err.contains("source entry (v1.2.4)"));
    }

    #[test]
    fn test_artifact_mismatch_names_the_build() {
        let (_dir, check) = setup("1.2.3", "1.2.3", "1.2.2");
        let err = check.run().unwrap_err().to_string();
        assert!(err.contains("build (v1.2.2)"));
        assert!(!err.contains("source entry"));
    }

    #[test]
    fn test_missing_artifact_is_fatal() {
        let (dir, _) = setup("1.2.3", "1.2.3", "1.2.3");
        let check = VersionCheck::new(dir.path().join("package.json"))
            .source_path(dir.path().join("data.js"))
            .artifact_path(dir.path().join("missing.cjs"));

        let err = check.run().unwrap_err();
        assert!(err.to_string().contains("Failed to read version marker"));
    }

    #[test]
    fn test_marker_extraction() {
        assert_eq!(
            version_from_line("export const VERSION = \"1.2.3\";"),
            Some("1.2.3".to_string())
        );
        assert_eq!(
            version_from_line("const VERSION = '4.5.6';"),
            Some("4.5.6".to_string())
        );
        assert_eq!(version_from_line("VERSION='0.1.0'"), Some("0.1.0".to_string()));

        // usages and comparisons are not markers
        assert_eq!(version_from_line("return axios.VERSION;"), None);
        assert_eq!(version_from_line("if (x.VERSION === '1.0.0') {"), None);
        assert_eq!(version_from_line("const VERSION = unknown;"), None);
    }

    #[test]
    fn test_marker_skips_banner_lines() {
        let content = "// Axios v9.9.9 Copyright (c) 2026 Dev\nconst VERSION = \"1.2.3\";\n";
        assert_eq!(extract_version_marker(content), Some("1.2.3".to_string()));
    }
}
