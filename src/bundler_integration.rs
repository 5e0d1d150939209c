use anyhow::{Context, Result, anyhow};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::build_matrix::BuildConfigRecord;

pub struct BundlerDriver {
    command: String,
    config_dir: PathBuf,
    dry_run: bool,
}

impl BundlerDriver {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            config_dir: PathBuf::from(".distkit/configs"),
            dry_run: false,
        }
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn config_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.config_dir = dir.as_ref().to_path_buf();
        self
    }

    // Records are consumed strictly in matrix order; the first failure
    // aborts the rest, there is no partial-success mode.
    pub fn run_matrix(&self, records: &[BuildConfigRecord]) -> Result<()> {
        for record in records {
            self.run(record)?;
        }
        Ok(())
    }

    pub fn run(&self, record: &BuildConfigRecord) -> Result<()> {
        let config_path = self.write_config(record)?;

        if self.dry_run {
            println!(
                "Would bundle {} -> {} (config: {})",
                record.input.display(),
                record.output_file.display(),
                config_path.display()
            );
            return Ok(());
        }

        println!(
            "Bundling {} -> {}",
            record.input.display(),
            record.output_file.display()
        );

        let output = Command::new(&self.command)
            .arg("--config")
            .arg(&config_path)
            .output()
            .with_context(|| format!("Failed to invoke bundler `{}`", self.command))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!(
                "Bundler failed for {}: {}",
                record.output_file.display(),
                stderr.trim()
            ));
        }

        self.copy_declarations(record)?;
        self.report_artifact(record);

        Ok(())
    }

    fn write_config(&self, record: &BuildConfigRecord) -> Result<PathBuf> {
        fs::create_dir_all(&self.config_dir).with_context(|| {
            format!(
                "Failed to create config directory: {}",
                self.config_dir.display()
            )
        })?;

        let config_path = self.config_dir.join(config_file_name(record));

        let config_json = serde_json::to_string_pretty(record)
            .context("Failed to serialize build config to JSON")?;

        fs::write(&config_path, config_json)
            .with_context(|| format!("Failed to write build config to {}", config_path.display()))?;

        Ok(config_path)
    }

    fn copy_declarations(&self, record: &BuildConfigRecord) -> Result<()> {
        for copy in &record.declaration_copies {
            fs::create_dir_all(&copy.dest_dir).with_context(|| {
                format!(
                    "Failed to create declaration directory: {}",
                    copy.dest_dir.display()
                )
            })?;

            let dest = copy.dest_dir.join(&copy.rename);
            fs::copy(&copy.source, &dest).with_context(|| {
                format!(
                    "Failed to copy declarations from {} to {}",
                    copy.source.display(),
                    dest.display()
                )
            })?;

            println!("Copied declarations: {} -> {}", copy.source.display(), dest.display());
        }

        Ok(())
    }

    fn report_artifact(&self, record: &BuildConfigRecord) {
        if let Ok(meta) = fs::metadata(&record.output_file) {
            println!(
                "Wrote {} ({} bytes)",
                record.output_file.display(),
                meta.len()
            );
        }
    }
}

// Output paths are unique per record, so a flattened path makes a unique
// config file name (`dist/esm/axios.js` -> `dist-esm-axios.js.json`).
fn config_file_name(record: &BuildConfigRecord) -> String {
    let flat: Vec<String> = record
        .output_file
        .iter()
        .map(|c| c.to_string_lossy().into_owned())
        .collect();
    format!("{}.json", flat.join("-"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build_matrix::{DeclarationCopy, MatrixBuilder};
    use crate::manifest::PackageManifest;
    use std::collections::HashSet;

    fn records() -> Vec<BuildConfigRecord> {
        let manifest = PackageManifest {
            name: "axios".to_string(),
            version: "1.2.3".to_string(),
            author: "Dev".to_string(),
            description: None,
        };
        MatrixBuilder::new(manifest).build_matrix().unwrap()
    }

    #[test]
    fn test_config_file_names_unique() {
        let records = records();
        let names: HashSet<String> = records.iter().map(config_file_name).collect();
        assert_eq!(names.len(), records.len());

        // browser UMD and browser ESM share a file name but not a path
        assert!(names.contains("dist-axios.js.json"));
        assert!(names.contains("dist-esm-axios.js.json"));
    }

    #[test]
    fn test_dry_run_writes_configs_only() {
        let dir = tempfile::tempdir().unwrap();
        let driver = BundlerDriver::new("rollup")
            .config_dir(dir.path())
            .dry_run(true);

        let records = records();
        driver.run_matrix(&records).unwrap();

        for record in &records {
            let config_path = dir.path().join(config_file_name(record));
            let raw = fs::read_to_string(config_path).unwrap();
            let parsed: serde_json::Value = serde_json::from_str(&raw).unwrap();
            assert_eq!(
                parsed["outputFile"].as_str().unwrap(),
                record.output_file.to_string_lossy()
            );
            // dry run never produces artifacts
            assert!(!record.output_file.exists());
        }
    }

    #[test]
    fn test_missing_bundler_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let driver =
            BundlerDriver::new("distkit-test-no-such-bundler").config_dir(dir.path());

        let err = driver.run(&records()[0]).unwrap_err();
        assert!(err.to_string().contains("Failed to invoke bundler"));
    }

    #[test]
    fn test_copy_declarations() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("index.d.ts");
        fs::write(&source, "export declare const VERSION: string;\n").unwrap();

        let mut record = records()[0].clone();
        record.declaration_copies = vec![DeclarationCopy {
            source,
            dest_dir: dir.path().join("dist/browser"),
            rename: "axios.d.ts".to_string(),
        }];

        let driver = BundlerDriver::new("rollup").config_dir(dir.path());
        driver.copy_declarations(&record).unwrap();

        let copied = dir.path().join("dist/browser/axios.d.ts");
        assert!(copied.exists());
        assert!(
            fs::read_to_string(copied)
                .unwrap()
                .contains("VERSION")
        );
    }

    #[test]
    fn test_copy_declarations_missing_source() {
        let dir = tempfile::tempdir().unwrap();

        let mut record = records()[0].clone();
        record.declaration_copies = vec![DeclarationCopy {
            source: dir.path().join("missing.d.ts"),
            dest_dir: dir.path().join("dist/generic"),
            rename: "axios.d.ts".to_string(),
        }];

        let driver = BundlerDriver::new("rollup").config_dir(dir.path());
        let err = driver.copy_declarations(&record).unwrap_err();
        assert!(err.to_string().contains("Failed to copy declarations"));
    }
}
