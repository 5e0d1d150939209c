use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::alias_mapping::{AliasTable, PlatformProfile};
use crate::build_matrix::MatrixBuilder;
use crate::bundler_integration::BundlerDriver;
use crate::manifest::PackageManifest;
use crate::version_check::VersionCheck;

#[derive(Parser)]
#[command(name = "distkit")]
#[command(
    about = "A tiny, predictable bundler driver that ships one library as its full dist/ target matrix"
)]
#[command(version = "0.1.0")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Derive the build matrix and print it without bundling anything
    Matrix {
        /// Path to package.json
        #[arg(long, default_value = "package.json")]
        manifest_path: PathBuf,

        /// Print the full bundler-ready configuration records as JSON
        #[arg(long)]
        json: bool,
    },

    /// Derive the build matrix and run the external bundler over it
    Build {
        /// Path to package.json
        #[arg(long, default_value = "package.json")]
        manifest_path: PathBuf,

        /// Bundler executable, invoked once per configuration record
        #[arg(long, default_value = "rollup")]
        bundler: String,

        /// Write the configuration files and print the plan without bundling
        #[arg(long)]
        dry_run: bool,
    },

    /// Check that package, source and built artifact agree on the version
    Verify {
        /// Path to package.json
        #[arg(long, default_value = "package.json")]
        manifest_path: PathBuf,

        /// Source entry carrying the VERSION constant (default: lib/env/data.js)
        #[arg(long)]
        source: Option<PathBuf>,

        /// Built Node CJS artifact (default: dist/node/<name>.cjs)
        #[arg(long)]
        artifact: Option<PathBuf>,
    },

    /// Check release tooling requirements and print the alias tables
    Doctor,
}

pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Matrix {
            manifest_path,
            json,
        } => matrix_command(manifest_path, json),
        Commands::Build {
            manifest_path,
            bundler,
            dry_run,
        } => build_command(manifest_path, bundler, dry_run),
        Commands::Verify {
            manifest_path,
            source,
            artifact,
        } => verify_command(manifest_path, source, artifact),
        Commands::Doctor => doctor_command(),
    }
}

fn matrix_command(manifest_path: PathBuf, json: bool) -> Result<()> {
    let manifest = PackageManifest::load(&manifest_path)?;
    let records = MatrixBuilder::new(manifest)
        .build_matrix()
        .context("Failed to derive build matrix")?;

    if json {
        let rendered = serde_json::to_string_pretty(&records)
            .context("Failed to serialize build matrix")?;
        println!("{rendered}");
        return Ok(());
    }

    println!("Build matrix ({} records):", records.len());
    for record in &records {
        println!(
            "  {} [{}/{}]{} -> {}",
            record.input.display(),
            record.module_format.as_str(),
            record.platform_profile.as_str(),
            if record.minify.is_some() { " min" } else { "" },
            record.output_file.display()
        );
    }

    Ok(())
}

fn build_command(manifest_path: PathBuf, bundler: String, dry_run: bool) -> Result<()> {
    let manifest = PackageManifest::load(&manifest_path)?;

    println!(
        "Deriving build matrix for {} v{}",
        manifest.name, manifest.version
    );

    let records = MatrixBuilder::new(manifest)
        .build_matrix()
        .context("Failed to derive build matrix")?;

    println!("Derived {} build configurations", records.len());

    let driver = BundlerDriver::new(bundler).dry_run(dry_run);
    driver
        .run_matrix(&records)
        .context("Build matrix failed")?;

    if dry_run {
        println!("Dry run complete ({} configurations written)", records.len());
    } else {
        println!("✓ Bundled {} artifacts", records.len());
    }

    Ok(())
}

fn verify_command(
    manifest_path: PathBuf,
    source: Option<PathBuf>,
    artifact: Option<PathBuf>,
) -> Result<()> {
    let mut check = VersionCheck::new(manifest_path);

    if let Some(source) = source {
        check = check.source_path(source);
    }
    if let Some(artifact) = artifact {
        check = check.artifact_path(artifact);
    }

    check.run()?;

    Ok(())
}

fn doctor_command() -> Result<()> {
    println!("Distkit Doctor - Checking release tooling...\n");

    check_command_available("node", "Node.js runtime")?;

    match which::which("rollup") {
        Ok(path) => println!("✓ rollup found at: {}", path.display()),
        Err(_) => {
            println!("✗ rollup not found");
            println!("  Install with: npm install --global rollup");
        }
    }

    println!("\nAlias tables:");
    for profile in [
        PlatformProfile::Generic,
        PlatformProfile::Browser,
        PlatformProfile::Node,
    ] {
        let table = AliasTable::for_profile(profile);
        println!("  {} profile:", profile.as_str());
        for entry in table.entries() {
            println!("    {} -> {}", entry.find, entry.replacement);
        }
    }

    println!("\n✓ Distkit doctor check complete");

    Ok(())
}

fn check_command_available(command: &str, description: &str) -> Result<()> {
    match which::which(command) {
        Ok(path) => {
            println!("✓ {} found at: {}", description, path.display());
            Ok(())
        }
        Err(_) => {
            println!("✗ {} not found ({})", description, command);
            Err(anyhow::anyhow!(
                "{} is required but not found in PATH",
                description
            ))
        }
    }
}
