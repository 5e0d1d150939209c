use anyhow::{Context, Result, anyhow};
use chrono::Datelike;
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::alias_mapping::{AliasEntry, AliasTable, PlatformProfile};
use crate::manifest::PackageManifest;

const SOURCEMAP_HOST: &str = "https://sourcemaps.elide.dev";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleFormat {
    Esm,
    Umd,
    Cjs,
}

impl ModuleFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModuleFormat::Esm => "esm",
            ModuleFormat::Umd => "umd",
            ModuleFormat::Cjs => "cjs",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportStyle {
    Default,
    Named,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Interop {
    #[serde(rename = "default")]
    Default,
    #[serde(rename = "esModule")]
    EsModule,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GeneratedCode {
    #[serde(rename = "es5")]
    Es5,
    #[serde(rename = "es2015")]
    Es2015,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TreeshakeProfile {
    // preserves potential module and property-read side effects
    Safe,
    // assumes no side effects anywhere; for size-sensitive embedded consumers
    Aggressive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MinifyPass {
    pub ecma: u16,
    pub passes: u8,
    pub pure_getters: bool,
    pub drop_debugger: bool,
    pub keep_license_comments: bool,
}

impl MinifyPass {
    pub fn standard() -> Self {
        Self {
            ecma: 5,
            passes: 1,
            pure_getters: false,
            drop_debugger: true,
            keep_license_comments: true,
        }
    }

    pub fn size_optimized() -> Self {
        Self {
            ecma: 2021,
            passes: 3,
            pure_getters: true,
            drop_debugger: true,
            keep_license_comments: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeclarationCopy {
    pub source: PathBuf,
    pub dest_dir: PathBuf,
    pub rename: String,
}

// One logical output artifact, before minified/plain expansion
#[derive(Debug, Clone, PartialEq)]
pub struct BuildTargetSpec {
    pub input: PathBuf,
    pub output: PathBuf,
    pub module_format: ModuleFormat,
    pub platform_profile: PlatformProfile,
    pub export_style: ExportStyle,
    pub transpile_to_legacy: bool,
    pub produce_minified: bool,
    pub emit_type_declarations: bool,
    pub umd_name: Option<String>,
}

// Materialized, bundler-ready configuration; regenerated fresh on every run
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildConfigRecord {
    pub input: PathBuf,
    pub output_file: PathBuf,
    pub module_format: ModuleFormat,
    pub export_style: ExportStyle,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub umd_name: Option<String>,
    pub platform_profile: PlatformProfile,
    pub sourcemap: bool,
    pub sourcemap_base_url: String,
    pub interop: Interop,
    pub generated_code: GeneratedCode,
    pub external_live_bindings: bool,
    pub prefer_const: bool,
    pub treeshake: TreeshakeProfile,
    pub aliases: Vec<AliasEntry>,
    pub banner: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minify: Option<MinifyPass>,
    pub transpile_to_legacy: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub declaration_copies: Vec<DeclarationCopy>,
}

pub struct MatrixBuilder {
    manifest: PackageManifest,
    year: i32,
}

impl MatrixBuilder {
    pub fn new(manifest: PackageManifest) -> Self {
        Self {
            manifest,
            year: chrono::Utc::now().year(),
        }
    }

    pub fn build_matrix(&self) -> Result<Vec<BuildConfigRecord>> {
        let mut records = Vec::new();

        for spec in self.target_specs() {
            let table = AliasTable::for_profile(spec.platform_profile);
            table.validate_complete().with_context(|| {
                format!("Cannot derive build config for {}", spec.output.display())
            })?;

            records.push(self.materialize(&spec, &table, false)?);
            if spec.produce_minified {
                records.push(self.materialize(&spec, &table, true)?);
            }
        }

        Ok(records)
    }

    // Fixed intent order; later intents never depend on earlier build output
    fn target_specs(&self) -> Vec<BuildTargetSpec> {
        let name = &self.manifest.name;
        let named_input = PathBuf::from("./index.js");
        let default_input = PathBuf::from(format!("./lib/{name}.js"));

        vec![
            // Pure ESM bundle for workers, embedded runtimes, Deno, etc.
            BuildTargetSpec {
                input: named_input.clone(),
                output: PathBuf::from(format!("dist/generic/{name}.mjs")),
                module_format: ModuleFormat::Esm,
                platform_profile: PlatformProfile::Generic,
                export_style: ExportStyle::Named,
                transpile_to_legacy: false,
                produce_minified: true,
                emit_type_declarations: true,
                umd_name: None,
            },
            // Browser ESM bundle for CDN
            BuildTargetSpec {
                input: named_input,
                output: PathBuf::from(format!("dist/esm/{name}.js")),
                module_format: ModuleFormat::Esm,
                platform_profile: PlatformProfile::Browser,
                export_style: ExportStyle::Named,
                transpile_to_legacy: false,
                produce_minified: false,
                emit_type_declarations: false,
                umd_name: None,
            },
            // Legacy-compatible browser UMD bundle for CDN
            BuildTargetSpec {
                input: default_input.clone(),
                output: PathBuf::from(format!("dist/{name}.js")),
                module_format: ModuleFormat::Umd,
                platform_profile: PlatformProfile::Browser,
                export_style: ExportStyle::Default,
                transpile_to_legacy: true,
                produce_minified: true,
                emit_type_declarations: false,
                umd_name: Some(name.clone()),
            },
            // Browser CJS bundle
            BuildTargetSpec {
                input: default_input.clone(),
                output: PathBuf::from(format!("dist/browser/{name}.cjs")),
                module_format: ModuleFormat::Cjs,
                platform_profile: PlatformProfile::Browser,
                export_style: ExportStyle::Default,
                transpile_to_legacy: false,
                produce_minified: false,
                emit_type_declarations: true,
                umd_name: Some(name.clone()),
            },
            // Node CJS bundle
            BuildTargetSpec {
                input: default_input,
                output: PathBuf::from(format!("dist/node/{name}.cjs")),
                module_format: ModuleFormat::Cjs,
                platform_profile: PlatformProfile::Node,
                export_style: ExportStyle::Default,
                transpile_to_legacy: false,
                produce_minified: false,
                emit_type_declarations: false,
                umd_name: None,
            },
        ]
    }

    fn materialize(
        &self,
        spec: &BuildTargetSpec,
        table: &AliasTable,
        minified: bool,
    ) -> Result<BuildConfigRecord> {
        let name = &self.manifest.name;
        let browser = spec.platform_profile == PlatformProfile::Browser;
        let generic = spec.platform_profile == PlatformProfile::Generic;
        let pure_esm = generic && spec.module_format == ModuleFormat::Esm;

        let output_file = if minified {
            minified_output_path(&spec.output)?
        } else {
            spec.output.clone()
        };

        let license = self.license_banner();
        let (banner, footer) = if pure_esm {
            // the generic bundle leads with a directive pointing at its typings
            (
                format!("/// <reference types=\"./{name}.d.ts\" />"),
                Some(license),
            )
        } else {
            (license, None)
        };

        let minify = minified.then(|| {
            if generic {
                MinifyPass::size_optimized()
            } else {
                MinifyPass::standard()
            }
        });

        Ok(BuildConfigRecord {
            input: spec.input.clone(),
            output_file,
            module_format: spec.module_format,
            export_style: spec.export_style,
            umd_name: spec.umd_name.clone(),
            platform_profile: spec.platform_profile,
            sourcemap: true,
            sourcemap_base_url: self.sourcemap_base_url(spec),
            interop: if browser {
                Interop::Default
            } else {
                Interop::EsModule
            },
            generated_code: if generic {
                GeneratedCode::Es2015
            } else {
                GeneratedCode::Es5
            },
            external_live_bindings: !generic,
            prefer_const: spec.module_format == ModuleFormat::Esm
                || spec.platform_profile == PlatformProfile::Node,
            treeshake: if generic {
                TreeshakeProfile::Aggressive
            } else {
                TreeshakeProfile::Safe
            },
            aliases: table.entries(),
            banner,
            footer,
            minify,
            transpile_to_legacy: spec.transpile_to_legacy,
            declaration_copies: self.declaration_copies(spec),
        })
    }

    fn license_banner(&self) -> String {
        format!(
            "// {} v{} Copyright (c) {} {} and contributors",
            display_name(&self.manifest.name),
            self.manifest.version,
            self.year,
            self.manifest.author
        )
    }

    fn sourcemap_base_url(&self, spec: &BuildTargetSpec) -> String {
        let subdir = match (spec.platform_profile, spec.module_format) {
            (PlatformProfile::Generic, _) => "generic/",
            (PlatformProfile::Browser, ModuleFormat::Esm) => "esm/",
            _ => "",
        };

        format!(
            "{}/{}/{}/{}",
            SOURCEMAP_HOST,
            self.manifest.name,
            self.manifest.version_or_latest(),
            subdir
        )
    }

    // copy typings so that they can be referenced from compatible JS targets
    fn declaration_copies(&self, spec: &BuildTargetSpec) -> Vec<DeclarationCopy> {
        if !spec.emit_type_declarations {
            return Vec::new();
        }

        let name = &self.manifest.name;
        match spec.platform_profile {
            PlatformProfile::Browser => vec![
                DeclarationCopy {
                    source: PathBuf::from("./index.d.ts"),
                    dest_dir: PathBuf::from("dist/browser"),
                    rename: format!("{name}.d.ts"),
                },
                DeclarationCopy {
                    source: PathBuf::from("./index.d.cts"),
                    dest_dir: PathBuf::from("dist/browser"),
                    rename: format!("{name}.d.cts"),
                },
            ],
            _ => vec![DeclarationCopy {
                source: PathBuf::from("./index.generic.d.ts"),
                dest_dir: PathBuf::from("dist/generic"),
                rename: format!("{name}.d.ts"),
            }],
        }
    }
}

// `axios.mjs` -> `axios.min.mjs`: splice `min` between the stem and the
// final extension segment. Downstream CDN links depend on this exact shape.
pub fn minified_output_path(path: &Path) -> Result<PathBuf> {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| anyhow!("Output path has no file name: {}", path.display()))?;

    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .ok_or_else(|| anyhow!("Output path has no extension: {}", path.display()))?;

    let file = format!("{stem}.min.{ext}");
    Ok(match path.parent() {
        Some(parent) => parent.join(file),
        None => PathBuf::from(file),
    })
}

fn display_name(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
