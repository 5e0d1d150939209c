use anyhow::{Result, anyhow};
use serde::Serialize;
use std::collections::BTreeMap;

// Adapter stub substituted wherever a transport is unavailable on a profile
const NULL_ADAPTER: &str = "../helpers/null.js";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformProfile {
    Generic,
    Browser,
    Node,
}

impl PlatformProfile {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlatformProfile::Generic => "generic",
            PlatformProfile::Browser => "browser",
            PlatformProfile::Node => "node",
        }
    }

    // directory under `lib/platform/` holding this profile's implementations
    fn platform_dir(&self) -> &'static str {
        self.as_str()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogicalModule {
    Platform,
    AbortController,
    FormData,
    FetchApi,
    HttpAdapter,
    XhrAdapter,
    Stream,
}

impl LogicalModule {
    // Every logical id the library source references through an alias.
    // `Stream` is an optional substitution, not a required binding.
    pub const REQUIRED: [LogicalModule; 6] = [
        LogicalModule::Platform,
        LogicalModule::AbortController,
        LogicalModule::FormData,
        LogicalModule::FetchApi,
        LogicalModule::HttpAdapter,
        LogicalModule::XhrAdapter,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            LogicalModule::Platform => "#platform",
            LogicalModule::AbortController => "#abortController",
            LogicalModule::FormData => "#formData",
            LogicalModule::FetchApi => "#fetchApi",
            LogicalModule::HttpAdapter => "#httpAdapter",
            LogicalModule::XhrAdapter => "#xhrAdapter",
            LogicalModule::Stream => "stream",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AliasEntry {
    pub find: String,
    pub replacement: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AliasTable {
    profile: PlatformProfile,
    entries: BTreeMap<LogicalModule, String>,
}

impl AliasTable {
    pub fn for_profile(profile: PlatformProfile) -> Self {
        let dir = profile.platform_dir();
        let mut entries = BTreeMap::new();

        // relative to `lib/platform/`
        entries.insert(LogicalModule::Platform, format!("./{dir}/index.js"));

        // class shims expected to exist on every profile
        entries.insert(
            LogicalModule::AbortController,
            format!("../platform/{dir}/classes/AbortController.js"),
        );
        entries.insert(
            LogicalModule::FormData,
            format!("../platform/{dir}/classes/FormData.js"),
        );
        entries.insert(
            LogicalModule::FetchApi,
            format!("../platform/{dir}/classes/FetchAPI.js"),
        );

        // the HTTP transport only exists on Node
        entries.insert(
            LogicalModule::HttpAdapter,
            match profile {
                PlatformProfile::Node => "./http.js".to_string(),
                _ => NULL_ADAPTER.to_string(),
            },
        );

        // the XHR transport only exists in browsers
        entries.insert(
            LogicalModule::XhrAdapter,
            match profile {
                PlatformProfile::Browser => "./xhr.js".to_string(),
                _ => NULL_ADAPTER.to_string(),
            },
        );

        // substitute the native `stream` module with a userland polyfill
        // everywhere it is not available
        if profile != PlatformProfile::Node {
            entries.insert(LogicalModule::Stream, "readable-stream".to_string());
        }

        Self { profile, entries }
    }

    pub fn profile(&self) -> PlatformProfile {
        self.profile
    }

    pub fn get(&self, module: LogicalModule) -> Option<&str> {
        self.entries.get(&module).map(|s| s.as_str())
    }

    pub fn resolve(&self, module: LogicalModule) -> Result<&str> {
        self.get(module).ok_or_else(|| {
            anyhow!(
                "No alias mapping for `{}` in the {} profile",
                module.id(),
                self.profile.as_str()
            )
        })
    }

    pub fn validate_complete(&self) -> Result<()> {
        for module in LogicalModule::REQUIRED {
            self.resolve(module)?;
        }
        Ok(())
    }

    pub fn entries(&self) -> Vec<AliasEntry> {
        self.entries
            .iter()
            .map(|(module, replacement)| AliasEntry {
                find: module.id().to_string(),
                replacement: replacement.clone(),
            })
            .collect()
    }
}
