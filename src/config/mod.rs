pub mod manifest;

pub use manifest::{ConfigFile, ManifestError, PluginManifest, ResourceLocation};

use crate::render::Colour;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read engine config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse engine config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Manifest file names, which differ between debug and release builds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestPaths {
    pub plugins: PathBuf,
    pub resources: PathBuf,
}

impl ManifestPaths {
    pub fn debug() -> Self {
        Self {
            plugins: PathBuf::from("plugins_d.cfg"),
            resources: PathBuf::from("resources_d.cfg"),
        }
    }

    pub fn release() -> Self {
        Self {
            plugins: PathBuf::from("plugins.cfg"),
            resources: PathBuf::from("resources.cfg"),
        }
    }

    pub fn for_build() -> Self {
        if cfg!(debug_assertions) {
            Self::debug()
        } else {
            Self::release()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub window_title: String,
    pub plugins_manifest: PathBuf,
    pub resources_manifest: PathBuf,
    pub display_config: PathBuf,
    pub default_mipmaps: u32,
    pub ambient_light: Colour,
    pub scene_manager_type: String,
    pub log_filter: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let manifests = ManifestPaths::for_build();
        Self {
            window_title: "Thrive".to_string(),
            plugins_manifest: manifests.plugins,
            resources_manifest: manifests.resources,
            display_config: PathBuf::from("display.json"),
            default_mipmaps: 5,
            ambient_light: Colour::grey(0.5),
            scene_manager_type: "DefaultSceneManager".to_string(),
            log_filter: "info".to_string(),
        }
    }
}

impl EngineConfig {
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let bytes = std::fs::read(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_slice(&bytes).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Resolves both manifest paths against `dir`, leaving absolute paths alone.
    pub fn with_manifest_dir(mut self, dir: &Path) -> Self {
        self.plugins_manifest = dir.join(&self.plugins_manifest);
        self.resources_manifest = dir.join(&self.resources_manifest);
        self
    }
}
