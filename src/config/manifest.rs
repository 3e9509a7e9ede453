use std::path::{Path, PathBuf};
use thiserror::Error;

const SEPARATORS: &[char] = &['=', ':', '\t'];

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to read manifest {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{origin}:{line}: {reason}")]
    Malformed {
        origin: String,
        line: usize,
        reason: &'static str,
    },
}

/// Sectioned `key=value` manifest. Keys may repeat inside a section and
/// both sections and entries keep their file order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigFile {
    sections: Vec<Section>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Section {
    pub name: String,
    pub entries: Vec<(String, String)>,
}

impl ConfigFile {
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let text = std::fs::read_to_string(path).map_err(|source| ManifestError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text, &path.display().to_string())
    }

    pub fn parse(text: &str, origin: &str) -> Result<Self, ManifestError> {
        let mut file = ConfigFile::default();
        let mut current = Section::default();

        for (number, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }

            if line.starts_with('[') {
                if !line.ends_with(']') || line.len() < 2 {
                    return Err(ManifestError::Malformed {
                        origin: origin.to_string(),
                        line: number + 1,
                        reason: "unterminated section header",
                    });
                }
                file.push_section(std::mem::take(&mut current));
                current.name = line[1..line.len() - 1].trim().to_string();
                continue;
            }

            let Some(split) = line.find(SEPARATORS) else {
                return Err(ManifestError::Malformed {
                    origin: origin.to_string(),
                    line: number + 1,
                    reason: "entry has no separator",
                });
            };
            let key = line[..split].trim();
            let value = line[split + 1..]
                .trim_start()
                .trim_start_matches(SEPARATORS)
                .trim();
            if key.is_empty() {
                return Err(ManifestError::Malformed {
                    origin: origin.to_string(),
                    line: number + 1,
                    reason: "entry has an empty key",
                });
            }
            current.entries.push((key.to_string(), value.to_string()));
        }

        file.push_section(current);
        Ok(file)
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections.iter().find(|section| section.name == name)
    }

    /// Every value stored under `key` in `section`, in file order.
    pub fn values<'a>(&'a self, section: &str, key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.section(section)
            .into_iter()
            .flat_map(|section| section.entries.iter())
            .filter(move |(entry_key, _)| entry_key == key)
            .map(|(_, value)| value.as_str())
    }

    pub fn resource_locations(&self) -> Vec<ResourceLocation> {
        self.sections
            .iter()
            .flat_map(|section| {
                section.entries.iter().map(|(kind, location)| ResourceLocation {
                    location: location.clone(),
                    kind: kind.clone(),
                    group: section.name.clone(),
                })
            })
            .collect()
    }

    // Repeated headers merge into the first section with that name.
    fn push_section(&mut self, section: Section) {
        if section.name.is_empty() && section.entries.is_empty() {
            return;
        }
        match self
            .sections
            .iter_mut()
            .find(|existing| existing.name == section.name)
        {
            Some(existing) => existing.entries.extend(section.entries),
            None => self.sections.push(section),
        }
    }
}

/// One `(location, type, group)` triple declared by the resource manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceLocation {
    pub location: String,
    pub kind: String,
    pub group: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PluginManifest {
    pub folder: Option<PathBuf>,
    pub plugins: Vec<String>,
}

impl PluginManifest {
    pub fn from_config(file: &ConfigFile) -> Self {
        Self {
            folder: file.values("", "PluginFolder").next().map(PathBuf::from),
            plugins: file.values("", "Plugin").map(str::to_string).collect(),
        }
    }

    /// Loads the plugin manifest. A missing file disables automatic plugin
    /// loading instead of failing; a malformed one is still an error.
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        match ConfigFile::load(path) {
            Ok(file) => Ok(Self::from_config(&file)),
            Err(ManifestError::Read { source, .. })
                if source.kind() == std::io::ErrorKind::NotFound =>
            {
                log::warn!(
                    "[engine] plugin manifest {} not found, automatic plugin loading disabled",
                    path.display()
                );
                Ok(Self::default())
            }
            Err(err) => Err(err),
        }
    }

    pub fn render_systems(&self) -> impl Iterator<Item = &str> {
        self.plugins
            .iter()
            .map(String::as_str)
            .filter(|plugin| plugin.starts_with("RenderSystem_"))
    }
}
