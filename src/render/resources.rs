use std::cell::RefCell;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("unknown archive type `{kind}` for location {location}")]
    UnknownArchiveType { kind: String, location: String },
    #[error("resource location {location} ({kind}) does not exist")]
    MissingLocation { kind: String, location: String },
    #[error("failed to index {path}: {source}")]
    Index {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    FileSystem,
    Zip,
}

impl ArchiveKind {
    pub fn parse(kind: &str) -> Option<Self> {
        match kind {
            "FileSystem" => Some(ArchiveKind::FileSystem),
            "Zip" => Some(ArchiveKind::Zip),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct RegisteredLocation {
    location: String,
    kind: String,
}

#[derive(Debug, Default)]
struct ResourceGroup {
    name: String,
    locations: Vec<RegisteredLocation>,
    resources: BTreeSet<String>,
    initialised: bool,
}

/// Resource groups and the archive locations backing them.
#[derive(Debug, Default)]
pub struct ResourceGroupRegistry {
    groups: Vec<ResourceGroup>,
}

impl ResourceGroupRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_resource_location(&mut self, location: &str, kind: &str, group: &str) {
        let entry = RegisteredLocation {
            location: location.to_string(),
            kind: kind.to_string(),
        };
        let group = self.group_or_create(group);
        if group.locations.contains(&entry) {
            return;
        }
        log::debug!(
            "[render] added resource location '{}' of type '{}' to group '{}'",
            entry.location,
            entry.kind,
            group.name
        );
        group.locations.push(entry);
        group.initialised = false;
    }

    /// Indexes every location of every group that has not been initialised yet.
    pub fn initialise_all_groups(&mut self) -> Result<(), ResourceError> {
        for group in self.groups.iter_mut().filter(|group| !group.initialised) {
            let mut resources = BTreeSet::new();
            for location in &group.locations {
                index_location(location, &mut resources)?;
            }
            log::info!(
                "[render] initialised resource group '{}' ({} resources)",
                group.name,
                resources.len()
            );
            group.resources = resources;
            group.initialised = true;
        }
        Ok(())
    }

    pub fn groups(&self) -> Vec<&str> {
        self.groups.iter().map(|group| group.name.as_str()).collect()
    }

    pub fn locations(&self, group: &str) -> Vec<(&str, &str)> {
        self.group(group)
            .map(|group| {
                group
                    .locations
                    .iter()
                    .map(|entry| (entry.location.as_str(), entry.kind.as_str()))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn resources(&self, group: &str) -> Vec<&str> {
        self.group(group)
            .map(|group| group.resources.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    pub fn is_initialised(&self, group: &str) -> bool {
        self.group(group).is_some_and(|group| group.initialised)
    }

    pub fn clear(&mut self) {
        self.groups.clear();
    }

    fn group(&self, name: &str) -> Option<&ResourceGroup> {
        self.groups.iter().find(|group| group.name == name)
    }

    fn group_or_create(&mut self, name: &str) -> &mut ResourceGroup {
        if let Some(index) = self.groups.iter().position(|group| group.name == name) {
            return &mut self.groups[index];
        }
        self.groups.push(ResourceGroup {
            name: name.to_string(),
            ..ResourceGroup::default()
        });
        let last = self.groups.len() - 1;
        &mut self.groups[last]
    }
}

fn index_location(
    location: &RegisteredLocation,
    resources: &mut BTreeSet<String>,
) -> Result<(), ResourceError> {
    let path = Path::new(&location.location);
    match ArchiveKind::parse(&location.kind) {
        None => Err(ResourceError::UnknownArchiveType {
            kind: location.kind.clone(),
            location: location.location.clone(),
        }),
        Some(ArchiveKind::Zip) => {
            if !path.is_file() {
                return Err(missing(location));
            }
            resources.insert(location.location.clone());
            Ok(())
        }
        Some(ArchiveKind::FileSystem) => {
            if !path.is_dir() {
                return Err(missing(location));
            }
            let entries = std::fs::read_dir(path).map_err(|source| ResourceError::Index {
                path: path.to_path_buf(),
                source,
            })?;
            for entry in entries {
                let entry = entry.map_err(|source| ResourceError::Index {
                    path: path.to_path_buf(),
                    source,
                })?;
                if entry.path().is_file() {
                    resources.insert(entry.file_name().to_string_lossy().into_owned());
                }
            }
            Ok(())
        }
    }
}

fn missing(location: &RegisteredLocation) -> ResourceError {
    ResourceError::MissingLocation {
        kind: location.kind.clone(),
        location: location.location.clone(),
    }
}

#[derive(Debug, Default)]
pub struct TextureManager {
    default_num_mipmaps: u32,
}

impl TextureManager {
    /// Mip-map count for textures created without an explicit one. Some
    /// render systems ignore it.
    pub fn set_default_num_mipmaps(&mut self, count: u32) {
        self.default_num_mipmaps = count;
    }

    pub fn default_num_mipmaps(&self) -> u32 {
        self.default_num_mipmaps
    }
}

/// Process-wide render registries, handed to the engine instead of being
/// reached through globals.
#[derive(Clone, Default)]
pub struct RenderServices {
    pub resources: Rc<RefCell<ResourceGroupRegistry>>,
    pub textures: Rc<RefCell<TextureManager>>,
}

impl RenderServices {
    pub fn new() -> Self {
        Self::default()
    }
}
