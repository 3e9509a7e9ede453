use std::fs;
use std::path::PathBuf;
use thrive_engine::EngineConfig;
use thrive_engine::config::{ConfigError, ConfigFile, ManifestError, PluginManifest};

#[test]
fn engine_config_json_resolves_manifests_next_to_it() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("thrive.json");
    fs::write(
        &path,
        r#"{
            "window_title": "Thrive (test)",
            "plugins_manifest": "plugins.cfg",
            "resources_manifest": "resources.cfg",
            "default_mipmaps": 3
        }"#,
    )
    .unwrap();

    let config = EngineConfig::from_json_file(&path)
        .unwrap()
        .with_manifest_dir(dir.path());

    assert_eq!(config.window_title, "Thrive (test)");
    assert_eq!(config.default_mipmaps, 3);
    assert_eq!(config.plugins_manifest, dir.path().join("plugins.cfg"));
    assert_eq!(config.resources_manifest, dir.path().join("resources.cfg"));
    assert_eq!(config.scene_manager_type, "DefaultSceneManager");
}

#[test]
fn broken_engine_config_reports_its_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("thrive.json");
    fs::write(&path, "{ not json").unwrap();

    match EngineConfig::from_json_file(&path) {
        Err(ConfigError::Parse { path: reported, .. }) => assert_eq!(reported, path),
        other => panic!("expected parse error, got {other:?}"),
    }
}

#[test]
fn resource_manifest_lists_every_location_in_file_order() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("resources.cfg");
    fs::write(
        &path,
        "# Resource locations to be added to the default path\n\
         [Bootstrap]\n\
         Zip=media/packs/OgreCore.zip\n\
         \n\
         [General]\n\
         FileSystem=media\n\
         FileSystem=media/models\n\
         Zip=media/packs/skybox.zip\n",
    )
    .unwrap();

    let manifest = ConfigFile::load(&path).unwrap();
    let locations: Vec<(String, String, String)> = manifest
        .resource_locations()
        .into_iter()
        .map(|entry| (entry.group, entry.kind, entry.location))
        .collect();

    assert_eq!(
        locations,
        vec![
            ("Bootstrap".into(), "Zip".into(), "media/packs/OgreCore.zip".into()),
            ("General".into(), "FileSystem".into(), "media".into()),
            ("General".into(), "FileSystem".into(), "media/models".into()),
            ("General".into(), "Zip".into(), "media/packs/skybox.zip".into()),
        ]
    );
}

#[test]
fn missing_plugin_manifest_loads_as_empty() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = PluginManifest::load(&dir.path().join("plugins_d.cfg")).unwrap();
    assert_eq!(manifest, PluginManifest::default());
}

#[test]
fn malformed_plugin_manifest_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("plugins.cfg");
    fs::write(&path, "PluginFolder=.\n[Broken\nPlugin=RenderSystem_GL\n").unwrap();

    match PluginManifest::load(&path) {
        Err(ManifestError::Malformed { line, .. }) => assert_eq!(line, 2),
        other => panic!("expected malformed manifest, got {other:?}"),
    }

    fs::write(&path, "PluginFolder=plugins\nPlugin=RenderSystem_GL\n").unwrap();
    let manifest = PluginManifest::load(&path).unwrap();
    assert_eq!(manifest.folder, Some(PathBuf::from("plugins")));
    assert_eq!(manifest.render_systems().collect::<Vec<_>>(), vec!["RenderSystem_GL"]);
}
