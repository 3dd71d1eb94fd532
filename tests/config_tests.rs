// SPDX-License-Identifier: MPL-2.0

//! Integration tests for configuration module

use photobooth::{CameraSource, Config};

#[test]
fn test_config_default() {
    let config = Config::default();

    assert!(
        config.mirror_preview,
        "Mirror preview should be enabled by default"
    );
    assert!(!config.hardware_flash, "Hardware flash should be opt-in");
    assert_eq!(config.camera, CameraSource::Auto);
}

#[test]
fn test_default_record_lives_under_photobooth_dir() {
    let config = Config::default();
    assert!(config.record_path.ends_with("photobooth/session.json"));
}

#[test]
fn test_missing_config_file_gives_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::load_from(&dir.path().join("absent.json")).unwrap();
    assert_eq!(config, Config::default());
}

#[test]
fn test_camera_source_round_trips_through_json() {
    let config = Config {
        camera: CameraSource::StillImage("/srv/booth/backdrop.jpg".into()),
        ..Config::default()
    };
    let json = serde_json::to_string(&config).unwrap();
    assert!(json.contains(r#""still_image":"/srv/booth/backdrop.jpg""#));

    let parsed: Config = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed.camera, config.camera);
}
