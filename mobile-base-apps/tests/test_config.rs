use std::path::Path;

use assert_approx_eq::assert_approx_eq;
use mobile_base_apps::{utils::resolve_config, Error, MobileBaseAppConfig};

#[test]
fn verify_sample_config() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("config/sample.toml");
    let config = MobileBaseAppConfig::new(&path).unwrap();
    assert_eq!(config, MobileBaseAppConfig::default());
    assert_eq!(resolve_config(Some(&path)).unwrap(), config);
}

#[test]
fn load_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("base.toml");
    std::fs::write(
        &path,
        r#"
endpoint = "http://[::1]:50099"
connect_timeout_sec = 0.5

[mobile_base]
max_rot_vel = 90.0
"#,
    )
    .unwrap();
    let config = MobileBaseAppConfig::new(&path).unwrap();
    assert_eq!(config.endpoint, "http://[::1]:50099");
    assert_eq!(config.connect_timeout().unwrap().as_millis(), 500);
    assert_approx_eq!(config.mobile_base.max_rot_vel, 90.0);

    std::fs::write(&path, "[mobile_base]\nmax_speed = 1.0\n").unwrap();
    match MobileBaseAppConfig::new(&path) {
        Err(Error::TomlParseFailure(p, _)) => assert_eq!(p, path),
        r => panic!("unexpected result {r:?}"),
    }
}
