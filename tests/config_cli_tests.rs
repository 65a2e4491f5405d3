mod common;

use std::fs;
use std::process::Command;

use common::*;
use jitdeploy::config::{MAX_CLASS_FILE_MAJOR, MIN_CLASS_FILE_MAJOR};
use jitdeploy::{Config, Error};

fn jitdeploy() -> Command {
    Command::new(env!("CARGO_BIN_EXE_jitdeploy"))
}

#[test]
fn config_loads_from_toml_file() {
    init_logger();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("jitdeploy.toml");
    fs::write(&path, "class_file_major = 46\nname_compat = true\ndump_dir = \"out\"\n").unwrap();

    let config = ok(Config::load(&path));
    assert_eq!(config.class_file_major, 46);
    assert!(config.name_compat);
    assert_eq!(config.dump_dir.as_deref(), Some(std::path::Path::new("out")));
    assert!(config.verify_output);
    assert!(!config.declared_remote_are_application_exceptions);
}

#[test]
fn config_rejects_versions_outside_the_frameless_range() {
    init_logger();
    for major in [MIN_CLASS_FILE_MAJOR - 1, MAX_CLASS_FILE_MAJOR + 1, 52] {
        let err = Config::from_toml_str(&format!("class_file_major = {major}\n")).unwrap_err();
        assert!(matches!(err, Error::Config { .. }), "{err}");
    }
    let err = Config::from_toml_str("name_compat = \"yes\"\n").unwrap_err();
    assert!(matches!(err, Error::Config { .. }), "{err}");
}

#[test]
fn missing_config_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = Config::load(dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, Error::Io(_)), "{err}");
}

#[test]
fn invalid_config_stops_synthesis() {
    init_logger();
    let config = Config::default().with_class_file_major(50);
    let err = err_contains(jitdeploy::synthesize(&account_remote_request(), &config), "class_file_major");
    assert!(!err.is_configuration());
}

#[test]
fn cli_generates_class_files_into_package_directories() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("account.json");
    fs::write(&input, serde_json::to_string_pretty(&account_remote_request()).unwrap()).unwrap();
    let out = dir.path().join("classes");

    let status = jitdeploy().arg("generate").arg(&input).arg("-o").arg(&out).status().unwrap();
    assert!(status.success());
    for name in ["Account_RemoteWrapper", "_Account_Stub", "_Account_Tie"] {
        let bytes = fs::read(out.join("acme").join(format!("{name}.class"))).unwrap();
        assert_eq!(&bytes[..4], &[0xCA, 0xFE, 0xBA, 0xBE]);
    }
}

#[test]
fn cli_reports_rejected_requests() {
    let dir = tempfile::tempdir().unwrap();
    let request = account_remote_request().with_interface(account_remote_interface());
    let input = dir.path().join("twice.json");
    fs::write(&input, serde_json::to_string(&request).unwrap()).unwrap();

    let output = jitdeploy().arg("generate").arg(&input).arg("-o").arg(dir.path()).output().unwrap();
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("aggregate"), "{stderr}");
}

#[test]
fn cli_prints_wire_names() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("account.json");
    fs::write(&input, serde_json::to_string(&account_remote_request()).unwrap()).unwrap();

    let output = jitdeploy().arg("names").arg(&input).output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("acme.Account\n"), "{stdout}");
    assert!(stdout.contains("-> deposit"), "{stdout}");
    assert!(stdout.contains("-> balance"), "{stdout}");
}
