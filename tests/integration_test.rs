// tests/integration_test.rs
use std::process::Command;

fn scm_version() -> Command {
    Command::new(env!("CARGO_BIN_EXE_scm-version"))
}

#[test]
fn test_scm_version_help() {
    let output = scm_version()
        .arg("--help")
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("scm-version"));
    assert!(stdout.contains("Calculate project versions"));
    assert!(stdout.contains("changelog"));
    assert!(stdout.contains("to-version"));
}

#[test]
fn test_scm_version_version() {
    let output = scm_version()
        .arg("--version")
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_show_in_plain_directory() {
    let dir = tempfile::tempdir().unwrap();
    let output = scm_version()
        .args(["--path", dir.path().to_str().unwrap(), "show"])
        .env_remove("INCREMENT")
        .env_remove("CONTINUOUSRELEASE")
        .env_remove("SCMVERSIONEXT")
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert_eq!(stdout.trim(), "0.0.0-SNAPSHOT");
}

#[test]
fn test_invalid_config_fails() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("scmversion.toml"),
        "[version]\nversion_type = \"fiveDigits\"\n",
    )
    .unwrap();

    let output = scm_version()
        .args(["--path", dir.path().to_str().unwrap()])
        .output()
        .expect("Failed to execute command");

    assert!(!output.status.success());
}
