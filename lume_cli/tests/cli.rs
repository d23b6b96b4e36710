use std::{
    path::{Path, PathBuf},
    process::{Command, Output},
};

use tempfile::tempdir;

fn run_cli(config: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_lume"))
        .arg("--config")
        .arg(config)
        .args(args)
        .output()
        .expect("failed to execute process")
}

fn stdout_of(output: Output) -> String {
    if !output.status.success() {
        panic!(
            "command failed: {}",
            String::from_utf8_lossy(&output.stderr)
        );
    }
    String::from_utf8(output.stdout).unwrap()
}

fn init(dir: &Path) -> PathBuf {
    let config = dir.join("registry.toml");
    stdout_of(run_cli(&config, &["config", "init"]));
    config
}

#[test]
fn config_init_writes_config_and_key() {
    let dir = tempdir().unwrap();
    let config = init(dir.path());

    let contents = std::fs::read_to_string(&config).unwrap();
    assert!(contents.contains("secret_key_file = \"registry.secretkey\""));
    assert!(contents.contains("type = \"redb\""));
    assert!(contents.contains("key_format = \"raw\""));
    assert_eq!(
        std::fs::read(dir.path().join("registry.secretkey"))
            .unwrap()
            .len(),
        32
    );

    // Running init again keeps existing settings and the existing key.
    let key_before = std::fs::read(dir.path().join("registry.secretkey")).unwrap();
    init(dir.path());
    let key_after = std::fs::read(dir.path().join("registry.secretkey")).unwrap();
    assert_eq!(key_before, key_after);
}

#[test]
fn sign_apply_get_round() {
    let dir = tempdir().unwrap();
    let config = init(dir.path());
    let key_file = dir.path().join("owner.key");
    let key_file_str = key_file.to_str().unwrap();

    let public_key = stdout_of(run_cli(&config, &["keygen", "--out", key_file_str]));
    let public_key = public_key.trim();
    assert_eq!(public_key.len(), 64);

    // A second keygen into the same file is refused.
    assert!(!run_cli(&config, &["keygen", "--out", key_file_str]).status.success());

    let sign = |revision: &str, data: &str| {
        let frame = stdout_of(run_cli(
            &config,
            &[
                "sign",
                "--key",
                key_file_str,
                "--revision",
                revision,
                "--data",
                data,
            ],
        ));
        frame.trim().to_owned()
    };

    let frame = sign("1", "cafe");
    assert!(frame.starts_with("00"));

    let inspected = stdout_of(run_cli(&config, &["inspect", &frame]));
    assert!(inspected.contains("Create"));
    assert!(inspected.contains("revision:   1"));
    assert!(inspected.contains("status:     valid"));

    let applied = stdout_of(run_cli(&config, &["apply", &frame]));
    assert!(applied.contains("create: Accepted"));
    assert!(applied.contains("broadcast 01"));

    let applied = stdout_of(run_cli(&config, &["apply", &sign("1", "beef")]));
    assert!(applied.contains("create: Kept"));

    let stored = stdout_of(run_cli(&config, &["get", public_key]));
    assert!(stored.contains("data:       cafe"));

    let missing = run_cli(&config, &["get", &"ab".repeat(32)]);
    assert!(!missing.status.success());
}

#[test]
fn sign_rejects_oversized_data() {
    let dir = tempdir().unwrap();
    let config = init(dir.path());
    let key_file = dir.path().join("registry.secretkey");

    let output = run_cli(
        &config,
        &[
            "sign",
            "--key",
            key_file.to_str().unwrap(),
            "--revision",
            "1",
            "--data",
            &"00".repeat(49),
        ],
    );
    assert!(!output.status.success());
}

#[test]
fn apply_drops_foreign_payloads() {
    let dir = tempdir().unwrap();
    let config = init(dir.path());

    let applied = stdout_of(run_cli(&config, &["apply", "7f0102"]));
    assert!(applied.contains("dropped"));
}
