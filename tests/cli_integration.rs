//! Testes de integração para a CLI do resultcache.

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn resultcache_bin() -> Command {
    Command::cargo_bin("resultcache").expect("binary should be built")
}

/// Cria uma configuração apontando o snapshot para dentro do diretório temporário.
fn write_config(dir: &Path, capacity: usize, backend: &str) -> std::path::PathBuf {
    let config_path = dir.join("resultcache.toml");
    let snapshot = dir.join(".resultcache").join(format!("cache.{}", backend));
    let content = format!(
        "[cache]\ncapacity = {}\nbackend = \"{}\"\nsnapshot_path = {:?}\n",
        capacity,
        backend,
        snapshot.display().to_string()
    );
    fs::write(&config_path, content).expect("Failed to write config");
    config_path
}

#[test]
fn test_version_command() {
    resultcache_bin()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("resultcache"));
}

#[test]
fn test_help_command() {
    resultcache_bin()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("init"))
        .stdout(predicate::str::contains("put"))
        .stdout(predicate::str::contains("get"))
        .stdout(predicate::str::contains("show"));
}

#[test]
fn test_invalid_command() {
    resultcache_bin()
        .arg("invalid-command-that-does-not-exist")
        .assert()
        .failure();
}

#[test]
fn test_verbose_and_quiet_flags() {
    resultcache_bin().arg("-v").arg("version").assert().success();
    resultcache_bin().arg("-q").arg("version").assert().success();
}

#[test]
fn test_fingerprint_command() {
    resultcache_bin()
        .arg("fingerprint")
        .arg("hello")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "5aa762ae383fbb727af3c7a36d4940a5b8c40a989452d2304fc958ff3f354e7a",
        ));
}

#[test]
fn test_init_creates_config() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");

    resultcache_bin()
        .arg("init")
        .arg("--path")
        .arg(temp_dir.path())
        .assert()
        .success();

    let content = fs::read_to_string(temp_dir.path().join("resultcache.toml"))
        .expect("Failed to read config");
    assert!(content.contains("[general]"));
    assert!(content.contains("[cache]"));
    assert!(temp_dir.path().join(".resultcache").is_dir());

    let gitignore = fs::read_to_string(temp_dir.path().join(".gitignore")).unwrap();
    assert!(gitignore.contains(".resultcache/"));
}

fn put_then_get_survives_restart(backend: &str) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config = write_config(temp_dir.path(), 8, backend);

    resultcache_bin()
        .arg("--config")
        .arg(&config)
        .args(["put", r#"{"prompt": "oi"}"#, "olá"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Armazenado"));

    resultcache_bin()
        .arg("--config")
        .arg(&config)
        .args(["get", r#"{"prompt": "oi"}"#])
        .assert()
        .success()
        .stdout(predicate::str::contains("olá"));

    resultcache_bin()
        .arg("--config")
        .arg(&config)
        .args(["get", "missing"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Não encontrado"));
}

#[test]
fn test_put_then_get_json_backend() {
    put_then_get_survives_restart("json");
}

#[test]
fn test_put_then_get_sqlite_backend() {
    put_then_get_survives_restart("sqlite");
}

#[test]
fn test_eviction_across_invocations() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config = write_config(temp_dir.path(), 2, "json");

    for (key, value) in [("A", "1"), ("B", "2")] {
        resultcache_bin()
            .arg("--config")
            .arg(&config)
            .args(["put", key, value])
            .assert()
            .success();
    }

    // Leitura promove A; C então expulsa B.
    resultcache_bin()
        .arg("--config")
        .arg(&config)
        .args(["get", "A"])
        .assert()
        .success();
    resultcache_bin()
        .arg("--config")
        .arg(&config)
        .args(["put", "C", "3"])
        .assert()
        .success();

    resultcache_bin()
        .arg("--config")
        .arg(&config)
        .args(["get", "B"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Não encontrado"));

    resultcache_bin()
        .arg("--config")
        .arg(&config)
        .args(["show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Entradas (2/2)"));
}

#[test]
fn test_forget_and_clear() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config = write_config(temp_dir.path(), 4, "json");

    for key in ["A", "B"] {
        resultcache_bin()
            .arg("--config")
            .arg(&config)
            .args(["put", key, "x"])
            .assert()
            .success();
    }

    resultcache_bin()
        .arg("--config")
        .arg(&config)
        .args(["forget", "A"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Entrada removida"));

    resultcache_bin()
        .arg("--config")
        .arg(&config)
        .arg("clear")
        .assert()
        .success()
        .stdout(predicate::str::contains("1 entradas removidas"));

    resultcache_bin()
        .arg("--config")
        .arg(&config)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Entradas:   0"));
}

#[test]
fn test_show_json_outputs_snapshot() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config = write_config(temp_dir.path(), 4, "json");

    resultcache_bin()
        .arg("--config")
        .arg(&config)
        .args(["put", "k", "[1, 2, 3]"])
        .assert()
        .success();

    let output = resultcache_bin()
        .arg("--config")
        .arg(&config)
        .args(["show", "--json"])
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    let snapshot: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("show --json should print JSON");
    assert_eq!(snapshot["capacity"], 4);
    assert_eq!(snapshot["order"].as_array().map(Vec::len), Some(1));
}
