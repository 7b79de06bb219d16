#![cfg(unix)]

use assert_cmd::Command;
use assert_cmd::cargo;
use predicates::prelude::*;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::{TempDir, tempdir};

struct Sandbox {
    dir: TempDir,
}

impl Sandbox {
    fn new() -> Self {
        Self {
            dir: tempdir().unwrap(),
        }
    }

    fn venvs(&self) -> PathBuf {
        self.dir.path().join("venvs")
    }

    fn bin(&self) -> PathBuf {
        self.dir.path().join("bin")
    }

    fn env_bin(&self, name: &str) -> PathBuf {
        self.venvs().join(name).join(".venv/bin")
    }

    /// Lay out an environment the way the external installer leaves it.
    fn create_env(&self, name: &str, programs: &[&str]) {
        let bin = self.env_bin(name);
        fs::create_dir_all(&bin).unwrap();
        for program in programs {
            let path = bin.join(program);
            fs::write(&path, "#!/bin/sh\n").unwrap();
            fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        }
        std::os::unix::fs::symlink("/usr/bin/python3", bin.join("python")).unwrap();
    }

    fn venvx(&self) -> Command {
        let mut cmd = Command::new(cargo::cargo_bin!("venvx"));
        cmd.env_remove("VENVX_HOME")
            .env_remove("VENVX_VENVS")
            .env_remove("VENVX_BIN_DIR")
            .arg("--venvs")
            .arg(self.venvs())
            .arg("--bin-dir")
            .arg(self.bin());
        cmd
    }

    fn manifest(&self, name: &str) -> serde_json::Value {
        let content = fs::read_to_string(self.venvs().join(name).join("venvx.json")).unwrap();
        serde_json::from_str(&content).unwrap()
    }
}

fn link_target(path: &Path) -> PathBuf {
    fs::read_link(path).unwrap()
}

#[test]
fn test_init_expose_and_reexpose() {
    let sandbox = Sandbox::new();
    sandbox.create_env("jc", &["jc", "jc-helper"]);

    sandbox.venvx().args(["init", "jc==1.25.0"]).assert().success();
    assert_eq!(sandbox.manifest("jc")["config_version"], "0.2.0");

    sandbox
        .venvx()
        .args(["expose", "jc", "jc:myjc"])
        .assert()
        .success()
        .stdout(predicates::str::contains("[NEW]  jc -> myjc"));

    assert_eq!(
        link_target(&sandbox.bin().join("myjc")),
        sandbox.env_bin("jc").join("jc")
    );
    let manifest = sandbox.manifest("jc");
    assert_eq!(manifest["exposed"]["apps"]["jc"]["bin_name"], "jc");
    assert!(
        manifest["exposed"]["apps"]["jc"]["exposed_path"]
            .as_str()
            .unwrap()
            .ends_with("/myjc")
    );

    fs::remove_file(sandbox.bin().join("myjc")).unwrap();
    sandbox.venvx().args(["reexpose", "jc"]).assert().success();
    assert!(sandbox.bin().join("myjc").is_symlink());
}

#[test]
fn test_expose_all_rule_skips_interpreters() {
    let sandbox = Sandbox::new();
    sandbox.create_env("jc", &["jc", "jc-helper", "pip", "pip3.12"]);
    sandbox.venvx().args(["init", "jc"]).assert().success();

    sandbox.venvx().args(["expose", "jc", "__all__"]).assert().success();

    assert!(sandbox.bin().join("jc").is_symlink());
    assert!(sandbox.bin().join("jc-helper").is_symlink());
    assert!(!sandbox.bin().join("pip").exists());
    assert!(!sandbox.bin().join("python").exists());

    // Second run changes nothing.
    sandbox
        .venvx()
        .args(["expose", "jc", "__all__"])
        .assert()
        .success()
        .stdout(predicates::str::contains("[NEW]").not());
}

#[test]
fn test_foreign_file_is_left_alone() {
    let sandbox = Sandbox::new();
    sandbox.create_env("jc", &["jc"]);
    sandbox.venvx().args(["init", "jc"]).assert().success();
    fs::create_dir_all(sandbox.bin()).unwrap();
    fs::write(sandbox.bin().join("jc"), "user script").unwrap();

    sandbox
        .venvx()
        .args(["expose", "jc", "__eponym__"])
        .assert()
        .success()
        .stdout(predicates::str::contains("[WARN]"));

    assert_eq!(
        fs::read_to_string(sandbox.bin().join("jc")).unwrap(),
        "user script"
    );
}

#[test]
fn test_legacy_manifest_is_migrated() {
    let sandbox = Sandbox::new();
    sandbox.create_env("jc", &["jc"]);
    let legacy = serde_json::json!({
        "package_name_ref": "jc",
        "package_name": "jc",
        "venv_name": null,
        "bin_names": ["*"],
        "uvpipx_package_path": sandbox.venvs().join("jc"),
        "exposed_bins": [],
        "injected_package": {"rich": "rich==12.0.0"}
    });
    fs::write(
        sandbox.venvs().join("jc/venvx.json"),
        serde_json::to_string(&legacy).unwrap(),
    )
    .unwrap();

    sandbox
        .venvx()
        .args(["migrate", "jc"])
        .assert()
        .success()
        .stdout(predicates::str::contains("Upgraded"));
    let manifest = sandbox.manifest("jc");
    assert_eq!(manifest["config_version"], "0.2.0");
    assert_eq!(manifest["injected_packages"]["rich"]["spec"], "rich==12.0.0");

    sandbox
        .venvx()
        .args(["migrate", "jc"])
        .assert()
        .success()
        .stdout(predicates::str::contains("already"));

    // "*" recorded by the legacy layout behaves like __all__.
    sandbox.venvx().args(["reexpose", "jc"]).assert().success();
    assert!(sandbox.bin().join("jc").is_symlink());
}

#[test]
fn test_unsupported_manifest_fails() {
    let sandbox = Sandbox::new();
    sandbox.create_env("jc", &["jc"]);
    fs::write(
        sandbox.venvs().join("jc/venvx.json"),
        r#"{"config_version": "3.0.0"}"#,
    )
    .unwrap();

    sandbox
        .venvx()
        .args(["expose", "jc", "__all__"])
        .assert()
        .failure()
        .stderr(predicates::str::contains("unsupported manifest version 3.0.0"));
    assert!(!sandbox.bin().join("jc").exists());
}

#[test]
fn test_list_show_and_remove() {
    let sandbox = Sandbox::new();
    sandbox.create_env("jc", &["jc"]);
    sandbox.venvx().args(["init", "jc"]).assert().success();
    sandbox.venvx().args(["expose", "jc", "jc"]).assert().success();

    sandbox
        .venvx()
        .arg("list")
        .assert()
        .success()
        .stdout(predicates::str::contains("jc (jc): jc"));
    sandbox
        .venvx()
        .args(["show", "jc"])
        .assert()
        .success()
        .stdout(predicates::str::contains("[ok]"));

    sandbox.venvx().args(["remove", "jc", "-y"]).assert().success();
    assert!(!sandbox.bin().join("jc").is_symlink());
    assert!(!sandbox.venvs().join("jc").exists());

    sandbox
        .venvx()
        .arg("list")
        .assert()
        .success()
        .stdout(predicates::str::contains("No environments found."));
}

#[test]
fn test_init_requires_existing_environment() {
    let sandbox = Sandbox::new();
    sandbox
        .venvx()
        .args(["init", "jc"])
        .assert()
        .failure()
        .stderr(predicates::str::contains("create it before"));
}
