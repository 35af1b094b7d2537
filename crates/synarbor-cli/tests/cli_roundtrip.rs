use assert_cmd::Command;
use predicates::prelude::*;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("config.toml"),
            "log_level = \"info\"\n\n[preferences]\nshow_progress = false\noutput_format = \"text\"\n",
        )
        .unwrap();
        Self { dir }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("synarbor").unwrap();
        cmd.arg("--config").arg(self.path("config.toml"));
        cmd
    }

    fn init(&self, name: &str) -> PathBuf {
        let net = self.path(name);
        self.cmd().arg("init").arg(&net).assert().success();
        net
    }

    fn generate(&self, net: &Path, out: &Path, extra: &[&str]) -> assert_cmd::assert::Assert {
        self.cmd()
            .arg("generate")
            .arg("--network")
            .arg(net)
            .arg("--out")
            .arg(out)
            .args(extra)
            .assert()
    }
}

#[test]
fn init_generate_inspect_verify() {
    let ws = Workspace::new();
    let net = ws.init("net.toml");
    let text = std::fs::read_to_string(&net).unwrap();
    assert!(text.contains("[[conntype]]"));

    let out = ws.path("synapses.ecl");
    ws.generate(&net, &out, &[]).success();
    assert!(out.exists());

    ws.cmd()
        .arg("inspect")
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("ECLREC v1"))
        .stdout(predicate::str::contains("CT1:"))
        .stdout(predicate::str::contains("CT2:"));

    let output = ws
        .cmd()
        .arg("inspect")
        .arg(&out)
        .arg("--format")
        .arg("json")
        .arg("--limit")
        .arg("3")
        .output()
        .unwrap();
    assert!(output.status.success());
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["records"].as_array().unwrap().len(), 3);
    assert_eq!(report["conntypes"].as_array().unwrap().len(), 2);
    assert!(report["record_count"].as_u64().unwrap() > 3);

    ws.cmd()
        .arg("verify")
        .arg("--network")
        .arg(&net)
        .arg("--cells")
        .arg("8")
        .assert()
        .success();
}

#[test]
fn every_mode_exports_the_same_records() {
    let ws = Workspace::new();
    let net = ws.init("net.toml");

    let generated = ws.path("generate.ecl");
    let regenerated = ws.path("regenerate.ecl");
    let fetched = ws.path("fetch.ecl");
    ws.generate(&net, &generated, &["--mode", "generate"]).success();
    ws.generate(&net, &regenerated, &["--mode", "regenerate", "--compact"])
        .success();
    ws.generate(&net, &fetched, &["--mode", "fetch"]).success();

    let reference = std::fs::read(&generated).unwrap();
    assert_eq!(std::fs::read(&regenerated).unwrap(), reference);
    assert_eq!(std::fs::read(&fetched).unwrap(), reference);
}

#[test]
fn init_refuses_to_overwrite() {
    let ws = Workspace::new();
    let net = ws.init("net.toml");

    ws.cmd()
        .arg("init")
        .arg(&net)
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    ws.cmd()
        .arg("init")
        .arg(&net)
        .arg("--force")
        .arg("--name")
        .arg("renamed")
        .assert()
        .success();
    assert!(std::fs::read_to_string(&net).unwrap().contains("renamed"));
}

#[test]
fn compact_fetch_is_rejected() {
    let ws = Workspace::new();
    let net = ws.init("net.toml");
    let out = ws.path("never.ecl");

    ws.generate(&net, &out, &["--mode", "fetch", "--compact"])
        .failure()
        .stderr(predicate::str::contains("--compact"));
    assert!(!out.exists());
}

#[test]
fn generate_requires_a_network() {
    let ws = Workspace::new();
    ws.cmd()
        .arg("generate")
        .arg("--out")
        .arg(ws.path("x.ecl"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("--network"));
}

#[test]
fn inspect_rejects_foreign_files() {
    let ws = Workspace::new();
    let bogus = ws.path("bogus.ecl");
    std::fs::write(&bogus, b"definitely not a record file").unwrap();

    ws.cmd().arg("inspect").arg(&bogus).assert().failure();
}

#[test]
fn unknown_conntype_layer_fails() {
    let ws = Workspace::new();
    let net = ws.path("broken.toml");
    std::fs::write(
        &net,
        "[[layer]]\nname = \"a\"\nnx = 2\nny = 2\n\n[[conntype]]\nid = 1\nsource = \"a\"\ntarget = \"missing\"\nnc = 3\n",
    )
    .unwrap();

    ws.generate(&net, &ws.path("out.ecl"), &[])
        .failure()
        .stderr(predicate::str::contains("missing"));
}
