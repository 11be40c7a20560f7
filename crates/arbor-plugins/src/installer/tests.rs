//! Unit tests for the plugin installer.
//!
//! Installation tests drive the real `git` binary against local source
//! repositories and skip (with a note) when git is unavailable.

use std::process::Command;

use rstest::rstest;
use tempfile::TempDir;

use super::*;

fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .is_ok_and(|output| output.status.success())
}

/// Creates a committed git repository at `dir` containing the given files.
fn make_source_repo(dir: &Path, files: &[(&str, &str)]) {
    fs::create_dir_all(dir).expect("create source dir");
    for (name, contents) in files {
        fs::write(dir.join(name), contents).expect("write source file");
    }
    let run = |args: &[&str]| {
        let status = Command::new("git")
            .arg("-C")
            .arg(dir)
            .args(args)
            .status()
            .expect("run git");
        assert!(status.success(), "git {args:?} failed");
    };
    run(&["init", "-q"]);
    run(&["add", "."]);
    run(&[
        "-c",
        "user.email=test@example.com",
        "-c",
        "user.name=test",
        "commit",
        "-q",
        "-m",
        "initial",
    ]);
}

struct InstallFixture {
    dir: TempDir,
    installer: PluginInstaller,
    registry: PluginRegistry,
}

impl InstallFixture {
    fn new() -> Self {
        let dir = TempDir::new().expect("temp dir");
        let registry = PluginRegistry::new(dir.path().join("plugins.json"));
        let installer = PluginInstaller::new(dir.path().join("plugins"), registry.clone());
        Self {
            dir,
            installer,
            registry,
        }
    }

    fn source_url(&self, name: &str, files: &[(&str, &str)]) -> String {
        let source = self.dir.path().join("sources").join(name);
        make_source_repo(&source, files);
        source.display().to_string()
    }
}

const NOTIFIER_MANIFEST: &str = r#"{
    "name": "notifier",
    "config_key": "notify",
    "hooks": ["on_load", "on_healthcheck"],
    "entrypoint": "main.py",
    "runtime": "python3"
}"#;

#[test]
fn install_registers_declaration_matching_source_manifest() {
    if !git_available() {
        eprintln!("skipping: git is not available");
        return;
    }
    let fixture = InstallFixture::new();
    let url = fixture.source_url("notifier", &[("plugin.json", NOTIFIER_MANIFEST)]);

    let record = fixture.installer.install(&url).expect("install plugin");
    assert_eq!(record.name(), "notifier");
    assert_eq!(record.config_key(), "notify");
    assert!(record.handles_hook(crate::event::HookKind::OnHealthcheck));
    assert_eq!(record.entrypoint(), "main.py");
    assert_eq!(record.runtime(), "python3");

    let found = fixture
        .registry
        .find("notifier")
        .expect("registry readable")
        .expect("record registered");
    assert_eq!(found, record);
    assert!(
        fixture.dir.path().join("plugins/notifier/plugin.json").exists(),
        "clone should land in the plugins directory"
    );
}

#[test]
fn install_rejects_existing_plugin_directory() {
    if !git_available() {
        eprintln!("skipping: git is not available");
        return;
    }
    let fixture = InstallFixture::new();
    let url = fixture.source_url("notifier", &[("plugin.json", NOTIFIER_MANIFEST)]);

    fixture.installer.install(&url).expect("first install");
    let error = fixture
        .installer
        .install(&url)
        .expect_err("second install should fail");
    assert!(matches!(error, PluginError::AlreadyInstalled { .. }), "got: {error}");
}

#[test]
fn install_rolls_back_clone_without_manifest() {
    if !git_available() {
        eprintln!("skipping: git is not available");
        return;
    }
    let fixture = InstallFixture::new();
    let url = fixture.source_url("bare", &[("README.md", "no declaration here\n")]);

    let error = fixture
        .installer
        .install(&url)
        .expect_err("manifest-less clone should fail");
    assert!(matches!(error, PluginError::Manifest { .. }), "got: {error}");
    assert!(
        !fixture.dir.path().join("plugins/bare").exists(),
        "half-installed directory must be rolled back"
    );
    assert!(
        fixture
            .registry
            .find("bare")
            .expect("registry readable")
            .is_none(),
        "nothing may be registered after rollback"
    );
}

#[test]
fn uninstall_removes_directory_and_registry_entry() {
    if !git_available() {
        eprintln!("skipping: git is not available");
        return;
    }
    let fixture = InstallFixture::new();
    let url = fixture.source_url("notifier", &[("plugin.json", NOTIFIER_MANIFEST)]);
    fixture.installer.install(&url).expect("install");

    fixture.installer.uninstall("notifier").expect("uninstall");
    assert!(!fixture.dir.path().join("plugins/notifier").exists());
    assert!(
        fixture
            .registry
            .find("notifier")
            .expect("registry readable")
            .is_none()
    );
}

#[test]
fn uninstall_of_absent_plugin_still_prunes_registry() {
    let fixture = InstallFixture::new();
    // Registry rows can outlive their directories; uninstall copes.
    fixture.installer.uninstall("ghost").expect("uninstall absent");
}

#[test]
fn register_adds_existing_directory_without_cloning() {
    let fixture = InstallFixture::new();
    let plugin_dir = fixture.dir.path().join("plugins/local");
    fs::create_dir_all(&plugin_dir).expect("create plugin dir");
    fs::write(
        plugin_dir.join(crate::manifest::MANIFEST_FILE),
        r#"{"name": "local", "hooks": ["on_close"]}"#,
    )
    .expect("write manifest");

    let record = fixture.installer.register("local").expect("register");
    assert_eq!(record.name(), "local");
    assert!(
        fixture
            .registry
            .find("local")
            .expect("registry readable")
            .is_some()
    );
}

#[test]
fn re_registering_overwrites_instead_of_duplicating() {
    let fixture = InstallFixture::new();
    let plugin_dir = fixture.dir.path().join("plugins/local");
    fs::create_dir_all(&plugin_dir).expect("create plugin dir");
    let manifest_path = plugin_dir.join(crate::manifest::MANIFEST_FILE);
    fs::write(&manifest_path, r#"{"name": "local", "hooks": ["on_load"]}"#)
        .expect("write manifest");
    fixture.installer.register("local").expect("first register");

    fs::write(&manifest_path, r#"{"name": "local", "hooks": ["on_close"]}"#)
        .expect("rewrite manifest");
    fixture.installer.register("local").expect("second register");

    let records = fixture.registry.list().expect("registry readable");
    assert_eq!(records.len(), 1, "re-registration must not duplicate");
    assert!(
        records
            .first()
            .expect("one record")
            .handles_hook(crate::event::HookKind::OnClose),
        "latest declaration wins"
    );
}

#[rstest]
#[case::https("https://github.com/acme/arbor-notifier.git", "arbor-notifier")]
#[case::https_no_suffix("https://github.com/acme/arbor-notifier", "arbor-notifier")]
#[case::trailing_slash("https://github.com/acme/arbor-notifier/", "arbor-notifier")]
#[case::scp_style("git@github.com:acme/arbor-notifier.git", "arbor-notifier")]
#[case::local_path("/home/user/src/arbor-notifier", "arbor-notifier")]
fn repo_name_is_derived_from_url(#[case] url: &str, #[case] expected: &str) {
    assert_eq!(repo_name_from_url(url), expected);
}
