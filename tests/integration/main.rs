//! Integration tests for modswap

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;

    fn modswap() -> Command {
        cargo_bin_cmd!("modswap")
    }

    #[test]
    fn help_displays() {
        modswap()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("cached artifact"));
    }

    #[test]
    fn version_displays() {
        modswap()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("modswap"));
    }

    #[test]
    fn config_path() {
        modswap()
            .args(["--no-local", "config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("config.toml"));
    }

    #[test]
    fn missing_explicit_config_fails() {
        modswap()
            .args(["--config", "/nonexistent/modswap.toml", "config", "show"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Configuration file not found"));
    }

    #[test]
    fn record_needs_artifact() {
        modswap()
            .args(["record", "workspace.toml", "--module", ":core"])
            .assert()
            .failure();
    }
}

mod workspace_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::fs;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    const WORKSPACE: &str = r#"
root = ":app"

[projects.":app"]
dir = "app"

[projects.":app".buckets.implementation]
dependencies = [
    { kind = "module", path = ":core" },
    { kind = "module", path = ":feature" },
]

[projects.":core"]
dir = "core"

[projects.":core".buckets.implementation]
dependencies = [
    { kind = "artifact", group = "com.squareup.okhttp3", name = "okhttp", version = "4.12.0" },
]

[projects.":feature"]
dir = "feature"

[projects.":feature".buckets.implementation]
dependencies = [
    { kind = "module", path = ":core" },
]
"#;

    const CONFIG: &str = r#"
[general]
enabled = true

[[modules]]
path = ":core"

[[modules]]
path = ":feature"
"#;

    struct Fixture {
        dir: TempDir,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            fs::write(dir.path().join("workspace.toml"), WORKSPACE).unwrap();
            fs::write(dir.path().join("modswap.toml"), CONFIG).unwrap();
            for name in ["app", "core", "feature"] {
                fs::create_dir_all(dir.path().join(name).join("src")).unwrap();
                fs::write(dir.path().join(name).join("src/Main.kt"), name).unwrap();
            }
            Self { dir }
        }

        fn path(&self, rel: &str) -> PathBuf {
            self.dir.path().join(rel)
        }

        fn manifest(&self) -> PathBuf {
            self.path("workspace.toml")
        }

        fn cmd(&self) -> Command {
            let mut cmd = cargo_bin_cmd!("modswap");
            cmd.current_dir(self.dir.path());
            cmd
        }

        fn record(&self, module: &str) {
            let produced = self.path(&format!("{}.aar", module.trim_start_matches(':')));
            fs::write(&produced, "zip").unwrap();
            self.cmd()
                .arg("record")
                .arg(self.manifest())
                .args(["--module", module, "--artifact"])
                .arg(&produced)
                .assert()
                .success();
        }

        fn plan_json(&self, extra: &[&str]) -> serde_json::Value {
            let output = self
                .cmd()
                .arg("plan")
                .arg(self.manifest())
                .args(["--format", "json"])
                .args(extra)
                .output()
                .unwrap();
            assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
            serde_json::from_slice(&output.stdout).unwrap()
        }
    }

    fn read(path: &Path) -> String {
        fs::read_to_string(path).unwrap()
    }

    #[test]
    fn cold_cache_plans_full_build() {
        let fx = Fixture::new();
        let report = fx.plan_json(&[]);

        assert_eq!(report["triggered"], true);
        assert_eq!(report["builds"].as_array().unwrap().len(), 2);
        assert_eq!(report["rewrite"]["substituted"].as_array().unwrap().len(), 0);
    }

    #[test]
    fn status_reports_every_module() {
        let fx = Fixture::new();
        fx.cmd()
            .arg("status")
            .arg(fx.manifest())
            .assert()
            .success()
            .stdout(predicate::str::contains(":core"))
            .stdout(predicate::str::contains(":feature"))
            .stdout(predicate::str::contains("0 cached, 2 stale"));
    }

    #[test]
    fn recorded_module_is_substituted() {
        let fx = Fixture::new();
        fx.record(":core");
        assert!(fx.path("build/modswap/modules/_core.aar").is_file());
        assert!(read(&fx.path("build/modswap/modules/fingerprints.json")).contains(":core"));

        let out = fx.path("rewritten.toml");
        let report = fx.plan_json(&["--output", out.to_str().unwrap()]);

        assert_eq!(report["probe"]["valid"][0], ":core");
        assert_eq!(report["builds"][0]["module"], ":feature");
        assert_eq!(report["rewrite"]["substituted"].as_array().unwrap().len(), 2);

        let rewritten = read(&out);
        assert!(rewritten.contains("_core"));
        assert!(rewritten.contains("okhttp"));
    }

    #[test]
    fn source_change_invalidates_recording() {
        let fx = Fixture::new();
        fx.record(":core");
        fs::write(fx.path("core/src/Added.kt"), "class Added").unwrap();

        let report = fx.plan_json(&[]);
        assert_eq!(report["probe"]["valid"].as_array().unwrap().len(), 0);
    }

    #[test]
    fn launcher_pattern_skips_unmatched_tasks() {
        let fx = Fixture::new();
        fs::write(
            fx.path("modswap.toml"),
            CONFIG.replace("enabled = true", "enabled = true\ndetect_launcher = \"assemble\""),
        )
        .unwrap();

        let report = fx.plan_json(&["--tasks", "lint,test"]);
        assert_eq!(report["triggered"], false);

        let report = fx.plan_json(&["--tasks", ":app:assembleDebug"]);
        assert_eq!(report["triggered"], true);
    }

    #[test]
    fn table_output_lists_builds() {
        let fx = Fixture::new();
        fx.cmd()
            .arg("plan")
            .arg(fx.manifest())
            .assert()
            .success()
            .stdout(predicate::str::contains("Build from source"))
            .stdout(predicate::str::contains(":core:assembleDebug"));
    }

    #[test]
    fn invalid_config_is_reported() {
        let fx = Fixture::new();
        fs::write(fx.path("modswap.toml"), "[[modules]]\npath = \"core\"\n").unwrap();
        fx.cmd()
            .arg("status")
            .arg(fx.manifest())
            .assert()
            .failure()
            .stderr(predicate::str::contains("must start with ':'"));
    }

    #[test]
    fn init_writes_template() {
        let fx = Fixture::new();
        let target = fx.path("fresh");
        fx.cmd()
            .arg("init")
            .arg("--path")
            .arg(&target)
            .assert()
            .success();
        assert!(read(&target.join("modswap.toml")).contains("[substitution]"));

        fx.cmd()
            .arg("init")
            .arg("--path")
            .arg(&target)
            .assert()
            .failure()
            .stderr(predicate::str::contains("already exists"));
    }

    #[test]
    fn config_show_uses_local_file() {
        let fx = Fixture::new();
        fx.cmd()
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains(":feature"));
    }
}
