use std::{env, fs};

use capa_scope::config::loader::{load_config, load_config_with_default_path};
use capa_scope::{BaselinePolicy, ConfigError};

#[test]
fn config_parsing_and_env_overrides_and_validation() {
    let dir = tempfile::tempdir().expect("tmp dir");
    let path = dir.path().join("capa-scope.toml");

    let toml_content = r#"
[scope]
baseline_policy = "refresh_after_commit"
optimistic_lock = true

[logging]
level = "debug"
"#;
    fs::write(&path, toml_content).expect("write toml");

    // File values are picked up
    let cfg = load_config(path.to_str()).expect("should parse config");
    assert_eq!(cfg.scope.baseline_policy, BaselinePolicy::RefreshAfterCommit);
    assert!(cfg.scope.optimistic_lock);
    assert!(!cfg.scope.observed_generation);
    assert_eq!(cfg.logging.level, "debug");

    // Env override wins over file
    unsafe {
        env::set_var("CAPA__SCOPE__OBSERVED_GENERATION", "true");
    }
    let cfg_env = load_config(path.to_str()).expect("should parse config with env overrides");
    assert!(cfg_env.scope.observed_generation);
    unsafe {
        env::remove_var("CAPA__SCOPE__OBSERVED_GENERATION");
    }

    // Invalid filter directive is rejected
    let invalid_path = dir.path().join("invalid.toml");
    fs::write(&invalid_path, "[logging]\nlevel = \"capa_scope=notalevel\"\n").expect("write toml");
    let err = load_config(invalid_path.to_str()).expect_err("should fail validation");
    assert!(matches!(err, ConfigError::Validation(_)));
}

#[test]
fn missing_file_falls_back_to_defaults() {
    let dir = tempfile::tempdir().expect("tmp dir");
    let path = dir.path().join("does-not-exist.toml");

    let cfg = load_config_with_default_path(Some(&path)).expect("defaults should load");
    assert_eq!(cfg.scope.baseline_policy, BaselinePolicy::Preserve);
    assert!(!cfg.scope.optimistic_lock);
    assert_eq!(cfg.logging.level, "info");
}

#[test]
fn unknown_baseline_policy_fails_to_build() {
    let dir = tempfile::tempdir().expect("tmp dir");
    let path = dir.path().join("bad-policy.toml");
    fs::write(&path, "[scope]\nbaseline_policy = \"whenever\"\n").expect("write toml");

    let err = load_config(path.to_str()).expect_err("unknown policy should fail");
    assert!(matches!(err, ConfigError::Build(_)));
}
