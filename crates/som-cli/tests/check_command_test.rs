use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::TempDir;

fn cargo_bin() -> PathBuf {
    if let Ok(path) = env::var("CARGO_BIN_EXE_modelcheck") {
        return PathBuf::from(path);
    }

    let target_dir = env::var("CARGO_TARGET_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| repo_root().join("target"));
    let executable_name = format!("modelcheck{}", std::env::consts::EXE_SUFFIX);
    let fallback = target_dir.join("debug").join(executable_name);

    if fallback.exists() {
        return fallback;
    }

    panic!(
        "CARGO_BIN_EXE_modelcheck is not set and fallback binary was not found at {}",
        fallback.display()
    );
}

fn repo_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
}

fn testdata_path(relative: &str) -> PathBuf {
    repo_root().join("testdata").join(relative)
}

fn run_modelcheck(args: &[&str]) -> Output {
    Command::new(cargo_bin())
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("modelcheck should execute")
}

fn assert_exit_code(output: &Output, expected: i32) {
    let actual = output.status.code().unwrap_or(-1);
    assert_eq!(
        actual,
        expected,
        "unexpected exit code; stdout: {}; stderr: {}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn check_office(database: &Path, attribute: &str, extra: &[&str]) -> Output {
    let model = path_arg(&testdata_path("office.ifc"));
    let schema = path_arg(&testdata_path("office_schema.yaml"));
    let database = path_arg(database);
    let mut args = vec![
        "check",
        model.as_str(),
        "--schema",
        schema.as_str(),
        "--project",
        "Office",
        "--database",
        database.as_str(),
        "--pset",
        "Identity",
        "--attribute",
        attribute,
        "--run-date",
        "2024-05-02",
    ];
    args.extend_from_slice(extra);
    run_modelcheck(&args)
}

#[test]
fn check_prints_summary_for_office_model() {
    let dir = TempDir::new().unwrap();
    let output = check_office(&dir.path().join("issues.db"), "Identifier", &[]);

    assert_exit_code(&output, 0);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Project Office (2024-05-02)"));
    assert!(stdout.contains("Files: 1 checked, 0 failed, 0 skipped"));
    assert!(stdout.contains("Issues: 10"));
    assert!(stdout.contains("duplicate-subgroup-identifier"));
}

#[test]
fn check_writes_export_file() {
    let dir = TempDir::new().unwrap();
    let export = dir.path().join("issues.csv");
    let export_arg = path_arg(&export);
    let output = check_office(
        &dir.path().join("issues.db"),
        "Identifier",
        &["--export", &export_arg],
    );

    assert_exit_code(&output, 0);
    let content = fs::read_to_string(&export).unwrap();
    assert_eq!(content.lines().count(), 11);
}

#[test]
fn summary_reads_latest_run_back() {
    let dir = TempDir::new().unwrap();
    let database = dir.path().join("issues.db");
    assert_exit_code(&check_office(&database, "Identifier", &[]), 0);

    let database_arg = path_arg(&database);
    let output = run_modelcheck(&[
        "summary",
        "--project",
        "Office",
        "--database",
        &database_arg,
    ]);

    assert_exit_code(&output, 0);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Project Office (2024-05-02)"));
    assert!(stdout.contains("9 entities, 1 files with issues"));
    assert!(stdout.contains("empty-group"));

    let other = run_modelcheck(&["summary", "--project", "Depot", "--database", &database_arg]);
    assert_exit_code(&other, 0);
    assert!(String::from_utf8_lossy(&other.stdout).contains("No runs recorded for project Depot"));
}

#[test]
fn check_uses_config_file_with_flag_overrides() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("modelcheck.yaml");
    fs::write(
        &config,
        format!(
            "project: Ignored\n\
             schema: {}\n\
             database: issues.db\n\
             export: out.json\n\
             identification:\n  property_set: Identity\n  attribute: Identifier\n",
            testdata_path("office_schema.yaml").display()
        ),
    )
    .unwrap();

    let config_arg = path_arg(&config);
    let model = path_arg(&testdata_path("office.ifc"));
    let output = run_modelcheck(&[
        "--config",
        &config_arg,
        "check",
        &model,
        "--project",
        "Office",
        "--run-date",
        "2024-05-02",
    ]);

    assert_exit_code(&output, 0);
    assert!(dir.path().join("issues.db").exists());
    let json = fs::read_to_string(dir.path().join("out.json")).unwrap();
    assert!(json.contains("\"project\": \"Office\""));
}

#[test]
fn check_reports_unreadable_model_with_partial_exit_code() {
    let dir = TempDir::new().unwrap();
    let models = dir.path().join("models");
    fs::create_dir(&models).unwrap();
    fs::copy(testdata_path("office.ifc"), models.join("office.ifc")).unwrap();
    fs::copy(
        testdata_path("broken/not_a_model.ifc"),
        models.join("broken.ifc"),
    )
    .unwrap();

    let schema = path_arg(&testdata_path("office_schema.yaml"));
    let database = path_arg(&dir.path().join("issues.db"));
    let models_arg = path_arg(&models);
    let output = run_modelcheck(&[
        "check",
        &models_arg,
        "-s",
        &schema,
        "-p",
        "Office",
        "-d",
        &database,
        "--pset",
        "Identity",
        "--attribute",
        "Identifier",
    ]);

    assert_exit_code(&output, 2);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Files: 1 checked, 1 failed, 0 skipped"));
    assert!(stdout.contains("failed broken.ifc"));
}

#[test]
fn check_fails_before_opening_files_on_unknown_identification() {
    let dir = TempDir::new().unwrap();
    let database = dir.path().join("issues.db");
    let output = check_office(&database, "Code", &[]);

    assert_exit_code(&output, 1);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Identification error"));
    assert!(!database.exists());
}

#[test]
fn check_requires_schema_without_config() {
    let dir = TempDir::new().unwrap();
    let model = path_arg(&testdata_path("office.ifc"));
    let database = path_arg(&dir.path().join("issues.db"));
    let output = run_modelcheck(&["check", &model, "--project", "Office", "-d", &database]);

    assert_exit_code(&output, 1);
    assert!(String::from_utf8_lossy(&output.stderr).contains("--schema is required"));
}
