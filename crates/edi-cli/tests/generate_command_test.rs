use std::env;
use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output};

use tempfile::TempDir;

fn cargo_bin() -> PathBuf {
    if let Ok(path) = env::var("CARGO_BIN_EXE_edi") {
        return PathBuf::from(path);
    }

    let target_dir = env::var("CARGO_TARGET_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| repo_root().join("target"));
    let executable_name = format!("edi{}", std::env::consts::EXE_SUFFIX);
    let fallback = target_dir.join("debug").join(executable_name);

    if fallback.exists() {
        return fallback;
    }

    panic!(
        "CARGO_BIN_EXE_edi is not set and fallback binary was not found at {}",
        fallback.display()
    );
}

fn repo_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
}

fn directory_root() -> String {
    repo_root()
        .join("testdata")
        .join("directory")
        .to_string_lossy()
        .into_owned()
}

fn run_edi(args: &[&str]) -> Output {
    Command::new(cargo_bin())
        .args(args)
        .output()
        .expect("run edi")
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

fn extract_orders(dir: &TempDir) -> PathBuf {
    let source = directory_root();
    let output = run_edi(&[
        "extract",
        "--source",
        &source,
        "--revision",
        "D97A",
        "--document",
        "ORDERS",
        "--output",
        dir.path().to_string_lossy().as_ref(),
    ]);
    assert_exit_code(&output, 0);
    dir.path().join("D97A").join("ORDERS.json")
}

#[test]
fn generate_command_prints_message_body() {
    let dir = TempDir::new().expect("temp dir");
    let structure = extract_orders(&dir);

    let output = run_edi(&["generate", "--input", structure.to_string_lossy().as_ref()]);

    assert_exit_code(&output, 0);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("<MESSAGE format=\"none\" max=\"n\" requirement=\"mandatory\">"));
    assert!(stdout.contains("<!-- EDIFACT-D97A-ORDERS -->"));
    assert!(stdout.contains("<SG1 format=\"none\" max=\"9999\">"));
}

#[test]
fn generate_command_writes_ixpath_artifacts() {
    let dir = TempDir::new().expect("temp dir");
    let structure = extract_orders(&dir);
    let ixpath = dir.path().join("ixpath");

    let output = run_edi(&[
        "generate",
        "--input",
        structure.to_string_lossy().as_ref(),
        "--dialect",
        "x12",
        "--ixpath",
        ixpath.to_string_lossy().as_ref(),
    ]);

    assert_exit_code(&output, 0);
    let base = ixpath.join("SFEDI").join("format").join("x12").join("D97A");
    let wrapper = fs::read_to_string(base.join("DN__EDIFACT-D97A-ORDERS.xml"))
        .expect("wrapper should be written");
    assert!(wrapper.contains("&xORDERS;"));
    let body = fs::read_to_string(base.join("ORDERS.xml")).expect("body should be written");
    assert!(body.contains("<C002 end=\"|\">"));
}

#[test]
fn generate_command_default_group_max_override() {
    let dir = TempDir::new().expect("temp dir");
    let structure = dir.path().join("structure.json");
    fs::write(
        &structure,
        r#"{"Standard": "EDIFACT", "Revision": "D97A", "Document": "ORDERS",
            "Segments": [{"Segment": "SG1", "Requirement": "Conditional",
                          "Segments": [{"Segment": "RFF", "Requirement": "Mandatory", "Elements": []}]}]}"#,
    )
    .expect("structure should be writable");

    let output = run_edi(&[
        "generate",
        "--default-group-max",
        "25",
        "--input",
        structure.to_string_lossy().as_ref(),
    ]);

    assert_exit_code(&output, 0);
    assert!(String::from_utf8_lossy(&output.stdout).contains("<SG1 format=\"none\" max=\"25\">"));
}

#[test]
fn generate_command_unsupported_dialect_is_fatal() {
    let dir = TempDir::new().expect("temp dir");
    let structure = extract_orders(&dir);

    let output = run_edi(&[
        "generate",
        "--input",
        structure.to_string_lossy().as_ref(),
        "--dialect",
        "TRADACOMS",
    ]);

    assert_exit_code(&output, 3);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("ERROR: Unsupported dialect: TRADACOMS"), "stderr: {stderr}");
}

#[test]
fn generate_command_idoc_from_records() {
    let dir = TempDir::new().expect("temp dir");
    let records = dir.path().join("records.json");
    fs::write(
        &records,
        r#"[
            {"Segment": "E2EDK01005", "Type": "E1EDK01", "Max": "1"},
            {"Field": "ACTION", "Length": 3, "Description": "Action code"}
        ]"#,
    )
    .expect("records should be writable");

    let output = run_edi(&[
        "generate",
        "--records",
        records.to_string_lossy().as_ref(),
        "--document",
        "ORDERS05",
    ]);

    assert_exit_code(&output, 0);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("<!-- ORDERS0 -->"));
    assert!(stdout.contains("<ACTION format=\"fixed\" length=\"3\" description=\"Action code\"/>"));
}

#[test]
fn generate_command_records_require_document() {
    let output = run_edi(&["generate", "--records", "records.json"]);
    assert_exit_code(&output, 2);
}
