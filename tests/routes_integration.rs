//! End-to-end tests driving the compiled binary.

use std::io::Write;
use std::process::Command;

fn write_file(suffix: &str, content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::with_suffix(suffix).unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

const RECORDS: &str = concat!(
    r#"{"name":"Bud","tenant_id":"iplantc.org","age":44}"#,
    "\n",
    r#"{"name":"Harry","tenant_id":"bad_tenant","age":12}"#,
    "\n",
    r#"{"name":"Betsy","tenant_id":"iplantc.org","age":17}"#,
    "\n",
);

#[test]
fn select_filters_records() {
    let input = write_file(".jsonl", RECORDS);
    let output = tempfile::NamedTempFile::with_suffix(".jsonl").unwrap();

    let status = Command::new(env!("CARGO_BIN_EXE_sift"))
        .arg("--input")
        .arg(input.path())
        .arg("--output")
        .arg(output.path())
        .arg("--select")
        .arg("age >= 18 AND tenant_id = 'iplantc.org'")
        .status()
        .expect("failed to execute process");
    assert!(status.success());

    let content = std::fs::read_to_string(output.path()).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 1);

    let record: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
    assert_eq!(record["name"], "Bud");
}

#[test]
fn routes_annotate_matching_records() {
    let input = write_file(".jsonl", RECORDS);
    let routes = write_file(
        ".yaml",
        concat!(
            "routes:\n",
            "  adults:\n",
            "    filter: \"age >= 18\"\n",
            "  iplant:\n",
            "    filter: \"tenant_id = 'iplantc.org'\"\n",
        ),
    );
    let output = tempfile::NamedTempFile::with_suffix(".jsonl").unwrap();

    let status = Command::new(env!("CARGO_BIN_EXE_sift"))
        .arg("--input")
        .arg(input.path())
        .arg("--output")
        .arg(output.path())
        .arg("--routes")
        .arg(routes.path())
        .arg("--verbose")
        .status()
        .expect("failed to execute process");
    assert!(status.success());

    let content = std::fs::read_to_string(output.path()).unwrap();
    let mut by_name = std::collections::HashMap::new();
    for line in content.lines() {
        let record: serde_json::Value = serde_json::from_str(line).unwrap();
        by_name.insert(
            record["name"].as_str().unwrap().to_string(),
            record["_routes"].clone(),
        );
    }

    // Harry matches no route and is dropped
    assert_eq!(by_name.len(), 2);
    assert_eq!(by_name["Bud"], serde_json::json!(["adults", "iplant"]));
    assert_eq!(by_name["Betsy"], serde_json::json!(["iplant"]));
}

#[test]
fn invalid_selector_fails_fast() {
    let input = write_file(".jsonl", RECORDS);
    let output = tempfile::NamedTempFile::with_suffix(".jsonl").unwrap();

    let status = Command::new(env!("CARGO_BIN_EXE_sift"))
        .arg("--input")
        .arg(input.path())
        .arg("--output")
        .arg(output.path())
        .arg("--select")
        .arg("age >= ")
        .status()
        .expect("failed to execute process");
    assert!(!status.success());
}

#[test]
fn malformed_records_can_be_skipped() {
    let input = write_file(
        ".jsonl",
        concat!(
            r#"{"name":"Bud","age":44}"#,
            "\n",
            "this is not json\n",
            r#"{"name":"Betsy","age":20}"#,
            "\n",
        ),
    );
    let output = tempfile::NamedTempFile::with_suffix(".jsonl").unwrap();

    // Without --skip-invalid the run fails
    let status = Command::new(env!("CARGO_BIN_EXE_sift"))
        .arg("--input")
        .arg(input.path())
        .arg("--output")
        .arg(output.path())
        .arg("--select")
        .arg("age >= 18")
        .status()
        .expect("failed to execute process");
    assert!(!status.success());

    // With it, the bad line is dropped and the rest flows through
    let status = Command::new(env!("CARGO_BIN_EXE_sift"))
        .arg("--input")
        .arg(input.path())
        .arg("--output")
        .arg(output.path())
        .arg("--select")
        .arg("age >= 18")
        .arg("--skip-invalid")
        .status()
        .expect("failed to execute process");
    assert!(status.success());

    let content = std::fs::read_to_string(output.path()).unwrap();
    assert_eq!(content.lines().count(), 2);
}
