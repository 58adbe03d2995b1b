use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

/// Variables that would redirect the binary away from the test workspace.
const OVERRIDE_VARS: &[&str] = &[
    "SOP_STORE_BACKEND",
    "SOP_BUCKET",
    "IMAGES_BUCKET",
    "AWS_REGION",
    "SOP_KEY_PREFIX",
    "SOP_LOCAL_ROOT",
    "SOP_S3_ENDPOINT",
];

fn sopkb_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("sopkb");
    path
}

const TOC_WITH_PROBLEMS: &str = r#"{
  "categories": {
    "Customer Service": [
      {"id": "sop-handling-returns", "title": "Handling Customer Returns", "keywords": ["returns", "refund"]},
      {"id": "sop-returns-corrupt", "title": "Returns Exceptions", "keywords": ["returns"]}
    ],
    "Fulfillment": [
      {"id": "sop-fba-prep", "title": "FBA Inbound Shipment Prep", "keywords": ["fba", "shipment"]},
      {"id": "sop-dangling", "title": "Removal Orders", "keywords": ["removal"]}
    ]
  }
}"#;

const TOC_HEALTHY: &str = r#"{
  "categories": {
    "Customer Service": [
      {"id": "sop-handling-returns", "title": "Handling Customer Returns", "keywords": ["returns", "refund"]}
    ],
    "Fulfillment": [
      {"id": "sop-fba-prep", "title": "FBA Inbound Shipment Prep", "keywords": ["fba", "shipment"]}
    ]
  }
}"#;

fn setup_test_env_with(toc: &str) -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let sops_dir = root.join("sops");
    fs::create_dir_all(&sops_dir).unwrap();
    fs::write(
        sops_dir.join("sop-handling-returns.json"),
        r#"{
  "id": "sop-handling-returns",
  "title": "Handling Customer Returns",
  "category": "Customer Service",
  "keywords": ["returns", "refund"],
  "content": "1. Open Manage Returns\n2. Authorize the return",
  "images": ["s3://sop-images/returns/step1.png", "returns/step2.png"],
  "last_updated": "2024-03-18"
}"#,
    )
    .unwrap();
    fs::write(
        sops_dir.join("sop-fba-prep.json"),
        r#"{
  "id": "sop-fba-prep",
  "title": "FBA Inbound Shipment Prep",
  "category": "Fulfillment",
  "keywords": ["fba", "shipment"],
  "content": "1. Create a shipping plan"
}"#,
    )
    .unwrap();
    fs::write(
        sops_dir.join("sop-returns-corrupt.json"),
        r#"{"id": "sop-returns-corrupt", "title": "#,
    )
    .unwrap();

    fs::write(config_dir.join("sop_toc.json"), toc).unwrap();

    let config_content = format!(
        r#"[catalog]
path = "sop_toc.json"

[store]
backend = "local"

[store.local]
root = "{}/sops"
image_placeholder = "https://img.test/{{name}}"

[retrieval]
fetch_timeout_ms = 2000
default_limit = 3
max_limit = 5

[server]
bind = "127.0.0.1:7341"
"#,
        root.display()
    );

    let config_path = config_dir.join("sopkb.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn setup_test_env() -> (TempDir, PathBuf) {
    setup_test_env_with(TOC_WITH_PROBLEMS)
}

fn run_sopkb(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = sopkb_binary();
    let workdir = config_path.parent().and_then(Path::parent).unwrap();
    let mut cmd = Command::new(&binary);
    cmd.current_dir(workdir)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args);
    for var in OVERRIDE_VARS {
        cmd.env_remove(var);
    }
    let output = cmd
        .output()
        .unwrap_or_else(|e| panic!("Failed to run sopkb binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

#[test]
fn test_toc_groups_categories_in_file_order() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_sopkb(&config_path, &["toc"]);
    assert!(success, "toc failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("# Amazon Seller Assistant - SOP Library"));
    assert!(stdout.contains("- **sop-handling-returns**: Handling Customer Returns"));
    assert!(stdout.contains("  - Keywords: returns, refund"));

    let cs = stdout.find("## Customer Service").unwrap();
    let ff = stdout.find("## Fulfillment").unwrap();
    assert!(cs < ff, "categories out of order:\n{}", stdout);
}

#[test]
fn test_toc_json_lists_entries() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, _, success) = run_sopkb(&config_path, &["toc", "--json"]);
    assert!(success);
    let entries: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    let ids: Vec<&str> = entries
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["id"].as_str().unwrap())
        .collect();
    assert_eq!(
        ids,
        vec![
            "sop-handling-returns",
            "sop-returns-corrupt",
            "sop-fba-prep",
            "sop-dangling"
        ]
    );
    assert_eq!(entries[2]["category"], "Fulfillment");
}

#[test]
fn test_get_resolves_images_in_order() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) =
        run_sopkb(&config_path, &["get", "sop-handling-returns", "--json"]);
    assert!(success, "get failed: stdout={}, stderr={}", stdout, stderr);

    let sop: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(sop["id"], "sop-handling-returns");
    assert_eq!(sop["last_updated"], "2024-03-18");
    assert_eq!(
        sop["images"],
        serde_json::json!(["https://img.test/step1.png", "https://img.test/step2.png"])
    );
}

#[test]
fn test_get_text_output() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, _, success) = run_sopkb(&config_path, &["get", "sop-fba-prep"]);
    assert!(success);
    assert!(stdout.contains("SOP: FBA Inbound Shipment Prep"));
    assert!(stdout.contains("Category: Fulfillment"));
    assert!(stdout.contains("1. Create a shipping plan"));
    assert!(!stdout.contains("Last updated"));
}

#[test]
fn test_get_unknown_id_fails() {
    let (_tmp, config_path) = setup_test_env();

    let (_, stderr, success) = run_sopkb(&config_path, &["get", "sop-does-not-exist"]);
    assert!(!success);
    assert!(stderr.contains("not in catalog"), "stderr: {}", stderr);
}

#[test]
fn test_get_dangling_entry_is_missing_document() {
    let (_tmp, config_path) = setup_test_env();

    let (_, stderr, success) = run_sopkb(&config_path, &["get", "sop-dangling"]);
    assert!(!success);
    assert!(stderr.contains("document missing"), "stderr: {}", stderr);
}

#[test]
fn test_get_corrupt_document_fails() {
    let (_tmp, config_path) = setup_test_env();

    let (_, stderr, success) = run_sopkb(&config_path, &["get", "sop-returns-corrupt"]);
    assert!(!success);
    assert!(stderr.contains("is corrupt"), "stderr: {}", stderr);
}

#[test]
fn test_search_ranks_by_keyword_match() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_sopkb(
        &config_path,
        &["search", "How do I process a refund?", "--json"],
    );
    assert!(success, "search failed: stdout={}, stderr={}", stdout, stderr);
    let body: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    let results = body["results"].as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["id"], "sop-handling-returns");
}

#[test]
fn test_search_skips_corrupt_candidates() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_sopkb(&config_path, &["search", "returns", "--json"]);
    assert!(success, "search failed: stdout={}, stderr={}", stdout, stderr);
    let body: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    let ids: Vec<&str> = body["results"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["sop-handling-returns"]);
    assert!(stderr.contains("skipping search candidate"), "stderr: {}", stderr);
}

#[test]
fn test_search_limit_and_stopwords() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, _, success) = run_sopkb(&config_path, &["search", "how do I"]);
    assert!(success);
    assert!(stdout.contains("No results."));

    let (stdout, _, success) = run_sopkb(
        &config_path,
        &["search", "fba shipment returns", "--limit", "1", "--json"],
    );
    assert!(success);
    let body: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(body["results"].as_array().unwrap().len(), 1);
    assert_eq!(body["results"][0]["id"], "sop-fba-prep");
}

#[test]
fn test_check_reports_broken_entries() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_sopkb(&config_path, &["check"]);
    assert!(!success, "check should fail: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("Checking 4 SOPs (local store)"));
    assert!(stdout.contains("sop-dangling"));
    assert!(stdout.contains("corrupt_document   sop-returns-corrupt"));
    assert!(stdout.contains("2 ok, 2 failed"));
}

#[test]
fn test_check_healthy_catalog_succeeds() {
    let (_tmp, config_path) = setup_test_env_with(TOC_HEALTHY);

    let (stdout, stderr, success) = run_sopkb(&config_path, &["check"]);
    assert!(success, "check failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("2 ok, 0 failed"));
}

#[test]
fn test_invalid_config_is_rejected() {
    let (tmp, config_path) = setup_test_env();
    fs::write(
        &config_path,
        "[catalog]\npath = \"sop_toc.json\"\n\n[store]\nbackend = \"s3\"\n",
    )
    .unwrap();

    let (_, stderr, success) = run_sopkb(&config_path, &["toc"]);
    assert!(!success);
    assert!(stderr.contains("[store.s3]"), "stderr: {}", stderr);
    drop(tmp);
}
