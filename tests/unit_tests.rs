use std::io::Write;
use stream_loader::commands::{run_bind, run_ddl, BindArgs, DdlArgs};
use stream_loader::LoaderOpts;
use tempfile::NamedTempFile;

const CATALOG: &str = r#"
streams:
  - name: users
    sync_id: s1
    generation_id: 7
    json_schema:
      type: object
      properties:
        id: { type: [integer, "null"] }
        name: { type: [string, "null"] }
"#;

fn write_temp(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

fn opts() -> LoaderOpts {
    LoaderOpts {
        default_namespace: "public".to_string(),
    }
}

#[test]
fn test_loader_opts_creation() {
    let opts = LoaderOpts {
        default_namespace: "staging".to_string(),
    };
    assert_eq!(opts.default_namespace, "staging");
}

#[test]
fn test_ddl_command() {
    let catalog = write_temp(CATALOG);
    let output = run_ddl(&DdlArgs {
        catalog: catalog.path().to_path_buf(),
        stream: None,
        opts: opts(),
    })
    .unwrap();

    assert!(output.starts_with("CREATE SCHEMA IF NOT EXISTS \"public\";\n"));
    assert!(output.contains("CREATE TABLE IF NOT EXISTS \"public\".\"users\" (\n"));
    assert!(output.contains("  \"_sync_meta\" JSONB,\n"));
    assert!(output.contains("  \"id\" BIGINT,\n  \"name\" TEXT\n);"));
    assert!(!output.contains("NOT NULL"));
    assert!(output.contains("VALUES ($1, $2, $3, $4, $5, $6);"));
}

#[test]
fn test_ddl_unknown_stream() {
    let catalog = write_temp(CATALOG);
    let result = run_ddl(&DdlArgs {
        catalog: catalog.path().to_path_buf(),
        stream: Some("orders".to_string()),
        opts: opts(),
    });
    assert!(result.is_err());
}

#[test]
fn test_bind_command() {
    let catalog = write_temp(CATALOG);
    let records = write_temp(concat!(
        r#"{"data":{"id":42,"name":"ok"},"emitted_at":1000}"#,
        "\n",
        r#"{"data":{"id":"not-a-number","name":"x"},"emitted_at":1001}"#,
        "\n"
    ));

    let lines = run_bind(&BindArgs {
        catalog: catalog.path().to_path_buf(),
        stream: "users".to_string(),
        records: records.path().to_path_buf(),
        opts: opts(),
    })
    .unwrap();
    assert_eq!(lines.len(), 2);

    let params = lines[0]["params"].as_array().unwrap();
    assert_eq!(params.len(), 6);
    assert!(params[0].is_string());
    assert_eq!(params[1], 1000);
    assert_eq!(params[2], serde_json::json!({"changes": [], "syncId": "s1"}));
    assert_eq!(params[3], 7);
    assert_eq!(params[4], 42);
    assert_eq!(params[5], "ok");

    let nulled = &lines[1];
    assert_eq!(nulled["params"][4], serde_json::Value::Null);
    assert_eq!(
        nulled["nulled"],
        serde_json::json!([{
            "field": "id",
            "change": "NULLED",
            "reason": "DESTINATION_SERIALIZATION_ERROR"
        }])
    );
}
