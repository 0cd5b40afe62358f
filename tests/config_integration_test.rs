//! Integration tests for configuration loading and validation
//!
//! Tests touching `SINAN_*` variables hold `ENV_MUTEX` so they do not
//! interfere with each other.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

use secrecy::ExposeSecret;
use sinan_ingest::adapters::database::create_store;
use sinan_ingest::config::load_config;
use tempfile::NamedTempFile;

static ENV_MUTEX: Mutex<()> = Mutex::new(());

fn cleanup_env_vars() {
    for var in [
        "SINAN_APPLICATION_LOG_LEVEL",
        "SINAN_APPLICATION_DRY_RUN",
        "SINAN_INGEST_CHUNK_SIZE",
        "SINAN_INGEST_LEDGER_DIR",
        "SINAN_POSTGRESQL_CONNECTION_STRING",
        "SINAN_DESTINATION_TABLE",
        "TEST_SINAN_DB_PASSWORD",
    ] {
        std::env::remove_var(var);
    }
}

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

const COMPLETE: &str = r#"
[application]
log_level = "debug"

[postgresql]
connection_string = "postgresql://sinan:${TEST_SINAN_DB_PASSWORD}@db:5432/dengue"
max_connections = 8
connection_timeout_seconds = 10

[destination]
schema = "Municipio"
table = "Notificacao"
unique_constraint = "casos_unicos"

[ingest]
chunk_size = 50000
rows_per_statement = 500
max_parallel_jobs = 2
ledger_dir = "/var/lib/sinan/ledger"
archive_dir = "/var/lib/sinan/archive"

[logging]
local_enabled = false
local_rotation = "hourly"
"#;

#[test]
fn test_load_complete_config() {
    let _lock = ENV_MUTEX.lock().unwrap();
    cleanup_env_vars();
    std::env::set_var("TEST_SINAN_DB_PASSWORD", "pw");

    let file = write_config(COMPLETE);
    let config = load_config(file.path()).unwrap();

    assert_eq!(config.application.log_level, "debug");
    let pg = config.postgresql.as_ref().unwrap();
    assert_eq!(
        pg.connection_string.expose_secret().as_str(),
        "postgresql://sinan:pw@db:5432/dengue"
    );
    assert_eq!(pg.max_connections, 8);
    assert_eq!(config.ingest.chunk_size, 50_000);
    assert_eq!(config.ingest.rows_per_statement, 500);
    assert_eq!(config.ingest.archive_dir, Some(PathBuf::from("/var/lib/sinan/archive")));
    assert_eq!(config.logging.local_rotation, "hourly");

    cleanup_env_vars();
}

#[test]
fn test_minimal_dry_run_config_uses_defaults() {
    let _lock = ENV_MUTEX.lock().unwrap();
    cleanup_env_vars();

    let file = write_config("[application]\ndry_run = true\n");
    let config = load_config(file.path()).unwrap();

    assert!(config.postgresql.is_none());
    assert_eq!(config.destination.schema, "Municipio");
    assert_eq!(config.destination.unique_constraint, "casos_unicos");
    assert_eq!(config.ingest.chunk_size, 100_000);
    assert_eq!(config.ingest.max_parallel_jobs, 4);
    assert_eq!(config.ingest.ledger_dir, PathBuf::from("./ledger"));

    let store = create_store(&config).unwrap();
    assert_eq!(store.backend_name(), "memory");
}

#[test]
fn test_postgresql_required_without_dry_run() {
    let _lock = ENV_MUTEX.lock().unwrap();
    cleanup_env_vars();

    let file = write_config("[application]\nlog_level = \"info\"\n");
    let err = load_config(file.path()).unwrap_err();
    assert!(err.to_string().contains("postgresql configuration is required"));
}

#[test]
fn test_env_overrides() {
    let _lock = ENV_MUTEX.lock().unwrap();
    cleanup_env_vars();
    std::env::set_var("TEST_SINAN_DB_PASSWORD", "pw");
    std::env::set_var("SINAN_INGEST_CHUNK_SIZE", "2000");
    std::env::set_var("SINAN_APPLICATION_LOG_LEVEL", "trace");
    std::env::set_var("SINAN_DESTINATION_TABLE", "notificacao_teste");

    let file = write_config(COMPLETE);
    let config = load_config(file.path()).unwrap();
    assert_eq!(config.ingest.chunk_size, 2000);
    assert_eq!(config.application.log_level, "trace");
    assert_eq!(config.destination.table, "notificacao_teste");

    cleanup_env_vars();
}

#[test]
fn test_invalid_override_value() {
    let _lock = ENV_MUTEX.lock().unwrap();
    cleanup_env_vars();
    std::env::set_var("SINAN_INGEST_CHUNK_SIZE", "lots");

    let file = write_config("[application]\ndry_run = true\n");
    let err = load_config(file.path()).unwrap_err();
    assert!(err.to_string().contains("SINAN_INGEST_CHUNK_SIZE"));

    cleanup_env_vars();
}

#[test]
fn test_invalid_values_rejected() {
    let _lock = ENV_MUTEX.lock().unwrap();
    cleanup_env_vars();

    for (content, needle) in [
        ("[application]\ndry_run = true\n[ingest]\nchunk_size = 0\n", "chunk_size"),
        ("[application]\ndry_run = true\n[ingest]\nrows_per_statement = 5000\n", "rows_per_statement"),
        ("[application]\ndry_run = true\n[destination]\ntable = \"x; DROP\"\n", "destination.table"),
        ("[application]\ndry_run = true\nlog_level = \"loud\"\n", "log_level"),
    ] {
        let file = write_config(content);
        let err = load_config(file.path()).unwrap_err();
        assert!(err.to_string().contains(needle), "{err}");
    }
}

#[test]
fn test_missing_substitution_variable() {
    let _lock = ENV_MUTEX.lock().unwrap();
    cleanup_env_vars();

    let file = write_config(COMPLETE);
    let err = load_config(file.path()).unwrap_err();
    assert!(err.to_string().contains("TEST_SINAN_DB_PASSWORD"));
}
