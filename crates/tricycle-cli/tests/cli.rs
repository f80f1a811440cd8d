//! Runs the `tricycle` binary for the commands that need no database.

use std::process::Command;

fn tricycle(dir: &std::path::Path, args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_tricycle"))
        .args(args)
        .current_dir(dir)
        .env_remove("DATABASE_URL")
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run tricycle")
}

#[test]
fn test_sql_prints_bootstrap_script() {
    let tmp = tempfile::tempdir().unwrap();
    let out = tricycle(tmp.path(), &["sql"]);
    assert!(out.status.success());

    let stdout = String::from_utf8(out.stdout).unwrap();
    assert!(stdout.starts_with("CREATE TABLE IF NOT EXISTS public.clientes (\n  id integer PRIMARY KEY"));
    assert!(stdout.contains("CREATE TABLE IF NOT EXISTS public.tareas ("));
    assert!(stdout.contains("ENABLE ROW LEVEL SECURITY;"));
}

#[test]
fn test_tables_stay_in_public_schema() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(tmp.path().join(".config")).unwrap();
    std::fs::write(tmp.path().join(".config/tricycle.toml"), "schema = \"crm\"\n").unwrap();

    let out = tricycle(tmp.path(), &["sql"]);
    assert!(!out.status.success());
    let stderr = String::from_utf8(out.stderr).unwrap();
    assert!(stderr.contains("unknown field `schema`"), "{stderr}");

    std::fs::write(tmp.path().join(".config/tricycle.toml"), "rpc_schema = \"api\"\n").unwrap();
    let out = tricycle(tmp.path(), &["sql"]);
    assert!(out.status.success());
    let stdout = String::from_utf8(out.stdout).unwrap();
    assert!(stdout.contains("REFERENCES public.clientes(id)"));
    assert!(!stdout.contains("api."));
}

#[test]
fn test_log_filter_is_read_from_dotenv() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(tmp.path().join(".config")).unwrap();
    std::fs::write(tmp.path().join(".config/tricycle.toml"), "").unwrap();
    std::fs::write(tmp.path().join(".env"), "RUST_LOG=tricycle=debug\n").unwrap();

    let out = tricycle(tmp.path(), &["sql"]);
    assert!(out.status.success());
    let stderr = String::from_utf8(out.stderr).unwrap();
    assert!(stderr.contains("loaded config"), "{stderr}");
}

#[test]
fn test_schema_lists_tables() {
    let tmp = tempfile::tempdir().unwrap();
    let out = tricycle(tmp.path(), &["schema"]);
    assert!(out.status.success());
    let stdout = String::from_utf8(out.stdout).unwrap();
    assert!(stdout.contains("9 tables"));
    assert!(stdout.contains("facturas"));
}

#[test]
fn test_migrate_without_database_url_fails() {
    let tmp = tempfile::tempdir().unwrap();
    let out = tricycle(tmp.path(), &["migrate", "20240101_init"]);
    assert!(!out.status.success());
    let stderr = String::from_utf8(out.stderr).unwrap();
    assert!(stderr.contains("no database URL"), "{stderr}");
}

#[test]
fn test_bad_policy_is_rejected() {
    let tmp = tempfile::tempdir().unwrap();
    let out = tricycle(tmp.path(), &["--policy", "maybe", "sql"]);
    assert!(!out.status.success());
    let stderr = String::from_utf8(out.stderr).unwrap();
    assert!(stderr.contains("unknown apply policy"), "{stderr}");
}
