use snapbox::{
    cmd::{Command, cargo_bin},
    str,
};
use tempfile::tempdir;

#[test]
fn list_tables() {
    Command::new(cargo_bin!("lazytable"))
        .env_remove("RUST_LOG")
        .args(["--data-dir", "fixtures/data", "list"])
        .assert()
        .success()
        .stdout_eq(str![[r#"
cities (5 rows)
people (12 rows)
2 table(s), 17 row(s), loaded in [..]ms

"#]]);
}

#[test]
fn list_tables_alias() {
    Command::new(cargo_bin!("lazytable"))
        .env_remove("RUST_LOG")
        .args(["--data-dir", "fixtures/data", "ls"])
        .assert()
        .success();
}

#[test]
fn list_tables_failed() {
    let dir = tempdir().unwrap();
    let non_exist = dir.path().join("non_exist");
    let path = non_exist.to_string_lossy();
    let output = Command::new(cargo_bin!("lazytable"))
        .env_remove("RUST_LOG")
        .args(["--no-color", "--data-dir", &path, "list"])
        .output()
        .unwrap();
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("failed to load tables"), "{stdout}");
    assert!(stdout.contains("failed to read data directory"), "{stdout}");
}

#[test]
fn zero_page_size_fails_to_start() {
    let output = Command::new(cargo_bin!("lazytable"))
        .env_remove("RUST_LOG")
        .args([
            "--no-color",
            "--bind",
            "127.0.0.1:0",
            "--data-dir",
            "fixtures/data",
            "--page-size",
            "0",
        ])
        .output()
        .unwrap();
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("failed to start the server"), "{stdout}");
}
