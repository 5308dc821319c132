//! Command-line behaviour of the `wiseacre` binary.

use std::io::Write;
use std::process::Stdio;

use crate::common::{Fixture, stderr, stdout};

#[test]
fn provision_claim_and_stats() {
    let fx = Fixture::new();
    let list = fx.write("ids.txt", "111\n222\n\n222\n333\n");

    let out = fx.run(&["provision", list.to_str().unwrap()]);
    assert!(out.status.success(), "{}", stderr(&out));
    assert_eq!(stdout(&out), "added: 3\nskipped: 1\n");

    let out = fx.run(&["add", "111"]);
    assert_eq!(stdout(&out).trim(), "already provisioned");

    let out = fx.run(&["check", "222"]);
    assert!(out.status.success());
    let out = fx.run(&["check", "999"]);
    assert_eq!(out.status.code(), Some(1));
    assert_eq!(stdout(&out).trim(), "not provisioned");

    let out = fx.run(&["claim", "222", "--as", "alice"]);
    assert!(out.status.success());
    assert_eq!(stdout(&out).trim(), "claimed by alice");

    let out = fx.run(&["claim", "222", "--as", "bob"]);
    assert_eq!(out.status.code(), Some(1));
    assert_eq!(stdout(&out).trim(), "already claimed by alice");

    let out = fx.run(&["stats"]);
    assert_eq!(stdout(&out), "total: 3\nfree: 2\nclaimed: 1\n");
}

#[test]
fn schedule_by_date_literal() {
    let fx = Fixture::new();

    let out = fx.run(&["schedule", "08.09.2025"]);
    assert!(out.status.success(), "{}", stderr(&out));
    let text = stdout(&out);
    assert!(text.contains("08.09.2025 (понедельник)"));
    assert!(text.contains("🗓 чётная неделя"));
    assert!(text.contains("📘 Алгебра"));

    let out = fx.run(&["schedule", "31-10-2025"]);
    assert_eq!(out.status.code(), Some(2));
    assert!(stderr(&out).contains("31-10-2025"));
}

#[test]
fn validate_reports_both_sources() {
    let fx = Fixture::new();
    fx.run(&["add", "12345"]);

    let out = fx.run(&["validate"]);
    assert!(out.status.success(), "{}", stderr(&out));
    let text = stdout(&out);
    assert!(text.contains("start 2025-09-01, 2 exception dates"));
    assert!(text.contains("flat_file"));
    assert!(text.contains("1 credentials, 1 free"));
}

#[test]
fn missing_schedule_is_fatal() {
    let fx = Fixture::new();
    std::fs::remove_file(fx.schedule_path()).unwrap();
    let out = fx.run(&["validate"]);
    assert_eq!(out.status.code(), Some(2));
    assert!(stderr(&out).contains("failed to load schedule"));
}

#[test]
fn config_file_selects_sqlite_backend() {
    let fx = Fixture::new();
    let db = fx.root().join("data").join("claims.db");
    let config = fx.write(
        "wiseacre.toml",
        &format!(
            "[storage]\nbackend = \"sqlite\"\npath = {:?}\n",
            db.to_str().unwrap()
        ),
    );

    // --store would override the configured path, so drive the binary directly.
    let run = |args: &[&str]| {
        std::process::Command::new(env!("CARGO_BIN_EXE_wiseacre"))
            .current_dir(fx.root())
            .env("HOME", fx.root().join("home"))
            .env_remove("WISEACRE_STORE")
            .arg("--config")
            .arg(&config)
            .arg("--schedule")
            .arg(fx.schedule_path())
            .args(args)
            .output()
            .unwrap()
    };

    assert!(run(&["add", "42"]).status.success());
    assert_eq!(stdout(&run(&["stats"])), "total: 1\nfree: 1\nclaimed: 0\n");
    assert!(db.exists());
}

#[test]
fn chat_session_over_stdin() {
    let fx = Fixture::new();
    fx.run(&["add", "12345"]);

    let mut child = fx
        .command(&["chat", "--requester", "7", "--name", "alice"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .unwrap();
    child
        .stdin
        .take()
        .unwrap()
        .write_all("/schedule\n00000\n12345\n/schedule 31.12.2025\n/quit\n".as_bytes())
        .unwrap();
    let out = child.wait_with_output().unwrap();
    assert!(out.status.success(), "{}", stderr(&out));

    let text = stdout(&out);
    assert!(text.contains("🔐 Для доступа к функциям"));
    assert!(text.contains("Номер студбилета не найден"));
    assert!(text.contains("✅ Аутентификация успешна!"));
    assert!(text.contains("📅 31.12.2025 (среда)\nПар нет 🎉"));

    let out = fx.run(&["claim", "12345", "--as", "bob"]);
    assert_eq!(stdout(&out).trim(), "already claimed by alice [7]");
}
