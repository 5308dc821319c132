//! Shared test utilities and fixtures
//!
//! Common infrastructure for integration tests.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::TempDir;

/// Timetable anchored on Monday 2025-09-01, with one exception of each kind.
pub const SCHEDULE_JSON: &str = r#"{
    "start_date": "2025-09-01",
    "odd_week": {
        "monday": [
            {"time": "09:00-10:30", "subject": "Математический анализ", "type": "Лекция", "room": "101", "teacher": "Иванов И.И."},
            {"time": "10:40-12:10", "subject": "Физика", "type": "Лабораторная", "room": "202", "teacher": "Петрова А.А."}
        ],
        "wednesday": [
            {"time": "13:00-14:30", "subject": "История", "type": "Семинар", "room": "303", "teacher": "Сидоров П.П."}
        ]
    },
    "even_week": {
        "monday": [
            {"time": "09:00-10:30", "subject": "Алгебра", "type": "Практика", "room": "104", "teacher": "Иванов И.И."}
        ],
        "wednesday": [
            {"time": "11:00-12:30", "subject": "Философия", "type": "Лекция", "room": "305", "teacher": "Орлов Д.С."}
        ]
    },
    "special_dates": {
        "2025-12-31": [],
        "2025-09-03": [
            {"time": "18:00-19:00", "subject": "День открытых дверей", "type": "Мероприятие", "room": "Актовый зал", "teacher": "Деканат"}
        ]
    }
}"#;

/// A temporary deployment: data directory, schedule, and empty credential file.
pub struct Fixture {
    pub dir: TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::create_dir_all(dir.path().join("data")).expect("data dir");
        fs::write(dir.path().join("data").join("schedule.json"), SCHEDULE_JSON)
            .expect("schedule");
        fs::write(dir.path().join("data").join("allowed_students.txt"), "")
            .expect("credential file");
        Self { dir }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn store_path(&self) -> PathBuf {
        self.root().join("data").join("allowed_students.txt")
    }

    pub fn schedule_path(&self) -> PathBuf {
        self.root().join("data").join("schedule.json")
    }

    pub fn write(&self, name: &str, content: &str) -> PathBuf {
        let path = self.root().join(name);
        fs::write(&path, content).expect("write fixture file");
        path
    }

    /// Run the binary with this fixture's paths and an isolated home.
    pub fn run(&self, args: &[&str]) -> Output {
        self.command(args).output().expect("spawn wiseacre")
    }

    pub fn command(&self, args: &[&str]) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_wiseacre"));
        cmd.current_dir(self.root())
            .env("HOME", self.root().join("home"))
            .env_remove("WISEACRE_CONFIG")
            .env_remove("RUST_LOG")
            .arg("--store")
            .arg(self.store_path())
            .arg("--schedule")
            .arg(self.schedule_path())
            .args(args);
        cmd
    }
}

pub fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

pub fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}
