// SPDX-FileCopyrightText: Copyright © 2020-2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! File-backed audit log (§6, §12): one JSON value per line, appended
//! under a process-wide lock so concurrent writers from the Scheduler's
//! worker pool never interleave a single record's bytes.

use std::{
    io::Write,
    path::PathBuf,
    sync::Mutex,
};

use fs_err::{self as fs, File};
use kiln_engine::AuditSink;
use tracing::warn;

pub struct FileAuditSink {
    writer: Mutex<File>,
}

impl FileAuditSink {
    pub fn open(path: impl Into<PathBuf>) -> std::io::Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = fs::OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self { writer: Mutex::new(file) })
    }
}

impl AuditSink for FileAuditSink {
    fn append(&self, record: serde_json::Value) {
        let Ok(mut line) = serde_json::to_vec(&record) else {
            warn!("audit record is not serializable, dropping");
            return;
        };
        line.push(b'\n');

        let mut writer = self.writer.lock().unwrap();
        if let Err(err) = writer.write_all(&line) {
            warn!(%err, "failed to append audit record");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appends_one_line_per_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");
        let sink = FileAuditSink::open(&path).unwrap();

        sink.append(serde_json::json!({"install": "foo"}));
        sink.append(serde_json::json!({"install": "bar"}));

        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 2);
    }
}
