//! Structured command journals
//!
//! Append-only log files for executed commands, downloads, and confirmed
//! arbitrary executions. Concurrent writers serialize through a single
//! lock so records never interleave. Write failures are logged and
//! swallowed — journaling must never break a handler flow.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::exec::CommandOutput;

/// Truncation limit for stdout/stderr fields in command records
const OUTPUT_LIMIT: usize = 400;

/// Truncation limit for output fields in arbitrary-command records
const ARBITRARY_LIMIT: usize = 200;

/// Append-only journals for the three command categories
pub struct CommandJournal {
    commands_log: PathBuf,
    downloads_log: PathBuf,
    arbitrary_log: PathBuf,
    lock: Mutex<()>,
}

impl CommandJournal {
    /// Create a journal writing into the given directory
    #[must_use]
    pub fn new(dir: &Path) -> Self {
        Self {
            commands_log: dir.join("commands.log"),
            downloads_log: dir.join("downloads.log"),
            arbitrary_log: dir.join("arbitrary_commands.log"),
            lock: Mutex::new(()),
        }
    }

    /// Record a command execution (whitelisted or high-level)
    #[allow(clippy::too_many_arguments)]
    pub fn log_command(
        &self,
        utterance: &str,
        mode: &str,
        command: &str,
        args: &[String],
        code: i32,
        stdout: &str,
        stderr: &str,
        note: &str,
    ) {
        let entry = format!(
            "{}\tMODE={mode}\tUTTERANCE={utterance}\tCMD={command}\tARGS={}\tRC={code}\tSTDOUT={}\tSTDERR={}\tNOTE={note}",
            timestamp(),
            args.join(" "),
            truncate(stdout, OUTPUT_LIMIT),
            truncate(stderr, OUTPUT_LIMIT),
        );
        self.write_line(&self.commands_log, &entry);
    }

    /// Record a download attempt
    pub fn log_download(
        &self,
        utterance: &str,
        query_or_url: &str,
        filename: &str,
        code: i32,
        note: &str,
    ) {
        let entry = format!(
            "{}\tUTTERANCE={utterance}\tQUERY_OR_URL={query_or_url}\tSAVED_AS={filename}\tRC={code}\tNOTE={note}",
            timestamp(),
        );
        self.write_line(&self.downloads_log, &entry);
    }

    /// Record an arbitrary-command decision and outcome
    ///
    /// Mirrors into the commands journal so one file holds the complete
    /// execution history.
    pub fn log_arbitrary(
        &self,
        utterance: &str,
        confirmed: bool,
        outcome: Option<&CommandOutput>,
        note: &str,
    ) {
        let (code, stdout, stderr) = outcome.map_or_else(
            || ("none".to_string(), String::new(), String::new()),
            |o| (o.code.to_string(), o.stdout.clone(), o.stderr.clone()),
        );
        let entry = format!(
            "{}\tUTTERANCE={utterance}\tCONFIRMED={confirmed}\tRC={code}\tSTDOUT={}\tSTDERR={}\tNOTE={note}",
            timestamp(),
            truncate(&stdout, ARBITRARY_LIMIT),
            truncate(&stderr, ARBITRARY_LIMIT),
        );
        self.write_line(&self.arbitrary_log, &entry);
        self.write_line(&self.commands_log, &format!("ARBITRARY {entry}"));
    }

    /// Append one line under the journal lock
    fn write_line(&self, path: &Path, line: &str) {
        let _guard = self.lock.lock().unwrap_or_else(std::sync::PoisonError::into_inner);

        let result = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .and_then(|mut f| writeln!(f, "{line}"));

        if let Err(e) = result {
            tracing::warn!(path = %path.display(), error = %e, "journal write failed");
        }
    }
}

/// Current local time, second precision
fn timestamp() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Truncate a field for journaling, marking elided content
#[must_use]
pub fn truncate(s: &str, limit: usize) -> String {
    if s.len() <= limit {
        s.to_string()
    } else {
        let mut cut = limit;
        while !s.is_char_boundary(cut) {
            cut -= 1;
        }
        format!("{} ...[truncated]", &s[..cut])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_entry_fields() {
        let dir = tempfile::tempdir().unwrap();
        let journal = CommandJournal::new(dir.path());

        journal.log_command(
            "ping google",
            "WHITELIST",
            "ping",
            &["-n".to_string(), "1".to_string(), "google".to_string()],
            0,
            "reply from host",
            "",
            "",
        );

        let content = std::fs::read_to_string(dir.path().join("commands.log")).unwrap();
        assert!(content.contains("MODE=WHITELIST"));
        assert!(content.contains("CMD=ping"));
        assert!(content.contains("ARGS=-n 1 google"));
        assert!(content.contains("RC=0"));
    }

    #[test]
    fn test_download_entry() {
        let dir = tempfile::tempdir().unwrap();
        let journal = CommandJournal::new(dir.path());

        journal.log_download("download despacito from youtube", "despacito", "", -1, "downloads_disabled");

        let content = std::fs::read_to_string(dir.path().join("downloads.log")).unwrap();
        assert!(content.contains("QUERY_OR_URL=despacito"));
        assert!(content.contains("NOTE=downloads_disabled"));
    }

    #[test]
    fn test_arbitrary_mirrors_into_commands_log() {
        let dir = tempfile::tempdir().unwrap();
        let journal = CommandJournal::new(dir.path());

        journal.log_arbitrary("echo hi", false, None, "user declined");

        let arbitrary = std::fs::read_to_string(dir.path().join("arbitrary_commands.log")).unwrap();
        assert!(arbitrary.contains("CONFIRMED=false"));

        let commands = std::fs::read_to_string(dir.path().join("commands.log")).unwrap();
        assert!(commands.contains("ARBITRARY "));
    }

    #[test]
    fn test_truncate_marks_elision() {
        let long = "x".repeat(500);
        let out = truncate(&long, 400);
        assert!(out.ends_with("...[truncated]"));
        assert!(out.len() < long.len());

        assert_eq!(truncate("short", 400), "short");
    }
}
