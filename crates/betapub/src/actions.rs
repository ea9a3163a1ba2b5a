//! GitHub Actions workflow commands.
//!
//! The runner parses `::command::message` lines on stdout. Message data must
//! have `%`, `\r` and `\n` percent-encoded so multi-line text stays one command.

use std::io::{self, Write};

use crate::engine::Reporter;

/// Percent-encode workflow command data.
pub fn escape_data(msg: &str) -> String {
    msg.replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

/// Format a single workflow command line (without trailing newline).
pub fn workflow_command(command: &str, msg: &str) -> String {
    format!("::{command}::{}", escape_data(msg))
}

/// [`Reporter`] that speaks workflow commands to a writer (stdout by default).
pub struct ActionsReporter<W: Write = io::Stdout> {
    out: W,
}

impl ActionsReporter {
    pub fn stdout() -> Self {
        Self { out: io::stdout() }
    }
}

impl<W: Write> ActionsReporter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn line(&mut self, line: &str) {
        // Nowhere left to report a broken stdout.
        let _ = writeln!(self.out, "{line}");
    }
}

impl<W: Write> Reporter for ActionsReporter<W> {
    fn info(&mut self, msg: &str) {
        self.line(msg);
    }

    fn warn(&mut self, msg: &str) {
        self.line(&workflow_command("warning", msg));
    }

    fn error(&mut self, msg: &str) {
        self.line(&workflow_command("error", msg));
    }

    fn notice(&mut self, msg: &str) {
        self.line(&workflow_command("notice", msg));
    }

    fn group(&mut self, title: &str) {
        self.line(&workflow_command("group", title));
    }

    fn end_group(&mut self) {
        self.line("::endgroup::");
    }

    /// Command output is fenced with `::stop-commands::` so a line starting
    /// with `::` is printed, not executed.
    fn output(&mut self, text: &str) {
        let token = stop_token();
        self.line(&workflow_command("stop-commands", &token));
        self.line(text);
        self.line(&format!("::{token}::"));
    }

    fn mask(&mut self, secret: &str) {
        if !secret.is_empty() {
            self.line(&workflow_command("add-mask", secret));
        }
    }
}

fn stop_token() -> String {
    format!("betapub-{:016x}", rand::random::<u64>())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(f: impl FnOnce(&mut ActionsReporter<Vec<u8>>)) -> String {
        let mut reporter = ActionsReporter::new(Vec::new());
        f(&mut reporter);
        String::from_utf8(reporter.into_inner()).expect("utf8")
    }

    #[test]
    fn escape_data_encodes_percent_and_newlines() {
        assert_eq!(escape_data("100%\r\ndone"), "100%25%0D%0Adone");
        assert_eq!(escape_data("plain"), "plain");
    }

    #[test]
    fn percent_is_encoded_before_newlines() {
        // A literal "%0A" in the input must not turn into a newline.
        assert_eq!(escape_data("%0A"), "%250A");
    }

    #[test]
    fn notice_is_a_single_line() {
        let out = output(|r| r.notice("pkg\n\n  * npm install pkg@1.0.0"));
        assert_eq!(out, "::notice::pkg%0A%0A  * npm install pkg@1.0.0\n");
    }

    #[test]
    fn group_and_end_group() {
        let out = output(|r| {
            r.group("Publish pkg");
            r.info("working");
            r.end_group();
        });
        assert_eq!(out, "::group::Publish pkg\nworking\n::endgroup::\n");
    }

    #[test]
    fn warn_and_error_use_annotation_commands() {
        let out = output(|r| {
            r.warn("careful");
            r.error("boom");
        });
        assert_eq!(out, "::warning::careful\n::error::boom\n");
    }

    #[test]
    fn output_is_fenced_from_command_processing() {
        let out = output(|r| r.output("::set-output name=x::y\nnpm notice done"));
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 4);

        let token = lines[0]
            .strip_prefix("::stop-commands::")
            .expect("stop-commands first");
        assert!(token.starts_with("betapub-"));
        assert_eq!(lines[1], "::set-output name=x::y");
        assert_eq!(lines[2], "npm notice done");
        assert_eq!(lines[3], format!("::{token}::"));
    }

    #[test]
    fn output_tokens_differ_between_calls() {
        let out = output(|r| {
            r.output("a");
            r.output("b");
        });
        let starts: Vec<&str> = out
            .lines()
            .filter_map(|l| l.strip_prefix("::stop-commands::"))
            .collect();
        assert_eq!(starts.len(), 2);
        assert_ne!(starts[0], starts[1]);
    }

    #[test]
    fn mask_skips_empty_secrets() {
        let out = output(|r| {
            r.mask("");
            r.mask("npm_abc");
        });
        assert_eq!(out, "::add-mask::npm_abc\n");
    }
}
