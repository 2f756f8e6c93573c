// ABOUTME: Output formatting for CLI feedback.
// ABOUTME: Human, quiet and JSON renderings of progress, warnings and results.

use serde::Serialize;
use std::time::Instant;

/// How the CLI reports to its caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Progress lines plus the final result
    Normal,
    /// Final result only, for CI logs
    Quiet,
    /// One JSON document per line on stdout, errors as JSON on stderr
    Json,
}

/// Terminal event of a command in JSON mode.
#[derive(Serialize)]
#[serde(tag = "event", rename_all = "lowercase")]
enum Event<'a> {
    Success {
        message: &'a str,
        #[serde(skip_serializing_if = "Option::is_none")]
        duration_secs: Option<f64>,
    },
    Error {
        message: &'a str,
        #[serde(skip_serializing_if = "Option::is_none")]
        duration_secs: Option<f64>,
    },
}

pub struct Output {
    mode: OutputMode,
    started: Option<Instant>,
}

impl Output {
    pub fn new(mode: OutputMode) -> Self {
        Self {
            mode,
            started: None,
        }
    }

    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    /// Report durations from now on.
    pub fn start_timer(&mut self) {
        self.started = Some(Instant::now());
    }

    fn elapsed(&self) -> Option<f64> {
        self.started.map(|t| t.elapsed().as_secs_f64())
    }

    /// Step detail; Normal mode only.
    pub fn progress(&self, message: &str) {
        if self.mode == OutputMode::Normal {
            println!("{message}");
        }
    }

    /// JSON mode leaves warnings to the result document.
    pub fn warning(&self, message: &str) {
        if self.mode != OutputMode::Json {
            eprintln!("Warning: {message}");
        }
    }

    pub fn success(&self, message: &str) {
        match (self.mode, self.elapsed()) {
            (OutputMode::Normal, Some(secs)) => println!("{message} ({secs:.1}s)"),
            (OutputMode::Normal | OutputMode::Quiet, _) => println!("{message}"),
            (OutputMode::Json, duration_secs) => self.json(&Event::Success {
                message,
                duration_secs,
            }),
        }
    }

    pub fn error(&self, message: &str) {
        if self.mode != OutputMode::Json {
            eprintln!("Error: {message}");
            return;
        }
        let event = Event::Error {
            message,
            duration_secs: self.elapsed(),
        };
        if let Ok(json) = serde_json::to_string(&event) {
            eprintln!("{json}");
        }
    }

    /// Print a result document on stdout as one JSON line.
    pub fn json<T: Serialize>(&self, value: &T) {
        match serde_json::to_string(value) {
            Ok(json) => println!("{json}"),
            Err(e) => eprintln!("Error: failed to encode output: {e}"),
        }
    }
}
