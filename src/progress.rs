//! Index build progress reporting.
//!
//! Reports observable progress during `medrag index` so users see which
//! phase the build is in and how many chunks are left to embed. Progress is
//! emitted on **stderr** so stdout remains parseable for scripts.

use std::io::Write;

/// A single progress event for an index build.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IndexProgressEvent {
    /// The dataset file is being parsed.
    Reading { path: String },
    /// Chunks embedded so far out of the total.
    Embedding { n: u64, total: u64 },
    /// The finished index is being persisted.
    Writing { chunks: u64 },
}

/// Reports build progress. Implementations write to stderr (human or JSON).
pub trait IndexProgressReporter: Send + Sync {
    fn report(&self, event: IndexProgressEvent);
}

/// Human-friendly progress on stderr: "index  embedding  1,234 / 5,000 chunks".
pub struct StderrProgress;

impl IndexProgressReporter for StderrProgress {
    fn report(&self, event: IndexProgressEvent) {
        let line = match &event {
            IndexProgressEvent::Reading { path } => format!("index  reading {}...\n", path),
            IndexProgressEvent::Embedding { n, total } => format!(
                "index  embedding  {} / {} chunks\n",
                format_number(*n),
                format_number(*total)
            ),
            IndexProgressEvent::Writing { chunks } => {
                format!("index  writing {} chunks\n", format_number(*chunks))
            }
        };
        let mut err = std::io::stderr().lock();
        let _ = err.write_all(line.as_bytes());
        let _ = err.flush();
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl JsonProgress {
    fn to_json(event: &IndexProgressEvent) -> serde_json::Value {
        match event {
            IndexProgressEvent::Reading { path } => serde_json::json!({
                "event": "progress",
                "phase": "reading",
                "path": path
            }),
            IndexProgressEvent::Embedding { n, total } => serde_json::json!({
                "event": "progress",
                "phase": "embedding",
                "n": n,
                "total": total
            }),
            IndexProgressEvent::Writing { chunks } => serde_json::json!({
                "event": "progress",
                "phase": "writing",
                "chunks": chunks
            }),
        }
    }
}

impl IndexProgressReporter for JsonProgress {
    fn report(&self, event: IndexProgressEvent) {
        if let Ok(line) = serde_json::to_string(&Self::to_json(&event)) {
            let mut err = std::io::stderr().lock();
            let _ = writeln!(err, "{}", line);
            let _ = err.flush();
        }
    }
}

/// No-op reporter when progress is disabled.
pub struct NoProgress;

impl IndexProgressReporter for NoProgress {
    fn report(&self, _event: IndexProgressEvent) {}
}

pub fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + (s.len() - 1) / 3);
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result.chars().rev().collect()
}

/// Progress mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq, clap::ValueEnum)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Default: human progress when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    pub fn reporter(&self) -> Box<dyn IndexProgressReporter> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_number_comma() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(4_999), "4,999");
        assert_eq!(format_number(1_234_567), "1,234,567");
    }

    #[test]
    fn json_event_shape() {
        let v = JsonProgress::to_json(&IndexProgressEvent::Embedding { n: 64, total: 100 });
        assert_eq!(v["phase"], "embedding");
        assert_eq!(v["n"], 64);
        assert_eq!(v["total"], 100);
    }
}
