//! Operator filter editing from stdin.
//!
//! Each input line replaces the active filter query. An empty line clears
//! it. A query with a syntax error is echoed back with a caret under the
//! failing position and the previous filter stays active.
//!
//! ```text
//! [stdin thread] --lines--> mpsc --> [FilterEditor] --> ActiveFilter::replace()
//!                                          |
//!                                          +--> feedback (stderr)
//! ```
//!
//! Stdin is read on a plain OS thread: a blocked `read` on a runtime
//! blocking-pool thread would hold up runtime shutdown.

use std::io::{BufRead, Write};
use std::sync::Arc;

use syslens_log_pipeline::filter::{ActiveFilter, FilterSyntaxError};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Capacity of the line channel between the stdin thread and the editor.
const LINE_CHANNEL_CAPACITY: usize = 16;

/// Result of applying one input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOutcome {
    /// The query compiled and is now active.
    Applied(String),
    /// The filter was cleared (every event passes).
    Cleared,
    /// The query was rejected; the previous filter is still active.
    Rejected(FilterSyntaxError),
}

/// Applies operator input lines to a shared [`ActiveFilter`].
pub struct FilterEditor<W> {
    filter: Arc<ActiveFilter>,
    out: W,
}

impl<W: Write> FilterEditor<W> {
    /// Create an editor writing feedback to `out`.
    pub fn new(filter: Arc<ActiveFilter>, out: W) -> Self {
        Self { filter, out }
    }

    /// Apply one line of input and write feedback.
    pub fn apply_line(&mut self, line: &str) -> EditOutcome {
        let query = line.trim_end_matches(['\r', '\n']);

        let outcome = if query.trim().is_empty() {
            self.filter.clear();
            EditOutcome::Cleared
        } else {
            match self.filter.replace(query) {
                Ok(filter) => EditOutcome::Applied(filter.query().to_owned()),
                Err(e) => EditOutcome::Rejected(e),
            }
        };

        self.report(query, &outcome);
        outcome
    }

    fn report(&mut self, query: &str, outcome: &EditOutcome) {
        let written = match outcome {
            EditOutcome::Applied(q) => writeln!(self.out, "filter: {q}"),
            EditOutcome::Cleared => writeln!(self.out, "filter: (none)"),
            EditOutcome::Rejected(e) => writeln!(
                self.out,
                "filter error, previous filter kept\n  {query}\n  {}",
                e.caret(query)
            ),
        };
        if let Err(e) = written.and_then(|()| self.out.flush()) {
            tracing::debug!(error = %e, "failed to write filter feedback");
        }
    }

    /// Apply lines until the channel closes or `cancel` fires.
    ///
    /// Returns the feedback writer.
    pub async fn run(mut self, mut lines: mpsc::Receiver<String>, cancel: CancellationToken) -> W {
        tracing::debug!("filter editor started");
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::debug!("filter editor shutting down");
                    break;
                }
                line = lines.recv() => {
                    match line {
                        Some(line) => {
                            self.apply_line(&line);
                        }
                        None => {
                            tracing::info!("filter input closed, keeping current filter");
                            break;
                        }
                    }
                }
            }
        }
        self.out
    }
}

/// Start a detached thread forwarding stdin lines to a channel.
///
/// The channel closes at end of input or on a read error.
pub fn spawn_stdin_reader() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel(LINE_CHANNEL_CAPACITY);
    let spawned = std::thread::Builder::new()
        .name("syslens-stdin".to_owned())
        .spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                match line {
                    Ok(line) => {
                        if tx.blocking_send(line).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "failed to read stdin");
                        break;
                    }
                }
            }
        });
    if let Err(e) = spawned {
        tracing::warn!(error = %e, "failed to spawn stdin reader, filter editing disabled");
    }
    rx
}
