//! User-facing notifications.
//!
//! The core never blocks on a notifier and never formats UI itself beyond
//! plain text; a GUI adapter can render these as dialogs, a batch driver can
//! log them, and headless runs use [NullNotifier].

use crate::error::Error;
use std::collections::BTreeSet;
use tracing::{error, info, warn};

/// Maximum number of unresolved labels listed in an enrichment report.
const MAX_REPORTED_LABELS: usize = 20;

/// Sink for user-visible messages.
pub trait UserNotifier {
    /// An informational message.
    fn info(&self, title: &str, message: &str);
    /// A warning; the job completed but imperfectly.
    fn warn(&self, title: &str, message: &str);
    /// An error; the job aborted.
    fn error(&self, title: &str, message: &str);
}

/// A notifier that discards everything; for headless use.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullNotifier;

impl UserNotifier for NullNotifier {
    fn info(&self, _title: &str, _message: &str) {}
    fn warn(&self, _title: &str, _message: &str) {}
    fn error(&self, _title: &str, _message: &str) {}
}

/// A notifier that routes messages to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl UserNotifier for LogNotifier {
    fn info(&self, title: &str, message: &str) {
        info!("{title}: {message}");
    }

    fn warn(&self, title: &str, message: &str) {
        warn!("{title}: {message}");
    }

    fn error(&self, title: &str, message: &str) {
        error!("{title}: {message}");
    }
}

/// Reports the outcome of a tree enrichment run.
///
/// On full success a single information notification is sent. Otherwise the
/// notifier receives a warning listing the first twenty unresolved labels,
/// a `"..."` suffix when the list was truncated, and the total count; the
/// wording reflects whether unresolved externals were deleted.
pub fn report_enrichment(
    notifier: &dyn UserNotifier,
    unresolved: &BTreeSet<String>,
    deleted: bool,
) {
    if unresolved.is_empty() {
        notifier.info("Taxonomy resolution completed", "All taxonomies could be resolved");
        return;
    }
    let mut message = String::from("Not all taxonomies could be resolved.\n");
    if unresolved.len() == 1 {
        if deleted {
            message.push_str("The following taxonomy was not found and deleted (if external):\n");
        } else {
            message.push_str("The following taxonomy was not found:\n");
        }
    } else if deleted {
        message.push_str(&format!(
            "The following taxonomies were not found and deleted (if external) (total: {}):\n",
            unresolved.len()
        ));
    } else {
        message.push_str(&format!(
            "The following taxonomies were not found (total: {}):\n",
            unresolved.len()
        ));
    }
    for label in unresolved.iter().take(MAX_REPORTED_LABELS) {
        message.push_str(label);
        message.push('\n');
    }
    if unresolved.len() > MAX_REPORTED_LABELS {
        message.push_str("...");
    }
    notifier.warn("Taxonomy resolution completed", &message);
}

/// Surfaces a job-aborting failure to the user.
///
/// Network problems get their own title so the user can tell connectivity
/// apart from bad data; everything else is reported as a plain failure.
pub fn report_failure(notifier: &dyn UserNotifier, err: &Error) {
    match err {
        Error::Network(_) => notifier.error(
            "Network error during taxonomic information gathering",
            &err.to_string(),
        ),
        Error::Cancelled => {}
        _ => notifier.error("Failed to obtain taxonomic information", &err.to_string()),
    }
}
