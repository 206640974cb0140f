//! Startup classification for the daemon's free-text stdio
//!
//! The wallet daemon has no structured IPC: state is inferred from substrings
//! on stdout/stderr, and the same text means different things per invocation
//! (reaching the wallet-selection prompt fails a plain start but completes
//! `--enablerpcandconfigure`). Each call site therefore supplies its own
//! classifier from raw lines to a tagged event instead of re-interpreting
//! shared string patterns ad hoc.

/// Which stream a line arrived on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamSource {
    Stdout,
    Stderr,
}

/// Classified outcome of one daemon invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpawnEvent {
    /// The invocation reached its positive signal
    Started,
    /// The daemon stopped at the interactive wallet-selection prompt
    NeedsSelection,
    /// Negative signal: stderr output, or a prompt nobody can answer
    Failed(String),
}

/// Printed once the master RPC server is listening
pub const MASTER_RPC_MARKER: &str = "master rpc server";

/// Printed when the daemon waits for interactive wallet selection
pub const SELECTION_PROMPT_MARKER: &str = "enter your selection";

/// Printed when the default wallet bootstrap finished
pub const WALLET_CREATED_MARKER: &str = "default wallet created";

fn has_marker(line: &str, marker: &str) -> bool {
    line.to_lowercase().contains(marker)
}

/// Classifier for a plain daemon start.
///
/// The selection prompt only classifies when no password was supplied: the
/// daemon is then waiting for input it will never get. With a password the
/// prompt is not expected and the line is left to the polling fallback.
pub fn classify_start(
    line: &str,
    source: StreamSource,
    password_supplied: bool,
) -> Option<SpawnEvent> {
    match source {
        StreamSource::Stderr => Some(SpawnEvent::Failed(line.to_string())),
        StreamSource::Stdout => {
            if has_marker(line, MASTER_RPC_MARKER) {
                Some(SpawnEvent::Started)
            } else if has_marker(line, SELECTION_PROMPT_MARKER) && !password_supplied {
                Some(SpawnEvent::NeedsSelection)
            } else {
                None
            }
        }
    }
}

/// Classifier for `--createdefaultwallet`
pub fn classify_create(line: &str, source: StreamSource) -> Option<SpawnEvent> {
    match source {
        StreamSource::Stderr => Some(SpawnEvent::Failed(line.to_string())),
        StreamSource::Stdout => {
            has_marker(line, WALLET_CREATED_MARKER).then_some(SpawnEvent::Started)
        }
    }
}

/// Classifier for `--enablerpcandconfigure`.
///
/// Reaching the selection prompt means auto-configuration already finished,
/// so the event that fails a plain start is the success signal here.
pub fn classify_enable(line: &str, source: StreamSource) -> Option<SpawnEvent> {
    match source {
        StreamSource::Stderr => Some(SpawnEvent::Failed(line.to_string())),
        StreamSource::Stdout => {
            has_marker(line, SELECTION_PROMPT_MARKER).then_some(SpawnEvent::NeedsSelection)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_marker_is_case_insensitive() {
        for line in [
            "Master RPC server listening on 127.0.0.1:19119",
            "MASTER RPC SERVER up",
        ] {
            assert_eq!(
                classify_start(line, StreamSource::Stdout, false),
                Some(SpawnEvent::Started)
            );
        }
    }

    #[test]
    fn test_selection_prompt_without_password_is_terminal() {
        let line = "Please enter your selection:";
        assert_eq!(
            classify_start(line, StreamSource::Stdout, false),
            Some(SpawnEvent::NeedsSelection)
        );
        // with a password supplied the prompt does not classify
        assert_eq!(classify_start(line, StreamSource::Stdout, true), None);
    }

    #[test]
    fn test_any_stderr_is_fatal_for_start() {
        let event = classify_start("bind: address in use", StreamSource::Stderr, false);
        assert!(matches!(event, Some(SpawnEvent::Failed(_))));
    }

    #[test]
    fn test_unrelated_stdout_does_not_classify() {
        assert_eq!(
            classify_start("loading block headers...", StreamSource::Stdout, false),
            None
        );
    }

    #[test]
    fn test_create_wallet_marker() {
        assert_eq!(
            classify_create("Default wallet created.", StreamSource::Stdout),
            Some(SpawnEvent::Started)
        );
        assert_eq!(classify_create("working...", StreamSource::Stdout), None);
    }

    #[test]
    fn test_selection_prompt_asymmetry() {
        // the same line that ends a plain start is what enable waits for
        let line = "Please enter your selection:";
        assert_eq!(
            classify_start(line, StreamSource::Stdout, false),
            Some(SpawnEvent::NeedsSelection)
        );
        assert_eq!(
            classify_enable(line, StreamSource::Stdout),
            Some(SpawnEvent::NeedsSelection)
        );
    }
}
