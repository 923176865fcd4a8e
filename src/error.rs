//! Error taxonomy for sweep execution.
//!
//! | Error                   | Scope    | Recovery                              |
//! |-------------------------|----------|---------------------------------------|
//! | ExecutableNotFound      | sweep    | Fatal, raised before the first run    |
//! | InvalidConfig / axes    | sweep    | Fatal, raised at build time           |
//! | HeaderMismatch          | sweep    | Fatal, raised before the first run    |
//! | Io                      | sweep    | Fatal, results would be lost          |
//! | Spawn                   | run      | Log, skip row, continue               |
//! | MalformedOutput         | run      | Log, skip row (or NA), continue       |
//! | ChildProcessNonZeroExit | run      | Log and continue, or fatal if asked   |
//! | Timeout                 | run      | Kill child, log, continue             |

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T, E = SweepError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum SweepError {
    /// The program could not be resolved against the working directory or `PATH`.
    #[error("executable not found: {program} (searched from {searched})")]
    ExecutableNotFound { program: String, searched: PathBuf },

    #[error("invalid sweep configuration: {0}")]
    InvalidConfig(String),

    #[error("duplicate axis label `{0}`")]
    DuplicateAxis(String),

    #[error("axis `{0}` has no values")]
    EmptyAxis(String),

    #[error("failed to start {program} for [{combination}]: {source}")]
    Spawn {
        program: String,
        combination: String,
        #[source]
        source: std::io::Error,
    },

    /// Stdout did not contain anything the configured parser accepts.
    #[error("malformed output for [{combination}]: {output:?}")]
    MalformedOutput { combination: String, output: String },

    #[error("[{combination}] exited with {}", describe_exit(.code, .stderr))]
    ChildProcessNonZeroExit {
        combination: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("[{combination}] timed out after {seconds:.1}s")]
    Timeout { combination: String, seconds: f64 },

    #[error("existing header in {} does not match sweep columns (found `{found}`, expected `{expected}`)", path.display())]
    HeaderMismatch {
        path: PathBuf,
        found: String,
        expected: String,
    },

    /// Writing results failed; carries the combination being recorded, if any.
    #[error("output error on {} ({context}): {source}", path.display())]
    Io {
        path: PathBuf,
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl SweepError {
    /// Whether this failure only concerns a single run.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            SweepError::Spawn { .. }
                | SweepError::MalformedOutput { .. }
                | SweepError::ChildProcessNonZeroExit { .. }
                | SweepError::Timeout { .. }
        )
    }
}

fn describe_exit(code: &Option<i32>, stderr: &str) -> String {
    let status = match code {
        Some(c) => format!("code {c}"),
        None => "signal".to_string(),
    };
    match stderr.lines().rev().find(|l| !l.trim().is_empty()) {
        Some(l) => format!("{status}: {}", l.trim()),
        None => status,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_zero_exit_message_uses_last_stderr_line() {
        let err = SweepError::ChildProcessNonZeroExit {
            combination: "ts=8".into(),
            code: Some(3),
            stderr: "warming up\nbad tile size\n\n".into(),
        };
        assert_eq!(err.to_string(), "[ts=8] exited with code 3: bad tile size");
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_fatal_errors_are_not_recoverable() {
        let err = SweepError::ExecutableNotFound {
            program: "./run".into(),
            searched: PathBuf::from("."),
        };
        assert!(!err.is_recoverable());
    }
}
