//! Sequential execution of a bound [`JobList`]. The core is
//! single-threaded and non-suspending: jobs run one at a time, waiting for
//! each to finish, and a non-zero exit short-circuits the rest.

use ccc_phases::{Job, JobList};
use std::process::Command;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("failed to spawn '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("piped job execution is not implemented")]
    NotImplemented,
}

/// Outcome of running a [`JobList`] to completion or to the first failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecOutcome {
    /// The first non-zero exit code encountered, or 0 if every command
    /// succeeded.
    pub exit_code: i32,
}

/// Run every job in order. Stops at (and reports) the first command whose
/// exit code is non-zero; later jobs never run.
///
/// # Errors
///
/// Returns [`ExecError::Spawn`] if a command cannot even be launched, and
/// [`ExecError::NotImplemented`] if a [`Job::Piped`] chain is reached (pipe
/// execution is out of scope for this revision).
pub fn run_all(jobs: &JobList) -> Result<ExecOutcome, ExecError> {
    for job in jobs.iter() {
        let code = run_one(job)?;
        if code != 0 {
            tracing::warn!(exit_code = code, "external command failed, stopping");
            return Ok(ExecOutcome { exit_code: code });
        }
    }
    Ok(ExecOutcome { exit_code: 0 })
}

fn run_one(job: &Job) -> Result<i32, ExecError> {
    match job {
        Job::Command { executable, arguments } => {
            tracing::debug!(?executable, ?arguments, "spawning command");
            let status = Command::new(executable)
                .args(arguments)
                .status()
                .map_err(|source| ExecError::Spawn {
                    command: executable.display().to_string(),
                    source,
                })?;
            Ok(status.code().unwrap_or(1))
        }
        Job::Piped(_) => Err(ExecError::NotImplemented),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn successful_command_reports_zero_exit_code() {
        let mut jobs = JobList::new();
        jobs.push(Job::Command {
            executable: PathBuf::from("true"),
            arguments: vec![],
        });
        let outcome = run_all(&jobs).unwrap();
        assert_eq!(outcome.exit_code, 0);
    }

    #[test]
    fn failing_command_short_circuits_remaining_jobs() {
        let mut jobs = JobList::new();
        jobs.push(Job::Command {
            executable: PathBuf::from("false"),
            arguments: vec![],
        });
        jobs.push(Job::Command {
            executable: PathBuf::from("this-should-never-run"),
            arguments: vec![],
        });
        let outcome = run_all(&jobs).unwrap();
        assert_ne!(outcome.exit_code, 0);
    }

    #[test]
    fn piped_job_is_not_implemented() {
        let mut jobs = JobList::new();
        jobs.push(Job::Piped(vec![Job::Command {
            executable: PathBuf::from("true"),
            arguments: vec![],
        }]));
        assert!(matches!(run_all(&jobs), Err(ExecError::NotImplemented)));
    }

    #[test]
    fn unknown_executable_surfaces_as_spawn_error() {
        let mut jobs = JobList::new();
        jobs.push(Job::Command {
            executable: PathBuf::from("/definitely/not/a/real/executable"),
            arguments: vec![],
        });
        assert!(matches!(run_all(&jobs), Err(ExecError::Spawn { .. })));
    }
}
