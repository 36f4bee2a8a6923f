//! Driver entry point: wires argv through `ccc-opts` → `ccc-pipeline` →
//! `ccc-bind` → (`ccc-diag` | `ccc-exec`), and maps every driver failure
//! mode to a process exit code.
//!
//! `run()` handles ALL output, including error messages; `main.rs` only
//! maps the returned code to `std::process::exit`.

use ccc_bind::{bind_all, BindError};
use ccc_config::{DriverConfig, EnvReader};
use ccc_diag::{format_dry_run, format_print_options, format_print_phases};
use ccc_opts::{ArgList, ParseError};
use ccc_pipeline::{build_pipeline, PipelineError, PipelineWarning};
use ccc_toolchain::HostInfoImpl;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

const DRIVER_NAME: &str = "ccc";

/// Options recognized only as a contiguous prefix of argv.
const CCC_HOOK_FLAGS: &[&str] = &[
    "-ccc-print-options",
    "-ccc-print-phases",
    "-ccc-no-driver-driver",
    "-ccc-cxx",
    "-ccc-clang",
    "-ccc-echo",
    "-ccc-fallback",
];
const CCC_HOOK_SEPARATE: &[&str] = &[
    "-ccc-host-bits",
    "-ccc-host-machine",
    "-ccc-host-system",
    "-ccc-host-release",
];

/// Immediate options that are recognized by the schema but whose actual
/// tool-backed implementation is out of scope for this core (process
/// spawning and real host/target detection live elsewhere). Exit code 1
/// marks these as recognized-but-unimplemented placeholders.
const UNIMPLEMENTED_IMMEDIATE_OPTIONS: &[&str] = &[
    "-dumpmachine",
    "-dumpspecs",
    "-dumpversion",
    "-print-file-name=",
    "-print-prog-name=",
    "-print-multi-directory",
    "-print-multi-lib",
    "-print-libgcc-file-name",
    "-print-search-dirs",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(i32);

impl ExitCode {
    pub const SUCCESS: ExitCode = ExitCode(0);
    pub const GENERIC_FAILURE: ExitCode = ExitCode(1);

    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self.0
    }

    #[must_use]
    pub const fn from_i32(code: i32) -> Self {
        ExitCode(code)
    }
}

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("{0}")]
    InvalidArguments(String),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error(transparent)]
    Bind(#[from] BindError),
    #[error("FIXME: '{0}' is recognized but not yet implemented")]
    ImmediateOptionUnimplemented(String),
    #[error(transparent)]
    Exec(#[from] ccc_exec::ExecError),
    /// The spawned tool exited non-zero; this carries no additional
    /// message, only the code to propagate.
    #[error("external tool failed")]
    ExternalToolFailure(i32),
}

impl DriverError {
    fn exit_code(&self) -> ExitCode {
        match self {
            DriverError::ExternalToolFailure(code) => ExitCode::from_i32(*code),
            _ => ExitCode::GENERIC_FAILURE,
        }
    }
}

/// Parsed `-ccc-*` testing hooks, stripped from argv before the rest of
/// the pipeline ever sees them.
#[derive(Debug, Default)]
struct CccHooks {
    print_options: bool,
    print_phases: bool,
    no_driver_driver: bool,
    cxx: bool,
    clang: bool,
    echo: bool,
    fallback: bool,
}

/// Splits the contiguous leading run of recognized `-ccc-*` hooks off of
/// argv. A hook appearing after the first non-hook token is an error
/// accepted only contiguously at the start of argv.
fn split_ccc_hooks(argv: &[String]) -> Result<(CccHooks, Vec<String>), DriverError> {
    let mut hooks = CccHooks::default();
    let mut i = 0;
    while i < argv.len() {
        let token = argv[i].as_str();
        if CCC_HOOK_FLAGS.contains(&token) {
            match token {
                "-ccc-print-options" => hooks.print_options = true,
                "-ccc-print-phases" => hooks.print_phases = true,
                "-ccc-no-driver-driver" => hooks.no_driver_driver = true,
                "-ccc-cxx" => hooks.cxx = true,
                "-ccc-clang" => hooks.clang = true,
                "-ccc-echo" => hooks.echo = true,
                "-ccc-fallback" => hooks.fallback = true,
                _ => unreachable!(),
            }
            i += 1;
        } else if CCC_HOOK_SEPARATE.contains(&token) {
            if i + 1 >= argv.len() {
                return Err(ParseError::MissingValue { option: "-ccc-host-*", expected: 1 }.into());
            }
            // The value itself is acknowledged but not wired to a real
            // host-detection service; no platform-specific HostInfo exists
            // in this core for it to override.
            i += 2;
        } else {
            break;
        }
    }
    let rest = &argv[i..];
    if let Some(stray) = rest.iter().find(|tok| {
        CCC_HOOK_FLAGS.contains(&tok.as_str()) || CCC_HOOK_SEPARATE.contains(&tok.as_str())
    }) {
        return Err(DriverError::InvalidArguments(format!(
            "'{stray}' is only recognized at the start of the command line"
        )));
    }
    Ok((hooks, rest.to_vec()))
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .try_init();
}

/// Run the driver over an explicit argv (excluding argv\[0\]). Prints all
/// output, including errors, and returns the process exit code.
pub fn run(argv: &[String]) -> Result<(), ExitCode> {
    init_tracing();
    match execute(argv) {
        Ok(()) => Ok(()),
        Err(DriverError::ExternalToolFailure(code)) => {
            if code == 0 {
                Ok(())
            } else {
                Err(ExitCode::from_i32(code))
            }
        }
        Err(err) => {
            eprintln!("{DRIVER_NAME}: {err}");
            Err(err.exit_code())
        }
    }
}

fn execute(argv: &[String]) -> Result<(), DriverError> {
    let (hooks, rest) = split_ccc_hooks(argv)?;

    let config = DriverConfig::discover().unwrap_or_default();
    let effective_echo = hooks.echo || config.ccc_echo || env_flag("CCC_ECHO");

    // `-ccc-clang`, `-ccc-cxx`, and `-ccc-fallback` (plus their config/env
    // equivalents) are accepted syntactically but select no behavior here;
    // see the Open Question in DESIGN.md.
    let _ = (hooks.clang, hooks.cxx, hooks.fallback, config.ccc_clang, config.ccc_fallback);

    let args = ArgList::parse(&rest)?;

    if let Some(option) = args.iter().find_map(|arg| {
        arg.option.and_then(|spec| {
            UNIMPLEMENTED_IMMEDIATE_OPTIONS
                .contains(&spec.name)
                .then(|| spec.name.to_string())
        })
    }) {
        return Err(DriverError::ImmediateOptionUnimplemented(option));
    }

    let default_arch = config.default_arch.clone().unwrap_or_else(|| "x86_64".to_string());
    let host = HostInfoImpl::new(default_arch)
        .with_driver_driver(!hooks.no_driver_driver && cfg!(target_os = "macos"));

    let pipeline = build_pipeline(&args, &host)?;
    for warning in &pipeline.warnings {
        report_warning(warning);
    }

    if hooks.print_options {
        println!("{}", format_print_options(&args));
        return Ok(());
    }
    if hooks.print_phases {
        println!("{}", format_print_phases(&pipeline.graph, &pipeline.top_level));
        return Ok(());
    }

    let jobs = bind_all(&pipeline.graph, &pipeline.top_level, &args, &host)?;

    if args.get_last_arg("-###").is_some() {
        eprintln!("{}", format_dry_run(&jobs));
        return Ok(());
    }

    if effective_echo {
        eprintln!("{}", format_dry_run(&jobs));
    }

    let outcome = ccc_exec::run_all(&jobs)?;
    if outcome.exit_code != 0 {
        return Err(DriverError::ExternalToolFailure(outcome.exit_code));
    }
    Ok(())
}

fn env_flag(name: &'static str) -> bool {
    EnvReader::process().bool_var(name).unwrap_or(false)
}

fn report_warning(warning: &PipelineWarning) {
    match warning {
        PipelineWarning::InputMissing(path) => {
            eprintln!("{DRIVER_NAME}: warning: input file '{}' does not exist, ignoring", path.display());
        }
        PipelineWarning::UnknownLanguage(lang) => {
            eprintln!("{DRIVER_NAME}: warning: language '{lang}' not recognized, treating as object");
        }
        PipelineWarning::InputUnused(path) => {
            eprintln!(
                "{DRIVER_NAME}: warning: '{}' was given on the command line but never used",
                path.display()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ccc_hooks_are_stripped_from_the_front_of_argv() {
        let argv = vec!["-ccc-echo".to_string(), "-c".to_string(), "foo.c".to_string()];
        let (hooks, rest) = split_ccc_hooks(&argv).unwrap();
        assert!(hooks.echo);
        assert_eq!(rest, vec!["-c".to_string(), "foo.c".to_string()]);
    }

    #[test]
    fn ccc_hook_after_other_arguments_is_rejected() {
        let argv = vec!["-c".to_string(), "-ccc-echo".to_string(), "foo.c".to_string()];
        assert!(matches!(split_ccc_hooks(&argv), Err(DriverError::InvalidArguments(_))));
    }

    #[test]
    fn ccc_host_hook_consumes_its_value() {
        let argv = vec![
            "-ccc-host-bits".to_string(),
            "64".to_string(),
            "-c".to_string(),
        ];
        let (_hooks, rest) = split_ccc_hooks(&argv).unwrap();
        assert_eq!(rest, vec!["-c".to_string()]);
    }

    #[test]
    fn no_input_files_without_dry_run_is_an_error() {
        let err = execute(&["-c".to_string()]).unwrap_err();
        assert!(matches!(err, DriverError::Pipeline(PipelineError::NoInputFiles)));
    }

    #[test]
    fn rejects_combine_as_invalid_arguments() {
        let err = execute(&["-combine".to_string(), "foo.c".to_string()]).unwrap_err();
        assert!(matches!(err, DriverError::Pipeline(PipelineError::NotImplemented(_))));
    }

    #[test]
    fn unimplemented_immediate_option_maps_to_fixme() {
        let err = execute(&["-dumpversion".to_string()]).unwrap_err();
        assert!(matches!(err, DriverError::ImmediateOptionUnimplemented(_)));
        assert_eq!(err.exit_code(), ExitCode::GENERIC_FAILURE);
    }
}
