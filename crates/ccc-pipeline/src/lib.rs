//! Turns a parsed argument list into an action graph: classifying inputs,
//! folding each into its phase sequence, aggregating link inputs, and (on
//! hosts that want it) multiplying the whole thing across architectures.

use ccc_opts::ArgList;
use ccc_phases::{Action, ActionGraph, ActionId, Phase};
use ccc_toolchain::HostInfo;
use ccc_types::{classify_by_specifier, classify_by_suffix, FileType};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PipelineError {
    #[error("{0}")]
    InvalidArguments(String),
    #[error("no input files")]
    NoInputFiles,
    #[error("{0}")]
    NotImplemented(String),
}

/// A non-fatal condition recorded while building the pipeline. None of
/// these abort the build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineWarning {
    InputMissing(PathBuf),
    UnknownLanguage(String),
    InputUnused(PathBuf),
}

#[derive(Debug, Clone)]
pub struct PipelineResult {
    pub graph: ActionGraph,
    pub top_level: Vec<ActionId>,
    pub warnings: Vec<PipelineWarning>,
}

/// Mode flags derived from the command line that decide the final phase
/// and whether the compile phase produces `Nothing`.
struct Mode {
    final_phase: Phase,
    syntax_only: bool,
}

fn derive_mode(args: &ArgList) -> Mode {
    let explicit_preprocess = args.get_last_arg("-E").is_some();
    let syntax_only = args.get_last_arg("-fsyntax-only").is_some();
    let assemble_stop = args.get_last_arg("-S").is_some();
    let object_stop = args.get_last_arg("-c").is_some();
    let final_phase = Phase::final_phase_for_mode(
        explicit_preprocess,
        syntax_only,
        object_stop,
        assemble_stop,
    )
    .unwrap_or(Phase::PostAssemble);
    Mode { final_phase, syntax_only }
}

fn phase_sequence(file_type: FileType) -> Vec<Phase> {
    let mut seq = Vec::new();
    if file_type.needs_preprocess() {
        seq.push(Phase::Preprocess);
    }
    if file_type == FileType::Object {
        seq.push(Phase::Link);
    } else if file_type.only_assemble() {
        seq.push(Phase::Assemble);
        seq.push(Phase::Link);
    } else if file_type.only_precompile() {
        seq.push(Phase::Precompile);
    } else {
        seq.push(Phase::Compile);
        seq.push(Phase::Assemble);
        seq.push(Phase::Link);
    }
    seq
}

fn output_type_for_phase(phase: Phase, input_type: FileType, syntax_only: bool) -> FileType {
    match phase {
        Phase::Preprocess => input_type.preprocess_target().unwrap_or(input_type),
        Phase::Precompile => FileType::PCH,
        Phase::Compile => {
            if syntax_only {
                FileType::Nothing
            } else {
                FileType::AsmNoPP
            }
        }
        Phase::Assemble => FileType::Object,
        Phase::Link | Phase::Lipo | Phase::PostAssemble => FileType::Image,
    }
}

struct ClassifiedInput {
    path: PathBuf,
    file_type: FileType,
    /// Linker-input-shaped args (`-l`, `-filelist`, `-Xlinker`) bypass the
    /// existence check; their "path" isn't necessarily a real file.
    skip_existence_check: bool,
}

/// Classify every input-shaped argument, honoring `-x` override state and
/// tagging linker-input-shaped arguments as object regardless of `-x`.
fn classify_inputs(args: &ArgList, warnings: &mut Vec<PipelineWarning>) -> Vec<ClassifiedInput> {
    let mut override_type: Option<FileType> = None;
    let mut inputs = Vec::new();
    for arg in args.iter() {
        match arg.option {
            Some(spec) if spec.name == "-x" => {
                let value = arg.value().unwrap_or_default();
                if value == "none" {
                    override_type = None;
                } else if let Some(t) = classify_by_specifier(value) {
                    override_type = Some(t);
                } else {
                    warnings.push(PipelineWarning::UnknownLanguage(value.to_string()));
                    override_type = Some(FileType::Object);
                }
            }
            Some(spec) if spec.is_linker_input => {
                if let Some(value) = arg.value() {
                    inputs.push(ClassifiedInput {
                        path: PathBuf::from(value),
                        file_type: FileType::Object,
                        skip_existence_check: true,
                    });
                }
            }
            None => {
                // A bare positional token: genuine Input, not Unknown.
                if let Some(path) = arg.value() {
                    if !arg.display_name().eq("<unknown>") {
                        let file_type = override_type
                            .or_else(|| classify_by_suffix(path))
                            .unwrap_or(FileType::Object);
                        inputs.push(ClassifiedInput {
                            path: PathBuf::from(path),
                            file_type,
                            skip_existence_check: false,
                        });
                    }
                }
            }
            _ => {}
        }
    }
    inputs
}

/// Build the normal (single-architecture) pipeline: one top-level action
/// per input chain, plus one aggregated `Link` action if any chain reached
/// it.
pub fn build_normal_pipeline(args: &ArgList) -> Result<PipelineResult, PipelineError> {
    if args.get_last_arg("-combine").is_some() {
        return Err(PipelineError::NotImplemented("-combine is not implemented".to_string()));
    }
    if let Some(bad) = args.iter().find(|a| a.display_name() == "-Z") {
        return Err(PipelineError::InvalidArguments(format!(
            "unsupported internal GCC option '-Z{}'",
            bad.value().unwrap_or_default()
        )));
    }

    let mut warnings = Vec::new();
    let classified = classify_inputs(args, &mut warnings);

    for input in &classified {
        if !input.skip_existence_check && !input.path.as_path().exists() {
            warnings.push(PipelineWarning::InputMissing(input.path.clone()));
        }
    }
    let classified: Vec<_> = classified
        .into_iter()
        .filter(|i| i.skip_existence_check || i.path.as_path().exists())
        .collect();

    if classified.is_empty() && args.get_last_arg("-###").is_none() {
        return Err(PipelineError::NoInputFiles);
    }

    let mode = derive_mode(args);
    let mut graph = ActionGraph::new();
    let mut top_level = Vec::new();
    let mut linker_inputs = Vec::new();

    for input in classified {
        let seq = phase_sequence(input.file_type);
        if seq.first().is_some_and(|p| *p > mode.final_phase) {
            warnings.push(PipelineWarning::InputUnused(input.path));
            continue;
        }

        let mut current_action = graph.add(Action::Input {
            path: input.path,
            file_type: input.file_type,
        });
        let mut current_type = input.file_type;
        let mut reached_link = false;

        for phase in seq {
            if phase > mode.final_phase {
                break;
            }
            if phase == Phase::Link {
                linker_inputs.push(current_action);
                reached_link = true;
                break;
            }
            let output_type = output_type_for_phase(phase, current_type, mode.syntax_only);
            current_action = graph.add(Action::Job {
                phase,
                file_type: output_type,
                inputs: vec![current_action],
            });
            current_type = output_type;
            if output_type == FileType::Nothing {
                break;
            }
        }

        if !reached_link {
            top_level.push(current_action);
        }
    }

    if !linker_inputs.is_empty() {
        let link = graph.add(Action::Job {
            phase: Phase::Link,
            file_type: FileType::Image,
            inputs: linker_inputs,
        });
        top_level.push(link);
    }

    Ok(PipelineResult { graph, top_level, warnings })
}

const MULTI_ARCH_INCOMPATIBLE_FLAGS: &[&str] = &[
    "-M", "-MD", "-MMD", "-MP", "-MG", "-MM", "-MF", "-MT", "-MQ",
    "-save-temps", "--save-temps",
];

/// Build the pipeline, multiplying it across architectures when the host
/// enables driver-driver behavior.
pub fn build_pipeline(
    args: &ArgList,
    host: &dyn HostInfo,
) -> Result<PipelineResult, PipelineError> {
    if !host.use_driver_driver() {
        return build_normal_pipeline(args);
    }

    let mut archs: Vec<String> = args
        .get_all_args("-arch")
        .filter_map(|arg| arg.value().map(str::to_string))
        .collect();
    if archs.is_empty() {
        archs.push(host.get_arch_name(args));
    }

    let PipelineResult { mut graph, top_level, mut warnings } = build_normal_pipeline(args)?;

    if archs.len() > 1 {
        if let Some(flag) = MULTI_ARCH_INCOMPATIBLE_FLAGS
            .iter()
            .find(|name| args.get_last_arg(name).is_some())
        {
            return Err(PipelineError::InvalidArguments(format!(
                "cannot use {flag} with multiple -arch flags"
            )));
        }
    }

    let mut multiplied = Vec::with_capacity(top_level.len());
    for action in top_level {
        let out_type = graph.get(action).file_type(&graph);
        if archs.len() > 1
            && !matches!(out_type, FileType::Nothing | FileType::Object | FileType::Image)
        {
            return Err(PipelineError::InvalidArguments(format!(
                "cannot use multiple -arch flags with intermediate output type '{}'",
                out_type.name()
            )));
        }

        let bind_ids: Vec<ActionId> = archs
            .iter()
            .map(|arch| {
                graph.add(Action::BindArch { arch: arch.clone(), input: action })
            })
            .collect();

        if archs.len() == 1 || out_type == FileType::Nothing {
            multiplied.extend(bind_ids);
        } else {
            let lipo = graph.add(Action::Job {
                phase: Phase::Lipo,
                file_type: out_type,
                inputs: bind_ids,
            });
            multiplied.push(lipo);
        }
    }

    Ok(PipelineResult { graph, top_level: multiplied, warnings })
}

#[must_use]
pub fn base_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ccc_toolchain::HostInfoImpl;

    fn toks(s: &[&str]) -> Vec<String> {
        s.iter().map(|s| s.to_string()).collect()
    }

    fn existing_file(name: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(name);
        std::fs::write(&path, "").unwrap();
        (dir, path)
    }

    #[test]
    fn compile_only_produces_compile_and_assemble_chain() {
        let (_dir, path) = existing_file("foo.c");
        let args = ArgList::parse(&[
            "-c".to_string(),
            path.display().to_string(),
        ])
        .unwrap();
        let result = build_normal_pipeline(&args).unwrap();
        assert_eq!(result.top_level.len(), 1);
        match result.graph.get(result.top_level[0]) {
            Action::Job { phase: Phase::Assemble, inputs, .. } => {
                assert_eq!(inputs.len(), 1);
                match result.graph.get(inputs[0]) {
                    Action::Job { phase: Phase::Compile, inputs: c_inputs, .. } => {
                        assert_eq!(c_inputs.len(), 1);
                    }
                    other => panic!("expected a Compile job, got {other:?}"),
                }
            }
            other => panic!("expected an Assemble job, got {other:?}"),
        }
    }

    #[test]
    fn compile_and_link_aggregates_object_inputs() {
        let (_dir, c_path) = existing_file("foo.c");
        let dir = _dir.path();
        let o_path = dir.join("bar.o");
        std::fs::write(&o_path, "").unwrap();
        let args = ArgList::parse(&[
            c_path.display().to_string(),
            o_path.display().to_string(),
            "-o".to_string(),
            "prog".to_string(),
        ])
        .unwrap();
        let result = build_normal_pipeline(&args).unwrap();
        assert_eq!(result.top_level.len(), 1);
        match result.graph.get(result.top_level[0]) {
            Action::Job { phase: Phase::Link, inputs, .. } => assert_eq!(inputs.len(), 2),
            other => panic!("expected a Link job, got {other:?}"),
        }
    }

    #[test]
    fn preprocess_only_stops_at_preprocess() {
        let (_dir, path) = existing_file("foo.c");
        let args =
            ArgList::parse(&["-E".to_string(), path.display().to_string()]).unwrap();
        let result = build_normal_pipeline(&args).unwrap();
        assert_eq!(result.top_level.len(), 1);
        match result.graph.get(result.top_level[0]) {
            Action::Job { phase: Phase::Preprocess, .. } => {}
            other => panic!("expected a Preprocess job, got {other:?}"),
        }
    }

    #[test]
    fn syntax_only_truncates_chain_at_nothing() {
        let (_dir, path) = existing_file("foo.c");
        let args = ArgList::parse(&[
            "-fsyntax-only".to_string(),
            path.display().to_string(),
        ])
        .unwrap();
        let result = build_normal_pipeline(&args).unwrap();
        assert_eq!(result.top_level.len(), 1);
        match result.graph.get(result.top_level[0]) {
            Action::Job { phase: Phase::Compile, file_type, .. } => {
                assert_eq!(*file_type, FileType::Nothing);
            }
            other => panic!("expected a Compile job, got {other:?}"),
        }
    }

    #[test]
    fn missing_sole_input_is_dropped_then_reported_as_no_input_files() {
        let args = ArgList::parse(&[
            "-c".to_string(),
            "/nonexistent/path/foo.c".to_string(),
        ])
        .unwrap();
        let err = build_normal_pipeline(&args).unwrap_err();
        assert_eq!(err, PipelineError::NoInputFiles);
    }

    #[test]
    fn missing_input_among_others_is_dropped_but_does_not_abort() {
        let (_dir, c_path) = existing_file("foo.c");
        let args = ArgList::parse(&[
            "-c".to_string(),
            "/nonexistent/path/missing.c".to_string(),
            c_path.display().to_string(),
        ])
        .unwrap();
        let result = build_normal_pipeline(&args).unwrap();
        assert_eq!(result.top_level.len(), 1);
        assert!(result
            .warnings
            .iter()
            .any(|w| matches!(w, PipelineWarning::InputMissing(p) if p.to_string_lossy().contains("missing.c"))));
    }

    #[test]
    fn empty_input_set_without_hash_is_error() {
        let args = ArgList::parse(&[]).unwrap();
        assert_eq!(
            build_normal_pipeline(&args).unwrap_err(),
            PipelineError::NoInputFiles
        );
    }

    #[test]
    fn empty_input_set_with_print_jobs_is_allowed() {
        let args = ArgList::parse(&["-###".to_string()]).unwrap();
        let result = build_normal_pipeline(&args).unwrap();
        assert!(result.top_level.is_empty());
    }

    #[test]
    fn combine_is_not_implemented() {
        let args = ArgList::parse(&["-combine".to_string()]).unwrap();
        assert_eq!(
            build_normal_pipeline(&args).unwrap_err(),
            PipelineError::NotImplemented("-combine is not implemented".to_string())
        );
    }

    #[test]
    fn z_family_is_rejected() {
        let args = ArgList::parse(&["-Zdynamiclib".to_string()]).unwrap();
        assert!(matches!(
            build_normal_pipeline(&args),
            Err(PipelineError::InvalidArguments(_))
        ));
    }

    #[test]
    fn x_override_applies_until_reset_to_none() {
        let (_dir, m_path) = existing_file("foo.m");
        let dir = _dir.path();
        let c_path = dir.join("bar.c");
        std::fs::write(&c_path, "").unwrap();
        let args = ArgList::parse(&[
            "-x".to_string(),
            "c++".to_string(),
            m_path.display().to_string(),
            "-x".to_string(),
            "none".to_string(),
            c_path.display().to_string(),
            "-c".to_string(),
        ])
        .unwrap();
        let mut warnings = Vec::new();
        let classified = classify_inputs(&args, &mut warnings);
        assert_eq!(classified.len(), 2);
        assert_eq!(classified[0].file_type, FileType::Cxx);
        assert_eq!(classified[1].file_type, FileType::C);
    }

    #[test]
    fn single_arch_host_bypasses_multiplication() {
        let (_dir, path) = existing_file("foo.c");
        let args = ArgList::parse(&[
            "-c".to_string(),
            path.display().to_string(),
        ])
        .unwrap();
        let host = HostInfoImpl::new("x86_64");
        let result = build_pipeline(&args, &host).unwrap();
        // On a non-driver-driver host the normal pipeline passes through
        // unmultiplied.
        if !host.use_driver_driver() {
            assert_eq!(result.top_level.len(), 1);
        }
    }

    #[test]
    fn multi_arch_with_save_temps_is_rejected_when_driver_driver_active() {
        struct AlwaysDriverDriver(HostInfoImpl);
        impl HostInfo for AlwaysDriverDriver {
            fn use_driver_driver(&self) -> bool {
                true
            }
            fn get_arch_name(&self, args: &ArgList) -> String {
                self.0.get_arch_name(args)
            }
            fn get_toolchain(&self) -> &dyn ccc_toolchain::ToolChain {
                self.0.get_toolchain()
            }
            fn get_toolchain_for_arch(&self, name: &str) -> Option<&dyn ccc_toolchain::ToolChain> {
                self.0.get_toolchain_for_arch(name)
            }
        }
        let (_dir, path) = existing_file("foo.c");
        let args = ArgList::parse(&[
            "-arch".to_string(),
            "i386".to_string(),
            "-arch".to_string(),
            "x86_64".to_string(),
            "-save-temps".to_string(),
            "-c".to_string(),
            path.display().to_string(),
        ])
        .unwrap();
        let host = AlwaysDriverDriver(HostInfoImpl::new("x86_64"));
        assert!(matches!(
            build_pipeline(&args, &host),
            Err(PipelineError::InvalidArguments(_))
        ));
    }
}
