//! Host, toolchain, and tool traits, plus a deterministic reference
//! implementation that lets the rest of the crate be built and tested
//! without shelling out to a real compiler.

use ccc_opts::{reparse_embedded, ArgList};
use ccc_phases::{Job, Phase};
use ccc_types::FileType;
use std::path::{Path, PathBuf};

/// Host-level facts that decide whether `-arch` multiplies the pipeline and
/// which toolchain serves a given architecture.
pub trait HostInfo {
    /// Whether this host supports the driver-driver (multi-arch, lipo)
    /// behavior at all. Per the reference driver, true only on Darwin.
    fn use_driver_driver(&self) -> bool;

    /// Resolve the default architecture name when no `-arch` is given.
    fn get_arch_name(&self, args: &ArgList) -> String;

    /// The toolchain for the host's default architecture.
    fn get_toolchain(&self) -> &dyn ToolChain;

    /// The toolchain for a specific named architecture, if this host knows
    /// one. `None` means the arch is unrecognized.
    fn get_toolchain_for_arch(&self, name: &str) -> Option<&dyn ToolChain>;
}

/// A toolchain: selects the tool responsible for a phase and translates
/// driver-level arguments into that tool's vocabulary.
pub trait ToolChain {
    fn select_tool(&self, phase: Phase) -> &dyn Tool;

    /// Rewrite a driver-level argument list into the form a specific
    /// architecture's tools expect (e.g. resolving `-Xarch_<A>` payloads,
    /// dropping options another arch doesn't support).
    fn translate_args(&self, args: &ArgList, arch: &str) -> ArgList;
}

/// A single phase's executable capability descriptor.
pub trait Tool {
    fn has_integrated_cpp(&self) -> bool;
    fn accepts_piped_input(&self) -> bool;
    fn can_pipe_output(&self) -> bool;

    /// Build exactly one `Command` implementing `phase` over `inputs`,
    /// writing to `output`. The binder decides whether this command
    /// becomes its own top-level job or is appended to a `Piped` chain
    /// already being built.
    fn construct_job(
        &self,
        phase: Phase,
        arch: &str,
        inputs: &[PathBuf],
        output: &Path,
        output_type: FileType,
        tc_args: &ArgList,
    ) -> Job;
}

/// A minimal, deterministic `HostInfo` used by tests and as the default
/// when no platform-specific host service is wired in. Mirrors the
/// reference driver's default (non-Darwin) host: no driver-driver
/// behavior, one toolchain for everything.
pub struct HostInfoImpl {
    toolchain: ReferenceToolChain,
    default_arch: String,
    driver_driver_override: Option<bool>,
}

impl HostInfoImpl {
    #[must_use]
    pub fn new(default_arch: impl Into<String>) -> Self {
        HostInfoImpl {
            toolchain: ReferenceToolChain::new(),
            default_arch: default_arch.into(),
            driver_driver_override: None,
        }
    }

    /// Forces `use_driver_driver()` to a fixed value, overriding the
    /// platform default. Grounds `-ccc-no-driver-driver`.
    #[must_use]
    pub fn with_driver_driver(mut self, enabled: bool) -> Self {
        self.driver_driver_override = Some(enabled);
        self
    }
}

impl HostInfo for HostInfoImpl {
    fn use_driver_driver(&self) -> bool {
        self.driver_driver_override.unwrap_or(cfg!(target_os = "macos"))
    }

    fn get_arch_name(&self, args: &ArgList) -> String {
        args.get_last_arg("-arch")
            .and_then(|arg| arg.value())
            .map(str::to_string)
            .unwrap_or_else(|| self.default_arch.clone())
    }

    fn get_toolchain(&self) -> &dyn ToolChain {
        &self.toolchain
    }

    fn get_toolchain_for_arch(&self, _name: &str) -> Option<&dyn ToolChain> {
        Some(&self.toolchain)
    }
}

/// A toolchain whose tools just record the phase's argv shape rather than
/// invoking a real compiler; deterministic and safe to exercise in tests.
#[derive(Default)]
pub struct ReferenceToolChain {
    preprocess: ReferenceTool,
    precompile: ReferenceTool,
    compile: ReferenceTool,
    assemble: ReferenceTool,
    link: ReferenceTool,
    lipo: ReferenceTool,
}

impl ReferenceToolChain {
    #[must_use]
    pub fn new() -> Self {
        ReferenceToolChain {
            preprocess: ReferenceTool::new("cpp", false),
            precompile: ReferenceTool::new("cc1", false),
            // cc1 preprocesses internally, like a real integrated compiler;
            // this is what lets the binder fuse a standalone Preprocess
            // step into the Compile command.
            compile: ReferenceTool::new("cc1", true),
            assemble: ReferenceTool::new("as", false),
            link: ReferenceTool::new("ld", false),
            lipo: ReferenceTool::new("lipo", false),
        }
    }
}

impl ToolChain for ReferenceToolChain {
    fn select_tool(&self, phase: Phase) -> &dyn Tool {
        match phase {
            Phase::Preprocess => &self.preprocess,
            Phase::Precompile => &self.precompile,
            Phase::Compile => &self.compile,
            Phase::Assemble => &self.assemble,
            Phase::Link => &self.link,
            Phase::Lipo => &self.lipo,
            Phase::PostAssemble => &self.link,
        }
    }

    fn translate_args(&self, args: &ArgList, arch: &str) -> ArgList {
        let mut out = ArgList::default();
        for arg in args.iter() {
            match arg.option {
                // `-Xarch_<A>` only survives for the arch it names; its
                // embedded option text is re-parsed and spliced in, as if
                // the user had written it directly for this arch.
                Some(spec) if spec.name == "-Xarch_" => {
                    if arg.joined_value() != Some(arch) {
                        continue;
                    }
                    let Some(embedded) = arg.separate_value() else { continue };
                    let Ok(reparsed) = reparse_embedded(embedded) else { continue };
                    for inner in reparsed.iter() {
                        if let Some(inner_spec) = inner.option {
                            if let Some(value) = inner.value() {
                                out.push_derived(inner_spec, value.to_string());
                            }
                        }
                    }
                }
                Some(spec) => {
                    if let Some(value) = arg.value() {
                        out.push_derived(spec, value.to_string());
                    }
                }
                None => {}
            }
        }
        out
    }
}

/// A single-phase tool whose `construct_job` emits a deterministic,
/// inspectable argv: `<executable> -phase <name> -arch <arch> -o <output>
/// <inputs...>`.
pub struct ReferenceTool {
    executable: &'static str,
    integrated_cpp: bool,
}

impl Default for ReferenceTool {
    fn default() -> Self {
        ReferenceTool::new("cc1", false)
    }
}

impl ReferenceTool {
    #[must_use]
    pub fn new(executable: &'static str, integrated_cpp: bool) -> Self {
        ReferenceTool { executable, integrated_cpp }
    }
}

impl Tool for ReferenceTool {
    fn has_integrated_cpp(&self) -> bool {
        self.integrated_cpp
    }

    fn accepts_piped_input(&self) -> bool {
        true
    }

    fn can_pipe_output(&self) -> bool {
        true
    }

    fn construct_job(
        &self,
        phase: Phase,
        arch: &str,
        inputs: &[PathBuf],
        output: &Path,
        output_type: FileType,
        tc_args: &ArgList,
    ) -> Job {
        let mut arguments = vec![
            "-phase".to_string(),
            format!("{phase:?}"),
            "-arch".to_string(),
            arch.to_string(),
            "-o".to_string(),
            output.display().to_string(),
            "-output-type".to_string(),
            output_type.name().to_string(),
        ];
        for arg in tc_args.iter() {
            if let Some(value) = arg.value() {
                arguments.push(value.to_string());
            }
        }
        for input in inputs {
            arguments.push(input.display().to_string());
        }
        Job::Command {
            executable: PathBuf::from(self.executable),
            arguments,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_info_falls_back_to_default_arch_when_no_arch_flag() {
        let host = HostInfoImpl::new("x86_64");
        let args = ArgList::parse(&[]).unwrap();
        assert_eq!(host.get_arch_name(&args), "x86_64");
    }

    #[test]
    fn host_info_uses_last_arch_flag() {
        let host = HostInfoImpl::new("x86_64");
        let args =
            ArgList::parse(&["-arch".to_string(), "ppc".to_string()]).unwrap();
        assert_eq!(host.get_arch_name(&args), "ppc");
    }

    #[test]
    fn driver_driver_override_wins_over_platform_default() {
        let host = HostInfoImpl::new("x86_64").with_driver_driver(true);
        assert!(host.use_driver_driver());
        let host = HostInfoImpl::new("x86_64").with_driver_driver(false);
        assert!(!host.use_driver_driver());
    }

    #[test]
    fn reference_tool_constructs_one_command_per_call() {
        let tool = ReferenceTool::new("cc1", false);
        let tc_args = ArgList::default();
        let job = tool.construct_job(
            Phase::Compile,
            "x86_64",
            &[PathBuf::from("foo.i")],
            Path::new("foo.s"),
            FileType::AsmNoPP,
            &tc_args,
        );
        assert!(matches!(job, Job::Command { .. }));
    }

    #[test]
    fn compile_tool_reports_integrated_cpp() {
        let chain = ReferenceToolChain::new();
        assert!(chain.select_tool(Phase::Compile).has_integrated_cpp());
        assert!(!chain.select_tool(Phase::Preprocess).has_integrated_cpp());
    }

    #[test]
    fn translate_args_splices_in_xarch_matching_the_bound_arch() {
        let chain = ReferenceToolChain::new();
        let args = ArgList::parse(&[
            "-Xarch_ppc".to_string(),
            "-DFOO=1".to_string(),
            "-O2".to_string(),
        ])
        .unwrap();
        let translated = chain.translate_args(&args, "ppc");
        assert_eq!(translated.len(), 1);
        assert_eq!(translated.get(0).unwrap().display_name(), "-D");
        assert_eq!(translated.get(0).unwrap().value(), Some("FOO=1"));
    }

    #[test]
    fn translate_args_drops_xarch_for_a_different_arch() {
        let chain = ReferenceToolChain::new();
        let args = ArgList::parse(&[
            "-Xarch_ppc".to_string(),
            "-DFOO=1".to_string(),
            "-O2".to_string(),
        ])
        .unwrap();
        let translated = chain.translate_args(&args, "x86_64");
        assert!(translated.is_empty());
    }

    #[test]
    fn translate_args_passes_ordinary_options_through() {
        let chain = ReferenceToolChain::new();
        let args = ArgList::parse(&["-DFOO=1".to_string()]).unwrap();
        let translated = chain.translate_args(&args, "x86_64");
        assert_eq!(translated.len(), 1);
        assert_eq!(translated.get(0).unwrap().value(), Some("FOO=1"));
    }
}
