//! Phase ordering, the action DAG built from a pipeline, and the job/command
//! model a bound action resolves to.
//!
//! Actions form a DAG rather than a tree because a [`Phase::Link`] or
//! [`Phase::Lipo`] action is instantiated exactly once per pipeline build
//! and shared by every input that feeds it (reference driver's
//! `buildNormalPipeline`/`buildPipeline` construct the link/lipo node first
//! and thread the same instance through every per-input sequence). An arena
//! keyed by [`ActionId`] gives every action a stable identity so sharing and
//! later identity-keyed memoization (`-ccc-print-phases`) are both trivial.

use ccc_types::FileType;
use std::path::PathBuf;

/// An ordered driver phase. Ordering matters: pipeline construction walks
/// phases from whichever phase an input type starts at up to (and
/// including) the final phase requested on the command line, and
/// `PostAssemble` is solely the link/lipo input boundary, never a phase an
/// input type starts from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Phase {
    Preprocess,
    Precompile,
    Compile,
    Assemble,
    Link,
    Lipo,
    PostAssemble,
}

impl Phase {
    /// Lowercase name used in `-ccc-print-phases` output.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Phase::Preprocess => "preprocess",
            Phase::Precompile => "precompile",
            Phase::Compile => "compile",
            Phase::Assemble => "assemble",
            Phase::Link => "link",
            Phase::Lipo => "lipo",
            Phase::PostAssemble => "post-assemble",
        }
    }

    /// The final phase a mode flag combination truncates the pipeline to.
    /// `None` means no mode flag was given, i.e. proceed all the way to
    /// `Link`.
    #[must_use]
    pub fn final_phase_for_mode(
        explicit_preprocess: bool,
        syntax_only: bool,
        assemble_only: bool,
        compile_only: bool,
    ) -> Option<Phase> {
        if explicit_preprocess {
            Some(Phase::Preprocess)
        } else if syntax_only {
            Some(Phase::Compile)
        } else if assemble_only {
            Some(Phase::Assemble)
        } else if compile_only {
            Some(Phase::Compile)
        } else {
            None
        }
    }
}

/// Opaque handle into an [`ActionGraph`]'s arena. Two `ActionId`s compare
/// equal iff they name the same arena slot, which is what lets a shared
/// `Link`/`Lipo` node be referenced from multiple input chains without
/// duplicating it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActionId(usize);

/// One node in the action DAG.
#[derive(Debug, Clone)]
pub enum Action {
    /// A source input, not yet operated on by any phase.
    Input {
        path: PathBuf,
        file_type: FileType,
    },
    /// Running one phase over some set of input actions.
    Job {
        phase: Phase,
        file_type: FileType,
        inputs: Vec<ActionId>,
    },
    /// Restricts an action subgraph to a single architecture; inserted by
    /// the driver-driver pipeline builder when multiple `-arch` values are
    /// present.
    BindArch {
        arch: String,
        input: ActionId,
    },
}

impl Action {
    /// The file type this action produces.
    #[must_use]
    pub fn file_type(&self, graph: &ActionGraph) -> FileType {
        match self {
            Action::Input { file_type, .. } => *file_type,
            Action::Job { file_type, .. } => *file_type,
            Action::BindArch { input, .. } => graph.get(*input).file_type(graph),
        }
    }
}

/// An arena of [`Action`]s forming a DAG. Nodes are appended and never
/// removed or mutated in place, so an [`ActionId`] handed out earlier
/// always stays valid.
#[derive(Debug, Clone, Default)]
pub struct ActionGraph {
    actions: Vec<Action>,
}

impl ActionGraph {
    #[must_use]
    pub fn new() -> Self {
        ActionGraph { actions: Vec::new() }
    }

    pub fn add(&mut self, action: Action) -> ActionId {
        self.actions.push(action);
        ActionId(self.actions.len() - 1)
    }

    #[must_use]
    pub fn get(&self, id: ActionId) -> &Action {
        &self.actions[id.0]
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Iterate every action id in arena (insertion) order. Because actions
    /// are only ever appended and every action's inputs are ids allocated
    /// before it, this order is automatically a valid topological order.
    pub fn ids(&self) -> impl Iterator<Item = ActionId> {
        (0..self.actions.len()).map(ActionId)
    }
}

/// What a bound job actually does when executed.
#[derive(Debug, Clone)]
pub enum Job {
    /// Run an external tool with this argv and environment.
    Command {
        executable: PathBuf,
        arguments: Vec<String>,
    },
    /// An ordered chain of commands connected by pipes, producer first.
    /// Construction may claim pipe eligibility and append commands to this
    /// chain, but no executor here actually runs one.
    Piped(Vec<Job>),
}

/// An ordered collection of jobs to execute, along with whatever
/// human-readable inputs produced them (used by `-###` and `-ccc-echo`).
#[derive(Debug, Clone, Default)]
pub struct JobList {
    jobs: Vec<Job>,
}

impl JobList {
    #[must_use]
    pub fn new() -> Self {
        JobList { jobs: Vec::new() }
    }

    pub fn push(&mut self, job: Job) -> usize {
        self.jobs.push(job);
        self.jobs.len() - 1
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Job> {
        self.jobs.get_mut(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Job> {
        self.jobs.iter()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.jobs.len()
    }
}

/// What a bound action resolved to: where its output landed, and what file
/// type it carries forward to whatever consumes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputInfo {
    pub path: PathBuf,
    pub file_type: FileType,
    /// True if `path` is a temp file the binder is responsible for (used
    /// only for documentation here; cleanup is out of scope).
    pub is_temp: bool,
}
