//! Formatting for the three introspection outputs: `-ccc-print-options`,
//! `-ccc-print-phases`, and `-###`. None of these execute anything; they
//! only render state already built by `ccc-opts`/`ccc-pipeline`/`ccc-bind`.

use ccc_opts::{ArgList, ArgOccurrence, OptionShape};
use ccc_phases::{Action, ActionGraph, ActionId, Job, JobList};
use std::collections::HashMap;

fn arg_values(arg: &ArgOccurrence) -> Vec<String> {
    match arg.option.map(|spec| spec.shape) {
        None => arg.value().map(|v| vec![v.to_string()]).unwrap_or_default(),
        Some(OptionShape::Flag) => vec![],
        Some(OptionShape::Joined | OptionShape::Separate | OptionShape::JoinedOrSeparate) => {
            arg.value().map(|v| vec![v.to_string()]).unwrap_or_default()
        }
        Some(OptionShape::JoinedAndSeparate) => {
            let mut values = Vec::new();
            if let Some(joined) = arg.joined_value() {
                values.push(joined.to_string());
            }
            if let Some(separate) = arg.separate_value() {
                values.push(separate.to_string());
            }
            values
        }
        Some(OptionShape::CommaJoined | OptionShape::MultipleValues(_)) => arg.values().to_vec(),
        Some(OptionShape::Input | OptionShape::Unknown) => vec![],
    }
}

/// `-ccc-print-options`: one line per argument, in input order.
#[must_use]
pub fn format_print_options(args: &ArgList) -> String {
    args.iter()
        .enumerate()
        .map(|(i, arg)| {
            let values = arg_values(arg)
                .into_iter()
                .map(|v| format!("\"{v}\""))
                .collect::<Vec<_>>()
                .join(", ");
            format!(
                "Option {} - Name: \"{}\", Values: {{{}}}",
                i,
                arg.display_name(),
                values
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// `-ccc-print-phases`: depth-first, memoized per action identity, numbered
/// in first-visit (post-order) order.
#[must_use]
pub fn format_print_phases(graph: &ActionGraph, top_level: &[ActionId]) -> String {
    let mut memo: HashMap<ActionId, usize> = HashMap::new();
    let mut lines: Vec<String> = Vec::new();
    for id in top_level {
        visit(graph, *id, &mut memo, &mut lines);
    }
    lines.join("\n")
}

fn visit(
    graph: &ActionGraph,
    id: ActionId,
    memo: &mut HashMap<ActionId, usize>,
    lines: &mut Vec<String>,
) -> usize {
    if let Some(&index) = memo.get(&id) {
        return index;
    }
    match graph.get(id) {
        Action::Input { file_type, .. } => {
            let index = lines.len();
            lines.push(format!("{index}: input, {{}}, {}", file_type.name()));
            memo.insert(id, index);
            index
        }
        Action::BindArch { arch, input } => {
            let arch = arch.clone();
            let input = *input;
            let input_index = visit(graph, input, memo, lines);
            let index = lines.len();
            let output_type = graph.get(id).file_type(graph);
            lines.push(format!(
                "{index}: bind-arch[-{arch}], {{{input_index}}}, {}",
                output_type.name()
            ));
            memo.insert(id, index);
            index
        }
        Action::Job { phase, file_type, inputs } => {
            let phase = *phase;
            let file_type = *file_type;
            let inputs = inputs.clone();
            let input_indices: Vec<String> = inputs
                .iter()
                .map(|input| visit(graph, *input, memo, lines).to_string())
                .collect();
            let index = lines.len();
            lines.push(format!(
                "{index}: {}, {{{}}}, {}",
                phase.as_str(),
                input_indices.join(", "),
                file_type.name()
            ));
            memo.insert(id, index);
            index
        }
    }
}

/// `-###`: one quoted command line per `Command`, in job order. Piped
/// chains print each command but the last suffixed with ` |`.
#[must_use]
pub fn format_dry_run(jobs: &JobList) -> String {
    let mut lines = Vec::new();
    for job in jobs.iter() {
        render_job(job, &mut lines);
    }
    lines.join("\n")
}

fn render_job(job: &Job, lines: &mut Vec<String>) {
    match job {
        Job::Command { executable, arguments } => {
            let mut argv = vec![executable.display().to_string()];
            argv.extend(arguments.iter().cloned());
            lines.push(shell_words::join(argv));
        }
        Job::Piped(chain) => {
            for (i, command) in chain.iter().enumerate() {
                let mut sub = Vec::new();
                render_job(command, &mut sub);
                if i + 1 < chain.len() {
                    for line in &mut sub {
                        line.push_str(" |");
                    }
                }
                lines.extend(sub);
            }
        }
    }
}
