//! Declarative option schema and the argument-list parser.
//!
//! Parsing is a pure function over `(schema, tokens)`: the schema
//! ([`schema::OPTION_TABLE`]) is built once and shared read-only; parsing a
//! token stream produces an [`ArgList`], an ordered, appendable sequence of
//! [`ArgOccurrence`]s that preserves enough information to round-trip back
//! to the exact tokens the user wrote (required for `-###` and
//! `-Xarch_` rewriting).

pub mod schema;

pub use schema::{OptionShape, OptionSpec, OPTION_TABLE};

use thiserror::Error;

/// Parse-time failure. This is the only hard error the parser itself
/// raises; everything else (including a fully unrecognized flag) becomes
/// an `Unknown` argument that survives to later stages.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ParseError {
    #[error("argument to '{option}' is missing (expected {expected} more value(s))")]
    MissingValue { option: &'static str, expected: usize },
}

/// Where an argument's tokens came from: the original token stream, or
/// synthesized by the driver itself (e.g. a binder-derived `-o`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgSource {
    /// Index range (into the token slice passed to [`ArgList::parse`])
    /// this occurrence consumed.
    Tokens(std::ops::Range<usize>),
    /// Synthesized after parsing; renders as the stored literal token(s).
    Derived,
}

/// An immutable record of one argument occurrence: a reference to its
/// schema entry (`None` for `Input`/`Unknown`), where its tokens came from,
/// and whatever values were extracted per its shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgOccurrence {
    pub option: Option<&'static OptionSpec>,
    pub source: ArgSource,
    joined_value: Option<String>,
    separate_value: Option<String>,
    values: Vec<String>,
    /// Full literal text for `Input`/`Unknown` arguments, and the sole
    /// rendered token for `Derived` arguments.
    literal: Option<String>,
}

impl ArgOccurrence {
    /// The schema name, or the `<input>`/`<unknown>` placeholder used by
    /// `-ccc-print-options`.
    #[must_use]
    pub fn display_name(&self) -> &str {
        match self.option {
            Some(spec) => spec.name,
            None => match self.literal {
                Some(_) if self.is_unknown() => "<unknown>",
                _ => "<input>",
            },
        }
    }

    fn is_unknown(&self) -> bool {
        // Unknown args are distinguished from Input args only by how they
        // were classified at parse time; we tag that via the leading '-'
        // convention used when no schema entry matched.
        self.literal
            .as_deref()
            .is_some_and(|text| text.starts_with('-') && text != "-")
    }

    /// The single semantically relevant value for shapes that carry
    /// exactly one (`Joined`, `Separate`, `JoinedOrSeparate`, `Input`,
    /// `Unknown`). Returns `None` for `Flag`, `CommaJoined`,
    /// `MultipleValues`, and `JoinedAndSeparate` (use
    /// [`joined_value`](Self::joined_value) /
    /// [`separate_value`](Self::separate_value) for the latter).
    #[must_use]
    pub fn value(&self) -> Option<&str> {
        match self.option.map(|o| o.shape) {
            None => self.literal.as_deref(),
            Some(OptionShape::Joined) => self.joined_value.as_deref(),
            Some(OptionShape::Separate) => self.separate_value.as_deref(),
            Some(OptionShape::JoinedOrSeparate) => self
                .joined_value
                .as_deref()
                .or(self.separate_value.as_deref()),
            _ => None,
        }
    }

    #[must_use]
    pub fn joined_value(&self) -> Option<&str> {
        self.joined_value.as_deref()
    }

    #[must_use]
    pub fn separate_value(&self) -> Option<&str> {
        self.separate_value.as_deref()
    }

    /// Values for `CommaJoined` and `MultipleValues` shapes.
    #[must_use]
    pub fn values(&self) -> &[String] {
        &self.values
    }
}

/// An ordered, appendable list of argument occurrences.
#[derive(Debug, Clone, Default)]
pub struct ArgList {
    args: Vec<ArgOccurrence>,
}

impl ArgList {
    /// Parse a raw token vector against [`OPTION_TABLE`].
    ///
    /// Greedy, left-to-right: at each position the longest matching
    /// schema prefix wins; ties go to the earliest-declared entry. A
    /// token matching no schema entry becomes `Unknown` (if it looks like
    /// a flag) or `Input` (otherwise) — never a hard error.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::MissingValue`] if a `Separate` or
    /// `JoinedAndSeparate` shape's required following token(s) are absent
    /// (GCC-compatibility: `--` does not terminate option parsing).
    pub fn parse(tokens: &[String]) -> Result<Self, ParseError> {
        let mut args = Vec::new();
        let mut pos = 0usize;
        while pos < tokens.len() {
            let token = &tokens[pos];
            match best_match(token) {
                Some((spec, prefix_len)) => {
                    let (occurrence, consumed) = bind(spec, prefix_len, tokens, pos)?;
                    args.push(occurrence);
                    pos += consumed;
                }
                None => {
                    args.push(ArgOccurrence {
                        option: None,
                        source: ArgSource::Tokens(pos..pos + 1),
                        joined_value: None,
                        separate_value: None,
                        values: Vec::new(),
                        literal: Some(token.clone()),
                    });
                    pos += 1;
                }
            }
        }
        Ok(ArgList { args })
    }

    /// Append a driver-synthesized argument (e.g. the binder's derived
    /// `-o <path>`). Returns the new occurrence's index.
    pub fn push_derived(&mut self, spec: &'static OptionSpec, value: String) -> usize {
        let occurrence = ArgOccurrence {
            option: Some(spec),
            source: ArgSource::Derived,
            joined_value: None,
            separate_value: Some(value.clone()),
            values: Vec::new(),
            literal: Some(value),
        };
        self.args.push(occurrence);
        self.args.len() - 1
    }

    #[must_use]
    pub fn iter(&self) -> std::slice::Iter<'_, ArgOccurrence> {
        self.args.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.args.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&ArgOccurrence> {
        self.args.get(index)
    }

    /// Last occurrence of a given schema entry, by name. Last-wins
    /// semantics for scalar flags.
    #[must_use]
    pub fn get_last_arg(&self, name: &str) -> Option<&ArgOccurrence> {
        self.args
            .iter()
            .rev()
            .find(|arg| arg.option.is_some_and(|spec| spec.name == name))
    }

    /// All occurrences of a given schema entry, by name, in input order.
    pub fn get_all_args<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a ArgOccurrence> {
        self.args
            .iter()
            .filter(move |arg| arg.option.is_some_and(|spec| spec.name == name))
    }

    /// Reproduce the exact tokens an occurrence consumed (the round-trip
    /// requirement). `raw` must be the same slice passed to
    /// [`ArgList::parse`] for `Tokens`-sourced occurrences.
    #[must_use]
    pub fn render(&self, arg: &ArgOccurrence, raw: &[String]) -> Vec<String> {
        match &arg.source {
            ArgSource::Tokens(range) => raw[range.clone()].to_vec(),
            ArgSource::Derived => vec![arg.literal.clone().unwrap_or_default()],
        }
    }
}

/// Find the best (longest, then earliest-declared) schema match for a
/// token. Returns the matched spec and the length of the flag-name prefix
/// it matched (used by [`bind`] to slice out the joined value).
fn best_match(token: &str) -> Option<(&'static OptionSpec, usize)> {
    let mut best: Option<(&'static OptionSpec, usize)> = None;
    for spec in OPTION_TABLE {
        let is_match = match spec.shape {
            OptionShape::Flag | OptionShape::Separate | OptionShape::MultipleValues(_) => {
                token == spec.name
            }
            OptionShape::Joined | OptionShape::CommaJoined | OptionShape::JoinedAndSeparate => {
                token.starts_with(spec.name) && token.len() > spec.name.len()
            }
            OptionShape::JoinedOrSeparate => {
                token == spec.name || (token.starts_with(spec.name) && token.len() > spec.name.len())
            }
            OptionShape::Input | OptionShape::Unknown => false,
        };
        if is_match {
            let len = spec.name.len();
            if best.is_none_or(|(_, best_len)| len > best_len) {
                best = Some((spec, len));
            }
        }
    }
    best
}

/// Bind a matched spec's value(s) from the token stream starting at
/// `pos`. Returns the built occurrence and how many tokens it consumed.
fn bind(
    spec: &'static OptionSpec,
    prefix_len: usize,
    tokens: &[String],
    pos: usize,
) -> Result<(ArgOccurrence, usize), ParseError> {
    let token = &tokens[pos];
    match spec.shape {
        OptionShape::Flag => Ok((
            ArgOccurrence {
                option: Some(spec),
                source: ArgSource::Tokens(pos..pos + 1),
                joined_value: None,
                separate_value: None,
                values: Vec::new(),
                literal: None,
            },
            1,
        )),
        OptionShape::Joined => Ok((
            ArgOccurrence {
                option: Some(spec),
                source: ArgSource::Tokens(pos..pos + 1),
                joined_value: Some(token[prefix_len..].to_string()),
                separate_value: None,
                values: Vec::new(),
                literal: None,
            },
            1,
        )),
        OptionShape::Separate => {
            let value = tokens
                .get(pos + 1)
                .ok_or(ParseError::MissingValue { option: spec.name, expected: 1 })?;
            Ok((
                ArgOccurrence {
                    option: Some(spec),
                    source: ArgSource::Tokens(pos..pos + 2),
                    joined_value: None,
                    separate_value: Some(value.clone()),
                    values: Vec::new(),
                    literal: None,
                },
                2,
            ))
        }
        OptionShape::JoinedOrSeparate => {
            if token.len() > prefix_len {
                Ok((
                    ArgOccurrence {
                        option: Some(spec),
                        source: ArgSource::Tokens(pos..pos + 1),
                        joined_value: Some(token[prefix_len..].to_string()),
                        separate_value: None,
                        values: Vec::new(),
                        literal: None,
                    },
                    1,
                ))
            } else {
                let value = tokens
                    .get(pos + 1)
                    .ok_or(ParseError::MissingValue { option: spec.name, expected: 1 })?;
                Ok((
                    ArgOccurrence {
                        option: Some(spec),
                        source: ArgSource::Tokens(pos..pos + 2),
                        joined_value: None,
                        separate_value: Some(value.clone()),
                        values: Vec::new(),
                        literal: None,
                    },
                    2,
                ))
            }
        }
        OptionShape::JoinedAndSeparate => {
            let joined = token[prefix_len..].to_string();
            let separate = tokens
                .get(pos + 1)
                .ok_or(ParseError::MissingValue { option: spec.name, expected: 1 })?;
            Ok((
                ArgOccurrence {
                    option: Some(spec),
                    source: ArgSource::Tokens(pos..pos + 2),
                    joined_value: Some(joined),
                    separate_value: Some(separate.clone()),
                    values: Vec::new(),
                    literal: None,
                },
                2,
            ))
        }
        OptionShape::CommaJoined => {
            let rest = &token[prefix_len..];
            let values = rest.split(',').map(str::to_string).collect();
            Ok((
                ArgOccurrence {
                    option: Some(spec),
                    source: ArgSource::Tokens(pos..pos + 1),
                    joined_value: None,
                    separate_value: None,
                    values,
                    literal: None,
                },
                1,
            ))
        }
        OptionShape::MultipleValues(count) => {
            if pos + count >= tokens.len() {
                return Err(ParseError::MissingValue {
                    option: spec.name,
                    expected: count - (tokens.len() - pos - 1),
                });
            }
            let values = tokens[pos + 1..=pos + count].to_vec();
            Ok((
                ArgOccurrence {
                    option: Some(spec),
                    source: ArgSource::Tokens(pos..pos + count + 1),
                    joined_value: None,
                    separate_value: None,
                    values,
                    literal: None,
                },
                count + 1,
            ))
        }
        OptionShape::Input | OptionShape::Unknown => unreachable!("not matched via best_match"),
    }
}

/// Re-parse the embedded option text carried by a `-Xarch_<A>` occurrence.
/// The parser is a pure function over
/// `(schema, tokens)`, so the embedded text is simply parsed again as its
/// own one-token stream.
///
/// # Errors
///
/// Propagates [`ParseError`] if the embedded text itself requires a value
/// it doesn't have (e.g. `-Xarch_ppc -o` with nothing after `-o`).
pub fn reparse_embedded(text: &str) -> Result<ArgList, ParseError> {
    ArgList::parse(&[text.to_string()])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toks(s: &[&str]) -> Vec<String> {
        s.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn flag_parses_with_no_value() {
        let args = ArgList::parse(&toks(&["-c"])).unwrap();
        assert_eq!(args.len(), 1);
        assert_eq!(args.get(0).unwrap().display_name(), "-c");
        assert_eq!(args.get(0).unwrap().value(), None);
    }

    #[test]
    fn joined_extracts_suffix() {
        let args = ArgList::parse(&toks(&["-DFOO=1"])).unwrap();
        let arg = args.get(0).unwrap();
        assert_eq!(arg.display_name(), "-D");
        assert_eq!(arg.value(), Some("FOO=1"));
    }

    #[test]
    fn separate_consumes_next_token() {
        let args = ArgList::parse(&toks(&["-o", "out"])).unwrap();
        assert_eq!(args.len(), 1);
        assert_eq!(args.get(0).unwrap().value(), Some("out"));
    }

    #[test]
    fn separate_missing_value_is_error() {
        let err = ArgList::parse(&toks(&["-o"])).unwrap_err();
        assert_eq!(
            err,
            ParseError::MissingValue { option: "-o", expected: 1 }
        );
    }

    #[test]
    fn joined_or_separate_prefers_joined_form() {
        let args = ArgList::parse(&toks(&["-I."])).unwrap();
        assert_eq!(args.get(0).unwrap().value(), Some("."));
        let args2 = ArgList::parse(&toks(&["-I", "."])).unwrap();
        assert_eq!(args2.len(), 1);
        assert_eq!(args2.get(0).unwrap().value(), Some("."));
    }

    #[test]
    fn joined_and_separate_requires_both_parts() {
        let args = ArgList::parse(&toks(&["-Xarch_ppc", "-O2"])).unwrap();
        let arg = args.get(0).unwrap();
        assert_eq!(arg.joined_value(), Some("ppc"));
        assert_eq!(arg.separate_value(), Some("-O2"));

        let err = ArgList::parse(&toks(&["-Xarch_ppc"])).unwrap_err();
        assert_eq!(
            err,
            ParseError::MissingValue { option: "-Xarch_", expected: 1 }
        );
    }

    #[test]
    fn comma_joined_splits_on_comma() {
        let args = ArgList::parse(&toks(&["-Wl,a,b,c"])).unwrap();
        let arg = args.get(0).unwrap();
        assert_eq!(arg.values(), &["a", "b", "c"]);
    }

    #[test]
    fn multiple_values_consumes_declared_count() {
        let args = ArgList::parse(&toks(&["-ccc-multi", "a", "b", "rest"])).unwrap();
        assert_eq!(args.len(), 2); // -ccc-multi(a,b), then "rest" as input
        assert_eq!(args.get(0).unwrap().values(), &["a", "b"]);
        assert_eq!(args.get(1).unwrap().display_name(), "<input>");
    }

    #[test]
    fn lone_dash_is_input() {
        let args = ArgList::parse(&toks(&["-"])).unwrap();
        assert_eq!(args.get(0).unwrap().display_name(), "<input>");
        assert_eq!(args.get(0).unwrap().value(), Some("-"));
    }

    #[test]
    fn double_dash_does_not_terminate_parsing() {
        // GCC compatibility: "--" is itself just an unrecognized flag-like
        // token here (not a schema entry), so it becomes Unknown, and
        // parsing continues normally afterwards.
        let args = ArgList::parse(&toks(&["--", "-c", "foo.c"])).unwrap();
        assert_eq!(args.len(), 3);
        assert_eq!(args.get(0).unwrap().display_name(), "<unknown>");
        assert_eq!(args.get(1).unwrap().display_name(), "-c");
    }

    #[test]
    fn unrecognized_flag_like_token_is_unknown_not_error() {
        let args = ArgList::parse(&toks(&["-this-is-not-real"])).unwrap();
        assert_eq!(args.get(0).unwrap().display_name(), "<unknown>");
    }

    #[test]
    fn positional_token_is_input() {
        let args = ArgList::parse(&toks(&["foo.c"])).unwrap();
        assert_eq!(args.get(0).unwrap().display_name(), "<input>");
        assert_eq!(args.get(0).unwrap().value(), Some("foo.c"));
    }

    #[test]
    fn last_wins_for_repeated_scalar_flag() {
        let args = ArgList::parse(&toks(&["-o", "x", "-o", "y"])).unwrap();
        assert_eq!(args.get_last_arg("-o").unwrap().value(), Some("y"));
        assert_eq!(args.get_all_args("-o").count(), 2);
    }

    #[test]
    fn render_round_trips_original_tokens() {
        let raw = toks(&["-Xarch_ppc", "-O2", "foo.c"]);
        let args = ArgList::parse(&raw).unwrap();
        for arg in args.iter() {
            let rendered = args.render(arg, &raw);
            assert_eq!(rendered, raw[match &arg.source {
                ArgSource::Tokens(r) => r.clone(),
                ArgSource::Derived => unreachable!(),
            }]);
        }
    }

    #[test]
    fn z_family_rejected_by_joined_prefix() {
        let args = ArgList::parse(&toks(&["-Zdynamiclib"])).unwrap();
        assert_eq!(args.get(0).unwrap().display_name(), "-Z");
        assert_eq!(args.get(0).unwrap().value(), Some("dynamiclib"));
    }

    #[test]
    fn reparse_embedded_reuses_same_schema() {
        let embedded = reparse_embedded("-O2").unwrap();
        assert_eq!(embedded.get(0).unwrap().display_name(), "<unknown>");
        let embedded_known = reparse_embedded("-c").unwrap();
        assert_eq!(embedded_known.get(0).unwrap().display_name(), "-c");
    }

    proptest::proptest! {
        #[test]
        fn render_after_parse_reconstructs_flag_tokens(n in 1usize..5) {
            let raw: Vec<String> = (0..n).map(|_| "-c".to_string()).collect();
            let args = ArgList::parse(&raw).unwrap();
            let mut rebuilt = Vec::new();
            for arg in args.iter() {
                rebuilt.extend(args.render(arg, &raw));
            }
            proptest::prop_assert_eq!(rebuilt, raw);
        }
    }
}
