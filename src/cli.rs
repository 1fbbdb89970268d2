//! CLI loop / completion adapter (SPEC_FULL.md §4.4, §5, §6).
//!
//! Thin glue between the matcher/execution engine and an external line
//! editor: this module neither draws a prompt nor owns a terminal, mirroring
//! how `nessaid_cli.cli.NessaidCli` layers a readline-driven loop on top of
//! `nessaid_cli.interface.CliInterface`'s `match`/`exec_line` primitives. A
//! [`Cli`] wraps one compiled grammar and its live token registry and offers
//! the two matcher modes the original exposes as `complete`/`exec_line`:
//! dry-run completion and full execution.

use std::fs;
use std::io;
use std::path::Path;

use crate::error::{ConfigWarning, ExecutionError, TokenizerError};
use crate::exec::{self, Host};
use crate::grammar::GrammarSpecification;
use crate::matcher::{Matcher, MatcherConfig, MatchStatusResult, NextTokenSuggestion, ParseResult, TokenRegistry};
use crate::tokenizer::tokenize;
use crate::value::Value;

/// Outcome of submitting one complete line to a [`Cli`] (§4.4 status
/// values plus the two ways execution itself can fail, §7's propagation
/// policy: the CLI loop reports these on stderr and re-prompts rather than
/// unwinding the whole process).
#[derive(Debug)]
pub enum CommandOutcome {
    /// A full match that ran to completion; carries the root rule's final
    /// argument values (§4.5 point 4).
    Executed(Vec<Value>),
    /// End of input reached with a still-open sequence (§4.4): not an error,
    /// the usual state while a user is still typing.
    Incomplete { suggestions: Vec<NextTokenSuggestion>, unique_completion: Option<String> },
    /// More than one structurally different rule matched the same input and
    /// the tie-break rules of §4.4 point 3 did not resolve it.
    Ambiguous,
    /// No candidate accepted this token.
    Failure { offending_token: Option<String>, offending_index: Option<usize> },
    /// The raw line itself could not be tokenized.
    TokenizerFailed(TokenizerError),
    /// The grammar matched but a semantic action failed while running.
    ExecutionFailed(ExecutionError),
}

/// One CLI context: a compiled grammar plus its live token classes,
/// everything the matcher and execution engine need and nothing about a
/// terminal. Nesting (§5's "CLI stack... sharing one line editor") is the
/// caller's concern — see [`CliStack`] — not this type's; a command handler
/// that wants to hand control to a child grammar simply builds another `Cli`
/// over it and pushes a name onto the shared stack.
pub struct Cli<'g> {
    pub spec: &'g GrammarSpecification,
    pub tokens: &'g TokenRegistry,
    matcher: Matcher<'g>,
}

impl<'g> Cli<'g> {
    pub fn new(spec: &'g GrammarSpecification, tokens: &'g TokenRegistry) -> Self {
        Self { spec, tokens, matcher: Matcher::new(spec, tokens) }
    }

    pub fn with_config(spec: &'g GrammarSpecification, tokens: &'g TokenRegistry, config: MatcherConfig) -> Self {
        let mut matcher = Matcher::new(spec, tokens);
        matcher.config = config;
        Self { spec, tokens, matcher }
    }

    /// Checks every token name the grammar declares against the live
    /// registry, the way `NessaidCli.__init__` calls
    /// `validate_token_classes` before a session starts (§6 supplement).
    /// Meant to be called once, at startup; not re-checked per line.
    pub fn validate(&self) -> Vec<ConfigWarning> {
        let declared: Vec<String> = self.spec.tokens.keys().cloned().collect();
        self.tokens.validate_against(&declared)
    }

    /// Dry-run completion for one in-progress line (§4.4 point 5). Whether
    /// the final token is "done" is inferred from trailing whitespace, per
    /// §4.4's own definition of `last_token_complete`; a caller driving a
    /// real line editor that already tracks cursor position may instead call
    /// [`Cli::complete_tokens`] directly with that knowledge.
    pub fn complete(&self, raw_line: &str) -> Result<ParseResult, TokenizerError> {
        let last_token_complete = raw_line.is_empty() || raw_line.ends_with([' ', '\t']);
        let tokens = tokenize(raw_line)?;
        let values: Vec<String> = tokens.into_iter().map(|t| t.value).collect();
        Ok(self.complete_tokens(&values, last_token_complete))
    }

    pub fn complete_tokens(&self, tokens: &[String], last_token_complete: bool) -> ParseResult {
        self.matcher.run(tokens, true, last_token_complete)
    }

    /// Tokenizes and fully matches `raw_line`; on `Success`, replays its
    /// semantic actions via [`exec::execute`] (§4.5). `initial_args` binds
    /// the root rule's parameters, mirroring `exec_line`'s `arglist` — a
    /// submitted line is always matched with `last_token_complete = true`
    /// (it is a whole command, never a partial prefix).
    pub fn submit(&self, raw_line: &str, initial_args: Vec<Value>, host: &mut dyn Host) -> CommandOutcome {
        let tokens = match tokenize(raw_line) {
            Ok(t) => t,
            Err(e) => return CommandOutcome::TokenizerFailed(e),
        };
        let values: Vec<String> = tokens.into_iter().map(|t| t.value).collect();
        self.submit_tokens(&values, initial_args, host)
    }

    pub fn submit_tokens(&self, tokens: &[String], initial_args: Vec<Value>, host: &mut dyn Host) -> CommandOutcome {
        let result = self.matcher.run(tokens, false, true);
        match result.status {
            MatchStatusResult::Success => {
                let root = match self.spec.root_rule() {
                    Some(r) => r,
                    None => return CommandOutcome::Failure { offending_token: None, offending_index: None },
                };
                let path = result.path.unwrap_or_default();
                match exec::execute(root, &path, initial_args, host) {
                    Ok(values) => CommandOutcome::Executed(values),
                    Err(e) => CommandOutcome::ExecutionFailed(e),
                }
            }
            MatchStatusResult::PartialIncomplete => CommandOutcome::Incomplete {
                suggestions: result.next_tokens,
                unique_completion: result.unique_completion,
            },
            MatchStatusResult::Ambiguous => CommandOutcome::Ambiguous,
            MatchStatusResult::Failure => {
                CommandOutcome::Failure { offending_token: result.offending_token, offending_index: result.offending_index }
            }
        }
    }
}

/// The "list of nested sub-CLIs sharing one line editor" of §5: mutated
/// only by the running loop, never by a command handler directly. Entering
/// a child context pushes its name; exiting pops it. Calling the matcher on
/// an ancestor context while a descendant is active is forbidden by §5 —
/// [`CliStack::is_top`] lets a caller check that before doing so, the way
/// the original raises `CliAlreadyRunning` rather than letting two contexts
/// race over the one shared line editor.
#[derive(Debug, Default)]
pub struct CliStack {
    frames: Vec<String>,
}

impl CliStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>) {
        self.frames.push(name.into());
    }

    pub fn pop(&mut self) -> Option<String> {
        self.frames.pop()
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn is_top(&self, name: &str) -> bool {
        self.frames.last().map(String::as_str) == Some(name)
    }
}

/// Raised when a context tries to run while it is not the active (topmost)
/// entry of a shared [`CliStack`] — mirrors the original's
/// `CliAlreadyRunning`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CliAlreadyRunning;

impl<'g> Cli<'g> {
    /// Like [`Cli::submit`], but refuses to run unless `name` is the active
    /// top of `stack` (§5's reentrancy rule).
    pub fn submit_nested(
        &self,
        stack: &CliStack,
        name: &str,
        raw_line: &str,
        initial_args: Vec<Value>,
        host: &mut dyn Host,
    ) -> Result<CommandOutcome, CliAlreadyRunning> {
        if !stack.is_top(name) {
            return Err(CliAlreadyRunning);
        }
        Ok(self.submit(raw_line, initial_args, host))
    }
}

/// File-sourced line supply for non-interactive script execution (§6
/// supplement, `nessaid_cli.cli.NessaidCli._files_to_execute`): the same
/// tokenizer/matcher pipeline as interactive input, fed from a queued file
/// instead of the line editor. Two conventions layered on top of plain line
/// reading, applied before any line ever reaches [`crate::tokenizer::tokenize`]:
/// a trailing `\` merges the following line into this one (the backslash
/// itself is dropped), and a line whose first non-whitespace character is
/// `#` — only when it is not itself a continuation of an escaped line — is
/// skipped entirely. Neither convention ever applies inside a token's own
/// quoting, since both operate on whole raw lines before tokenization (§9
/// design note 1).
pub struct FileScript {
    lines: Vec<String>,
}

impl FileScript {
    /// Reads `path` and pre-merges continuation lines and drops comment
    /// lines, returning the logical command lines ready for
    /// [`Cli::submit`]/[`Cli::complete`].
    pub fn read(path: &Path) -> io::Result<Self> {
        let raw = fs::read_to_string(path)?;
        Ok(Self { lines: Self::merge(&raw) })
    }

    pub fn from_str(contents: &str) -> Self {
        Self { lines: Self::merge(contents) }
    }

    fn merge(contents: &str) -> Vec<String> {
        let mut out = Vec::new();
        let mut pending: Option<String> = None;
        for raw_line in contents.lines() {
            let line = match pending.take() {
                Some(mut carried) => {
                    carried.push_str(raw_line);
                    carried
                }
                None => raw_line.to_string(),
            };
            if let Some(body) = line.strip_suffix('\\') {
                pending = Some(body.to_string());
                continue;
            }
            if line.trim_start().starts_with('#') {
                continue;
            }
            out.push(line);
        }
        if let Some(carried) = pending {
            if !carried.trim_start().starts_with('#') {
                out.push(carried);
            }
        }
        out
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn into_lines(self) -> Vec<String> {
        self.lines
    }
}

#[cfg(test)]
mod __tests__ {
    use super::*;
    use crate::exec::NullHost;
    use crate::grammar::compile::compile;
    use crate::token::AnyString;
    use std::rc::Rc;

    #[test]
    fn completion_reports_candidate_keywords() {
        let spec = compile(r#"root: "apple" | "apricot" ;"#).unwrap();
        let tokens = TokenRegistry::new();
        let cli = Cli::new(&spec, &tokens);
        let result = cli.complete("ap").unwrap();
        assert_eq!(result.status, MatchStatusResult::PartialIncomplete);
        let mut texts: Vec<_> = result.next_tokens.iter().map(|s| s.text.clone()).collect();
        texts.sort();
        assert_eq!(texts, vec!["apple".to_string(), "apricot".to_string()]);
    }

    #[test]
    fn submit_runs_the_matched_command() {
        let spec = compile(r#"root[$n]: "bump" << $n = inc($n); >> ;"#).unwrap();
        let tokens = TokenRegistry::new();
        let cli = Cli::new(&spec, &tokens);
        let mut host = NullHost;
        let outcome = cli.submit("bump", vec![Value::Int(1)], &mut host);
        match outcome {
            CommandOutcome::Executed(values) => assert_eq!(values, vec![Value::Int(2)]),
            other => panic!("expected Executed, got {:?}", other),
        }
    }

    #[test]
    fn submit_reports_failure_on_unknown_token() {
        let spec = compile(r#"root: "hello" ;"#).unwrap();
        let tokens = TokenRegistry::new();
        let cli = Cli::new(&spec, &tokens);
        let mut host = NullHost;
        let outcome = cli.submit("goodbye", vec![], &mut host);
        assert!(matches!(outcome, CommandOutcome::Failure { offending_token: Some(t), .. } if t == "goodbye"));
    }

    #[test]
    fn validate_flags_an_unregistered_token_class() {
        let spec = compile(r#"root: WORD ;"#).unwrap();
        let tokens = TokenRegistry::new();
        let cli = Cli::new(&spec, &tokens);
        let warnings = cli.validate();
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn validate_is_silent_once_the_class_is_registered() {
        let spec = compile(r#"root: WORD ;"#).unwrap();
        let mut tokens = TokenRegistry::new();
        tokens.register("WORD", Rc::new(AnyString::new(None)));
        let cli = Cli::new(&spec, &tokens);
        assert!(cli.validate().is_empty());
    }

    #[test]
    fn reentrant_submit_is_refused_when_not_the_active_context() {
        let spec = compile(r#"root: "hello" ;"#).unwrap();
        let tokens = TokenRegistry::new();
        let cli = Cli::new(&spec, &tokens);
        let mut stack = CliStack::new();
        stack.push("parent");
        stack.push("child");
        let mut host = NullHost;
        let err = cli.submit_nested(&stack, "parent", "hello", vec![], &mut host).unwrap_err();
        assert_eq!(err, CliAlreadyRunning);
        stack.pop();
        assert!(cli.submit_nested(&stack, "parent", "hello", vec![], &mut host).is_ok());
    }

    #[test]
    fn file_script_merges_continuations_and_drops_comments() {
        let script = FileScript::from_str(
            "set \\\n  value 1\n# a full-line comment\nbump\n   # indented comment\nquit\n",
        );
        assert_eq!(script.lines(), &["set   value 1".to_string(), "bump".to_string(), "quit".to_string()]);
    }

    #[test]
    fn file_script_reads_from_disk() {
        let dir = std::env::temp_dir();
        let path = dir.join(format!("cligram_test_script_{}.cli", std::process::id()));
        std::fs::write(&path, "hello\n").unwrap();
        let script = FileScript::read(&path).unwrap();
        assert_eq!(script.into_lines(), vec!["hello".to_string()]);
        let _ = std::fs::remove_file(&path);
    }
}
