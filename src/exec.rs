//! Execution engine and builtin function table (SPEC_FULL.md §4.5, §4.6).
//!
//! Grounded on `nessaid_cli/elements.py`'s walk/enter/exit bookkeeping (an
//! `ElementWalk` owning `named_variables`/`token_variables` and running
//! `pre_match`/`post_match` bindings as the walk steps on and off each
//! production) and `nessaid_cli/compiler.py`'s builtin dispatch table. Where
//! `lang_pt` only ever needs to *build* a parse tree, a cligram grammar needs
//! one *replayed* against the winning [`crate::matcher::ParseResult::path`]
//! after a successful match — this module is that replay.
//!
//! The replay keeps one node per container actually entered (not a full
//! walk-tree arena): a [`Frame`] per step of ancestry, pushed as a token's
//! path chain is walked and popped again once the next token's ancestry
//! diverges from it. A `NamedRule` frame additionally owns a
//! [`NamedScope`] for `$name` variables; every frame owns a small
//! `token_variables` map for the `$<n>` positional variables created as its
//! children exit.

use std::collections::HashMap;
use std::rc::Rc;

use crate::error::ExecutionError;
use crate::grammar::action::{ActionExpr, ActionStmt, CallArg, LValue};
use crate::grammar::element::{Alternative, IElement, NamedRule, RuleRef};
use crate::value::{Cell, NamedScope, Value};
use crate::walk::{LookupToken, PathKey, PathSegment};

/// Identity of the frame at `depth` in `path`: the full ancestry above it
/// (each earlier segment's `child_index` genuinely distinguishes separate
/// activations reached through a different sibling or branch) plus this
/// depth's own element and repeat clone — but *not* its own `child_index`,
/// which records which child this activation is currently heading into and
/// changes as later tokens advance through its own children, without that
/// being grounds to exit and re-enter it. Mirrors how
/// `crate::matcher::next_set` keys an `OrderlessSet` activation on the
/// ancestry above it rather than on which child it is about to offer next.
fn frame_key(path: &[PathSegment], depth: usize) -> PathKey {
    let mut key: PathKey = path[..depth].iter().map(PathSegment::key).collect();
    let seg = &path[depth];
    key.push((seg.element.element_id(), usize::MAX, seg.repeat_index));
    key
}

/// The host-function side of the interpreter (§4.5, §6). A bare call
/// (`print($1)`) checks the builtin table first and falls through to
/// [`Host::call`] only if no builtin matches; a `call`-prefixed invocation
/// (`call do_thing($v)`) always goes straight to the host. `input()` bypasses
/// `call` entirely since it is itself a builtin that happens to need the
/// external line editor.
pub trait Host {
    /// Invokes a host-defined function by name. Returning
    /// `Err(ExecutionError::MissingHostFunction { .. })` (or any other
    /// `ExecutionError`) propagates to the caller of [`execute`].
    fn call(&mut self, name: &str, args: &[Value]) -> Result<Value, ExecutionError>;

    /// Whether the host recognizes `name`, checked before `call` so a bare
    /// call that matches no builtin and no host function can report
    /// `MissingHostFunction` rather than forcing every host to do so itself.
    fn has(&self, name: &str) -> bool;

    /// Suspends for a line of input from the external line editor, per the
    /// `input()` builtin (§4.6). `echo = false` requests the editor mask
    /// keystrokes (a password-style prompt).
    fn read_line(&mut self, prompt: &str, echo: bool) -> Result<String, ExecutionError>;
}

/// A [`Host`] with no host functions at all, for grammars whose actions only
/// use builtins. `input()` reads an empty line unconditionally, which is
/// enough for a non-interactive batch run (e.g. replaying a file script that
/// never prompts).
#[derive(Debug, Default)]
pub struct NullHost;

impl Host for NullHost {
    fn call(&mut self, name: &str, _args: &[Value]) -> Result<Value, ExecutionError> {
        Err(ExecutionError::MissingHostFunction { name: name.to_string() })
    }
    fn has(&self, _name: &str) -> bool {
        false
    }
    fn read_line(&mut self, _prompt: &str, _echo: bool) -> Result<String, ExecutionError> {
        Ok(String::new())
    }
}

/// One entry of the replayed walk tree: a container (or, transiently, the
/// terminal itself) currently "entered". `own_child_index` is this frame's
/// normalized position under its *parent* frame (§4.5's normalization rule:
/// 0 for every `Alternative` branch and every repeat-group clone); `None`
/// only for the root rule, which has no parent.
struct Frame {
    key: PathKey,
    element: Rc<dyn IElement>,
    own_child_index: Option<usize>,
    /// Positional `$<n>` variables, held as cells (not bare values) so a
    /// rule-ref argument that is itself `$<n>` can alias the same slot the
    /// callee mutates rather than receive a frozen copy.
    token_variables: HashMap<usize, Cell>,
    named_scope: Option<NamedScope>,
    input_sequence: Vec<String>,
}

impl Frame {
    fn contributed_value(&self) -> Value {
        match self.input_sequence.as_slice() {
            [single] => Value::Str(single.clone()),
            many => Value::List(many.iter().cloned().map(Value::Str).collect()),
        }
    }
}

/// `child_index` is normalized to 0 under an `Alternative` (every branch
/// occupies position 0 of its chosen arm); repeat-group clones already carry
/// `child_index == 0` from the matcher's path construction, so no further
/// normalization is needed there.
fn normalized_child_index(parent: &Rc<dyn IElement>, child_index: usize) -> usize {
    if parent.as_any().downcast_ref::<Alternative>().is_some() {
        0
    } else {
        child_index
    }
}

/// How a rule-ref argument was resolved against the caller's scope: either a
/// fresh value (literal, call result) or the caller's own cell handle, when
/// the argument expression was itself a `$name`/`$<n>` variable reference —
/// binding the callee's parameter to the same cell is what makes an
/// assignment inside the callee visible to the caller (§9 Design Notes).
enum ArgBinding {
    Value(Value),
    Aliased(Cell),
}

struct Executor<'h> {
    stack: Vec<Frame>,
    /// Argument bindings resolved against the *caller's* scope when a
    /// `RuleRef` frame is entered, consumed the moment its target
    /// `NamedRule` frame is pushed immediately after it.
    pending_rule_args: Option<HashMap<String, ArgBinding>>,
    root_params: Vec<String>,
    final_args: Option<Vec<Value>>,
    host: &'h mut dyn Host,
}

impl<'h> Executor<'h> {
    fn new(root: &Rc<NamedRule>, host: &'h mut dyn Host) -> Self {
        Self {
            stack: Vec::new(),
            pending_rule_args: None,
            root_params: root.params.iter().map(|p| p.name.clone()).collect(),
            final_args: None,
            host,
        }
    }

    fn current(&self) -> usize {
        self.stack.len() - 1
    }

    // -- variable lookup -----------------------------------------------

    fn find_named_frame_idx(&self, name: &str, upto: usize) -> Option<usize> {
        (0..=upto).rev().find(|&idx| {
            self.stack[idx].named_scope.as_ref().is_some_and(|s| s.contains(name))
        })
    }

    fn nearest_rule_frame_idx(&self, upto: usize) -> Option<usize> {
        (0..=upto).rev().find(|&idx| self.stack[idx].named_scope.is_some())
    }

    fn read_named(&self, name: &str, upto: usize) -> Result<Value, ExecutionError> {
        match self.find_named_frame_idx(name, upto) {
            Some(idx) => Ok(self.stack[idx].named_scope.as_ref().unwrap().get(name).unwrap().get()),
            None => {
                Err(ExecutionError::ArgumentMismatch { message: format!("undefined variable '${}'", name) })
            }
        }
    }

    fn assign_named(&mut self, name: &str, value: Value, upto: usize) -> Result<(), ExecutionError> {
        if let Some(idx) = self.find_named_frame_idx(name, upto) {
            self.stack[idx].named_scope.as_ref().unwrap().get(name).unwrap().set(value);
            return Ok(());
        }
        let idx = self.nearest_rule_frame_idx(upto).ok_or_else(|| ExecutionError::ArgumentMismatch {
            message: "variable assignment outside any rule activation".to_string(),
        })?;
        self.stack[idx].named_scope.as_mut().unwrap().declare(name, value);
        Ok(())
    }

    fn read_positional(&self, n: usize, upto: usize) -> Value {
        self.stack[upto].token_variables.get(&n).map(Cell::get).unwrap_or(Value::Null)
    }

    fn positional_cell(&self, n: usize, upto: usize) -> Option<Cell> {
        self.stack[upto].token_variables.get(&n).cloned()
    }

    fn write_positional(&mut self, n: usize, value: Value, upto: usize) {
        match self.stack[upto].token_variables.get(&n) {
            Some(cell) => cell.set(value),
            None => {
                self.stack[upto].token_variables.insert(n, Cell::new(value));
            }
        }
    }

    // -- expression evaluation -------------------------------------------

    fn eval_expr(&mut self, expr: &ActionExpr, upto: usize) -> Result<Value, ExecutionError> {
        match expr {
            ActionExpr::Literal(v) => Ok(v.clone()),
            ActionExpr::Named(name) => self.read_named(name, upto),
            ActionExpr::Positional(n) => Ok(self.read_positional(*n, upto)),
            ActionExpr::Call { name, args } => self.eval_call(name, args, upto, false),
            ActionExpr::HostCall { name, args } => self.eval_call(name, args, upto, true),
        }
    }

    fn eval_call(
        &mut self,
        name: &str,
        args: &[CallArg],
        upto: usize,
        force_host: bool,
    ) -> Result<Value, ExecutionError> {
        if !force_host && (name == "append" || name == "update") {
            return self.eval_mutator(name, args, upto);
        }

        let mut values = Vec::with_capacity(args.len());
        for a in args {
            values.push(self.eval_expr(&a.value, upto)?);
        }

        if !force_host {
            if let Some(result) = call_builtin(name, &values, self.host)? {
                return Ok(result);
            }
        }

        if !self.host.has(name) {
            return Err(ExecutionError::MissingHostFunction { name: name.to_string() });
        }
        self.host.call(name, &values)
    }

    /// `append(container, item...)` and `update(map, key, value)` mutate the
    /// variable named by their first argument in place, which an ordinary
    /// value-returning call can't express — their first argument must name a
    /// variable, not an arbitrary expression.
    fn eval_mutator(&mut self, name: &str, args: &[CallArg], upto: usize) -> Result<Value, ExecutionError> {
        let target = args.first().ok_or_else(|| ExecutionError::ArgumentMismatch {
            message: format!("{}() requires a container argument", name),
        })?;
        let mut container = self.read_lvalue(&target.value, upto)?;
        match name {
            "append" => {
                for a in &args[1..] {
                    let item = self.eval_expr(&a.value, upto)?;
                    container
                        .append(item)
                        .map_err(|message| ExecutionError::ArgumentMismatch { message })?;
                }
            }
            "update" => {
                if args.len() != 3 {
                    return Err(ExecutionError::ArgumentMismatch {
                        message: "update() requires exactly (map, key, value)".to_string(),
                    });
                }
                let key = self.eval_expr(&args[1].value, upto)?;
                let value = self.eval_expr(&args[2].value, upto)?;
                container
                    .update_map(key, value)
                    .map_err(|message| ExecutionError::ArgumentMismatch { message })?;
            }
            _ => unreachable!(),
        }
        self.write_lvalue(&target.value, upto, container.clone())?;
        Ok(container)
    }

    fn read_lvalue(&self, expr: &ActionExpr, upto: usize) -> Result<Value, ExecutionError> {
        match expr {
            ActionExpr::Named(name) => self.read_named(name, upto),
            ActionExpr::Positional(n) => Ok(self.read_positional(*n, upto)),
            _ => Err(ExecutionError::ArgumentMismatch {
                message: "expected a variable as the first argument".to_string(),
            }),
        }
    }

    fn write_lvalue(&mut self, expr: &ActionExpr, upto: usize, value: Value) -> Result<(), ExecutionError> {
        match expr {
            ActionExpr::Named(name) => self.assign_named(name, value, upto),
            ActionExpr::Positional(n) => {
                self.write_positional(*n, value, upto);
                Ok(())
            }
            _ => Err(ExecutionError::ArgumentMismatch {
                message: "expected a variable as the first argument".to_string(),
            }),
        }
    }

    fn exec_stmts(&mut self, stmts: &[ActionStmt], upto: usize) -> Result<(), ExecutionError> {
        for stmt in stmts {
            match stmt {
                ActionStmt::Assignment { lhs, rhs } => {
                    let value = self.eval_expr(rhs, upto)?;
                    match lhs {
                        LValue::Named(name) => self.assign_named(name, value, upto)?,
                        LValue::Positional(n) => self.write_positional(*n, value, upto),
                    }
                }
                ActionStmt::Expression(expr) => {
                    self.eval_expr(expr, upto)?;
                }
            }
        }
        Ok(())
    }

    // -- rule argument binding --------------------------------------------

    /// Resolves one rule-ref argument expression. `$name`/`$<n>` references
    /// forward the caller's own cell so the callee aliases it; anything else
    /// (a literal or a call result) has no caller-owned slot to alias and is
    /// bound as a fresh value.
    fn resolve_arg_binding(&mut self, expr: &ActionExpr, upto: usize) -> Result<ArgBinding, ExecutionError> {
        match expr {
            ActionExpr::Named(name) => match self.find_named_frame_idx(name, upto) {
                Some(idx) => {
                    let cell = self.stack[idx].named_scope.as_ref().unwrap().get(name).unwrap().clone();
                    Ok(ArgBinding::Aliased(cell))
                }
                None => Err(ExecutionError::ArgumentMismatch {
                    message: format!("undefined variable '${}'", name),
                }),
            },
            ActionExpr::Positional(n) => match self.positional_cell(*n, upto) {
                Some(cell) => Ok(ArgBinding::Aliased(cell)),
                None => Ok(ArgBinding::Value(Value::Null)),
            },
            other => Ok(ArgBinding::Value(self.eval_expr(other, upto)?)),
        }
    }

    fn resolve_rule_args(
        &mut self,
        rref: &RuleRef,
        upto: usize,
    ) -> Result<HashMap<String, ArgBinding>, ExecutionError> {
        let target = &rref.target;
        let mut bound: HashMap<String, ArgBinding> = HashMap::new();
        let mut positional_idx = 0usize;
        for arg in &rref.args {
            let binding = self.resolve_arg_binding(&arg.expr, upto)?;
            match &arg.name {
                Some(name) => {
                    bound.insert(name.clone(), binding);
                }
                None => {
                    let param = target.params.get(positional_idx).ok_or_else(|| {
                        ExecutionError::ArgumentMismatch {
                            message: format!("too many positional arguments for rule '{}'", target.name),
                        }
                    })?;
                    bound.insert(param.name.clone(), binding);
                    positional_idx += 1;
                }
            }
        }
        for p in &target.params {
            bound
                .entry(p.name.clone())
                .or_insert_with(|| ArgBinding::Value(p.default.clone().unwrap_or(Value::Null)));
        }
        Ok(bound)
    }

    // -- enter/exit bookkeeping -------------------------------------------

    /// Pushes a new frame for `element`, entered via `own_child_index` under
    /// its parent (`None` for the root rule), and runs its `pre_match`
    /// binding. `root_args` binds the top-level argument list positionally
    /// into the root rule's parameters; any other `NamedRule` consumes
    /// `self.pending_rule_args` left by the `RuleRef` frame entered
    /// immediately before it.
    fn enter(
        &mut self,
        key: PathKey,
        element: Rc<dyn IElement>,
        own_child_index: Option<usize>,
        root_args: Option<&[Value]>,
    ) -> Result<(), ExecutionError> {
        let named_scope = if let Some(rule) = element.as_any().downcast_ref::<NamedRule>() {
            let mut scope = NamedScope::new();
            if let Some(args) = root_args {
                for (i, param) in rule.params.iter().enumerate() {
                    let value = args.get(i).cloned().unwrap_or_else(|| param.default.clone().unwrap_or(Value::Null));
                    scope.declare(&param.name, value);
                }
            } else if let Some(mut bound) = self.pending_rule_args.take() {
                for param in &rule.params {
                    match bound.remove(&param.name) {
                        Some(ArgBinding::Aliased(cell)) => scope.declare_cell(&param.name, cell),
                        Some(ArgBinding::Value(value)) => {
                            scope.declare(&param.name, value);
                        }
                        None => {
                            scope.declare(&param.name, Value::Null);
                        }
                    }
                }
            } else {
                for param in &rule.params {
                    scope.declare(&param.name, param.default.clone().unwrap_or(Value::Null));
                }
            }
            Some(scope)
        } else {
            None
        };

        self.stack.push(Frame {
            key,
            element: element.clone(),
            own_child_index,
            token_variables: HashMap::new(),
            named_scope,
            input_sequence: Vec::new(),
        });

        let upto = self.current();
        if let Some(rref) = element.as_any().downcast_ref::<RuleRef>() {
            self.pending_rule_args = Some(self.resolve_rule_args(rref, upto)?);
        }

        let stmts = element.pre_match_binding().to_vec();
        self.exec_stmts(&stmts, upto)
    }

    /// Runs the top frame's `post_match` binding, removes it, and propagates
    /// its contributed value onto its parent as `$<own_child_index + 1>`.
    /// Popping the root frame finalizes [`Executor::final_args`] instead.
    fn exit_top(&mut self) -> Result<(), ExecutionError> {
        let upto = self.current();
        let stmts = self.stack[upto].element.post_match_binding().to_vec();
        self.exec_stmts(&stmts, upto)?;

        let frame = self.stack.pop().expect("exit_top called on an empty stack");
        let contributed = frame.contributed_value();

        match self.stack.last_mut() {
            Some(parent) => {
                if let Some(k) = frame.own_child_index {
                    parent.token_variables.insert(k + 1, Cell::new(contributed));
                }
                parent.input_sequence.extend(frame.input_sequence);
            }
            None => {
                if let Some(scope) = &frame.named_scope {
                    self.final_args = Some(
                        self.root_params
                            .iter()
                            .map(|name| scope.get(name).map(|c| c.get()).unwrap_or(Value::Null))
                            .collect(),
                    );
                }
            }
        }
        Ok(())
    }

    /// Length of the shared prefix between the stack's current path and
    /// `path`, i.e. how many already-entered frames remain valid ancestors
    /// of `path`.
    fn common_len(&self, path: &[PathSegment]) -> usize {
        let mut n = 0;
        while n < self.stack.len() && n < path.len() {
            if self.stack[n].key != frame_key(path, n) {
                break;
            }
            n += 1;
        }
        n
    }

    fn enter_missing(&mut self, path: &[PathSegment], root_args: Option<&[Value]>) -> Result<(), ExecutionError> {
        let common = self.common_len(path);
        while self.stack.len() > common {
            self.exit_top()?;
        }
        for depth in common..path.len() {
            let key = frame_key(path, depth);
            let element = path[depth].element.clone();
            let own_child_index =
                if depth == 0 { None } else { Some(normalized_child_index(&path[depth - 1].element, path[depth - 1].child_index)) };
            self.enter(key, element, own_child_index, if depth == 0 { root_args } else { None })?;
        }
        Ok(())
    }

    fn enter_exit_terminal(&mut self, lookup: &LookupToken) -> Result<(), ExecutionError> {
        let own_child_index = lookup
            .path
            .last()
            .map(|last| normalized_child_index(&last.element, last.child_index));
        self.stack.push(Frame {
            key: Vec::new(),
            element: lookup.terminal.clone(),
            own_child_index,
            token_variables: HashMap::new(),
            named_scope: None,
            input_sequence: vec![lookup.input.clone()],
        });
        let upto = self.current();
        let stmts = lookup.terminal.pre_match_binding().to_vec();
        self.exec_stmts(&stmts, upto)?;
        self.exit_top()
    }
}

/// Replays a successfully matched [`crate::matcher::ParseResult::path`]
/// against the grammar's root rule, binding `initial_args` positionally into
/// the root rule's parameters and returning their final values once every
/// frame has unwound (§4.5).
///
/// `path` empty means the root matched with no tokens consumed at all (a
/// fully optional/nullable grammar body); the root frame is still entered
/// and exited once so its parameters are bound and returned unchanged.
pub fn execute(
    root: &Rc<NamedRule>,
    path: &[LookupToken],
    initial_args: Vec<Value>,
    host: &mut dyn Host,
) -> Result<Vec<Value>, ExecutionError> {
    let mut exec = Executor::new(root, host);

    if path.is_empty() {
        let root_elem: Rc<dyn IElement> = root.clone();
        let key: PathKey = vec![(root_elem.element_id(), usize::MAX, 0)];
        exec.enter(key, root_elem, None, Some(&initial_args))?;
    } else {
        for (i, lookup) in path.iter().enumerate() {
            let root_args = if i == 0 { Some(initial_args.as_slice()) } else { None };
            exec.enter_missing(&lookup.path, root_args)?;
            exec.enter_exit_terminal(lookup)?;

            let next_path: &[PathSegment] = path.get(i + 1).map(|l| l.path.as_slice()).unwrap_or(&[]);
            let keep = exec.common_len(next_path);
            while exec.stack.len() > keep {
                exec.exit_top()?;
            }
        }
    }

    while !exec.stack.is_empty() {
        exec.exit_top()?;
    }

    Ok(exec.final_args.take().unwrap_or_default())
}

// -- builtin function table (§4.6) ---------------------------------------

/// Returns `Ok(None)` if `name` is not a builtin at all, so the caller can
/// fall through to the host's function table.
fn call_builtin(name: &str, values: &[Value], host: &mut dyn Host) -> Result<Option<Value>, ExecutionError> {
    Ok(Some(match name {
        "list" => Value::List(values.to_vec()),
        "set" => {
            let mut out: Vec<Value> = Vec::new();
            for v in values {
                if !out.contains(v) {
                    out.push(v.clone());
                }
            }
            Value::Set(out)
        }
        "dict" => Value::Map(Vec::new()),
        "inc" => numeric_delta(values.first(), 1.0)?,
        "dec" => numeric_delta(values.first(), -1.0)?,
        "add" => add_values(values)?,
        "print" => {
            let rendered: Vec<String> = values.iter().map(|v| v.to_string()).collect();
            println!("{}", rendered.join(" "));
            Value::Null
        }
        "input" => {
            let prompt = values.first().map(|v| v.to_string()).unwrap_or_default();
            let echo = !matches!(values.get(1), Some(Value::Bool(false)));
            Value::Str(host.read_line(&prompt, echo)?)
        }
        _ => return Ok(None),
    }))
}

fn numeric_delta(value: Option<&Value>, delta: f64) -> Result<Value, ExecutionError> {
    match value {
        Some(Value::Int(n)) => Ok(Value::Int(n + delta as i64)),
        Some(Value::Float(f)) => Ok(Value::Float(f + delta)),
        _ => Err(ExecutionError::ArgumentMismatch {
            message: "inc()/dec() require a single numeric argument".to_string(),
        }),
    }
}

fn add_values(values: &[Value]) -> Result<Value, ExecutionError> {
    if values.is_empty() {
        return Err(ExecutionError::ArgumentMismatch { message: "add() requires at least one argument".to_string() });
    }
    if values.iter().all(|v| matches!(v, Value::Str(_))) {
        let mut out = String::new();
        for v in values {
            if let Value::Str(s) = v {
                out.push_str(s);
            }
        }
        return Ok(Value::Str(out));
    }
    if values.iter().any(|v| matches!(v, Value::Float(_))) {
        let mut total = 0.0f64;
        for v in values {
            match v {
                Value::Int(n) => total += *n as f64,
                Value::Float(f) => total += f,
                _ => {
                    return Err(ExecutionError::ArgumentMismatch {
                        message: "add() requires numeric or string arguments, not a mix".to_string(),
                    })
                }
            }
        }
        return Ok(Value::Float(total));
    }
    let mut total = 0i64;
    for v in values {
        match v {
            Value::Int(n) => total += n,
            _ => {
                return Err(ExecutionError::ArgumentMismatch {
                    message: "add() requires numeric or string arguments, not a mix".to_string(),
                })
            }
        }
    }
    Ok(Value::Int(total))
}

#[cfg(test)]
mod __tests__ {
    use super::*;
    use crate::grammar::compile::compile;
    use crate::matcher::{Matcher, TokenRegistry};
    use crate::token::{AnyString, RangedInt};

    fn run_and_exec(
        grammar: &str,
        registry: TokenRegistry,
        tokens: &[&str],
        initial_args: Vec<Value>,
        host: &mut dyn Host,
    ) -> Vec<Value> {
        let spec = compile(grammar).unwrap();
        let matcher = Matcher::new(&spec, &registry);
        let input: Vec<String> = tokens.iter().map(|s| s.to_string()).collect();
        let result = matcher.run(&input, false, true);
        assert_eq!(result.status, crate::matcher::MatchStatusResult::Success, "{:?}", result);
        let path = result.path.unwrap();
        let root = spec.root_rule().unwrap();
        execute(root, &path, initial_args, host).unwrap()
    }

    #[test]
    fn binds_token_into_named_variable() {
        // The `<< ... >>` binds to a fresh wrapper `Sequence` around the
        // single preceding unit (WORD), so `$1` is WORD's own match, not
        // `$2` — a trailing binding never sees its earlier siblings.
        let grammar = r#"root[$greeting]: "hello" WORD << $greeting = $1; >> ;"#;
        let mut registry = TokenRegistry::new();
        registry.register("WORD", Rc::new(AnyString::new(None)));
        let out = run_and_exec(grammar, registry, &["hello", "world"], vec![Value::Null], &mut NullHost);
        assert_eq!(out, vec![Value::Str("world".to_string())]);
    }

    #[test]
    fn rule_ref_binds_caller_supplied_argument() {
        // `$total` is passed to `inner` as `$acc`; since rule-ref arguments
        // that are themselves `$variable` references alias the caller's
        // cell, `inner`'s mutation of `$acc` is visible through `$total`
        // once `inner` unwinds.
        let grammar = r#"
            root[$total]: "go" inner[$total] ;
            inner[$acc]: NUM << $acc = add($acc, 1); >> ;
        "#;
        let mut registry = TokenRegistry::new();
        registry.register("NUM", Rc::new(RangedInt::new(0, 100, 5, None)));
        let out = run_and_exec(grammar, registry, &["go", "41"], vec![Value::Int(0)], &mut NullHost);
        assert_eq!(out, vec![Value::Int(1)]);
    }

    #[test]
    fn rule_ref_with_positional_argument_also_aliases() {
        // The spec.md §8 scenario: a rule-ref argument that is `$<n>` rather
        // than `$name` aliases the same cell the callee assigns into.
        let grammar = r#"
            outer[$r]: "take" inner[$r] ;
            inner[$x]: WORD << $x = $1; >> ;
        "#;
        let mut registry = TokenRegistry::new();
        registry.register("WORD", Rc::new(AnyString::new(None)));
        let out = run_and_exec(grammar, registry, &["take", "hello"], vec![Value::Null], &mut NullHost);
        assert_eq!(out, vec![Value::Str("hello".to_string())]);
    }

    #[test]
    fn append_mutates_a_list_variable_in_place() {
        let grammar = r#"root[$items]: "take" WORD << $items = list(); append($items, $1); >> ;"#;
        let mut registry = TokenRegistry::new();
        registry.register("WORD", Rc::new(AnyString::new(None)));
        // Same wrapper-around-WORD-only binding as above: $1 is WORD's own
        // match ("apples"), not the preceding "take" literal.
        let out = run_and_exec(grammar, registry, &["take", "apples"], vec![Value::Null], &mut NullHost);
        assert_eq!(out, vec![Value::List(vec![Value::Str("apples".to_string())])]);
    }

    #[test]
    fn positional_variables_survive_across_a_multi_child_sequence() {
        // A binding wrapping a *whole* two-child group sees both children's
        // contributions ($1, $2), which only works if the group's own frame
        // stays entered across both of its children's tokens rather than
        // being exited and re-entered as matching moves from child 0 to
        // child 1 (the same container reappears in the replayed path with a
        // different `child_index` at each step, since that field records
        // which child is being headed into next, not the container's own
        // identity).
        let grammar = r#"root[$joined]: ("hello" WORD << $joined = add($1, "-", $2); >>) ;"#;
        let mut registry = TokenRegistry::new();
        registry.register("WORD", Rc::new(AnyString::new(None)));
        let out = run_and_exec(grammar, registry, &["hello", "world"], vec![Value::Null], &mut NullHost);
        assert_eq!(out, vec![Value::Str("hello-world".to_string())]);
    }

    #[test]
    fn missing_host_function_is_reported() {
        let grammar = r#"root: "go" << call launch(); >> ;"#;
        let registry = TokenRegistry::new();
        let spec = compile(grammar).unwrap();
        let matcher = Matcher::new(&spec, &registry);
        let result = matcher.run(&["go".to_string()], false, true);
        let path = result.path.unwrap();
        let root = spec.root_rule().unwrap();
        let err = execute(root, &path, vec![], &mut NullHost).unwrap_err();
        assert!(matches!(err, ExecutionError::MissingHostFunction { ref name } if name == "launch"));
    }

    #[test]
    fn inc_and_dec_are_pure_builtins() {
        let grammar = r#"root[$n]: "bump" << $n = inc($n); >> ;"#;
        let registry = TokenRegistry::new();
        let out = run_and_exec(grammar, registry, &["bump"], vec![Value::Int(4)], &mut NullHost);
        assert_eq!(out, vec![Value::Int(5)]);
    }

    #[test]
    fn empty_path_still_binds_and_returns_arguments() {
        let grammar = r#"root[$x]: { "opt" } ;"#;
        let registry = TokenRegistry::new();
        let spec = compile(grammar).unwrap();
        let matcher = Matcher::new(&spec, &registry);
        let result = matcher.run(&[], false, true);
        assert_eq!(result.status, crate::matcher::MatchStatusResult::Success);
        let path = result.path.unwrap();
        assert!(path.is_empty());
        let root = spec.root_rule().unwrap();
        let out = execute(root, &path, vec![Value::Int(7)], &mut NullHost).unwrap();
        assert_eq!(out, vec![Value::Int(7)]);
    }
}
