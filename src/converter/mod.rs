//! AST → JavaScript lowering.
//!
//! The converter drives a [`Serializer`] through ~140 per-kind handlers.
//! Cross-cutting state lives here: the scope-variable stack (declaration and
//! hoisting), the namespace/descriptor stacks, ES feature gating, the
//! truthy/or/comparison modes, and the set of runtime helpers the output
//! needs. Handlers are spread over the sibling modules by theme.

mod blocks;
mod classes;
mod control;
mod literals;
mod modules;
mod send;
mod vars;

use std::collections::{BTreeSet, HashMap};

use crate::arena::Arena;
use crate::ast::{Kind, Node, Value};
use crate::comments::Comments;
use crate::error::Error;
use crate::namespace::Namespace;
use crate::options::{Comparison, ModuleKind, Options, OrMode, Truthy};
use crate::serializer::{Origin, Serializer};
use crate::source::SourceSet;

/// Evaluation context installed by [`Converter::parse`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Statement,
    Expression,
    /// Like `Expression`, but a call-shaped node always prints with
    /// parentheses (used where JS requires an invocation).
    Method,
}

/// Runtime helpers injected on demand at the top of the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Helper {
    Truthy,
    Ror,
    Rand,
    Range,
}

/// Declaration state of a name in the current output scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarState {
    /// Declared in this scope with `let`.
    Declared,
    /// Used inside a nested construct before any declaration; a `let` line
    /// is spliced at the scope head when the scope closes.
    Pending,
    /// Referenced without declaration (assumed global).
    Implicit,
    /// Bound as a multiple-assignment target.
    Masgn,
}

pub(crate) struct Scope {
    vars: HashMap<String, VarState>,
    mark: usize,
    /// Depth of compound statements inside this scope; a first assignment at
    /// depth zero declares inline, deeper ones hoist.
    inner: usize,
    /// A nested block referenced `self`; splice `let self = this;` at the
    /// scope head.
    needs_self_alias: bool,
    /// Barrier scopes (functions) stop outward variable lookup.
    barrier: bool,
}

pub(crate) struct ClassCtx {
    pub name: String,
    /// Instance-variable names emitted as `#field`s.
    pub privates: std::collections::HashSet<String>,
    pub hash_privates: bool,
}

pub struct Converter<'a, 'o> {
    pub(crate) arena: &'a Arena,
    pub(crate) sources: &'a SourceSet,
    pub(crate) options: &'o Options,
    pub(crate) ser: Serializer,
    pub(crate) comments: Comments,

    pub(crate) state: State,
    scopes: Vec<Scope>,
    pub(crate) namespace: Namespace<'a>,
    pub(crate) helpers: BTreeSet<Helper>,
    pub(crate) block_depth: usize,
    /// Depth of `function(){}` blocks where `self` stands in for the outer
    /// `this`.
    pub(crate) self_alias_depth: usize,
    pub(crate) class_stack: Vec<ClassCtx>,
    /// Name of the enclosing method (`super` targets it).
    pub(crate) current_method: Option<String>,
    /// Parameter names of the enclosing method (`zsuper` reuses them).
    pub(crate) current_method_args: Vec<String>,
    /// Bound exception variable names, innermost last.
    pub(crate) rescue_vars: Vec<String>,
    /// Name `yield` invokes in the enclosing definition.
    pub(crate) yield_target: Option<String>,
    /// Inside a `loop do ... end` that hoisted `_loop_result`.
    pub(crate) break_value_allowed: bool,
    /// Depth of retry-capable rescue wrappers (`retry` → `continue`).
    pub(crate) in_retry_rescue: usize,
    /// Inside a pnode accumulator IIFE (`$_ +=` statements).
    pub(crate) pnode_accumulating: bool,
}

impl<'a, 'o> Converter<'a, 'o> {
    pub fn new(
        arena: &'a Arena,
        sources: &'a SourceSet,
        options: &'o Options,
        comments: Comments,
        vertical: bool,
    ) -> Self {
        Converter {
            arena,
            sources,
            options,
            ser: Serializer::new(options.width, vertical),
            comments,
            state: State::Statement,
            scopes: Vec::new(),
            namespace: Namespace::new(),
            helpers: BTreeSet::new(),
            block_depth: 0,
            self_alias_depth: 0,
            class_stack: Vec::new(),
            current_method: None,
            current_method_args: Vec::new(),
            rescue_vars: Vec::new(),
            yield_target: None,
            break_value_allowed: false,
            in_retry_rescue: 0,
            pnode_accumulating: false,
        }
    }

    /// Converts a whole program, returning the code and leaving the
    /// serializer available for source-map assembly.
    pub fn convert(&mut self, program: &'a Node<'a>) -> Result<(), Error> {
        self.push_scope(true);
        self.stmt(program)?;
        self.finish_statement(program);
        let orphans = std::mem::take(&mut self.comments.orphans);
        for comment in &orphans {
            self.emit_comment(comment);
        }
        self.pop_scope();

        // Helpers precede the strict directive.
        let mut head: Vec<String> = Vec::new();
        for helper in &self.helpers {
            head.push(helper_source(*helper).to_string());
        }
        if self.options.strict {
            head.push("\"use strict\";".to_string());
        }
        for line in head.into_iter().rev() {
            for piece in line.rsplit('\n') {
                self.ser.insert_line(0, piece);
            }
        }

        self.ser.respace();
        Ok(())
    }

    // ── dispatch ───────────────────────────────────────────────────────

    pub(crate) fn parse(&mut self, node: &'a Node<'a>, state: State) -> Result<(), Error> {
        let saved_state = std::mem::replace(&mut self.state, state);
        let saved_origin = self.ser.set_origin(node.loc.map(|loc| Origin {
            source: loc.source,
            pos: loc.span.start,
            with_name: false,
        }));

        if state == State::Statement {
            for comment in self.comments.take(node.id()) {
                self.emit_comment(&comment);
            }
        }

        let result = self.dispatch(node);

        self.ser.set_origin(saved_origin);
        self.state = saved_state;
        result
    }

    pub(crate) fn stmt(&mut self, node: &'a Node<'a>) -> Result<(), Error> {
        self.parse(node, State::Statement)
    }

    pub(crate) fn expr(&mut self, node: &'a Node<'a>) -> Result<(), Error> {
        self.parse(node, State::Expression)
    }

    fn dispatch(&mut self, node: &'a Node<'a>) -> Result<(), Error> {
        match node.kind {
            Kind::Int | Kind::Float => self.on_number(node),
            Kind::Rational | Kind::Complex => Err(Error::unsupported(
                format!("{} literals have no JavaScript form", node.kind),
                node.loc,
            )),
            Kind::Str => self.on_str(node),
            Kind::Dstr | Kind::Dsym => self.on_dstr(node),
            Kind::Sym => self.on_sym(node),
            Kind::Regexp => self.on_regexp(node),
            Kind::Regopt => Err(Error::unsupported("stray regopt", node.loc)),
            Kind::Xstr => self.on_xstr(node),
            Kind::Nil => {
                self.put("null");
                Ok(())
            }
            Kind::True => {
                self.put("true");
                Ok(())
            }
            Kind::False => {
                self.put("false");
                Ok(())
            }
            Kind::Self_ => {
                if self.self_alias_depth > 0 {
                    self.put("self");
                } else {
                    self.put("this");
                }
                Ok(())
            }

            Kind::Lvar => self.on_lvar(node),
            Kind::Ivar => self.on_ivar(node),
            Kind::Cvar => self.on_cvar(node),
            Kind::Gvar => self.on_gvar(node),
            Kind::NthRef | Kind::BackRef => Err(Error::unsupported(
                "regexp capture globals",
                node.loc,
            )),
            Kind::Const => self.on_const(node),
            Kind::Cbase => Ok(()),

            Kind::Lvasgn => self.on_lvasgn(node),
            Kind::Ivasgn => self.on_ivasgn(node),
            Kind::Cvasgn => self.on_cvasgn(node),
            Kind::Gvasgn => self.on_gvasgn(node),
            Kind::Casgn => self.on_casgn(node),
            Kind::Masgn => self.on_masgn(node),
            Kind::Mlhs => self.on_mlhs(node),
            Kind::OpAsgn => self.on_op_asgn(node),
            Kind::OrAsgn => self.on_or_asgn(node),
            Kind::AndAsgn => self.on_and_asgn(node),
            Kind::MatchPattern | Kind::MatchPatternP => self.on_match_pattern(node),

            Kind::Send
            | Kind::Csend
            | Kind::Sendw
            | Kind::SendBang
            | Kind::Await
            | Kind::AwaitBang
            | Kind::AwaitAttr
            | Kind::Attr
            | Kind::Call => self.on_send(node),

            Kind::Block | Kind::Numblock => self.on_block(node),
            Kind::BlockPass => self.on_block_pass(node),
            Kind::Super | Kind::Zsuper => self.on_super(node),
            Kind::Yield => self.on_yield(node),

            Kind::Args => self.on_args(node),
            Kind::Arg
            | Kind::Optarg
            | Kind::Restarg
            | Kind::Kwarg
            | Kind::Kwoptarg
            | Kind::Kwrestarg
            | Kind::Blockarg
            | Kind::Shadowarg => self.on_formal_arg(node),

            Kind::And | Kind::Or => self.on_and_or(node),
            Kind::Not => self.on_not(node),
            Kind::Nullish => self.on_nullish(node),
            Kind::Defined => self.on_defined(node),
            Kind::Typeof => self.on_typeof(node),
            Kind::Irange | Kind::Erange => self.on_range(node),
            Kind::Begin => self.on_begin(node),
            Kind::Kwbegin => self.on_kwbegin(node),

            Kind::If => self.on_if(node),
            Kind::Case => self.on_case(node),
            Kind::CaseMatch => self.on_case_match(node),
            Kind::When | Kind::InPattern | Kind::Resbody => Err(Error::unsupported(
                format!("{} outside its parent construct", node.kind),
                node.loc,
            )),
            Kind::While | Kind::Until => self.on_while(node),
            Kind::WhilePost | Kind::UntilPost => self.on_while_post(node),
            Kind::For => self.on_for(node),
            Kind::Break => self.on_break(node),
            Kind::Next => {
                self.put("continue");
                Ok(())
            }
            Kind::Redo => {
                self.put("redo$ = true");
                self.put("; ");
                self.put("continue");
                Ok(())
            }
            Kind::Retry => {
                if self.in_retry_rescue > 0 {
                    self.put("continue");
                    Ok(())
                } else {
                    Err(Error::unsupported("retry outside a rescue clause", node.loc))
                }
            }
            Kind::Return => self.on_return(node),
            Kind::Rescue | Kind::Ensure => self.on_kwbegin_inner(node),

            Kind::Array => self.on_array(node),
            Kind::Hash => self.on_hash(node),
            Kind::Pair => self.on_pair(node),
            Kind::Splat => self.on_splat(node),
            Kind::Kwsplat => self.on_kwsplat(node),

            Kind::Class => self.on_class(node),
            Kind::Module => self.on_module(node),
            Kind::Sclass => self.on_sclass(node),
            Kind::Def | Kind::Defs => self.on_def(node),
            Kind::Alias => self.on_alias(node),
            Kind::Undef => self.on_undef(node),

            Kind::HashPattern
            | Kind::ArrayPattern
            | Kind::FindPattern
            | Kind::MatchVar
            | Kind::MatchAlt
            | Kind::MatchAs
            | Kind::MatchRest
            | Kind::MatchNil
            | Kind::Pin
            | Kind::IfGuard
            | Kind::UnlessGuard => Err(Error::unsupported(
                "pattern outside case/in",
                node.loc,
            )),

            Kind::Import => self.on_import(node),
            Kind::Export => self.on_export(node, false),
            Kind::ExportDefault => self.on_export(node, true),
            Kind::Xnode => self.on_xnode(node),
            Kind::Pnode => self.on_pnode(node),
            Kind::Prop => Err(Error::unsupported("prop outside xnode", node.loc)),

            Kind::Autoreturn => self.on_autoreturn(node),
            Kind::Autobind | Kind::PrivateMethod | Kind::Setter => Err(Error::unsupported(
                format!("{} descriptor in value position", node.kind),
                node.loc,
            )),
            Kind::NoOp => Ok(()),
        }
    }

    // ── statement sequencing ───────────────────────────────────────────

    /// Splits a body node into its statement list.
    pub(crate) fn body_list(&self, node: &'a Node<'a>) -> Vec<&'a Node<'a>> {
        match node.kind {
            Kind::Begin => node.child_nodes().collect(),
            _ => vec![node],
        }
    }

    /// Emits a statement sequence with separators and terminators.
    pub(crate) fn stmts(&mut self, list: &[&'a Node<'a>]) -> Result<(), Error> {
        for (i, node) in list.iter().enumerate() {
            if i > 0 {
                if self.ser.vertical() {
                    if !self.ser.current_line_blank() {
                        self.ser.newline();
                    }
                } else {
                    self.put(" ");
                }
            }
            self.stmt(node)?;
            self.finish_statement(node);
        }
        Ok(())
    }

    /// Appends `;` to statements that need one.
    pub(crate) fn terminate(&mut self, node: &'a Node<'a>) {
        if needs_semicolon(node) && !self.ser.current_line_blank() {
            self.put(";");
        }
    }

    /// Terminator plus any trailing comment bound to this statement.
    pub(crate) fn finish_statement(&mut self, node: &'a Node<'a>) {
        self.terminate(node);
        if let Some(comment) = self.comments.take_trailing(node.id()) {
            self.put(" ");
            let rendered = render_comment_inline(&comment.text);
            self.put(&rendered);
        }
    }

    /// Emits a body inside braces, tracking inner depth for hoisting.
    pub(crate) fn brace_body(&mut self, body: &'a Node<'a>) -> Result<(), Error> {
        self.put(" {");
        let list = self.body_list(body);
        if list.is_empty() {
            self.put("}");
            return Ok(());
        }
        if let Some(scope) = self.scopes.last_mut() {
            scope.inner += 1;
        }
        self.ser.newline();
        let result = self.stmts(&list);
        if let Some(scope) = self.scopes.last_mut() {
            scope.inner -= 1;
        }
        result?;
        self.ser.sput("}");
        Ok(())
    }

    // ── scope and variable management ──────────────────────────────────

    pub(crate) fn push_scope(&mut self, barrier: bool) {
        let mark = self.ser.mark();
        self.scopes.push(Scope {
            vars: HashMap::new(),
            mark,
            inner: 0,
            needs_self_alias: false,
            barrier,
        });
    }

    /// Closes the scope: splices the `self` alias and a `let` line for any
    /// names still pending.
    pub(crate) fn pop_scope(&mut self) {
        let Some(scope) = self.scopes.pop() else { return };
        let mut pending: Vec<&String> = scope
            .vars
            .iter()
            .filter(|(_, state)| **state == VarState::Pending)
            .map(|(name, _)| name)
            .collect();
        pending.sort();
        if !pending.is_empty() {
            let names = pending
                .iter()
                .map(|s| s.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            self.ser.insert_line(scope.mark, &format!("let {};", names));
        }
        if scope.needs_self_alias {
            self.ser.insert_line(scope.mark, "let self = this;");
        }
    }

    pub(crate) fn var_state(&self, name: &str) -> Option<VarState> {
        for scope in self.scopes.iter().rev() {
            if let Some(state) = scope.vars.get(name) {
                return Some(*state);
            }
            if scope.barrier {
                break;
            }
        }
        None
    }

    pub(crate) fn set_var(&mut self, name: &str, state: VarState) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.vars.insert(name.to_string(), state);
        }
    }

    pub(crate) fn scope_inner_depth(&self) -> usize {
        self.scopes.last().map(|s| s.inner).unwrap_or(0)
    }

    pub(crate) fn request_self_alias(&mut self) {
        for scope in self.scopes.iter_mut().rev() {
            if scope.barrier {
                scope.needs_self_alias = true;
                return;
            }
        }
    }

    /// Declaration prefix for an assignment to `name`: emits `let ` when
    /// this is a first, hoistable-free declaration; registers hoisting when
    /// the first assignment happens inside a nested construct.
    pub(crate) fn declare_on_assign(&mut self, name: &str) {
        match self.var_state(name) {
            Some(VarState::Declared) | Some(VarState::Masgn) | Some(VarState::Implicit) => {}
            Some(VarState::Pending) => {}
            None => {
                if self.scope_inner_depth() == 0 && self.state == State::Statement {
                    self.put("let ");
                    self.set_var(name, VarState::Declared);
                } else {
                    self.set_var(name, VarState::Pending);
                }
            }
        }
    }

    // ── emission helpers ───────────────────────────────────────────────

    pub(crate) fn put(&mut self, s: &str) {
        self.ser.put(s);
    }

    /// Emits an identifier that the source map records in `names`.
    pub(crate) fn put_named(&mut self, s: &str) {
        let prev = self.ser.set_origin(None);
        let named = prev.map(|o| Origin { with_name: true, ..o });
        self.ser.set_origin(named.or(prev));
        self.ser.put(s);
        self.ser.set_origin(prev);
    }

    /// Runs the emitter into a scratch region and returns the text instead
    /// of committing it (speculative formatting, source-map probes).
    pub(crate) fn capture_text(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<(), Error>,
    ) -> Result<String, Error> {
        let mark = self.ser.begin_capture();
        let result = f(self);
        let text = self.ser.end_capture(mark);
        result?;
        Ok(text)
    }

    pub(crate) fn need_helper(&mut self, helper: Helper) {
        if matches!(helper, Helper::Ror | Helper::Rand) {
            self.helpers.insert(Helper::Truthy);
        }
        self.helpers.insert(helper);
    }

    pub(crate) fn es(&self, year: u16) -> bool {
        self.options.eslevel >= year
    }

    pub(crate) fn comparison(&self) -> Comparison {
        self.options.comparison
    }

    pub(crate) fn or_mode(&self) -> OrMode {
        self.options.or
    }

    pub(crate) fn truthy_mode(&self) -> Truthy {
        self.options.truthy
    }

    pub(crate) fn module_kind(&self) -> ModuleKind {
        self.options.module
    }

    pub(crate) fn underscored_private(&self) -> bool {
        self.options.underscored_private()
    }

    // ── precedence ─────────────────────────────────────────────────────

    /// Emits an operand, parenthesising when its own priority binds looser
    /// than the surrounding operator demands.
    pub(crate) fn operand(&mut self, node: &'a Node<'a>, min_priority: u8) -> Result<(), Error> {
        if node_priority(node) < min_priority || node.kind.is_group() {
            self.put("(");
            self.expr(node)?;
            self.put(")");
            Ok(())
        } else {
            self.expr(node)
        }
    }

    /// Emits a condition with Ruby-truthiness wrapping when configured.
    pub(crate) fn condition(&mut self, node: &'a Node<'a>) -> Result<(), Error> {
        if self.truthy_mode() == Truthy::Ruby && !is_boolean_expr(node) {
            self.need_helper(Helper::Truthy);
            self.put("$T(");
            self.expr(node)?;
            self.put(")");
            Ok(())
        } else {
            self.expr(node)
        }
    }

    // ── comments ───────────────────────────────────────────────────────

    pub(crate) fn emit_comment(&mut self, comment: &crate::comments::Comment) {
        if !self.ser.current_line_blank() {
            self.ser.newline();
        }
        for line in render_comment(&comment.text) {
            self.ser.puts(&line);
        }
    }
}

/// Block comments stay block comments unless the body contains `*/`.
fn render_comment(text: &str) -> Vec<String> {
    if let Some(body) = text
        .strip_prefix("=begin")
        .and_then(|t| t.strip_suffix("=end"))
    {
        let body = body.trim_matches('\n');
        if body.contains("*/") {
            body.lines().map(|l| format!("// {}", l.trim_start())).collect()
        } else {
            let mut out = vec!["/*".to_string()];
            for line in body.lines() {
                out.push(format!(" * {}", line.trim_start()));
            }
            out.push(" */".to_string());
            out
        }
    } else {
        vec![render_comment_inline(text).to_string()]
    }
}

fn render_comment_inline(text: &str) -> String {
    match text.strip_prefix('#') {
        Some(rest) => format!("//{}", rest),
        None => format!("// {}", text),
    }
}

/// Whether a statement needs a `;` terminator. Brace-ended constructs do
/// not.
fn needs_semicolon(node: &Node) -> bool {
    !matches!(
        node.kind,
        Kind::If
            | Kind::While
            | Kind::Until
            | Kind::For
            | Kind::Case
            | Kind::CaseMatch
            | Kind::Kwbegin
            | Kind::Class
            | Kind::Module
            | Kind::Sclass
            | Kind::Def
            | Kind::Defs
            | Kind::Begin
            | Kind::NoOp
            | Kind::Import
            | Kind::Export
            | Kind::ExportDefault
    )
}

/// Operator priority: higher binds tighter; equal priorities tie-break to
/// the right.
pub(crate) fn op_priority(op: &str) -> u8 {
    match op {
        "**" => 14,
        "!" | "-@" | "+@" | "~" => 13,
        "*" | "/" | "%" => 12,
        "+" | "-" => 11,
        "<<" | ">>" => 10,
        "<" | "<=" | ">" | ">=" => 9,
        "==" | "!=" | "===" | "!==" | "=~" | "!~" | "<=>" => 8,
        "&" => 7,
        "^" => 6,
        "|" => 5,
        _ => 15,
    }
}

pub(crate) fn node_priority(node: &Node) -> u8 {
    match node.kind {
        kind if kind.is_send_family() => match node.str_child(1) {
            Some(op) => op_priority(op),
            None => 15,
        },
        Kind::Not => 13,
        Kind::And => 4,
        Kind::Or | Kind::Nullish => 3,
        Kind::If => 2,
        Kind::Lvasgn
        | Kind::Ivasgn
        | Kind::Cvasgn
        | Kind::Gvasgn
        | Kind::Casgn
        | Kind::Masgn
        | Kind::OpAsgn
        | Kind::OrAsgn
        | Kind::AndAsgn => 1,
        kind if kind.is_group() => 0,
        _ => 15,
    }
}

/// Expressions that are already boolean-valued in JS, where `$T` wrapping
/// and `??` selection are unnecessary.
pub(crate) fn is_boolean_expr(node: &Node) -> bool {
    match node.kind {
        Kind::True | Kind::False | Kind::Not | Kind::Defined => true,
        Kind::And | Kind::Or => node.child_nodes().all(is_boolean_expr),
        kind if kind.is_send_family() => matches!(
            node.str_child(1),
            Some("==") | Some("!=") | Some("<") | Some(">") | Some("<=") | Some(">=")
                | Some("===") | Some("!==") | Some("=~") | Some("!~")
                | Some("is_a?") | Some("kind_of?") | Some("instance_of?")
        ),
        _ => false,
    }
}

fn helper_source(helper: Helper) -> &'static str {
    match helper {
        Helper::Truthy => "let $T = (v) => v !== false && v !== null && v !== undefined;",
        Helper::Ror => "let $ror = (a, b) => $T(a) ? a : b();",
        Helper::Rand => "let $rand = (a, b) => $T(a) ? b() : a;",
        Helper::Range => concat!(
            "class $Range {\n",
            "  constructor(start, end, exclusive = false) {\n",
            "    this.start = start;\n",
            "    this.end = end;\n",
            "    this.exclusive = exclusive\n",
            "  }\n",
            "  includes(value) {\n",
            "    return value >= this.start && (this.exclusive ? value < this.end : value <= this.end)\n",
            "  }\n",
            "  *[Symbol.iterator]() {\n",
            "    for (let i = this.start; this.exclusive ? i < this.end : i <= this.end; i++) yield i\n",
            "  }\n",
            "  toArray() {\n",
            "    return [...this]\n",
            "  }\n",
            "}"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn op_priority_orders_arithmetic_over_comparison() {
        assert!(op_priority("*") > op_priority("+"));
        assert!(op_priority("+") > op_priority("=="));
        assert!(op_priority("**") > op_priority("*"));
    }

    #[test]
    fn boolean_expr_detection() {
        use crate::arena::Arena;
        use crate::ast::s;

        let arena = Arena::new();
        let t = s(&arena, Kind::True, &[]);
        assert!(is_boolean_expr(t));

        let one = s(&arena, Kind::Int, &[Value::Int(1)]);
        let two = s(&arena, Kind::Int, &[Value::Int(2)]);
        let cmp = s(
            &arena,
            Kind::Send,
            &[Value::Node(one), Value::Str("<"), Value::Node(two)],
        );
        assert!(is_boolean_expr(cmp));

        let plus = s(
            &arena,
            Kind::Send,
            &[Value::Node(one), Value::Str("+"), Value::Node(two)],
        );
        assert!(!is_boolean_expr(plus));
    }

    #[test]
    fn comment_rendering_policy() {
        assert_eq!(render_comment("# note"), vec!["// note"]);
        let block = render_comment("=begin\nline one\nline two\n=end");
        assert_eq!(block, vec!["/*", " * line one", " * line two", " */"]);
        // A body containing `*/` falls back to line comments.
        let tricky = render_comment("=begin\nhas */ inside\n=end");
        assert_eq!(tricky, vec!["// has */ inside"]);
    }
}
