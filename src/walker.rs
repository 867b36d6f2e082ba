//! Parse-tree → semantic AST.
//!
//! The external parser hands us a concrete syntax tree over the original
//! source; each handler here builds the corresponding uniform AST node with
//! a location record. The walker also tracks lexical locals (the parser does
//! not resolve them) so a bare identifier can be classified as `lvar` versus
//! a receiverless `send`, and collects every comment for the associator.

use std::collections::HashSet;

use tree_sitter::{Node as Ts, Tree};

use crate::arena::Arena;
use crate::ast::{s_loc, Kind, Node, Value};
use crate::comments::Comment;
use crate::error::Error;
use crate::source::{Loc, SourceId, Span};

pub struct Walker<'a, 't> {
    arena: &'a Arena,
    text: &'t str,
    source: SourceId,
    scopes: Vec<LocalScope>,
    heredocs: Vec<(usize, Ts<'t>)>,
}

struct LocalScope {
    names: HashSet<String>,
    /// Method and class bodies do not see enclosing locals; blocks do.
    barrier: bool,
}

/// Parses nothing itself: walks an externally produced tree.
pub fn walk<'a>(
    arena: &'a Arena,
    tree: &Tree,
    text: &str,
    source: SourceId,
) -> Result<(&'a Node<'a>, Vec<Comment>), Error> {
    let root = tree.root_node();
    if root.has_error() {
        let err = find_error(root).unwrap_or(root);
        return Err(Error::Parse {
            message: format!("syntax error near `{}`", snippet(text, err)),
            loc: Loc::new(source, err.start_byte(), err.end_byte()),
        });
    }

    let mut walker = Walker {
        arena,
        text,
        source,
        scopes: vec![LocalScope { names: HashSet::new(), barrier: true }],
        heredocs: collect_heredocs(root),
    };

    let comments = collect_comments(root, text, source);
    let program = walker.statements(root, root.start_byte(), root.end_byte())?;
    log::debug!("walker produced AST for {} bytes of source", text.len());
    Ok((program, comments))
}

fn find_error(node: Ts) -> Option<Ts> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.has_error() {
            if let Some(found) = find_error(child) {
                return Some(found);
            }
        }
    }
    None
}

fn snippet<'t>(text: &'t str, node: Ts) -> &'t str {
    let range = node.byte_range();
    let end = range.end.min(range.start + 20).min(text.len());
    &text[range.start.min(text.len())..end]
}

fn collect_comments(root: Ts, text: &str, source: SourceId) -> Vec<Comment> {
    let mut out = Vec::new();
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        let mut cursor = node.walk();
        let mut kids: Vec<Ts> = node.children(&mut cursor).collect();
        kids.reverse();
        for child in kids {
            if child.kind() == "comment" {
                out.push(Comment {
                    text: text[child.byte_range()].to_string(),
                    loc: Loc::new(source, child.start_byte(), child.end_byte()),
                });
            } else {
                stack.push(child);
            }
        }
    }
    out.sort_by_key(|c| c.loc.span.start);
    out
}

fn collect_heredocs<'t>(root: Ts<'t>) -> Vec<(usize, Ts<'t>)> {
    let mut out = Vec::new();
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if child.kind() == "heredoc_body" {
                out.push((child.start_byte(), child));
            }
            stack.push(child);
        }
    }
    out.sort_by_key(|(start, _)| *start);
    out
}

impl<'a, 't> Walker<'a, 't> {
    fn text_of(&self, n: Ts) -> &'t str {
        &self.text[n.byte_range()]
    }

    fn loc(&self, n: Ts) -> Loc {
        Loc::new(self.source, n.start_byte(), n.end_byte())
    }

    fn s(&self, kind: Kind, children: &[Value<'a>], loc: Loc) -> &'a Node<'a> {
        s_loc(self.arena, kind, children, Some(loc))
    }

    fn str_val(&self, s: &str) -> Value<'a> {
        Value::Str(self.arena.alloc_str(s))
    }

    fn unsupported(&self, n: Ts, what: &str) -> Error {
        Error::unsupported(
            format!("unsupported construct: {}", what),
            Some(self.loc(n)),
        )
    }

    // ── local variable tracking ────────────────────────────────────────

    fn push_scope(&mut self, barrier: bool) {
        self.scopes.push(LocalScope { names: HashSet::new(), barrier });
    }

    fn pop_scope(&mut self) {
        self.scopes.pop();
    }

    fn declare(&mut self, name: &str) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.names.insert(name.to_string());
        }
    }

    fn known_local(&self, name: &str) -> bool {
        for scope in self.scopes.iter().rev() {
            if scope.names.contains(name) {
                return true;
            }
            if scope.barrier {
                return false;
            }
        }
        false
    }

    // ── structure helpers ──────────────────────────────────────────────

    fn named_children(&self, n: Ts<'t>) -> Vec<Ts<'t>> {
        let mut cursor = n.walk();
        n.named_children(&mut cursor)
            .filter(|c| c.kind() != "comment" && c.kind() != "heredoc_body")
            .collect()
    }

    /// Sequence of statements as a single node: empty → nil-flavoured
    /// `begin`, one child → that child, otherwise a `begin`.
    fn statements(&mut self, n: Ts<'t>, start: usize, end: usize) -> Result<&'a Node<'a>, Error> {
        let kids = self.named_children(n);
        self.statement_list(&kids, start, end)
    }

    fn statement_list(
        &mut self,
        kids: &[Ts<'t>],
        start: usize,
        end: usize,
    ) -> Result<&'a Node<'a>, Error> {
        let loc = Loc::new(self.source, start, end);
        let mut out: Vec<Value<'a>> = Vec::with_capacity(kids.len());
        for kid in kids {
            if kid.kind() == "empty_statement" {
                continue;
            }
            out.push(Value::Node(self.node(*kid)?));
        }
        match out.len() {
            0 => Ok(self.s(Kind::Begin, &[], loc)),
            1 => Ok(out[0].as_node().expect("statement")),
            _ => Ok(self.s(Kind::Begin, &out, loc)),
        }
    }

    /// Like `statements` but keeps rescue/ensure/else clauses out, for
    /// bodies that carry them (`begin`, method bodies).
    fn guarded_body(&mut self, n: Ts<'t>) -> Result<&'a Node<'a>, Error> {
        let kids = self.named_children(n);
        let plain: Vec<Ts> = kids
            .iter()
            .copied()
            .filter(|k| !matches!(k.kind(), "rescue" | "ensure" | "else"))
            .collect();
        let body = self.statement_list(&plain, n.start_byte(), n.end_byte())?;

        let rescues: Vec<Ts> = kids.iter().copied().filter(|k| k.kind() == "rescue").collect();
        let else_clause = kids.iter().copied().find(|k| k.kind() == "else");
        let ensure_clause = kids.iter().copied().find(|k| k.kind() == "ensure");

        if rescues.is_empty() && else_clause.is_none() && ensure_clause.is_none() {
            return Ok(body);
        }

        let loc = self.loc(n);
        let mut wrapped = body;

        if !rescues.is_empty() || else_clause.is_some() {
            let mut children: Vec<Value<'a>> = vec![Value::Node(wrapped)];
            for clause in &rescues {
                children.push(Value::Node(self.resbody(*clause)?));
            }
            match else_clause {
                Some(e) => {
                    let else_body = self.statements(e, e.start_byte(), e.end_byte())?;
                    children.push(Value::Node(else_body));
                }
                None => children.push(Value::Nil),
            }
            wrapped = self.s(Kind::Rescue, &children, loc);
        }

        if let Some(e) = ensure_clause {
            let ensure_body = self.statements(e, e.start_byte(), e.end_byte())?;
            wrapped = self.s(
                Kind::Ensure,
                &[Value::Node(wrapped), Value::Node(ensure_body)],
                loc,
            );
        }

        Ok(self.s(Kind::Kwbegin, &[Value::Node(wrapped)], loc))
    }

    fn resbody(&mut self, clause: Ts<'t>) -> Result<&'a Node<'a>, Error> {
        let loc = self.loc(clause);
        let kids = self.named_children(clause);

        let mut exceptions = Value::Nil;
        let mut variable = Value::Nil;
        let mut body = Value::Nil;
        for kid in kids {
            match kid.kind() {
                "exceptions" => {
                    let excs = self.named_children(kid);
                    let mut list: Vec<Value<'a>> = Vec::new();
                    for e in excs {
                        list.push(Value::Node(self.node(e)?));
                    }
                    exceptions = Value::Node(self.s(Kind::Array, &list, self.loc(kid)));
                }
                "exception_variable" => {
                    let inner = self.named_children(kid);
                    if let Some(var) = inner.first() {
                        let name = self.text_of(*var);
                        self.declare(name);
                        variable = Value::Node(self.s(
                            Kind::Lvasgn,
                            &[self.str_val(name)],
                            self.loc(*var),
                        ));
                    }
                }
                "then" => {
                    body = Value::Node(self.statements(kid, kid.start_byte(), kid.end_byte())?);
                }
                _ => {
                    // bare statements directly under the rescue clause
                    let stmt = self.node(kid)?;
                    body = Value::Node(stmt);
                }
            }
        }
        Ok(self.s(Kind::Resbody, &[exceptions, variable, body], loc))
    }

    // ── dispatch ───────────────────────────────────────────────────────

    pub fn node(&mut self, n: Ts<'t>) -> Result<&'a Node<'a>, Error> {
        let loc = self.loc(n);
        match n.kind() {
            "program" => self.statements(n, n.start_byte(), n.end_byte()),
            "parenthesized_statements" => {
                let inner = self.statements(n, n.start_byte(), n.end_byte())?;
                Ok(self.s(Kind::Begin, &[Value::Node(inner)], loc))
            }
            "body_statement" => self.guarded_body(n),

            // Literals
            "integer" => {
                let raw = self.text_of(n).replace('_', "");
                match raw.parse::<i64>() {
                    Ok(v) => Ok(self.s(Kind::Int, &[Value::Int(v)], loc)),
                    // Too large for i64 (or a radix literal): keep the text.
                    Err(_) => Ok(self.s(Kind::Int, &[self.str_val(&raw)], loc)),
                }
            }
            "float" => {
                let raw = self.text_of(n).replace('_', "");
                let v: f64 = raw.parse().map_err(|_| self.unsupported(n, "float literal"))?;
                Ok(self.s(Kind::Float, &[Value::Float(v)], loc))
            }
            "rational" => {
                let raw = self.text_of(n);
                Ok(self.s(Kind::Rational, &[self.str_val(raw.trim_end_matches('r'))], loc))
            }
            "complex" => {
                let raw = self.text_of(n);
                Ok(self.s(Kind::Complex, &[self.str_val(raw.trim_end_matches('i'))], loc))
            }
            "true" => Ok(self.s(Kind::True, &[], loc)),
            "false" => Ok(self.s(Kind::False, &[], loc)),
            "nil" => Ok(self.s(Kind::Nil, &[], loc)),
            "self" => Ok(self.s(Kind::Self_, &[], loc)),
            "character" => {
                let ch = self.text_of(n).trim_start_matches('?');
                Ok(self.s(Kind::Str, &[self.str_val(ch)], loc))
            }
            "string" => self.string(n),
            "subshell" => {
                let parts = self.string_parts(n)?;
                Ok(self.s(Kind::Xstr, &parts, loc))
            }
            "heredoc_beginning" => self.heredoc(n),
            "simple_symbol" => {
                let name = self.text_of(n).trim_start_matches(':');
                Ok(self.s(Kind::Sym, &[self.str_val(name)], loc))
            }
            "hash_key_symbol" => {
                let name = self.text_of(n);
                Ok(self.s(Kind::Sym, &[self.str_val(name)], loc))
            }
            "delimited_symbol" => {
                let parts = self.string_parts(n)?;
                if parts.len() == 1 && parts[0].as_node().map(|p| p.kind) == Some(Kind::Str) {
                    let inner = parts[0].as_node().expect("part");
                    Ok(self.s(Kind::Sym, inner.children, loc))
                } else {
                    Ok(self.s(Kind::Dsym, &parts, loc))
                }
            }
            "string_array" => {
                let words: Vec<Value<'a>> = self
                    .named_children(n)
                    .iter()
                    .map(|w| {
                        Value::Node(self.s(
                            Kind::Str,
                            &[self.str_val(self.text_of(*w))],
                            self.loc(*w),
                        ))
                    })
                    .collect();
                Ok(self.s(Kind::Array, &words, loc))
            }
            "symbol_array" => {
                let syms: Vec<Value<'a>> = self
                    .named_children(n)
                    .iter()
                    .map(|w| {
                        Value::Node(self.s(
                            Kind::Sym,
                            &[self.str_val(self.text_of(*w))],
                            self.loc(*w),
                        ))
                    })
                    .collect();
                Ok(self.s(Kind::Array, &syms, loc))
            }
            "regex" => self.regex(n),

            // Variables
            "identifier" => {
                let name = self.text_of(n);
                if self.known_local(name) {
                    Ok(self.s(Kind::Lvar, &[self.str_val(name)], loc))
                } else {
                    let call_loc = loc.with_selector(Span::new(n.start_byte(), n.end_byte()));
                    Ok(self.s(Kind::Send, &[Value::Nil, self.str_val(name)], call_loc))
                }
            }
            "instance_variable" => {
                let name = self.text_of(n);
                Ok(self.s(Kind::Ivar, &[self.str_val(name)], loc))
            }
            "class_variable" => {
                let name = self.text_of(n);
                Ok(self.s(Kind::Cvar, &[self.str_val(name)], loc))
            }
            "global_variable" => {
                let name = self.text_of(n);
                Ok(self.s(Kind::Gvar, &[self.str_val(name)], loc))
            }
            "nth_reference" => {
                let raw = self.text_of(n).trim_start_matches('$').to_string();
                let idx: i64 = raw.parse().unwrap_or(0);
                Ok(self.s(Kind::NthRef, &[Value::Int(idx)], loc))
            }
            "back_reference" => {
                let name = self.text_of(n);
                Ok(self.s(Kind::BackRef, &[self.str_val(name)], loc))
            }
            "constant" => {
                let name = self.text_of(n);
                Ok(self.s(Kind::Const, &[Value::Nil, self.str_val(name)], loc))
            }
            "scope_resolution" => {
                let name_node = n
                    .child_by_field_name("name")
                    .ok_or_else(|| self.unsupported(n, "scope resolution"))?;
                let name = self.text_of(name_node);
                let parent = match n.child_by_field_name("scope") {
                    Some(scope) => Value::Node(self.node(scope)?),
                    None => Value::Node(self.s(Kind::Cbase, &[], loc)),
                };
                Ok(self.s(Kind::Const, &[parent, self.str_val(name)], loc))
            }

            // Collections
            "array" => {
                let items: Vec<Value<'a>> = {
                    let kids = self.named_children(n);
                    let mut out = Vec::with_capacity(kids.len());
                    for kid in kids {
                        out.push(Value::Node(self.node(kid)?));
                    }
                    out
                };
                Ok(self.s(Kind::Array, &items, loc))
            }
            "hash" => {
                let kids = self.named_children(n);
                let mut out = Vec::with_capacity(kids.len());
                for kid in kids {
                    out.push(Value::Node(self.node(kid)?));
                }
                Ok(self.s(Kind::Hash, &out, loc))
            }
            "pair" => {
                let key = n
                    .child_by_field_name("key")
                    .ok_or_else(|| self.unsupported(n, "hash pair"))?;
                let key_node = self.node(key)?;
                let value = match n.child_by_field_name("value") {
                    Some(v) => self.node(v)?,
                    // shorthand `{x:}` punning
                    None => {
                        let name = key_node.str_child(0).unwrap_or_default();
                        if self.known_local(name) {
                            self.s(Kind::Lvar, &[self.str_val(name)], loc)
                        } else {
                            self.s(Kind::Send, &[Value::Nil, self.str_val(name)], loc)
                        }
                    }
                };
                Ok(self.s(Kind::Pair, &[Value::Node(key_node), Value::Node(value)], loc))
            }
            "splat_argument" | "splat_parameter" if n.named_child_count() > 0 => {
                let inner = self.node(self.named_children(n)[0])?;
                Ok(self.s(Kind::Splat, &[Value::Node(inner)], loc))
            }
            "hash_splat_argument" => {
                let inner = self.node(self.named_children(n)[0])?;
                Ok(self.s(Kind::Kwsplat, &[Value::Node(inner)], loc))
            }
            "block_argument" => {
                let kids = self.named_children(n);
                let inner = match kids.first() {
                    Some(k) => Value::Node(self.node(*k)?),
                    None => Value::Nil,
                };
                Ok(self.s(Kind::BlockPass, &[inner], loc))
            }

            // Ranges
            "range" => self.range(n),

            // Operators
            "binary" => self.binary(n),
            "unary" => self.unary(n),
            "conditional" => {
                let cond = self.field_node(n, "condition")?;
                let then = self.field_node(n, "consequence")?;
                let alt = self.field_node(n, "alternative")?;
                Ok(self.s(
                    Kind::If,
                    &[Value::Node(cond), Value::Node(then), Value::Node(alt)],
                    loc,
                ))
            }

            // Assignment
            "assignment" => self.assignment(n),
            "operator_assignment" => self.operator_assignment(n),

            // Calls
            "call" => self.call(n),
            "element_reference" => {
                let object = n
                    .child_by_field_name("object")
                    .ok_or_else(|| self.unsupported(n, "index"))?;
                let recv = self.node(object)?;
                let mut children: Vec<Value<'a>> =
                    vec![Value::Node(recv), self.str_val("[]")];
                for kid in self.named_children(n) {
                    if kid.id() == object.id() {
                        continue;
                    }
                    children.push(Value::Node(self.node(kid)?));
                }
                Ok(self.s(Kind::Send, &children, loc))
            }
            "yield" => {
                let mut children: Vec<Value<'a>> = Vec::new();
                for kid in self.named_children(n) {
                    if kid.kind() == "argument_list" {
                        for arg in self.named_children(kid) {
                            children.push(Value::Node(self.node(arg)?));
                        }
                    } else {
                        children.push(Value::Node(self.node(kid)?));
                    }
                }
                Ok(self.s(Kind::Yield, &children, loc))
            }
            "super" => {
                let kids = self.named_children(n);
                if kids.is_empty() && !self.text_of(n).contains('(') {
                    Ok(self.s(Kind::Zsuper, &[], loc))
                } else {
                    let mut children: Vec<Value<'a>> = Vec::new();
                    for kid in kids {
                        if kid.kind() == "argument_list" {
                            for arg in self.named_children(kid) {
                                children.push(Value::Node(self.node(arg)?));
                            }
                        } else {
                            children.push(Value::Node(self.node(kid)?));
                        }
                    }
                    Ok(self.s(Kind::Super, &children, loc))
                }
            }
            "return" | "break" | "next" => {
                let kind = match n.kind() {
                    "return" => Kind::Return,
                    "break" => Kind::Break,
                    _ => Kind::Next,
                };
                let mut children: Vec<Value<'a>> = Vec::new();
                for kid in self.named_children(n) {
                    if kid.kind() == "argument_list" {
                        for arg in self.named_children(kid) {
                            children.push(Value::Node(self.node(arg)?));
                        }
                    } else {
                        children.push(Value::Node(self.node(kid)?));
                    }
                }
                Ok(self.s(kind, &children, loc))
            }
            "redo" => Ok(self.s(Kind::Redo, &[], loc)),
            "retry" => Ok(self.s(Kind::Retry, &[], loc)),

            // Control flow
            "if" | "elsif" => self.if_node(n, false),
            "unless" => self.if_node(n, true),
            "if_modifier" => self.modifier(n, Kind::If, false),
            "unless_modifier" => self.modifier(n, Kind::If, true),
            "while_modifier" => self.modifier_loop(n, Kind::While, Kind::WhilePost),
            "until_modifier" => self.modifier_loop(n, Kind::Until, Kind::UntilPost),
            "rescue_modifier" => {
                let body = self.field_node(n, "body")?;
                let handler = self.field_node(n, "handler")?;
                let resbody = self.s(
                    Kind::Resbody,
                    &[Value::Nil, Value::Nil, Value::Node(handler)],
                    loc,
                );
                let rescue = self.s(
                    Kind::Rescue,
                    &[Value::Node(body), Value::Node(resbody), Value::Nil],
                    loc,
                );
                Ok(self.s(Kind::Kwbegin, &[Value::Node(rescue)], loc))
            }
            "while" | "until" => {
                let kind = if n.kind() == "while" { Kind::While } else { Kind::Until };
                let cond = self.field_node(n, "condition")?;
                let body = match n.child_by_field_name("body") {
                    Some(b) => self.statements(b, b.start_byte(), b.end_byte())?,
                    None => self.s(Kind::Begin, &[], loc),
                };
                Ok(self.s(kind, &[Value::Node(cond), Value::Node(body)], loc))
            }
            "for" => {
                let pattern = n
                    .child_by_field_name("pattern")
                    .ok_or_else(|| self.unsupported(n, "for loop"))?;
                let var = if pattern.kind() == "identifier" {
                    let name = self.text_of(pattern);
                    self.declare(name);
                    self.s(Kind::Lvasgn, &[self.str_val(name)], self.loc(pattern))
                } else {
                    self.mlhs(pattern)?
                };
                let value = self.field_node(n, "value")?;
                let body = match n.child_by_field_name("body") {
                    Some(b) => self.statements(b, b.start_byte(), b.end_byte())?,
                    None => self.s(Kind::Begin, &[], loc),
                };
                Ok(self.s(
                    Kind::For,
                    &[Value::Node(var), Value::Node(value), Value::Node(body)],
                    loc,
                ))
            }
            "case" => self.case(n),
            "case_match" => self.case_match(n),
            "begin" => self.guarded_body(n),

            // Definitions
            "method" => self.method(n, None),
            "singleton_method" => {
                let object = n
                    .child_by_field_name("object")
                    .ok_or_else(|| self.unsupported(n, "singleton method"))?;
                self.method(n, Some(object))
            }
            "class" => self.class(n),
            "singleton_class" => {
                let value = self
                    .child_by_field_or_first(n, "value")
                    .ok_or_else(|| self.unsupported(n, "singleton class"))?;
                let recv = self.node(value)?;
                self.push_scope(true);
                let body = match n.child_by_field_name("body") {
                    Some(b) => self.guarded_body(b)?,
                    None => self.s(Kind::Begin, &[], loc),
                };
                self.pop_scope();
                Ok(self.s(Kind::Sclass, &[Value::Node(recv), Value::Node(body)], loc))
            }
            "module" => {
                let name_node = n
                    .child_by_field_name("name")
                    .ok_or_else(|| self.unsupported(n, "module"))?;
                let name = self.node(name_node)?;
                self.push_scope(true);
                let body = match n.child_by_field_name("body") {
                    Some(b) => self.guarded_body(b)?,
                    None => self.s(Kind::Begin, &[], loc),
                };
                self.pop_scope();
                Ok(self.s(Kind::Module, &[Value::Node(name), Value::Node(body)], loc))
            }
            "alias" => {
                let new = n
                    .child_by_field_name("name")
                    .ok_or_else(|| self.unsupported(n, "alias"))?;
                let old = n
                    .child_by_field_name("alias")
                    .ok_or_else(|| self.unsupported(n, "alias"))?;
                let new_sym = self.s(
                    Kind::Sym,
                    &[self.str_val(self.text_of(new).trim_start_matches(':'))],
                    self.loc(new),
                );
                let old_sym = self.s(
                    Kind::Sym,
                    &[self.str_val(self.text_of(old).trim_start_matches(':'))],
                    self.loc(old),
                );
                Ok(self.s(
                    Kind::Alias,
                    &[Value::Node(new_sym), Value::Node(old_sym)],
                    loc,
                ))
            }
            "undef" => {
                let kids = self.named_children(n);
                let mut children: Vec<Value<'a>> = Vec::new();
                for kid in kids {
                    let name = self.text_of(kid).trim_start_matches(':');
                    children.push(Value::Node(self.s(
                        Kind::Sym,
                        &[self.str_val(name)],
                        self.loc(kid),
                    )));
                }
                Ok(self.s(Kind::Undef, &children, loc))
            }

            // Blocks
            "lambda" => {
                let loc_send = loc.with_selector(Span::new(n.start_byte(), n.start_byte() + 2));
                let send = self.s(Kind::Send, &[Value::Nil, self.str_val("lambda")], loc_send);
                self.push_scope(false);
                let args = match n.child_by_field_name("parameters") {
                    Some(p) => self.parameters(p)?,
                    None => self.s(Kind::Args, &[], loc),
                };
                let body = match n.child_by_field_name("body") {
                    Some(b) => self.block_body(b)?,
                    None => self.s(Kind::Begin, &[], loc),
                };
                self.pop_scope();
                Ok(self.s(
                    Kind::Block,
                    &[Value::Node(send), Value::Node(args), Value::Node(body)],
                    loc,
                ))
            }

            // Pattern-match statements: `expr => pattern` / `expr in pattern`
            "match_pattern" | "test_pattern" => {
                let value = self.field_node(n, "value")?;
                let pattern_ts = n
                    .child_by_field_name("pattern")
                    .ok_or_else(|| self.unsupported(n, "pattern match"))?;
                let pattern = self.pattern(pattern_ts)?;
                let kind = if n.kind() == "match_pattern" {
                    Kind::MatchPattern
                } else {
                    Kind::MatchPatternP
                };
                Ok(self.s(kind, &[Value::Node(value), Value::Node(pattern)], loc))
            }

            "empty_statement" => Ok(self.s(Kind::Begin, &[], loc)),

            other => Err(self.unsupported(n, other)),
        }
    }

    fn field_node(&mut self, n: Ts<'t>, field: &str) -> Result<&'a Node<'a>, Error> {
        match n.child_by_field_name(field) {
            Some(child) => self.node(child),
            None => Err(self.unsupported(n, n.kind())),
        }
    }

    fn child_by_field_or_first(&self, n: Ts<'t>, field: &str) -> Option<Ts<'t>> {
        n.child_by_field_name(field)
            .or_else(|| self.named_children(n).first().copied())
    }

    // ── strings, symbols, regexps ──────────────────────────────────────

    fn string(&mut self, n: Ts<'t>) -> Result<&'a Node<'a>, Error> {
        let loc = self.loc(n);
        let parts = self.string_parts(n)?;
        if parts.is_empty() {
            return Ok(self.s(Kind::Str, &[self.str_val("")], loc));
        }
        if parts.len() == 1 {
            if let Some(part) = parts[0].as_node() {
                if part.kind == Kind::Str {
                    return Ok(self.s(Kind::Str, part.children, loc));
                }
            }
        }
        Ok(self.s(Kind::Dstr, &parts, loc))
    }

    /// Splits a quoted literal into `str` parts and interpolations. Static
    /// runs are unescaped to their runtime value; the converter re-escapes
    /// for JavaScript.
    fn string_parts(&mut self, n: Ts<'t>) -> Result<Vec<Value<'a>>, Error> {
        let single = self.text_of(n).starts_with('\'');
        let mut parts: Vec<Value<'a>> = Vec::new();
        let mut pending = String::new();
        let mut pending_start = None;

        let kids = self.named_children(n);
        for kid in kids {
            match kid.kind() {
                "string_content" => {
                    if pending_start.is_none() {
                        pending_start = Some(kid.start_byte());
                    }
                    pending.push_str(&unescape(self.text_of(kid), single));
                }
                "escape_sequence" => {
                    if pending_start.is_none() {
                        pending_start = Some(kid.start_byte());
                    }
                    pending.push_str(&unescape(self.text_of(kid), single));
                }
                "interpolation" => {
                    if let Some(start) = pending_start.take() {
                        let span = Loc::new(self.source, start, kid.start_byte());
                        parts.push(Value::Node(self.s(
                            Kind::Str,
                            &[self.str_val(&pending)],
                            span,
                        )));
                        pending.clear();
                    }
                    let inner = self.statements(kid, kid.start_byte(), kid.end_byte())?;
                    parts.push(Value::Node(self.s(
                        Kind::Begin,
                        &[Value::Node(inner)],
                        self.loc(kid),
                    )));
                }
                _ => {}
            }
        }
        if let Some(start) = pending_start {
            let span = Loc::new(self.source, start, n.end_byte());
            parts.push(Value::Node(self.s(Kind::Str, &[self.str_val(&pending)], span)));
        }
        Ok(parts)
    }

    fn heredoc(&mut self, n: Ts<'t>) -> Result<&'a Node<'a>, Error> {
        let loc = self.loc(n);
        let opener = self.text_of(n);
        let squiggly = opener.starts_with("<<~");

        let body = self
            .heredocs
            .iter()
            .position(|(start, _)| *start >= n.end_byte())
            .map(|i| self.heredocs.remove(i).1);
        let Some(body) = body else {
            return Ok(self.s(Kind::Str, &[self.str_val("")], loc));
        };

        let mut parts: Vec<Value<'a>> = Vec::new();
        let mut static_text = String::new();
        let mut static_start = None;
        for kid in self.named_children(body) {
            match kid.kind() {
                "heredoc_content" | "string_content" | "escape_sequence" => {
                    if static_start.is_none() {
                        static_start = Some(kid.start_byte());
                    }
                    static_text.push_str(&unescape(self.text_of(kid), false));
                }
                "interpolation" => {
                    if let Some(start) = static_start.take() {
                        self.flush_heredoc_lines(&static_text, start, &mut parts);
                        static_text.clear();
                    }
                    let inner = self.statements(kid, kid.start_byte(), kid.end_byte())?;
                    parts.push(Value::Node(self.s(
                        Kind::Begin,
                        &[Value::Node(inner)],
                        self.loc(kid),
                    )));
                }
                "heredoc_end" => {}
                _ => {}
            }
        }
        if let Some(start) = static_start {
            self.flush_heredoc_lines(&static_text, start, &mut parts);
        }

        if squiggly {
            parts = self.strip_heredoc_indent(parts);
        }

        if parts.len() == 1 {
            if let Some(only) = parts[0].as_node() {
                if only.kind == Kind::Str {
                    return Ok(self.s(Kind::Str, only.children, loc));
                }
            }
        }
        Ok(self.s(Kind::Dstr, &parts, loc))
    }

    /// Heredoc static text splits per line so the serializer can keep the
    /// original line shape.
    fn flush_heredoc_lines(&self, text: &str, start: usize, parts: &mut Vec<Value<'a>>) {
        let mut offset = start;
        let mut rest = text;
        while !rest.is_empty() {
            let (line, remainder) = match rest.find('\n') {
                Some(i) => (&rest[..=i], &rest[i + 1..]),
                None => (rest, ""),
            };
            let span = Loc::new(self.source, offset, offset + line.len());
            parts.push(Value::Node(self.s(Kind::Str, &[self.str_val(line)], span)));
            offset += line.len();
            rest = remainder;
        }
    }

    fn strip_heredoc_indent(&self, parts: Vec<Value<'a>>) -> Vec<Value<'a>> {
        let mut min_indent = usize::MAX;
        for part in &parts {
            if let Some(node) = part.as_node() {
                if node.kind == Kind::Str {
                    if let Some(text) = node.str_child(0) {
                        if !text.trim().is_empty() {
                            let indent = text.len() - text.trim_start_matches(' ').len();
                            min_indent = min_indent.min(indent);
                        }
                    }
                }
            }
        }
        if min_indent == 0 || min_indent == usize::MAX {
            return parts;
        }
        parts
            .into_iter()
            .map(|part| match part.as_node() {
                Some(node) if node.kind == Kind::Str => {
                    let text = node.str_child(0).unwrap_or_default();
                    let lead = text.len() - text.trim_start_matches(' ').len();
                    let stripped = &text[min_indent.min(lead)..];
                    Value::Node(s_loc(
                        self.arena,
                        Kind::Str,
                        &[self.str_val(stripped)],
                        node.loc,
                    ))
                }
                _ => part,
            })
            .collect()
    }

    fn regex(&mut self, n: Ts<'t>) -> Result<&'a Node<'a>, Error> {
        let loc = self.loc(n);
        let raw = self.text_of(n);
        let flags: String = raw
            .chars()
            .rev()
            .take_while(|c| c.is_ascii_lowercase())
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();

        let mut parts: Vec<Value<'a>> = Vec::new();
        for kid in self.named_children(n) {
            match kid.kind() {
                "string_content" | "escape_sequence" => {
                    let text = self.text_of(kid);
                    parts.push(Value::Node(self.s(
                        Kind::Str,
                        &[self.str_val(text)],
                        self.loc(kid),
                    )));
                }
                "interpolation" => {
                    let inner = self.statements(kid, kid.start_byte(), kid.end_byte())?;
                    parts.push(Value::Node(self.s(
                        Kind::Begin,
                        &[Value::Node(inner)],
                        self.loc(kid),
                    )));
                }
                _ => {}
            }
        }

        let opts: Vec<Value<'a>> = flags.chars().map(|c| self.str_val(&c.to_string())).collect();
        let regopt = self.s(Kind::Regopt, &opts, loc);
        parts.push(Value::Node(regopt));
        Ok(self.s(Kind::Regexp, &parts, loc))
    }

    // ── ranges and operators ───────────────────────────────────────────

    fn range(&mut self, n: Ts<'t>) -> Result<&'a Node<'a>, Error> {
        let loc = self.loc(n);
        let begin = n.child_by_field_name("begin");
        let end = n.child_by_field_name("end");

        let exclusive = match (begin, end) {
            (Some(b), Some(e)) => self.text[b.end_byte()..e.start_byte()].trim() == "...",
            _ => self.text_of(n).contains("..."),
        };

        let begin_val = match begin {
            Some(b) => Value::Node(self.node(b)?),
            None => Value::Nil,
        };
        let end_val = match end {
            Some(e) => Value::Node(self.node(e)?),
            None => Value::Nil,
        };
        let kind = if exclusive { Kind::Erange } else { Kind::Irange };
        Ok(self.s(kind, &[begin_val, end_val], loc))
    }

    fn binary(&mut self, n: Ts<'t>) -> Result<&'a Node<'a>, Error> {
        let loc = self.loc(n);
        let left_ts = n
            .child_by_field_name("left")
            .ok_or_else(|| self.unsupported(n, "binary"))?;
        let right_ts = n
            .child_by_field_name("right")
            .ok_or_else(|| self.unsupported(n, "binary"))?;
        let op = match n.child_by_field_name("operator") {
            Some(o) => self.text_of(o).to_string(),
            None => self.text[left_ts.end_byte()..right_ts.start_byte()]
                .trim()
                .to_string(),
        };

        let left = self.node(left_ts)?;
        let right = self.node(right_ts)?;

        match op.as_str() {
            "&&" | "and" => Ok(self.s(Kind::And, &[Value::Node(left), Value::Node(right)], loc)),
            "||" | "or" => Ok(self.s(Kind::Or, &[Value::Node(left), Value::Node(right)], loc)),
            _ => {
                let sel_start = left_ts.end_byte();
                let call_loc = loc.with_selector(Span::new(sel_start, sel_start + op.len()));
                Ok(self.s(
                    Kind::Send,
                    &[Value::Node(left), self.str_val(&op), Value::Node(right)],
                    call_loc,
                ))
            }
        }
    }

    fn unary(&mut self, n: Ts<'t>) -> Result<&'a Node<'a>, Error> {
        let loc = self.loc(n);
        let operand_ts = n
            .child_by_field_name("operand")
            .or_else(|| self.named_children(n).first().copied())
            .ok_or_else(|| self.unsupported(n, "unary"))?;
        let op = match n.child_by_field_name("operator") {
            Some(o) => self.text_of(o).to_string(),
            None => self.text[n.start_byte()..operand_ts.start_byte()]
                .trim()
                .to_string(),
        };
        let operand = self.node(operand_ts)?;

        match op.as_str() {
            "!" | "not" => Ok(self.s(Kind::Not, &[Value::Node(operand)], loc)),
            "-" => Ok(self.s(
                Kind::Send,
                &[Value::Node(operand), self.str_val("-@")],
                loc,
            )),
            "+" => Ok(self.s(
                Kind::Send,
                &[Value::Node(operand), self.str_val("+@")],
                loc,
            )),
            "~" => Ok(self.s(
                Kind::Send,
                &[Value::Node(operand), self.str_val("~")],
                loc,
            )),
            "defined?" => Ok(self.s(Kind::Defined, &[Value::Node(operand)], loc)),
            other => Err(self.unsupported(n, &format!("unary {}", other))),
        }
    }

    // ── assignment ─────────────────────────────────────────────────────

    fn assignment(&mut self, n: Ts<'t>) -> Result<&'a Node<'a>, Error> {
        let loc = self.loc(n);
        let left = n
            .child_by_field_name("left")
            .ok_or_else(|| self.unsupported(n, "assignment"))?;
        let right_ts = n
            .child_by_field_name("right")
            .ok_or_else(|| self.unsupported(n, "assignment"))?;

        if left.kind() == "left_assignment_list" {
            let mlhs = self.mlhs(left)?;
            let right = self.node(right_ts)?;
            return Ok(self.s(
                Kind::Masgn,
                &[Value::Node(mlhs), Value::Node(right)],
                loc,
            ));
        }

        let target = self.assign_target(left)?;
        let right = self.node(right_ts)?;
        let mut children: Vec<Value<'a>> = target.children.to_vec();
        children.push(Value::Node(right));
        Ok(self.s(target.kind, &children, loc))
    }

    /// Builds the assignment head (without the value child) for one target.
    fn assign_target(&mut self, left: Ts<'t>) -> Result<&'a Node<'a>, Error> {
        let loc = self.loc(left);
        match left.kind() {
            "identifier" => {
                let name = self.text_of(left);
                self.declare(name);
                Ok(self.s(Kind::Lvasgn, &[self.str_val(name)], loc))
            }
            "instance_variable" => {
                let name = self.text_of(left);
                Ok(self.s(Kind::Ivasgn, &[self.str_val(name)], loc))
            }
            "class_variable" => {
                let name = self.text_of(left);
                Ok(self.s(Kind::Cvasgn, &[self.str_val(name)], loc))
            }
            "global_variable" => {
                let name = self.text_of(left);
                Ok(self.s(Kind::Gvasgn, &[self.str_val(name)], loc))
            }
            "constant" => {
                let name = self.text_of(left);
                Ok(self.s(Kind::Casgn, &[Value::Nil, self.str_val(name)], loc))
            }
            "scope_resolution" => {
                let resolved = self.node(left)?;
                let parent = resolved.children[0];
                let name = resolved.children[1];
                Ok(self.s(Kind::Casgn, &[parent, name], loc))
            }
            "element_reference" => {
                let indexed = self.node(left)?;
                let mut children = indexed.children.to_vec();
                children[1] = self.str_val("[]=");
                Ok(self.s(Kind::Send, &children, loc))
            }
            "call" => {
                let call = self.node(left)?;
                if !call.kind.is_send_family() {
                    return Err(self.unsupported(left, "assignment target"));
                }
                let name = call.str_child(1).unwrap_or_default();
                let mut children = call.children.to_vec();
                children[1] = self.str_val(&format!("{}=", name));
                Ok(self.s(Kind::Send, &children, loc))
            }
            other => Err(self.unsupported(left, &format!("assignment to {}", other))),
        }
    }

    fn mlhs(&mut self, list: Ts<'t>) -> Result<&'a Node<'a>, Error> {
        let loc = self.loc(list);
        let mut out: Vec<Value<'a>> = Vec::new();
        for kid in self.named_children(list) {
            match kid.kind() {
                "rest_assignment" => {
                    let inner = self.named_children(kid);
                    let target = match inner.first() {
                        Some(t) => Value::Node(self.assign_target(*t)?),
                        None => Value::Nil,
                    };
                    out.push(Value::Node(self.s(Kind::Splat, &[target], self.loc(kid))));
                }
                "destructured_left_assignment" => {
                    out.push(Value::Node(self.mlhs(kid)?));
                }
                _ => out.push(Value::Node(self.assign_target(kid)?)),
            }
        }
        Ok(self.s(Kind::Mlhs, &out, loc))
    }

    fn operator_assignment(&mut self, n: Ts<'t>) -> Result<&'a Node<'a>, Error> {
        let loc = self.loc(n);
        let left = n
            .child_by_field_name("left")
            .ok_or_else(|| self.unsupported(n, "op-assign"))?;
        let right_ts = n
            .child_by_field_name("right")
            .ok_or_else(|| self.unsupported(n, "op-assign"))?;
        let op = match n.child_by_field_name("operator") {
            Some(o) => self.text_of(o).to_string(),
            None => self.text[left.end_byte()..right_ts.start_byte()]
                .trim()
                .to_string(),
        };

        let target = self.assign_target(left)?;
        let right = self.node(right_ts)?;

        match op.as_str() {
            "||=" => Ok(self.s(
                Kind::OrAsgn,
                &[Value::Node(target), Value::Node(right)],
                loc,
            )),
            "&&=" => Ok(self.s(
                Kind::AndAsgn,
                &[Value::Node(target), Value::Node(right)],
                loc,
            )),
            _ => {
                let base = op.trim_end_matches('=');
                Ok(self.s(
                    Kind::OpAsgn,
                    &[Value::Node(target), self.str_val(base), Value::Node(right)],
                    loc,
                ))
            }
        }
    }

    // ── calls and blocks ───────────────────────────────────────────────

    fn call(&mut self, n: Ts<'t>) -> Result<&'a Node<'a>, Error> {
        let loc = self.loc(n);
        let method = n.child_by_field_name("method");
        let receiver = n.child_by_field_name("receiver");
        let arguments = n.child_by_field_name("arguments");
        let block = n.child_by_field_name("block");

        // `super(...)` with an explicit receiver position
        if let Some(m) = method {
            if m.kind() == "super" {
                let mut children: Vec<Value<'a>> = Vec::new();
                if let Some(args) = arguments {
                    for arg in self.named_children(args) {
                        children.push(Value::Node(self.node(arg)?));
                    }
                }
                let sup = self.s(Kind::Super, &children, loc);
                return self.wrap_block(sup, block, loc);
            }
        }

        let csend = match (receiver, method) {
            (Some(r), Some(m)) => self.text[r.end_byte()..m.start_byte()].contains("&."),
            _ => false,
        };

        let recv_val = match receiver {
            Some(r) => Value::Node(self.node(r)?),
            None => Value::Nil,
        };

        let (name, selector) = match method {
            Some(m) => (
                self.text_of(m).to_string(),
                Some(Span::new(m.start_byte(), m.end_byte())),
            ),
            None => ("call".to_string(), None), // `x.()` sugar
        };

        let mut children: Vec<Value<'a>> = vec![recv_val, self.str_val(&name)];
        if let Some(args) = arguments {
            for arg in self.named_children(args) {
                children.push(Value::Node(self.node(arg)?));
            }
        }

        let mut call_loc = loc;
        if let Some(sel) = selector {
            call_loc = call_loc.with_selector(sel);
        }
        let kind = if csend { Kind::Csend } else { Kind::Send };
        let send = self.s(kind, &children, call_loc);
        self.wrap_block(send, block, loc)
    }

    fn wrap_block(
        &mut self,
        call: &'a Node<'a>,
        block: Option<Ts<'t>>,
        loc: Loc,
    ) -> Result<&'a Node<'a>, Error> {
        let Some(block) = block else { return Ok(call) };

        self.push_scope(false);
        let params = block.child_by_field_name("parameters");
        let args = match params {
            Some(p) => self.parameters(p)?,
            None => {
                // Paren-less blocks may use `it` or numbered parameters.
                let implicit = self.implicit_params(block);
                for name in &implicit {
                    self.declare(name);
                }
                let arg_vals: Vec<Value<'a>> = implicit
                    .iter()
                    .map(|name| {
                        Value::Node(s_loc(
                            self.arena,
                            Kind::Arg,
                            &[self.str_val(name)],
                            Some(loc),
                        ))
                    })
                    .collect();
                self.s(Kind::Args, &arg_vals, loc)
            }
        };
        let body = match block.child_by_field_name("body") {
            Some(b) => self.block_body(b)?,
            None => {
                let kids: Vec<Ts> = self
                    .named_children(block)
                    .into_iter()
                    .filter(|k| !matches!(k.kind(), "block_parameters"))
                    .collect();
                self.statement_list(&kids, block.start_byte(), block.end_byte())?
            }
        };
        self.pop_scope();

        Ok(self.s(
            Kind::Block,
            &[Value::Node(call), Value::Node(args), Value::Node(body)],
            loc,
        ))
    }

    /// Normalises the various body containers: `body_statement` carries
    /// rescue/ensure clauses, `then`/`do`/`block_body` are plain statement
    /// sequences, a bare expression (endless defs) is the body itself.
    fn block_body(&mut self, b: Ts<'t>) -> Result<&'a Node<'a>, Error> {
        match b.kind() {
            "body_statement" => self.guarded_body(b),
            "block_body" | "then" | "do" | "else" => {
                self.statements(b, b.start_byte(), b.end_byte())
            }
            "block" | "do_block" => {
                let kids: Vec<Ts> = self
                    .named_children(b)
                    .into_iter()
                    .filter(|k| !matches!(k.kind(), "block_parameters" | "lambda_parameters"))
                    .collect();
                if kids.len() == 1
                    && matches!(kids[0].kind(), "block_body" | "body_statement")
                {
                    self.block_body(kids[0])
                } else {
                    self.statement_list(&kids, b.start_byte(), b.end_byte())
                }
            }
            _ => self.node(b),
        }
    }

    /// Scans a paren-less block for `it` or `_1`/`_2`/... references and
    /// synthesises the matching parameter names.
    fn implicit_params(&self, block: Ts<'t>) -> Vec<String> {
        let mut uses_it = false;
        let mut max_numbered = 0usize;
        let mut stack = vec![block];
        while let Some(node) = stack.pop() {
            let mut cursor = node.walk();
            for child in node.children(&mut cursor) {
                if child.kind() == "identifier" {
                    let text = self.text_of(child);
                    if text == "it" {
                        uses_it = true;
                    } else if let Some(rest) = text.strip_prefix('_') {
                        if let Ok(i) = rest.parse::<usize>() {
                            max_numbered = max_numbered.max(i);
                        }
                    }
                }
                // Nested blocks own their own implicit params.
                if !matches!(child.kind(), "block" | "do_block" | "lambda") {
                    stack.push(child);
                }
            }
        }
        if max_numbered > 0 {
            (1..=max_numbered).map(|i| format!("_{}", i)).collect()
        } else if uses_it {
            vec!["it".to_string()]
        } else {
            Vec::new()
        }
    }

    fn parameters(&mut self, params: Ts<'t>) -> Result<&'a Node<'a>, Error> {
        let loc = self.loc(params);
        let mut out: Vec<Value<'a>> = Vec::new();
        for kid in self.named_children(params) {
            let kid_loc = self.loc(kid);
            match kid.kind() {
                "identifier" => {
                    let name = self.text_of(kid);
                    self.declare(name);
                    out.push(Value::Node(self.s(Kind::Arg, &[self.str_val(name)], kid_loc)));
                }
                "optional_parameter" => {
                    let name_ts = kid
                        .child_by_field_name("name")
                        .ok_or_else(|| self.unsupported(kid, "optional parameter"))?;
                    let name = self.text_of(name_ts);
                    self.declare(name);
                    let default = self.field_node(kid, "value")?;
                    out.push(Value::Node(self.s(
                        Kind::Optarg,
                        &[self.str_val(name), Value::Node(default)],
                        kid_loc,
                    )));
                }
                "splat_parameter" => {
                    let name = kid
                        .child_by_field_name("name")
                        .map(|t| self.text_of(t).to_string());
                    match name {
                        Some(name) => {
                            self.declare(&name);
                            out.push(Value::Node(self.s(
                                Kind::Restarg,
                                &[self.str_val(&name)],
                                kid_loc,
                            )));
                        }
                        None => out.push(Value::Node(self.s(Kind::Restarg, &[], kid_loc))),
                    }
                }
                "keyword_parameter" => {
                    let name_ts = kid
                        .child_by_field_name("name")
                        .ok_or_else(|| self.unsupported(kid, "keyword parameter"))?;
                    let name = self.text_of(name_ts);
                    self.declare(name);
                    match kid.child_by_field_name("value") {
                        Some(v) => {
                            let default = self.node(v)?;
                            out.push(Value::Node(self.s(
                                Kind::Kwoptarg,
                                &[self.str_val(name), Value::Node(default)],
                                kid_loc,
                            )));
                        }
                        None => out.push(Value::Node(self.s(
                            Kind::Kwarg,
                            &[self.str_val(name)],
                            kid_loc,
                        ))),
                    }
                }
                "hash_splat_parameter" => {
                    let name = kid
                        .child_by_field_name("name")
                        .map(|t| self.text_of(t).to_string());
                    match name {
                        Some(name) => {
                            self.declare(&name);
                            out.push(Value::Node(self.s(
                                Kind::Kwrestarg,
                                &[self.str_val(&name)],
                                kid_loc,
                            )));
                        }
                        None => out.push(Value::Node(self.s(Kind::Kwrestarg, &[], kid_loc))),
                    }
                }
                "block_parameter" => {
                    let name = kid
                        .child_by_field_name("name")
                        .map(|t| self.text_of(t).to_string())
                        .unwrap_or_default();
                    self.declare(&name);
                    out.push(Value::Node(self.s(
                        Kind::Blockarg,
                        &[self.str_val(&name)],
                        kid_loc,
                    )));
                }
                "destructured_parameter" => {
                    let mut inner: Vec<Value<'a>> = Vec::new();
                    for part in self.named_children(kid) {
                        let name = self.text_of(part);
                        self.declare(name);
                        inner.push(Value::Node(self.s(
                            Kind::Arg,
                            &[self.str_val(name)],
                            self.loc(part),
                        )));
                    }
                    out.push(Value::Node(self.s(Kind::Mlhs, &inner, kid_loc)));
                }
                other => return Err(self.unsupported(kid, &format!("parameter {}", other))),
            }
        }
        Ok(self.s(Kind::Args, &out, loc))
    }

    // ── control flow ───────────────────────────────────────────────────

    fn if_node(&mut self, n: Ts<'t>, invert: bool) -> Result<&'a Node<'a>, Error> {
        let loc = self.loc(n);
        let cond = self.field_node(n, "condition")?;
        let then_branch = match n.child_by_field_name("consequence") {
            Some(c) => Value::Node(self.statements(c, c.start_byte(), c.end_byte())?),
            None => Value::Nil,
        };
        let else_branch = match n.child_by_field_name("alternative") {
            Some(alt) => {
                // `else` wraps statements; `elsif` is itself an if.
                if alt.kind() == "else" {
                    Value::Node(self.statements(alt, alt.start_byte(), alt.end_byte())?)
                } else {
                    Value::Node(self.node(alt)?)
                }
            }
            None => Value::Nil,
        };
        let (a, b) = if invert {
            (else_branch, then_branch)
        } else {
            (then_branch, else_branch)
        };
        Ok(self.s(Kind::If, &[Value::Node(cond), a, b], loc))
    }

    fn modifier(&mut self, n: Ts<'t>, kind: Kind, invert: bool) -> Result<&'a Node<'a>, Error> {
        let loc = self.loc(n);
        let body = self.field_node(n, "body")?;
        let cond = self.field_node(n, "condition")?;
        let (a, b) = if invert {
            (Value::Nil, Value::Node(body))
        } else {
            (Value::Node(body), Value::Nil)
        };
        Ok(self.s(kind, &[Value::Node(cond), a, b], loc))
    }

    fn modifier_loop(
        &mut self,
        n: Ts<'t>,
        normal: Kind,
        post: Kind,
    ) -> Result<&'a Node<'a>, Error> {
        let loc = self.loc(n);
        let body_ts = n
            .child_by_field_name("body")
            .ok_or_else(|| self.unsupported(n, "loop modifier"))?;
        let cond = self.field_node(n, "condition")?;
        let body = self.node(body_ts)?;
        // `begin ... end while cond` runs the body first.
        let kind = if body.kind == Kind::Kwbegin || body_ts.kind() == "begin" {
            post
        } else {
            normal
        };
        Ok(self.s(kind, &[Value::Node(cond), Value::Node(body)], loc))
    }

    fn case(&mut self, n: Ts<'t>) -> Result<&'a Node<'a>, Error> {
        let loc = self.loc(n);
        let value = match n.child_by_field_name("value") {
            Some(v) => Value::Node(self.node(v)?),
            None => Value::Nil,
        };
        let mut children: Vec<Value<'a>> = vec![value];
        let mut else_val = Value::Nil;
        for kid in self.named_children(n) {
            match kid.kind() {
                "when" => {
                    let mut when_children: Vec<Value<'a>> = Vec::new();
                    let mut cursor = kid.walk();
                    let patterns: Vec<Ts> = kid
                        .children_by_field_name("pattern", &mut cursor)
                        .collect();
                    for pat in patterns {
                        when_children.push(Value::Node(self.node(pat)?));
                    }
                    let body = match kid.child_by_field_name("body") {
                        Some(b) => self.statements(b, b.start_byte(), b.end_byte())?,
                        None => {
                            let then = self
                                .named_children(kid)
                                .into_iter()
                                .find(|c| c.kind() == "then");
                            match then {
                                Some(t) => self.statements(t, t.start_byte(), t.end_byte())?,
                                None => self.s(Kind::Begin, &[], self.loc(kid)),
                            }
                        }
                    };
                    when_children.push(Value::Node(body));
                    children.push(Value::Node(self.s(
                        Kind::When,
                        &when_children,
                        self.loc(kid),
                    )));
                }
                "else" => {
                    else_val =
                        Value::Node(self.statements(kid, kid.start_byte(), kid.end_byte())?);
                }
                _ => {}
            }
        }
        children.push(else_val);
        Ok(self.s(Kind::Case, &children, loc))
    }

    fn case_match(&mut self, n: Ts<'t>) -> Result<&'a Node<'a>, Error> {
        let loc = self.loc(n);
        let value = self.field_node(n, "value")?;
        let mut children: Vec<Value<'a>> = vec![Value::Node(value)];
        let mut else_val = Value::Nil;
        for kid in self.named_children(n) {
            match kid.kind() {
                "in_clause" => {
                    let pattern_ts = kid
                        .child_by_field_name("pattern")
                        .ok_or_else(|| self.unsupported(kid, "in clause"))?;
                    let pattern = self.pattern(pattern_ts)?;
                    let guard = match kid.child_by_field_name("guard") {
                        Some(g) => {
                            let inner = self.named_children(g);
                            let cond = match inner.first() {
                                Some(c) => self.node(*c)?,
                                None => self.s(Kind::Begin, &[], self.loc(g)),
                            };
                            let kind = if self.text_of(g).trim_start().starts_with("unless") {
                                Kind::UnlessGuard
                            } else {
                                Kind::IfGuard
                            };
                            Value::Node(self.s(kind, &[Value::Node(cond)], self.loc(g)))
                        }
                        None => Value::Nil,
                    };
                    let body = match kid.child_by_field_name("body") {
                        Some(b) => self.statements(b, b.start_byte(), b.end_byte())?,
                        None => {
                            let then = self
                                .named_children(kid)
                                .into_iter()
                                .find(|c| c.kind() == "then");
                            match then {
                                Some(t) => {
                                    self.statements(t, t.start_byte(), t.end_byte())?
                                }
                                None => self.s(Kind::Begin, &[], self.loc(kid)),
                            }
                        }
                    };
                    children.push(Value::Node(self.s(
                        Kind::InPattern,
                        &[Value::Node(pattern), guard, Value::Node(body)],
                        self.loc(kid),
                    )));
                }
                "else" => {
                    else_val =
                        Value::Node(self.statements(kid, kid.start_byte(), kid.end_byte())?);
                }
                _ => {}
            }
        }
        children.push(else_val);
        Ok(self.s(Kind::CaseMatch, &children, loc))
    }

    fn pattern(&mut self, n: Ts<'t>) -> Result<&'a Node<'a>, Error> {
        let loc = self.loc(n);
        match n.kind() {
            "identifier" => {
                let name = self.text_of(n);
                self.declare(name);
                Ok(self.s(Kind::MatchVar, &[self.str_val(name)], loc))
            }
            "array_pattern" | "find_pattern" => {
                let kind = if n.kind() == "array_pattern" {
                    Kind::ArrayPattern
                } else {
                    Kind::FindPattern
                };
                let kids = self.named_children(n);
                let mut out: Vec<Value<'a>> = Vec::new();
                for kid in kids {
                    out.push(Value::Node(self.pattern(kid)?));
                }
                Ok(self.s(kind, &out, loc))
            }
            "hash_pattern" => {
                let kids = self.named_children(n);
                let mut out: Vec<Value<'a>> = Vec::new();
                for kid in kids {
                    out.push(Value::Node(self.pattern(kid)?));
                }
                Ok(self.s(Kind::HashPattern, &out, loc))
            }
            "keyword_pattern" => {
                let key = self
                    .child_by_field_or_first(n, "key")
                    .ok_or_else(|| self.unsupported(n, "keyword pattern"))?;
                let key_name = self.text_of(key).trim_end_matches(':').to_string();
                let key_node = self.s(Kind::Sym, &[self.str_val(&key_name)], self.loc(key));
                let value = match n.child_by_field_name("value") {
                    Some(v) => self.pattern(v)?,
                    None => {
                        self.declare(&key_name);
                        self.s(Kind::MatchVar, &[self.str_val(&key_name)], loc)
                    }
                };
                Ok(self.s(
                    Kind::Pair,
                    &[Value::Node(key_node), Value::Node(value)],
                    loc,
                ))
            }
            "splat_parameter" | "splat_argument" => {
                let name = self
                    .named_children(n)
                    .first()
                    .map(|t| self.text_of(*t).to_string());
                match name {
                    Some(name) => {
                        self.declare(&name);
                        let var = self.s(Kind::MatchVar, &[self.str_val(&name)], loc);
                        Ok(self.s(Kind::MatchRest, &[Value::Node(var)], loc))
                    }
                    None => Ok(self.s(Kind::MatchRest, &[], loc)),
                }
            }
            "alternative_pattern" => {
                let kids = self.named_children(n);
                let mut out: Vec<Value<'a>> = Vec::new();
                for kid in kids {
                    out.push(Value::Node(self.pattern(kid)?));
                }
                Ok(self.s(Kind::MatchAlt, &out, loc))
            }
            "as_pattern" => {
                let value = self
                    .child_by_field_or_first(n, "value")
                    .ok_or_else(|| self.unsupported(n, "as pattern"))?;
                let inner = self.pattern(value)?;
                let name = n
                    .child_by_field_name("name")
                    .map(|t| self.text_of(t).to_string())
                    .unwrap_or_default();
                self.declare(&name);
                let var = self.s(Kind::MatchVar, &[self.str_val(&name)], loc);
                Ok(self.s(
                    Kind::MatchAs,
                    &[Value::Node(inner), Value::Node(var)],
                    loc,
                ))
            }
            "variable_reference_pattern" | "expression_reference_pattern" => {
                let inner = self
                    .named_children(n)
                    .first()
                    .copied()
                    .ok_or_else(|| self.unsupported(n, "pin pattern"))?;
                let value = self.node(inner)?;
                Ok(self.s(Kind::Pin, &[Value::Node(value)], loc))
            }
            // Literal patterns fall back to ordinary expression walking.
            _ => self.node(n),
        }
    }

    // ── definitions ────────────────────────────────────────────────────

    fn method(&mut self, n: Ts<'t>, object: Option<Ts<'t>>) -> Result<&'a Node<'a>, Error> {
        let name_ts = n
            .child_by_field_name("name")
            .ok_or_else(|| self.unsupported(n, "method"))?;
        let name = self.text_of(name_ts);

        let has_end = {
            let mut cursor = n.walk();
            let last = n.children(&mut cursor).last();
            last.map(|c| self.text_of(c) == "end").unwrap_or(false)
        };
        let loc = self
            .loc(n)
            .with_name(Span::new(name_ts.start_byte(), name_ts.end_byte()))
            .with_end(has_end);

        let receiver = match object {
            Some(o) => Some(self.node(o)?),
            None => None,
        };

        self.push_scope(true);
        let args = match n.child_by_field_name("parameters") {
            Some(p) => self.parameters(p)?,
            None => self.s(Kind::Args, &[], loc),
        };
        let body = match n.child_by_field_name("body") {
            Some(b) => self.block_body(b)?,
            None => self.s(Kind::Begin, &[], loc),
        };
        self.pop_scope();

        match receiver {
            Some(recv) => Ok(self.s(
                Kind::Defs,
                &[
                    Value::Node(recv),
                    self.str_val(name),
                    Value::Node(args),
                    Value::Node(body),
                ],
                loc,
            )),
            None => Ok(self.s(
                Kind::Def,
                &[self.str_val(name), Value::Node(args), Value::Node(body)],
                loc,
            )),
        }
    }

    fn class(&mut self, n: Ts<'t>) -> Result<&'a Node<'a>, Error> {
        let loc = self.loc(n);
        let name_ts = n
            .child_by_field_name("name")
            .ok_or_else(|| self.unsupported(n, "class"))?;
        let name = self.node(name_ts)?;

        let superclass = match n.child_by_field_name("superclass") {
            Some(sc) => {
                let inner = self.named_children(sc);
                match inner.first() {
                    Some(parent) => Value::Node(self.node(*parent)?),
                    None => Value::Nil,
                }
            }
            None => Value::Nil,
        };

        self.push_scope(true);
        let body = match n.child_by_field_name("body") {
            Some(b) => self.guarded_body(b)?,
            None => self.s(Kind::Begin, &[], loc),
        };
        self.pop_scope();

        Ok(self.s(
            Kind::Class,
            &[Value::Node(name), superclass, Value::Node(body)],
            loc,
        ))
    }
}

/// Converts Ruby escape sequences in literal text to the runtime characters.
fn unescape(raw: &str, single_quoted: bool) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let Some(&next) = chars.peek() else {
            out.push('\\');
            break;
        };
        if single_quoted {
            match next {
                '\'' | '\\' => {
                    out.push(next);
                    chars.next();
                }
                _ => out.push('\\'),
            }
            continue;
        }
        chars.next();
        match next {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            '0' => out.push('\0'),
            's' => out.push(' '),
            'e' => out.push('\u{1b}'),
            'a' => out.push('\u{7}'),
            'b' => out.push('\u{8}'),
            'f' => out.push('\u{c}'),
            'v' => out.push('\u{b}'),
            'u' => {
                // \uXXXX or \u{XXXX}
                let mut hex = String::new();
                if chars.peek() == Some(&'{') {
                    chars.next();
                    while let Some(&h) = chars.peek() {
                        if h == '}' {
                            chars.next();
                            break;
                        }
                        hex.push(h);
                        chars.next();
                    }
                } else {
                    for _ in 0..4 {
                        if let Some(&h) = chars.peek() {
                            if h.is_ascii_hexdigit() {
                                hex.push(h);
                                chars.next();
                            }
                        }
                    }
                }
                if let Ok(cp) = u32::from_str_radix(&hex, 16) {
                    if let Some(ch) = char::from_u32(cp) {
                        out.push(ch);
                    }
                }
            }
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unescape_handles_common_sequences() {
        assert_eq!(unescape("a\\nb", false), "a\nb");
        assert_eq!(unescape("tab\\t", false), "tab\t");
        assert_eq!(unescape("q\\\"q", false), "q\"q");
    }

    #[test]
    fn unescape_single_quoted_only_two_escapes() {
        assert_eq!(unescape("a\\nb", true), "a\\nb");
        assert_eq!(unescape("don\\'t", true), "don't");
        assert_eq!(unescape("x\\\\y", true), "x\\y");
    }

    #[test]
    fn unescape_unicode_forms() {
        assert_eq!(unescape("\\u0041", false), "A");
        assert_eq!(unescape("\\u{1F389}", false), "🎉");
    }
}
