//! Blocks, lambdas, method definitions, argument lists, `yield`, `super`.

use crate::ast::{Kind, Node, Value};
use crate::error::Error;

use super::literals::unwrap_begin;
use super::{Converter, State, VarState};

/// How a formal parameter list lowers.
pub(crate) struct ParamPlan<'a> {
    /// Positional parameters for a `let [a, b = 1] = args;` line when the
    /// keyword-rest prologue owns the signature.
    positionals: Vec<&'a Node<'a>>,
    kwargs: Vec<&'a Node<'a>>,
    kwrest: Option<&'a Node<'a>>,
    /// Signature collapsed to `(...args)`; the prologue drains it.
    uses_prologue: bool,
}

impl<'a, 'o> Converter<'a, 'o> {
    // ── definitions ────────────────────────────────────────────────────

    pub(crate) fn on_def(&mut self, node: &'a Node<'a>) -> Result<(), Error> {
        let (receiver, name_idx) = match node.kind {
            Kind::Defs => (node.node_child(0), 1),
            _ => (None, 0),
        };
        let name = node
            .str_child(name_idx)
            .ok_or_else(|| Error::unsupported("def without name", node.loc))?;
        if is_operator_name(name) {
            return Err(Error::semantic(
                format!("operator method definition {} requires a filter rewrite", name),
                node.loc,
            ));
        }
        let args = node
            .node_child(name_idx + 1)
            .ok_or_else(|| Error::unsupported("def without args", node.loc))?;
        let body = node
            .node_child(name_idx + 2)
            .ok_or_else(|| Error::unsupported("def without body", node.loc))?;

        // Endless definitions return their expression body.
        let autoreturn = !node.loc.map(|l| l.has_end).unwrap_or(true);

        match receiver {
            Some(recv) if recv.kind == Kind::Self_ || recv.kind == Kind::Cbase => {
                self.put("function ");
                self.put_named(name);
                self.emit_function_tail(name, args, body, autoreturn)?;
            }
            Some(recv) => {
                // `def Foo.bar` attaches to the constant.
                self.operand(recv, 15)?;
                self.put(".");
                self.put_named(name);
                self.put(" = function");
                self.emit_function_tail(name, args, body, autoreturn)?;
            }
            None => {
                self.put("function ");
                self.put_named(name);
                self.emit_function_tail(name, args, body, autoreturn)?;
            }
        }
        Ok(())
    }

    /// Signature + braced body shared by every function-shaped emission.
    pub(crate) fn emit_function_tail(
        &mut self,
        name: &str,
        args: &'a Node<'a>,
        body: &'a Node<'a>,
        autoreturn: bool,
    ) -> Result<(), Error> {
        let saved_method = self.current_method.replace(name.to_string());
        let saved_args = std::mem::replace(&mut self.current_method_args, param_names(args));
        let saved_yield = self.yield_target.take();

        self.push_scope(true);
        let plan = self.emit_signature(args, body)?;
        self.put(" {");
        self.ser.newline();
        self.emit_param_prologue(&plan)?;
        if autoreturn {
            self.emit_returned(body)?;
            self.terminate_returned(body);
        } else {
            let list = self.body_list(body);
            self.stmts(&list)?;
        }
        self.ser.sput("}");
        self.pop_scope();

        self.yield_target = saved_yield;
        self.current_method_args = saved_args;
        self.current_method = saved_method;
        Ok(())
    }

    /// Emits `(params)` and registers them; keyword handling follows the
    /// target level: a kwrest splat switches to the `(...args)` +
    /// `$kwargs` prologue, plain keywords destructure the trailing
    /// options argument.
    pub(crate) fn emit_signature(
        &mut self,
        args: &'a Node<'a>,
        body: &'a Node<'a>,
    ) -> Result<ParamPlan<'a>, Error> {
        let children: Vec<&'a Node<'a>> = args.child_nodes().collect();
        let positionals: Vec<&'a Node<'a>> = children
            .iter()
            .copied()
            .filter(|a| matches!(a.kind, Kind::Arg | Kind::Optarg | Kind::Restarg | Kind::Mlhs))
            .collect();
        let kwargs: Vec<&'a Node<'a>> = children
            .iter()
            .copied()
            .filter(|a| matches!(a.kind, Kind::Kwarg | Kind::Kwoptarg))
            .collect();
        let kwrest = children.iter().copied().find(|a| a.kind == Kind::Kwrestarg);
        let blockarg = children.iter().copied().find(|a| a.kind == Kind::Blockarg);

        // Implicit yield: a body that yields without a block parameter gains
        // a trailing callable argument.
        let implicit_yield = blockarg.is_none() && contains_yield(body);
        if let Some(blockarg) = blockarg {
            self.yield_target = blockarg.str_child(0).map(|s| s.to_string());
        } else if implicit_yield {
            self.yield_target = Some("_implicitBlockYield".to_string());
        }

        for child in &children {
            for name in formal_names(child) {
                self.set_var(&name, VarState::Declared);
            }
        }

        if kwrest.is_some() {
            self.put("(...args)");
            self.set_var("args", VarState::Declared);
            return Ok(ParamPlan {
                positionals,
                kwargs,
                kwrest,
                uses_prologue: true,
            });
        }

        self.put("(");
        let mut first = true;
        for param in &positionals {
            if !first {
                self.put(", ");
            }
            first = false;
            self.on_formal_arg(param)?;
        }
        if !kwargs.is_empty() {
            if !first {
                self.put(", ");
            }
            first = false;
            self.put("{");
            for (i, kw) in kwargs.iter().enumerate() {
                if i > 0 {
                    self.put(", ");
                }
                self.on_formal_arg(kw)?;
            }
            self.put("} = {}");
        }
        if let Some(blockarg) = blockarg {
            if !first {
                self.put(", ");
            }
            first = false;
            self.put(blockarg.str_child(0).unwrap_or_default());
        }
        if implicit_yield {
            if !first {
                self.put(", ");
            }
            self.put("_implicitBlockYield = null");
            self.set_var("_implicitBlockYield", VarState::Declared);
        }
        self.put(")");
        Ok(ParamPlan {
            positionals: Vec::new(),
            kwargs: Vec::new(),
            kwrest: None,
            uses_prologue: false,
        })
    }

    /// The runtime keyword-extraction prologue used when a `**rest`
    /// parameter needs the open-ended options object.
    fn emit_param_prologue(&mut self, plan: &ParamPlan<'a>) -> Result<(), Error> {
        if !plan.uses_prologue {
            return Ok(());
        }
        self.ser.puts("let $kwargs = args.at(-1);");
        self.ser.puts(
            "if (typeof $kwargs === \"object\" && $kwargs !== null && $kwargs.constructor === Object) args.pop(); else $kwargs = {};",
        );
        if !plan.positionals.is_empty() {
            self.put("let [");
            for (i, param) in plan.positionals.iter().enumerate() {
                if i > 0 {
                    self.put(", ");
                }
                self.on_formal_arg(param)?;
            }
            self.puts_line("] = args;");
        }
        if !plan.kwargs.is_empty() || plan.kwrest.is_some() {
            self.put("let {");
            let mut first = true;
            for kw in &plan.kwargs {
                if !first {
                    self.put(", ");
                }
                first = false;
                self.on_formal_arg(kw)?;
            }
            if let Some(rest) = plan.kwrest {
                if !first {
                    self.put(", ");
                }
                self.put("...");
                self.put(rest.str_child(0).unwrap_or("$rest"));
            }
            self.puts_line("} = $kwargs;");
        }
        Ok(())
    }

    fn puts_line(&mut self, s: &str) {
        self.put(s);
        self.ser.newline();
    }

    pub(crate) fn on_args(&mut self, node: &'a Node<'a>) -> Result<(), Error> {
        for (i, arg) in node.child_nodes().enumerate() {
            if i > 0 {
                self.put(", ");
            }
            self.on_formal_arg(arg)?;
        }
        Ok(())
    }

    pub(crate) fn on_formal_arg(&mut self, node: &'a Node<'a>) -> Result<(), Error> {
        match node.kind {
            Kind::Arg | Kind::Kwarg | Kind::Shadowarg => {
                self.put(node.str_child(0).unwrap_or_default());
            }
            Kind::Optarg | Kind::Kwoptarg => {
                self.put(node.str_child(0).unwrap_or_default());
                self.put(" = ");
                if let Some(default) = node.node_child(1) {
                    self.expr(default)?;
                }
            }
            Kind::Restarg => {
                self.put("...");
                self.put(node.str_child(0).unwrap_or("$rest"));
            }
            Kind::Kwrestarg => {
                self.put("...");
                self.put(node.str_child(0).unwrap_or("$rest"));
            }
            Kind::Blockarg => {
                self.put(node.str_child(0).unwrap_or_default());
            }
            Kind::Mlhs => {
                self.put("[");
                for (i, inner) in node.child_nodes().enumerate() {
                    if i > 0 {
                        self.put(", ");
                    }
                    self.on_formal_arg(inner)?;
                }
                self.put("]");
            }
            _ => return Err(Error::unsupported("formal argument", node.loc)),
        }
        Ok(())
    }

    // ── blocks ─────────────────────────────────────────────────────────

    pub(crate) fn on_block(&mut self, node: &'a Node<'a>) -> Result<(), Error> {
        let call = node
            .node_child(0)
            .ok_or_else(|| Error::unsupported("block without call", node.loc))?;
        let args = self.block_args(node)?;
        let body = node
            .children
            .last()
            .and_then(Value::as_node)
            .ok_or_else(|| Error::unsupported("block without body", node.loc))?;

        let receiver = call.child(0).and_then(Value::as_node);
        let call_name = call.str_child(1);

        // Proc.new / proc / lambda reduce to the block itself.
        if is_proc_constructor(call) {
            let autoreturn =
                call_name == Some("lambda") && self.state != State::Statement;
            return self.emit_closure(args, body, autoreturn, false);
        }

        // Class.new(parent) { ... } is an inline class literal.
        if receiver.map(|r| r.kind == Kind::Const && r.str_child(1) == Some("Class"))
            == Some(true)
            && call_name == Some("new")
        {
            let superclass = call.children[2..].iter().filter_map(Value::as_node).next();
            return self.emit_class_literal(None, superclass, body);
        }

        // `async do ... end`
        if receiver.is_none() && call_name == Some("async") {
            self.put("async ");
            return self.emit_closure(args, body, false, false);
        }

        // Range iteration specialises to counted loops.
        if let Some(recv) = receiver {
            let range = unwrap_begin(recv);
            if matches!(range.kind, Kind::Irange | Kind::Erange)
                && self.state == State::Statement
            {
                match call_name {
                    Some("each") => {
                        let name = single_param_name(args).unwrap_or_else(|| "$i".to_string());
                        self.set_var(&name, VarState::Declared);
                        return self.emit_counted_for(&name, range, None, body);
                    }
                    Some("step") => {
                        let step = call.children[2..].iter().filter_map(Value::as_node).next();
                        if let Some(step) = step {
                            let name =
                                single_param_name(args).unwrap_or_else(|| "$i".to_string());
                            self.set_var(&name, VarState::Declared);
                            return self.emit_counted_for(&name, range, Some(step), body);
                        }
                    }
                    _ => {}
                }
            }
        }

        // `loop do ... end`
        if receiver.is_none() && call_name == Some("loop") {
            let has_value_break = contains_break_value(body);
            if has_value_break {
                if self.var_state("_loop_result").is_none() {
                    self.ser.puts("let _loop_result;");
                    self.set_var("_loop_result", VarState::Declared);
                }
                self.break_value_allowed = true;
            }
            self.put("while (true)");
            let result = self.brace_body(body);
            self.break_value_allowed = false;
            return result;
        }

        // receiver.tap { |v| ... } keeps and returns the receiver.
        if let (Some(recv), Some(name)) = (receiver, call_name) {
            if name == "tap" {
                let param = single_param_name(args).unwrap_or_else(|| "$v".to_string());
                self.put("((");
                self.put(&param);
                self.put(") => {");
                self.ser.newline();
                self.push_scope(true);
                self.set_var(&param, VarState::Declared);
                let list = self.body_list(body);
                self.stmts(&list)?;
                if !self.ser.current_line_blank() {
                    self.ser.newline();
                }
                self.ser.puts(&format!("return {};", param));
                self.pop_scope();
                self.ser.sput("})(");
                self.expr(recv)?;
                self.put(")");
                return Ok(());
            }
            if name == "then" || name == "yield_self" {
                let param = single_param_name(args).unwrap_or_else(|| "$v".to_string());
                self.put("((");
                self.put(&param);
                self.put(") => {");
                self.ser.newline();
                self.push_scope(true);
                self.set_var(&param, VarState::Declared);
                self.emit_returned(body)?;
                self.terminate_returned(body);
                self.pop_scope();
                self.ser.sput("})(");
                self.expr(recv)?;
                self.put(")");
                return Ok(());
            }
        }

        // `async def` under a block wrapper.
        if receiver.is_none() && call_name == Some("async") {
            self.put("async ");
            return self.emit_closure(args, body, false, false);
        }

        // General case: the block becomes the call's final callable
        // argument.
        let call_args: Vec<&'a Node<'a>> = call.children[2..]
            .iter()
            .filter_map(Value::as_node)
            .collect();
        match receiver {
            Some(recv) => {
                self.operand(recv, 15)?;
                self.put(if call.kind == Kind::Csend && self.es(2020) { "?." } else { "." });
                self.put(call_name.unwrap_or_default());
            }
            None => {
                self.put(call_name.unwrap_or_default());
            }
        }
        self.put("(");
        self.emit_args(&call_args)?;
        if !call_args.is_empty() {
            self.put(", ");
        }
        self.emit_closure(args, body, true, true)?;
        self.put(")");
        Ok(())
    }

    fn block_args(&mut self, node: &'a Node<'a>) -> Result<&'a Node<'a>, Error> {
        // numblock carries a parameter count instead of an args node.
        if node.kind == Kind::Numblock {
            if let Some(Value::Int(max)) = node.child(1) {
                let params: Vec<Value<'a>> = (1..=*max)
                    .map(|i| {
                        Value::Node(crate::ast::s(
                            self.arena,
                            Kind::Arg,
                            &[Value::Str(self.arena.alloc_str(&format!("_{}", i)))],
                        ))
                    })
                    .collect();
                return Ok(crate::ast::s(self.arena, Kind::Args, &params));
            }
        }
        node.node_child(1)
            .ok_or_else(|| Error::unsupported("block without args", node.loc))
    }

    /// Emits a closure value for a block: a concise arrow for a single
    /// expression, a braced arrow otherwise, or a `function` expression
    /// when the body needs the dynamic-`this` form — in which case `self`
    /// references alias the enclosing `this`.
    pub(crate) fn emit_closure(
        &mut self,
        args: &'a Node<'a>,
        body: &'a Node<'a>,
        autoreturn: bool,
        value_semantics: bool,
    ) -> Result<(), Error> {
        let needs_function = value_semantics && needs_function_form(body);

        self.block_depth += 1;
        self.push_scope(false);
        for arg in args.child_nodes() {
            for name in formal_names(arg) {
                self.set_var(&name, VarState::Declared);
            }
        }

        let result = (|| -> Result<(), Error> {
            if needs_function {
                self.request_self_alias();
                self.self_alias_depth += 1;
                self.put("function (");
                self.on_args(args)?;
                self.put(") {");
                self.ser.newline();
                if autoreturn {
                    self.emit_returned(body)?;
                    self.terminate_returned(body);
                } else {
                    let list = self.body_list(body);
                    self.stmts(&list)?;
                }
                self.ser.sput("}");
                self.self_alias_depth -= 1;
                return Ok(());
            }

            let simple_args = args
                .child_nodes()
                .all(|a| a.kind == Kind::Arg);
            let single_expr = is_single_expression(body);

            if simple_args && single_expr && autoreturn {
                let count = args.child_nodes().count();
                if count == 1 {
                    self.put(args.node_child(0).and_then(|a| a.str_child(0)).unwrap_or("_"));
                } else {
                    self.put("(");
                    self.on_args(args)?;
                    self.put(")");
                }
                self.put(" => ");
                let inner = unwrap_begin(body);
                return self.operand(inner, 1);
            }

            self.put("(");
            self.on_args(args)?;
            self.put(") => {");
            self.ser.newline();
            if autoreturn {
                self.emit_returned(body)?;
                self.terminate_returned(body);
            } else {
                let list = self.body_list(body);
                self.stmts(&list)?;
            }
            self.ser.sput("}");
            Ok(())
        })();

        self.pop_scope();
        self.block_depth -= 1;
        result
    }

    // ── yield and super ────────────────────────────────────────────────

    pub(crate) fn on_yield(&mut self, node: &'a Node<'a>) -> Result<(), Error> {
        let target = self
            .yield_target
            .clone()
            .unwrap_or_else(|| "_implicitBlockYield".to_string());
        self.put(&target);
        self.put("(");
        let args: Vec<&'a Node<'a>> = node.child_nodes().collect();
        self.emit_args(&args)?;
        self.put(")");
        Ok(())
    }

    pub(crate) fn on_super(&mut self, node: &'a Node<'a>) -> Result<(), Error> {
        let in_constructor = matches!(
            self.current_method.as_deref(),
            Some("initialize") | Some("constructor")
        );
        if in_constructor {
            self.put("super(");
            if node.kind == Kind::Zsuper {
                let names = self.current_method_args.join(", ");
                self.put(&names);
            } else {
                let args: Vec<&'a Node<'a>> = node.child_nodes().collect();
                self.emit_args(&args)?;
            }
            self.put(")");
            return Ok(());
        }

        let method = self.current_method.clone().ok_or_else(|| {
            Error::unsupported("super outside a method definition", node.loc)
        })?;
        self.put("super.");
        self.put(&method);
        self.put("(");
        if node.kind == Kind::Zsuper {
            let names = self.current_method_args.join(", ");
            self.put(&names);
        } else {
            let args: Vec<&'a Node<'a>> = node.child_nodes().collect();
            self.emit_args(&args)?;
        }
        self.put(")");
        Ok(())
    }
}

pub(crate) fn param_names(args: &Node) -> Vec<String> {
    args.child_nodes().flat_map(|a| formal_names(a)).collect()
}

pub(crate) fn formal_names(arg: &Node) -> Vec<String> {
    match arg.kind {
        Kind::Mlhs => arg.child_nodes().flat_map(formal_names).collect(),
        _ => arg
            .str_child(0)
            .map(|s| vec![s.to_string()])
            .unwrap_or_default(),
    }
}

fn single_param_name(args: &Node) -> Option<String> {
    let mut names = args.child_nodes().filter_map(|a| a.str_child(0));
    let first = names.next()?;
    if names.next().is_some() {
        return None;
    }
    Some(first.to_string())
}

fn is_proc_constructor(call: &Node) -> bool {
    let receiver = call.child(0).and_then(Value::as_node);
    let name = call.str_child(1);
    match (receiver, name) {
        (None, Some("proc")) | (None, Some("lambda")) => true,
        (Some(recv), Some("new")) => {
            recv.kind == Kind::Const && recv.str_child(1) == Some("Proc")
        }
        _ => false,
    }
}

/// Dynamic-`this` is needed when the body touches the enclosing object.
fn needs_function_form(node: &Node) -> bool {
    match node.kind {
        Kind::Self_ | Kind::Ivar | Kind::Ivasgn | Kind::Cvar | Kind::Cvasgn | Kind::Super
        | Kind::Zsuper | Kind::Yield => true,
        Kind::Block | Kind::Def | Kind::Defs | Kind::Class | Kind::Module => false,
        _ => node.child_nodes().any(needs_function_form),
    }
}

fn is_single_expression(body: &Node) -> bool {
    let inner = unwrap_begin(body);
    if inner.kind == Kind::Begin {
        return false;
    }
    !matches!(
        inner.kind,
        Kind::If
            | Kind::Case
            | Kind::CaseMatch
            | Kind::While
            | Kind::Until
            | Kind::WhilePost
            | Kind::UntilPost
            | Kind::For
            | Kind::Kwbegin
            | Kind::Return
            | Kind::Class
            | Kind::Module
            | Kind::Def
            | Kind::Defs
            | Kind::Masgn
            | Kind::Lvasgn
            | Kind::Ivasgn
    )
}

fn contains_yield(node: &Node) -> bool {
    if node.kind == Kind::Yield {
        return true;
    }
    if matches!(node.kind, Kind::Def | Kind::Defs | Kind::Class | Kind::Module) {
        return false;
    }
    node.child_nodes().any(contains_yield)
}

fn contains_break_value(node: &Node) -> bool {
    if node.kind == Kind::Break && node.node_child(0).is_some() {
        return true;
    }
    if matches!(
        node.kind,
        Kind::While | Kind::Until | Kind::WhilePost | Kind::UntilPost | Kind::For | Kind::Block
    ) {
        return false;
    }
    node.child_nodes().any(contains_break_value)
}

pub(crate) fn is_operator_name(name: &str) -> bool {
    matches!(
        name,
        "+" | "-" | "*" | "/" | "%" | "**" | "==" | "!=" | "<" | ">" | "<=" | ">=" | "<=>"
            | "<<" | ">>" | "[]" | "[]=" | "=~" | "+@" | "-@" | "~" | "!"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::Arena;
    use crate::ast::s;

    #[test]
    fn function_form_detection() {
        let arena = Arena::new();
        let ivar = s(&arena, Kind::Ivar, &[Value::Str("@n")]);
        assert!(needs_function_form(ivar));

        let lvar = s(&arena, Kind::Lvar, &[Value::Str("x")]);
        assert!(!needs_function_form(lvar));

        // Nested blocks own their own `this` decision.
        let call = s(&arena, Kind::Send, &[Value::Nil, Value::Str("f")]);
        let args = s(&arena, Kind::Args, &[]);
        let inner = s(
            &arena,
            Kind::Block,
            &[Value::Node(call), Value::Node(args), Value::Node(ivar)],
        );
        assert!(!needs_function_form(inner));
    }

    #[test]
    fn operator_names_are_flagged() {
        assert!(is_operator_name("+"));
        assert!(is_operator_name("[]="));
        assert!(!is_operator_name("each"));
    }

    #[test]
    fn formal_name_collection() {
        let arena = Arena::new();
        let a = s(&arena, Kind::Arg, &[Value::Str("a")]);
        let rest = s(&arena, Kind::Restarg, &[Value::Str("rest")]);
        let args = s(&arena, Kind::Args, &[Value::Node(a), Value::Node(rest)]);
        assert_eq!(param_names(args), vec!["a", "rest"]);
    }
}
