//! The large `send` handler: one body covers `send`, `sendw`, `send!`,
//! `await`, `await!`, `await_attr`, `attr`, and `call` (the await/bang
//! variants just set flags read here).

use crate::ast::{Kind, Node, Value};
use crate::error::Error;

use super::literals::unwrap_begin;
use super::{op_priority, Converter, State};

impl<'a, 'o> Converter<'a, 'o> {
    pub(crate) fn on_send(&mut self, node: &'a Node<'a>) -> Result<(), Error> {
        if matches!(node.kind, Kind::Await | Kind::AwaitBang | Kind::AwaitAttr) {
            self.put("await ");
        }

        let name = node
            .str_child(1)
            .ok_or_else(|| Error::unsupported("send without selector", node.loc))?;
        let receiver = node.child(0).and_then(Value::as_node);
        let args: Vec<&'a Node<'a>> = node.children[2..]
            .iter()
            .filter_map(Value::as_node)
            .collect();

        // `raise` → `throw`
        if receiver.is_none() && name == "raise" {
            return self.emit_raise(node, &args);
        }

        // Constructs the lint collaborator must rewrite before they reach us.
        if receiver.is_none() && matches!(name, "eval" | "instance_eval" | "method_missing")
            && !args.is_empty()
        {
            return Err(Error::semantic(
                format!("{} requires a filter rewrite", name),
                node.loc,
            ));
        }

        // `async` attached to a definition
        if receiver.is_none() && name == "async" && args.len() == 1 {
            if matches!(args[0].kind, Kind::Def | Kind::Defs) {
                self.put("async ");
                return self.parse(args[0], self.state);
            }
        }

        // Compile-time fold of `+` chains over static strings.
        if name == "+" {
            if let (Some(recv), Some(arg)) = (receiver, args.first()) {
                if let (Some(a), Some(b)) = (fold_static_str(recv), fold_static_str(arg)) {
                    self.put_js_string(&format!("{}{}", a, b));
                    return Ok(());
                }
            }
        }

        // Operator lowering
        if let Some(recv) = receiver {
            match name {
                "!" => {
                    self.put("!");
                    return self.operand(recv, 13);
                }
                "-@" | "+@" => {
                    self.put(&name[..1]);
                    return self.operand(recv, 13);
                }
                "~" => {
                    self.put("~");
                    return self.operand(recv, 13);
                }
                "[]" => return self.emit_index(node, recv, &args),
                "[]=" => return self.emit_index_assign(node, recv, &args),
                "=~" => return self.emit_match(recv, &args, false),
                "!~" => return self.emit_match(recv, &args, true),
                "<=>" => {
                    let arg = args
                        .first()
                        .ok_or_else(|| Error::unsupported("<=> without operand", node.loc))?;
                    self.put("(");
                    self.operand(recv, 9)?;
                    self.put(" < ");
                    self.operand(arg, 9)?;
                    self.put(" ? -1 : ");
                    self.operand(recv, 9)?;
                    self.put(" > ");
                    self.operand(arg, 9)?;
                    self.put(" ? 1 : 0)");
                    return Ok(());
                }
                "<<" if self.state == State::Statement => {
                    return self.emit_append_chain(node);
                }
                "**" if !self.es(2016) => {
                    let arg = args
                        .first()
                        .ok_or_else(|| Error::unsupported("** without operand", node.loc))?;
                    self.put("Math.pow(");
                    self.expr(recv)?;
                    self.put(", ");
                    self.expr(arg)?;
                    self.put(")");
                    return Ok(());
                }
                "==" | "!=" => {
                    let arg = args
                        .first()
                        .ok_or_else(|| Error::unsupported("comparison operand", node.loc))?;
                    let strict = self.comparison() == crate::options::Comparison::Identity
                        && recv.kind != Kind::Nil
                        && arg.kind != Kind::Nil;
                    let op = match (name, strict) {
                        ("==", true) => "===",
                        ("==", false) => "==",
                        ("!=", true) => "!==",
                        _ => "!=",
                    };
                    self.operand(recv, 8)?;
                    self.put(&format!(" {} ", op));
                    return self.operand(arg, 9);
                }
                op if is_binary_op(op) => {
                    let arg = args
                        .first()
                        .ok_or_else(|| Error::unsupported("binary operand", node.loc))?;
                    let prio = op_priority(op);
                    if op == "**" {
                        // Right-associative.
                        self.operand(recv, prio + 1)?;
                        self.put(" ** ");
                        return self.operand(arg, prio);
                    }
                    self.operand(recv, prio)?;
                    self.put(&format!(" {} ", op));
                    return self.operand(arg, prio + 1);
                }
                _ => {}
            }

            // Range receivers: `to_a` expands inline, `include?` compares,
            // anything else converts through `to_a` first.
            let bare = unwrap_begin(recv);
            if matches!(bare.kind, Kind::Irange | Kind::Erange) {
                return self.emit_range_call(node, bare, name, &args);
            }

            match name {
                "new" => return self.emit_new(node, recv, &args),
                "is_a?" | "kind_of?" => {
                    let arg = args
                        .first()
                        .ok_or_else(|| Error::unsupported("is_a? operand", node.loc))?;
                    self.operand(recv, 9)?;
                    self.put(" instanceof ");
                    return self.operand(arg, 10);
                }
                "instance_of?" => {
                    let arg = args
                        .first()
                        .ok_or_else(|| Error::unsupported("instance_of? operand", node.loc))?;
                    self.operand(recv, 15)?;
                    self.put(".constructor === ");
                    return self.operand(arg, 9);
                }
                "call" if matches!(recv.kind, Kind::Lvar | Kind::Block) => {
                    // `f.call(x)` on a callable local invokes it directly.
                    self.operand(recv, 15)?;
                    self.put("(");
                    self.emit_args(&args)?;
                    self.put(")");
                    return Ok(());
                }
                _ => {}
            }

            if let Some(prop) = name.strip_suffix('=') {
                if !prop.is_empty() && !name.ends_with("==") {
                    // Setter-named method lowers to property assignment.
                    let value = args
                        .last()
                        .ok_or_else(|| Error::unsupported("setter without value", node.loc))?;
                    self.operand(recv, 15)?;
                    self.put(".");
                    self.put_named(prop);
                    self.put(" = ");
                    return self.expr(value);
                }
            }

            // Plain method call / property access.
            let dot = if node.kind == Kind::Csend {
                if self.es(2020) {
                    "?."
                } else {
                    return self.emit_guarded_csend(node, recv, name, &args);
                }
            } else {
                "."
            };
            self.operand(recv, 15)?;
            self.put(dot);
            self.put(name);
            if self.wants_parens(node, &args) {
                self.put("(");
                self.emit_args(&args)?;
                self.put(")");
            }
            return Ok(());
        }

        // Receiverless: `typeof` primitive form, then descriptor-driven
        // member access, then a plain function call or bare reference.
        if name == "typeof" {
            if let Some(arg) = args.first() {
                self.put("typeof ");
                return self.operand(arg, 13);
            }
        }

        if let Some(descriptor) = self.namespace.find(name) {
            return self.emit_bound_member(node, name, descriptor, &args);
        }

        self.put(name);
        if self.wants_parens(node, &args) {
            self.put("(");
            self.emit_args(&args)?;
            self.put(")");
        }
        Ok(())
    }

    fn wants_parens(&self, node: &'a Node<'a>, args: &[&'a Node<'a>]) -> bool {
        if matches!(node.kind, Kind::Attr | Kind::AwaitAttr) {
            return false;
        }
        if matches!(node.kind, Kind::Sendw | Kind::SendBang | Kind::Call) {
            return true;
        }
        !args.is_empty() || self.state == State::Method || node.is_method(self.sources)
    }

    pub(crate) fn emit_args(&mut self, args: &[&'a Node<'a>]) -> Result<(), Error> {
        for (i, arg) in args.iter().enumerate() {
            if i > 0 {
                self.put(", ");
            }
            if arg.kind == Kind::BlockPass {
                self.emit_block_pass(arg)?;
            } else {
                self.expr(arg)?;
            }
        }
        Ok(())
    }

    pub(crate) fn on_block_pass(&mut self, node: &'a Node<'a>) -> Result<(), Error> {
        self.emit_block_pass(node)
    }

    /// `&:sym` becomes an arrow invoking the method; `&callable` passes the
    /// callable through.
    fn emit_block_pass(&mut self, node: &'a Node<'a>) -> Result<(), Error> {
        match node.node_child(0) {
            Some(inner) if inner.kind == Kind::Sym => {
                let name = inner.str_child(0).unwrap_or_default();
                self.put(&format!("(item) => item.{}()", name));
                Ok(())
            }
            Some(inner) => self.expr(inner),
            None => Err(Error::unsupported("anonymous block forward", node.loc)),
        }
    }

    fn emit_raise(&mut self, node: &'a Node<'a>, args: &[&'a Node<'a>]) -> Result<(), Error> {
        if self.state != State::Statement {
            return Err(Error::unsupported("raise in expression position", node.loc));
        }
        self.put("throw ");
        match args {
            [] => {
                let bound = self
                    .rescue_vars
                    .last()
                    .cloned()
                    .unwrap_or_else(|| "$err".to_string());
                self.put(&bound);
            }
            [single] if matches!(single.kind, Kind::Str | Kind::Dstr) => {
                self.put("new Error(");
                self.expr(single)?;
                self.put(")");
            }
            [single] if single.kind == Kind::Const => {
                self.put("new ");
                self.expr(single)?;
                self.put("()");
            }
            [single] => {
                self.expr(single)?;
            }
            [class_node, message, ..] => {
                self.put("new ");
                self.expr(class_node)?;
                self.put("(");
                self.expr(message)?;
                self.put(")");
            }
        }
        Ok(())
    }

    fn emit_index(
        &mut self,
        node: &'a Node<'a>,
        recv: &'a Node<'a>,
        args: &[&'a Node<'a>],
    ) -> Result<(), Error> {
        let _ = node;
        if let Some(first) = args.first() {
            let range = unwrap_begin(first);
            if matches!(range.kind, Kind::Irange | Kind::Erange) {
                // xs[a..b] → xs.slice(a, b + 1); xs[a...b] → xs.slice(a, b)
                self.operand(recv, 15)?;
                self.put(".slice(");
                match range.node_child(0) {
                    Some(begin) => self.expr(begin)?,
                    None => self.put("0"),
                }
                if let Some(end) = range.node_child(1) {
                    self.put(", ");
                    if range.kind == Kind::Irange {
                        if let Some(Value::Int(v)) = end.child(0) {
                            if end.kind == Kind::Int {
                                self.put(&(v + 1).to_string());
                                self.put(")");
                                return Ok(());
                            }
                        }
                        self.operand(end, 11)?;
                        self.put(" + 1");
                    } else {
                        self.expr(end)?;
                    }
                }
                self.put(")");
                return Ok(());
            }
        }
        self.operand(recv, 15)?;
        self.put("[");
        self.emit_args(args)?;
        self.put("]");
        Ok(())
    }

    fn emit_index_assign(
        &mut self,
        node: &'a Node<'a>,
        recv: &'a Node<'a>,
        args: &[&'a Node<'a>],
    ) -> Result<(), Error> {
        let (value, indexes) = args
            .split_last()
            .ok_or_else(|| Error::unsupported("index assignment", node.loc))?;
        if indexes
            .iter()
            .any(|i| matches!(unwrap_begin(i).kind, Kind::Irange | Kind::Erange))
        {
            return Err(Error::unsupported("range index assignment", node.loc));
        }
        self.operand(recv, 15)?;
        self.put("[");
        self.emit_args(indexes)?;
        self.put("] = ");
        self.expr(value)
    }

    fn emit_match(
        &mut self,
        recv: &'a Node<'a>,
        args: &[&'a Node<'a>],
        negate: bool,
    ) -> Result<(), Error> {
        let arg = args
            .first()
            .ok_or_else(|| Error::unsupported("match without operand", recv.loc))?;
        if negate {
            self.put("!");
        }
        // The regexp side carries `.test`, whichever side it is.
        let (re, subject) = if recv.kind == Kind::Regexp {
            (recv, *arg)
        } else {
            (*arg, recv)
        };
        self.operand(re, 15)?;
        self.put(".test(");
        self.expr(subject)?;
        self.put(")");
        Ok(())
    }

    /// Repeated `<<` appends collapse into one `push` call.
    fn emit_append_chain(&mut self, node: &'a Node<'a>) -> Result<(), Error> {
        let mut items: Vec<&'a Node<'a>> = Vec::new();
        let mut base = node;
        loop {
            let recv = base
                .node_child(0)
                .ok_or_else(|| Error::unsupported("append without receiver", base.loc))?;
            if let Some(arg) = base.children[2..].iter().filter_map(Value::as_node).next() {
                items.push(arg);
            }
            if recv.kind.is_send_family() && recv.str_child(1) == Some("<<") {
                base = recv;
            } else {
                items.reverse();
                self.operand(recv, 15)?;
                self.put(".push(");
                self.emit_args(&items)?;
                self.put(")");
                return Ok(());
            }
        }
    }

    fn emit_new(
        &mut self,
        node: &'a Node<'a>,
        recv: &'a Node<'a>,
        args: &[&'a Node<'a>],
    ) -> Result<(), Error> {
        let _ = node;
        // Regexp.new normalises string and regexp arguments.
        if recv.kind == Kind::Const && recv.str_child(1) == Some("Regexp") {
            let flags = args
                .get(1)
                .and_then(|f| f.str_child(0))
                .unwrap_or_default()
                .to_string();
            match args.first() {
                Some(pat) if pat.kind == Kind::Str => {
                    let raw = pat.str_child(0).unwrap_or_default();
                    let (pattern, mut jsflags) =
                        super::literals::normalize_regex(raw, &flags);
                    for f in flags.chars() {
                        if f == 'i' && !jsflags.contains('i') {
                            jsflags.push('i');
                        }
                    }
                    self.ser.put_literal(&format!("/{}/{}", pattern, jsflags));
                    return Ok(());
                }
                Some(pat) if pat.kind == Kind::Regexp => {
                    return self.expr(pat);
                }
                _ => {
                    self.put("new RegExp(");
                    self.emit_args(args)?;
                    self.put(")");
                    return Ok(());
                }
            }
        }

        self.put("new ");
        self.operand(recv, 15)?;
        self.put("(");
        self.emit_args(args)?;
        self.put(")");
        Ok(())
    }

    fn emit_range_call(
        &mut self,
        node: &'a Node<'a>,
        range: &'a Node<'a>,
        name: &str,
        args: &[&'a Node<'a>],
    ) -> Result<(), Error> {
        match name {
            "to_a" | "entries" => self.emit_range_to_a(range),
            "include?" | "cover?" | "member?" => {
                let arg = args
                    .first()
                    .ok_or_else(|| Error::unsupported("include? operand", node.loc))?;
                let (begin, end) = range_bounds(range, node)?;
                self.put("(");
                self.operand(arg, 9)?;
                self.put(" >= ");
                self.operand(begin, 9)?;
                self.put(" && ");
                self.operand(arg, 9)?;
                self.put(if range.kind == Kind::Irange { " <= " } else { " < " });
                self.operand(end, 9)?;
                self.put(")");
                Ok(())
            }
            _ => {
                // Other calls convert through to_a first.
                self.emit_range_to_a(range)?;
                self.put(".");
                self.put(name);
                self.put("(");
                self.emit_args(args)?;
                self.put(")");
                Ok(())
            }
        }
    }

    /// Static integer ranges expand inline; general ranges go through
    /// `Array.from`.
    pub(crate) fn emit_range_to_a(&mut self, range: &'a Node<'a>) -> Result<(), Error> {
        let inclusive = range.kind == Kind::Irange;
        let begin = range.node_child(0);
        let end = range.node_child(1);

        let static_bounds = match (begin.and_then(int_value), end.and_then(int_value)) {
            (Some(a), Some(b)) => Some((a, b)),
            _ => None,
        };

        if let Some((a, b)) = static_bounds {
            let count = if inclusive { b - a + 1 } else { b - a };
            if a == 0 {
                self.put(&format!("[...Array({}).keys()]", count));
            } else {
                self.put(&format!(
                    "Array.from({{length: {}}}, (_, i) => i + {})",
                    count, a
                ));
            }
            return Ok(());
        }

        let (begin, end) = match (begin, end) {
            (Some(b), Some(e)) => (b, e),
            _ => {
                return Err(Error::unsupported(
                    "beginless or endless range expansion",
                    range.loc,
                ))
            }
        };
        self.put("Array.from({length: ");
        self.operand(end, 11)?;
        self.put(" - ");
        self.operand(begin, 12)?;
        if inclusive {
            self.put(" + 1");
        }
        self.put("}, (_, i) => i + ");
        self.operand(begin, 11)?;
        self.put(")");
        Ok(())
    }

    fn emit_guarded_csend(
        &mut self,
        node: &'a Node<'a>,
        recv: &'a Node<'a>,
        name: &str,
        args: &[&'a Node<'a>],
    ) -> Result<(), Error> {
        // Below ES2020 there is no `?.`; guard with a ternary (best effort,
        // the receiver is evaluated twice).
        self.put("(");
        self.operand(recv, 8)?;
        self.put(" == null ? null : ");
        self.operand(recv, 15)?;
        self.put(".");
        self.put(name);
        if self.wants_parens(node, args) {
            self.put("(");
            self.emit_args(args)?;
            self.put(")");
        }
        self.put(")");
        Ok(())
    }

    /// Receiverless call resolved through the namespace descriptors:
    /// instance members pick up `this.`, private methods their prefix,
    /// autobound references a `.bind(this)`.
    fn emit_bound_member(
        &mut self,
        node: &'a Node<'a>,
        name: &str,
        descriptor: &'a Node<'a>,
        args: &[&'a Node<'a>],
    ) -> Result<(), Error> {
        let receiver = if self.self_alias_depth > 0 { "self" } else { "this" };
        match descriptor.kind {
            Kind::PrivateMethod => {
                let prefix = if self.underscored_private() { "_" } else { "#" };
                self.put(&format!("{}.{}{}", receiver, prefix, name));
                if self.wants_parens(node, args) {
                    self.put("(");
                    self.emit_args(args)?;
                    self.put(")");
                }
                Ok(())
            }
            Kind::Autobind => {
                if self.wants_parens(node, args) {
                    self.put(&format!("{}.{}", receiver, name));
                    self.put("(");
                    self.emit_args(args)?;
                    self.put(")");
                } else {
                    self.put(&format!("{}.{}.bind({})", receiver, name, receiver));
                }
                Ok(())
            }
            Kind::Setter => {
                let value = args
                    .last()
                    .ok_or_else(|| Error::unsupported("setter without value", node.loc))?;
                self.put(&format!("{}.{} = ", receiver, name.trim_end_matches('=')));
                self.expr(value)
            }
            _ => {
                self.put(&format!("{}.{}", receiver, name));
                if self.wants_parens(node, args) {
                    self.put("(");
                    self.emit_args(args)?;
                    self.put(")");
                }
                Ok(())
            }
        }
    }
}

fn is_binary_op(op: &str) -> bool {
    matches!(
        op,
        "+" | "-"
            | "*"
            | "/"
            | "%"
            | "**"
            | "<"
            | ">"
            | "<="
            | ">="
            | "==="
            | "!=="
            | "&"
            | "|"
            | "^"
            | "<<"
            | ">>"
    )
}

fn int_value(node: &Node) -> Option<i64> {
    if node.kind == Kind::Int {
        if let Some(Value::Int(v)) = node.child(0) {
            return Some(*v);
        }
    }
    None
}

fn range_bounds<'a>(
    range: &'a Node<'a>,
    at: &'a Node<'a>,
) -> Result<(&'a Node<'a>, &'a Node<'a>), Error> {
    match (range.node_child(0), range.node_child(1)) {
        (Some(b), Some(e)) => Ok((b, e)),
        _ => Err(Error::unsupported("open-ended range comparison", at.loc)),
    }
}

fn fold_static_str(node: &Node) -> Option<String> {
    match node.kind {
        Kind::Str => Some(node.str_child(0).unwrap_or_default().to_string()),
        kind if kind.is_send_family() && node.str_child(1) == Some("+") => {
            let recv = node.node_child(0)?;
            let arg = node.children[2..].iter().filter_map(Value::as_node).next()?;
            Some(format!("{}{}", fold_static_str(recv)?, fold_static_str(arg)?))
        }
        Kind::Begin if node.children.len() == 1 => fold_static_str(node.node_child(0)?),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::Arena;
    use crate::ast::s;

    #[test]
    fn static_string_folding() {
        let arena = Arena::new();
        let a = s(&arena, Kind::Str, &[Value::Str("foo")]);
        let b = s(&arena, Kind::Str, &[Value::Str("bar")]);
        let plus = s(
            &arena,
            Kind::Send,
            &[Value::Node(a), Value::Str("+"), Value::Node(b)],
        );
        assert_eq!(fold_static_str(plus), Some("foobar".to_string()));

        let c = s(&arena, Kind::Int, &[Value::Int(1)]);
        let mixed = s(
            &arena,
            Kind::Send,
            &[Value::Node(a), Value::Str("+"), Value::Node(c)],
        );
        assert_eq!(fold_static_str(mixed), None);
    }

    #[test]
    fn binary_op_table() {
        assert!(is_binary_op("+"));
        assert!(is_binary_op("<<"));
        assert!(!is_binary_op("each"));
    }
}
