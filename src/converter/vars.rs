//! Variable reads, assignments, multiple assignment, `defined?`.

use crate::ast::{Kind, Node, Value};
use crate::error::Error;
use crate::options::{OrMode, Truthy};

use super::{Converter, Helper, State, VarState};

impl<'a, 'o> Converter<'a, 'o> {
    pub(crate) fn on_lvar(&mut self, node: &'a Node<'a>) -> Result<(), Error> {
        let name = node.str_child(0).unwrap_or_default();
        if self.var_state(name).is_none() {
            self.set_var(name, VarState::Implicit);
        }
        self.put(name);
        Ok(())
    }

    /// Instance-variable reference: `#field` inside an ES2022 class body,
    /// `_field` under underscored privates, constant-folded when the host
    /// supplied a static value for it.
    pub(crate) fn on_ivar(&mut self, node: &'a Node<'a>) -> Result<(), Error> {
        let name = node.str_child(0).unwrap_or_default();
        if let Some(value) = self.options.ivars.get(name) {
            let rendered = json_to_js(value);
            self.put(&rendered);
            return Ok(());
        }
        let reference = self.ivar_ref(name);
        self.put(&reference);
        Ok(())
    }

    pub(crate) fn ivar_ref(&mut self, name: &str) -> String {
        let bare = name.trim_start_matches('@');
        let receiver = if self.self_alias_depth > 0 { "self" } else { "this" };
        match self.class_stack.last() {
            Some(ctx) if ctx.hash_privates && ctx.privates.contains(bare) => {
                format!("{}.#{}", receiver, bare)
            }
            _ => format!("{}._{}", receiver, bare),
        }
    }

    pub(crate) fn on_cvar(&mut self, node: &'a Node<'a>) -> Result<(), Error> {
        let name = node.str_child(0).unwrap_or_default();
        let reference = self.cvar_ref(name);
        self.put(&reference);
        Ok(())
    }

    pub(crate) fn cvar_ref(&mut self, name: &str) -> String {
        let bare = name.trim_start_matches('@');
        match self.class_stack.last() {
            Some(ctx) if ctx.hash_privates => format!("{}.#{}", ctx.name, bare),
            Some(ctx) => format!("{}._{}", ctx.name, bare),
            None => format!("this.constructor._{}", bare),
        }
    }

    /// `$!` resolves to the bound exception; other globals keep their `$`
    /// (a legal JS identifier character).
    pub(crate) fn on_gvar(&mut self, node: &'a Node<'a>) -> Result<(), Error> {
        let name = node.str_child(0).unwrap_or_default();
        if name == "$!" {
            let bound = self
                .rescue_vars
                .last()
                .cloned()
                .unwrap_or_else(|| "$err".to_string());
            self.put(&bound);
        } else {
            self.put(name);
        }
        Ok(())
    }

    pub(crate) fn on_gvasgn(&mut self, node: &'a Node<'a>) -> Result<(), Error> {
        let name = node.str_child(0).unwrap_or_default();
        self.put(name);
        if let Some(value) = node.node_child(1) {
            self.put(" = ");
            self.expr(value)?;
        }
        Ok(())
    }

    pub(crate) fn on_const(&mut self, node: &'a Node<'a>) -> Result<(), Error> {
        let name = node.str_child(1).unwrap_or_default();
        match node.node_child(0) {
            None => self.put_named(name),
            Some(parent) if parent.kind == Kind::Cbase => self.put_named(name),
            Some(parent) => {
                self.operand(parent, 15)?;
                self.put(".");
                self.put_named(name);
            }
        }
        Ok(())
    }

    pub(crate) fn on_casgn(&mut self, node: &'a Node<'a>) -> Result<(), Error> {
        let name = node.str_child(1).unwrap_or_default();
        match node.node_child(0) {
            None => {
                if self.state == State::Statement {
                    self.put("const ");
                }
                self.put_named(name);
            }
            Some(parent) if parent.kind == Kind::Cbase => {
                self.put_named(name);
            }
            Some(parent) => {
                self.operand(parent, 15)?;
                self.put(".");
                self.put_named(name);
            }
        }
        if let Some(value) = node.node_child(2) {
            self.put(" = ");
            self.expr(value)?;
        }
        Ok(())
    }

    pub(crate) fn on_lvasgn(&mut self, node: &'a Node<'a>) -> Result<(), Error> {
        let name = node.str_child(0).unwrap_or_default().to_string();
        self.declare_on_assign(&name);
        self.put_named(&name);
        if let Some(value) = node.node_child(1) {
            self.put(" = ");
            self.expr(value)?;
        }
        Ok(())
    }

    pub(crate) fn on_ivasgn(&mut self, node: &'a Node<'a>) -> Result<(), Error> {
        let name = node.str_child(0).unwrap_or_default();
        if self.options.ivars.contains_key(name) {
            return Err(Error::Config {
                message: format!("cannot assign to statically bound ivar {}", name),
            });
        }
        let reference = self.ivar_ref(name);
        self.put_named(&reference);
        if let Some(value) = node.node_child(1) {
            self.put(" = ");
            self.expr(value)?;
        }
        Ok(())
    }

    pub(crate) fn on_cvasgn(&mut self, node: &'a Node<'a>) -> Result<(), Error> {
        let name = node.str_child(0).unwrap_or_default();
        let reference = self.cvar_ref(name);
        self.put_named(&reference);
        if let Some(value) = node.node_child(1) {
            self.put(" = ");
            self.expr(value)?;
        }
        Ok(())
    }

    /// Emits an assignment target as an lvalue (also usable as the matching
    /// read, which `x = x || y` expansions rely on).
    pub(crate) fn emit_lvalue(&mut self, target: &'a Node<'a>) -> Result<(), Error> {
        match target.kind {
            Kind::Lvasgn | Kind::Lvar => {
                let name = target.str_child(0).unwrap_or_default();
                self.put(name);
                Ok(())
            }
            Kind::Ivasgn | Kind::Ivar => {
                let name = target.str_child(0).unwrap_or_default();
                let reference = self.ivar_ref(name);
                self.put(&reference);
                Ok(())
            }
            Kind::Cvasgn | Kind::Cvar => {
                let name = target.str_child(0).unwrap_or_default();
                let reference = self.cvar_ref(name);
                self.put(&reference);
                Ok(())
            }
            Kind::Gvasgn | Kind::Gvar => {
                let name = target.str_child(0).unwrap_or_default();
                self.put(name);
                Ok(())
            }
            Kind::Casgn => {
                let name = target.str_child(1).unwrap_or_default();
                match target.node_child(0) {
                    Some(parent) if parent.kind != Kind::Cbase => {
                        self.operand(parent, 15)?;
                        self.put(".");
                    }
                    _ => {}
                }
                self.put(name);
                Ok(())
            }
            kind if kind.is_send_family() => {
                let name = target.str_child(1).unwrap_or_default();
                let receiver = target
                    .node_child(0)
                    .ok_or_else(|| Error::unsupported("setter without receiver", target.loc))?;
                if name == "[]=" || name == "[]" {
                    self.operand(receiver, 15)?;
                    self.put("[");
                    if let Some(index) = target.node_child(2) {
                        self.expr(index)?;
                    }
                    self.put("]");
                } else {
                    self.operand(receiver, 15)?;
                    self.put(".");
                    self.put(name.trim_end_matches('='));
                }
                Ok(())
            }
            _ => Err(Error::unsupported("assignment target", target.loc)),
        }
    }

    pub(crate) fn on_op_asgn(&mut self, node: &'a Node<'a>) -> Result<(), Error> {
        let target = node
            .node_child(0)
            .ok_or_else(|| Error::unsupported("op-assign target", node.loc))?;
        let op = node.str_child(1).unwrap_or_default();
        let value = node
            .node_child(2)
            .ok_or_else(|| Error::unsupported("op-assign value", node.loc))?;

        if target.kind == Kind::Lvasgn {
            let name = target.str_child(0).unwrap_or_default();
            if self.var_state(name).is_none() {
                self.set_var(name, VarState::Implicit);
            }
        }

        if op == "**" && !self.es(2016) {
            // No exponent operator: expand through Math.pow.
            self.emit_lvalue(target)?;
            self.put(" = Math.pow(");
            self.emit_lvalue(target)?;
            self.put(", ");
            self.expr(value)?;
            self.put(")");
            return Ok(());
        }

        self.emit_lvalue(target)?;
        self.put(&format!(" {}= ", op));
        self.expr(value)?;
        Ok(())
    }

    pub(crate) fn on_or_asgn(&mut self, node: &'a Node<'a>) -> Result<(), Error> {
        self.logical_assign(node, true)
    }

    pub(crate) fn on_and_asgn(&mut self, node: &'a Node<'a>) -> Result<(), Error> {
        self.logical_assign(node, false)
    }

    fn logical_assign(&mut self, node: &'a Node<'a>, is_or: bool) -> Result<(), Error> {
        let target = node
            .node_child(0)
            .ok_or_else(|| Error::unsupported("logical assign target", node.loc))?;
        let value = node
            .node_child(1)
            .ok_or_else(|| Error::unsupported("logical assign value", node.loc))?;

        if self.truthy_mode() == Truthy::Ruby {
            let helper = if is_or { Helper::Ror } else { Helper::Rand };
            self.need_helper(helper);
            self.emit_lvalue(target)?;
            self.put(" = ");
            self.put(if is_or { "$ror(" } else { "$rand(" });
            self.emit_lvalue(target)?;
            self.put(", () => ");
            self.expr(value)?;
            self.put(")");
            return Ok(());
        }

        let nullish = is_or && self.or_mode() != OrMode::Logical && self.es(2020);
        let op = match (is_or, nullish) {
            (true, true) => "??",
            (true, false) => "||",
            (false, _) => "&&",
        };

        if self.es(2021) {
            self.emit_lvalue(target)?;
            self.put(&format!(" {}= ", op));
            self.expr(value)?;
        } else {
            self.emit_lvalue(target)?;
            self.put(" = ");
            self.emit_lvalue(target)?;
            self.put(&format!(" {} ", op));
            self.operand(value, 4)?;
        }
        Ok(())
    }

    /// `mlhs` in value position: a destructuring target list.
    pub(crate) fn on_mlhs(&mut self, node: &'a Node<'a>) -> Result<(), Error> {
        self.put("[");
        let targets: Vec<&'a Node<'a>> = node.child_nodes().collect();
        for (i, target) in targets.iter().enumerate() {
            if i > 0 {
                self.put(", ");
            }
            if target.kind == Kind::Splat {
                self.put("...");
                if let Some(inner) = target.node_child(0) {
                    self.emit_lvalue(inner)?;
                }
            } else if target.kind == Kind::Mlhs {
                self.on_mlhs(target)?;
            } else {
                self.emit_lvalue(target)?;
            }
        }
        self.put("]");
        Ok(())
    }

    /// Multiple assignment: a balanced all-local form destructures; a middle
    /// splat drains a temporary array with `shift`/`pop`.
    pub(crate) fn on_masgn(&mut self, node: &'a Node<'a>) -> Result<(), Error> {
        let mlhs = node
            .node_child(0)
            .ok_or_else(|| Error::unsupported("masgn targets", node.loc))?;
        let rhs = node
            .node_child(1)
            .ok_or_else(|| Error::unsupported("masgn value", node.loc))?;
        let targets: Vec<&'a Node<'a>> = mlhs.child_nodes().collect();

        let splat_at = targets.iter().position(|t| t.kind == Kind::Splat);
        let all_locals = targets.iter().all(|t| {
            t.kind == Kind::Lvasgn
                || (t.kind == Kind::Splat
                    && t.node_child(0).map(|n| n.kind) == Some(Kind::Lvasgn))
        });

        let destructurable = all_locals
            && match splat_at {
                None => true,
                Some(i) => i == targets.len() - 1,
            };

        if destructurable {
            let mut fresh = true;
            for target in &targets {
                let inner = if target.kind == Kind::Splat {
                    target.node_child(0)
                } else {
                    Some(*target)
                };
                if let Some(name) = inner.and_then(|n| n.str_child(0)) {
                    if self.var_state(name).is_some() {
                        fresh = false;
                    }
                }
            }
            if fresh && self.state == State::Statement {
                self.put("let ");
            }
            for target in &targets {
                let inner = if target.kind == Kind::Splat {
                    target.node_child(0)
                } else {
                    Some(*target)
                };
                if let Some(name) = inner.and_then(|n| n.str_child(0)) {
                    self.set_var(name, VarState::Masgn);
                }
            }
            self.put("[");
            for (i, target) in targets.iter().enumerate() {
                if i > 0 {
                    self.put(", ");
                }
                if target.kind == Kind::Splat {
                    self.put("...");
                    if let Some(inner) = target.node_child(0) {
                        self.put(inner.str_child(0).unwrap_or_default());
                    }
                } else {
                    self.put(target.str_child(0).unwrap_or_default());
                }
            }
            self.put("] = ");
            self.expr(rhs)?;
            return Ok(());
        }

        // Temporary-array drain: prefixes shift, postfixes pop (in reverse),
        // the splat keeps the remainder.
        let temp = "$masgn_temp";
        self.declare_on_assign(temp);
        self.put(temp);
        self.put(" = ");
        self.operand(rhs, 15)?;
        self.put(".slice()");

        let split = splat_at.unwrap_or(targets.len());
        for target in &targets[..split] {
            self.next_statement();
            self.emit_assign_head(target)?;
            self.put(&format!("{}.shift()", temp));
        }
        for target in targets[split..].iter().skip(1).rev() {
            self.next_statement();
            self.emit_assign_head(target)?;
            self.put(&format!("{}.pop()", temp));
        }
        if let Some(i) = splat_at {
            if let Some(inner) = targets[i].node_child(0) {
                self.next_statement();
                self.emit_assign_head(inner)?;
                self.put(temp);
            }
        }
        Ok(())
    }

    fn next_statement(&mut self) {
        self.put(";");
        if self.ser.vertical() {
            self.ser.newline();
        } else {
            self.put(" ");
        }
    }

    fn emit_assign_head(&mut self, target: &'a Node<'a>) -> Result<(), Error> {
        if target.kind == Kind::Lvasgn {
            let name = target.str_child(0).unwrap_or_default().to_string();
            self.declare_on_assign(&name);
            self.put_named(&name);
        } else {
            self.emit_lvalue(target)?;
        }
        self.put(" = ");
        Ok(())
    }

    pub(crate) fn on_defined(&mut self, node: &'a Node<'a>) -> Result<(), Error> {
        let operand = node
            .node_child(0)
            .ok_or_else(|| Error::unsupported("defined? without operand", node.loc))?;
        match operand.kind {
            Kind::Lvar => {
                let name = operand.str_child(0).unwrap_or_default();
                self.put(&format!("typeof {} !== \"undefined\"", name));
            }
            Kind::Ivar => {
                let reference = self.ivar_ref(operand.str_child(0).unwrap_or_default());
                self.put(&format!("{} !== undefined", reference));
            }
            Kind::Const => {
                let name = operand.str_child(1).unwrap_or_default();
                self.put(&format!("typeof {} !== \"undefined\"", name));
            }
            kind if kind.is_send_family() && operand.child(0).map(Value::is_nil) == Some(true) => {
                let name = operand.str_child(1).unwrap_or_default();
                self.put(&format!("typeof {} !== \"undefined\"", name));
            }
            _ => {
                return Err(Error::unsupported(
                    "defined? on this operand",
                    node.loc,
                ))
            }
        }
        Ok(())
    }

    /// `expr => pattern` destructures; `expr in pattern` is a predicate.
    pub(crate) fn on_match_pattern(&mut self, node: &'a Node<'a>) -> Result<(), Error> {
        let value = node
            .node_child(0)
            .ok_or_else(|| Error::unsupported("pattern match value", node.loc))?;
        let pattern = node
            .node_child(1)
            .ok_or_else(|| Error::unsupported("pattern match pattern", node.loc))?;

        if node.kind == Kind::MatchPatternP {
            let subject = "$match";
            self.declare_on_assign(subject);
            self.put(subject);
            self.put(" = ");
            self.expr(value)?;
            self.next_statement();
            let cond = self.pattern_condition_text(pattern, subject)?;
            self.put(&cond);
            return Ok(());
        }

        match pattern.kind {
            Kind::MatchVar => {
                let name = pattern.str_child(0).unwrap_or_default().to_string();
                self.declare_on_assign(&name);
                self.put_named(&name);
                self.put(" = ");
                self.expr(value)
            }
            Kind::ArrayPattern | Kind::HashPattern => {
                let all_vars = pattern
                    .child_nodes()
                    .all(|p| matches!(p.kind, Kind::MatchVar | Kind::Pair | Kind::MatchRest));
                if !all_vars {
                    return Err(Error::unsupported(
                        "destructuring pattern with non-variable elements",
                        node.loc,
                    ));
                }
                if self.state == State::Statement {
                    self.put("let ");
                }
                if pattern.kind == Kind::ArrayPattern {
                    self.put("[");
                    for (i, p) in pattern.child_nodes().enumerate() {
                        if i > 0 {
                            self.put(", ");
                        }
                        self.emit_pattern_binding_name(p);
                    }
                    self.put("]");
                } else {
                    self.put("{");
                    for (i, p) in pattern.child_nodes().enumerate() {
                        if i > 0 {
                            self.put(", ");
                        }
                        self.emit_pattern_binding_name(p);
                    }
                    self.put("}");
                }
                self.put(" = ");
                self.expr(value)
            }
            _ => Err(Error::unsupported("pattern in rightward assignment", node.loc)),
        }
    }

    pub(crate) fn emit_pattern_binding_name(&mut self, pattern: &'a Node<'a>) {
        match pattern.kind {
            Kind::MatchVar => {
                let name = pattern.str_child(0).unwrap_or_default().to_string();
                self.set_var(&name, VarState::Declared);
                self.put(&name);
            }
            Kind::MatchRest => {
                self.put("...");
                if let Some(inner) = pattern.node_child(0) {
                    self.emit_pattern_binding_name(inner);
                }
            }
            Kind::Pair => {
                let key = pattern
                    .node_child(0)
                    .and_then(|k| k.str_child(0))
                    .unwrap_or_default();
                match pattern.node_child(1) {
                    Some(v) if v.kind == Kind::MatchVar => {
                        let name = v.str_child(0).unwrap_or_default().to_string();
                        self.set_var(&name, VarState::Declared);
                        if name == key {
                            self.put(&name);
                        } else {
                            self.put(&format!("{}: {}", key, name));
                        }
                    }
                    _ => self.put(key),
                }
            }
            _ => {}
        }
    }
}

/// Renders a host-supplied JSON value as a JS literal (the `ivars` option).
pub(crate) fn json_to_js(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => "null".to_string(),
        serde_json::Value::Bool(b) => b.to_string(),
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::String(s) => {
            format!("\"{}\"", super::literals::escape_js(s, '"'))
        }
        serde_json::Value::Array(items) => {
            let inner: Vec<String> = items.iter().map(json_to_js).collect();
            format!("[{}]", inner.join(", "))
        }
        serde_json::Value::Object(map) => {
            let inner: Vec<String> = map
                .iter()
                .map(|(k, v)| {
                    if super::literals::is_js_identifier(k) {
                        format!("{}: {}", k, json_to_js(v))
                    } else {
                        format!("\"{}\": {}", super::literals::escape_js(k, '"'), json_to_js(v))
                    }
                })
                .collect();
            format!("{{{}}}", inner.join(", "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_literals_render_as_js() {
        assert_eq!(json_to_js(&serde_json::json!(null)), "null");
        assert_eq!(json_to_js(&serde_json::json!(3)), "3");
        assert_eq!(json_to_js(&serde_json::json!("hi")), "\"hi\"");
        assert_eq!(json_to_js(&serde_json::json!([1, 2])), "[1, 2]");
        assert_eq!(json_to_js(&serde_json::json!({"a": 1})), "{a: 1}");
    }
}
