//! Control flow: conditionals, case/when, case/in, loops, begin/rescue,
//! autoreturn.

use crate::ast::{Kind, Node, Value};
use crate::error::Error;

use super::literals::unwrap_begin;
use super::{Converter, State};

impl<'a, 'o> Converter<'a, 'o> {
    pub(crate) fn on_if(&mut self, node: &'a Node<'a>) -> Result<(), Error> {
        let cond = node
            .node_child(0)
            .ok_or_else(|| Error::unsupported("if without condition", node.loc))?;
        let then_branch = node.child(1).and_then(Value::as_node);
        let else_branch = node.child(2).and_then(Value::as_node);

        if self.state != State::Statement {
            // Conditional expression.
            self.condition(cond)?;
            self.put(" ? ");
            match then_branch {
                Some(then) => self.operand(then, 3)?,
                None => self.put("null"),
            }
            self.put(" : ");
            match else_branch {
                Some(alt) => self.operand(alt, 3)?,
                None => self.put("null"),
            }
            return Ok(());
        }

        // `unless`-style: no then arm.
        if then_branch.is_none() {
            if let Some(alt) = else_branch {
                self.put("if (!(");
                self.expr(cond)?;
                self.put("))");
                return self.brace_body(alt);
            }
            self.put("if (");
            self.condition(cond)?;
            self.put(") {}");
            return Ok(());
        }

        self.put("if (");
        self.condition(cond)?;
        self.put(")");
        self.brace_body(then_branch.expect("then"))?;

        if let Some(alt) = else_branch {
            if alt.kind == Kind::If && alt.child(1).and_then(Value::as_node).is_some() {
                // Chain else-if.
                self.put(" else ");
                return self.on_if(alt);
            }
            self.put(" else");
            self.brace_body(alt)?;
        }
        Ok(())
    }

    pub(crate) fn on_case(&mut self, node: &'a Node<'a>) -> Result<(), Error> {
        if self.state != State::Statement {
            self.put("(() => {");
            self.ser.newline();
            self.emit_case(node, true)?;
            self.ser.sput("})()");
            return Ok(());
        }
        self.emit_case(node, false)
    }

    pub(crate) fn emit_case(&mut self, node: &'a Node<'a>, returning: bool) -> Result<(), Error> {
        let scrutinee = node.child(0).and_then(Value::as_node);
        let arms: Vec<&'a Node<'a>> = node
            .child_nodes()
            .filter(|c| c.kind == Kind::When)
            .collect();
        let else_body = node
            .children
            .last()
            .and_then(Value::as_node)
            .filter(|n| n.kind != Kind::When);

        let plain_switch = scrutinee.is_some()
            && arms.iter().all(|arm| {
                arm.children[..arm.children.len() - 1]
                    .iter()
                    .filter_map(Value::as_node)
                    .all(is_static_pattern)
            });

        if plain_switch {
            self.put("switch (");
            self.expr(scrutinee.expect("scrutinee"))?;
            self.put(") {");
        } else {
            // Ranges, splats, regexps, or no scrutinee: test each arm.
            let subject = match scrutinee {
                Some(s) => Some(self.capture_text(|c| c.expr(s))?),
                None => None,
            };
            self.put("switch (true) {");
            return self.emit_tested_case(&arms, else_body, subject.as_deref(), returning);
        }

        for arm in &arms {
            let patterns: Vec<&'a Node<'a>> = arm.children[..arm.children.len() - 1]
                .iter()
                .filter_map(Value::as_node)
                .collect();
            let body = arm.children.last().and_then(Value::as_node);
            for pattern in patterns {
                self.ser.sput("case ");
                self.expr(pattern)?;
                self.put(":");
            }
            self.emit_case_arm(body, returning)?;
        }
        if let Some(body) = else_body {
            self.ser.sput("default:");
            self.emit_case_arm_body(body, returning, false)?;
        }
        self.ser.sput("}");
        Ok(())
    }

    fn emit_tested_case(
        &mut self,
        arms: &[&'a Node<'a>],
        else_body: Option<&'a Node<'a>>,
        subject: Option<&str>,
        returning: bool,
    ) -> Result<(), Error> {
        for arm in arms {
            let patterns: Vec<&'a Node<'a>> = arm.children[..arm.children.len() - 1]
                .iter()
                .filter_map(Value::as_node)
                .collect();
            let body = arm.children.last().and_then(Value::as_node);
            for pattern in patterns {
                self.ser.sput("case ");
                self.emit_when_test(pattern, subject)?;
                self.put(":");
            }
            self.emit_case_arm(body, returning)?;
        }
        if let Some(body) = else_body {
            self.ser.sput("default:");
            self.emit_case_arm_body(body, returning, false)?;
        }
        self.ser.sput("}");
        Ok(())
    }

    /// One `when` test against the captured scrutinee text.
    fn emit_when_test(
        &mut self,
        pattern: &'a Node<'a>,
        subject: Option<&str>,
    ) -> Result<(), Error> {
        let Some(subject) = subject else {
            // `case` without a scrutinee: each pattern is its own condition.
            return self.condition(pattern);
        };
        let pattern = unwrap_begin(pattern);
        match pattern.kind {
            Kind::Irange | Kind::Erange => {
                let begin = pattern.node_child(0);
                let end = pattern.node_child(1);
                match begin {
                    Some(b) => {
                        self.put(&format!("{} >= ", subject));
                        self.operand(b, 9)?;
                    }
                    None => self.put("true"),
                }
                if let Some(e) = end {
                    if begin.is_some() {
                        self.put(" && ");
                    }
                    self.put(subject);
                    self.put(if pattern.kind == Kind::Irange { " <= " } else { " < " });
                    self.operand(e, 9)?;
                }
                Ok(())
            }
            Kind::Splat => {
                let list = pattern
                    .node_child(0)
                    .ok_or_else(|| Error::unsupported("splat pattern", pattern.loc))?;
                self.operand(list, 15)?;
                self.put(&format!(".includes({})", subject));
                Ok(())
            }
            Kind::Regexp => {
                self.operand(pattern, 15)?;
                self.put(&format!(".test({})", subject));
                Ok(())
            }
            Kind::Const => {
                self.put(&format!("{} instanceof ", subject));
                self.expr(pattern)?;
                Ok(())
            }
            _ => {
                self.put(&format!("{} === ", subject));
                self.operand(pattern, 9)
            }
        }
    }

    fn emit_case_arm(
        &mut self,
        body: Option<&'a Node<'a>>,
        returning: bool,
    ) -> Result<(), Error> {
        match body {
            Some(body) => self.emit_case_arm_body(body, returning, true),
            None => {
                self.ser.newline();
                if !returning {
                    self.ser.puts("break;");
                }
                Ok(())
            }
        }
    }

    fn emit_case_arm_body(
        &mut self,
        body: &'a Node<'a>,
        returning: bool,
        breaks: bool,
    ) -> Result<(), Error> {
        self.ser.newline();
        if returning {
            self.emit_returned(body)?;
            self.terminate_returned(body);
            if !self.ser.current_line_blank() {
                self.ser.newline();
            }
            return Ok(());
        }
        let list = self.body_list(body);
        self.stmts(&list)?;
        let ends_control = list
            .last()
            .map(|last| matches!(last.kind, Kind::Return | Kind::Break | Kind::Next))
            .unwrap_or(false);
        if !self.ser.current_line_blank() {
            self.ser.newline();
        }
        if breaks && !ends_control {
            self.ser.puts("break;");
        }
        Ok(())
    }

    // ── case/in pattern matching ───────────────────────────────────────

    pub(crate) fn on_case_match(&mut self, node: &'a Node<'a>) -> Result<(), Error> {
        if self.state != State::Statement {
            self.put("(() => {");
            self.ser.newline();
            self.emit_case_match(node, true)?;
            self.ser.sput("})()");
            return Ok(());
        }
        self.emit_case_match(node, false)
    }

    fn emit_case_match(&mut self, node: &'a Node<'a>, returning: bool) -> Result<(), Error> {
        let scrutinee = node
            .node_child(0)
            .ok_or_else(|| Error::unsupported("case/in without value", node.loc))?;
        let arms: Vec<&'a Node<'a>> = node
            .child_nodes()
            .filter(|c| c.kind == Kind::InPattern)
            .collect();
        let else_body = node
            .children
            .last()
            .and_then(Value::as_node)
            .filter(|n| n.kind != Kind::InPattern);

        // Bind the subject once.
        let subject = "$cm".to_string();
        self.declare_on_assign(&subject);
        self.put(&subject);
        self.put(" = ");
        self.expr(scrutinee)?;
        self.put(";");
        self.ser.newline();

        for (i, arm) in arms.iter().enumerate() {
            let pattern = arm
                .node_child(0)
                .ok_or_else(|| Error::unsupported("in clause without pattern", arm.loc))?;
            let guard = arm.child(1).and_then(Value::as_node);
            let body = arm.child(2).and_then(Value::as_node);

            if i > 0 {
                self.put(" else ");
            }
            self.put("if (");
            let cond = self.pattern_condition_text(pattern, &subject)?;
            self.put(&cond);
            self.put(") {");
            self.ser.newline();

            let mut bindings = Vec::new();
            collect_pattern_bindings(pattern, &subject, &mut bindings);
            for (name, path) in &bindings {
                self.set_var(name, super::VarState::Declared);
                self.ser.puts(&format!("let {} = {};", name, path));
            }

            if let Some(guard) = guard {
                let inner = guard
                    .node_child(0)
                    .ok_or_else(|| Error::unsupported("guard", guard.loc))?;
                self.put("if (");
                if guard.kind == Kind::UnlessGuard {
                    self.put("!(");
                    self.expr(inner)?;
                    self.put(")");
                } else {
                    self.condition(inner)?;
                }
                self.put(") {");
                self.ser.newline();
            }

            if let Some(body) = body {
                if returning {
                    self.emit_returned(body)?;
                    self.terminate_returned(body);
                } else {
                    let list = self.body_list(body);
                    self.stmts(&list)?;
                }
            }
            if guard.is_some() {
                self.ser.sput("}");
            }
            self.ser.sput("}");
        }

        match else_body {
            Some(body) => {
                self.put(" else {");
                self.ser.newline();
                if returning {
                    self.emit_returned(body)?;
                    self.terminate_returned(body);
                } else {
                    let list = self.body_list(body);
                    self.stmts(&list)?;
                }
                self.ser.sput("}");
            }
            None => {
                self.put(" else {");
                self.ser.newline();
                self.ser
                    .puts("throw new Error(\"no matching pattern\");");
                self.ser.sput("}");
            }
        }
        Ok(())
    }

    /// Boolean test for a pattern against a subject path.
    pub(crate) fn pattern_condition_text(
        &mut self,
        pattern: &'a Node<'a>,
        subject: &str,
    ) -> Result<String, Error> {
        let pattern = unwrap_begin(pattern);
        match pattern.kind {
            Kind::MatchVar | Kind::MatchRest => Ok("true".to_string()),
            Kind::MatchNil => Ok(format!("{} === null", subject)),
            Kind::Int | Kind::Float | Kind::Str | Kind::Sym | Kind::True | Kind::False
            | Kind::Nil => {
                let lit = self.capture_text(|c| c.expr(pattern))?;
                Ok(format!("{} === {}", subject, lit))
            }
            Kind::Regexp => {
                let re = self.capture_text(|c| c.expr(pattern))?;
                Ok(format!("{}.test({})", re, subject))
            }
            Kind::Irange | Kind::Erange => {
                let begin = pattern.node_child(0);
                let end = pattern.node_child(1);
                let mut parts = Vec::new();
                if let Some(b) = begin {
                    let text = self.capture_text(|c| c.expr(b))?;
                    parts.push(format!("{} >= {}", subject, text));
                }
                if let Some(e) = end {
                    let cmp = if pattern.kind == Kind::Irange { "<=" } else { "<" };
                    let text = self.capture_text(|c| c.expr(e))?;
                    parts.push(format!("{} {} {}", subject, cmp, text));
                }
                Ok(parts.join(" && "))
            }
            Kind::Pin => {
                let inner = pattern
                    .node_child(0)
                    .ok_or_else(|| Error::unsupported("pin", pattern.loc))?;
                let text = self.capture_text(|c| c.expr(inner))?;
                Ok(format!("{} === {}", subject, text))
            }
            Kind::Const => {
                let text = self.capture_text(|c| c.expr(pattern))?;
                Ok(format!("{} instanceof {}", subject, text))
            }
            Kind::MatchAlt => {
                let mut parts = Vec::new();
                for alt in pattern.child_nodes() {
                    parts.push(format!("({})", self.pattern_condition_text(alt, subject)?));
                }
                Ok(parts.join(" || "))
            }
            Kind::MatchAs => {
                let inner = pattern
                    .node_child(0)
                    .ok_or_else(|| Error::unsupported("as pattern", pattern.loc))?;
                self.pattern_condition_text(inner, subject)
            }
            Kind::ArrayPattern => {
                let elements: Vec<&'a Node<'a>> = pattern.child_nodes().collect();
                let has_rest = elements.iter().any(|e| e.kind == Kind::MatchRest);
                let fixed = elements.iter().filter(|e| e.kind != Kind::MatchRest).count();
                let mut parts = vec![format!("Array.isArray({})", subject)];
                if has_rest {
                    parts.push(format!("{}.length >= {}", subject, fixed));
                } else {
                    parts.push(format!("{}.length === {}", subject, fixed));
                }
                for (i, element) in elements.iter().enumerate() {
                    if element.kind == Kind::MatchRest {
                        continue;
                    }
                    let path = format!("{}[{}]", subject, i);
                    let cond = self.pattern_condition_text(element, &path)?;
                    if cond != "true" {
                        parts.push(cond);
                    }
                }
                Ok(parts.join(" && "))
            }
            Kind::HashPattern => {
                let mut parts = vec![format!(
                    "typeof {} === \"object\" && {} !== null",
                    subject, subject
                )];
                for pair in pattern.child_nodes() {
                    if pair.kind != Kind::Pair {
                        continue;
                    }
                    let key = pair
                        .node_child(0)
                        .and_then(|k| k.str_child(0))
                        .unwrap_or_default();
                    parts.push(format!("\"{}\" in {}", key, subject));
                    if let Some(value) = pair.node_child(1) {
                        if value.kind != Kind::MatchVar {
                            let path = format!("{}.{}", subject, key);
                            let cond = self.pattern_condition_text(value, &path)?;
                            if cond != "true" {
                                parts.push(cond);
                            }
                        }
                    }
                }
                Ok(parts.join(" && "))
            }
            _ => Err(Error::unsupported("pattern form", pattern.loc)),
        }
    }

    // ── loops ──────────────────────────────────────────────────────────

    pub(crate) fn on_while(&mut self, node: &'a Node<'a>) -> Result<(), Error> {
        let cond = node
            .node_child(0)
            .ok_or_else(|| Error::unsupported("loop without condition", node.loc))?;
        let body = node.child(1).and_then(Value::as_node);

        self.put("while (");
        if node.kind == Kind::Until {
            self.put("!(");
            self.expr(cond)?;
            self.put(")");
        } else {
            self.condition(cond)?;
        }
        self.put(")");

        let Some(body) = body else {
            self.put(" {}");
            return Ok(());
        };

        if contains_redo(body) {
            // redo repeats the body without re-evaluating the loop
            // condition.
            self.put(" {");
            self.ser.newline();
            self.ser.puts("let redo$ = false;");
            self.put("do");
            self.brace_body(body)?;
            self.put(" while (redo$);");
            self.ser.sput("}");
            Ok(())
        } else {
            self.brace_body(body)
        }
    }

    pub(crate) fn on_while_post(&mut self, node: &'a Node<'a>) -> Result<(), Error> {
        let cond = node
            .node_child(0)
            .ok_or_else(|| Error::unsupported("loop without condition", node.loc))?;
        let body = node
            .child(1)
            .and_then(Value::as_node)
            .ok_or_else(|| Error::unsupported("post loop without body", node.loc))?;
        let body = if body.kind == Kind::Kwbegin {
            body.node_child(0).unwrap_or(body)
        } else {
            body
        };
        self.put("do");
        self.brace_body(body)?;
        self.put(" while (");
        if node.kind == Kind::UntilPost {
            self.put("!(");
            self.expr(cond)?;
            self.put(")");
        } else {
            self.condition(cond)?;
        }
        self.put(")");
        Ok(())
    }

    pub(crate) fn on_for(&mut self, node: &'a Node<'a>) -> Result<(), Error> {
        let var = node
            .node_child(0)
            .ok_or_else(|| Error::unsupported("for without variable", node.loc))?;
        let coll = node
            .node_child(1)
            .ok_or_else(|| Error::unsupported("for without collection", node.loc))?;
        let body = node
            .node_child(2)
            .ok_or_else(|| Error::unsupported("for without body", node.loc))?;

        let range = unwrap_begin(coll);
        if matches!(range.kind, Kind::Irange | Kind::Erange) && var.kind == Kind::Lvasgn {
            let name = var.str_child(0).unwrap_or_default().to_string();
            self.set_var(&name, super::VarState::Declared);
            return self.emit_counted_for(&name, range, None, body);
        }

        self.put("for (let ");
        match var.kind {
            Kind::Lvasgn => {
                let name = var.str_child(0).unwrap_or_default().to_string();
                self.set_var(&name, super::VarState::Declared);
                self.put(&name);
            }
            Kind::Mlhs => {
                self.put("[");
                let names: Vec<&str> = var
                    .child_nodes()
                    .filter_map(|t| t.str_child(0))
                    .collect();
                for (i, name) in names.iter().enumerate() {
                    if i > 0 {
                        self.put(", ");
                    }
                    self.set_var(name, super::VarState::Declared);
                    self.put(name);
                }
                self.put("]");
            }
            _ => return Err(Error::unsupported("for variable", node.loc)),
        }
        self.put(" of ");
        self.expr(coll)?;
        self.put(")");
        self.brace_body(body)
    }

    /// `(a..b).each`, `for x in a..b`, and `.step(k)` lower to a counted
    /// `for` statement.
    pub(crate) fn emit_counted_for(
        &mut self,
        name: &str,
        range: &'a Node<'a>,
        step: Option<&'a Node<'a>>,
        body: &'a Node<'a>,
    ) -> Result<(), Error> {
        let begin = range
            .node_child(0)
            .ok_or_else(|| Error::unsupported("counted loop over open range", range.loc))?;
        let end = range
            .node_child(1)
            .ok_or_else(|| Error::unsupported("counted loop over open range", range.loc))?;

        let negative_step = step
            .and_then(|s| match s.child(0) {
                Some(Value::Int(v)) if s.kind == Kind::Int => Some(*v < 0),
                _ => None,
            })
            .unwrap_or(false);

        self.put(&format!("for (let {} = ", name));
        self.expr(begin)?;
        self.put(&format!("; {} ", name));
        let cmp = match (range.kind == Kind::Irange, negative_step) {
            (true, false) => "<=",
            (false, false) => "<",
            (true, true) => ">=",
            (false, true) => ">",
        };
        self.put(cmp);
        self.put(" ");
        self.operand(end, 9)?;
        self.put("; ");
        match step {
            None => self.put(&format!("{}++", name)),
            Some(step) => {
                if let (Kind::Int, Some(Value::Int(v))) = (step.kind, step.child(0)) {
                    if *v == 1 {
                        self.put(&format!("{}++", name));
                    } else if *v == -1 {
                        self.put(&format!("{}--", name));
                    } else if *v < 0 {
                        self.put(&format!("{} -= {}", name, -v));
                    } else {
                        self.put(&format!("{} += {}", name, v));
                    }
                } else {
                    self.put(&format!("{} += ", name));
                    self.expr(step)?;
                }
            }
        }
        self.put(")");
        self.brace_body(body)
    }

    pub(crate) fn on_break(&mut self, node: &'a Node<'a>) -> Result<(), Error> {
        match node.node_child(0) {
            None => {
                self.put("break");
                Ok(())
            }
            Some(value) if self.break_value_allowed => {
                self.put("_loop_result = ");
                self.expr(value)?;
                self.put("; break");
                Ok(())
            }
            Some(_) => Err(Error::unsupported(
                "break with an argument outside loop-with-value",
                node.loc,
            )),
        }
    }

    pub(crate) fn on_return(&mut self, node: &'a Node<'a>) -> Result<(), Error> {
        self.put("return");
        if let Some(value) = node.node_child(0) {
            self.put(" ");
            self.expr(value)?;
        }
        Ok(())
    }

    // ── begin/rescue/ensure ────────────────────────────────────────────

    pub(crate) fn on_kwbegin(&mut self, node: &'a Node<'a>) -> Result<(), Error> {
        let Some(inner) = node.node_child(0) else {
            return Ok(());
        };
        if self.state != State::Statement {
            // Value position: wrap in an IIFE that returns the tail.
            self.put("(() => {");
            self.ser.newline();
            match inner.kind {
                Kind::Rescue | Kind::Ensure => self.emit_try(inner, true)?,
                _ => {
                    self.emit_returned(inner)?;
                    self.terminate_returned(inner);
                }
            }
            self.ser.sput("})()");
            return Ok(());
        }
        match inner.kind {
            Kind::Rescue | Kind::Ensure => self.emit_try(inner, false),
            _ => {
                let list = self.body_list(inner);
                self.stmts(&list)
            }
        }
    }

    pub(crate) fn on_kwbegin_inner(&mut self, node: &'a Node<'a>) -> Result<(), Error> {
        self.emit_try(node, false)
    }

    pub(crate) fn emit_try(&mut self, node: &'a Node<'a>, returning: bool) -> Result<(), Error> {
        // Decompose ensure(rescue(body, resbody..., else), ensure_body).
        let (guarded, ensure_body) = if node.kind == Kind::Ensure {
            (node.node_child(0), node.node_child(1))
        } else {
            (Some(node), None)
        };

        let (core, resbodies, else_body) = match guarded {
            Some(inner) if inner.kind == Kind::Rescue => {
                let core = inner.node_child(0);
                let resbodies: Vec<&'a Node<'a>> = inner
                    .child_nodes()
                    .filter(|c| c.kind == Kind::Resbody)
                    .collect();
                let else_body = inner
                    .children
                    .last()
                    .and_then(Value::as_node)
                    .filter(|n| n.kind != Kind::Resbody);
                (core, resbodies, else_body)
            }
            Some(inner) => (Some(inner), Vec::new(), None),
            None => (None, Vec::new(), None),
        };

        // A catch-all clause must come last.
        let catchall_at = resbodies
            .iter()
            .position(|r| r.child(0).map(Value::is_nil) == Some(true));
        if let Some(i) = catchall_at {
            if i + 1 != resbodies.len() {
                return Err(Error::unsupported(
                    "rescue clause after a catch-all rescue",
                    resbodies[i + 1].loc,
                ));
            }
        }

        let has_retry = resbodies.iter().any(|r| contains_retry(r));
        if has_retry {
            self.put("while (true) {");
            self.ser.newline();
            self.in_retry_rescue += 1;
        }

        let flagged = else_body.is_some();
        if flagged {
            self.declare_on_assign("$no_exception");
            self.put("$no_exception = false;");
            self.ser.newline();
        }

        self.put("try");
        self.put(" {");
        self.ser.newline();
        if let Some(core) = core {
            if returning && !flagged {
                self.emit_returned(core)?;
                self.terminate_returned(core);
            } else {
                let list = self.body_list(core);
                self.stmts(&list)?;
            }
        }
        if flagged {
            if !self.ser.current_line_blank() {
                self.ser.newline();
            }
            self.ser.puts("$no_exception = true;");
        }
        self.ser.sput("}");

        if !resbodies.is_empty() {
            self.emit_catches(&resbodies, returning)?;
        }

        if let Some(ensure_body) = ensure_body {
            self.put(" finally {");
            self.ser.newline();
            let list = self.body_list(ensure_body);
            self.stmts(&list)?;
            self.ser.sput("}");
        }

        if let Some(else_body) = else_body {
            if !self.ser.current_line_blank() {
                self.ser.newline();
            }
            self.put("if ($no_exception) {");
            self.ser.newline();
            if returning {
                self.emit_returned(else_body)?;
                self.terminate_returned(else_body);
            } else {
                let list = self.body_list(else_body);
                self.stmts(&list)?;
            }
            self.ser.sput("}");
        }

        if has_retry {
            self.in_retry_rescue -= 1;
            if !self.ser.current_line_blank() {
                self.ser.newline();
            }
            self.ser.puts("break;");
            self.ser.sput("}");
        }
        Ok(())
    }

    fn emit_catches(
        &mut self,
        resbodies: &[&'a Node<'a>],
        returning: bool,
    ) -> Result<(), Error> {
        let single_catchall = resbodies.len() == 1
            && resbodies[0].child(0).map(Value::is_nil) == Some(true);

        if single_catchall {
            let var = resbody_var(resbodies[0]).unwrap_or_else(|| "$err".to_string());
            self.put(&format!(" catch ({}) {{", var));
            self.ser.newline();
            self.rescue_vars.push(var);
            if let Some(body) = resbodies[0].child(2).and_then(Value::as_node) {
                if returning {
                    self.emit_returned(body)?;
                    self.terminate_returned(body);
                } else {
                    let list = self.body_list(body);
                    self.stmts(&list)?;
                }
            }
            self.rescue_vars.pop();
            self.ser.sput("}");
            return Ok(());
        }

        self.put(" catch ($err) {");
        self.ser.newline();
        self.rescue_vars.push("$err".to_string());
        let mut has_catchall = false;
        for (i, resbody) in resbodies.iter().enumerate() {
            let exceptions = resbody.child(0).and_then(Value::as_node);
            match exceptions {
                Some(list) => {
                    if i > 0 {
                        self.put(" else ");
                    }
                    self.put("if (");
                    let classes: Vec<&'a Node<'a>> = list.child_nodes().collect();
                    for (j, class) in classes.iter().enumerate() {
                        if j > 0 {
                            self.put(" || ");
                        }
                        self.put("$err instanceof ");
                        self.expr(class)?;
                    }
                    self.put(") {");
                    self.ser.newline();
                }
                None => {
                    has_catchall = true;
                    if i > 0 {
                        self.put(" else {");
                    } else {
                        self.put("{");
                    }
                    self.ser.newline();
                }
            }
            if let Some(var) = resbody_var(resbody) {
                self.set_var(&var, super::VarState::Declared);
                self.ser.puts(&format!("let {} = $err;", var));
                self.rescue_vars.push(var);
            }
            if let Some(body) = resbody.child(2).and_then(Value::as_node) {
                if returning {
                    self.emit_returned(body)?;
                    self.terminate_returned(body);
                } else {
                    let list = self.body_list(body);
                    self.stmts(&list)?;
                }
            }
            if resbody_var(resbody).is_some() {
                self.rescue_vars.pop();
            }
            self.ser.sput("}");
        }
        if !has_catchall {
            self.put(" else {");
            self.ser.newline();
            self.ser.puts("throw $err;");
            self.ser.sput("}");
        }
        self.rescue_vars.pop();
        self.ser.sput("}");
        Ok(())
    }

    // ── autoreturn ─────────────────────────────────────────────────────

    pub(crate) fn on_autoreturn(&mut self, node: &'a Node<'a>) -> Result<(), Error> {
        let Some(inner) = node.node_child(0) else {
            return Ok(());
        };
        self.emit_returned(inner)?;
        self.terminate_returned(inner);
        Ok(())
    }

    /// Emits a tail position so its value is returned: sequences return
    /// their last statement, conditionals return per arm, everything else
    /// gets a `return` prefix.
    pub(crate) fn emit_returned(&mut self, node: &'a Node<'a>) -> Result<(), Error> {
        match node.kind {
            Kind::Begin => {
                let list = self.body_list(node);
                match list.split_last() {
                    Some((last, init)) => {
                        self.stmts(init)?;
                        if !init.is_empty() && !self.ser.current_line_blank() {
                            self.ser.newline();
                        }
                        self.emit_returned(last)?;
                        self.terminate_returned(last);
                        Ok(())
                    }
                    None => Ok(()),
                }
            }
            Kind::If => {
                let cond = node
                    .node_child(0)
                    .ok_or_else(|| Error::unsupported("if without condition", node.loc))?;
                let then_branch = node.child(1).and_then(Value::as_node);
                let else_branch = node.child(2).and_then(Value::as_node);
                self.put("if (");
                self.condition(cond)?;
                self.put(") {");
                self.ser.newline();
                if let Some(then) = then_branch {
                    self.emit_returned(then)?;
                    self.terminate_returned(then);
                }
                self.ser.sput("}");
                if let Some(alt) = else_branch {
                    self.put(" else {");
                    self.ser.newline();
                    self.emit_returned(alt)?;
                    self.terminate_returned(alt);
                    self.ser.sput("}");
                }
                Ok(())
            }
            Kind::Case => self.emit_case(node, true),
            Kind::CaseMatch => self.emit_case_match(node, true),
            Kind::Kwbegin => match node.node_child(0) {
                Some(inner) if matches!(inner.kind, Kind::Rescue | Kind::Ensure) => {
                    self.emit_try(inner, true)
                }
                Some(inner) => self.emit_returned(inner),
                None => Ok(()),
            },
            Kind::Return
            | Kind::Break
            | Kind::Next
            | Kind::Redo
            | Kind::Retry
            | Kind::While
            | Kind::Until
            | Kind::WhilePost
            | Kind::UntilPost
            | Kind::For
            | Kind::Class
            | Kind::Module
            | Kind::Def
            | Kind::Defs
            | Kind::Import
            | Kind::Export
            | Kind::NoOp => self.stmt(node),
            _ => {
                self.put("return ");
                self.expr(node)
            }
        }
    }

    /// Terminator for a returned tail: plain expressions got a `return` and
    /// need `;`, brace-ended forms do not.
    pub(crate) fn terminate_returned(&mut self, node: &'a Node<'a>) {
        let braced = matches!(
            node.kind,
            Kind::If
                | Kind::Case
                | Kind::CaseMatch
                | Kind::Kwbegin
                | Kind::While
                | Kind::Until
                | Kind::WhilePost
                | Kind::UntilPost
                | Kind::For
                | Kind::Class
                | Kind::Module
                | Kind::Def
                | Kind::Defs
                | Kind::Begin
                | Kind::NoOp
        );
        if !braced && !self.ser.current_line_blank() {
            self.put(";");
        }
    }
}

/// Names a pattern binds, paired with the access path that reaches each one
/// from the subject.
fn collect_pattern_bindings(pattern: &Node, subject: &str, out: &mut Vec<(String, String)>) {
    match pattern.kind {
        Kind::MatchVar => {
            if let Some(name) = pattern.str_child(0) {
                out.push((name.to_string(), subject.to_string()));
            }
        }
        Kind::MatchAs => {
            if let Some(inner) = pattern.node_child(0) {
                collect_pattern_bindings(inner, subject, out);
            }
            if let Some(var) = pattern.node_child(1) {
                collect_pattern_bindings(var, subject, out);
            }
        }
        Kind::ArrayPattern | Kind::FindPattern => {
            for (i, element) in pattern.child_nodes().enumerate() {
                if element.kind == Kind::MatchRest {
                    if let Some(var) = element.node_child(0) {
                        collect_pattern_bindings(
                            var,
                            &format!("{}.slice({})", subject, i),
                            out,
                        );
                    }
                    continue;
                }
                collect_pattern_bindings(element, &format!("{}[{}]", subject, i), out);
            }
        }
        Kind::HashPattern => {
            for pair in pattern.child_nodes() {
                match pair.kind {
                    Kind::Pair => {
                        let key = pair
                            .node_child(0)
                            .and_then(|k| k.str_child(0))
                            .unwrap_or_default();
                        if let Some(value) = pair.node_child(1) {
                            collect_pattern_bindings(
                                value,
                                &format!("{}.{}", subject, key),
                                out,
                            );
                        }
                    }
                    Kind::MatchRest => {}
                    _ => {}
                }
            }
        }
        _ => {}
    }
}

fn resbody_var(resbody: &Node) -> Option<String> {
    resbody
        .child(1)
        .and_then(Value::as_node)
        .and_then(|v| v.str_child(0))
        .map(|s| s.to_string())
}

fn is_static_pattern(node: &Node) -> bool {
    matches!(
        node.kind,
        Kind::Int | Kind::Float | Kind::Str | Kind::Sym | Kind::True | Kind::False | Kind::Nil
    )
}

/// Does this body contain a `redo` belonging to the current loop?
fn contains_redo(node: &Node) -> bool {
    if node.kind == Kind::Redo {
        return true;
    }
    if matches!(
        node.kind,
        Kind::While | Kind::Until | Kind::WhilePost | Kind::UntilPost | Kind::For | Kind::Block
    ) {
        return false;
    }
    node.child_nodes().any(contains_redo)
}

fn contains_retry(node: &Node) -> bool {
    if node.kind == Kind::Retry {
        return true;
    }
    if matches!(node.kind, Kind::Kwbegin | Kind::Block | Kind::Def | Kind::Defs) {
        return false;
    }
    node.child_nodes().any(contains_retry)
}
