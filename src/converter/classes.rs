//! Class, module, and singleton-class lowering.
//!
//! Class bodies are classified member by member before any text is emitted:
//! ordinary defs become methods, `def self.x` statics, no-paren defs
//! getters, `name=` defs setters, `attr_*` property pairs, `include`
//! prototype copies, `alias` post-class assignments. Private-field analysis
//! collects every instance variable so ES2022 targets declare `#name`
//! fields, hoisting argument-independent constructor assignments.

use std::collections::HashSet;

use crate::ast::{s, Kind, Node, Value};
use crate::error::Error;

use super::{ClassCtx, Converter, State};

enum Member<'a> {
    Constructor(&'a Node<'a>),
    Method {
        def: &'a Node<'a>,
        name: String,
        is_static: bool,
        private: bool,
        getter: bool,
        setter: bool,
        is_async: bool,
    },
    Accessor {
        name: String,
        reader: bool,
        writer: bool,
    },
    Const {
        name: String,
        value: &'a Node<'a>,
    },
    Cvar {
        name: String,
        value: &'a Node<'a>,
    },
    Include(&'a Node<'a>),
    Alias {
        new: String,
        old: String,
    },
    Undef(String),
    Nested(&'a Node<'a>),
}

impl<'a, 'o> Converter<'a, 'o> {
    pub(crate) fn on_class(&mut self, node: &'a Node<'a>) -> Result<(), Error> {
        let name_node = node
            .node_child(0)
            .ok_or_else(|| Error::unsupported("class without name", node.loc))?;
        let superclass = node.child(1).and_then(Value::as_node);
        let body = node
            .node_child(2)
            .ok_or_else(|| Error::unsupported("class without body", node.loc))?;
        let path = const_path(name_node);
        self.emit_class(&path, superclass, body, node)
    }

    /// Anonymous class expression (`Class.new(parent) do ... end`, nested
    /// classes).
    pub(crate) fn emit_class_literal(
        &mut self,
        name: Option<&str>,
        superclass: Option<&'a Node<'a>>,
        body: &'a Node<'a>,
    ) -> Result<(), Error> {
        let members = self.classify_members(body)?;
        if members.iter().any(|m| {
            matches!(
                m,
                Member::Include(_) | Member::Alias { .. } | Member::Undef(_) | Member::Nested(_)
            )
        }) {
            return Err(Error::unsupported(
                "include/alias in an inline class literal",
                body.loc,
            ));
        }
        let scope_name = name.unwrap_or("").to_string();
        self.emit_class_head(name, superclass)?;
        self.emit_class_members(&scope_name, &members, body)?;
        Ok(())
    }

    fn emit_class(
        &mut self,
        path: &str,
        superclass: Option<&'a Node<'a>>,
        body: &'a Node<'a>,
        node: &'a Node<'a>,
    ) -> Result<(), Error> {
        if self.state != State::Statement {
            return self.emit_class_literal(path_tail(path), superclass, body);
        }

        let prior = self.namespace.enter(path);
        let _ = prior; // reopening accumulates via define_prop below
        let members = self.classify_members(body)?;
        let has_method_missing = members.iter().any(
            |m| matches!(m, Member::Method { name, .. } if name == "method_missing"),
        );

        // Register visible members before bodies are emitted so call sites
        // inside methods resolve.
        for member in &members {
            match member {
                Member::Method {
                    name,
                    is_static: false,
                    private,
                    setter,
                    ..
                } => {
                    let descriptor = if *private {
                        s(self.arena, Kind::PrivateMethod, &[])
                    } else if *setter {
                        s(self.arena, Kind::Setter, &[])
                    } else {
                        s(self.arena, Kind::Self_, &[])
                    };
                    let key = if *setter {
                        format!("{}=", name)
                    } else {
                        name.clone()
                    };
                    self.namespace.define_prop(&key, descriptor);
                }
                Member::Accessor { name, .. } => {
                    self.namespace
                        .define_prop(name, s(self.arena, Kind::Self_, &[]));
                }
                _ => {}
            }
        }

        let local_name = path_tail(path).unwrap_or(path).to_string();
        let parented = path.contains("::");
        let emitted_name = if has_method_missing {
            format!("{}$", local_name)
        } else {
            local_name.clone()
        };

        if parented {
            let parent = &path[..path.rfind("::").expect("parented")].replace("::", ".");
            self.put(&format!("{}.{} = ", parent, emitted_name));
            self.emit_class_head(None, superclass)?;
        } else if has_method_missing {
            self.put("class ");
            self.put_named(&emitted_name);
            self.emit_class_extends(superclass)?;
        } else {
            self.put("class ");
            self.put_named(&local_name);
            self.emit_class_extends(superclass)?;
        }

        self.emit_class_members(&emitted_name, &members, body)?;
        if parented {
            self.put(";");
        }

        // Post-class statements: mixins, aliases, deferred statics.
        let target = if parented {
            format!(
                "{}.{}",
                &path[..path.rfind("::").expect("parented")].replace("::", "."),
                emitted_name
            )
        } else {
            emitted_name.clone()
        };
        for member in &members {
            match member {
                Member::Include(module) => {
                    if !self.ser.current_line_blank() {
                        self.ser.newline();
                    }
                    self.put(&format!("Object.assign({}.prototype, ", target));
                    self.expr(module)?;
                    self.put(");");
                }
                Member::Alias { new, old } => {
                    if !self.ser.current_line_blank() {
                        self.ser.newline();
                    }
                    self.put(&format!(
                        "{}.prototype.{} = {}.prototype.{};",
                        target, new, target, old
                    ));
                }
                Member::Undef(name) => {
                    if !self.ser.current_line_blank() {
                        self.ser.newline();
                    }
                    self.put(&format!("delete {}.prototype.{};", target, name));
                }
                Member::Const { name, value } if !self.es(2022) => {
                    if !self.ser.current_line_blank() {
                        self.ser.newline();
                    }
                    self.put(&format!("{}.{} = ", target, name));
                    self.expr(value)?;
                    self.put(";");
                }
                Member::Cvar { name, value } if !self.es(2022) => {
                    if !self.ser.current_line_blank() {
                        self.ser.newline();
                    }
                    self.put(&format!("{}._{} = ", target, name.trim_start_matches('@')));
                    self.expr(value)?;
                    self.put(";");
                }
                Member::Nested(nested) => {
                    if !self.ser.current_line_blank() {
                        self.ser.newline();
                    }
                    let nested_name = nested
                        .node_child(0)
                        .map(const_path)
                        .unwrap_or_default();
                    self.put(&format!("{}.{} = ", target, nested_name));
                    match nested.kind {
                        Kind::Class => {
                            let nested_super = nested.child(1).and_then(Value::as_node);
                            let nested_body = nested.node_child(2).ok_or_else(|| {
                                Error::unsupported("nested class body", nested.loc)
                            })?;
                            let entered = self.namespace.enter(&nested_name);
                            let _ = entered;
                            self.emit_class_literal(
                                Some(&nested_name),
                                nested_super,
                                nested_body,
                            )?;
                            self.namespace.leave(&nested_name);
                        }
                        _ => {
                            let nested_body = nested.node_child(1).ok_or_else(|| {
                                Error::unsupported("nested module body", nested.loc)
                            })?;
                            self.emit_module_literal(&nested_name, nested_body)?;
                        }
                    }
                    self.put(";");
                }
                _ => {}
            }
        }

        if has_method_missing {
            // A Proxy factory stands in for the class, forwarding unknown
            // properties to method_missing.
            if !self.ser.current_line_blank() {
                self.ser.newline();
            }
            self.ser.puts(&format!("let {} = function(...args) {{", local_name));
            self.ser
                .puts(&format!("return new Proxy(new {}(...args), {{", emitted_name));
            self.ser.puts("get(obj, prop) {");
            self.ser.puts("if (prop in obj) return obj[prop];");
            self.ser.puts("return obj.method_missing(prop)");
            self.ser.puts("}");
            self.ser.puts("})");
            self.ser.put("};");
        }

        self.namespace.leave(path);
        Ok(())
    }

    fn emit_class_head(
        &mut self,
        name: Option<&str>,
        superclass: Option<&'a Node<'a>>,
    ) -> Result<(), Error> {
        self.put("class");
        if let Some(name) = name {
            self.put(" ");
            self.put_named(name);
        }
        self.emit_class_extends(superclass)
    }

    fn emit_class_extends(&mut self, superclass: Option<&'a Node<'a>>) -> Result<(), Error> {
        if let Some(parent) = superclass {
            self.put(" extends ");
            self.operand(parent, 15)?;
        }
        Ok(())
    }

    fn emit_class_members(
        &mut self,
        class_name: &str,
        members: &[Member<'a>],
        body: &'a Node<'a>,
    ) -> Result<(), Error> {
        let hash_privates = self.es(2022) && !self.underscored_private();

        let mut privates: HashSet<String> = HashSet::new();
        if hash_privates {
            collect_ivar_names(body, &mut privates);
            for member in members {
                if let Member::Accessor { name, .. } = member {
                    privates.insert(name.clone());
                }
            }
        }

        self.class_stack.push(ClassCtx {
            name: class_name.to_string(),
            privates: privates.clone(),
            hash_privates,
        });

        self.put(" {");
        self.ser.newline();

        // Field declarations, with argument-independent constructor
        // assignments hoisted into initialisers.
        let ctor = members.iter().find_map(|m| match m {
            Member::Constructor(def) => Some(*def),
            _ => None,
        });
        let mut hoisted: Vec<(String, &'a Node<'a>)> = Vec::new();
        let mut hoisted_names: HashSet<String> = HashSet::new();
        if hash_privates {
            if let Some(def) = ctor {
                if let Some(ctor_body) = def.node_child(2) {
                    for stmt in self.body_list(ctor_body) {
                        if stmt.kind == Kind::Ivasgn {
                            if let (Some(name), Some(value)) =
                                (stmt.str_child(0), stmt.node_child(1))
                            {
                                if is_static_literal(value) {
                                    let bare = name.trim_start_matches('@').to_string();
                                    hoisted_names.insert(bare.clone());
                                    hoisted.push((bare, value));
                                }
                            }
                        }
                    }
                }
            }

            let mut names: Vec<&String> = privates.iter().collect();
            names.sort();
            for name in names {
                match hoisted.iter().find(|(n, _)| n == name) {
                    Some((_, value)) => {
                        self.put(&format!("#{} = ", name));
                        self.expr(value)?;
                        self.ser.puts(";");
                    }
                    None => self.ser.puts(&format!("#{};", name)),
                }
            }
        }

        for member in members {
            match member {
                Member::Constructor(def) => {
                    let args = def
                        .node_child(1)
                        .ok_or_else(|| Error::unsupported("constructor args", def.loc))?;
                    let ctor_body = def
                        .node_child(2)
                        .ok_or_else(|| Error::unsupported("constructor body", def.loc))?;
                    let remaining: Vec<&'a Node<'a>> = self
                        .body_list(ctor_body)
                        .into_iter()
                        .filter(|stmt| {
                            !(stmt.kind == Kind::Ivasgn
                                && stmt
                                    .str_child(0)
                                    .map(|n| {
                                        hoisted_names.contains(n.trim_start_matches('@'))
                                    })
                                    .unwrap_or(false))
                        })
                        .collect();
                    if remaining.is_empty() && args.children.is_empty() {
                        continue;
                    }
                    self.sput_member();
                    self.put("constructor");
                    let body_node = if remaining.len() == self.body_list(ctor_body).len() {
                        ctor_body
                    } else {
                        let values: Vec<Value<'a>> =
                            remaining.iter().map(|n| Value::Node(n)).collect();
                        s(self.arena, Kind::Begin, &values)
                    };
                    self.emit_function_tail("initialize", args, body_node, false)?;
                }
                Member::Method {
                    def,
                    name,
                    is_static,
                    private,
                    getter,
                    setter,
                    is_async,
                } => {
                    let (args_idx, body_idx) =
                        if def.kind == Kind::Defs { (2, 3) } else { (1, 2) };
                    let args = def
                        .node_child(args_idx)
                        .ok_or_else(|| Error::unsupported("method args", def.loc))?;
                    let method_body = def
                        .node_child(body_idx)
                        .ok_or_else(|| Error::unsupported("method body", def.loc))?;

                    self.sput_member();
                    if *is_static {
                        self.put("static ");
                    }
                    if *is_async {
                        self.put("async ");
                    }
                    if *getter {
                        self.put("get ");
                    }
                    if *setter {
                        self.put("set ");
                    }
                    let emitted = if *private {
                        format!(
                            "{}{}",
                            if hash_privates { "#" } else { "_" },
                            name
                        )
                    } else {
                        name.clone()
                    };
                    self.put_named(&emitted);
                    let endless = !def.loc.map(|l| l.has_end).unwrap_or(true);
                    self.emit_function_tail(name, args, method_body, *getter || endless)?;
                }
                Member::Accessor { name, reader, writer } => {
                    let field = if hash_privates {
                        format!("this.#{}", name)
                    } else {
                        format!("this._{}", name)
                    };
                    if *reader {
                        self.sput_member();
                        self.put(&format!("get {}() {{", name));
                        self.ser.newline();
                        self.ser.puts(&format!("return {}", field));
                        self.ser.sput("}");
                    }
                    if *writer {
                        self.sput_member();
                        self.put(&format!("set {}({}) {{", name, name));
                        self.ser.newline();
                        self.ser.puts(&format!("{} = {}", field, name));
                        self.ser.sput("}");
                    }
                }
                Member::Const { name, value } if self.es(2022) => {
                    self.sput_member();
                    self.put(&format!("static {} = ", name));
                    self.expr(value)?;
                    self.put(";");
                }
                Member::Cvar { name, value } if self.es(2022) => {
                    self.sput_member();
                    let bare = name.trim_start_matches('@');
                    if hash_privates {
                        self.put(&format!("static #{} = ", bare));
                    } else {
                        self.put(&format!("static _{} = ", bare));
                    }
                    self.expr(value)?;
                    self.put(";");
                }
                _ => {}
            }
        }

        self.ser.sput("}");
        self.class_stack.pop();
        Ok(())
    }

    fn sput_member(&mut self) {
        if !self.ser.current_line_blank() {
            self.ser.newline();
        }
    }

    /// Buckets each class-body statement into one of the member shapes.
    fn classify_members(&mut self, body: &'a Node<'a>) -> Result<Vec<Member<'a>>, Error> {
        let mut members: Vec<Member<'a>> = Vec::new();
        let mut private_mode = false;
        let mut late_private: HashSet<String> = HashSet::new();

        let statements = self.body_list(body);
        for stmt in statements {
            self.classify_statement(
                stmt,
                false,
                &mut private_mode,
                &mut late_private,
                &mut members,
            )?;
        }

        // `private :name` after the definition adjusts the earlier member.
        if !late_private.is_empty() {
            for member in &mut members {
                if let Member::Method { name, private, .. } = member {
                    if late_private.contains(name) {
                        *private = true;
                    }
                }
            }
        }
        Ok(members)
    }

    fn classify_statement(
        &mut self,
        stmt: &'a Node<'a>,
        force_static: bool,
        private_mode: &mut bool,
        late_private: &mut HashSet<String>,
        members: &mut Vec<Member<'a>>,
    ) -> Result<(), Error> {
        match stmt.kind {
            Kind::Def | Kind::Defs => {
                self.classify_def(stmt, force_static, *private_mode, false, members)
            }
            Kind::Casgn => {
                let name = stmt.str_child(1).unwrap_or_default().to_string();
                let value = stmt
                    .node_child(2)
                    .ok_or_else(|| Error::unsupported("class constant", stmt.loc))?;
                members.push(Member::Const { name, value });
                Ok(())
            }
            Kind::Cvasgn => {
                let name = stmt.str_child(0).unwrap_or_default().to_string();
                let value = stmt
                    .node_child(1)
                    .ok_or_else(|| Error::unsupported("class variable", stmt.loc))?;
                members.push(Member::Cvar { name, value });
                Ok(())
            }
            Kind::Alias => {
                let new = alias_name(stmt.node_child(0));
                let old = alias_name(stmt.node_child(1));
                members.push(Member::Alias { new, old });
                Ok(())
            }
            Kind::Undef => {
                for target in stmt.child_nodes() {
                    members.push(Member::Undef(alias_name(Some(target))));
                }
                Ok(())
            }
            Kind::Class | Kind::Module => {
                members.push(Member::Nested(stmt));
                Ok(())
            }
            Kind::Sclass => {
                // class << self: members become statics.
                let sclass_body = stmt
                    .node_child(1)
                    .ok_or_else(|| Error::unsupported("singleton class body", stmt.loc))?;
                let inner = self.body_list(sclass_body);
                for stmt in inner {
                    self.classify_statement(stmt, true, private_mode, late_private, members)?;
                }
                Ok(())
            }
            Kind::Begin => {
                let inner = self.body_list(stmt);
                for stmt in inner {
                    self.classify_statement(
                        stmt,
                        force_static,
                        private_mode,
                        late_private,
                        members,
                    )?;
                }
                Ok(())
            }
            kind if kind.is_send_family() => {
                let name = stmt.str_child(1).unwrap_or_default();
                let args: Vec<&'a Node<'a>> = stmt.children[2..]
                    .iter()
                    .filter_map(Value::as_node)
                    .collect();
                match name {
                    "attr_accessor" | "attr_reader" | "attr_writer" => {
                        for arg in args {
                            let attr = arg.str_child(0).unwrap_or_default().to_string();
                            members.push(Member::Accessor {
                                name: attr,
                                reader: name != "attr_writer",
                                writer: name != "attr_reader",
                            });
                        }
                        Ok(())
                    }
                    "include" => {
                        for arg in args {
                            members.push(Member::Include(arg));
                        }
                        Ok(())
                    }
                    "private" | "public" | "protected" => {
                        if args.is_empty() {
                            *private_mode = name != "public";
                            return Ok(());
                        }
                        for arg in &args {
                            match arg.kind {
                                Kind::Sym => {
                                    late_private
                                        .insert(arg.str_child(0).unwrap_or_default().to_string());
                                }
                                Kind::Def | Kind::Defs => {
                                    self.classify_def(arg, force_static, true, false, members)?;
                                }
                                _ => {
                                    return Err(Error::unsupported(
                                        "visibility modifier argument",
                                        arg.loc,
                                    ))
                                }
                            }
                        }
                        Ok(())
                    }
                    "async" => {
                        for arg in &args {
                            if matches!(arg.kind, Kind::Def | Kind::Defs) {
                                self.classify_def(
                                    arg,
                                    force_static,
                                    *private_mode,
                                    true,
                                    members,
                                )?;
                            }
                        }
                        Ok(())
                    }
                    _ => Err(Error::unsupported(
                        format!("class body call {}", name),
                        stmt.loc,
                    )),
                }
            }
            Kind::NoOp => Ok(()),
            _ => Err(Error::unsupported(
                "non-classifiable class body statement",
                stmt.loc,
            )),
        }
    }

    fn classify_def(
        &mut self,
        def: &'a Node<'a>,
        force_static: bool,
        private: bool,
        is_async: bool,
        members: &mut Vec<Member<'a>>,
    ) -> Result<(), Error> {
        let is_static = force_static
            || (def.kind == Kind::Defs
                && def.node_child(0).map(|r| r.kind) == Some(Kind::Self_));
        let name_idx = if def.kind == Kind::Defs { 1 } else { 0 };
        let name = def.str_child(name_idx).unwrap_or_default().to_string();

        if super::blocks::is_operator_name(&name) {
            return Err(Error::semantic(
                format!("operator method definition {} requires a filter rewrite", name),
                def.loc,
            ));
        }

        if name == "initialize" && !is_static {
            members.push(Member::Constructor(def));
            return Ok(());
        }
        if name == "method_missing" {
            members.push(Member::Method {
                def,
                name,
                is_static: false,
                private: false,
                getter: false,
                setter: false,
                is_async,
            });
            return Ok(());
        }

        if let Some(prop) = name.strip_suffix('=') {
            members.push(Member::Method {
                def,
                name: prop.to_string(),
                is_static,
                private,
                getter: false,
                setter: true,
                is_async,
            });
            return Ok(());
        }

        let body = def.node_child(name_idx + 2);
        let getter = !def.is_method(self.sources)
            && body.map(getter_shaped).unwrap_or(false);
        members.push(Member::Method {
            def,
            name,
            is_static,
            private,
            getter,
            setter: false,
            is_async,
        });
        Ok(())
    }

    // ── modules ────────────────────────────────────────────────────────

    /// Modules emit as an object literal bound to a constant.
    pub(crate) fn on_module(&mut self, node: &'a Node<'a>) -> Result<(), Error> {
        let name_node = node
            .node_child(0)
            .ok_or_else(|| Error::unsupported("module without name", node.loc))?;
        let body = node
            .node_child(1)
            .ok_or_else(|| Error::unsupported("module without body", node.loc))?;
        let path = const_path(name_node);

        let entered = self.namespace.enter(&path);
        let _ = entered;
        if path.contains("::") {
            let parent = path[..path.rfind("::").expect("parented")].replace("::", ".");
            let tail = path_tail(&path).unwrap_or(&path);
            self.put(&format!("{}.{} = ", parent, tail));
            self.emit_module_literal(tail, body)?;
            self.put(";");
        } else {
            self.put("const ");
            self.put_named(&path);
            self.put(" = ");
            self.emit_module_literal(&path, body)?;
            self.put(";");
        }
        self.namespace.leave(&path);
        Ok(())
    }

    pub(crate) fn emit_module_literal(
        &mut self,
        name: &str,
        body: &'a Node<'a>,
    ) -> Result<(), Error> {
        let _ = name;
        let statements = self.body_list(body);
        if statements.is_empty() {
            self.put("{}");
            return Ok(());
        }
        self.put("{");
        self.ser.newline();
        let mut first = true;
        for stmt in statements {
            if !first {
                self.put(",");
                self.ser.newline();
            }
            first = false;
            match stmt.kind {
                Kind::Def | Kind::Defs => {
                    let name_idx = if stmt.kind == Kind::Defs { 1 } else { 0 };
                    let fn_name = stmt.str_child(name_idx).unwrap_or_default().to_string();
                    let args = stmt
                        .node_child(name_idx + 1)
                        .ok_or_else(|| Error::unsupported("module def", stmt.loc))?;
                    let fn_body = stmt
                        .node_child(name_idx + 2)
                        .ok_or_else(|| Error::unsupported("module def", stmt.loc))?;
                    let getter = !stmt.is_method(self.sources);
                    if getter {
                        self.put("get ");
                    }
                    self.put_named(&fn_name);
                    let endless = !stmt.loc.map(|l| l.has_end).unwrap_or(true);
                    self.emit_function_tail(&fn_name, args, fn_body, getter || endless)?;
                }
                Kind::Casgn => {
                    let const_name = stmt.str_child(1).unwrap_or_default();
                    self.put(const_name);
                    self.put(": ");
                    if let Some(value) = stmt.node_child(2) {
                        self.expr(value)?;
                    }
                }
                Kind::Module | Kind::Class => {
                    let nested_name = stmt
                        .node_child(0)
                        .map(const_path)
                        .unwrap_or_default();
                    self.put(&nested_name);
                    self.put(": ");
                    match stmt.kind {
                        Kind::Module => {
                            let nested_body = stmt.node_child(1).ok_or_else(|| {
                                Error::unsupported("nested module", stmt.loc)
                            })?;
                            let entered = self.namespace.enter(&nested_name);
                            let _ = entered;
                            self.emit_module_literal(&nested_name, nested_body)?;
                            self.namespace.leave(&nested_name);
                        }
                        _ => {
                            let nested_super = stmt.child(1).and_then(Value::as_node);
                            let nested_body = stmt.node_child(2).ok_or_else(|| {
                                Error::unsupported("nested class", stmt.loc)
                            })?;
                            let entered = self.namespace.enter(&nested_name);
                            let _ = entered;
                            self.emit_class_literal(None, nested_super, nested_body)?;
                            self.namespace.leave(&nested_name);
                        }
                    }
                }
                Kind::NoOp => {
                    first = true;
                }
                _ => {
                    return Err(Error::unsupported(
                        "non-classifiable module body statement",
                        stmt.loc,
                    ))
                }
            }
        }
        self.ser.sput("}");
        Ok(())
    }

    pub(crate) fn on_sclass(&mut self, node: &'a Node<'a>) -> Result<(), Error> {
        Err(Error::unsupported(
            "singleton class outside a class body",
            node.loc,
        ))
    }

    pub(crate) fn on_alias(&mut self, node: &'a Node<'a>) -> Result<(), Error> {
        Err(Error::unsupported("alias outside a class body", node.loc))
    }

    pub(crate) fn on_undef(&mut self, node: &'a Node<'a>) -> Result<(), Error> {
        Err(Error::unsupported("undef outside a class body", node.loc))
    }
}

/// Renders a constant node back to its dotted path (`A::B` form kept with
/// `::` so the namespace can split it).
pub(crate) fn const_path(node: &Node) -> String {
    match node.kind {
        Kind::Const => {
            let name = node.str_child(1).unwrap_or_default();
            match node.node_child(0) {
                Some(parent) if parent.kind != Kind::Cbase => {
                    format!("{}::{}", const_path(parent), name)
                }
                _ => name.to_string(),
            }
        }
        _ => node.str_child(0).unwrap_or_default().to_string(),
    }
}

fn path_tail(path: &str) -> Option<&str> {
    path.split("::").last()
}

fn alias_name(node: Option<&Node>) -> String {
    node.and_then(|n| n.str_child(0))
        .unwrap_or_default()
        .to_string()
}

/// A paren-less def reads as a getter only when its tail yields a value;
/// a mutating or looping tail keeps it an ordinary method.
fn getter_shaped(body: &Node) -> bool {
    match body.kind {
        Kind::Begin => body
            .child_nodes()
            .last()
            .map(getter_shaped)
            .unwrap_or(false),
        Kind::Ivasgn
        | Kind::Lvasgn
        | Kind::Cvasgn
        | Kind::Gvasgn
        | Kind::Casgn
        | Kind::Masgn
        | Kind::OpAsgn
        | Kind::OrAsgn
        | Kind::AndAsgn
        | Kind::While
        | Kind::Until
        | Kind::WhilePost
        | Kind::UntilPost
        | Kind::For => false,
        _ => true,
    }
}

/// Literal values safe to hoist into a field initialiser: no references to
/// constructor arguments or anything else.
fn is_static_literal(node: &Node) -> bool {
    match node.kind {
        Kind::Int | Kind::Float | Kind::Str | Kind::Sym | Kind::True | Kind::False | Kind::Nil => {
            true
        }
        Kind::Array | Kind::Hash | Kind::Pair => node.child_nodes().all(is_static_literal),
        _ => false,
    }
}

fn collect_ivar_names(node: &Node, out: &mut HashSet<String>) {
    match node.kind {
        Kind::Ivar | Kind::Ivasgn => {
            if let Some(name) = node.str_child(0) {
                out.insert(name.trim_start_matches('@').to_string());
            }
        }
        Kind::Class | Kind::Module => return,
        _ => {}
    }
    for child in node.child_nodes() {
        collect_ivar_names(child, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::Arena;
    use crate::ast::s;

    #[test]
    fn const_path_builds_nested_names() {
        let arena = Arena::new();
        let a = s(&arena, Kind::Const, &[Value::Nil, Value::Str("A")]);
        let ab = s(&arena, Kind::Const, &[Value::Node(a), Value::Str("B")]);
        assert_eq!(const_path(ab), "A::B");
        assert_eq!(const_path(a), "A");
    }

    #[test]
    fn static_literal_detection() {
        let arena = Arena::new();
        let zero = s(&arena, Kind::Int, &[Value::Int(0)]);
        assert!(is_static_literal(zero));
        let lvar = s(&arena, Kind::Lvar, &[Value::Str("x")]);
        assert!(!is_static_literal(lvar));
        let arr = s(&arena, Kind::Array, &[Value::Node(zero), Value::Node(lvar)]);
        assert!(!is_static_literal(arr));
    }

    #[test]
    fn ivar_collection_skips_nested_classes() {
        let arena = Arena::new();
        let ivar = s(&arena, Kind::Ivar, &[Value::Str("@n")]);
        let inner_name = s(&arena, Kind::Const, &[Value::Nil, Value::Str("In")]);
        let inner_ivar = s(&arena, Kind::Ivar, &[Value::Str("@hidden")]);
        let inner = s(
            &arena,
            Kind::Class,
            &[Value::Node(inner_name), Value::Nil, Value::Node(inner_ivar)],
        );
        let body = s(&arena, Kind::Begin, &[Value::Node(ivar), Value::Node(inner)]);
        let mut out = HashSet::new();
        collect_ivar_names(body, &mut out);
        assert!(out.contains("n"));
        assert!(!out.contains("hidden"));
    }
}
