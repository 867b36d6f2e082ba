//! ES-module forms and the markup builders (`xnode` for JSX, `pnode` for
//! server-rendered HTML). These tags exist for the benefit of filters that
//! synthesise modules and components; the walker never produces them.

use crate::ast::{Kind, Node, Value};
use crate::error::Error;
use crate::options::ModuleKind;

use super::literals::unwrap_begin;
use super::{Converter, State};

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

impl<'a, 'o> Converter<'a, 'o> {
    /// `import` children: a path string followed by either nothing (bare
    /// side-effect import), one constant (default import), or an `array` of
    /// names with optional `pair(name, alias)` renames.
    pub(crate) fn on_import(&mut self, node: &'a Node<'a>) -> Result<(), Error> {
        let path = node
            .str_child(0)
            .or_else(|| node.node_child(0).and_then(|n| n.str_child(0)))
            .ok_or_else(|| Error::unsupported("import without path", node.loc))?;
        let target = node.children.get(1).and_then(Value::as_node);

        if self.module_kind() == ModuleKind::Cjs {
            match target {
                None => {
                    self.put(&format!("require(\"{}\");", path));
                }
                Some(names) if names.kind == Kind::Array => {
                    self.put("const {");
                    self.emit_import_names(names, true)?;
                    self.put(&format!("}} = require(\"{}\");", path));
                }
                Some(name) => {
                    self.put("const ");
                    self.put(&import_name(name));
                    self.put(&format!(" = require(\"{}\");", path));
                }
            }
            return Ok(());
        }

        match target {
            None => self.put(&format!("import \"{}\";", path)),
            Some(names) if names.kind == Kind::Array => {
                self.put("import { ");
                self.emit_import_names(names, false)?;
                self.put(&format!(" }} from \"{}\";", path));
            }
            Some(name) => {
                self.put("import ");
                self.put(&import_name(name));
                self.put(&format!(" from \"{}\";", path));
            }
        }
        Ok(())
    }

    fn emit_import_names(&mut self, names: &'a Node<'a>, cjs: bool) -> Result<(), Error> {
        for (i, name) in names.child_nodes().enumerate() {
            if i > 0 {
                self.put(", ");
            }
            if name.kind == Kind::Pair {
                let original = name
                    .node_child(0)
                    .map(|n| import_name(n))
                    .unwrap_or_default();
                let alias = name
                    .node_child(1)
                    .map(|n| import_name(n))
                    .unwrap_or_default();
                if cjs {
                    self.put(&format!("{}: {}", original, alias));
                } else {
                    self.put(&format!("{} as {}", original, alias));
                }
            } else {
                self.put(&import_name(name));
            }
        }
        Ok(())
    }

    pub(crate) fn on_export(&mut self, node: &'a Node<'a>, default: bool) -> Result<(), Error> {
        let inner = node
            .node_child(0)
            .ok_or_else(|| Error::unsupported("export without payload", node.loc))?;

        if self.module_kind() == ModuleKind::Cjs {
            if default {
                self.put("module.exports = ");
                self.expr(inner)?;
                self.put(";");
                return Ok(());
            }
            // Named CommonJS export.
            match inner.kind {
                Kind::Casgn => {
                    let name = inner.str_child(1).unwrap_or_default().to_string();
                    self.stmt(inner)?;
                    self.terminate(inner);
                    self.ser.newline();
                    self.put(&format!("exports.{} = {};", name, name));
                    return Ok(());
                }
                _ => {
                    return Err(Error::unsupported(
                        "named export shape under cjs",
                        node.loc,
                    ))
                }
            }
        }

        self.put("export ");
        if default {
            self.put("default ");
            if matches!(inner.kind, Kind::Class | Kind::Module | Kind::Def | Kind::Defs) {
                self.stmt(inner)?;
            } else {
                self.expr(inner)?;
                self.put(";");
            }
            return Ok(());
        }
        if inner.kind == Kind::Array {
            self.put("{ ");
            self.emit_import_names(inner, false)?;
            self.put(" };");
            return Ok(());
        }
        self.stmt(inner)?;
        self.terminate(inner);
        Ok(())
    }

    // ── JSX ────────────────────────────────────────────────────────────

    pub(crate) fn on_xnode(&mut self, node: &'a Node<'a>) -> Result<(), Error> {
        let tag = node
            .str_child(0)
            .ok_or_else(|| Error::unsupported("xnode without tag", node.loc))?;

        // Attributes arrive inline as pairs (or a leading hash); everything
        // else is a child.
        let mut attrs: Vec<(String, Vec<&'a Node<'a>>)> = Vec::new();
        let mut children: Vec<&'a Node<'a>> = Vec::new();
        for child in node.children[1..].iter().filter_map(Value::as_node) {
            match child.kind {
                Kind::Pair | Kind::Prop => {
                    let key = xattr_name(child);
                    let value = child.node_child(1);
                    if let Some(value) = value {
                        match attrs.iter_mut().find(|(k, _)| *k == key) {
                            // Duplicate class-like attributes concatenate.
                            Some((_, values)) => values.push(value),
                            None => attrs.push((key, vec![value])),
                        }
                    }
                }
                Kind::Hash => {
                    for pair in child.child_nodes() {
                        let key = xattr_name(pair);
                        if let Some(value) = pair.node_child(1) {
                            match attrs.iter_mut().find(|(k, _)| *k == key) {
                                Some((_, values)) => values.push(value),
                                None => attrs.push((key, vec![value])),
                            }
                        }
                    }
                }
                _ => children.push(child),
            }
        }

        self.put("<");
        self.put(tag);
        for (key, values) in &attrs {
            self.put(" ");
            self.put(key);
            self.put("=");
            let all_static = values.iter().all(|v| v.kind == Kind::Str);
            if values.len() == 1 && all_static {
                self.expr(values[0])?;
            } else if all_static {
                let joined = values
                    .iter()
                    .map(|v| v.str_child(0).unwrap_or_default())
                    .collect::<Vec<_>>()
                    .join(" ");
                self.put_js_string(&joined);
            } else {
                self.put("{");
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        self.put(" + \" \" + ");
                    }
                    self.operand(value, 11)?;
                }
                self.put("}");
            }
        }

        if children.is_empty() && VOID_ELEMENTS.contains(&tag) {
            self.put(" />");
            return Ok(());
        }
        self.put(">");
        for child in &children {
            match child.kind {
                Kind::Xnode => self.expr(child)?,
                Kind::Str => {
                    self.put(child.str_child(0).unwrap_or_default());
                }
                _ => {
                    self.put("{");
                    self.expr(child)?;
                    self.put("}");
                }
            }
        }
        self.put(&format!("</{}>", tag));
        Ok(())
    }

    // ── HTML builder ───────────────────────────────────────────────────

    /// Three output shapes: fully static content becomes a double-quoted
    /// string literal, dynamic content a template literal, and a loop child
    /// an IIFE accumulating into a local.
    pub(crate) fn on_pnode(&mut self, node: &'a Node<'a>) -> Result<(), Error> {
        if self.state == State::Statement && self.pnode_accumulating {
            self.put("$_ += ");
            let saved = std::mem::replace(&mut self.state, State::Expression);
            let result = self.emit_pnode_value(node);
            self.state = saved;
            result?;
            self.put(";");
            return Ok(());
        }
        self.emit_pnode_value(node)
    }

    fn emit_pnode_value(&mut self, node: &'a Node<'a>) -> Result<(), Error> {
        if let Some(text) = render_static_pnode(node) {
            self.put_js_string(&text);
            return Ok(());
        }

        let tag = node
            .str_child(0)
            .ok_or_else(|| Error::unsupported("pnode without tag", node.loc))?;
        let attrs = node.children.get(1).and_then(Value::as_node);
        let children: Vec<&'a Node<'a>> = node.children[2..]
            .iter()
            .filter_map(Value::as_node)
            .collect();
        let has_loop = children.iter().any(|c| c.kind == Kind::Block);

        if has_loop {
            // Accumulator IIFE.
            self.put("(() => {");
            self.ser.newline();
            self.put("let $_ = ");
            self.emit_pnode_open(tag, attrs)?;
            self.put(";");
            self.ser.newline();
            let saved = std::mem::replace(&mut self.pnode_accumulating, true);
            for child in &children {
                match child.kind {
                    Kind::Block => {
                        self.stmt(child)?;
                        self.terminate(child);
                    }
                    _ => {
                        self.put("$_ += ");
                        self.emit_pnode_child(child)?;
                        self.put(";");
                    }
                }
                if !self.ser.current_line_blank() {
                    self.ser.newline();
                }
            }
            self.pnode_accumulating = saved;
            self.ser.puts(&format!("$_ += \"</{}>\";", tag));
            self.ser.puts("return $_;");
            self.ser.sput("})()");
            return Ok(());
        }

        // Template literal.
        self.ser.put_literal("`");
        self.emit_pnode_open_into_template(tag, attrs)?;
        for child in &children {
            match child.kind {
                Kind::Str => {
                    let text = child.str_child(0).unwrap_or_default();
                    self.ser.put_literal(&text.replace('`', "\\`"));
                }
                Kind::Pnode => {
                    self.put("${");
                    self.emit_pnode_value(child)?;
                    self.put("}");
                }
                _ => {
                    let inner = unwrap_begin(child);
                    self.put("${");
                    self.expr(inner)?;
                    self.put("}");
                }
            }
        }
        self.ser.put_literal(&format!("</{}>", tag));
        self.ser.put_literal("`");
        Ok(())
    }

    fn emit_pnode_open(
        &mut self,
        tag: &str,
        attrs: Option<&'a Node<'a>>,
    ) -> Result<(), Error> {
        if attrs.map(|a| a.kind == Kind::Hash && !a.children.is_empty()) == Some(true) {
            self.ser.put_literal("`");
            self.emit_pnode_open_into_template(tag, attrs)?;
            self.ser.put_literal("`");
        } else {
            self.put_js_string(&format!("<{}>", tag));
        }
        Ok(())
    }

    fn emit_pnode_open_into_template(
        &mut self,
        tag: &str,
        attrs: Option<&'a Node<'a>>,
    ) -> Result<(), Error> {
        self.ser.put_literal(&format!("<{}", tag));
        if let Some(attrs) = attrs {
            if attrs.kind == Kind::Hash {
                for pair in attrs.child_nodes() {
                    let key = pair
                        .node_child(0)
                        .and_then(|k| k.str_child(0))
                        .unwrap_or_default();
                    self.ser.put_literal(&format!(" {}=\"", key));
                    match pair.node_child(1) {
                        Some(value) if value.kind == Kind::Str => {
                            let text = value.str_child(0).unwrap_or_default();
                            self.ser.put_literal(&text.replace('"', "&quot;"));
                        }
                        Some(value) => {
                            self.put("${");
                            self.expr(value)?;
                            self.put("}");
                        }
                        None => {}
                    }
                    self.ser.put_literal("\"");
                }
            }
        }
        self.ser.put_literal(">");
        Ok(())
    }

    fn emit_pnode_child(&mut self, child: &'a Node<'a>) -> Result<(), Error> {
        match child.kind {
            Kind::Str => {
                self.put_js_string(child.str_child(0).unwrap_or_default());
                Ok(())
            }
            _ => {
                let saved = std::mem::replace(&mut self.state, State::Expression);
                let result = self.expr(child);
                self.state = saved;
                result
            }
        }
    }
}

/// JSX attribute naming: React spellings for `class`/`for`, `prop(...)`
/// pairs pass through.
fn xattr_name(pair: &Node) -> String {
    let key = pair
        .node_child(0)
        .map(|k| {
            if k.kind == Kind::Prop {
                k.str_child(0).unwrap_or_default().to_string()
            } else {
                k.str_child(0).unwrap_or_default().to_string()
            }
        })
        .unwrap_or_default();
    match key.as_str() {
        "class" => "className".to_string(),
        "for" => "htmlFor".to_string(),
        other => other.to_string(),
    }
}

fn import_name(node: &Node) -> String {
    match node.kind {
        Kind::Const => node.str_child(1).unwrap_or_default().to_string(),
        Kind::Str | Kind::Sym => node.str_child(0).unwrap_or_default().to_string(),
        kind if kind.is_send_family() => node.str_child(1).unwrap_or_default().to_string(),
        _ => String::new(),
    }
}

/// Fully static pnode trees render to one HTML string at compile time.
fn render_static_pnode(node: &Node) -> Option<String> {
    let tag = node.str_child(0)?;
    let attrs = node.children.get(1).and_then(Value::as_node);
    let mut out = format!("<{}", tag);
    if let Some(attrs) = attrs {
        if attrs.kind == Kind::Hash {
            for pair in attrs.child_nodes() {
                let key = pair.node_child(0)?.str_child(0)?;
                let value = pair.node_child(1)?;
                if !matches!(value.kind, Kind::Str | Kind::Sym) {
                    return None;
                }
                out.push_str(&format!(" {}='{}'", key, value.str_child(0)?));
            }
        } else if !matches!(attrs.kind, Kind::Hash) && !attrs.children.is_empty() {
            return None;
        }
    }
    out.push('>');
    for child in node.children[2..].iter() {
        match child {
            Value::Node(child) => match child.kind {
                Kind::Str => out.push_str(child.str_child(0)?),
                Kind::Pnode => out.push_str(&render_static_pnode(child)?),
                _ => return None,
            },
            Value::Nil => {}
            _ => return None,
        }
    }
    out.push_str(&format!("</{}>", tag));
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::Arena;
    use crate::ast::s;

    #[test]
    fn static_pnode_renders_to_html() {
        let arena = Arena::new();
        let text = s(&arena, Kind::Str, &[Value::Str("hello")]);
        let p = s(
            &arena,
            Kind::Pnode,
            &[Value::Str("p"), Value::Nil, Value::Node(text)],
        );
        assert_eq!(render_static_pnode(p), Some("<p>hello</p>".to_string()));
    }

    #[test]
    fn dynamic_pnode_is_not_static() {
        let arena = Arena::new();
        let var = s(&arena, Kind::Lvar, &[Value::Str("name")]);
        let p = s(
            &arena,
            Kind::Pnode,
            &[Value::Str("p"), Value::Nil, Value::Node(var)],
        );
        assert_eq!(render_static_pnode(p), None);
    }

    #[test]
    fn react_attribute_renames() {
        let arena = Arena::new();
        let key = s(&arena, Kind::Sym, &[Value::Str("class")]);
        let value = s(&arena, Kind::Str, &[Value::Str("big")]);
        let pair = s(&arena, Kind::Pair, &[Value::Node(key), Value::Node(value)]);
        assert_eq!(xattr_name(pair), "className");

        let for_key = s(&arena, Kind::Sym, &[Value::Str("for")]);
        let for_pair = s(&arena, Kind::Pair, &[Value::Node(for_key), Value::Node(value)]);
        assert_eq!(xattr_name(for_pair), "htmlFor");
    }
}
