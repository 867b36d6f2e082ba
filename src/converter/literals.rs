//! Literal and collection handlers: numbers, strings, symbols, template
//! literals, regexps, arrays, hashes, ranges.

use crate::ast::{Kind, Node, Value};
use crate::error::Error;
use crate::options::Truthy;

use super::{Converter, Helper, State};

/// A `dstr` whose static parts exceed this many characters *and* this many
/// newlines is written as a real multi-line template literal instead of
/// escaping each `\n`. Shared with the tests so the threshold cannot drift.
pub const HEREDOC_MIN_LENGTH: usize = 40;
pub const HEREDOC_MIN_NEWLINES: usize = 4;

impl<'a, 'o> Converter<'a, 'o> {
    pub(crate) fn on_number(&mut self, node: &'a Node<'a>) -> Result<(), Error> {
        match node.child(0) {
            Some(Value::Int(v)) => {
                let text = if self.es(2021) && v.abs() >= 1_000_000 {
                    group_digits(*v)
                } else {
                    v.to_string()
                };
                self.put(&text);
            }
            Some(Value::Float(f)) => {
                let mut text = format!("{}", f);
                if !text.contains('.') && !text.contains('e') && !text.contains("inf") {
                    text.push_str(".0");
                }
                self.put(&text);
            }
            // Integers beyond i64 keep their source digits.
            Some(Value::Str(digits)) => self.put(digits),
            _ => self.put("0"),
        }
        Ok(())
    }

    pub(crate) fn on_str(&mut self, node: &'a Node<'a>) -> Result<(), Error> {
        let text = node.str_child(0).unwrap_or_default();
        self.put_js_string(text);
        Ok(())
    }

    /// Symbols lower to plain strings.
    pub(crate) fn on_sym(&mut self, node: &'a Node<'a>) -> Result<(), Error> {
        self.on_str(node)
    }

    pub(crate) fn put_js_string(&mut self, text: &str) {
        let escaped = escape_js(text, '"');
        self.ser.put_literal(&format!("\"{}\"", escaped));
    }

    pub(crate) fn on_dstr(&mut self, node: &'a Node<'a>) -> Result<(), Error> {
        let (static_len, newlines) = node
            .child_nodes()
            .filter(|part| part.kind == Kind::Str)
            .map(|part| part.str_child(0).unwrap_or_default())
            .fold((0usize, 0usize), |(len, nl), text| {
                (len + text.len(), nl + text.matches('\n').count())
            });
        let multiline = static_len > HEREDOC_MIN_LENGTH && newlines >= HEREDOC_MIN_NEWLINES;

        self.ser.put_literal("`");
        for part in node.child_nodes() {
            match part.kind {
                Kind::Str => {
                    let text = part.str_child(0).unwrap_or_default();
                    let escaped = escape_template(text, multiline);
                    self.ser.put_literal(&escaped);
                }
                _ => {
                    let inner = unwrap_begin(part);
                    self.put("${");
                    self.expr(inner)?;
                    if self.options.nullish_to_s && self.es(2020) {
                        self.put(" ?? \"\"");
                    }
                    self.put("}");
                }
            }
        }
        self.ser.put_literal("`");
        Ok(())
    }

    pub(crate) fn on_xstr(&mut self, node: &'a Node<'a>) -> Result<(), Error> {
        let Some(binding) = &self.options.binding else {
            return Err(Error::Security {
                message: "backtick string evaluated with no binding".to_string(),
                loc: node.loc,
            });
        };
        let mut source = String::new();
        for part in node.child_nodes() {
            if part.kind == Kind::Str {
                source.push_str(part.str_child(0).unwrap_or_default());
            }
        }
        let evaluated = binding(&source);
        self.put(&evaluated);
        Ok(())
    }

    pub(crate) fn on_regexp(&mut self, node: &'a Node<'a>) -> Result<(), Error> {
        let opts = node
            .child_nodes()
            .find(|c| c.kind == Kind::Regopt)
            .map(|opt| {
                opt.children
                    .iter()
                    .filter_map(Value::as_str)
                    .collect::<String>()
            })
            .unwrap_or_default();

        let parts: Vec<&'a Node<'a>> = node
            .child_nodes()
            .filter(|c| c.kind != Kind::Regopt)
            .collect();
        let interpolated = parts.iter().any(|p| p.kind != Kind::Str);

        let raw: String = parts
            .iter()
            .filter(|p| p.kind == Kind::Str)
            .map(|p| p.str_child(0).unwrap_or_default())
            .collect();
        let (pattern, flags) = normalize_regex(&raw, &opts);

        if interpolated {
            // Dynamic pattern: build via the constructor from a template.
            self.put("new RegExp(");
            self.ser.put_literal("`");
            for part in &parts {
                match part.kind {
                    Kind::Str => {
                        let (chunk, _) = normalize_regex(
                            part.str_child(0).unwrap_or_default(),
                            &opts,
                        );
                        self.ser.put_literal(&chunk.replace('\\', "\\\\").replace('`', "\\`"));
                    }
                    _ => {
                        let inner = unwrap_begin(part);
                        self.put("${");
                        self.expr(inner)?;
                        self.put("}");
                    }
                }
            }
            self.ser.put_literal("`");
            if !flags.is_empty() {
                self.put(&format!(", \"{}\"", flags));
            }
            self.put(")");
            return Ok(());
        }

        if count_unescaped_slashes(&pattern) > 0 {
            self.put("new RegExp(");
            self.put_js_string(&pattern);
            if !flags.is_empty() {
                self.put(&format!(", \"{}\"", flags));
            }
            self.put(")");
        } else {
            self.ser.put_literal(&format!("/{}/{}", pattern, flags));
        }
        Ok(())
    }

    pub(crate) fn on_array(&mut self, node: &'a Node<'a>) -> Result<(), Error> {
        self.put("[");
        let items: Vec<&'a Node<'a>> = node.child_nodes().collect();
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                self.put(", ");
            }
            self.expr(item)?;
        }
        self.put("]");
        Ok(())
    }

    pub(crate) fn on_hash(&mut self, node: &'a Node<'a>) -> Result<(), Error> {
        let items: Vec<&'a Node<'a>> = node.child_nodes().collect();
        if items.is_empty() {
            self.put("{}");
            return Ok(());
        }
        self.put("{");
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                self.put(",");
            }
            self.put(" ");
            self.expr(item)?;
        }
        self.put(" }");
        Ok(())
    }

    pub(crate) fn on_pair(&mut self, node: &'a Node<'a>) -> Result<(), Error> {
        let key = node
            .node_child(0)
            .ok_or_else(|| Error::unsupported("pair without key", node.loc))?;
        let value = node
            .node_child(1)
            .ok_or_else(|| Error::unsupported("pair without value", node.loc))?;

        match key.kind {
            Kind::Sym | Kind::Str => {
                let name = key.str_child(0).unwrap_or_default();
                if is_js_identifier(name) {
                    self.put(name);
                } else {
                    self.put_js_string(name);
                }
            }
            // Computed keys.
            _ => {
                self.put("[");
                self.expr(key)?;
                self.put("]");
            }
        }
        self.put(": ");
        self.expr(value)?;
        Ok(())
    }

    pub(crate) fn on_splat(&mut self, node: &'a Node<'a>) -> Result<(), Error> {
        self.put("...");
        if let Some(inner) = node.node_child(0) {
            self.operand(inner, 15)?;
        }
        Ok(())
    }

    pub(crate) fn on_kwsplat(&mut self, node: &'a Node<'a>) -> Result<(), Error> {
        self.put("...");
        if let Some(inner) = node.node_child(0) {
            self.operand(inner, 15)?;
        }
        Ok(())
    }

    /// A first-class range value needs the `$Range` runtime helper.
    pub(crate) fn on_range(&mut self, node: &'a Node<'a>) -> Result<(), Error> {
        self.need_helper(Helper::Range);
        self.put("new $Range(");
        match node.node_child(0) {
            Some(begin) => self.expr(begin)?,
            None => self.put("null"),
        }
        self.put(", ");
        match node.node_child(1) {
            Some(end) => self.expr(end)?,
            None => self.put("null"),
        }
        if node.kind == Kind::Erange {
            self.put(", true");
        }
        self.put(")");
        Ok(())
    }

    pub(crate) fn on_and_or(&mut self, node: &'a Node<'a>) -> Result<(), Error> {
        let left = node
            .node_child(0)
            .ok_or_else(|| Error::unsupported("boolean op without operands", node.loc))?;
        let right = node
            .node_child(1)
            .ok_or_else(|| Error::unsupported("boolean op without operands", node.loc))?;
        let is_or = node.kind == Kind::Or;

        if self.truthy_mode() == Truthy::Ruby
            && !(is_boolean_pair(left, right))
        {
            // Value context under Ruby truthiness: helper calls that keep
            // the right side lazy.
            let helper = if is_or { Helper::Ror } else { Helper::Rand };
            self.need_helper(helper);
            self.put(if is_or { "$ror(" } else { "$rand(" });
            self.expr(left)?;
            self.put(", () => ");
            self.expr(right)?;
            self.put(")");
            return Ok(());
        }

        let op = if is_or {
            self.select_or_operator(left, right)
        } else {
            "&&"
        };
        let prio = if is_or { 3 } else { 4 };
        self.operand(left, prio)?;
        self.put(&format!(" {} ", op));
        self.operand(right, prio + 1)?;
        Ok(())
    }

    fn select_or_operator(&self, left: &Node, right: &Node) -> &'static str {
        use crate::options::OrMode;
        match self.or_mode() {
            OrMode::Logical => "||",
            OrMode::Nullish => "??",
            OrMode::Auto => {
                if self.es(2020)
                    && !super::is_boolean_expr(left)
                    && !super::is_boolean_expr(right)
                    && left.kind != Kind::Or
                {
                    "??"
                } else {
                    "||"
                }
            }
        }
    }

    pub(crate) fn on_not(&mut self, node: &'a Node<'a>) -> Result<(), Error> {
        let operand = node
            .node_child(0)
            .ok_or_else(|| Error::unsupported("not without operand", node.loc))?;
        self.put("!");
        if self.truthy_mode() == Truthy::Ruby && !super::is_boolean_expr(operand) {
            self.need_helper(Helper::Truthy);
            self.put("$T(");
            self.expr(operand)?;
            self.put(")");
        } else {
            self.operand(operand, 13)?;
        }
        Ok(())
    }

    pub(crate) fn on_nullish(&mut self, node: &'a Node<'a>) -> Result<(), Error> {
        let left = node
            .node_child(0)
            .ok_or_else(|| Error::unsupported("nullish without operands", node.loc))?;
        let right = node
            .node_child(1)
            .ok_or_else(|| Error::unsupported("nullish without operands", node.loc))?;
        let op = if self.es(2020) { " ?? " } else { " || " };
        self.operand(left, 3)?;
        self.put(op);
        self.operand(right, 4)?;
        Ok(())
    }

    pub(crate) fn on_typeof(&mut self, node: &'a Node<'a>) -> Result<(), Error> {
        self.put("typeof ");
        match node.node_child(0) {
            Some(inner) => self.operand(inner, 13)?,
            None => self.put("undefined"),
        }
        Ok(())
    }

    pub(crate) fn on_begin(&mut self, node: &'a Node<'a>) -> Result<(), Error> {
        let list: Vec<&'a Node<'a>> = node.child_nodes().collect();
        match (self.state, list.len()) {
            (_, 0) => Ok(()),
            // Deeply nested begins collapse to the single expression.
            (State::Expression | State::Method, 1) => self.expr(list[0]),
            (State::Expression | State::Method, _) => {
                self.put("(");
                for (i, stmt) in list.iter().enumerate() {
                    if i > 0 {
                        self.put(", ");
                    }
                    self.expr(stmt)?;
                }
                self.put(")");
                Ok(())
            }
            (State::Statement, _) => self.stmts(&list),
        }
    }
}

pub(crate) fn unwrap_begin<'a>(node: &'a Node<'a>) -> &'a Node<'a> {
    if node.kind == Kind::Begin && node.children.len() == 1 {
        if let Some(inner) = node.node_child(0) {
            return unwrap_begin(inner);
        }
    }
    node
}

fn is_boolean_pair(left: &Node, right: &Node) -> bool {
    super::is_boolean_expr(left) && super::is_boolean_expr(right)
}

pub(crate) fn escape_js(text: &str, quote: char) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            '\0' => out.push_str("\\0"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out
}

fn escape_template(text: &str, keep_newlines: bool) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '`' => out.push_str("\\`"),
            '$' => out.push_str("\\$"),
            '\n' if !keep_newlines => out.push_str("\\n"),
            c => out.push(c),
        }
    }
    out
}

pub(crate) fn is_js_identifier(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .next()
            .map(|c| c.is_ascii_alphabetic() || c == '_' || c == '$')
            .unwrap_or(false)
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

fn group_digits(v: i64) -> String {
    let digits = v.abs().to_string();
    let mut grouped = String::new();
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('_');
        }
        grouped.push(c);
    }
    if v < 0 {
        format!("-{}", grouped)
    } else {
        grouped
    }
}

fn count_unescaped_slashes(pattern: &str) -> usize {
    let mut count = 0;
    let mut escaped = false;
    for c in pattern.chars() {
        match c {
            '\\' if !escaped => escaped = true,
            '/' if !escaped => count += 1,
            _ => escaped = false,
        }
    }
    count
}

/// Ruby-specific regexp flag normalisation:
/// `x` strips comments and whitespace; Ruby `m` (dot matches newline)
/// becomes JS `s` when the pattern has a bare `.`; `\A`/`\z` anchors
/// rewrite to `^`/`$`, adding the JS `m` flag when the pattern already
/// anchors lines.
pub(crate) fn normalize_regex(pattern: &str, ruby_flags: &str) -> (String, String) {
    let mut pat = pattern.to_string();

    if ruby_flags.contains('x') {
        let mut cleaned = String::with_capacity(pat.len());
        let mut escaped = false;
        let mut in_class = false;
        let mut chars = pat.chars().peekable();
        while let Some(c) = chars.next() {
            if escaped {
                cleaned.push(c);
                escaped = false;
                continue;
            }
            match c {
                '\\' => {
                    cleaned.push(c);
                    escaped = true;
                }
                '[' => {
                    in_class = true;
                    cleaned.push(c);
                }
                ']' => {
                    in_class = false;
                    cleaned.push(c);
                }
                '#' if !in_class => {
                    while let Some(&next) = chars.peek() {
                        if next == '\n' {
                            break;
                        }
                        chars.next();
                    }
                }
                c if c.is_whitespace() && !in_class => {}
                c => cleaned.push(c),
            }
        }
        pat = cleaned;
    }

    let mut flags = String::new();
    if ruby_flags.contains('i') {
        flags.push('i');
    }
    if ruby_flags.contains('m') && has_bare_dot(&pat) {
        flags.push('s');
    }

    let had_line_anchor = pat.starts_with('^') || pat.ends_with('$');
    if pat.contains("\\A") || pat.contains("\\z") || pat.contains("\\Z") {
        pat = pat.replace("\\A", "^").replace("\\z", "$").replace("\\Z", "$");
        if had_line_anchor && !flags.contains('m') {
            flags.push('m');
        }
    }

    (pat, flags)
}

fn has_bare_dot(pattern: &str) -> bool {
    let mut escaped = false;
    let mut in_class = false;
    for c in pattern.chars() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '[' => in_class = true,
            ']' => in_class = false,
            '.' if !in_class => return true,
            _ => {}
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_js_handles_quotes_and_newlines() {
        assert_eq!(escape_js("a\"b", '"'), "a\\\"b");
        assert_eq!(escape_js("line\nnext", '"'), "line\\nnext");
        assert_eq!(escape_js("back\\slash", '"'), "back\\\\slash");
    }

    #[test]
    fn normalize_regex_extended_strips_comments() {
        let (pat, _) = normalize_regex("\\d+  # digits\n\\w", "x");
        assert_eq!(pat, "\\d+\\w");
    }

    #[test]
    fn normalize_regex_ruby_multiline_becomes_dotall() {
        let (_, flags) = normalize_regex("a.b", "m");
        assert_eq!(flags, "s");
        let (_, flags) = normalize_regex("ab", "m");
        assert_eq!(flags, "");
    }

    #[test]
    fn normalize_regex_anchors() {
        let (pat, flags) = normalize_regex("\\Afoo\\z", "");
        assert_eq!(pat, "^foo$");
        assert_eq!(flags, "");
        let (pat, flags) = normalize_regex("^x\\z", "");
        assert_eq!(pat, "^x$");
        assert_eq!(flags, "m");
    }

    #[test]
    fn unescaped_slash_counting() {
        assert_eq!(count_unescaped_slashes("a/b"), 1);
        assert_eq!(count_unescaped_slashes("a\\/b"), 0);
        assert_eq!(count_unescaped_slashes("no slash"), 0);
    }

    #[test]
    fn identifier_detection() {
        assert!(is_js_identifier("name"));
        assert!(is_js_identifier("_private"));
        assert!(is_js_identifier("$jq"));
        assert!(!is_js_identifier("foo-bar"));
        assert!(!is_js_identifier("1st"));
    }

    #[test]
    fn digit_grouping() {
        assert_eq!(group_digits(1_000_000), "1_000_000");
        assert_eq!(group_digits(-1234567), "-1_234_567");
    }
}
