use crate::source::SourceId;

/// Source attribution carried by every emitted token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Origin {
    pub source: SourceId,
    pub pos: usize,
    /// Record the token text in the source map `names` table (assignments
    /// and constant references).
    pub with_name: bool,
}

/// One emitted chunk plus the source position it came from. `literal` marks
/// string-literal content whose brackets must not confuse re-indentation.
#[derive(Debug, Clone)]
pub struct Token {
    pub text: String,
    pub origin: Option<Origin>,
    pub literal: bool,
}

#[derive(Debug, Clone, Default)]
pub struct Line {
    pub tokens: Vec<Token>,
    pub indent: usize,
    /// Lines inside multi-line template literals keep their own shape.
    pub protected: bool,
}

impl Line {
    fn width(&self) -> usize {
        self.tokens.iter().map(|t| t.text.len()).sum()
    }

    fn text(&self) -> String {
        self.tokens.iter().map(|t| t.text.as_str()).collect()
    }

    fn is_comment(&self) -> bool {
        match self.tokens.first() {
            Some(t) => t.text.starts_with("//") || t.text.starts_with("/*"),
            None => false,
        }
    }

    fn is_blank(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// Mutable line-of-token buffer behind the converter.
///
/// The external appearance is a single string; `render` is idempotent and
/// cached after first call. Indentation is recomputed by `respace`, which
/// never changes the token count.
pub struct Serializer {
    lines: Vec<Line>,
    width: usize,
    indent_width: usize,
    vertical: bool,
    origin: Option<Origin>,
    cache: Option<String>,
}

impl Serializer {
    pub fn new(width: usize, vertical: bool) -> Self {
        Serializer {
            lines: vec![Line::default()],
            width,
            indent_width: 2,
            vertical,
            origin: None,
            cache: None,
        }
    }

    pub fn vertical(&self) -> bool {
        self.vertical
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.iter().all(Line::is_blank)
    }

    /// Installs the attribution for subsequent tokens, returning the
    /// previous one so callers can restore it.
    pub fn set_origin(&mut self, origin: Option<Origin>) -> Option<Origin> {
        std::mem::replace(&mut self.origin, origin)
    }

    fn dirty(&mut self) {
        self.cache = None;
    }

    fn push_token(&mut self, text: &str, literal: bool) {
        if text.is_empty() {
            return;
        }
        let token = Token {
            text: text.to_string(),
            origin: self.origin,
            literal,
        };
        self.lines.last_mut().expect("line buffer").tokens.push(token);
    }

    fn put_split(&mut self, s: &str, literal: bool) {
        self.dirty();
        let mut first = true;
        for chunk in s.split('\n') {
            if !first {
                self.lines.push(Line {
                    protected: literal,
                    ..Line::default()
                });
            }
            self.push_token(chunk, literal);
            first = false;
        }
    }

    /// Appends to the current line; embedded newlines open fresh lines.
    pub fn put(&mut self, s: &str) {
        self.put_split(s, false);
    }

    /// Like `put` but the content is string-literal text: bracket characters
    /// inside it are ignored by `respace` and continuation lines keep their
    /// exact shape.
    pub fn put_literal(&mut self, s: &str) {
        self.put_split(s, true);
    }

    /// `put` then start a fresh line.
    pub fn puts(&mut self, s: &str) {
        self.put(s);
        self.newline();
    }

    /// Start a fresh line, then `put`.
    pub fn sput(&mut self, s: &str) {
        if !self.current_line_blank() {
            self.newline();
        }
        self.put(s);
    }

    pub fn newline(&mut self) {
        self.dirty();
        self.lines.push(Line::default());
    }

    pub fn current_line_blank(&self) -> bool {
        self.lines.last().map(Line::is_blank).unwrap_or(true)
    }

    /// Width of the current line so far.
    pub fn col(&self) -> usize {
        self.lines.last().map(Line::width).unwrap_or(0)
    }

    /// Insertion point for a later [`Self::insert_line`]: the index of the
    /// next statement line. Scope heads take a mark right after their
    /// opening brace so pending declarations can be spliced in on exit.
    pub fn mark(&mut self) -> usize {
        if self.current_line_blank() {
            self.lines.len() - 1
        } else {
            self.lines.len()
        }
    }

    pub fn insert_line(&mut self, mark: usize, text: &str) {
        self.dirty();
        let line = Line {
            tokens: vec![Token {
                text: text.to_string(),
                origin: None,
                literal: false,
            }],
            indent: 0,
            protected: false,
        };
        self.lines.insert(mark.min(self.lines.len()), line);
    }

    /// Snapshot for [`Self::end_capture`]; everything emitted in between is
    /// extracted and rolled back.
    pub fn begin_capture(&mut self) -> (usize, usize) {
        let lmark = self.lines.len() - 1;
        let tmark = self.lines[lmark].tokens.len();
        (lmark, tmark)
    }

    pub fn end_capture(&mut self, (lmark, tmark): (usize, usize)) -> String {
        let mut out = String::new();
        for (i, line) in self.lines[lmark..].iter().enumerate() {
            let from = if i == 0 { tmark } else { 0 };
            if i > 0 {
                out.push('\n');
            }
            for token in &line.tokens[from..] {
                out.push_str(&token.text);
            }
        }
        self.lines.truncate(lmark + 1);
        self.lines[lmark].tokens.truncate(tmark);
        self.dirty();
        out
    }

    /// Runs the block and returns what it emitted as a string, rolling the
    /// buffer back. Used for speculative formatting and source-map probes;
    /// no real concurrency, just a snapshot.
    pub fn capture(&mut self, f: impl FnOnce(&mut Serializer)) -> String {
        let mark = self.begin_capture();
        f(self);
        self.end_capture(mark)
    }

    /// Emits `open`, runs the block, then closes: on the same line when the
    /// block stayed inline, on its own line otherwise.
    pub fn wrap(&mut self, open: &str, close: &str, f: impl FnOnce(&mut Serializer)) {
        self.put(open);
        let lmark = self.lines.len() - 1;
        f(self);
        if self.lines.len() - 1 == lmark {
            self.put(close);
        } else {
            if !self.current_line_blank() {
                self.newline();
            }
            self.put(close);
        }
    }

    /// Runs the block, then if it produced one overly wide line, reflows it
    /// at top-level `, ` boundaries. Token attribution is preserved; only
    /// line structure changes.
    pub fn compact(&mut self, f: impl FnOnce(&mut Serializer)) {
        let lmark = self.lines.len() - 1;
        let tmark = self.lines[lmark].tokens.len();
        f(self);
        if self.lines.len() - 1 != lmark {
            return;
        }
        let line = &self.lines[lmark];
        if line.width() + self.indent_width <= self.width.saturating_sub(10) {
            return;
        }
        // Reflow: split the emitted tokens into groups at depth-0 commas.
        let emitted: Vec<Token> = self.lines[lmark].tokens.split_off(tmark);
        let mut depth: i32 = 0;
        let mut groups: Vec<Vec<Token>> = vec![Vec::new()];
        for token in emitted {
            let is_sep = depth == 0 && !token.literal && token.text == ", ";
            if !token.literal {
                for c in token.text.chars() {
                    match c {
                        '(' | '[' | '{' => depth += 1,
                        ')' | ']' | '}' => depth -= 1,
                        _ => {}
                    }
                }
            }
            if is_sep {
                groups
                    .last_mut()
                    .expect("group")
                    .push(Token { text: ",".to_string(), ..token });
                groups.push(Vec::new());
            } else {
                groups.last_mut().expect("group").push(token);
            }
        }
        if groups.len() < 2 {
            self.lines[lmark].tokens.extend(groups.remove(0));
            return;
        }
        self.dirty();
        for group in groups {
            self.lines.push(Line {
                tokens: group,
                ..Line::default()
            });
        }
    }

    /// Re-indentation pass: bracket depth drives indent, plus vertical
    /// whitespace heuristics (blank line before a comment run, blank line
    /// after a dedenting `}`). Token count is unchanged; comment lines are
    /// never merged.
    pub fn respace(&mut self) {
        self.dirty();
        let mut depth: i32 = 0;
        for line in &mut self.lines {
            if line.protected {
                line.indent = 0;
                continue;
            }
            let mut leading_closers = 0i32;
            let mut seen_open = false;
            let mut opens = 0i32;
            let mut closes = 0i32;
            for token in &line.tokens {
                if token.literal {
                    continue;
                }
                for c in token.text.chars() {
                    match c {
                        '(' | '[' | '{' => {
                            opens += 1;
                            seen_open = true;
                        }
                        ')' | ']' | '}' => {
                            closes += 1;
                            if !seen_open {
                                leading_closers += 1;
                            }
                        }
                        _ => {}
                    }
                }
            }
            line.indent = ((depth - leading_closers).max(0) as usize) * self.indent_width;
            depth += opens - closes;
        }

        if !self.vertical {
            return;
        }

        // Blank-line heuristics.
        let mut spaced: Vec<Line> = Vec::with_capacity(self.lines.len());
        let mut prev_dedent_brace = false;
        for line in self.lines.drain(..) {
            let want_blank = if let Some(prev) = spaced.last() {
                let before_comment = line.is_comment() && !prev.is_comment() && !prev.is_blank();
                let after_block = prev_dedent_brace
                    && !line.is_blank()
                    && !line.text().starts_with('}')
                    && !line.text().starts_with(')')
                    && !line.text().starts_with(']');
                !prev.is_blank() && (before_comment || after_block)
            } else {
                false
            };
            if want_blank {
                spaced.push(Line::default());
            }
            prev_dedent_brace = line.text().trim_start().starts_with('}');
            spaced.push(line);
        }
        self.lines = spaced;
    }

    /// Full output text. Idempotent; cached after the first call.
    pub fn render(&mut self) -> String {
        if let Some(cached) = &self.cache {
            return cached.clone();
        }
        let mut end = self.lines.len();
        while end > 0 && self.lines[end - 1].is_blank() {
            end -= 1;
        }
        let mut out = String::new();
        for (i, line) in self.lines[..end].iter().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            if !line.is_blank() {
                for _ in 0..line.indent {
                    out.push(' ');
                }
                for token in &line.tokens {
                    out.push_str(&token.text);
                }
            }
        }
        if self.vertical && !out.is_empty() {
            out.push('\n');
        }
        self.cache = Some(out.clone());
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ser() -> Serializer {
        Serializer::new(80, true)
    }

    #[test]
    fn put_appends_and_splits_on_newlines() {
        let mut s = ser();
        s.put("a = ");
        s.put("1\nb = 2");
        assert_eq!(s.render(), "a = 1\nb = 2\n");
    }

    #[test]
    fn puts_ends_the_line() {
        let mut s = ser();
        s.puts("first;");
        s.put("second;");
        assert_eq!(s.render(), "first;\nsecond;\n");
    }

    #[test]
    fn sput_starts_fresh_line_once() {
        let mut s = ser();
        s.put("x");
        s.sput("}");
        s.sput("done");
        assert_eq!(s.render(), "x\n}\ndone\n");
    }

    #[test]
    fn capture_rolls_back_the_buffer() {
        let mut s = ser();
        s.put("keep");
        let text = s.capture(|s| {
            s.put("probe");
            s.newline();
            s.put("more");
        });
        assert_eq!(text, "probe\nmore");
        assert_eq!(s.render(), "keep\n");
    }

    #[test]
    fn wrap_stays_inline_for_short_blocks() {
        let mut s = ser();
        s.wrap("(", ")", |s| s.put("1, 2"));
        assert_eq!(s.render(), "(1, 2)\n");
    }

    #[test]
    fn wrap_closes_on_own_line_for_multiline_blocks() {
        let mut s = ser();
        s.wrap("{", "}", |s| {
            s.newline();
            s.puts("a();");
        });
        s.respace();
        assert_eq!(s.render(), "{\n  a();\n}\n");
    }

    #[test]
    fn respace_indents_by_bracket_depth() {
        let mut s = ser();
        s.puts("function f() {");
        s.puts("if (x) {");
        s.puts("g();");
        s.puts("}");
        s.puts("}");
        s.respace();
        assert_eq!(
            s.render(),
            "function f() {\n  if (x) {\n    g();\n  }\n}\n"
        );
    }

    #[test]
    fn respace_ignores_brackets_inside_literals() {
        let mut s = ser();
        s.put("let x = ");
        s.put_literal("\"({[\"");
        s.newline();
        s.puts("done();");
        s.respace();
        assert_eq!(s.render(), "let x = \"({[\"\ndone();\n");
    }

    #[test]
    fn respace_preserves_token_count() {
        let mut s = ser();
        s.puts("a() {");
        s.puts("// note");
        s.puts("b;");
        s.puts("}");
        let count_before: usize = s.lines().iter().map(|l| l.tokens.len()).sum();
        s.respace();
        let count_after: usize = s.lines().iter().map(|l| l.tokens.len()).sum();
        assert_eq!(count_before, count_after);
    }

    #[test]
    fn respace_inserts_blank_before_comment_run() {
        let mut s = ser();
        s.puts("a;");
        s.puts("// one");
        s.puts("// two");
        s.puts("b;");
        s.respace();
        assert_eq!(s.render(), "a;\n\n// one\n// two\nb;\n");
    }

    #[test]
    fn render_is_idempotent() {
        let mut s = ser();
        s.puts("x = 1;");
        let first = s.render();
        let second = s.render();
        assert_eq!(first, second);
    }

    #[test]
    fn insert_line_splices_at_mark() {
        let mut s = ser();
        s.puts("function f() {");
        let mark = s.mark();
        s.puts("x = 1;");
        s.sput("}");
        s.insert_line(mark, "let x;");
        s.respace();
        assert_eq!(s.render(), "function f() {\n  let x;\n  x = 1;\n}\n");
    }

    #[test]
    fn non_vertical_output_has_no_trailing_newline() {
        let mut s = Serializer::new(80, false);
        s.put("x = 1");
        assert_eq!(s.render(), "x = 1");
    }

    #[test]
    fn empty_buffer_renders_empty() {
        let mut s = ser();
        assert_eq!(s.render(), "");
    }
}
