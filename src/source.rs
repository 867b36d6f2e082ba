use std::fmt;

/// Byte-offset range into a source buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

/// Index of a buffer inside a [`SourceSet`].
///
/// ERB compilation feeds multiple logical sources into one conversion, so a
/// location always names its buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SourceId(pub u32);

/// Location record attached to AST nodes.
///
/// `selector` covers a method-call name, `name` covers a `def`/`defs` name.
/// `has_end` distinguishes `def f; end` from the endless `def f = expr` form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Loc {
    pub span: Span,
    pub source: SourceId,
    pub selector: Option<Span>,
    pub name: Option<Span>,
    pub has_end: bool,
}

impl Loc {
    pub fn new(source: SourceId, start: usize, end: usize) -> Self {
        Loc {
            span: Span::new(start, end),
            source,
            selector: None,
            name: None,
            has_end: false,
        }
    }

    pub fn with_selector(mut self, sel: Span) -> Self {
        self.selector = Some(sel);
        self
    }

    pub fn with_name(mut self, name: Span) -> Self {
        self.name = Some(name);
        self
    }

    pub fn with_end(mut self, has_end: bool) -> Self {
        self.has_end = has_end;
        self
    }
}

/// One original source text plus the offset tables the rest of the compiler
/// needs: line starts for line/column reporting, and a byte-to-UTF-16 table
/// because the parser reports byte offsets while JavaScript tooling indexes
/// in UTF-16 code units.
pub struct SourceBuffer {
    name: String,
    text: String,
    line_offsets: Vec<usize>,
    utf16_offsets: Vec<u32>,
}

impl SourceBuffer {
    pub fn new(name: &str, text: &str) -> Self {
        let mut line_offsets = vec![0];
        for (i, b) in text.bytes().enumerate() {
            if b == b'\n' {
                line_offsets.push(i + 1);
            }
        }

        let mut utf16_offsets = vec![0u32; text.len() + 1];
        let mut units = 0u32;
        for (i, c) in text.char_indices() {
            for b in 0..c.len_utf8() {
                utf16_offsets[i + b] = units;
            }
            units += c.len_utf16() as u32;
        }
        utf16_offsets[text.len()] = units;

        SourceBuffer {
            name: name.to_string(),
            text: text.to_string(),
            line_offsets,
            utf16_offsets,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Zero-based line index for a byte position. Monotonic in `pos`.
    pub fn line_for_position(&self, pos: usize) -> usize {
        match self.line_offsets.binary_search(&pos) {
            Ok(line) => line,
            Err(next) => next - 1,
        }
    }

    /// Zero-based column for a byte position, in UTF-16 code units.
    pub fn column_for_position(&self, pos: usize) -> usize {
        let line = self.line_for_position(pos);
        let line_start = self.line_offsets[line];
        (self.byte_to_char_offset(pos) - self.byte_to_char_offset(line_start)) as usize
    }

    /// UTF-16 code-unit offset for a UTF-8 byte offset.
    pub fn byte_to_char_offset(&self, pos: usize) -> u32 {
        self.utf16_offsets[pos.min(self.text.len())]
    }

    /// The raw byte at `pos`, if in range. The `is_method` heuristic peeks at
    /// the byte immediately after a selector to detect `(`.
    pub fn byte_at(&self, pos: usize) -> Option<u8> {
        self.text.as_bytes().get(pos).copied()
    }

    pub fn slice(&self, span: Span) -> &str {
        &self.text[span.start.min(self.text.len())..span.end.min(self.text.len())]
    }
}

/// All buffers contributing to one conversion.
#[derive(Default)]
pub struct SourceSet {
    buffers: Vec<SourceBuffer>,
}

impl SourceSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, name: &str, text: &str) -> SourceId {
        self.buffers.push(SourceBuffer::new(name, text));
        SourceId(self.buffers.len() as u32 - 1)
    }

    pub fn get(&self, id: SourceId) -> &SourceBuffer {
        &self.buffers[id.0 as usize]
    }

    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SourceBuffer> {
        self.buffers.iter()
    }

    /// Formats a position as `file:line:column` (one-based, the shape users
    /// see in error messages).
    pub fn describe(&self, loc: &Loc) -> String {
        let buf = self.get(loc.source);
        format!(
            "{}:{}:{}",
            buf.name(),
            buf.line_for_position(loc.span.start) + 1,
            buf.column_for_position(loc.span.start) + 1
        )
    }
}

impl fmt::Debug for SourceBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SourceBuffer({:?}, {} bytes)", self.name, self.text.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_for_position_finds_lines() {
        let buf = SourceBuffer::new("t.rb", "a = 1\nb = 2\nc = 3\n");
        assert_eq!(buf.line_for_position(0), 0);
        assert_eq!(buf.line_for_position(5), 0);
        assert_eq!(buf.line_for_position(6), 1);
        assert_eq!(buf.line_for_position(12), 2);
    }

    #[test]
    fn column_counts_utf16_units() {
        // "é" is 2 UTF-8 bytes but 1 UTF-16 unit.
        let buf = SourceBuffer::new("t.rb", "é = 1");
        assert_eq!(buf.column_for_position(0), 0);
        // byte 2 is the space after "é"
        assert_eq!(buf.column_for_position(2), 1);
    }

    #[test]
    fn byte_to_char_offset_is_monotonic() {
        let buf = SourceBuffer::new("t.rb", "aé🎉b");
        let mut prev = 0;
        for i in 0..=buf.text().len() {
            let off = buf.byte_to_char_offset(i);
            assert!(off >= prev);
            prev = off;
        }
        // 'a' = 1 unit, 'é' = 1, '🎉' = 2, 'b' = 1
        assert_eq!(buf.byte_to_char_offset(buf.text().len()), 5);
    }

    #[test]
    fn byte_at_peeks_raw_bytes() {
        let buf = SourceBuffer::new("t.rb", "foo(1)");
        assert_eq!(buf.byte_at(3), Some(b'('));
        assert_eq!(buf.byte_at(99), None);
    }

    #[test]
    fn describe_is_one_based() {
        let mut set = SourceSet::new();
        let id = set.add("app.rb", "x = 1\ny = 2");
        let loc = Loc::new(id, 6, 7);
        assert_eq!(set.describe(&loc), "app.rb:2:1");
    }
}
