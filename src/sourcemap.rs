//! Source Map v3 emission.
//!
//! After serialization, a pass over the token stream turns per-token origins
//! into VLQ-encoded mapping segments: five-field records
//! `[outColumn, sourceIndex, sourceLine, sourceColumn, nameIndex?]`, one `;`
//! per output line, all fields delta-encoded. For templating hosts (ERB) the
//! emitter first translates Ruby-space offsets back to the template through a
//! caller-supplied span list.

use serde::Deserialize;
use serde_json::{json, Value as Json};

use crate::serializer::Serializer;
use crate::source::{SourceBuffer, SourceId, SourceSet};

const BASE64: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

/// Appends one signed value in base64 VLQ form.
pub fn vlq_encode(value: i64, out: &mut String) {
    let mut vlq: u64 = if value < 0 {
        (((-value) as u64) << 1) | 1
    } else {
        (value as u64) << 1
    };
    loop {
        let mut digit = (vlq & 0b1_1111) as usize;
        vlq >>= 5;
        if vlq != 0 {
            digit |= 0b10_0000;
        }
        out.push(BASE64[digit] as char);
        if vlq == 0 {
            break;
        }
    }
}

/// One extracted-Ruby ↔ template correspondence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ErbSpan {
    pub ruby_start: usize,
    pub ruby_end: usize,
    pub erb_start: usize,
    pub erb_end: usize,
}

/// Template context for preprocessed sources: the template's own name and
/// text (for line/column lookup) plus the span list.
#[derive(Debug, Clone, Deserialize)]
pub struct ErbContext {
    pub file: String,
    pub source: String,
    pub spans: Vec<ErbSpan>,
}

impl ErbContext {
    fn translate(&self, pos: usize) -> Option<usize> {
        for span in &self.spans {
            if pos >= span.ruby_start && pos <= span.ruby_end {
                return Some(span.erb_start + (pos - span.ruby_start));
            }
        }
        None
    }
}

/// Builds the Source Map v3 object for a finished serializer.
pub fn build(
    ser: &Serializer,
    sources: &SourceSet,
    file: &str,
    erb: Option<&ErbContext>,
) -> Json {
    let erb_buffer = erb.map(|cx| SourceBuffer::new(&cx.file, &cx.source));

    let mut source_names: Vec<String> = Vec::new();
    let mut source_index: std::collections::HashMap<SourceId, usize> =
        std::collections::HashMap::new();
    let mut names: Vec<String> = Vec::new();
    let mut name_index: std::collections::HashMap<String, usize> =
        std::collections::HashMap::new();

    let mut mappings = String::new();
    let mut prev_src: i64 = 0;
    let mut prev_line: i64 = 0;
    let mut prev_col: i64 = 0;
    let mut prev_name: i64 = 0;

    let mut rendered_any = false;
    for line in ser.lines() {
        if rendered_any {
            mappings.push(';');
        }
        rendered_any = true;

        let mut out_col: usize = if line.tokens.is_empty() { 0 } else { line.indent };
        let mut prev_out_col: i64 = 0;
        let mut first_segment = true;
        let mut last_origin: Option<(SourceId, usize)> = None;

        for token in &line.tokens {
            if let Some(origin) = token.origin {
                let same = last_origin == Some((origin.source, origin.pos)) && !origin.with_name;
                if !same {
                    last_origin = Some((origin.source, origin.pos));

                    let (src_idx, src_line, src_col) = match (&erb, &erb_buffer) {
                        (Some(cx), Some(buf)) => {
                            let pos = cx
                                .translate(origin.pos)
                                .unwrap_or(origin.pos.min(cx.source.len()));
                            (
                                intern_source(&cx.file, &mut source_names, &mut source_index, origin.source),
                                buf.line_for_position(pos),
                                buf.column_for_position(pos),
                            )
                        }
                        _ => {
                            let buf = sources.get(origin.source);
                            (
                                intern_source(buf.name(), &mut source_names, &mut source_index, origin.source),
                                buf.line_for_position(origin.pos),
                                buf.column_for_position(origin.pos),
                            )
                        }
                    };

                    if !first_segment {
                        mappings.push(',');
                    }
                    first_segment = false;

                    vlq_encode(out_col as i64 - prev_out_col, &mut mappings);
                    prev_out_col = out_col as i64;
                    vlq_encode(src_idx as i64 - prev_src, &mut mappings);
                    prev_src = src_idx as i64;
                    vlq_encode(src_line as i64 - prev_line, &mut mappings);
                    prev_line = src_line as i64;
                    vlq_encode(src_col as i64 - prev_col, &mut mappings);
                    prev_col = src_col as i64;

                    if origin.with_name {
                        let name = token.text.trim().to_string();
                        let idx = *name_index.entry(name.clone()).or_insert_with(|| {
                            names.push(name);
                            names.len() - 1
                        });
                        vlq_encode(idx as i64 - prev_name, &mut mappings);
                        prev_name = idx as i64;
                    }
                }
            }
            out_col += token.text.encode_utf16().count();
        }
    }

    // A wholly empty program maps to the empty string.
    if ser.is_empty() {
        mappings.clear();
    }

    json!({
        "version": 3,
        "file": file,
        "sources": source_names,
        "names": names,
        "mappings": mappings,
    })
}

fn intern_source(
    name: &str,
    source_names: &mut Vec<String>,
    index: &mut std::collections::HashMap<SourceId, usize>,
    id: SourceId,
) -> usize {
    *index.entry(id).or_insert_with(|| {
        source_names.push(name.to_string());
        source_names.len() - 1
    })
}

/// Decoded mapping segment, used by tests to check monotonicity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub out_line: usize,
    pub out_col: i64,
    pub src_idx: i64,
    pub src_line: i64,
    pub src_col: i64,
    pub name_idx: Option<i64>,
}

/// Decodes a `mappings` string back into segments.
pub fn decode_mappings(mappings: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut src_idx = 0i64;
    let mut src_line = 0i64;
    let mut src_col = 0i64;
    let mut name_idx = 0i64;
    for (out_line, group) in mappings.split(';').enumerate() {
        let mut out_col = 0i64;
        for seg in group.split(',') {
            if seg.is_empty() {
                continue;
            }
            let fields = decode_vlq(seg);
            out_col += fields[0];
            src_idx += fields[1];
            src_line += fields[2];
            src_col += fields[3];
            let name = if fields.len() > 4 {
                name_idx += fields[4];
                Some(name_idx)
            } else {
                None
            };
            segments.push(Segment {
                out_line,
                out_col,
                src_idx,
                src_line,
                src_col,
                name_idx: name,
            });
        }
    }
    segments
}

fn decode_vlq(seg: &str) -> Vec<i64> {
    let mut fields = Vec::new();
    let mut value: u64 = 0;
    let mut shift = 0;
    for c in seg.bytes() {
        let digit = BASE64.iter().position(|&b| b == c).unwrap_or(0) as u64;
        value |= (digit & 0b1_1111) << shift;
        if digit & 0b10_0000 != 0 {
            shift += 5;
        } else {
            let signed = if value & 1 != 0 {
                -((value >> 1) as i64)
            } else {
                (value >> 1) as i64
            };
            fields.push(signed);
            value = 0;
            shift = 0;
        }
    }
    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serializer::Origin;

    #[test]
    fn vlq_encodes_known_values() {
        let mut out = String::new();
        vlq_encode(0, &mut out);
        assert_eq!(out, "A");
        out.clear();
        vlq_encode(1, &mut out);
        assert_eq!(out, "C");
        out.clear();
        vlq_encode(-1, &mut out);
        assert_eq!(out, "D");
        out.clear();
        vlq_encode(16, &mut out);
        assert_eq!(out, "gB");
    }

    #[test]
    fn vlq_round_trips() {
        for v in [-1000, -16, -1, 0, 1, 15, 16, 31, 32, 1000, 123456] {
            let mut s = String::new();
            vlq_encode(v, &mut s);
            assert_eq!(decode_vlq(&s), vec![v], "value {}", v);
        }
    }

    #[test]
    fn empty_serializer_gives_empty_mappings() {
        let ser = Serializer::new(80, true);
        let sources = SourceSet::new();
        let map = build(&ser, &sources, "out.js", None);
        assert_eq!(map["version"], 3);
        assert_eq!(map["mappings"], "");
    }

    #[test]
    fn tokens_map_back_to_their_lines() {
        let mut sources = SourceSet::new();
        let id = sources.add("t.rb", "a = 1\nb = 2\n");
        let mut ser = Serializer::new(80, true);
        ser.set_origin(Some(Origin { source: id, pos: 0, with_name: false }));
        ser.puts("let a = 1;");
        ser.set_origin(Some(Origin { source: id, pos: 6, with_name: false }));
        ser.puts("let b = 2;");
        let map = build(&ser, &sources, "t.js", None);
        let segments = decode_mappings(map["mappings"].as_str().unwrap());
        assert!(segments.iter().any(|s| s.out_line == 0 && s.src_line == 0));
        assert!(segments.iter().any(|s| s.out_line == 1 && s.src_line == 1));
    }

    #[test]
    fn columns_are_monotonic_within_each_line() {
        let mut sources = SourceSet::new();
        let id = sources.add("t.rb", "x = f(1, 2)\n");
        let mut ser = Serializer::new(80, true);
        ser.set_origin(Some(Origin { source: id, pos: 0, with_name: true }));
        ser.put("x");
        ser.set_origin(Some(Origin { source: id, pos: 4, with_name: false }));
        ser.put(" = f(");
        ser.set_origin(Some(Origin { source: id, pos: 6, with_name: false }));
        ser.put("1, 2)");
        let map = build(&ser, &sources, "t.js", None);
        let segments = decode_mappings(map["mappings"].as_str().unwrap());
        let mut prev = -1;
        for seg in &segments {
            assert!(seg.out_col > prev);
            prev = seg.out_col;
        }
        assert_eq!(map["names"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn erb_context_translates_offsets() {
        let cx = ErbContext {
            file: "view.erb".to_string(),
            source: "<p><%= name %></p>".to_string(),
            spans: vec![ErbSpan { ruby_start: 0, ruby_end: 4, erb_start: 7, erb_end: 11 }],
        };
        assert_eq!(cx.translate(0), Some(7));
        assert_eq!(cx.translate(4), Some(11));
        assert_eq!(cx.translate(99), None);
    }
}
