mod common;

use carmine::sourcemap::{decode_mappings, ErbContext, ErbSpan};
use carmine::{convert, Options};

fn mappings(conversion: &carmine::Conversion) -> Vec<carmine::sourcemap::Segment> {
    decode_mappings(conversion.sourcemap["mappings"].as_str().unwrap())
}

#[test]
fn sourcemap_has_the_v3_shape() {
    let conversion = convert("x = 1\n", &Options::default()).unwrap();
    let map = &conversion.sourcemap;
    assert_eq!(map["version"], 3);
    assert_eq!(map["file"], "(string)");
    assert_eq!(map["sources"][0], "(string)");
    assert!(map["mappings"].as_str().is_some());
}

#[test]
fn file_option_names_the_map() {
    let options = Options {
        file: "app.rb".to_string(),
        ..Options::default()
    };
    let conversion = convert("x = 1\n", &options).unwrap();
    assert_eq!(conversion.sourcemap["file"], "app.rb");
    assert_eq!(conversion.sourcemap["sources"][0], "app.rb");
}

#[test]
fn assignments_map_back_to_their_lines() {
    let conversion = convert("a = 1\nb = 2\nc = 3\n", &Options::default()).unwrap();
    let segments = mappings(&conversion);
    for line in 0..3 {
        assert!(
            segments
                .iter()
                .any(|s| s.out_line == line && s.src_line == line as i64),
            "line {} missing from {:?}",
            line,
            segments
        );
    }
}

#[test]
fn columns_are_monotonic_within_each_line() {
    let source = "total = price * count + tax\n";
    let conversion = convert(source, &Options::default()).unwrap();
    let segments = mappings(&conversion);
    let mut last_line = usize::MAX;
    let mut last_col = -1i64;
    for seg in &segments {
        if seg.out_line != last_line {
            last_line = seg.out_line;
            last_col = -1;
        }
        assert!(seg.out_col > last_col, "{:?}", segments);
        last_col = seg.out_col;
    }
}

#[test]
fn source_indices_stay_in_range() {
    let conversion =
        convert("a = 1\nif a > 0\n  b = a\nend\n", &Options::default()).unwrap();
    let source_count = conversion.sourcemap["sources"].as_array().unwrap().len() as i64;
    for seg in mappings(&conversion) {
        assert!(seg.src_idx >= 0 && seg.src_idx < source_count);
        assert!(seg.src_line >= 0);
    }
}

#[test]
fn assignment_names_are_recorded() {
    let conversion = convert("count = 1\n", &Options::default()).unwrap();
    let names = conversion.sourcemap["names"].as_array().unwrap();
    assert!(
        names.iter().any(|n| n == "count"),
        "{:?}",
        conversion.sourcemap
    );
}

#[test]
fn empty_program_has_empty_mappings() {
    let conversion = convert("", &Options::default()).unwrap();
    assert_eq!(conversion.sourcemap["mappings"], "");
    assert_eq!(
        conversion.sourcemap["names"].as_array().unwrap().len(),
        0
    );
}

#[test]
fn erb_spans_translate_positions() {
    // The Ruby extraction "name" begins at offset 0; in the template it sits
    // inside `<%= %>` on the second line.
    let erb_source = "<p>\n<%= name %></p>\n";
    let options = Options {
        file: "view.erb".to_string(),
        erb: Some(ErbContext {
            file: "view.erb".to_string(),
            source: erb_source.to_string(),
            spans: vec![ErbSpan {
                ruby_start: 0,
                ruby_end: 4,
                erb_start: 8,
                erb_end: 12,
            }],
        }),
        ..Options::default()
    };
    let conversion = convert("name\n", &options).unwrap();
    let segments = mappings(&conversion);
    assert!(
        segments.iter().any(|s| s.src_line == 1),
        "expected template line 1 in {:?}",
        segments
    );
}
