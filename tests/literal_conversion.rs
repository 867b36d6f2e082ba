mod common;

use common::{js, js_es};

#[test]
fn integers_pass_through() {
    assert_eq!(js("x = 42"), "let x = 42;");
}

#[test]
fn floats_keep_a_decimal_point() {
    assert_eq!(js("x = 1.5"), "let x = 1.5;");
}

#[test]
fn arithmetic_precedence_is_preserved() {
    assert_eq!(js("x = 1 + 2 * 3"), "let x = 1 + 2 * 3;");
    assert_eq!(js("x = (1 + 2) * 3"), "let x = (1 + 2) * 3;");
}

#[test]
fn exponent_operator_gated_on_es2016() {
    assert!(js("x = a ** 2").contains("a ** 2"));
    assert!(js_es("x = a ** 2", 2015).contains("Math.pow(a, 2)"));
}

#[test]
fn double_quoted_strings_emit_double_quoted() {
    assert_eq!(js("s = \"hello\""), "let s = \"hello\";");
}

#[test]
fn single_quoted_strings_normalise() {
    assert_eq!(js("s = 'plain'"), "let s = \"plain\";");
}

#[test]
fn string_escapes_survive() {
    assert_eq!(js("s = \"a\\nb\""), "let s = \"a\\nb\";");
}

#[test]
fn symbols_lower_to_strings() {
    assert_eq!(js("s = :ready"), "let s = \"ready\";");
}

#[test]
fn interpolation_becomes_a_template_literal() {
    let out = js("name = \"world\"\ngreeting = \"hello #{name}\"\n");
    assert!(out.contains("let greeting = `hello ${name}`;"), "{}", out);
}

#[test]
fn nullish_to_s_wraps_interpolations() {
    let options = carmine::Options {
        nullish_to_s: true,
        ..carmine::Options::default()
    };
    let out = common::convert_with("s = \"v: #{value}\"", &options).code;
    assert!(out.contains("${value ?? \"\"}"), "{}", out);
}

#[test]
fn static_string_concatenation_folds() {
    assert_eq!(js("s = \"foo\" + \"bar\""), "let s = \"foobar\";");
}

#[test]
fn arrays_and_hashes() {
    assert_eq!(js("a = [1, 2, 3]"), "let a = [1, 2, 3];");
    assert_eq!(js("h = {a: 1, b: 2}"), "let h = { a: 1, b: 2 };");
}

#[test]
fn word_arrays_expand() {
    assert_eq!(js("a = %w[x y]"), "let a = [\"x\", \"y\"];");
}

#[test]
fn splats_spread() {
    let out = js("a = [1, *rest]");
    assert!(out.contains("[1, ...rest]"), "{}", out);
}

#[test]
fn first_class_ranges_need_the_runtime_class() {
    let out = js("r = 1..5");
    assert!(out.contains("new $Range(1, 5)"), "{}", out);
    assert!(out.contains("class $Range"), "{}", out);
    let exclusive = js("r = 1...5");
    assert!(exclusive.contains("new $Range(1, 5, true)"), "{}", exclusive);
}

#[test]
fn range_to_a_expands_inline() {
    assert!(js("a = (0..4).to_a").contains("[...Array(5).keys()]"));
    assert!(js("a = (2..5).to_a").contains("Array.from({length: 4}, (_, i) => i + 2)"));
}

#[test]
fn range_include_compares() {
    let out = js("ok = (1..10).include?(n)");
    assert!(out.contains("n >= 1 && n <= 10"), "{}", out);
}

#[test]
fn index_and_slice() {
    assert_eq!(js("v = xs[0]"), "let v = xs[0];");
    assert!(js("v = xs[1..3]").contains("xs.slice(1, 4)"));
    assert!(js("v = xs[1...3]").contains("xs.slice(1, 3)"));
}

#[test]
fn regexp_literal_passes_through() {
    assert!(js("m = s =~ /ab+c/").contains("/ab+c/.test(s)"));
}

#[test]
fn regexp_with_slash_falls_back_to_constructor() {
    let out = js("m = s =~ %r{a/b}");
    assert!(out.contains("new RegExp(\"a/b\")"), "{}", out);
}

#[test]
fn regexp_anchors_normalise() {
    let out = js("m = s =~ /\\Afoo\\z/");
    assert!(out.contains("/^foo$/"), "{}", out);
}

#[test]
fn negative_match_negates() {
    assert!(js("m = s !~ /x/").contains("!/x/.test(s)"));
}

#[test]
fn heredocs_with_enough_lines_stay_multiline() {
    let source = "text = <<~EOS\n  alpha line\n  beta line\n  gamma line\n  delta line\n  epsilon line\nEOS\n";
    let out = js(source);
    assert!(out.contains("alpha line\n"), "{}", out);
    assert!(!out.contains("alpha line\\n"), "{}", out);
}

#[test]
fn short_strings_escape_newlines() {
    let out = js("s = \"a\nb\"");
    assert!(out.contains("\"a\\nb\""), "{}", out);
}
