mod common;

use common::js;

#[test]
fn if_else_chains() {
    let out = js("if x > 1\n  puts \"big\"\nelse\n  puts \"small\"\nend\n");
    assert!(out.contains("if (x > 1) {"), "{}", out);
    assert!(out.contains("} else {"), "{}", out);
    assert!(out.contains("puts(\"big\");"), "{}", out);
}

#[test]
fn elsif_becomes_else_if() {
    let out = js("if a\n  1\nelsif b\n  2\nelse\n  3\nend\n");
    assert!(out.contains("} else if (b) {"), "{}", out);
}

#[test]
fn unless_inverts() {
    let out = js("unless done\n  work\nend\n");
    assert!(out.contains("if (!(done)) {"), "{}", out);
}

#[test]
fn modifier_if() {
    let out = js("work if ready\n");
    assert!(out.contains("if (ready) {"), "{}", out);
}

#[test]
fn ternary_expression() {
    assert_eq!(js("x = a ? 1 : 2"), "let x = a ? 1 : 2;");
}

#[test]
fn while_loop() {
    let out = js("i = 0\nwhile i < 5\n  i += 1\nend\n");
    assert!(out.contains("while (i < 5) {"), "{}", out);
    assert!(out.contains("i += 1;"), "{}", out);
}

#[test]
fn until_negates() {
    let out = js("until ready\n  wait\nend\n");
    assert!(out.contains("while (!(ready)) {"), "{}", out);
}

#[test]
fn post_condition_loop_runs_body_first() {
    let out = js("begin\n  step\nend while more\n");
    assert!(out.contains("do {"), "{}", out);
    assert!(out.contains("} while (more)"), "{}", out);
}

#[test]
fn range_each_lowers_to_counted_for() {
    let out = js("(1..n).each { |i| puts i }\n");
    assert!(out.contains("for (let i = 1; i <= n; i++) {"), "{}", out);
    assert!(out.contains("puts(i);"), "{}", out);
}

#[test]
fn exclusive_range_each_uses_strict_comparison() {
    let out = js("(0...n).each { |i| touch(i) }\n");
    assert!(out.contains("for (let i = 0; i < n; i++) {"), "{}", out);
}

#[test]
fn range_step_changes_the_increment() {
    let out = js("(0..10).step(2) { |i| mark(i) }\n");
    assert!(out.contains("for (let i = 0; i <= 10; i += 2) {"), "{}", out);
}

#[test]
fn for_loop_over_a_collection() {
    let out = js("for x in items\n  use(x)\nend\n");
    assert!(out.contains("for (let x of items) {"), "{}", out);
}

#[test]
fn static_case_emits_switch() {
    let out = js("case n\nwhen 1 then one\nwhen 2 then two\nelse many\nend\n");
    assert!(out.contains("switch (n) {"), "{}", out);
    assert!(out.contains("case 1:"), "{}", out);
    assert!(out.contains("break;"), "{}", out);
    assert!(out.contains("default:"), "{}", out);
}

#[test]
fn case_with_ranges_tests_against_true() {
    let out = js(
        "case x\nwhen 1..10 then :low\nwhen 11..100 then :mid\nelse :high\nend\n",
    );
    assert!(out.contains("switch (true) {"), "{}", out);
    assert!(out.contains("case x >= 1 && x <= 10:"), "{}", out);
    assert!(out.contains("case x >= 11 && x <= 100:"), "{}", out);
    assert!(out.contains("\"low\";"), "{}", out);
    assert!(out.contains("default:"), "{}", out);
    assert!(out.contains("\"high\";"), "{}", out);
}

#[test]
fn case_with_multiple_values_stacks_labels() {
    let out = js("case c\nwhen 1, 2 then low\nend\n");
    assert!(out.contains("case 1:"), "{}", out);
    assert!(out.contains("case 2:"), "{}", out);
}

#[test]
fn rescue_with_class_list_chains_instanceof() {
    let out = js(
        "begin\n  risky\nrescue ArgumentError, TypeError => e\n  handle(e)\nend\n",
    );
    assert!(out.contains("try {"), "{}", out);
    assert!(
        out.contains("$err instanceof ArgumentError || $err instanceof TypeError"),
        "{}",
        out
    );
    assert!(out.contains("let e = $err;"), "{}", out);
    assert!(out.contains("throw $err;"), "{}", out);
}

#[test]
fn bare_rescue_binds_the_variable_directly() {
    let out = js("begin\n  risky\nrescue => e\n  handle(e)\nend\n");
    assert!(out.contains("catch (e) {"), "{}", out);
}

#[test]
fn ensure_becomes_finally() {
    let out = js("begin\n  risky\nrescue => e\n  note(e)\nensure\n  cleanup\nend\n");
    assert!(out.contains("} finally {"), "{}", out);
    assert!(out.contains("cleanup;"), "{}", out);
}

#[test]
fn rescue_else_runs_only_without_exception() {
    let out = js("begin\n  a\nrescue => e\n  b\nelse\n  c\nend\n");
    assert!(out.contains("$no_exception = false;"), "{}", out);
    assert!(out.contains("$no_exception = true;"), "{}", out);
    assert!(out.contains("if ($no_exception) {"), "{}", out);
}

#[test]
fn retry_loops_the_try_block() {
    let out = js(
        "attempts = 0\nbegin\n  connect\nrescue\n  attempts += 1\n  retry if attempts < 3\nend\n",
    );
    assert!(out.contains("while (true) {"), "{}", out);
    assert!(out.contains("continue"), "{}", out);
    assert!(out.contains("break;"), "{}", out);
}

#[test]
fn redo_reruns_the_body_without_the_condition() {
    let out = js("while busy\n  redo if flaky\nend\n");
    assert!(out.contains("let redo$ = false;"), "{}", out);
    assert!(out.contains("do {"), "{}", out);
    assert!(out.contains("} while (redo$);"), "{}", out);
    assert!(out.contains("redo$ = true"), "{}", out);
}

#[test]
fn loop_with_break_value_hoists_a_result() {
    let out = js("loop do\n  break 7 if done\nend\n");
    assert!(out.contains("let _loop_result;"), "{}", out);
    assert!(out.contains("while (true) {"), "{}", out);
    assert!(out.contains("_loop_result = 7; break"), "{}", out);
}

#[test]
fn raise_lowers_to_throw() {
    assert!(js("raise \"boom\"\n").contains("throw new Error(\"boom\")"));
    let typed = js("raise ArgumentError, \"bad\"\n");
    assert!(typed.contains("throw new ArgumentError(\"bad\")"), "{}", typed);
}

#[test]
fn rescue_modifier_wraps_inline() {
    let out = js("v = risky rescue fallback\n");
    // The modifier form parses as an expression assignment of a guarded
    // begin; both the try and the fallback must survive.
    assert!(out.contains("try"), "{}", out);
    assert!(out.contains("fallback"), "{}", out);
}

#[test]
fn case_in_patterns_bind_and_guard() {
    let out = js(
        "case msg\nin {type: \"click\", x:}\n  handle(x)\nelse\n  ignore\nend\n",
    );
    assert!(out.contains("$cm = msg"), "{}", out);
    assert!(out.contains("\"type\" in $cm"), "{}", out);
    assert!(out.contains("let x = $cm.x;"), "{}", out);
}
