mod common;

use common::{js, js_es};

#[test]
fn first_assignment_declares() {
    assert_eq!(js("x = 1"), "let x = 1;");
}

#[test]
fn reassignment_does_not_redeclare() {
    let out = js("x = 1\nx = 2\n");
    assert_eq!(out, "let x = 1;\nx = 2;\n");
}

#[test]
fn assignment_inside_a_branch_hoists() {
    let out = js("if ready\n  total = 1\nend\ntotal\n");
    assert!(out.starts_with("let total;\n"), "{}", out);
    assert!(out.contains("total = 1;"), "{}", out);
    assert!(!out.contains("let total = 1"), "{}", out);
}

#[test]
fn balanced_masgn_destructures() {
    let out = js("a, b = pair");
    assert_eq!(out, "let [a, b] = pair;");
}

#[test]
fn trailing_splat_masgn_uses_rest() {
    let out = js("first, *rest = items");
    assert_eq!(out, "let [first, ...rest] = items;");
}

#[test]
fn middle_splat_masgn_drains_a_temp() {
    let out = js("a, *mid, b = arr\n");
    assert!(out.contains("$masgn_temp = arr.slice();"), "{}", out);
    assert!(out.contains("a = $masgn_temp.shift();"), "{}", out);
    assert!(out.contains("b = $masgn_temp.pop();"), "{}", out);
    assert!(out.contains("mid = $masgn_temp;"), "{}", out);
}

#[test]
fn operator_assignment() {
    let out = js("n = 0\nn += 2\n");
    assert!(out.contains("n += 2;"), "{}", out);
}

#[test]
fn or_assignment_prefers_logical_assignment_operators() {
    let out = js_es("cache ||= {}", 2021);
    assert!(out.contains("cache ??= {}"), "{}", out);
    let older = js_es("cache ||= {}", 2015);
    assert!(older.contains("cache = cache || {}"), "{}", older);
}

#[test]
fn and_assignment() {
    let out = js_es("x &&= y", 2021);
    assert!(out.contains("x &&= y"), "{}", out);
}

#[test]
fn indexed_and_attribute_assignment() {
    assert_eq!(js("xs[0] = 5"), "xs[0] = 5;");
    assert_eq!(js("obj.name = \"x\""), "obj.name = \"x\";");
}

#[test]
fn blocks_become_trailing_arrows() {
    let out = js("sum = [1, 2].reduce(0) { |acc, n| acc + n }");
    assert_eq!(out, "let sum = [1, 2].reduce(0, (acc, n) => acc + n);");
}

#[test]
fn multi_statement_blocks_brace_and_return() {
    let out = js("out = items.map do |item|\n  doubled = item * 2\n  doubled\nend\n");
    assert!(out.contains("items.map((item) => {"), "{}", out);
    assert!(out.contains("let doubled = item * 2;"), "{}", out);
    assert!(out.contains("return doubled;"), "{}", out);
}

#[test]
fn block_touching_ivars_uses_function_with_self_alias() {
    let source = "class Tally\n  def count(items)\n    items.each do |item|\n      @total += item\n    end\n  end\nend\n";
    let out = js_es(source, 2022);
    assert!(out.contains("let self = this;"), "{}", out);
    assert!(out.contains("function (item) {"), "{}", out);
    assert!(out.contains("self.#total += item"), "{}", out);
}

#[test]
fn it_parameter_is_synthesised() {
    let out = js("names.map { it.upcase }");
    assert!(out.contains("names.map(it => it.upcase)"), "{}", out);
}

#[test]
fn numbered_parameters_are_synthesised() {
    let out = js("pairs.map { _1 + _2 }");
    assert!(out.contains("(_1, _2) =>"), "{}", out);
}

#[test]
fn symbol_block_pass_becomes_an_arrow() {
    let out = js("names.map(&:upcase)");
    assert!(out.contains("names.map((item) => item.upcase())"), "{}", out);
}

#[test]
fn lambda_is_just_a_function_value() {
    let out = js("double = lambda { |x| x * 2 }");
    assert!(out.contains("let double = "), "{}", out);
    assert!(out.contains("x => x * 2"), "{}", out);
}

#[test]
fn arrow_lambda_syntax() {
    let out = js("double = ->(x) { x * 2 }");
    assert!(out.contains("x => x * 2"), "{}", out);
}

#[test]
fn proc_call_invokes_directly() {
    let out = js("f = proc { |x| x }\nf.call(3)\n");
    assert!(out.contains("f(3);"), "{}", out);
}

#[test]
fn tap_returns_the_receiver() {
    let out = js("v = 5.tap { |n| note(n) }");
    assert!(out.contains("note(n);"), "{}", out);
    assert!(out.contains("return n;"), "{}", out);
    assert!(out.contains("})(5)"), "{}", out);
}

#[test]
fn standalone_defs_are_functions() {
    let out = js("def add(a, b = 1)\n  a + b\nend\n");
    assert!(out.contains("function add(a, b = 1) {"), "{}", out);
    // Plain defs do not auto-return; that is a filter concern.
    assert!(out.contains("a + b;"), "{}", out);
}

#[test]
fn endless_defs_return_their_expression() {
    let out = js("def square(x) = x * x\n");
    assert!(out.contains("function square(x) {"), "{}", out);
    assert!(out.contains("return x * x;"), "{}", out);
}

#[test]
fn keyword_arguments_destructure_the_options() {
    let out = js("def greet(name, greeting: \"hi\")\n  greeting\nend\n");
    assert!(
        out.contains("function greet(name, {greeting = \"hi\"} = {}) {"),
        "{}",
        out
    );
}

#[test]
fn keyword_rest_uses_the_kwargs_prologue() {
    let out = js("def config(name, **opts)\n  opts\nend\n");
    assert!(out.contains("function config(...args) {"), "{}", out);
    assert!(out.contains("let $kwargs = args.at(-1);"), "{}", out);
    assert!(
        out.contains("$kwargs.constructor === Object) args.pop(); else $kwargs = {};"),
        "{}",
        out
    );
    assert!(out.contains("let [name] = args;"), "{}", out);
    assert!(out.contains("let {...opts} = $kwargs;"), "{}", out);
}

#[test]
fn implicit_yield_adds_a_callable_parameter() {
    let out = js("def each_twice\n  yield 1\n  yield 2\nend\n");
    assert!(
        out.contains("function each_twice(_implicitBlockYield = null) {"),
        "{}",
        out
    );
    assert!(out.contains("_implicitBlockYield(1);"), "{}", out);
}

#[test]
fn named_block_parameter_receives_yield() {
    let out = js("def run(&work)\n  yield\nend\n");
    assert!(out.contains("function run(work) {"), "{}", out);
    assert!(out.contains("work();"), "{}", out);
}

#[test]
fn splat_parameters_spread() {
    let out = js("def log_all(*msgs)\n  msgs\nend\n");
    assert!(out.contains("function log_all(...msgs) {"), "{}", out);
}

#[test]
fn async_defs_get_the_keyword() {
    let out = js("async def fetch_user(id)\n  id\nend\n");
    assert!(out.contains("async function fetch_user(id) {"), "{}", out);
}

#[test]
fn safe_navigation_uses_optional_chaining() {
    let out = js_es("user&.name", 2020);
    assert!(out.contains("user?.name"), "{}", out);
}

#[test]
fn safe_navigation_guards_below_es2020() {
    let out = js_es("user&.name", 2019);
    assert!(out.contains("user == null ? null : user.name"), "{}", out);
}

#[test]
fn comparison_spaceship_expands_to_a_ternary() {
    let out = js("ord = (a <=> b)");
    assert!(out.contains("a < b ? -1 : a > b ? 1 : 0"), "{}", out);
}

#[test]
fn append_chain_collapses_to_push() {
    let out = js("log = []\nlog << \"a\" << \"b\"\n");
    assert!(out.contains("log.push(\"a\", \"b\");"), "{}", out);
}

#[test]
fn instance_checks() {
    assert!(js("f = x.is_a?(Array)").contains("x instanceof Array"));
    assert!(js("f = x.instance_of?(Array)").contains("x.constructor === Array"));
}
