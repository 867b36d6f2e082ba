mod common;

use carmine::{
    convert, convert_with_filters, Error, Filter, Kind, Node, Options, Processor, Rewrite,
    Truthy, Value,
};
use common::convert_with;

/// A filter that overrides nothing.
struct IdentityFilter;

impl Filter for IdentityFilter {
    fn name(&self) -> &'static str {
        "identity"
    }
}

/// Rewrites `shout(...)` calls to `console.warn(...)`.
struct ShoutFilter;

impl Filter for ShoutFilter {
    fn name(&self) -> &'static str {
        "shout"
    }

    fn handle<'a>(
        &mut self,
        p: &mut Processor<'a, '_>,
        node: &'a Node<'a>,
    ) -> Result<Rewrite<'a>, Error> {
        if node.kind == Kind::Send && node.str_child(1) == Some("shout") {
            let console = p.s(Kind::Const, &[Value::Nil, p.str_val("console")]);
            let mut children = vec![Value::Node(console), p.str_val("warn")];
            children.extend_from_slice(&node.children[2..]);
            let children = p.process_all(&children)?;
            return Ok(Rewrite::Replace(p.s_at(node, Kind::Call, &children)));
        }
        Ok(Rewrite::Pass)
    }
}

/// Prepends an import whenever `fetch_json` is called.
struct AutoImportFilter;

impl Filter for AutoImportFilter {
    fn name(&self) -> &'static str {
        "auto_import"
    }

    fn handle<'a>(
        &mut self,
        p: &mut Processor<'a, '_>,
        node: &'a Node<'a>,
    ) -> Result<Rewrite<'a>, Error> {
        if node.kind.is_send_family() && node.str_child(1) == Some("fetch_json") {
            let name = p.s(Kind::Const, &[Value::Nil, p.str_val("fetch")]);
            let import = p.s(Kind::Import, &[p.str_val("node-fetch"), Value::Node(name)]);
            p.prepend(import);
        }
        Ok(Rewrite::Pass)
    }
}

#[test]
fn identity_filter_changes_nothing() {
    let source = "x = 1\ny = x + 2\n";
    let plain = convert(source, &Options::default()).unwrap().code;
    let filtered =
        convert_with_filters(source, &Options::default(), vec![Box::new(IdentityFilter)])
            .unwrap()
            .code;
    assert_eq!(plain, filtered);
}

#[test]
fn filters_rewrite_matching_sends() {
    let out = convert_with_filters(
        "shout(\"fire\")",
        &Options::default(),
        vec![Box::new(ShoutFilter)],
    )
    .unwrap()
    .code;
    assert!(out.contains("console.warn(\"fire\")"), "{}", out);
}

#[test]
fn filter_imports_land_on_top_deduplicated() {
    let source = "fetch_json(\"/a\")\nfetch_json(\"/b\")\n";
    let out = convert_with_filters(
        source,
        &Options::default(),
        vec![Box::new(AutoImportFilter)],
    )
    .unwrap()
    .code;
    assert!(
        out.starts_with("import fetch from \"node-fetch\";\n"),
        "{}",
        out
    );
    assert_eq!(out.matches("import fetch").count(), 1, "{}", out);
}

#[test]
fn autoimports_off_drops_filter_imports() {
    let options = Options {
        autoimports: false,
        ..Options::default()
    };
    let out = convert_with_filters(
        "fetch_json(\"/a\")\n",
        &options,
        vec![Box::new(AutoImportFilter)],
    )
    .unwrap()
    .code;
    assert!(!out.contains("import"), "{}", out);
}

#[test]
fn conversion_is_deterministic() {
    let source = "class A\n  def go\n    1\n  end\nend\nA.new.go\n";
    let first = convert(source, &Options::default()).unwrap();
    let second = convert(source, &Options::default()).unwrap();
    assert_eq!(first.code, second.code);
    assert_eq!(first.sourcemap, second.sourcemap);
}

#[test]
fn ruby_truthiness_uses_helpers() {
    let options = Options {
        truthy: Truthy::Ruby,
        ..Options::default()
    };
    let out = convert_with("x || default()", &options).code;
    assert!(out.contains("$ror(x, () => default())"), "{}", out);
    assert!(out.contains("let $T = "), "{}", out);
    assert!(out.contains("let $ror = "), "{}", out);
}

#[test]
fn ruby_truthiness_wraps_conditions() {
    let options = Options {
        truthy: Truthy::Ruby,
        ..Options::default()
    };
    let out = convert_with("if name\n  greet\nend\n", &options).code;
    assert!(out.contains("if ($T(name)) {"), "{}", out);
}

#[test]
fn boolean_conditions_skip_the_truthy_helper() {
    let options = Options {
        truthy: Truthy::Ruby,
        ..Options::default()
    };
    let out = convert_with("if a > b\n  swap\nend\n", &options).code;
    assert!(out.contains("if (a > b) {"), "{}", out);
}

#[test]
fn identity_comparison_mode() {
    let options = Options {
        comparison: carmine::Comparison::Identity,
        ..Options::default()
    };
    let out = convert_with("same = a == b", &options).code;
    assert!(out.contains("a === b"), "{}", out);
    // nil comparisons stay loose to catch undefined as well.
    let nil_out = convert_with("gone = a == nil", &options).code;
    assert!(nil_out.contains("a == null"), "{}", nil_out);
}

#[test]
fn strict_mode_emits_the_directive() {
    let options = Options {
        strict: true,
        ..Options::default()
    };
    let out = convert_with("x = 1", &options).code;
    assert!(out.starts_with("\"use strict\";"), "{}", out);
}

#[test]
fn helpers_precede_the_strict_directive() {
    let options = Options {
        strict: true,
        truthy: Truthy::Ruby,
        ..Options::default()
    };
    let out = convert_with("x || y()", &options).code;
    let helper_at = out.find("let $T").expect("helper");
    let strict_at = out.find("\"use strict\";").expect("directive");
    assert!(helper_at < strict_at, "{}", out);
}

#[test]
fn comments_survive_conversion() {
    let source = "# leading note\nx = 1 # trailing note\n# block intro\ny = 2\n";
    let out = convert(source, &Options::default()).unwrap().code;
    assert!(out.contains("// leading note"), "{}", out);
    assert!(out.contains("let x = 1; // trailing note"), "{}", out);
    assert!(out.contains("// block intro"), "{}", out);
}

#[test]
fn multiline_comment_blocks_render_as_block_comments() {
    let source = "=begin\nfirst line\nsecond line\n=end\nx = 1\n";
    let out = convert(source, &Options::default()).unwrap().code;
    assert!(out.contains("/*"), "{}", out);
    assert!(out.contains(" * first line"), "{}", out);
    assert!(out.contains(" */"), "{}", out);
}

#[test]
fn backticks_without_a_binding_are_a_security_error() {
    let err = convert("x = `ls`", &Options::default()).unwrap_err();
    assert!(matches!(err, Error::Security { .. }), "{:?}", err);
}

#[test]
fn backticks_with_a_binding_splice_the_result() {
    let options = Options {
        binding: Some(Box::new(|cmd: &str| format!("\"ran {}\"", cmd.trim()))),
        ..Options::default()
    };
    let out = convert_with("x = `version`", &options).code;
    assert!(out.contains("let x = \"ran version\";"), "{}", out);
}

#[test]
fn static_ivars_constant_fold() {
    let mut ivars = serde_json::Map::new();
    ivars.insert("@color".to_string(), serde_json::json!("red"));
    let options = Options {
        ivars,
        ..Options::default()
    };
    let out = convert_with("paint(@color)", &options).code;
    assert!(out.contains("paint(\"red\")"), "{}", out);
}

#[test]
fn assigning_a_folded_ivar_is_a_config_error() {
    let mut ivars = serde_json::Map::new();
    ivars.insert("@color".to_string(), serde_json::json!("red"));
    let options = Options {
        ivars,
        ..Options::default()
    };
    let err = convert("@color = \"blue\"", &options).unwrap_err();
    assert!(matches!(err, Error::Config { .. }), "{:?}", err);
}

#[test]
fn eval_reaching_the_converter_is_a_semantic_error() {
    let err = convert("eval(\"1 + 1\")", &Options::default()).unwrap_err();
    assert!(matches!(err, Error::Semantic { .. }), "{:?}", err);
}

#[test]
fn parse_errors_carry_a_location() {
    let err = convert("class < end", &Options::default()).unwrap_err();
    assert!(matches!(err, Error::Parse { .. }), "{:?}", err);
}

#[test]
fn errors_render_with_file_line_and_column() {
    let options = Options {
        file: "app.rb".to_string(),
        ..Options::default()
    };
    let err = convert("x = 1\nbad = `ls`\n", &options).unwrap_err();
    let text = err.to_string();
    assert!(text.contains("at offset"), "{}", text);
}

#[test]
fn cjs_module_mode_rewrites_imports() {
    struct CjsImport;
    impl Filter for CjsImport {
        fn name(&self) -> &'static str {
            "cjs_import"
        }
        fn handle<'a>(
            &mut self,
            p: &mut Processor<'a, '_>,
            node: &'a Node<'a>,
        ) -> Result<Rewrite<'a>, Error> {
            if node.kind.is_send_family() && node.str_child(1) == Some("needs_path") {
                let name = p.s(Kind::Const, &[Value::Nil, p.str_val("path")]);
                let import = p.s(Kind::Import, &[p.str_val("path"), Value::Node(name)]);
                p.prepend(import);
            }
            Ok(Rewrite::Pass)
        }
    }
    let options = Options {
        module: carmine::ModuleKind::Cjs,
        ..Options::default()
    };
    let out = convert_with_filters("needs_path()\n", &options, vec![Box::new(CjsImport)])
        .unwrap()
        .code;
    assert!(
        out.starts_with("const path = require(\"path\");"),
        "{}",
        out
    );
}

#[test]
fn empty_program_yields_empty_output() {
    let conversion = convert("", &Options::default()).unwrap();
    assert_eq!(conversion.code, "");
    assert_eq!(conversion.sourcemap["mappings"], "");
}

#[test]
fn nested_begin_groupings_collapse() {
    let out = convert("x = ((1))", &Options::default()).unwrap().code;
    assert_eq!(out, "let x = 1;");
}

#[test]
fn invalid_option_combinations_fail_fast() {
    let options = Options {
        eslevel: 2015,
        or: carmine::OrMode::Nullish,
        ..Options::default()
    };
    assert!(matches!(
        convert("x = 1", &options),
        Err(Error::Config { .. })
    ));
}
