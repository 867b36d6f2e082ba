mod common;

use carmine::Options;
use common::{js, js_es};

#[test]
fn instance_variable_encapsulation_at_es2022() {
    let source = "class Counter\n  def initialize; @n = 0; end\n  def inc; @n += 1; end\n  def value; @n; end\nend\n";
    let out = js_es(source, 2022);
    assert!(out.contains("class Counter {"), "{}", out);
    assert!(out.contains("#n = 0;"), "{}", out);
    assert!(out.contains("inc() {"), "{}", out);
    assert!(out.contains("this.#n += 1"), "{}", out);
    assert!(out.contains("get value() {"), "{}", out);
    assert!(out.contains("return this.#n"), "{}", out);
    assert!(!out.contains("_n"), "{}", out);
}

#[test]
fn underscored_privates_below_es2022() {
    let source = "class Counter\n  def initialize; @n = 0; end\n  def value; @n; end\nend\n";
    let out = js_es(source, 2021);
    assert!(out.contains("this._n"), "{}", out);
    assert!(!out.contains("#n"), "{}", out);
}

#[test]
fn constructor_with_arguments_stays() {
    let source = "class Point\n  def initialize(x, y)\n    @x = x\n    @y = y\n  end\nend\n";
    let out = js_es(source, 2022);
    assert!(out.contains("constructor(x, y) {"), "{}", out);
    assert!(out.contains("this.#x = x;"), "{}", out);
}

#[test]
fn inheritance_and_super() {
    let source = "class Dog < Animal\n  def initialize(name)\n    super(name)\n    @name = name\n  end\nend\n";
    let out = js(source);
    assert!(out.contains("class Dog extends Animal {"), "{}", out);
    assert!(out.contains("super(name);"), "{}", out);
}

#[test]
fn zsuper_reuses_the_parameter_list() {
    let source =
        "class Dog < Animal\n  def speak(volume)\n    super\n    bark\n  end\nend\n";
    let out = js(source);
    assert!(out.contains("super.speak(volume)"), "{}", out);
}

#[test]
fn setter_definitions_emit_set() {
    let source = "class Box\n  def width=(w)\n    @width = w\n  end\nend\n";
    let out = js(source);
    assert!(out.contains("set width(w) {"), "{}", out);
}

#[test]
fn attr_accessor_expands_to_get_and_set() {
    let source = "class Person\n  attr_accessor :name\n  attr_reader :id\nend\n";
    let out = js_es(source, 2022);
    assert!(out.contains("get name() {"), "{}", out);
    assert!(out.contains("set name(name) {"), "{}", out);
    assert!(out.contains("get id() {"), "{}", out);
    assert!(!out.contains("set id("), "{}", out);
}

#[test]
fn static_methods_from_def_self() {
    let source = "class Maker\n  def self.build(kind)\n    kind\n  end\nend\n";
    let out = js(source);
    assert!(out.contains("static build(kind) {"), "{}", out);
}

#[test]
fn singleton_class_block_makes_statics() {
    let source = "class Maker\n  class << self\n    def default\n      @default\n    end\n  end\nend\n";
    let out = js(source);
    assert!(out.contains("static get default() {"), "{}", out);
}

#[test]
fn private_methods_get_a_prefix() {
    let source = "class Secretive\n  private def hidden(x)\n    x\n  end\nend\n";
    let hashed = js_es(source, 2022);
    assert!(hashed.contains("#hidden(x) {"), "{}", hashed);
    let underscored = js_es(source, 2021);
    assert!(underscored.contains("_hidden(x) {"), "{}", underscored);
}

#[test]
fn private_call_sites_resolve_through_the_namespace() {
    let source = "class Secretive\n  private def hidden(x)\n    x\n  end\n  def reveal\n    hidden(1)\n  end\nend\n";
    let out = js_es(source, 2022);
    assert!(out.contains("this.#hidden(1)"), "{}", out);
}

#[test]
fn class_constants_become_statics_at_es2022() {
    let source = "class Circle\n  TAU = 6.28\nend\n";
    let out = js_es(source, 2022);
    assert!(out.contains("static TAU = 6.28;"), "{}", out);
    let old = js_es(source, 2015);
    assert!(old.contains("Circle.TAU = 6.28;"), "{}", old);
}

#[test]
fn include_copies_the_module_prototype() {
    let source = "class Widget\n  include Drawable\nend\n";
    let out = js(source);
    assert!(
        out.contains("Object.assign(Widget.prototype, Drawable);"),
        "{}",
        out
    );
}

#[test]
fn alias_assigns_on_the_prototype() {
    let source = "class List\n  def size; 0; end\n  alias length size\nend\n";
    let out = js(source);
    assert!(
        out.contains("List.prototype.length = List.prototype.size;"),
        "{}",
        out
    );
}

#[test]
fn method_missing_wraps_in_a_proxy() {
    let source = "class Ghost\n  def method_missing(name)\n    name\n  end\nend\n";
    let out = js(source);
    assert!(out.contains("class Ghost$"), "{}", out);
    assert!(out.contains("new Proxy(new Ghost$(...args)"), "{}", out);
    assert!(out.contains("return obj.method_missing(prop)"), "{}", out);
}

#[test]
fn reopening_a_class_sees_earlier_members() {
    let source = "class Widget\n  private def helper; 1; end\nend\nclass Widget\n  def use_it\n    helper\n  end\nend\n";
    let out = js_es(source, 2022);
    // The second body resolves `helper` registered by the first pass.
    assert!(out.contains("this.#helper"), "{}", out);
}

#[test]
fn modules_become_object_literals() {
    let source = "module Geometry\n  TAU = 6.28\n  def self.area(r)\n    TAU * r * r / 2\n  end\nend\n";
    let out = js(source);
    assert!(out.contains("const Geometry = {"), "{}", out);
    assert!(out.contains("TAU: 6.28"), "{}", out);
    assert!(out.contains("area(r) {"), "{}", out);
}

#[test]
fn operator_method_definitions_are_semantic_errors() {
    let source = "class Vec\n  def +(other)\n    other\n  end\nend\n";
    let err = carmine::convert(source, &Options::default()).unwrap_err();
    assert!(matches!(err, carmine::Error::Semantic { .. }), "{:?}", err);
}

#[test]
fn inline_class_literals_from_class_new() {
    let source = "widget = Class.new(Base) do\n  def go; 1; end\nend\n";
    let out = js(source);
    assert!(out.contains("class extends Base {"), "{}", out);
}
