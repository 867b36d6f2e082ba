pub mod kind;

pub use kind::Kind;

use crate::arena::Arena;
use crate::source::{Loc, SourceSet};

/// A child slot of a [`Node`]: another node, a primitive, or nil.
///
/// Children order is significant. Nodes are bags; `updated` with an
/// inconsistent child count is accepted, validation is a filter concern.
#[derive(Debug, Clone, Copy)]
pub enum Value<'a> {
    Node(&'a Node<'a>),
    Str(&'a str),
    Int(i64),
    Float(f64),
    Nil,
}

impl<'a> Value<'a> {
    pub fn as_node(&self) -> Option<&'a Node<'a>> {
        match self {
            Value::Node(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&'a str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }
}

impl<'a> PartialEq for Value<'a> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Node(a), Value::Node(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Nil, Value::Nil) => true,
            _ => false,
        }
    }
}

/// Stable identity of a node within one compilation run, used to key the
/// comments map. Identity is the arena address, so it survives any number of
/// reads but not a rewrite; rewritten trees are re-associated by span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// An immutable AST node: a tag, a frozen child sequence, and an optional
/// location record. Equality is structural on tag and children and ignores
/// locations.
#[derive(Debug)]
pub struct Node<'a> {
    pub kind: Kind,
    pub children: &'a [Value<'a>],
    pub loc: Option<Loc>,
}

impl<'a> PartialEq for Node<'a> {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.children == other.children
    }
}

impl<'a> Node<'a> {
    pub fn id(&self) -> NodeId {
        NodeId(self as *const Node as usize)
    }

    pub fn child(&self, i: usize) -> Option<&Value<'a>> {
        self.children.get(i)
    }

    pub fn node_child(&self, i: usize) -> Option<&'a Node<'a>> {
        self.children.get(i).and_then(Value::as_node)
    }

    pub fn str_child(&self, i: usize) -> Option<&'a str> {
        self.children.get(i).and_then(Value::as_str)
    }

    pub fn child_nodes(&self) -> impl Iterator<Item = &'a Node<'a>> + '_ {
        self.children.iter().filter_map(Value::as_node)
    }

    /// Fresh node with the given replacements; never mutates. `None` keeps
    /// the corresponding field; the location always carries over.
    pub fn updated(
        &self,
        arena: &'a Arena,
        kind: Option<Kind>,
        children: Option<&[Value<'a>]>,
    ) -> &'a Node<'a> {
        let children = match children {
            Some(c) => arena.alloc_slice(c.iter().copied()),
            None => self.children,
        };
        arena.alloc(Node {
            kind: kind.unwrap_or(self.kind),
            children,
            loc: self.loc,
        })
    }

    /// Whether a call-shaped node prints with parentheses.
    ///
    /// `call` is always a method, `attr`/`await_attr` never are. A `def` or
    /// `defs` is a method when its name ends in `!`/`?` or it takes
    /// arguments. Everything else peeks at the byte immediately after the
    /// selector sub-range in the original source: `(` means invocation.
    /// This preserves the Ruby distinction between `foo` and `foo()`.
    pub fn is_method(&self, sources: &SourceSet) -> bool {
        match self.kind {
            Kind::Call => return true,
            Kind::Attr | Kind::AwaitAttr => return false,
            Kind::Def | Kind::Defs => {
                let name_idx = if self.kind == Kind::Def { 0 } else { 1 };
                if let Some(name) = self.str_child(name_idx) {
                    if name.ends_with('!') || name.ends_with('?') {
                        return true;
                    }
                }
                let args_idx = name_idx + 1;
                if let Some(args) = self.node_child(args_idx) {
                    if !args.children.is_empty() {
                        return true;
                    }
                }
            }
            _ => {}
        }

        let Some(loc) = self.loc else { return false };
        let Some(sel) = loc.selector.or(loc.name) else {
            return false;
        };
        sources.get(loc.source).byte_at(sel.end) == Some(b'(')
    }
}

/// Construct a node without a location.
pub fn s<'a>(arena: &'a Arena, kind: Kind, children: &[Value<'a>]) -> &'a Node<'a> {
    arena.alloc(Node {
        kind,
        children: arena.alloc_slice(children.iter().copied()),
        loc: None,
    })
}

/// Construct a node carrying the given location.
pub fn s_loc<'a>(
    arena: &'a Arena,
    kind: Kind,
    children: &[Value<'a>],
    loc: Option<Loc>,
) -> &'a Node<'a> {
    arena.alloc(Node {
        kind,
        children: arena.alloc_slice(children.iter().copied()),
        loc,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::Span;

    #[test]
    fn equality_is_structural() {
        let arena = Arena::new();
        let a = s(&arena, Kind::Int, &[Value::Int(1)]);
        let b = s(&arena, Kind::Int, &[Value::Int(1)]);
        let c = s(&arena, Kind::Int, &[Value::Int(2)]);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn equality_recurses_through_children() {
        let arena = Arena::new();
        let one = s(&arena, Kind::Int, &[Value::Int(1)]);
        let arr1 = s(&arena, Kind::Array, &[Value::Node(one)]);
        let one_again = s(&arena, Kind::Int, &[Value::Int(1)]);
        let arr2 = s(&arena, Kind::Array, &[Value::Node(one_again)]);
        assert_eq!(arr1, arr2);
    }

    #[test]
    fn equality_ignores_location() {
        let arena = Arena::new();
        let a = s_loc(
            &arena,
            Kind::Nil,
            &[],
            Some(Loc::new(crate::source::SourceId(0), 0, 3)),
        );
        let b = s(&arena, Kind::Nil, &[]);
        assert_eq!(a, b);
    }

    #[test]
    fn updated_returns_equal_node_for_same_fields() {
        let arena = Arena::new();
        let n = s(&arena, Kind::Str, &[Value::Str("hi")]);
        let m = n.updated(&arena, Some(n.kind), Some(n.children));
        assert_eq!(n, m);
        assert!(!std::ptr::eq(n, m));
    }

    #[test]
    fn updated_preserves_location() {
        let arena = Arena::new();
        let loc = Loc::new(crate::source::SourceId(0), 2, 5);
        let n = s_loc(&arena, Kind::Sym, &[Value::Str("a")], Some(loc));
        let m = n.updated(&arena, Some(Kind::Str), None);
        assert_eq!(m.kind, Kind::Str);
        assert_eq!(m.loc, Some(loc));
    }

    #[test]
    fn is_method_peeks_byte_after_selector() {
        let arena = Arena::new();
        let mut sources = SourceSet::new();
        let id = sources.add("t.rb", "foo() bar");

        let with_parens = s_loc(
            &arena,
            Kind::Send,
            &[Value::Nil, Value::Str("foo")],
            Some(Loc::new(id, 0, 5).with_selector(Span::new(0, 3))),
        );
        assert!(with_parens.is_method(&sources));

        let without = s_loc(
            &arena,
            Kind::Send,
            &[Value::Nil, Value::Str("bar")],
            Some(Loc::new(id, 6, 9).with_selector(Span::new(6, 9))),
        );
        assert!(!without.is_method(&sources));
    }

    #[test]
    fn is_method_for_def_with_bang_or_args() {
        let arena = Arena::new();
        let sources = SourceSet::new();

        let empty_args = s(&arena, Kind::Args, &[]);
        let body = s(&arena, Kind::Nil, &[]);
        let bang = s(
            &arena,
            Kind::Def,
            &[
                Value::Str("save!"),
                Value::Node(empty_args),
                Value::Node(body),
            ],
        );
        assert!(bang.is_method(&sources));

        let arg = s(&arena, Kind::Arg, &[Value::Str("x")]);
        let args = s(&arena, Kind::Args, &[Value::Node(arg)]);
        let with_args = s(
            &arena,
            Kind::Def,
            &[Value::Str("f"), Value::Node(args), Value::Node(body)],
        );
        assert!(with_args.is_method(&sources));

        let attr_like = s(
            &arena,
            Kind::Def,
            &[Value::Str("f"), Value::Node(empty_args), Value::Node(body)],
        );
        assert!(!attr_like.is_method(&sources));
    }

    #[test]
    fn call_kind_is_always_method_attr_never() {
        let arena = Arena::new();
        let sources = SourceSet::new();
        let call = s(&arena, Kind::Call, &[Value::Nil, Value::Str("f")]);
        let attr = s(&arena, Kind::Attr, &[Value::Nil, Value::Str("f")]);
        assert!(call.is_method(&sources));
        assert!(!attr.is_method(&sources));
    }
}
