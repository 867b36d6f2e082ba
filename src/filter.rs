//! The filter protocol: AST-to-AST rewriters composed into a chain.
//!
//! A filter overrides `handle` and inspects the node's tag; returning
//! [`Rewrite::Pass`] means "no handler here", and the driver falls through to
//! the next filter in the chain, ending with the default child-rewriting
//! walk. Returning [`Rewrite::Replace`] ends dispatch for that node — a
//! filter that wants inner filters to see its result calls
//! [`Processor::delegate`] (the `super`-style call) or [`Processor::process`]
//! on sub-trees it constructs.
//!
//! The driver takes a filter out of the stack while its handler runs, which
//! both satisfies the borrow checker and restores the chain on return.

use crate::arena::Arena;
use crate::ast::{s_loc, Kind, Node, Value};
use crate::error::Error;
use crate::options::Options;

pub enum Rewrite<'a> {
    /// No handler for this node; dispatch continues inward.
    Pass,
    /// The node is replaced; dispatch stops.
    Replace(&'a Node<'a>),
}

pub trait Filter {
    fn name(&self) -> &'static str;

    fn handle<'a>(
        &mut self,
        p: &mut Processor<'a, '_>,
        node: &'a Node<'a>,
    ) -> Result<Rewrite<'a>, Error> {
        let _ = (p, node);
        Ok(Rewrite::Pass)
    }

    /// Hook to assert ordering dependencies: receives the current filter
    /// name order, returns the desired one. Applied at pipeline build time,
    /// in filter order.
    fn reorder(&self, order: Vec<&'static str>) -> Vec<&'static str> {
        order
    }
}

/// The rewrite driver plus the helpers the filter protocol promises:
/// node constructors, child processing with structural sharing, ES-level
/// predicates, method allow-lists, and the prepend list.
pub struct Processor<'a, 'o> {
    pub arena: &'a Arena,
    options: &'o Options,
    filters: Vec<Option<Box<dyn Filter>>>,
    cursor: usize,
    prepends: Vec<&'a Node<'a>>,
}

impl<'a, 'o> Processor<'a, 'o> {
    pub fn new(arena: &'a Arena, options: &'o Options, filters: Vec<Box<dyn Filter>>) -> Self {
        Processor {
            arena,
            options,
            filters: filters.into_iter().map(Some).collect(),
            cursor: 0,
            prepends: Vec::new(),
        }
    }

    pub fn options(&self) -> &'o Options {
        self.options
    }

    /// Full dispatch from the outermost filter.
    pub fn process(&mut self, node: &'a Node<'a>) -> Result<&'a Node<'a>, Error> {
        self.dispatch(node, 0)
    }

    /// `super`-style call: continue dispatch after the currently running
    /// filter.
    pub fn delegate(&mut self, node: &'a Node<'a>) -> Result<&'a Node<'a>, Error> {
        let from = self.cursor + 1;
        self.dispatch(node, from)
    }

    fn dispatch(&mut self, node: &'a Node<'a>, start: usize) -> Result<&'a Node<'a>, Error> {
        for i in start..self.filters.len() {
            let Some(mut filter) = self.filters[i].take() else {
                continue;
            };
            let saved = self.cursor;
            self.cursor = i;
            let result = filter.handle(self, node);
            self.cursor = saved;
            self.filters[i] = Some(filter);
            if let Rewrite::Replace(replacement) = result? {
                return Ok(replacement);
            }
        }
        self.process_children(node)
    }

    /// Rewrites each node child, returning the same node when nothing
    /// changed so unrewritten trees share structure.
    pub fn process_children(&mut self, node: &'a Node<'a>) -> Result<&'a Node<'a>, Error> {
        let mut changed = false;
        let mut out: Vec<Value<'a>> = Vec::with_capacity(node.children.len());
        for child in node.children {
            match child {
                Value::Node(inner) => {
                    let rewritten = self.process(inner)?;
                    if !std::ptr::eq(rewritten, *inner) {
                        changed = true;
                    }
                    out.push(Value::Node(rewritten));
                }
                other => out.push(*other),
            }
        }
        if changed {
            Ok(s_loc(self.arena, node.kind, &out, node.loc))
        } else {
            Ok(node)
        }
    }

    pub fn process_all(&mut self, list: &[Value<'a>]) -> Result<Vec<Value<'a>>, Error> {
        let mut out = Vec::with_capacity(list.len());
        for item in list {
            match item {
                Value::Node(inner) => out.push(Value::Node(self.process(inner)?)),
                other => out.push(*other),
            }
        }
        Ok(out)
    }

    /// Node constructor without a location.
    pub fn s(&self, kind: Kind, children: &[Value<'a>]) -> &'a Node<'a> {
        s_loc(self.arena, kind, children, None)
    }

    /// Node constructor preserving `like`'s location, for rewrites that
    /// should keep mapping to the original source.
    pub fn s_at(&self, like: &Node<'a>, kind: Kind, children: &[Value<'a>]) -> &'a Node<'a> {
        s_loc(self.arena, kind, children, like.loc)
    }

    pub fn str_val(&self, s: &str) -> Value<'a> {
        Value::Str(self.arena.alloc_str(s))
    }

    /// Queue a statement (typically an `import`) for the top of the program.
    pub fn prepend(&mut self, node: &'a Node<'a>) {
        self.prepends.push(node);
    }

    pub fn take_prepends(&mut self) -> Vec<&'a Node<'a>> {
        std::mem::take(&mut self.prepends)
    }

    // ES-level predicates, one per supported target year.
    pub fn es(&self, year: u16) -> bool {
        self.options.eslevel >= year
    }

    pub fn es2015(&self) -> bool { self.es(2015) }
    pub fn es2016(&self) -> bool { self.es(2016) }
    pub fn es2017(&self) -> bool { self.es(2017) }
    pub fn es2018(&self) -> bool { self.es(2018) }
    pub fn es2019(&self) -> bool { self.es(2019) }
    pub fn es2020(&self) -> bool { self.es(2020) }
    pub fn es2021(&self) -> bool { self.es(2021) }
    pub fn es2022(&self) -> bool { self.es(2022) }
    pub fn es2023(&self) -> bool { self.es(2023) }
    pub fn es2024(&self) -> bool { self.es(2024) }
    pub fn es2025(&self) -> bool { self.es(2025) }

    /// True when the options exclude rewriting this method name.
    pub fn excluded(&self, method: &str) -> bool {
        if let Some(only) = &self.options.include_only {
            return !only.iter().any(|m| m == method);
        }
        if self.options.include_all {
            return false;
        }
        if self.options.include.iter().any(|m| m == method) {
            return false;
        }
        self.options.exclude.iter().any(|m| m == method)
    }

    pub fn included(&self, method: &str) -> bool {
        !self.excluded(method)
    }
}

/// Applies each filter's `reorder` hook to the stack.
pub fn reorder_filters(mut filters: Vec<Box<dyn Filter>>) -> Vec<Box<dyn Filter>> {
    let names: Vec<&'static str> = filters.iter().map(|f| f.name()).collect();
    let mut order = names.clone();
    for filter in &filters {
        let proposed = filter.reorder(order.clone());
        // A hook may only permute; anything else is ignored.
        let mut check: Vec<&str> = proposed.clone();
        let mut have: Vec<&str> = order.clone();
        check.sort_unstable();
        have.sort_unstable();
        if check == have {
            order = proposed;
        }
    }

    let mut slots: Vec<Option<Box<dyn Filter>>> = filters.drain(..).map(Some).collect();
    let mut out = Vec::with_capacity(slots.len());
    for name in order {
        if let Some(i) = slots
            .iter()
            .position(|s| s.as_ref().map(|f| f.name()) == Some(name))
        {
            out.push(slots[i].take().expect("slot"));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::s;

    struct SymToStr;

    impl Filter for SymToStr {
        fn name(&self) -> &'static str {
            "sym_to_str"
        }

        fn handle<'a>(
            &mut self,
            p: &mut Processor<'a, '_>,
            node: &'a Node<'a>,
        ) -> Result<Rewrite<'a>, Error> {
            if node.kind == Kind::Sym {
                Ok(Rewrite::Replace(p.s_at(node, Kind::Str, node.children)))
            } else {
                Ok(Rewrite::Pass)
            }
        }
    }

    struct RunsLast;

    impl Filter for RunsLast {
        fn name(&self) -> &'static str {
            "runs_last"
        }

        fn reorder(&self, mut order: Vec<&'static str>) -> Vec<&'static str> {
            if let Some(i) = order.iter().position(|n| *n == "runs_last") {
                let me = order.remove(i);
                order.push(me);
            }
            order
        }
    }

    #[test]
    fn identity_processor_shares_structure() {
        let arena = Arena::new();
        let options = Options::default();
        let sym = s(&arena, Kind::Sym, &[Value::Str("go")]);
        let arr = s(&arena, Kind::Array, &[Value::Node(sym)]);
        let mut p = Processor::new(&arena, &options, vec![]);
        let out = p.process(arr).unwrap();
        assert!(std::ptr::eq(out, arr));
    }

    #[test]
    fn filter_rewrites_matching_nodes() {
        let arena = Arena::new();
        let options = Options::default();
        let sym = s(&arena, Kind::Sym, &[Value::Str("go")]);
        let arr = s(&arena, Kind::Array, &[Value::Node(sym)]);
        let mut p = Processor::new(&arena, &options, vec![Box::new(SymToStr)]);
        let out = p.process(arr).unwrap();
        assert_eq!(out.node_child(0).map(|n| n.kind), Some(Kind::Str));
        assert_eq!(out.node_child(0).and_then(|n| n.str_child(0)), Some("go"));
    }

    #[test]
    fn reorder_moves_filter_to_the_end() {
        let filters: Vec<Box<dyn Filter>> = vec![Box::new(RunsLast), Box::new(SymToStr)];
        let ordered = reorder_filters(filters);
        let names: Vec<&str> = ordered.iter().map(|f| f.name()).collect();
        assert_eq!(names, vec!["sym_to_str", "runs_last"]);
    }

    #[test]
    fn excluded_honours_include_only() {
        let arena = Arena::new();
        let options = Options {
            include_only: Some(vec!["keep".to_string()]),
            ..Options::default()
        };
        let p = Processor::new(&arena, &options, vec![]);
        assert!(p.included("keep"));
        assert!(p.excluded("drop"));
    }

    #[test]
    fn es_level_predicates_gate_on_year() {
        let arena = Arena::new();
        let options = Options {
            eslevel: 2020,
            ..Options::default()
        };
        let p = Processor::new(&arena, &options, vec![]);
        assert!(p.es2015());
        assert!(p.es2020());
        assert!(!p.es2021());
    }
}
