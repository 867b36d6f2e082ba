use std::collections::HashMap;

use crate::ast::Node;

/// Tracks nested class/module scopes and cross-scope visibility of declared
/// names.
///
/// Each entered scope is identified by its full path (`["A", "B"]` for
/// `module A; class B`), keyed as the JSON encoding of that path so that
/// reopening `A::B` later — even from a different nesting route — lands on
/// the same accumulated descriptor map.
///
/// Descriptors are AST nodes: `self`, `autobind(self)`,
/// `private_method(...)`, `setter(...)`, or the owning class node. The
/// converter reads them at call sites to decide autobinding and private-name
/// prefixes.
pub struct Namespace<'a> {
    active: Vec<String>,
    defs: HashMap<String, HashMap<String, &'a Node<'a>>>,
}

impl<'a> Namespace<'a> {
    pub fn new() -> Self {
        Namespace {
            active: Vec::new(),
            defs: HashMap::new(),
        }
    }

    fn key(path: &[String]) -> String {
        serde_json::to_string(path).expect("scope path encodes")
    }

    /// Enters a scope named by a constant path like `"Foo"` or `"A::B"`.
    /// Returns the descriptors already accumulated for that scope (non-empty
    /// when a class or module is being reopened).
    pub fn enter(&mut self, name: &str) -> HashMap<String, &'a Node<'a>> {
        for part in name.split("::") {
            self.active.push(part.to_string());
        }
        self.get_own_props()
    }

    /// Leaves the scope entered by the matching [`Self::enter`].
    pub fn leave(&mut self, name: &str) {
        for _ in name.split("::") {
            self.active.pop();
        }
    }

    pub fn depth(&self) -> usize {
        self.active.len()
    }

    /// Registers descriptors on the current scope, merging with any from a
    /// previous visit.
    pub fn define_props(&mut self, props: &HashMap<String, &'a Node<'a>>) {
        let key = Self::key(&self.active);
        let entry = self.defs.entry(key).or_default();
        for (name, desc) in props {
            entry.insert(name.clone(), desc);
        }
    }

    pub fn define_prop(&mut self, name: &str, desc: &'a Node<'a>) {
        let key = Self::key(&self.active);
        self.defs.entry(key).or_default().insert(name.to_string(), desc);
    }

    /// Resolves a name by walking outward from the current scope; the
    /// nearest definition wins.
    pub fn find(&self, name: &str) -> Option<&'a Node<'a>> {
        for depth in (0..=self.active.len()).rev() {
            let key = Self::key(&self.active[..depth]);
            if let Some(scope) = self.defs.get(&key) {
                if let Some(desc) = scope.get(name) {
                    return Some(desc);
                }
            }
        }
        None
    }

    /// Descriptors registered on the current scope so far.
    pub fn get_own_props(&self) -> HashMap<String, &'a Node<'a>> {
        self.defs
            .get(&Self::key(&self.active))
            .cloned()
            .unwrap_or_default()
    }
}

impl<'a> Default for Namespace<'a> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::Arena;
    use crate::ast::{s, Kind};

    #[test]
    fn enter_and_leave_balance() {
        let mut ns: Namespace = Namespace::new();
        ns.enter("A");
        ns.enter("B");
        assert_eq!(ns.depth(), 2);
        ns.leave("B");
        ns.leave("A");
        assert_eq!(ns.depth(), 0);
    }

    #[test]
    fn find_walks_outward_to_enclosing_scope() {
        let arena = Arena::new();
        let desc = s(&arena, Kind::Self_, &[]);
        let mut ns = Namespace::new();
        ns.enter("Outer");
        ns.define_prop("helper", desc);
        ns.enter("Inner");
        assert!(ns.find("helper").is_some());
        ns.leave("Inner");
        ns.leave("Outer");
    }

    #[test]
    fn nearest_definition_wins() {
        let arena = Arena::new();
        let outer = s(&arena, Kind::Self_, &[]);
        let inner = s(&arena, Kind::Autobind, &[]);
        let mut ns = Namespace::new();
        ns.enter("A");
        ns.define_prop("m", outer);
        ns.enter("B");
        ns.define_prop("m", inner);
        assert_eq!(ns.find("m").map(|n| n.kind), Some(Kind::Autobind));
        ns.leave("B");
        assert_eq!(ns.find("m").map(|n| n.kind), Some(Kind::Self_));
        ns.leave("A");
    }

    #[test]
    fn reopening_a_scope_accumulates_descriptors() {
        let arena = Arena::new();
        let desc = s(&arena, Kind::Self_, &[]);
        let mut ns = Namespace::new();

        let first = ns.enter("Widget");
        assert!(first.is_empty());
        ns.define_prop("render", desc);
        ns.leave("Widget");

        let second = ns.enter("Widget");
        assert!(second.contains_key("render"));
        ns.leave("Widget");
    }

    #[test]
    fn nested_path_names_enter_multiple_scopes() {
        let arena = Arena::new();
        let desc = s(&arena, Kind::Self_, &[]);
        let mut ns = Namespace::new();
        ns.enter("A::B");
        assert_eq!(ns.depth(), 2);
        ns.define_prop("m", desc);
        ns.leave("A::B");

        // The same scope reached by explicit nesting sees the descriptor.
        ns.enter("A");
        ns.enter("B");
        assert!(ns.find("m").is_some());
        ns.leave("B");
        ns.leave("A");
    }
}
