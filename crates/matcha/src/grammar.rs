//! Named rules and the start symbol.
//!
//! Definition order matters: the compiled program lays rule bodies out
//! in the order they were defined, so the map is insertion-ordered.

use bumpalo::Bump;
use common::StringInterner;
use indexmap::IndexMap;

use crate::operators::Op;

/// A set of named parsing expressions plus a start rule.
///
/// Redefining a name replaces its expression in place; the original
/// position in the layout order is kept.
pub struct Grammar<'a> {
    strings: StringInterner<'a>,
    definitions: IndexMap<&'a str, &'a Op<'a>>,
    start: &'a str,
}

impl<'a> Grammar<'a> {
    pub fn new(arena: &'a Bump, start: &str) -> Self {
        let mut strings = StringInterner::new(arena);
        let start = strings.intern(start);
        Self {
            strings,
            definitions: IndexMap::new(),
            start,
        }
    }

    /// Add or replace a rule.
    pub fn define(&mut self, name: &str, expr: &'a Op<'a>) {
        let name = self.strings.intern(name);
        self.definitions.insert(name, expr);
    }

    pub fn start(&self) -> &'a str {
        self.start
    }

    pub fn get(&self, name: &str) -> Option<&'a Op<'a>> {
        self.definitions.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.definitions.contains_key(name)
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Rules in definition order.
    pub fn definitions(&self) -> impl Iterator<Item = (&'a str, &'a Op<'a>)> + '_ {
        self.definitions.iter().map(|(name, expr)| (*name, *expr))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redefinition_keeps_layout_order() {
        let arena = Bump::new();
        let mut grammar = Grammar::new(&arena, "A");
        grammar.define("A", Op::lit(&arena, "a"));
        grammar.define("B", Op::lit(&arena, "b"));
        grammar.define("A", Op::lit(&arena, "x"));
        let order: Vec<_> = grammar.definitions().map(|(name, _)| name).collect();
        assert_eq!(order, vec!["A", "B"]);
        assert!(matches!(grammar.get("A"), Some(Op::Literal("x"))));
    }
}
