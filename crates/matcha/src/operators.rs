//! The operator tree: the abstract syntax of a parsing expression.
//!
//! Trees are arena-allocated; constructors hand back `&'a Op<'a>` so
//! grammars can be built without ownership plumbing. A surface notation
//! parser, if any, is expected to produce these trees; the compiler in
//! [`crate::machine`] consumes them.

use bumpalo::Bump;

use crate::actions::{Action, Bind};

/// Flags for the regex terminal, mapped onto the host engine's inline
/// flags when the pattern is compiled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegexFlags {
    pub case_insensitive: bool,
    pub dot_matches_new_line: bool,
    pub multi_line: bool,
}

impl RegexFlags {
    /// Render as an inline flag group body ("i", "is", ...).
    pub fn inline(&self) -> String {
        let mut s = String::new();
        if self.case_insensitive {
            s.push('i');
        }
        if self.multi_line {
            s.push('m');
        }
        if self.dot_matches_new_line {
            s.push('s');
        }
        s
    }
}

/// A parsing expression.
#[derive(Clone, Copy)]
pub enum Op<'a> {
    /// Any one character.
    Dot,

    /// A literal string.
    Literal(&'a str),

    /// One character in (or, negated, not in) a union of inclusive
    /// ranges. Single characters are ranges with `lo == hi`.
    Class {
        ranges: &'a [(char, char)],
        negated: bool,
    },

    /// An anchored regex at the cursor.
    Regex {
        pattern: &'a str,
        flags: RegexFlags,
    },

    /// Zero or one.
    Optional(&'a Op<'a>),

    /// Zero or more.
    Star(&'a Op<'a>),

    /// One or more.
    Plus(&'a Op<'a>),

    /// A reference to a named rule.
    Nonterminal(&'a str),

    /// Positive lookahead: succeeds iff the subexpression does, without
    /// consuming input.
    And(&'a Op<'a>),

    /// Negative lookahead.
    Not(&'a Op<'a>),

    /// Match the subexpression and emit the matched substring.
    Capture(&'a Op<'a>),

    /// Match the subexpression and bind its determined value to a name.
    Bind {
        name: &'a str,
        expr: &'a Op<'a>,
    },

    /// Each in order.
    Sequence(&'a [&'a Op<'a>]),

    /// Alternatives in order; the first success wins.
    Choice(&'a [&'a Op<'a>]),

    /// Match the subexpression, then apply an action to the values
    /// emitted and bound inside it.
    Rule {
        expr: &'a Op<'a>,
        action: &'a dyn Action<'a>,
    },
}

impl<'a> Op<'a> {
    pub fn dot(arena: &'a Bump) -> &'a Op<'a> {
        arena.alloc(Op::Dot)
    }

    pub fn lit(arena: &'a Bump, s: &str) -> &'a Op<'a> {
        arena.alloc(Op::Literal(arena.alloc_str(s)))
    }

    /// Character class from the compact string form: `"a-z0-9_"` reads
    /// as the ranges a-z and 0-9 plus the single character `_`.
    pub fn class(arena: &'a Bump, spec: &str) -> &'a Op<'a> {
        Self::class_ranges(arena, &parse_class(spec), false)
    }

    /// Negated form of [`Op::class`].
    pub fn class_negated(arena: &'a Bump, spec: &str) -> &'a Op<'a> {
        Self::class_ranges(arena, &parse_class(spec), true)
    }

    pub fn class_ranges(arena: &'a Bump, ranges: &[(char, char)], negated: bool) -> &'a Op<'a> {
        arena.alloc(Op::Class {
            ranges: arena.alloc_slice_copy(ranges),
            negated,
        })
    }

    pub fn regex(arena: &'a Bump, pattern: &str) -> &'a Op<'a> {
        Self::regex_flags(arena, pattern, RegexFlags::default())
    }

    pub fn regex_flags(arena: &'a Bump, pattern: &str, flags: RegexFlags) -> &'a Op<'a> {
        arena.alloc(Op::Regex {
            pattern: arena.alloc_str(pattern),
            flags,
        })
    }

    pub fn opt(arena: &'a Bump, expr: &'a Op<'a>) -> &'a Op<'a> {
        arena.alloc(Op::Optional(expr))
    }

    pub fn star(arena: &'a Bump, expr: &'a Op<'a>) -> &'a Op<'a> {
        arena.alloc(Op::Star(expr))
    }

    pub fn plus(arena: &'a Bump, expr: &'a Op<'a>) -> &'a Op<'a> {
        arena.alloc(Op::Plus(expr))
    }

    pub fn sym(arena: &'a Bump, name: &str) -> &'a Op<'a> {
        arena.alloc(Op::Nonterminal(arena.alloc_str(name)))
    }

    pub fn and(arena: &'a Bump, expr: &'a Op<'a>) -> &'a Op<'a> {
        arena.alloc(Op::And(expr))
    }

    pub fn not(arena: &'a Bump, expr: &'a Op<'a>) -> &'a Op<'a> {
        arena.alloc(Op::Not(expr))
    }

    pub fn capture(arena: &'a Bump, expr: &'a Op<'a>) -> &'a Op<'a> {
        arena.alloc(Op::Capture(expr))
    }

    /// Sugar for a rule whose action is [`Bind`].
    pub fn bind(arena: &'a Bump, name: &str, expr: &'a Op<'a>) -> &'a Op<'a> {
        arena.alloc(Op::Bind {
            name: arena.alloc_str(name),
            expr,
        })
    }

    /// Sequence of expressions. Nested sequences are flattened; a
    /// one-element sequence is the element itself.
    pub fn seq(arena: &'a Bump, exprs: &[&'a Op<'a>]) -> &'a Op<'a> {
        if exprs.len() == 1 {
            return exprs[0];
        }
        let mut flat = Vec::with_capacity(exprs.len());
        for expr in exprs {
            match expr {
                Op::Sequence(inner) => flat.extend_from_slice(inner),
                _ => flat.push(*expr),
            }
        }
        arena.alloc(Op::Sequence(arena.alloc_slice_copy(&flat)))
    }

    /// Prioritized choice. Nested choices are flattened; a one-element
    /// choice is the element itself.
    pub fn choice(arena: &'a Bump, exprs: &[&'a Op<'a>]) -> &'a Op<'a> {
        if exprs.len() == 1 {
            return exprs[0];
        }
        let mut flat = Vec::with_capacity(exprs.len());
        for expr in exprs {
            match expr {
                Op::Choice(inner) => flat.extend_from_slice(inner),
                _ => flat.push(*expr),
            }
        }
        arena.alloc(Op::Choice(arena.alloc_slice_copy(&flat)))
    }

    pub fn rule(arena: &'a Bump, expr: &'a Op<'a>, action: &'a dyn Action<'a>) -> &'a Op<'a> {
        arena.alloc(Op::Rule { expr, action })
    }

    /// A [`Bind`] action allocated alongside the tree, for hosts that
    /// assemble `Rule` nodes directly.
    pub fn bind_action(arena: &'a Bump, name: &str) -> &'a dyn Action<'a> {
        arena.alloc(Bind::new(arena.alloc_str(name)))
    }
}

/// Parse the compact class notation: `x-y` pairs are ranges, everything
/// else is a single character. A trailing or leading `-` is literal.
fn parse_class(spec: &str) -> Vec<(char, char)> {
    let cs: Vec<char> = spec.chars().collect();
    let mut ranges = Vec::new();
    let mut i = 0;
    while i + 2 < cs.len() {
        if cs[i + 1] == '-' {
            ranges.push((cs[i], cs[i + 2]));
            i += 3;
        } else {
            ranges.push((cs[i], cs[i]));
            i += 1;
        }
    }
    while i < cs.len() {
        ranges.push((cs[i], cs[i]));
        i += 1;
    }
    ranges
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_notation() {
        assert_eq!(parse_class("a-z0-9_"), vec![('a', 'z'), ('0', '9'), ('_', '_')]);
        assert_eq!(parse_class("xyz"), vec![('x', 'x'), ('y', 'y'), ('z', 'z')]);
        assert_eq!(parse_class("a-"), vec![('a', 'a'), ('-', '-')]);
        assert_eq!(parse_class(""), Vec::new());
    }

    #[test]
    fn sequences_flatten() {
        let arena = Bump::new();
        let ab = Op::seq(&arena, &[Op::lit(&arena, "a"), Op::lit(&arena, "b")]);
        let abc = Op::seq(&arena, &[ab, Op::lit(&arena, "c")]);
        match abc {
            Op::Sequence(items) => assert_eq!(items.len(), 3),
            _ => panic!("expected a sequence"),
        }
    }

    #[test]
    fn single_element_choice_collapses() {
        let arena = Bump::new();
        let a = Op::lit(&arena, "a");
        assert!(std::ptr::eq(Op::choice(&arena, &[a]), a));
    }
}
