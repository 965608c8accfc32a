//! Random-grammar properties: every non-left-recursive grammar
//! terminates on every input, and matching is a pure function.

use bumpalo::Bump;
use matcha::{Grammar, MachineParser, Op, StringInterner};
use proptest::prelude::*;

/// An owned pattern sketch; the test lowers it into an arena tree.
#[derive(Debug, Clone)]
enum Pat {
    Lit(String),
    Dot,
    Class(Vec<char>),
    Ref,
    Seq(Vec<Pat>),
    Choice(Vec<Pat>),
    Opt(Box<Pat>),
    Star(Box<Pat>),
    Plus(Box<Pat>),
    Not(Box<Pat>),
    Cap(Box<Pat>),
}

/// Leaves that always consume at least one character; quantifier
/// bodies come from here so repetition cannot stall.
fn consuming_leaf() -> impl Strategy<Value = Pat> {
    prop_oneof![
        "[abc]{1,3}".prop_map(Pat::Lit),
        Just(Pat::Dot),
        prop::collection::vec(prop::sample::select(vec!['a', 'b', 'c', 'd']), 1..3)
            .prop_map(Pat::Class),
        Just(Pat::Ref),
    ]
}

fn pat() -> impl Strategy<Value = Pat> {
    let leaf = prop_oneof![
        "[abc]{0,3}".prop_map(Pat::Lit),
        Just(Pat::Dot),
        Just(Pat::Ref),
    ];
    leaf.prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..3).prop_map(Pat::Seq),
            prop::collection::vec(inner.clone(), 1..3).prop_map(Pat::Choice),
            inner.clone().prop_map(|p| Pat::Opt(Box::new(p))),
            consuming_leaf().prop_map(|p| Pat::Star(Box::new(p))),
            consuming_leaf().prop_map(|p| Pat::Plus(Box::new(p))),
            inner.clone().prop_map(|p| Pat::Not(Box::new(p))),
            inner.prop_map(|p| Pat::Cap(Box::new(p))),
        ]
    })
}

fn lower<'a>(arena: &'a Bump, pat: &Pat) -> &'a Op<'a> {
    match pat {
        Pat::Lit(s) => Op::lit(arena, s),
        Pat::Dot => Op::dot(arena),
        Pat::Class(chars) => {
            let ranges: Vec<(char, char)> = chars.iter().map(|&c| (c, c)).collect();
            Op::class_ranges(arena, &ranges, false)
        }
        Pat::Ref => Op::sym(arena, "Item"),
        Pat::Seq(items) => {
            let ops: Vec<_> = items.iter().map(|p| lower(arena, p)).collect();
            Op::seq(arena, &ops)
        }
        Pat::Choice(items) => {
            let ops: Vec<_> = items.iter().map(|p| lower(arena, p)).collect();
            Op::choice(arena, &ops)
        }
        Pat::Opt(p) => Op::opt(arena, lower(arena, p)),
        Pat::Star(p) => Op::star(arena, lower(arena, p)),
        Pat::Plus(p) => Op::plus(arena, lower(arena, p)),
        Pat::Not(p) => Op::not(arena, lower(arena, p)),
        Pat::Cap(p) => Op::capture(arena, lower(arena, p)),
    }
}

proptest! {
    #[test]
    fn terminates_and_is_pure(pat in pat(), input in "[abcd]{0,12}") {
        let arena = Bump::new();
        let mut names = StringInterner::new(&arena);
        let mut grammar = Grammar::new(&arena, names.intern("Start"));
        grammar.define(names.intern("Start"), lower(&arena, &pat));
        grammar.define(names.intern("Item"), Op::class(&arena, "a-d"));
        let parser = MachineParser::new(&arena, &grammar).unwrap();

        let first = parser.match_str(&input).unwrap();
        let second = parser.match_str(&input).unwrap();
        match (&first, &second) {
            (Some(a), Some(b)) => {
                prop_assert_eq!(a.end(), b.end());
                prop_assert_eq!(a.groups(), b.groups());
                prop_assert_eq!(a.bindings(), b.bindings());
                prop_assert!(a.end() <= input.len());
            }
            (None, None) => {}
            _ => prop_assert!(false, "match is not deterministic"),
        }
    }
}
