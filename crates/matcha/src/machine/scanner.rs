//! Terminal scanners.
//!
//! A scanner consumes zero or more characters at the cursor and reports
//! the new position, or `None` on failure. Scanners never mutate shared
//! state, so a compiled program can serve concurrent matches.

use std::fmt;

use regex::Regex;

use crate::error::GrammarError;
use crate::operators::RegexFlags;

/// A terminal matcher attached to a SCAN instruction.
#[derive(Clone)]
pub enum Scanner<'a> {
    /// Any one character.
    Dot,
    /// An exact string.
    Literal(&'a str),
    /// A greedy run of class characters.
    Class(CharClass),
    /// An anchored regex.
    Regex(RegexScanner),
}

impl<'a> Scanner<'a> {
    /// Scan at `pos`, returning the new cursor or `None` on failure.
    /// `pos` must be a char boundary at or before the end of `s`.
    pub fn scan(&self, s: &str, pos: usize) -> Option<usize> {
        match self {
            Scanner::Dot => s[pos..].chars().next().map(|c| pos + c.len_utf8()),
            Scanner::Literal(lit) => {
                if s[pos..].starts_with(lit) {
                    Some(pos + lit.len())
                } else {
                    None
                }
            }
            Scanner::Class(class) => class.scan(s, pos),
            Scanner::Regex(re) => re.scan(s, pos),
        }
    }
}

impl fmt::Display for Scanner<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Scanner::Dot => write!(f, "dot"),
            Scanner::Literal(lit) => write!(f, "lit {:?}", lit),
            Scanner::Class(class) => write!(f, "{}", class),
            Scanner::Regex(re) => write!(f, "regex {:?}", re.as_str()),
        }
    }
}

/// A character class with run counts: consumes between `min` and `max`
/// matching characters, greedily. `max < 0` means unbounded.
///
/// With `min == max == 1` this is the plain one-character class; the
/// compiler widens the counts when a class sits directly under a
/// quantifier.
#[derive(Clone)]
pub struct CharClass {
    chars: Vec<char>,
    ranges: Vec<(char, char)>,
    negated: bool,
    min: u32,
    max: i32,
}

impl CharClass {
    /// Build from inclusive ranges; single characters are `lo == hi`
    /// and go to a separate probe list.
    pub fn new(
        spec: &[(char, char)],
        negated: bool,
        min: u32,
        max: i32,
    ) -> Result<Self, GrammarError> {
        let mut chars = Vec::new();
        let mut ranges = Vec::new();
        for &(lo, hi) in spec {
            if lo > hi {
                return Err(GrammarError::InvalidClassRange { lo, hi });
            }
            if lo == hi {
                chars.push(lo);
            } else {
                ranges.push((lo, hi));
            }
        }
        Ok(Self {
            chars,
            ranges,
            negated,
            min,
            max,
        })
    }

    /// The same class with different run counts.
    pub fn with_run(&self, min: u32, max: i32) -> Self {
        let mut class = self.clone();
        class.min = min;
        class.max = max;
        class
    }

    pub fn min(&self) -> u32 {
        self.min
    }

    pub fn max(&self) -> i32 {
        self.max
    }

    fn matches(&self, c: char) -> bool {
        let hit = self.chars.contains(&c)
            || self.ranges.iter().any(|&(lo, hi)| lo <= c && c <= hi);
        hit != self.negated
    }

    /// Greedily consume up to `max` matching characters; succeed iff at
    /// least `min` were consumed.
    pub fn scan(&self, s: &str, pos: usize) -> Option<usize> {
        let mut end = pos;
        let mut count: u32 = 0;
        for c in s[pos..].chars() {
            if self.max >= 0 && count >= self.max as u32 {
                break;
            }
            if !self.matches(c) {
                break;
            }
            end += c.len_utf8();
            count += 1;
        }
        if count < self.min {
            None
        } else {
            Some(end)
        }
    }
}

impl fmt::Display for CharClass {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let neg = if self.negated { "^" } else { "" };
        let mut body = String::new();
        for c in &self.chars {
            body.push(*c);
        }
        for (lo, hi) in &self.ranges {
            body.push(*lo);
            body.push('-');
            body.push(*hi);
        }
        let max = if self.max < 0 {
            String::new()
        } else {
            self.max.to_string()
        };
        write!(f, "class [{}{}]{{{},{}}}", neg, body, self.min, max)
    }
}

/// A regex anchored at the cursor. The pattern is compiled once with a
/// `\A` prefix and run against the input suffix.
#[derive(Clone)]
pub struct RegexScanner {
    re: Regex,
}

impl RegexScanner {
    pub fn new(pattern: &str, flags: RegexFlags) -> Result<Self, regex::Error> {
        let inline = flags.inline();
        let anchored = if inline.is_empty() {
            format!(r"\A(?:{})", pattern)
        } else {
            format!(r"\A(?{}:{})", inline, pattern)
        };
        Ok(Self {
            re: Regex::new(&anchored)?,
        })
    }

    pub fn as_str(&self) -> &str {
        self.re.as_str()
    }

    pub fn scan(&self, s: &str, pos: usize) -> Option<usize> {
        self.re.find(&s[pos..]).map(|m| pos + m.end())
    }
}
