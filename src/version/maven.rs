//! Maven version precedence
//!
//! A version string is split into items on `.`, `-` and digit/letter transitions.
//! A `-`, a digit/letter transition or a `.` directly followed by a letter opens a
//! nested list, so `1.0-beta-2` becomes `[1, [beta, [2]]]` and `1.0.RC1` reads like
//! `1.0-RC1`. Trailing "null" items (`0`, release qualifiers, empty lists) are
//! dropped, which makes `1`, `1.0`, `1.0.0` and `1-ga` equal.
//!
//! The nested lists are then flattened into a token sequence and compared
//! lexicographically, a missing token counting as a release:
//!
//! ```text
//! alpha < beta < milestone < rc < snapshot < (release, missing) < sp < (unknown)
//!       < number opening a sub-list < number
//! ```
//!
//! Numbers compare numerically and unknown qualifiers lexically among themselves.
//! Every token has a fixed place in that chain, so the order is total.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Known qualifiers in ascending order; the empty string marks a release.
const QUALIFIERS: [&str; 7] = ["alpha", "beta", "milestone", "rc", "snapshot", "", "sp"];

/// Rank of the release qualifier within [`QUALIFIERS`]
const RELEASE_RANK: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Item {
    /// Digits without leading zeros (`"0"` for zero)
    Int(String),
    /// Lowercased qualifier with aliases applied
    Qualifier(String),
    List(Vec<Item>),
}

impl Item {
    fn int(digits: &str) -> Self {
        let trimmed = digits.trim_start_matches('0');
        Item::Int(if trimmed.is_empty() { "0" } else { trimmed }.to_string())
    }

    fn qualifier(value: &str, followed_by_digit: bool) -> Self {
        let value = if followed_by_digit && value.len() == 1 {
            match value {
                "a" => "alpha",
                "b" => "beta",
                "m" => "milestone",
                other => other,
            }
        } else {
            value
        };
        let value = match value {
            "ga" | "final" | "release" => "",
            "cr" => "rc",
            other => other,
        };
        Item::Qualifier(value.to_string())
    }

    fn is_null(&self) -> bool {
        match self {
            Item::Int(digits) => digits == "0",
            Item::Qualifier(q) => q.is_empty(),
            Item::List(items) => items.is_empty(),
        }
    }
}

/// One comparable unit of a flattened version. Variant order is precedence order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum Token {
    PreRelease(usize),
    Release,
    /// `sp` ranks `0`; unknown qualifiers rank `1` and carry their text
    PostRelease(usize, String),
    /// A number that opens a nested list, as `1` in `alpha-1` (digit count, digits)
    Sublist(usize, String),
    /// (digit count, digits)
    Number(usize, String),
}

impl Token {
    fn qualifier(qualifier: &str) -> Self {
        match QUALIFIERS.iter().position(|q| *q == qualifier) {
            Some(rank) if rank < RELEASE_RANK => Token::PreRelease(rank),
            Some(RELEASE_RANK) => Token::Release,
            Some(_) => Token::PostRelease(0, String::new()),
            None => Token::PostRelease(1, qualifier.to_string()),
        }
    }
}

fn flatten(items: &[Item], nested: bool, tokens: &mut Vec<Token>) {
    for (index, item) in items.iter().enumerate() {
        match item {
            Item::Int(digits) if nested && index == 0 => {
                tokens.push(Token::Sublist(digits.len(), digits.clone()))
            }
            Item::Int(digits) => tokens.push(Token::Number(digits.len(), digits.clone())),
            Item::Qualifier(q) => tokens.push(Token::qualifier(q)),
            Item::List(inner) => flatten(inner, true, tokens),
        }
    }
}

fn compare_tokens(left: &[Token], right: &[Token]) -> Ordering {
    let len = left.len().max(right.len());
    (0..len)
        .map(|i| {
            let l = left.get(i).unwrap_or(&Token::Release);
            let r = right.get(i).unwrap_or(&Token::Release);
            l.cmp(r)
        })
        .find(|ordering| ordering.is_ne())
        .unwrap_or(Ordering::Equal)
}

/// Drop trailing null items, stopping at the first non-null, non-list item.
fn normalize(items: &mut Vec<Item>) {
    let mut i = items.len();
    while i > 0 {
        i -= 1;
        if items[i].is_null() {
            items.remove(i);
        } else if !matches!(items[i], Item::List(_)) {
            break;
        }
    }
}

fn parse_item(is_digit: bool, token: &str) -> Item {
    if is_digit {
        Item::int(token)
    } else {
        Item::qualifier(token, false)
    }
}

/// Tokenizes into nested lists. `depth` tracks the list currently being filled; each
/// nested list is the last element of its parent.
fn parse_items(version: &str) -> Vec<Item> {
    fn current<'a>(root: &'a mut Vec<Item>, depth: usize) -> &'a mut Vec<Item> {
        let mut list = root;
        for _ in 0..depth {
            list = match list.last_mut() {
                Some(Item::List(inner)) => inner,
                _ => unreachable!("nested list is always the last item of its parent"),
            };
        }
        list
    }

    let lower = version.to_lowercase();
    let mut root: Vec<Item> = Vec::new();
    let mut depth = 0;
    let mut is_digit = false;
    let mut start = 0;

    for (i, c) in lower.char_indices() {
        let letter_follows = lower[i + c.len_utf8()..]
            .chars()
            .next()
            .is_some_and(|next| next.is_alphabetic());
        match c {
            '.' | '-' => {
                let item = if i == start {
                    Item::int("0")
                } else {
                    parse_item(is_digit, &lower[start..i])
                };
                let list = current(&mut root, depth);
                list.push(item);
                if c == '-' || letter_follows {
                    list.push(Item::List(Vec::new()));
                    depth += 1;
                }
                start = i + 1;
            }
            c if c.is_ascii_digit() => {
                if !is_digit && i > start {
                    let list = current(&mut root, depth);
                    list.push(Item::qualifier(&lower[start..i], true));
                    list.push(Item::List(Vec::new()));
                    depth += 1;
                    start = i;
                }
                is_digit = true;
            }
            _ => {
                if is_digit && i > start {
                    let list = current(&mut root, depth);
                    list.push(Item::int(&lower[start..i]));
                    list.push(Item::List(Vec::new()));
                    depth += 1;
                    start = i;
                }
                is_digit = false;
            }
        }
    }

    if lower.len() > start {
        current(&mut root, depth).push(parse_item(is_digit, &lower[start..]));
    }

    // Innermost lists first, mirroring how they were opened.
    for level in (0..=depth).rev() {
        normalize(current(&mut root, level));
    }

    root
}

fn parse_tokens(version: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    flatten(&parse_items(version), false, &mut tokens);
    tokens
}

/// A version string with Maven precedence semantics.
///
/// Equality follows precedence, so `"1.0"` and `"1.0.0"` are equal while keeping their
/// own textual form.
#[derive(Debug, Clone)]
pub struct MavenVersion {
    value: String,
    tokens: Vec<Token>,
}

impl MavenVersion {
    pub fn parse(version: &str) -> Self {
        Self {
            value: version.to_string(),
            tokens: parse_tokens(version),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    pub fn is_snapshot(&self) -> bool {
        self.value.ends_with("-SNAPSHOT")
    }
}

impl FromStr for MavenVersion {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl fmt::Display for MavenVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

impl PartialEq for MavenVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for MavenVersion {}

impl PartialOrd for MavenVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MavenVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        compare_tokens(&self.tokens, &other.tokens)
    }
}

/// Returns the highest of the given versions, or `None` for an empty input.
///
/// Equal versions are interchangeable; the last one seen wins.
pub fn max_version<I, S>(versions: I) -> Option<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    versions
        .into_iter()
        .map(|v| MavenVersion::parse(v.as_ref()))
        .max()
        .map(|v| v.value)
}
