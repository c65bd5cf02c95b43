//! Search predicates for narrowing a tree
//!
//! Queries come in three flavors:
//! - `foo` case-insensitive regex, matched against each path component
//! - `!foo` inverse regex, keeps branches where no component matches
//! - `-f foo` fuzzy subsequence match

use regex::{Regex, RegexBuilder};

use super::spec::PATH_SEPARATOR;
use super::tree::Tree;

const INVERSE_PREFIX: char = '!';
const FUZZY_PREFIX: &str = "-f";

/// Pattern tested against a single path component
#[derive(Debug, Clone)]
pub enum Matcher {
    Regex(Regex),
    /// Lowercased substring, used when the expression does not compile
    Literal(String),
}

impl Matcher {
    pub fn new(expr: &str) -> Self {
        match RegexBuilder::new(expr).case_insensitive(true).build() {
            Ok(rx) => Matcher::Regex(rx),
            Err(_) => Matcher::Literal(expr.to_lowercase()),
        }
    }

    pub fn is_match(&self, text: &str) -> bool {
        match self {
            Matcher::Regex(rx) => rx.is_match(text),
            Matcher::Literal(s) => text.to_lowercase().contains(s.as_str()),
        }
    }
}

/// A compiled search query
#[derive(Debug, Clone)]
pub enum Query {
    Regex(Matcher),
    Inverse(Matcher),
    Fuzzy(String),
}

impl Query {
    /// Compile a raw query string
    ///
    /// An invalid expression is matched literally instead of failing.
    pub fn parse(raw: &str) -> Query {
        let raw = raw.trim();
        if let Some(rest) = raw.strip_prefix(FUZZY_PREFIX) {
            return Query::Fuzzy(rest.trim().to_lowercase());
        }
        if let Some(rest) = raw.strip_prefix(INVERSE_PREFIX) {
            return Query::Inverse(Matcher::new(rest.trim()));
        }
        Query::Regex(Matcher::new(raw))
    }

    /// Test a `::` joined path
    pub fn matches(&self, path: &str) -> bool {
        let mut tokens = path.split(PATH_SEPARATOR);
        match self {
            Query::Regex(m) => tokens.any(|t| m.is_match(t)),
            Query::Inverse(m) => !tokens.any(|t| m.is_match(t)),
            Query::Fuzzy(q) => tokens.any(|t| fuzzy_match(q, t)),
        }
    }
}

/// Case-insensitive subsequence match
pub fn fuzzy_match(query: &str, text: &str) -> bool {
    let text = text.to_lowercase();
    let mut chars = text.chars();
    query
        .to_lowercase()
        .chars()
        .all(|q| chars.by_ref().any(|c| c == q))
}

/// Regex predicate in the `(query, path)` shape [`Tree::filter`] expects
pub fn rx_filter(query: &str, path: &str) -> bool {
    Query::Regex(Matcher::new(query)).matches(path)
}

/// Inverse regex predicate; the query carries its leading `!`
pub fn rx_inverse_filter(query: &str, path: &str) -> bool {
    let q = query.strip_prefix(INVERSE_PREFIX).unwrap_or(query);
    Query::Inverse(Matcher::new(q.trim())).matches(path)
}

/// Fuzzy predicate; the query carries its leading `-f`
pub fn fuzzy_filter(query: &str, path: &str) -> bool {
    let q = query.strip_prefix(FUZZY_PREFIX).unwrap_or(query);
    Query::Fuzzy(q.trim().to_lowercase()).matches(path)
}

/// Apply a raw query to a tree, compiling it once
pub fn filter_tree(tree: &Tree, raw: &str) -> Option<Tree> {
    let query = Query::parse(raw);
    tree.filter(raw, |_, path| query.matches(path))
}
