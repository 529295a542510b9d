//! Sibling ordering for document models.

use crate::model::{DocumentModel, DocumentNode};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Order of sibling entries within each level of the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum SortOrder {
    /// Declaration order of the values file
    #[value(name = "file")]
    FileOrder,
    /// Case-sensitive lexicographic, numeric runs by value
    #[default]
    #[value(name = "alphanum")]
    AlphaNumeric,
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortOrder::FileOrder => f.write_str("file"),
            SortOrder::AlphaNumeric => f.write_str("alphanum"),
        }
    }
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "file" => Ok(SortOrder::FileOrder),
            "alphanum" => Ok(SortOrder::AlphaNumeric),
            _ => Err(format!("unknown sort order: {}. Use file or alphanum", s)),
        }
    }
}

/// Reorder siblings at every level. Never moves a node across levels.
pub fn sort(mut model: DocumentModel, order: SortOrder) -> DocumentModel {
    if order == SortOrder::AlphaNumeric {
        sort_level(&mut model.nodes);
    }
    model
}

fn sort_level(nodes: &mut [DocumentNode]) {
    // sort_by is stable: equal keys keep their input order
    nodes.sort_by(|a, b| compare_keys(&a.name, &b.name));
    for node in nodes {
        sort_level(&mut node.children);
    }
}

/// Compare two keys, digit runs by numeric value and everything else
/// byte-wise, so `item2 < item10` and `[2] < [10]`.
pub fn compare_keys(a: &str, b: &str) -> Ordering {
    let mut left = Chunks::new(a);
    let mut right = Chunks::new(b);
    loop {
        match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => {
                let ord = match (is_digits(x), is_digits(y)) {
                    (true, true) => compare_numeric(x, y),
                    _ => x.cmp(y),
                };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
        }
    }
}

fn compare_numeric(x: &str, y: &str) -> Ordering {
    let xs = x.trim_start_matches('0');
    let ys = y.trim_start_matches('0');
    xs.len()
        .cmp(&ys.len())
        .then_with(|| xs.cmp(ys))
        // Same value: fewer leading zeros first
        .then_with(|| x.len().cmp(&y.len()))
}

fn is_digits(s: &str) -> bool {
    s.as_bytes().first().is_some_and(u8::is_ascii_digit)
}

/// Splits a key into alternating digit and non-digit runs.
struct Chunks<'a> {
    rest: &'a str,
}

impl<'a> Chunks<'a> {
    fn new(s: &'a str) -> Self {
        Self { rest: s }
    }
}

impl<'a> Iterator for Chunks<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        let first = self.rest.chars().next()?;
        let digit = first.is_ascii_digit();
        let end = self
            .rest
            .find(|c: char| c.is_ascii_digit() != digit)
            .unwrap_or(self.rest.len());
        let (chunk, rest) = self.rest.split_at(end);
        self.rest = rest;
        Some(chunk)
    }
}
