use crate::registry::Target;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Display;

/// 1-based line and column of a token. `0:0` marks "no position".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Occurrence {
    pub keyword: String,
    pub entry: String,
    pub position: Position,
}

// keyword -> entry -> positions in source order
type EntryIndex = BTreeMap<String, BTreeMap<String, Vec<Position>>>;

/// Every namespace and annotation entry seen in statement bodies.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReferenceCache {
    namespaces: EntryIndex,
    annotations: EntryIndex,
}

impl ReferenceCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn index(&self, target: Target) -> &EntryIndex {
        match target {
            Target::Namespace => &self.namespaces,
            Target::Annotation => &self.annotations,
        }
    }

    pub fn record(&mut self, target: Target, keyword: &str, entry: &str, position: Position) {
        let index = match target {
            Target::Namespace => &mut self.namespaces,
            Target::Annotation => &mut self.annotations,
        };
        index
            .entry(keyword.to_string())
            .or_default()
            .entry(entry.to_string())
            .or_default()
            .push(position);
    }

    /// Keywords seen in statement bodies, ascending.
    pub fn keywords(&self, target: Target) -> impl Iterator<Item = &str> {
        self.index(target).keys().map(String::as_str)
    }

    /// Distinct entries recorded under a keyword, ascending.
    pub fn entries(&self, target: Target, keyword: &str) -> impl Iterator<Item = &str> {
        self.index(target)
            .get(keyword)
            .into_iter()
            .flat_map(|entries| entries.keys().map(String::as_str))
    }

    pub fn occurrences_of(&self, target: Target, keyword: &str, entry: &str) -> &[Position] {
        self.index(target)
            .get(keyword)
            .and_then(|entries| entries.get(entry))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// All occurrences under a keyword: entries ascending, positions in source order.
    pub fn occurrences(&self, target: Target, keyword: &str) -> Vec<Occurrence> {
        let Some(entries) = self.index(target).get(keyword) else {
            return Vec::new();
        };
        entries
            .iter()
            .flat_map(|(entry, positions)| {
                positions.iter().map(move |position| Occurrence {
                    keyword: keyword.to_string(),
                    entry: entry.clone(),
                    position: *position,
                })
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.namespaces.is_empty() && self.annotations.is_empty()
    }
}
