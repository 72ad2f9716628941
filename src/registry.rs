use crate::error::RegistryError;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Display;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Target {
    Namespace,
    Annotation,
}

impl Target {
    pub const ALL: [Target; 2] = [Target::Namespace, Target::Annotation];
}

impl Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Target::Namespace => write!(f, "namespace"),
            Target::Annotation => write!(f, "annotation"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DefinitionKind {
    Url,
    List,
    Pattern,
    File,
}

impl DefinitionKind {
    pub fn name(self) -> &'static str {
        match self {
            DefinitionKind::Url => "URL",
            DefinitionKind::List => "LIST",
            DefinitionKind::Pattern => "PATTERN",
            DefinitionKind::File => "FILE",
        }
    }
}

impl FromStr for DefinitionKind {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "URL" => Ok(DefinitionKind::Url),
            "LIST" => Ok(DefinitionKind::List),
            "PATTERN" => Ok(DefinitionKind::Pattern),
            "FILE" => Ok(DefinitionKind::File),
            _ => Err(RegistryError::UnknownKind {
                name: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "UPPERCASE")]
pub enum DefinitionValue {
    Url(String),
    List(BTreeSet<String>),
    Pattern(String),
    File(String),
}

/// A `DEFINE NAMESPACE|ANNOTATION <keyword> AS ...` declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Definition {
    pub target: Target,
    pub keyword: String,
    #[serde(flatten)]
    pub value: DefinitionValue,
}

impl Definition {
    pub fn kind(&self) -> DefinitionKind {
        match self.value {
            DefinitionValue::Url(_) => DefinitionKind::Url,
            DefinitionValue::List(_) => DefinitionKind::List,
            DefinitionValue::Pattern(_) => DefinitionKind::Pattern,
            DefinitionValue::File(_) => DefinitionKind::File,
        }
    }

    /// The location of an externally sourced vocabulary (URL or file path).
    pub fn source_location(&self) -> Option<&str> {
        match &self.value {
            DefinitionValue::Url(location) | DefinitionValue::File(location) => Some(location),
            DefinitionValue::List(_) | DefinitionValue::Pattern(_) => None,
        }
    }
}

/// Declared namespaces and annotations of one script.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DefinitionRegistry {
    definitions: Vec<Definition>,
}

impl DefinitionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, definition: Definition) {
        log::debug!(
            "registered {} {} as {}",
            definition.target,
            definition.keyword,
            definition.kind().name()
        );
        self.definitions.push(definition);
    }

    /// Every definition in declaration order, including repeated keywords.
    pub fn definitions(&self) -> &[Definition] {
        &self.definitions
    }

    /// The effective definition for a keyword. The last declaration wins.
    pub fn get(&self, target: Target, keyword: &str) -> Option<&Definition> {
        self.definitions
            .iter()
            .rev()
            .find(|d| d.target == target && d.keyword == keyword)
    }

    pub fn contains(&self, target: Target, keyword: &str) -> bool {
        self.get(target, keyword).is_some()
    }

    pub fn keywords(&self, target: Target) -> BTreeSet<String> {
        self.definitions
            .iter()
            .filter(|d| d.target == target)
            .map(|d| d.keyword.clone())
            .collect()
    }

    /// Keywords whose effective definition is of the given kind.
    pub fn keywords_by_kind(&self, target: Target, kind: DefinitionKind) -> BTreeSet<String> {
        self.keywords(target)
            .into_iter()
            .filter(|keyword| {
                self.get(target, keyword)
                    .is_some_and(|definition| definition.kind() == kind)
            })
            .collect()
    }

    pub fn keywords_by_kind_name(
        &self,
        target: Target,
        kind: &str,
    ) -> Result<BTreeSet<String>, RegistryError> {
        let kind = kind.parse::<DefinitionKind>()?;
        Ok(self.keywords_by_kind(target, kind))
    }

    /// Keywords declared more than once, with every declaration.
    pub fn with_multiple_definitions(&self, target: Target) -> BTreeMap<String, Vec<&Definition>> {
        let mut grouped: BTreeMap<String, Vec<&Definition>> = BTreeMap::new();
        for definition in self.definitions.iter().filter(|d| d.target == target) {
            grouped
                .entry(definition.keyword.clone())
                .or_default()
                .push(definition);
        }
        grouped.retain(|_, definitions| definitions.len() > 1);
        grouped
    }

    /// Effective URL and FILE definitions, in declaration order.
    pub fn url_backed(&self, target: Target) -> Vec<&Definition> {
        let mut seen = BTreeSet::new();
        let mut backed: Vec<&Definition> = self
            .definitions
            .iter()
            .rev()
            .filter(|d| d.target == target && seen.insert(d.keyword.as_str()))
            .filter(|d| d.source_location().is_some())
            .collect();
        backed.reverse();
        backed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(target: Target, keyword: &str, location: &str) -> Definition {
        Definition {
            target,
            keyword: keyword.to_string(),
            value: DefinitionValue::Url(location.to_string()),
        }
    }

    fn list(target: Target, keyword: &str, values: &[&str]) -> Definition {
        Definition {
            target,
            keyword: keyword.to_string(),
            value: DefinitionValue::List(values.iter().map(|v| v.to_string()).collect()),
        }
    }

    fn registry() -> DefinitionRegistry {
        let mut registry = DefinitionRegistry::new();
        registry.add(url(Target::Namespace, "HGNC", "http://x/hgnc.belns"));
        registry.add(list(Target::Namespace, "DIR", &["a", "b"]));
        registry.add(url(Target::Annotation, "Species", "http://x/species.belanno"));
        registry.add(Definition {
            target: Target::Annotation,
            keyword: "Tissue".to_string(),
            value: DefinitionValue::Pattern("[a-z]+".to_string()),
        });
        registry
    }

    #[test]
    fn test_keywords_by_target() {
        let registry = registry();
        let namespaces: Vec<String> = registry.keywords(Target::Namespace).into_iter().collect();
        assert_eq!(namespaces, vec!["DIR", "HGNC"]);
        assert!(registry.contains(Target::Annotation, "Species"));
        assert!(!registry.contains(Target::Namespace, "Species"));
    }

    #[test]
    fn test_keywords_by_kind() {
        let registry = registry();
        let lists = registry.keywords_by_kind(Target::Namespace, DefinitionKind::List);
        assert_eq!(lists.into_iter().collect::<Vec<_>>(), vec!["DIR"]);
        let patterns = registry
            .keywords_by_kind_name(Target::Annotation, "PATTERN")
            .unwrap();
        assert!(patterns.contains("Tissue"));
    }

    #[test]
    fn test_unknown_kind_name() {
        let err = registry()
            .keywords_by_kind_name(Target::Namespace, "HTTP")
            .unwrap_err();
        assert_eq!(
            err,
            RegistryError::UnknownKind {
                name: "HTTP".to_string()
            }
        );
    }

    #[test]
    fn test_multiple_definitions_last_wins() {
        let mut registry = registry();
        registry.add(list(Target::Namespace, "HGNC", &["AKT1"]));

        let multiple = registry.with_multiple_definitions(Target::Namespace);
        assert_eq!(multiple.len(), 1);
        assert_eq!(multiple["HGNC"].len(), 2);

        let effective = registry.get(Target::Namespace, "HGNC").unwrap();
        assert_eq!(effective.kind(), DefinitionKind::List);
        assert!(registry.url_backed(Target::Namespace).is_empty());
    }

    #[test]
    fn test_url_backed_includes_files() {
        let mut registry = registry();
        registry.add(Definition {
            target: Target::Namespace,
            keyword: "LOCAL".to_string(),
            value: DefinitionValue::File("local.belns".to_string()),
        });
        let keywords: Vec<&str> = registry
            .url_backed(Target::Namespace)
            .into_iter()
            .map(|d| d.keyword.as_str())
            .collect();
        assert_eq!(keywords, vec!["HGNC", "LOCAL"]);
    }
}
