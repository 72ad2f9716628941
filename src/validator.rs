use crate::cache::ReferenceCache;
use crate::config::ValidatorConfig;
use crate::error::{ValidationError, ValidationWarning};
use crate::registry::{DefinitionRegistry, DefinitionValue, Target};
use crate::resolver::{full_match_pattern, VocabularyResolver};
use crate::vocabulary::{SourceFetcher, VocabularyStore};
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// Errors and warnings of one validation run, in reporting order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Outcome {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

/// Cross-checks recorded references against definitions and vocabularies.
///
/// The validator is unvalidated until the first call to [`Validator::validate`],
/// [`Validator::errors`] or [`Validator::warnings`]; that call computes both
/// lists and every later call returns the same result.
pub struct Validator<'a> {
    registry: &'a DefinitionRegistry,
    cache: &'a ReferenceCache,
    resolver: VocabularyResolver<'a>,
    outcome: Option<Outcome>,
}

impl<'a> Validator<'a> {
    pub fn new(
        registry: &'a DefinitionRegistry,
        cache: &'a ReferenceCache,
        store: &'a mut dyn VocabularyStore,
        fetcher: &'a dyn SourceFetcher,
        config: &'a ValidatorConfig,
    ) -> Self {
        Self {
            registry,
            cache,
            resolver: VocabularyResolver::new(store, fetcher, config),
            outcome: None,
        }
    }

    pub fn is_validated(&self) -> bool {
        self.outcome.is_some()
    }

    pub fn validate(&mut self) -> &Outcome {
        let run = Run {
            registry: self.registry,
            cache: self.cache,
        };
        let resolver = &mut self.resolver;
        self.outcome.get_or_insert_with(|| run.execute(resolver))
    }

    pub fn errors(&mut self) -> &[ValidationError] {
        &self.validate().errors
    }

    pub fn warnings(&mut self) -> &[ValidationWarning] {
        &self.validate().warnings
    }

    pub fn into_outcome(mut self) -> Outcome {
        self.validate();
        self.outcome.unwrap_or_default()
    }

    /// Keywords seen in statement bodies that have a definition.
    pub fn used_keywords(&self, target: Target) -> BTreeSet<String> {
        self.cache
            .keywords(target)
            .filter(|keyword| self.registry.contains(target, keyword))
            .map(str::to_string)
            .collect()
    }

    /// Keywords seen in statement bodies without any definition.
    pub fn keywords_without_definition(&self, target: Target) -> BTreeSet<String> {
        self.cache
            .keywords(target)
            .filter(|keyword| !self.registry.contains(target, keyword))
            .map(str::to_string)
            .collect()
    }
}

struct Run<'r> {
    registry: &'r DefinitionRegistry,
    cache: &'r ReferenceCache,
}

impl Run<'_> {
    fn execute(&self, resolver: &mut VocabularyResolver<'_>) -> Outcome {
        for target in Target::ALL {
            for (keyword, definitions) in self.registry.with_multiple_definitions(target) {
                log::warn!(
                    "{target} {keyword} is defined {} times, using the last definition",
                    definitions.len()
                );
            }
        }

        let mut errors = Vec::new();
        for target in Target::ALL {
            self.undefined(target, &mut errors);
        }
        for target in Target::ALL {
            self.not_in_list(target, &mut errors);
        }
        for target in Target::ALL {
            self.not_in_pattern(target, &mut errors);
        }
        let mut failures = Vec::new();
        for target in Target::ALL {
            self.not_in_vocabulary(target, resolver, &mut errors, &mut failures);
        }
        errors.extend(failures);

        let warnings = self.ambiguous_entries(&errors);
        log::debug!(
            "validation finished with {} errors and {} warnings",
            errors.len(),
            warnings.len()
        );
        Outcome { errors, warnings }
    }

    fn used(&self, target: Target) -> impl Iterator<Item = &str> + '_ {
        self.cache
            .keywords(target)
            .filter(move |keyword| self.registry.contains(target, keyword))
    }

    fn undefined(&self, target: Target, errors: &mut Vec<ValidationError>) {
        let undefined = self
            .cache
            .keywords(target)
            .filter(|keyword| !self.registry.contains(target, keyword));
        for keyword in undefined {
            for occurrence in self.cache.occurrences(target, keyword) {
                errors.push(match target {
                    Target::Namespace => ValidationError::UndefinedNamespace {
                        keyword: occurrence.keyword,
                        entry: occurrence.entry,
                        position: occurrence.position,
                    },
                    Target::Annotation => ValidationError::UndefinedAnnotation {
                        keyword: occurrence.keyword,
                        entry: occurrence.entry,
                        position: occurrence.position,
                    },
                });
            }
        }
    }

    fn not_in_list(&self, target: Target, errors: &mut Vec<ValidationError>) {
        for keyword in self.used(target) {
            let Some(DefinitionValue::List(values)) =
                self.registry.get(target, keyword).map(|d| &d.value)
            else {
                continue;
            };
            for occurrence in self.cache.occurrences(target, keyword) {
                if values.contains(&occurrence.entry) {
                    continue;
                }
                errors.push(match target {
                    Target::Namespace => ValidationError::NotInNamespaceList {
                        keyword: occurrence.keyword,
                        entry: occurrence.entry,
                        position: occurrence.position,
                    },
                    Target::Annotation => ValidationError::NotInAnnotationList {
                        keyword: occurrence.keyword,
                        entry: occurrence.entry,
                        position: occurrence.position,
                    },
                });
            }
        }
    }

    fn not_in_pattern(&self, target: Target, errors: &mut Vec<ValidationError>) {
        for keyword in self.used(target) {
            let Some(DefinitionValue::Pattern(pattern)) =
                self.registry.get(target, keyword).map(|d| &d.value)
            else {
                continue;
            };
            let regex = full_match_pattern(pattern);
            if let Err(err) = &regex {
                log::warn!("pattern of {target} {keyword} does not compile: {err}");
            }
            for occurrence in self.cache.occurrences(target, keyword) {
                let hint = match &regex {
                    Ok(regex) if regex.is_match(&occurrence.entry) => continue,
                    Ok(_) => None,
                    Err(err) => Some(format!("invalid pattern: {err}")),
                };
                errors.push(match target {
                    Target::Namespace => ValidationError::NotInNamespacePattern {
                        keyword: occurrence.keyword,
                        entry: occurrence.entry,
                        position: occurrence.position,
                        pattern: pattern.clone(),
                        hint,
                    },
                    Target::Annotation => ValidationError::NotInAnnotationPattern {
                        keyword: occurrence.keyword,
                        entry: occurrence.entry,
                        position: occurrence.position,
                        pattern: pattern.clone(),
                        hint,
                    },
                });
            }
        }
    }

    fn not_in_vocabulary(
        &self,
        target: Target,
        resolver: &mut VocabularyResolver<'_>,
        errors: &mut Vec<ValidationError>,
        failures: &mut Vec<ValidationError>,
    ) {
        let used: HashSet<&str> = self.used(target).collect();

        // ingest in definition order, check in keyword order
        let mut loaded: BTreeMap<&str, &str> = BTreeMap::new();
        for definition in self.registry.url_backed(target) {
            let keyword = definition.keyword.as_str();
            let Some(location) = definition.source_location() else {
                continue;
            };
            if !used.contains(keyword) {
                continue;
            }
            match resolver.ensure_source(target, keyword, definition.kind(), location) {
                Ok(_) => {
                    loaded.insert(keyword, location);
                }
                Err(err) => failures.push(ValidationError::SourceIngestionFailure {
                    target,
                    keyword: keyword.to_string(),
                    url: location.to_string(),
                    position: err.position().unwrap_or_default(),
                    hint: err.to_string(),
                }),
            }
        }

        for (keyword, location) in loaded {
            for occurrence in self.cache.occurrences(target, keyword) {
                let lookup = resolver.resolve(target, keyword, location, &occurrence.entry);
                if lookup.exists {
                    continue;
                }
                let hint = lookup.hint.unwrap_or_default();
                errors.push(match target {
                    Target::Namespace => ValidationError::NotInNamespaceVocabulary {
                        keyword: occurrence.keyword,
                        entry: occurrence.entry,
                        position: occurrence.position,
                        url: location.to_string(),
                        hint,
                    },
                    Target::Annotation => ValidationError::NotInAnnotationVocabulary {
                        keyword: occurrence.keyword,
                        entry: occurrence.entry,
                        position: occurrence.position,
                        url: location.to_string(),
                        hint,
                    },
                });
            }
        }
    }

    /// Entries valid under more than one used namespace, compared case-insensitively.
    fn ambiguous_entries(&self, errors: &[ValidationError]) -> Vec<ValidationWarning> {
        let invalid: HashSet<(&str, &str)> = errors
            .iter()
            .filter_map(|error| match error {
                ValidationError::NotInNamespaceList { keyword, entry, .. }
                | ValidationError::NotInNamespacePattern { keyword, entry, .. }
                | ValidationError::NotInNamespaceVocabulary { keyword, entry, .. } => {
                    Some((keyword.as_str(), entry.as_str()))
                }
                _ => None,
            })
            .collect();

        let used: Vec<&str> = self.used(Target::Namespace).collect();
        let mut keywords_by_entry: BTreeMap<String, BTreeSet<&str>> = BTreeMap::new();
        for keyword in &used {
            for entry in self.cache.entries(Target::Namespace, keyword) {
                if !invalid.contains(&(*keyword, entry)) {
                    keywords_by_entry
                        .entry(entry.to_lowercase())
                        .or_default()
                        .insert(*keyword);
                }
            }
        }

        let mut warnings = Vec::new();
        for keyword in &used {
            for entry in self.cache.entries(Target::Namespace, keyword) {
                if invalid.contains(&(*keyword, entry)) {
                    continue;
                }
                let others: Vec<String> = keywords_by_entry
                    .get(&entry.to_lowercase())
                    .into_iter()
                    .flatten()
                    .filter(|other| *other != keyword)
                    .map(|other| other.to_string())
                    .collect();
                if others.is_empty() {
                    continue;
                }
                let hint = format!("{entry} exists also in {}", others.join(", "));
                for position in self.cache.occurrences_of(Target::Namespace, keyword, entry) {
                    warnings.push(ValidationWarning::AmbiguousEntry {
                        keyword: keyword.to_string(),
                        entry: entry.to_string(),
                        position: *position,
                        others: others.clone(),
                        hint: hint.clone(),
                    });
                }
            }
        }
        warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::Position;
    use crate::registry::Definition;
    use crate::vocabulary::{FileFetcher, MemoryStore};

    fn definition(target: Target, keyword: &str, value: DefinitionValue) -> Definition {
        Definition {
            target,
            keyword: keyword.to_string(),
            value,
        }
    }

    fn list(values: &[&str]) -> DefinitionValue {
        DefinitionValue::List(values.iter().map(|v| v.to_string()).collect())
    }

    #[test]
    fn test_undefined_keywords_report_every_occurrence() {
        let registry = DefinitionRegistry::new();
        let mut cache = ReferenceCache::new();
        cache.record(Target::Namespace, "HGNC", "TNF", Position::new(1, 8));
        cache.record(Target::Namespace, "HGNC", "TNF", Position::new(2, 8));
        cache.record(Target::Annotation, "Species", "9606", Position::new(3, 15));

        let mut store = MemoryStore::new();
        let fetcher = FileFetcher::new();
        let config = ValidatorConfig::default();
        let mut validator = Validator::new(&registry, &cache, &mut store, &fetcher, &config);

        let classes: Vec<&str> = validator.errors().iter().map(|e| e.class()).collect();
        assert_eq!(
            classes,
            vec!["UndefinedNamespace", "UndefinedNamespace", "UndefinedAnnotation"]
        );
        assert!(validator.warnings().is_empty());
        assert!(validator
            .keywords_without_definition(Target::Namespace)
            .contains("HGNC"));
        assert!(validator.used_keywords(Target::Namespace).is_empty());
    }

    #[test]
    fn test_list_and_pattern_semantics() {
        let mut registry = DefinitionRegistry::new();
        registry.add(definition(Target::Annotation, "Dir", list(&["up", "down"])));
        registry.add(definition(
            Target::Annotation,
            "Taxon",
            DefinitionValue::Pattern("[0-9]+".to_string()),
        ));
        let mut cache = ReferenceCache::new();
        cache.record(Target::Annotation, "Dir", "up", Position::new(1, 11));
        cache.record(Target::Annotation, "Dir", "sideways", Position::new(2, 11));
        cache.record(Target::Annotation, "Taxon", "9606", Position::new(3, 13));
        cache.record(Target::Annotation, "Taxon", "9606a", Position::new(4, 13));

        let mut store = MemoryStore::new();
        let fetcher = FileFetcher::new();
        let config = ValidatorConfig::default();
        let outcome = Validator::new(&registry, &cache, &mut store, &fetcher, &config)
            .into_outcome();

        assert_eq!(outcome.errors.len(), 2);
        assert_eq!(
            outcome.errors[0],
            ValidationError::NotInAnnotationList {
                keyword: "Dir".to_string(),
                entry: "sideways".to_string(),
                position: Position::new(2, 11),
            }
        );
        assert_eq!(outcome.errors[1].class(), "NotInAnnotationPattern");
        assert_eq!(outcome.errors[1].position(), Position::new(4, 13));
    }

    #[test]
    fn test_invalid_pattern_flags_every_occurrence() {
        let mut registry = DefinitionRegistry::new();
        registry.add(definition(
            Target::Namespace,
            "BAD",
            DefinitionValue::Pattern("(".to_string()),
        ));
        let mut cache = ReferenceCache::new();
        cache.record(Target::Namespace, "BAD", "a", Position::new(1, 7));
        cache.record(Target::Namespace, "BAD", "b", Position::new(2, 7));

        let mut store = MemoryStore::new();
        let fetcher = FileFetcher::new();
        let config = ValidatorConfig::default();
        let mut validator = Validator::new(&registry, &cache, &mut store, &fetcher, &config);
        let errors = validator.errors();
        assert_eq!(errors.len(), 2);
        match &errors[0] {
            ValidationError::NotInNamespacePattern { hint: Some(hint), .. } => {
                assert!(hint.starts_with("invalid pattern"))
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_results_are_memoized() {
        let registry = DefinitionRegistry::new();
        let mut cache = ReferenceCache::new();
        cache.record(Target::Namespace, "X", "y", Position::new(1, 5));
        let mut store = MemoryStore::new();
        let fetcher = FileFetcher::new();
        let config = ValidatorConfig::default();
        let mut validator = Validator::new(&registry, &cache, &mut store, &fetcher, &config);

        assert!(!validator.is_validated());
        let first = validator.validate().clone();
        assert!(validator.is_validated());
        assert_eq!(&first, validator.validate());
    }

    #[test]
    fn test_ambiguity_between_list_namespaces() {
        let mut registry = DefinitionRegistry::new();
        registry.add(definition(Target::Namespace, "A", list(&["TNF"])));
        registry.add(definition(Target::Namespace, "B", list(&["tnf", "x"])));
        let mut cache = ReferenceCache::new();
        cache.record(Target::Namespace, "A", "TNF", Position::new(1, 5));
        cache.record(Target::Namespace, "B", "tnf", Position::new(2, 5));
        cache.record(Target::Namespace, "B", "x", Position::new(3, 5));

        let mut store = MemoryStore::new();
        let fetcher = FileFetcher::new();
        let config = ValidatorConfig::default();
        let outcome = Validator::new(&registry, &cache, &mut store, &fetcher, &config)
            .into_outcome();

        assert!(outcome.errors.is_empty());
        assert_eq!(outcome.warnings.len(), 2);
        match &outcome.warnings[0] {
            ValidationWarning::AmbiguousEntry {
                keyword,
                others,
                hint,
                ..
            } => {
                assert_eq!(keyword, "A");
                assert_eq!(others, &vec!["B".to_string()]);
                assert_eq!(hint, "TNF exists also in B");
            }
        }
    }

    #[test]
    fn test_unreachable_source_yields_one_failure() {
        let mut registry = DefinitionRegistry::new();
        registry.add(definition(
            Target::Namespace,
            "HGNC",
            DefinitionValue::Url("http://unreachable.invalid/hgnc.belns".to_string()),
        ));
        let mut cache = ReferenceCache::new();
        cache.record(Target::Namespace, "HGNC", "TNF", Position::new(1, 8));
        cache.record(Target::Namespace, "HGNC", "AKT1", Position::new(2, 8));

        let mut store = MemoryStore::new();
        let fetcher = FileFetcher::new();
        let config = ValidatorConfig::default();
        let outcome = Validator::new(&registry, &cache, &mut store, &fetcher, &config)
            .into_outcome();

        assert_eq!(outcome.errors.len(), 1);
        match &outcome.errors[0] {
            ValidationError::SourceIngestionFailure {
                keyword,
                position,
                url,
                ..
            } => {
                assert_eq!(keyword, "HGNC");
                assert_eq!(url, "http://unreachable.invalid/hgnc.belns");
                assert_eq!(*position, Position::new(0, 0));
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
