use crate::config::ValidatorConfig;
use crate::error::IngestionError;
use crate::registry::{DefinitionKind, Target};
use crate::vocabulary::{SourceFetcher, SourceMetadata, VocabularyStore};
use regex::Regex;
use std::collections::{BTreeSet, HashMap};
use url::form_urlencoded;

/// The answer for one `(target, keyword, url, entry)` lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lookup {
    pub exists: bool,
    /// Set exactly when `exists` is false.
    pub hint: Option<String>,
}

/// Decides entry membership for URL/FILE backed keywords and builds
/// remediation hints. One resolver lives for one validation run.
pub struct VocabularyResolver<'a> {
    store: &'a mut dyn VocabularyStore,
    fetcher: &'a dyn SourceFetcher,
    config: &'a ValidatorConfig,
    lookups: HashMap<(Target, String, String, String), Lookup>,
    // hints of missing entries, keyed by entry text within a target
    hints: HashMap<(Target, String), String>,
    // one ingestion attempt per (target, keyword, url)
    sources: HashMap<(Target, String, String), Result<SourceMetadata, IngestionError>>,
}

impl<'a> VocabularyResolver<'a> {
    pub fn new(
        store: &'a mut dyn VocabularyStore,
        fetcher: &'a dyn SourceFetcher,
        config: &'a ValidatorConfig,
    ) -> Self {
        Self {
            store,
            fetcher,
            config,
            lookups: HashMap::new(),
            hints: HashMap::new(),
            sources: HashMap::new(),
        }
    }

    /// Loads the vocabulary behind a URL or FILE definition into the store,
    /// at most once per run.
    pub fn ensure_source(
        &mut self,
        target: Target,
        keyword: &str,
        kind: DefinitionKind,
        location: &str,
    ) -> Result<SourceMetadata, IngestionError> {
        let key = (target, keyword.to_string(), location.to_string());
        if let Some(result) = self.sources.get(&key) {
            return result.clone();
        }
        let result = self.load(target, keyword, kind, location);
        self.sources.insert(key, result.clone());
        result
    }

    fn load(
        &mut self,
        target: Target,
        keyword: &str,
        kind: DefinitionKind,
        location: &str,
    ) -> Result<SourceMetadata, IngestionError> {
        if let Some(metadata) = self.store.source(target, keyword, location) {
            if metadata.cacheable {
                log::debug!("reusing stored vocabulary {keyword} from {location}");
                return Ok(metadata);
            }
            log::warn!("{location} is not cacheable, evicting {keyword} before reloading");
            self.store.evict(target, keyword, location);
        }

        log::info!("loading vocabulary {keyword} from {location}");
        let bytes = match kind {
            DefinitionKind::File => self.fetcher.read_file(location),
            DefinitionKind::Url | DefinitionKind::List | DefinitionKind::Pattern => self
                .fetcher
                .fetch_url(location, self.config.download_timeout()),
        };
        let result =
            bytes.and_then(|bytes| self.store.ingest(target, keyword, location, &bytes));
        if let Err(err) = &result {
            log::error!("could not load vocabulary {keyword} from {location}: {err}");
        }
        result
    }

    /// Checks one entry. Repeated triples are answered from memory.
    pub fn resolve(&mut self, target: Target, keyword: &str, url: &str, entry: &str) -> Lookup {
        let key = (target, keyword.to_string(), url.to_string(), entry.to_string());
        if let Some(lookup) = self.lookups.get(&key) {
            log::debug!("lookup cache hit for {keyword}:{entry}");
            return lookup.clone();
        }
        let exists = self.store.exists(target, keyword, url, entry);
        let hint = (!exists).then(|| self.hint_for(target, keyword, url, entry));
        let lookup = Lookup { exists, hint };
        self.lookups.insert(key, lookup.clone());
        lookup
    }

    /// Exact alternates, then similar entries, then a search link.
    fn hint_for(&mut self, target: Target, keyword: &str, url: &str, entry: &str) -> String {
        let key = (target, entry.to_string());
        if let Some(hint) = self.hints.get(&key) {
            return hint.clone();
        }
        let hint = self
            .alternates_hint(target, keyword, entry)
            .or_else(|| self.similar_hint(target, keyword, url, entry))
            .unwrap_or_else(|| self.suggestion_hint(entry));
        self.hints.insert(key, hint.clone());
        hint
    }

    fn alternates_hint(&self, target: Target, keyword: &str, entry: &str) -> Option<String> {
        let alternates: BTreeSet<String> = self
            .store
            .find_alternates(target, entry)
            .into_iter()
            .filter(|alternate| alternate.keyword != keyword)
            .map(|a| format!("{}:\"{}\"({})", a.keyword, a.entry, a.url))
            .collect();
        if alternates.is_empty() {
            return None;
        }
        Some(format!(
            "Did you mean: {}",
            alternates.into_iter().collect::<Vec<_>>().join(", ")
        ))
    }

    fn similar_hint(
        &self,
        target: Target,
        keyword: &str,
        url: &str,
        entry: &str,
    ) -> Option<String> {
        let length = entry.chars().count();
        if length < self.config.similar_min_length {
            return None;
        }
        let prefix: String = entry
            .chars()
            .take(length.saturating_sub(self.config.similar_trim))
            .collect();
        let similar: BTreeSet<String> = self
            .store
            .find_similar(
                target,
                keyword,
                url,
                &prefix,
                length + self.config.similar_length_window,
                self.config.similar_limit,
            )
            .into_iter()
            .map(|s| format!("{}:\"{}\"", s.keyword, s.entry))
            .collect();
        if similar.is_empty() {
            return None;
        }
        Some(format!(
            "Similar: {}",
            similar.into_iter().collect::<Vec<_>>().join(", ")
        ))
    }

    fn suggestion_hint(&self, entry: &str) -> String {
        let query: String = form_urlencoded::byte_serialize(entry.as_bytes()).collect();
        format!("[OLS suggests]({}?q={})", self.config.suggestion_url, query)
    }

    /// Number of distinct triples resolved so far.
    pub fn lookup_count(&self) -> usize {
        self.lookups.len()
    }
}

/// Compiles a PATTERN definition so that it has to match the whole entry.
pub fn full_match_pattern(pattern: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!("^(?:{pattern})$"))
}
