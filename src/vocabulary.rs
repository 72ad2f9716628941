use crate::error::IngestionError;
use crate::registry::Target;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

const DEFAULT_DELIMITER: &str = "|";

/// A parsed belns/belanno document: INI-like header, then `[Values]`.
#[derive(Debug, Clone, PartialEq)]
pub struct VocabularyDocument {
    /// Header sections by name, e.g. `Namespace`, `Processing`.
    pub sections: BTreeMap<String, BTreeMap<String, String>>,
    /// `(entry, encoding)` pairs in document order.
    pub values: Vec<(String, String)>,
}

impl VocabularyDocument {
    pub fn parse(text: &str) -> Result<Self, IngestionError> {
        let mut sections: BTreeMap<String, BTreeMap<String, String>> = BTreeMap::new();
        let mut section = String::new();
        let mut delimiter: Option<String> = None;
        let mut values = Vec::new();

        for (index, line) in text.lines().enumerate() {
            let trimmed = line.trim();
            if let Some(delimiter) = &delimiter {
                if trimmed.is_empty() {
                    continue;
                }
                let (entry, encoding) = trimmed
                    .split_once(delimiter.as_str())
                    .unwrap_or((trimmed, ""));
                values.push((entry.trim().to_string(), encoding.trim().to_string()));
                continue;
            }

            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            if let Some(name) = trimmed.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
                if name == "Values" {
                    let configured = sections
                        .get("Processing")
                        .and_then(|p| p.get("DelimiterString"))
                        .filter(|d| !d.is_empty())
                        .cloned();
                    delimiter = Some(configured.unwrap_or_else(|| DEFAULT_DELIMITER.to_string()));
                } else {
                    section = name.to_string();
                }
                continue;
            }
            // only spaces are stripped from values so a tab delimiter survives
            match line.trim_start().trim_end_matches('\r').split_once('=') {
                Some((key, value)) => {
                    sections
                        .entry(section.clone())
                        .or_default()
                        .insert(key.trim().to_string(), value.trim_matches(' ').to_string());
                }
                None => {
                    let column = line.len() - line.trim_start().len() + 1;
                    return Err(IngestionError::MalformedHeader {
                        line: index + 1,
                        column,
                        found: trimmed.to_string(),
                        expected: "Key=Value".to_string(),
                    });
                }
            }
        }

        if delimiter.is_none() {
            return Err(IngestionError::MissingValues);
        }
        Ok(Self { sections, values })
    }

    fn header(&self, section: &str, key: &str) -> Option<&str> {
        self.sections
            .get(section)
            .and_then(|s| s.get(key))
            .map(String::as_str)
    }

    /// The `Keyword` declared under `[Namespace]` or `[AnnotationDefinition]`.
    pub fn keyword(&self) -> Option<&str> {
        self.header("Namespace", "Keyword")
            .or_else(|| self.header("AnnotationDefinition", "Keyword"))
    }

    pub fn case_sensitive(&self) -> bool {
        flag(self.header("Processing", "CaseSensitiveFlag"))
    }

    pub fn cacheable(&self) -> bool {
        flag(self.header("Processing", "CacheableFlag"))
    }
}

/// Flags default to on; only an explicit `no` turns them off.
fn flag(value: Option<&str>) -> bool {
    !value.is_some_and(|v| v.eq_ignore_ascii_case("no"))
}

/// What a store knows about an ingested source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceMetadata {
    pub target: Target,
    pub keyword: String,
    pub url: String,
    /// Keyword declared inside the vocabulary document itself.
    pub document_keyword: Option<String>,
    pub case_sensitive: bool,
    pub cacheable: bool,
    pub entries: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Alternate {
    pub keyword: String,
    pub url: String,
    pub entry: String,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Similar {
    pub keyword: String,
    pub entry: String,
}

/// Lookup capability over ingested controlled vocabularies, keyed by
/// `(target, keyword, url)`. Namespace and annotation sources never see
/// each other.
pub trait VocabularyStore {
    fn source(&self, target: Target, keyword: &str, url: &str) -> Option<SourceMetadata>;

    fn evict(&mut self, target: Target, keyword: &str, url: &str);

    fn exists(&self, target: Target, keyword: &str, url: &str, entry: &str) -> bool;

    /// Every source of `target` containing `entry` verbatim, case-sensitively.
    fn find_alternates(&self, target: Target, entry: &str) -> Vec<Alternate>;

    /// Entries of one source starting with `prefix` and at most `max_len` characters long.
    fn find_similar(
        &self,
        target: Target,
        keyword: &str,
        url: &str,
        prefix: &str,
        max_len: usize,
        limit: usize,
    ) -> Vec<Similar>;

    fn ingest(
        &mut self,
        target: Target,
        keyword: &str,
        url: &str,
        source: &[u8],
    ) -> Result<SourceMetadata, IngestionError>;
}

#[derive(Debug, Clone)]
struct StoredSource {
    metadata: SourceMetadata,
    entries: BTreeSet<String>,
    folded: HashSet<String>,
}

/// In-memory [`VocabularyStore`]. Can be kept alive across runs to reuse
/// cacheable sources.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    sources: BTreeMap<(Target, String, String), StoredSource>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    fn stored(&self, target: Target, keyword: &str, url: &str) -> Option<&StoredSource> {
        self.sources.get(&(target, keyword.to_string(), url.to_string()))
    }
}

impl VocabularyStore for MemoryStore {
    fn source(&self, target: Target, keyword: &str, url: &str) -> Option<SourceMetadata> {
        self.stored(target, keyword, url).map(|s| s.metadata.clone())
    }

    fn evict(&mut self, target: Target, keyword: &str, url: &str) {
        self.sources.remove(&(target, keyword.to_string(), url.to_string()));
    }

    fn exists(&self, target: Target, keyword: &str, url: &str, entry: &str) -> bool {
        match self.stored(target, keyword, url) {
            Some(stored) if stored.metadata.case_sensitive => stored.entries.contains(entry),
            Some(stored) => stored.folded.contains(&entry.to_lowercase()),
            None => false,
        }
    }

    fn find_alternates(&self, target: Target, entry: &str) -> Vec<Alternate> {
        self.sources
            .iter()
            .filter(|((t, _, _), stored)| *t == target && stored.entries.contains(entry))
            .map(|((_, keyword, url), _)| Alternate {
                keyword: keyword.clone(),
                url: url.clone(),
                entry: entry.to_string(),
            })
            .collect()
    }

    fn find_similar(
        &self,
        target: Target,
        keyword: &str,
        url: &str,
        prefix: &str,
        max_len: usize,
        limit: usize,
    ) -> Vec<Similar> {
        let Some(stored) = self.stored(target, keyword, url) else {
            return Vec::new();
        };
        stored
            .entries
            .range(prefix.to_string()..)
            .take_while(|entry| entry.starts_with(prefix))
            .filter(|entry| entry.chars().count() <= max_len)
            .take(limit)
            .map(|entry| Similar {
                keyword: keyword.to_string(),
                entry: entry.clone(),
            })
            .collect()
    }

    fn ingest(
        &mut self,
        target: Target,
        keyword: &str,
        url: &str,
        source: &[u8],
    ) -> Result<SourceMetadata, IngestionError> {
        let text = std::str::from_utf8(source).map_err(|_| IngestionError::Encoding)?;
        let document = VocabularyDocument::parse(text)?;

        let document_keyword = document.keyword().map(str::to_string);
        if let Some(declared) = &document_keyword {
            if declared != keyword {
                log::warn!(
                    "keyword `{declared}` in {url} differs from `{keyword}` used in the script"
                );
            }
        }

        let case_sensitive = document.case_sensitive();
        let cacheable = document.cacheable();
        let entries: BTreeSet<String> = document.values.into_iter().map(|(entry, _)| entry).collect();
        let folded = entries.iter().map(|e| e.to_lowercase()).collect();
        let metadata = SourceMetadata {
            target,
            keyword: keyword.to_string(),
            url: url.to_string(),
            document_keyword,
            case_sensitive,
            cacheable,
            entries: entries.len(),
        };
        log::info!(
            "ingested {} entries for {target} {keyword} from {url}",
            entries.len()
        );

        self.sources.insert(
            (target, keyword.to_string(), url.to_string()),
            StoredSource {
                metadata: metadata.clone(),
                entries,
                folded,
            },
        );
        Ok(metadata)
    }
}

/// Obtains the raw bytes of URL and FILE vocabularies.
pub trait SourceFetcher {
    fn fetch_url(&self, url: &str, timeout: Duration) -> Result<Vec<u8>, IngestionError>;

    fn read_file(&self, path: &str) -> Result<Vec<u8>, IngestionError>;
}

/// Reads FILE vocabularies and `file://` URLs. Relative paths resolve
/// against `base_dir` (usually the script's directory) when set.
#[derive(Debug, Clone, Default)]
pub struct FileFetcher {
    base_dir: Option<PathBuf>,
}

impl FileFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: Some(base_dir.into()),
        }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        let path = Path::new(path);
        match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }

    fn read_file_url(&self, url: &str) -> Option<Result<Vec<u8>, IngestionError>> {
        let parsed = Url::parse(url).ok().filter(|u| u.scheme() == "file")?;
        let result = match parsed.to_file_path() {
            Ok(path) => std::fs::read(&path).map_err(|e| IngestionError::Read {
                path: path.display().to_string(),
                reason: e.to_string(),
            }),
            Err(()) => Err(IngestionError::Download {
                url: url.to_string(),
                reason: "not a local file URL".to_string(),
            }),
        };
        Some(result)
    }
}

impl SourceFetcher for FileFetcher {
    fn fetch_url(&self, url: &str, _timeout: Duration) -> Result<Vec<u8>, IngestionError> {
        self.read_file_url(url).unwrap_or_else(|| {
            Err(IngestionError::Download {
                url: url.to_string(),
                reason: "HTTP downloads need the `http` feature".to_string(),
            })
        })
    }

    fn read_file(&self, path: &str) -> Result<Vec<u8>, IngestionError> {
        let resolved = self.resolve(path);
        std::fs::read(&resolved).map_err(|e| IngestionError::Read {
            path: resolved.display().to_string(),
            reason: e.to_string(),
        })
    }
}

/// Downloads URL vocabularies with a blocking HTTP client.
#[cfg(feature = "http")]
#[derive(Debug, Clone, Default)]
pub struct HttpFetcher {
    files: FileFetcher,
}

#[cfg(feature = "http")]
impl HttpFetcher {
    pub fn new(files: FileFetcher) -> Self {
        Self { files }
    }
}

#[cfg(feature = "http")]
impl SourceFetcher for HttpFetcher {
    fn fetch_url(&self, url: &str, timeout: Duration) -> Result<Vec<u8>, IngestionError> {
        if let Some(result) = self.files.read_file_url(url) {
            return result;
        }
        let to_error = |e: reqwest::Error| {
            if e.is_timeout() {
                IngestionError::Timeout {
                    url: url.to_string(),
                    seconds: timeout.as_secs(),
                }
            } else {
                IngestionError::Download {
                    url: url.to_string(),
                    reason: e.to_string(),
                }
            }
        };
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(to_error)?;
        let response = client
            .get(url)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(to_error)?;
        let bytes = response.bytes().map_err(to_error)?;
        Ok(bytes.to_vec())
    }

    fn read_file(&self, path: &str) -> Result<Vec<u8>, IngestionError> {
        self.files.read_file(path)
    }
}

/// The best fetcher this build offers.
pub fn default_fetcher(base_dir: Option<PathBuf>) -> Box<dyn SourceFetcher> {
    let files = match base_dir {
        Some(dir) => FileFetcher::with_base_dir(dir),
        None => FileFetcher::new(),
    };
    #[cfg(feature = "http")]
    {
        Box::new(HttpFetcher::new(files))
    }
    #[cfg(not(feature = "http"))]
    {
        Box::new(files)
    }
}
