use crate::ast::BelDocument;
use crate::cache::{Position, ReferenceCache};
use crate::config::ValidatorConfig;
use crate::error::{BelError, SyntaxError, ValidationError, ValidationWarning};
use crate::parser::{check_line_by_line, LineError, Parser};
use crate::registry::DefinitionRegistry;
use crate::report::{render, Record};
use crate::transformer::Transformer;
use crate::validator::Validator;
use crate::vocabulary::{default_fetcher, SourceFetcher, VocabularyStore};
use serde::{Serialize, Serializer};
use std::path::Path;

/// A script folded into its document model, with the definitions and
/// references collected along the way.
#[derive(Debug, Clone)]
pub struct ParsedScript {
    pub document: BelDocument,
    pub registry: DefinitionRegistry,
    pub cache: ReferenceCache,
}

/// Parses and transforms a BEL script without touching any vocabulary.
///
/// # Errors
/// Returns a `BelError` if the script has a syntax error.
pub fn parse_document(source: &str, file_name: &str) -> Result<ParsedScript, BelError> {
    let tree = Parser::new_with_name(source, file_name.to_string()).parse_script()?;
    let mut registry = DefinitionRegistry::new();
    let mut cache = ReferenceCache::new();
    let document = Transformer::new(&mut registry, &mut cache).transform(&tree)?;
    Ok(ParsedScript {
        document,
        registry,
        cache,
    })
}

/// The outcome of validating one script.
///
/// `document` is `None` when the script did not parse; the syntax errors are
/// then reported in `errors`, one per broken line.
#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub file_name: String,
    pub source: String,
    pub document: Option<BelDocument>,
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

#[derive(Serialize)]
struct Export<'a> {
    file_name: &'a str,
    document: Option<&'a BelDocument>,
    errors: Vec<Record>,
    warnings: Vec<Record>,
}

impl Serialize for ValidationResult {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        Export {
            file_name: &self.file_name,
            document: self.document.as_ref(),
            errors: self.error_records(),
            warnings: self.warning_records(),
        }
        .serialize(serializer)
    }
}

impl ValidationResult {
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    #[must_use]
    pub fn error_records(&self) -> Vec<Record> {
        self.errors.iter().map(Record::from).collect()
    }

    #[must_use]
    pub fn warning_records(&self) -> Vec<Record> {
        self.warnings.iter().map(Record::from).collect()
    }

    /// Errors first, then warnings.
    #[must_use]
    pub fn records(&self) -> Vec<Record> {
        let mut records = self.error_records();
        records.extend(self.warning_records());
        records
    }

    /// Serializes the document model and records into pretty-printed JSON.
    ///
    /// # Errors
    /// Returns a `serde_json::Error` if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self)
    }

    /// # Errors
    /// Returns a `serde_yaml::Error` if serialization fails.
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(&self)
    }

    /// Every record rendered as a report pointing into the script.
    #[must_use]
    pub fn render_diagnostics(&self) -> String {
        render(&self.records(), &self.source, &self.file_name)
    }
}

/// Parses, transforms and validates a BEL script.
///
/// Vocabularies are looked up in `store` and loaded through `fetcher` the
/// first time a used keyword needs them.
///
/// # Errors
/// Returns a `BelError` for syntax errors when the line-by-line fallback is
/// disabled, and for parse trees the transformer cannot fold.
pub fn validate(
    source: &str,
    file_name: &str,
    store: &mut dyn VocabularyStore,
    fetcher: &dyn SourceFetcher,
    config: &ValidatorConfig,
) -> Result<ValidationResult, BelError> {
    let parsed = match parse_document(source, file_name) {
        Ok(parsed) => parsed,
        Err(BelError::Syntax(error)) if config.line_by_line_fallback => {
            log::info!("{file_name} has syntax errors, checking line by line");
            return Ok(ValidationResult {
                file_name: file_name.to_string(),
                source: source.to_string(),
                document: None,
                errors: syntax_errors(source, file_name, error),
                warnings: Vec::new(),
            });
        }
        Err(err) => return Err(err),
    };

    let outcome = Validator::new(&parsed.registry, &parsed.cache, store, fetcher, config)
        .into_outcome();
    Ok(ValidationResult {
        file_name: file_name.to_string(),
        source: source.to_string(),
        document: Some(parsed.document),
        errors: outcome.errors,
        warnings: outcome.warnings,
    })
}

/// Reads and validates a script file. FILE vocabularies and relative paths
/// resolve against the script's directory.
///
/// # Errors
/// Returns `BelError::Io` if the file cannot be read, otherwise as [`validate`].
pub fn validate_file(
    path: &Path,
    store: &mut dyn VocabularyStore,
    config: &ValidatorConfig,
) -> Result<ValidationResult, BelError> {
    let source = std::fs::read_to_string(path).map_err(|e| BelError::Io {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    let fetcher = default_fetcher(path.parent().map(Path::to_path_buf));
    validate(
        &source,
        &path.display().to_string(),
        store,
        fetcher.as_ref(),
        config,
    )
}

fn syntax_errors(source: &str, file_name: &str, error: SyntaxError) -> Vec<ValidationError> {
    let mut line_errors = check_line_by_line(source, file_name);
    if line_errors.is_empty() {
        // only the script as a whole is broken
        let line_text = source
            .lines()
            .nth(error.line().saturating_sub(1))
            .unwrap_or_default()
            .to_string();
        line_errors.push(LineError { line_text, error });
    }
    line_errors
        .into_iter()
        .map(|line_error| ValidationError::SyntaxError {
            entry: line_error.error.token().to_string(),
            position: Position::new(line_error.error.line(), line_error.error.column()),
            hint: line_error.hint(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vocabulary::{FileFetcher, MemoryStore};

    fn run(source: &str) -> ValidationResult {
        let mut store = MemoryStore::new();
        let fetcher = FileFetcher::new();
        validate(
            source,
            "test.bel",
            &mut store,
            &fetcher,
            &ValidatorConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_list_definitions_validate_offline() {
        let source = r#"DEFINE NAMESPACE CHEBI AS LIST {"water", "ethanol"}
DEFINE ANNOTATION Species AS LIST {"9606"}
SET Species = "9606"
a(CHEBI:water) -| a(CHEBI:ethanol)
"#;
        let result = run(source);
        assert!(result.is_valid(), "{:?}", result.errors);
        assert!(result.warnings.is_empty());
        assert_eq!(result.document.unwrap().definitions.len(), 2);
    }

    #[test]
    fn test_syntax_error_becomes_record() {
        let source = "a(CHEBI:water) -> \np(HGNC:TNF\n";
        let result = run(source);
        assert!(result.document.is_none());
        assert!(!result.errors.is_empty());
        assert!(result
            .errors
            .iter()
            .all(|e| e.class() == "SyntaxError"));
        assert_eq!(result.errors[0].position().line, 1);
    }

    #[test]
    fn test_syntax_error_without_fallback() {
        let mut store = MemoryStore::new();
        let fetcher = FileFetcher::new();
        let config = ValidatorConfig {
            line_by_line_fallback: false,
            ..ValidatorConfig::default()
        };
        let err = validate("p(HGNC:", "test.bel", &mut store, &fetcher, &config).unwrap_err();
        assert!(matches!(err, BelError::Syntax(_)));
    }

    #[test]
    fn test_to_json_has_document_and_records() {
        let source = "a(CHEBI:water) -| a(CHEBI:ethanol)\n";
        let result = run(source);
        let json: serde_json::Value = serde_json::from_str(&result.to_json().unwrap()).unwrap();
        assert_eq!(json["file_name"], "test.bel");
        assert_eq!(json["errors"].as_array().unwrap().len(), 2);
        assert_eq!(json["errors"][0]["error_class"], "UndefinedNamespace");
        assert_eq!(json["errors"][0]["entry"], "ethanol");
        assert!(json["document"]["statements_and_sets"].is_array());
    }

    #[test]
    fn test_to_yaml() {
        let result = run("a(CHEBI:water)\n");
        let yaml = result.to_yaml().unwrap();
        assert!(yaml.contains("file_name: test.bel"));
        assert!(yaml.contains("error_class: UndefinedNamespace"));
    }

    #[test]
    fn test_validate_file_missing() {
        let mut store = MemoryStore::new();
        let err = validate_file(
            Path::new("/nonexistent/script.bel"),
            &mut store,
            &ValidatorConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, BelError::Io { .. }));
    }
}
