// Integration tests for bel-core using test fixtures
use bel_core::{validate_file, MemoryStore, ValidatorConfig};
use std::fs;
use std::path::PathBuf;

fn get_test_file_path(subdir: &str, filename: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join(subdir)
        .join(filename)
}

fn read_test_file(subdir: &str, filename: &str) -> String {
    let path = get_test_file_path(subdir, filename);
    fs::read_to_string(&path).unwrap_or_else(|_| panic!("Failed to read test file: {:?}", path))
}

fn validate_fixture(subdir: &str, filename: &str) -> bel_core::ValidationResult {
    let mut store = MemoryStore::new();
    validate_file(
        &get_test_file_path(subdir, filename),
        &mut store,
        &ValidatorConfig::default(),
    )
    .unwrap_or_else(|e| panic!("{filename} did not validate: {e:?}"))
}

// Scripts that reference only defined, valid entries
mod ok_tests {
    use super::*;

    #[test]
    fn test_simple() {
        let result = validate_fixture("ok", "simple.bel");
        assert!(result.is_valid(), "{}", result.render_diagnostics());
        assert!(result.warnings.is_empty());

        let document = result.document.unwrap();
        assert_eq!(document.definitions.len(), 4);
        assert_eq!(document.statements().count(), 2);
    }

    #[test]
    fn test_modifications() {
        let result = validate_fixture("ok", "modifications.bel");
        assert!(result.is_valid(), "{}", result.render_diagnostics());
        assert_eq!(result.document.unwrap().statements().count(), 5);
    }

    #[test]
    fn test_nested() {
        let result = validate_fixture("ok", "nested.bel");
        assert!(result.is_valid(), "{}", result.render_diagnostics());

        let document = result.document.unwrap();
        let statements: Vec<_> = document.statements().collect();
        assert_eq!(statements.len(), 2);
        assert_eq!(statements[0].comment.as_deref(), Some("negative feedback"));
    }

    #[test]
    fn test_all_ok_fixtures_are_valid() {
        let dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests").join("ok");
        let mut seen = 0;
        for entry in fs::read_dir(&dir).expect("Failed to read fixture directory") {
            let path = entry.expect("Failed to read directory entry").path();
            if path.extension().map_or(false, |ext| ext == "bel") {
                let mut store = MemoryStore::new();
                let result = validate_file(&path, &mut store, &ValidatorConfig::default())
                    .unwrap_or_else(|e| panic!("{path:?}: {e:?}"));
                assert!(
                    result.is_valid(),
                    "{path:?}:\n{}",
                    result.render_diagnostics()
                );
                seen += 1;
            }
        }
        assert!(seen >= 3);
    }
}

// Scripts with semantic or syntax errors
mod error_tests {
    use super::*;

    #[test]
    fn test_tnf_typo_suggests_other_namespace() {
        let result = validate_fixture("errors", "tnf_typo.bel");
        assert_eq!(result.errors.len(), 2);
        let records = result.error_records();
        for record in &records {
            assert_eq!(record.error_class, "NotInNamespaceVocabulary");
            assert_eq!(record.keyword.as_deref(), Some("HGNC"));
            assert_eq!(record.entry.as_deref(), Some("Tnf"));
            assert_eq!(record.column, 8);
            assert_eq!(
                record.hint.as_deref(),
                Some("Did you mean: MGI:\"Tnf\"(../vocabularies/mgi.belns)")
            );
        }
        assert_eq!(records[0].line_number, 6);
        assert_eq!(records[1].line_number, 7);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_syntax_errors_are_reported_per_line() {
        let source = read_test_file("errors", "syntax.bel");
        assert!(source.contains("promotes"));

        let result = validate_fixture("errors", "syntax.bel");
        assert!(result.document.is_none());
        let lines: Vec<usize> = result.errors.iter().map(|e| e.position().line).collect();
        assert_eq!(lines, vec![5, 6, 7]);
        assert!(result.errors.iter().all(|e| e.class() == "SyntaxError"));

        let records = result.error_records();
        assert_eq!(records[0].entry.as_deref(), Some("prot"));
        assert_eq!(
            records[1].hint.as_deref(),
            Some("p(HGNC:IL6) >>>>>> promotes p(HGNC:TNF)")
        );
    }

    #[test]
    fn test_broken_vocabulary_file_is_an_ingestion_failure() {
        let result = validate_fixture("errors", "broken_source.bel");
        let records = result.error_records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].error_class, "SourceIngestionFailure");
        assert_eq!(records[0].keyword.as_deref(), Some("BROKEN"));
        assert_eq!((records[0].line_number, records[0].column), (3, 1));
    }
}
