use crate::error::{ValidationError, ValidationWarning};
use crate::utils::{byte_offset, token_len};
use miette::{
    Diagnostic, GraphicalReportHandler, GraphicalTheme, LabeledSpan, NamedSource, Severity,
    SourceCode, SourceSpan,
};
use serde::Serialize;
use std::fmt::{self, Display};
use thiserror::Error;

/// The flat shape every error and warning is exported in. Fields that do not
/// apply to a class are `None` and serialize as `null`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Record {
    pub error_class: String,
    pub url: Option<String>,
    pub keyword: Option<String>,
    pub entry: Option<String>,
    pub line_number: usize,
    pub column: usize,
    pub hint: Option<String>,
    #[serde(skip)]
    pub severity: RecordSeverity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecordSeverity {
    #[default]
    Error,
    Warning,
}

fn strip_newlines(entry: &str) -> String {
    entry.chars().filter(|c| !matches!(c, '\n' | '\r')).collect()
}

impl Record {
    fn new(class: &str, keyword: Option<&str>, entry: Option<&str>) -> Self {
        Self {
            error_class: class.to_string(),
            url: None,
            keyword: keyword.map(str::to_string),
            entry: entry.map(strip_newlines),
            line_number: 0,
            column: 0,
            hint: None,
            severity: RecordSeverity::Error,
        }
    }
}

impl From<&ValidationError> for Record {
    fn from(error: &ValidationError) -> Self {
        let position = error.position();
        let mut record = match error {
            ValidationError::UndefinedNamespace { keyword, entry, .. }
            | ValidationError::UndefinedAnnotation { keyword, entry, .. }
            | ValidationError::NotInNamespaceList { keyword, entry, .. }
            | ValidationError::NotInAnnotationList { keyword, entry, .. } => {
                Record::new(error.class(), Some(keyword), Some(entry))
            }
            ValidationError::NotInNamespacePattern {
                keyword,
                entry,
                pattern,
                hint,
                ..
            }
            | ValidationError::NotInAnnotationPattern {
                keyword,
                entry,
                pattern,
                hint,
                ..
            } => Record {
                hint: Some(
                    hint.clone()
                        .unwrap_or_else(|| format!("expected a match for {pattern}")),
                ),
                ..Record::new(error.class(), Some(keyword), Some(entry))
            },
            ValidationError::NotInNamespaceVocabulary {
                keyword,
                entry,
                url,
                hint,
                ..
            }
            | ValidationError::NotInAnnotationVocabulary {
                keyword,
                entry,
                url,
                hint,
                ..
            } => Record {
                url: Some(url.clone()),
                hint: Some(hint.clone()),
                ..Record::new(error.class(), Some(keyword), Some(entry))
            },
            ValidationError::SourceIngestionFailure {
                keyword, url, hint, ..
            } => Record {
                url: Some(url.clone()),
                hint: Some(hint.clone()),
                ..Record::new(error.class(), Some(keyword), None)
            },
            ValidationError::SyntaxError { entry, hint, .. } => Record {
                hint: Some(hint.clone()),
                ..Record::new(error.class(), None, Some(entry))
            },
        };
        record.line_number = position.line;
        record.column = position.column;
        record
    }
}

impl From<&ValidationWarning> for Record {
    fn from(warning: &ValidationWarning) -> Self {
        match warning {
            ValidationWarning::AmbiguousEntry {
                keyword,
                entry,
                position,
                hint,
                ..
            } => Record {
                line_number: position.line,
                column: position.column,
                hint: Some(hint.clone()),
                severity: RecordSeverity::Warning,
                ..Record::new(warning.class(), Some(keyword), Some(entry))
            },
        }
    }
}

impl Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let field = |value: &Option<String>| value.clone().unwrap_or_default();
        write!(
            f,
            "{}\tkeyword:{}\tentry:{}\tline:{}\tcolumn:{}\turl:{}\thint:{}",
            self.error_class,
            field(&self.keyword),
            field(&self.entry),
            self.line_number,
            self.column,
            field(&self.url),
            field(&self.hint),
        )
    }
}

/// A record anchored to the script it came from, renderable by miette.
#[derive(Error, Debug)]
#[error("{message}")]
pub struct AnchoredRecord {
    message: String,
    code: String,
    severity: Severity,
    src: NamedSource<String>,
    span: Option<SourceSpan>,
    hint: Option<String>,
}

impl AnchoredRecord {
    pub fn new(record: &Record, source: &str, name: &str) -> Self {
        let span = byte_offset(source, record.line_number, record.column)
            .map(|offset| SourceSpan::new(offset.into(), token_len(source, offset)));
        let subject = match (&record.keyword, &record.entry) {
            (Some(keyword), Some(entry)) => format!("{keyword}:{entry}"),
            (None, Some(entry)) => entry.clone(),
            (Some(keyword), None) => keyword.clone(),
            (None, None) => String::new(),
        };
        let mut message = format!("{} {subject}", record.error_class);
        if let Some(url) = &record.url {
            message.push_str(&format!(" ({url})"));
        }
        Self {
            message,
            code: format!("bel::{}", record.error_class),
            severity: match record.severity {
                RecordSeverity::Error => Severity::Error,
                RecordSeverity::Warning => Severity::Warning,
            },
            src: NamedSource::new(name, source.to_string()),
            span,
            hint: record.hint.clone(),
        }
    }

    pub fn span(&self) -> Option<SourceSpan> {
        self.span
    }
}

impl Diagnostic for AnchoredRecord {
    fn code<'a>(&'a self) -> Option<Box<dyn Display + 'a>> {
        Some(Box::new(&self.code))
    }

    fn severity(&self) -> Option<Severity> {
        Some(self.severity)
    }

    fn help<'a>(&'a self) -> Option<Box<dyn Display + 'a>> {
        self.hint
            .as_ref()
            .map(|hint| Box::new(hint) as Box<dyn Display + 'a>)
    }

    fn source_code(&self) -> Option<&dyn SourceCode> {
        self.span.map(|_| &self.src as &dyn SourceCode)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        let span = self.span?;
        Some(Box::new(std::iter::once(LabeledSpan::new_with_span(
            Some("here".to_string()),
            span,
        ))))
    }
}

/// Renders records as plain-text miette reports against the script source.
pub fn render(records: &[Record], source: &str, name: &str) -> String {
    let handler = GraphicalReportHandler::new_themed(GraphicalTheme::unicode_nocolor());
    let mut buffer = String::new();
    for record in records {
        let anchored = AnchoredRecord::new(record, source, name);
        if handler.render_report(&mut buffer, &anchored).is_err() {
            buffer.push_str(&record.to_string());
            buffer.push('\n');
        }
    }
    buffer
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::Position;

    #[test]
    fn test_vocabulary_record_fields() {
        let error = ValidationError::NotInNamespaceVocabulary {
            keyword: "HGNC".to_string(),
            entry: "TNFX".to_string(),
            position: Position::new(3, 8),
            url: "http://example.org/hgnc.belns".to_string(),
            hint: "Similar: HGNC:\"TNF\"".to_string(),
        };
        let record = Record::from(&error);
        assert_eq!(record.error_class, "NotInNamespaceVocabulary");
        assert_eq!(record.url.as_deref(), Some("http://example.org/hgnc.belns"));
        assert_eq!(record.line_number, 3);
        assert_eq!(record.column, 8);
        assert_eq!(
            record.to_string(),
            "NotInNamespaceVocabulary\tkeyword:HGNC\tentry:TNFX\tline:3\tcolumn:8\t\
             url:http://example.org/hgnc.belns\thint:Similar: HGNC:\"TNF\""
        );
    }

    #[test]
    fn test_unset_fields_serialize_as_null() {
        let error = ValidationError::UndefinedAnnotation {
            keyword: "Tissue".to_string(),
            entry: "liver\r\n".to_string(),
            position: Position::new(1, 15),
        };
        let json = serde_json::to_value(Record::from(&error)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "error_class": "UndefinedAnnotation",
                "url": null,
                "keyword": "Tissue",
                "entry": "liver",
                "line_number": 1,
                "column": 15,
                "hint": null,
            })
        );
    }

    #[test]
    fn test_render_points_at_entry() {
        let source = "SET Species = 9606\np(HGNC:\"TNFX\")\n";
        let error = ValidationError::UndefinedNamespace {
            keyword: "HGNC".to_string(),
            entry: "TNFX".to_string(),
            position: Position::new(2, 8),
        };
        let record = Record::from(&error);
        let anchored = AnchoredRecord::new(&record, source, "test.bel");
        assert_eq!(anchored.span(), Some(SourceSpan::new(26.into(), 6)));

        let rendered = render(&[record], source, "test.bel");
        assert!(rendered.contains("UndefinedNamespace HGNC:TNFX"));
        assert!(rendered.contains("test.bel:2:8"));
    }

    #[test]
    fn test_render_without_position() {
        let error = ValidationError::SourceIngestionFailure {
            target: crate::registry::Target::Namespace,
            keyword: "HGNC".to_string(),
            url: "http://unreachable.invalid".to_string(),
            position: Position::default(),
            hint: "could not download".to_string(),
        };
        let rendered = render(&[Record::from(&error)], "", "test.bel");
        assert!(rendered.contains("SourceIngestionFailure HGNC"));
        assert!(rendered.contains("could not download"));
    }
}
