use crate::cache::Position;
use crate::registry::Target;
use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// Fatal errors. Anything in here stops a document model from being produced.
#[derive(Error, Debug, Diagnostic, Clone)]
pub enum BelError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Syntax(#[from] SyntaxError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Tree(#[from] TreeError),

    #[error("could not read `{path}`: {reason}")]
    #[diagnostic(code(bel::io))]
    Io { path: String, reason: String },
}

#[derive(Error, Debug, Diagnostic, Clone)]
pub enum SyntaxError {
    #[error("Unexpected token `{token}` at line {line}, column {column}")]
    #[diagnostic(code(parser::unexpected_token))]
    UnexpectedToken {
        #[source_code]
        src: NamedSource<String>,
        #[label("Expected {expected}, but found this")]
        span: SourceSpan,
        line: usize,
        column: usize,
        token: String,
        expected: String,
        allowed: Vec<String>,
        #[help]
        help: Option<String>,
    },

    #[error("Unrecognized input `{token}` at line {line}, column {column}")]
    #[diagnostic(
        code(parser::unexpected_input),
        help("Check for unbalanced quotes or characters BEL does not use.")
    )]
    UnexpectedInput {
        #[source_code]
        src: NamedSource<String>,
        #[label("not a BEL token")]
        span: SourceSpan,
        line: usize,
        column: usize,
        token: String,
    },

    #[error("Unexpected end of input at line {line}, column {column}")]
    #[diagnostic(
        code(parser::unexpected_eof),
        help("The script ended unexpectedly. The parser expected more tokens.")
    )]
    UnexpectedEof {
        #[source_code]
        src: NamedSource<String>,
        #[label("Expected {expected} here")]
        span: SourceSpan,
        line: usize,
        column: usize,
        expected: String,
    },
}

impl SyntaxError {
    pub fn line(&self) -> usize {
        match self {
            SyntaxError::UnexpectedToken { line, .. }
            | SyntaxError::UnexpectedInput { line, .. }
            | SyntaxError::UnexpectedEof { line, .. } => *line,
        }
    }

    pub fn column(&self) -> usize {
        match self {
            SyntaxError::UnexpectedToken { column, .. }
            | SyntaxError::UnexpectedInput { column, .. }
            | SyntaxError::UnexpectedEof { column, .. } => *column,
        }
    }

    /// Text of the offending token. Empty at end of input.
    pub fn token(&self) -> &str {
        match self {
            SyntaxError::UnexpectedToken { token, .. }
            | SyntaxError::UnexpectedInput { token, .. } => token,
            SyntaxError::UnexpectedEof { .. } => "",
        }
    }

    /// Accepted alternatives at the failure point, when the grammar has a closed set.
    pub fn allowed(&self) -> &[String] {
        match self {
            SyntaxError::UnexpectedToken { allowed, .. } => allowed,
            _ => &[],
        }
    }

    pub fn span(&self) -> SourceSpan {
        match self {
            SyntaxError::UnexpectedToken { span, .. }
            | SyntaxError::UnexpectedInput { span, .. }
            | SyntaxError::UnexpectedEof { span, .. } => *span,
        }
    }
}

/// Raised by the transformer when a parse tree does not have the shape the
/// parser produces.
#[derive(Error, Debug, Diagnostic, Clone, PartialEq)]
pub enum TreeError {
    #[error("unexpected {found} node in {context}")]
    #[diagnostic(code(transformer::unexpected_node))]
    UnexpectedNode { found: String, context: &'static str },

    #[error("{context} is missing its {part}")]
    #[diagnostic(code(transformer::missing_child))]
    MissingChild {
        context: &'static str,
        part: &'static str,
    },

    #[error("{context} has an invalid {part} `{found}`")]
    #[diagnostic(code(transformer::invalid_value))]
    InvalidValue {
        context: &'static str,
        part: &'static str,
        found: String,
    },
}

#[derive(Error, Debug, Diagnostic, Clone, PartialEq)]
pub enum RegistryError {
    #[error("unknown definition kind `{name}`")]
    #[diagnostic(
        code(registry::unknown_kind),
        help("Definition kinds are URL, LIST, PATTERN and FILE.")
    )]
    UnknownKind { name: String },
}

#[derive(Error, Debug, Diagnostic, Clone, PartialEq)]
pub enum ConfigError {
    #[error("invalid JSON configuration: {0}")]
    #[diagnostic(code(config::json))]
    Json(String),

    #[error("invalid YAML configuration: {0}")]
    #[diagnostic(code(config::yaml))]
    Yaml(String),
}

/// Why a vocabulary source could not be loaded.
#[derive(Error, Debug, Diagnostic, Clone, PartialEq)]
pub enum IngestionError {
    #[error("could not download `{url}`: {reason}")]
    #[diagnostic(code(vocabulary::download))]
    Download { url: String, reason: String },

    #[error("downloading `{url}` timed out after {seconds}s")]
    #[diagnostic(code(vocabulary::timeout))]
    Timeout { url: String, seconds: u64 },

    #[error("could not read `{path}`: {reason}")]
    #[diagnostic(code(vocabulary::read))]
    Read { path: String, reason: String },

    #[error("{expected} error in \"{found}\"")]
    #[diagnostic(code(vocabulary::malformed_header))]
    MalformedHeader {
        line: usize,
        column: usize,
        found: String,
        expected: String,
    },

    #[error("no [Values] section found")]
    #[diagnostic(
        code(vocabulary::missing_values),
        help("Vocabulary documents list their entries after a `[Values]` line.")
    )]
    MissingValues,

    #[error("vocabulary source is not valid UTF-8")]
    #[diagnostic(code(vocabulary::encoding))]
    Encoding,
}

impl IngestionError {
    /// Where in the vocabulary document the failure sits, if it has a place.
    pub fn position(&self) -> Option<Position> {
        match self {
            IngestionError::MalformedHeader { line, column, .. } => Some(Position {
                line: *line,
                column: *column,
            }),
            _ => None,
        }
    }
}

/// The validation error taxonomy. Every variant flattens to a [`crate::report::Record`].
#[derive(Error, Debug, Diagnostic, Clone, PartialEq)]
pub enum ValidationError {
    #[error("namespace `{keyword}` is not defined (entry `{entry}`)")]
    #[diagnostic(
        code(bel::undefined_namespace),
        help("Declare it in the header with DEFINE NAMESPACE.")
    )]
    UndefinedNamespace {
        keyword: String,
        entry: String,
        position: Position,
    },

    #[error("annotation `{keyword}` is not defined (entry `{entry}`)")]
    #[diagnostic(
        code(bel::undefined_annotation),
        help("Declare it in the header with DEFINE ANNOTATION.")
    )]
    UndefinedAnnotation {
        keyword: String,
        entry: String,
        position: Position,
    },

    #[error("`{entry}` is not in the list of namespace `{keyword}`")]
    #[diagnostic(code(bel::not_in_namespace_list))]
    NotInNamespaceList {
        keyword: String,
        entry: String,
        position: Position,
    },

    #[error("`{entry}` is not in the list of annotation `{keyword}`")]
    #[diagnostic(code(bel::not_in_annotation_list))]
    NotInAnnotationList {
        keyword: String,
        entry: String,
        position: Position,
    },

    #[error("`{entry}` does not match the pattern of namespace `{keyword}`")]
    #[diagnostic(code(bel::not_in_namespace_pattern))]
    NotInNamespacePattern {
        keyword: String,
        entry: String,
        position: Position,
        pattern: String,
        #[help]
        hint: Option<String>,
    },

    #[error("`{entry}` does not match the pattern of annotation `{keyword}`")]
    #[diagnostic(code(bel::not_in_annotation_pattern))]
    NotInAnnotationPattern {
        keyword: String,
        entry: String,
        position: Position,
        pattern: String,
        #[help]
        hint: Option<String>,
    },

    #[error("`{entry}` is not in the vocabulary of namespace `{keyword}`")]
    #[diagnostic(code(bel::not_in_namespace_vocabulary))]
    NotInNamespaceVocabulary {
        keyword: String,
        entry: String,
        position: Position,
        url: String,
        #[help]
        hint: String,
    },

    #[error("`{entry}` is not in the vocabulary of annotation `{keyword}`")]
    #[diagnostic(code(bel::not_in_annotation_vocabulary))]
    NotInAnnotationVocabulary {
        keyword: String,
        entry: String,
        position: Position,
        url: String,
        #[help]
        hint: String,
    },

    #[error("vocabulary for `{keyword}` could not be loaded from `{url}`")]
    #[diagnostic(code(bel::source_ingestion_failure))]
    SourceIngestionFailure {
        target: Target,
        keyword: String,
        url: String,
        position: Position,
        #[help]
        hint: String,
    },

    #[error("syntax error at `{entry}`")]
    #[diagnostic(code(bel::syntax_error))]
    SyntaxError {
        entry: String,
        position: Position,
        #[help]
        hint: String,
    },
}

impl ValidationError {
    /// The stable class name used in records.
    pub fn class(&self) -> &'static str {
        match self {
            ValidationError::UndefinedNamespace { .. } => "UndefinedNamespace",
            ValidationError::UndefinedAnnotation { .. } => "UndefinedAnnotation",
            ValidationError::NotInNamespaceList { .. } => "NotInNamespaceList",
            ValidationError::NotInAnnotationList { .. } => "NotInAnnotationList",
            ValidationError::NotInNamespacePattern { .. } => "NotInNamespacePattern",
            ValidationError::NotInAnnotationPattern { .. } => "NotInAnnotationPattern",
            ValidationError::NotInNamespaceVocabulary { .. } => "NotInNamespaceVocabulary",
            ValidationError::NotInAnnotationVocabulary { .. } => "NotInAnnotationVocabulary",
            ValidationError::SourceIngestionFailure { .. } => "SourceIngestionFailure",
            ValidationError::SyntaxError { .. } => "SyntaxError",
        }
    }

    pub fn position(&self) -> Position {
        match self {
            ValidationError::UndefinedNamespace { position, .. }
            | ValidationError::UndefinedAnnotation { position, .. }
            | ValidationError::NotInNamespaceList { position, .. }
            | ValidationError::NotInAnnotationList { position, .. }
            | ValidationError::NotInNamespacePattern { position, .. }
            | ValidationError::NotInAnnotationPattern { position, .. }
            | ValidationError::NotInNamespaceVocabulary { position, .. }
            | ValidationError::NotInAnnotationVocabulary { position, .. }
            | ValidationError::SourceIngestionFailure { position, .. }
            | ValidationError::SyntaxError { position, .. } => *position,
        }
    }
}

#[derive(Error, Debug, Diagnostic, Clone, PartialEq)]
pub enum ValidationWarning {
    #[error("`{entry}` under `{keyword}` is ambiguous")]
    #[diagnostic(code(bel::ambiguous_entry), severity(Warning))]
    AmbiguousEntry {
        keyword: String,
        entry: String,
        position: Position,
        others: Vec<String>,
        #[help]
        hint: String,
    },
}

impl ValidationWarning {
    pub fn class(&self) -> &'static str {
        match self {
            ValidationWarning::AmbiguousEntry { .. } => "AmbiguousEntry",
        }
    }

    pub fn position(&self) -> Position {
        match self {
            ValidationWarning::AmbiguousEntry { position, .. } => *position,
        }
    }
}
