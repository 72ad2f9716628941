// Parser error path tests
// Every broken line should be reported where it breaks

use bel_core::error::SyntaxError;
use bel_core::parser::{check_line_by_line, Parser};

fn parse_err(source: &str) -> SyntaxError {
    match Parser::new(source).parse_script() {
        Ok(tree) => panic!("Expected a syntax error, got {tree:?}"),
        Err(err) => err,
    }
}

#[test]
fn test_parser_error_missing_closing_parenthesis() {
    let err = parse_err("p(HGNC:AKT1 -> p(HGNC:TNF)");
    assert_eq!(err.token(), "->");
}

#[test]
fn test_parser_error_unknown_function() {
    let err = parse_err("protein(HGNC:AKT1)");
    assert_eq!(err.token(), "protein");
    assert!(err.allowed().iter().any(|f| f == "proteinAbundance"));
}

#[test]
fn test_parser_error_relation_without_object() {
    let err = parse_err("p(HGNC:AKT1) ->\n");
    assert_eq!(err.token(), "end of line");
}

#[test]
fn test_parser_error_unknown_definition_kind() {
    let err = parse_err("DEFINE NAMESPACE HGNC AS TABLE \"x\"");
    assert_eq!(err.token(), "TABLE");
    assert_eq!(err.allowed(), ["URL", "LIST", "PATTERN", "FILE"]);
}

#[test]
fn test_parser_error_unknown_document_property() {
    let err = parse_err("SET DOCUMENT Colour = \"blue\"");
    assert_eq!(err.token(), "Colour");
    assert!(err.allowed().iter().any(|k| k == "Name"));
}

#[test]
fn test_parser_error_citation_too_short() {
    let err = parse_err("SET Citation = {\"PubMed\"}");
    assert_eq!(err.line(), 1);
    assert_eq!(err.column(), 16);
}

#[test]
fn test_parser_error_unterminated_string() {
    let err = parse_err("SET Support = \"never closed");
    assert!(matches!(err, SyntaxError::UnexpectedInput { .. }));
}

#[test]
fn test_parser_error_positions_on_later_lines() {
    let err = parse_err("p(HGNC:A)\n\np(HGNC:B) => x(HGNC:C)");
    assert_eq!((err.line(), err.column()), (3, 14));
    assert_eq!(err.token(), "x");
}

#[test]
fn test_line_by_line_reports_each_broken_line() {
    let source = "p(HGNC:A)\nprotein(HGNC:B)\np(HGNC:C) -> \nSET Species = 9606\np(HGNC:D) promotes p(HGNC:E)\n";
    let errors = check_line_by_line(source, "test.bel");
    let lines: Vec<usize> = errors.iter().map(|e| e.error.line()).collect();
    assert_eq!(lines, vec![2, 3, 5]);
    assert_eq!(errors[2].hint(), "p(HGNC:D) >>>>>> promotes p(HGNC:E)");
}

#[test]
fn test_line_by_line_on_valid_script_is_empty() {
    let source = "SET Citation = {\"PubMed\", \"1\"}\np(HGNC:A) -> p(HGNC:B)\n";
    assert!(check_line_by_line(source, "test.bel").is_empty());
}
