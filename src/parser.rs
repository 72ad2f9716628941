use crate::ast::{DocumentKey, Function, Relation, ResiduePosition};
use crate::error::SyntaxError;
use crate::lexer::{Lexer, Token, TokenType};
use crate::registry::{DefinitionKind, Target};
use crate::tree::{Node, NodeKind, ParseTree};
use miette::{NamedSource, SourceSpan};
use std::sync::Arc;

const SUPPORT_KEYS: [&str; 3] = ["Support", "Evidence", "SupportingText"];
const CITATION_FIELDS: std::ops::RangeInclusive<usize> = 2..=6;

/// A recursive descent parser for line-oriented BEL scripts.
#[derive(Debug)]
pub struct Parser<'a> {
    source: Arc<NamedSource<String>>,
    tokens: Vec<Token>,
    position: usize,
    source_text: &'a str,
}

impl<'a> Parser<'a> {
    pub fn new(source_text: &'a str) -> Self {
        Self::new_with_name(source_text, "script.bel".to_string())
    }

    pub fn new_with_name(source_text: &'a str, name: String) -> Self {
        Self::new_at(source_text, name, 1)
    }

    fn new_at(source_text: &'a str, name: String, first_line: usize) -> Self {
        let source = Arc::new(NamedSource::new(name, source_text.to_string()));
        let tokens: Vec<Token> = Lexer::new_at(source_text, first_line)
            .lex()
            .into_iter()
            .filter(|t| !matches!(t.ttype, TokenType::Whitespace | TokenType::Comment(_)))
            .collect();

        Self {
            source,
            tokens,
            position: 0,
            source_text,
        }
    }

    // === Main Parsing Methods ===

    /// Script ::= { Line NEWLINE }
    pub fn parse_script(&mut self) -> Result<ParseTree, SyntaxError> {
        let mut root = Node::new(NodeKind::Script, 1, 1, 0);
        loop {
            // blank lines and stray `//` comment lines
            while self.match_token(TokenType::Newline)
                || self.match_token(TokenType::StatementComment(String::new()))
            {}
            if self.check(TokenType::Eof) {
                break;
            }
            let line = self.parse_line()?;
            root.push(line);
            self.expect_line_end()?;
        }
        Ok(ParseTree { root })
    }

    /// Line ::= Set | Unset | Define | Statement
    fn parse_line(&mut self) -> Result<Node, SyntaxError> {
        let token = self.current_token()?.clone();
        match &token.ttype {
            TokenType::Word(word) => match word.as_str() {
                "SET" => self.parse_set(),
                "UNSET" => self.parse_unset(),
                "DEFINE" => self.parse_define(),
                _ => self.parse_statement(),
            },
            _ => self.err_unexpected("a statement, SET, UNSET or DEFINE", Vec::new()),
        }
    }

    /// Set ::= "SET" ( "DOCUMENT" Key "=" Value
    ///               | "Citation" "=" ValueList
    ///               | SupportKey "=" Value
    ///               | "STATEMENT_GROUP" "=" Value
    ///               | Keyword "=" ( Value | ValueList ) )
    fn parse_set(&mut self) -> Result<Node, SyntaxError> {
        let set = self.current_token()?.clone();
        self.advance();
        let key_token = self.current_token()?.clone();
        let key = match &key_token.ttype {
            TokenType::Word(word) => word.clone(),
            _ => return self.err_unexpected("a keyword after SET", Vec::new()),
        };

        let node = match key.as_str() {
            "DOCUMENT" => {
                self.advance();
                let property_token = self.current_token()?.clone();
                let property = match &property_token.ttype {
                    TokenType::Word(word) => DocumentKey::from_name(word),
                    _ => None,
                };
                let Some(property) = property else {
                    let allowed = DocumentKey::ALL
                        .iter()
                        .map(|k| k.script_name().to_string())
                        .collect();
                    return self.err_unexpected("a document property", allowed);
                };
                self.advance();
                self.expect(TokenType::Equals)?;
                let mut node = self.node_at(NodeKind::DocumentProperty(property), &set);
                node.push(self.parse_value()?);
                node
            }
            "Citation" => {
                self.advance();
                self.expect(TokenType::Equals)?;
                let open = self.current_token()?.clone();
                let list = self.parse_value_list()?;
                if !CITATION_FIELDS.contains(&list.children.len()) {
                    return Err(self.error_at(
                        &open,
                        "a citation with 2 to 6 fields (type, title, reference, date, authors, comment)",
                        Vec::new(),
                    ));
                }
                let mut node = self.node_at(NodeKind::Citation, &set);
                for value in list.children {
                    node.push(value);
                }
                node
            }
            key if SUPPORT_KEYS.contains(&key) => {
                self.advance();
                self.expect(TokenType::Equals)?;
                let mut node = self.node_at(NodeKind::Support, &set);
                node.push(self.parse_value()?);
                node
            }
            "STATEMENT_GROUP" => {
                self.advance();
                self.expect(TokenType::Equals)?;
                let mut node = self.node_at(NodeKind::StatementGroup, &set);
                node.push(self.parse_value()?);
                node
            }
            _ => {
                let mut node = self.node_at(NodeKind::AnnotationSet, &set);
                node.push(self.parse_keyword()?);
                self.expect(TokenType::Equals)?;
                if self.check(TokenType::LBrace) {
                    for value in self.parse_value_list()?.children {
                        node.push(value);
                    }
                } else {
                    node.push(self.parse_value()?);
                }
                node
            }
        };
        Ok(node)
    }

    /// Unset ::= "UNSET" ( "ALL" | "STATEMENT_GROUP" | Keyword | "{" Keyword { "," Keyword } "}" )
    fn parse_unset(&mut self) -> Result<Node, SyntaxError> {
        let unset = self.current_token()?.clone();
        self.advance();
        let token = self.current_token()?.clone();
        match &token.ttype {
            TokenType::Word(word) if word == "ALL" => {
                self.advance();
                Ok(self.node_at(NodeKind::UnsetAll, &unset))
            }
            TokenType::Word(word) if word == "STATEMENT_GROUP" => {
                self.advance();
                Ok(self.node_at(NodeKind::UnsetStatementGroup, &unset))
            }
            TokenType::Word(_) => {
                let mut node = self.node_at(NodeKind::Unset, &unset);
                node.push(self.parse_keyword()?);
                Ok(node)
            }
            TokenType::LBrace => {
                self.advance();
                let mut node = self.node_at(NodeKind::Unset, &unset);
                loop {
                    node.push(self.parse_keyword()?);
                    if !self.match_token(TokenType::Comma) {
                        break;
                    }
                }
                self.expect(TokenType::RBrace)?;
                Ok(node)
            }
            _ => self.err_unexpected(
                "ALL, STATEMENT_GROUP or annotation keywords",
                Vec::new(),
            ),
        }
    }

    /// Define ::= "DEFINE" ("NAMESPACE" | "ANNOTATION") Keyword "AS"
    ///            ( ("URL" | "FILE" | "PATTERN") Value | "LIST" ValueList )
    fn parse_define(&mut self) -> Result<Node, SyntaxError> {
        let define = self.current_token()?.clone();
        self.advance();

        let target = match &self.current_token()?.ttype {
            TokenType::Word(word) if word == "NAMESPACE" => Target::Namespace,
            TokenType::Word(word) if word == "ANNOTATION" => Target::Annotation,
            _ => {
                return self.err_unexpected(
                    "NAMESPACE or ANNOTATION",
                    vec!["NAMESPACE".to_string(), "ANNOTATION".to_string()],
                )
            }
        };
        self.advance();
        let keyword = self.parse_keyword()?;
        self.expect_word("AS")?;

        let kind = match &self.current_token()?.ttype {
            TokenType::Word(word) => word.parse::<DefinitionKind>().ok(),
            _ => None,
        };
        let Some(kind) = kind else {
            let allowed = ["URL", "LIST", "PATTERN", "FILE"]
                .iter()
                .map(|k| k.to_string())
                .collect();
            return self.err_unexpected("a definition kind", allowed);
        };
        self.advance();

        let mut node = self.node_at(NodeKind::Definition(target, kind), &define);
        node.push(keyword);
        match kind {
            DefinitionKind::List => node.push(self.parse_value_list()?),
            DefinitionKind::Url | DefinitionKind::File | DefinitionKind::Pattern => {
                node.push(self.parse_value()?)
            }
        }
        Ok(node)
    }

    /// Statement ::= Term [ Relation ( Term | "(" Statement ")" ) ] [ "//" Comment ]
    fn parse_statement(&mut self) -> Result<Node, SyntaxError> {
        let start = self.current_token()?.clone();
        let mut node = self.node_at(NodeKind::Statement, &start);
        node.push(self.parse_term()?);

        if let Some(relation) = self.parse_optional_relation()? {
            node.push(relation);
            if self.match_token(TokenType::LParen) {
                node.push(self.parse_statement()?);
                let close = self.current_token()?.clone();
                self.expect(TokenType::RParen)?;
                node.pos_end = close.pos_end;
            } else {
                node.push(self.parse_term()?);
            }
        }

        let token = self.current_token()?.clone();
        if let TokenType::StatementComment(text) = &token.ttype {
            node.push(Node::leaf(NodeKind::Comment, text.clone(), &token));
            self.advance();
        }
        Ok(node)
    }

    fn parse_optional_relation(&mut self) -> Result<Option<Node>, SyntaxError> {
        let token = self.current_token()?.clone();
        let name = match &token.ttype {
            TokenType::Newline
            | TokenType::Eof
            | TokenType::StatementComment(_)
            | TokenType::RParen => return Ok(None),
            TokenType::RelationSymbol(symbol) => symbol.as_str(),
            TokenType::Word(word) => word.as_str(),
            _ => "",
        };
        match Relation::from_name(name) {
            Some(relation) => {
                self.advance();
                Ok(Some(Node::leaf(
                    NodeKind::Relation(relation),
                    name.to_string(),
                    &token,
                )))
            }
            None => self.err_unexpected("a relation", Relation::names()),
        }
    }

    /// Term ::= Function "(" [ Argument { "," Argument } ] ")"
    fn parse_term(&mut self) -> Result<Node, SyntaxError> {
        let token = self.current_token()?.clone();
        let function = match &token.ttype {
            TokenType::Word(word) => Function::from_name(word),
            _ => None,
        };
        let Some(function) = function else {
            return self.err_unexpected("a BEL function", Function::names());
        };
        self.advance();
        self.expect(TokenType::LParen)?;

        let mut node = self.node_at(NodeKind::Term(function), &token);
        if !self.check(TokenType::RParen) {
            loop {
                node.push(self.parse_argument()?);
                if !self.match_token(TokenType::Comma) {
                    break;
                }
            }
        }
        let close = self.current_token()?.clone();
        self.expect(TokenType::RParen)?;
        node.pos_end = close.pos_end;

        if let Err(mismatch) = check_shape(function, &node.children) {
            let at = match node.children.get(mismatch.index) {
                Some(argument) => Token::new(
                    TokenType::Word(argument.text.clone()),
                    argument.pos_start,
                    argument.pos_end,
                    argument.line,
                    argument.column,
                ),
                None => close,
            };
            let expected = format!("{} in {}()", mismatch.expected, function.short_name());
            return Err(self.error_at(&at, &expected, Vec::new()));
        }
        Ok(node)
    }

    /// Argument ::= Term | Keyword ":" Value | Value
    fn parse_argument(&mut self) -> Result<Node, SyntaxError> {
        let token = self.current_token()?.clone();
        match &token.ttype {
            TokenType::Word(_) if self.peek_is(TokenType::LParen) => self.parse_term(),
            TokenType::Word(_) if self.peek_is(TokenType::Colon) => {
                let mut node = self.node_at(NodeKind::NamespacedName, &token);
                node.push(self.parse_keyword()?);
                self.expect(TokenType::Colon)?;
                node.push(self.parse_value()?);
                Ok(node)
            }
            TokenType::Word(_) | TokenType::String(_) => self.parse_value(),
            _ => self.err_unexpected("a term, KEYWORD:entry or a value", Vec::new()),
        }
    }

    fn parse_keyword(&mut self) -> Result<Node, SyntaxError> {
        let token = self.current_token()?.clone();
        match &token.ttype {
            TokenType::Word(word) => {
                self.advance();
                Ok(Node::leaf(NodeKind::Keyword, word.clone(), &token))
            }
            _ => self.err_unexpected("a keyword", Vec::new()),
        }
    }

    /// Value ::= WORD | STRING
    fn parse_value(&mut self) -> Result<Node, SyntaxError> {
        let token = self.current_token()?.clone();
        match &token.ttype {
            TokenType::Word(text) | TokenType::String(text) => {
                self.advance();
                Ok(Node::leaf(NodeKind::Value, text.clone(), &token))
            }
            _ => self.err_unexpected("a value", Vec::new()),
        }
    }

    /// ValueList ::= "{" Value { "," Value } "}"
    fn parse_value_list(&mut self) -> Result<Node, SyntaxError> {
        let open = self.current_token()?.clone();
        self.expect(TokenType::LBrace)?;
        let mut node = self.node_at(NodeKind::ListValue, &open);
        loop {
            node.push(self.parse_value()?);
            if !self.match_token(TokenType::Comma) {
                break;
            }
        }
        let close = self.current_token()?.clone();
        self.expect(TokenType::RBrace)?;
        node.pos_end = close.pos_end;
        Ok(node)
    }

    // === Tokenizer Helper Methods ===

    fn node_at(&self, kind: NodeKind, token: &Token) -> Node {
        let mut node = Node::new(kind, token.line, token.column, token.pos_start);
        node.pos_end = token.pos_end;
        node
    }

    fn current_token(&self) -> Result<&Token, SyntaxError> {
        self.tokens.get(self.position).ok_or_else(|| {
            let pos = self.source_text.len();
            let (line, column) = self
                .tokens
                .last()
                .map(|t| (t.line, t.column))
                .unwrap_or((1, 1));
            SyntaxError::UnexpectedEof {
                src: (*self.source).clone(),
                span: (pos, 0).into(),
                line,
                column,
                expected: "more input".to_string(),
            }
        })
    }

    fn advance(&mut self) {
        if self.position < self.tokens.len() {
            self.position += 1;
        }
    }

    fn expect(&mut self, expected: TokenType) -> Result<(), SyntaxError> {
        if self.check(expected.clone()) {
            self.advance();
            Ok(())
        } else {
            self.err_unexpected(describe(&expected), Vec::new())
        }
    }

    fn expect_word(&mut self, word: &str) -> Result<(), SyntaxError> {
        match &self.current_token()?.ttype {
            TokenType::Word(found) if found == word => {
                self.advance();
                Ok(())
            }
            _ => self.err_unexpected(&format!("`{word}`"), vec![word.to_string()]),
        }
    }

    fn expect_line_end(&mut self) -> Result<(), SyntaxError> {
        if self.check(TokenType::Eof) || self.match_token(TokenType::Newline) {
            Ok(())
        } else {
            self.err_unexpected("end of line", Vec::new())
        }
    }

    fn match_token(&mut self, ttype: TokenType) -> bool {
        if self.check(ttype) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn check(&self, ttype: TokenType) -> bool {
        if let Ok(token) = self.current_token() {
            std::mem::discriminant(&token.ttype) == std::mem::discriminant(&ttype)
        } else {
            false
        }
    }

    fn peek_is(&self, ttype: TokenType) -> bool {
        if let Some(token) = self.tokens.get(self.position + 1) {
            std::mem::discriminant(&token.ttype) == std::mem::discriminant(&ttype)
        } else {
            false
        }
    }

    fn err_unexpected<T>(&self, expected: &str, allowed: Vec<String>) -> Result<T, SyntaxError> {
        let token = self.current_token()?;
        Err(self.error_at(token, expected, allowed))
    }

    fn error_at(&self, token: &Token, expected: &str, allowed: Vec<String>) -> SyntaxError {
        let src = (*self.source).clone();
        let span: SourceSpan = (token.pos_start, token.pos_end - token.pos_start).into();
        let (line, column) = (token.line, token.column);
        match &token.ttype {
            TokenType::Eof => SyntaxError::UnexpectedEof {
                src,
                span,
                line,
                column,
                expected: expected.to_string(),
            },
            TokenType::Unknown => SyntaxError::UnexpectedInput {
                src,
                span,
                line,
                column,
                token: token.text(self.source_text).to_string(),
            },
            TokenType::Newline => SyntaxError::UnexpectedToken {
                src,
                span,
                line,
                column,
                token: "end of line".to_string(),
                expected: expected.to_string(),
                help: allowed_help(&allowed),
                allowed,
            },
            _ => SyntaxError::UnexpectedToken {
                src,
                span,
                line,
                column,
                token: token.text(self.source_text).to_string(),
                expected: expected.to_string(),
                help: allowed_help(&allowed),
                allowed,
            },
        }
    }
}

fn allowed_help(allowed: &[String]) -> Option<String> {
    if allowed.is_empty() {
        None
    } else {
        Some(format!("Allowed here: {}", allowed.join(", ")))
    }
}

fn describe(ttype: &TokenType) -> &'static str {
    match ttype {
        TokenType::LBrace => "`{`",
        TokenType::RBrace => "`}`",
        TokenType::LParen => "`(`",
        TokenType::RParen => "`)`",
        TokenType::Comma => "`,`",
        TokenType::Colon => "`:`",
        TokenType::Equals => "`=`",
        TokenType::Newline => "end of line",
        TokenType::Eof => "end of input",
        _ => "a token",
    }
}

// === Argument shapes ===

#[derive(Debug, Clone, Copy, PartialEq)]
enum Shape {
    Name,
    Term,
    Value,
}

struct ShapeMismatch {
    /// Offending argument; `len()` when an argument is missing.
    index: usize,
    expected: &'static str,
}

fn shape_of(node: &Node) -> Shape {
    match node.kind {
        NodeKind::NamespacedName => Shape::Name,
        NodeKind::Term(_) => Shape::Term,
        NodeKind::Value
        | NodeKind::Keyword
        | NodeKind::Relation(_)
        | NodeKind::Comment
        | NodeKind::Script
        | NodeKind::DocumentProperty(_)
        | NodeKind::Definition(..)
        | NodeKind::ListValue
        | NodeKind::Citation
        | NodeKind::Support
        | NodeKind::StatementGroup
        | NodeKind::AnnotationSet
        | NodeKind::Unset
        | NodeKind::UnsetAll
        | NodeKind::UnsetStatementGroup
        | NodeKind::Statement => Shape::Value,
    }
}

fn fail(index: usize, expected: &'static str) -> Result<(), ShapeMismatch> {
    Err(ShapeMismatch { index, expected })
}

fn first_not_in(shapes: &[Shape], allowed: &[Shape], from: usize) -> Option<usize> {
    shapes
        .iter()
        .enumerate()
        .skip(from)
        .find(|(_, shape)| !allowed.contains(shape))
        .map(|(index, _)| index)
}

/// Checks the argument signature of a function.
fn check_shape(function: Function, arguments: &[Node]) -> Result<(), ShapeMismatch> {
    let shapes: Vec<Shape> = arguments.iter().map(shape_of).collect();
    let first_not = |allowed: &[Shape], from: usize| first_not_in(&shapes, allowed, from);

    match function {
        Function::Abundance
        | Function::GeneAbundance
        | Function::RnaAbundance
        | Function::MicroRnaAbundance
        | Function::ProteinAbundance
        | Function::PopulationAbundance
        | Function::BiologicalProcess
        | Function::Pathology => {
            let fusion = arguments
                .first()
                .is_some_and(|node| node.kind == NodeKind::Term(Function::Fusion));
            if shapes.first() != Some(&Shape::Name) && !fusion {
                return fail(0, "a KEYWORD:entry name or fus(...) as first argument");
            }
            match first_not(&[Shape::Term][..], 1) {
                Some(index) => fail(index, "modifier functions after the name"),
                None => Ok(()),
            }
        }
        Function::ComplexAbundance => {
            if shapes.is_empty() {
                return fail(0, "a name or member abundances");
            }
            match first_not(&[Shape::Name, Shape::Term][..], 0) {
                Some(index) => fail(index, "a name or member abundances"),
                None => Ok(()),
            }
        }
        Function::CompositeAbundance
        | Function::List
        | Function::Reactants
        | Function::Products
        | Function::Activity => {
            if shapes.is_empty() {
                return fail(0, "at least one term");
            }
            match first_not(&[Shape::Term][..], 0) {
                Some(index) => fail(index, "terms only"),
                None => Ok(()),
            }
        }
        Function::Reaction => {
            let is = |index: usize, expected: Function| {
                arguments
                    .get(index)
                    .is_some_and(|node| node.kind == NodeKind::Term(expected))
            };
            if !is(0, Function::Reactants) {
                fail(0, "reactants(...)")
            } else if !is(1, Function::Products) {
                fail(1, "products(...)")
            } else if shapes.len() > 2 {
                fail(2, "exactly reactants(...) and products(...)")
            } else {
                Ok(())
            }
        }
        Function::Degradation | Function::CellSecretion | Function::CellSurfaceExpression => {
            match shapes.as_slice() {
                [Shape::Term] => Ok(()),
                [] => fail(0, "one term"),
                [Shape::Term, ..] => fail(1, "exactly one term"),
                _ => fail(0, "one term"),
            }
        }
        Function::Translocation => {
            if shapes.first() != Some(&Shape::Term) {
                return fail(0, "the translocated abundance");
            }
            if shapes.len() > 3 {
                return fail(3, "at most fromLoc and toLoc");
            }
            match first_not(&[Shape::Term, Shape::Name][..], 1) {
                Some(index) => fail(index, "fromLoc(...) and toLoc(...)"),
                None => Ok(()),
            }
        }
        Function::FromLocation | Function::ToLocation | Function::Location => {
            match shapes.as_slice() {
                [Shape::Name] => Ok(()),
                [] | [_] => fail(0, "one KEYWORD:entry location"),
                _ => fail(1, "exactly one KEYWORD:entry location"),
            }
        }
        Function::MolecularActivity | Function::GeneModification => match shapes.as_slice() {
            [Shape::Name] | [Shape::Value] => Ok(()),
            [] | [_] => fail(0, "a KEYWORD:entry or a value"),
            _ => fail(1, "exactly one argument"),
        },
        Function::Variant => match shapes.as_slice() {
            [Shape::Value] => Ok(()),
            [] | [_] => fail(0, "an HGVS string"),
            _ => fail(1, "exactly one HGVS string"),
        },
        Function::Fragment => match shapes.as_slice() {
            [Shape::Value] | [Shape::Value, Shape::Value] => Ok(()),
            [] => fail(0, "a range"),
            _ => match first_not(&[Shape::Value][..], 0) {
                Some(index) => fail(index, "a range and an optional descriptor"),
                None => fail(2, "a range and an optional descriptor"),
            },
        },
        Function::ProteinModification => {
            match shapes.first() {
                Some(Shape::Name) | Some(Shape::Value) => {}
                _ => return fail(0, "a modification type"),
            }
            if shapes.len() > 3 {
                return fail(3, "at most type, amino acid and position");
            }
            if let Some(index) = first_not(&[Shape::Value][..], 1) {
                return fail(index, "an amino acid or a position");
            }
            match arguments.get(2) {
                Some(position) if position.text.parse::<ResiduePosition>().is_err() => {
                    fail(2, "a numeric position")
                }
                _ => Ok(()),
            }
        }
        Function::Fusion => {
            // Name [range] Name [range]
            let mut index = 0;
            for part in 0..2 {
                if shapes.get(index) != Some(&Shape::Name) {
                    return fail(
                        index,
                        if part == 0 {
                            "the 5' partner"
                        } else {
                            "the 3' partner"
                        },
                    );
                }
                index += 1;
                if shapes.get(index) == Some(&Shape::Value) {
                    index += 1;
                }
            }
            if index < shapes.len() {
                return fail(index, "nothing after the 3' range");
            }
            Ok(())
        }
    }
}

/// A syntax error found while re-parsing a single logical line.
#[derive(Debug, Clone)]
pub struct LineError {
    /// The logical line as it was parsed (continuations joined).
    pub line_text: String,
    pub error: SyntaxError,
}

impl LineError {
    /// `prefix >>>>>> suffix`, split at the error column.
    pub fn hint(&self) -> String {
        let split = self.error.column().saturating_sub(1);
        let prefix: String = self.line_text.chars().take(split).collect();
        let suffix: String = self.line_text.chars().skip(split).collect();
        format!("{} >>>>>> {}", prefix.trim_end(), suffix.trim_end())
    }
}

/// Re-parses every logical line of a script on its own and returns every
/// syntax error, tagged with the physical line the logical line starts on.
pub fn check_line_by_line(source_text: &str, name: &str) -> Vec<LineError> {
    logical_lines(source_text)
        .into_iter()
        .filter_map(|(line_number, text)| {
            let trimmed = text.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                return None;
            }
            let error = Parser::new_at(&text, name.to_string(), line_number)
                .parse_script()
                .err()?;
            Some(LineError {
                line_text: text,
                error,
            })
        })
        .collect()
}

/// Joins `\`-continued physical lines and the lines of a quoted string
/// that spans line breaks.
fn logical_lines(source_text: &str) -> Vec<(usize, String)> {
    let mut lines = Vec::new();
    let mut pending: Option<(usize, String)> = None;
    let mut in_string = false;
    for (index, raw) in source_text.lines().enumerate() {
        let (start, mut text) = pending.take().unwrap_or((index + 1, String::new()));
        in_string = ends_inside_string(raw, in_string);
        if in_string {
            text.push_str(raw);
            text.push('\n');
            pending = Some((start, text));
            continue;
        }
        match raw.trim_end().strip_suffix('\\') {
            Some(head) => {
                text.push_str(head);
                text.push(' ');
                pending = Some((start, text));
            }
            None => {
                text.push_str(raw);
                lines.push((start, text));
            }
        }
    }
    lines.extend(pending);
    lines
}

/// Whether a double-quoted string is still open at the end of `line`.
/// Follows the lexer: `\` escapes the next character inside a string, and
/// `#` or `//` outside one starts a comment.
fn ends_inside_string(line: &str, mut in_string: bool) -> bool {
    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        match (in_string, c) {
            (true, '\\') => {
                chars.next();
            }
            (_, '"') => in_string = !in_string,
            (false, '#') => break,
            (false, '/') if chars.peek() == Some(&'/') => break,
            _ => {}
        }
    }
    in_string
}
