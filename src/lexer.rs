/// Represents the different kinds of tokens that the lexer can produce.
/// Each token is a meaningful unit of the BEL script syntax.
#[derive(Debug, PartialEq, Clone)]
pub enum TokenType {
    // == Special Tokens ==
    /// Represents the end of the input file.
    Eof,
    /// One or more spaces or tabs. A backslash directly followed by a line
    /// break (a line continuation) is also lexed as whitespace.
    Whitespace,
    /// A single line break (`\n`, `\r\n` or `\r`). Statements are line oriented.
    Newline,
    /// A `#` comment running to the end of the line.
    Comment(String),
    /// A `//` comment trailing a statement. Kept by the parser because it
    /// becomes part of the statement model.
    StatementComment(String),
    /// Represents a token that could not be recognized by the lexer.
    Unknown,

    // == Literals ==
    /// A bare word: keywords, function names, namespace keywords and
    /// unquoted entries. Examples: `SET`, `p`, `HGNC`, `AKT1`, `0005737`.
    Word(String),
    /// A string literal, enclosed in double quotes. May span several lines.
    String(String),

    // == Punctuation & Operators ==
    /// Left Brace: `{`
    LBrace,
    /// Right Brace: `}`
    RBrace,
    /// Left Parenthesis: `(`
    LParen,
    /// Right Parenthesis: `)`
    RParen,
    /// Comma: `,`
    Comma,
    /// Colon: `:` (separates namespace keyword and entry)
    Colon,
    /// Equals: `=` (used in `SET` lines)
    Equals,
    /// A symbolic relation: `->`, `-|`, `=>`, `=|`, `--`, `:>` or `>>`.
    RelationSymbol(String),
}

/// A token with its type and position
#[derive(Debug, Clone)]
pub struct Token {
    pub ttype: TokenType,
    pub pos_start: usize,
    pub pos_end: usize,
    /// 1-based line of the first character.
    pub line: usize,
    /// 1-based column of the first character.
    pub column: usize,
}

impl Token {
    pub fn new(
        ttype: TokenType,
        pos_start: usize,
        pos_end: usize,
        line: usize,
        column: usize,
    ) -> Token {
        Token {
            ttype,
            pos_start,
            pos_end,
            line,
            column,
        }
    }

    /// The raw source text covered by this token.
    pub fn text<'s>(&self, source: &'s str) -> &'s str {
        source.get(self.pos_start..self.pos_end).unwrap_or("")
    }
}

pub struct Lexer<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    position: usize,
    line: usize,
    column: usize,
    lookahead: Vec<char>,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self::new_at(input, 1)
    }

    /// Creates a lexer whose first character sits on `first_line`. Used when
    /// re-lexing a single physical line of a larger script.
    pub fn new_at(input: &'a str, first_line: usize) -> Self {
        Self {
            chars: input.chars().peekable(),
            position: 0,
            line: first_line,
            column: 1,
            lookahead: Vec::new(),
        }
    }

    pub fn lex(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            if token.ttype == TokenType::Eof {
                tokens.push(token);
                break;
            }
            tokens.push(token);
        }
        tokens
    }

    pub fn next_token(&mut self) -> Token {
        let start_pos = self.position;
        let start_line = self.line;
        let start_column = self.column;

        let ttype = if let Some(char) = self.advance() {
            match char {
                '{' => TokenType::LBrace,
                '}' => TokenType::RBrace,
                '(' => TokenType::LParen,
                ')' => TokenType::RParen,
                ',' => TokenType::Comma,
                '\n' => TokenType::Newline,
                '\r' => {
                    if self.peek() == Some('\n') {
                        self.advance();
                    }
                    TokenType::Newline
                }
                ':' => {
                    if self.peek() == Some('>') {
                        self.advance();
                        TokenType::RelationSymbol(":>".to_string())
                    } else {
                        TokenType::Colon
                    }
                }
                '=' => match self.peek() {
                    Some('>') => {
                        self.advance();
                        TokenType::RelationSymbol("=>".to_string())
                    }
                    Some('|') => {
                        self.advance();
                        TokenType::RelationSymbol("=|".to_string())
                    }
                    _ => TokenType::Equals,
                },
                '-' => match self.peek() {
                    Some(c @ ('>' | '|' | '-')) => {
                        self.advance();
                        TokenType::RelationSymbol(format!("-{c}"))
                    }
                    _ => TokenType::Unknown,
                },
                '>' => {
                    if self.peek() == Some('>') {
                        self.advance();
                        TokenType::RelationSymbol(">>".to_string())
                    } else {
                        TokenType::Unknown
                    }
                }
                '/' => {
                    if self.peek() == Some('/') {
                        self.advance();
                        TokenType::StatementComment(self.read_to_line_end())
                    } else {
                        TokenType::Unknown
                    }
                }
                '#' => TokenType::Comment(self.read_to_line_end()),
                '\\' => self.read_continuation(),
                '"' => self.read_string(),
                ' ' | '\t' => self.read_whitespace(),
                c if c.is_whitespace() => self.read_whitespace(),
                c if c.is_ascii_alphanumeric() || c == '_' => self.read_word(c),
                _ => TokenType::Unknown,
            }
        } else {
            TokenType::Eof
        };

        Token::new(ttype, start_pos, self.position, start_line, start_column)
    }

    fn advance(&mut self) -> Option<char> {
        let char = if self.lookahead.is_empty() {
            self.chars.next()
        } else {
            Some(self.lookahead.remove(0))
        };
        if let Some(c) = char {
            self.position += c.len_utf8();
            if c == '\n' || (c == '\r' && self.peek() != Some('\n')) {
                self.line += 1;
                self.column = 1;
            } else if c != '\r' {
                self.column += 1;
            }
        }
        char
    }

    fn peek(&mut self) -> Option<char> {
        match self.lookahead.first() {
            Some(c) => Some(*c),
            None => self.chars.peek().copied(),
        }
    }

    /// Looks one character past `peek`.
    fn peek_second(&mut self) -> Option<char> {
        while self.lookahead.len() < 2 {
            match self.chars.next() {
                Some(c) => self.lookahead.push(c),
                None => break,
            }
        }
        self.lookahead.get(1).copied()
    }

    fn read_whitespace(&mut self) -> TokenType {
        while let Some(c) = self.peek() {
            if c == ' ' || c == '\t' || (c.is_whitespace() && c != '\n' && c != '\r') {
                self.advance();
            } else {
                break;
            }
        }
        TokenType::Whitespace
    }

    fn read_to_line_end(&mut self) -> String {
        let mut text = String::new();
        while let Some(c) = self.peek() {
            if c == '\n' || c == '\r' {
                break;
            }
            text.push(c);
            self.advance();
        }
        text.trim().to_string()
    }

    /// `\` followed by optional blanks and a line break joins two physical lines.
    fn read_continuation(&mut self) -> TokenType {
        while let Some(c) = self.peek() {
            if c == ' ' || c == '\t' {
                self.advance();
            } else {
                break;
            }
        }
        match self.peek() {
            Some('\n') => {
                self.advance();
                TokenType::Whitespace
            }
            Some('\r') => {
                self.advance();
                if self.peek() == Some('\n') {
                    self.advance();
                }
                TokenType::Whitespace
            }
            _ => TokenType::Unknown,
        }
    }

    fn read_string(&mut self) -> TokenType {
        let mut value = String::new();
        while let Some(c) = self.peek() {
            if c == '"' {
                self.advance(); // Consume the closing quote
                return TokenType::String(value);
            }

            if c == '\\' {
                self.advance(); // Consume the backslash
                if let Some(escaped_char) = self.advance() {
                    match escaped_char {
                        '"' => value.push('"'),
                        '\\' => value.push('\\'),
                        // escaped line breaks inside evidence text are continuations
                        '\n' | '\r' => value.push(' '),
                        _ => {
                            value.push('\\');
                            value.push(escaped_char);
                        }
                    }
                } else {
                    return TokenType::Unknown; // Unclosed escape sequence
                }
            } else if let Some(c) = self.advance() {
                value.push(c);
            }
        }
        TokenType::Unknown // Unclosed string
    }

    fn read_word(&mut self, first_char: char) -> TokenType {
        let mut word = String::new();
        word.push(first_char);

        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '_' || c == '.' {
                word.push(c);
                self.advance();
            } else if c == '-' && self.peek_second().is_some_and(|n| n.is_ascii_alphanumeric()) {
                word.push(c);
                self.advance();
            } else {
                break;
            }
        }

        TokenType::Word(word)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_tokens(input: &str, expected: Vec<TokenType>) {
        let mut lexer = Lexer::new(input);
        let tokens = lexer.lex();
        let token_types: Vec<TokenType> = tokens.into_iter().map(|t| t.ttype).collect();

        // Filter out whitespace and comments for most tests
        let filtered_tokens: Vec<TokenType> = token_types
            .into_iter()
            .filter(|t| !matches!(t, TokenType::Whitespace | TokenType::Comment(_)))
            .collect();

        assert_eq!(filtered_tokens, expected);
    }

    fn word(s: &str) -> TokenType {
        TokenType::Word(s.to_string())
    }

    #[test]
    fn test_eof() {
        assert_tokens("", vec![TokenType::Eof]);
    }

    #[test]
    fn test_single_char_tokens() {
        let input = "{}(),:=";
        let expected = vec![
            TokenType::LBrace,
            TokenType::RBrace,
            TokenType::LParen,
            TokenType::RParen,
            TokenType::Comma,
            TokenType::Colon,
            TokenType::Equals,
            TokenType::Eof,
        ];
        assert_tokens(input, expected);
    }

    #[test]
    fn test_relation_symbols() {
        let input = "-> -| => =| -- :> >>";
        let expected = ["->", "-|", "=>", "=|", "--", ":>", ">>"]
            .iter()
            .map(|s| TokenType::RelationSymbol(s.to_string()))
            .chain(std::iter::once(TokenType::Eof))
            .collect();
        assert_tokens(input, expected);
    }

    #[test]
    fn test_namespaced_name() {
        assert_tokens(
            "p(HGNC:AKT1)",
            vec![
                word("p"),
                TokenType::LParen,
                word("HGNC"),
                TokenType::Colon,
                word("AKT1"),
                TokenType::RParen,
                TokenType::Eof,
            ],
        );
    }

    #[test]
    fn test_words_with_dots_and_hyphens() {
        assert_tokens(
            "GO:0005737 MESH:Alzheimer-Disease a.b",
            vec![
                word("GO"),
                TokenType::Colon,
                word("0005737"),
                word("MESH"),
                TokenType::Colon,
                word("Alzheimer-Disease"),
                word("a.b"),
                TokenType::Eof,
            ],
        );
    }

    #[test]
    fn test_hyphen_before_relation_is_not_part_of_word() {
        assert_tokens(
            "AKT1 -> TNF",
            vec![
                word("AKT1"),
                TokenType::RelationSymbol("->".to_string()),
                word("TNF"),
                TokenType::Eof,
            ],
        );
    }

    #[test]
    fn test_strings() {
        let input = r#""hello world" "" "another""#;
        let expected = vec![
            TokenType::String("hello world".to_string()),
            TokenType::String("".to_string()),
            TokenType::String("another".to_string()),
            TokenType::Eof,
        ];
        assert_tokens(input, expected);
    }

    #[test]
    fn test_strings_with_escapes() {
        let input = r#""say \"hi\" \\ now""#;
        assert_tokens(
            input,
            vec![
                TokenType::String(r#"say "hi" \ now"#.to_string()),
                TokenType::Eof,
            ],
        );
    }

    #[test]
    fn test_unclosed_string_is_unknown() {
        assert_tokens("\"abc", vec![TokenType::Unknown, TokenType::Eof]);
    }

    #[test]
    fn test_comments_and_newlines() {
        let input = "# header comment\nSET X = y // trailing\n";
        let mut lexer = Lexer::new(input);
        let token_types: Vec<TokenType> = lexer.lex().into_iter().map(|t| t.ttype).collect();

        let expected = vec![
            TokenType::Comment("header comment".to_string()),
            TokenType::Newline,
            word("SET"),
            TokenType::Whitespace,
            word("X"),
            TokenType::Whitespace,
            TokenType::Equals,
            TokenType::Whitespace,
            word("y"),
            TokenType::Whitespace,
            TokenType::StatementComment("trailing".to_string()),
            TokenType::Newline,
            TokenType::Eof,
        ];

        assert_eq!(token_types, expected);
    }

    #[test]
    fn test_line_continuation_is_whitespace() {
        assert_tokens(
            "p(HGNC:A) \\\n -> p(HGNC:B)",
            vec![
                word("p"),
                TokenType::LParen,
                word("HGNC"),
                TokenType::Colon,
                word("A"),
                TokenType::RParen,
                TokenType::RelationSymbol("->".to_string()),
                word("p"),
                TokenType::LParen,
                word("HGNC"),
                TokenType::Colon,
                word("B"),
                TokenType::RParen,
                TokenType::Eof,
            ],
        );
    }

    #[test]
    fn test_line_and_column_tracking() {
        let input = "SET A = b\n  p(HGNC:TNF)";
        let tokens: Vec<Token> = Lexer::new(input)
            .lex()
            .into_iter()
            .filter(|t| !matches!(t.ttype, TokenType::Whitespace))
            .collect();

        let tnf = tokens
            .iter()
            .find(|t| t.ttype == word("TNF"))
            .unwrap();
        assert_eq!((tnf.line, tnf.column), (2, 10));
        assert_eq!(tnf.text(input), "TNF");

        let set = &tokens[0];
        assert_eq!((set.line, set.column), (1, 1));
    }

    #[test]
    fn test_crlf_counts_as_one_line() {
        let tokens = Lexer::new("a\r\nb").lex();
        let b = tokens.iter().find(|t| t.ttype == word("b")).unwrap();
        assert_eq!((b.line, b.column), (2, 1));
    }

    #[test]
    fn test_new_at_offsets_lines() {
        let tokens = Lexer::new_at("p(HGNC:X)", 42).lex();
        assert!(tokens.iter().all(|t| t.line == 42));
    }
}
