use crate::frontend::token::{reserved_word, Token, TokenKind};

#[derive(Debug)]
pub struct ScanError {
    pub message: String,
    pub line: usize,
}

impl std::fmt::Display for ScanError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

impl std::error::Error for ScanError {}

/// Character-walking scanner for flint source text.
///
/// The scanner is deliberately simple: numbers are decimal with an
/// optional fractional part, strings are double-quoted with no escape
/// sequences, and `//` starts a comment that runs to end of line.
pub struct Scanner {
    source: Vec<char>,
    pos: usize,
    line: usize,
}

impl Scanner {
    pub fn new(source: &str) -> Self {
        Scanner {
            source: source.chars().collect(),
            pos: 0,
            line: 1,
        }
    }

    /// Scans the whole input and returns the token stream.
    pub fn scan(&mut self) -> Result<Vec<Token>, ScanError> {
        let mut tokens = Vec::new();

        loop {
            self.skip_whitespace();
            let Some(ch) = self.current() else { break };

            let token = match ch {
                '(' => self.single(TokenKind::LeftParen, "("),
                ')' => self.single(TokenKind::RightParen, ")"),
                '{' => self.single(TokenKind::LeftBrace, "{"),
                '}' => self.single(TokenKind::RightBrace, "}"),
                ',' => self.single(TokenKind::Comma, ","),
                '.' => self.single(TokenKind::Dot, "."),
                ';' => self.single(TokenKind::Semicolon, ";"),
                '+' => self.single(TokenKind::Plus, "+"),
                '-' => self.single(TokenKind::Minus, "-"),
                '*' => self.single(TokenKind::Star, "*"),
                '/' => {
                    if self.peek() == Some('/') {
                        self.read_comment()
                    } else {
                        self.single(TokenKind::Slash, "/")
                    }
                }
                '=' => self.either('=', TokenKind::EqualEqual, "==", TokenKind::Equal, "="),
                '!' => self.either('=', TokenKind::BangEqual, "!=", TokenKind::Bang, "!"),
                '<' => self.either('=', TokenKind::LessEqual, "<=", TokenKind::Less, "<"),
                '>' => self.either(
                    '=',
                    TokenKind::GreaterEqual,
                    ">=",
                    TokenKind::Greater,
                    ">",
                ),
                '&' => self.pair('&', TokenKind::AndAnd, "&&")?,
                '|' => self.pair('|', TokenKind::BarBar, "||")?,
                '"' => self.read_string()?,
                c if c.is_ascii_digit() => self.read_number(),
                c if c.is_alphabetic() || c == '_' => self.read_identifier(),
                c => {
                    return Err(self.error(format!("unexpected character '{}'", c)));
                }
            };
            tokens.push(token);
        }

        Ok(tokens)
    }

    fn current(&self) -> Option<char> {
        self.source.get(self.pos).copied()
    }

    fn peek(&self) -> Option<char> {
        self.source.get(self.pos + 1).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.current();
        if ch == Some('\n') {
            self.line += 1;
        }
        self.pos += 1;
        ch
    }

    fn error(&self, message: impl Into<String>) -> ScanError {
        ScanError {
            message: message.into(),
            line: self.line,
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.current() {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn single(&mut self, kind: TokenKind, lexeme: &str) -> Token {
        let token = Token::new(kind, lexeme, self.line);
        self.advance();
        token
    }

    /// Consumes a one- or two-character operator depending on whether the
    /// next character matches `next`.
    fn either(
        &mut self,
        next: char,
        long_kind: TokenKind,
        long_lexeme: &str,
        short_kind: TokenKind,
        short_lexeme: &str,
    ) -> Token {
        let line = self.line;
        self.advance();
        if self.current() == Some(next) {
            self.advance();
            Token::new(long_kind, long_lexeme, line)
        } else {
            Token::new(short_kind, short_lexeme, line)
        }
    }

    /// Consumes a two-character operator whose halves must match (`&&`, `||`).
    fn pair(
        &mut self,
        next: char,
        kind: TokenKind,
        lexeme: &str,
    ) -> Result<Token, ScanError> {
        let line = self.line;
        let first = self.advance();
        if self.current() == Some(next) {
            self.advance();
            Ok(Token::new(kind, lexeme, line))
        } else {
            Err(self.error(format!(
                "unexpected character '{}'",
                first.unwrap_or_default()
            )))
        }
    }

    fn read_comment(&mut self) -> Token {
        let line = self.line;
        self.advance(); // '/'
        self.advance(); // '/'
        let mut text = String::new();
        while let Some(ch) = self.current() {
            if ch == '\n' {
                break;
            }
            text.push(ch);
            self.advance();
        }
        Token::new(TokenKind::Comment, text, line)
    }

    fn read_string(&mut self) -> Result<Token, ScanError> {
        let start_line = self.line;
        self.advance(); // opening quote

        let mut text = String::new();
        loop {
            match self.current() {
                Some('"') => {
                    self.advance();
                    return Ok(Token::new(TokenKind::Str, text, start_line));
                }
                Some(ch) => {
                    text.push(ch);
                    self.advance();
                }
                None => {
                    return Err(ScanError {
                        message: "unterminated string literal".to_string(),
                        line: start_line,
                    });
                }
            }
        }
    }

    fn read_number(&mut self) -> Token {
        let line = self.line;
        let mut digits = String::new();

        while let Some(ch) = self.current() {
            if ch.is_ascii_digit() {
                digits.push(ch);
                self.advance();
            } else if ch == '.'
                && !digits.contains('.')
                && self.peek().map(|c| c.is_ascii_digit()).unwrap_or(false)
            {
                digits.push('.');
                self.advance();
            } else {
                break;
            }
        }

        Token::new(TokenKind::Number, digits, line)
    }

    fn read_identifier(&mut self) -> Token {
        let line = self.line;
        let mut word = String::new();

        while let Some(ch) = self.current() {
            if ch.is_alphanumeric() || ch == '_' {
                word.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        match reserved_word(&word) {
            Some(kind) => Token::new(kind, word, line),
            None => Token::new(TokenKind::Identifier, word, line),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(source: &str) -> Vec<Token> {
        Scanner::new(source).scan().unwrap()
    }

    fn scan_err(source: &str) -> ScanError {
        Scanner::new(source).scan().unwrap_err()
    }

    fn kinds(tokens: &[Token]) -> Vec<TokenKind> {
        tokens.iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_single_operators() {
        assert_eq!(scan("+")[0].kind, TokenKind::Plus);
        assert_eq!(scan("-")[0].kind, TokenKind::Minus);
        assert_eq!(scan("*")[0].kind, TokenKind::Star);
        assert_eq!(scan("/")[0].kind, TokenKind::Slash);
        assert_eq!(scan("!")[0].kind, TokenKind::Bang);
    }

    #[test]
    fn test_two_char_operators() {
        assert_eq!(scan("==")[0].kind, TokenKind::EqualEqual);
        assert_eq!(scan("!=")[0].kind, TokenKind::BangEqual);
        assert_eq!(scan("<=")[0].kind, TokenKind::LessEqual);
        assert_eq!(scan(">=")[0].kind, TokenKind::GreaterEqual);
        assert_eq!(scan("&&")[0].kind, TokenKind::AndAnd);
        assert_eq!(scan("||")[0].kind, TokenKind::BarBar);
    }

    #[test]
    fn test_lone_ampersand_is_an_error() {
        let err = scan_err("&");
        assert!(err.message.contains("unexpected character"));
    }

    #[test]
    fn test_comment_keeps_text() {
        let tokens = scan("// test\n");
        assert_eq!(tokens[0].kind, TokenKind::Comment);
        assert_eq!(tokens[0].lexeme, " test");
    }

    #[test]
    fn test_string_literal() {
        let tokens = scan("\"sample\"");
        assert_eq!(tokens[0].kind, TokenKind::Str);
        assert_eq!(tokens[0].lexeme, "sample");
    }

    #[test]
    fn test_unterminated_string() {
        let err = scan_err("\"sample");
        assert!(err.message.contains("unterminated string"));
        assert_eq!(err.line, 1);
    }

    #[test]
    fn test_number_then_semicolon() {
        let tokens = scan("123;");
        assert_eq!(tokens[0].kind, TokenKind::Number);
        assert_eq!(tokens[0].lexeme, "123");
        assert_eq!(tokens[1].kind, TokenKind::Semicolon);
    }

    #[test]
    fn test_fractional_number_keeps_lexeme() {
        let tokens = scan("0.0000");
        assert_eq!(tokens[0].kind, TokenKind::Number);
        assert_eq!(tokens[0].lexeme, "0.0000");
    }

    #[test]
    fn test_trailing_dot_is_not_part_of_number() {
        let tokens = scan("3.");
        assert_eq!(tokens[0].kind, TokenKind::Number);
        assert_eq!(tokens[0].lexeme, "3");
        assert_eq!(tokens[1].kind, TokenKind::Dot);
    }

    #[test]
    fn test_reserved_word_and_identifier() {
        let tokens = scan("let vault");
        assert_eq!(tokens[0].kind, TokenKind::Let);
        assert_eq!(tokens[1].kind, TokenKind::Identifier);
        assert_eq!(tokens[1].lexeme, "vault");
    }

    #[test]
    fn test_for_loop_token_sequence() {
        let tokens = scan("for (let i = 0.0000; i < 65535; i++) {}");
        assert_eq!(
            kinds(&tokens),
            vec![
                TokenKind::For,
                TokenKind::LeftParen,
                TokenKind::Let,
                TokenKind::Identifier,
                TokenKind::Equal,
                TokenKind::Number,
                TokenKind::Semicolon,
                TokenKind::Identifier,
                TokenKind::Less,
                TokenKind::Number,
                TokenKind::Semicolon,
                TokenKind::Identifier,
                TokenKind::Plus,
                TokenKind::Plus,
                TokenKind::RightParen,
                TokenKind::LeftBrace,
                TokenKind::RightBrace,
            ]
        );
        assert_eq!(tokens[5].lexeme, "0.0000");
        assert_eq!(tokens[9].lexeme, "65535");
    }

    #[test]
    fn test_function_declaration_token_sequence() {
        let tokens = scan(
            r#"
fn main(arg1, arg2) {
    let a = 32;
    return a;
}
"#,
        );
        assert_eq!(tokens[0].kind, TokenKind::Fn);
        assert_eq!(tokens[1].lexeme, "main");
        assert_eq!(tokens[2].kind, TokenKind::LeftParen);
        assert_eq!(tokens[3].lexeme, "arg1");
        assert_eq!(tokens[4].kind, TokenKind::Comma);
        assert_eq!(tokens[5].lexeme, "arg2");
        assert_eq!(tokens[6].kind, TokenKind::RightParen);
        assert_eq!(tokens[7].kind, TokenKind::LeftBrace);
        assert_eq!(tokens[8].kind, TokenKind::Let);
        assert_eq!(tokens[12].kind, TokenKind::Semicolon);
        assert_eq!(tokens[13].kind, TokenKind::Return);
    }

    #[test]
    fn test_line_numbers_advance() {
        let tokens = scan("1\n2\n3");
        assert_eq!(tokens[0].line, 1);
        assert_eq!(tokens[1].line, 2);
        assert_eq!(tokens[2].line, 3);
    }
}
