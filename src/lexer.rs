//! Lexer for Murk
//!
//! Converts source code into a flat stream of tokens in a single pass.

use crate::error::{ErrorKind, MurkError, Result};
use crate::token::{lookup_boolean, Span, Token, TokenKind};

/// The lexer state
pub struct Lexer<'a> {
    source: &'a str,
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    current_pos: usize,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer from source code
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.char_indices().peekable(),
            current_pos: 0,
            line: 1,
            column: 1,
        }
    }

    /// Tokenize the entire source
    pub fn tokenize(&mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();

        while let Some(token) = self.next_token()? {
            tokens.push(token);
        }

        Ok(tokens)
    }

    /// Get the next token
    fn next_token(&mut self) -> Result<Option<Token>> {
        self.skip_whitespace_and_comments();

        let Some(&(start_pos, ch)) = self.chars.peek() else {
            return Ok(None);
        };

        let start_line = self.line;
        let start_column = self.column;

        let (kind, lexeme) = match ch {
            '(' => self.single(TokenKind::LeftParen),
            ')' => self.single(TokenKind::RightParen),
            '{' => self.single(TokenKind::LeftBrace),
            '}' => self.single(TokenKind::RightBrace),
            '.' => self.single(TokenKind::Dot),
            '=' => self.single(TokenKind::Equal),
            ',' => self.single(TokenKind::Comma),
            ':' => self.single(TokenKind::Colon),
            '%' => self.single(TokenKind::Percent),

            '"' | '\'' => self.scan_string(ch)?,

            c if is_word_char(c) => self.scan_word()?,

            _ => {
                return Err(MurkError::at(
                    ErrorKind::UnexpectedCharacter(ch),
                    Span::new(start_pos, start_pos + ch.len_utf8(), start_line, start_column),
                ));
            }
        };

        Ok(Some(Token::new(
            kind,
            Span::new(start_pos, self.current_pos, start_line, start_column),
            lexeme,
        )))
    }

    /// Advance and return the current character
    fn advance(&mut self) -> Option<char> {
        let (pos, ch) = self.chars.next()?;
        self.current_pos = pos + ch.len_utf8();
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    /// Peek at the next character without advancing
    fn peek_char(&mut self) -> Option<char> {
        self.chars.peek().map(|&(_, ch)| ch)
    }

    fn single(&mut self, kind: TokenKind) -> (TokenKind, String) {
        let ch = self.advance().unwrap_or_default();
        (kind, ch.to_string())
    }

    /// Skip whitespace, newlines and `//` comments
    fn skip_whitespace_and_comments(&mut self) {
        while let Some(&(pos, ch)) = self.chars.peek() {
            match ch {
                ' ' | '\t' | '\r' | '\n' => {
                    self.advance();
                }

                '/' if self.source[pos..].starts_with("//") => {
                    while let Some(c) = self.peek_char() {
                        if c == '\n' {
                            break;
                        }
                        self.advance();
                    }
                }

                _ => break,
            }
        }
    }

    /// Scan a string literal delimited by `quote`
    fn scan_string(&mut self, quote: char) -> Result<(TokenKind, String)> {
        let start_line = self.line;
        let start_column = self.column;
        let start_pos = self.current_pos;

        // Opening quote
        self.advance();

        let mut value = String::new();
        while let Some(c) = self.advance() {
            if c == quote {
                return Ok((TokenKind::String, value));
            }
            value.push(c);
        }

        Err(MurkError::at(
            ErrorKind::UnterminatedString,
            Span::new(start_pos, self.current_pos, start_line, start_column),
        ))
    }

    /// Scan an identifier, number or boolean literal
    fn scan_word(&mut self) -> Result<(TokenKind, String)> {
        let start = self.current_pos;
        let start_line = self.line;
        let start_column = self.column;

        while let Some(c) = self.peek_char() {
            if is_word_char(c) {
                self.advance();
            } else {
                break;
            }
        }

        let text = &self.source[start..self.current_pos];

        if text.chars().all(|c| c.is_ascii_digit()) {
            return Ok((TokenKind::Number, text.to_string()));
        }

        if text.starts_with(|c: char| c.is_ascii_digit()) {
            return Err(MurkError::at(
                ErrorKind::InvalidIdentifier(text.to_string()),
                Span::new(start, self.current_pos, start_line, start_column),
            ));
        }

        if lookup_boolean(text).is_some() {
            Ok((TokenKind::Boolean, text.to_string()))
        } else {
            Ok((TokenKind::Identifier, text.to_string()))
        }
    }
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Convenience wrapper around [`Lexer::tokenize`]
pub fn lex(source: &str) -> Result<Vec<Token>> {
    Lexer::new(source).tokenize()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        lex(source).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_punctuation() {
        assert_eq!(
            kinds("( ) { } . = , : %"),
            vec![
                TokenKind::LeftParen,
                TokenKind::RightParen,
                TokenKind::LeftBrace,
                TokenKind::RightBrace,
                TokenKind::Dot,
                TokenKind::Equal,
                TokenKind::Comma,
                TokenKind::Colon,
                TokenKind::Percent,
            ]
        );
    }

    #[test]
    fn test_words() {
        let tokens = lex("var count = 42 true false_flag").unwrap();
        let summary: Vec<(TokenKind, &str)> =
            tokens.iter().map(|t| (t.kind, t.lexeme.as_str())).collect();
        assert_eq!(
            summary,
            vec![
                (TokenKind::Identifier, "var"),
                (TokenKind::Identifier, "count"),
                (TokenKind::Equal, "="),
                (TokenKind::Number, "42"),
                (TokenKind::Boolean, "true"),
                (TokenKind::Identifier, "false_flag"),
            ]
        );
    }

    #[test]
    fn test_strings_with_either_quote() {
        let tokens = lex(r#""hello" 'it"s'"#).unwrap();
        assert_eq!(tokens[0].kind, TokenKind::String);
        assert_eq!(tokens[0].lexeme, "hello");
        assert_eq!(tokens[1].lexeme, "it\"s");
    }

    #[test]
    fn test_positions() {
        let tokens = lex("var x = 1\n  IO.print(x)").unwrap();
        let io = &tokens[4];
        assert_eq!(io.lexeme, "IO");
        assert_eq!((io.span.line, io.span.column), (2, 3));
        let paren = &tokens[7];
        assert_eq!(paren.kind, TokenKind::LeftParen);
        assert_eq!((paren.span.line, paren.span.column), (2, 11));
    }

    #[test]
    fn test_comments_are_skipped() {
        let tokens = lex("// header\nvar x = 'a' // trailing\n").unwrap();
        assert_eq!(tokens.len(), 4);
        assert_eq!(tokens[0].span.line, 2);
    }

    #[test]
    fn test_unterminated_string() {
        let err = lex("var s = \"oops").unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnterminatedString);
        assert_eq!(err.span.map(|s| (s.line, s.column)), Some((1, 9)));
    }

    #[test]
    fn test_unexpected_character() {
        let err = lex("var x = 1\nvar y = #").unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnexpectedCharacter('#'));
        assert_eq!(err.span.map(|s| (s.line, s.column)), Some((2, 9)));
    }

    #[test]
    fn test_single_slash_is_rejected() {
        let err = lex("/ not a comment").unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnexpectedCharacter('/'));
    }

    #[test]
    fn test_digit_led_identifier() {
        let err = lex("var 9lives = 1").unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidIdentifier("9lives".to_string()));
    }
}
