use crate::error::{TextPosition, TurtleSyntaxError};
use crate::relaxations::{TurtleRelaxation, TurtleRelaxations};
use memchr::memchr;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TokenKind {
    /// `<…>`, unescaped but not yet resolved against the base.
    IriRef(String),
    PrefixedName {
        prefix: String,
        local: String,
    },
    BlankNodeLabel(String),
    StringLiteral(String),
    /// `@tag`; also carries the `@prefix`/`@base` directive words.
    LangTag(String),
    Integer(String),
    Decimal(String),
    Double(String),
    /// A bare word: `a`, `true`, `false`, `prefix`, `GRAPH`, …
    Keyword(String),
    Punct(Punct),
    Eof,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Punct {
    Dot,
    Semicolon,
    Comma,
    BracketOpen,
    BracketClose,
    ParenOpen,
    ParenClose,
    BraceOpen,
    BraceClose,
    /// `^^`
    DatatypeMarker,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Token {
    pub kind: TokenKind,
    pub position: TextPosition,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LexerMode {
    /// Turtle and TriG.
    Terse,
    /// N-Triples and N-Quads: no single quotes, no long strings.
    NTriples,
}

/// A hand-written tokenizer over an in-memory document.
///
/// Keeps a byte cursor plus the 0-based line/column of that cursor; every
/// token records the position of its first character. Buffers are
/// proportional to the token size, never to the document size.
pub(crate) struct Lexer<'a> {
    input: &'a str,
    pos: usize,
    line: u64,
    column: u64,
    mode: LexerMode,
    relaxations: TurtleRelaxations,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str, mode: LexerMode, relaxations: TurtleRelaxations) -> Self {
        Self {
            input,
            pos: 0,
            line: 0,
            column: 0,
            mode,
            relaxations,
        }
    }

    fn position(&self) -> TextPosition {
        TextPosition {
            line: self.line,
            column: self.column,
            offset: self.pos as u64,
        }
    }

    fn peek_char(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn peek_second(&self) -> Option<char> {
        self.input[self.pos..].chars().nth(1)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek_char()?;
        self.pos += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.column = 0;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn error(&self, position: TextPosition, message: impl Into<String>) -> TurtleSyntaxError {
        TurtleSyntaxError::new(message, position)
    }

    fn skip_trivia(&mut self) {
        loop {
            match self.peek_char() {
                Some(c) if c.is_whitespace() => {
                    self.bump();
                }
                Some('#') => {
                    // A comment runs to the end of the line.
                    match memchr(b'\n', &self.input.as_bytes()[self.pos..]) {
                        Some(i) => {
                            self.pos += i;
                            self.column += 1; // placeholder, reset by the newline bump
                            self.bump();
                        }
                        None => {
                            self.pos = self.input.len();
                            return;
                        }
                    }
                }
                _ => return,
            }
        }
    }

    pub fn next_token(&mut self) -> Result<Token, TurtleSyntaxError> {
        self.skip_trivia();
        let start = self.position();
        let token = |kind| Token {
            kind,
            position: start,
        };
        let Some(c) = self.peek_char() else {
            return Ok(token(TokenKind::Eof));
        };
        match c {
            '<' => Ok(token(TokenKind::IriRef(self.iri_ref(start)?))),
            '"' | '\'' => {
                if c == '\'' && self.mode == LexerMode::NTriples {
                    Err(self.error(start, "single quoted strings are not allowed here"))
                } else {
                    Ok(token(TokenKind::StringLiteral(self.string(start)?)))
                }
            }
            '@' => {
                self.bump();
                Ok(token(TokenKind::LangTag(self.lang_tag(start)?)))
            }
            '_' => {
                self.bump();
                if self.peek_char() == Some(':') {
                    self.bump();
                    Ok(token(TokenKind::BlankNodeLabel(
                        self.blank_node_label(start)?,
                    )))
                } else {
                    Err(self.error(start, "'_' must be followed by ':' in a blank node label"))
                }
            }
            '.' => {
                if self.peek_second().is_some_and(|c| c.is_ascii_digit()) {
                    self.number(start).map(token)
                } else {
                    self.bump();
                    Ok(token(TokenKind::Punct(Punct::Dot)))
                }
            }
            ';' => self.punct(Punct::Semicolon, start),
            ',' => self.punct(Punct::Comma, start),
            '[' => self.punct(Punct::BracketOpen, start),
            ']' => self.punct(Punct::BracketClose, start),
            '(' => self.punct(Punct::ParenOpen, start),
            ')' => self.punct(Punct::ParenClose, start),
            '{' => self.punct(Punct::BraceOpen, start),
            '}' => self.punct(Punct::BraceClose, start),
            '^' => {
                self.bump();
                if self.peek_char() == Some('^') {
                    self.bump();
                    Ok(token(TokenKind::Punct(Punct::DatatypeMarker)))
                } else {
                    Err(self.error(start, "'^' is only allowed as part of '^^'"))
                }
            }
            '0'..='9' | '+' | '-' => self.number(start).map(token),
            ':' => {
                self.bump();
                Ok(token(TokenKind::PrefixedName {
                    prefix: String::new(),
                    local: self.pn_local(start)?,
                }))
            }
            _ => self.pname_or_keyword(start).map(token),
        }
    }

    fn punct(&mut self, punct: Punct, start: TextPosition) -> Result<Token, TurtleSyntaxError> {
        self.bump();
        Ok(Token {
            kind: TokenKind::Punct(punct),
            position: start,
        })
    }

    fn iri_ref(&mut self, start: TextPosition) -> Result<String, TurtleSyntaxError> {
        self.bump(); // '<'
        let mut value = String::new();
        loop {
            match self.bump() {
                None => return Err(self.error(start, "unterminated IRI reference")),
                Some('>') => return Ok(value),
                Some('\\') => match self.bump() {
                    Some('u') => value.push(self.hex_escape(4, start)?),
                    Some('U') => value.push(self.hex_escape(8, start)?),
                    _ => {
                        return Err(self.error(
                            start,
                            "only \\uXXXX and \\UXXXXXXXX escapes are allowed in IRI references",
                        ))
                    }
                },
                Some(c) if c.is_whitespace() || c.is_control() => {
                    return Err(self.error(
                        start,
                        format!(
                            "the character '{}' is not allowed in IRI references",
                            c.escape_default()
                        ),
                    ))
                }
                Some(c) => value.push(c),
            }
        }
    }

    fn hex_escape(&mut self, len: usize, start: TextPosition) -> Result<char, TurtleSyntaxError> {
        let mut value = 0u32;
        for _ in 0..len {
            let c = self
                .bump()
                .ok_or_else(|| self.error(start, "unterminated unicode escape sequence"))?;
            let digit = c
                .to_digit(16)
                .ok_or_else(|| self.error(start, "unicode escapes require hexadecimal digits"))?;
            value = value * 16 + digit;
        }
        char::from_u32(value)
            .ok_or_else(|| self.error(start, "invalid unicode code point in escape sequence"))
    }

    fn string(&mut self, start: TextPosition) -> Result<String, TurtleSyntaxError> {
        let quote = match self.bump() {
            Some(c) => c,
            None => return Err(self.error(start, "unterminated string literal")),
        };
        if self.mode == LexerMode::Terse && self.peek_char() == Some(quote) {
            self.bump();
            if self.peek_char() == Some(quote) {
                self.bump();
                return self.long_string(quote, start);
            }
            return Ok(String::new()); // the empty short string
        }
        let mut value = String::new();
        loop {
            match self.bump() {
                None => return Err(self.error(start, "unterminated string literal")),
                Some(c) if c == quote => return Ok(value),
                Some('\n') => return Err(self.error(start, "unterminated string literal")),
                Some('\\') => value.push(self.string_escape(start)?),
                Some(c) => value.push(c),
            }
        }
    }

    fn long_string(
        &mut self,
        quote: char,
        start: TextPosition,
    ) -> Result<String, TurtleSyntaxError> {
        let mut value = String::new();
        loop {
            match self.bump() {
                None => return Err(self.error(start, "unterminated long string literal")),
                Some('\\') => value.push(self.string_escape(start)?),
                Some(c) if c == quote => {
                    if self.peek_char() == Some(quote) && self.peek_second() == Some(quote) {
                        self.bump();
                        self.bump();
                        return Ok(value);
                    }
                    value.push(c);
                }
                Some(c) => value.push(c),
            }
        }
    }

    fn string_escape(&mut self, start: TextPosition) -> Result<char, TurtleSyntaxError> {
        match self.bump() {
            Some('t') => Ok('\t'),
            Some('b') => Ok('\u{08}'),
            Some('n') => Ok('\n'),
            Some('r') => Ok('\r'),
            Some('f') => Ok('\u{0C}'),
            Some('"') => Ok('"'),
            Some('\'') => Ok('\''),
            Some('\\') => Ok('\\'),
            Some('u') => self.hex_escape(4, start),
            Some('U') => self.hex_escape(8, start),
            Some(c) => Err(self.error(
                start,
                format!("unexpected escape sequence '\\{}' in a string", c.escape_default()),
            )),
            None => Err(self.error(start, "unterminated string literal")),
        }
    }

    fn lang_tag(&mut self, start: TextPosition) -> Result<String, TurtleSyntaxError> {
        let mut tag = String::new();
        match self.peek_char() {
            Some(c) if c.is_ascii_alphabetic() => {}
            _ => {
                return Err(
                    self.error(start, "a language tag or directive is expected after '@'")
                )
            }
        }
        while let Some(c) = self.peek_char() {
            if c.is_ascii_alphanumeric() || c == '-' {
                tag.push(c);
                self.bump();
            } else {
                break;
            }
        }
        Ok(tag)
    }

    fn number(&mut self, start: TextPosition) -> Result<TokenKind, TurtleSyntaxError> {
        let mut value = String::new();
        if matches!(self.peek_char(), Some('+' | '-')) {
            value.push(self.bump().ok_or_else(|| self.error(start, "expected a number"))?);
        }
        let mut has_digits = false;
        while self.peek_char().is_some_and(|c| c.is_ascii_digit()) {
            value.push(self.bump().ok_or_else(|| self.error(start, "expected a number"))?);
            has_digits = true;
        }
        let mut is_decimal = false;
        if self.peek_char() == Some('.') && self.peek_second().is_some_and(|c| c.is_ascii_digit()) {
            is_decimal = true;
            value.push(self.bump().ok_or_else(|| self.error(start, "expected a number"))?);
            while self.peek_char().is_some_and(|c| c.is_ascii_digit()) {
                value.push(self.bump().ok_or_else(|| self.error(start, "expected a number"))?);
                has_digits = true;
            }
        }
        if !has_digits {
            return Err(self.error(start, "expected a number"));
        }
        if matches!(self.peek_char(), Some('e' | 'E')) {
            value.push(self.bump().ok_or_else(|| self.error(start, "expected a number"))?);
            if matches!(self.peek_char(), Some('+' | '-')) {
                value.push(self.bump().ok_or_else(|| self.error(start, "expected a number"))?);
            }
            let mut exponent_digits = false;
            while self.peek_char().is_some_and(|c| c.is_ascii_digit()) {
                value.push(self.bump().ok_or_else(|| self.error(start, "expected a number"))?);
                exponent_digits = true;
            }
            if !exponent_digits {
                return Err(self.error(start, "expected digits in the number exponent"));
            }
            return Ok(TokenKind::Double(value));
        }
        Ok(if is_decimal {
            TokenKind::Decimal(value)
        } else {
            TokenKind::Integer(value)
        })
    }

    fn pname_or_keyword(&mut self, start: TextPosition) -> Result<TokenKind, TurtleSyntaxError> {
        let prefix = self.pn_prefix(start)?;
        if self.peek_char() == Some(':') {
            self.bump();
            Ok(TokenKind::PrefixedName {
                prefix,
                local: self.pn_local(start)?,
            })
        } else {
            Ok(TokenKind::Keyword(prefix))
        }
    }

    fn pn_prefix(&mut self, start: TextPosition) -> Result<String, TurtleSyntaxError> {
        let mut name = String::new();
        match self.peek_char() {
            Some(c) if is_pn_chars_base(c) => {
                name.push(c);
                self.bump();
            }
            Some(c) => {
                return Err(self.error(
                    start,
                    format!("unexpected character '{}'", c.escape_default()),
                ))
            }
            None => return Err(self.error(start, "unexpected end of file")),
        }
        loop {
            match self.peek_char() {
                Some(c) if is_pn_chars(c) => {
                    name.push(c);
                    self.bump();
                }
                // A dot is only part of the name when the name continues.
                Some('.') if self.peek_second().is_some_and(|c| is_pn_chars(c) || c == '.') => {
                    name.push('.');
                    self.bump();
                }
                _ => return Ok(name),
            }
        }
    }

    fn pn_local(&mut self, start: TextPosition) -> Result<String, TurtleSyntaxError> {
        let mut name = String::new();
        let mut first = true;
        loop {
            match self.peek_char() {
                Some('%') => {
                    self.bump();
                    let mut escaped = String::from("%");
                    for _ in 0..2 {
                        match self.bump() {
                            Some(c) if c.is_ascii_hexdigit() => escaped.push(c),
                            _ => {
                                return Err(self.error(
                                    start,
                                    "'%' escapes in local names require two hexadecimal digits",
                                ))
                            }
                        }
                    }
                    name.push_str(&escaped);
                }
                Some('\\') => {
                    self.bump();
                    match self.bump() {
                        Some(c) if is_local_escapable(c) => name.push(c),
                        _ => {
                            return Err(
                                self.error(start, "invalid character escape in a local name")
                            )
                        }
                    }
                }
                Some(':') => {
                    name.push(':');
                    self.bump();
                }
                Some('.')
                    if self
                        .peek_second()
                        .is_some_and(|c| is_pn_chars(c) || matches!(c, '.' | ':' | '%' | '\\')) =>
                {
                    name.push('.');
                    self.bump();
                }
                Some(c) if is_pn_chars(c) => {
                    if first
                        && c.is_ascii_digit()
                        && !self
                            .relaxations
                            .contains(TurtleRelaxation::DigitStartingLocalName)
                    {
                        return Err(self.error(
                            self.position(),
                            format!("the local name starting with '{c}' begins with a digit, which strict parsing rejects"),
                        ));
                    }
                    name.push(c);
                    self.bump();
                }
                _ => return Ok(name),
            }
            first = false;
        }
    }

    fn blank_node_label(&mut self, start: TextPosition) -> Result<String, TurtleSyntaxError> {
        let mut label = String::new();
        match self.peek_char() {
            Some(c) if is_pn_chars(c) => {
                label.push(c);
                self.bump();
            }
            _ => return Err(self.error(start, "a blank node label is expected after '_:'")),
        }
        loop {
            match self.peek_char() {
                Some(c) if is_pn_chars(c) => {
                    label.push(c);
                    self.bump();
                }
                Some('.') if self.peek_second().is_some_and(|c| is_pn_chars(c) || c == '.') => {
                    label.push('.');
                    self.bump();
                }
                _ => return Ok(label),
            }
        }
    }
}

fn is_pn_chars_base(c: char) -> bool {
    c.is_alphabetic()
}

fn is_pn_chars(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | '\u{B7}')
}

fn is_local_escapable(c: char) -> bool {
    matches!(
        c,
        '_' | '~' | '.' | '-' | '!' | '$' | '&' | '\'' | '(' | ')' | '*' | '+' | ','
            | ';' | '=' | '/' | '?' | '#' | '@' | '%'
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(input: &str) -> Vec<TokenKind> {
        let mut lexer = Lexer::new(input, LexerMode::Terse, TurtleRelaxations::none());
        let mut out = Vec::new();
        loop {
            let token = lexer.next_token().unwrap();
            if token.kind == TokenKind::Eof {
                return out;
            }
            out.push(token.kind);
        }
    }

    #[test]
    fn basic_tokens() {
        assert_eq!(
            tokens("<http://e/s> ex:p \"o\"@en ."),
            vec![
                TokenKind::IriRef("http://e/s".into()),
                TokenKind::PrefixedName {
                    prefix: "ex".into(),
                    local: "p".into()
                },
                TokenKind::StringLiteral("o".into()),
                TokenKind::LangTag("en".into()),
                TokenKind::Punct(Punct::Dot),
            ]
        );
    }

    #[test]
    fn numbers_and_dots() {
        assert_eq!(
            tokens("1 1.5 .5 1e3 5."),
            vec![
                TokenKind::Integer("1".into()),
                TokenKind::Decimal("1.5".into()),
                TokenKind::Decimal(".5".into()),
                TokenKind::Double("1e3".into()),
                TokenKind::Integer("5".into()),
                TokenKind::Punct(Punct::Dot),
            ]
        );
    }

    #[test]
    fn string_escapes_and_long_strings() {
        assert_eq!(
            tokens(r#""a\nb" '' """multi
line""" "é""#),
            vec![
                TokenKind::StringLiteral("a\nb".into()),
                TokenKind::StringLiteral(String::new()),
                TokenKind::StringLiteral("multi\nline".into()),
                TokenKind::StringLiteral("é".into()),
            ]
        );
    }

    #[test]
    fn iri_escapes() {
        assert_eq!(
            tokens(r"<http://e/é> <http://e/\U0001F600>"),
            vec![
                TokenKind::IriRef("http://e/é".into()),
                TokenKind::IriRef("http://e/😀".into())
            ]
        );
    }

    #[test]
    fn positions_are_tracked() {
        let mut lexer = Lexer::new("a:b\n  <x y>", LexerMode::Terse, TurtleRelaxations::none());
        let first = lexer.next_token().unwrap();
        assert_eq!((first.position.line, first.position.column), (0, 0));
        let err = lexer.next_token().unwrap_err();
        assert_eq!(err.position().line, 1);
        assert_eq!(err.position().column, 2);
    }

    #[test]
    fn digit_local_names_need_relaxation() {
        let mut strict = Lexer::new("gs1:01", LexerMode::Terse, TurtleRelaxations::none());
        assert!(strict.next_token().is_err());
        let mut relaxed = Lexer::new(
            "gs1:01",
            LexerMode::Terse,
            TurtleRelaxations::none().with(TurtleRelaxation::DigitStartingLocalName),
        );
        assert_eq!(
            relaxed.next_token().unwrap().kind,
            TokenKind::PrefixedName {
                prefix: "gs1".into(),
                local: "01".into()
            }
        );
    }

    #[test]
    fn unterminated_constructs_fail() {
        for input in ["<http://e/unterminated", "\"unterminated", "'''long"] {
            let mut lexer = Lexer::new(input, LexerMode::Terse, TurtleRelaxations::none());
            assert!(lexer.next_token().is_err(), "{input}");
        }
    }
}
