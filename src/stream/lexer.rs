use super::{ParseError, ParseErrorKind, Result};

/// Token categories produced by the [`Lexer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    /// Module identifier at the head of a pipeline segment.
    Module(String),
    /// A `--key=value` option belonging to the preceding module.
    Option {
        /// Option key (an identifier).
        key: String,
        /// Raw option value, trailing whitespace removed.
        value: String,
    },
    /// The `|` pipeline separator.
    Pipe,
}

/// A lexed token together with its position in the source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// What was recognized.
    pub kind: TokenKind,
    /// The exact source text of the token.
    pub text: String,
    /// Character offset of the token in the source text.
    pub offset: usize,
}

/// Tokenize definition text with default lexer settings.
pub fn tokenize(source: &str) -> Result<Vec<Token>> {
    Lexer::new(source).tokenize()
}

/// Context-sensitive tokenizer for stream definitions.
///
/// The lexer tracks whether a module name is expected next: the first token of
/// every segment must be a module identifier, and everything after it must be
/// an option or a separator. Option values are delimited by lookahead, so a
/// value may contain spaces, `|`, `=` and quotes as long as they are not a
/// whitespace run followed by `|`, `--`, or end of input.
pub struct Lexer<'a> {
    src: &'a str,
    bytes: &'a [u8],
    index: usize,
    // character offset of `index`
    chars: usize,
    expect_module: bool,
    allow_empty_values: bool,
    allow_pipes: bool,
}

impl<'a> Lexer<'a> {
    /// Create a lexer over `src`.
    pub fn new(src: &'a str) -> Self {
        Self {
            src,
            bytes: src.as_bytes(),
            index: 0,
            chars: 0,
            expect_module: true,
            allow_empty_values: false,
            allow_pipes: true,
        }
    }

    /// Accept `--key=` with nothing before the next boundary.
    pub fn allow_empty_values(mut self, allow: bool) -> Self {
        self.allow_empty_values = allow;
        self
    }

    /// Reject `|` separators, for text that must hold a single module.
    pub fn single_module(mut self) -> Self {
        self.allow_pipes = false;
        self
    }

    /// Consume the whole input, stopping at the first error.
    pub fn tokenize(mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();
        while let Some(token) = self.next_token()? {
            tracing::trace!(offset = token.offset, text = %token.text, "lexed token");
            tokens.push(token);
        }
        Ok(tokens)
    }

    fn next_token(&mut self) -> Result<Option<Token>> {
        self.skip_ws();
        let Some(ch) = self.current() else {
            return Ok(None);
        };
        let start = self.index;

        if ch == b'|' {
            if !self.allow_pipes {
                return Err(self.error(
                    ParseErrorKind::UnexpectedToken,
                    start,
                    start + 1,
                    "pipeline separator is not allowed in a single module",
                ));
            }
            self.advance();
            self.expect_module = true;
            return Ok(Some(self.token(TokenKind::Pipe, start)));
        }

        if self.at_option_marker(start) {
            if self.expect_module {
                let end = self.word_end(start);
                return Err(self.error(
                    ParseErrorKind::MalformedOption,
                    start,
                    end,
                    "option must follow a module name",
                ));
            }
            return self.lex_option().map(Some);
        }

        if self.expect_module {
            return self.lex_module().map(Some);
        }

        let end = self.word_end(start);
        Err(self.error(
            ParseErrorKind::UnexpectedToken,
            start,
            end,
            "expected '--key=value' option or '|'",
        ))
    }

    fn lex_module(&mut self) -> Result<Token> {
        let start = self.index;
        if !self.current().is_some_and(is_identifier_start) {
            let end = self.word_end(start);
            return Err(self.error(
                ParseErrorKind::InvalidModuleName,
                start,
                end,
                "module name must start with a letter or '_'",
            ));
        }

        while let Some(ch) = self.current() {
            if self.option_ahead(self.index) {
                let end = self.word_end(start);
                return Err(self.error(
                    ParseErrorKind::MalformedOption,
                    start,
                    end,
                    "missing whitespace between module name and option",
                ));
            }
            if !is_identifier_char(ch) {
                break;
            }
            self.advance();
        }

        match self.current() {
            None | Some(b'|') => {}
            Some(ch) if ch.is_ascii_whitespace() => {}
            Some(_) => {
                let end = self.word_end(start);
                return Err(self.error(
                    ParseErrorKind::InvalidModuleName,
                    start,
                    end,
                    "module name may only contain letters, digits, '_' and '-'",
                ));
            }
        }

        self.expect_module = false;
        let name = self.src[start..self.index].to_string();
        Ok(self.token(TokenKind::Module(name), start))
    }

    fn lex_option(&mut self) -> Result<Token> {
        let start = self.index;
        // consume "--"
        self.seek(start + 2);

        let key_start = self.index;
        if self.current().is_some_and(is_identifier_start) {
            while self.current().is_some_and(is_identifier_char) {
                self.advance();
            }
        }
        if key_start == self.index {
            let end = self.word_end(start);
            return Err(self.error(
                ParseErrorKind::MalformedOption,
                start,
                end,
                "option key must be an identifier",
            ));
        }
        let key = self.src[key_start..self.index].to_string();

        if self.current() != Some(b'=') {
            let end = self.word_end(start);
            return Err(self.error(
                ParseErrorKind::MalformedOption,
                start,
                end,
                format!("expected '=' after option key '{}'", key),
            ));
        }
        self.advance();

        let value_start = self.index;
        self.seek(self.value_end(value_start));
        let value = self.src[value_start..self.index].trim_end().to_string();
        if value.is_empty() && !self.allow_empty_values {
            return Err(self.error(
                ParseErrorKind::MalformedOption,
                start,
                self.index,
                format!("option '{}' has no value", key),
            ));
        }

        Ok(self.token(TokenKind::Option { key, value }, start))
    }

    /// Find where a value starting at `from` ends: the first whitespace run
    /// followed by `|`, by `--`, or by end of input. Whatever follows `--` is
    /// lexed as an option and must be well formed.
    fn value_end(&self, from: usize) -> usize {
        let mut i = from;
        while i < self.bytes.len() {
            if !self.bytes[i].is_ascii_whitespace() {
                i += 1;
                continue;
            }
            let mut next = i;
            while next < self.bytes.len() && self.bytes[next].is_ascii_whitespace() {
                next += 1;
            }
            if next == self.bytes.len() || self.bytes[next] == b'|' || self.at_option_marker(next) {
                return i;
            }
            i = next;
        }
        self.bytes.len()
    }

    /// Whether a complete `--key=` starts at `at`.
    fn option_ahead(&self, at: usize) -> bool {
        if !self.at_option_marker(at) {
            return false;
        }
        let mut i = at + 2;
        if !self.bytes.get(i).copied().is_some_and(is_identifier_start) {
            return false;
        }
        while self.bytes.get(i).copied().is_some_and(is_identifier_char) {
            i += 1;
        }
        self.bytes.get(i) == Some(&b'=')
    }

    fn at_option_marker(&self, at: usize) -> bool {
        self.bytes.get(at) == Some(&b'-') && self.bytes.get(at + 1) == Some(&b'-')
    }

    fn current(&self) -> Option<u8> {
        self.bytes.get(self.index).copied()
    }

    fn advance(&mut self) {
        if self.index < self.bytes.len() {
            self.seek(self.index + 1);
        }
    }

    /// Move the cursor forward to byte `to`, keeping the character count.
    fn seek(&mut self, to: usize) {
        let to = to.min(self.bytes.len());
        self.chars += count_chars(&self.bytes[self.index..to]);
        self.index = to;
    }

    fn skip_ws(&mut self) {
        while self.current().is_some_and(|ch| ch.is_ascii_whitespace()) {
            self.advance();
        }
    }

    /// End of the whitespace- or pipe-delimited word starting at `from`.
    fn word_end(&self, from: usize) -> usize {
        let mut i = from;
        while i < self.bytes.len() && !self.bytes[i].is_ascii_whitespace() && self.bytes[i] != b'|' {
            i += 1;
        }
        i
    }

    /// Character offset of byte `byte`, counted from the cursor.
    fn char_offset(&self, byte: usize) -> usize {
        if byte <= self.index {
            self.chars - count_chars(&self.bytes[byte..self.index])
        } else {
            self.chars + count_chars(&self.bytes[self.index..byte.min(self.bytes.len())])
        }
    }

    fn token(&self, kind: TokenKind, start: usize) -> Token {
        Token {
            kind,
            text: self.src[start..self.index].to_string(),
            offset: self.char_offset(start),
        }
    }

    fn error(
        &self,
        kind: ParseErrorKind,
        start: usize,
        end: usize,
        message: impl Into<String>,
    ) -> ParseError {
        let end = end.max(start).min(self.src.len());
        // Non-ASCII input can put `end` inside a multi-byte character.
        let end = (end..=self.src.len())
            .find(|i| self.src.is_char_boundary(*i))
            .unwrap_or(self.src.len());
        ParseError::new(kind, &self.src[start..end], self.char_offset(start), message)
    }
}

/// Characters starting in `bytes`, i.e. bytes that are not UTF-8 continuations.
fn count_chars(bytes: &[u8]) -> usize {
    bytes.iter().filter(|b| (**b & 0xC0) != 0x80).count()
}

fn is_identifier_start(ch: u8) -> bool {
    ch.is_ascii_alphabetic() || ch == b'_'
}

fn is_identifier_char(ch: u8) -> bool {
    ch.is_ascii_alphanumeric() || ch == b'_' || ch == b'-'
}
