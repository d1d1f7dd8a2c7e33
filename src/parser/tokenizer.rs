use crate::ast::Path;
use crate::error::{ErrorKind, ParseError};

/// Position in template source (byte offset plus line/col for reporting)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    /// Byte offset in source
    pub byte: usize,
    /// Line number (0-indexed)
    pub line: usize,
    /// Column number (0-indexed, in characters)
    pub col: usize,
}

impl Position {
    pub fn new() -> Self {
        Self { byte: 0, line: 0, col: 0 }
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::new()
    }
}

/// Span in template source (a range from start position to end position)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: Position,
    pub end: Position,
}

/// Tokens produced by the lexer
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Literal run: the longest substring not starting with `{{`
    Literal { text: String, span: Span },
    /// Tag opener `{{#NAME arg1 arg2}}`; the comment tag `{{#! ... }}`
    /// arrives here with name `#!` and its text split into args
    TagOpen { name: String, args: Vec<String>, span: Span },
    /// Tag closer `{{/NAME}}`
    TagClose { name: String, span: Span },
    /// Key placeholder `{{PATH[,ALIGN][:FORMAT]}}`
    Key { path: Path, alignment: i32, format: Option<String>, span: Span },
    /// End of template
    Eof { position: Position },
}

impl Token {
    pub fn span(&self) -> Span {
        match self {
            Token::Literal { span, .. } => *span,
            Token::TagOpen { span, .. } => *span,
            Token::TagClose { span, .. } => *span,
            Token::Key { span, .. } => *span,
            Token::Eof { position } => Span { start: *position, end: *position },
        }
    }
}

/// Tokenize a template into a stream ending in `Eof`
pub fn tokenize(source: &str) -> Result<Vec<Token>, ParseError> {
    Tokenizer::new(source).tokenize()
}

/// Tokenizer for template source
pub struct Tokenizer<'a> {
    source: &'a str,
    bytes: &'a [u8],
    position: Position,
}

impl<'a> Tokenizer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            bytes: source.as_bytes(),
            position: Position::new(),
        }
    }

    /// Tokenize the entire template
    pub fn tokenize(&mut self) -> Result<Vec<Token>, ParseError> {
        let mut tokens = Vec::new();
        let mut literal = String::new();
        let mut literal_start = self.position;

        while !self.at_eof() {
            if self.at_tag_start() {
                if !literal.is_empty() {
                    tokens.push(Token::Literal {
                        text: std::mem::take(&mut literal),
                        span: Span { start: literal_start, end: self.position },
                    });
                }
                self.tokenize_tag(&mut tokens)?;
                literal_start = self.position;
            } else if let Some(ch) = self.advance() {
                literal.push(ch);
            }
        }

        if !literal.is_empty() {
            tokens.push(Token::Literal {
                text: literal,
                span: Span { start: literal_start, end: self.position },
            });
        }

        tokens.push(Token::Eof { position: self.position });
        Ok(tokens)
    }

    /// Tokenize one `{{...}}` tag at the current position
    fn tokenize_tag(&mut self, tokens: &mut Vec<Token>) -> Result<(), ParseError> {
        let start = self.position;
        self.advance(); // {
        self.advance(); // {

        let mut inner = String::new();
        loop {
            if self.at_eof() {
                return Err(ParseError::new(
                    ErrorKind::UnterminatedTag,
                    "This tag is never closed.",
                    Span { start, end: self.position },
                )
                .with_help("Close it with `}}`"));
            }
            if self.rest().starts_with("}}") {
                break;
            }
            if let Some(ch) = self.advance() {
                inner.push(ch);
            }
        }
        self.advance(); // }
        self.advance(); // }
        let span = Span { start, end: self.position };

        if let Some(text) = inner.strip_prefix("#!") {
            tokens.push(Token::TagOpen {
                name: "#!".to_string(),
                args: text.split_whitespace().map(str::to_string).collect(),
                span,
            });
        } else if let Some(text) = inner.strip_prefix('#') {
            let (name, rest) = split_tag_name(text, span)?;
            tokens.push(Token::TagOpen {
                name,
                args: rest.split_whitespace().map(str::to_string).collect(),
                span,
            });
        } else if let Some(text) = inner.strip_prefix('/') {
            let name = text.trim();
            if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                return Err(ParseError::new(
                    ErrorKind::MalformedTag,
                    format!("`{{{{/{}}}}}` is not a valid closing tag.", text),
                    span,
                ));
            }
            tokens.push(Token::TagClose { name: name.to_string(), span });
        } else {
            tokens.push(parse_key(&inner, span)?);
        }

        Ok(())
    }

    // === Low-level helpers ===

    fn at_eof(&self) -> bool {
        self.position.byte >= self.bytes.len()
    }

    fn at_tag_start(&self) -> bool {
        self.rest().starts_with("{{")
    }

    fn rest(&self) -> &str {
        &self.source[self.position.byte..]
    }

    fn peek_char(&self) -> Option<char> {
        if self.at_eof() {
            return None;
        }
        let b = self.bytes[self.position.byte];
        if b < 128 {
            Some(b as char)
        } else {
            self.source[self.position.byte..].chars().next()
        }
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek_char()?;
        self.position.byte += ch.len_utf8();
        if ch == '\n' {
            self.position.line += 1;
            self.position.col = 0;
        } else {
            self.position.col += 1;
        }
        Some(ch)
    }
}

/// Split `NAME rest` inside a `{{#...}}` opener, validating the name
fn split_tag_name(text: &str, span: Span) -> Result<(String, &str), ParseError> {
    let name_len = text
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
        .map(char::len_utf8)
        .sum::<usize>();
    let name = &text[..name_len];

    if name.is_empty() || name.starts_with(|c: char| c.is_ascii_digit()) {
        return Err(ParseError::new(
            ErrorKind::MalformedTag,
            format!("`{{{{#{}}}}}` is not a valid tag.", text),
            span,
        )
        .with_help("Tag names match [A-Za-z_][A-Za-z0-9_]*"));
    }

    let rest = &text[name_len..];
    if !rest.is_empty() && !rest.starts_with(|c: char| c.is_whitespace()) {
        return Err(ParseError::new(
            ErrorKind::MalformedTag,
            format!("`{{{{#{}}}}}` is not a valid tag.", text),
            span,
        )
        .with_help("Separate a tag name from its arguments with whitespace"));
    }

    Ok((name.to_string(), rest))
}

/// Parse `PATH[,ALIGN][:FORMAT]` between the braces of a key placeholder
fn parse_key(inner: &str, span: Span) -> Result<Token, ParseError> {
    let (left, format) = match inner.find(':') {
        Some(p) => (&inner[..p], Some(inner[p + 1..].to_string())),
        None => (inner, None),
    };

    let (path_text, alignment) = match left.find(',') {
        Some(p) => (&left[..p], parse_alignment(left[p + 1..].trim(), span)?),
        None => (left, 0),
    };

    let path = Path::parse(path_text.trim()).map_err(|message| {
        ParseError::new(ErrorKind::BadArguments, message, span)
            .with_help("Keys match [A-Za-z_][A-Za-z0-9_]* segments separated by `.`")
    })?;

    Ok(Token::Key { path, alignment, format, span })
}

/// Alignment matches `[+-]?digits`; `+n` is equivalent to `n`
fn parse_alignment(text: &str, span: Span) -> Result<i32, ParseError> {
    let digits = text.strip_prefix('+').unwrap_or(text);
    let valid = match digits.strip_prefix('-') {
        Some(d) => !d.is_empty() && d.chars().all(|c| c.is_ascii_digit()),
        None => !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()),
    };
    // A `+-` mix like `+-3` slips through strip_prefix chains; reject it
    if !valid || (text.starts_with('+') && digits.starts_with('-')) {
        return Err(ParseError::new(
            ErrorKind::BadArguments,
            format!("`{}` is not a valid alignment.", text),
            span,
        )
        .with_help("Alignment matches [+-]?digits, e.g. `{{Name,-10}}`"));
    }
    digits.parse::<i32>().map_err(|_| {
        ParseError::new(
            ErrorKind::BadArguments,
            format!("`{}` is out of range for an alignment.", text),
            span,
        )
    })
}
