use crate::parser::tokenizer::Span;
use std::fmt;
use thiserror::Error;

/// Kind of parse error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    UnknownTag,
    UnexpectedTag,
    UnmatchedClose,
    UnterminatedTag,
    DuplicateElse,
    BadArguments,
    MalformedTag,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::UnknownTag => "Unknown tag",
            ErrorKind::UnexpectedTag => "Unexpected tag",
            ErrorKind::UnmatchedClose => "Unmatched closing tag",
            ErrorKind::UnterminatedTag => "Unterminated tag",
            ErrorKind::DuplicateElse => "Duplicate else",
            ErrorKind::BadArguments => "Bad arguments",
            ErrorKind::MalformedTag => "Malformed tag",
        }
    }
}

/// Error during parsing
#[derive(Debug, Clone)]
pub struct ParseError {
    pub kind: ErrorKind,
    pub message: String,
    pub span: Span,
    pub related_span: Option<Span>,
    pub related_label: Option<String>,
    pub help: Option<String>,
}

impl ParseError {
    /// Create a new parse error
    pub fn new(kind: ErrorKind, message: impl Into<String>, span: Span) -> Self {
        Self {
            kind,
            message: message.into(),
            span,
            related_span: None,
            related_label: None,
            help: None,
        }
    }

    /// Add a related span with a label (e.g., "opened here")
    pub fn with_related(mut self, span: Span) -> Self {
        self.related_span = Some(span);
        self
    }

    /// Set the label for the related span
    pub fn with_related_label(mut self, label: impl Into<String>) -> Self {
        self.related_label = Some(label.into());
        self
    }

    /// Add help text
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    /// Render the error with source context
    pub fn render(&self, source: &str, filename: &str) -> String {
        self.render_inner(source, filename, false)
    }

    /// Render the error with ANSI color codes
    pub fn render_color(&self, source: &str, filename: &str) -> String {
        self.render_inner(source, filename, true)
    }

    fn render_inner(&self, source: &str, filename: &str, color: bool) -> String {
        let red = if color { "\x1b[1;31m" } else { "" };
        let dim = if color { "\x1b[2m" } else { "" };
        let cyan = if color { "\x1b[1;38;5;73m" } else { "" };
        let reset = if color { "\x1b[0m" } else { "" };

        let mut output = String::new();
        output.push('\n');

        let loc_span = self.related_span.as_ref().unwrap_or(&self.span);
        let line = loc_span.start.line + 1;
        let col = loc_span.start.col + 1;
        output.push_str(&format!(" {}file:{} {}:{}:{}\n", dim, reset, filename, line, col));

        output.push_str(&format!("{}error:{} {}\n", red, reset, self.message));

        self.push_context(&mut output, source, &self.span, red, dim, reset, color, None);

        if let Some(ref related) = self.related_span {
            let label = self.related_label.as_deref().unwrap_or("opened here");
            self.push_context(&mut output, source, related, dim, dim, reset, color, Some(label));
        }

        if let Some(ref help) = self.help {
            output.push('\n');
            for (i, help_line) in help.lines().enumerate() {
                if i == 0 {
                    output.push_str(&format!(" {}help:{} {}\n", cyan, reset, help_line));
                } else {
                    output.push_str(&format!("       {}\n", help_line));
                }
            }
        }

        output.push('\n');
        output
    }

    #[allow(clippy::too_many_arguments)]
    fn push_context(
        &self,
        output: &mut String,
        source: &str,
        span: &Span,
        caret_color: &str,
        dim: &str,
        reset: &str,
        color: bool,
        label: Option<&str>,
    ) {
        let line_no = span.start.line + 1;
        let source_line = match source.lines().nth(span.start.line) {
            Some(l) => l,
            None => return,
        };

        let line_num_width = format!("{}", line_no).len().max(2);
        let highlighted = if color {
            highlight_tags(source_line)
        } else {
            source_line.to_string()
        };
        output.push_str(&format!("{}{:>width$} |{}\n", dim, "", reset, width = line_num_width));
        output.push_str(&format!(
            "{}{:>width$} |{} {}\n",
            dim, line_no, reset, highlighted,
            width = line_num_width
        ));

        let underline_start = span.start.col;
        let underline_len = if span.end.line == span.start.line {
            (span.end.col.saturating_sub(span.start.col)).max(1)
        } else {
            source_line.chars().count().saturating_sub(underline_start).max(1)
        };

        let spaces = " ".repeat(underline_start);
        let carets = "^".repeat(underline_len);
        match label {
            None => output.push_str(&format!(
                "{}{:>width$} |{} {}{}{}{}\n",
                dim, "", reset, spaces, caret_color, carets, reset,
                width = line_num_width
            )),
            Some(label) => output.push_str(&format!(
                "{}{:>width$} |{} {}{}{} {}{}\n",
                dim, "", reset, spaces, dim, carets, label, reset,
                width = line_num_width
            )),
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ParseError {}

/// Error during compilation
#[derive(Debug)]
pub enum CompileError {
    Parse(ParseError),
    /// The template source was absent altogether
    MissingTemplate,
}

impl CompileError {
    /// Render the error with source context (no color)
    pub fn render(&self, source: &str, filename: &str) -> String {
        match self {
            CompileError::Parse(err) => err.render(source, filename),
            CompileError::MissingTemplate => "error: No template was supplied\n".to_string(),
        }
    }

    /// Render the error with ANSI color codes
    pub fn render_color(&self, source: &str, filename: &str) -> String {
        match self {
            CompileError::Parse(err) => err.render_color(source, filename),
            CompileError::MissingTemplate => {
                "\x1b[1;31merror\x1b[0m: \x1b[1mNo template was supplied\x1b[0m\n".to_string()
            }
        }
    }
}

impl From<ParseError> for CompileError {
    fn from(err: ParseError) -> Self {
        CompileError::Parse(err)
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileError::Parse(err) => write!(f, "{}", err),
            CompileError::MissingTemplate => write!(f, "no template was supplied"),
        }
    }
}

impl std::error::Error for CompileError {}

/// Error during rendering. Runtime failures carry paths rather than spans;
/// the template compiled cleanly, the data did not cooperate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error("key not found: `{path}`")]
    KeyNotFound { path: String },

    #[error("`{path}` did not resolve to an iterable collection")]
    NotIterable { path: String },

    #[error("cannot format value with `{spec}`: {message}")]
    Format { spec: String, message: String },

    #[error("{message}")]
    Evaluation { message: String },
}

/// Highlight `{{...}}` tags in a source context line
fn highlight_tags(line: &str) -> String {
    const TAG: &str = "\x1b[38;5;180m";
    const KEYWORD: &str = "\x1b[38;5;173m";
    const RESET: &str = "\x1b[0m";

    let mut result = String::with_capacity(line.len() * 2);
    let mut rest = line;

    while let Some(open) = rest.find("{{") {
        result.push_str(&rest[..open]);
        let tail = &rest[open..];
        match tail[2..].find("}}") {
            Some(close) => {
                let inner = &tail[2..2 + close];
                result.push_str(TAG);
                result.push_str("{{");
                result.push_str(RESET);
                if inner.starts_with('#') || inner.starts_with('/') {
                    result.push_str(KEYWORD);
                    result.push_str(inner);
                    result.push_str(RESET);
                } else {
                    result.push_str(inner);
                }
                result.push_str(TAG);
                result.push_str("}}");
                result.push_str(RESET);
                rest = &tail[2 + close + 2..];
            }
            None => {
                result.push_str(TAG);
                result.push_str(tail);
                result.push_str(RESET);
                rest = "";
            }
        }
    }
    result.push_str(rest);
    result
}
