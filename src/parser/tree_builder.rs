use std::sync::Arc;

use super::tokenizer::{Span, Token};
use crate::ast::{Node, PlaceholderNode, Section, StaticNode, TagNode};
use crate::error::{ErrorKind, ParseError};
use crate::registry::{BoundArgs, TagDefinition, TagRegistry};

/// Builds a generator tree from a token stream
pub struct TreeBuilder<'a> {
    tokens: Vec<Token>,
    pos: usize,
    registry: &'a TagRegistry,
    stack: Vec<Frame>,
    root: Vec<Node>,
}

/// One open paired tag. `children` accumulates the section currently
/// being populated; once a subsection opens, the main body moves to
/// `body` and completed subsections collect in `sections`.
struct Frame {
    def: Arc<dyn TagDefinition>,
    args: BoundArgs,
    open_span: Span,
    children: Vec<Node>,
    body: Option<Vec<Node>>,
    sections: Vec<Section>,
    section: Option<SectionHead>,
}

struct SectionHead {
    name: String,
    args: BoundArgs,
    span: Span,
}

impl<'a> TreeBuilder<'a> {
    pub fn new(tokens: Vec<Token>, registry: &'a TagRegistry) -> Self {
        Self {
            tokens,
            pos: 0,
            registry,
            stack: Vec::new(),
            root: Vec::new(),
        }
    }

    pub fn build(mut self) -> Result<Vec<Node>, ParseError> {
        while self.pos < self.tokens.len() {
            let token = self.tokens[self.pos].clone();
            self.pos += 1;

            match token {
                Token::Literal { text, .. } => {
                    self.push_child(Node::Static(StaticNode { text }));
                }

                Token::Key { path, alignment, format, span } => {
                    self.push_child(Node::Placeholder(PlaceholderNode {
                        path,
                        alignment,
                        format,
                        span,
                    }));
                }

                Token::TagOpen { name, args, span } => {
                    self.open_tag(&name, &args, span)?;
                }

                Token::TagClose { name, span } => {
                    self.close_tag(&name, span)?;
                }

                Token::Eof { position } => {
                    if let Some(frame) = self.stack.last() {
                        return Err(ParseError::new(
                            ErrorKind::UnterminatedTag,
                            format!("`{{{{#{}}}}}` is never closed.", frame.def.name()),
                            Span { start: position, end: position },
                        )
                        .with_related(frame.open_span)
                        .with_help(format!("Close it with `{{{{/{}}}}}`", frame.def.name())));
                    }
                }
            }
        }

        Ok(self.root)
    }

    fn open_tag(&mut self, name: &str, raw_args: &[String], span: Span) -> Result<(), ParseError> {
        let is_subsection = self
            .stack
            .last()
            .is_some_and(|frame| frame.def.child_tags().iter().any(|child| *child == name));
        if is_subsection {
            return self.open_section(name, raw_args, span);
        }

        let def = self.registry.get(name).cloned().ok_or_else(|| {
            ParseError::new(
                ErrorKind::UnknownTag,
                format!("`{{{{#{}}}}}` is not a registered tag.", name),
                span,
            )
            .with_help("Register user tags on the compiler before compiling")
        })?;

        if !self.registry.is_top_level(name) {
            return Err(ParseError::new(
                ErrorKind::UnexpectedTag,
                format!("`{{{{#{}}}}}` is not valid here.", name),
                span,
            )
            .with_help(format!(
                "`{{{{#{}}}}}` is a subsection tag; it is only valid inside a tag that accepts it",
                name
            )));
        }

        let args = BoundArgs::bind(name, &def.parameters(), raw_args, span)?;

        if def.has_closer() {
            self.stack.push(Frame {
                def,
                args,
                open_span: span,
                children: Vec::new(),
                body: None,
                sections: Vec::new(),
                section: None,
            });
        } else {
            self.push_child(Node::Tag(TagNode {
                def,
                args,
                body: Vec::new(),
                sections: Vec::new(),
                span,
            }));
        }

        Ok(())
    }

    fn open_section(
        &mut self,
        name: &str,
        raw_args: &[String],
        span: Span,
    ) -> Result<(), ParseError> {
        let def = self.registry.get(name).cloned().ok_or_else(|| {
            ParseError::new(
                ErrorKind::UnknownTag,
                format!("`{{{{#{}}}}}` is not a registered tag.", name),
                span,
            )
        })?;
        let args = BoundArgs::bind(name, &def.parameters(), raw_args, span)?;

        let Some(frame) = self.stack.last_mut() else {
            return Err(ParseError::new(
                ErrorKind::UnexpectedTag,
                format!("`{{{{#{}}}}}` is not valid at the top level.", name),
                span,
            ));
        };

        let after_else = frame
            .section
            .as_ref()
            .map(|head| head.name == "else")
            .unwrap_or(false)
            || frame.sections.iter().any(|section| section.name == "else");

        if after_else {
            if name == "else" {
                return Err(ParseError::new(
                    ErrorKind::DuplicateElse,
                    format!("This `{{{{#{}}}}}` already has an `{{{{#else}}}}`.", frame.def.name()),
                    span,
                )
                .with_related(frame.open_span)
                .with_help("A tag body takes at most one `{{#else}}`"));
            }
            return Err(ParseError::new(
                ErrorKind::UnexpectedTag,
                format!("`{{{{#{}}}}}` cannot follow `{{{{#else}}}}`.", name),
                span,
            )
            .with_related(frame.open_span)
            .with_help("`{{#else}}` must be the final branch"));
        }

        match frame.section.take() {
            None => frame.body = Some(std::mem::take(&mut frame.children)),
            Some(head) => frame.sections.push(Section {
                name: head.name,
                args: head.args,
                body: std::mem::take(&mut frame.children),
                span: head.span,
            }),
        }
        frame.section = Some(SectionHead {
            name: name.to_string(),
            args,
            span,
        });

        Ok(())
    }

    fn close_tag(&mut self, name: &str, span: Span) -> Result<(), ParseError> {
        let Some(frame) = self.stack.pop() else {
            return Err(ParseError::new(
                ErrorKind::UnmatchedClose,
                format!("`{{{{/{}}}}}` has no matching opener.", name),
                span,
            ));
        };

        if frame.def.name() != name {
            return Err(ParseError::new(
                ErrorKind::UnmatchedClose,
                format!(
                    "Expected `{{{{/{}}}}}` but found `{{{{/{}}}}}`.",
                    frame.def.name(),
                    name
                ),
                span,
            )
            .with_related(frame.open_span)
            .with_help("Close nested tags before their parents"));
        }

        let node = finish_frame(frame);
        self.push_child(node);
        Ok(())
    }

    fn push_child(&mut self, node: Node) {
        match self.stack.last_mut() {
            Some(frame) => frame.children.push(node),
            None => self.root.push(node),
        }
    }
}

fn finish_frame(mut frame: Frame) -> Node {
    let body = match frame.section.take() {
        Some(head) => {
            frame.sections.push(Section {
                name: head.name,
                args: head.args,
                body: std::mem::take(&mut frame.children),
                span: head.span,
            });
            frame.body.take().unwrap_or_default()
        }
        None => std::mem::take(&mut frame.children),
    };

    Node::Tag(TagNode {
        def: frame.def,
        args: frame.args,
        body,
        sections: frame.sections,
        span: frame.open_span,
    })
}

// === Standalone-line elision ===
//
// A line whose only non-whitespace content is control or comment tags is
// removed whole: the leading whitespace, the tags, the whitespace between
// and after them, and the line terminator. A final line with no terminator
// consumes the newline that preceded it instead. Key placeholders never
// qualify. The pass runs on the token stream, where the original line
// structure is still intact, by rewriting the literals flanking each run
// of qualifying tags.

/// How a standalone candidate line ends
enum LineEnd {
    /// Terminated by a newline at this byte offset of the following literal
    Newline(usize),
    /// Runs into the end of the template
    EndOfTemplate,
}

pub(crate) fn elide_standalone_lines(
    mut tokens: Vec<Token>,
    registry: &TagRegistry,
) -> Vec<Token> {
    // Decide first, trim second: two standalone lines can share one
    // literal (the newline between them), and trimming it for the first
    // line must not hide the second line's boundary from the check.
    let mut runs = Vec::new();
    let mut i = 0;
    while i < tokens.len() {
        if !is_tag(&tokens[i]) {
            i += 1;
            continue;
        }

        // Extend the run across adjacent tags and the blank inline
        // literals joining them
        let mut j = i;
        loop {
            if j + 1 < tokens.len() && is_tag(&tokens[j + 1]) {
                j += 1;
            } else if j + 2 < tokens.len()
                && is_blank_inline(&tokens[j + 1])
                && is_tag(&tokens[j + 2])
            {
                j += 2;
            } else {
                break;
            }
        }

        let all_qualify = tokens[i..=j]
            .iter()
            .all(|token| !is_tag(token) || qualifies(token, registry));

        if all_qualify && line_start_ok(&tokens, i) {
            if let Some(end) = line_end(&tokens, j) {
                runs.push((i, j, end));
            }
        }

        i = j + 1;
    }

    for (i, j, end) in runs {
        trim_run(&mut tokens, i, j, end);
    }

    tokens.retain(|token| !matches!(token, Token::Literal { text, .. } if text.is_empty()));
    tokens
}

fn is_tag(token: &Token) -> bool {
    matches!(
        token,
        Token::TagOpen { .. } | Token::TagClose { .. } | Token::Key { .. }
    )
}

/// Whether a tag token is elidable when standalone: control-structure
/// openers and closers, subsection tags, and the comment tag. Key
/// placeholders and user inline text tags are not.
fn qualifies(token: &Token, registry: &TagRegistry) -> bool {
    match token {
        Token::TagClose { .. } => true,
        Token::TagOpen { name, .. } => {
            if name == "#!" {
                return true;
            }
            match registry.get(name) {
                Some(def) => def.has_closer() || !registry.is_top_level(name),
                None => false,
            }
        }
        _ => false,
    }
}

/// A whitespace-only literal with no newline (joins tags on one line)
fn is_blank_inline(token: &Token) -> bool {
    match token {
        Token::Literal { text, .. } => {
            !text.contains('\n') && text.chars().all(char::is_whitespace)
        }
        _ => false,
    }
}

/// The run at `i` sits at the start of its line: nothing before it, or a
/// preceding literal that ends in a newline plus optional whitespace, or
/// all-whitespace text opening the template.
fn line_start_ok(tokens: &[Token], i: usize) -> bool {
    if i == 0 {
        return true;
    }
    match &tokens[i - 1] {
        Token::Literal { text, .. } => match text.rfind('\n') {
            Some(p) => text[p + 1..].chars().all(char::is_whitespace),
            None => i == 1 && text.chars().all(char::is_whitespace),
        },
        _ => false,
    }
}

/// The run ending at `j` finishes its line: followed by optional
/// whitespace and a newline, or by optional whitespace and the end of
/// the template.
fn line_end(tokens: &[Token], j: usize) -> Option<LineEnd> {
    match tokens.get(j + 1) {
        Some(Token::Eof { .. }) | None => Some(LineEnd::EndOfTemplate),
        Some(Token::Literal { text, .. }) => match text.find('\n') {
            Some(p) if text[..p].chars().all(char::is_whitespace) => Some(LineEnd::Newline(p)),
            Some(_) => None,
            None => {
                let blank = text.chars().all(char::is_whitespace);
                let at_end = matches!(tokens.get(j + 2), Some(Token::Eof { .. }) | None);
                if blank && at_end {
                    Some(LineEnd::EndOfTemplate)
                } else {
                    None
                }
            }
        },
        Some(_) => None,
    }
}

/// Rewrite the literals around the standalone run `[i..=j]`
fn trim_run(tokens: &mut [Token], i: usize, j: usize, end: LineEnd) {
    // Trailing side: drop whitespace through the terminator, or the
    // whole literal when the line runs into the end of the template
    if let Some(Token::Literal { text, .. }) = tokens.get_mut(j + 1) {
        match end {
            LineEnd::Newline(p) => *text = text[p + 1..].to_string(),
            LineEnd::EndOfTemplate => text.clear(),
        }
    }

    // Blank literals between the run's tags vanish with the line
    for token in &mut tokens[i..j] {
        if let Token::Literal { text, .. } = token {
            text.clear();
        }
    }

    // Leading side: drop the whitespace after the previous newline
    if i > 0 {
        if let Token::Literal { text, .. } = &mut tokens[i - 1] {
            match text.rfind('\n') {
                Some(p) => text.truncate(p + 1),
                None => text.clear(),
            }
            // With no terminator of its own, the line consumes the
            // newline that preceded it
            if matches!(end, LineEnd::EndOfTemplate) && text.ends_with('\n') {
                text.pop();
                if text.ends_with('\r') {
                    text.pop();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::tokenizer::tokenize;

    fn elide(template: &str) -> String {
        let registry = TagRegistry::with_builtins();
        let tokens = elide_standalone_lines(tokenize(template).unwrap(), &registry);
        tokens
            .iter()
            .filter_map(|token| match token {
                Token::Literal { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_standalone_opener_and_closer() {
        // Both tag lines vanish entirely, including the final line's
        // preceding newline
        assert_eq!(elide("{{#if this}}\nContent\n{{/if}}"), "Content");
    }

    #[test]
    fn test_standalone_with_surrounding_text() {
        assert_eq!(elide("A\n  {{#if x}}  \nB\n{{/if}}\n"), "A\nB\n");
    }

    #[test]
    fn test_inline_tags_preserve_whitespace() {
        assert_eq!(elide("Before {{#if x}} Yay {{/if}} After"), "Before  Yay  After");
    }

    #[test]
    fn test_comment_line_elided() {
        assert_eq!(elide("{{#! c }}\nX"), "X");
    }

    #[test]
    fn test_two_comments_on_one_line() {
        assert_eq!(elide("{{#! a }} {{#! b }}\nX"), "X");
    }

    #[test]
    fn test_key_line_not_elided() {
        assert_eq!(elide("  {{Name}}  \nX"), "    \nX");
    }

    #[test]
    fn test_mixed_line_not_elided() {
        assert_eq!(elide("{{#! c }} {{Name}}\nX"), " \nX");
    }

    #[test]
    fn test_crlf_terminator() {
        assert_eq!(elide("{{#! c }}\r\nX"), "X");
    }

    #[test]
    fn test_consecutive_standalone_lines() {
        // The newline between two standalone lines is shared; both lines
        // must still be recognized and removed
        assert_eq!(elide("{{#! a }}\n{{#! b }}\n{{#! c }}\nX"), "X");
        assert_eq!(elide("{{#each Items}}\n{{/each}}\ndone\n"), "done\n");
    }

    #[test]
    fn test_final_line_does_not_reach_past_consumed_newline() {
        // The if-line's elision already consumed the newline before the
        // closer; the closer must not eat A's terminator instead
        assert_eq!(elide("A\n{{#if x}}\n{{/if}}"), "A\n");
    }
}
