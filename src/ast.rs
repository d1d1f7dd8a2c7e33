use std::fmt;
use std::sync::Arc;

use crate::parser::tokenizer::Span;
use crate::registry::{BoundArgs, TagDefinition};

/// A compiled template: the frozen node tree the renderer walks.
#[derive(Debug, Clone)]
pub struct Tree {
    pub nodes: Vec<Node>,
}

impl Tree {
    pub fn new(nodes: Vec<Node>) -> Self {
        Self { nodes }
    }
}

/// Generator node
#[derive(Debug, Clone)]
pub enum Node {
    /// Literal text, possibly rewritten by the standalone-line pass
    Static(StaticNode),
    /// Key placeholder: `{{PATH[,ALIGN][:FORMAT]}}`
    Placeholder(PlaceholderNode),
    /// A tag occurrence, paired or inline
    Tag(TagNode),
}

#[derive(Debug, Clone)]
pub struct StaticNode {
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct PlaceholderNode {
    pub path: Path,
    /// Positive right-aligns (leading pad), negative left-aligns, zero none
    pub alignment: i32,
    pub format: Option<String>,
    pub span: Span,
}

/// A paired or inline tag with its bound arguments, main body and any
/// subsection branches (`elif`/`else` on an `if`).
#[derive(Clone)]
pub struct TagNode {
    pub def: Arc<dyn TagDefinition>,
    pub args: BoundArgs,
    pub body: Vec<Node>,
    pub sections: Vec<Section>,
    pub span: Span,
}

impl fmt::Debug for TagNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TagNode")
            .field("name", &self.def.name())
            .field("args", &self.args)
            .field("body", &self.body)
            .field("sections", &self.sections)
            .field("span", &self.span)
            .finish()
    }
}

/// A subsection branch captured while the parent tag's frame was open.
#[derive(Debug, Clone)]
pub struct Section {
    pub name: String,
    pub args: BoundArgs,
    pub body: Vec<Node>,
    pub span: Span,
}

/// A dotted lookup path. The reserved leading segment `this` anchors the
/// path at the innermost scope instead of probing by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Path {
    raw: String,
    segments: Vec<String>,
}

impl Path {
    /// Parse and validate `SEGMENT(.SEGMENT)*` where each segment matches
    /// `[A-Za-z_][A-Za-z0-9_]*`. `this` is legal only as the first segment.
    pub fn parse(text: &str) -> Result<Path, String> {
        if text.is_empty() {
            return Err("empty key".to_string());
        }

        let segments: Vec<String> = text.split('.').map(str::to_string).collect();
        for (i, segment) in segments.iter().enumerate() {
            if !is_identifier(segment) {
                return Err(format!("`{}` is not a valid key segment", segment));
            }
            if segment == "this" && i > 0 {
                return Err("`this` is only legal as the first segment of a path".to_string());
            }
        }

        Ok(Path {
            raw: text.to_string(),
            segments,
        })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// True when the path starts at the current scope (`this` or `this.X`).
    pub fn is_this_anchored(&self) -> bool {
        self.segments[0] == "this"
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
