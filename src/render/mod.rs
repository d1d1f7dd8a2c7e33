pub mod format;

pub use format::{DefaultFormatProvider, FormatProvider};

use crate::ast::{Node, Section, Tree};
use crate::error::RenderError;
use crate::scope::{PropertyResolver, ScopeStack};
use crate::value::Value;

/// Everything a render walk threads through tag behaviors: the scope
/// stack, the injected capabilities and the output buffer. One context
/// lives per render call and is discarded with it.
pub struct RenderContext<'a> {
    scopes: ScopeStack,
    resolver: &'a dyn PropertyResolver,
    provider: &'a dyn FormatProvider,
    out: String,
}

impl<'a> RenderContext<'a> {
    pub(crate) fn new(
        data: Value,
        resolver: &'a dyn PropertyResolver,
        provider: &'a dyn FormatProvider,
    ) -> Self {
        Self {
            scopes: ScopeStack::new(data),
            resolver,
            provider,
            out: String::new(),
        }
    }

    /// Resolve a path expression (a tag argument) against the scope stack.
    pub fn resolve(&self, path: &str) -> Result<Value, RenderError> {
        let path = crate::ast::Path::parse(path).map_err(|message| RenderError::Evaluation {
            message: format!("`{}` is not a resolvable path: {}", path, message),
        })?;
        self.scopes.resolve(&path, self.resolver)
    }

    /// Push a scope for a context-sensitive body.
    pub fn push_scope(&mut self, value: Value) {
        self.scopes.push(value);
    }

    pub fn pop_scope(&mut self) {
        self.scopes.pop();
    }

    /// Append text to the output buffer.
    pub fn write(&mut self, text: &str) {
        self.out.push_str(text);
    }

    pub fn provider(&self) -> &'a dyn FormatProvider {
        self.provider
    }

    pub(crate) fn finish(self) -> String {
        self.out
    }

    fn render_nodes(&mut self, nodes: &[Node]) -> Result<(), RenderError> {
        for node in nodes {
            match node {
                Node::Static(node) => self.out.push_str(&node.text),

                Node::Placeholder(node) => {
                    let value = self.scopes.resolve(&node.path, self.resolver)?;
                    if !value.is_null() {
                        let text = format::apply(
                            &value,
                            node.alignment,
                            node.format.as_deref(),
                            self.provider,
                        )?;
                        self.out.push_str(&text);
                    }
                }

                Node::Tag(node) => {
                    let body = Body {
                        nodes: &node.body,
                        sections: &node.sections,
                    };
                    if node.def.is_context_sensitive() {
                        // Scopes the behavior pushed must come off on every
                        // exit path, including an error mid-body
                        let depth = self.scopes.depth();
                        let result = node.def.render(self, &node.args, &body);
                        self.scopes.unwind_to(depth);
                        result?;
                    } else {
                        node.def.render(self, &node.args, &body)?;
                    }
                }
            }
        }
        Ok(())
    }
}

/// Handle a compound tag uses to render its body and subsections.
pub struct Body<'a> {
    nodes: &'a [Node],
    sections: &'a [Section],
}

impl<'a> Body<'a> {
    /// Render the main body into the output buffer.
    pub fn render(&self, ctx: &mut RenderContext<'_>) -> Result<(), RenderError> {
        ctx.render_nodes(self.nodes)
    }

    /// The subsection branches in template order.
    pub fn sections(&self) -> impl Iterator<Item = SectionRef<'a>> + '_ {
        self.sections.iter().map(|section| SectionRef { section })
    }
}

/// One subsection branch of a compound tag.
#[derive(Clone, Copy)]
pub struct SectionRef<'a> {
    section: &'a Section,
}

impl<'a> SectionRef<'a> {
    pub fn name(&self) -> &str {
        &self.section.name
    }

    pub fn args(&self) -> &crate::registry::BoundArgs {
        &self.section.args
    }

    pub fn render(&self, ctx: &mut RenderContext<'_>) -> Result<(), RenderError> {
        ctx.render_nodes(&self.section.body)
    }
}

/// Walk a compiled tree against seeded data and produce the output string.
pub(crate) fn render_tree(
    tree: &Tree,
    data: Value,
    resolver: &dyn PropertyResolver,
    provider: &dyn FormatProvider,
) -> Result<String, RenderError> {
    let mut ctx = RenderContext::new(data, resolver, provider);
    ctx.render_nodes(&tree.nodes)?;
    Ok(ctx.finish())
}
