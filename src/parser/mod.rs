pub mod tokenizer;
mod tree_builder;

pub use tokenizer::{tokenize, Position, Span, Token};

use crate::ast::Tree;
use crate::error::ParseError;
use crate::registry::TagRegistry;
use tree_builder::TreeBuilder;

/// Parse a template into a generator tree: tokenize, apply the
/// standalone-line elision pass, then build the tree against the registry.
pub(crate) fn parse(registry: &TagRegistry, source: &str) -> Result<Tree, ParseError> {
    let tokens = tokenizer::tokenize(source)?;
    let tokens = tree_builder::elide_standalone_lines(tokens, registry);
    let nodes = TreeBuilder::new(tokens, registry).build()?;
    Ok(Tree::new(nodes))
}
