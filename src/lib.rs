//! Curly - a Mustache-derived template compiler and renderer
//!
//! This crate implements a three-stage pipeline:
//! 1. Tokenizer: template text → token stream
//! 2. Parser: token stream → generator tree (consulting the tag registry,
//!    applying the standalone-line elision rule)
//! 3. Renderer: tree + data → output string
//!
//! Control tags (`if`/`elif`/`else`, `each`, `with`), comments (`#!`) and
//! user-registered tags share one extension point, [`TagDefinition`].
//! Key placeholders support dotted paths, alignment padding and a format
//! specifier handed to an injected [`FormatProvider`].
//!
//! # Example
//!
//! ```
//! use curly::Compiler;
//!
//! let compiler = Compiler::new();
//! let template = compiler.compile("Hello, {{Name}}!").unwrap();
//! let output = template
//!     .render(serde_json::json!({"Name": "World"}))
//!     .unwrap();
//! assert_eq!(output, "Hello, World!");
//! ```

pub mod ast;
pub mod error;
pub mod parser;
pub mod registry;
pub mod render;
pub mod scope;
pub mod value;

mod tags;

use std::sync::Arc;

use ast::Tree;

/// Compiles templates against a tag registry. Built-in tags are present
/// from construction; user tags install through
/// [`register_tag`](Compiler::register_tag).
pub struct Compiler {
    registry: registry::TagRegistry,
    resolver: Arc<dyn scope::PropertyResolver>,
}

impl Compiler {
    /// A compiler with the built-in tags and the map-backed property
    /// resolver.
    pub fn new() -> Self {
        Self {
            registry: registry::TagRegistry::with_builtins(),
            resolver: Arc::new(MapResolver),
        }
    }

    /// A compiler whose generators look up named properties through a
    /// custom resolver.
    pub fn with_resolver(resolver: Arc<dyn scope::PropertyResolver>) -> Self {
        Self {
            registry: registry::TagRegistry::with_builtins(),
            resolver,
        }
    }

    /// Install a tag definition, replacing any prior definition with the
    /// same name. Non-top-level tags are valid only inside parents that
    /// list them among their child tags.
    pub fn register_tag(&mut self, def: Arc<dyn registry::TagDefinition>, top_level: bool) {
        self.registry.register(def, top_level);
    }

    /// Compile a template into a reusable [`Generator`].
    pub fn compile(&self, template: &str) -> Result<Generator, error::CompileError> {
        let tree = parser::parse(&self.registry, template)?;
        Ok(Generator {
            tree,
            resolver: Arc::clone(&self.resolver),
        })
    }

    /// Compile a template that may be absent; absence is a
    /// [`CompileError::MissingTemplate`](error::CompileError::MissingTemplate).
    pub fn compile_opt(&self, template: Option<&str>) -> Result<Generator, error::CompileError> {
        match template {
            Some(template) => self.compile(template),
            None => Err(error::CompileError::MissingTemplate),
        }
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}

/// A compiled template. Immutable after compilation; concurrent renders
/// with independent data are safe.
pub struct Generator {
    tree: Tree,
    resolver: Arc<dyn scope::PropertyResolver>,
}

impl Generator {
    /// Render against data with the default format provider.
    pub fn render(&self, data: impl Into<value::Value>) -> Result<String, error::RenderError> {
        self.render_with(data, &render::DefaultFormatProvider)
    }

    /// Render against data, delegating format specifiers to `provider`.
    pub fn render_with(
        &self,
        data: impl Into<value::Value>,
        provider: &dyn render::FormatProvider,
    ) -> Result<String, error::RenderError> {
        render::render_tree(&self.tree, data.into(), self.resolver.as_ref(), provider)
    }
}

// Re-export commonly used types
pub use error::{CompileError, ErrorKind, ParseError, RenderError};
pub use registry::{BoundArgs, TagDefinition, TagParameter, TagRegistry};
pub use render::{Body, DefaultFormatProvider, FormatProvider, RenderContext};
pub use scope::{MapResolver, PropertyResolver, ScopeStack};
pub use value::Value;
