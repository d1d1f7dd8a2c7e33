//! Built-in tag definitions: `if`/`elif`/`else`, `each`, `with` and the
//! `#!` comment. All of them go through the same [`TagDefinition`]
//! capability user tags use; nothing here is special-cased in the
//! renderer.

use std::sync::Arc;

use crate::error::RenderError;
use crate::registry::{BoundArgs, TagDefinition, TagParameter, TagRegistry};
use crate::render::format::FormatProvider;
use crate::render::{Body, RenderContext};
use crate::value::Value;

pub(crate) fn register_builtins(registry: &mut TagRegistry) {
    registry.register(Arc::new(IfTag), true);
    registry.register(Arc::new(ElifTag), false);
    registry.register(Arc::new(ElseTag), false);
    registry.register(Arc::new(EachTag), true);
    registry.register(Arc::new(WithTag), true);
    registry.register(Arc::new(CommentTag), true);
}

/// `{{#if cond}} ... {{#elif cond}} ... {{#else}} ... {{/if}}`
///
/// Branches are evaluated in order; the first truthy condition wins.
struct IfTag;

impl TagDefinition for IfTag {
    fn name(&self) -> &str {
        "if"
    }

    fn parameters(&self) -> Vec<TagParameter> {
        vec![TagParameter::required("condition")]
    }

    fn child_tags(&self) -> &[&'static str] {
        &["elif", "else"]
    }

    fn render(
        &self,
        ctx: &mut RenderContext<'_>,
        args: &BoundArgs,
        body: &Body<'_>,
    ) -> Result<(), RenderError> {
        if ctx.resolve(args.req("condition")?)?.is_truthy() {
            return body.render(ctx);
        }

        for section in body.sections() {
            match section.name() {
                "elif" => {
                    if ctx.resolve(section.args().req("condition")?)?.is_truthy() {
                        return section.render(ctx);
                    }
                }
                // else is unconditional and the parser keeps it last
                _ => return section.render(ctx),
            }
        }

        Ok(())
    }
}

/// `{{#elif cond}}`: a conditional branch on the enclosing `if`. Its
/// behavior lives in [`IfTag::render`]; the definition exists for the
/// registry and argument binding.
struct ElifTag;

impl TagDefinition for ElifTag {
    fn name(&self) -> &str {
        "elif"
    }

    fn has_closer(&self) -> bool {
        false
    }

    fn parameters(&self) -> Vec<TagParameter> {
        vec![TagParameter::required("condition")]
    }
}

/// `{{#else}}`: the unconditional final branch on the enclosing `if`.
struct ElseTag;

impl TagDefinition for ElseTag {
    fn name(&self) -> &str {
        "else"
    }

    fn has_closer(&self) -> bool {
        false
    }

    fn parameters(&self) -> Vec<TagParameter> {
        Vec::new()
    }
}

/// `{{#each collection}} ... {{/each}}`: renders the body once per
/// element with the element pushed as the current scope.
struct EachTag;

impl TagDefinition for EachTag {
    fn name(&self) -> &str {
        "each"
    }

    fn is_context_sensitive(&self) -> bool {
        true
    }

    fn parameters(&self) -> Vec<TagParameter> {
        vec![TagParameter::required("collection")]
    }

    fn render(
        &self,
        ctx: &mut RenderContext<'_>,
        args: &BoundArgs,
        body: &Body<'_>,
    ) -> Result<(), RenderError> {
        let path = args.req("collection")?;
        let items = match ctx.resolve(path)? {
            Value::List(items) => items,
            _ => {
                return Err(RenderError::NotIterable {
                    path: path.to_string(),
                })
            }
        };

        for item in items {
            ctx.push_scope(item);
            let result = body.render(ctx);
            ctx.pop_scope();
            result?;
        }

        Ok(())
    }
}

/// `{{#with expr}} ... {{/with}}`: renders the body once with the
/// resolved expression pushed as the current scope.
struct WithTag;

impl TagDefinition for WithTag {
    fn name(&self) -> &str {
        "with"
    }

    fn is_context_sensitive(&self) -> bool {
        true
    }

    fn parameters(&self) -> Vec<TagParameter> {
        vec![TagParameter::required("expression")]
    }

    fn render(
        &self,
        ctx: &mut RenderContext<'_>,
        args: &BoundArgs,
        body: &Body<'_>,
    ) -> Result<(), RenderError> {
        let value = ctx.resolve(args.req("expression")?)?;
        ctx.push_scope(value);
        let result = body.render(ctx);
        ctx.pop_scope();
        result
    }
}

/// `{{#! arbitrary text }}`: inline comment, produces no output.
struct CommentTag;

impl TagDefinition for CommentTag {
    fn name(&self) -> &str {
        "#!"
    }

    fn has_closer(&self) -> bool {
        false
    }

    fn parameters(&self) -> Vec<TagParameter> {
        vec![TagParameter::variadic("text")]
    }

    fn expand(
        &self,
        _provider: &dyn FormatProvider,
        _args: &BoundArgs,
    ) -> Result<String, RenderError> {
        Ok(String::new())
    }
}
