use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::error::{ErrorKind, ParseError, RenderError};
use crate::parser::tokenizer::Span;
use crate::render::format::FormatProvider;
use crate::render::{Body, RenderContext};
use crate::tags;

/// One parameter in a tag's grammar. Arguments bind positionally; a
/// variadic parameter absorbs the tail.
#[derive(Debug, Clone)]
pub struct TagParameter {
    pub name: String,
    pub required: bool,
    pub default: Option<String>,
    pub variadic: bool,
}

impl TagParameter {
    pub fn required(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            required: true,
            default: None,
            variadic: false,
        }
    }

    pub fn optional(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            required: false,
            default: None,
            variadic: false,
        }
    }

    pub fn with_default(name: impl Into<String>, default: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            required: false,
            default: Some(default.into()),
            variadic: false,
        }
    }

    pub fn variadic(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            required: false,
            default: None,
            variadic: true,
        }
    }
}

/// Argument values bound to a tag's parameters at parse time.
#[derive(Debug, Clone, Default)]
pub struct BoundArgs {
    named: Vec<(String, String)>,
    rest: Vec<String>,
}

impl BoundArgs {
    /// Bind raw positional arguments against a parameter list.
    pub(crate) fn bind(
        tag_name: &str,
        parameters: &[TagParameter],
        args: &[String],
        span: Span,
    ) -> Result<Self, ParseError> {
        let mut named = Vec::new();
        let mut rest = Vec::new();
        let mut cursor = 0;

        for param in parameters {
            if param.variadic {
                rest.extend(args[cursor..].iter().cloned());
                cursor = args.len();
                if param.required && rest.is_empty() {
                    return Err(missing_argument(tag_name, &param.name, span));
                }
                continue;
            }

            if cursor < args.len() {
                named.push((param.name.clone(), args[cursor].clone()));
                cursor += 1;
            } else if param.required {
                return Err(missing_argument(tag_name, &param.name, span));
            } else if let Some(default) = &param.default {
                named.push((param.name.clone(), default.clone()));
            }
        }

        if cursor < args.len() {
            return Err(ParseError::new(
                ErrorKind::BadArguments,
                format!(
                    "`{{{{#{}}}}}` takes {} argument{} but {} were given.",
                    tag_name,
                    parameters.len(),
                    if parameters.len() == 1 { "" } else { "s" },
                    args.len()
                ),
                span,
            ));
        }

        Ok(Self { named, rest })
    }

    /// Look up a bound argument by parameter name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.named
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Look up an argument a tag declared as required. Binding guarantees
    /// its presence, so a miss means the behavior and the parameter list
    /// disagree.
    pub fn req(&self, name: &str) -> Result<&str, RenderError> {
        self.get(name).ok_or_else(|| RenderError::Evaluation {
            message: format!("no bound argument `{}`", name),
        })
    }

    /// The tail absorbed by a variadic parameter.
    pub fn rest(&self) -> &[String] {
        &self.rest
    }
}

fn missing_argument(tag_name: &str, param: &str, span: Span) -> ParseError {
    ParseError::new(
        ErrorKind::BadArguments,
        format!("`{{{{#{}}}}}` is missing its `{}` argument.", tag_name, param),
        span,
    )
}

/// A tag's grammar and behavior: the extension point for user tags.
///
/// Paired tags (`has_closer` true) implement [`TagDefinition::render`] and
/// receive their body; inline tags implement [`TagDefinition::expand`] and
/// the default `render` appends the expansion. Context-sensitive tags push
/// a scope around their body.
pub trait TagDefinition: Send + Sync {
    /// Tag name as written after `{{#`
    fn name(&self) -> &str;

    /// Whether the tag pushes a new scope for its body
    fn is_context_sensitive(&self) -> bool {
        false
    }

    /// Whether the tag is paired with a `{{/NAME}}` closer
    fn has_closer(&self) -> bool {
        true
    }

    /// Ordered parameter grammar for positional binding
    fn parameters(&self) -> Vec<TagParameter>;

    /// Names of subsection tags accepted between opener and closer
    fn child_tags(&self) -> &[&'static str] {
        &[]
    }

    /// Inline behavior: produce text from bound arguments.
    fn expand(&self, provider: &dyn FormatProvider, args: &BoundArgs) -> Result<String, RenderError> {
        let _ = (provider, args);
        Err(RenderError::Evaluation {
            message: format!("tag `{}` has no inline behavior", self.name()),
        })
    }

    /// Compound behavior: orchestrate rendering of the body.
    fn render(
        &self,
        ctx: &mut RenderContext<'_>,
        args: &BoundArgs,
        body: &Body<'_>,
    ) -> Result<(), RenderError> {
        let _ = body;
        let text = self.expand(ctx.provider(), args)?;
        ctx.write(&text);
        Ok(())
    }
}

/// Case-sensitive catalog of tag definitions. Top-level tags are legal in
/// any body; non-top-level tags are legal only where a parent definition
/// lists them among its child tags.
pub struct TagRegistry {
    tags: HashMap<String, Arc<dyn TagDefinition>>,
    top_level: HashSet<String>,
}

impl TagRegistry {
    /// Registry pre-populated with the built-in tags.
    pub fn with_builtins() -> Self {
        let mut registry = Self {
            tags: HashMap::new(),
            top_level: HashSet::new(),
        };
        tags::register_builtins(&mut registry);
        registry
    }

    /// Install a definition, replacing any prior definition of the same name.
    pub fn register(&mut self, def: Arc<dyn TagDefinition>, top_level: bool) {
        let name = def.name().to_string();
        if top_level {
            self.top_level.insert(name.clone());
        } else {
            self.top_level.remove(&name);
        }
        self.tags.insert(name, def);
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn TagDefinition>> {
        self.tags.get(name)
    }

    pub fn is_top_level(&self, name: &str) -> bool {
        self.top_level.contains(name)
    }
}

impl Default for TagRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span() -> Span {
        use crate::parser::tokenizer::Position;
        Span { start: Position::new(), end: Position::new() }
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_bind_positional() {
        let params = vec![TagParameter::required("condition")];
        let args = BoundArgs::bind("if", &params, &strings(&["Ready"]), span()).unwrap();
        assert_eq!(args.get("condition"), Some("Ready"));
    }

    #[test]
    fn test_bind_missing_required() {
        let params = vec![TagParameter::required("condition")];
        let err = BoundArgs::bind("if", &params, &[], span()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::BadArguments);
    }

    #[test]
    fn test_bind_excess() {
        let params = vec![TagParameter::required("collection")];
        let err = BoundArgs::bind("each", &params, &strings(&["a", "b"]), span()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::BadArguments);
    }

    #[test]
    fn test_bind_default() {
        let params = vec![TagParameter::with_default("mode", "brief")];
        let args = BoundArgs::bind("x", &params, &[], span()).unwrap();
        assert_eq!(args.get("mode"), Some("brief"));
    }

    #[test]
    fn test_bind_variadic() {
        let params = vec![
            TagParameter::required("first"),
            TagParameter::variadic("rest"),
        ];
        let args = BoundArgs::bind("x", &params, &strings(&["a", "b", "c"]), span()).unwrap();
        assert_eq!(args.get("first"), Some("a"));
        assert_eq!(args.rest(), &["b".to_string(), "c".to_string()]);
    }

    #[test]
    fn test_registry_replaces() {
        let registry = TagRegistry::with_builtins();
        assert!(registry.get("if").is_some());
        assert!(registry.get("each").is_some());
        assert!(registry.is_top_level("if"));
        assert!(!registry.is_top_level("elif"));
        assert!(!registry.is_top_level("else"));
    }
}
