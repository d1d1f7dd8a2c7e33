use crate::ast::Path;
use crate::error::RenderError;
use crate::value::Value;

/// The injected reflective-lookup capability: given a scope value and a
/// name, produce the child value or report a miss. Hosts plug this to
/// bridge structs, maps or dynamic objects.
pub trait PropertyResolver: Send + Sync {
    fn property(&self, scope: &Value, name: &str) -> Option<Value>;
}

/// Default resolver: named properties are entries of a [`Value::Map`].
pub struct MapResolver;

impl PropertyResolver for MapResolver {
    fn property(&self, scope: &Value, name: &str) -> Option<Value> {
        match scope {
            Value::Map(map) => map.get(name).cloned(),
            _ => None,
        }
    }
}

/// Stack of lookup scopes, outermost first. `each` and `with` push around
/// their bodies; a render call seeds the stack with the caller's data.
#[derive(Debug, Default)]
pub struct ScopeStack {
    frames: Vec<Value>,
}

impl ScopeStack {
    pub fn new(root: Value) -> Self {
        Self { frames: vec![root] }
    }

    pub fn push(&mut self, value: Value) {
        self.frames.push(value);
    }

    pub fn pop(&mut self) -> Option<Value> {
        self.frames.pop()
    }

    /// The innermost scope, what `this` resolves to.
    pub fn current(&self) -> Option<&Value> {
        self.frames.last()
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Drop scopes pushed past `depth`. The renderer uses this to restore
    /// balance when a context-sensitive tag errors between push and pop.
    pub(crate) fn unwind_to(&mut self, depth: usize) {
        self.frames.truncate(depth);
    }

    /// Resolve a dotted path against the stack.
    ///
    /// `this` anchors at the innermost scope; a bare leading name probes
    /// the resolver from innermost outward for its anchor. Remaining
    /// segments drill strictly downward; any miss is `KeyNotFound`.
    pub fn resolve(
        &self,
        path: &Path,
        resolver: &dyn PropertyResolver,
    ) -> Result<Value, RenderError> {
        let segments = path.segments();

        let (anchor, rest) = if path.is_this_anchored() {
            let current = self.current().cloned().unwrap_or(Value::Null);
            (current, &segments[1..])
        } else {
            let first = segments[0].as_str();
            let anchor = self
                .frames
                .iter()
                .rev()
                .find_map(|frame| resolver.property(frame, first))
                .ok_or_else(|| RenderError::KeyNotFound {
                    path: path.to_string(),
                })?;
            (anchor, &segments[1..])
        };

        let mut value = anchor;
        for segment in rest {
            if value.is_null() {
                return Err(RenderError::KeyNotFound {
                    path: path.to_string(),
                });
            }
            value = resolver
                .property(&value, segment)
                .ok_or_else(|| RenderError::KeyNotFound {
                    path: path.to_string(),
                })?;
        }

        Ok(value)
    }
}
