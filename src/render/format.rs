use crate::error::RenderError;
use crate::value::Value;

/// The injected format capability: interpret a format specifier against a
/// resolved value. The core never implements date or number formatting;
/// hosts supply a provider keyed by their own specifier grammar.
pub trait FormatProvider: Send + Sync {
    fn format(&self, value: &Value, spec: &str) -> Result<String, RenderError>;
}

/// Provider used when a render call supplies none. It interprets no
/// specifiers and falls back to the value's natural representation.
pub struct DefaultFormatProvider;

impl FormatProvider for DefaultFormatProvider {
    fn format(&self, value: &Value, _spec: &str) -> Result<String, RenderError> {
        Ok(value.to_string())
    }
}

/// Format a resolved value and apply alignment padding.
///
/// Positive alignment right-aligns (leading spaces), negative left-aligns
/// (trailing spaces); widths no larger than the text leave it unchanged.
pub fn apply(
    value: &Value,
    alignment: i32,
    format: Option<&str>,
    provider: &dyn FormatProvider,
) -> Result<String, RenderError> {
    let mut text = match format {
        Some(spec) => provider.format(value, spec)?,
        None => value.to_string(),
    };

    if alignment != 0 {
        let width = alignment.unsigned_abs() as usize;
        let len = text.chars().count();
        if width > len {
            let padding = " ".repeat(width - len);
            if alignment > 0 {
                text.insert_str(0, &padding);
            } else {
                text.push_str(&padding);
            }
        }
    }

    Ok(text)
}
