//! One test per error kind in the compile and render taxonomies.

use curly::{Compiler, CompileError, ErrorKind, RenderError, Value};

fn compile_err(template: &str) -> ErrorKind {
    let compiler = Compiler::new();
    match compiler.compile(template) {
        Err(CompileError::Parse(err)) => err.kind,
        Err(other) => panic!("expected a parse error, got {:?}", other),
        Ok(_) => panic!("expected `{}` to fail to compile", template),
    }
}

fn render_err(template: &str, data: impl Into<Value>) -> RenderError {
    let compiler = Compiler::new();
    let generator = compiler.compile(template).unwrap();
    generator.render(data).unwrap_err()
}

#[test]
fn test_missing_template() {
    let compiler = Compiler::new();
    assert!(matches!(
        compiler.compile_opt(None),
        Err(CompileError::MissingTemplate)
    ));
    assert!(compiler.compile_opt(Some("ok")).is_ok());
}

#[test]
fn test_unknown_tag() {
    assert_eq!(compile_err("{{#bogus}}{{/bogus}}"), ErrorKind::UnknownTag);
}

#[test]
fn test_unexpected_subsection_at_top_level() {
    assert_eq!(compile_err("{{#else}}"), ErrorKind::UnexpectedTag);
    assert_eq!(compile_err("{{#elif x}}"), ErrorKind::UnexpectedTag);
}

#[test]
fn test_unexpected_subsection_in_wrong_parent() {
    assert_eq!(
        compile_err("{{#each Items}}{{#else}}{{/each}}"),
        ErrorKind::UnexpectedTag
    );
}

#[test]
fn test_elif_after_else() {
    assert_eq!(
        compile_err("{{#if A}}a{{#else}}b{{#elif C}}c{{/if}}"),
        ErrorKind::UnexpectedTag
    );
}

#[test]
fn test_unmatched_close() {
    assert_eq!(compile_err("{{/if}}"), ErrorKind::UnmatchedClose);
    assert_eq!(compile_err("{{#if A}}x{{/each}}"), ErrorKind::UnmatchedClose);
}

#[test]
fn test_unterminated_tag() {
    assert_eq!(compile_err("{{#if A}}never closed"), ErrorKind::UnterminatedTag);
    assert_eq!(compile_err("text {{Name"), ErrorKind::UnterminatedTag);
}

#[test]
fn test_duplicate_else() {
    assert_eq!(
        compile_err("{{#if A}}a{{#else}}b{{#else}}c{{/if}}"),
        ErrorKind::DuplicateElse
    );
}

#[test]
fn test_bad_arguments() {
    // Missing required argument
    assert_eq!(compile_err("{{#if}}x{{/if}}"), ErrorKind::BadArguments);
    // Excess positional arguments
    assert_eq!(
        compile_err("{{#each Items Extra}}x{{/each}}"),
        ErrorKind::BadArguments
    );
    // else takes no arguments
    assert_eq!(
        compile_err("{{#if A}}a{{#else B}}b{{/if}}"),
        ErrorKind::BadArguments
    );
    // Malformed alignment
    assert_eq!(compile_err("{{Name,ten}}"), ErrorKind::BadArguments);
    // Malformed key
    assert_eq!(compile_err("{{9lives}}"), ErrorKind::BadArguments);
}

#[test]
fn test_malformed_tag() {
    assert_eq!(compile_err("{{#}}"), ErrorKind::MalformedTag);
    assert_eq!(compile_err("{{/}}"), ErrorKind::MalformedTag);
}

#[test]
fn test_key_not_found() {
    let err = render_err(
        "{{Missing}}",
        Value::from(serde_json::from_str::<serde_json::Value>(r#"{"Present": 1}"#).unwrap()),
    );
    assert!(matches!(err, RenderError::KeyNotFound { path } if path == "Missing"));
}

#[test]
fn test_key_not_found_in_drill() {
    let err = render_err(
        "{{A.B}}",
        Value::from(serde_json::from_str::<serde_json::Value>(r#"{"A": {"C": 1}}"#).unwrap()),
    );
    assert!(matches!(err, RenderError::KeyNotFound { path } if path == "A.B"));
}

#[test]
fn test_each_over_non_collection() {
    let err = render_err(
        "{{#each N}}x{{/each}}",
        Value::from(serde_json::from_str::<serde_json::Value>(r#"{"N": 42}"#).unwrap()),
    );
    assert!(matches!(err, RenderError::NotIterable { path } if path == "N"));
}

#[test]
fn test_parse_error_renders_source_context() {
    let compiler = Compiler::new();
    let source = "line one\n{{#if A}}\nnever closed";
    let Err(CompileError::Parse(err)) = compiler.compile(source) else {
        panic!("expected a parse error");
    };

    let rendered = err.render(source, "sample.tpl");
    assert!(rendered.contains("sample.tpl"));
    assert!(rendered.contains("never closed") || rendered.contains("{{#if A}}"));
    assert!(rendered.contains('^'));
}

#[test]
fn test_unterminated_points_at_opener() {
    let compiler = Compiler::new();
    let Err(CompileError::Parse(err)) = compiler.compile("{{#each Items}}body") else {
        panic!("expected a parse error");
    };
    // The related span leads back to the opener
    assert!(err.related_span.is_some());
    assert_eq!(err.related_span.unwrap().start.col, 0);
}
