/// End-to-end rendering tests: parse a script, execute it against a context
/// and check the produced output and side effects.
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use smscr::context::{BufferContext, Context, RequestContext, SharedParams};
use smscr::script::{parse, reconstruct, Engine, LexError, RuntimeError, ScriptError, SyntaxError};

// ── Helpers ───────────────────────────────────────────────────────────────────

fn render(src: &str) -> Result<String, ScriptError> {
    let mut ctx = BufferContext::new();
    smscr::render(src, &mut ctx)?;
    Ok(ctx.output)
}

fn scripts_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("lib/scripts")
}

fn load_script(name: &str) -> String {
    let path = scripts_dir().join(name);
    std::fs::read_to_string(&path).unwrap_or_else(|e| panic!("cannot read {}: {e}", path.display()))
}

// ── Language behaviour ────────────────────────────────────────────────────────

#[test]
fn for_loop_output() {
    assert_eq!(render("{$FOR i 1 5 1$}{$= i $}{$END$}").unwrap(), "12345");
}

#[test]
fn integer_addition() {
    assert_eq!(render("{$= 2 3 + $}").unwrap(), "5");
}

#[test]
fn string_operands_are_coerced() {
    assert_eq!(render(r#"{$= "1" "2" + $}"#).unwrap(), "3");
}

#[test]
fn mixed_operands_promote_to_double() {
    assert_eq!(render("{$= 1 2.0 + $}").unwrap(), "3.0");
}

#[test]
fn loop_variable_unbound_after_loop() {
    let err = render("{$FOR i 0 2 1$}{$END$}{$= i $}").unwrap_err();
    assert!(
        matches!(err, ScriptError::Runtime(RuntimeError::UndefinedVariable(ref n)) if n == "i"),
        "{err}"
    );
}

#[test]
fn extra_end_is_a_syntax_error() {
    let err = render("{$FOR i 1 5$}{$END$}{$END$}").unwrap_err();
    assert!(matches!(err, ScriptError::Syntax(SyntaxError::UnbalancedEnd)), "{err}");
}

#[test]
fn swap_reverses_operands() {
    assert_eq!(render("{$= 1 2 @swap - $}").unwrap(), "1");
}

#[test]
fn at_sign_must_start_a_function_name() {
    // `@-` is not a function reference.
    let err = render("{$= 1 2 swap @- $}").unwrap_err();
    assert!(matches!(err, ScriptError::Lex(LexError::UnexpectedChar { found: '@', .. })), "{err}");
}

#[test]
fn unclosed_for_is_a_syntax_error() {
    let err = render("{$FOR i 1 2 $}body").unwrap_err();
    assert!(matches!(err, ScriptError::Syntax(SyntaxError::UnclosedFor { open: 1 })), "{err}");
}

#[test]
fn unknown_tag_is_a_syntax_error() {
    let err = render("{$IF x $}").unwrap_err();
    assert!(matches!(err, ScriptError::Syntax(SyntaxError::UnknownTag(ref t)) if t == "IF"));
}

#[test]
fn escaped_text_is_written_literally() {
    assert_eq!(render(r"a \{$ b \\ c").unwrap(), r"a {$ b \ c");
}

#[test]
fn string_escapes_in_echo() {
    assert_eq!(render(r#"{$= "a\"b\nc" $}"#).unwrap(), "a\"b\nc");
}

#[test]
fn tag_names_are_case_insensitive() {
    assert_eq!(render("{$for i 1 2 $}{$= i $}{$end$}").unwrap(), "12");
}

#[test]
fn sin_and_decfmt() {
    assert_eq!(render(r#"{$= 30 @sin "0.000" @decfmt $}"#).unwrap(), "0.500");
}

#[test]
fn unknown_function_is_a_runtime_error() {
    let err = render("{$= 1 @cos $}").unwrap_err();
    assert!(matches!(err, ScriptError::Runtime(RuntimeError::UnknownFunction(ref f)) if f == "cos"));
}

#[test]
fn reconstruction_renders_identically() {
    let src = r#"A\\B {$FOR i 1 3 $}[{$= i "x\"y" i 2 * @dup $}]{$END$} \{$ tail"#;
    let doc = parse(src).unwrap();
    let rebuilt = reconstruct(&doc);
    assert_eq!(parse(&rebuilt).unwrap(), doc);
    let expected = r#"A\B [1x"y22][2x"y44][3x"y66] {$ tail"#;
    assert_eq!(render(src).unwrap(), expected);
    assert_eq!(render(&rebuilt).unwrap(), expected);
}

#[test]
fn shared_document_renders_on_many_threads() {
    let doc = Arc::new(parse("{$FOR i 1 100 $}{$= i $},{$END$}").unwrap());
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let doc = Arc::clone(&doc);
            std::thread::spawn(move || {
                let mut ctx = BufferContext::new();
                Engine::new(&doc, &mut ctx).execute().unwrap();
                ctx.output
            })
        })
        .collect();
    let outputs: Vec<String> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert!(outputs.windows(2).all(|w| w[0] == w[1]));
    assert!(outputs[0].starts_with("1,2,3,"));
    assert!(outputs[0].ends_with("99,100,"));
}

// ── Bundled scripts ───────────────────────────────────────────────────────────

#[test]
fn all_bundled_scripts_parse_and_run() {
    let mut entries: Vec<_> = std::fs::read_dir(scripts_dir())
        .unwrap_or_else(|e| panic!("cannot open {}: {e}", scripts_dir().display()))
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().map(|x| x == "smscr").unwrap_or(false))
        .collect();
    entries.sort();
    assert!(!entries.is_empty(), "no .smscr files found");

    let mut failures = Vec::new();
    for path in &entries {
        let src = std::fs::read_to_string(path).unwrap();
        let mut ctx = BufferContext::new();
        if let Err(e) = smscr::render(&src, &mut ctx) {
            failures.push(format!("{}: {e}", path.display()));
        }
    }
    assert!(failures.is_empty(), "failures:\n  {}", failures.join("\n  "));
}

#[test]
fn fibonacci_script() {
    let mut ctx = BufferContext::new();
    smscr::render(&load_script("fibonacci.smscr"), &mut ctx).unwrap();
    assert_eq!(
        ctx.output,
        "First 10 Fibonacci numbers:\n0\n1\n1\n2\n3\n5\n8\n13\n21\n34\n\n"
    );
    assert_eq!(ctx.mime_type.as_deref(), Some("text/plain"));
    assert_eq!(ctx.temporary.get("b").map(String::as_str), Some("34"));
}

#[test]
fn zbrajanje_script() {
    let src = load_script("zbrajanje.smscr");
    let mut ctx = BufferContext::new();
    smscr::render(&src, &mut ctx).unwrap();
    assert_eq!(ctx.output, "a=1, b=2, a+b=3\n");

    let mut ctx = BufferContext::new().with_parameter("a", "4").with_parameter("b", "5");
    smscr::render(&src, &mut ctx).unwrap();
    assert_eq!(ctx.output, "a=4, b=5, a+b=9\n");
}

#[test]
fn visit_counter_persists_across_requests() {
    let src = load_script("brojPoziva.smscr");
    let doc = parse(&src).unwrap();
    let session = SharedParams::default();

    for expected in 1..=3 {
        let mut ctx = RequestContext::new(Vec::new()).with_persistent(session.clone());
        Engine::new(&doc, &mut ctx).execute().unwrap();
        let out = String::from_utf8(ctx.into_inner()).unwrap();
        assert!(out.starts_with("HTTP/1.1 200 OK\r\nContent-Type: text/plain; charset=UTF-8\r\n\r\n"));
        assert!(out.ends_with(&format!("visited {expected} time(s).\n")), "{out}");
    }
    let stored = session.lock().unwrap().get("brojPoziva").cloned();
    assert_eq!(stored.as_deref(), Some("4"));
}

#[test]
fn mime_type_after_output_is_refused() {
    let mut ctx = RequestContext::new(Vec::new());
    let err = smscr::render(r#"body{$= "text/plain" @setMimeType $}"#, &mut ctx).unwrap_err();
    assert!(err.to_string().contains("header already generated"), "{err}");
}

#[test]
fn dispatch_reaches_host() {
    let seen = Arc::new(Mutex::new(Vec::<String>::new()));
    let sink = seen.clone();
    let mut ctx = RequestContext::new(Vec::new()).with_dispatcher(Arc::new(move |p: &str| {
        sink.lock().unwrap().push(p.to_owned());
        Ok(())
    }));
    smscr::render(r#"{$= "/index2.html" @dispatch $}"#, &mut ctx).unwrap();
    assert_eq!(*seen.lock().unwrap(), vec!["/index2.html"]);
    // Nothing was written, so no header either.
    assert!(!ctx.header_generated());
    ctx.write_str("").unwrap();
    assert!(ctx.header_generated());
}
