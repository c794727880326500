//! Execution contexts.
//!
//! The engine never touches I/O or parameter storage directly; everything
//! goes through the [`Context`] trait.  Two implementations are provided:
//!
//! - [`BufferContext`] collects output in memory (tests, `-b` CLI mode).
//! - [`RequestContext`] writes an HTTP-style response, emitting the status
//!   line, content type and cookies once before the first body byte.
//!
//! Persistent parameters model a session store shared by every request of
//! one client; the host owns the map and hands each context a
//! [`SharedParams`] handle.

use std::collections::HashMap;
use std::io::{self, Write};
use std::sync::{Arc, Mutex, MutexGuard};

use thiserror::Error;

/// Session-wide parameter map shared between concurrent requests.
pub type SharedParams = Arc<Mutex<HashMap<String, String>>>;

/// Callback that hands the current request off to another path.
pub type Dispatcher = Arc<dyn Fn(&str) -> Result<(), String> + Send + Sync>;

/// A request the context refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContextError {
    #[error("header already generated")]
    HeaderCommitted,

    #[error("unsupported encoding '{0}'")]
    UnsupportedEncoding(String),

    #[error("no dispatcher available for '{0}'")]
    NoDispatcher(String),

    #[error("dispatch to '{path}' failed: {message}")]
    Dispatch { path: String, message: String },
}

// ── Context ───────────────────────────────────────────────────────────────────

/// Everything a running script may observe or change.
pub trait Context {
    /// Append raw bytes to the response body.
    fn write(&mut self, data: &[u8]) -> io::Result<()>;

    /// Append text to the response body.
    fn write_str(&mut self, text: &str) -> io::Result<()> {
        self.write(text.as_bytes())
    }

    /// A read-only request parameter.
    fn parameter(&self, name: &str) -> Option<String>;

    fn persistent_parameter(&self, name: &str) -> Option<String>;
    fn set_persistent_parameter(&mut self, name: &str, value: String);
    fn remove_persistent_parameter(&mut self, name: &str);

    fn temporary_parameter(&self, name: &str) -> Option<String>;
    fn set_temporary_parameter(&mut self, name: &str, value: String);
    fn remove_temporary_parameter(&mut self, name: &str);

    fn set_mime_type(&mut self, mime: &str) -> Result<(), ContextError>;

    /// Hand the request off to the handler for `path`.
    fn dispatch(&mut self, path: &str) -> Result<(), ContextError> {
        Err(ContextError::NoDispatcher(path.to_owned()))
    }
}

// ── BufferContext ─────────────────────────────────────────────────────────────

/// In-memory context: output is collected into [`BufferContext::output`].
#[derive(Debug, Default)]
pub struct BufferContext {
    pub output: String,
    pub parameters: HashMap<String, String>,
    pub persistent: HashMap<String, String>,
    pub temporary: HashMap<String, String>,
    pub mime_type: Option<String>,
    /// Paths passed to [`Context::dispatch`], in call order.
    pub dispatched: Vec<String>,
}

impl BufferContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(name.into(), value.into());
        self
    }

    pub fn with_persistent(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.persistent.insert(name.into(), value.into());
        self
    }

    pub fn with_temporary(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.temporary.insert(name.into(), value.into());
        self
    }
}

impl Context for BufferContext {
    fn write(&mut self, data: &[u8]) -> io::Result<()> {
        self.output.push_str(&String::from_utf8_lossy(data));
        Ok(())
    }

    fn parameter(&self, name: &str) -> Option<String> {
        self.parameters.get(name).cloned()
    }

    fn persistent_parameter(&self, name: &str) -> Option<String> {
        self.persistent.get(name).cloned()
    }

    fn set_persistent_parameter(&mut self, name: &str, value: String) {
        self.persistent.insert(name.to_owned(), value);
    }

    fn remove_persistent_parameter(&mut self, name: &str) {
        self.persistent.remove(name);
    }

    fn temporary_parameter(&self, name: &str) -> Option<String> {
        self.temporary.get(name).cloned()
    }

    fn set_temporary_parameter(&mut self, name: &str, value: String) {
        self.temporary.insert(name.to_owned(), value);
    }

    fn remove_temporary_parameter(&mut self, name: &str) {
        self.temporary.remove(name);
    }

    fn set_mime_type(&mut self, mime: &str) -> Result<(), ContextError> {
        self.mime_type = Some(mime.to_owned());
        Ok(())
    }

    fn dispatch(&mut self, path: &str) -> Result<(), ContextError> {
        self.dispatched.push(path.to_owned());
        Ok(())
    }
}

// ── Cookie ────────────────────────────────────────────────────────────────────

/// An outgoing `Set-Cookie` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub domain: Option<String>,
    pub path: Option<String>,
    pub max_age: Option<u32>,
    pub http_only: bool,
}

impl Cookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Cookie {
            name: name.into(),
            value: value.into(),
            domain: None,
            path: None,
            max_age: None,
            http_only: false,
        }
    }

    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn max_age(mut self, seconds: u32) -> Self {
        self.max_age = Some(seconds);
        self
    }

    pub fn http_only(mut self) -> Self {
        self.http_only = true;
        self
    }

    fn header_line(&self) -> String {
        let mut line = format!("Set-Cookie: {}=\"{}\"", self.name, self.value);
        if let Some(d) = &self.domain {
            line.push_str(&format!("; Domain={d}"));
        }
        if let Some(p) = &self.path {
            line.push_str(&format!("; Path={p}"));
        }
        if let Some(age) = self.max_age {
            line.push_str(&format!("; Max-Age={age}"));
        }
        if self.http_only {
            line.push_str("; HttpOnly");
        }
        line
    }
}

// ── RequestContext ────────────────────────────────────────────────────────────

const DEFAULT_ENCODING: &str = "UTF-8";

/// HTTP-style response context writing to `W`.
///
/// The header is generated on the first [`Context::write`]; afterwards the
/// header setters fail with [`ContextError::HeaderCommitted`].
pub struct RequestContext<W: Write> {
    out: W,
    encoding: String,
    status_code: u16,
    status_text: String,
    mime_type: String,
    content_length: Option<u64>,
    parameters: HashMap<String, String>,
    temporary: HashMap<String, String>,
    persistent: SharedParams,
    cookies: Vec<Cookie>,
    header_generated: bool,
    dispatcher: Option<Dispatcher>,
    session_id: Option<String>,
}

impl<W: Write> RequestContext<W> {
    pub fn new(out: W) -> Self {
        RequestContext {
            out,
            encoding: DEFAULT_ENCODING.to_owned(),
            status_code: 200,
            status_text: "OK".to_owned(),
            mime_type: "text/html".to_owned(),
            content_length: None,
            parameters: HashMap::new(),
            temporary: HashMap::new(),
            persistent: SharedParams::default(),
            cookies: Vec::new(),
            header_generated: false,
            dispatcher: None,
            session_id: None,
        }
    }

    pub fn with_parameters(mut self, parameters: HashMap<String, String>) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn with_temporary(mut self, temporary: HashMap<String, String>) -> Self {
        self.temporary = temporary;
        self
    }

    /// Use the host's session store for persistent parameters.
    pub fn with_persistent(mut self, persistent: SharedParams) -> Self {
        self.persistent = persistent;
        self
    }

    pub fn with_dispatcher(mut self, dispatcher: Dispatcher) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    pub fn with_session_id(mut self, sid: impl Into<String>) -> Self {
        self.session_id = Some(sid.into());
        self
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn parameter_names(&self) -> Vec<&str> {
        self.parameters.keys().map(String::as_str).collect()
    }

    pub fn temporary_parameter_names(&self) -> Vec<&str> {
        self.temporary.keys().map(String::as_str).collect()
    }

    pub fn persistent_parameter_names(&self) -> Vec<String> {
        self.session().keys().cloned().collect()
    }

    pub fn add_cookie(&mut self, cookie: Cookie) {
        self.cookies.push(cookie);
    }

    pub fn header_generated(&self) -> bool {
        self.header_generated
    }

    /// Only UTF-8 bodies are produced.
    pub fn set_encoding(&mut self, encoding: &str) -> Result<(), ContextError> {
        self.check_header()?;
        let normalized = encoding.replace('-', "").to_ascii_lowercase();
        if normalized != "utf8" {
            return Err(ContextError::UnsupportedEncoding(encoding.to_owned()));
        }
        self.encoding = encoding.to_owned();
        Ok(())
    }

    pub fn set_status_code(&mut self, code: u16) -> Result<(), ContextError> {
        self.check_header()?;
        self.status_code = code;
        Ok(())
    }

    pub fn set_status_text(&mut self, text: impl Into<String>) -> Result<(), ContextError> {
        self.check_header()?;
        self.status_text = text.into();
        Ok(())
    }

    pub fn set_content_length(&mut self, length: Option<u64>) -> Result<(), ContextError> {
        self.check_header()?;
        self.content_length = length;
        Ok(())
    }

    /// Give back the underlying writer.
    pub fn into_inner(self) -> W {
        self.out
    }

    fn check_header(&self) -> Result<(), ContextError> {
        if self.header_generated {
            Err(ContextError::HeaderCommitted)
        } else {
            Ok(())
        }
    }

    fn session(&self) -> MutexGuard<'_, HashMap<String, String>> {
        // The map only holds strings, so a poisoned lock is still consistent.
        self.persistent.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn generate_header(&self) -> Vec<u8> {
        let mut header = format!("HTTP/1.1 {} {}\r\n", self.status_code, self.status_text);
        header.push_str("Content-Type: ");
        header.push_str(&self.mime_type);
        if self.mime_type.starts_with("text/") {
            header.push_str("; charset=");
            header.push_str(&self.encoding);
        }
        header.push_str("\r\n");
        if let Some(len) = self.content_length {
            header.push_str(&format!("Content-Length: {len}\r\n"));
        }
        for cookie in &self.cookies {
            header.push_str(&cookie.header_line());
            header.push_str("\r\n");
        }
        header.push_str("\r\n");
        latin1(&header)
    }
}

/// Encode as ISO-8859-1, replacing anything outside it with `?`.
fn latin1(s: &str) -> Vec<u8> {
    s.chars()
        .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
        .collect()
}

impl<W: Write> Context for RequestContext<W> {
    fn write(&mut self, data: &[u8]) -> io::Result<()> {
        if !self.header_generated {
            let header = self.generate_header();
            self.out.write_all(&header)?;
            self.header_generated = true;
        }
        self.out.write_all(data)?;
        self.out.flush()
    }

    fn parameter(&self, name: &str) -> Option<String> {
        self.parameters.get(name).cloned()
    }

    fn persistent_parameter(&self, name: &str) -> Option<String> {
        self.session().get(name).cloned()
    }

    fn set_persistent_parameter(&mut self, name: &str, value: String) {
        self.session().insert(name.to_owned(), value);
    }

    fn remove_persistent_parameter(&mut self, name: &str) {
        self.session().remove(name);
    }

    fn temporary_parameter(&self, name: &str) -> Option<String> {
        self.temporary.get(name).cloned()
    }

    fn set_temporary_parameter(&mut self, name: &str, value: String) {
        self.temporary.insert(name.to_owned(), value);
    }

    fn remove_temporary_parameter(&mut self, name: &str) {
        self.temporary.remove(name);
    }

    fn set_mime_type(&mut self, mime: &str) -> Result<(), ContextError> {
        self.check_header()?;
        self.mime_type = mime.to_owned();
        Ok(())
    }

    fn dispatch(&mut self, path: &str) -> Result<(), ContextError> {
        let dispatcher = self
            .dispatcher
            .clone()
            .ok_or_else(|| ContextError::NoDispatcher(path.to_owned()))?;
        dispatcher(path).map_err(|message| ContextError::Dispatch {
            path: path.to_owned(),
            message,
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
