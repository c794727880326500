//! Parameter file parser.
//!
//! Supplies the parameter stores for a command-line run.  The format is
//! line oriented:
//!
//! | Line | Action |
//! |------|--------|
//! | `name=value` | set a parameter in the current section |
//! | `name="value"` | same; the quotes are stripped |
//! | `[request]` / `[persistent]` / `[temporary]` | switch section |
//! | Lines starting with `#` or `;` | comment, ignored |
//!
//! Lines before any section header go to `[request]`.

use std::collections::HashMap;
use std::path::Path;

use thiserror::Error;

// ── Public API ────────────────────────────────────────────────────────────────

/// A non-fatal error encountered while loading a parameter file.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}: {message}")]
pub struct ConfigError {
    pub line: usize,
    pub message: String,
}

/// Which store a parameter belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Request,
    Persistent,
    Temporary,
}

impl Section {
    fn from_header(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "request" => Some(Section::Request),
            "persistent" => Some(Section::Persistent),
            "temporary" => Some(Section::Temporary),
            _ => None,
        }
    }
}

/// Parameters for one script run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ParamConfig {
    pub request: HashMap<String, String>,
    pub persistent: HashMap<String, String>,
    pub temporary: HashMap<String, String>,
}

impl ParamConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `name` in `section`, replacing any earlier value.
    pub fn set(&mut self, section: Section, name: impl Into<String>, value: impl Into<String>) {
        let store = match section {
            Section::Request => &mut self.request,
            Section::Persistent => &mut self.persistent,
            Section::Temporary => &mut self.temporary,
        };
        store.insert(name.into(), value.into());
    }

    /// Overlay `other` on top of `self`.
    pub fn merge(&mut self, other: ParamConfig) {
        self.request.extend(other.request);
        self.persistent.extend(other.persistent);
        self.temporary.extend(other.temporary);
    }

    /// Parse a parameter file.
    ///
    /// Bad lines are skipped and reported; lines under an unknown section
    /// header are skipped until the next valid header.
    pub fn load_str(s: &str) -> (Self, Vec<ConfigError>) {
        let mut config = ParamConfig::new();
        let mut errors = Vec::new();
        let mut section = Some(Section::Request);

        for (i, raw) in s.lines().enumerate() {
            let lineno = i + 1;
            let line = raw.trim();

            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }

            if let Some(header) = line.strip_prefix('[') {
                let Some(name) = header.strip_suffix(']') else {
                    errors.push(ConfigError {
                        line: lineno,
                        message: format!("unterminated section header: {line}"),
                    });
                    continue;
                };
                section = Section::from_header(name);
                if section.is_none() {
                    errors.push(ConfigError {
                        line: lineno,
                        message: format!("unknown section [{}]", name.trim()),
                    });
                }
                continue;
            }

            let Some(section) = section else { continue };
            match parse_assignment(line) {
                Ok((name, value)) => config.set(section, name, value),
                Err(message) => errors.push(ConfigError { line: lineno, message }),
            }
        }

        (config, errors)
    }

    /// Read and parse a parameter file from disk.
    pub fn load_file(path: &Path) -> std::io::Result<(Self, Vec<ConfigError>)> {
        let s = std::fs::read_to_string(path)?;
        Ok(Self::load_str(&s))
    }
}

// ── Assignment ────────────────────────────────────────────────────────────────

/// Split `name=value`.  The value may be wrapped in double quotes.
pub fn parse_assignment(s: &str) -> Result<(String, String), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got '{s}'"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing parameter name in '{s}'"));
    }
    if name.contains(char::is_whitespace) {
        return Err(format!("parameter name '{name}' contains whitespace"));
    }
    let value = value.trim();
    let value = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value);
    Ok((name.to_owned(), value.to_owned()))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
