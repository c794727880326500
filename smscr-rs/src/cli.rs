//! Command-line argument parsing.
//!
//! Usage:
//!   smscr [-btd] [-p name=value]... [-P name=value]... [-f <file>]... <script>

use std::path::PathBuf;

use crate::config::parse_assignment;

pub const USAGE: &str =
    "Usage: smscr [-btd] [-p name=value]... [-P name=value]... [-f <file>]... <script|->";

// ── Public types ──────────────────────────────────────────────────────────────

/// Parsed command-line arguments.
#[derive(Debug, Default)]
pub struct CliArgs {
    /// Write only the body, without the HTTP header (`-b`).
    pub body_only: bool,
    /// Print the reconstructed source instead of executing (`-t`).
    pub tree: bool,
    /// Debug logging (`-d`).
    pub debug: bool,
    /// Request parameters (`-p name=value`).
    pub params: Vec<(String, String)>,
    /// Persistent parameters (`-P name=value`).
    pub persistent: Vec<(String, String)>,
    /// Parameter files (`-f <file>`), applied before `-p`/`-P`.
    pub param_files: Vec<PathBuf>,
    /// Where to read the script from.
    pub script: ScriptSource,
}

/// Where the script text comes from.
#[derive(Debug, Default, PartialEq, Eq)]
pub enum ScriptSource {
    /// `-`: standard input.
    #[default]
    Stdin,
    File(PathBuf),
}

// ── Parsing ───────────────────────────────────────────────────────────────────

/// Parse `std::env::args()` and return [`CliArgs`] or an error message.
pub fn parse_args() -> Result<CliArgs, String> {
    let raw: Vec<String> = std::env::args().collect();
    parse_argv(raw.get(1..).unwrap_or_default())
}

/// Parse a slice of argument strings (exposed for testing).
pub fn parse_argv(argv: &[String]) -> Result<CliArgs, String> {
    let mut args = CliArgs::default();
    let mut positional: Vec<String> = Vec::new();
    let mut i = 0;

    while i < argv.len() {
        let arg = argv[i].as_str();

        // `--` ends flag processing.
        if arg == "--" {
            i += 1;
            positional.extend(argv[i..].iter().cloned());
            break;
        }

        // Non-flag argument (a lone `-` names stdin).
        if !arg.starts_with('-') || arg == "-" {
            positional.push(arg.to_owned());
            i += 1;
            continue;
        }

        // Flag argument: iterate over characters after the leading `-`.
        let chars: Vec<char> = arg[1..].chars().collect();
        let mut j = 0;
        while j < chars.len() {
            match chars[j] {
                'b' => args.body_only = true,
                't' => args.tree = true,
                'd' => args.debug = true,

                // -p<name=value>, -P<name=value>, -f<file>
                flag @ ('p' | 'P' | 'f') => {
                    let operand = if j + 1 < chars.len() {
                        let s: String = chars[j + 1..].iter().collect();
                        j = chars.len();
                        s
                    } else if i + 1 < argv.len() {
                        i += 1;
                        argv[i].clone()
                    } else {
                        return Err(format!("-{flag} requires an argument"));
                    };
                    match flag {
                        'p' => args.params.push(parse_assignment(&operand)?),
                        'P' => args.persistent.push(parse_assignment(&operand)?),
                        _ => args.param_files.push(PathBuf::from(operand)),
                    }
                }

                c => return Err(format!("unknown option: -{c}")),
            }
            j += 1;
        }
        i += 1;
    }

    args.script = match positional.as_slice() {
        [] => return Err("missing script argument".to_owned()),
        [one] if one == "-" => ScriptSource::Stdin,
        [one] => ScriptSource::File(PathBuf::from(one)),
        more => return Err(format!("too many arguments ({})", more.len())),
    };

    Ok(args)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
