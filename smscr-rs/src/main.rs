use std::io::{self, Read, Write};
use std::process::ExitCode;
use std::sync::{Arc, Mutex};

use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use smscr::cli::{self, CliArgs, ScriptSource, USAGE};
use smscr::config::{ParamConfig, Section};
use smscr::context::{BufferContext, Context, RequestContext};
use smscr::script::{parse, reconstruct, Engine, ScriptError};

fn main() -> ExitCode {
    let args = match cli::parse_args() {
        Ok(a) => a,
        Err(e) => {
            eprintln!("smscr: {e}");
            eprintln!("{USAGE}");
            return ExitCode::from(2);
        }
    };

    init_logging(args.debug);

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("smscr: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Log to stderr; `SMSCR_LOG` sets the filter unless `-d` forces debug.
fn init_logging(debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env("SMSCR_LOG").unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run(args: CliArgs) -> Result<(), Box<dyn std::error::Error>> {
    // ── Load the script ───────────────────────────────────────────────────────
    let source = match &args.script {
        ScriptSource::File(path) => std::fs::read_to_string(path)
            .map_err(|e| format!("cannot read {}: {e}", path.display()))?,
        ScriptSource::Stdin => {
            let mut s = String::new();
            io::stdin().read_to_string(&mut s)?;
            s
        }
    };
    let document = parse(&source).map_err(ScriptError::from)?;

    if args.tree {
        let mut out = io::stdout().lock();
        out.write_all(reconstruct(&document).as_bytes())?;
        out.flush()?;
        return Ok(());
    }

    // ── Collect parameters: files first, then -p / -P ────────────────────────
    let mut params = ParamConfig::new();
    for path in &args.param_files {
        let (loaded, errors) = ParamConfig::load_file(path)
            .map_err(|e| format!("cannot read {}: {e}", path.display()))?;
        for err in errors {
            warn!(file = %path.display(), "{err}");
        }
        params.merge(loaded);
    }
    for (name, value) in args.params {
        params.set(Section::Request, name, value);
    }
    for (name, value) in args.persistent {
        params.set(Section::Persistent, name, value);
    }
    debug!(
        request = params.request.len(),
        persistent = params.persistent.len(),
        temporary = params.temporary.len(),
        "parameters loaded"
    );

    // ── Execute ───────────────────────────────────────────────────────────────
    if args.body_only {
        let mut ctx = BufferContext {
            parameters: params.request,
            persistent: params.persistent,
            temporary: params.temporary,
            ..BufferContext::default()
        };
        let result = Engine::new(&document, &mut ctx).execute();
        let mut out = io::stdout().lock();
        out.write_all(ctx.output.as_bytes())?;
        out.flush()?;
        result.map_err(ScriptError::from)?;
    } else {
        let mut ctx = RequestContext::new(io::stdout().lock())
            .with_parameters(params.request)
            .with_temporary(params.temporary)
            .with_persistent(Arc::new(Mutex::new(params.persistent)));
        Engine::new(&document, &mut ctx)
            .execute()
            .map_err(ScriptError::from)?;
        if !ctx.header_generated() {
            // Empty body: the header still has to go out.
            ctx.write(b"")?;
        }
    }
    Ok(())
}
