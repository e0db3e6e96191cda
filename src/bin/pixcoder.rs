use std::cell::Cell;
use std::path::PathBuf;
use std::rc::Rc;

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand};
use pixcoder::{FilterCompiler, FilterSession, PixError, Recovery, SessionEvent, SessionOpts};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "pixcoder", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Apply one or more filters to an image and write the result.
    Apply(ApplyArgs),
    /// Compile filters without running them.
    Check(FilterArgs),
}

#[derive(Args, Debug)]
struct FilterArgs {
    /// Inline filter snippet. May be repeated; inline snippets run before files.
    #[arg(long = "snippet")]
    snippets: Vec<String>,

    /// Filter snippet file. May be repeated.
    #[arg(long = "code")]
    code_files: Vec<PathBuf>,
}

#[derive(Args, Debug)]
struct ApplyArgs {
    /// Input image.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output image; the format follows the extension.
    #[arg(long)]
    out: PathBuf,

    #[command(flatten)]
    filters: FilterArgs,

    /// Session options JSON.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Record and print advisory warnings.
    #[arg(long)]
    warnings: bool,

    /// Pixel-data budget for the undo history.
    #[arg(long)]
    history_budget_bytes: Option<u64>,

    /// When a filter runs out of memory copying the image, drop the undo history and retry once.
    #[arg(long)]
    purge_on_oom: bool,
}

fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Apply(args) => cmd_apply(args),
        Command::Check(args) => cmd_check(args),
    }
}

fn read_filters(args: &FilterArgs) -> anyhow::Result<Vec<(String, String)>> {
    let mut out = Vec::with_capacity(args.snippets.len() + args.code_files.len());
    for (i, text) in args.snippets.iter().enumerate() {
        out.push((format!("--snippet #{}", i + 1), text.clone()));
    }
    for path in &args.code_files {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read snippet file '{}'", path.display()))?;
        out.push((path.display().to_string(), text));
    }
    if out.is_empty() {
        anyhow::bail!("no filters given; pass --snippet TEXT or --code FILE");
    }
    Ok(out)
}

fn describe(err: &PixError) -> String {
    format!("{}: {}", err.category().title(), err.user_message())
}

fn cmd_check(args: FilterArgs) -> anyhow::Result<()> {
    let compiler = FilterCompiler::new();
    let mut failed = 0usize;
    for (label, text) in read_filters(&args)? {
        match compiler.compile(&text) {
            Ok(unit) => eprintln!(
                "{label}: ok ({}, {} ops)",
                unit.id().entry_name(),
                unit.code_len()
            ),
            Err(e) => {
                failed += 1;
                eprintln!("{label}: {}", describe(&e));
            }
        }
    }
    if failed > 0 {
        anyhow::bail!("{failed} filter(s) failed to compile");
    }
    Ok(())
}

fn session_opts(args: &ApplyArgs) -> anyhow::Result<SessionOpts> {
    let mut opts = match &args.config {
        Some(path) => SessionOpts::from_path(path)?,
        None => SessionOpts::default(),
    };
    if args.warnings {
        opts.warnings = true;
    }
    if args.history_budget_bytes.is_some() {
        opts.history_budget_bytes = args.history_budget_bytes;
    }
    Ok(opts)
}

fn cmd_apply(args: ApplyArgs) -> anyhow::Result<()> {
    let filters = read_filters(&args.filters)?;
    let opts = session_opts(&args)?;

    let image = pixcoder::load_surface(&args.in_path)?;
    let mut session = FilterSession::new(opts);
    let recovery = Rc::new(Cell::new(Recovery::None));
    let last_recovery = Rc::clone(&recovery);
    session.subscribe(move |e: &SessionEvent| match e {
        SessionEvent::Progress(p) => eprint!("\r{p:>3}%"),
        SessionEvent::Committed { unit, history_len } => {
            eprintln!();
            tracing::info!(%unit, history_len, "filter applied");
        }
        SessionEvent::Failed { recovery, .. } => {
            eprintln!();
            last_recovery.set(*recovery);
        }
        _ => {}
    });
    session.set_base(image)?;

    for (label, text) in &filters {
        recovery.set(Recovery::None);
        let mut result = session.apply(text);
        if result.is_err() && recovery.get() == Recovery::PurgeAndRetry {
            if args.purge_on_oom {
                session.purge_history()?;
                tracing::warn!(filter = %label, "out of memory; purged undo history and retrying");
                result = session.apply(text);
            } else {
                eprintln!("hint: rerun with --purge-on-oom to drop the undo history and retry");
            }
        }
        if let Err(e) = result {
            anyhow::bail!("{label}: {}", describe(&e));
        }
        for w in session.last_warnings() {
            eprintln!("warning: {w}");
        }
        if session.suppressed_warnings() > 0 {
            eprintln!("warning: {} more suppressed", session.suppressed_warnings());
        }
    }

    let Some(result) = session.current() else {
        anyhow::bail!("session lost its image");
    };
    pixcoder::save_surface(result, &args.out)?;
    eprintln!("wrote {}", args.out.display());
    Ok(())
}
