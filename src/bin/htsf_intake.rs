use std::io::{self, BufRead, Write};
use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use htsf_intake::app::{App, IngestOptions};
use htsf_intake::assemble::Engine;
use htsf_intake::config::{ConfigLoader, ResolvedConfig};
use htsf_intake::domain::LookupKey;
use htsf_intake::error::IntakeError;
use htsf_intake::output::JsonOutput;
use htsf_intake::store::{JsonStore, SubmissionStore};
use htsf_intake::text::{PdfTextExtractor, PlainTextExtractor, TextExtractor};

#[derive(Parser)]
#[command(name = "htsf-intake")]
#[command(about = "Extract HTSF Nanopore submission forms into deduplicated submission records")]
#[command(version, author)]
struct Cli {
    #[arg(long, global = true)]
    config: Option<String>,

    #[arg(long, global = true, conflicts_with = "global")]
    store: Option<String>,

    #[arg(long, global = true)]
    global: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Parse submission forms and store new ones")]
    Scan(ScanArgs),
    #[command(about = "List stored submissions, newest first")]
    List(ListArgs),
    #[command(about = "Show a submission by submission id, uuid or file hash")]
    Show(ShowArgs),
    #[command(about = "Search submissions by id, project, owner, organism or form values")]
    Search(SearchArgs),
    #[command(about = "Delete a submission with its samples")]
    Delete(DeleteArgs),
    #[command(about = "Show store statistics")]
    Stats,
}

#[derive(Args)]
struct ScanArgs {
    #[arg(required = true)]
    files: Vec<String>,

    #[arg(long, help = "Inputs are already-extracted form text rather than PDF")]
    text: bool,

    #[arg(long, help = "Parse and check for duplicates without storing")]
    dry_run: bool,
}

#[derive(Args)]
struct ListArgs {
    #[arg(long)]
    project: Option<String>,

    #[arg(long)]
    limit: Option<usize>,
}

#[derive(Args)]
struct ShowArgs {
    key: String,
}

#[derive(Args)]
struct SearchArgs {
    term: String,
}

#[derive(Args)]
struct DeleteArgs {
    submission_id: String,

    #[arg(long, short = 'y')]
    yes: bool,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(error) = report.downcast_ref::<IntakeError>() {
            return ExitCode::from(map_exit_code(error));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &IntakeError) -> u8 {
    match error {
        IntakeError::SubmissionNotFound(_)
        | IntakeError::EmptyDocument
        | IntakeError::UnreadableDocument(_) => 2,
        IntakeError::Filesystem(_)
        | IntakeError::CorruptRecord(_)
        | IntakeError::SubmissionIdConflict(_) => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let resolved = ConfigLoader::resolve(cli.config.as_deref())?;
    let store = open_store(cli.store.as_deref(), cli.global, &resolved)?;

    match cli.command {
        Commands::Scan(args) => {
            if args.text {
                run_scan(args, PlainTextExtractor, store, &resolved)
            } else {
                run_scan(args, PdfTextExtractor, store, &resolved)
            }
        }
        Commands::List(args) => {
            let result = app(store, &resolved).list(args.project, args.limit)?;
            JsonOutput::print_list(&result).into_diagnostic()
        }
        Commands::Show(args) => {
            let key: LookupKey = args.key.parse()?;
            let submission = app(store, &resolved).show(&key)?;
            JsonOutput::print_submission(&submission).into_diagnostic()
        }
        Commands::Search(args) => {
            let result = app(store, &resolved).search(&args.term)?;
            JsonOutput::print_search(&result).into_diagnostic()
        }
        Commands::Delete(args) => run_delete(args, store, &resolved),
        Commands::Stats => {
            let result = app(store, &resolved).stats()?;
            JsonOutput::print_stats(&result).into_diagnostic()
        }
    }
}

fn open_store(
    flag: Option<&str>,
    global: bool,
    resolved: &ResolvedConfig,
) -> Result<JsonStore, IntakeError> {
    if global {
        return JsonStore::user_default();
    }
    match flag
        .map(Utf8PathBuf::from)
        .or_else(|| resolved.store_root.clone())
    {
        Some(root) => Ok(JsonStore::new_with_root(root)),
        None => JsonStore::new(),
    }
}

fn app<S: SubmissionStore>(store: S, resolved: &ResolvedConfig) -> App<PlainTextExtractor, S> {
    App::new(
        Engine::new(PlainTextExtractor, resolved.engine.clone()),
        store,
    )
}

fn run_scan<E: TextExtractor, S: SubmissionStore>(
    args: ScanArgs,
    extractor: E,
    store: S,
    resolved: &ResolvedConfig,
) -> miette::Result<()> {
    let app = App::new(Engine::new(extractor, resolved.engine.clone()), store);
    let options = IngestOptions {
        dry_run: args.dry_run,
    };
    let paths = args.files.iter().map(Utf8PathBuf::from).collect::<Vec<_>>();

    let report = app.scan(&paths, &options);
    JsonOutput::print_scan(&report).into_diagnostic()?;

    let failed = report.failures.len();
    match report.failures.into_iter().next() {
        Some(first) => {
            eprintln!("{failed} of {} files failed", paths.len());
            Err(first.error.into())
        }
        None => Ok(()),
    }
}

fn run_delete<S: SubmissionStore>(
    args: DeleteArgs,
    store: S,
    resolved: &ResolvedConfig,
) -> miette::Result<()> {
    let app = app(store, resolved);
    let key = LookupKey::SubmissionId(args.submission_id.clone());
    let submission = app.show(&key)?;

    if !args.yes && !confirm(&format!(
        "Delete {} ({} samples, scanned {})? [y/N] ",
        submission.submission_id(),
        submission.samples().len(),
        submission.scanned_at().to_rfc3339()
    ))
    .into_diagnostic()?
    {
        eprintln!("aborted");
        return Ok(());
    }

    let result = app.delete(&args.submission_id)?;
    JsonOutput::print_delete(&result).into_diagnostic()
}

fn confirm(prompt: &str) -> io::Result<bool> {
    let mut stderr = io::stderr();
    stderr.write_all(prompt.as_bytes())?;
    stderr.flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes" | "YES"))
}
