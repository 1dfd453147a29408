//! CLI entry point for `graphpull`.

use std::path::PathBuf;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use clap::{CommandFactory, Parser, Subcommand};
use humansize::{format_size, BINARY};
use indicatif::{ProgressBar, ProgressStyle};

use graphpull::client::GraphClient;
use graphpull::config::{self, Config};
use graphpull::export::writer::ItemWriter;
use graphpull::fetch::Fetcher;
use graphpull::filter::{build_query, Importance, SearchCriteria};

#[derive(Parser)]
#[command(
    name = "graphpull",
    version,
    about = "Export messages from a Microsoft 365 mailbox to local disk",
    long_about = "Searches a mailbox folder through the Graph API with optional filters \
                  (text terms, date range, sender, recipient, importance, size, attachments) \
                  and writes every matching message to its own directory: body, metadata \
                  sidecar, and attachment files."
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Graph API bearer token
    #[arg(long, env = "GRAPH_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Output directory
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Search terms for subject/body, comma-separated
    #[arg(short, long)]
    query: Option<String>,

    /// Maximum number of messages to export
    #[arg(long, value_name = "N")]
    max_emails: Option<usize>,

    /// Mailbox folder to search
    #[arg(long, default_value = "inbox")]
    folder: String,

    /// Start of the received-date window (YYYY-MM-DD)
    #[arg(long, value_name = "DATE")]
    start_date: Option<String>,

    /// End of the received-date window (YYYY-MM-DD)
    #[arg(long, value_name = "DATE")]
    end_date: Option<String>,

    /// Filter by sender address (substring)
    #[arg(long, value_name = "ADDR")]
    from_address: Option<String>,

    /// Filter by recipient address (substring, any recipient)
    #[arg(long, value_name = "ADDR")]
    to_address: Option<String>,

    /// Filter by importance level
    #[arg(long, value_enum)]
    importance: Option<Importance>,

    /// Only messages that carry attachments
    #[arg(long)]
    has_attachments: bool,

    /// Attachment extensions to keep, comma-separated (e.g. .pdf,.docx)
    #[arg(long, value_name = "EXTS")]
    attachment_types: Option<String>,

    /// Terms that must not appear in subject or body, comma-separated
    #[arg(long, value_name = "TERMS")]
    exclude_terms: Option<String>,

    /// Minimum message size in bytes
    #[arg(long, value_name = "BYTES")]
    min_size: Option<u64>,

    /// Maximum message size in bytes
    #[arg(long, value_name = "BYTES")]
    max_size: Option<u64>,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
    /// Generate a man page
    Manpage,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Completions { shell }) => return cmd_completions(shell),
        Some(Commands::Manpage) => return cmd_manpage(),
        None => {}
    }

    // Load configuration
    let config = config::load_config();

    // Configure logging: stderr + optional log file
    let log_level = match cli.verbose {
        0 => config.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    setup_logging(log_level, &config);

    cmd_export(&cli, &config)
}

/// Set up tracing with stderr output and optional file logging.
fn setup_logging(level: &str, config: &Config) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    // Try to set up file logging
    let log_dir = config::cache_dir(config);
    if std::fs::create_dir_all(&log_dir).is_ok() {
        let file_appender = tracing_appender::rolling::never(&log_dir, "graphpull.log");
        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(file_appender);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .with(file_layer)
            .init();
    } else {
        // Fall back to stderr only
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .init();
    }
}

/// Generate shell completions and print to stdout.
fn cmd_completions(shell: clap_complete::Shell) -> anyhow::Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "graphpull", &mut std::io::stdout());
    Ok(())
}

/// Generate a man page and print to stdout.
fn cmd_manpage() -> anyhow::Result<()> {
    let cmd = Cli::command();
    let man = clap_mangen::Man::new(cmd);
    let mut buf = Vec::new();
    man.render(&mut buf)?;
    std::io::Write::write_all(&mut std::io::stdout(), &buf)?;
    Ok(())
}

/// Run the search-and-export pass.
fn cmd_export(cli: &Cli, config: &Config) -> anyhow::Result<()> {
    let Some(token) = cli.token.as_deref().map(str::trim).filter(|t| !t.is_empty()) else {
        anyhow::bail!("a bearer token is required (--token or GRAPH_TOKEN)");
    };

    let output = cli
        .output
        .clone()
        .or_else(|| config.export.default_output_dir.clone())
        .unwrap_or_else(|| PathBuf::from("exfiltrated_emails"));

    let criteria = build_criteria(cli);
    let query = build_query(&criteria, config.api.page_size);
    tracing::debug!(filter = query.filter.as_deref().unwrap_or("<none>"), "Built query");

    let client = GraphClient::new(token, &config.api)?;

    // Confirm which mailbox the token belongs to. Not fatal: some tokens
    // can read mail but not the profile.
    match client.profile() {
        Ok(profile) => println!("Connected to mailbox: {}", profile.identity()),
        Err(e) => tracing::warn!(error = %e, "Could not read mailbox profile"),
    }

    let mut writer = ItemWriter::new(&output, &client);
    if let Some(types) = cli.attachment_types.as_deref() {
        let extensions: Vec<String> = types.split(',').map(str::to_string).collect();
        writer = writer.with_extension_filter(&extensions);
    }

    let pb = make_progress(cli.max_emails);

    let mut attachments_saved = 0usize;
    let mut bytes_written = 0u64;

    let fetcher = Fetcher::new(&client, &cli.folder)
        .max_items(cli.max_emails)
        .page_delay(std::time::Duration::from_millis(config.api.page_delay_ms));

    let outcome = fetcher.run(&query, &mut |message| {
        match writer.write_item(&message) {
            Ok(record) => {
                attachments_saved += record.attachments_saved;
                bytes_written += record.bytes_written;
                pb.println(format!("Processed: {}", message.subject_or_default()));
                pb.inc(1);
                true
            }
            Err(e) => {
                tracing::warn!(
                    subject = %message.subject_or_default(),
                    error = %e,
                    "Failed to export message"
                );
                false
            }
        }
    });

    pb.finish_and_clear();

    if let Some(e) = &outcome.error {
        eprintln!("Error retrieving messages: {e}");
    }

    println!();
    println!("  Export complete:");
    println!("  {:<22} {}", "Messages exported", outcome.processed);
    if outcome.failed > 0 {
        println!("  {:<22} {}", "Messages skipped", outcome.failed);
    }
    println!("  {:<22} {}", "Attachments saved", attachments_saved);
    println!(
        "  {:<22} {}",
        "Data written",
        format_size(bytes_written, BINARY)
    );
    println!("  {:<22} {}", "Output directory", output.display());
    println!();

    Ok(())
}

/// Translate CLI flags into search criteria. Malformed optional criteria
/// are warned about and omitted, never fatal.
fn build_criteria(cli: &Cli) -> SearchCriteria {
    let exclude_terms = cli
        .exclude_terms
        .as_deref()
        .map(|raw| raw.split(',').map(str::to_string).collect())
        .unwrap_or_default();

    SearchCriteria {
        terms: cli.query.clone(),
        exclude_terms,
        date_range: parse_date_range(cli.start_date.as_deref(), cli.end_date.as_deref()),
        from_address: cli.from_address.clone(),
        to_address: cli.to_address.clone(),
        importance: cli.importance,
        has_attachments: cli.has_attachments.then_some(true),
        min_size: cli.min_size,
        max_size: cli.max_size,
    }
}

/// A date window needs both bounds; the range spans the full days.
fn parse_date_range(start: Option<&str>, end: Option<&str>) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let (start, end) = match (start, end) {
        (Some(s), Some(e)) => (s, e),
        (None, None) => return None,
        _ => {
            tracing::warn!("Both --start-date and --end-date are needed for a date window; ignoring");
            return None;
        }
    };

    let parse = |s: &str| -> Option<NaiveDate> {
        match NaiveDate::parse_from_str(s, "%Y-%m-%d") {
            Ok(d) => Some(d),
            Err(e) => {
                tracing::warn!(date = s, error = %e, "Unreadable date, ignoring the window");
                None
            }
        }
    };

    let start = parse(start)?.and_time(NaiveTime::MIN).and_utc();
    let end_of_day = NaiveTime::from_hms_opt(23, 59, 59).expect("in-range time");
    let end = parse(end)?.and_time(end_of_day).and_utc();
    Some((start, end))
}

/// Progress bar when the total is known, spinner otherwise.
fn make_progress(max: Option<usize>) -> ProgressBar {
    match max {
        Some(n) => {
            let pb = ProgressBar::new(n as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} Exporting [{bar:40.cyan/blue}] {pos}/{len}")
                    .expect("valid template")
                    .progress_chars("#>-"),
            );
            pb
        }
        None => {
            let pb = ProgressBar::new_spinner();
            pb.set_style(
                ProgressStyle::default_spinner()
                    .template("{spinner:.green} Exporting {pos} message(s)")
                    .expect("valid template"),
            );
            pb
        }
    }
}
