//! CLI entry point for `scrapemail`.

use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{CommandFactory, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use scrapemail::config::Config;
use scrapemail::credentials;
use scrapemail::download::{CancelToken, DownloadStats, Downloader};
use scrapemail::filter::AttachmentFilter;
use scrapemail::store::imap::ImapStore;
use scrapemail::store::MailStore;

#[derive(Parser)]
#[command(
    name = "scrapemail",
    version,
    about = "Download mail attachments over IMAP"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// IMAP server host
    #[arg(long, value_name = "HOST")]
    host: Option<String>,

    /// IMAP server port (implicit TLS)
    #[arg(long, value_name = "PORT")]
    port: Option<u16>,

    /// Folder to download from
    #[arg(short = 'F', long, value_name = "NAME")]
    folder: Option<String>,

    /// Account username; the password is prompted
    #[arg(short, long, value_name = "USER")]
    username: Option<String>,

    /// JSON credentials file (keys: username/user/email, password/pass)
    #[arg(short, long, value_name = "FILE", env = "SCRAPEMAIL_CREDENTIALS")]
    credentials: Option<PathBuf>,

    /// Keep only messages whose subject starts with a match of this pattern
    #[arg(short, long, value_name = "PATTERN")]
    subject: Option<String>,

    /// Keep only attachments whose filename starts with a match of this pattern
    #[arg(short, long, value_name = "PATTERN")]
    filename: Option<String>,

    /// Destination directory for attachments
    #[arg(short, long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// Skip unparseable messages instead of aborting
    #[arg(long)]
    skip_malformed: bool,

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

    if let Some(command) = &cli.command {
        return match command {
            Commands::Completions { shell } => cmd_completions(*shell),
            Commands::Manpage => cmd_manpage(),
        };
    }

    // Load configuration
    let config = scrapemail::config::load_config();

    // Configure logging: stderr + optional log file
    let log_level = match cli.verbose {
        0 => config.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    setup_logging(log_level, &config);

    cmd_download(cli, &config)
}

/// Set up tracing with stderr output and optional file logging.
fn setup_logging(level: &str, config: &Config) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    // Try to set up file logging
    let log_dir = scrapemail::config::cache_dir(config);
    if std::fs::create_dir_all(&log_dir).is_ok() {
        let file_appender = tracing_appender::rolling::never(&log_dir, "scrapemail.log");
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
    clap_complete::generate(shell, &mut cmd, "scrapemail", &mut std::io::stdout());
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

/// Run the download described by the CLI flags and the config file.
fn cmd_download(cli: Cli, config: &Config) -> anyhow::Result<()> {
    let host = cli.host.unwrap_or_else(|| config.server.host.clone());
    let port = cli.port.unwrap_or(config.server.port);
    let folder = cli.folder.unwrap_or_else(|| config.server.folder.clone());
    let output = cli
        .output
        .unwrap_or_else(|| config.download.output_dir.clone());
    let skip_malformed = cli.skip_malformed || config.download.skip_malformed;

    // Patterns and credentials are resolved before any network activity.
    let filter = AttachmentFilter::new(cli.subject.as_deref(), cli.filename.as_deref())?;
    let credentials_file = cli
        .credentials
        .as_deref()
        .or(config.server.credentials_file.as_deref());
    let creds = credentials::resolve(cli.username, credentials_file)?;

    if let Err(e) = std::fs::create_dir_all(&output) {
        anyhow::bail!("Cannot create output directory '{}': {e}", output.display());
    }

    let cancel = CancelToken::new();
    let handler_token = cancel.clone();
    ctrlc::set_handler(move || {
        eprintln!();
        eprintln!("Interrupted, stopping after the current message...");
        handler_token.cancel();
    })?;

    let mut store = ImapStore::connect(&host, port, &creds)?;

    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} Downloading [{bar:40.cyan/blue}] {pos}/{len}")
            .expect("valid template")
            .progress_chars("#>-"),
    );

    let start = Instant::now();
    let result = run_download(&mut store, &folder, filter, &output, skip_malformed, &cancel, &pb);
    pb.finish_and_clear();
    let elapsed = start.elapsed();

    // The session gets its LOGOUT whether or not the run succeeded.
    store.logout();
    let stats = result?;

    print_summary(&stats, &folder, &output, elapsed);

    if cancel.is_cancelled() {
        eprintln!("Interrupted; keeping the attachments downloaded so far.");
        std::process::exit(130);
    }

    Ok(())
}

/// Select the folder and run the download, reporting progress on `pb`.
fn run_download(
    store: &mut ImapStore,
    folder: &str,
    filter: AttachmentFilter,
    output: &Path,
    skip_malformed: bool,
    cancel: &CancelToken,
    pb: &ProgressBar,
) -> scrapemail::error::Result<DownloadStats> {
    store.select_folder(folder)?;
    Downloader::new(store, filter, output)
        .with_skip_malformed(skip_malformed)
        .with_cancel_token(cancel.clone())
        .download_attachments(Some(&|current, total| {
            pb.set_length(total);
            pb.set_position(current);
        }))
}

/// Print the run summary in a human-readable table.
fn print_summary(stats: &DownloadStats, folder: &str, output: &Path, elapsed: std::time::Duration) {
    use humansize::{format_size, BINARY};

    println!();
    println!("  {:<20} {}", "Folder", folder);
    println!("  {:<20} {}", "Attachments", stats.count);
    println!(
        "  {:<20} {}",
        "Total size",
        format_size(stats.total_bytes, BINARY)
    );
    println!("  {:<20} {}", "Destination", output.display());
    println!("  {:<20} {:.2?}", "Elapsed", elapsed);
    println!();
}
