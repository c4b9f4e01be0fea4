//! CLI binary for professor.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use professor::actions::{self, SystemClipboard};
use professor::config::ProfessorConfig;
use professor::notification::{Notification, NotificationLevel};
use professor::session::{ResearchSession, SearchForm, SessionEvent};
use professor::{HttpBackend, ResearchController, ResponseStyle, RunOutcome, StatusPoller};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Professor: research any topic through an AI research backend.
#[derive(Parser)]
#[command(name = "professor", version, about)]
struct Cli {
    /// Path to TOML configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override the backend base URL.
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Subcommand to run.
    #[command(subcommand)]
    command: Command,
}

/// Available commands.
#[derive(Subcommand)]
enum Command {
    /// Research a topic and print the results.
    Research(ResearchArgs),

    /// Render a saved answer (markdown or HTML) without contacting the backend.
    Render {
        /// File holding the answer.
        file: PathBuf,

        /// Topic the answer is about.
        #[arg(long)]
        topic: String,

        /// Print HTML instead of plain text.
        #[arg(long, conflicts_with = "json")]
        html: bool,

        /// Print the sanitised block document as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Check that the backend is up.
    Health,

    /// List tasks the backend is tracking.
    Tasks,

    /// Print the effective configuration.
    Config {
        /// Also write it to the configuration file.
        #[arg(long)]
        write: bool,
    },
}

#[derive(Args)]
struct ResearchArgs {
    /// Topic to research.
    #[arg(required = true, num_args = 1..)]
    topic: Vec<String>,

    /// Response style: comprehensive, concise, technical, beginner-friendly.
    #[arg(short, long)]
    style: Option<String>,

    /// Ask the backend to leave out sources.
    #[arg(long)]
    no_sources: bool,

    /// Print HTML instead of plain text.
    #[arg(long)]
    html: bool,

    /// Copy the results to the clipboard.
    #[arg(long)]
    copy: bool,

    /// Save the results as a text file, optionally into DIR.
    #[arg(long, value_name = "DIR", num_args = 0..=1)]
    download: Option<Option<PathBuf>>,

    /// Share the results (copies a share link in a terminal).
    #[arg(long)]
    share: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(ProfessorConfig::default_config_path);
    let mut config = if cli.config.is_some() {
        ProfessorConfig::from_file(&config_path)?
    } else {
        ProfessorConfig::load_or_default(&config_path)?
    };
    if let Some(base_url) = cli.base_url {
        config.backend.base_url = base_url;
    }
    config.validate()?;

    let _logging = professor::logging::init(&config.logging)?;

    match cli.command {
        Command::Research(args) => run_research(&config, args).await,
        Command::Render {
            file,
            topic,
            html,
            json,
        } => {
            let payload = std::fs::read_to_string(&file)?;
            let rendered = professor_render::render(&payload, &topic);
            if json {
                println!("{}", serde_json::to_string_pretty(&rendered)?);
            } else if html {
                println!("{}", rendered.html());
            } else {
                println!("{}", rendered.plain_text());
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Health => check_health(&config).await,
        Command::Tasks => list_tasks(&config).await,
        Command::Config { write } => {
            print!("{}", toml::to_string_pretty(&config)?);
            if write {
                config.save_to_file(&config_path)?;
                eprintln!("Wrote {}", config_path.display());
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn run_research(config: &ProfessorConfig, args: ResearchArgs) -> anyhow::Result<ExitCode> {
    let backend = Arc::new(HttpBackend::new(&config.backend)?);
    let defaults = SearchForm {
        topic: String::new(),
        response_style: config.defaults.response_style.clone(),
        include_sources: config.defaults.include_sources,
    };
    let controller = Arc::new(ResearchController::new(
        Arc::clone(&backend),
        StatusPoller::from_config(&config.polling),
        ResearchSession::new(defaults),
    ));

    let topic = args.topic.join(" ");
    let style = args
        .style
        .as_deref()
        .map(ResponseStyle::from)
        .unwrap_or_else(|| config.defaults.response_style.clone());
    let include_sources = config.defaults.include_sources && !args.no_sources;

    let bar = progress_bar();
    let display = spawn_progress_display(controller.subscribe(), bar.clone());

    // Ctrl+C starts over, which abandons the running task.
    let interrupt = {
        let controller = Arc::clone(&controller);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("received Ctrl+C, abandoning research...");
                controller.new_search().await;
            }
        })
    };

    let outcome = controller.run(&topic, style, include_sources).await;
    interrupt.abort();
    display.abort();
    bar.finish_and_clear();

    let session = controller.session();
    let session = session.lock().await;
    match outcome {
        RunOutcome::Completed => {}
        RunOutcome::Failed(err) | RunOutcome::Rejected(err) => {
            debug!(code = err.code(), error = %err, "research did not complete");
            match session.last_notification() {
                Some(notification) => eprintln!("{notification}"),
                None => eprintln!("{}", err.user_message()),
            }
            return Ok(ExitCode::FAILURE);
        }
        RunOutcome::Ignored | RunOutcome::Abandoned => {
            report(&Notification::info("Research cancelled."));
            return Ok(ExitCode::from(130));
        }
    }

    let Some(results) = session.results() else {
        anyhow::bail!("research completed without results");
    };
    if args.html {
        println!("{}", results.document.html());
    } else {
        println!("{}", results.document.plain_text());
    }
    eprintln!(
        "\n{} | {} | {}",
        results.processing_time_display(),
        results.sources_display(),
        results.tokens_display()
    );

    let text = results.document.plain_text();
    let today = chrono::Local::now().date_naive();
    let mut failed = false;
    if args.copy {
        let mut clipboard = SystemClipboard::new();
        failed |= report(&actions::copy(&mut clipboard, &text));
    }
    if let Some(dir) = args.download {
        let dir = dir.unwrap_or_else(|| config.output.resolved_download_dir());
        let notification = actions::download(&dir, &results.topic, &text, today);
        if notification.level == NotificationLevel::Success {
            eprintln!(
                "Saved {}",
                actions::download_path(&dir, &results.topic, today).display()
            );
        }
        failed |= report(&notification);
    }
    if args.share {
        let mut clipboard = SystemClipboard::new();
        let notification = actions::share(
            None,
            &mut clipboard,
            &results.topic,
            &text,
            backend.base_url().as_str(),
        );
        failed |= report(&notification);
    }

    Ok(if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

/// Print a notification to stderr; true when it reports an error.
fn report(notification: &Notification) -> bool {
    eprintln!("{notification}");
    notification.level == NotificationLevel::Error
}

fn progress_bar() -> ProgressBar {
    let bar = ProgressBar::new(100);
    if let Ok(style) = ProgressStyle::with_template("  [{bar:30}] {pos:>3}% {msg}") {
        bar.set_style(style);
    }
    bar
}

fn spawn_progress_display(
    mut events: broadcast::Receiver<SessionEvent>,
    bar: ProgressBar,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(SessionEvent::Progress { progress }) => {
                    bar.set_position(u64::from(progress.percent));
                    bar.set_message(format!("{}: {}", progress.title, progress.description));
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => debug!(skipped, "progress display lagged"),
                Err(RecvError::Closed) => break,
            }
        }
    })
}

async fn check_health(config: &ProfessorConfig) -> anyhow::Result<ExitCode> {
    let backend = HttpBackend::new(&config.backend)?;
    let report = backend.health().await?;
    println!(
        "{}: {} (active tasks: {})",
        backend.base_url(),
        report.status,
        report.active_tasks
    );
    Ok(if report.is_healthy() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

async fn list_tasks(config: &ProfessorConfig) -> anyhow::Result<ExitCode> {
    let backend = HttpBackend::new(&config.backend)?;
    let listing = backend.list_tasks().await?;
    println!("Active tasks: {}", listing.active_tasks);
    for task in &listing.tasks {
        let started = task
            .start_time
            .and_then(|secs| chrono::DateTime::from_timestamp_millis((secs * 1000.0) as i64))
            .map(|t| t.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "-".to_owned());
        println!(
            "  {}  {:<10} {:>3}%  {}  {}",
            task.task_id,
            task.status.as_str(),
            task.progress.clamp(0, 100),
            started,
            task.topic
        );
    }
    Ok(ExitCode::SUCCESS)
}
