//! MemoDrops Admin - batch jobs and scraper monitoring from the terminal

use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use memodrops::{
    api::{AdminApiClient, QueueState},
    batch::{ItemExecutor, RunSummary, SequentialRunner},
    config::AppConfig,
    db::Database,
    fleet::StatusPoller,
    jobs::{
        BatchJob, ContestSelection, ContestsForDrops, DropsExecutor, HierarchyExecutor, JobSource,
        UnprocessedContests,
    },
    log_error, log_info, logging,
    ui::{plain, DashboardApp},
};

#[derive(Parser, Debug)]
#[command(name = "memodrops")]
#[command(version)]
#[command(about = "MemoDrops admin: sequential batch jobs and scraper fleet monitoring", long_about = None)]
struct Args {
    /// Configuration file path (overrides defaults)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Backend base URL
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Admin bearer token (or the name of an env var holding it)
    #[arg(long, global = true)]
    token: Option<String>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a batch job, one contest at a time
    Batch {
        #[command(subcommand)]
        job: BatchCmd,
    },
    /// Scraper fleet operations
    Scrapers {
        #[command(subcommand)]
        cmd: ScrapersCmd,
    },
    /// Backend job queue: list by state, retry failed jobs
    Queues {
        #[command(subcommand)]
        cmd: QueuesCmd,
    },
    /// Show recorded batch runs
    History {
        /// Only runs of this job (hierarchy, drops)
        #[arg(long)]
        job: Option<BatchJob>,
        /// Number of runs to list
        #[arg(long, default_value_t = 20)]
        limit: i64,
        /// Show the items of this run
        run_id: Option<String>,
    },
}

#[derive(clap::Args, Debug, Clone)]
struct RunOpts {
    /// Pause between two items, in milliseconds
    #[arg(long)]
    delay_ms: Option<u64>,
    /// Skip items that succeeded in the last recorded run of this job
    #[arg(long)]
    resume: bool,
    /// Disable retries of transient failures
    #[arg(long)]
    no_retry: bool,
    /// Line output instead of the full-screen view
    #[arg(long)]
    plain: bool,
}

#[derive(Subcommand, Debug)]
enum BatchCmd {
    /// Extract the hierarchy of every unprocessed contest
    Hierarchy {
        #[command(flatten)]
        run: RunOpts,
    },
    /// Generate drops for all contests, or the given ones
    Drops {
        #[command(flatten)]
        run: RunOpts,
        /// Max subtopics per contest
        #[arg(long)]
        limit: Option<u32>,
        /// Don't prioritize subtopics by incidence
        #[arg(long)]
        no_prioritize: bool,
        /// Contest id (repeatable); default is every contest
        #[arg(long = "contest")]
        contests: Vec<String>,
    },
}

#[derive(Subcommand, Debug)]
enum ScrapersCmd {
    /// Mirror the fleet status until quit
    Watch {
        /// Poll interval, in milliseconds
        #[arg(long)]
        interval_ms: Option<u64>,
        /// Line output instead of the full-screen view
        #[arg(long)]
        plain: bool,
    },
    /// Ask the backend to start every scraper
    StartAll,
}

#[derive(Subcommand, Debug)]
enum QueuesCmd {
    /// System counters followed by the jobs of one queue state
    List {
        /// failed, active, waiting or completed
        #[arg(long, default_value_t = QueueState::Failed)]
        status: QueueState,
        /// Max jobs to list
        #[arg(long, default_value_t = 50)]
        limit: u32,
    },
    /// Send a failed job back to the queue
    Retry {
        job_id: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load configuration
    let mut app_config = AppConfig::load(args.config.as_deref())?;

    // CLI flags win over file and environment
    if let Some(url) = args.api_url {
        app_config.api_url = url;
    }
    if let Some(token) = args.token {
        app_config.api_token = Some(token);
    }
    app_config.validate()?;

    let tui_mode = match &args.command {
        Command::Batch { job } => !job.run_opts().plain && std::io::stdout().is_terminal(),
        Command::Scrapers {
            cmd: ScrapersCmd::Watch { plain, .. },
        } => !plain && std::io::stdout().is_terminal(),
        _ => false,
    };
    logging::init_tracing(args.verbose || app_config.debug, tui_mode);
    if tui_mode {
        tracing::info!("Logging to {}", logging::get_log_path_display());
    }

    match args.command {
        Command::Batch { job } => run_batch(job, &app_config, tui_mode).await,
        Command::Scrapers { cmd } => match cmd {
            ScrapersCmd::Watch { interval_ms, .. } => {
                let interval = interval_ms
                    .map(Duration::from_millis)
                    .unwrap_or_else(|| app_config.poll_interval());
                watch_fleet(&app_config, interval, tui_mode).await
            }
            ScrapersCmd::StartAll => {
                let client = api_client(&app_config)?;
                client.scrape_all().await?;
                println!("scrape-all solicitado");
                Ok(())
            }
        },
        Command::Queues { cmd } => {
            let client = api_client(&app_config)?;
            match cmd {
                QueuesCmd::List { status, limit } => {
                    match client.system_stats().await {
                        Ok(stats) => {
                            for line in plain::stats_lines(&stats) {
                                println!("{}", line);
                            }
                        }
                        Err(e) => tracing::warn!("Could not read system stats: {}", e),
                    }
                    let jobs = client.list_queue_jobs(status, limit).await?;
                    for line in plain::queue_lines(status, &jobs) {
                        println!("{}", line);
                    }
                }
                QueuesCmd::Retry { job_id } => {
                    client.retry_queue_job(&job_id).await?;
                    log_info!("Queue job {} sent back for retry", job_id);
                    println!("job {} re-tentado", job_id);
                }
            }
            Ok(())
        }
        Command::History { job, limit, run_id } => {
            let db = Database::new(&app_config.history_db_path()).await?;
            match run_id {
                Some(run_id) => {
                    let run = db.get_run(&run_id).await?;
                    for line in plain::history_lines(std::slice::from_ref(&run)) {
                        println!("{}", line);
                    }
                    for line in plain::run_item_lines(&db.run_items(&run_id).await?) {
                        println!("{}", line);
                    }
                }
                None => {
                    for line in plain::history_lines(&db.recent_runs(job, limit).await?) {
                        println!("{}", line);
                    }
                }
            }
            Ok(())
        }
    }
}

impl BatchCmd {
    fn run_opts(&self) -> &RunOpts {
        match self {
            Self::Hierarchy { run } | Self::Drops { run, .. } => run,
        }
    }

    fn job(&self) -> BatchJob {
        match self {
            Self::Hierarchy { .. } => BatchJob::Hierarchy,
            Self::Drops { .. } => BatchJob::Drops,
        }
    }
}

/// Client for commands that need the admin API; a missing token fails here
fn api_client(config: &AppConfig) -> anyhow::Result<AdminApiClient> {
    let credential = config.credential();
    if credential.is_none() {
        anyhow::bail!("missing API token: set MEMODROPS_API_TOKEN, api_token in the config file, or --token");
    }
    Ok(AdminApiClient::new(&config.api_url, credential, config.request_timeout())?)
}

async fn run_batch(cmd: BatchCmd, config: &AppConfig, tui_mode: bool) -> anyhow::Result<()> {
    let client = api_client(config)?;
    let job = cmd.job();
    let opts = cmd.run_opts().clone();

    let (source, executor): (Box<dyn JobSource>, Arc<dyn ItemExecutor>) = match cmd {
        BatchCmd::Hierarchy { .. } => {
            let source: Box<dyn JobSource> = Box::new(UnprocessedContests::new(client.clone()));
            let executor: Arc<dyn ItemExecutor> = Arc::new(HierarchyExecutor::new(client));
            (source, executor)
        }
        BatchCmd::Drops {
            limit,
            no_prioritize,
            contests,
            ..
        } => {
            let selection = if contests.is_empty() {
                ContestSelection::All
            } else {
                ContestSelection::Ids(contests)
            };
            let source: Box<dyn JobSource> =
                Box::new(ContestsForDrops::new(client.clone(), selection));
            let executor: Arc<dyn ItemExecutor> = Arc::new(DropsExecutor::new(
                client,
                limit.unwrap_or(config.drops.limit),
                config.drops.prioritize_by_incidence && !no_prioritize,
            ));
            (source, executor)
        }
    };

    // History is best-effort for batch runs
    let history = match Database::new(&config.history_db_path()).await {
        Ok(db) => Some(db),
        Err(e) => {
            tracing::warn!("Run history disabled: {}", e);
            None
        }
    };

    let mut items = source.load().await.context("loading batch items")?;
    if opts.resume {
        match &history {
            Some(db) => {
                let done = db.succeeded_item_ids(job).await?;
                let before = items.len();
                items.retain(|item| !done.contains(&item.id));
                println!("retomando: {} já processados na última execução", before - items.len());
            }
            None => tracing::warn!("--resume ignored: run history unavailable"),
        }
    }
    if items.is_empty() {
        println!("nada a processar");
        return Ok(());
    }

    let mut runner_config = config.runner_config();
    if let Some(ms) = opts.delay_ms {
        runner_config.delay = Duration::from_millis(ms);
    }
    if opts.no_retry {
        runner_config.retry = memodrops::batch::RetryPolicy::none();
    }
    let runner = Arc::new(SequentialRunner::new(runner_config));
    let progress_rx = runner.subscribe();

    log_info!("Starting {} batch with {} items", job, items.len());
    let handle = {
        let runner = runner.clone();
        tokio::spawn(async move { runner.start(items, executor.as_ref()).await })
    };

    if tui_mode {
        let mut app = DashboardApp::new()?;
        app.run_batch(job.title(), &runner).await?;
    } else {
        let cancel_on_ctrl_c = {
            let runner = runner.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    eprintln!("cancelando...");
                    runner.cancel();
                }
            })
        };
        plain::follow_run(progress_rx).await;
        cancel_on_ctrl_c.abort();
    }

    let summary: RunSummary = handle.await??;
    for line in plain::summary_lines(&summary) {
        println!("{}", line);
    }

    if let Some(db) = history {
        match db.record_run(job, &summary).await {
            Ok(run_id) => {
                log_info!("Recorded {} run {}", job, run_id);
                println!("execução registrada: {}", run_id);
            }
            Err(e) => {
                log_error!("Failed to record run: {}", e);
                tracing::warn!("Failed to record run: {}", e);
            }
        }
    }

    Ok(())
}

async fn watch_fleet(config: &AppConfig, interval: Duration, tui_mode: bool) -> anyhow::Result<()> {
    let client = api_client(config)?;
    let mut poller = StatusPoller::new(Arc::new(client));
    poller.start_polling(interval);

    if tui_mode {
        let mut app = DashboardApp::new()?;
        app.run_fleet(&poller).await?;
    } else {
        let mut rx = poller.subscribe();
        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => break,
                changed = rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let snapshot = rx.borrow_and_update().clone();
                    if let Some(status) = snapshot {
                        println!("--- {}", chrono::Local::now().format("%H:%M:%S"));
                        for line in plain::fleet_lines(&status, 5) {
                            println!("{}", line);
                        }
                    }
                }
            }
        }
    }

    poller.stop_polling();
    Ok(())
}
