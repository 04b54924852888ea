//! shopping-e2e: checks that the second product rated at or above a
//! threshold in shopping results exists and qualifies.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use rating_scout::{BrowserSession, Outcome, PageRatingResolver, Recording};
use rating_scout_e2e::artifacts::write_failure_artifacts;
use rating_scout_e2e::logging::{self, LogFormat};
use rating_scout_e2e::{
    find_chromium, replay, run_scenario, BrowserArgs, BrowserKind, ChromiumSession, RunConfig,
    ScenarioReport, SCENARIO,
};

#[derive(Parser)]
#[command(
    name = "shopping-e2e",
    about = "End-to-end check: the second shopping result rated at or above a threshold",
    version
)]
struct Cli {
    /// Print the outcome as JSON on stdout.
    #[arg(long, global = true)]
    json: bool,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Log line format.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(flatten)]
    run: RunConfig,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the scenario against a live browser (default).
    Run(RunConfig),

    /// Open one product page and print the rating the cascade finds.
    Resolve {
        /// Product page URL.
        url: String,

        #[command(flatten)]
        browser: BrowserArgs,
    },

    /// Run link collection and the scan against a recorded session.
    Replay {
        /// Recording JSON file.
        recording: PathBuf,

        /// Minimum rating that qualifies a product (0-5)
        #[arg(long, env = "MIN_RATING", default_value_t = 4.0)]
        min_rating: f64,

        /// Maximum number of product pages to visit
        #[arg(long, env = "MAX_PRODUCTS", default_value_t = 50)]
        max_products: usize,

        /// Maximum number of scroll passes
        #[arg(long, env = "MAX_SCROLLS", default_value_t = 12)]
        max_scrolls: usize,

        /// Directory for failure reports
        #[arg(long, env = "ARTIFACTS_DIR", default_value = "screenshots")]
        artifacts_dir: PathBuf,
    },

    /// Report whether a usable browser binary is installed.
    Doctor {
        #[arg(long, env = "BROWSER", value_enum, default_value_t = BrowserKind::Chrome)]
        browser: BrowserKind,
    },

    /// Generate shell completion scripts.
    ///
    /// Examples:
    ///   shopping-e2e completions bash > ~/.local/share/bash-completion/completions/shopping-e2e
    ///   shopping-e2e completions zsh > ~/.zfunc/_shopping-e2e
    Completions {
        /// Shell type (bash, zsh, fish, powershell, elvish).
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(&cli.log_level, cli.log_format);
    let json = cli.json;

    let code = match cli.command.unwrap_or(Commands::Run(cli.run)) {
        Commands::Run(config) => run(config, json).await?,

        Commands::Resolve { url, browser } => resolve(&url, &browser, json).await?,

        Commands::Replay {
            recording,
            min_rating,
            max_products,
            max_scrolls,
            artifacts_dir,
        } => {
            let raw = std::fs::read_to_string(&recording)
                .with_context(|| format!("failed to read {}", recording.display()))?;
            let recording: Recording =
                serde_json::from_str(&raw).context("recording is not valid JSON")?;
            let report = replay(recording, min_rating, max_products, max_scrolls).await;
            if matches!(report.outcome, Outcome::Failed { .. }) {
                save_failure(&artifacts_dir, &report, None);
            }
            print_report(&report, json)?;
            report.outcome.exit_code()
        }

        Commands::Doctor { browser } => match find_chromium(browser) {
            Some(path) => {
                println!("Browser: {}", path.display());
                0
            }
            None => {
                eprintln!(
                    "No Chromium or Chrome binary found. Install one or set {}.",
                    rating_scout_e2e::browser::CHROMIUM_PATH_ENV
                );
                1
            }
        },

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "shopping-e2e", &mut std::io::stdout());
            0
        }
    };

    std::process::exit(code);
}

async fn run(config: RunConfig, json: bool) -> anyhow::Result<i32> {
    config.validate()?;
    let pacing = config.pacing();
    let mut session = ChromiumSession::launch(&config.browser).await?;

    let report = run_scenario(&mut session, &config, &pacing).await;

    if matches!(report.outcome, Outcome::Failed { .. }) {
        let screenshot = match session.screenshot().await {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                tracing::warn!(error = %e, "could not capture failure screenshot");
                None
            }
        };
        save_failure(&config.artifacts_dir, &report, screenshot.as_deref());
    }
    session.close().await;

    print_report(&report, json)?;
    Ok(report.outcome.exit_code())
}

async fn resolve(url: &str, browser: &BrowserArgs, json: bool) -> anyhow::Result<i32> {
    let mut session = ChromiumSession::launch(browser).await?;
    let navigated = session.navigate(url).await;
    if let Err(e) = &navigated {
        tracing::warn!(url, error = %e, "navigation failed, reading whatever loaded");
    }
    tokio::time::sleep(Duration::from_millis(900)).await;
    let resolved = PageRatingResolver::new().resolve(&session).await;
    session.close().await;

    if json {
        println!("{}", serde_json::to_string_pretty(&resolved)?);
    } else {
        match resolved {
            Some(r) => println!("{} (from {})", r.rating, r.source),
            None => println!("no rating found"),
        }
    }
    Ok(if resolved.is_some() { 0 } else { 1 })
}

fn save_failure(dir: &Path, report: &ScenarioReport, screenshot: Option<&[u8]>) {
    match write_failure_artifacts(dir, SCENARIO, report, screenshot) {
        Ok(written) => eprintln!("Failure report: {}", written.report.display()),
        Err(e) => tracing::warn!(error = %e, "could not write failure artifacts"),
    }
}

fn print_report(report: &ScenarioReport, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }
    match &report.outcome {
        Outcome::Passed { rating, threshold } => {
            println!("PASS: second qualifying product rated {rating} (threshold {threshold})")
        }
        Outcome::Failed { message } => println!("FAIL: {message}"),
        Outcome::Skipped { reason } => println!("SKIP: {reason}"),
    }
    Ok(())
}
