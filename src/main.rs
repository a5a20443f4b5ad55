use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use phoneclaw_lib::adb::{apps, AdbClient, AdbDevice};
use phoneclaw_lib::agent_engine::history::SessionHistory;
use phoneclaw_lib::agent_engine::{AgentConfig, PhoneAgent, RunOutcome, StopHandle};
use phoneclaw_lib::config::{self, AppConfig};
use phoneclaw_lib::errors::{PhoneClawError, PhoneClawResult};
use phoneclaw_lib::executor::safety::prompt_line;
use phoneclaw_lib::executor::{ActionExecutor, ConsoleHooks};
use phoneclaw_lib::llm::OpenAiCompatibleProvider;
use phoneclaw_lib::prompts::{self, Lang};

/// PhoneClaw - drive an Android phone with a vision model
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Task to run; omit for an interactive prompt
    #[arg(value_name = "TASK")]
    task: Vec<String>,

    /// List the app names the Launch action understands
    #[arg(long)]
    list_apps: bool,

    /// Configuration file path (defaults to config.toml next to the binary or in the cwd)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,
}

impl Cli {
    fn task_text(&self) -> String {
        self.task.join(" ")
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Load .env file if present (ignore error if not found)
    let _ = dotenvy::dotenv();
    phoneclaw_lib::init_tracing();

    if cli.list_apps {
        list_apps();
        return ExitCode::SUCCESS;
    }

    match run(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "phoneclaw exited with an error");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn list_apps() {
    let mut names = apps::supported_apps();
    names.sort_unstable();
    println!("Supported apps:");
    for name in names {
        println!("  - {name}");
    }
}

async fn run(cli: &Cli) -> PhoneClawResult<()> {
    let cfg = match &cli.config {
        Some(path) => config::load_config_from(path)?,
        None => config::load_config_or_default()?,
    };
    let task = cli.task_text();
    let mut agent = build_agent(&cfg).await?;
    let lang = Lang::parse(&cfg.agent.lang);

    let stop = agent.stop_handle();
    spawn_interrupt_listener(stop);

    if !task.trim().is_empty() {
        let outcome = agent.run(&task).await?;
        report(&outcome, lang);
        return Ok(());
    }

    loop {
        let Some(line) = prompt_line("\nTask (q to quit): ".to_string()).await else {
            break;
        };
        let task = line.trim();
        if task.is_empty() {
            continue;
        }
        if task.eq_ignore_ascii_case("q") {
            break;
        }
        match agent.run(task).await {
            Ok(outcome) => report(&outcome, lang),
            Err(e) => eprintln!("Error: {e}"),
        }
        agent.reset();
    }
    Ok(())
}

async fn build_agent(cfg: &AppConfig) -> PhoneClawResult<PhoneAgent> {
    let api_key = cfg.llm.resolve_api_key().ok_or_else(|| {
        PhoneClawError::Config(
            "no API key: set PHONECLAW_API_KEY or ZHIPUAI_API_KEY, or llm.api_key in config.toml"
                .into(),
        )
    })?;

    let client = AdbClient::new(&cfg.device);
    let version = client.version().await?;
    tracing::info!(adb = %version, device = client.device_id().unwrap_or("<default>"), "adb ready");

    let device = Arc::new(AdbDevice::new(client, &cfg.device));
    let hooks = Arc::new(ConsoleHooks);
    let executor = ActionExecutor::new(device.clone(), hooks.clone(), hooks)
        .with_type_settle(Duration::from_millis(cfg.device.type_settle_ms));
    let model = Arc::new(OpenAiCompatibleProvider::new(cfg.llm.clone(), api_key)?);

    let mut agent = PhoneAgent::new(AgentConfig::from_section(&cfg.agent), device, model, executor);
    if cfg.agent.record_session {
        agent = agent.with_session_history(SessionHistory::new());
    }
    Ok(agent)
}

/// Ctrl-C stops the run after the current step.
fn spawn_interrupt_listener(stop: StopHandle) {
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            if stop.is_stopped() {
                tracing::warn!("second interrupt; exiting");
                std::process::exit(130);
            }
            tracing::warn!("interrupt received; stopping after the current step");
            stop.stop();
        }
    });
}

fn report(outcome: &RunOutcome, lang: Lang) {
    let msgs = prompts::messages(lang);
    let mark = if outcome.is_success() { "✅" } else { "❌" };
    println!(
        "\n{mark} {}: {} ({} steps)",
        msgs.task_completed,
        outcome.message(),
        outcome.steps()
    );
}
