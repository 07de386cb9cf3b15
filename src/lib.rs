pub mod cli;
pub mod config;
pub mod http;
pub mod llm;
pub mod logging;
pub mod orchestrator;
pub mod payload;
pub mod render;
pub mod server;
pub mod tools;
pub mod trace;

use anyhow::{Result, anyhow};
use cli::theme::Theme;
use cli::{ChatSession, CliArgs, Command, ExplainFormat, ToolRunner, read_input};
use config::AppConfig;
use http::{HttpClient, HttpDebugConfig};
use orchestrator::Orchestrator;
use orchestrator::backoff::RetryPolicy;
use std::io::IsTerminal;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use trace::SessionTrace;

pub async fn run(args: CliArgs) -> Result<()> {
    let mut config = AppConfig::load_with_path(args.config.as_deref())?;
    apply_cli_overrides(&mut config, &args);

    let (default_filter, log_dir) = match &args.command {
        Command::Serve { log_dir, .. } => ("info", log_dir.as_deref()),
        _ => ("warn", None),
    };
    let _logging = logging::init(default_filter, log_dir)?;

    let trace = if args.trace {
        let trace = SessionTrace::create(&generate_session_id())?;
        tracing::info!(path = %trace.file_path().display(), "session trace enabled");
        Some(trace)
    } else {
        None
    };
    let http = build_http_client(&config, args.verbose, trace.clone())?;
    let theme = Theme::from_config(colors_enabled(), &config.theme);
    let mut stdout = std::io::stdout();

    match args.command {
        Command::Serve { port, .. } => {
            server::serve(&config, http, port.unwrap_or(config.port)).await
        }
        Command::Explain { file, html } => {
            let orchestrator = build_orchestrator(&config, http)?;
            let code = read_input(file.as_deref()).await?;
            let format = if html {
                ExplainFormat::Html
            } else {
                ExplainFormat::Terminal
            };
            ToolRunner::new(&orchestrator, theme, trace)
                .explain(&code, format, &mut stdout)
                .await
        }
        Command::Refactor { instruction, file } => {
            let orchestrator = build_orchestrator(&config, http)?;
            let code = read_input(file.as_deref()).await?;
            ToolRunner::new(&orchestrator, theme, trace)
                .refactor(&code, &instruction, &mut stdout)
                .await
        }
        Command::Generate { prompt } => {
            let orchestrator = build_orchestrator(&config, http)?;
            ToolRunner::new(&orchestrator, theme, trace)
                .generate(&prompt.join(" "), &mut stdout)
                .await
        }
        Command::Chat => {
            let orchestrator = build_orchestrator(&config, http)?;
            let input = tokio::io::BufReader::new(tokio::io::stdin());
            ChatSession::new(&orchestrator, theme, trace)
                .run(input, &mut stdout)
                .await
        }
    }
}

fn apply_cli_overrides(config: &mut AppConfig, args: &CliArgs) {
    if let Some(endpoint) = &args.endpoint {
        config.endpoint = endpoint.clone();
    }
    if let Some(max_attempts) = args.max_attempts {
        config.max_attempts = max_attempts;
    }
}

fn build_http_client(
    config: &AppConfig,
    verbose: bool,
    trace: Option<SessionTrace>,
) -> Result<HttpClient> {
    let inner = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .build()
        .map_err(|err| anyhow!("Failed to build HTTP client: {err}"))?;
    let http = HttpClient::new(inner, HttpDebugConfig::from_verbose(verbose));
    Ok(match trace {
        Some(trace) => http.with_trace(trace),
        None => http,
    })
}

fn build_orchestrator(config: &AppConfig, http: HttpClient) -> Result<Orchestrator> {
    Orchestrator::new(
        http,
        config.endpoint.as_str(),
        RetryPolicy::with_max_attempts(config.max_attempts),
    )
    .map_err(|err| anyhow!("Invalid backend settings: {err}"))
}

fn colors_enabled() -> bool {
    std::env::var_os("NO_COLOR").is_none() && std::io::stdout().is_terminal()
}

fn generate_session_id() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |duration| duration.as_millis());
    format!("{millis:x}-{:x}", std::process::id())
}
