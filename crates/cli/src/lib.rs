use agentconf_synth::ConfigService;
use agentconf_topology::{FileTopologyProvider, InstrumentationPolicy, ProjectId};
use anyhow::{Context as AnyhowContext, Result};
use clap::{Args, Parser, Subcommand};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

mod http_api;
mod settings;

use settings::{Overrides, Settings};

fn print_stdout(text: &str) -> Result<()> {
    use std::io::Write;

    let mut stdout = io::stdout().lock();
    if let Err(err) = stdout
        .write_all(text.as_bytes())
        .and_then(|_| stdout.write_all(b"\n"))
        .and_then(|_| stdout.flush())
    {
        if err.kind() == io::ErrorKind::BrokenPipe {
            return Ok(());
        }
        return Err(err.into());
    }
    Ok(())
}

#[derive(Parser)]
#[command(name = "agentconf")]
#[command(about = "Monitoring agent instrumentation from topology snapshots", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors (stdout is reserved for JSON)
    #[arg(long, global = true)]
    quiet: bool,

    /// Settings file (overrides AGENTCONF_CONFIG and ./agentconf.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Snapshot store root (overrides AGENTCONF_DATA_DIR)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Instrumentation policy file, JSON or TOML (default: built-in policy)
    #[arg(long, global = true)]
    policy: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the agent config for one project as JSON
    Synthesize(SynthesizeArgs),

    /// Validate and print the effective instrumentation policy
    Policy(PolicyArgs),

    /// Serve agent configs over HTTP (GET /v1/config)
    ServeHttp(ServeArgs),
}

#[derive(Args)]
struct SynthesizeArgs {
    /// Project id
    #[arg(long)]
    project: String,

    /// Pretty-print JSON
    #[arg(long)]
    pretty: bool,
}

#[derive(Args)]
struct PolicyArgs {
    /// Pretty-print JSON
    #[arg(long)]
    pretty: bool,
}

#[derive(Args)]
struct ServeArgs {
    /// Address to bind (default from settings, then 127.0.0.1:8787)
    #[arg(long)]
    bind: Option<String>,
}

pub async fn main_entry() -> Result<()> {
    let mut cli = Cli::parse();

    // JSON commands keep stdout clean
    if matches!(cli.command, Commands::Synthesize(_) | Commands::Policy(_)) {
        cli.quiet = true;
    }
    init_logging(cli.verbose, cli.quiet);

    let bind = match &cli.command {
        Commands::ServeHttp(args) => args.bind.clone(),
        _ => None,
    };
    let settings = Settings::load(Overrides {
        config: cli.config.clone(),
        data_dir: cli.data_dir.clone(),
        policy: cli.policy.clone(),
        bind,
    })?;
    let policy = Arc::new(load_policy(&settings)?);

    match cli.command {
        Commands::Synthesize(args) => run_synthesize(args, &settings, policy).await,
        Commands::Policy(args) => run_policy(args, &policy),
        Commands::ServeHttp(_) => serve_http(&settings, policy).await,
    }
}

fn init_logging(verbose: bool, quiet: bool) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();
}

fn load_policy(settings: &Settings) -> Result<InstrumentationPolicy> {
    match &settings.policy {
        Some(path) => {
            log::debug!("Loading policy from {}", path.display());
            InstrumentationPolicy::load(path).context("Failed to load instrumentation policy")
        }
        None => InstrumentationPolicy::builtin().context("Built-in policy is invalid"),
    }
}

fn config_service(
    settings: &Settings,
    policy: Arc<InstrumentationPolicy>,
) -> ConfigService<FileTopologyProvider> {
    let provider = FileTopologyProvider::new(settings.data_dir.clone())
        .with_default_integrations(settings.integrations.clone());
    ConfigService::new(provider, policy)
}

fn to_json<T: serde::Serialize>(value: &T, pretty: bool) -> Result<String> {
    let text = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    Ok(text)
}

async fn run_synthesize(
    args: SynthesizeArgs,
    settings: &Settings,
    policy: Arc<InstrumentationPolicy>,
) -> Result<()> {
    let service = config_service(settings, policy);
    let project = ProjectId::new(args.project);
    let config = service
        .agent_config(&project)
        .await
        .with_context(|| format!("Failed to build agent config for project {project}"))?;
    print_stdout(&to_json(&config, args.pretty)?)
}

fn run_policy(args: PolicyArgs, policy: &InstrumentationPolicy) -> Result<()> {
    print_stdout(&to_json(policy, args.pretty)?)
}

async fn serve_http(settings: &Settings, policy: Arc<InstrumentationPolicy>) -> Result<()> {
    let service = Arc::new(config_service(settings, policy));
    let app = http_api::router(service);

    let listener = tokio::net::TcpListener::bind(&settings.bind)
        .await
        .with_context(|| format!("Failed to bind {}", settings.bind))?;
    let local_addr = listener.local_addr()?;
    let base_url = format!("http://{local_addr}");

    log::info!("Snapshot store: {}", settings.data_dir.display());
    print_stdout(&format!("Serving agent config: {base_url}/v1/config"))?;
    print_stdout(&format!("Health endpoint: {base_url}/health"))?;
    print_stdout(&format!(
        "Try: curl -H '{}: <project>' {base_url}/v1/config",
        http_api::API_KEY_HEADER
    ))?;

    axum::serve(listener, app)
        .await
        .context("HTTP server failed")?;
    Ok(())
}
