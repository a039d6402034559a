mod client;
mod config;
mod render;

use crate::client::{FortiClient, parse_query};
use crate::config::{Config, Scope};
use crate::render::{RenderOptions, render_document};
use anyhow::{Context, Result, anyhow, bail};
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use reqwest::Method;
use serde_json::Value;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::process::ExitCode;
use std::{env, fs, io, path::PathBuf};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "fgtctl",
    version,
    about = "CLI for the FortiGate REST API",
    after_help = "Examples:\n  \
        fgtctl -i 192.168.1.99 -k <key> get /cmdb/firewall/address -q vdom=root\n  \
        fgtctl -c fgt.ini post /cmdb/firewall/address -d '{\"name\":\"h1\",\"subnet\":\"10.1.1.1/32\"}'\n  \
        fgtctl -f json get /monitor/system/resource/usage"
)]
struct Cli {
    #[arg(
        short = 'c',
        long,
        global = true,
        value_name = "FILE",
        help = "Configuration file (JSON, INI or YAML)"
    )]
    config: Option<PathBuf>,

    #[arg(
        short = 'i',
        long,
        visible_alias = "ip",
        global = true,
        value_name = "HOST",
        help = "FortiGate address or hostname, optionally with :port"
    )]
    host: Option<String>,

    #[arg(
        short = 'u',
        long,
        global = true,
        value_name = "USER",
        help = "Username for password login (default: admin)"
    )]
    username: Option<String>,

    #[arg(short = 'p', long, global = true, value_name = "PASS")]
    password: Option<String>,

    #[arg(
        short = 'k',
        long,
        global = true,
        value_name = "KEY",
        help = "REST API key (takes precedence over a password)"
    )]
    apikey: Option<String>,

    #[arg(long, global = true, help = "Use HTTP instead of HTTPS")]
    no_ssl: bool,

    #[arg(long, global = true, help = "Verify TLS certificates")]
    verify_ssl: bool,

    #[arg(
        long,
        global = true,
        value_name = "SEC",
        help = "Request timeout in seconds (default: 300)"
    )]
    timeout: Option<u64>,

    #[arg(long, global = true, help = "Log requests and rendering decisions to stderr")]
    debug: bool,

    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value_t = OutputFormat::Table,
        global = true,
        help = "Output format"
    )]
    format: OutputFormat,

    #[arg(
        long,
        value_name = "COL1,COL2",
        global = true,
        help = "Explicit table columns (comma-separated)"
    )]
    table_fields: Option<String>,

    #[arg(
        long,
        value_name = "N",
        global = true,
        help = "Truncate table cells to N characters (0 = no limit)"
    )]
    max_width: Option<usize>,

    #[arg(
        long,
        value_name = "N",
        global = true,
        help = "Cap auto-detected table columns (default: 6, 0 = unlimited)"
    )]
    max_fields: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    /// Connection settings given on the command line.
    fn overrides(&self) -> Config {
        Config {
            host: self.host.clone(),
            username: self.username.clone(),
            password: self.password.clone(),
            apikey: self.apikey.clone(),
            verify_tls: self.verify_ssl.then_some(true),
            use_ssl: self.no_ssl.then_some(false),
            timeout: self.timeout,
        }
    }

    fn render_options(&self, endpoint: &str) -> RenderOptions {
        RenderOptions {
            endpoint: Some(endpoint.to_string()),
            custom_fields: self.table_fields.as_deref().map(parse_fields),
            max_cell_width: self.max_width,
            max_fields: self.max_fields,
            now: None,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Read a resource
    Get(RequestArgs),
    /// Create a resource
    Post(RequestArgs),
    /// Update a resource
    Put(RequestArgs),
    /// Delete a resource
    Delete(RequestArgs),
    /// Persist the connection flags given on this invocation
    Configure {
        #[arg(
            long,
            value_enum,
            default_value_t = ScopeArg::User,
            help = "Where to write the config (local project dir or user config dir)"
        )]
        scope: ScopeArg,
    },
    /// Show the merged configuration (secrets masked)
    ConfigShow,
    /// Generate shell completion scripts
    Completion {
        #[arg(value_enum)]
        shell: CompletionShell,
    },
}

#[derive(Args)]
struct RequestArgs {
    #[arg(value_name = "ENDPOINT", help = "API path, e.g. /cmdb/firewall/address")]
    endpoint: String,

    #[arg(
        short = 'd',
        long,
        value_name = "JSON",
        conflicts_with = "data_file",
        help = "Request body as a JSON string"
    )]
    data: Option<String>,

    #[arg(long, value_name = "FILE", help = "Read the request body from a JSON file")]
    data_file: Option<PathBuf>,

    #[arg(
        short = 'q',
        long = "query",
        value_name = "PARAM",
        help = "Query parameter as key=value (repeatable)"
    )]
    query: Vec<String>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum CompletionShell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
}

#[derive(Clone, Copy, Debug, ValueEnum, PartialEq, Eq)]
enum OutputFormat {
    /// Adaptive ASCII tables
    Table,
    /// Compact JSON
    Json,
    /// Indented JSON
    Pretty,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ScopeArg {
    Local,
    User,
}

impl From<ScopeArg> for Scope {
    fn from(value: ScopeArg) -> Self {
        match value {
            ScopeArg::Local => Scope::Local,
            ScopeArg::User => Scope::User,
        }
    }
}

fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("fgtctl=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.debug);
    let cwd = env::current_dir().context("reading current directory")?;

    match &cli.command {
        Commands::Get(args) => run_request(&cli, &cwd, Method::GET, args),
        Commands::Post(args) => run_request(&cli, &cwd, Method::POST, args),
        Commands::Put(args) => run_request(&cli, &cwd, Method::PUT, args),
        Commands::Delete(args) => run_request(&cli, &cwd, Method::DELETE, args),
        Commands::Configure { scope } => {
            let updates = cli.overrides();
            if updates == Config::default() {
                bail!("nothing to save; pass --host, --apikey, --password or other connection flags");
            }
            let existing = config::load_scope((*scope).into(), &cwd)?;
            let path = config::save((*scope).into(), &config::merge(existing, updates), &cwd)?;
            println!("Saved connection settings to {}", path.display());
            Ok(ExitCode::SUCCESS)
        }
        Commands::ConfigShow => {
            let mut merged = config::load(&cwd)?;
            if let Some(path) = &cli.config {
                merged = config::merge(merged, config::load_file(path)?);
            }
            let merged = config::merge(merged, cli.overrides());
            println!("{}", serde_json::to_string_pretty(&merged.masked())?);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Completion { shell } => {
            use clap_complete::{generate, shells};
            let mut cmd = Cli::command();
            let bin = cmd.get_name().to_string();
            let mut out = io::stdout();
            match shell {
                CompletionShell::Bash => generate(shells::Bash, &mut cmd, bin, &mut out),
                CompletionShell::Zsh => generate(shells::Zsh, &mut cmd, bin, &mut out),
                CompletionShell::Fish => generate(shells::Fish, &mut cmd, bin, &mut out),
                CompletionShell::PowerShell => {
                    generate(shells::PowerShell, &mut cmd, bin, &mut out)
                }
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn run_request(cli: &Cli, cwd: &Path, method: Method, args: &RequestArgs) -> Result<ExitCode> {
    let conn = config::resolve(cwd, cli.config.as_deref(), cli.overrides())?;
    let body = parse_body(&args.data, &args.data_file)?;
    let query = parse_query(&args.query);

    let mut client = FortiClient::new(&conn).context("creating FortiGate client")?;
    let (status, response) = client.perform_request(method, &args.endpoint, body.as_ref(), &query);
    if let Err(err) = client.logout() {
        debug!(error = %err, "logout failed");
    }

    eprintln!("Status Code: {status}");
    print_response(cli, &args.endpoint, &response)?;
    Ok(ExitCode::from(exit_status(status, &response)))
}

fn print_response(cli: &Cli, endpoint: &str, response: &Value) -> Result<()> {
    match cli.format {
        OutputFormat::Json => println!("{}", serde_json::to_string(response)?),
        OutputFormat::Pretty => println!("{}", serde_json::to_string_pretty(response)?),
        OutputFormat::Table => {
            let opts = cli.render_options(endpoint);
            match panic::catch_unwind(AssertUnwindSafe(|| render_document(response, &opts))) {
                Ok(doc) => {
                    print!("{}", doc.render());
                    if !doc.has_tables()
                        && let Some(raw) = raw_body(response)?
                    {
                        println!("{raw}");
                    }
                }
                Err(_) => {
                    warn!(endpoint, "table rendering failed, showing JSON instead");
                    println!("{}", serde_json::to_string_pretty(response)?);
                }
            }
        }
    }
    Ok(())
}

/// Body shown under a diagnostic when no table could be built. Text bodies
/// are printed as received.
fn raw_body(response: &Value) -> Result<Option<String>> {
    match response {
        Value::Null => Ok(None),
        Value::String(text) => Ok(Some(text.clone())),
        other => Ok(Some(serde_json::to_string_pretty(other)?)),
    }
}

/// 1 for local failures, 2 for HTTP or appliance-reported errors.
fn exit_status(status: i32, response: &Value) -> u8 {
    let api_error = response
        .get("status")
        .and_then(Value::as_str)
        .is_some_and(|s| s == "error");
    if status < 0 {
        1
    } else if status >= 400 || api_error {
        2
    } else {
        0
    }
}

fn parse_fields(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_body(data: &Option<String>, data_file: &Option<PathBuf>) -> Result<Option<Value>> {
    match (data, data_file) {
        (Some(inline), None) => {
            let value = serde_json::from_str(inline).context("parsing --data as JSON")?;
            Ok(Some(value))
        }
        (None, Some(path)) => {
            let content = fs::read_to_string(path)
                .with_context(|| format!("reading data file {}", path.display()))?;
            let value = serde_json::from_str(&content).context("parsing --data-file as JSON")?;
            Ok(Some(value))
        }
        (None, None) => Ok(None),
        (Some(_), Some(_)) => Err(anyhow!("use only one of --data or --data-file")),
    }
}
