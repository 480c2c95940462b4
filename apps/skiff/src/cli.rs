use clap::{Args, Parser, Subcommand, ValueEnum};
use skiff_client::Action;
use std::path::PathBuf;

use crate::telemetry::{LogConfig, LogLevel};

#[derive(Parser, Debug)]
#[command(
    name = "skiff",
    about = "Manage Skiff applications from the terminal",
    author,
    version
)]
pub struct Cli {
    #[arg(
        long,
        global = true,
        env = "SKIFF_HOST",
        value_name = "URL",
        help = "Platform API host (defaults to the profile's host, then https://api.skiff.dev)"
    )]
    pub host: Option<String>,

    #[arg(
        long = "profile",
        global = true,
        env = "SKIFF_PROFILE",
        value_name = "PROFILE",
        help = "Select the stored credentials profile to use for this command"
    )]
    pub profile: Option<String>,

    #[arg(
        long,
        global = true,
        env = "SKIFF_USER",
        value_name = "EMAIL",
        help = "Account to authenticate as, overriding the stored profile"
    )]
    pub user: Option<String>,

    #[arg(
        long = "api-key",
        global = true,
        env = "SKIFF_API_KEY",
        value_name = "KEY",
        hide_env_values = true,
        help = "API key to authenticate with, overriding the stored profile"
    )]
    pub api_key: Option<String>,

    #[command(flatten)]
    pub logging: LoggingArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args, Debug, Clone)]
pub struct LoggingArgs {
    #[arg(
        long = "log-level",
        value_enum,
        global = true,
        env = "SKIFF_LOG_LEVEL",
        default_value_t = LogLevel::Warn,
        help = "Minimum log level (error, warn, info, debug, trace)"
    )]
    pub level: LogLevel,

    #[arg(
        long = "log-file",
        value_name = "PATH",
        global = true,
        env = "SKIFF_LOG_FILE",
        help = "Write logs to the specified file instead of stderr"
    )]
    pub file: Option<PathBuf>,
}

impl LoggingArgs {
    pub fn to_config(&self) -> LogConfig {
        LogConfig {
            level: self.level,
            file: self.file.clone(),
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Manage stored credentials and profiles
    #[command(subcommand)]
    Auth(AuthCommand),
    /// List your applications
    Apps,
    /// Show details of an application
    Info(AppArgs),
    /// Create a new application
    Create(CreateArgs),
    /// Permanently destroy an application
    Destroy(DestroyArgs),
    /// Rename an application
    Rename(RenameArgs),
    /// Run a command on the platform, streaming its output
    Run(RunArgs),
    /// Evaluate console commands against an application
    Console(ConsoleArgs),
    /// List the processes of an application
    Ps(AppArgs),
    /// Restart processes of an application
    Restart(RestartArgs),
    /// Scale process types, e.g. `web=3 worker=1`
    Scale(ScaleArgs),
    /// Bring a single process up, down, or bounce it
    Process(ProcessArgs),
    /// Fetch recent log output
    Logs(LogsArgs),
    /// Show config vars
    Config(AppArgs),
    /// Set config vars, e.g. `RACK_ENV=production`
    ConfigSet(ConfigSetArgs),
    /// Remove config vars
    ConfigUnset(ConfigUnsetArgs),
    /// List releases
    Releases(AppArgs),
    /// Roll back to a release (the previous one by default)
    Rollback(RollbackArgs),
    /// Turn maintenance mode on or off
    Maintenance(MaintenanceArgs),
}

#[derive(Subcommand, Debug)]
pub enum AuthCommand {
    /// Store credentials for a profile
    Login(AuthLoginArgs),
    /// Remove a stored profile
    Logout(AuthLogoutArgs),
    /// Show stored profiles
    Status,
}

#[derive(Args, Debug)]
pub struct AuthLoginArgs {
    #[arg(
        long = "name",
        value_name = "PROFILE",
        help = "Profile name to create or update (defaults to 'default')"
    )]
    pub profile: Option<String>,

    #[arg(
        long = "set-current",
        action = clap::ArgAction::SetTrue,
        help = "Make this profile the current one"
    )]
    pub set_current: bool,
}

#[derive(Args, Debug)]
pub struct AuthLogoutArgs {
    #[arg(
        long = "name",
        value_name = "PROFILE",
        help = "Profile to remove (defaults to the current profile)"
    )]
    pub profile: Option<String>,
}

#[derive(Args, Debug)]
pub struct AppArgs {
    #[arg(value_name = "APP")]
    pub app: String,
}

#[derive(Args, Debug)]
pub struct CreateArgs {
    #[arg(value_name = "NAME", help = "Application name (generated when omitted)")]
    pub name: Option<String>,

    #[arg(long, value_name = "STACK")]
    pub stack: Option<String>,

    #[arg(long, help = "Return without waiting for provisioning to finish")]
    pub no_wait: bool,
}

#[derive(Args, Debug)]
pub struct DestroyArgs {
    #[arg(value_name = "APP")]
    pub app: String,

    #[arg(
        long,
        value_name = "APP",
        required = true,
        help = "Repeat the application name to confirm"
    )]
    pub confirm: String,
}

#[derive(Args, Debug)]
pub struct RenameArgs {
    #[arg(value_name = "APP")]
    pub app: String,

    #[arg(value_name = "NEW_NAME")]
    pub new_name: String,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    #[arg(value_name = "APP")]
    pub app: String,

    #[arg(long, help = "Start the command without attaching to its output")]
    pub detach: bool,

    // everything after `--`
    #[arg(trailing_var_arg = true, required = true, value_name = "COMMAND")]
    pub command: Vec<String>,
}

#[derive(Args, Debug)]
pub struct ConsoleArgs {
    #[arg(value_name = "APP")]
    pub app: String,

    #[arg(
        trailing_var_arg = true,
        value_name = "COMMAND",
        help = "Evaluate once and exit; without it commands are read from stdin"
    )]
    pub command: Vec<String>,
}

#[derive(Args, Debug)]
pub struct RestartArgs {
    #[arg(value_name = "APP")]
    pub app: String,

    #[arg(long = "type", value_name = "TYPE", conflicts_with = "process")]
    pub process_type: Option<String>,

    #[arg(long = "ps", value_name = "PROCESS")]
    pub process: Option<String>,
}

#[derive(Args, Debug)]
pub struct ScaleArgs {
    #[arg(value_name = "APP")]
    pub app: String,

    #[arg(value_name = "TYPE=N", required = true, value_parser = parse_scale)]
    pub changes: Vec<(String, u32)>,
}

#[derive(Clone, Copy, Debug, ValueEnum, PartialEq, Eq)]
pub enum ProcessAction {
    Up,
    Down,
    Bounce,
}

impl From<ProcessAction> for Action {
    fn from(value: ProcessAction) -> Self {
        match value {
            ProcessAction::Up => Action::Up,
            ProcessAction::Down => Action::Down,
            ProcessAction::Bounce => Action::Bounce,
        }
    }
}

#[derive(Args, Debug)]
pub struct ProcessArgs {
    #[arg(value_name = "APP")]
    pub app: String,

    #[arg(value_name = "UPID")]
    pub upid: String,

    #[arg(value_enum)]
    pub action: ProcessAction,
}

#[derive(Args, Debug)]
pub struct LogsArgs {
    #[arg(value_name = "APP")]
    pub app: String,

    #[arg(short = 'n', long = "num", value_name = "LINES")]
    pub num: Option<u32>,

    #[arg(long = "ps", value_name = "PROCESS")]
    pub process: Option<String>,

    #[arg(long, value_name = "SOURCE")]
    pub source: Option<String>,

    #[arg(long, help = "Show output of scheduled jobs instead")]
    pub cron: bool,
}

#[derive(Args, Debug)]
pub struct ConfigSetArgs {
    #[arg(value_name = "APP")]
    pub app: String,

    #[arg(value_name = "KEY=VALUE", required = true, value_parser = parse_var)]
    pub vars: Vec<(String, String)>,
}

#[derive(Args, Debug)]
pub struct ConfigUnsetArgs {
    #[arg(value_name = "APP")]
    pub app: String,

    #[arg(value_name = "KEY", required = true)]
    pub keys: Vec<String>,
}

#[derive(Args, Debug)]
pub struct RollbackArgs {
    #[arg(value_name = "APP")]
    pub app: String,

    #[arg(value_name = "RELEASE")]
    pub release: Option<String>,
}

#[derive(Clone, Copy, Debug, ValueEnum, PartialEq, Eq)]
pub enum Toggle {
    On,
    Off,
}

#[derive(Args, Debug)]
pub struct MaintenanceArgs {
    #[arg(value_name = "APP")]
    pub app: String,

    #[arg(value_enum)]
    pub mode: Toggle,
}

fn parse_scale(raw: &str) -> Result<(String, u32), String> {
    let (kind, qty) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected TYPE=N, got '{raw}'"))?;
    if kind.is_empty() {
        return Err(format!("missing process type in '{raw}'"));
    }
    let qty = qty
        .parse()
        .map_err(|_| format!("'{qty}' is not a process count"))?;
    Ok((kind.to_string(), qty))
}

fn parse_var(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{raw}'")),
    }
}
