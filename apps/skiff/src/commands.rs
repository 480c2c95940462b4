use anyhow::{anyhow, bail, Context, Result};
use skiff_client::api::{App, LogOptions, NewApp, ProcessInfo, ProcessSelector, Release};
use skiff_client::{Action, Client, ClientConfig, ClientError, Credentials, ScopedConsole, DEFAULT_HOST};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::io::{self, BufRead, Write};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::cli::{
    AuthCommand, AuthLoginArgs, AuthLogoutArgs, Cli, Command, ConsoleArgs, CreateArgs, LogsArgs,
    RestartArgs, RunArgs, Toggle,
};
use crate::credentials::{CredentialsError, CredentialsStore, StoredProfile, DEFAULT_PROFILE};

pub async fn dispatch(cli: Cli) -> Result<()> {
    let Cli {
        host,
        profile,
        user,
        api_key,
        command,
        ..
    } = cli;
    match command {
        Command::Auth(auth) => run_auth(auth, host, user, api_key),
        command => {
            let store = CredentialsStore::load()?;
            let (credentials, profile_host) =
                resolve_login(&store, profile.as_deref(), user, api_key)?;
            let host = host
                .or(profile_host)
                .unwrap_or_else(|| DEFAULT_HOST.to_string());
            let client = connect(&host, credentials)?;
            execute(&client, command).await
        }
    }
}

fn connect(host: &str, credentials: Credentials) -> Result<Client> {
    let config = ClientConfig::new(host)?
        .with_credentials(Some(credentials))
        .with_user_agent(format!("skiff/{}", env!("CARGO_PKG_VERSION")));
    let client = Client::new(config)?;
    client.on_warning(|warning| eprintln!(" !    {warning}"));
    tracing::debug!(target: "skiff::cli", host, "client ready");
    Ok(client)
}

/// Flags override the stored profile field by field; both flags together
/// need no stored profile at all.
fn resolve_login(
    store: &CredentialsStore,
    profile: Option<&str>,
    user: Option<String>,
    api_key: Option<String>,
) -> Result<(Credentials, Option<String>), CredentialsError> {
    if let (Some(user), Some(api_key)) = (&user, &api_key) {
        let host = profile
            .and_then(|name| store.profile(name))
            .and_then(|stored| stored.host.clone());
        return Ok((Credentials::new(user.clone(), api_key.clone()), host));
    }
    let (_, stored) = store.resolve(profile)?;
    let credentials = Credentials::new(
        user.unwrap_or_else(|| stored.user.clone()),
        api_key.unwrap_or_else(|| stored.api_key.clone()),
    );
    Ok((credentials, stored.host.clone()))
}

fn run_auth(
    command: AuthCommand,
    host: Option<String>,
    user: Option<String>,
    api_key: Option<String>,
) -> Result<()> {
    let mut store = CredentialsStore::load()?;
    match command {
        AuthCommand::Login(AuthLoginArgs {
            profile,
            set_current,
        }) => {
            let name = profile.unwrap_or_else(|| DEFAULT_PROFILE.to_string());
            let user = match user {
                Some(user) => user,
                None => prompt_line("Email: ")?,
            };
            let api_key = match api_key {
                Some(key) => key,
                None => rpassword::prompt_password("API key: ")
                    .context("failed to read API key")?,
            };
            if user.is_empty() || api_key.trim().is_empty() {
                bail!("both an email and an API key are required");
            }
            store.upsert_profile(
                name.clone(),
                StoredProfile {
                    user: user.clone(),
                    api_key: api_key.trim().to_string(),
                    host,
                },
                set_current,
            );
            store.save()?;
            println!("Logged in as {user} (profile '{name}')");
        }
        AuthCommand::Logout(AuthLogoutArgs { profile }) => {
            let name = match profile.or_else(|| store.current_profile.clone()) {
                Some(name) => name,
                None => bail!(CredentialsError::NotLoggedIn),
            };
            if store.remove_profile(&name).is_none() {
                bail!(CredentialsError::ProfileNotFound(name));
            }
            store.save()?;
            println!("Removed profile '{name}'");
        }
        AuthCommand::Status => print!("{}", format_profiles(&store)),
    }
    Ok(())
}

fn prompt_line(prompt: &str) -> Result<String> {
    eprint!("{prompt}");
    io::stderr().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

async fn execute(client: &Client, command: Command) -> Result<()> {
    match command {
        Command::Auth(_) => bail!("auth commands run without a platform client"),
        Command::Apps => {
            for app in client.list_apps().await? {
                println!("{}", app.name);
            }
        }
        Command::Info(args) => print!("{}", format_app(&client.app_info(&args.app).await?)),
        Command::Create(args) => create(client, args).await?,
        Command::Destroy(args) => {
            if args.confirm != args.app {
                bail!(
                    "confirmation '{}' does not match '{}'; nothing destroyed",
                    args.confirm,
                    args.app
                );
            }
            client.destroy_app(&args.app).await?;
            println!("Destroyed {}", args.app);
        }
        Command::Rename(args) => {
            client.rename_app(&args.app, &args.new_name).await?;
            println!("Renamed {} to {}", args.app, args.new_name);
        }
        Command::Run(args) => run(client, args).await?,
        Command::Console(args) => console(client, args).await?,
        Command::Ps(args) => print!("{}", format_ps(&client.ps(&args.app).await?)),
        Command::Restart(args) => restart(client, args).await?,
        Command::Scale(args) => {
            for (kind, qty) in args.changes {
                let running = client.ps_scale(&args.app, &kind, qty).await?;
                println!("Scaled {kind} processes, now running {running}");
            }
        }
        Command::Process(args) => {
            let action: Action = args.action.into();
            client.process(&args.app, &args.upid).transition(action).await?;
            println!("Sent {} to process {}", action.as_str(), args.upid);
        }
        Command::Logs(args) => logs(client, args).await?,
        Command::Config(args) => print!("{}", format_config(&client.config_vars(&args.app).await?)),
        Command::ConfigSet(args) => {
            let vars: BTreeMap<String, String> = args.vars.into_iter().collect();
            client.add_config_vars(&args.app, &vars).await?;
            print!("{}", format_config(&vars));
        }
        Command::ConfigUnset(args) => {
            for key in &args.keys {
                client.remove_config_var(&args.app, key).await?;
                println!("Unset {key}");
            }
        }
        Command::Releases(args) => print!("{}", format_releases(&client.releases(&args.app).await?)),
        Command::Rollback(args) => {
            let release = client.rollback(&args.app, args.release.as_deref()).await?;
            println!("Rolled back {} to {}", args.app, release.trim());
        }
        Command::Maintenance(args) => {
            let enabled = args.mode == Toggle::On;
            client.set_maintenance(&args.app, enabled).await?;
            println!(
                "Maintenance mode {} for {}",
                if enabled { "enabled" } else { "disabled" },
                args.app
            );
        }
    }
    Ok(())
}

async fn create(client: &Client, args: CreateArgs) -> Result<()> {
    let app = client
        .create_app(NewApp {
            name: args.name,
            stack: args.stack,
        })
        .await?;
    if !args.no_wait {
        eprint!("Creating {}...", app.name);
        client.wait_until_created(&app.name).await?;
        eprintln!(" done");
    }
    println!("Created {}", app.name);
    if let (Some(web), Some(git)) = (&app.web_url, &app.git_url) {
        println!("{web} | {git}");
    }
    Ok(())
}

async fn run(client: &Client, args: RunArgs) -> Result<()> {
    let command = args.command.join(" ");
    if args.detach {
        let session = client.start_service(&args.app, &command, false).await?;
        match session.process() {
            Some(process) => println!("Running `{command}` detached, process {}", process.upid()),
            None => println!("Running `{command}` detached"),
        }
        return Ok(());
    }

    let mut session = client.start_service(&args.app, &command, true).await?;
    let mut stdout = io::stdout();
    session
        .for_each(|chunk| {
            // a closed stdout must not abort the remote command mid-stream
            let _ = stdout.write_all(chunk.as_bytes());
            let _ = stdout.flush();
        })
        .await?;
    Ok(())
}

async fn console(client: &Client, args: ConsoleArgs) -> Result<()> {
    if !args.command.is_empty() {
        let output = client.run_one_off(&args.app, &args.command.join(" ")).await?;
        print!("{output}");
        if !output.ends_with('\n') {
            println!();
        }
        return Ok(());
    }

    let console = client.open_console(&args.app).await?;
    eprintln!(
        "Console for {} ({}), `exit` to leave",
        console.app(),
        console.id()
    );
    let result = console_loop(&console).await;
    let closed = console.close().await;
    result?;
    closed?;
    Ok(())
}

async fn console_loop(console: &ScopedConsole) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let command = line.trim();
        if command.is_empty() {
            continue;
        }
        if matches!(command, "exit" | "quit") {
            break;
        }
        match console.run(command).await {
            Ok(output) => println!("{output}"),
            Err(ClientError::AppCrashed(body)) => return Err(anyhow!("application crashed: {body}")),
            Err(err) => eprintln!(" !    {err}"),
        }
    }
    Ok(())
}

async fn restart(client: &Client, args: RestartArgs) -> Result<()> {
    let selector = match (args.process_type, args.process) {
        (Some(kind), _) => ProcessSelector::Type(kind),
        (None, Some(process)) => ProcessSelector::Process(process),
        (None, None) => {
            client.restart(&args.app).await?;
            println!("Restarted {}", args.app);
            return Ok(());
        }
    };
    client.ps_restart(&args.app, selector).await?;
    println!("Restarted processes of {}", args.app);
    Ok(())
}

async fn logs(client: &Client, args: LogsArgs) -> Result<()> {
    let output = if args.cron {
        client.cron_logs(&args.app).await?
    } else {
        let options = LogOptions {
            num: args.num,
            process: args.process,
            source: args.source,
        };
        client.logs(&args.app, &options).await?
    };
    print!("{output}");
    Ok(())
}

fn format_profiles(store: &CredentialsStore) -> String {
    if store.profiles.is_empty() {
        return "No stored profiles; run `skiff auth login`\n".to_string();
    }
    let mut out = String::new();
    for (name, profile) in &store.profiles {
        let marker = if store.current_profile.as_deref() == Some(name.as_str()) {
            '*'
        } else {
            ' '
        };
        let host = profile.host.as_deref().unwrap_or(DEFAULT_HOST);
        let _ = writeln!(out, "{marker} {name}\t{}\t{host}", profile.user);
    }
    out
}

fn format_app(app: &App) -> String {
    let mut out = format!("=== {}\n", app.name);
    let fields = [
        ("Owner", app.owner.clone()),
        ("Stack", app.stack.clone()),
        ("Web URL", app.web_url.clone()),
        ("Git URL", app.git_url.clone()),
        ("Dynos", app.dynos.map(|n| n.to_string())),
        ("Workers", app.workers.map(|n| n.to_string())),
        ("Repo size", app.repo_size.map(format_bytes)),
        ("Slug size", app.slug_size.map(format_bytes)),
    ];
    for (label, value) in fields {
        if let Some(value) = value {
            let _ = writeln!(out, "{:<10} {value}", format!("{label}:"));
        }
    }
    out
}

fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}

fn format_ps(processes: &[ProcessInfo]) -> String {
    if processes.is_empty() {
        return "No processes running\n".to_string();
    }
    let width = processes.iter().map(|ps| ps.process.len()).max().unwrap_or(0);
    let mut out = String::new();
    for ps in processes {
        let state = ps.state.as_deref().unwrap_or("unknown");
        let command = ps.command.as_deref().unwrap_or("");
        let _ = writeln!(out, "{:<width$}  {state:<8}  {command}", ps.process);
    }
    out
}

fn format_config(vars: &BTreeMap<String, String>) -> String {
    let width = vars.keys().map(String::len).max().unwrap_or(0);
    let mut out = String::new();
    for (key, value) in vars {
        let _ = writeln!(out, "{:<width$}  {value}", format!("{key}:"), width = width + 1);
    }
    out
}

fn format_releases(releases: &[Release]) -> String {
    let mut out = String::new();
    for release in releases.iter().rev() {
        let _ = writeln!(
            out,
            "{:<6} {:<40} {:<24} {}",
            release.name,
            release.descr.as_deref().unwrap_or(""),
            release.user.as_deref().unwrap_or(""),
            release.created_at.as_deref().unwrap_or("")
        );
    }
    out
}
