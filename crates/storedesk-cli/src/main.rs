//! storedesk - command line back office for the store's catalog and staff API.
//!
//! Staff log in with their phone number, then list, inspect, create, edit and
//! delete products, orders, brands, categories, coupons, employees, roles and
//! departments, read audit logs and move orders through their statuses.

mod commands;

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use commands::{Console, Output};
use storedesk_core::{Config, SessionBackend};

/// File name prefix for daily log files
const LOG_FILE_PREFIX: &str = "storedesk.log";

fn entity_arg() -> Arg {
    Arg::new("entity")
        .required(true)
        .help("product, order, brand, category, coupon, employee, role or department")
}

fn id_arg() -> Arg {
    Arg::new("id").required(true).help("Record id")
}

fn input_arg() -> Arg {
    Arg::new("input")
        .required(true)
        .help("JSON file with the record fields, or - to read stdin")
}

fn cli() -> Command {
    Command::new("storedesk")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Back-office console for the store catalog and staff API")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("api-url")
                .long("api-url")
                .global(true)
                .help("Backend base URL (overrides config and STOREDESK_API_URL)"),
        )
        .arg(
            Arg::new("timeout")
                .long("timeout")
                .global(true)
                .value_parser(value_parser!(u64))
                .help("Request timeout in seconds"),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Print raw JSON instead of tables"),
        )
        .arg(
            Arg::new("ephemeral")
                .long("ephemeral")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Keep the session in memory only"),
        )
        .arg(
            Arg::new("log-dir")
                .long("log-dir")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Write logs to daily files in this directory instead of stderr"),
        )
        .subcommand(
            Command::new("login")
                .about("Log in with phone number and password")
                .arg(Arg::new("phone").long("phone").help("Employee phone number"))
                .arg(
                    Arg::new("remember")
                        .long("remember")
                        .action(ArgAction::SetTrue)
                        .help("Store the password in the OS keychain"),
                ),
        )
        .subcommand(
            Command::new("logout")
                .about("Forget the current session")
                .arg(
                    Arg::new("forget")
                        .long("forget")
                        .action(ArgAction::SetTrue)
                        .help("Also remove the password stored with login --remember"),
                )
                .arg(Arg::new("phone").long("phone").help("Phone whose password to forget (default: last login)")),
        )
        .subcommand(Command::new("whoami").about("Show the logged-in employee"))
        .subcommand(
            Command::new("list")
                .about("List records")
                .arg(entity_arg())
                .arg(Arg::new("keyword").long("keyword").short('k').help("Search keyword"))
                .arg(
                    Arg::new("filter")
                        .long("filter")
                        .short('f')
                        .action(ArgAction::Append)
                        .help("Extra query parameter as key=value (repeatable)"),
                ),
        )
        .subcommand(Command::new("get").about("Show one record").arg(entity_arg()).arg(id_arg()))
        .subcommand(
            Command::new("create")
                .about("Create a record")
                .arg(entity_arg())
                .arg(input_arg()),
        )
        .subcommand(
            Command::new("update")
                .about("Update a record; only changed fields are sent")
                .arg(entity_arg())
                .arg(id_arg())
                .arg(input_arg()),
        )
        .subcommand(Command::new("delete").about("Delete a record").arg(entity_arg()).arg(id_arg()))
        .subcommand(Command::new("logs").about("Show the audit log of an entity").arg(entity_arg()))
        .subcommand(
            Command::new("order-status")
                .about("Change an order's status")
                .arg(id_arg())
                .arg(
                    Arg::new("status")
                        .required(true)
                        .help("pending, processing, delivered or cancel"),
                ),
        )
}

/// Initialize the tracing subscriber for logging.
///
/// RUST_LOG controls the level (default "warn"). The returned guard flushes
/// the log file on drop and must live until exit.
fn init_tracing(log_dir: Option<&PathBuf>) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(writer).with_ansi(false))
                .with(filter)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(io::stderr))
                .with(filter)
                .init();
            None
        }
    }
}

/// Config file plus command line overrides
fn effective_config(matches: &ArgMatches) -> Result<Config> {
    let mut config = Config::load().context("Failed to load configuration")?;
    if let Some(url) = matches.get_one::<String>("api-url") {
        config.api_url = url.clone();
    }
    if let Some(secs) = matches.get_one::<u64>("timeout") {
        config.timeout_secs = *secs;
    }
    if matches.get_flag("ephemeral") {
        config.session_backend = SessionBackend::Memory;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let matches = cli().get_matches();
    let _guard = init_tracing(matches.get_one::<PathBuf>("log-dir"));

    let config = effective_config(&matches)?;
    info!(api_url = %config.api_url, timeout = ?Duration::from_secs(config.timeout_secs), "storedesk starting");

    let output = if matches.get_flag("json") {
        Output::Json
    } else {
        Output::Table
    };
    let console = Console::open(config, output).await?;

    let result = match matches.subcommand() {
        Some(("login", args)) => console.login(args).await,
        Some(("logout", args)) => console.logout(args).await,
        Some(("whoami", _)) => console.whoami().await,
        Some(("list", args)) => console.list(args).await,
        Some(("get", args)) => console.get(args).await,
        Some(("create", args)) => console.create(args).await,
        Some(("update", args)) => console.update(args).await,
        Some(("delete", args)) => console.delete(args).await,
        Some(("logs", args)) => console.logs(args).await,
        Some(("order-status", args)) => console.order_status(args).await,
        _ => Ok(()),
    };

    if let Err(ref e) = result {
        if matches.subcommand_name() != Some("login") && commands::needs_login(e) {
            eprintln!("Session expired or missing. Run `storedesk login` first.");
        }
    }
    result
}
