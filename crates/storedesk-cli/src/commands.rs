//! Subcommand handlers.
//!
//! Each handler drives a `MasterDetail` screen (or the client directly for
//! authentication) and prints the result as a table or as JSON.

use std::io::{self, BufRead, Read, Write};
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use clap::ArgMatches;
use serde_json::Value;
use tracing::{info, warn};

use storedesk_core::config::ENV_PASSWORD;
use storedesk_core::utils::{format_cell, render_table};
use storedesk_core::{
    ApiClient, ApiError, Config, CredentialStore, EditOutcome, Entity, ListQuery, MasterDetail,
    Notice, OrderStatus, Record, RecordId, SessionManager,
};

/// Maximum columns in list output
const MAX_TABLE_COLUMNS: usize = 8;

/// Maximum characters per table cell
const MAX_CELL_WIDTH: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Output {
    Table,
    Json,
}

pub struct Console {
    config: Config,
    client: ApiClient,
    output: Output,
}

/// True when the error means the user has to log in again
pub fn needs_login(error: &anyhow::Error) -> bool {
    error
        .chain()
        .any(|cause| cause.downcast_ref::<ApiError>().is_some_and(ApiError::requires_login))
}

/// Build the list query from `--keyword` and `--filter key=value` arguments
pub fn list_query(args: &ArgMatches) -> Result<ListQuery> {
    let mut query = ListQuery::new();
    if let Some(keyword) = args.get_one::<String>("keyword") {
        query = query.with_keyword(keyword);
    }
    for filter in args.get_many::<String>("filter").into_iter().flatten() {
        let (key, value) = filter
            .split_once('=')
            .filter(|(key, _)| !key.trim().is_empty())
            .ok_or_else(|| anyhow!("Filter '{}' is not in key=value form", filter))?;
        query = query.with_filter(key.trim(), value.trim());
    }
    Ok(query)
}

fn required<'a>(args: &'a ArgMatches, name: &str) -> Result<&'a str> {
    args.get_one::<String>(name)
        .map(String::as_str)
        .ok_or_else(|| anyhow!("Missing argument <{}>", name))
}

fn entity(args: &ArgMatches) -> Result<Entity> {
    required(args, "entity")?.parse::<Entity>().map_err(|e| anyhow!(e))
}

fn record_id(args: &ArgMatches) -> Result<RecordId> {
    Ok(RecordId::from(required(args, "id")?))
}

/// Read a JSON object from a file, or from stdin when the path is "-"
fn read_record(input: &str) -> Result<Record> {
    let text = if input == "-" {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf).context("Failed to read stdin")?;
        buf
    } else {
        std::fs::read_to_string(Path::new(input)).with_context(|| format!("Failed to read {}", input))?
    };
    let value: Value = serde_json::from_str(&text).with_context(|| format!("{} is not valid JSON", input))?;
    Record::from_value(value).ok_or_else(|| anyhow!("{} must contain a JSON object", input))
}

fn prompt(label: &str) -> Result<String> {
    eprint!("{}: ", label);
    io::stderr().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

/// Save the phone as the default for the next login. Command line and
/// environment overrides are not written back.
fn remember_phone(phone: &str) -> Result<()> {
    let path = Config::config_path()?;
    let mut stored = Config::load_from(&path)?;
    stored.last_phone = Some(phone.to_string());
    stored.save_to(&path)
}

impl Console {
    /// Open the session store and build the API client
    pub async fn open(config: Config, output: Output) -> Result<Self> {
        let storage = config.session_storage()?;
        let sessions = SessionManager::new(storage).shared();
        match sessions.load().await {
            Ok(true) => info!("Restored saved session"),
            Ok(false) => {}
            Err(e) => warn!(error = %e, "Could not restore saved session"),
        }

        let client = ApiClient::new(&config.api_client_config(), sessions)
            .context("Failed to create API client")?;
        Ok(Self { config, client, output })
    }

    fn screen(&self, entity: Entity) -> MasterDetail {
        MasterDetail::new(self.client.clone(), entity)
    }

    fn print_notice(&self, screen: &mut MasterDetail) {
        match screen.take_notice() {
            Some(Notice::Success(text)) => eprintln!("{}", text),
            Some(Notice::Error(text)) => eprintln!("Error: {}", text),
            None => {}
        }
    }

    fn print_value(&self, value: &Value) -> Result<()> {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }

    fn print_record(&self, record: &Record) -> Result<()> {
        match self.output {
            Output::Json => self.print_value(&record.clone().into_value()),
            Output::Table => {
                let width = record.keys().map(|k| k.chars().count()).max().unwrap_or(0);
                for (key, value) in record.iter() {
                    let text = match value {
                        Value::Array(_) | Value::Object(_) => serde_json::to_string(value)?,
                        other => format_cell(other),
                    };
                    println!("{:<width$}  {}", key, text, width = width);
                }
                Ok(())
            }
        }
    }

    fn print_rows(&self, rows: &[Record]) -> Result<()> {
        match self.output {
            Output::Json => self.print_value(&Value::Array(rows.iter().cloned().map(Value::from).collect())),
            Output::Table if rows.is_empty() => {
                eprintln!("No records");
                Ok(())
            }
            Output::Table => {
                print!("{}", render_table(rows, MAX_TABLE_COLUMNS, MAX_CELL_WIDTH));
                Ok(())
            }
        }
    }

    // ===== Authentication =====

    pub async fn login(self, args: &ArgMatches) -> Result<()> {
        let phone = match args.get_one::<String>("phone").or(self.config.last_phone.as_ref()) {
            Some(phone) => phone.clone(),
            None => prompt("Phone")?,
        };
        if phone.is_empty() {
            bail!("A phone number is required");
        }

        let password = match std::env::var(ENV_PASSWORD) {
            Ok(password) if !password.is_empty() => password,
            _ => match CredentialStore::password(&phone) {
                Ok(Some(password)) => password,
                Ok(None) => rpassword::prompt_password("Password: ").context("Failed to read password")?,
                Err(e) => {
                    warn!(error = %e, "Keychain unavailable");
                    rpassword::prompt_password("Password: ").context("Failed to read password")?
                }
            },
        };

        let session = self
            .client
            .login(&phone, &password)
            .await
            .context("Login failed")?;

        if args.get_flag("remember") {
            if let Err(e) = CredentialStore::store(&phone, &password) {
                warn!(error = %e, "Could not store password in keychain");
            }
        }

        if let Err(e) = remember_phone(&phone) {
            warn!(error = %e, "Could not save config");
        }

        eprintln!("Logged in as {}", session.display_name().unwrap_or("employee"));
        Ok(())
    }

    /// End the session; with `--forget`, also drop the remembered password.
    pub async fn logout(self, args: &ArgMatches) -> Result<()> {
        self.client.logout().await.context("Logout failed")?;
        eprintln!("Logged out");

        if args.get_flag("forget") {
            let phone = args
                .get_one::<String>("phone")
                .or(self.config.last_phone.as_ref())
                .ok_or_else(|| anyhow!("No phone number to forget; pass --phone"))?;
            if CredentialStore::forget(phone)? {
                eprintln!("Forgot the stored password for {}", phone);
            }
        }
        Ok(())
    }

    pub async fn whoami(self) -> Result<()> {
        let session = self
            .client
            .sessions()
            .get()
            .await
            .ok_or(ApiError::NotAuthenticated)?;
        match self.output {
            Output::Json => self.print_value(&session.profile.clone().into_value()),
            Output::Table => {
                println!("{}", session.display_name().unwrap_or("(unknown)"));
                println!("Logged in {}", session.created_at.format("%Y-%m-%d %H:%M"));
                if let Some(refreshed) = session.refreshed_at {
                    println!("Token refreshed {}", refreshed.format("%Y-%m-%d %H:%M"));
                }
                Ok(())
            }
        }
    }

    // ===== Records =====

    pub async fn list(self, args: &ArgMatches) -> Result<()> {
        let mut screen = self.screen(entity(args)?);
        screen.apply_query(list_query(args)?).await?;
        self.print_rows(screen.rows())
    }

    pub async fn get(self, args: &ArgMatches) -> Result<()> {
        let entity = entity(args)?;
        let id = record_id(args)?;
        let record = self.client.resource(entity).get(&id).await?.into_data()?;
        self.print_record(&record)
    }

    pub async fn create(self, args: &ArgMatches) -> Result<()> {
        let mut screen = self.screen(entity(args)?);
        let record = read_record(required(args, "input")?)?;
        screen.create(record).await?;
        self.print_notice(&mut screen);
        Ok(())
    }

    /// Fetch the current record and send only the fields the input changes
    pub async fn update(self, args: &ArgMatches) -> Result<()> {
        let entity = entity(args)?;
        let id = record_id(args)?;
        let edited = read_record(required(args, "input")?)?;

        let mut screen = self.screen(entity);
        let current = self
            .client
            .resource(entity)
            .get(&id)
            .await
            .and_then(|env| env.into_data())
            .with_context(|| format!("Failed to load {} {}", entity, id))?;
        let original = if current.id().is_some() {
            current
        } else {
            current.with("id", id.as_str())
        };

        match screen.edit(&original, &edited).await? {
            EditOutcome::Unchanged => eprintln!("No changes"),
            EditOutcome::Saved => self.print_notice(&mut screen),
        }
        Ok(())
    }

    pub async fn delete(self, args: &ArgMatches) -> Result<()> {
        let mut screen = self.screen(entity(args)?);
        let id = record_id(args)?;
        screen.delete(&Record::new().with("id", id.as_str())).await?;
        self.print_notice(&mut screen);
        Ok(())
    }

    pub async fn logs(self, args: &ArgMatches) -> Result<()> {
        let mut screen = self.screen(entity(args)?);
        screen.show_logs().await?;
        let entries = screen.logs().unwrap_or_default();

        match self.output {
            Output::Json => {
                let values: Vec<Value> = entries.iter().map(|e| e.record().clone().into_value()).collect();
                self.print_value(&Value::Array(values))
            }
            Output::Table => {
                if entries.is_empty() {
                    eprintln!("No audit log entries");
                }
                for entry in entries {
                    let when = entry
                        .timestamp()
                        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                        .unwrap_or_default();
                    println!(
                        "{:<16}  {:<10}  {}",
                        when,
                        entry.action().unwrap_or("-"),
                        entry.actor().unwrap_or_default()
                    );
                    if let Some(changes) = entry.changes() {
                        println!("    {}", serde_json::to_string(changes)?);
                    }
                }
                Ok(())
            }
        }
    }

    pub async fn order_status(self, args: &ArgMatches) -> Result<()> {
        let id = record_id(args)?;
        let status: OrderStatus = required(args, "status")?.parse().map_err(|e: String| anyhow!(e))?;

        let mut screen = self.screen(Entity::Order);
        screen
            .change_order_status(&Record::new().with("_id", id.as_str()), status)
            .await?;
        self.print_notice(&mut screen);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_needs_login_sees_through_context() {
        let err = anyhow::Error::new(ApiError::RefreshFailed(Arc::new(ApiError::Unauthorized)))
            .context("Loading products failed");
        assert!(needs_login(&err));

        let err = anyhow::Error::new(ApiError::ServerError("boom".into())).context("Loading products failed");
        assert!(!needs_login(&err));
    }

    #[test]
    fn test_read_record_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("brand.json");
        std::fs::write(&path, r#"{"name": "Acme", "slug": "acme"}"#).unwrap();

        let record = read_record(path.to_str().unwrap()).unwrap();
        assert_eq!(record.str_field("name"), Some("Acme"));
    }

    #[test]
    fn test_read_record_rejects_non_objects() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("list.json");
        std::fs::write(&path, "[1, 2]").unwrap();

        let err = read_record(path.to_str().unwrap()).unwrap_err();
        assert!(err.to_string().contains("must contain a JSON object"));
    }
}
