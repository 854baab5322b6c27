//! bookrental: command-line client for the book rental service
//!
//! Every command goes through the shared client crate, so the CLI gets the
//! same session behavior as any other consumer: a stored session is picked
//! up at startup, an expired access token is refreshed mid-command, and a
//! session the server no longer accepts drops the user back to `login`.

mod commands;
mod config;
mod render;

use anyhow::Context;
use config::Config;
use rental_auth::{FileStore, Session};
use rental_client::{ApiClient, ApiError};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const USAGE: &str = "\
bookrental: command-line client for the book rental service

Usage: bookrental [--config <path>] <command> [args]

Commands:
  register <name> <email>     create an account (password prompted)
  login <email>               sign in (password prompted)
  logout                      sign out and discard the stored session
  whoami                      show the signed-in account
  profile [--name <n>] [--email <e>] [--password]
                              show the profile, or update the given fields
  books [--mine | --owner <user-id>]
                              list books, optionally filtered by owner
  book show <id>              show one book
  book add --title <t> --author <a> --isbn <i> [--description <d>]
  book edit <id> [--title <t>] [--author <a>] [--isbn <i>] [--description <d>]
  book rm <id>                delete a book
  book transfer <id> --to <user-id>
                              hand a book over to another account
  users                       list accounts
  user show <id>              show one account
  user rm <id>                delete an account

The config file is looked up from --config, then the CONFIG_PATH env var,
then ./bookrental.toml. BOOKRENTAL_API_URL and BOOKRENTAL_SESSION_FILE
override the corresponding file settings; BOOKRENTAL_PASSWORD skips the
password prompt.
";

#[tokio::main]
async fn main() -> ExitCode {
    // stdout carries command output, so logs go to stderr
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| tracing_subscriber::EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            if let Some(api_err) = err.downcast_ref::<ApiError>() {
                if api_err.requires_login() {
                    eprintln!("error: {api_err}");
                    eprintln!("run `bookrental login <email>` to sign in");
                    return ExitCode::from(2);
                }
            }
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let (config_arg, rest) = split_config_flag(&args);

    let Some(&command) = rest.first() else {
        print!("{USAGE}");
        return Ok(());
    };
    if matches!(command, "help" | "--help" | "-h") {
        print!("{USAGE}");
        return Ok(());
    }

    let explicit = config_arg.is_some() || std::env::var("CONFIG_PATH").is_ok();
    let config_path = Config::resolve_path(config_arg);
    let config = if explicit {
        Config::load(&config_path)
    } else {
        Config::load_or_default(&config_path)
    }
    .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    let session_file = config.session.resolved_file();
    debug!(
        base_url = %config.api.base_url,
        session_file = %session_file.display(),
        "config loaded"
    );

    let store = Arc::new(FileStore::new(session_file));
    let session = Arc::new(Session::restore(store).await?);
    let http = reqwest::Client::builder()
        .build()
        .context("failed to build http client")?;
    let client = ApiClient::new(http, config.api.base_url.clone(), session)
        .with_timeout(Duration::from_secs(config.api.timeout_secs));

    let tail: Vec<&str> = rest[1..].to_vec();
    match command {
        "register" => match tail.as_slice() {
            [name, email] => commands::register(&client, name, email).await,
            _ => usage_error("bookrental register <name> <email>"),
        },
        "login" => match tail.as_slice() {
            [email] => commands::login(&client, email).await,
            _ => usage_error("bookrental login <email>"),
        },
        "logout" => match tail.as_slice() {
            [] => commands::logout(&client).await,
            _ => usage_error("bookrental logout"),
        },
        "whoami" => match tail.as_slice() {
            [] => commands::whoami(&client).await,
            _ => usage_error("bookrental whoami"),
        },
        "profile" => commands::profile(&client, tail).await,
        "books" => commands::book_list(&client, tail).await,
        "book" => match tail.split_first() {
            Some((&"show", [id])) => commands::book_show(&client, id).await,
            Some((&"add", flags)) => commands::book_add(&client, flags.to_vec()).await,
            Some((&"edit", [id, flags @ ..])) => {
                commands::book_edit(&client, id, flags.to_vec()).await
            }
            Some((&"rm", [id])) => commands::book_rm(&client, id).await,
            Some((&"transfer", [id, flags @ ..])) => {
                commands::book_transfer(&client, id, flags.to_vec()).await
            }
            _ => usage_error("bookrental book <show|add|edit|rm|transfer> ..."),
        },
        "users" => match tail.as_slice() {
            [] => commands::user_list(&client).await,
            _ => usage_error("bookrental users"),
        },
        "user" => match tail.split_first() {
            Some((&"show", [id])) => commands::user_show(&client, id).await,
            Some((&"rm", [id])) => commands::user_rm(&client, id).await,
            _ => usage_error("bookrental user <show|rm> <id>"),
        },
        other => anyhow::bail!("unknown command `{other}`, run `bookrental help` for usage"),
    }
}

fn usage_error(usage: &str) -> anyhow::Result<()> {
    anyhow::bail!("usage: {usage}")
}

/// Pull `--config <path>` out of argv; everything after argv[0] that is not
/// the config pair is returned as the command line to dispatch on.
fn split_config_flag(args: &[String]) -> (Option<&str>, Vec<&str>) {
    let mut config = None;
    let mut rest = Vec::new();
    let mut i = 1;
    while i < args.len() {
        if args[i] == "--config" {
            if let Some(value) = args.get(i + 1) {
                config = Some(value.as_str());
                i += 2;
            } else {
                i += 1;
            }
            continue;
        }
        rest.push(args[i].as_str());
        i += 1;
    }
    (config, rest)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn config_flag_is_stripped_from_anywhere() {
        let args = argv(&["bookrental", "book", "--config", "/etc/r.toml", "show", "b1"]);
        let (config, rest) = split_config_flag(&args);
        assert_eq!(config, Some("/etc/r.toml"));
        assert_eq!(rest, vec!["book", "show", "b1"]);
    }

    #[test]
    fn absent_config_flag_yields_none() {
        let args = argv(&["bookrental", "books"]);
        let (config, rest) = split_config_flag(&args);
        assert_eq!(config, None);
        assert_eq!(rest, vec!["books"]);
    }

    #[test]
    fn dangling_config_flag_is_dropped() {
        let args = argv(&["bookrental", "books", "--config"]);
        let (config, rest) = split_config_flag(&args);
        assert_eq!(config, None);
        assert_eq!(rest, vec!["books"]);
    }
}
