//! Subcommand implementations
//!
//! Commands only speak to the backend through the typed api surface, so the
//! shared client decides when to attach credentials, when to refresh them,
//! and when to give up and send the user back to `login`.

use anyhow::Context;
use common::Secret;
use rental_client::api::{auth, books, users};
use rental_client::types::{BookPatch, NewBook, UserPatch};
use rental_client::{ApiClient, ApiError};
use std::io::{BufRead, Write};

use crate::render;

pub async fn register(client: &ApiClient, name: &str, email: &str) -> anyhow::Result<()> {
    let password = read_password("choose a password")?;
    let user = auth::register(client, name, email, password.expose()).await?;
    println!("account created: {} <{}>", user.name, user.email);
    println!("sign in with `bookrental login {}`", user.email);
    Ok(())
}

pub async fn login(client: &ApiClient, email: &str) -> anyhow::Result<()> {
    let password = read_password("password")?;
    let user = match auth::login(client, email, password.expose()).await {
        Ok(user) => user,
        // a 401 on the login call itself means bad credentials, not a
        // missing session
        Err(ApiError::AuthenticationRequired) => anyhow::bail!("invalid email or password"),
        Err(err) => return Err(err.into()),
    };
    println!("signed in as {} <{}>", user.name, user.email);
    Ok(())
}

pub async fn logout(client: &ApiClient) -> anyhow::Result<()> {
    auth::logout(client).await;
    println!("signed out");
    Ok(())
}

pub async fn whoami(client: &ApiClient) -> anyhow::Result<()> {
    match auth::current_user(client).await {
        Some(user) => {
            println!("{} <{}>", user.name, user.email);
            Ok(())
        }
        None => Err(ApiError::AuthenticationRequired.into()),
    }
}

/// With no flags, shows the signed-in user's server-side record. With flags,
/// updates the named fields and shows the result.
pub async fn profile(client: &ApiClient, mut args: Vec<&str>) -> anyhow::Result<()> {
    let name = flag_value(&mut args, "--name");
    let email = flag_value(&mut args, "--email");
    let change_password = has_flag(&mut args, "--password");
    ensure_consumed(&args)?;

    let Some(current) = auth::current_user(client).await else {
        return Err(ApiError::AuthenticationRequired.into());
    };

    if name.is_none() && email.is_none() && !change_password {
        let user = users::get(client, &current.id).await?;
        print!("{}", render::user_details(&user));
        return Ok(());
    }

    let password = if change_password {
        Some(read_password("new password")?)
    } else {
        None
    };
    let patch = UserPatch {
        name: name.map(str::to_owned),
        email: email.map(str::to_owned),
        password: password.as_ref().map(|p| p.expose().clone()),
    };
    let user = users::update(client, &current.id, &patch).await?;
    println!("profile updated");
    print!("{}", render::user_details(&user));
    Ok(())
}

pub async fn book_list(client: &ApiClient, mut args: Vec<&str>) -> anyhow::Result<()> {
    let mine = has_flag(&mut args, "--mine");
    let owner = flag_value(&mut args, "--owner");
    ensure_consumed(&args)?;
    if mine && owner.is_some() {
        anyhow::bail!("--mine and --owner cannot be combined");
    }

    let list = if mine {
        let Some(user) = auth::current_user(client).await else {
            return Err(ApiError::AuthenticationRequired.into());
        };
        books::owned_by(client, &user.id).await?
    } else if let Some(owner) = owner {
        books::owned_by(client, owner).await?
    } else {
        books::list(client).await?
    };
    print!("{}", render::book_table(&list));
    Ok(())
}

pub async fn book_show(client: &ApiClient, id: &str) -> anyhow::Result<()> {
    let book = books::get(client, id).await?;
    print!("{}", render::book_details(&book));
    Ok(())
}

pub async fn book_add(client: &ApiClient, mut args: Vec<&str>) -> anyhow::Result<()> {
    let new_book = NewBook {
        title: required_flag(&mut args, "--title")?,
        author: required_flag(&mut args, "--author")?,
        isbn: required_flag(&mut args, "--isbn")?,
        description: flag_value(&mut args, "--description").map(str::to_owned),
    };
    ensure_consumed(&args)?;

    let book = books::create(client, &new_book).await?;
    println!("added book {}", book.id);
    print!("{}", render::book_details(&book));
    Ok(())
}

pub async fn book_edit(client: &ApiClient, id: &str, mut args: Vec<&str>) -> anyhow::Result<()> {
    let patch = BookPatch {
        title: flag_value(&mut args, "--title").map(str::to_owned),
        author: flag_value(&mut args, "--author").map(str::to_owned),
        isbn: flag_value(&mut args, "--isbn").map(str::to_owned),
        description: flag_value(&mut args, "--description").map(str::to_owned),
    };
    ensure_consumed(&args)?;
    if patch.title.is_none()
        && patch.author.is_none()
        && patch.isbn.is_none()
        && patch.description.is_none()
    {
        anyhow::bail!("nothing to change, pass at least one of --title/--author/--isbn/--description");
    }

    let book = books::update(client, id, &patch).await?;
    println!("updated book {}", book.id);
    print!("{}", render::book_details(&book));
    Ok(())
}

pub async fn book_rm(client: &ApiClient, id: &str) -> anyhow::Result<()> {
    books::remove(client, id).await?;
    println!("deleted book {id}");
    Ok(())
}

pub async fn book_transfer(client: &ApiClient, id: &str, mut args: Vec<&str>) -> anyhow::Result<()> {
    let to = required_flag(&mut args, "--to")?;
    ensure_consumed(&args)?;

    let book = books::transfer(client, id, &to).await?;
    println!("book {} now belongs to {}", book.id, book.user_id);
    Ok(())
}

pub async fn user_list(client: &ApiClient) -> anyhow::Result<()> {
    let list = users::list(client).await?;
    print!("{}", render::user_table(&list));
    Ok(())
}

pub async fn user_show(client: &ApiClient, id: &str) -> anyhow::Result<()> {
    let user = users::get(client, id).await?;
    print!("{}", render::user_details(&user));
    Ok(())
}

pub async fn user_rm(client: &ApiClient, id: &str) -> anyhow::Result<()> {
    users::remove(client, id).await?;
    println!("deleted user {id}");
    Ok(())
}

/// Read a password from BOOKRENTAL_PASSWORD, or prompt for one on stdin.
/// The prompt goes to stderr so piped stdout stays clean.
fn read_password(prompt: &str) -> anyhow::Result<Secret<String>> {
    if let Ok(password) = std::env::var("BOOKRENTAL_PASSWORD") {
        return Ok(Secret::new(password));
    }
    eprint!("{prompt}: ");
    let _ = std::io::stderr().flush();
    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .context("failed to read password from stdin")?;
    let password = line.trim_end_matches(['\r', '\n']).to_owned();
    if password.is_empty() {
        anyhow::bail!("empty password");
    }
    Ok(Secret::new(password))
}

/// Pull `name <value>` out of the arg list, if present.
fn flag_value<'a>(args: &mut Vec<&'a str>, name: &str) -> Option<&'a str> {
    let pos = args.iter().position(|a| *a == name)?;
    if pos + 1 < args.len() {
        let value = args[pos + 1];
        args.drain(pos..=pos + 1);
        Some(value)
    } else {
        args.remove(pos);
        None
    }
}

fn required_flag(args: &mut Vec<&str>, name: &str) -> anyhow::Result<String> {
    flag_value(args, name)
        .map(str::to_owned)
        .with_context(|| format!("missing required flag `{name} <value>`"))
}

fn has_flag(args: &mut Vec<&str>, name: &str) -> bool {
    match args.iter().position(|a| *a == name) {
        Some(pos) => {
            args.remove(pos);
            true
        }
        None => false,
    }
}

/// Anything left over after flag extraction is a typo worth rejecting.
fn ensure_consumed(args: &[&str]) -> anyhow::Result<()> {
    if let Some(stray) = args.first() {
        anyhow::bail!("unexpected argument `{stray}`, run `bookrental help` for usage");
    }
    Ok(())
}
