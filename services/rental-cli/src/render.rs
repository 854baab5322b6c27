//! Plain-text rendering for command output
//!
//! Tables are aligned with spaces only, so output stays grep- and
//! cut-friendly. Lists render one record per row; single records render as
//! a label/value block.

use rental_client::types::{Book, User};

pub fn book_table(books: &[Book]) -> String {
    if books.is_empty() {
        return "no books\n".to_owned();
    }
    let rows: Vec<Vec<String>> = books
        .iter()
        .map(|b| {
            vec![
                b.id.clone(),
                b.title.clone(),
                b.author.clone(),
                b.isbn.clone(),
                b.user_id.clone(),
            ]
        })
        .collect();
    table(&["ID", "TITLE", "AUTHOR", "ISBN", "OWNER"], &rows)
}

pub fn user_table(users: &[User]) -> String {
    if users.is_empty() {
        return "no users\n".to_owned();
    }
    let rows: Vec<Vec<String>> = users
        .iter()
        .map(|u| {
            vec![
                u.id.clone(),
                u.name.clone(),
                u.email.clone(),
                u.role.clone().unwrap_or_default(),
            ]
        })
        .collect();
    table(&["ID", "NAME", "EMAIL", "ROLE"], &rows)
}

pub fn book_details(book: &Book) -> String {
    let mut out = String::new();
    field(&mut out, "id", &book.id);
    field(&mut out, "title", &book.title);
    field(&mut out, "author", &book.author);
    field(&mut out, "isbn", &book.isbn);
    field(&mut out, "owner", &book.user_id);
    if let Some(description) = &book.description {
        field(&mut out, "description", description);
    }
    if let Some(created_at) = &book.created_at {
        field(&mut out, "created", created_at);
    }
    out
}

pub fn user_details(user: &User) -> String {
    let mut out = String::new();
    field(&mut out, "id", &user.id);
    field(&mut out, "name", &user.name);
    field(&mut out, "email", &user.email);
    if let Some(role) = &user.role {
        field(&mut out, "role", role);
    }
    if let Some(created_at) = &user.created_at {
        field(&mut out, "created", created_at);
    }
    out
}

fn field(out: &mut String, label: &str, value: &str) {
    out.push_str(&format!("{label:<12} {value}\n"));
}

/// Column widths come from the widest cell; rows are trimmed on the right so
/// short final columns leave no trailing spaces.
fn table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if cell.len() > widths[i] {
                widths[i] = cell.len();
            }
        }
    }

    let mut out = String::new();
    let mut line = String::new();
    for (i, header) in headers.iter().enumerate() {
        if i > 0 {
            line.push_str("  ");
        }
        line.push_str(&format!("{header:<width$}", width = widths[i]));
    }
    out.push_str(line.trim_end());
    out.push('\n');

    for row in rows {
        line.clear();
        for (i, cell) in row.iter().enumerate() {
            if i > 0 {
                line.push_str("  ");
            }
            line.push_str(&format!("{cell:<width$}", width = widths[i]));
        }
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}
