//! Token management commands.
//!
//! `warrant token gen` - Issue a new token.
//! `warrant token list` - List live tokens in issue order.
//! `warrant token rm` - Revoke a token.
//! `warrant token verify` - Check a token against a required permission.

use anyhow::Context;
use warrant_core::{Permission, TokenRecord};

use crate::client::WarrantClient;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub async fn generate(
    client: &WarrantClient,
    name: &str,
    perm: Permission,
    extra: &str,
) -> anyhow::Result<()> {
    let token = client
        .generate_token(name, perm, extra)
        .await
        .context("failed to generate token")?;
    println!("generate token success: {token}");
    Ok(())
}

pub async fn list(client: &WarrantClient, skip: u64, limit: u64) -> anyhow::Result<()> {
    let records = client
        .tokens(skip, limit)
        .await
        .context("failed to list tokens")?;
    print!("{}", render_table(&records));
    Ok(())
}

pub async fn remove(client: &WarrantClient, token: &str) -> anyhow::Result<()> {
    client
        .remove_token(token)
        .await
        .context("failed to remove token")?;
    println!("remove token success: {token}");
    Ok(())
}

pub async fn verify(client: &WarrantClient, token: &str, perm: Permission) -> anyhow::Result<()> {
    let principal = client
        .verify_token(token, perm)
        .await
        .with_context(|| format!("token verification failed for '{perm}'"))?;

    println!("✔ Token is valid");
    println!("  Name: {}", principal.name);
    println!("  Perm: {}", principal.perm);
    if !principal.extra.is_empty() {
        println!("  Extra: {}", principal.extra);
    }
    Ok(())
}

/// Render records as an aligned `num name perm createTime token` table.
pub fn render_table(records: &[TokenRecord]) -> String {
    let header = ["num", "name", "perm", "createTime", "token"];
    let rows: Vec<[String; 5]> = records
        .iter()
        .enumerate()
        .map(|(i, r)| {
            [
                (i + 1).to_string(),
                r.name.clone(),
                r.perm.to_string(),
                r.create_time.format(TIME_FORMAT).to_string(),
                r.token.clone(),
            ]
        })
        .collect();

    let mut widths = header.map(str::len);
    for row in &rows {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    let lines = std::iter::once(header.map(String::from)).chain(rows);
    for line in lines {
        let cells: Vec<String> = line
            .iter()
            .zip(widths)
            .enumerate()
            .map(|(i, (cell, w))| {
                if i + 1 == line.len() {
                    cell.clone()
                } else {
                    format!("{cell:<w$}")
                }
            })
            .collect();
        out.push_str(&cells.join("  "));
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    fn record(name: &str, perm: Permission, token: &str) -> TokenRecord {
        TokenRecord {
            token: token.to_string(),
            name: name.to_string(),
            perm,
            extra: String::new(),
            create_time: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
        }
    }

    #[test]
    fn test_render_table_aligns_columns() {
        let table = render_table(&[
            record("a", Permission::Read, "tok-1"),
            record("long-principal", Permission::Admin, "tok-2"),
        ]);
        let lines: Vec<&str> = table.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("num  name            perm   createTime"));
        assert_eq!(
            lines[1],
            "1    a               read   2023-11-14 22:13:20  tok-1"
        );
        assert_eq!(
            lines[2],
            "2    long-principal  admin  2023-11-14 22:13:20  tok-2"
        );
    }

    #[test]
    fn test_render_table_empty_has_header_only() {
        assert_eq!(render_table(&[]), "num  name  perm  createTime  token\n");
    }
}
