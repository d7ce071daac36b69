//! Text and JSON output for the `show` and `list` commands.

use serde::Serialize;

use crate::certificate_details::CertificateDetails;

/// One row of the `list` output.
#[derive(Debug, Clone, Serialize)]
pub struct ListEntry {
    pub alias: String,
    pub subject: String,
    pub issuer: String,
    pub valid_to: String,
}

impl ListEntry {
    pub fn new(alias: impl Into<String>, details: &CertificateDetails) -> Self {
        Self {
            alias: alias.into(),
            subject: details.subject.clone(),
            issuer: details.issuer.clone(),
            valid_to: details.not_after.clone(),
        }
    }
}

/// Boxed ASCII table. Headers are upper-cased; every row is padded to the
/// widest cell of its column.
pub fn render_table<S: AsRef<str>>(headers: &[&str], rows: &[Vec<S>]) -> String {
    let headers: Vec<String> = headers.iter().map(|h| h.to_uppercase()).collect();
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.as_ref().chars().count());
        }
    }

    let separator = {
        let mut line = String::from("+");
        for width in &widths {
            line.push_str(&"-".repeat(width + 2));
            line.push('+');
        }
        line.push('\n');
        line
    };
    let mut out = separator.clone();
    out.push_str(&format_row(&widths, headers.iter().map(String::as_str)));
    out.push_str(&separator);
    for row in rows {
        out.push_str(&format_row(&widths, row.iter().map(|cell| cell.as_ref())));
    }
    if !rows.is_empty() {
        out.push_str(&separator);
    }
    out
}

fn format_row<'a>(widths: &[usize], cells: impl Iterator<Item = &'a str>) -> String {
    let mut line = String::from("|");
    for (width, cell) in widths.iter().zip(cells) {
        let pad = width - cell.chars().count();
        line.push(' ');
        line.push_str(cell);
        line.push_str(&" ".repeat(pad + 1));
        line.push('|');
    }
    line.push('\n');
    line
}

pub fn details_table(details: &CertificateDetails) -> String {
    let rows: Vec<Vec<String>> = details
        .properties()
        .into_iter()
        .map(|(name, value)| vec![name.to_string(), value])
        .collect();
    render_table(&["Property", "Value"], &rows)
}

pub fn list_table(entries: &[ListEntry]) -> String {
    let rows: Vec<Vec<&str>> = entries
        .iter()
        .map(|e| {
            vec![
                e.alias.as_str(),
                e.subject.as_str(),
                e.issuer.as_str(),
                e.valid_to.as_str(),
            ]
        })
        .collect();
    render_table(&["Alias", "Subject", "Issuer", "Valid to"], &rows)
}

pub fn details_json(details: &CertificateDetails) -> serde_json::Result<String> {
    serde_json::to_string_pretty(details)
}

pub fn list_json(entries: &[ListEntry]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(entries)
}
