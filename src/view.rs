//! Terminal rendering of a conversation snapshot.
//!
//! Rendering is a pure function of the exchanges; the caller decides when to
//! redraw.

use crate::conversation::{Exchange, Outcome, ResultBundle};
use crate::table::ResultTable;

use colored::*;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, ContentArrangement, Table};

pub const FOUND: &str = "Here is what I found:";
pub const NO_RESULTS: &str = "The query returned no results.";

/// Render every exchange, numbering answers from 1.
pub fn render(snapshot: &[Exchange]) -> String {
    let mut answer = 0;
    let mut out = Vec::with_capacity(snapshot.len());
    for exchange in snapshot {
        if !exchange.is_user() {
            answer += 1;
        }
        out.push(render_exchange(exchange, answer));
    }
    out.join("\n")
}

/// Render one exchange; `answer` labels assistant turns.
pub fn render_exchange(exchange: &Exchange, answer: usize) -> String {
    match exchange {
        Exchange::User { question } => format!("{} {}", "you ›".cyan().bold(), question),
        Exchange::Assistant(bundle) => {
            let label = format!("[{}]", answer).dimmed();
            format!("{} {}", label, render_bundle(bundle))
        }
    }
}

pub fn render_bundle(bundle: &ResultBundle) -> String {
    match bundle.outcome() {
        Outcome::Failed { message, .. } => message.red().bold().to_string(),
        Outcome::Table(table) => {
            let mut out = String::from(FOUND);
            out.push('\n');
            if let Some(sql) = bundle.statement() {
                out.push_str(&format!("{}\n", sql.yellow()));
            }
            if table.is_empty() {
                out.push_str(&NO_RESULTS.dimmed().to_string());
            } else {
                out.push_str(&render_table(table));
                out.push_str(&format!(
                    "\n{} row(s) returned",
                    table.len().to_string().cyan()
                ));
            }
            out
        }
    }
}

/// Box-drawn table with a bold header.
pub fn render_table(table: &ResultTable) -> String {
    let mut out = Table::new();
    out.load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(
            table
                .columns()
                .iter()
                .map(|c| Cell::new(c).add_attribute(Attribute::Bold)),
        );
    for row in table.rows() {
        out.add_row(row.iter().map(|v| Cell::new(v.to_string())));
    }
    out.to_string()
}
