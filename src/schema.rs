//! Schema summary handed to the language model.

use crate::config::Dialect;
use crate::table::ResultTable;

/// A column as declared in the database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    pub name: String,
    pub data_type: String,
}

/// One base table, its columns, and a few sample rows.
#[derive(Debug, Clone, PartialEq)]
pub struct TableSchema {
    pub name: String,
    pub columns: Vec<ColumnInfo>,
    pub samples: Option<ResultTable>,
}

/// Everything the translator knows about the target database.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaSummary {
    pub dialect: Dialect,
    pub tables: Vec<TableSchema>,
}

impl SchemaSummary {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            tables: Vec::new(),
        }
    }

    pub fn table_names(&self) -> Vec<&str> {
        self.tables.iter().map(|t| t.name.as_str()).collect()
    }

    /// Render `CREATE TABLE` blocks followed by sample rows.
    pub fn render(&self) -> String {
        self.tables
            .iter()
            .map(|table| render_table(self.dialect, table))
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

fn render_table(dialect: Dialect, table: &TableSchema) -> String {
    let columns: Vec<String> = table
        .columns
        .iter()
        .map(|c| format!("\t{} {}", dialect.quote(&c.name), c.data_type))
        .collect();
    let mut out = format!(
        "CREATE TABLE {} (\n{}\n)",
        dialect.quote(&table.name),
        columns.join(",\n")
    );

    if let Some(samples) = &table.samples {
        out.push_str(&format!(
            "\n\n/*\n{} rows from {} table:\n{}",
            samples.len(),
            table.name,
            samples.columns().join("\t")
        ));
        for row in samples.rows() {
            let cells: Vec<String> = row.iter().map(|v| v.to_string()).collect();
            out.push('\n');
            out.push_str(&cells.join("\t"));
        }
        out.push_str("\n*/");
    }

    out
}
