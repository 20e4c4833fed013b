#![allow(dead_code)]

use oxide_query_core::{
    compile_query, compile_statement, CompileError, CompiledQuery, Dialect, GenericDialect, Query,
    Statement, Table,
};

pub fn customers() -> Table {
    Table::new("customers", ["Id", "Name", "Age", "Email"])
}

pub fn orders() -> Table {
    Table::new("orders", ["Id", "CustomerId", "Amount"])
}

pub fn compile(query: &Query) -> CompiledQuery {
    compile_with(query, &GenericDialect::new())
}

pub fn compile_with(query: &Query, dialect: &dyn Dialect) -> CompiledQuery {
    compile_query(query, dialect)
        .unwrap_or_else(|e| panic!("Failed to compile: {query}\nError: {e}"))
}

pub fn compile_err(query: &Query) -> CompileError {
    compile_query(query, &GenericDialect::new())
        .expect_err(&format!("Expected compile error for: {query}"))
}

pub fn compile_dml(statement: impl Into<Statement>) -> CompiledQuery {
    let statement = statement.into();
    compile_statement(&statement, &GenericDialect::new())
        .unwrap_or_else(|e| panic!("Failed to compile {}: {e}", statement.kind()))
}

/// Joins expected SQL lines.
pub fn lines(lines: &[&str]) -> String {
    lines.join("\n")
}

/// Placeholder names appearing in `sql`, in text order.
pub fn placeholders(sql: &str, prefix: char) -> Vec<String> {
    let mut found = Vec::new();
    let mut chars = sql.char_indices().peekable();
    while let Some((start, c)) = chars.next() {
        if c != prefix {
            continue;
        }
        let mut end = start + c.len_utf8();
        while let Some(&(i, next)) = chars.peek() {
            if next.is_ascii_alphanumeric() || next == '_' {
                end = i + next.len_utf8();
                chars.next();
            } else {
                break;
            }
        }
        if end > start + 1 {
            found.push(sql[start..end].to_string());
        }
    }
    found
}
