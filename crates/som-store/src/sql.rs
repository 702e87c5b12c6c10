use crate::schema::{DbValue, Row};

pub(crate) fn quote_identifier(value: &str) -> String {
    let escaped = value.replace('"', "\"\"");
    format!("\"{escaped}\"")
}

/// `column = ?n` clauses joined by AND, numbering placeholders after `params`.
fn where_clause(filter: &Row, params: &mut Vec<libsql::Value>) -> String {
    let clauses: Vec<String> = filter
        .iter()
        .map(|(column, value)| {
            if matches!(value, DbValue::Null) {
                format!("{} IS NULL", quote_identifier(column))
            } else {
                params.push(value.to_libsql());
                format!("{} = ?{}", quote_identifier(column), params.len())
            }
        })
        .collect();
    clauses.join(" AND ")
}

pub(crate) fn build_insert_sql(table: &str, row: &Row) -> (String, Vec<libsql::Value>) {
    let columns: Vec<String> = row.keys().map(|c| quote_identifier(c)).collect();
    let params: Vec<libsql::Value> = row.values().map(DbValue::to_libsql).collect();
    let placeholders: Vec<String> = (1..=columns.len()).map(|idx| format!("?{idx}")).collect();
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_identifier(table),
        columns.join(", "),
        placeholders.join(", ")
    );
    (sql, params)
}

pub(crate) fn build_upsert_sql(
    table: &str,
    key_column: &str,
    row: &Row,
) -> (String, Vec<libsql::Value>) {
    let (insert_sql, params) = build_insert_sql(table, row);
    let updates: Vec<String> = row
        .keys()
        .filter(|column| column.as_str() != key_column)
        .map(|column| {
            let quoted = quote_identifier(column);
            format!("{quoted} = excluded.{quoted}")
        })
        .collect();
    let sql = if updates.is_empty() {
        format!("{insert_sql} ON CONFLICT({}) DO NOTHING", quote_identifier(key_column))
    } else {
        format!(
            "{insert_sql} ON CONFLICT({}) DO UPDATE SET {}",
            quote_identifier(key_column),
            updates.join(", ")
        )
    };
    (sql, params)
}

pub(crate) fn build_delete_sql(table: &str, filter: &Row) -> (String, Vec<libsql::Value>) {
    let mut params = Vec::new();
    let clause = where_clause(filter, &mut params);
    let sql = format!("DELETE FROM {} WHERE {clause}", quote_identifier(table));
    (sql, params)
}

pub(crate) fn build_select_sql(
    table: &str,
    filter: &Row,
    order_by: Option<&str>,
) -> (String, Vec<libsql::Value>) {
    let mut params = Vec::new();
    let mut sql = format!("SELECT * FROM {}", quote_identifier(table));
    if !filter.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&where_clause(filter, &mut params));
    }
    if let Some(column) = order_by {
        sql.push_str(&format!(" ORDER BY {}", quote_identifier(column)));
    }
    (sql, params)
}
