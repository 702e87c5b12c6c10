//! Table layout of the issue store.

use std::collections::BTreeMap;

use som_validation::IssueKind;

use crate::sql::quote_identifier;

pub const GUID: &str = "GUID";
pub const GUID_ZWC: &str = "GUID_ZWC";
pub const NAME: &str = "NAME";
pub const IFC_TYPE: &str = "IFC_TYPE";
pub const FILE: &str = "FILE";
pub const IDENTIFIER: &str = "IDENTIFIER";
pub const PROJECT: &str = "PROJECT";
pub const RUN_DATE: &str = "RUN_DATE";
pub const TIMESTAMP: &str = "TIMESTAMP";
pub const ROLE: &str = "ROLE";
pub const PSET_NAME: &str = "PSET_NAME";
pub const ATTRIBUTE_NAME: &str = "ATTRIBUTE_NAME";
pub const VALUE: &str = "VALUE";
pub const DETAIL: &str = "DETAIL";

pub const ENTITIES_TABLE: &str = "entities";

/// Database value used by reader/writer operations.
#[derive(Debug, Clone, PartialEq)]
pub enum DbValue {
    Text(String),
    Integer(i64),
    Real(f64),
    Null,
}

impl DbValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            DbValue::Text(value) => Some(value),
            _ => None,
        }
    }

    pub(crate) fn to_libsql(&self) -> libsql::Value {
        match self {
            DbValue::Text(value) => libsql::Value::Text(value.clone()),
            DbValue::Integer(value) => libsql::Value::Integer(*value),
            DbValue::Real(value) => libsql::Value::Real(*value),
            DbValue::Null => libsql::Value::Null,
        }
    }

    pub(crate) fn from_libsql(value: libsql::Value) -> Self {
        match value {
            libsql::Value::Null => DbValue::Null,
            libsql::Value::Integer(value) => DbValue::Integer(value),
            libsql::Value::Real(value) => DbValue::Real(value),
            libsql::Value::Text(value) => DbValue::Text(value),
            libsql::Value::Blob(value) => DbValue::Text(String::from_utf8_lossy(&value).into_owned()),
        }
    }
}

impl From<&str> for DbValue {
    fn from(value: &str) -> Self {
        DbValue::Text(value.to_string())
    }
}

impl From<String> for DbValue {
    fn from(value: String) -> Self {
        DbValue::Text(value)
    }
}

impl<T: Into<DbValue>> From<Option<T>> for DbValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(DbValue::Null, Into::into)
    }
}

impl From<i64> for DbValue {
    fn from(value: i64) -> Self {
        DbValue::Integer(value)
    }
}

/// Canonical row representation.
pub type Row = BTreeMap<String, DbValue>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Text,
    Integer,
}

/// Column definition in a table schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: String,
    pub column_type: ColumnType,
    pub nullable: bool,
    pub primary_key: bool,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            nullable: false,
            primary_key: false,
        }
    }

    pub fn text(name: impl Into<String>) -> Self {
        Self::new(name, ColumnType::Text)
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    fn definition_sql(&self) -> String {
        let mut parts = vec![
            quote_identifier(&self.name),
            match self.column_type {
                ColumnType::Text => "TEXT",
                ColumnType::Integer => "INTEGER",
            }
            .to_string(),
        ];
        if !self.nullable {
            parts.push("NOT NULL".to_string());
        }
        if self.primary_key {
            parts.push("PRIMARY KEY".to_string());
        }
        parts.join(" ")
    }
}

/// One table of the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    pub name: String,
    pub columns: Vec<ColumnDef>,
}

impl TableSchema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
        }
    }

    pub fn with_column(mut self, column: ColumnDef) -> Self {
        self.columns.push(column);
        self
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|column| column.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    pub fn create_table_sql(&self) -> String {
        let columns: Vec<String> = self.columns.iter().map(ColumnDef::definition_sql).collect();
        format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            quote_identifier(&self.name),
            columns.join(", ")
        )
    }

    /// Index over the columns used to scope deletes and reads, if present.
    pub fn create_scope_index_sql(&self) -> Option<String> {
        let scope: Vec<String> = [PROJECT, RUN_DATE, FILE]
            .into_iter()
            .filter(|column| self.has_column(column))
            .map(quote_identifier)
            .collect();
        if scope.is_empty() {
            return None;
        }
        Some(format!(
            "CREATE INDEX IF NOT EXISTS {} ON {} ({})",
            quote_identifier(&format!("idx_{}_scope", self.name)),
            quote_identifier(&self.name),
            scope.join(", ")
        ))
    }
}

/// Kind specific column of an issue table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueField {
    PropertySet,
    Attribute,
    Value,
}

impl IssueField {
    pub fn column(self) -> &'static str {
        match self {
            IssueField::PropertySet => PSET_NAME,
            IssueField::Attribute => ATTRIBUTE_NAME,
            IssueField::Value => VALUE,
        }
    }

    /// Fields recorded for an issue kind.
    pub fn of(kind: IssueKind) -> &'static [IssueField] {
        use IssueField::{Attribute, PropertySet, Value};
        match kind {
            IssueKind::NoGroupMembership
            | IssueKind::RepetitiveGroup
            | IssueKind::EmptyGroup
            | IssueKind::CyclicGroupStructure => &[],
            IssueKind::MissingIdentificationPset | IssueKind::MissingPropertySet => &[PropertySet],
            IssueKind::MissingIdentificationAttribute | IssueKind::MissingAttribute => {
                &[PropertySet, Attribute]
            }
            IssueKind::UnknownIdentifierValue
            | IssueKind::ValueOutOfRange
            | IssueKind::ValueNotInList
            | IssueKind::ValueFormatMismatch => &[PropertySet, Attribute, Value],
            IssueKind::DuplicateSubgroupIdentifier | IssueKind::IllegalParentGroup => &[Value],
        }
    }
}

/// Table name for an issue kind, e.g. `value_out_of_range`.
pub fn issue_table_name(kind: IssueKind) -> String {
    kind.as_str().replace('-', "_")
}

pub fn issue_table(kind: IssueKind) -> TableSchema {
    let mut table = TableSchema::new(issue_table_name(kind))
        .with_column(ColumnDef::new("ID", ColumnType::Integer).nullable().primary_key())
        .with_column(ColumnDef::text(GUID))
        .with_column(ColumnDef::text(PROJECT))
        .with_column(ColumnDef::text(FILE))
        .with_column(ColumnDef::text(RUN_DATE))
        .with_column(ColumnDef::text(TIMESTAMP))
        .with_column(ColumnDef::text(ROLE));
    for field in IssueField::of(kind) {
        table = table.with_column(ColumnDef::text(field.column()).nullable());
    }
    table.with_column(ColumnDef::text(DETAIL))
}

pub fn entities_table() -> TableSchema {
    TableSchema::new(ENTITIES_TABLE)
        .with_column(ColumnDef::text(GUID_ZWC).primary_key())
        .with_column(ColumnDef::text(GUID))
        .with_column(ColumnDef::text(NAME).nullable())
        .with_column(ColumnDef::text(IFC_TYPE))
        .with_column(ColumnDef::text(FILE))
        .with_column(ColumnDef::text(IDENTIFIER))
        .with_column(ColumnDef::text(PROJECT))
        .with_column(ColumnDef::text(RUN_DATE))
}

/// Every table of the store, issue tables first.
pub fn store_tables() -> Vec<TableSchema> {
    IssueKind::ALL
        .into_iter()
        .map(issue_table)
        .chain(std::iter::once(entities_table()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_table_per_kind_plus_entities() {
        let tables = store_tables();
        assert_eq!(tables.len(), IssueKind::ALL.len() + 1);
        assert!(tables.iter().any(|t| t.name == "value_out_of_range"));
        assert_eq!(tables.last().unwrap().name, ENTITIES_TABLE);
    }

    #[test]
    fn test_kind_specific_columns() {
        let range = issue_table(IssueKind::ValueOutOfRange);
        assert!(range.has_column(PSET_NAME));
        assert!(range.has_column(ATTRIBUTE_NAME));
        assert!(range.has_column(VALUE));

        let empty = issue_table(IssueKind::EmptyGroup);
        assert!(!empty.has_column(PSET_NAME));
        assert!(!empty.has_column(VALUE));
        assert!(empty.has_column(DETAIL));
    }

    #[test]
    fn test_entities_column_order() {
        let table = entities_table();
        let names: Vec<&str> = table
            .columns
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(
            names,
            vec![GUID_ZWC, GUID, NAME, IFC_TYPE, FILE, IDENTIFIER, PROJECT, RUN_DATE]
        );
    }

    #[test]
    fn test_create_table_sql() {
        let sql = entities_table().create_table_sql();
        assert!(sql.starts_with("CREATE TABLE IF NOT EXISTS \"entities\""));
        assert!(sql.contains("\"GUID_ZWC\" TEXT NOT NULL PRIMARY KEY"));
        assert!(sql.contains("\"NAME\" TEXT, \"IFC_TYPE\" TEXT NOT NULL"));
        assert!(issue_table(IssueKind::EmptyGroup)
            .create_table_sql()
            .contains("\"ID\" INTEGER PRIMARY KEY"));

        let index = issue_table(IssueKind::EmptyGroup)
            .create_scope_index_sql()
            .unwrap();
        assert!(index.contains("(\"PROJECT\", \"RUN_DATE\", \"FILE\")"));
    }

    #[test]
    fn test_option_values() {
        assert_eq!(DbValue::from(None::<String>), DbValue::Null);
        assert_eq!(DbValue::from(Some("x")), DbValue::Text("x".to_string()));
    }
}
