//! Reading stored issues back.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use som_validation::{EntityRecord, EntityRole, Issue, IssueKind};

use crate::connection::DbConnection;
use crate::schema::{
    DETAIL, ENTITIES_TABLE, FILE, GUID, IDENTIFIER, IFC_TYPE, IssueField, NAME, PROJECT, ROLE,
    RUN_DATE, Row, TIMESTAMP, issue_table_name,
};
use crate::sql::quote_identifier;
use crate::writer::RUN_DATE_FORMAT;
use crate::{Error, Result};

/// An issue as stored, with the scope it was written under
#[derive(Debug, Clone, PartialEq)]
pub struct StoredIssue {
    pub project: String,
    pub file: String,
    pub run_date: String,
    pub timestamp: String,
    pub issue: Issue,
}

/// Reader facade.
#[derive(Clone)]
pub struct IssueReader {
    connection: DbConnection,
}

impl fmt::Debug for IssueReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IssueReader").finish_non_exhaustive()
    }
}

impl IssueReader {
    pub fn new(connection: DbConnection) -> Self {
        Self { connection }
    }

    /// All issues of one run, grouped by kind and in insertion order within a kind.
    pub async fn issues(&self, project: &str, run_date: NaiveDate) -> Result<Vec<StoredIssue>> {
        let filter = run_filter(project, run_date);
        let mut issues = Vec::new();
        for kind in IssueKind::ALL {
            let table = issue_table_name(kind);
            for row in self.connection.select_rows(&table, &filter, Some("ID")).await? {
                issues.push(row_to_issue(&table, kind, &row)?);
            }
        }
        Ok(issues)
    }

    /// Issues of one run restricted to one file.
    pub async fn issues_for_file(
        &self,
        project: &str,
        run_date: NaiveDate,
        file: &str,
    ) -> Result<Vec<StoredIssue>> {
        Ok(self
            .issues(project, run_date)
            .await?
            .into_iter()
            .filter(|stored| stored.file == file)
            .collect())
    }

    /// Number of issues per kind for one run; kinds without issues are absent.
    pub async fn issue_counts(
        &self,
        project: &str,
        run_date: NaiveDate,
    ) -> Result<BTreeMap<IssueKind, usize>> {
        let date = run_date.format(RUN_DATE_FORMAT).to_string();
        let mut counts = BTreeMap::new();
        for kind in IssueKind::ALL {
            let table = issue_table_name(kind);
            let sql = format!(
                "SELECT COUNT(*) AS N FROM {} WHERE {} = ?1 AND {} = ?2",
                quote_identifier(&table),
                quote_identifier(PROJECT),
                quote_identifier(RUN_DATE)
            );
            let rows = self
                .connection
                .query_rows(
                    &table,
                    &sql,
                    vec![
                        libsql::Value::Text(project.to_string()),
                        libsql::Value::Text(date.clone()),
                    ],
                )
                .await?;
            let count = match rows.first().and_then(|row| row.get("N")) {
                Some(crate::DbValue::Integer(n)) => usize::try_from(*n).unwrap_or(0),
                _ => 0,
            };
            if count > 0 {
                counts.insert(kind, count);
            }
        }
        Ok(counts)
    }

    /// Entity records of a project, optionally restricted to one file.
    pub async fn entities(&self, project: &str, file: Option<&str>) -> Result<Vec<EntityRecord>> {
        let mut filter = Row::new();
        filter.insert(PROJECT.to_string(), project.into());
        if let Some(file) = file {
            filter.insert(FILE.to_string(), file.into());
        }
        self.connection
            .select_rows(ENTITIES_TABLE, &filter, Some(GUID))
            .await?
            .iter()
            .map(|row| -> Result<EntityRecord> {
                Ok(EntityRecord {
                    guid: required(ENTITIES_TABLE, row, GUID)?,
                    name: optional(row, NAME),
                    ifc_type: required(ENTITIES_TABLE, row, IFC_TYPE)?,
                    identifier: required(ENTITIES_TABLE, row, IDENTIFIER)?,
                })
            })
            .collect()
    }

    /// Most recent run date recorded for a project.
    pub async fn latest_run_date(&self, project: &str) -> Result<Option<NaiveDate>> {
        let sql = format!(
            "SELECT MAX({}) AS LATEST FROM {} WHERE {} = ?1",
            quote_identifier(RUN_DATE),
            quote_identifier(ENTITIES_TABLE),
            quote_identifier(PROJECT)
        );
        let rows = self
            .connection
            .query_rows(
                ENTITIES_TABLE,
                &sql,
                vec![libsql::Value::Text(project.to_string())],
            )
            .await?;
        let Some(latest) = rows.first().and_then(|row| optional(row, "LATEST")) else {
            return Ok(None);
        };
        NaiveDate::parse_from_str(&latest, RUN_DATE_FORMAT)
            .map(Some)
            .map_err(|err| Error::Query {
                table: ENTITIES_TABLE.to_string(),
                details: format!("Invalid run date '{latest}': {err}"),
            })
    }
}

fn run_filter(project: &str, run_date: NaiveDate) -> Row {
    let mut filter = Row::new();
    filter.insert(PROJECT.to_string(), project.into());
    filter.insert(
        RUN_DATE.to_string(),
        run_date.format(RUN_DATE_FORMAT).to_string().into(),
    );
    filter
}

fn optional(row: &Row, column: &str) -> Option<String> {
    row.get(column)
        .and_then(|value| value.as_str())
        .map(ToString::to_string)
}

fn required(table: &str, row: &Row, column: &str) -> Result<String> {
    optional(row, column).ok_or_else(|| Error::Query {
        table: table.to_string(),
        details: format!("Column '{column}' is missing or not text"),
    })
}

fn row_to_issue(table: &str, kind: IssueKind, row: &Row) -> Result<StoredIssue> {
    let role = required(table, row, ROLE)?
        .parse::<EntityRole>()
        .map_err(|details| Error::Query {
            table: table.to_string(),
            details,
        })?;
    let mut issue = Issue::new(
        kind,
        required(table, row, GUID)?,
        role,
        required(table, row, DETAIL)?,
    );
    for field in IssueField::of(kind) {
        let value = optional(row, field.column());
        match field {
            IssueField::PropertySet => issue.property_set = value,
            IssueField::Attribute => issue.attribute = value,
            IssueField::Value => issue.value = value,
        }
    }

    Ok(StoredIssue {
        project: required(table, row, PROJECT)?,
        file: required(table, row, FILE)?,
        run_date: required(table, row, RUN_DATE)?,
        timestamp: required(table, row, TIMESTAMP)?,
        issue,
    })
}
