//! Writing issues and entity records.

use std::fmt;
use std::path::Path;

use chrono::{NaiveDate, Utc};
use som_validation::{EntityRecord, Issue, IssueKind};
use tracing::{debug, info};

use crate::Result;
use crate::connection::{ConnectionConfig, DbConnection, DbTransaction};
use crate::reader::IssueReader;
use crate::schema::{
    DETAIL, ENTITIES_TABLE, FILE, GUID, GUID_ZWC, IDENTIFIER, IFC_TYPE, IssueField, NAME,
    PROJECT, ROLE, RUN_DATE, Row, TIMESTAMP, issue_table_name, store_tables,
};

pub(crate) const RUN_DATE_FORMAT: &str = "%Y-%m-%d";

/// The (project, run date, file) triple one check writes under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileScope {
    pub project: String,
    pub file: String,
    pub run_date: NaiveDate,
}

impl FileScope {
    pub fn new(project: impl Into<String>, file: impl Into<String>, run_date: NaiveDate) -> Self {
        Self {
            project: project.into(),
            file: file.into(),
            run_date,
        }
    }

    pub fn run_date_text(&self) -> String {
        self.run_date.format(RUN_DATE_FORMAT).to_string()
    }

    fn issue_filter(&self) -> Row {
        let mut row = Row::new();
        row.insert(PROJECT.to_string(), self.project.as_str().into());
        row.insert(RUN_DATE.to_string(), self.run_date_text().into());
        row.insert(FILE.to_string(), self.file.as_str().into());
        row
    }

    fn entity_filter(&self) -> Row {
        let mut row = Row::new();
        row.insert(PROJECT.to_string(), self.project.as_str().into());
        row.insert(FILE.to_string(), self.file.as_str().into());
        row
    }
}

/// Issue store backed by a libsql database.
#[derive(Clone)]
pub struct IssueStore {
    connection: DbConnection,
}

impl fmt::Debug for IssueStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IssueStore")
            .field("database", &self.connection.config().database_url)
            .finish()
    }
}

impl IssueStore {
    /// Open the database and create every issue table plus the entity table.
    pub async fn init(config: ConnectionConfig) -> Result<Self> {
        let connection = DbConnection::open(config).await?;
        connection.apply_tables(&store_tables()).await?;
        Ok(Self { connection })
    }

    /// Open a database file, creating its parent directory when missing.
    pub async fn init_path(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        Self::init(ConnectionConfig::local(path.to_string_lossy())).await
    }

    pub fn connection(&self) -> &DbConnection {
        &self.connection
    }

    pub fn reader(&self) -> IssueReader {
        IssueReader::new(self.connection.clone())
    }

    /// Start writing the results of one file.
    ///
    /// Rows stored earlier for the same scope are removed inside the same
    /// transaction, so a re-check replaces them once committed.
    pub async fn begin_file(&self, scope: FileScope) -> Result<IssueTransaction> {
        let tx = self.connection.begin_transaction().await?;
        let mut transaction = IssueTransaction {
            tx,
            scope,
            timestamp: Utc::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            issues: 0,
            entities: 0,
        };
        transaction.remove_existing().await?;
        Ok(transaction)
    }
}

/// Writes for one checked file, committed or rolled back as a unit
pub struct IssueTransaction {
    tx: DbTransaction,
    scope: FileScope,
    timestamp: String,
    issues: usize,
    entities: usize,
}

impl fmt::Debug for IssueTransaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IssueTransaction")
            .field("scope", &self.scope)
            .field("issues", &self.issues)
            .field("entities", &self.entities)
            .finish_non_exhaustive()
    }
}

impl IssueTransaction {
    pub fn scope(&self) -> &FileScope {
        &self.scope
    }

    /// Delete the issues of this (project, run date, file) and the file's entity rows.
    pub async fn remove_existing(&mut self) -> Result<u64> {
        let filter = self.scope.issue_filter();
        let mut removed = 0;
        for kind in IssueKind::ALL {
            removed += self.tx.delete_rows(&issue_table_name(kind), &filter).await?;
        }
        removed += self
            .tx
            .delete_rows(ENTITIES_TABLE, &self.scope.entity_filter())
            .await?;
        if removed > 0 {
            debug!(file = %self.scope.file, removed, "Removed rows of a previous check");
        }
        Ok(removed)
    }

    pub async fn add_issue(&mut self, issue: &Issue) -> Result<()> {
        let mut row = Row::new();
        row.insert(GUID.to_string(), issue.guid.as_str().into());
        row.insert(PROJECT.to_string(), self.scope.project.as_str().into());
        row.insert(FILE.to_string(), self.scope.file.as_str().into());
        row.insert(RUN_DATE.to_string(), self.scope.run_date_text().into());
        row.insert(TIMESTAMP.to_string(), self.timestamp.as_str().into());
        row.insert(ROLE.to_string(), issue.role.as_str().into());
        row.insert(DETAIL.to_string(), issue.detail.as_str().into());
        for field in IssueField::of(issue.kind) {
            let value = match field {
                IssueField::PropertySet => issue.property_set.as_deref(),
                IssueField::Attribute => issue.attribute.as_deref(),
                IssueField::Value => issue.value.as_deref(),
            };
            row.insert(field.column().to_string(), value.into());
        }

        self.tx.insert_row(&issue_table_name(issue.kind), &row).await?;
        self.issues += 1;
        Ok(())
    }

    pub async fn add_issues(&mut self, issues: &[Issue]) -> Result<usize> {
        for issue in issues {
            self.add_issue(issue).await?;
        }
        Ok(issues.len())
    }

    /// Record a checked entity; a second record for the same GlobalId in
    /// the same project and file replaces the first.
    pub async fn create_entity(&mut self, record: &EntityRecord) -> Result<()> {
        let mut row = Row::new();
        row.insert(
            GUID_ZWC.to_string(),
            entity_key(&self.scope.project, &self.scope.file, &record.guid).into(),
        );
        row.insert(GUID.to_string(), record.guid.as_str().into());
        row.insert(NAME.to_string(), record.name.as_deref().into());
        row.insert(IFC_TYPE.to_string(), record.ifc_type.as_str().into());
        row.insert(FILE.to_string(), self.scope.file.as_str().into());
        row.insert(IDENTIFIER.to_string(), record.identifier.as_str().into());
        row.insert(PROJECT.to_string(), self.scope.project.as_str().into());
        row.insert(RUN_DATE.to_string(), self.scope.run_date_text().into());

        self.tx.upsert_row(ENTITIES_TABLE, GUID_ZWC, &row).await?;
        self.entities += 1;
        Ok(())
    }

    pub async fn commit(self) -> Result<()> {
        self.tx.commit().await?;
        info!(
            file = %self.scope.file,
            issues = self.issues,
            entities = self.entities,
            "Stored check results"
        );
        Ok(())
    }

    pub async fn rollback(self) -> Result<()> {
        self.tx.rollback().await?;
        info!(file = %self.scope.file, "Discarded check results");
        Ok(())
    }
}

/// Surrogate key of an entity row, unique per project and file.
pub fn entity_key(project: &str, file: &str, guid: &str) -> String {
    format!("{project}:{file}:{guid}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use som_validation::EntityRole;

    fn scope() -> FileScope {
        FileScope::new("Office", "office.ifc", NaiveDate::from_ymd_opt(2024, 5, 2).unwrap())
    }

    #[test]
    fn test_scope_filters() {
        let scope = scope();
        assert_eq!(scope.run_date_text(), "2024-05-02");
        assert_eq!(scope.issue_filter().len(), 3);
        assert_eq!(scope.entity_filter().len(), 2);
        assert_eq!(entity_key("Office", "a.ifc", "g"), "Office:a.ifc:g");
    }

    #[tokio::test]
    async fn test_issue_row_only_has_kind_columns() {
        let store = IssueStore::init(ConnectionConfig::in_memory()).await.unwrap();
        let mut tx = store.begin_file(scope()).await.unwrap();
        // the value would not fit the empty_group table
        let issue = Issue::new(IssueKind::EmptyGroup, "g", EntityRole::Group, "empty").with_value("x");
        tx.add_issue(&issue).await.unwrap();
        tx.commit().await.unwrap();

        let rows = store
            .connection()
            .select_rows("empty_group", &Row::new(), None)
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert!(!rows[0].contains_key(crate::schema::VALUE));
        assert_eq!(rows[0].get(ROLE).and_then(|v| v.as_str()), Some("Group"));
    }
}
