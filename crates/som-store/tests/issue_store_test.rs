//! Writing and reading issues through a database file

use chrono::NaiveDate;
use som_store::{FileScope, IssueStore};
use som_validation::{EntityRecord, EntityRole, Issue, IssueKind};
use tempfile::TempDir;

fn run_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 5, 2).unwrap()
}

fn issues() -> Vec<Issue> {
    vec![
        Issue::new(
            IssueKind::ValueOutOfRange,
            "E1",
            EntityRole::Element,
            "Value 15 is outside [0, 10]",
        )
        .with_property_set("P1")
        .with_attribute("A1")
        .with_value("15"),
        Issue::new(
            IssueKind::NoGroupMembership,
            "E2",
            EntityRole::Element,
            "IFCWALL is not assigned to any group",
        ),
        Issue::new(IssueKind::EmptyGroup, "G1", EntityRole::Group, "Group is empty"),
    ]
}

fn entity(guid: &str, identifier: &str) -> EntityRecord {
    EntityRecord {
        guid: guid.to_string(),
        name: Some(format!("Entity {guid}")),
        ifc_type: "IFCWALL".to_string(),
        identifier: identifier.to_string(),
    }
}

async fn write_file(store: &IssueStore, file: &str, issues: &[Issue]) -> anyhow::Result<()> {
    write_project_file(store, "Office", file, issues).await
}

async fn write_project_file(
    store: &IssueStore,
    project: &str,
    file: &str,
    issues: &[Issue],
) -> anyhow::Result<()> {
    let mut tx = store
        .begin_file(FileScope::new(project, file, run_date()))
        .await?;
    tx.add_issues(issues).await?;
    tx.create_entity(&entity("E1", "O1")).await?;
    tx.create_entity(&entity("E2", "")).await?;
    tx.commit().await?;
    Ok(())
}

#[tokio::test]
async fn test_issues_round_trip_through_database_file() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let store = IssueStore::init_path(&dir.path().join("db").join("issues.db")).await?;
    write_file(&store, "a.ifc", &issues()).await?;

    let stored = store.reader().issues("Office", run_date()).await?;
    assert_eq!(stored.len(), 3);
    let range = stored
        .iter()
        .find(|s| s.issue.kind == IssueKind::ValueOutOfRange)
        .unwrap();
    assert_eq!(range.issue, issues()[0]);
    assert_eq!(range.file, "a.ifc");
    assert_eq!(range.run_date, "2024-05-02");

    let entities = store.reader().entities("Office", Some("a.ifc")).await?;
    assert_eq!(entities.len(), 2);
    assert_eq!(entities[0], entity("E1", "O1"));
    Ok(())
}

#[tokio::test]
async fn test_recheck_replaces_previous_rows() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let store = IssueStore::init_path(&dir.path().join("issues.db")).await?;

    write_file(&store, "a.ifc", &issues()).await?;
    write_file(&store, "b.ifc", &issues()[..1]).await?;
    write_file(&store, "a.ifc", &issues()).await?;

    let reader = store.reader();
    assert_eq!(reader.issues_for_file("Office", run_date(), "a.ifc").await?.len(), 3);
    assert_eq!(reader.issues_for_file("Office", run_date(), "b.ifc").await?.len(), 1);

    let counts = reader.issue_counts("Office", run_date()).await?;
    assert_eq!(counts.get(&IssueKind::ValueOutOfRange), Some(&2));
    assert_eq!(counts.get(&IssueKind::EmptyGroup), Some(&1));
    assert_eq!(counts.get(&IssueKind::IllegalParentGroup), None);

    assert_eq!(reader.entities("Office", None).await?.len(), 4);
    assert_eq!(reader.latest_run_date("Office").await?, Some(run_date()));
    assert_eq!(reader.latest_run_date("Other").await?, None);
    Ok(())
}

#[tokio::test]
async fn test_rolled_back_file_leaves_previous_results() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("issues.db");
    {
        let store = IssueStore::init_path(&path).await?;
        write_file(&store, "a.ifc", &issues()).await?;
    }

    // reopening the same file keeps the tables and their rows
    let store = IssueStore::init_path(&path).await?;
    let mut tx = store
        .begin_file(FileScope::new("Office", "a.ifc", run_date()))
        .await?;
    tx.add_issues(&issues()[..1]).await?;
    tx.rollback().await?;

    let stored = store.reader().issues("Office", run_date()).await?;
    assert_eq!(stored.len(), 3);
    Ok(())
}

#[tokio::test]
async fn test_projects_sharing_a_file_name_keep_their_entities() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let store = IssueStore::init_path(&dir.path().join("issues.db")).await?;

    write_project_file(&store, "Office", "office.ifc", &issues()).await?;
    write_project_file(&store, "Depot", "office.ifc", &issues()[..1]).await?;

    let reader = store.reader();
    assert_eq!(reader.entities("Office", Some("office.ifc")).await?.len(), 2);
    assert_eq!(reader.entities("Depot", Some("office.ifc")).await?.len(), 2);
    assert_eq!(reader.issues("Office", run_date()).await?.len(), 3);
    assert_eq!(reader.issues("Depot", run_date()).await?.len(), 1);
    Ok(())
}
