//! Loading the office schema fixture from disk

use std::io::Write;
use std::path::PathBuf;

use som_schema::{Error, IdentifierIndex, SchemaLoader, ValueRule};
use tempfile::Builder;

fn testdata_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
        .join("testdata")
        .join(name)
}

#[test]
fn test_load_office_schema() -> anyhow::Result<()> {
    let schema = SchemaLoader::new().load_from_file(&testdata_path("office_schema.yaml"))?;

    assert_eq!(schema.name, "Office");
    assert_eq!(schema.objects.len(), 5);
    assert_eq!(schema.aggregations.len(), 5);
    assert!(schema.declares_attribute("Identity", "Identifier"));

    let wall = schema.object("WAL").unwrap();
    let width = wall
        .property_set("Pset_Wall")
        .and_then(|p| p.attribute("Width"))
        .unwrap();
    match &width.rule {
        ValueRule::Range(bounds) => {
            assert_eq!(bounds.len(), 1);
            assert_eq!((bounds[0].min, bounds[0].max), (0.1, 0.5));
        }
        other => panic!("expected range rule, got {other:?}"),
    }
    Ok(())
}

#[test]
fn test_office_topology() -> anyhow::Result<()> {
    let schema = SchemaLoader::new().load_from_file(&testdata_path("office_schema.yaml"))?;
    let index = IdentifierIndex::build(&schema);

    let parents_of = |ident: &str| -> Vec<String> {
        let object = index.get(ident).unwrap();
        schema
            .allowed_parents(object)
            .into_iter()
            .map(|o| o.ident_value.clone())
            .collect()
    };

    assert!(parents_of("BLD").is_empty());
    assert_eq!(parents_of("STR"), vec!["BLD"]);
    assert_eq!(parents_of("WAL"), vec!["STR"]);
    // inheritance edge to WAL is skipped
    assert_eq!(parents_of("LBW"), vec!["STR"]);
    assert_eq!(parents_of("DOR"), vec!["WAL"]);
    Ok(())
}

#[test]
fn test_load_json_file_by_extension() -> anyhow::Result<()> {
    let mut file = Builder::new().suffix(".json").tempfile()?;
    write!(
        file,
        r#"{{"name": "Json", "objects": [{{"ident_value": "A", "name": "A"}}]}}"#
    )?;

    let schema = SchemaLoader::new().load_from_file(file.path())?;
    assert_eq!(schema.name, "Json");
    assert!(schema.object("A").is_some());
    Ok(())
}

#[test]
fn test_missing_file() {
    let err = SchemaLoader::new()
        .load_from_file(&testdata_path("missing_schema.yaml"))
        .unwrap_err();
    assert!(matches!(err, Error::Io { .. }));
}
