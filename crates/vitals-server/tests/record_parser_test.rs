//! Record parser tests against files on disk

mod common;

use common::{export_xml, quantity, sleep, steps, workout};
use vitals_server::ingest::{DropReason, ElementOutcome, ImportError, RecordParser};

fn write_export(elements: &[String]) -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("export.xml");
    std::fs::write(&path, export_xml(elements)).unwrap();
    (dir, path)
}

#[test]
fn test_parse_file_in_document_order() {
    let (_dir, path) = write_export(&[
        steps("10", "2023-01-01 08:00:00 +0000"),
        quantity("OxygenSaturation", "0.97", "2023-01-01 08:05:00 +0000"),
        sleep("AsleepREM", "2023-01-01 02:00:00 +0000", "2023-01-01 02:20:30 +0000"),
        workout("2023-01-01 07:00:00 +0000", Some("200")),
    ]);

    let outcomes: Vec<ElementOutcome> = RecordParser::open(&path)
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();

    let types: Vec<&str> = outcomes
        .iter()
        .map(|o| match o {
            ElementOutcome::Accepted(r) => r.record_type.as_str(),
            ElementOutcome::Dropped(_) => "dropped",
        })
        .collect();
    assert_eq!(
        types,
        vec![
            "HKQuantityTypeIdentifierStepCount",
            "HKQuantityTypeIdentifierOxygenSaturation",
            "HKCategoryValueSleepAnalysisAsleepREM",
            "HKQuantityTypeIdentifierActiveEnergyBurned",
        ]
    );

    match &outcomes[2] {
        ElementOutcome::Accepted(r) => assert_eq!(r.value, 20.5),
        other => panic!("unexpected outcome {:?}", other),
    }
}

#[test]
fn test_workout_with_bad_energy_is_dropped() {
    let (_dir, path) = write_export(&[workout("2023-01-01 07:00:00 +0000", Some("lots"))]);

    let outcomes: Vec<_> = RecordParser::open(&path).unwrap().collect();
    assert_eq!(outcomes.len(), 1);
    assert!(matches!(
        outcomes[0],
        Ok(ElementOutcome::Dropped(DropReason::InvalidValue(_)))
    ));
}

#[test]
fn test_missing_start_date_is_dropped() {
    let (_dir, path) = write_export(&[
        r#"<Record type="HKQuantityTypeIdentifierRespiratoryRate" value="14"/>"#.to_string(),
    ]);

    let outcomes: Vec<_> = RecordParser::open(&path).unwrap().collect();
    assert!(matches!(
        outcomes[0],
        Ok(ElementOutcome::Dropped(DropReason::MissingAttribute("startDate")))
    ));
}

#[test]
fn test_open_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let result = RecordParser::open(&dir.path().join("absent.xml"));
    assert!(matches!(result, Err(ImportError::Io(_))));
}

#[test]
fn test_doctype_is_tolerated() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("export.xml");
    let xml = format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <!DOCTYPE HealthData [\n<!ELEMENT HealthData (ExportDate,Me,(Record|Workout)*)>\n]>\n\
         <HealthData locale=\"en_US\">\n<ExportDate value=\"2023-02-01 10:00:00 +0000\"/>\n{}\n</HealthData>",
        steps("3", "2023-01-31 12:00:00 +0000")
    );
    std::fs::write(&path, xml).unwrap();

    let outcomes: Vec<_> = RecordParser::open(&path).unwrap().collect();
    assert_eq!(outcomes.len(), 1);
    assert!(matches!(outcomes[0], Ok(ElementOutcome::Accepted(_))));
}
