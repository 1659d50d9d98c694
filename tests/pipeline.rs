//! Export, backup and import through the public library API.

use std::collections::BTreeSet;
use std::fs;

use chrono::{TimeZone, Utc};
use tempfile::tempdir;

use lifelog::application::{
    build_export_text, extract_tags, parse_csv_backup, DateRange, ExportOutcome, JournalService,
};
use lifelog::domain::{AppConfig, ExportEncoding, FormatConfig, Language, PathConfig, RecordStore};
use lifelog::infrastructure::{encode_export, LocalStorage};

fn config_in(dir: &std::path::Path) -> AppConfig {
    let mut config = AppConfig {
        paths: PathConfig {
            data_dir: Some(dir.to_path_buf()),
        },
        ..AppConfig::default()
    };
    config.display.utc_offset_minutes = Some(9 * 60);
    config.display.language = Language::Ja;
    config
}

#[test]
fn csv_export_imports_into_a_fresh_journal() {
    let source_dir = tempdir().unwrap();
    let config = config_in(source_dir.path());
    let mut journal = JournalService::new(&config).unwrap();

    let first = journal
        .add(
            "朝のランニング #運動 #🔥streak",
            Some(Utc.with_ymd_and_hms(2024, 3, 5, 22, 30, 0).unwrap()),
        )
        .unwrap();
    let second = journal
        .add(
            "quote \"this\", then a comma",
            Some(Utc.with_ymd_and_hms(2024, 3, 6, 1, 0, 0).unwrap()),
        )
        .unwrap();

    let export_path = config.export_file_path();
    let outcome = journal
        .export_csv(None, ExportEncoding::ShiftJis, &export_path)
        .unwrap_or_else(|e| panic!("export failed: {e}"));
    assert!(matches!(outcome, ExportOutcome::Written { count: 2, .. }));
    assert!(export_path.ends_with("lifelog/export_file.csv"));

    let target_dir = tempdir().unwrap();
    let mut target = JournalService::new(&config_in(target_dir.path())).unwrap();
    assert_eq!(
        target
            .import(&export_path, Some(ExportEncoding::ShiftJis))
            .unwrap(),
        2
    );

    let restored = target.show(&first.id.to_string()).unwrap();
    // Shift_JIS has no 🔥, so the export carries a numeric character reference.
    assert_eq!(restored.text, "朝のランニング #運動 #&#128293;streak");
    assert_eq!(restored.created_at, first.created_at);
    assert_eq!(restored.create_time, "07:30");
    assert!(restored.tags.contains("#運動"));

    let restored = target.show(&second.id.to_string()).unwrap();
    assert_eq!(restored.text, second.text);
}

#[test]
fn backup_import_twice_yields_same_set() {
    let dir = tempdir().unwrap();
    let config = config_in(dir.path());
    let mut journal = JournalService::new(&config).unwrap();
    for day in 1..=3 {
        journal
            .add(
                &format!("day {day} #daily"),
                Some(Utc.with_ymd_and_hms(2024, 3, day, 12, 0, 0).unwrap()),
            )
            .unwrap();
    }

    let backup_path = config.backup_file_path();
    journal.backup(&backup_path).unwrap();
    let before = journal.list(0, 100).unwrap();

    journal.import(&backup_path, None).unwrap();
    journal.import(&backup_path, None).unwrap();

    assert_eq!(journal.list(0, 100).unwrap(), before);
    assert_eq!(journal.tags().unwrap()[0].count, 3);
}

#[test]
fn ranged_export_only_contains_the_range() {
    let dir = tempdir().unwrap();
    let config = config_in(dir.path());
    let mut journal = JournalService::new(&config).unwrap();
    for day in 1..=5 {
        journal
            .add(
                &format!("day {day}"),
                Some(Utc.with_ymd_and_hms(2024, 3, day, 3, 0, 0).unwrap()),
            )
            .unwrap();
    }

    let range = DateRange::from_days("2024-03-02", "2024-03-03", journal.format()).unwrap();
    let path = config.export_file_path();
    journal
        .export_csv(Some(range), ExportEncoding::Utf8Bom, &path)
        .unwrap();

    let bytes = fs::read(&path).unwrap();
    assert_eq!(&bytes[..3], &[0xEF, 0xBB, 0xBF]);
    let text = String::from_utf8(bytes[3..].to_vec()).unwrap();
    assert_eq!(text.lines().count(), 3);
    assert!(text.contains("day 2") && text.contains("day 3"));
    assert!(!text.contains("day 4"));
}

#[test]
fn spreadsheet_resave_is_recovered() {
    let format = FormatConfig::with_offset_minutes(Language::En, 0);
    let at = Utc.with_ymd_and_hms(2024, 3, 5, 14, 7, 9).unwrap();
    let records: Vec<_> = ["walk #outside", "read #books"]
        .iter()
        .map(|text| {
            lifelog::domain::LogRecord::new(*text, at, &format).with_tags(extract_tags(text))
        })
        .collect();

    // A spreadsheet re-save turns the comma layout into tab separation.
    let resaved = build_export_text(&records, &format)
        .replace(",\"", "\t\"")
        .replace("\",", "\"\t");
    let parsed = parse_csv_backup(&resaved, &format);

    assert_eq!(parsed.len(), 2);
    assert_eq!(parsed[0].id, records[0].id);
    assert_eq!(parsed[1].id, records[1].id);
    assert_eq!(parsed[1].tags, BTreeSet::from(["#books".to_string()]));
}

#[test]
fn store_contract_is_idempotent() {
    let dir = tempdir().unwrap();
    let mut store = LocalStorage::open(&dir.path().join("lifelog.db")).unwrap();
    let format = FormatConfig::with_offset_minutes(Language::En, 0);
    let record = lifelog::domain::LogRecord::new("x #y", Utc::now(), &format)
        .with_tags(extract_tags("x #y"));

    assert_eq!(store.upsert_records(std::slice::from_ref(&record)).unwrap(), 1);
    assert_eq!(store.upsert_records(std::slice::from_ref(&record)).unwrap(), 1);
    assert_eq!(store.count().unwrap(), 1);
    assert_eq!(store.get(record.id).unwrap(), record);

    assert_eq!(&encode_export("a", ExportEncoding::Utf8Bom)[..3], &[0xEF, 0xBB, 0xBF]);
}
