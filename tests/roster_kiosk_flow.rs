use canteen_attendance::core::report::daily_summary;
use canteen_attendance::core::roster::RosterFilter;
use canteen_attendance::domain::model::{MealSlot, TokenBalance};
use canteen_attendance::domain::ports::{FixedClock, RecordStore};
use canteen_attendance::{
    AdmissionGate, AdmissionOutcome, CanteenConfig, CaptureOutcome, DenialReason, Kiosk,
    LabelIdentifier, MemoryStore, NotificationService, RosterService,
};
use chrono::{TimeZone, Utc};
use std::io::Write;
use std::sync::Arc;
use tempfile::{NamedTempFile, TempDir};

const ROSTER: &str = "\
Name,Roll Number,Department,Year,Email,Phone Number,Breakfast Tokens,Lunch Tokens,Dinner Tokens
Asha Menon,CS2021001,Computer Science,3,asha@example.com,9000000001,10,1,10
Ravi Kumar,ME2022004,Mechanical,2,ravi@example.com,9000000002,10,0,10
,EE2020042,Electrical,4,ghost@example.com,,1,1,1
";

#[tokio::test]
async fn test_import_capture_summarize_export() {
    let mut roster_file = NamedTempFile::new().unwrap();
    roster_file.write_all(ROSTER.as_bytes()).unwrap();

    // UTC+05:30; 07:00 UTC is 12:30 local, lunch time.
    let config = CanteenConfig::from_toml_str(
        r#"
[canteen]
name = "North Hall Mess"
utc_offset_minutes = 330
"#,
    )
    .unwrap();
    let schedule = config.meal_schedule().unwrap();
    let now = Utc.with_ymd_and_hms(2024, 3, 14, 7, 0, 0).unwrap();

    let store = Arc::new(MemoryStore::new());
    let roster = RosterService::new(Arc::clone(&store), config.roster.default_tokens);
    let imported = roster
        .import_csv(std::fs::File::open(roster_file.path()).unwrap())
        .await
        .unwrap();
    assert_eq!(imported.imported, 2);
    assert_eq!(imported.skipped_rows, vec![4]);

    let identifier = LabelIdentifier::from_roster(&store.list_students().await.unwrap());
    assert_eq!(identifier.len(), 2);

    let gate = Arc::new(AdmissionGate::with_clock(
        Arc::clone(&store),
        FixedClock(now),
        schedule,
        config.gate_policy(),
    ));
    let kiosk = Kiosk::new(config.canteen.name.clone(), identifier, gate);

    let asha = kiosk.capture(b"CS2021001", None).await.unwrap();
    match &asha {
        CaptureOutcome::Decided {
            outcome: AdmissionOutcome::Admitted { student, .. },
            ..
        } => assert_eq!(student.tokens, TokenBalance::new(10, 0, 10)),
        other => panic!("expected Asha to be admitted, got {:?}", other),
    }

    let again = kiosk.capture(b"cs2021001", None).await.unwrap();
    let ravi = kiosk.capture(b"ME2022004", None).await.unwrap();
    let stranger = kiosk.capture(b"XX0000000", None).await.unwrap();

    let reason = |capture: &CaptureOutcome| match capture {
        CaptureOutcome::Decided { outcome, .. } => outcome.denial().map(|d| d.reason),
        CaptureOutcome::Unrecognized => None,
    };
    // Asha's lunch balance is now empty, so the token check answers first.
    assert_eq!(reason(&again), Some(DenialReason::NoTokensAvailable));
    assert_eq!(reason(&ravi), Some(DenialReason::NoTokensAvailable));
    assert_eq!(stranger, CaptureOutcome::Unrecognized);

    let json = serde_json::to_value(&asha).unwrap();
    assert_eq!(json["result"], "decided");
    assert_eq!(json["outcome"]["status"], "admitted");

    let notices = NotificationService::with_clock(Arc::clone(&store), FixedClock(now), schedule);
    let missed_breakfast = notices
        .missed_meal(MealSlot::Breakfast, &RosterFilter::default())
        .await
        .unwrap();
    assert_eq!(missed_breakfast.title, "Missed Breakfast Attendance");
    assert_eq!(missed_breakfast.recipients.len(), 2);
    notices.queue(missed_breakfast).await.unwrap();

    let summary = daily_summary(store.as_ref(), &schedule, schedule.local_date(now))
        .await
        .unwrap();
    assert_eq!(summary.total_students, 2);
    assert_eq!(summary.count(MealSlot::Lunch), 1);
    assert_eq!(summary.attendance_rate_percent, 50);
    assert_eq!(summary.pending_notifications, 1);
    assert_eq!(summary.recent[0].student_name, "Asha Menon");

    let out_dir = TempDir::new().unwrap();
    let export_path = out_dir.path().join("students.csv");
    let written = roster
        .export_csv(std::fs::File::create(&export_path).unwrap())
        .await
        .unwrap();
    assert_eq!(written, 2);

    let exported = std::fs::read_to_string(&export_path).unwrap();
    assert!(exported.starts_with("Name,Roll Number,Department,Year,Email"));
    assert!(exported.contains("Asha Menon,CS2021001,Computer Science,3,asha@example.com,9000000001,10,0,10"));
}
