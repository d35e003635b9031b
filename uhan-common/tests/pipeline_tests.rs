//! End-to-end tests of the form pipeline against a SQLite database file
//!
//! Covers saving and reloading a session across a database reopen, ULCI
//! history ordering, preview export to PDF and the member table.

use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine;
use chrono::NaiveDate;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

use uhan_common::db::{init_database, DATABASE_FILE};
use uhan_common::export::{ClientBitmapRasterizer, ClientCapture, ExportError, LopdfPacker};
use uhan_common::members::{
    ListQuery, MemberInput, MemberRegistry, MemberRole, SortDirection, SortField,
};
use uhan_common::qr::SvgQrRenderer;
use uhan_common::session::SaveOutcome;
use uhan_common::storage::{LoadOutcome, RecordStore, SqliteStorage, DEFAULT_HISTORY_CAP};
use uhan_common::{FormModel, FormSession, PageKind};

async fn open_store(dir: &TempDir) -> RecordStore {
    let pool = init_database(&dir.path().join(DATABASE_FILE))
        .await
        .expect("database should open");
    RecordStore::new(Arc::new(SqliteStorage::new(pool)), DEFAULT_HISTORY_CAP)
}

fn session(kind: PageKind, store: RecordStore) -> FormSession {
    FormSession::new(
        kind,
        store,
        Arc::new(SvgQrRenderer),
        Duration::from_millis(20),
        None,
    )
}

fn facilitator_form() -> FormModel {
    FormModel::new()
        .with("name", "Asha Rao")
        .with("uhanId", "UHAN-2024-001")
        .with("email", "asha@example.org")
        .with("slider1", 4)
        .with("slider2", 3)
        .with("slider3", 5)
        .with("slider4", 2)
        .with("slider5", 4)
}

#[tokio::test]
async fn test_saved_form_survives_database_reopen() {
    let dir = tempfile::tempdir().unwrap();

    {
        let store = open_store(&dir).await;
        let s = session(PageKind::Facilitator, store);
        s.update(facilitator_form()).await;
        assert!(matches!(s.save().await.unwrap(), SaveOutcome::Saved(_)));
    }

    let store = open_store(&dir).await;
    let s = session(PageKind::Facilitator, store);
    assert!(matches!(s.load().await.unwrap(), LoadOutcome::Found(_)));

    let rendered = s.latest();
    assert_eq!(rendered.score.total, 18.0);
    assert_eq!(rendered.score.percentage, 72.0);
    assert_eq!(rendered.preview.text("totalScore"), Some("18/25"));
    assert!(!rendered.qr.is_placeholder());
}

#[tokio::test]
async fn test_ulci_history_newest_first() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir).await;
    let s = session(PageKind::UlciCard, store);

    for (name, score) in [("First", 50), ("Second", 60), ("Third", 70)] {
        s.update(
            FormModel::new()
                .with("name", name)
                .with("scoreE", score)
                .with("scoreS", score)
                .with("scoreC", score)
                .with("scoreH", score)
                .with("scoreI", score),
        )
        .await;
        assert!(matches!(s.save().await.unwrap(), SaveOutcome::Saved(_)));
    }

    let names: Vec<String> = s
        .history()
        .await
        .unwrap()
        .iter()
        .filter_map(|r| r.to_form().text("name"))
        .collect();
    assert_eq!(names, vec!["Third", "Second", "First"]);
}

#[tokio::test]
async fn test_export_client_capture_to_pdf() {
    let dir = tempfile::tempdir().unwrap();
    let s = session(PageKind::Facilitator, open_store(&dir).await);
    s.update(facilitator_form()).await;

    let (width, height) = (40u32, 20u32);
    let capture = ClientCapture {
        target: "reportCard".to_string(),
        width,
        height,
        rgba: B64.encode(vec![200u8; (width * height * 4) as usize]),
        tainted: false,
        scale: 2.0,
    };

    let doc = s
        .export(&ClientBitmapRasterizer::new(Some(capture)), &LopdfPacker)
        .await
        .unwrap();
    assert!(doc.file_name.starts_with("UHAN_Facilitator_Report_Asha_Rao_"));
    assert!(doc.file_name.ends_with(".pdf"));
    assert_eq!(doc.page_count, 1);
    assert!(doc.bytes.starts_with(b"%PDF"));
    assert!(!s.is_exporting());

    let err = s
        .export(&ClientBitmapRasterizer::new(None), &LopdfPacker)
        .await
        .unwrap_err();
    assert!(matches!(err, ExportError::MissingTarget(_)));
}

fn member(n: u32, power: i64) -> MemberInput {
    MemberInput {
        full_name: Some(format!("Member {:02}", n)),
        ulp_id: Some(format!("ULP-IND-ASSAM-{:05}", n)),
        email: Some(format!("member{}@daovillage.org", n)),
        role: Some(MemberRole::Citizen),
        village_cluster: Some("Dhuli Moradiring".to_string()),
        join_date: NaiveDate::from_ymd_opt(2024, 3, n.min(28)),
        voting_power: Some(power),
        ..MemberInput::default()
    }
}

#[tokio::test]
async fn test_member_table_second_page_by_voting_power() {
    let dir = tempfile::tempdir().unwrap();
    let registry = MemberRegistry::load(open_store(&dir).await, None).await.unwrap();

    // Members 11 and 12 share the lowest power
    for n in 1..=12 {
        let power = if n > 10 { 5 } else { 100 + i64::from(n) * 10 };
        registry.add(member(n, power)).await.unwrap();
    }

    let query = ListQuery {
        sort: SortField::VotingPower,
        direction: SortDirection::Desc,
        page: Some(2),
        q: None,
    };
    let page = registry.list(&query).await;
    assert_eq!(page.total, 12);
    assert_eq!(page.total_pages, 2);
    assert_eq!(page.page, 2);

    let names: Vec<&str> = page.members.iter().map(|m| m.full_name.as_str()).collect();
    assert_eq!(names, vec!["Member 11", "Member 12"]);

    let first = registry.list(&ListQuery { page: Some(1), ..query.clone() }).await;
    assert_eq!(first.members.len(), 10);
    assert_eq!(first.members[0].full_name, "Member 10");

    // Reopening the database sees the same members
    let reloaded = MemberRegistry::load(open_store(&dir).await, None).await.unwrap();
    assert_eq!(reloaded.stats().await.total, 12);
}
