//! Board service: persistence, events and attribution around the record store

use planboard_common::db::{init_database, BoardRepository};
use planboard_common::models::{Allocation, CampaignType, ChatRole, PlanFields, TitleFields};
use planboard_common::scoring::{AuthorDirectory, ScoringConfig};
use planboard_common::{Board, BoardEvent, BoardOptions, BoardService, Error, TitleFilter};
use tempfile::TempDir;

async fn open(dir: &TempDir) -> BoardService {
    open_with(dir, BoardOptions::default()).await
}

async fn open_with(dir: &TempDir, options: BoardOptions) -> BoardService {
    let pool = init_database(&dir.path().join("board.db")).await.unwrap();
    let board = Board::new(options, ScoringConfig::default(), AuthorDirectory::default());
    BoardService::open(BoardRepository::new(pool), board, "Ana", None)
        .await
        .unwrap()
}

fn book(title: &str, author: &str) -> TitleFields {
    TitleFields {
        title: title.to_string(),
        author: author.to_string(),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_mutations_survive_restart() {
    let dir = TempDir::new().unwrap();
    {
        let service = open(&dir).await;
        let title = service.create_title(book("The Long Tide", "M. Reyes")).await.unwrap();
        service
            .upsert_plan(
                &title.id,
                PlanFields {
                    campaign_type: Some(CampaignType::Marquee),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
    }

    let service = open(&dir).await;
    assert_eq!(service.list_titles(&TitleFilter::default()).await.len(), 1);
    assert_eq!(service.list_plans().await.len(), 1);
    let (_, usage) = service.allocation().await;
    assert_eq!(usage.marquee.used, 1);
    assert_eq!(service.activities().await.len(), 2);
}

#[tokio::test]
async fn test_create_publishes_title_then_activity() {
    let dir = TempDir::new().unwrap();
    let service = open(&dir).await;
    let mut events = service.events().subscribe();

    let title = service.create_title(book("Evented", "Writer")).await.unwrap();

    match events.recv().await.unwrap() {
        BoardEvent::TitleSaved { title: saved, created, .. } => {
            assert!(created);
            assert_eq!(saved.id, title.id);
        }
        other => panic!("unexpected event {:?}", other),
    }
    match events.recv().await.unwrap() {
        BoardEvent::ActivityAppended { activity } => {
            assert_eq!(activity.user, "Ana");
            assert!(activity.message.starts_with("Ana added new title \"Evented\""));
        }
        other => panic!("unexpected event {:?}", other),
    }
}

#[tokio::test]
async fn test_delete_title_removes_only_its_plan() {
    let dir = TempDir::new().unwrap();
    let service = open(&dir).await;
    let first = service.create_title(book("First", "Writer")).await.unwrap();
    let second = service.create_title(book("Second", "Writer")).await.unwrap();
    for id in [&first.id, &second.id] {
        service.upsert_plan(id, PlanFields::default()).await.unwrap();
    }

    service.delete_title(&first.id).await.unwrap();

    let plans = service.list_plans().await;
    assert_eq!(plans.len(), 1);
    assert_eq!(plans[0].title_id, second.id);
    assert!(matches!(service.get_title(&first.id).await, Err(Error::NotFound(_))));
}

#[tokio::test]
async fn test_allocation_enforced_when_configured() {
    let dir = TempDir::new().unwrap();
    let service = open_with(
        &dir,
        BoardOptions {
            enforce_allocation: true,
            ..Default::default()
        },
    )
    .await;
    service
        .set_allocation(Allocation {
            marquee_total: 1,
            blockbuster_total: 6,
        })
        .await;

    let marquee = PlanFields {
        campaign_type: Some(CampaignType::Marquee),
        ..Default::default()
    };
    let first = service.create_title(book("First", "Writer")).await.unwrap();
    let second = service.create_title(book("Second", "Writer")).await.unwrap();
    service.upsert_plan(&first.id, marquee.clone()).await.unwrap();

    let result = service.upsert_plan(&second.id, marquee).await;
    assert!(matches!(result, Err(Error::CapacityExceeded(_))));
}

#[tokio::test]
async fn test_set_user_persists_and_attributes() {
    let dir = TempDir::new().unwrap();
    {
        let service = open(&dir).await;
        assert_eq!(service.current_user().await, "Ana");
        assert!(matches!(service.set_user("   ").await, Err(Error::InvalidInput(_))));

        service.set_user(" Bo ").await.unwrap();
        let activities = service.activities().await;
        assert_eq!(activities[0].message, "Bo joined the planning session");
    }

    let service = open(&dir).await;
    assert_eq!(service.current_user().await, "Bo");
    let title = service.create_title(book("Attributed", "Writer")).await.unwrap();
    assert_eq!(title.created_by, "Bo");
}

#[tokio::test]
async fn test_import_csv_reports_counts() {
    let dir = TempDir::new().unwrap();
    let service = open(&dir).await;
    service.create_title(book("Existing", "Writer")).await.unwrap();

    let csv = "Title ID,Title,Author,Priority\n\
               1,Existing,Writer,High\n\
               2,Fresh,Someone,Low\n\
               3,No Author,,Medium\n";
    let report = service.import_csv(csv, "planning.csv").await.unwrap();

    assert_eq!(report.imported, 1);
    assert_eq!(report.duplicates, 1);
    assert_eq!(report.dropped, 1);
    assert_eq!(service.list_titles(&TitleFilter::default()).await.len(), 2);
    assert_eq!(
        service.activities().await[0].message,
        "Ana imported 1 titles from planning.csv"
    );

    assert!(matches!(service.import_csv("", "empty.csv").await, Err(Error::InvalidInput(_))));
}

#[tokio::test]
async fn test_chat_round_trip() {
    let dir = TempDir::new().unwrap();
    let service = open(&dir).await;

    let messages = service.send_chat("What about the budget?").await.unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, ChatRole::User);
    assert_eq!(messages[1].role, ChatRole::Bot);
    assert!(messages[1].content.contains("$0"));
    assert_eq!(service.chat_history().await.len(), 2);

    assert!(matches!(service.send_chat("  ").await, Err(Error::InvalidInput(_))));

    service.clear_chat().await;
    assert!(service.chat_history().await.is_empty());
}

#[tokio::test]
async fn test_paused_feed_records_nothing() {
    let dir = TempDir::new().unwrap();
    let service = open(&dir).await;

    service.set_activity_paused(true).await;
    service.create_title(book("Quiet", "Writer")).await.unwrap();
    assert!(service.activities().await.is_empty());

    service.set_activity_paused(false).await;
    service.create_title(book("Loud", "Writer")).await.unwrap();
    assert_eq!(service.activities().await.len(), 1);

    assert_eq!(service.clear_activities().await, 1);
    assert!(service.activities().await.is_empty());
}

#[tokio::test]
async fn test_sync_disabled() {
    let dir = TempDir::new().unwrap();
    let service = open(&dir).await;

    let status = service.sync_status();
    assert!(!status.enabled);
    assert!(matches!(service.sync_now().await, Err(Error::InvalidInput(_))));
}
