use std::sync::Arc;

use uuid::Uuid;

use tradequest_db::{Database, DbError};
use tradequest_league::{CycleConfig, LeagueCycleProcessor, MembershipStore};
use tradequest_types::{
    CycleAnchor, LifetimeCounters, MembershipUpdate, Notification, NotificationKind, TierName, UserId, UNRANKED,
};

fn september() -> CycleAnchor {
    "2026-09".parse().unwrap()
}

fn user(n: u128) -> UserId {
    UserId::from_uuid(Uuid::from_u128(n))
}

fn advance(expected: i64, tier: &str) -> MembershipUpdate {
    MembershipUpdate {
        expected_cycle_id: expected,
        tier: TierName::from(tier),
        period_score: 0,
        cohort_rank: UNRANKED,
        last_cycle_rank: Some(1),
        last_cycle_tier: TierName::from("Gold"),
        last_cycle_score: 640,
        highest_tier: TierName::from(tier),
        counters: LifetimeCounters {
            total_promotions: 1,
            total_cycles_participated: 1,
            ..Default::default()
        },
        cycle: september().next().unwrap(),
    }
}

#[tokio::test]
async fn join_is_idempotent_and_scores_accumulate() {
    let db = Database::in_memory().await.unwrap();
    let repo = db.membership_repo();
    let bronze = TierName::from("Bronze");

    let joined = repo.join(&user(1), &bronze, september()).await.unwrap();
    assert_eq!(joined.period_score, 0);
    assert_eq!(joined.cohort_rank, UNRANKED);
    assert_eq!(joined.highest_tier, bronze);

    assert_eq!(repo.award_points(&user(1), 30).await.unwrap(), 30);
    assert_eq!(repo.award_points(&user(1), 12).await.unwrap(), 42);

    let again = repo.join(&user(1), &bronze, september()).await.unwrap();
    assert_eq!(again.period_score, 42);
    assert_eq!(repo.count().await.unwrap(), 1);
}

#[tokio::test]
async fn award_points_saturates_and_rejects_unknown_users() {
    let db = Database::in_memory().await.unwrap();
    let repo = db.membership_repo();
    repo.join(&user(1), &TierName::from("Gold"), september()).await.unwrap();

    repo.award_points(&user(1), u64::MAX).await.unwrap();
    let score = repo.award_points(&user(1), 10).await.unwrap();
    assert_eq!(score, i64::MAX as u64);

    let missing = repo.award_points(&user(2), 10).await;
    assert!(matches!(missing, Err(DbError::NotFound(_))));
}

#[tokio::test]
async fn cohort_reads_are_ranked() {
    let db = Database::in_memory().await.unwrap();
    let repo = db.membership_repo();
    let gold = TierName::from("Gold");

    for (n, points) in [(3, 50), (1, 50), (2, 80)] {
        repo.join(&user(n), &gold, september()).await.unwrap();
        repo.award_points(&user(n), points).await.unwrap();
    }
    repo.join(&user(9), &TierName::from("Silver"), september()).await.unwrap();

    let cohort = repo.load_cohort(&gold).await.unwrap();
    let order: Vec<UserId> = cohort.iter().map(|r| r.user_id).collect();
    assert_eq!(order, vec![user(2), user(1), user(3)]);

    let tiers = repo.list_distinct_tiers().await.unwrap();
    assert_eq!(tiers, vec![gold.clone(), TierName::from("Silver")]);

    let ids = repo.member_ids_in_tier(&gold).await.unwrap();
    assert_eq!(ids, vec![user(1), user(2), user(3)]);
}

#[tokio::test]
async fn apply_update_is_guarded_by_cycle() {
    let db = Database::in_memory().await.unwrap();
    let repo = db.membership_repo();
    repo.join(&user(1), &TierName::from("Gold"), september()).await.unwrap();

    repo.apply_update(&user(1), &advance(september().id, "Platinum")).await.unwrap();
    let record = repo.find(&user(1)).await.unwrap().unwrap();
    assert_eq!(record.tier, TierName::from("Platinum"));
    assert_eq!(record.cycle, september().next().unwrap());
    assert_eq!(record.counters.total_promotions, 1);
    assert_eq!(record.last_cycle_rank, Some(1));
    assert_eq!(record.last_cycle_tier, Some(TierName::from("Gold")));
    assert_eq!(record.last_cycle_score, Some(640));

    // Replaying the same update finds the row already advanced.
    let replay = repo.apply_update(&user(1), &advance(september().id, "Diamond")).await;
    assert!(matches!(replay, Err(DbError::Conflict(_))));
    assert_eq!(repo.find(&user(1)).await.unwrap().unwrap().tier, TierName::from("Platinum"));

    let missing = repo.apply_update(&user(5), &advance(september().id, "Gold")).await;
    assert!(matches!(missing, Err(DbError::NotFound(_))));
}

#[tokio::test]
async fn store_trait_maps_conflicts() {
    let db = Database::in_memory().await.unwrap();
    let repo = db.membership_repo();
    repo.join(&user(1), &TierName::from("Gold"), september()).await.unwrap();

    let store: &dyn MembershipStore = &repo;
    let stale = advance(september().id - 1, "Platinum");
    let result = store.update_record(&user(1), &stale).await;
    assert!(matches!(result, Err(tradequest_league::StoreError::Conflict(_))));
}

#[tokio::test]
async fn notification_outbox_round_trip() {
    let db = Database::in_memory().await.unwrap();
    let repo = db.notification_repo();

    let first = Notification::new(user(1), NotificationKind::Podium, "Podium finish!", "You finished #2", Some("/leagues".into()));
    let second = Notification::new(user(1), NotificationKind::MonthlyResults, "Monthly league results", "You finished #9", None);
    repo.enqueue(&first).await.unwrap();
    repo.enqueue(&second).await.unwrap();
    repo.enqueue(&Notification::new(user(2), NotificationKind::Champion, "Gold League Champion!", "#1", None))
        .await
        .unwrap();

    let rows = repo.list_for_user(&user(1), 10).await.unwrap();
    assert_eq!(rows.len(), 2);
    let restored: Vec<Notification> = rows.into_iter().map(|r| Notification::try_from(r).unwrap()).collect();
    assert!(restored.iter().any(|n| n.id == first.id && n.deep_link.as_deref() == Some("/leagues")));

    assert_eq!(repo.count_for_user(&user(1), true).await.unwrap(), 2);
    assert!(repo.mark_read(&first.id).await.unwrap());
    assert!(!repo.mark_read(&first.id).await.unwrap());
    assert_eq!(repo.count_for_user(&user(1), true).await.unwrap(), 1);
    assert_eq!(repo.count_for_user(&user(1), false).await.unwrap(), 2);
}

#[tokio::test]
async fn cycle_close_against_sqlite() {
    let db = Database::in_memory().await.unwrap();
    let members = db.membership_repo();
    let gold = TierName::from("Gold");

    for n in 1..=12u128 {
        members.join(&user(n), &gold, september()).await.unwrap();
        members.award_points(&user(n), (1_300 - n * 100) as u64).await.unwrap();
    }

    let processor = LeagueCycleProcessor::new(
        Arc::new(db.membership_repo()),
        Arc::new(db.notification_repo()),
        CycleConfig::default(),
    );
    let summary = processor.run(september()).await;

    assert!(summary.is_clean(), "failures: {:?}", summary.failures);
    assert_eq!(summary.processed_count, 12);
    assert_eq!(summary.promotions, 10);
    assert_eq!(summary.demotions, 2);

    let champion = members.find(&user(1)).await.unwrap().unwrap();
    assert_eq!(champion.tier, TierName::from("Platinum"));
    assert_eq!(champion.period_score, 0);
    assert_eq!(champion.counters.total_first_place_finishes, 1);

    let last = members.find(&user(12)).await.unwrap().unwrap();
    assert_eq!(last.tier, TierName::from("Silver"));
    assert_eq!(last.highest_tier, gold);

    let notes = db.notification_repo().list_for_user(&user(1), 10).await.unwrap();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].kind, "champion");

    // A second run finds everyone already advanced.
    let rerun = processor.run(september()).await;
    assert_eq!(rerun.processed_count, 0);
    assert_eq!(rerun.already_closed, 12);
}

#[tokio::test]
async fn corrupt_row_does_not_block_its_cohort() {
    let db = Database::in_memory().await.unwrap();
    let members = db.membership_repo();
    let gold = TierName::from("Gold");

    for n in 1..=3u128 {
        members.join(&user(n), &gold, september()).await.unwrap();
        members.award_points(&user(n), (100 * n) as u64).await.unwrap();
    }
    sqlx::query(
        "INSERT INTO league_memberships (user_id, tier, period_score, cohort_rank, highest_tier, cycle_id, joined_at, updated_at)
         VALUES ('not-a-uuid', 'Gold', 50, 999, 'Gold', ?1, ?2, ?2)",
    )
    .bind(september().id)
    .bind(chrono::Utc::now())
    .execute(&db.pool)
    .await
    .unwrap();

    let cohort = members.load_cohort(&gold).await.unwrap();
    assert_eq!(cohort.len(), 3);
    assert_eq!(members.member_ids_in_tier(&gold).await.unwrap().len(), 3);

    let processor = LeagueCycleProcessor::new(
        Arc::new(db.membership_repo()),
        Arc::new(db.notification_repo()),
        CycleConfig::default(),
    );
    let summary = processor.run(september()).await;
    assert_eq!(summary.processed_count, 3);
    assert!(summary.is_clean(), "failures: {:?}", summary.failures);
}

#[tokio::test]
async fn retried_close_keeps_original_ranks() {
    let db = Database::in_memory().await.unwrap();
    let members = db.membership_repo();
    let gold = TierName::from("Gold");

    for n in 1..=12u128 {
        members.join(&user(n), &gold, september()).await.unwrap();
        members.award_points(&user(n), (1_300 - n * 100) as u64).await.unwrap();
    }

    // Simulate a first attempt that stopped after writing everyone but the last.
    let processor = LeagueCycleProcessor::new(
        Arc::new(db.membership_repo()),
        Arc::new(db.notification_repo()),
        CycleConfig::default(),
    );
    let plan = processor.dry_run(september()).await.unwrap();
    for planned in plan.cohorts[0].updates.iter().filter(|u| u.transition.user_id != user(12)) {
        members.apply_update(&planned.transition.user_id, &planned.update).await.unwrap();
    }

    let summary = processor.run(september()).await;
    assert_eq!(summary.processed_count, 1);
    assert_eq!(summary.already_closed, 11);
    assert_eq!(summary.demotions, 1);

    let last = members.find(&user(12)).await.unwrap().unwrap();
    assert_eq!(last.tier, TierName::from("Silver"));
    assert_eq!(last.last_cycle_rank, Some(12));
    assert_eq!(last.last_cycle_tier, Some(gold.clone()));
    assert_eq!(last.last_cycle_score, Some(100));

    let notes = db.notification_repo().list_for_user(&user(12), 10).await.unwrap();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].kind, "demotion");
}

#[tokio::test]
async fn health_check_reports_members() {
    let db = Database::in_memory().await.unwrap();
    db.membership_repo().join(&user(1), &TierName::from("Bronze"), september()).await.unwrap();

    let status = db.health_check().await.unwrap();
    assert!(status.healthy);
    assert_eq!(status.members, Some(1));
}
