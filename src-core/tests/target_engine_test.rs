use chrono::{Duration, NaiveDate, Utc};
use rust_decimal_macros::dec;
use std::sync::Arc;

use targetledger_core::calculator::{RecalculationOutcome, TargetCalculatorService};
use targetledger_core::constants::{
    EVENT_EXTERNAL_UPDATE_FAILED, EVENT_TARGET_ACHIEVED, EVENT_TARGET_CONTRIBUTION_PROGRESS,
    EVENT_TARGET_UPDATED, QUOTATION_STATUS_SENT, QUOTATION_STATUS_WON,
};
use targetledger_core::db::DbPool;
use targetledger_core::errors::Error;
use targetledger_core::external::{
    ExternalTargetUpdateService, ExternalUpdateOutcome, ExternalUpdateRequest, TargetFieldUpdates,
    UpdateMode,
};
use targetledger_core::notifications::{ChannelNotifier, NotificationEvent};
use targetledger_core::records::RecordRepository;
use targetledger_core::targets::{
    NewUserTarget, TargetError, TargetRepository, TargetRepositoryTrait, TargetService,
    TargetServiceTrait,
};
use targetledger_core::users::{UserError, UserRepository};
use tokio::sync::mpsc::UnboundedReceiver;

mod common;

const COMPANY: &str = "acme";

struct Engine {
    pool: Arc<DbPool>,
    target_repo: Arc<TargetRepository>,
    calculator: TargetCalculatorService<TargetRepository, RecordRepository, ChannelNotifier>,
    external: ExternalTargetUpdateService<UserRepository, ChannelNotifier>,
    events: UnboundedReceiver<NotificationEvent>,
}

fn engine(test_id: &str) -> Engine {
    let pool = common::setup_pool(test_id);
    let (notifier, events) = ChannelNotifier::channel();
    let notifier = Arc::new(notifier);

    let target_repo = Arc::new(TargetRepository::new(pool.clone()));
    let record_repo = Arc::new(RecordRepository::new(pool.clone()));
    let user_repo = Arc::new(UserRepository::new(pool.clone()));

    Engine {
        calculator: TargetCalculatorService::new(
            target_repo.clone(),
            record_repo,
            notifier.clone(),
        ),
        external: ExternalTargetUpdateService::new(pool.clone(), user_repo, notifier),
        pool,
        target_repo,
        events,
    }
}

fn sales_target(user_id: &str) -> NewUserTarget {
    NewUserTarget {
        user_id: user_id.to_string(),
        currency: "EUR".to_string(),
        target_sales_amount: dec!(1000),
        target_quotations_amount: dec!(0),
        target_hours_worked: dec!(0),
        target_new_clients: 0,
        target_new_leads: 0,
        target_check_ins: 0,
        target_calls: 0,
        period_start_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
        period_end_date: NaiveDate::from_ymd_opt(2025, 12, 31).unwrap(),
    }
}

fn request(mode: UpdateMode, transaction_id: &str, updates: TargetFieldUpdates) -> ExternalUpdateRequest {
    ExternalUpdateRequest {
        update_mode: mode,
        transaction_id: transaction_id.to_string(),
        source: Some("ERP".to_string()),
        updates,
        metadata: None,
    }
}

fn drain(events: &mut UnboundedReceiver<NotificationEvent>) -> Vec<NotificationEvent> {
    let mut drained = Vec::new();
    while let Ok(event) = events.try_recv() {
        drained.push(event);
    }
    drained
}

#[tokio::test]
async fn fresh_target_counts_new_orders() {
    let mut engine = engine("fresh-target");
    common::seed_user(&engine.pool, "user-1", COMPANY);
    TargetService::new(engine.target_repo.clone())
        .set_target(sales_target("user-1"))
        .unwrap();

    let earlier = Utc::now().naive_utc() - Duration::minutes(5);
    common::seed_quotation(&engine.pool, "user-1", COMPANY, QUOTATION_STATUS_WON, 400.0, earlier);

    let outcome = engine.calculator.recalculate("user-1").await.unwrap();
    assert!(matches!(outcome, RecalculationOutcome::Applied { .. }));

    let stored = engine.target_repo.get_by_user_id("user-1").unwrap().unwrap();
    assert_eq!(stored.current_orders_amount, dec!(400));
    assert_eq!(stored.current_sales_amount, dec!(400));
    assert_eq!(stored.current_quotations_amount, dec!(0));
    assert!(stored.last_calculated_at.is_some());

    // 40% of target: no achievement yet
    assert!(drain(&mut engine.events).is_empty());
}

#[tokio::test]
async fn external_increment_crosses_the_target_once() {
    let mut engine = engine("achievement-crossing");
    common::seed_user(&engine.pool, "user-1", COMPANY);
    TargetService::new(engine.target_repo.clone())
        .set_target(sales_target("user-1"))
        .unwrap();

    let earlier = Utc::now().naive_utc() - Duration::minutes(5);
    common::seed_quotation(&engine.pool, "user-1", COMPANY, QUOTATION_STATUS_WON, 400.0, earlier);
    engine.calculator.recalculate("user-1").await.unwrap();
    drain(&mut engine.events);

    let outcome = engine
        .external
        .apply_external_update(
            "user-1",
            COMPANY,
            &request(
                UpdateMode::Increment,
                "tx-crossing",
                TargetFieldUpdates {
                    current_orders_amount: Some(dec!(700)),
                    ..Default::default()
                },
            ),
        )
        .await
        .unwrap();

    match outcome {
        ExternalUpdateOutcome::Applied { values } => {
            assert_eq!(values.current_orders_amount, dec!(1100));
            assert_eq!(values.current_sales_amount, dec!(1100));
        }
        other => panic!("expected Applied, got {:?}", other),
    }

    let events = drain(&mut engine.events);
    let achieved: Vec<_> = events
        .iter()
        .filter(|e| e.name == EVENT_TARGET_ACHIEVED)
        .collect();
    assert_eq!(achieved.len(), 1, "exactly one achievement, not two");
    assert!(events.iter().any(|e| e.name == EVENT_TARGET_UPDATED));
    // 700 of a 1000 target is well past the materiality threshold
    assert!(events
        .iter()
        .any(|e| e.name == EVENT_TARGET_CONTRIBUTION_PROGRESS));
}

#[tokio::test]
async fn update_modes_apply_their_arithmetic() {
    let mut engine = engine("mode-semantics");
    common::seed_user(&engine.pool, "user-1", COMPANY);
    TargetService::new(engine.target_repo.clone())
        .set_target(sales_target("user-1"))
        .unwrap();

    let leads = |value| TargetFieldUpdates {
        current_new_leads: Some(value),
        ..Default::default()
    };

    engine
        .external
        .apply_external_update("user-1", COMPANY, &request(UpdateMode::Replace, "tx-1", leads(dec!(10))))
        .await
        .unwrap();
    engine
        .external
        .apply_external_update("user-1", COMPANY, &request(UpdateMode::Increment, "tx-2", leads(dec!(5))))
        .await
        .unwrap();
    engine
        .external
        .apply_external_update("user-1", COMPANY, &request(UpdateMode::Decrement, "tx-3", leads(dec!(3))))
        .await
        .unwrap();

    let stored = engine.target_repo.get_by_user_id("user-1").unwrap().unwrap();
    assert_eq!(stored.current_new_leads, 12);
    drain(&mut engine.events);
}

#[tokio::test]
async fn decrement_is_all_or_nothing() {
    let engine = engine("decrement-rejection");
    common::seed_user(&engine.pool, "user-1", COMPANY);
    TargetService::new(engine.target_repo.clone())
        .set_target(sales_target("user-1"))
        .unwrap();

    engine
        .external
        .apply_external_update(
            "user-1",
            COMPANY,
            &request(
                UpdateMode::Replace,
                "tx-setup",
                TargetFieldUpdates {
                    current_new_leads: Some(dec!(5)),
                    current_calls: Some(dec!(10)),
                    ..Default::default()
                },
            ),
        )
        .await
        .unwrap();

    let outcome = engine
        .external
        .apply_external_update(
            "user-1",
            COMPANY,
            &request(
                UpdateMode::Decrement,
                "tx-overdraw",
                TargetFieldUpdates {
                    current_new_leads: Some(dec!(8)),
                    current_calls: Some(dec!(4)),
                    ..Default::default()
                },
            ),
        )
        .await
        .unwrap();

    match outcome {
        ExternalUpdateOutcome::Invalid { errors } => {
            assert_eq!(errors.len(), 1);
            assert!(errors[0].contains("currentNewLeads"));
        }
        other => panic!("expected Invalid, got {:?}", other),
    }

    // Nothing was partially applied
    let stored = engine.target_repo.get_by_user_id("user-1").unwrap().unwrap();
    assert_eq!(stored.current_new_leads, 5);
    assert_eq!(stored.current_calls, 10);
}

#[tokio::test]
async fn replayed_transaction_returns_the_recorded_outcome() {
    let mut engine = engine("idempotent-replay");
    common::seed_user(&engine.pool, "user-1", COMPANY);
    TargetService::new(engine.target_repo.clone())
        .set_target(sales_target("user-1"))
        .unwrap();

    let calls = TargetFieldUpdates {
        current_calls: Some(dec!(3)),
        ..Default::default()
    };
    let first = engine
        .external
        .apply_external_update("user-1", COMPANY, &request(UpdateMode::Increment, "tx-repeat", calls.clone()))
        .await
        .unwrap();
    let replay = engine
        .external
        .apply_external_update("user-1", COMPANY, &request(UpdateMode::Increment, "tx-repeat", calls.clone()))
        .await
        .unwrap();

    assert_eq!(first, replay);
    let stored = engine.target_repo.get_by_user_id("user-1").unwrap().unwrap();
    assert_eq!(stored.current_calls, 3, "the replay must not re-apply");

    // A new transaction id applies normally
    engine
        .external
        .apply_external_update("user-1", COMPANY, &request(UpdateMode::Increment, "tx-fresh", calls))
        .await
        .unwrap();
    let stored = engine.target_repo.get_by_user_id("user-1").unwrap().unwrap();
    assert_eq!(stored.current_calls, 6);
    drain(&mut engine.events);
}

#[tokio::test]
async fn expired_receipts_stop_shielding_replays() {
    let engine = engine("receipt-expiry");
    common::seed_user(&engine.pool, "user-1", COMPANY);
    TargetService::new(engine.target_repo.clone())
        .set_target(sales_target("user-1"))
        .unwrap();

    let calls = TargetFieldUpdates {
        current_calls: Some(dec!(2)),
        ..Default::default()
    };
    engine
        .external
        .apply_external_update("user-1", COMPANY, &request(UpdateMode::Increment, "tx-old", calls.clone()))
        .await
        .unwrap();

    // Age the receipt past its TTL
    {
        use diesel::prelude::*;
        use targetledger_core::schema::external_update_receipts;

        let mut conn = engine.pool.get().unwrap();
        diesel::update(external_update_receipts::table.find("tx-old"))
            .set(
                external_update_receipts::expires_at
                    .eq(Utc::now().naive_utc() - Duration::hours(1)),
            )
            .execute(&mut conn)
            .unwrap();
    }

    // The same transaction id no longer replays; it applies again
    let outcome = engine
        .external
        .apply_external_update("user-1", COMPANY, &request(UpdateMode::Increment, "tx-old", calls))
        .await
        .unwrap();
    assert!(matches!(outcome, ExternalUpdateOutcome::Applied { .. }));

    let stored = engine.target_repo.get_by_user_id("user-1").unwrap().unwrap();
    assert_eq!(stored.current_calls, 4);
}

#[tokio::test]
async fn empty_recalculation_preserves_external_values() {
    let engine = engine("noop-protection");
    common::seed_user(&engine.pool, "user-1", COMPANY);
    TargetService::new(engine.target_repo.clone())
        .set_target(sales_target("user-1"))
        .unwrap();

    engine
        .external
        .apply_external_update(
            "user-1",
            COMPANY,
            &request(
                UpdateMode::Replace,
                "tx-erp",
                TargetFieldUpdates {
                    current_calls: Some(dec!(7)),
                    ..Default::default()
                },
            ),
        )
        .await
        .unwrap();

    let outcome = engine.calculator.recalculate("user-1").await.unwrap();
    assert_eq!(outcome, RecalculationOutcome::NoNewRecords);

    let stored = engine.target_repo.get_by_user_id("user-1").unwrap().unwrap();
    assert_eq!(stored.current_calls, 7, "a no-op pass must not reset ERP values");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn a_permanently_locked_row_surfaces_a_conflict() {
    let mut engine = engine("retry-conflict");
    common::seed_user(&engine.pool, "user-1", COMPANY);
    TargetService::new(engine.target_repo.clone())
        .set_target(sales_target("user-1"))
        .unwrap();

    // Hold the database write lock longer than the whole retry budget
    let blocker_pool = engine.pool.clone();
    let (locked_tx, locked_rx) = std::sync::mpsc::channel();
    let blocker = std::thread::spawn(move || {
        let mut conn = blocker_pool.get().unwrap();
        conn.immediate_transaction::<_, diesel::result::Error, _>(|_| {
            locked_tx.send(()).unwrap();
            std::thread::sleep(std::time::Duration::from_secs(8));
            Ok(())
        })
        .unwrap();
    });
    locked_rx.recv().unwrap();

    let outcome = engine
        .external
        .apply_external_update(
            "user-1",
            COMPANY,
            &request(
                UpdateMode::Increment,
                "tx-locked",
                TargetFieldUpdates {
                    current_calls: Some(dec!(1)),
                    ..Default::default()
                },
            ),
        )
        .await
        .unwrap();

    match outcome {
        ExternalUpdateOutcome::Conflict { details } => {
            assert_eq!(details.retry_count, 3);
        }
        other => panic!("expected Conflict, got {:?}", other),
    }

    let events = drain(&mut engine.events);
    assert!(events.iter().any(|e| e.name == EVENT_EXTERNAL_UPDATE_FAILED));

    let stored = engine.target_repo.get_by_user_id("user-1").unwrap().unwrap();
    assert_eq!(stored.current_calls, 0, "no partial application under contention");

    // Once the lock is gone the same request goes through
    blocker.join().unwrap();
    let outcome = engine
        .external
        .apply_external_update(
            "user-1",
            COMPANY,
            &request(
                UpdateMode::Increment,
                "tx-unlocked",
                TargetFieldUpdates {
                    current_calls: Some(dec!(1)),
                    ..Default::default()
                },
            ),
        )
        .await
        .unwrap();
    assert!(matches!(outcome, ExternalUpdateOutcome::Applied { .. }));
}

#[tokio::test]
async fn out_of_scope_users_resolve_to_not_found() {
    let engine = engine("tenant-scope");
    common::seed_user(&engine.pool, "user-1", COMPANY);
    TargetService::new(engine.target_repo.clone())
        .set_target(sales_target("user-1"))
        .unwrap();
    common::seed_user(&engine.pool, "user-2", COMPANY);

    let calls = TargetFieldUpdates {
        current_calls: Some(dec!(1)),
        ..Default::default()
    };

    let wrong_company = engine
        .external
        .apply_external_update("user-1", "globex", &request(UpdateMode::Increment, "tx-1", calls.clone()))
        .await;
    assert!(matches!(wrong_company, Err(Error::User(UserError::NotFound(_)))));

    let no_aggregate = engine
        .external
        .apply_external_update("user-2", COMPANY, &request(UpdateMode::Increment, "tx-2", calls))
        .await;
    assert!(matches!(no_aggregate, Err(Error::Target(TargetError::NotFound(_)))));
}

#[tokio::test]
async fn target_lifecycle_round_trip() {
    let engine = engine("lifecycle");
    common::seed_user(&engine.pool, "user-1", COMPANY);
    let service = TargetService::new(engine.target_repo.clone());

    service.set_target(sales_target("user-1")).unwrap();
    assert!(matches!(
        service.set_target(sales_target("user-1")),
        Err(TargetError::InvalidData(_))
    ));

    // Fold some records in, then move the period: counters restart
    let earlier = Utc::now().naive_utc() - Duration::minutes(5);
    common::seed_quotation(&engine.pool, "user-1", COMPANY, QUOTATION_STATUS_SENT, 250.0, earlier);
    common::seed_lead(&engine.pool, "user-1", COMPANY, earlier);
    engine.calculator.recalculate("user-1").await.unwrap();

    let stored = engine.target_repo.get_by_user_id("user-1").unwrap().unwrap();
    assert_eq!(stored.current_quotations_amount, dec!(250));
    assert_eq!(stored.current_new_leads, 1);

    let rebased = service
        .update_period(
            "user-1",
            NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2026, 12, 31).unwrap(),
        )
        .unwrap();
    assert_eq!(rebased.current_quotations_amount, dec!(0));
    assert_eq!(rebased.current_new_leads, 0);
    assert!(rebased.last_calculated_at.is_none());

    service.delete_target("user-1").unwrap();
    assert!(matches!(
        service.get_target("user-1"),
        Err(TargetError::NotFound(_))
    ));
}
