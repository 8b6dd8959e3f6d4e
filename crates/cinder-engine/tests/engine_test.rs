/// Integration tests: drive the engine end to end against an in-memory
/// database — quota accounting, ledger idempotence, match detection under
/// interleaving, reset scoping, and boost exclusivity.
use std::collections::HashMap;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use chrono::Utc;
use uuid::Uuid;

use cinder_db::{Database, queries, timefmt};
use cinder_engine::{Engine, EngineConfig, EngineError, TierPolicy, TierRegistry};
use cinder_types::models::Direction;

const BASIC_LIMIT: u32 = 3;

fn test_engine() -> (Arc<Database>, Engine) {
    let db = Arc::new(Database::open_in_memory().unwrap());

    let mut tiers = HashMap::new();
    tiers.insert(
        "basic".to_string(),
        TierPolicy {
            daily_limit: BASIC_LIMIT,
            boost: false,
        },
    );
    tiers.insert(
        "plus".to_string(),
        TierPolicy {
            daily_limit: 100,
            boost: true,
        },
    );
    tiers.insert(
        "infinite".to_string(),
        TierPolicy {
            daily_limit: 1000,
            boost: true,
        },
    );

    let config = EngineConfig {
        tiers: TierRegistry::new(tiers),
        boost_duration: chrono::Duration::minutes(30),
        max_txn_attempts: 3,
    };

    (db.clone(), Engine::new(db, config))
}

fn provision(engine: &Engine, tier: &str) -> Uuid {
    let id = Uuid::new_v4();
    engine.upsert_account(id, tier, None).unwrap();
    id
}

fn swipe_count(db: &Database, actor: Uuid) -> i64 {
    db.with_conn(|conn| {
        let n = conn.query_row(
            "SELECT COUNT(*) FROM swipes WHERE actor_id = ?1",
            [actor.to_string()],
            |row| row.get(0),
        )?;
        Ok(n)
    })
    .unwrap()
}

fn match_count(db: &Database) -> i64 {
    db.with_conn(|conn| {
        let n = conn.query_row("SELECT COUNT(*) FROM matches", [], |row| row.get(0))?;
        Ok(n)
    })
    .unwrap()
}

fn daily_count(db: &Database, user: Uuid) -> i64 {
    db.with_conn(|conn| {
        Ok(queries::get_account(conn, &user.to_string())?
            .unwrap()
            .daily_count)
    })
    .unwrap()
}

#[test]
fn reswipe_overwrites_instead_of_duplicating() {
    let (db, engine) = test_engine();
    let a = provision(&engine, "plus");
    let b = provision(&engine, "plus");

    engine.record_swipe(a, b, Direction::Pass).unwrap();
    engine.record_swipe(a, b, Direction::Like).unwrap();

    assert_eq!(swipe_count(&db, a), 1);
    let row = db
        .with_conn(|conn| queries::get_swipe(conn, &a.to_string(), &b.to_string()))
        .unwrap()
        .unwrap();
    assert_eq!(row.direction, "like");
}

#[test]
fn mutual_like_creates_exactly_one_match() {
    let (db, engine) = test_engine();
    let a = provision(&engine, "plus");
    let b = provision(&engine, "plus");

    let first = engine.record_swipe(a, b, Direction::Like).unwrap();
    assert!(first.matched.is_none());

    let second = engine.record_swipe(b, a, Direction::Like).unwrap();
    let m = second.matched.expect("reciprocal like must match");
    assert!(second.match_created);
    assert!(m.involves(a) && m.involves(b));
    assert!(m.members[0] < m.members[1]);

    assert_eq!(match_count(&db), 1);

    // Both members see the same match in their listings.
    let for_a = engine.list_matches(a, 50, None).unwrap();
    let for_b = engine.list_matches(b, 50, None).unwrap();
    assert_eq!(for_a.len(), 1);
    assert_eq!(for_b.len(), 1);
    assert_eq!(for_a[0].key, for_b[0].key);
}

#[test]
fn like_against_pass_is_not_a_match() {
    let (db, engine) = test_engine();
    let a = provision(&engine, "plus");
    let b = provision(&engine, "plus");

    engine.record_swipe(a, b, Direction::Pass).unwrap();
    let receipt = engine.record_swipe(b, a, Direction::Like).unwrap();

    assert!(receipt.matched.is_none());
    assert_eq!(match_count(&db), 0);
}

#[test]
fn repeat_like_short_circuits_to_existing_match() {
    let (db, engine) = test_engine();
    let a = provision(&engine, "plus");
    let b = provision(&engine, "plus");

    engine.record_swipe(a, b, Direction::Like).unwrap();
    let created = engine.record_swipe(b, a, Direction::Like).unwrap();
    let original = created.matched.unwrap();

    let repeat = engine.record_swipe(a, b, Direction::Like).unwrap();
    let found = repeat.matched.expect("repeat like still reports the match");

    assert!(!repeat.match_created);
    assert_eq!(found.key, original.key);
    assert_eq!(found.created_at, original.created_at);
    assert_eq!(match_count(&db), 1);
}

#[test]
fn self_swipe_is_rejected_with_no_state_change() {
    let (db, engine) = test_engine();
    let a = provision(&engine, "plus");

    let err = engine.record_swipe(a, a, Direction::Like).unwrap_err();
    assert!(matches!(err, EngineError::InvalidTarget));

    assert_eq!(swipe_count(&db, a), 0);
    assert_eq!(match_count(&db), 0);
    assert_eq!(daily_count(&db, a), 0);
}

#[test]
fn unprovisioned_target_is_rejected() {
    let (db, engine) = test_engine();
    let a = provision(&engine, "plus");

    let err = engine
        .record_swipe(a, Uuid::new_v4(), Direction::Like)
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidTarget));
    assert_eq!(swipe_count(&db, a), 0);
}

#[test]
fn missing_actor_account_surfaces() {
    let (_db, engine) = test_engine();
    let b = provision(&engine, "plus");

    let ghost = Uuid::new_v4();
    let err = engine.record_swipe(ghost, b, Direction::Like).unwrap_err();
    assert!(matches!(err, EngineError::AccountNotFound(id) if id == ghost));
}

#[test]
fn quota_denies_the_swipe_after_the_limit() {
    let (db, engine) = test_engine();
    let a = provision(&engine, "basic");
    let targets: Vec<Uuid> = (0..=BASIC_LIMIT).map(|_| provision(&engine, "basic")).collect();

    for (i, target) in targets.iter().take(BASIC_LIMIT as usize).enumerate() {
        let receipt = engine.record_swipe(a, *target, Direction::Pass).unwrap();
        assert_eq!(receipt.remaining, BASIC_LIMIT - i as u32 - 1);
    }

    let over = targets[BASIC_LIMIT as usize];
    let err = engine.record_swipe(a, over, Direction::Like).unwrap_err();
    assert!(matches!(err, EngineError::QuotaExceeded { limit } if limit == BASIC_LIMIT));

    // The rejected call recorded nothing and consumed nothing.
    assert_eq!(swipe_count(&db, a), i64::from(BASIC_LIMIT));
    assert_eq!(daily_count(&db, a), i64::from(BASIC_LIMIT));
    let row = db
        .with_conn(|conn| queries::get_swipe(conn, &a.to_string(), &over.to_string()))
        .unwrap();
    assert!(row.is_none());
}

#[test]
fn day_rollover_resets_the_counter() {
    let (db, engine) = test_engine();
    let a = provision(&engine, "basic");
    let b = provision(&engine, "basic");

    // At the limit as of yesterday.
    let yesterday = Utc::now().date_naive().pred_opt().unwrap();
    db.with_conn(|conn| {
        conn.execute(
            "UPDATE accounts SET daily_count = ?2, last_swipe_date = ?3 WHERE id = ?1",
            rusqlite::params![
                a.to_string(),
                i64::from(BASIC_LIMIT),
                timefmt::fmt_date(yesterday)
            ],
        )?;
        Ok(())
    })
    .unwrap();

    let receipt = engine.record_swipe(a, b, Direction::Like).unwrap();
    assert_eq!(receipt.remaining, BASIC_LIMIT - 1);
    assert_eq!(daily_count(&db, a), 1);
}

#[test]
fn unlimited_tier_bypasses_enforcement() {
    let (db, engine) = test_engine();
    let a = provision(&engine, "infinite");
    let b = provision(&engine, "infinite");

    db.with_conn(|conn| {
        conn.execute(
            "UPDATE accounts SET daily_count = 5000, last_swipe_date = ?2 WHERE id = ?1",
            rusqlite::params![a.to_string(), timefmt::fmt_date(Utc::now().date_naive())],
        )?;
        Ok(())
    })
    .unwrap();

    assert!(engine.record_swipe(a, b, Direction::Like).is_ok());
}

#[test]
fn concurrent_reciprocal_likes_produce_one_match() {
    let (db, engine) = test_engine();
    let engine = Arc::new(engine);
    let a = provision(&engine, "plus");
    let b = provision(&engine, "plus");

    let e1 = engine.clone();
    let e2 = engine.clone();
    let t1 = thread::spawn(move || e1.record_swipe(a, b, Direction::Like).unwrap());
    let t2 = thread::spawn(move || e2.record_swipe(b, a, Direction::Like).unwrap());
    let r1 = t1.join().unwrap();
    let r2 = t2.join().unwrap();

    assert_eq!(match_count(&db), 1);

    // Whoever observed the reciprocal like reports the match; at most one
    // call created it, and any reported keys agree.
    let keys: Vec<String> = [&r1, &r2]
        .iter()
        .filter_map(|r| r.matched.as_ref().map(|m| m.key.clone()))
        .collect();
    assert!(!keys.is_empty());
    assert!(keys.windows(2).all(|w| w[0] == w[1]));
    assert!(u8::from(r1.match_created) + u8::from(r2.match_created) <= 1);

    // Re-running either side converges on the same record.
    let replay = engine.record_swipe(a, b, Direction::Like).unwrap();
    assert_eq!(replay.matched.unwrap().key, keys[0]);
    assert!(!replay.match_created);
}

#[test]
fn reset_swipes_scopes_to_the_actor() {
    let (db, engine) = test_engine();
    let a = provision(&engine, "plus");
    let x = provision(&engine, "plus");
    let y = provision(&engine, "plus");

    engine.record_swipe(a, x, Direction::Like).unwrap();
    engine.record_swipe(x, a, Direction::Like).unwrap(); // match {a, x}
    engine.record_swipe(a, y, Direction::Pass).unwrap();
    engine.record_swipe(y, a, Direction::Like).unwrap();
    let count_before = daily_count(&db, a);

    let deleted = engine.reset_swipes(a).unwrap();
    assert_eq!(deleted, 2);

    // A's outbound ledger is empty; inbound swipes about A survive.
    assert_eq!(swipe_count(&db, a), 0);
    assert_eq!(swipe_count(&db, x), 1);
    assert_eq!(swipe_count(&db, y), 1);

    // Quota and matches are untouched.
    assert_eq!(daily_count(&db, a), count_before);
    assert_eq!(match_count(&db), 1);
}

#[test]
fn boost_sets_expiry_and_mirrors_to_profile() {
    let (db, engine) = test_engine();
    let a = provision(&engine, "plus");

    let expiry = engine.activate_boost(a).unwrap();
    assert!(expiry > Utc::now());

    let mirrored: Option<String> = db
        .with_conn(|conn| {
            let v = conn.query_row(
                "SELECT boost_until FROM profiles WHERE user_id = ?1",
                [a.to_string()],
                |row| row.get(0),
            )?;
            Ok(v)
        })
        .unwrap();
    assert_eq!(mirrored.as_deref(), Some(timefmt::fmt_ts(expiry).as_str()));
}

#[test]
fn second_boost_before_expiry_is_rejected_without_extending() {
    let (_db, engine) = test_engine();
    let a = provision(&engine, "plus");

    let first = engine.activate_boost(a).unwrap();
    let err = engine.activate_boost(a).unwrap_err();
    match err {
        EngineError::BoostAlreadyActive { until } => assert_eq!(until, first),
        other => panic!("expected BoostAlreadyActive, got {other:?}"),
    }

    let account = engine.get_account(a).unwrap();
    assert_eq!(account.boost_until, Some(first));
}

#[test]
fn boost_requires_the_tier_capability() {
    let (_db, engine) = test_engine();
    let a = provision(&engine, "basic");

    let err = engine.activate_boost(a).unwrap_err();
    assert!(matches!(err, EngineError::BoostNotEntitled { .. }));
}

#[test]
fn preview_updates_existing_matches_only() {
    let (db, engine) = test_engine();
    let a = provision(&engine, "plus");
    let b = provision(&engine, "plus");
    let outsider = provision(&engine, "plus");

    engine.record_swipe(a, b, Direction::Like).unwrap();
    let key = engine
        .record_swipe(b, a, Direction::Like)
        .unwrap()
        .matched
        .unwrap()
        .key;

    let sent_at = Utc::now();
    let updated = engine.update_preview(&key, a, "see you there!", sent_at).unwrap();
    assert_eq!(updated.last_message.as_deref(), Some("see you there!"));

    let err = engine
        .update_preview(&key, outsider, "intruding", sent_at)
        .unwrap_err();
    assert!(matches!(err, EngineError::NotMatchMember(_)));

    let err = engine
        .update_preview("missing:key", a, "nope", sent_at)
        .unwrap_err();
    assert!(matches!(err, EngineError::MatchNotFound(_)));

    // Still exactly one match — preview never creates.
    assert_eq!(match_count(&db), 1);
}

#[test]
fn match_listing_is_newest_first_and_cursorable() {
    let (_db, engine) = test_engine();
    let me = provision(&engine, "plus");

    let mut keys = Vec::new();
    for _ in 0..3 {
        let other = provision(&engine, "plus");
        engine.record_swipe(me, other, Direction::Like).unwrap();
        let m = engine
            .record_swipe(other, me, Direction::Like)
            .unwrap()
            .matched
            .unwrap();
        keys.push(m.key);
        thread::sleep(Duration::from_millis(2));
    }

    let page = engine.list_matches(me, 2, None).unwrap();
    assert_eq!(page.len(), 2);
    assert_eq!(page[0].key, keys[2]);
    assert_eq!(page[1].key, keys[1]);
    assert!(page[0].created_at >= page[1].created_at);

    let rest = engine
        .list_matches(me, 2, Some(page[1].created_at))
        .unwrap();
    assert_eq!(rest.len(), 1);
    assert_eq!(rest[0].key, keys[0]);
}

#[test]
fn tier_change_preserves_quota_state() {
    let (db, engine) = test_engine();
    let a = provision(&engine, "basic");
    let b = provision(&engine, "basic");

    engine.record_swipe(a, b, Direction::Pass).unwrap();
    assert_eq!(daily_count(&db, a), 1);

    // The account-management collaborator upgrades the tier mid-day.
    let account = engine.upsert_account(a, "plus", None).unwrap();
    assert_eq!(account.tier, "plus");
    assert_eq!(account.daily_count, 1);
}
