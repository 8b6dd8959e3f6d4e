//! The swipe-and-match core.
//!
//! Every mutation runs as a single rusqlite transaction: quota authorize,
//! swipe upsert, counter merge, and match detection commit together or not
//! at all. A request that dies mid-flight leaves nothing half-done, and a
//! replayed request lands on the idempotent-by-overwrite swipe row and the
//! create-if-absent match row.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use anyhow::{Result, anyhow};
use chrono::{DateTime, Utc};
use rusqlite::Transaction;
use tracing::{info, warn};
use uuid::Uuid;

use cinder_db::models::{AccountRow, MatchRow};
use cinder_db::{Database, queries, timefmt};
use cinder_types::models::{Direction, Match, Swipe, UserAccount};

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::matchkey;
use crate::quota;

pub struct Engine {
    db: Arc<Database>,
    config: EngineConfig,
}

/// Outcome of one accepted swipe.
#[derive(Debug, Clone)]
pub struct SwipeReceipt {
    pub swipe: Swipe,
    /// Quota units left after this swipe consumed one.
    pub remaining: u32,
    /// The match this swipe belongs to, if reciprocity holds.
    pub matched: Option<Match>,
    /// True when this call created the match record. A repeat like or the
    /// loser of the creation race sees the match with this set to false,
    /// which is what keeps the celebration push from firing twice.
    pub match_created: bool,
}

impl Engine {
    pub fn new(db: Arc<Database>, config: EngineConfig) -> Self {
        Self { db, config }
    }

    /// The composite operation: authorize quota, persist the decision,
    /// consume a unit, detect reciprocity — one atomic transaction.
    pub fn record_swipe(
        &self,
        actor: Uuid,
        target: Uuid,
        direction: Direction,
    ) -> Result<SwipeReceipt, EngineError> {
        if actor == target {
            return Err(EngineError::InvalidTarget);
        }

        let receipt = self.run_txn(|tx| {
            let account = queries::get_account(tx, &actor.to_string())?
                .ok_or(EngineError::AccountNotFound(actor))?;

            // Candidate profiles are only served from provisioned accounts,
            // so an unknown target is a malformed request.
            if queries::get_account(tx, &target.to_string())?.is_none() {
                return Err(EngineError::InvalidTarget);
            }

            let policy = self.config.tiers.policy(&account.tier).ok_or_else(|| {
                EngineError::Storage(anyhow!("tier '{}' has no configured policy", account.tier))
            })?;

            let now = Utc::now();
            let today = now.date_naive();
            let last_date = account
                .last_swipe_date
                .as_deref()
                .map(timefmt::parse_date)
                .transpose()?;

            let decision = quota::evaluate(
                account.daily_count.max(0) as u32,
                last_date,
                today,
                policy.daily_limit,
            );
            if !decision.allowed {
                return Err(EngineError::QuotaExceeded {
                    limit: policy.daily_limit,
                });
            }

            let ts = timefmt::fmt_ts(now);
            queries::upsert_swipe(
                tx,
                &actor.to_string(),
                &target.to_string(),
                direction.as_str(),
                &ts,
            )?;
            queries::set_quota(
                tx,
                &actor.to_string(),
                i64::from(decision.effective_count + 1),
                &timefmt::fmt_date(today),
            )?;

            let (matched, match_created) = if direction == Direction::Like {
                self.detect_match(tx, actor, target, now)?
            } else {
                (None, false)
            };

            Ok(SwipeReceipt {
                swipe: Swipe {
                    actor_id: actor,
                    target_id: target,
                    direction,
                    created_at: now,
                },
                remaining: decision.remaining,
                matched,
                match_created,
            })
        })?;

        if receipt.match_created {
            if let Some(m) = &receipt.matched {
                info!("match created: {}", m.key);
            }
        }
        Ok(receipt)
    }

    /// Reciprocity check for a just-recorded like, inside the caller's
    /// transaction.
    fn detect_match(
        &self,
        tx: &Transaction<'_>,
        actor: Uuid,
        target: Uuid,
        now: DateTime<Utc>,
    ) -> Result<(Option<Match>, bool), EngineError> {
        let key = matchkey::canonical_key(actor, target);

        // Cheap short-circuit: a repeat like must not re-run detection.
        if let Some(row) = queries::get_match(tx, &key)? {
            return Ok((Some(match_from_row(row)?), false));
        }

        let reverse = queries::get_swipe(tx, &target.to_string(), &actor.to_string())?;
        match reverse {
            Some(s) if s.direction == Direction::Like.as_str() => {
                let (lo, hi) = matchkey::canonical_pair(actor, target);
                let created = queries::insert_match_if_absent(
                    tx,
                    &key,
                    &lo.to_string(),
                    &hi.to_string(),
                    &timefmt::fmt_ts(now),
                )?;

                // Losing the create race is not an error — fetch whatever
                // won; both parties observe the same match.
                let row = queries::get_match(tx, &key)?
                    .ok_or_else(|| anyhow!("match '{}' missing after create", key))?;
                Ok((Some(match_from_row(row)?), created))
            }
            _ => Ok((None, false)),
        }
    }

    /// Newest-first page of a user's matches. `before` is the `created_at`
    /// of the previous page's oldest entry.
    pub fn list_matches(
        &self,
        user: Uuid,
        limit: u32,
        before: Option<DateTime<Utc>>,
    ) -> Result<Vec<Match>, EngineError> {
        let limit = limit.clamp(1, 100);
        let cursor = before.map(timefmt::fmt_ts);

        let rows = self.db.with_conn(|conn| {
            queries::list_matches_for_user(conn, &user.to_string(), limit, cursor.as_deref())
        })?;

        rows.into_iter()
            .map(|row| Ok(match_from_row(row)?))
            .collect()
    }

    /// Chat-collaborator hook: mutate the preview fields of an existing
    /// match. Never creates.
    pub fn update_preview(
        &self,
        key: &str,
        caller: Uuid,
        text: &str,
        timestamp: DateTime<Utc>,
    ) -> Result<Match, EngineError> {
        self.run_txn(|tx| {
            let row = queries::get_match(tx, key)?
                .ok_or_else(|| EngineError::MatchNotFound(key.to_string()))?;
            let m = match_from_row(row)?;
            if !m.involves(caller) {
                return Err(EngineError::NotMatchMember(key.to_string()));
            }

            queries::update_match_preview(tx, key, text, &timefmt::fmt_ts(timestamp))?;

            let row = queries::get_match(tx, key)?
                .ok_or_else(|| anyhow!("match '{}' missing after preview update", key))?;
            Ok(match_from_row(row)?)
        })
    }

    pub fn activate_boost(&self, user: Uuid) -> Result<DateTime<Utc>, EngineError> {
        self.run_txn(|tx| {
            let account = queries::get_account(tx, &user.to_string())?
                .ok_or(EngineError::AccountNotFound(user))?;

            let policy = self.config.tiers.policy(&account.tier).ok_or_else(|| {
                EngineError::Storage(anyhow!("tier '{}' has no configured policy", account.tier))
            })?;
            if !policy.boost {
                return Err(EngineError::BoostNotEntitled {
                    tier: account.tier.clone(),
                });
            }

            let now = Utc::now();
            if let Some(until) = account.boost_until.as_deref() {
                let until = timefmt::parse_ts(until)?;
                if until > now {
                    return Err(EngineError::BoostAlreadyActive { until });
                }
            }

            let expiry = now + self.config.boost_duration;
            let ts = timefmt::fmt_ts(expiry);
            queries::set_boost_until(tx, &user.to_string(), &ts)?;
            queries::mirror_profile_boost(tx, &user.to_string(), &ts)?;

            Ok(expiry)
        })
    }

    /// Delete every swipe where `user` is the actor. Inbound swipes, quota
    /// counters, and matches stay untouched.
    pub fn reset_swipes(&self, user: Uuid) -> Result<u64, EngineError> {
        self.run_txn(|tx| {
            let deleted = queries::delete_swipes_by_actor(tx, &user.to_string())?;
            Ok(deleted as u64)
        })
    }

    // -- Provisioning passthrough for the account-management collaborator --

    pub fn upsert_account(
        &self,
        user: Uuid,
        tier: &str,
        display_name: Option<&str>,
    ) -> Result<UserAccount, EngineError> {
        if self.config.tiers.policy(tier).is_none() {
            return Err(EngineError::UnknownTier {
                tier: tier.to_string(),
            });
        }

        self.run_txn(|tx| {
            queries::upsert_account(tx, &user.to_string(), tier, &timefmt::fmt_ts(Utc::now()))?;
            queries::upsert_profile(tx, &user.to_string(), display_name)?;

            let row = queries::get_account(tx, &user.to_string())?
                .ok_or_else(|| anyhow!("account '{}' missing after upsert", user))?;
            Ok(account_from_row(row)?)
        })
    }

    pub fn get_account(&self, user: Uuid) -> Result<UserAccount, EngineError> {
        let row = self
            .db
            .with_conn(|conn| queries::get_account(conn, &user.to_string()))?
            .ok_or(EngineError::AccountNotFound(user))?;
        Ok(account_from_row(row)?)
    }

    /// Run `f` inside a transaction, retrying busy/locked conflicts up to
    /// the configured budget before surfacing `TransactionConflict`.
    /// Typed outcomes from `f` roll the transaction back and propagate
    /// unchanged.
    fn run_txn<T, F>(&self, f: F) -> Result<T, EngineError>
    where
        F: Fn(&Transaction<'_>) -> Result<T, EngineError>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;

            let outcome: Result<Result<T, EngineError>> = self.db.with_conn_mut(|conn| {
                let tx = conn.transaction()?;
                match f(&tx) {
                    Ok(value) => match tx.commit() {
                        Ok(()) => Ok(Ok(value)),
                        Err(e) => Ok(Err(EngineError::Storage(e.into()))),
                    },
                    // Rolls back when the transaction drops
                    Err(e) => Ok(Err(e)),
                }
            });

            let result = match outcome {
                Ok(inner) => inner,
                Err(e) => Err(EngineError::Storage(e)),
            };

            match result {
                Err(EngineError::Storage(e)) if is_conflict(&e) => {
                    if attempt >= self.config.max_txn_attempts {
                        warn!("storage conflict persisted after {} attempts", attempt);
                        return Err(EngineError::TransactionConflict);
                    }
                    warn!("storage conflict (attempt {}), retrying", attempt);
                    std::thread::sleep(StdDuration::from_millis(25 * u64::from(attempt)));
                }
                other => return other,
            }
        }
    }
}

fn is_conflict(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<rusqlite::Error>(),
        Some(rusqlite::Error::SqliteFailure(e, _))
            if matches!(
                e.code,
                rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
            )
    )
}

fn match_from_row(row: MatchRow) -> Result<Match> {
    let user_a: Uuid = row
        .user_a
        .parse()
        .map_err(|e| anyhow!("corrupt user_a '{}' on match '{}': {}", row.user_a, row.key, e))?;
    let user_b: Uuid = row
        .user_b
        .parse()
        .map_err(|e| anyhow!("corrupt user_b '{}' on match '{}': {}", row.user_b, row.key, e))?;

    Ok(Match {
        key: row.key,
        members: [user_a, user_b],
        created_at: timefmt::parse_ts(&row.created_at)?,
        last_message: row.last_message,
        last_message_at: row
            .last_message_at
            .as_deref()
            .map(timefmt::parse_ts)
            .transpose()?,
    })
}

fn account_from_row(row: AccountRow) -> Result<UserAccount> {
    let id: Uuid = row
        .id
        .parse()
        .map_err(|e| anyhow!("corrupt account id '{}': {}", row.id, e))?;

    Ok(UserAccount {
        id,
        tier: row.tier,
        daily_count: row.daily_count.max(0) as u32,
        last_swipe_date: row
            .last_swipe_date
            .as_deref()
            .map(timefmt::parse_date)
            .transpose()?,
        boost_until: row
            .boost_until
            .as_deref()
            .map(timefmt::parse_ts)
            .transpose()?,
        created_at: timefmt::parse_ts(&row.created_at)?,
    })
}
