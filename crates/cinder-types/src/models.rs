use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A swipe decision. Closed set — anything else is unrepresentable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Like,
    Pass,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Like => "like",
            Self::Pass => "pass",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "like" => Some(Self::Like),
            "pass" => Some(Self::Pass),
            _ => None,
        }
    }
}

/// One directional decision. At most one exists per (actor, target) pair;
/// re-swiping overwrites direction and timestamp in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Swipe {
    pub actor_id: Uuid,
    pub target_id: Uuid,
    pub direction: Direction,
    pub created_at: DateTime<Utc>,
}

/// A mutual like between two users. `key` is the pair-order-independent
/// identifier (both ids sorted ascending, joined with ':'), and `members`
/// holds the same sorted pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Match {
    pub key: String,
    pub members: [Uuid; 2],
    pub created_at: DateTime<Utc>,
    pub last_message: Option<String>,
    pub last_message_at: Option<DateTime<Utc>>,
}

impl Match {
    pub fn involves(&self, user_id: Uuid) -> bool {
        self.members.contains(&user_id)
    }

    /// The member that isn't `me`. Falls back to the first member if `me`
    /// isn't part of this match — callers check `involves` first.
    pub fn other(&self, me: Uuid) -> Uuid {
        if self.members[0] == me {
            self.members[1]
        } else {
            self.members[0]
        }
    }
}

/// Engine-visible slice of an account document. The account itself is owned
/// by the external account-management collaborator; the engine reads the
/// tier and mutates only the quota and boost fields, column by column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserAccount {
    pub id: Uuid,
    pub tier: String,
    pub daily_count: u32,
    pub last_swipe_date: Option<NaiveDate>,
    pub boost_until: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}
