use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Direction, Match};

// -- JWT Claims --

/// Claims minted by the external authentication service. Shared between
/// cinder-api (REST middleware) and cinder-gateway (WebSocket Identify);
/// the canonical definition lives here to eliminate duplication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub username: String,
    pub exp: usize,
}

// -- Swipes --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecordSwipeRequest {
    pub target_id: Uuid,
    pub direction: Direction,
}

#[derive(Debug, Serialize)]
pub struct RecordSwipeResponse {
    pub accepted: bool,
    pub remaining: u32,
    #[serde(rename = "match")]
    pub matched: Option<MatchResponse>,
}

#[derive(Debug, Serialize)]
pub struct ResetSwipesResponse {
    pub deleted: u64,
}

// -- Matches --

#[derive(Debug, Clone, Serialize)]
pub struct MatchResponse {
    pub key: String,
    pub members: [Uuid; 2],
    pub created_at: DateTime<Utc>,
    pub last_message: Option<String>,
    pub last_message_at: Option<DateTime<Utc>>,
}

impl From<Match> for MatchResponse {
    fn from(m: Match) -> Self {
        Self {
            key: m.key,
            members: m.members,
            created_at: m.created_at,
            last_message: m.last_message,
            last_message_at: m.last_message_at,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdatePreviewRequest {
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

// -- Boost --

#[derive(Debug, Serialize)]
pub struct ActivateBoostResponse {
    pub expires_at: DateTime<Utc>,
}

// -- Internal provisioning --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpsertAccountRequest {
    pub tier: String,
    pub display_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AccountResponse {
    pub id: Uuid,
    pub tier: String,
    pub daily_count: u32,
    pub last_swipe_date: Option<chrono::NaiveDate>,
    pub boost_until: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<crate::models::UserAccount> for AccountResponse {
    fn from(a: crate::models::UserAccount) -> Self {
        Self {
            id: a.id,
            tier: a.tier,
            daily_count: a.daily_count,
            last_swipe_date: a.last_swipe_date,
            boost_until: a.boost_until,
            created_at: a.created_at,
        }
    }
}

// -- Errors --

/// Machine-readable error body so the UI can branch deterministically.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: &'static str,
    pub error: String,
}
