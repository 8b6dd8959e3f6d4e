/// Database row types — these map directly to SQLite rows.
/// Distinct from cinder-types API models to keep the DB layer independent.

pub struct AccountRow {
    pub id: String,
    pub tier: String,
    pub daily_count: i64,
    pub last_swipe_date: Option<String>,
    pub boost_until: Option<String>,
    pub created_at: String,
}

pub struct SwipeRow {
    pub actor_id: String,
    pub target_id: String,
    pub direction: String,
    pub created_at: String,
}

pub struct MatchRow {
    pub key: String,
    pub user_a: String,
    pub user_b: String,
    pub created_at: String,
    pub last_message: Option<String>,
    pub last_message_at: Option<String>,
}
