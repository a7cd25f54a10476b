use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use thiserror::Error;

pub type ServiceResult<T> = Result<T, PlatformError>;

#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("session timeout")]
    SessionTimeout,
    #[error("validation error: {0}")]
    Validation(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("internal error: {0}")]
    Internal(String),
}

#[derive(Clone, Debug, Default)]
pub struct DataBag {
    inner: HashMap<String, Value>,
}

impl DataBag {
    pub fn new() -> Self {
        Self {
            inner: HashMap::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.inner.get(key)
    }

    pub fn set<T: Serialize>(&mut self, key: &str, value: T) {
        self.inner.insert(
            key.to_string(),
            serde_json::to_value(value).unwrap_or(Value::Null),
        );
    }

    pub fn remove(&mut self, key: &str) {
        self.inner.remove(key);
    }

    pub fn bool(&self, key: &str) -> bool {
        self.inner
            .get(key)
            .and_then(|value| value.as_bool())
            .unwrap_or(false)
    }

    pub fn int(&self, key: &str) -> Option<i64> {
        self.inner.get(key).and_then(|value| value.as_i64())
    }

    pub fn float(&self, key: &str) -> Option<f64> {
        self.inner.get(key).and_then(|value| value.as_f64())
    }

    pub fn string(&self, key: &str) -> Option<String> {
        self.inner
            .get(key)
            .and_then(|value| value.as_str().map(|s| s.to_string()))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.inner.contains_key(key)
    }
}

#[derive(Clone, Debug, Default)]
pub struct RequestVars {
    data: DataBag,
}

impl RequestVars {
    pub fn new() -> Self {
        Self {
            data: DataBag::new(),
        }
    }

    pub fn bool(&self, key: &str) -> bool {
        self.data.bool(key)
    }

    pub fn int(&self, key: &str) -> Option<i64> {
        self.data.int(key)
    }

    pub fn float(&self, key: &str) -> Option<f64> {
        self.data.float(key)
    }

    pub fn string(&self, key: &str) -> Option<String> {
        self.data.string(key)
    }

    pub fn set<T: Serialize>(&mut self, key: &str, value: T) {
        self.data.set(key, value);
    }

    pub fn remove(&mut self, key: &str) {
        self.data.remove(key);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.data.contains(key)
    }
}

/// Subscription tier. Strict total order: snail < slug < banana_slug.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Snail,
    Slug,
    BananaSlug,
}

impl Tier {
    pub fn level(self) -> u8 {
        match self {
            Tier::Snail => 0,
            Tier::Slug => 1,
            Tier::BananaSlug => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Tier::Snail => "snail",
            Tier::Slug => "slug",
            Tier::BananaSlug => "banana_slug",
        }
    }
}

impl Default for Tier {
    fn default() -> Self {
        Tier::Snail
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tier {
    type Err = PlatformError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "snail" => Ok(Tier::Snail),
            "slug" => Ok(Tier::Slug),
            "banana_slug" | "banana slug" => Ok(Tier::BananaSlug),
            other => Err(PlatformError::Validation(format!("unknown tier: {other}"))),
        }
    }
}

/// The signed-in account as seen by the current page.
#[derive(Clone, Debug)]
pub struct ViewerInfo {
    pub email: String,
    pub name: String,
    pub is_guest: bool,
    pub is_admin: bool,
    pub tier: Tier,
    pub tokens: i64,
    pub review_banned: bool,
}

impl Default for ViewerInfo {
    fn default() -> Self {
        Self {
            email: String::new(),
            name: String::from("Guest"),
            is_guest: true,
            is_admin: false,
            tier: Tier::Snail,
            tokens: 0,
            review_banned: false,
        }
    }
}

/// Per-request world state threaded through every controller.
///
/// `local_store` stands in for the browser's localStorage: session and
/// admin tokens plus the staged `pending_purchase` blob live there.
#[derive(Clone, Debug, Default)]
pub struct PageContext {
    pub settings: DataBag,
    pub context: DataBag,
    pub request: RequestVars,
    pub post_vars: RequestVars,
    pub session: DataBag,
    pub local_store: DataBag,
    pub viewer: ViewerInfo,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UserRecord {
    pub email: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub tier: Tier,
    pub tokens: i64,
    pub review_banned: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug)]
pub struct AdminRecord {
    pub email: String,
    pub password: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct MovieRecord {
    /// URL slug and folder key, unique across the catalog.
    pub movie_name: String,
    pub title: String,
    pub directors: Vec<String>,
    pub genres: Vec<String>,
    pub year: i32,
    pub imdb_rating: f64,
    pub rating: f64,
    pub review_count: i64,
    pub poster: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReviewRecord {
    pub movie_name: String,
    pub email: String,
    pub username: String,
    pub rating: f64,
    pub title: String,
    pub body: String,
    pub likes: i64,
    pub dislikes: i64,
    pub reported: bool,
    pub report_reasons: Vec<String>,
    pub report_count: i64,
    pub penalized: bool,
    pub hidden: bool,
    pub date: DateTime<Utc>,
}

impl ReviewRecord {
    pub fn new(movie_name: &str, email: &str, username: &str) -> Self {
        Self {
            movie_name: movie_name.into(),
            email: email.into(),
            username: username.into(),
            rating: 0.0,
            title: String::new(),
            body: String::new(),
            likes: 0,
            dislikes: 0,
            reported: false,
            report_reasons: Vec::new(),
            report_count: 0,
            penalized: false,
            hidden: false,
            date: Utc::now(),
        }
    }

    /// Wire format for report reasons, matching the legacy
    /// semicolon-joined field.
    pub fn joined_reasons(&self) -> String {
        self.report_reasons.join("; ")
    }
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct VoteStatus {
    pub has_liked: bool,
    pub has_disliked: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BannedEmailRecord {
    pub email: String,
    pub banned_date: DateTime<Utc>,
    pub banned_by: String,
    pub reason: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PurchaseKind {
    Tokens,
    Rank,
    Cosmetic,
}

/// How a purchase is settled for a single transaction.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Pricing {
    Cad(f64),
    Tokens(i64),
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PurchaseItem {
    pub id: String,
    pub kind: PurchaseKind,
    pub label: String,
    pub price_cad: Option<f64>,
    pub price_tokens: Option<i64>,
    pub tokens_received: Option<i64>,
    pub rank_upgrade: Option<Tier>,
}

impl PurchaseItem {
    /// An item is priced in CAD or tokens, never both and never neither.
    /// Malformed catalog entries are rejected instead of falling through
    /// to an undefined amount.
    pub fn pricing(&self) -> ServiceResult<Pricing> {
        match (self.price_cad, self.price_tokens) {
            (Some(cad), None) => Ok(Pricing::Cad(cad)),
            (None, Some(tokens)) => Ok(Pricing::Tokens(tokens)),
            (Some(_), Some(_)) => Err(PlatformError::Validation(format!(
                "item {} priced in both CAD and tokens",
                self.id
            ))),
            (None, None) => Err(PlatformError::Validation(format!(
                "item {} has no price",
                self.id
            ))),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StreamingSource {
    pub provider: String,
    pub url: String,
}

/// A reported review tagged with its movie title for the moderation queue.
#[derive(Clone, Debug, Serialize)]
pub struct ReportedReviewEntry {
    pub movie_title: String,
    pub review: ReviewRecord,
}

#[derive(Clone, Debug, Default)]
pub struct AdvancedQuery {
    pub title: Option<String>,
    pub genre: Option<String>,
    pub year_min: Option<i32>,
    pub year_max: Option<i32>,
    pub min_rating: Option<f64>,
}

#[derive(Clone, Debug, Serialize)]
pub struct ActionLogEntry {
    pub id: i64,
    pub action: String,
    pub actor: Option<String>,
    pub details: Value,
    pub timestamp: DateTime<Utc>,
}

pub fn ensure(condition: bool, error: PlatformError) -> ServiceResult<()> {
    if condition {
        Ok(())
    } else {
        Err(error)
    }
}

/// Splits a semicolon-joined reason string back into clean entries.
pub fn split_reasons(raw: &str) -> Vec<String> {
    raw.split(';')
        .map(|part| part.trim())
        .filter(|part| !part.is_empty())
        .map(|part| part.to_string())
        .collect()
}

/// The backend contract every page talks to. The reference implementation
/// below keeps everything in memory; the HTTP binary layers the REST
/// surface on top of it.
pub trait PlatformService {
    // Users and sessions
    fn find_user(&self, email: &str) -> ServiceResult<Option<UserRecord>>;
    fn create_user(&self, user: UserRecord) -> ServiceResult<()>;
    fn update_user_profile(
        &self,
        email: &str,
        username: Option<String>,
        password: Option<String>,
    ) -> ServiceResult<UserRecord>;
    fn delete_user(&self, email: &str) -> ServiceResult<()>;
    fn list_users(&self) -> ServiceResult<Vec<UserRecord>>;
    fn find_admin(&self, email: &str) -> ServiceResult<Option<AdminRecord>>;
    fn create_admin(&self, admin: AdminRecord) -> ServiceResult<()>;
    fn create_session(&self, email: &str) -> ServiceResult<String>;
    fn session_user(&self, session_id: &str) -> ServiceResult<Option<String>>;
    fn revoke_sessions(&self, email: &str) -> ServiceResult<usize>;

    // Tier and token economy
    fn set_tier(&self, email: &str, tier: Tier) -> ServiceResult<()>;
    /// Applies a signed delta to the balance and returns the new balance.
    /// A delta that would push the balance below zero is rejected.
    fn adjust_tokens(&self, email: &str, delta: i64) -> ServiceResult<i64>;

    // Blacklist and review bans
    fn list_banned_emails(&self) -> ServiceResult<Vec<BannedEmailRecord>>;
    fn ban_email(&self, record: BannedEmailRecord) -> ServiceResult<()>;
    fn unban_email(&self, email: &str) -> ServiceResult<()>;
    fn is_email_banned(&self, email: &str) -> ServiceResult<bool>;
    /// Flips the review ban. Banning penalizes and hides the user's
    /// existing reviews; unbanning clears the penalty flags.
    fn set_review_ban(&self, email: &str, banned: bool) -> ServiceResult<bool>;

    // Movie catalog
    fn list_movies(&self) -> ServiceResult<Vec<MovieRecord>>;
    fn get_movie(&self, movie_name: &str) -> ServiceResult<Option<MovieRecord>>;
    fn create_movie(&self, movie: MovieRecord) -> ServiceResult<()>;
    fn update_movie(&self, movie: MovieRecord) -> ServiceResult<()>;
    fn delete_movie(&self, movie_name: &str) -> ServiceResult<()>;
    fn top_movies(&self, limit: usize) -> ServiceResult<Vec<MovieRecord>>;
    fn most_commented(&self, limit: usize) -> ServiceResult<Vec<MovieRecord>>;
    fn streaming_sources(&self, title: &str) -> ServiceResult<Vec<StreamingSource>>;
    fn search_title(&self, query: &str) -> ServiceResult<Vec<MovieRecord>>;
    fn search_genres(&self, genres: &[String]) -> ServiceResult<Vec<MovieRecord>>;
    fn search_advanced(&self, query: &AdvancedQuery) -> ServiceResult<Vec<MovieRecord>>;

    // Reviews
    fn list_reviews(&self, movie_name: &str) -> ServiceResult<Vec<ReviewRecord>>;
    fn create_review(&self, review: ReviewRecord) -> ServiceResult<()>;
    fn vote_review(
        &self,
        movie_name: &str,
        author: &str,
        viewer: &str,
        like: bool,
    ) -> ServiceResult<ReviewRecord>;
    fn vote_status(
        &self,
        movie_name: &str,
        author: &str,
        viewer: &str,
    ) -> ServiceResult<VoteStatus>;
    fn report_review(
        &self,
        movie_name: &str,
        author: &str,
        reason: &str,
    ) -> ServiceResult<ReviewRecord>;
    /// Admin resolution. `remove == false` keeps the review: report count
    /// back to zero, reported and hidden cleared. `remove == true` deletes
    /// it permanently.
    fn resolve_review(&self, movie_name: &str, author: &str, remove: bool) -> ServiceResult<()>;

    // Store
    fn purchase_catalog(&self) -> ServiceResult<Vec<PurchaseItem>>;
    fn catalog_item(&self, id: &str) -> ServiceResult<Option<PurchaseItem>>;

    // Audit trail
    fn log_action(&self, action: &str, actor: Option<&str>, details: &Value) -> ServiceResult<()>;
    fn list_action_logs(&self) -> ServiceResult<Vec<ActionLogEntry>>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum VoteKind {
    Like,
    Dislike,
}

#[derive(Default)]
struct InMemoryState {
    users: HashMap<String, UserRecord>,
    admins: HashMap<String, AdminRecord>,
    movies: HashMap<String, MovieRecord>,
    reviews: HashMap<(String, String), ReviewRecord>,
    votes: HashMap<(String, String, String), VoteKind>,
    banned_emails: Vec<BannedEmailRecord>,
    sessions: HashMap<String, String>,
    streaming: HashMap<String, Vec<StreamingSource>>,
    catalog: Vec<PurchaseItem>,
    action_logs: Vec<ActionLogEntry>,
    broken_review_movies: HashSet<String>,
    next_session_seq: u64,
    next_action_log_id: i64,
}

#[derive(Clone)]
pub struct InMemoryService {
    state: Arc<Mutex<InMemoryState>>,
}

impl InMemoryService {
    pub fn new_with_sample() -> Self {
        let mut state = InMemoryState::default();

        let now = Utc::now();
        for (email, username, tier, tokens, review_banned) in [
            ("alice@example.com", "alice", Tier::Snail, 120, false),
            ("bob@example.com", "bob", Tier::Slug, 500, false),
            ("carol@example.com", "carol", Tier::BananaSlug, 2000, false),
            ("mallory@example.com", "mallory", Tier::Snail, 40, true),
        ] {
            state.users.insert(
                email.to_string(),
                UserRecord {
                    email: email.into(),
                    username: username.into(),
                    password: "password1".into(),
                    tier,
                    tokens,
                    review_banned,
                    created_at: now,
                },
            );
        }

        state.admins.insert(
            "admin@cineslug.dev".into(),
            AdminRecord {
                email: "admin@cineslug.dev".into(),
                password: "admin-secret".into(),
            },
        );

        state.banned_emails.push(BannedEmailRecord {
            email: "spammer@example.com".into(),
            banned_date: now,
            banned_by: "admin@cineslug.dev".into(),
            reason: Some("Vote manipulation".into()),
        });

        for (movie_name, title, director, genres, year, imdb, rating, count) in [
            (
                "the-slug-prince",
                "The Slug Prince",
                "R. Gastropod",
                vec!["Fantasy", "Drama"],
                2019,
                7.8,
                8.2,
                2i64,
            ),
            (
                "garden-after-rain",
                "Garden After Rain",
                "M. Trail",
                vec!["Romance"],
                2021,
                6.9,
                7.1,
                1,
            ),
            (
                "banana-harvest",
                "Banana Harvest",
                "K. Peel",
                vec!["Comedy"],
                2017,
                6.2,
                6.0,
                1,
            ),
            (
                "night-of-the-snails",
                "Night of the Snails",
                "R. Gastropod",
                vec!["Horror"],
                2015,
                5.4,
                4.9,
                0,
            ),
        ] {
            state.movies.insert(
                movie_name.to_string(),
                MovieRecord {
                    movie_name: movie_name.into(),
                    title: title.into(),
                    directors: vec![director.into()],
                    genres: genres.into_iter().map(String::from).collect(),
                    year,
                    imdb_rating: imdb,
                    rating,
                    review_count: count,
                    poster: format!("/posters/{movie_name}.jpg"),
                },
            );
        }

        let mut review = ReviewRecord::new("the-slug-prince", "bob@example.com", "bob");
        review.rating = 8.5;
        review.title = "A quiet triumph".into();
        review.body = "Slow at first, but the third act lands.".into();
        review.likes = 3;
        state
            .reviews
            .insert(("the-slug-prince".into(), "bob@example.com".into()), review);

        let mut review = ReviewRecord::new("garden-after-rain", "alice@example.com", "alice");
        review.rating = 2.0;
        review.title = "Overrated".into();
        review.body = "Did we watch the same film?".into();
        review.reported = true;
        review.report_count = 2;
        review.report_reasons = vec!["Spoilers".into(), "Abusive language".into()];
        state.reviews.insert(
            ("garden-after-rain".into(), "alice@example.com".into()),
            review,
        );

        let mut review = ReviewRecord::new("the-slug-prince", "mallory@example.com", "mallory");
        review.rating = 0.5;
        review.title = "Garbage".into();
        review.body = "Link in my profile for free movies".into();
        review.reported = true;
        review.report_count = 5;
        review.report_reasons = vec!["Spam".into()];
        review.penalized = true;
        review.hidden = true;
        state.reviews.insert(
            ("the-slug-prince".into(), "mallory@example.com".into()),
            review,
        );

        let mut review = ReviewRecord::new("banana-harvest", "carol@example.com", "carol");
        review.rating = 6.5;
        review.title = "Ripe enough".into();
        review.body = "Exactly what it says on the tin.".into();
        state
            .reviews
            .insert(("banana-harvest".into(), "carol@example.com".into()), review);

        state.streaming.insert(
            "the slug prince".into(),
            vec![
                StreamingSource {
                    provider: "SlugFlix".into(),
                    url: "https://slugflix.example/watch/the-slug-prince".into(),
                },
                StreamingSource {
                    provider: "CineNow".into(),
                    url: "https://cinenow.example/m/the-slug-prince".into(),
                },
            ],
        );

        state.catalog = vec![
            PurchaseItem {
                id: "tokens-500".into(),
                kind: PurchaseKind::Tokens,
                label: "500 token pack".into(),
                price_cad: Some(4.99),
                price_tokens: None,
                tokens_received: Some(500),
                rank_upgrade: None,
            },
            PurchaseItem {
                id: "tokens-1200".into(),
                kind: PurchaseKind::Tokens,
                label: "1200 token pack".into(),
                price_cad: Some(9.99),
                price_tokens: None,
                tokens_received: Some(1200),
                rank_upgrade: None,
            },
            PurchaseItem {
                id: "rank-slug".into(),
                kind: PurchaseKind::Rank,
                label: "Upgrade to slug".into(),
                price_cad: None,
                price_tokens: Some(1000),
                tokens_received: None,
                rank_upgrade: Some(Tier::Slug),
            },
            PurchaseItem {
                id: "rank-banana-slug".into(),
                kind: PurchaseKind::Rank,
                label: "Upgrade to banana slug".into(),
                price_cad: None,
                price_tokens: Some(2500),
                tokens_received: None,
                rank_upgrade: Some(Tier::BananaSlug),
            },
            PurchaseItem {
                id: "cosmetic-gold-trail".into(),
                kind: PurchaseKind::Cosmetic,
                label: "Gold slime trail".into(),
                price_cad: None,
                price_tokens: Some(150),
                tokens_received: None,
                rank_upgrade: None,
            },
        ];

        state.next_session_seq = 1;
        state.next_action_log_id = 1;

        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// Makes `list_reviews` fail for one movie. Used by tests to exercise
    /// the skip-on-failure behavior of the moderation aggregate.
    pub fn poison_reviews(&self, movie_name: &str) {
        let mut state = self.state.lock().unwrap();
        state.broken_review_movies.insert(movie_name.to_string());
    }

    fn recompute_movie_stats(state: &mut InMemoryState, movie_name: &str) {
        let ratings: Vec<f64> = state
            .reviews
            .values()
            .filter(|review| review.movie_name == movie_name)
            .map(|review| review.rating)
            .collect();
        if let Some(movie) = state.movies.get_mut(movie_name) {
            movie.review_count = ratings.len() as i64;
            movie.rating = if ratings.is_empty() {
                0.0
            } else {
                ratings.iter().sum::<f64>() / ratings.len() as f64
            };
        }
    }

    fn matches_query(movie: &MovieRecord, query: &AdvancedQuery) -> bool {
        if let Some(title) = &query.title {
            if !movie.title.to_lowercase().contains(&title.to_lowercase()) {
                return false;
            }
        }
        if let Some(genre) = &query.genre {
            if !movie.genres.iter().any(|g| g.eq_ignore_ascii_case(genre)) {
                return false;
            }
        }
        if let Some(min) = query.year_min {
            if movie.year < min {
                return false;
            }
        }
        if let Some(max) = query.year_max {
            if movie.year > max {
                return false;
            }
        }
        if let Some(min_rating) = query.min_rating {
            if movie.rating < min_rating {
                return false;
            }
        }
        true
    }

    fn sorted_movies(state: &InMemoryState) -> Vec<MovieRecord> {
        let mut movies: Vec<MovieRecord> = state.movies.values().cloned().collect();
        movies.sort_by(|a, b| a.movie_name.cmp(&b.movie_name));
        movies
    }
}

impl Default for InMemoryService {
    fn default() -> Self {
        Self::new_with_sample()
    }
}

impl PlatformService for InMemoryService {
    fn find_user(&self, email: &str) -> ServiceResult<Option<UserRecord>> {
        let state = self.state.lock().unwrap();
        Ok(state.users.get(&email.to_lowercase()).cloned())
    }

    fn create_user(&self, user: UserRecord) -> ServiceResult<()> {
        let mut state = self.state.lock().unwrap();
        let key = user.email.to_lowercase();
        if state.users.contains_key(&key) {
            return Err(PlatformError::Conflict(format!(
                "user {} already exists",
                user.email
            )));
        }
        if state
            .users
            .values()
            .any(|existing| existing.username.eq_ignore_ascii_case(&user.username))
        {
            return Err(PlatformError::Conflict(format!(
                "username {} already taken",
                user.username
            )));
        }
        state.users.insert(key, user);
        Ok(())
    }

    fn update_user_profile(
        &self,
        email: &str,
        username: Option<String>,
        password: Option<String>,
    ) -> ServiceResult<UserRecord> {
        let mut state = self.state.lock().unwrap();
        let user = state
            .users
            .get_mut(&email.to_lowercase())
            .ok_or_else(|| PlatformError::NotFound(format!("user {email}")))?;
        if let Some(username) = username {
            user.username = username;
        }
        if let Some(password) = password {
            user.password = password;
        }
        Ok(user.clone())
    }

    fn delete_user(&self, email: &str) -> ServiceResult<()> {
        let mut state = self.state.lock().unwrap();
        state
            .users
            .remove(&email.to_lowercase())
            .ok_or_else(|| PlatformError::NotFound(format!("user {email}")))?;
        Ok(())
    }

    fn list_users(&self) -> ServiceResult<Vec<UserRecord>> {
        let state = self.state.lock().unwrap();
        let mut users: Vec<UserRecord> = state.users.values().cloned().collect();
        users.sort_by(|a, b| a.email.cmp(&b.email));
        Ok(users)
    }

    fn find_admin(&self, email: &str) -> ServiceResult<Option<AdminRecord>> {
        let state = self.state.lock().unwrap();
        Ok(state.admins.get(&email.to_lowercase()).cloned())
    }

    fn create_admin(&self, admin: AdminRecord) -> ServiceResult<()> {
        let mut state = self.state.lock().unwrap();
        let key = admin.email.to_lowercase();
        if state.admins.contains_key(&key) {
            return Err(PlatformError::Conflict(format!(
                "admin {} already exists",
                admin.email
            )));
        }
        state.admins.insert(key, admin);
        Ok(())
    }

    fn create_session(&self, email: &str) -> ServiceResult<String> {
        let mut state = self.state.lock().unwrap();
        let seq = state.next_session_seq;
        state.next_session_seq += 1;
        let session_id = format!("{:x}-{seq:x}", Utc::now().timestamp_micros());
        state
            .sessions
            .insert(session_id.clone(), email.to_lowercase());
        Ok(session_id)
    }

    fn session_user(&self, session_id: &str) -> ServiceResult<Option<String>> {
        let state = self.state.lock().unwrap();
        Ok(state.sessions.get(session_id).cloned())
    }

    fn revoke_sessions(&self, email: &str) -> ServiceResult<usize> {
        let mut state = self.state.lock().unwrap();
        let key = email.to_lowercase();
        let before = state.sessions.len();
        state.sessions.retain(|_, owner| *owner != key);
        Ok(before - state.sessions.len())
    }

    fn set_tier(&self, email: &str, tier: Tier) -> ServiceResult<()> {
        let mut state = self.state.lock().unwrap();
        let user = state
            .users
            .get_mut(&email.to_lowercase())
            .ok_or_else(|| PlatformError::NotFound(format!("user {email}")))?;
        user.tier = tier;
        Ok(())
    }

    fn adjust_tokens(&self, email: &str, delta: i64) -> ServiceResult<i64> {
        let mut state = self.state.lock().unwrap();
        let user = state
            .users
            .get_mut(&email.to_lowercase())
            .ok_or_else(|| PlatformError::NotFound(format!("user {email}")))?;
        let next = user.tokens + delta;
        if next < 0 {
            return Err(PlatformError::Validation(format!(
                "balance cannot go below zero (has {}, delta {delta})",
                user.tokens
            )));
        }
        user.tokens = next;
        Ok(next)
    }

    fn list_banned_emails(&self) -> ServiceResult<Vec<BannedEmailRecord>> {
        let state = self.state.lock().unwrap();
        Ok(state.banned_emails.clone())
    }

    fn ban_email(&self, record: BannedEmailRecord) -> ServiceResult<()> {
        let mut state = self.state.lock().unwrap();
        if state
            .banned_emails
            .iter()
            .any(|entry| entry.email.eq_ignore_ascii_case(&record.email))
        {
            return Err(PlatformError::Conflict(format!(
                "{} is already blacklisted",
                record.email
            )));
        }
        state.banned_emails.push(record);
        Ok(())
    }

    fn unban_email(&self, email: &str) -> ServiceResult<()> {
        let mut state = self.state.lock().unwrap();
        let before = state.banned_emails.len();
        state
            .banned_emails
            .retain(|entry| !entry.email.eq_ignore_ascii_case(email));
        if state.banned_emails.len() == before {
            return Err(PlatformError::NotFound(format!(
                "{email} is not blacklisted"
            )));
        }
        Ok(())
    }

    fn is_email_banned(&self, email: &str) -> ServiceResult<bool> {
        let state = self.state.lock().unwrap();
        Ok(state
            .banned_emails
            .iter()
            .any(|entry| entry.email.eq_ignore_ascii_case(email)))
    }

    fn set_review_ban(&self, email: &str, banned: bool) -> ServiceResult<bool> {
        let mut state = self.state.lock().unwrap();
        let key = email.to_lowercase();
        let user = state
            .users
            .get_mut(&key)
            .ok_or_else(|| PlatformError::NotFound(format!("user {email}")))?;
        user.review_banned = banned;
        for review in state.reviews.values_mut() {
            if review.email.eq_ignore_ascii_case(email) {
                review.penalized = banned;
                if banned {
                    review.hidden = true;
                }
            }
        }
        Ok(banned)
    }

    fn list_movies(&self) -> ServiceResult<Vec<MovieRecord>> {
        let state = self.state.lock().unwrap();
        Ok(Self::sorted_movies(&state))
    }

    fn get_movie(&self, movie_name: &str) -> ServiceResult<Option<MovieRecord>> {
        let state = self.state.lock().unwrap();
        Ok(state.movies.get(movie_name).cloned())
    }

    fn create_movie(&self, movie: MovieRecord) -> ServiceResult<()> {
        let mut state = self.state.lock().unwrap();
        if state.movies.contains_key(&movie.movie_name) {
            return Err(PlatformError::Conflict(format!(
                "movie {} already exists",
                movie.movie_name
            )));
        }
        state.movies.insert(movie.movie_name.clone(), movie);
        Ok(())
    }

    fn update_movie(&self, movie: MovieRecord) -> ServiceResult<()> {
        let mut state = self.state.lock().unwrap();
        if !state.movies.contains_key(&movie.movie_name) {
            return Err(PlatformError::NotFound(format!(
                "movie {}",
                movie.movie_name
            )));
        }
        state.movies.insert(movie.movie_name.clone(), movie);
        Ok(())
    }

    fn delete_movie(&self, movie_name: &str) -> ServiceResult<()> {
        let mut state = self.state.lock().unwrap();
        state
            .movies
            .remove(movie_name)
            .ok_or_else(|| PlatformError::NotFound(format!("movie {movie_name}")))?;
        state.reviews.retain(|(movie, _), _| movie != movie_name);
        Ok(())
    }

    fn top_movies(&self, limit: usize) -> ServiceResult<Vec<MovieRecord>> {
        let state = self.state.lock().unwrap();
        let mut movies = Self::sorted_movies(&state);
        movies.sort_by(|a, b| {
            b.rating
                .partial_cmp(&a.rating)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        movies.truncate(limit);
        Ok(movies)
    }

    fn most_commented(&self, limit: usize) -> ServiceResult<Vec<MovieRecord>> {
        let state = self.state.lock().unwrap();
        let mut movies = Self::sorted_movies(&state);
        movies.sort_by(|a, b| b.review_count.cmp(&a.review_count));
        movies.truncate(limit);
        Ok(movies)
    }

    fn streaming_sources(&self, title: &str) -> ServiceResult<Vec<StreamingSource>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .streaming
            .get(&title.to_lowercase())
            .cloned()
            .unwrap_or_default())
    }

    fn search_title(&self, query: &str) -> ServiceResult<Vec<MovieRecord>> {
        let state = self.state.lock().unwrap();
        let needle = query.to_lowercase();
        Ok(Self::sorted_movies(&state)
            .into_iter()
            .filter(|movie| movie.title.to_lowercase().contains(&needle))
            .collect())
    }

    fn search_genres(&self, genres: &[String]) -> ServiceResult<Vec<MovieRecord>> {
        let state = self.state.lock().unwrap();
        Ok(Self::sorted_movies(&state)
            .into_iter()
            .filter(|movie| {
                genres.iter().any(|wanted| {
                    movie
                        .genres
                        .iter()
                        .any(|genre| genre.eq_ignore_ascii_case(wanted))
                })
            })
            .collect())
    }

    fn search_advanced(&self, query: &AdvancedQuery) -> ServiceResult<Vec<MovieRecord>> {
        let state = self.state.lock().unwrap();
        Ok(Self::sorted_movies(&state)
            .into_iter()
            .filter(|movie| Self::matches_query(movie, query))
            .collect())
    }

    fn list_reviews(&self, movie_name: &str) -> ServiceResult<Vec<ReviewRecord>> {
        let state = self.state.lock().unwrap();
        if state.broken_review_movies.contains(movie_name) {
            return Err(PlatformError::Internal(format!(
                "review store unavailable for {movie_name}"
            )));
        }
        let mut reviews: Vec<ReviewRecord> = state
            .reviews
            .values()
            .filter(|review| review.movie_name == movie_name)
            .cloned()
            .collect();
        reviews.sort_by(|a, b| b.date.cmp(&a.date).then(a.email.cmp(&b.email)));
        Ok(reviews)
    }

    fn create_review(&self, review: ReviewRecord) -> ServiceResult<()> {
        let mut state = self.state.lock().unwrap();
        if !state.movies.contains_key(&review.movie_name) {
            return Err(PlatformError::NotFound(format!(
                "movie {}",
                review.movie_name
            )));
        }
        let key = (review.movie_name.clone(), review.email.to_lowercase());
        if state.reviews.contains_key(&key) {
            return Err(PlatformError::Conflict(format!(
                "{} already reviewed {}",
                review.email, review.movie_name
            )));
        }
        let movie_name = review.movie_name.clone();
        state.reviews.insert(key, review);
        Self::recompute_movie_stats(&mut state, &movie_name);
        Ok(())
    }

    fn vote_review(
        &self,
        movie_name: &str,
        author: &str,
        viewer: &str,
        like: bool,
    ) -> ServiceResult<ReviewRecord> {
        let mut state = self.state.lock().unwrap();
        let review_key = (movie_name.to_string(), author.to_lowercase());
        if !state.reviews.contains_key(&review_key) {
            return Err(PlatformError::NotFound(format!(
                "review by {author} on {movie_name}"
            )));
        }
        let vote_key = (
            movie_name.to_string(),
            author.to_lowercase(),
            viewer.to_lowercase(),
        );
        let wanted = if like { VoteKind::Like } else { VoteKind::Dislike };
        let previous = state.votes.get(&vote_key).copied();
        match previous {
            Some(kind) if kind == wanted => {
                // repeat click withdraws the vote
                let review = state.reviews.get_mut(&review_key).unwrap();
                match kind {
                    VoteKind::Like => review.likes -= 1,
                    VoteKind::Dislike => review.dislikes -= 1,
                }
                state.votes.remove(&vote_key);
            }
            Some(VoteKind::Like) => {
                let review = state.reviews.get_mut(&review_key).unwrap();
                review.likes -= 1;
                review.dislikes += 1;
                state.votes.insert(vote_key, VoteKind::Dislike);
            }
            Some(VoteKind::Dislike) => {
                let review = state.reviews.get_mut(&review_key).unwrap();
                review.dislikes -= 1;
                review.likes += 1;
                state.votes.insert(vote_key, VoteKind::Like);
            }
            None => {
                let review = state.reviews.get_mut(&review_key).unwrap();
                match wanted {
                    VoteKind::Like => review.likes += 1,
                    VoteKind::Dislike => review.dislikes += 1,
                }
                state.votes.insert(vote_key, wanted);
            }
        }
        Ok(state.reviews.get(&review_key).cloned().unwrap())
    }

    fn vote_status(
        &self,
        movie_name: &str,
        author: &str,
        viewer: &str,
    ) -> ServiceResult<VoteStatus> {
        let state = self.state.lock().unwrap();
        let vote_key = (
            movie_name.to_string(),
            author.to_lowercase(),
            viewer.to_lowercase(),
        );
        Ok(match state.votes.get(&vote_key) {
            Some(VoteKind::Like) => VoteStatus {
                has_liked: true,
                has_disliked: false,
            },
            Some(VoteKind::Dislike) => VoteStatus {
                has_liked: false,
                has_disliked: true,
            },
            None => VoteStatus::default(),
        })
    }

    fn report_review(
        &self,
        movie_name: &str,
        author: &str,
        reason: &str,
    ) -> ServiceResult<ReviewRecord> {
        let mut state = self.state.lock().unwrap();
        let key = (movie_name.to_string(), author.to_lowercase());
        let review = state
            .reviews
            .get_mut(&key)
            .ok_or_else(|| PlatformError::NotFound(format!("review by {author} on {movie_name}")))?;
        review.reported = true;
        review.report_count += 1;
        let reason = reason.trim();
        if !reason.is_empty() {
            review.report_reasons.push(reason.to_string());
        }
        Ok(review.clone())
    }

    fn resolve_review(&self, movie_name: &str, author: &str, remove: bool) -> ServiceResult<()> {
        let mut state = self.state.lock().unwrap();
        let key = (movie_name.to_string(), author.to_lowercase());
        if remove {
            state.reviews.remove(&key).ok_or_else(|| {
                PlatformError::NotFound(format!("review by {author} on {movie_name}"))
            })?;
            Self::recompute_movie_stats(&mut state, movie_name);
            return Ok(());
        }
        let review = state
            .reviews
            .get_mut(&key)
            .ok_or_else(|| PlatformError::NotFound(format!("review by {author} on {movie_name}")))?;
        review.reported = false;
        review.report_count = 0;
        review.report_reasons.clear();
        review.hidden = false;
        Ok(())
    }

    fn purchase_catalog(&self) -> ServiceResult<Vec<PurchaseItem>> {
        let state = self.state.lock().unwrap();
        Ok(state.catalog.clone())
    }

    fn catalog_item(&self, id: &str) -> ServiceResult<Option<PurchaseItem>> {
        let state = self.state.lock().unwrap();
        Ok(state.catalog.iter().find(|item| item.id == id).cloned())
    }

    fn log_action(&self, action: &str, actor: Option<&str>, details: &Value) -> ServiceResult<()> {
        let mut state = self.state.lock().unwrap();
        let id = state.next_action_log_id;
        state.next_action_log_id += 1;
        state.action_logs.push(ActionLogEntry {
            id,
            action: action.to_string(),
            actor: actor.map(String::from),
            details: details.clone(),
            timestamp: Utc::now(),
        });
        Ok(())
    }

    fn list_action_logs(&self) -> ServiceResult<Vec<ActionLogEntry>> {
        let state = self.state.lock().unwrap();
        Ok(state.action_logs.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_order_is_total() {
        assert!(Tier::Snail < Tier::Slug);
        assert!(Tier::Slug < Tier::BananaSlug);
        assert_eq!("banana_slug".parse::<Tier>().unwrap(), Tier::BananaSlug);
        assert_eq!("SNAIL".parse::<Tier>().unwrap(), Tier::Snail);
        assert!("emperor_slug".parse::<Tier>().is_err());
    }

    #[test]
    fn pricing_rejects_malformed_items() {
        let mut item = PurchaseItem {
            id: "weird".into(),
            kind: PurchaseKind::Rank,
            label: "Weird".into(),
            price_cad: Some(9.99),
            price_tokens: Some(1000),
            tokens_received: None,
            rank_upgrade: Some(Tier::Slug),
        };
        assert!(item.pricing().is_err());
        item.price_tokens = None;
        assert_eq!(item.pricing().unwrap(), Pricing::Cad(9.99));
        item.price_cad = None;
        assert!(item.pricing().is_err());
    }

    #[test]
    fn split_reasons_drops_empties() {
        let reasons = split_reasons("Spam; ;Abusive language;;");
        assert_eq!(reasons, vec!["Spam", "Abusive language"]);
    }

    #[test]
    fn adjust_tokens_never_goes_negative() {
        let service = InMemoryService::default();
        let balance = service.adjust_tokens("alice@example.com", -20).unwrap();
        assert_eq!(balance, 100);
        assert!(service.adjust_tokens("alice@example.com", -500).is_err());
    }

    #[test]
    fn review_ban_penalizes_and_hides() {
        let service = InMemoryService::default();
        service.set_review_ban("bob@example.com", true).unwrap();
        let reviews = service.list_reviews("the-slug-prince").unwrap();
        let bobs = reviews
            .iter()
            .find(|review| review.email == "bob@example.com")
            .unwrap();
        assert!(bobs.penalized && bobs.hidden);

        service.set_review_ban("bob@example.com", false).unwrap();
        let reviews = service.list_reviews("the-slug-prince").unwrap();
        let bobs = reviews
            .iter()
            .find(|review| review.email == "bob@example.com")
            .unwrap();
        assert!(!bobs.penalized);
    }

    #[test]
    fn vote_switching_moves_counters() {
        let service = InMemoryService::default();
        let review = service
            .vote_review(
                "the-slug-prince",
                "bob@example.com",
                "carol@example.com",
                true,
            )
            .unwrap();
        assert_eq!(review.likes, 4);
        let review = service
            .vote_review(
                "the-slug-prince",
                "bob@example.com",
                "carol@example.com",
                false,
            )
            .unwrap();
        assert_eq!(review.likes, 3);
        assert_eq!(review.dislikes, 1);
        let status = service
            .vote_status("the-slug-prince", "bob@example.com", "carol@example.com")
            .unwrap();
        assert!(status.has_disliked && !status.has_liked);
    }

    #[test]
    fn keep_resets_report_state() {
        let service = InMemoryService::default();
        service
            .resolve_review("garden-after-rain", "alice@example.com", false)
            .unwrap();
        let reviews = service.list_reviews("garden-after-rain").unwrap();
        let kept = &reviews[0];
        assert!(!kept.reported && !kept.hidden);
        assert_eq!(kept.report_count, 0);
        assert!(kept.report_reasons.is_empty());
    }

    #[test]
    fn delete_is_terminal_and_updates_counts() {
        let service = InMemoryService::default();
        service
            .resolve_review("the-slug-prince", "mallory@example.com", true)
            .unwrap();
        assert!(service
            .resolve_review("the-slug-prince", "mallory@example.com", true)
            .is_err());
        let movie = service.get_movie("the-slug-prince").unwrap().unwrap();
        assert_eq!(movie.review_count, 1);
    }
}
