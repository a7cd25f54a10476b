use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use chrono::Utc;
use dotenvy::dotenv;
use serde::Deserialize;
use serde_json::{Value, json};
use sqlx::PgPool;
use std::{env, net::SocketAddr};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use cineslug_rust::{
    account::AccountController,
    auth::{AuthClaims, issue_token},
    browse,
    controller::ReviewController,
    db::{DbConfig, connect_pool, upsert_user_by_email},
    manage_bans::PenaltyController,
    manage_movies, manage_users,
    moderation_center::{ModerationQueue, QueueSort},
    payment::PaymentController,
    register, search,
    services::{InMemoryService, PageContext, PlatformError, PlatformService},
    session::{self, load_user_into_context},
    store,
};

#[derive(Clone)]
struct AppState {
    db: PgPool,
    platform: InMemoryService,
}

#[tokio::main]
async fn main() {
    dotenv().ok();
    init_tracing();

    let db_config = DbConfig::from_env();
    let db = connect_pool(&db_config).expect("failed to configure postgres pool");

    let platform = InMemoryService::new_with_sample();
    let state = AppState { db, platform };
    let app = Router::new()
        .route("/health", get(health))
        .route("/api/users/signup", post(users_signup))
        .route("/api/users/login", post(users_login))
        .route("/api/admin/login", post(admin_login))
        .route("/api/users/check-session/{id}", get(check_session))
        .route(
            "/api/users/profile",
            get(users_profile).put(users_profile_update),
        )
        .route("/api/movies/top", get(movies_top))
        .route("/api/movies/most_commented", get(movies_most_commented))
        .route("/api/movies/streaming/{title}", get(movies_streaming))
        .route("/api/movies/{name}", get(movie_detail))
        .route("/api/search/title", get(search_title))
        .route("/api/search/genres", get(search_genres))
        .route("/api/search/advanced", get(search_advanced))
        .route("/api/reviews/{movie}", get(reviews_list).post(reviews_submit))
        .route("/api/reviews/{movie}/like", post(reviews_like))
        .route("/api/reviews/{movie}/dislike", post(reviews_dislike))
        .route(
            "/api/reviews/{movie}/vote-status/{author}",
            get(reviews_vote_status),
        )
        .route("/api/reviews/{movie}/reported", put(reviews_report))
        .route("/api/store/catalog", get(store_catalog))
        .route("/api/store/process-payment", post(store_process_payment))
        .route(
            "/api/admin/movies",
            get(admin_movies_list).post(admin_movies_create),
        )
        .route(
            "/api/admin/movies/{name}",
            put(admin_movies_update).delete(admin_movies_delete),
        )
        .route(
            "/api/admin/users",
            get(admin_users_list).delete(admin_users_delete),
        )
        .route("/api/admin/users/banned", get(admin_users_banned))
        .route("/api/admin/users/upgrade-tier", post(admin_upgrade_tier))
        .route("/api/admin/users/remove-tokens", post(admin_remove_tokens))
        .route("/api/admin/users/review-ban", post(admin_review_ban))
        .route("/api/admin/users/ban", post(admin_ban))
        .route("/api/admin/users/unban", post(admin_unban))
        .route("/api/admin/users/make-admin", post(admin_make_admin))
        .route("/api/admin/reviews/reported", get(admin_reported))
        .route("/api/admin/reviews/resolve", post(admin_resolve))
        .with_state(state);

    let addr: SocketAddr = env::var("BIND_ADDR")
        .unwrap_or_else(|_| "127.0.0.1:3000".into())
        .parse()
        .expect("invalid BIND_ADDR, expected host:port");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("failed to bind HTTP listener");
    info!("API listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server crashed");
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();
}

fn platform_error(err: PlatformError) -> Response {
    let status = match &err {
        PlatformError::PermissionDenied(_) => StatusCode::FORBIDDEN,
        PlatformError::SessionTimeout => StatusCode::UNAUTHORIZED,
        PlatformError::Validation(_) => StatusCode::BAD_REQUEST,
        PlatformError::NotFound(_) => StatusCode::NOT_FOUND,
        PlatformError::Conflict(_) => StatusCode::CONFLICT,
        PlatformError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(json!({"detail": err.to_string()}))).into_response()
}

/// Builds a page context for the caller: admin tokens get the admin
/// viewer, member tokens resolve to the live account, anything else is
/// a guest.
fn viewer_ctx(state: &AppState, claims: Option<&AuthClaims>) -> Result<PageContext, Response> {
    let mut ctx = PageContext::default();
    let Some(claims) = claims else {
        return Ok(ctx);
    };
    if claims.is_admin() {
        ctx.viewer.is_guest = false;
        ctx.viewer.is_admin = true;
        ctx.viewer.email = claims.sub.clone();
        ctx.viewer.name = claims.sub.clone();
        return Ok(ctx);
    }
    match state.platform.find_user(&claims.sub) {
        Ok(Some(user)) => {
            load_user_into_context(&mut ctx, &user);
            Ok(ctx)
        }
        Ok(None) => Err(platform_error(PlatformError::SessionTimeout)),
        Err(err) => Err(platform_error(err)),
    }
}

fn context_value(ctx: &PageContext, key: &str) -> Value {
    ctx.context.get(key).cloned().unwrap_or(Value::Null)
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let db_status = match sqlx::query_scalar::<_, i32>("select 1")
        .fetch_one(&state.db)
        .await
    {
        Ok(_) => json!({"status": "ok"}),
        Err(err) => {
            error!(error = %err, "database connectivity check failed");
            json!({"status": "error", "message": err.to_string()})
        }
    };

    (
        StatusCode::OK,
        Json(json!({
            "service": "ok",
            "db": db_status,
            "timestamp": Utc::now()
        })),
    )
}

#[derive(Deserialize)]
struct SignupPayload {
    email: String,
    username: String,
    password: String,
}

async fn users_signup(
    State(state): State<AppState>,
    Json(payload): Json<SignupPayload>,
) -> Response {
    let mut ctx = PageContext::default();
    let session_id = match register::signup(
        &state.platform,
        &mut ctx,
        &payload.email,
        &payload.username,
        &payload.password,
    ) {
        Ok(session_id) => session_id,
        Err(err) => return platform_error(err),
    };
    if let Err(err) = upsert_user_by_email(
        &state.db,
        &ctx.viewer.email,
        &ctx.viewer.name,
        ctx.viewer.tier.as_str(),
    )
    .await
    {
        error!(error = %err, "failed to mirror new user");
    }
    match issue_token(&ctx.viewer.email, &session_id, false) {
        Ok(token) => (
            StatusCode::CREATED,
            Json(json!({"token": token, "username": ctx.viewer.name, "tier": ctx.viewer.tier})),
        )
            .into_response(),
        Err(err) => {
            error!(error = %err, "failed to sign token");
            platform_error(PlatformError::Internal("token signing failed".into()))
        }
    }
}

#[derive(Deserialize)]
struct LoginPayload {
    email: String,
    password: String,
}

async fn users_login(State(state): State<AppState>, Json(payload): Json<LoginPayload>) -> Response {
    let mut ctx = PageContext::default();
    let session_id =
        match session::login(&state.platform, &mut ctx, &payload.email, &payload.password) {
            Ok(session_id) => session_id,
            Err(err @ PlatformError::PermissionDenied(_)) => {
                // login failures stay 401 rather than 403
                return (
                    StatusCode::UNAUTHORIZED,
                    Json(json!({"detail": err.to_string()})),
                )
                    .into_response();
            }
            Err(err) => return platform_error(err),
        };
    match issue_token(&ctx.viewer.email, &session_id, false) {
        Ok(token) => Json(json!({
            "token": token,
            "username": ctx.viewer.name,
            "tier": ctx.viewer.tier,
            "tokens": ctx.viewer.tokens,
        }))
        .into_response(),
        Err(err) => {
            error!(error = %err, "failed to sign token");
            platform_error(PlatformError::Internal("token signing failed".into()))
        }
    }
}

async fn admin_login(State(state): State<AppState>, Json(payload): Json<LoginPayload>) -> Response {
    let mut ctx = PageContext::default();
    let session_id =
        match session::admin_login(&state.platform, &mut ctx, &payload.email, &payload.password) {
            Ok(session_id) => session_id,
            Err(err @ PlatformError::PermissionDenied(_)) => {
                return (
                    StatusCode::UNAUTHORIZED,
                    Json(json!({"detail": err.to_string()})),
                )
                    .into_response();
            }
            Err(err) => return platform_error(err),
        };
    match issue_token(&ctx.viewer.email, &session_id, true) {
        Ok(token) => Json(json!({"token": token})).into_response(),
        Err(err) => {
            error!(error = %err, "failed to sign token");
            platform_error(PlatformError::Internal("token signing failed".into()))
        }
    }
}

async fn check_session(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let email = match state.platform.session_user(&id) {
        Ok(Some(email)) => email,
        Ok(None) => {
            return (
                StatusCode::UNAUTHORIZED,
                Json(json!({"detail": "session expired"})),
            )
                .into_response();
        }
        Err(err) => return platform_error(err),
    };
    let mut ctx = PageContext::default();
    match state.platform.find_user(&email) {
        Ok(Some(user)) => {
            load_user_into_context(&mut ctx, &user);
            let controller = AccountController::new(state.platform.clone());
            match controller.profile(&mut ctx) {
                Ok(()) => Json(context_value(&ctx, "profile")).into_response(),
                Err(err) => platform_error(err),
            }
        }
        Ok(None) => (
            StatusCode::UNAUTHORIZED,
            Json(json!({"detail": "account no longer exists"})),
        )
            .into_response(),
        Err(err) => platform_error(err),
    }
}

async fn users_profile(State(state): State<AppState>, claims: AuthClaims) -> Response {
    let mut ctx = match viewer_ctx(&state, Some(&claims)) {
        Ok(ctx) => ctx,
        Err(response) => return response,
    };
    let controller = AccountController::new(state.platform.clone());
    match controller.profile(&mut ctx) {
        Ok(()) => Json(context_value(&ctx, "profile")).into_response(),
        Err(err) => platform_error(err),
    }
}

#[derive(Deserialize)]
struct ProfilePayload {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
}

async fn users_profile_update(
    State(state): State<AppState>,
    claims: AuthClaims,
    Json(payload): Json<ProfilePayload>,
) -> Response {
    let mut ctx = match viewer_ctx(&state, Some(&claims)) {
        Ok(ctx) => ctx,
        Err(response) => return response,
    };
    if !payload.username.trim().is_empty() {
        ctx.post_vars.set("username", payload.username);
    }
    if !payload.password.trim().is_empty() {
        ctx.post_vars.set("password", payload.password);
    }
    let controller = AccountController::new(state.platform.clone());
    match controller.update(&mut ctx) {
        Ok(()) => Json(json!({"updated": true})).into_response(),
        Err(err) => platform_error(err),
    }
}

async fn movies_top(State(state): State<AppState>) -> Response {
    let mut ctx = PageContext::default();
    match browse::home(&state.platform, &mut ctx) {
        Ok(()) => Json(context_value(&ctx, "top_movies")).into_response(),
        Err(err) => platform_error(err),
    }
}

async fn movies_most_commented(State(state): State<AppState>) -> Response {
    let mut ctx = PageContext::default();
    match browse::home(&state.platform, &mut ctx) {
        Ok(()) => Json(context_value(&ctx, "most_commented")).into_response(),
        Err(err) => platform_error(err),
    }
}

async fn movies_streaming(State(state): State<AppState>, Path(title): Path<String>) -> Response {
    match state.platform.streaming_sources(&title.to_lowercase()) {
        Ok(sources) => Json(json!(sources)).into_response(),
        Err(err) => platform_error(err),
    }
}

async fn movie_detail(
    State(state): State<AppState>,
    Path(name): Path<String>,
    claims: Option<AuthClaims>,
) -> Response {
    let mut ctx = match viewer_ctx(&state, claims.as_ref()) {
        Ok(ctx) => ctx,
        Err(response) => return response,
    };
    match browse::movie_page(&state.platform, &mut ctx, &name) {
        Ok(()) => Json(json!({
            "movie": context_value(&ctx, "movie"),
            "reviews": context_value(&ctx, "reviews"),
            "streaming_sources": context_value(&ctx, "streaming_sources"),
        }))
        .into_response(),
        Err(err) => platform_error(err),
    }
}

#[derive(Deserialize)]
struct TitleQuery {
    q: String,
}

async fn search_title(State(state): State<AppState>, Query(query): Query<TitleQuery>) -> Response {
    let mut ctx = PageContext::default();
    ctx.request.set("q", query.q);
    match search::by_title(&state.platform, &mut ctx) {
        Ok(()) => Json(context_value(&ctx, "search_results")).into_response(),
        Err(err) => platform_error(err),
    }
}

#[derive(Deserialize)]
struct GenresQuery {
    genres: String,
}

async fn search_genres(
    State(state): State<AppState>,
    Query(query): Query<GenresQuery>,
) -> Response {
    let mut ctx = PageContext::default();
    ctx.request.set("genres", query.genres);
    match search::by_genres(&state.platform, &mut ctx) {
        Ok(()) => Json(context_value(&ctx, "search_results")).into_response(),
        Err(err) => platform_error(err),
    }
}

#[derive(Deserialize)]
struct AdvancedQueryParams {
    title: Option<String>,
    genre: Option<String>,
    year_min: Option<i64>,
    year_max: Option<i64>,
    min_rating: Option<f64>,
}

async fn search_advanced(
    State(state): State<AppState>,
    Query(query): Query<AdvancedQueryParams>,
) -> Response {
    let mut ctx = PageContext::default();
    if let Some(title) = query.title {
        ctx.request.set("title", title);
    }
    if let Some(genre) = query.genre {
        ctx.request.set("genre", genre);
    }
    if let Some(year_min) = query.year_min {
        ctx.request.set("year_min", year_min);
    }
    if let Some(year_max) = query.year_max {
        ctx.request.set("year_max", year_max);
    }
    if let Some(min_rating) = query.min_rating {
        ctx.request.set("min_rating", min_rating);
    }
    match search::advanced(&state.platform, &mut ctx) {
        Ok(()) => Json(context_value(&ctx, "search_results")).into_response(),
        Err(err) => platform_error(err),
    }
}

async fn reviews_list(
    State(state): State<AppState>,
    Path(movie): Path<String>,
    claims: Option<AuthClaims>,
) -> Response {
    let admin = claims.as_ref().map(AuthClaims::is_admin).unwrap_or(false);
    match state.platform.list_reviews(&movie) {
        Ok(reviews) => {
            let visible: Vec<_> = reviews
                .into_iter()
                .filter(|review| admin || !review.hidden)
                .collect();
            Json(json!(visible)).into_response()
        }
        Err(err) => platform_error(err),
    }
}

#[derive(Deserialize)]
struct ReviewPayload {
    rating: f64,
    #[serde(default)]
    title: String,
    body: String,
}

async fn reviews_submit(
    State(state): State<AppState>,
    Path(movie): Path<String>,
    claims: Option<AuthClaims>,
    Json(payload): Json<ReviewPayload>,
) -> Response {
    let mut ctx = match viewer_ctx(&state, claims.as_ref()) {
        Ok(ctx) => ctx,
        Err(response) => return response,
    };
    ctx.post_vars.set("rating", payload.rating);
    ctx.post_vars.set("title", payload.title);
    ctx.post_vars.set("body", payload.body);
    let controller = ReviewController::new(state.platform.clone());
    match controller.submit(&mut ctx, &movie) {
        Ok(()) => (StatusCode::CREATED, Json(json!({"posted": true}))).into_response(),
        Err(err) => platform_error(err),
    }
}

#[derive(Deserialize)]
struct VotePayload {
    author: String,
}

async fn vote_on_review(
    state: AppState,
    movie: String,
    claims: Option<AuthClaims>,
    payload: VotePayload,
    like: bool,
) -> Response {
    let mut ctx = match viewer_ctx(&state, claims.as_ref()) {
        Ok(ctx) => ctx,
        Err(response) => return response,
    };
    let controller = ReviewController::new(state.platform.clone());
    match controller.vote(&mut ctx, &movie, &payload.author, like) {
        Ok(()) => Json(context_value(&ctx, "vote_result")).into_response(),
        Err(err) => platform_error(err),
    }
}

async fn reviews_like(
    State(state): State<AppState>,
    Path(movie): Path<String>,
    claims: Option<AuthClaims>,
    Json(payload): Json<VotePayload>,
) -> Response {
    vote_on_review(state, movie, claims, payload, true).await
}

async fn reviews_dislike(
    State(state): State<AppState>,
    Path(movie): Path<String>,
    claims: Option<AuthClaims>,
    Json(payload): Json<VotePayload>,
) -> Response {
    vote_on_review(state, movie, claims, payload, false).await
}

async fn reviews_vote_status(
    State(state): State<AppState>,
    Path((movie, author)): Path<(String, String)>,
    claims: AuthClaims,
) -> Response {
    let mut ctx = match viewer_ctx(&state, Some(&claims)) {
        Ok(ctx) => ctx,
        Err(response) => return response,
    };
    let controller = ReviewController::new(state.platform.clone());
    match controller.vote_status(&mut ctx, &movie, &author) {
        Ok(()) => Json(context_value(&ctx, "viewer_vote")).into_response(),
        Err(err) => platform_error(err),
    }
}

#[derive(Deserialize)]
struct ReportPayload {
    author: String,
    #[serde(default)]
    reason: String,
}

async fn reviews_report(
    State(state): State<AppState>,
    Path(movie): Path<String>,
    claims: AuthClaims,
    Json(payload): Json<ReportPayload>,
) -> Response {
    let mut ctx = match viewer_ctx(&state, Some(&claims)) {
        Ok(ctx) => ctx,
        Err(response) => return response,
    };
    ctx.post_vars.set("reason", payload.reason);
    let controller = ReviewController::new(state.platform.clone());
    match controller.report(&mut ctx, &movie, &payload.author) {
        Ok(()) => Json(json!({"report_count": ctx.context.int("report_count")})).into_response(),
        Err(err) => platform_error(err),
    }
}

async fn store_catalog(State(state): State<AppState>, claims: Option<AuthClaims>) -> Response {
    let mut ctx = match viewer_ctx(&state, claims.as_ref()) {
        Ok(ctx) => ctx,
        Err(response) => return response,
    };
    match store::catalog(&state.platform, &mut ctx) {
        Ok(()) => Json(json!({
            "catalog": context_value(&ctx, "catalog"),
            "token_balance": context_value(&ctx, "token_balance"),
        }))
        .into_response(),
        Err(err) => platform_error(err),
    }
}

#[derive(Deserialize)]
struct PaymentPayload {
    item_id: String,
    #[serde(default)]
    card_number: String,
    #[serde(default)]
    card_expiry: String,
    #[serde(default)]
    card_cvv: String,
    #[serde(default)]
    card_zip: String,
}

async fn store_process_payment(
    State(state): State<AppState>,
    claims: AuthClaims,
    Json(payload): Json<PaymentPayload>,
) -> Response {
    let mut ctx = match viewer_ctx(&state, Some(&claims)) {
        Ok(ctx) => ctx,
        Err(response) => return response,
    };
    if let Err(err) = store::stage_purchase(&state.platform, &mut ctx, &payload.item_id) {
        return platform_error(err);
    }
    ctx.post_vars.set("card_number", payload.card_number);
    ctx.post_vars.set("card_expiry", payload.card_expiry);
    ctx.post_vars.set("card_cvv", payload.card_cvv);
    ctx.post_vars.set("card_zip", payload.card_zip);
    let controller = PaymentController::new(state.platform.clone());
    match controller.process(&mut ctx) {
        Ok(()) => Json(context_value(&ctx, "receipt")).into_response(),
        Err(err) => platform_error(err),
    }
}

async fn admin_movies_list(State(state): State<AppState>, claims: AuthClaims) -> Response {
    let mut ctx = match viewer_ctx(&state, Some(&claims)) {
        Ok(ctx) => ctx,
        Err(response) => return response,
    };
    if !ctx.viewer.is_admin {
        return platform_error(PlatformError::PermissionDenied("admin_required".into()));
    }
    match browse::all_movies(&state.platform, &mut ctx) {
        Ok(()) => Json(context_value(&ctx, "movies")).into_response(),
        Err(err) => platform_error(err),
    }
}

#[derive(Deserialize)]
struct MoviePayload {
    movie_name: Option<String>,
    title: String,
    year: i64,
    #[serde(default)]
    directors: String,
    #[serde(default)]
    genres: String,
    #[serde(default)]
    imdb_rating: Option<f64>,
    #[serde(default)]
    poster: String,
}

fn load_movie_post(ctx: &mut PageContext, payload: &MoviePayload) {
    ctx.post_vars.set("title", payload.title.clone());
    ctx.post_vars.set("year", payload.year);
    ctx.post_vars.set("directors", payload.directors.clone());
    ctx.post_vars.set("genres", payload.genres.clone());
    if let Some(imdb) = payload.imdb_rating {
        ctx.post_vars.set("imdb_rating", imdb);
    }
    ctx.post_vars.set("poster", payload.poster.clone());
}

async fn admin_movies_create(
    State(state): State<AppState>,
    claims: AuthClaims,
    Json(payload): Json<MoviePayload>,
) -> Response {
    let mut ctx = match viewer_ctx(&state, Some(&claims)) {
        Ok(ctx) => ctx,
        Err(response) => return response,
    };
    let Some(movie_name) = payload.movie_name.clone() else {
        return platform_error(PlatformError::Validation("missing_movie_name".into()));
    };
    load_movie_post(&mut ctx, &payload);
    match manage_movies::create_movie(&state.platform, &mut ctx, &movie_name) {
        Ok(()) => (StatusCode::CREATED, Json(json!({"created": movie_name}))).into_response(),
        Err(err) => platform_error(err),
    }
}

async fn admin_movies_update(
    State(state): State<AppState>,
    Path(name): Path<String>,
    claims: AuthClaims,
    Json(payload): Json<MoviePayload>,
) -> Response {
    let mut ctx = match viewer_ctx(&state, Some(&claims)) {
        Ok(ctx) => ctx,
        Err(response) => return response,
    };
    load_movie_post(&mut ctx, &payload);
    match manage_movies::update_movie(&state.platform, &mut ctx, &name) {
        Ok(()) => Json(json!({"updated": name})).into_response(),
        Err(err) => platform_error(err),
    }
}

async fn admin_movies_delete(
    State(state): State<AppState>,
    Path(name): Path<String>,
    claims: AuthClaims,
) -> Response {
    let mut ctx = match viewer_ctx(&state, Some(&claims)) {
        Ok(ctx) => ctx,
        Err(response) => return response,
    };
    match manage_movies::delete_movie(&state.platform, &mut ctx, &name) {
        Ok(()) => Json(json!({"deleted": name})).into_response(),
        Err(err) => platform_error(err),
    }
}

async fn admin_users_list(State(state): State<AppState>, claims: AuthClaims) -> Response {
    let mut ctx = match viewer_ctx(&state, Some(&claims)) {
        Ok(ctx) => ctx,
        Err(response) => return response,
    };
    match manage_users::list_users(&state.platform, &mut ctx) {
        Ok(()) => Json(context_value(&ctx, "users")).into_response(),
        Err(err) => platform_error(err),
    }
}

#[derive(Deserialize)]
struct EmailPayload {
    email: String,
    #[serde(default)]
    reason: Option<String>,
}

async fn admin_users_delete(
    State(state): State<AppState>,
    claims: AuthClaims,
    Json(payload): Json<EmailPayload>,
) -> Response {
    let mut ctx = match viewer_ctx(&state, Some(&claims)) {
        Ok(ctx) => ctx,
        Err(response) => return response,
    };
    match manage_users::delete_user(&state.platform, &mut ctx, &payload.email) {
        Ok(()) => Json(json!({"deleted": payload.email})).into_response(),
        Err(err) => platform_error(err),
    }
}

async fn admin_users_banned(State(state): State<AppState>, claims: AuthClaims) -> Response {
    let mut ctx = match viewer_ctx(&state, Some(&claims)) {
        Ok(ctx) => ctx,
        Err(response) => return response,
    };
    let controller = PenaltyController::new(state.platform.clone());
    match controller.banned_list(&mut ctx) {
        Ok(()) => Json(context_value(&ctx, "banned_emails")).into_response(),
        Err(err) => platform_error(err),
    }
}

#[derive(Deserialize)]
struct TierPayload {
    email: String,
    tier: String,
}

async fn admin_upgrade_tier(
    State(state): State<AppState>,
    claims: AuthClaims,
    Json(payload): Json<TierPayload>,
) -> Response {
    let mut ctx = match viewer_ctx(&state, Some(&claims)) {
        Ok(ctx) => ctx,
        Err(response) => return response,
    };
    match manage_users::set_user_tier(&state.platform, &mut ctx, &payload.email, &payload.tier) {
        Ok(()) => Json(json!({"email": payload.email, "tier": payload.tier})).into_response(),
        Err(err) => platform_error(err),
    }
}

#[derive(Deserialize)]
struct TokensPayload {
    email: String,
    amount: i64,
}

async fn admin_remove_tokens(
    State(state): State<AppState>,
    claims: AuthClaims,
    Json(payload): Json<TokensPayload>,
) -> Response {
    let mut ctx = match viewer_ctx(&state, Some(&claims)) {
        Ok(ctx) => ctx,
        Err(response) => return response,
    };
    let controller = PenaltyController::new(state.platform.clone());
    match controller.remove_tokens(&mut ctx, &payload.email, payload.amount) {
        Ok(balance) => Json(json!({"email": payload.email, "balance": balance})).into_response(),
        Err(err) => platform_error(err),
    }
}

async fn admin_review_ban(
    State(state): State<AppState>,
    claims: AuthClaims,
    Json(payload): Json<EmailPayload>,
) -> Response {
    let mut ctx = match viewer_ctx(&state, Some(&claims)) {
        Ok(ctx) => ctx,
        Err(response) => return response,
    };
    let controller = PenaltyController::new(state.platform.clone());
    match controller.toggle_review_ban(&mut ctx, &payload.email) {
        Ok(banned) => Json(json!({"email": payload.email, "review_banned": banned})).into_response(),
        Err(err) => platform_error(err),
    }
}

async fn admin_ban(
    State(state): State<AppState>,
    claims: AuthClaims,
    Json(payload): Json<EmailPayload>,
) -> Response {
    let mut ctx = match viewer_ctx(&state, Some(&claims)) {
        Ok(ctx) => ctx,
        Err(response) => return response,
    };
    let controller = PenaltyController::new(state.platform.clone());
    match controller.full_ban(&mut ctx, &payload.email, payload.reason.clone()) {
        Ok(()) => Json(json!({"banned": payload.email})).into_response(),
        Err(err) => platform_error(err),
    }
}

async fn admin_unban(
    State(state): State<AppState>,
    claims: AuthClaims,
    Json(payload): Json<EmailPayload>,
) -> Response {
    let mut ctx = match viewer_ctx(&state, Some(&claims)) {
        Ok(ctx) => ctx,
        Err(response) => return response,
    };
    let controller = PenaltyController::new(state.platform.clone());
    match controller.unban(&mut ctx, &payload.email) {
        Ok(()) => Json(json!({"unbanned": payload.email})).into_response(),
        Err(err) => platform_error(err),
    }
}

#[derive(Deserialize)]
struct MakeAdminPayload {
    email: String,
    password: String,
}

async fn admin_make_admin(
    State(state): State<AppState>,
    claims: AuthClaims,
    Json(payload): Json<MakeAdminPayload>,
) -> Response {
    let mut ctx = match viewer_ctx(&state, Some(&claims)) {
        Ok(ctx) => ctx,
        Err(response) => return response,
    };
    match manage_users::make_admin(&state.platform, &mut ctx, &payload.email, &payload.password) {
        Ok(()) => (StatusCode::CREATED, Json(json!({"admin": payload.email}))).into_response(),
        Err(err) => platform_error(err),
    }
}

#[derive(Deserialize)]
struct ReportedQuery {
    #[serde(default)]
    sort: Option<String>,
}

async fn admin_reported(
    State(state): State<AppState>,
    Query(query): Query<ReportedQuery>,
    claims: AuthClaims,
) -> Response {
    let mut ctx = match viewer_ctx(&state, Some(&claims)) {
        Ok(ctx) => ctx,
        Err(response) => return response,
    };
    if let Some(sort) = query.sort {
        ctx.request.set("sort", sort);
    }
    let sort = QueueSort::from_request(&ctx);
    let queue = ModerationQueue::new(state.platform.clone());
    match queue.list_reported(&mut ctx, sort) {
        Ok(entries) => Json(json!(entries)).into_response(),
        Err(err) => platform_error(err),
    }
}

#[derive(Deserialize)]
struct ResolvePayload {
    movie: String,
    author: String,
    remove: bool,
}

async fn admin_resolve(
    State(state): State<AppState>,
    claims: AuthClaims,
    Json(payload): Json<ResolvePayload>,
) -> Response {
    let mut ctx = match viewer_ctx(&state, Some(&claims)) {
        Ok(ctx) => ctx,
        Err(response) => return response,
    };
    let queue = ModerationQueue::new(state.platform.clone());
    match queue.handle_reported_review(&mut ctx, &payload.movie, &payload.author, payload.remove) {
        Ok(()) => Json(json!({"resolved": true, "removed": payload.remove})).into_response(),
        Err(err) => platform_error(err),
    }
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        let mut terminate =
            signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = terminate.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    }
}
