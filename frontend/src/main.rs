use dioxus::prelude::*;
use reqwasm::http::Request;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

fn main() {
    launch(App);
}

// ---------- Types ----------
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
struct Movie {
    movie_name: String,
    title: String,
    directors: Vec<String>,
    genres: Vec<String>,
    year: i32,
    imdb_rating: f64,
    rating: f64,
    review_count: i64,
    poster: String,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
struct Review {
    movie_name: String,
    email: String,
    username: String,
    rating: f64,
    title: String,
    body: String,
    likes: i64,
    dislikes: i64,
    reported: bool,
    report_reasons: Vec<String>,
    report_count: i64,
    penalized: bool,
    hidden: bool,
    date: String,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
struct ReportedEntry {
    movie_title: String,
    review: Review,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
struct StreamingSource {
    provider: String,
    url: String,
}

#[derive(Deserialize)]
struct MovieDetail {
    movie: Movie,
    reviews: Vec<serde_json::Value>,
    streaming_sources: Vec<StreamingSource>,
}

#[derive(Deserialize)]
struct AuthResponse {
    token: String,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    tier: Option<String>,
    #[serde(default)]
    tokens: Option<i64>,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
struct CatalogEntry {
    item: serde_json::Value,
    can_purchase: bool,
    message: Option<String>,
}

#[derive(Deserialize)]
struct CatalogResponse {
    catalog: Vec<CatalogEntry>,
    token_balance: serde_json::Value,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
struct UserRow {
    email: String,
    username: String,
    tier: String,
    tokens: i64,
    review_banned: bool,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
struct BannedRow {
    email: String,
    banned_date: String,
    banned_by: String,
    reason: Option<String>,
}

#[derive(Serialize)]
struct LoginPayload {
    email: String,
    password: String,
}

#[derive(Serialize)]
struct SignupPayload {
    email: String,
    username: String,
    password: String,
}

#[derive(Serialize)]
struct ReviewPayload {
    rating: f64,
    title: String,
    body: String,
}

#[derive(Serialize)]
struct VotePayload {
    author: String,
}

#[derive(Serialize)]
struct ReportPayload {
    author: String,
    reason: String,
}

#[derive(Serialize)]
struct PaymentPayload {
    item_id: String,
    card_number: String,
    card_expiry: String,
    card_cvv: String,
    card_zip: String,
}

// ---------- Utilities ----------
fn window() -> Option<web_sys::Window> {
    web_sys::window()
}

fn save_token(key: &str, token: &str) {
    if let Some(win) = window() {
        if let Ok(Some(storage)) = win.local_storage() {
            let _ = storage.set_item(key, token);
        }
    }
}

fn load_token(key: &str) -> Option<String> {
    window()
        .and_then(|win| win.local_storage().ok().flatten())
        .and_then(|storage| storage.get_item(key).ok().flatten())
}

fn clear_token(key: &str) {
    if let Some(win) = window() {
        if let Ok(Some(storage)) = win.local_storage() {
            let _ = storage.remove_item(key);
        }
    }
}

fn save_pending_purchase(item_id: &str) {
    save_token("pending_purchase", item_id);
}

fn load_pending_purchase() -> Option<String> {
    load_token("pending_purchase")
}

async fn get_json<T: DeserializeOwned>(base: &str, path: &str, token: &str) -> Result<T, String> {
    let url = format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    let mut req = Request::get(&url);
    if !token.trim().is_empty() {
        req = req.header("Authorization", &format!("Bearer {}", token));
    }
    let resp = req.send().await.map_err(|e| format!("network error: {e}"))?;
    let status = resp.status();
    let text = resp
        .text()
        .await
        .map_err(|e| format!("failed to read response: {e}"))?;
    if !resp.ok() {
        return Err(format!("HTTP {status}: {text}"));
    }
    serde_json::from_str(&text).map_err(|e| format!("parse failed: {e}, raw: {text}"))
}

async fn send_json<T: DeserializeOwned, B: Serialize>(
    method: &str,
    base: &str,
    path: &str,
    token: &str,
    body: &B,
) -> Result<T, String> {
    let url = format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    let mut req = match method {
        "PUT" => Request::put(&url),
        "DELETE" => Request::delete(&url),
        _ => Request::post(&url),
    };
    if !token.trim().is_empty() {
        req = req.header("Authorization", &format!("Bearer {}", token));
    }
    let resp = req
        .header("Content-Type", "application/json")
        .body(serde_json::to_string(body).unwrap())
        .send()
        .await
        .map_err(|e| format!("network error: {e}"))?;
    let status = resp.status();
    let text = resp
        .text()
        .await
        .map_err(|e| format!("failed to read response: {e}"))?;
    if status == 401 {
        // stale session: drop the stored tokens and fall back to guest
        clear_token("session_token");
        clear_token("admin_token");
        return Err("Please sign in first".into());
    }
    if !resp.ok() {
        return Err(format!("HTTP {status}: {text}"));
    }
    serde_json::from_str(&text).map_err(|e| format!("parse failed: {e}, raw: {text}"))
}

async fn post_json<T: DeserializeOwned, B: Serialize>(
    base: &str,
    path: &str,
    token: &str,
    body: &B,
) -> Result<T, String> {
    send_json("POST", base, path, token, body).await
}

// ---------- App ----------
fn App() -> Element {
    let api_base = use_signal(|| "http://127.0.0.1:3000".to_string());
    let mut token = use_signal(|| load_token("session_token").unwrap_or_default());
    let mut admin_token = use_signal(|| load_token("admin_token").unwrap_or_default());
    let mut status = use_signal(|| "Ready.".to_string());
    let start_path = window()
        .and_then(|win| win.location().pathname().ok())
        .unwrap_or_else(|| "/".to_string());
    let is_admin_page = use_signal(move || start_path.starts_with("/admin"));

    let mut login_email = use_signal(String::new);
    let mut login_password = use_signal(String::new);
    let mut signup_email = use_signal(String::new);
    let mut signup_username = use_signal(String::new);
    let mut signup_password = use_signal(String::new);

    let mut top_movies = use_signal(Vec::<Movie>::new);
    let mut most_commented = use_signal(Vec::<Movie>::new);
    let mut selected_movie = use_signal(String::new);
    let mut movie_detail = use_signal(|| Option::<Movie>::None);
    let mut reviews = use_signal(Vec::<serde_json::Value>::new);
    let mut streaming = use_signal(Vec::<StreamingSource>::new);
    let mut search_query = use_signal(String::new);
    let mut search_results = use_signal(Vec::<Movie>::new);

    let mut new_rating = use_signal(|| "7.5".to_string());
    let mut new_title = use_signal(String::new);
    let mut new_body = use_signal(String::new);
    let mut report_reason = use_signal(String::new);

    let mut catalog = use_signal(Vec::<CatalogEntry>::new);
    let mut token_balance = use_signal(|| "0".to_string());
    let mut card_number = use_signal(String::new);
    let mut card_expiry = use_signal(String::new);
    let mut card_cvv = use_signal(String::new);
    let mut card_zip = use_signal(String::new);

    let mut users = use_signal(Vec::<UserRow>::new);
    let mut banned = use_signal(Vec::<BannedRow>::new);
    let mut reported = use_signal(Vec::<ReportedEntry>::new);
    let mut reported_sort = use_signal(|| "count".to_string());
    let mut penalty_email = use_signal(String::new);
    let mut penalty_amount = use_signal(|| "100".to_string());
    let mut tier_target = use_signal(|| "slug".to_string());

    // ---------- member actions ----------
    let login = move || {
        let base = api_base.read().clone();
        let email = login_email.read().clone();
        let pass = login_password.read().clone();
        let mut status = status.clone();
        let mut token_sig = token.clone();
        if email.is_empty() || pass.is_empty() {
            status.set("Enter an email and password".into());
            return;
        }
        spawn(async move {
            status.set("Signing in...".into());
            let payload = LoginPayload {
                email,
                password: pass,
            };
            match post_json::<AuthResponse, _>(&base, "/api/users/login", "", &payload).await {
                Ok(resp) => {
                    save_token("session_token", &resp.token);
                    token_sig.set(resp.token);
                    status.set(format!(
                        "Signed in as {} ({} tokens)",
                        resp.username.unwrap_or_default(),
                        resp.tokens.unwrap_or(0)
                    ));
                }
                Err(err) => status.set(format!("Sign-in failed: {err}")),
            }
        });
    };

    let signup = move || {
        let base = api_base.read().clone();
        let email = signup_email.read().clone();
        let username = signup_username.read().clone();
        let pass = signup_password.read().clone();
        let mut status = status.clone();
        let mut token_sig = token.clone();
        if email.is_empty() || username.is_empty() || pass.is_empty() {
            status.set("Fill in every signup field".into());
            return;
        }
        spawn(async move {
            status.set("Creating account...".into());
            let payload = SignupPayload {
                email,
                username,
                password: pass,
            };
            match post_json::<AuthResponse, _>(&base, "/api/users/signup", "", &payload).await {
                Ok(resp) => {
                    save_token("session_token", &resp.token);
                    token_sig.set(resp.token);
                    status.set(format!(
                        "Welcome, {}! You start as a {}.",
                        resp.username.unwrap_or_default(),
                        resp.tier.unwrap_or_default()
                    ));
                }
                Err(err) => status.set(format!("Signup failed: {err}")),
            }
        });
    };

    let admin_login = move || {
        let base = api_base.read().clone();
        let email = login_email.read().clone();
        let pass = login_password.read().clone();
        let mut status = status.clone();
        let mut admin_sig = admin_token.clone();
        spawn(async move {
            status.set("Signing in to the back office...".into());
            let payload = LoginPayload {
                email,
                password: pass,
            };
            match post_json::<AuthResponse, _>(&base, "/api/admin/login", "", &payload).await {
                Ok(resp) => {
                    save_token("admin_token", &resp.token);
                    admin_sig.set(resp.token);
                    status.set("Admin session started".into());
                }
                Err(err) => status.set(format!("Admin sign-in failed: {err}")),
            }
        });
    };

    let logout = move || {
        clear_token("session_token");
        clear_token("admin_token");
        clear_token("pending_purchase");
        token.set(String::new());
        admin_token.set(String::new());
        status.set("Signed out".into());
    };

    let load_home = move || {
        let base = api_base.read().clone();
        let mut status = status.clone();
        let mut top = top_movies.clone();
        let mut busiest = most_commented.clone();
        spawn(async move {
            status.set("Loading shelves...".into());
            match get_json::<Vec<Movie>>(&base, "/api/movies/top", "").await {
                Ok(list) => top.set(list),
                Err(err) => {
                    status.set(format!("Failed to load top movies: {err}"));
                    return;
                }
            }
            match get_json::<Vec<Movie>>(&base, "/api/movies/most_commented", "").await {
                Ok(list) => {
                    busiest.set(list);
                    status.set("Shelves loaded".into());
                }
                Err(err) => status.set(format!("Failed to load most commented: {err}")),
            }
        });
    };

    let load_movie = move |name: String| {
        let base = api_base.read().clone();
        let jwt = token.read().clone();
        let mut status = status.clone();
        let mut detail = movie_detail.clone();
        let mut reviews_sig = reviews.clone();
        let mut streaming_sig = streaming.clone();
        let mut selected = selected_movie.clone();
        spawn(async move {
            status.set(format!("Loading {name}..."));
            let path = format!("/api/movies/{name}");
            match get_json::<MovieDetail>(&base, &path, &jwt).await {
                Ok(resp) => {
                    selected.set(name);
                    detail.set(Some(resp.movie));
                    reviews_sig.set(resp.reviews);
                    streaming_sig.set(resp.streaming_sources);
                    status.set("Movie loaded".into());
                }
                Err(err) => status.set(format!("Failed to load movie: {err}")),
            }
        });
    };

    let run_search = move || {
        let base = api_base.read().clone();
        let query = search_query.read().clone();
        let mut status = status.clone();
        let mut results = search_results.clone();
        if query.trim().is_empty() {
            status.set("Type something to search for".into());
            return;
        }
        spawn(async move {
            status.set("Searching...".into());
            let path = format!("/api/search/title?q={query}");
            match get_json::<Vec<Movie>>(&base, &path, "").await {
                Ok(list) => {
                    status.set(format!("{} result(s)", list.len()));
                    results.set(list);
                }
                Err(err) => status.set(format!("Search failed: {err}")),
            }
        });
    };

    let submit_review = move || {
        let base = api_base.read().clone();
        let jwt = token.read().clone();
        let movie = selected_movie.read().clone();
        let rating: f64 = new_rating.read().parse().unwrap_or(-1.0);
        let title = new_title.read().clone();
        let body = new_body.read().clone();
        let mut status = status.clone();
        if movie.is_empty() {
            status.set("Open a movie first".into());
            return;
        }
        if body.trim().is_empty() {
            status.set("Write something before posting".into());
            return;
        }
        spawn(async move {
            status.set("Posting review...".into());
            let payload = ReviewPayload {
                rating,
                title,
                body,
            };
            let path = format!("/api/reviews/{movie}");
            match post_json::<serde_json::Value, _>(&base, &path, &jwt, &payload).await {
                Ok(_) => status.set("Review posted".into()),
                Err(err) => status.set(format!("Posting failed: {err}")),
            }
        });
    };

    let vote = move |author: String, like: bool| {
        let base = api_base.read().clone();
        let jwt = token.read().clone();
        let movie = selected_movie.read().clone();
        let mut status = status.clone();
        spawn(async move {
            let verb = if like { "like" } else { "dislike" };
            let path = format!("/api/reviews/{movie}/{verb}");
            let payload = VotePayload { author };
            match post_json::<serde_json::Value, _>(&base, &path, &jwt, &payload).await {
                Ok(resp) => status.set(format!(
                    "Now {} like(s), {} dislike(s)",
                    resp["likes"], resp["dislikes"]
                )),
                Err(err) => status.set(format!("Vote failed: {err}")),
            }
        });
    };

    let report = move |author: String| {
        let base = api_base.read().clone();
        let jwt = token.read().clone();
        let movie = selected_movie.read().clone();
        let reason = report_reason.read().clone();
        let mut status = status.clone();
        spawn(async move {
            let path = format!("/api/reviews/{movie}/reported");
            let payload = ReportPayload { author, reason };
            match send_json::<serde_json::Value, _>("PUT", &base, &path, &jwt, &payload).await {
                Ok(resp) => status.set(format!("Reported ({} so far)", resp["report_count"])),
                Err(err) => status.set(format!("Report failed: {err}")),
            }
        });
    };

    let load_store = move || {
        let base = api_base.read().clone();
        let jwt = token.read().clone();
        let mut status = status.clone();
        let mut catalog_sig = catalog.clone();
        let mut balance = token_balance.clone();
        spawn(async move {
            status.set("Loading store...".into());
            match get_json::<CatalogResponse>(&base, "/api/store/catalog", &jwt).await {
                Ok(resp) => {
                    balance.set(resp.token_balance.to_string());
                    catalog_sig.set(resp.catalog);
                    status.set("Store loaded".into());
                }
                Err(err) => status.set(format!("Failed to load store: {err}")),
            }
        });
    };

    let checkout = move || {
        let base = api_base.read().clone();
        let jwt = token.read().clone();
        let mut status = status.clone();
        let Some(item_id) = load_pending_purchase() else {
            status.set("Pick an item first".into());
            return;
        };
        let payload = PaymentPayload {
            item_id,
            card_number: card_number.read().clone(),
            card_expiry: card_expiry.read().clone(),
            card_cvv: card_cvv.read().clone(),
            card_zip: card_zip.read().clone(),
        };
        spawn(async move {
            status.set("Processing payment...".into());
            match post_json::<serde_json::Value, _>(&base, "/api/store/process-payment", &jwt, &payload)
                .await
            {
                Ok(receipt) => {
                    clear_token("pending_purchase");
                    status.set(format!(
                        "Purchased {} — balance {}",
                        receipt["label"], receipt["token_balance"]
                    ));
                }
                Err(err) => status.set(format!("Payment failed: {err}")),
            }
        });
    };

    // ---------- admin actions ----------
    let load_users = move || {
        let base = api_base.read().clone();
        let jwt = admin_token.read().clone();
        let mut status = status.clone();
        let mut users_sig = users.clone();
        spawn(async move {
            match get_json::<Vec<UserRow>>(&base, "/api/admin/users", &jwt).await {
                Ok(list) => {
                    status.set(format!("{} member(s)", list.len()));
                    users_sig.set(list);
                }
                Err(err) => status.set(format!("Failed to load members: {err}")),
            }
        });
    };

    let load_banned = move || {
        let base = api_base.read().clone();
        let jwt = admin_token.read().clone();
        let mut status = status.clone();
        let mut banned_sig = banned.clone();
        spawn(async move {
            match get_json::<Vec<BannedRow>>(&base, "/api/admin/users/banned", &jwt).await {
                Ok(list) => banned_sig.set(list),
                Err(err) => status.set(format!("Failed to load blacklist: {err}")),
            }
        });
    };

    let load_reported = move || {
        let base = api_base.read().clone();
        let jwt = admin_token.read().clone();
        let sort = reported_sort.read().clone();
        let mut status = status.clone();
        let mut reported_sig = reported.clone();
        spawn(async move {
            let path = if sort == "newest" {
                "/api/admin/reviews/reported?sort=newest".to_string()
            } else {
                "/api/admin/reviews/reported".to_string()
            };
            match get_json::<Vec<ReportedEntry>>(&base, &path, &jwt).await {
                Ok(list) => {
                    status.set(format!("{} reported review(s)", list.len()));
                    reported_sig.set(list);
                }
                Err(err) => status.set(format!("Failed to load queue: {err}")),
            }
        });
    };

    let resolve = move |movie: String, author: String, remove: bool| {
        let base = api_base.read().clone();
        let jwt = admin_token.read().clone();
        let mut status = status.clone();
        spawn(async move {
            let payload = serde_json::json!({"movie": movie, "author": author, "remove": remove});
            match post_json::<serde_json::Value, _>(&base, "/api/admin/reviews/resolve", &jwt, &payload)
                .await
            {
                Ok(_) => status.set(if remove {
                    "Review removed".into()
                } else {
                    "Review kept".into()
                }),
                Err(err) => status.set(format!("Resolution failed: {err}")),
            }
        });
    };

    let penalty = move |kind: &'static str| {
        let base = api_base.read().clone();
        let jwt = admin_token.read().clone();
        let email = penalty_email.read().clone();
        let amount: i64 = penalty_amount.read().parse().unwrap_or(0);
        let tier = tier_target.read().clone();
        let mut status = status.clone();
        if email.is_empty() {
            status.set("Enter a member email".into());
            return;
        }
        let target = email.clone();
        spawn(async move {
            let (path, payload) = match kind {
                "tokens" => (
                    "/api/admin/users/remove-tokens",
                    serde_json::json!({"email": email, "amount": amount}),
                ),
                "review-ban" => (
                    "/api/admin/users/review-ban",
                    serde_json::json!({"email": email}),
                ),
                "ban" => (
                    "/api/admin/users/ban",
                    serde_json::json!({"email": email, "reason": "Banned from the back office"}),
                ),
                "unban" => (
                    "/api/admin/users/unban",
                    serde_json::json!({"email": email}),
                ),
                _ => (
                    "/api/admin/users/upgrade-tier",
                    serde_json::json!({"email": email, "tier": tier}),
                ),
            };
            match post_json::<serde_json::Value, _>(&base, path, &jwt, &payload).await {
                Ok(_) => status.set(format!("{kind} applied to {target}")),
                Err(err) => status.set(format!("{kind} failed: {err}")),
            }
        });
    };

    // ---------- view ----------
    rsx! {
        main { class: "app",
            header { class: "topbar",
                h1 { "CineSlug" }
                span { class: "muted", "{status.read()}" }
                button { onclick: move |_| logout(), "Sign out" }
            }

            if !*is_admin_page.read() { {rsx! {
                section { class: "panel",
                    h3 { "Account" }
                    div { class: "stack",
                        input {
                            value: "{login_email.read()}",
                            oninput: move |evt| login_email.set(evt.value()),
                            placeholder: "email",
                        }
                        input {
                            r#type: "password",
                            value: "{login_password.read()}",
                            oninput: move |evt| login_password.set(evt.value()),
                            placeholder: "password",
                        }
                        div { class: "actions",
                            button { onclick: move |_| login(), "Sign in" }
                            button { onclick: move |_| admin_login(), "Admin sign in" }
                        }
                    }
                    h4 { "New here?" }
                    div { class: "stack",
                        input {
                            value: "{signup_email.read()}",
                            oninput: move |evt| signup_email.set(evt.value()),
                            placeholder: "email",
                        }
                        input {
                            value: "{signup_username.read()}",
                            oninput: move |evt| signup_username.set(evt.value()),
                            placeholder: "username",
                        }
                        input {
                            r#type: "password",
                            value: "{signup_password.read()}",
                            oninput: move |evt| signup_password.set(evt.value()),
                            placeholder: "password (6+ characters)",
                        }
                        button { onclick: move |_| signup(), "Create account" }
                    }
                }

                section { class: "panel",
                    div { class: "panel__header",
                        h3 { "Browse" }
                        div { class: "actions",
                            button { onclick: move |_| load_home(), "Refresh shelves" }
                        }
                    }
                    div { class: "search",
                        input {
                            value: "{search_query.read()}",
                            oninput: move |evt| search_query.set(evt.value()),
                            placeholder: "Search titles",
                        }
                        button { onclick: move |_| run_search(), "Search" }
                    }
                    h4 { "Top rated" }
                    ul { class: "list",
                        { top_movies.read().iter().cloned().map(|movie| {
                            let name = movie.movie_name.clone();
                            rsx! {
                                li { class: "item",
                                    onclick: move |_| load_movie(name.clone()),
                                    strong { "{movie.title} ({movie.year})" }
                                    div { class: "meta", "rating {movie.rating:.1} | {movie.review_count} review(s)" }
                                }
                            }
                        })}
                    }
                    h4 { "Most reviewed" }
                    ul { class: "list",
                        { most_commented.read().iter().cloned().map(|movie| {
                            let name = movie.movie_name.clone();
                            rsx! {
                                li { class: "item",
                                    onclick: move |_| load_movie(name.clone()),
                                    strong { "{movie.title}" }
                                    div { class: "meta", "{movie.review_count} review(s)" }
                                }
                            }
                        })}
                    }
                    h4 { "Search results" }
                    ul { class: "list",
                        { search_results.read().iter().cloned().map(|movie| {
                            let name = movie.movie_name.clone();
                            let genres = movie.genres.join(", ");
                            rsx! {
                                li { class: "item",
                                    onclick: move |_| load_movie(name.clone()),
                                    strong { "{movie.title} ({movie.year})" }
                                    div { class: "meta", "{genres}" }
                                }
                            }
                        })}
                    }
                }

                section { class: "panel",
                    h3 { "Movie" }
                    { movie_detail.read().clone().map(|movie| {
                        let directors = movie.directors.join(", ");
                        let genres = movie.genres.join(", ");
                        rsx! {
                        div { class: "movie",
                            h4 { "{movie.title} ({movie.year})" }
                            div { class: "meta",
                                "Directed by {directors} | {genres} | IMDb {movie.imdb_rating:.1} | here {movie.rating:.1}"
                            }
                            h5 { "Where to watch" }
                            ul { class: "list",
                                { streaming.read().iter().cloned().map(|source| rsx! {
                                    li { class: "item",
                                        a { href: "{source.url}", target: "_blank", rel: "noopener", "{source.provider}" }
                                    }
                                })}
                            }
                        }
                    }})}
                    h4 { "Reviews" }
                    ul { class: "list",
                        { reviews.read().iter().cloned().map(|entry| {
                            let review = entry["review"].clone();
                            let author = review["email"].as_str().unwrap_or_default().to_string();
                            let author_like = author.clone();
                            let author_dislike = author.clone();
                            let author_report = author;
                            let title = review["title"].as_str().unwrap_or_default().to_string();
                            let username = review["username"].as_str().unwrap_or_default().to_string();
                            let rating = review["rating"].as_f64().unwrap_or(0.0);
                            let body = review["body"].as_str().unwrap_or_default().to_string();
                            let likes = review["likes"].as_i64().unwrap_or(0);
                            let dislikes = review["dislikes"].as_i64().unwrap_or(0);
                            rsx! {
                                li { class: "item",
                                    strong { "{title}" }
                                    div { class: "meta", "{username} rated {rating}" }
                                    p { "{body}" }
                                    div { class: "actions",
                                        button { onclick: move |_| vote(author_like.clone(), true), "Like ({likes})" }
                                        button { onclick: move |_| vote(author_dislike.clone(), false), "Dislike ({dislikes})" }
                                        button { class: "link danger", onclick: move |_| report(author_report.clone()), "Report" }
                                    }
                                }
                            }
                        })}
                    }
                    h4 { "Write a review" }
                    div { class: "stack",
                        input {
                            value: "{new_rating.read()}",
                            oninput: move |evt| new_rating.set(evt.value()),
                            placeholder: "rating (0-10, halves allowed)",
                        }
                        input {
                            value: "{new_title.read()}",
                            oninput: move |evt| new_title.set(evt.value()),
                            placeholder: "title",
                        }
                        textarea {
                            value: "{new_body.read()}",
                            oninput: move |evt| new_body.set(evt.value()),
                            rows: "3",
                            placeholder: "what did you think?",
                        }
                        input {
                            value: "{report_reason.read()}",
                            oninput: move |evt| report_reason.set(evt.value()),
                            placeholder: "report reason (used by the Report buttons)",
                        }
                        button { onclick: move |_| submit_review(), "Post review" }
                    }
                }

                section { class: "panel",
                    div { class: "panel__header",
                        h3 { "Store" }
                        span { class: "muted", "Balance: {token_balance.read()} tokens" }
                        button { onclick: move |_| load_store(), "Refresh" }
                    }
                    ul { class: "list",
                        { catalog.read().iter().cloned().map(|entry| {
                            let item_id = entry.item["id"].as_str().unwrap_or_default().to_string();
                            let label = entry.item["label"].as_str().unwrap_or_default().to_string();
                            let blocked = !entry.can_purchase;
                            let message = entry.message.clone().unwrap_or_default();
                            let mut status = status.clone();
                            let staged_label = label.clone();
                            let price = match (entry.item["price_cad"].as_f64(), entry.item["price_tokens"].as_i64()) {
                                (Some(cad), _) => format!("${cad:.2} CAD"),
                                (None, Some(tokens)) => format!("{tokens} tokens"),
                                (None, None) => "unpriced".to_string(),
                            };
                            rsx! {
                                li { class: "item",
                                    strong { "{label}" }
                                    div { class: "meta", "{price}" }
                                    if blocked {
                                        span { class: "muted", "{message}" }
                                    } else {
                                        button { onclick: move |_| {
                                            save_pending_purchase(&item_id);
                                            status.set(format!("Staged {staged_label} for checkout"));
                                        }, "Buy" }
                                    }
                                }
                            }
                        })}
                    }
                    h4 { "Checkout" }
                    div { class: "stack",
                        input {
                            value: "{card_number.read()}",
                            oninput: move |evt| card_number.set(evt.value()),
                            placeholder: "card number (16 digits)",
                        }
                        input {
                            value: "{card_expiry.read()}",
                            oninput: move |evt| card_expiry.set(evt.value()),
                            placeholder: "MM/YY",
                        }
                        input {
                            value: "{card_cvv.read()}",
                            oninput: move |evt| card_cvv.set(evt.value()),
                            placeholder: "CVV",
                        }
                        input {
                            value: "{card_zip.read()}",
                            oninput: move |evt| card_zip.set(evt.value()),
                            placeholder: "postal code",
                        }
                        button { onclick: move |_| checkout(), "Pay" }
                    }
                }
            }}} else { {rsx! {
                section { class: "hero hero--admin",
                    span { class: "pill", "Admin" }
                    h2 { "Back office" }
                    div { class: "actions",
                        button { onclick: move |_| load_users(), "Members" }
                        button { onclick: move |_| load_banned(), "Blacklist" }
                        button { onclick: move |_| load_reported(), "Reported reviews" }
                        select {
                            value: "{reported_sort.read()}",
                            onchange: move |evt| reported_sort.set(evt.value()),
                            option { value: "count", "Most reported" }
                            option { value: "newest", "Newest" }
                        }
                    }
                }

                section { class: "panel",
                    h3 { "Reported reviews" }
                    ul { class: "list",
                        { reported.read().iter().cloned().map(|entry| {
                            let movie_keep = entry.review.movie_name.clone();
                            let author_keep = entry.review.email.clone();
                            let movie_remove = entry.review.movie_name.clone();
                            let author_remove = entry.review.email.clone();
                            let keep_blocked = entry.review.penalized;
                            rsx! {
                                li { class: "item",
                                    strong { "{entry.movie_title}: {entry.review.title}" }
                                    div { class: "meta",
                                        "by {entry.review.username} | {entry.review.report_count} report(s)"
                                    }
                                    ul {
                                        { entry.review.report_reasons.iter().enumerate().map(|(index, reason)| {
                                            let numbered = format!("{}. {reason}", index + 1);
                                            rsx! { li { "{numbered}" } }
                                        })}
                                    }
                                    div { class: "actions",
                                        if keep_blocked {
                                            span { class: "muted", "Keep unavailable (author penalized)" }
                                        } else {
                                            button { onclick: move |_| resolve(movie_keep.clone(), author_keep.clone(), false), "Keep" }
                                        }
                                        button { class: "link danger",
                                            onclick: move |_| resolve(movie_remove.clone(), author_remove.clone(), true),
                                            "Remove"
                                        }
                                    }
                                }
                            }
                        })}
                    }
                }

                section { class: "panel",
                    h3 { "Members" }
                    ul { class: "list",
                        { users.read().iter().cloned().map(|user| rsx! {
                            li { class: "item",
                                strong { "{user.username} <{user.email}>" }
                                div { class: "meta",
                                    "{user.tier} | {user.tokens} tokens | review ban: {user.review_banned}"
                                }
                            }
                        })}
                    }
                    h4 { "Penalties" }
                    div { class: "stack",
                        input {
                            value: "{penalty_email.read()}",
                            oninput: move |evt| penalty_email.set(evt.value()),
                            placeholder: "member email",
                        }
                        input {
                            value: "{penalty_amount.read()}",
                            oninput: move |evt| penalty_amount.set(evt.value()),
                            placeholder: "token amount",
                        }
                        select {
                            value: "{tier_target.read()}",
                            onchange: move |evt| tier_target.set(evt.value()),
                            option { value: "snail", "snail" }
                            option { value: "slug", "slug" }
                            option { value: "banana_slug", "banana slug" }
                        }
                        div { class: "actions",
                            button { onclick: move |_| penalty("tokens"), "Remove tokens" }
                            button { onclick: move |_| penalty("review-ban"), "Toggle review ban" }
                            button { onclick: move |_| penalty("tier"), "Set tier" }
                            button { class: "link danger", onclick: move |_| penalty("ban"), "Full ban" }
                            button { onclick: move |_| penalty("unban"), "Unban" }
                        }
                    }
                }

                section { class: "panel",
                    h3 { "Blacklist" }
                    ul { class: "list",
                        { banned.read().iter().cloned().map(|row| rsx! {
                            li { class: "item",
                                strong { "{row.email}" }
                                div { class: "meta",
                                    "banned {row.banned_date} by {row.banned_by} | {row.reason.clone().unwrap_or_default()}"
                                }
                            }
                        })}
                    }
                }
            }}}
        }
    }
}
