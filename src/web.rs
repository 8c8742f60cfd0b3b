use std::collections::HashMap;
use std::future::{ready, Ready};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use actix_files::Files;
use actix_session::storage::CookieSessionStore;
use actix_session::{Session as CookieSession, SessionExt, SessionMiddleware};
use actix_web::cookie::Key;
use actix_web::dev::Payload;
use actix_web::{middleware, web, App, FromRequest, HttpRequest, HttpResponse, HttpServer, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::api::{HttpApi, KolekApi};
use crate::assignments::{send_response, AssignmentBoard, Outcome, RemovalPolicy, ResponseStatus};
use crate::collector::{self, CollectorProfile, PasswordChange};
use crate::config::Config;
use crate::directory::{load_barangays, BarangayRecord, DirectorySelection, DisplayState};
use crate::error::Error;
use crate::id::Id;
use crate::session::Session;

const USER_KEY: &str = "user";
const SELECTION_KEY: &str = "selection";

const MAX_BOARDS: usize = 1024;
const BOARD_IDLE_TTL: Duration = Duration::from_secs(30 * 60);

struct BoardEntry {
    board: AssignmentBoard,
    last_used: Instant,
    // orders entries for eviction; Instants can tie
    use_count: u64,
}

pub struct AppState {
    directory: Arc<[BarangayRecord]>,
    directory_error: Option<String>,
    api: Arc<dyn KolekApi>,
    // one working list per signed-in user, bounded by count and idle time
    boards: Mutex<HashMap<Id, BoardEntry>>,
    max_boards: usize,
    board_ttl: Duration,
    board_uses: AtomicU64,
    removal_policy: RemovalPolicy,
}

impl AppState {
    pub fn new(
        directory: Vec<BarangayRecord>,
        api: Arc<dyn KolekApi>,
        removal_policy: RemovalPolicy,
    ) -> Self {
        Self {
            directory: directory.into(),
            directory_error: None,
            api,
            boards: Mutex::new(HashMap::new()),
            max_boards: MAX_BOARDS,
            board_ttl: BOARD_IDLE_TTL,
            board_uses: AtomicU64::new(0),
            removal_policy,
        }
    }

    /// Caps the number of live assignment boards and how long an unused one
    /// is kept.
    pub fn with_board_limits(mut self, max_boards: usize, idle_ttl: Duration) -> Self {
        self.max_boards = max_boards.max(1);
        self.board_ttl = idle_ttl;
        self
    }

    /// Number of users that currently have an assignment board.
    pub fn active_boards(&self) -> usize {
        self.boards.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Drops the user's board, e.g. on sign-out.
    pub fn evict_board(&self, user_id: &Id) -> bool {
        let mut boards = self.boards.lock().unwrap_or_else(PoisonError::into_inner);
        boards.remove(user_id).is_some()
    }

    /// Marks the directory as failed to load; the list reports the message.
    pub fn with_directory_error(mut self, message: impl Into<String>) -> Self {
        self.directory_error = Some(message.into());
        self
    }

    fn selection(&self, cookie: &CookieSession) -> Result<DirectorySelection> {
        let mut selection = DirectorySelection::new(Arc::clone(&self.directory));
        let ids: Vec<Id> = cookie.get(SELECTION_KEY)?.unwrap_or_default();
        selection.restore_selection(&ids);
        Ok(selection)
    }

    /// Runs `f` on the user's board. The lock is never held across an await.
    fn with_board<R>(&self, user_id: &Id, f: impl FnOnce(&mut AssignmentBoard) -> R) -> R {
        let mut boards = self.boards.lock().unwrap_or_else(PoisonError::into_inner);
        if !boards.contains_key(user_id) {
            self.make_room(&mut boards);
        }
        let entry = boards.entry(user_id.clone()).or_insert_with(|| BoardEntry {
            board: AssignmentBoard::new(self.removal_policy),
            last_used: Instant::now(),
            use_count: 0,
        });
        entry.last_used = Instant::now();
        entry.use_count = self.board_uses.fetch_add(1, Ordering::Relaxed);
        f(&mut entry.board)
    }

    /// Drops idle boards, then the least recently used one while at capacity.
    fn make_room(&self, boards: &mut HashMap<Id, BoardEntry>) {
        let before = boards.len();
        boards.retain(|_, entry| entry.last_used.elapsed() < self.board_ttl);

        while boards.len() >= self.max_boards {
            let oldest = boards
                .iter()
                .min_by_key(|(_, entry)| entry.use_count)
                .map(|(id, _)| id.clone());
            match oldest {
                Some(id) => boards.remove(&id),
                None => break,
            };
        }

        if boards.len() < before {
            debug!(evicted = before - boards.len(), remaining = boards.len(), "assignment boards evicted");
        }
    }
}

/// The signed-in user, read from the cookie session.
pub struct CurrentSession(pub Session);

impl FromRequest for CurrentSession {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let user = req
            .get_session()
            .get::<Session>(USER_KEY)
            .map_err(actix_web::Error::from)
            .and_then(|user| user.ok_or_else(|| Error::NoSession.into()));
        ready(user.map(CurrentSession))
    }
}

#[derive(Deserialize)]
pub struct DirectoryQuery {
    #[serde(default)]
    cluster_id: Option<String>,
    #[serde(default)]
    q: Option<String>,
}

#[derive(Serialize)]
struct DirectoryView<'a> {
    state: &'static str,
    items: Vec<&'a BarangayRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    selected: Vec<Id>,
}

#[derive(Deserialize)]
pub struct RespondRequest {
    response_status: ResponseStatus,
}

// Session endpoints
async fn sign_in(user: web::Json<Session>, cookie: CookieSession) -> Result<HttpResponse> {
    let user = user.into_inner();
    if user.user_id.is_empty() {
        return Err(Error::Invalid("user_id is required".to_string()).into());
    }

    cookie.renew();
    cookie.remove(SELECTION_KEY);
    cookie.insert(USER_KEY, &user)?;
    info!(user_id = %user.user_id, role = %user.role, "session started");

    Ok(HttpResponse::Ok().json(serde_json::json!({"success": true, "user": user})))
}

async fn current_user(CurrentSession(user): CurrentSession) -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({"success": true, "user": user}))
}

async fn sign_out(cookie: CookieSession, state: web::Data<AppState>) -> HttpResponse {
    if let Ok(Some(user)) = cookie.get::<Session>(USER_KEY) {
        state.evict_board(&user.user_id);
        info!(user_id = %user.user_id, "session ended");
    }
    cookie.purge();
    HttpResponse::Ok().json(serde_json::json!({"success": true}))
}

// Directory endpoints
async fn list_barangays(
    query: web::Query<DirectoryQuery>,
    cookie: CookieSession,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let query = query.into_inner();
    let mut selection = state.selection(&cookie)?;
    selection.set_cluster_filter(query.cluster_id.map(Id::new));
    selection.set_text_filter(query.q.unwrap_or_default());

    let (name, items, error) = match selection.display_state(false, state.directory_error.as_deref()) {
        DisplayState::Loading => ("loading", Vec::new(), None),
        DisplayState::Error(message) => ("error", Vec::new(), Some(message)),
        DisplayState::Empty => ("empty", Vec::new(), None),
        DisplayState::Items(items) => ("items", items, None),
    };

    Ok(HttpResponse::Ok().json(DirectoryView {
        state: name,
        items,
        error,
        selected: selection.selected_ids(),
    }))
}

async fn get_selection(cookie: CookieSession, state: web::Data<AppState>) -> Result<HttpResponse> {
    let selection = state.selection(&cookie)?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "selected": selection.selected(),
    })))
}

async fn toggle_barangay(
    path: web::Path<String>,
    cookie: CookieSession,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let id = Id::new(path.into_inner());
    let mut selection = state.selection(&cookie)?;
    let change = selection
        .toggle_id(&id)
        .ok_or_else(|| Error::UnknownBarangay(id.clone()))?;
    cookie.insert(SELECTION_KEY, selection.selected_ids())?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "change": change.kind(),
        "barangay": change.record(),
        "selected": selection.selected(),
    })))
}

async fn clear_selection(cookie: CookieSession) -> HttpResponse {
    cookie.remove(SELECTION_KEY);
    HttpResponse::Ok().json(serde_json::json!({"success": true, "selected": []}))
}

// Assignment endpoints
async fn list_assignments(
    CurrentSession(user): CurrentSession,
    state: web::Data<AppState>,
) -> HttpResponse {
    let ticket = state.with_board(&user.user_id, |board| board.begin_load(&user));
    let result = state.api.my_assignments(&user.user_id, user.role).await;
    let pending = state.with_board(&user.user_id, |board| {
        board.finish_load(ticket, result);
        board.pending().to_vec()
    });

    // Fetch failures show up as an empty list
    HttpResponse::Ok().json(serde_json::json!({"success": true, "assignments": pending}))
}

async fn respond_assignment(
    path: web::Path<String>,
    body: web::Json<RespondRequest>,
    CurrentSession(user): CurrentSession,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let assignment_id = Id::new(path.into_inner());
    let status = body.response_status;

    let Some(taken) = state.with_board(&user.user_id, |board| board.take(&assignment_id)) else {
        return Ok(HttpResponse::NotFound().json(serde_json::json!({
            "success": false,
            "error": format!("Assignment {} is not pending", assignment_id),
        })));
    };

    let sent = send_response(state.api.as_ref(), &user, taken.record(), status).await;
    let (outcome, pending) = state.with_board(&user.user_id, |board| {
        board
            .settle(taken, sent)
            .map(|outcome| (outcome, board.pending().to_vec()))
    })?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "assignment_id": assignment_id,
        "response_status": status,
        "confirmed": matches!(outcome, Outcome::Acknowledged),
        "assignments": pending,
    })))
}

// Collector endpoints
async fn get_collector(
    path: web::Path<String>,
    _user: CurrentSession,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let id = Id::new(path.into_inner());
    let profile = collector::fetch_profile(state.api.as_ref(), &id).await?;
    Ok(HttpResponse::Ok().json(profile))
}

async fn update_collector(
    path: web::Path<String>,
    body: web::Json<CollectorProfile>,
    _user: CurrentSession,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let id = Id::new(path.into_inner());
    let ack = collector::update_profile(state.api.as_ref(), &id, body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({"success": true, "message": ack.message})))
}

async fn change_password(
    body: web::Json<PasswordChange>,
    _user: CurrentSession,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let ack = collector::change_password(state.api.as_ref(), &body).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({"success": true, "message": ack.message})))
}

/// Registers the JSON API routes.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/api/session", web::get().to(current_user))
        .route("/api/session", web::post().to(sign_in))
        .route("/api/session", web::delete().to(sign_out))
        .route("/api/barangays", web::get().to(list_barangays))
        .route("/api/barangays/selection", web::get().to(get_selection))
        .route("/api/barangays/selection", web::delete().to(clear_selection))
        .route("/api/barangays/selection/{id}", web::post().to(toggle_barangay))
        .route("/api/assignments", web::get().to(list_assignments))
        .route("/api/assignments/{id}/respond", web::post().to(respond_assignment))
        .route("/api/collectors/password", web::post().to(change_password))
        .route("/api/collectors/{id}", web::get().to(get_collector))
        .route("/api/collectors/{id}", web::put().to(update_collector));
}

pub fn session_middleware(key: Key, secure: bool) -> SessionMiddleware<CookieSessionStore> {
    SessionMiddleware::builder(CookieSessionStore::default(), key)
        .cookie_name("kolektrash".to_string())
        .cookie_secure(secure)
        .build()
}

/// Cookie signing key from the configured secret (at least 64 bytes), or a
/// random one that invalidates sessions on restart.
pub fn session_key(secret: Option<&str>) -> Key {
    match secret {
        Some(secret) => Key::try_from(secret.as_bytes()).unwrap_or_else(|e| {
            warn!("KOLEKTRASH_SESSION_KEY unusable ({e}), generating a random key");
            Key::generate()
        }),
        None => {
            info!("No session key configured, sessions will not survive a restart");
            Key::generate()
        }
    }
}

fn load_directory(config: &Config) -> (Vec<BarangayRecord>, Option<String>) {
    let Some(path) = &config.barangays_path else {
        warn!("KOLEKTRASH_BARANGAYS not set, directory is empty");
        return (Vec::new(), None);
    };

    match load_barangays(path) {
        Ok(records) => (records, None),
        Err(e) => {
            warn!(path = %path.display(), "failed to load barangays: {e}");
            (Vec::new(), Some(format!("Failed to load barangays: {e}")))
        }
    }
}

pub async fn start_server(config: Config) -> crate::Result<()> {
    let api = HttpApi::new(&config.api_url, config.timeout)?;
    let (directory, directory_error) = load_directory(&config);

    let mut state = AppState::new(directory, Arc::new(api), config.removal_policy);
    if let Some(message) = directory_error {
        state = state.with_directory_error(message);
    }
    let app_state = web::Data::new(state);

    let key = session_key(config.session_key.as_deref());
    let secure = config.secure_cookies;
    let static_dir = config.static_dir.clone();

    info!(port = config.port, api_url = %config.api_url, "starting web server");
    HttpServer::new(move || {
        let app = App::new()
            .app_data(app_state.clone())
            .wrap(session_middleware(key.clone(), secure))
            .wrap(middleware::Logger::default())
            .configure(configure);

        match &static_dir {
            Some(dir) => app.service(Files::new("/static", dir.clone())),
            None => app,
        }
    })
    .bind(("0.0.0.0", config.port))?
    .run()
    .await?;

    Ok(())
}
