//! HTTP surface: application state, router, and per-resource handlers.

pub mod attendance;
pub mod auth;
pub mod students;

use std::path::PathBuf;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;

use crate::auth::AuthService;
use crate::domain::{AttendanceService, RosterService};

/// Multipart bodies may carry a 5 MiB photo plus text fields.
const MAX_BODY_BYTES: usize = 6 * 1024 * 1024;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub auth_service: AuthService,
    pub roster_service: RosterService,
    pub attendance_service: AttendanceService,
}

impl AppState {
    pub fn new(
        auth_service: AuthService,
        roster_service: RosterService,
        attendance_service: AttendanceService,
    ) -> Self {
        Self {
            auth_service,
            roster_service,
            attendance_service,
        }
    }
}

/// Build the application router.
///
/// `uploads_dir` is Some only when local photo storage is active; remote
/// storage serves photos from its own absolute URLs.
pub fn router(state: AppState, uploads_dir: Option<PathBuf>) -> Router {
    // The SPA is served from a different origin during development
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/auth/login", post(auth::login))
        .route("/auth/me", get(auth::me))
        .route(
            "/students",
            get(students::list_students).post(students::create_student),
        )
        .route(
            "/students/:id",
            get(students::get_student)
                .put(students::update_student)
                .delete(students::delete_student),
        )
        .route("/attendance/date/:date", get(attendance::attendance_by_date))
        .route("/attendance/student/:id", get(attendance::student_history))
        .route("/attendance/mark", post(attendance::mark_attendance))
        .route("/attendance/bulk", post(attendance::mark_attendance_bulk))
        .route("/attendance/summary", get(attendance::attendance_summary));

    let mut app = Router::new()
        .nest("/api", api_routes)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES));

    if let Some(dir) = uploads_dir {
        app = app.nest_service("/uploads", ServeDir::new(dir));
    }

    app.layer(cors).with_state(state)
}
