// http server mode - json api over the store and the classifier

use axum::{
    Json, Router,
    extract::{FromRequest, Path, Request, State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, patch, post, put},
};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

use crate::core::{
    AnswerKind, AnswerView, Chapter, ChapterUpdate, Classification, ContentClassifier,
    ExamScore, ExamSection, ExamUpdate, Explanation, Identity, NewChapter, NewExam, NewPractice,
    NewTutorial, PracticeSection, ProfileUpdate, Role, Session, Store, Tutorial, UserDirectory, UserRecord, grade,
    render_answer,
};
use crate::Error;

/// Header carrying the caller's uid, as issued by the auth provider.
pub const USER_HEADER: &str = "x-user-id";

struct AppState {
    store: Store,
    users: UserDirectory,
    classifier: ContentClassifier,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClassifyRequest {
    #[serde(default)]
    text: String,
    #[serde(default)]
    answer_type: Option<AnswerKind>,
    #[serde(default)]
    explain: bool,
}

#[derive(Serialize)]
#[serde(untagged)]
enum ClassifyResponse {
    Plain(Classification),
    Explained(Explanation),
}

#[derive(Deserialize)]
struct GradeRequest {
    answers: Vec<Option<usize>>,
}

#[derive(Deserialize)]
struct RoleRequest {
    role: Role,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = match &self {
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::DuplicateChapter(_) | Error::LastAdmin => StatusCode::CONFLICT,
            Error::Unauthenticated => StatusCode::UNAUTHORIZED,
            Error::Forbidden => StatusCode::FORBIDDEN,
            Error::Validation(_) | Error::Json(_) => StatusCode::BAD_REQUEST,
            Error::Database(_) | Error::Config(_) | Error::Server(_) => {
                error!(error = %self, "request failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (
            status,
            Json(ErrorResponse {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

// request bodies; a rejected body answers with the same json error shape
struct JsonBody<T>(T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(Self(value))
    }
}

impl From<JsonRejection> for Error {
    fn from(rejection: JsonRejection) -> Self {
        Error::Validation(rejection.body_text())
    }
}

type Shared = State<Arc<AppState>>;

pub struct Server;

impl Server {
    pub fn router(store: Store, classifier: ContentClassifier) -> Router {
        let state = Arc::new(AppState {
            users: store.users(),
            store,
            classifier,
        });

        Router::new()
            .route("/health", get(health))
            .route("/classify", post(classify))
            .route("/session", post(sign_in))
            .route("/profile", patch(update_profile))
            .route("/chapters", get(list_chapters).post(create_chapter))
            .route(
                "/chapters/{id}",
                get(get_chapter).patch(update_chapter).delete(delete_chapter),
            )
            .route("/chapters/{id}/tutorials", post(add_tutorial))
            .route(
                "/chapters/{id}/tutorials/{tid}",
                put(update_tutorial).delete(delete_tutorial),
            )
            .route("/chapters/{id}/practice", post(add_practice))
            .route(
                "/chapters/{id}/practice/{pid}",
                put(update_practice).delete(delete_practice),
            )
            .route("/chapters/{id}/practice/{pid}/render", get(render_practice))
            .route("/chapters/{id}/exams", post(add_exam))
            .route(
                "/chapters/{id}/exams/{eid}",
                patch(update_exam).delete(delete_exam),
            )
            .route("/chapters/{id}/exams/{eid}/grade", post(grade_exam))
            .route("/users", get(list_users))
            .route("/users/{uid}/role", put(set_role))
            .layer(CorsLayer::permissive())
            .with_state(state)
    }

    pub async fn run(
        store: Store,
        classifier: ContentClassifier,
        host: &str,
        port: u16,
    ) -> Result<(), Error> {
        let app = Self::router(store, classifier);

        let addr = format!("{host}:{port}");
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| Error::Server(e.to_string()))?;
        info!("server running at http://{addr}");

        axum::serve(listener, app)
            .await
            .map_err(|e| Error::Server(e.to_string()))?;

        Ok(())
    }
}

// the caller must be a known user, any role
async fn signed_in(state: &AppState, headers: &HeaderMap) -> Result<Session, Error> {
    let uid = headers
        .get(USER_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .ok_or(Error::Unauthenticated)?;

    Session::resume(&state.users, uid).await
}

// the caller must be a known user with the admin role
async fn admin(state: &AppState, headers: &HeaderMap) -> Result<Session, Error> {
    let session = signed_in(state, headers).await?;
    session.require_admin()?;
    Ok(session)
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

async fn classify(State(state): Shared, JsonBody(req): JsonBody<ClassifyRequest>) -> Json<ClassifyResponse> {
    let response = if req.explain {
        ClassifyResponse::Explained(state.classifier.explain(&req.text, req.answer_type))
    } else {
        ClassifyResponse::Plain(state.classifier.classify(&req.text, req.answer_type))
    };
    Json(response)
}

async fn sign_in(State(state): Shared, JsonBody(identity): JsonBody<Identity>) -> Result<Json<UserRecord>, Error> {
    let session = Session::sign_in(&state.users, identity).await?;
    Ok(Json(session.user().clone()))
}

async fn update_profile(
    State(state): Shared,
    headers: HeaderMap,
    JsonBody(update): JsonBody<ProfileUpdate>,
) -> Result<Json<UserRecord>, Error> {
    let session = signed_in(&state, &headers).await?;
    let uid = &session.identity().uid;
    Ok(Json(state.users.update_profile(uid, update).await?))
}

async fn list_chapters(State(state): Shared) -> Result<Json<Vec<Chapter>>, Error> {
    Ok(Json(state.store.chapters().await?))
}

async fn get_chapter(State(state): Shared, Path(id): Path<String>) -> Result<Json<Chapter>, Error> {
    Ok(Json(state.store.chapter(&id).await?))
}

async fn create_chapter(
    State(state): Shared,
    headers: HeaderMap,
    JsonBody(chapter): JsonBody<NewChapter>,
) -> Result<(StatusCode, Json<Chapter>), Error> {
    admin(&state, &headers).await?;
    let created = state.store.create_chapter(chapter).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn update_chapter(
    State(state): Shared,
    headers: HeaderMap,
    Path(id): Path<String>,
    JsonBody(update): JsonBody<ChapterUpdate>,
) -> Result<Json<Chapter>, Error> {
    admin(&state, &headers).await?;
    Ok(Json(state.store.update_chapter(&id, update).await?))
}

async fn delete_chapter(
    State(state): Shared,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<StatusCode, Error> {
    admin(&state, &headers).await?;
    state.store.delete_chapter(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn add_tutorial(
    State(state): Shared,
    headers: HeaderMap,
    Path(id): Path<String>,
    JsonBody(tutorial): JsonBody<NewTutorial>,
) -> Result<(StatusCode, Json<Tutorial>), Error> {
    admin(&state, &headers).await?;
    let created = state.store.add_tutorial(&id, tutorial).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn update_tutorial(
    State(state): Shared,
    headers: HeaderMap,
    Path((id, tid)): Path<(String, String)>,
    JsonBody(tutorial): JsonBody<NewTutorial>,
) -> Result<Json<Tutorial>, Error> {
    admin(&state, &headers).await?;
    Ok(Json(state.store.update_tutorial(&id, &tid, tutorial).await?))
}

async fn delete_tutorial(
    State(state): Shared,
    headers: HeaderMap,
    Path((id, tid)): Path<(String, String)>,
) -> Result<StatusCode, Error> {
    admin(&state, &headers).await?;
    state.store.delete_tutorial(&id, &tid).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn add_practice(
    State(state): Shared,
    headers: HeaderMap,
    Path(id): Path<String>,
    JsonBody(practice): JsonBody<NewPractice>,
) -> Result<(StatusCode, Json<PracticeSection>), Error> {
    admin(&state, &headers).await?;
    let created = state.store.add_practice(&id, practice).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn update_practice(
    State(state): Shared,
    headers: HeaderMap,
    Path((id, pid)): Path<(String, String)>,
    JsonBody(practice): JsonBody<NewPractice>,
) -> Result<Json<PracticeSection>, Error> {
    admin(&state, &headers).await?;
    Ok(Json(state.store.update_practice(&id, &pid, practice).await?))
}

async fn delete_practice(
    State(state): Shared,
    headers: HeaderMap,
    Path((id, pid)): Path<(String, String)>,
) -> Result<StatusCode, Error> {
    admin(&state, &headers).await?;
    state.store.delete_practice(&id, &pid).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn render_practice(
    State(state): Shared,
    Path((id, pid)): Path<(String, String)>,
) -> Result<Json<AnswerView>, Error> {
    let chapter = state.store.chapter(&id).await?;
    let practice = chapter
        .practice_sections
        .iter()
        .find(|p| p.id == pid)
        .ok_or_else(|| Error::NotFound(format!("practice section {pid}")))?;

    Ok(Json(render_answer(&state.classifier, practice)))
}

async fn add_exam(
    State(state): Shared,
    headers: HeaderMap,
    Path(id): Path<String>,
    JsonBody(exam): JsonBody<NewExam>,
) -> Result<(StatusCode, Json<ExamSection>), Error> {
    admin(&state, &headers).await?;
    let created = state.store.add_exam(&id, exam).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn update_exam(
    State(state): Shared,
    headers: HeaderMap,
    Path((id, eid)): Path<(String, String)>,
    JsonBody(update): JsonBody<ExamUpdate>,
) -> Result<Json<ExamSection>, Error> {
    admin(&state, &headers).await?;
    Ok(Json(state.store.update_exam(&id, &eid, update).await?))
}

async fn delete_exam(
    State(state): Shared,
    headers: HeaderMap,
    Path((id, eid)): Path<(String, String)>,
) -> Result<StatusCode, Error> {
    admin(&state, &headers).await?;
    state.store.delete_exam(&id, &eid).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn grade_exam(
    State(state): Shared,
    Path((id, eid)): Path<(String, String)>,
    JsonBody(req): JsonBody<GradeRequest>,
) -> Result<Json<ExamScore>, Error> {
    let chapter = state.store.chapter(&id).await?;
    let exam = chapter
        .exam_sections
        .iter()
        .find(|e| e.id == eid)
        .ok_or_else(|| Error::NotFound(format!("exam section {eid}")))?;

    Ok(Json(grade(exam, &req.answers)))
}

async fn list_users(State(state): Shared, headers: HeaderMap) -> Result<Json<Vec<UserRecord>>, Error> {
    admin(&state, &headers).await?;
    Ok(Json(state.users.users().await?))
}

async fn set_role(
    State(state): Shared,
    headers: HeaderMap,
    Path(uid): Path<String>,
    JsonBody(req): JsonBody<RoleRequest>,
) -> Result<Json<UserRecord>, Error> {
    admin(&state, &headers).await?;
    Ok(Json(state.users.set_role(&uid, req.role).await?))
}
