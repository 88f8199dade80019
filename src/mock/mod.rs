//! A stand-in for the hosted todo collection, served over HTTP with `axum` and
//! stored in SQLite. Used by the integration tests and for local runs of the
//! CLI.

pub mod repository;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Router, response::IntoResponse};
use serde::Deserialize;
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::{Deadline, Todo};

#[derive(Clone)]
pub struct MockState {
    pub db: SqlitePool,
}

/// Body accepted by `POST /todos` and `PUT /todos/{id}`. Clients may leave the
/// id out; the path id always wins on `PUT`.
#[derive(Debug, Deserialize)]
struct TodoBody {
    #[serde(default)]
    id: Option<String>,
    text: String,
    #[serde(default)]
    deadline: Deadline,
    #[serde(default)]
    completed: bool,
}

impl TodoBody {
    fn into_todo(self, id: String) -> Todo {
        Todo {
            id,
            text: self.text,
            deadline: self.deadline,
            completed: self.completed,
        }
    }
}

pub fn router(state: MockState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/todos", get(list_todos).post(create_todo))
        .route(
            "/todos/{id}",
            get(get_todo).put(replace_todo).delete(delete_todo),
        )
        .with_state(state)
}

async fn health(State(state): State<MockState>) -> Result<StatusCode, ApiError> {
    sqlx::query("select 1").execute(&state.db).await?;
    Ok(StatusCode::OK)
}

async fn list_todos(State(state): State<MockState>) -> Result<Json<Vec<Todo>>, ApiError> {
    let todos = repository::fetch_todos(&state.db).await?;
    Ok(Json(todos))
}

async fn create_todo(
    State(state): State<MockState>,
    Json(body): Json<TodoBody>,
) -> Result<impl IntoResponse, ApiError> {
    let id = body
        .id
        .clone()
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let todo = body.into_todo(id);

    let stored = match repository::insert_todo(&state.db, &todo).await {
        Ok(stored) => stored,
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            return Err(ApiError::Conflict(format!("todo {} already exists", todo.id)));
        }
        Err(e) => return Err(e.into()),
    };
    info!("mock: created todo {}", stored.id);
    Ok((StatusCode::CREATED, Json(stored)))
}

async fn get_todo(
    State(state): State<MockState>,
    Path(id): Path<String>,
) -> Result<Json<Todo>, ApiError> {
    let todo = repository::find_todo_by_id(&state.db, &id)
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(todo))
}

async fn replace_todo(
    State(state): State<MockState>,
    Path(id): Path<String>,
    Json(body): Json<TodoBody>,
) -> Result<Json<Todo>, ApiError> {
    let todo = body.into_todo(id);
    let stored = repository::replace_todo(&state.db, &todo)
        .await?
        .ok_or(ApiError::NotFound)?;
    info!("mock: replaced todo {}", stored.id);
    Ok(Json(stored))
}

async fn delete_todo(
    State(state): State<MockState>,
    Path(id): Path<String>,
) -> Result<Json<Todo>, ApiError> {
    let deleted = repository::delete_todo(&state.db, &id)
        .await?
        .ok_or(ApiError::NotFound)?;
    info!("mock: deleted todo {}", deleted.id);
    Ok(Json(deleted))
}
