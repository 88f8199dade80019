use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{FromRow, SqlitePool};

use crate::models::deadline::parse_date;
use crate::models::{Deadline, Todo};

const SELECT_TODO: &str =
    "SELECT id, text, deadline_start, deadline_end, completed FROM todos";

#[derive(Debug, FromRow)]
struct TodoRow {
    id: String,
    text: String,
    deadline_start: Option<String>,
    deadline_end: Option<String>,
    completed: bool,
}

impl From<TodoRow> for Todo {
    fn from(row: TodoRow) -> Self {
        Todo {
            id: row.id,
            text: row.text,
            deadline: Deadline::new(
                row.deadline_start.as_deref().and_then(parse_date),
                row.deadline_end.as_deref().and_then(parse_date),
            ),
            completed: row.completed,
        }
    }
}

fn date_column(date: Option<chrono::NaiveDate>) -> Option<String> {
    date.map(|d| d.format("%Y-%m-%d").to_string())
}

/// Opens the pool and runs migrations. An in-memory database is only shared
/// within one connection, so the pool is pinned to a single long-lived one.
pub async fn connect(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
    let pool = if database_url.contains(":memory:") {
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?
    } else {
        SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?
    };

    sqlx::migrate!("./migrations").run(&pool).await?;
    Ok(pool)
}

pub async fn fetch_todos(db: &SqlitePool) -> Result<Vec<Todo>, sqlx::Error> {
    let rows = sqlx::query_as::<_, TodoRow>(&format!("{} ORDER BY seq ASC", SELECT_TODO))
        .fetch_all(db)
        .await?;
    Ok(rows.into_iter().map(Todo::from).collect())
}

pub async fn find_todo_by_id(db: &SqlitePool, id: &str) -> Result<Option<Todo>, sqlx::Error> {
    let row = sqlx::query_as::<_, TodoRow>(&format!("{} WHERE id = ?", SELECT_TODO))
        .bind(id)
        .fetch_optional(db)
        .await?;
    Ok(row.map(Todo::from))
}

pub async fn insert_todo(db: &SqlitePool, todo: &Todo) -> Result<Todo, sqlx::Error> {
    sqlx::query(
        "INSERT INTO todos (id, text, deadline_start, deadline_end, completed) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&todo.id)
    .bind(&todo.text)
    .bind(date_column(todo.deadline.start))
    .bind(date_column(todo.deadline.end))
    .bind(todo.completed)
    .execute(db)
    .await?;

    find_todo_by_id(db, &todo.id)
        .await?
        .ok_or(sqlx::Error::RowNotFound)
}

/// Replaces every field of an existing record. Returns `None` if the id is
/// unknown.
pub async fn replace_todo(db: &SqlitePool, todo: &Todo) -> Result<Option<Todo>, sqlx::Error> {
    let affected = sqlx::query(
        "UPDATE todos SET text = ?, deadline_start = ?, deadline_end = ?, completed = ? WHERE id = ?",
    )
    .bind(&todo.text)
    .bind(date_column(todo.deadline.start))
    .bind(date_column(todo.deadline.end))
    .bind(todo.completed)
    .bind(&todo.id)
    .execute(db)
    .await?
    .rows_affected();

    if affected == 0 {
        return Ok(None);
    }
    find_todo_by_id(db, &todo.id).await
}

pub async fn delete_todo(db: &SqlitePool, id: &str) -> Result<Option<Todo>, sqlx::Error> {
    let Some(existing) = find_todo_by_id(db, id).await? else {
        return Ok(None);
    };

    sqlx::query("DELETE FROM todos WHERE id = ?")
        .bind(id)
        .execute(db)
        .await?;

    Ok(Some(existing))
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    async fn setup_test_db() -> SqlitePool {
        connect("sqlite::memory:")
            .await
            .expect("Failed to create test db")
    }

    fn todo(id: &str, text: &str) -> Todo {
        Todo {
            id: id.to_string(),
            text: text.to_string(),
            deadline: Deadline::on(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()),
            completed: false,
        }
    }

    #[tokio::test]
    async fn test_insert_and_fetch_in_order() {
        let pool = setup_test_db().await;

        insert_todo(&pool, &todo("b", "second")).await.expect("Failed to insert");
        insert_todo(&pool, &todo("a", "first?")).await.expect("Failed to insert");

        let todos = fetch_todos(&pool).await.expect("Failed to fetch todos");
        let ids: Vec<&str> = todos.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
        assert_eq!(todos[0].deadline, todo("b", "").deadline);
    }

    #[tokio::test]
    async fn test_duplicate_id_is_rejected() {
        let pool = setup_test_db().await;

        insert_todo(&pool, &todo("1", "x")).await.expect("Failed to insert");
        let err = insert_todo(&pool, &todo("1", "y")).await.unwrap_err();
        match err {
            sqlx::Error::Database(db_err) => assert!(db_err.is_unique_violation()),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_replace_todo() {
        let pool = setup_test_db().await;
        insert_todo(&pool, &todo("1", "buy milk")).await.expect("Failed to insert");

        let mut changed = todo("1", "buy bread");
        changed.completed = true;
        changed.deadline = Deadline::UNSET;
        let stored = replace_todo(&pool, &changed)
            .await
            .expect("Failed to replace")
            .expect("Todo not found");
        assert_eq!(stored, changed);

        let missing = replace_todo(&pool, &todo("nope", "x")).await.expect("Failed to replace");
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_delete_todo() {
        let pool = setup_test_db().await;
        insert_todo(&pool, &todo("1", "buy milk")).await.expect("Failed to insert");

        let deleted = delete_todo(&pool, "1").await.expect("Failed to delete");
        assert_eq!(deleted.map(|t| t.id), Some("1".to_string()));
        assert!(fetch_todos(&pool).await.unwrap().is_empty());
        assert!(delete_todo(&pool, "1").await.unwrap().is_none());
    }
}
