use todo_sync::client::{HttpTodoStore, TodoStore};
use todo_sync::config::ClientConfig;
use todo_sync::error::ClientError;
use todo_sync::{Deadline, Todo};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn store_for(server: &MockServer) -> HttpTodoStore {
    let config = ClientConfig {
        api_url: format!("{}/api/v1", server.uri()),
        ..Default::default()
    };
    HttpTodoStore::new(&config).expect("Failed to build store")
}

fn milk() -> Todo {
    Todo {
        id: "1".to_string(),
        text: "buy milk".to_string(),
        deadline: Deadline::from_legacy("2024-01-01"),
        completed: false,
    }
}

#[tokio::test]
async fn test_list_reads_mixed_deadline_shapes() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/todos"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            { "id": "1", "text": "buy milk", "deadline": "2024-01-01", "completed": false },
            { "id": "2", "text": "trip", "deadline": ["2024-03-01T00:00:00.000Z", "2024-03-05"], "completed": true },
            { "id": "3", "text": "no date", "completed": false }
        ])))
        .mount(&server)
        .await;

    let todos = store_for(&server).list().await.expect("list failed");
    assert_eq!(todos.len(), 3);
    assert_eq!(todos[0], milk());
    assert_eq!(todos[1].deadline.to_string(), "2024-03-01 - 2024-03-05");
    assert!(todos[1].completed);
    assert!(todos[2].deadline.is_unset());
}

#[tokio::test]
async fn test_list_non_2xx_is_status_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/todos"))
        .respond_with(ResponseTemplate::new(503).set_body_string("Service Unavailable"))
        .mount(&server)
        .await;

    let err = store_for(&server).list().await.unwrap_err();
    match err {
        ClientError::Status { status, body } => {
            assert_eq!(status.as_u16(), 503);
            assert_eq!(body, "Service Unavailable");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_list_bad_json_is_decode_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/todos"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let err = store_for(&server).list().await.unwrap_err();
    assert!(matches!(err, ClientError::Decode(_)));
}

#[tokio::test]
async fn test_create_posts_full_record() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/todos"))
        .and(header("content-type", "application/json"))
        .and(body_json(serde_json::json!({
            "id": "1",
            "text": "buy milk",
            "deadline": ["2024-01-01", null],
            "completed": false
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
            "id": "1", "text": "buy milk", "deadline": ["2024-01-01", null], "completed": false
        })))
        .expect(1)
        .mount(&server)
        .await;

    let created = store_for(&server).create(&milk()).await.expect("create failed");
    assert_eq!(created, milk());
}

#[tokio::test]
async fn test_update_puts_to_item_url() {
    let server = MockServer::start().await;
    let mut changed = milk();
    changed.text = "buy bread".to_string();

    Mock::given(method("PUT"))
        .and(path("/api/v1/todos/1"))
        .and(body_json(serde_json::to_value(&changed).unwrap()))
        .respond_with(ResponseTemplate::new(200).set_body_json(&changed))
        .expect(1)
        .mount(&server)
        .await;

    let stored = store_for(&server).update(&changed).await.expect("update failed");
    assert_eq!(stored.text, "buy bread");
}

#[tokio::test]
async fn test_delete_ignores_body_and_reports_404() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/api/v1/todos/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::to_value(milk()).unwrap()))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/v1/todos/2"))
        .respond_with(ResponseTemplate::new(404).set_body_string("\"Not found\""))
        .mount(&server)
        .await;

    let store = store_for(&server);
    store.delete("1").await.expect("delete failed");

    let err = store.delete("2").await.unwrap_err();
    assert!(matches!(err, ClientError::Status { status, .. } if status.as_u16() == 404));
}

#[tokio::test]
async fn test_unreachable_server_is_http_error() {
    let config = ClientConfig {
        api_url: "http://127.0.0.1:9".to_string(),
        ..Default::default()
    };
    let store = HttpTodoStore::new(&config).unwrap();

    let err = store.list().await.unwrap_err();
    assert!(matches!(err, ClientError::Http(_)));
}
