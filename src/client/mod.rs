use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::models::Todo;

/// The remote todo collection.
#[async_trait]
pub trait TodoStore: Send + Sync {
    async fn list(&self) -> Result<Vec<Todo>, ClientError>;
    async fn create(&self, todo: &Todo) -> Result<Todo, ClientError>;
    async fn update(&self, todo: &Todo) -> Result<Todo, ClientError>;
    async fn delete(&self, id: &str) -> Result<(), ClientError>;
}

pub struct HttpTodoStore {
    client: Client,
    base_url: String,
}

impl HttpTodoStore {
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| ClientError::Config(format!("Failed to build http client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.api_url.trim_end_matches('/').to_string(),
        })
    }

    fn collection_url(&self) -> String {
        format!("{}/todos", self.base_url)
    }

    fn item_url(&self, id: &str) -> String {
        format!("{}/todos/{}", self.base_url, id)
    }

    async fn check(response: Response) -> Result<Response, ClientError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Status { status, body });
        }
        Ok(response)
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
        let response = Self::check(response).await?;
        let body_text = response.text().await?;
        Ok(serde_json::from_str::<T>(&body_text)?)
    }
}

#[async_trait]
impl TodoStore for HttpTodoStore {
    async fn list(&self) -> Result<Vec<Todo>, ClientError> {
        let response = self.client.get(self.collection_url()).send().await?;
        let todos: Vec<Todo> = Self::decode(response).await?;
        debug!("fetched {} todos", todos.len());
        Ok(todos)
    }

    async fn create(&self, todo: &Todo) -> Result<Todo, ClientError> {
        let response = self
            .client
            .post(self.collection_url())
            .json(todo)
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn update(&self, todo: &Todo) -> Result<Todo, ClientError> {
        let response = self
            .client
            .put(self.item_url(&todo.id))
            .json(todo)
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn delete(&self, id: &str) -> Result<(), ClientError> {
        let response = self.client.delete(self.item_url(id)).send().await?;
        Self::check(response).await?;
        Ok(())
    }
}
