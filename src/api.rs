use crate::error::{ApiError, StoreError};
use crate::models::{Category, NewTask, Task, TaskId, TaskPatch};
use crate::store::TaskStore;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

/// HTTP client for the task backend's REST API.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    instance_url: String,
    api_key: String,
}

impl ApiClient {
    pub fn new(instance_url: &str, api_key: &str) -> Self {
        ApiClient {
            client: Client::new(),
            instance_url: instance_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.instance_url, path)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request.header("Authorization", format!("Bearer {}", self.api_key))
    }

    async fn check(res: Response) -> Result<Response, ApiError> {
        let status = res.status();
        if status.is_success() {
            Ok(res)
        } else {
            let body = res.text().await?;
            warn!(%status, %body, "task backend rejected request");
            Err(ApiError::Status { status, body })
        }
    }

    async fn json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, ApiError> {
        let res = Self::check(request.send().await?).await?;
        Ok(res.json::<T>().await?)
    }

    pub async fn fetch_tasks(&self) -> Result<Vec<Task>, ApiError> {
        let url = self.url("/api/tasks");
        debug!(%url, "fetching tasks");
        Self::json(self.authorized(self.client.get(&url))).await
    }

    pub async fn fetch_categories(&self) -> Result<Vec<Category>, ApiError> {
        let url = self.url("/api/categories");
        debug!(%url, "fetching categories");
        Self::json(self.authorized(self.client.get(&url))).await
    }

    pub async fn create_task(&self, task: &NewTask) -> Result<Task, ApiError> {
        let url = self.url("/api/tasks");
        Self::json(self.authorized(self.client.post(&url)).json(task)).await
    }

    pub async fn update_task(&self, id: TaskId, patch: &TaskPatch) -> Result<Task, ApiError> {
        let url = self.url(&format!("/api/tasks/{}", id));
        Self::json(self.authorized(self.client.patch(&url)).json(patch)).await
    }

    pub async fn delete_task(&self, id: TaskId) -> Result<(), ApiError> {
        let url = self.url(&format!("/api/tasks/{}", id));
        Self::check(self.authorized(self.client.delete(&url)).send().await?).await?;
        Ok(())
    }
}

#[async_trait]
impl TaskStore for ApiClient {
    async fn list_tasks(&self) -> Result<Vec<Task>, StoreError> {
        Ok(self.fetch_tasks().await?)
    }

    async fn create_task(&self, task: NewTask) -> Result<Task, StoreError> {
        Ok(ApiClient::create_task(self, &task).await?)
    }

    async fn update_task(&self, id: TaskId, patch: TaskPatch) -> Result<Task, StoreError> {
        Ok(ApiClient::update_task(self, id, &patch).await?)
    }

    async fn delete_task(&self, id: TaskId) -> Result<(), StoreError> {
        Ok(ApiClient::delete_task(self, id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailing_slash_is_trimmed() {
        let client = ApiClient::new("https://tasks.example.com/", "key");
        assert_eq!(
            client.url("/api/tasks/3"),
            "https://tasks.example.com/api/tasks/3"
        );
    }
}
