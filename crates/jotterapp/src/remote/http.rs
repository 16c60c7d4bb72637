//! REST client for the notes service.

use super::normalize;
use super::{
    AuthToken, Credentials, DashboardPage, DashboardQuery, ListQuery, ListSource, LoginResponse,
    Page, PasswordChange, ProfileUpdate, Registration, RemoteService, SearchPage, SearchQuery,
};
use crate::error::{JotterError, Result};
use crate::lifecycle::Action;
use crate::model::{Item, ItemId, Task, TaskDraft, TaskPatch, User};
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder};
use serde::Serialize;
use serde_json::{json, Value};
use std::time::Duration;

pub struct HttpRemote {
    base_url: String,
    http: Client,
}

impl HttpRemote {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| JotterError::Config(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, method: Method, path: &str, auth: Option<&AuthToken>) -> RequestBuilder {
        let url = self.url(path);
        tracing::debug!(%method, %url, "request");
        let builder = self.http.request(method, url);
        match auth {
            Some(token) => builder.bearer_auth(token.expose()),
            None => builder,
        }
    }

    fn with_json<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        auth: Option<&AuthToken>,
        body: &B,
    ) -> RequestBuilder {
        self.request(method, path, auth).json(body)
    }

    /// Sends the request and returns the decoded body of a 2xx response.
    /// Anything else is classified by status.
    async fn send(&self, request: RequestBuilder) -> Result<Value> {
        let response = request.send().await.map_err(transport_error)?;
        let status = response.status();
        let text = response.text().await.map_err(transport_error)?;
        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        };

        if status.is_success() {
            Ok(body)
        } else {
            tracing::debug!(status = status.as_u16(), "request failed");
            Err(normalize::error_from_status(status.as_u16(), &body))
        }
    }

    fn item_path<T: Item>(id: &ItemId) -> String {
        format!("/{}/{}", T::KIND.plural(), id)
    }
}

fn transport_error(err: reqwest::Error) -> JotterError {
    if err.is_timeout() {
        JotterError::Transport("request timed out".to_string())
    } else if err.is_decode() {
        JotterError::Protocol(err.to_string())
    } else {
        JotterError::Transport(err.to_string())
    }
}

#[async_trait]
impl RemoteService for HttpRemote {
    async fn login(&self, credentials: &Credentials) -> Result<LoginResponse> {
        let body = self
            .send(self.with_json(Method::POST, "/auth/login", None, credentials))
            .await?;
        normalize::login(body)
    }

    async fn register(&self, registration: &Registration) -> Result<()> {
        let body = self
            .send(self.with_json(Method::POST, "/auth/register", None, registration))
            .await?;
        if body.get("success").and_then(Value::as_bool) == Some(false) {
            return Err(JotterError::Validation(normalize::validation_messages(&body)));
        }
        Ok(())
    }

    async fn set_autosave(&self, auth: &AuthToken, enabled: bool) -> Result<bool> {
        let body = self
            .send(self.with_json(
                Method::PUT,
                "/auth/autosave",
                Some(auth),
                &json!({ "autosave": enabled }),
            ))
            .await?;
        normalize::autosave(body, enabled)
    }

    async fn update_profile(&self, auth: &AuthToken, profile: &ProfileUpdate) -> Result<User> {
        let body = self
            .send(self.with_json(Method::PUT, "/auth/profile", Some(auth), profile))
            .await?;
        normalize::user(body)
    }

    async fn change_password(&self, auth: &AuthToken, change: &PasswordChange) -> Result<String> {
        let body = self
            .send(self.with_json(Method::PUT, "/auth/password", Some(auth), change))
            .await?;
        normalize::password_changed(body)
    }

    async fn delete_account(&self, auth: &AuthToken) -> Result<()> {
        let body = self
            .send(self.request(Method::DELETE, "/auth/delete", Some(auth)))
            .await?;
        if body.get("success").and_then(Value::as_bool) == Some(false) {
            return Err(JotterError::Validation(normalize::validation_messages(&body)));
        }
        Ok(())
    }

    async fn list_items<T: Item>(
        &self,
        auth: &AuthToken,
        source: ListSource,
        query: &ListQuery,
    ) -> Result<Page<T>> {
        let request = self.request(Method::GET, &source.path(T::KIND), Some(auth));
        match source {
            ListSource::Pinned => {
                let body = self.send(request.query(&query.user_scope())).await?;
                normalize::pinned_page(body)
            }
            ListSource::Partition(_) => {
                let body = self.send(request.query(query)).await?;
                normalize::list_page(body)
            }
        }
    }

    async fn get_item<T: Item>(&self, auth: &AuthToken, id: &ItemId) -> Result<T> {
        let body = self
            .send(self.request(Method::GET, &Self::item_path::<T>(id), Some(auth)))
            .await?;
        normalize::item_envelope(body)
    }

    async fn create_item<T: Item>(&self, auth: &AuthToken, draft: &T::Draft) -> Result<T> {
        let path = format!("/{}", T::KIND.plural());
        let body = self
            .send(self.with_json(Method::POST, &path, Some(auth), draft))
            .await?;
        normalize::item_envelope(body)
    }

    async fn update_item<T: Item>(
        &self,
        auth: &AuthToken,
        id: &ItemId,
        draft: &T::Draft,
    ) -> Result<T> {
        let body = self
            .send(self.with_json(Method::PUT, &Self::item_path::<T>(id), Some(auth), draft))
            .await?;
        normalize::item_envelope(body)
    }

    async fn transition<T: Item>(
        &self,
        auth: &AuthToken,
        id: &ItemId,
        action: Action,
    ) -> Result<T> {
        let segment = action
            .endpoint()
            .ok_or_else(|| JotterError::Protocol(format!("{action} has no transition endpoint")))?;
        let path = format!("{}/{}", Self::item_path::<T>(id), segment);
        let body = self.send(self.request(Method::PUT, &path, Some(auth))).await?;
        normalize::item_envelope(body)
    }

    async fn delete_item<T: Item>(&self, auth: &AuthToken, id: &ItemId) -> Result<()> {
        let body = self
            .send(self.request(Method::DELETE, &Self::item_path::<T>(id), Some(auth)))
            .await?;
        if body.get("success").and_then(Value::as_bool) == Some(false) {
            return Err(JotterError::Validation(normalize::validation_messages(&body)));
        }
        Ok(())
    }

    async fn search(
        &self,
        auth: &AuthToken,
        query: &SearchQuery,
        page: u32,
        limit: u32,
    ) -> Result<SearchPage> {
        let params = [
            ("keyword", query.keyword.clone()),
            ("type", query.type_param().to_string()),
            ("category", query.category_param().to_string()),
            ("page", page.to_string()),
            ("limit", limit.to_string()),
        ];
        let body = self
            .send(self.request(Method::GET, "/home/search", Some(auth)).query(&params))
            .await?;
        normalize::search_page(body)
    }

    async fn dashboard(&self, auth: &AuthToken, query: &DashboardQuery) -> Result<DashboardPage> {
        let body = self
            .send(
                self.request(Method::GET, "/home/dashboard", Some(auth))
                    .query(&query.params()),
            )
            .await?;
        normalize::dashboard(body)
    }

    async fn create_task(&self, auth: &AuthToken, draft: &TaskDraft) -> Result<Task> {
        let body = self
            .send(self.with_json(Method::POST, "/tasks", Some(auth), draft))
            .await?;
        normalize::task(body)
    }

    async fn update_task(&self, auth: &AuthToken, id: &ItemId, patch: &TaskPatch) -> Result<Task> {
        let path = format!("/tasks/{id}");
        let body = self
            .send(self.with_json(Method::PUT, &path, Some(auth), patch))
            .await?;
        normalize::task(body)
    }

    async fn delete_task(&self, auth: &AuthToken, id: &ItemId) -> Result<()> {
        let path = format!("/tasks/{id}");
        self.send(self.request(Method::DELETE, &path, Some(auth))).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Note;

    #[test]
    fn base_url_is_trimmed() {
        let remote =
            HttpRemote::new("http://localhost:5000/api/", Duration::from_secs(5)).unwrap();
        assert_eq!(remote.base_url(), "http://localhost:5000/api");
        assert_eq!(remote.url("/notes"), "http://localhost:5000/api/notes");
    }

    #[test]
    fn item_paths_use_plural_kind() {
        assert_eq!(HttpRemote::item_path::<Note>(&ItemId::new("42")), "/notes/42");
    }

    #[tokio::test]
    async fn unreachable_server_is_a_transport_failure() {
        let remote = HttpRemote::new("http://127.0.0.1:9", Duration::from_secs(2)).unwrap();
        let err = remote
            .login(&Credentials {
                email: "a@b".into(),
                password: "x".into(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.class(), crate::error::ErrorClass::Transport);
    }
}
