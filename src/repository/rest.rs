//! REST Row Backend
//!
//! Talks to a PostgREST-style endpoint (`/rest/v1/<table>`). Requests carry
//! the project key as `apikey` and the session token as a bearer token;
//! every query filters on `user_id`.

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response};
use serde::Deserialize;

use super::traits::{ItemRow, NewItemRow, RowBackend};
use crate::config::SyncConfig;
use crate::domain::{DomainError, DomainResult, ItemId, Session};

pub struct RestRowBackend {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    table: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

impl RestRowBackend {
    pub fn new(config: &SyncConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.url.trim_end_matches('/').to_string(),
            api_key: config.token.clone(),
            table: config.table.clone(),
        }
    }

    fn table_url(&self) -> String {
        format!("{}/rest/v1/{}", self.base_url, self.table)
    }

    fn request(&self, method: Method, session: &Session) -> RequestBuilder {
        self.client
            .request(method, self.table_url())
            .header("apikey", &self.api_key)
            .bearer_auth(&session.access_token)
    }

    fn owner_filter(session: &Session) -> (&'static str, String) {
        ("user_id", format!("eq.{}", session.owner_id))
    }

    fn select_request(&self, session: &Session) -> RequestBuilder {
        self.request(Method::GET, session).query(&[
            ("select", "*".to_string()),
            Self::owner_filter(session),
            ("order", "position.asc.nullslast,created_at.asc".to_string()),
        ])
    }

    fn insert_request(&self, session: &Session, rows: &[NewItemRow], returning: bool) -> RequestBuilder {
        let prefer = if returning {
            "return=representation"
        } else {
            "return=minimal"
        };
        self.request(Method::POST, session)
            .header("Prefer", prefer)
            .json(rows)
    }

    fn upsert_request(&self, session: &Session, rows: &[ItemRow]) -> RequestBuilder {
        self.request(Method::POST, session)
            .query(&[("on_conflict", "id")])
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(rows)
    }

    fn delete_request(&self, session: &Session, id: &ItemId) -> RequestBuilder {
        self.request(Method::DELETE, session).query(&[
            ("id", format!("eq.{}", id)),
            Self::owner_filter(session),
        ])
    }
}

/// Prefer the server's own message; fall back to status and body
fn error_message(status: reqwest::StatusCode, body: &str) -> String {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) => parsed.message,
        Err(_) if body.trim().is_empty() => status.to_string(),
        Err(_) => format!("{}: {}", status, body.trim()),
    }
}

async fn send(builder: RequestBuilder) -> DomainResult<Response> {
    let response = builder
        .send()
        .await
        .map_err(|e| DomainError::Remote(e.to_string()))?;

    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(DomainError::Remote(error_message(status, &body)))
}

#[async_trait]
impl RowBackend for RestRowBackend {
    async fn select_ordered(&self, session: &Session) -> DomainResult<Vec<ItemRow>> {
        send(self.select_request(session))
            .await?
            .json::<Vec<ItemRow>>()
            .await
            .map_err(|e| DomainError::Remote(e.to_string()))
    }

    async fn insert_one(&self, session: &Session, row: NewItemRow) -> DomainResult<ItemRow> {
        let mut inserted = send(self.insert_request(session, &[row], true))
            .await?
            .json::<Vec<ItemRow>>()
            .await
            .map_err(|e| DomainError::Remote(e.to_string()))?;
        inserted
            .pop()
            .ok_or_else(|| DomainError::Remote("Insert returned no row".to_string()))
    }

    async fn insert_many(&self, session: &Session, rows: Vec<NewItemRow>) -> DomainResult<()> {
        send(self.insert_request(session, &rows, false)).await?;
        Ok(())
    }

    async fn upsert_many(&self, session: &Session, rows: Vec<ItemRow>) -> DomainResult<()> {
        send(self.upsert_request(session, &rows)).await?;
        Ok(())
    }

    async fn delete_one(&self, session: &Session, id: &ItemId) -> DomainResult<()> {
        send(self.delete_request(session, id)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::OwnerId;

    fn backend() -> RestRowBackend {
        RestRowBackend::new(&SyncConfig::new("https://db.example.com/", "anon-key"))
    }

    fn session() -> Session {
        Session::new("user-token", OwnerId::new("user-1"))
    }

    fn header<'a>(request: &'a reqwest::Request, name: &str) -> &'a str {
        request.headers()[name].to_str().unwrap()
    }

    #[test]
    fn test_select_filters_and_orders() {
        let request = backend().select_request(&session()).build().unwrap();
        assert_eq!(request.method(), Method::GET);
        assert_eq!(request.url().path(), "/rest/v1/todos");

        let query: Vec<(String, String)> = request.url().query_pairs().into_owned().collect();
        assert!(query.contains(&("user_id".to_string(), "eq.user-1".to_string())));
        assert!(query.contains(&(
            "order".to_string(),
            "position.asc.nullslast,created_at.asc".to_string()
        )));
        assert_eq!(header(&request, "apikey"), "anon-key");
        assert_eq!(header(&request, "authorization"), "Bearer user-token");
    }

    #[test]
    fn test_insert_one_asks_for_the_row_back() {
        let row = NewItemRow {
            content: "Buy milk".to_string(),
            is_completed: false,
            position: 2,
            user_id: OwnerId::new("user-1"),
        };
        let request = backend()
            .insert_request(&session(), &[row], true)
            .build()
            .unwrap();
        assert_eq!(request.method(), Method::POST);
        assert_eq!(header(&request, "prefer"), "return=representation");

        let body: serde_json::Value =
            serde_json::from_slice(request.body().unwrap().as_bytes().unwrap()).unwrap();
        assert_eq!(body[0]["content"], "Buy milk");
        assert_eq!(body[0]["position"], 2);
        assert_eq!(body[0]["user_id"], "user-1");
    }

    #[test]
    fn test_upsert_merges_on_id_without_timestamps() {
        let row = ItemRow {
            id: ItemId::new("7"),
            content: "Pay rent".to_string(),
            is_completed: true,
            position: Some(0),
            created_at: None,
            user_id: OwnerId::new("user-1"),
        };
        let request = backend().upsert_request(&session(), &[row]).build().unwrap();
        assert_eq!(request.url().query(), Some("on_conflict=id"));
        assert!(header(&request, "prefer").contains("resolution=merge-duplicates"));

        let body: serde_json::Value =
            serde_json::from_slice(request.body().unwrap().as_bytes().unwrap()).unwrap();
        assert!(body[0].get("created_at").is_none());
        assert_eq!(body[0]["id"], "7");
    }

    #[test]
    fn test_delete_is_owner_scoped() {
        let request = backend()
            .delete_request(&session(), &ItemId::new("7"))
            .build()
            .unwrap();
        assert_eq!(request.method(), Method::DELETE);
        assert_eq!(request.url().query(), Some("id=eq.7&user_id=eq.user-1"));
    }

    #[test]
    fn test_error_message_prefers_server_text() {
        let status = reqwest::StatusCode::UNAUTHORIZED;
        assert_eq!(error_message(status, r#"{"message":"JWT expired"}"#), "JWT expired");
        assert_eq!(error_message(status, ""), "401 Unauthorized");
        assert_eq!(error_message(status, "nope"), "401 Unauthorized: nope");
    }

    #[test]
    fn test_rows_parse_numeric_ids() {
        let rows: Vec<ItemRow> = serde_json::from_str(
            r#"[{"id": 3, "content": "a", "is_completed": false, "position": null,
                 "created_at": "2024-05-01T10:00:00+00:00", "user_id": "user-1"}]"#,
        )
        .unwrap();
        assert_eq!(rows[0].id, ItemId::new("3"));
        assert_eq!(rows[0].position, None);
        assert!(rows[0].created_at.is_some());
    }
}
