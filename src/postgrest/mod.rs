//! Database operations through the PostgREST API

mod query;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::debug;

use crate::auth::SharedSession;
use crate::config::ClientOptions;
use crate::data::{DataClient, Filter, Query, Row};
use crate::error::{Error, Result};

pub use query::*;

/// Client for database operations on one table
pub struct PostgrestClient {
    ctx: RequestContext,
}

impl PostgrestClient {
    /// Select specific columns from the table
    pub fn select(&self, columns: &str) -> SelectBuilder {
        SelectBuilder::new(self.ctx.clone(), columns)
    }

    /// Insert data into the table
    pub fn insert<T: Serialize>(&self, values: T) -> InsertBuilder<T> {
        InsertBuilder::new(self.ctx.clone(), values)
    }

    /// Update data in the table
    pub fn update<T: Serialize>(&self, values: T) -> UpdateBuilder<T> {
        UpdateBuilder::new(self.ctx.clone(), values)
    }

    /// Delete data from the table
    pub fn delete(&self) -> DeleteBuilder {
        DeleteBuilder::new(self.ctx.clone())
    }
}

/// [`DataClient`] backed by a Supabase project's REST endpoint
#[derive(Clone)]
pub struct RestBackend {
    url: String,
    key: String,
    client: Client,
    session: SharedSession,
    options: ClientOptions,
}

impl RestBackend {
    /// Create a backend sharing `session` with the auth client
    pub(crate) fn new(
        url: &str,
        key: &str,
        client: Client,
        session: SharedSession,
        options: ClientOptions,
    ) -> Self {
        Self {
            url: url.to_string(),
            key: key.to_string(),
            client,
            session,
            options,
        }
    }

    /// Create a new PostgrestClient for a specific table or view
    pub fn from(&self, table: &str) -> PostgrestClient {
        PostgrestClient {
            ctx: RequestContext {
                url: format!("{}/rest/v1/{}", self.url, table),
                key: self.key.clone(),
                client: self.client.clone(),
                session: self.session.clone(),
                client_info: self.options.client_info.clone(),
                schema: self.options.db_schema.clone(),
            },
        }
    }
}

#[async_trait]
impl DataClient for RestBackend {
    async fn select(&self, query: Query) -> Result<Vec<Row>> {
        debug!(table = %query.table, filters = query.filters.len(), "select");
        let mut select = self.from(&query.table).select(&query.columns);
        for filter in &query.filters {
            select.filter(filter);
        }
        if let Some((column, ascending)) = &query.order {
            select.order(column, *ascending);
        }
        if let Some(limit) = query.limit {
            select.limit(limit);
        }
        select.execute::<Row>().await
    }

    async fn insert(&self, table: &str, row: Row) -> Result<Row> {
        debug!(table, "insert");
        let mut rows = self.from(table).insert(row).execute::<Row>().await?;
        rows.pop()
            .ok_or_else(|| Error::database("No row returned after insert"))
    }

    async fn update(&self, table: &str, patch: Row, filters: Vec<Filter>) -> Result<Vec<Row>> {
        debug!(table, filters = filters.len(), "update");
        let mut update = self.from(table).update(patch);
        for filter in &filters {
            update.filter(filter);
        }
        update.execute::<Row>().await
    }

    async fn delete(&self, table: &str, filters: Vec<Filter>) -> Result<Vec<Row>> {
        debug!(table, filters = filters.len(), "delete");
        if filters.is_empty() {
            return Err(Error::database("Refusing to delete without a filter"));
        }
        let mut delete = self.from(table).delete();
        for filter in &filters {
            delete.filter(filter);
        }
        delete.execute::<Row>().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Session;
    use serde_json::json;
    use std::sync::Arc;
    use tokio::sync::RwLock;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn backend_for(server: &MockServer, session: Option<Session>) -> RestBackend {
        RestBackend::new(
            &server.uri(),
            "fake-key",
            Client::new(),
            Arc::new(RwLock::new(session)),
            ClientOptions::default(),
        )
    }

    #[tokio::test]
    async fn select_translates_query() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rest/v1/tasks"))
            .and(query_param("select", "*"))
            .and(query_param("event_id", "eq.e1"))
            .and(query_param("order", "created_at.desc"))
            .and(header("apikey", "fake-key"))
            .and(header("Authorization", "Bearer fake-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "id": "t2", "name": "Order food" },
                { "id": "t1", "name": "Book venue" }
            ])))
            .mount(&server)
            .await;

        let backend = backend_for(&server, None);
        let rows = backend
            .select(Query::table("tasks").eq("event_id", "e1").order("created_at", false))
            .await
            .unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["id"], "t2");
    }

    #[tokio::test]
    async fn in_filter_and_session_token() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rest/v1/events"))
            .and(query_param("select", "id,name"))
            .and(query_param("id", "in.(e1,e2)"))
            .and(header("Authorization", "Bearer user-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "id": "e1", "name": "Hackathon" }
            ])))
            .mount(&server)
            .await;

        let session = Session::new("user-token".into(), "r".into(), "u1".into(), 3600);
        let backend = backend_for(&server, Some(session));
        let rows = backend
            .select(Query::table("events").select("id,name").in_list("id", &["e1", "e2"]))
            .await
            .unwrap();

        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn expired_session_falls_back_to_anon_key() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rest/v1/events"))
            .and(header("Authorization", "Bearer fake-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let session = Session::new("stale-token".into(), "r".into(), "u1".into(), -60);
        let backend = backend_for(&server, Some(session));
        let rows = backend.select(Query::table("events")).await.unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn insert_returns_representation() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/rest/v1/ideas"))
            .and(header("Prefer", "return=representation"))
            .and(body_json(json!({ "event_id": "e1", "person_name": "Ada", "idea_text": "Robots" })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!([
                { "id": "i1", "event_id": "e1", "person_name": "Ada", "idea_text": "Robots" }
            ])))
            .mount(&server)
            .await;

        let backend = backend_for(&server, None);
        let row = json!({ "event_id": "e1", "person_name": "Ada", "idea_text": "Robots" });
        let stored = backend
            .insert("ideas", row.as_object().cloned().unwrap())
            .await
            .unwrap();

        assert_eq!(stored["id"], "i1");
    }

    #[tokio::test]
    async fn delete_by_filter_and_error_message() {
        let server = MockServer::start().await;

        Mock::given(method("DELETE"))
            .and(path("/rest/v1/work_logs"))
            .and(query_param("event_id", "eq.e1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "id": "w1" }, { "id": "w2" }
            ])))
            .mount(&server)
            .await;

        Mock::given(method("DELETE"))
            .and(path("/rest/v1/tasks"))
            .respond_with(ResponseTemplate::new(409).set_body_json(json!({
                "code": "23503",
                "message": "update or delete on table violates foreign key constraint"
            })))
            .mount(&server)
            .await;

        let backend = backend_for(&server, None);
        let deleted = backend
            .delete("work_logs", vec![Filter::eq("event_id", "e1")])
            .await
            .unwrap();
        assert_eq!(deleted.len(), 2);

        let err = backend
            .delete("tasks", vec![Filter::eq("event_id", "e1")])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Database(_)));
        assert!(err.to_string().contains("foreign key constraint"));

        assert!(backend.delete("tasks", vec![]).await.is_err());
    }

    #[tokio::test]
    async fn update_patches_matching_rows() {
        let server = MockServer::start().await;

        Mock::given(method("PATCH"))
            .and(path("/rest/v1/tasks"))
            .and(query_param("id", "eq.t1"))
            .and(body_json(json!({ "status": "completed" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "id": "t1", "status": "completed" }
            ])))
            .mount(&server)
            .await;

        let backend = backend_for(&server, None);
        let patch = json!({ "status": "completed" }).as_object().cloned().unwrap();
        let rows = backend
            .update("tasks", patch, vec![Filter::eq("id", "t1")])
            .await
            .unwrap();
        assert_eq!(rows[0]["status"], "completed");
    }
}
