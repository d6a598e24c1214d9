//! Query builders for PostgrestClient

use reqwest::Client;
use serde::{de::DeserializeOwned, Serialize};

use crate::auth::{live_token, SharedSession};
use crate::data::Filter;
use crate::error::Error;
use crate::fetch::{Fetch, FetchBuilder};

/// State shared by every builder: where to send the request and how to sign it
#[derive(Clone)]
pub(crate) struct RequestContext {
    pub(crate) url: String,
    pub(crate) key: String,
    pub(crate) client: Client,
    pub(crate) session: SharedSession,
    pub(crate) client_info: String,
    pub(crate) schema: String,
}

impl RequestContext {
    /// Attach API key, bearer token and schema headers.
    ///
    /// Requests carry the signed-in user's token so row-level security sees
    /// the user; without a live session the anon key is used as the bearer.
    async fn sign<'a>(&self, fetch: FetchBuilder<'a>, write: bool) -> FetchBuilder<'a> {
        let token = live_token(&self.session)
            .await
            .unwrap_or_else(|| self.key.clone());

        let fetch = fetch
            .header("apikey", &self.key)
            .header("X-Client-Info", &self.client_info)
            .bearer_auth(&token);

        if self.schema == "public" {
            fetch
        } else if write {
            fetch.header("Content-Profile", &self.schema)
        } else {
            fetch.header("Accept-Profile", &self.schema)
        }
    }
}

/// Query parameters in the order they were added
#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    params: Vec<(String, String)>,
}

impl QueryBuilder {
    /// Create a new QueryBuilder
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a parameter to the query, replacing an earlier one with the same key
    pub fn add_param(&mut self, key: &str, value: &str) {
        self.params.retain(|(k, _)| k != key);
        self.params.push((key.to_string(), value.to_string()));
    }

    /// Add a row filter
    pub fn add_filter(&mut self, filter: &Filter) {
        let (column, value) = filter.to_param();
        self.params.push((column, value));
    }

    /// Get the query parameters
    pub fn get_params(&self) -> &[(String, String)] {
        &self.params
    }
}

/// Builder for SELECT queries
pub struct SelectBuilder {
    ctx: RequestContext,
    query: QueryBuilder,
}

impl SelectBuilder {
    pub(crate) fn new(ctx: RequestContext, columns: &str) -> Self {
        let mut query = QueryBuilder::new();
        query.add_param("select", columns);
        Self { ctx, query }
    }

    /// Filter rows where column equals a value
    pub fn eq<T: ToString>(&mut self, column: &str, value: T) -> &mut Self {
        self.query.add_filter(&Filter::eq(column, value));
        self
    }

    /// Filter rows where column is in a list of values
    pub fn in_list<T: ToString>(&mut self, column: &str, values: &[T]) -> &mut Self {
        self.query.add_filter(&Filter::in_list(column, values));
        self
    }

    /// Add an arbitrary filter
    pub fn filter(&mut self, filter: &Filter) -> &mut Self {
        self.query.add_filter(filter);
        self
    }

    /// Limit the number of rows returned
    pub fn limit(&mut self, count: usize) -> &mut Self {
        self.query.add_param("limit", &count.to_string());
        self
    }

    /// Order the results by a column
    pub fn order(&mut self, column: &str, ascending: bool) -> &mut Self {
        let direction = if ascending { "asc" } else { "desc" };
        self.query.add_param("order", &format!("{}.{}", column, direction));
        self
    }

    /// Retrieve a single row
    pub fn single(&mut self) -> &mut Self {
        self.limit(1)
    }

    /// Execute the query and return the results
    pub async fn execute<T: DeserializeOwned>(&self) -> Result<Vec<T>, Error> {
        let fetch = Fetch::get(&self.ctx.client, &self.ctx.url).query(self.query.get_params());
        self.ctx.sign(fetch, false).await.execute::<Vec<T>>().await
    }
}

/// Builder for INSERT queries
pub struct InsertBuilder<T: Serialize> {
    ctx: RequestContext,
    values: T,
}

impl<T: Serialize> InsertBuilder<T> {
    pub(crate) fn new(ctx: RequestContext, values: T) -> Self {
        Self { ctx, values }
    }

    /// Execute the query and return the inserted rows
    pub async fn execute<R: DeserializeOwned>(&self) -> Result<Vec<R>, Error> {
        let fetch = Fetch::post(&self.ctx.client, &self.ctx.url)
            .header("Prefer", "return=representation")
            .json(&self.values)?;
        self.ctx.sign(fetch, true).await.execute::<Vec<R>>().await
    }
}

/// Builder for UPDATE queries
pub struct UpdateBuilder<T: Serialize> {
    ctx: RequestContext,
    values: T,
    query: QueryBuilder,
}

impl<T: Serialize> UpdateBuilder<T> {
    pub(crate) fn new(ctx: RequestContext, values: T) -> Self {
        Self {
            ctx,
            values,
            query: QueryBuilder::new(),
        }
    }

    /// Filter rows where column equals a value
    pub fn eq<V: ToString>(&mut self, column: &str, value: V) -> &mut Self {
        self.query.add_filter(&Filter::eq(column, value));
        self
    }

    /// Add an arbitrary filter
    pub fn filter(&mut self, filter: &Filter) -> &mut Self {
        self.query.add_filter(filter);
        self
    }

    /// Execute the query and return the updated rows
    pub async fn execute<R: DeserializeOwned>(&self) -> Result<Vec<R>, Error> {
        let fetch = Fetch::patch(&self.ctx.client, &self.ctx.url)
            .header("Prefer", "return=representation")
            .query(self.query.get_params())
            .json(&self.values)?;
        self.ctx.sign(fetch, true).await.execute::<Vec<R>>().await
    }
}

/// Builder for DELETE queries
pub struct DeleteBuilder {
    ctx: RequestContext,
    query: QueryBuilder,
}

impl DeleteBuilder {
    pub(crate) fn new(ctx: RequestContext) -> Self {
        Self {
            ctx,
            query: QueryBuilder::new(),
        }
    }

    /// Filter rows where column equals a value
    pub fn eq<V: ToString>(&mut self, column: &str, value: V) -> &mut Self {
        self.query.add_filter(&Filter::eq(column, value));
        self
    }

    /// Add an arbitrary filter
    pub fn filter(&mut self, filter: &Filter) -> &mut Self {
        self.query.add_filter(filter);
        self
    }

    /// Execute the query and return the deleted rows
    pub async fn execute<R: DeserializeOwned>(&self) -> Result<Vec<R>, Error> {
        let fetch = Fetch::delete(&self.ctx.client, &self.ctx.url)
            .header("Prefer", "return=representation")
            .query(self.query.get_params());
        self.ctx.sign(fetch, true).await.execute::<Vec<R>>().await
    }
}
