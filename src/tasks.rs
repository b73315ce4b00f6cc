//! Tasks and the repository used to manage them.

use crate::{
    endpoints::{self, Gateway},
    error::{ApiError, Failure},
    session::{Session, SessionContext},
    TaskId,
};
use serde_derive::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// The fields sent when creating or updating a task.
pub type TaskFields = Map<String, Value>;

/// A single task, as the backend describes it.
///
/// Tasks are opaque JSON objects; the only thing this crate looks at is the
/// identifier.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Task {
    fields: Map<String, Value>,
}

impl Task {
    /// The task's identifier, read from `task_id` (or `id` as a fallback).
    pub fn id(&self) -> Option<TaskId> {
        ["task_id", "id"]
            .iter()
            .filter_map(|key| self.fields.get(*key))
            .find_map(|value| match value {
                Value::String(s) if !s.is_empty() => {
                    Some(TaskId::from(s.as_str()))
                },
                Value::Number(n) => Some(TaskId::from(n.to_string())),
                _ => None,
            })
    }

    pub fn get(&self, key: &str) -> Option<&Value> { self.fields.get(key) }

    pub fn fields(&self) -> &Map<String, Value> { &self.fields }

    pub fn into_fields(self) -> Map<String, Value> { self.fields }
}

impl From<Map<String, Value>> for Task {
    fn from(fields: Map<String, Value>) -> Task { Task { fields } }
}

/// One page of tasks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskPage {
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub pagination: Pagination,
}

impl TaskPage {
    /// The total number of tasks matching the query, across all pages.
    pub fn total(&self) -> u64 {
        self.pagination
            .total
            .unwrap_or_else(|| self.tasks.len() as u64)
    }
}

/// Pagination metadata accompanying a [`TaskPage`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pagination {
    #[serde(
        default,
        alias = "total_tasks",
        alias = "totalTasks",
        skip_serializing_if = "Option::is_none"
    )]
    pub total: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u64>,
    #[serde(
        default,
        alias = "per_page",
        skip_serializing_if = "Option::is_none"
    )]
    pub limit: Option<u64>,
    #[serde(
        default,
        alias = "totalPages",
        skip_serializing_if = "Option::is_none"
    )]
    pub total_pages: Option<u64>,
    /// Anything else the backend sent.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Query parameters used to filter and paginate tasks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListParams(BTreeMap<String, String>);

impl ListParams {
    pub fn new() -> Self { ListParams::default() }

    pub fn with(
        mut self,
        key: impl Into<String>,
        value: impl ToString,
    ) -> Self {
        self.insert(key, value);
        self
    }

    pub fn page(self, page: u32) -> Self { self.with("page", page) }

    pub fn limit(self, limit: u32) -> Self { self.with("limit", limit) }

    pub fn insert(&mut self, key: impl Into<String>, value: impl ToString) {
        self.0.insert(key.into(), value.to_string());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub(crate) fn as_pairs(&self) -> Vec<(&str, &str)> { self.iter().collect() }
}

/// CRUD operations over the logged in user's tasks.
///
/// Every operation needs a [`Session`]; without one it fails immediately
/// with [`ErrorKind::NotAuthenticated`] and nothing is sent.
///
/// [`ErrorKind::NotAuthenticated`]: crate::ErrorKind::NotAuthenticated
#[derive(Debug, Clone)]
pub struct TaskRepository {
    gateway: Gateway,
    session: SessionContext,
}

impl TaskRepository {
    pub fn new(gateway: Gateway, session: SessionContext) -> Self {
        TaskRepository { gateway, session }
    }

    pub fn session(&self) -> &SessionContext { &self.session }

    /// Create a task owned by the current user.
    pub async fn create(
        &self,
        mut fields: TaskFields,
    ) -> Result<Task, ApiError> {
        let session = self.identity(endpoints::CREATE_FAILED)?;
        fields.insert(String::from("user_id"), Value::from(session.user_id));
        fields.insert(String::from("email"), Value::from(session.email));

        endpoints::create_task(&self.gateway, &session.token, &fields).await
    }

    /// Fetch a page of the current user's tasks.
    pub async fn list(
        &self,
        params: &ListParams,
    ) -> Result<TaskPage, ApiError> {
        let session = self.identity(endpoints::FETCH_FAILED)?;
        let params = params.clone().with("user_id", session.user_id);

        endpoints::get_all_tasks(&self.gateway, &session.token, &params).await
    }

    /// Update some of a task's fields, leaving the rest alone.
    pub async fn update(
        &self,
        id: &TaskId,
        mut fields: TaskFields,
    ) -> Result<Task, ApiError> {
        let session = self.identity(endpoints::UPDATE_FAILED)?;
        fields.insert(String::from("task_id"), Value::from(id.to_string()));
        fields.insert(String::from("user_id"), Value::from(session.user_id));

        endpoints::update_task(&self.gateway, &session.token, &fields).await
    }

    pub async fn delete(&self, id: &TaskId) -> Result<(), ApiError> {
        let session = self.identity(endpoints::DELETE_FAILED)?;

        endpoints::delete_task(&self.gateway, &session.token, id).await
    }

    fn identity(&self, default_message: &str) -> Result<Session, ApiError> {
        match self.session.current() {
            Some(session) if !session.user_id.is_empty() => Ok(session),
            _ => {
                log::debug!("{}: nobody is logged in", default_message);
                Err(Failure::NotAuthenticated.into_api_error(default_message))
            },
        }
    }
}
