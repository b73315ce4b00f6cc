use crate::{
    endpoints::Gateway,
    error::{ApiError, Failure},
    tasks::{ListParams, Task, TaskFields, TaskPage},
    TaskId,
};
use reqwest::Method;

pub(crate) const CREATE_FAILED: &str = "Error creating task";
pub(crate) const FETCH_FAILED: &str = "Error fetching tasks";
pub(crate) const UPDATE_FAILED: &str = "Error updating task";
pub(crate) const DELETE_FAILED: &str = "Error deleting task";

/// Create a task from the fields in `body`.
///
/// The backend expects `user_id` and `email` to be part of `body`.
pub async fn create_task(
    gateway: &Gateway,
    token: &str,
    body: &TaskFields,
) -> Result<Task, ApiError> {
    finish(send_create(gateway, token, body).await, CREATE_FAILED)
}

/// Fetch a page of tasks, filtered by `params`.
///
/// The backend expects `user_id` to be one of the `params`.
pub async fn get_all_tasks(
    gateway: &Gateway,
    token: &str,
    params: &ListParams,
) -> Result<TaskPage, ApiError> {
    finish(send_get_all(gateway, token, params).await, FETCH_FAILED)
}

/// Apply a partial update to a task.
///
/// The backend expects `body` to contain `task_id` and `user_id`.
pub async fn update_task(
    gateway: &Gateway,
    token: &str,
    body: &TaskFields,
) -> Result<Task, ApiError> {
    finish(send_update(gateway, token, body).await, UPDATE_FAILED)
}

/// Delete a task. The task is addressed with a `task_id` query parameter.
pub async fn delete_task(
    gateway: &Gateway,
    token: &str,
    id: &TaskId,
) -> Result<(), ApiError> {
    finish(send_delete(gateway, token, id).await, DELETE_FAILED)
}

async fn send_create(
    gateway: &Gateway,
    token: &str,
    body: &TaskFields,
) -> Result<Task, Failure> {
    let request = gateway
        .request(Method::POST, "createTask", Some(token))?
        .json(body);

    gateway.send_json(request).await
}

async fn send_get_all(
    gateway: &Gateway,
    token: &str,
    params: &ListParams,
) -> Result<TaskPage, Failure> {
    let request = gateway
        .request(Method::GET, "getAllTask", Some(token))?
        .query(params.as_pairs().as_slice());

    gateway.send_json(request).await
}

async fn send_update(
    gateway: &Gateway,
    token: &str,
    body: &TaskFields,
) -> Result<Task, Failure> {
    let request = gateway
        .request(Method::PATCH, "updateTask", Some(token))?
        .json(body);

    gateway.send_json(request).await
}

async fn send_delete(
    gateway: &Gateway,
    token: &str,
    id: &TaskId,
) -> Result<(), Failure> {
    let request = gateway
        .request(Method::DELETE, "deleteTask", Some(token))?
        .query(&[("task_id", &**id)]);
    gateway.send_opaque(request).await?;

    Ok(())
}

fn finish<T>(
    outcome: Result<T, Failure>,
    default_message: &str,
) -> Result<T, ApiError> {
    outcome.map_err(|e| {
        log::debug!("{}: {}", default_message, e);
        e.into_api_error(default_message)
    })
}
