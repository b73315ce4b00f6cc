//! A client for the Taskboard task-management API.
//!
//! The pieces fit together like this:
//!
//! - a [`Config`] says where the backend lives,
//! - a [`Gateway`] sends requests to it,
//! - a [`SessionContext`] holds the logged in user's identity and is shared
//!   by the [`SessionStore`] (login, logout, registration) and the
//!   [`TaskRepository`] (task CRUD), and
//! - a [`TaskListStore`] caches the last page of tasks for UIs to watch.
//!
//! Every remote operation fails with the same [`ApiError`].

#![forbid(unsafe_code)]

#[cfg(test)]
#[macro_use]
extern crate pretty_assertions;

mod config;
pub mod endpoints;
mod error;
mod id;
mod session;
mod store;
mod tasks;
#[cfg(test)]
mod test_support;

pub use config::{Config, ConfigError, BACKEND_URL_VAR};
pub use endpoints::{Gateway, Registration};
pub use error::{
    ApiError, ErrorKind, FAILURE_RESPONSE_CODE, GENERIC_ERROR_MESSAGE,
};
pub use id::TaskId;
pub use session::{
    FileStorage, LoggedIn, MemoryStorage, Session, SessionContext,
    SessionStorage, SessionStore, StorageError,
};
pub use store::{TaskListState, TaskListStore};
pub use tasks::{
    ListParams, Pagination, Task, TaskFields, TaskPage, TaskRepository,
};

/// The default user agent to use when communicating with the backend.
pub const DEFAULT_USER_AGENT: &str =
    concat!(env!("CARGO_PKG_NAME"), "-", env!("CARGO_PKG_VERSION"));
