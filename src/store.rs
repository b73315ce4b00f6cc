//! A reactive cache of the most recently loaded page of tasks.

use crate::{
    error::ApiError,
    tasks::{ListParams, Task, TaskFields, TaskRepository},
    TaskId,
};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use tokio::sync::watch;

/// Everything a UI needs to render the task list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskListState {
    pub tasks: Vec<Task>,
    pub total_tasks: u64,
    /// Is a load currently in flight?
    pub loading: bool,
}

/// Keeps the last page of tasks fetched through a [`TaskRepository`] and
/// notifies subscribers whenever it changes.
///
/// When several loads overlap, only the most recently started one is allowed
/// to update the list, no matter which order the responses arrive in.
#[derive(Debug)]
pub struct TaskListStore {
    repository: TaskRepository,
    state: watch::Sender<TaskListState>,
    latest_load: AtomicU64,
    in_flight: AtomicUsize,
}

impl TaskListStore {
    pub fn new(repository: TaskRepository) -> Self {
        let (state, _) = watch::channel(TaskListState::default());

        TaskListStore {
            repository,
            state,
            latest_load: AtomicU64::new(0),
            in_flight: AtomicUsize::new(0),
        }
    }

    pub fn repository(&self) -> &TaskRepository { &self.repository }

    /// Get notified every time the list or the loading flag changes.
    pub fn subscribe(&self) -> watch::Receiver<TaskListState> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> TaskListState { self.state.borrow().clone() }

    pub fn tasks(&self) -> Vec<Task> { self.state.borrow().tasks.clone() }

    pub fn total_tasks(&self) -> u64 { self.state.borrow().total_tasks }

    pub fn loading(&self) -> bool { self.state.borrow().loading }

    /// Reload the list using `params`.
    ///
    /// This never fails. If the backend can't give us the tasks the error is
    /// logged and the previous list is kept.
    pub async fn load_tasks(&self, params: &ListParams) {
        let generation = self.latest_load.fetch_add(1, Ordering::SeqCst) + 1;
        let _loading = Loading::start(self);

        match self.repository.list(params).await {
            Ok(page) => {
                let total = page.total();
                let committed = self.state.send_if_modified(|state| {
                    if self.latest_load.load(Ordering::SeqCst) != generation {
                        return false;
                    }
                    state.tasks = page.tasks;
                    state.total_tasks = total;
                    true
                });

                if committed {
                    log::debug!("Loaded {} tasks", total);
                } else {
                    log::debug!(
                        "Discarding load #{} because a newer one was started",
                        generation
                    );
                }
            },
            Err(e) => {
                log::error!("Failed to load tasks: {}", e);
            },
        }
    }

    pub async fn create_task(
        &self,
        fields: TaskFields,
    ) -> Result<Task, ApiError> {
        self.repository.create(fields).await
    }

    pub async fn update_task(
        &self,
        id: &TaskId,
        fields: TaskFields,
    ) -> Result<Task, ApiError> {
        self.repository.update(id, fields).await
    }

    pub async fn delete_task(&self, id: &TaskId) -> Result<(), ApiError> {
        self.repository.delete(id).await
    }
}

/// Keeps the `loading` flag set for as long as it's alive.
struct Loading<'a> {
    store: &'a TaskListStore,
}

impl<'a> Loading<'a> {
    fn start(store: &'a TaskListStore) -> Self {
        store.state.send_modify(|state| {
            store.in_flight.fetch_add(1, Ordering::SeqCst);
            state.loading = true;
        });

        Loading { store }
    }
}

impl Drop for Loading<'_> {
    fn drop(&mut self) {
        let store = self.store;

        store.state.send_modify(|state| {
            let remaining = store.in_flight.fetch_sub(1, Ordering::SeqCst) - 1;
            state.loading = remaining > 0;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        session::{Session, SessionContext},
        test_support::{MockBackend, MockResponse},
    };
    use serde_json::json;
    use std::time::Duration;

    fn logged_in() -> SessionContext {
        let session = SessionContext::in_memory();
        session.set(Session::new("42", "a@b.com", "tkn")).unwrap();
        session
    }

    fn page(ids: &[&str], total: u64) -> MockResponse {
        let tasks: Vec<_> =
            ids.iter().map(|id| json!({ "task_id": id })).collect();

        MockResponse::json(
            200,
            json!({ "tasks": tasks, "pagination": { "total": total } }),
        )
    }

    fn ids(state: &TaskListState) -> Vec<TaskId> {
        state.tasks.iter().filter_map(Task::id).collect()
    }

    #[tokio::test]
    async fn successful_loads_replace_the_list() {
        let backend = MockBackend::start(|_| page(&["1", "2"], 20)).await;
        let store = TaskListStore::new(TaskRepository::new(
            backend.gateway(),
            logged_in(),
        ));
        let mut changes = store.subscribe();

        store.load_tasks(&ListParams::new().page(1)).await;

        let state = store.snapshot();
        assert_eq!(ids(&state), vec![TaskId::from("1"), TaskId::from("2")]);
        assert_eq!(state.total_tasks, 20);
        assert!(!state.loading);
        assert!(changes.has_changed().unwrap());
        assert_eq!(*changes.borrow_and_update(), state);
    }

    #[tokio::test]
    async fn failed_loads_keep_the_previous_list() {
        let backend = MockBackend::start(|request| {
            match request.query.get("page").map(String::as_str) {
                Some("1") => page(&["1"], 1),
                _ => MockResponse::empty(500),
            }
        })
        .await;
        let store = TaskListStore::new(TaskRepository::new(
            backend.gateway(),
            logged_in(),
        ));
        store.load_tasks(&ListParams::new().page(1)).await;
        let before = store.snapshot();

        store.load_tasks(&ListParams::new().page(2)).await;

        assert_eq!(store.snapshot(), before);
        assert_eq!(store.total_tasks(), 1);
        assert!(!store.loading());
    }

    #[tokio::test]
    async fn loading_is_released_without_a_session() {
        let backend = MockBackend::start(|_| page(&["1"], 1)).await;
        let store = TaskListStore::new(TaskRepository::new(
            backend.gateway(),
            SessionContext::in_memory(),
        ));

        store.load_tasks(&ListParams::new()).await;

        assert_eq!(store.snapshot(), TaskListState::default());
        assert!(backend.requests().is_empty());
    }

    #[tokio::test]
    async fn loading_is_released_on_transport_failure() {
        let store = TaskListStore::new(TaskRepository::new(
            MockBackend::unreachable().await,
            logged_in(),
        ));

        store.load_tasks(&ListParams::new()).await;

        assert!(!store.loading());
        assert!(store.tasks().is_empty());
    }

    #[tokio::test]
    async fn loading_is_set_while_a_request_is_in_flight() {
        let backend = MockBackend::start(|_| {
            page(&["1"], 1).delayed(Duration::from_millis(200))
        })
        .await;
        let store = TaskListStore::new(TaskRepository::new(
            backend.gateway(),
            logged_in(),
        ));
        let mut changes = store.subscribe();
        let params = ListParams::new();

        let watcher = async {
            changes.changed().await.unwrap();
            changes.borrow().loading
        };
        let (saw_loading, _) =
            tokio::join!(watcher, store.load_tasks(&params));

        assert!(saw_loading);
        assert!(!store.loading());
    }

    #[tokio::test]
    async fn a_slow_old_load_never_overwrites_a_newer_one() {
        let backend = MockBackend::start(|request| {
            match request.query.get("page").map(String::as_str) {
                Some("1") => {
                    page(&["old"], 1).delayed(Duration::from_millis(300))
                },
                _ => page(&["new"], 1),
            }
        })
        .await;
        let store = TaskListStore::new(TaskRepository::new(
            backend.gateway(),
            logged_in(),
        ));
        let first = ListParams::new().page(1);
        let second = ListParams::new().page(2);

        tokio::join!(store.load_tasks(&first), store.load_tasks(&second));

        assert_eq!(ids(&store.snapshot()), vec![TaskId::from("new")]);
        assert!(!store.loading());
        assert_eq!(backend.requests().len(), 2);
    }

    #[tokio::test]
    async fn writes_surface_their_errors() {
        let backend = MockBackend::start(|_| MockResponse::empty(500)).await;
        let store = TaskListStore::new(TaskRepository::new(
            backend.gateway(),
            logged_in(),
        ));

        let err = store.delete_task(&TaskId::from("1")).await.unwrap_err();

        assert_eq!(err.response_message, "Error deleting task");
    }
}
