use serde_derive::{Deserialize, Serialize};
use std::{
    fmt::{self, Display, Formatter},
    ops::Deref,
    str::FromStr,
};

/// The backend's identifier for a single task.
#[derive(
    Debug, Clone, PartialEq, Hash, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct TaskId(String);

impl<S: Into<String>> From<S> for TaskId {
    fn from(other: S) -> TaskId { TaskId(other.into()) }
}

impl Deref for TaskId {
    type Target = str;

    fn deref(&self) -> &str { &self.0 }
}

impl FromStr for TaskId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<TaskId, Self::Err> { Ok(TaskId::from(s)) }
}

impl Display for TaskId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}
