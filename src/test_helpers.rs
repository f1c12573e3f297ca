use crate::task::{Status, Task};

/// Create a `Task` with sensible defaults for tests.
pub fn make_task(id: &str, status: Status) -> Task {
    Task {
        id: id.to_string(),
        title: format!("Task {id}"),
        description: format!("{id} description"),
        status,
        created_at: None,
    }
}

