use std::any::Any;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Error produced by a generated flow or parallel.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A task returned an error that was not recovered.
    #[error("task \"{task}\" failed: {source}")]
    Task {
        task: String,
        #[source]
        source: BoxError,
    },
    /// A task panicked and no fallback was configured.
    #[error("task \"{task}\" panicked: {msg}")]
    Panic { task: String, msg: String },
    /// The ambient context was cancelled before all jobs could run.
    #[error("cancelled")]
    Cancelled,
}

impl Error {
    /// Wrap a user error, remembering which task produced it.
    pub fn task(task: &str, source: impl Into<BoxError>) -> Self {
        Self::Task {
            task: task.to_owned(),
            source: source.into(),
        }
    }

    /// Wrap a panic payload, remembering which task panicked.
    pub fn task_panic(task: &str, payload: Box<dyn Any + Send>) -> Self {
        Self::Panic {
            task: task.to_owned(),
            msg: panic_msg(&payload),
        }
    }

    /// Name of the task this error came from, if it came from one.
    pub fn task_name(&self) -> Option<&str> {
        match self {
            Self::Task { task, .. } | Self::Panic { task, .. } => Some(task),
            Self::Cancelled => None,
        }
    }
}

fn panic_msg(payload: &Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_task_name() {
        let e = Error::task("fetch", std::io::Error::new(std::io::ErrorKind::Other, "nope"));
        assert_eq!(Some("fetch"), e.task_name());
        assert_eq!("task \"fetch\" failed: nope", e.to_string());
        assert_eq!(None, Error::Cancelled.task_name());
    }
}
