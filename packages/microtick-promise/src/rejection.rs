use std::rc::Rc;
use thiserror::Error;

/// Reason a promise was rejected.
///
/// Reactions on one promise all observe the same reason, so the error is
/// shared rather than cloned.
#[derive(Debug, Clone, Error)]
#[error("{0:#}")]
pub struct Rejection(Rc<anyhow::Error>);

impl Rejection {
    pub fn error(&self) -> &anyhow::Error {
        &self.0
    }

    pub fn msg<M>(message: M) -> Self
    where
        M: std::fmt::Display + std::fmt::Debug + Send + Sync + 'static,
    {
        Self::from(anyhow::Error::msg(message))
    }
}

/// Reason for [`Promise::any`](crate::Promise::any) rejecting: every input
/// rejected. Holds the input reasons in input order.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("all {} promises were rejected", .errors.len())]
pub struct AggregateError {
    pub errors: Vec<String>,
}

impl From<anyhow::Error> for Rejection {
    fn from(err: anyhow::Error) -> Self {
        Self(Rc::new(err))
    }
}

impl PartialEq for Rejection {
    /// Two rejections are equal when they share the same underlying error.
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}
