use super::types::{RoleTag, UserId};

#[derive(thiserror::Error, Debug)]
pub enum ApprovalError {
    #[error("user {user} may not sign slot {slot} ({role})")]
    NotAuthorized {
        user: UserId,
        slot: usize,
        role: RoleTag,
    },
    #[error("every signature slot is already filled")]
    AlreadyTerminal,
    // expected is None once the chain is fully signed
    #[error("slot {attempted} is not the next unsigned slot (next: {expected:?})")]
    OutOfOrder {
        expected: Option<usize>,
        attempted: usize,
    },
    #[error("invalid signature configuration: {0}")]
    InvalidConfiguration(String),
    #[error("document {0} was not found")]
    NotFound(String),
    #[error("document {0} already exists")]
    AlreadyExists(String),
    #[error("stored signature state is inconsistent: {0}")]
    Inconsistent(String),
    #[error("storage failure: {0}")]
    Storage(#[from] sled::Error),
    #[error("document encoding failure: {0}")]
    Encoding(String),
}

impl ApprovalError {
    /// Conflicts the caller should answer by reloading and re-evaluating
    pub fn is_conflict(&self) -> bool {
        matches!(self, ApprovalError::OutOfOrder { .. })
    }
}

impl<E: std::fmt::Display> From<minicbor::encode::Error<E>> for ApprovalError {
    fn from(value: minicbor::encode::Error<E>) -> Self {
        ApprovalError::Encoding(value.to_string())
    }
}

impl From<minicbor::decode::Error> for ApprovalError {
    fn from(value: minicbor::decode::Error) -> Self {
        ApprovalError::Encoding(value.to_string())
    }
}
