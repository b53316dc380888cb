//! Contains definitions pertaining to application members and how to look them up.
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeSet,
    fmt::{Debug, Display, Formatter},
};
use thiserror::Error;

/// A permission or role granted to a member, for example `ROLE_ADMIN`. The authorization layer
/// gives it meaning; here it is an opaque name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Authority(String);

impl Authority {
    pub fn new(name: impl Into<String>) -> Self {
        Authority(name.into())
    }
}

impl Display for Authority {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Authority {
    fn from(name: &str) -> Self {
        Authority::new(name)
    }
}

impl From<String> for Authority {
    fn from(name: String) -> Self {
        Authority(name)
    }
}

/// An application user account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub id: i64,
    pub username: String,
    /// The name shown to people, as opposed to the login name.
    pub name: String,
    pub authorities: BTreeSet<Authority>,
}

impl Member {
    pub fn new(id: i64, username: impl Into<String>, name: impl Into<String>) -> Self {
        Member {
            id,
            username: username.into(),
            name: name.into(),
            authorities: BTreeSet::new(),
        }
    }

    pub fn with_authorities<I, A>(mut self, authorities: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<Authority>,
    {
        self.authorities = authorities.into_iter().map(Into::into).collect();
        self
    }
}

/// Implementation of MemberService can look up member accounts from a source.
#[async_trait]
pub trait MemberService: Debug {
    /// This will do the lookup. [`MemberError::UsernameNotFound`] is returned if no member has
    /// the given username, other variants if something else went wrong.
    async fn find_by_username(&self, username: &str) -> Result<Member, MemberError>;
}

/// The error type returned by [`MemberService`]
#[derive(Debug, Error)]
pub enum MemberError {
    #[error("{0}")]
    Generic(String),
    #[error("member with username {username:?} not found")]
    UsernameNotFound { username: String },
    #[error("error getting member: {0}: {1:?}")]
    ImplPropagated(String, #[source] Option<Box<dyn std::error::Error + Send + Sync + 'static>>),
}

impl MemberError {
    pub fn not_found(username: impl Into<String>) -> Self {
        MemberError::UsernameNotFound { username: username.into() }
    }

    /// Creates a new domain specific error
    pub fn new(s: impl Into<String>) -> Self {
        MemberError::ImplPropagated(s.into(), None)
    }

    /// Creates a new domain specific error with the given source error.
    pub fn with_source<E>(s: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        MemberError::ImplPropagated(s.into(), Some(Box::new(source)))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, MemberError::UsernameNotFound { .. })
    }
}
