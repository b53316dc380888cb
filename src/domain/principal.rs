//! The principal handed to the authentication layer once a member has been looked up.
use super::member::{Authority, Member};
use serde::Serialize;
use std::collections::BTreeSet;

/// What the authentication layer needs to know about a user.
pub trait UserDetails {
    fn username(&self) -> &str;

    fn authorities(&self) -> &BTreeSet<Authority>;
}

/// A principal built from a [`Member`]. Constructed per lookup and never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SecurityUser {
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub name: String,
    pub authorities: BTreeSet<Authority>,
}

impl SecurityUser {
    pub fn new(
        id: i64,
        username: impl Into<String>,
        password: impl Into<String>,
        name: impl Into<String>,
        authorities: BTreeSet<Authority>,
    ) -> Self {
        SecurityUser {
            id,
            username: username.into(),
            password: password.into(),
            name: name.into(),
            authorities,
        }
    }
}

impl From<Member> for SecurityUser {
    fn from(member: Member) -> Self {
        SecurityUser::new(member.id, member.username, "", member.name, member.authorities)
    }
}

impl UserDetails for SecurityUser {
    fn username(&self) -> &str {
        &self.username
    }

    fn authorities(&self) -> &BTreeSet<Authority> {
        &self.authorities
    }
}
