use crate::domain::member::{MemberError, MemberService};
use crate::domain::principal::{SecurityUser, UserDetails};
use crate::metrics;
use async_trait::async_trait;
use slog::{debug, info, o, warn, Logger};
use std::fmt::Debug;
use std::sync::Arc;

/// The contract the authentication layer uses to resolve a username into a principal.
#[async_trait]
pub trait UserDetailsService: Debug + Send + Sync {
    /// Fails with [`MemberError::UsernameNotFound`] when no member has the given username.
    async fn load_user_by_username(&self, username: &str) -> Result<SecurityUser, MemberError>;
}

/// A [`UserDetailsService`] backed by a [`MemberService`]. Every call is a fresh lookup.
#[derive(Debug)]
pub struct MemberUserDetailsService {
    member_service: Arc<dyn MemberService + Send + Sync>,
    log: Logger,
}

impl MemberUserDetailsService {
    pub fn new(member_service: Arc<dyn MemberService + Send + Sync>, log: &Logger) -> Self {
        MemberUserDetailsService {
            member_service,
            log: log.new(o!("module" => "auth")),
        }
    }
}

#[async_trait]
impl UserDetailsService for MemberUserDetailsService {
    async fn load_user_by_username(&self, username: &str) -> Result<SecurityUser, MemberError> {
        match self.member_service.find_by_username(username).await {
            Ok(member) => {
                let user = SecurityUser::from(member);
                debug!(self.log, "Member found"; "username" => user.username(), "id" => user.id, "authorities" => user.authorities().len());
                metrics::inc_lookup("found");
                Ok(user)
            }
            Err(err) => {
                if err.is_not_found() {
                    info!(self.log, "Member not found"; "username" => username);
                    metrics::inc_lookup("not_found");
                } else {
                    warn!(self.log, "Member lookup failed: {}", err; "username" => username);
                    metrics::inc_lookup("error");
                }
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::member::Member;
    use pretty_assertions::assert_eq;

    #[derive(Debug)]
    struct FixedMembers(Vec<Member>);

    #[async_trait]
    impl MemberService for FixedMembers {
        async fn find_by_username(&self, username: &str) -> Result<Member, MemberError> {
            self.0
                .iter()
                .find(|m| m.username == username)
                .cloned()
                .ok_or_else(|| MemberError::not_found(username))
        }
    }

    #[derive(Debug)]
    struct Unreachable;

    #[async_trait]
    impl MemberService for Unreachable {
        async fn find_by_username(&self, _username: &str) -> Result<Member, MemberError> {
            Err(MemberError::new("connection refused"))
        }
    }

    fn service(members: Vec<Member>) -> MemberUserDetailsService {
        let log = Logger::root(slog::Discard, o!());
        MemberUserDetailsService::new(Arc::new(FixedMembers(members)), &log)
    }

    fn admin() -> Member {
        Member::new(1, "admin", "Administrator").with_authorities(["ROLE_ADMIN", "ROLE_MEMBER"])
    }

    #[tokio::test]
    async fn principal_mirrors_the_member() {
        let service = service(vec![admin(), Member::new(2, "user1", "User One")]);

        let user = service.load_user_by_username("admin").await.unwrap();

        let member = admin();
        assert_eq!(user.id, member.id);
        assert_eq!(user.username, member.username);
        assert_eq!(user.name, member.name);
        assert_eq!(user.authorities, member.authorities);
        assert_eq!(user.password, "");
    }

    #[tokio::test]
    async fn unknown_username_is_propagated_as_not_found() {
        let service = service(vec![admin()]);

        let err = service.load_user_by_username("nobody").await.unwrap_err();

        match err {
            MemberError::UsernameNotFound { username } => assert_eq!(username, "nobody"),
            other => panic!("expected UsernameNotFound, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn repeated_lookups_yield_equal_but_distinct_principals() {
        let service = service(vec![admin()]);

        let first = service.load_user_by_username("admin").await.unwrap();
        let mut second = service.load_user_by_username("admin").await.unwrap();
        assert_eq!(first, second);

        second.name.push_str(" (changed)");
        let third = service.load_user_by_username("admin").await.unwrap();
        assert_eq!(first, third);
    }

    #[tokio::test]
    async fn infrastructure_errors_pass_through_unchanged() {
        let log = Logger::root(slog::Discard, o!());
        let service = MemberUserDetailsService::new(Arc::new(Unreachable), &log);

        let err = service.load_user_by_username("admin").await.unwrap_err();

        assert!(!err.is_not_found());
        assert_eq!(err.to_string(), "error getting member: connection refused: None");
    }

    #[tokio::test]
    async fn concurrent_lookups_do_not_interfere() {
        let service = Arc::new(service(vec![admin(), Member::new(2, "user1", "User One")]));

        let handles: Vec<_> = ["admin", "user1", "admin", "user1"]
            .into_iter()
            .map(|name| {
                let service = Arc::clone(&service);
                tokio::spawn(async move { service.load_user_by_username(name).await.unwrap() })
            })
            .collect();

        for (handle, expected) in handles.into_iter().zip(["admin", "user1", "admin", "user1"]) {
            assert_eq!(handle.await.unwrap().username, expected);
        }
    }
}
