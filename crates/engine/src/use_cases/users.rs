//! User registration.

use std::sync::Arc;

use eom_domain::{DomainError, PlayerName, User, UserId};

use crate::infrastructure::ports::{ClockPort, RepoError, UserRepo};

#[derive(Debug, thiserror::Error)]
pub enum UserError {
    #[error("User not found: {0}")]
    NotFound(String),
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("Repository error: {0}")]
    Repo(#[from] RepoError),
}

pub struct UserManagement {
    users: Arc<dyn UserRepo>,
    clock: Arc<dyn ClockPort>,
}

impl UserManagement {
    pub fn new(users: Arc<dyn UserRepo>, clock: Arc<dyn ClockPort>) -> Self {
        Self { users, clock }
    }

    /// Register `username`, or return the existing user with that name.
    pub async fn register(&self, username: &str) -> Result<User, UserError> {
        let username = PlayerName::new(username)?;
        if let Some(existing) = self.users.get_by_username(username.as_str()).await? {
            return Ok(existing);
        }

        let user = User::new(UserId::generate(), username, self.clock.now());
        match self.users.save(&user).await {
            Ok(()) => {
                tracing::info!(user_id = %user.id, username = %user.username, "User registered");
                Ok(user)
            }
            // Lost a race with a concurrent registration of the same name.
            Err(RepoError::ConstraintViolation(_)) => self
                .users
                .get_by_username(user.username.as_str())
                .await?
                .ok_or_else(|| UserError::NotFound(user.username.to_string())),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn get(&self, id: &str) -> Result<User, UserError> {
        let id = UserId::new(id)?;
        self.users
            .get(&id)
            .await?
            .ok_or_else(|| UserError::NotFound(id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::ports::{MockClockPort, MockUserRepo};
    use crate::use_cases::test_support::{t0, uid};
    use mockall::predicate::*;

    fn clock() -> Arc<MockClockPort> {
        let mut clock = MockClockPort::new();
        clock.expect_now().returning(t0);
        Arc::new(clock)
    }

    fn alice() -> User {
        User::new(uid("user_1"), PlayerName::new("Alice").unwrap(), t0())
    }

    #[tokio::test]
    async fn register_creates_new_user() {
        let mut repo = MockUserRepo::new();
        repo.expect_get_by_username()
            .with(eq("Alice"))
            .returning(|_| Ok(None));
        repo.expect_save()
            .withf(|u| u.username.as_str() == "Alice" && u.id.as_str().starts_with("user_"))
            .times(1)
            .returning(|_| Ok(()));

        let user = UserManagement::new(Arc::new(repo), clock())
            .register("  Alice ")
            .await
            .unwrap();
        assert_eq!(user.created_at, t0());
    }

    #[tokio::test]
    async fn register_is_idempotent_by_username() {
        let mut repo = MockUserRepo::new();
        repo.expect_get_by_username()
            .returning(|_| Ok(Some(alice())));
        repo.expect_save().never();

        let user = UserManagement::new(Arc::new(repo), clock())
            .register("Alice")
            .await
            .unwrap();
        assert_eq!(user.id.as_str(), "user_1");
    }

    #[tokio::test]
    async fn register_race_returns_winner() {
        let mut repo = MockUserRepo::new();
        let mut seq = mockall::Sequence::new();
        repo.expect_get_by_username()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(None));
        repo.expect_save()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Err(RepoError::constraint("duplicate")));
        repo.expect_get_by_username()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(Some(alice())));

        let user = UserManagement::new(Arc::new(repo), clock())
            .register("Alice")
            .await
            .unwrap();
        assert_eq!(user.id.as_str(), "user_1");
    }

    #[tokio::test]
    async fn register_rejects_blank_name() {
        let repo = MockUserRepo::new();
        let err = UserManagement::new(Arc::new(repo), clock())
            .register("   ")
            .await
            .unwrap_err();
        assert!(matches!(err, UserError::Domain(DomainError::Validation(_))));
    }

    #[tokio::test]
    async fn get_unknown_user() {
        let mut repo = MockUserRepo::new();
        repo.expect_get().returning(|_| Ok(None));

        let err = UserManagement::new(Arc::new(repo), clock())
            .get("ghost")
            .await
            .unwrap_err();
        assert!(matches!(err, UserError::NotFound(id) if id == "ghost"));
    }
}
