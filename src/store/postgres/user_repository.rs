//! PostgreSQL implementation of UserStore.

use async_trait::async_trait;

use super::models::{USER_COLUMNS, UserRecord};
use super::{Catch, PgStore};
use crate::crypto::PasswordHash;
use crate::store::{Result, UserStore};
use crate::token::Scope;
use crate::user::{NewUser, ProfileChanges, User, UserId};

#[async_trait]
impl UserStore for PgStore {
    async fn create_user(&self, user: NewUser) -> Result<User> {
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            r#"
            INSERT INTO users (username, email, password_hash)
            VALUES ($1, $2, $3)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&user.username)
        .bind(&user.email)
        .bind(user.password.as_str())
        .fetch_one(&self.pool)
        .await
        .catch()?;

        Ok(record.into())
    }

    async fn find_user_by_username(
        &self,
        username: &str,
    ) -> Result<Option<User>> {
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .catch()?;

        Ok(record.map(Into::into))
    }

    async fn find_user_by_id(&self, id: UserId) -> Result<Option<User>> {
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .catch()?;

        Ok(record.map(Into::into))
    }

    async fn update_profile(
        &self,
        id: UserId,
        changes: &ProfileChanges,
    ) -> Result<Option<User>> {
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            r#"
            UPDATE users
            SET username = COALESCE($2, username),
                email = COALESCE($3, email),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(changes.username.as_deref())
        .bind(changes.email.as_deref())
        .fetch_optional(&self.pool)
        .await
        .catch()?;

        Ok(record.map(Into::into))
    }

    async fn update_password(
        &self,
        id: UserId,
        password: &PasswordHash,
        revoke: Scope,
    ) -> Result<u64> {
        let mut tx = self.pool.begin().await.catch()?;

        sqlx::query(
            r#"
            UPDATE users
            SET password_hash = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(password.as_str())
        .execute(&mut *tx)
        .await
        .catch()?;

        let revoked = sqlx::query(
            r#"
            DELETE FROM tokens
            WHERE user_id = $1 AND scope = $2
            "#,
        )
        .bind(id)
        .bind(revoke.as_str())
        .execute(&mut *tx)
        .await
        .catch()?
        .rows_affected();

        tx.commit().await.catch()?;

        Ok(revoked)
    }
}

#[cfg(test)]
mod tests {
    use sqlx::PgPool;

    use chrono::{Duration, Utc};

    use super::*;
    use crate::store::{StoreError, TokenStore};
    use crate::token::TokenHash;

    fn new_user(username: &str, email: &str) -> NewUser {
        NewUser {
            username: username.into(),
            email: email.into(),
            password: PasswordHash::from_phc("$argon2id$v=19$m=8,t=1,p=1$c2FsdHNhbHQ$aGFzaA"),
        }
    }

    #[sqlx::test]
    #[ignore = "requires DATABASE_URL"]
    async fn test_create_and_find(pool: PgPool) {
        let store = PgStore::new(pool);
        let created = store
            .create_user(new_user("alice", "alice@example.com"))
            .await
            .unwrap();

        let found = store.find_user_by_username("alice").await.unwrap().unwrap();
        assert_eq!(found.id, created.id);
        assert_eq!(found.password, created.password);
        assert!(store.find_user_by_id(UserId(-1)).await.unwrap().is_none());
    }

    #[sqlx::test]
    #[ignore = "requires DATABASE_URL"]
    async fn test_duplicate_username_is_conflict(pool: PgPool) {
        let store = PgStore::new(pool);
        store
            .create_user(new_user("alice", "alice@example.com"))
            .await
            .unwrap();

        let err = store
            .create_user(new_user("alice", "other@example.com"))
            .await
            .unwrap_err();
        assert!(
            matches!(err, StoreError::Conflict { ref field } if field == "username")
        );
    }

    #[sqlx::test]
    #[ignore = "requires DATABASE_URL"]
    async fn test_update_profile_keeps_password(pool: PgPool) {
        let store = PgStore::new(pool);
        let user = store
            .create_user(new_user("alice", "alice@example.com"))
            .await
            .unwrap();

        let changes = ProfileChanges {
            username: None,
            email: Some("new@example.com".into()),
        };
        let updated = store.update_profile(user.id, &changes).await.unwrap().unwrap();
        assert_eq!(updated.username, "alice");
        assert_eq!(updated.email, "new@example.com");
        assert_eq!(updated.password, user.password);
    }

    #[sqlx::test]
    #[ignore = "requires DATABASE_URL"]
    async fn test_password_change_revokes_tokens(pool: PgPool) {
        let store = PgStore::new(pool);
        let user = store
            .create_user(new_user("alice", "alice@example.com"))
            .await
            .unwrap();
        let hash = TokenHash::of("a-token");
        let expires_at = Utc::now() + Duration::hours(1);
        store
            .store_token(&hash, user.id, expires_at, Scope::Authentication)
            .await
            .unwrap();

        let replaced = PasswordHash::from_phc("$argon2id$v=19$m=8,t=1,p=1$bmV3c2FsdA$aGFzaA");
        let revoked = store
            .update_password(user.id, &replaced, Scope::Authentication)
            .await
            .unwrap();
        assert_eq!(revoked, 1);

        let found = store.find_user_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(found.password, replaced);
        assert!(
            store
                .find_active_token_owner(&hash, Scope::Authentication, Utc::now())
                .await
                .unwrap()
                .is_none()
        );
    }
}
