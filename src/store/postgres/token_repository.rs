//! PostgreSQL implementation of TokenStore.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::models::UserRecord;
use super::{Catch, PgStore};
use crate::store::{Result, TokenStore};
use crate::token::{Scope, TokenHash};
use crate::user::{User, UserId};

#[async_trait]
impl TokenStore for PgStore {
    async fn store_token(
        &self,
        hash: &TokenHash,
        user_id: UserId,
        expires_at: DateTime<Utc>,
        scope: Scope,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO tokens (hash, user_id, expires_at, scope)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(hash.as_bytes().as_slice())
        .bind(user_id)
        .bind(expires_at)
        .bind(scope.as_str())
        .execute(&self.pool)
        .await
        .catch()?;

        Ok(())
    }

    async fn find_active_token_owner(
        &self,
        hash: &TokenHash,
        scope: Scope,
        now: DateTime<Utc>,
    ) -> Result<Option<User>> {
        let record = sqlx::query_as::<_, UserRecord>(
            r#"
            SELECT u.id, u.username, u.email, u.password_hash, u.created_at, u.updated_at
            FROM users u
            INNER JOIN tokens t ON t.user_id = u.id
            WHERE t.hash = $1
              AND t.scope = $2
              AND t.expires_at > $3
            "#,
        )
        .bind(hash.as_bytes().as_slice())
        .bind(scope.as_str())
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .catch()?;

        Ok(record.map(Into::into))
    }

    async fn revoke_tokens(
        &self,
        user_id: UserId,
        scope: Scope,
    ) -> Result<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM tokens
            WHERE user_id = $1 AND scope = $2
            "#,
        )
        .bind(user_id)
        .bind(scope.as_str())
        .execute(&self.pool)
        .await
        .catch()?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use sqlx::PgPool;

    use super::*;
    use crate::crypto::PasswordHash;
    use crate::store::UserStore;
    use crate::user::NewUser;

    async fn alice(store: &PgStore) -> User {
        store
            .create_user(NewUser {
                username: "alice".into(),
                email: "alice@example.com".into(),
                password: PasswordHash::from_phc("$argon2id$v=19$m=8,t=1,p=1$c2FsdHNhbHQ$aGFzaA"),
            })
            .await
            .unwrap()
    }

    #[sqlx::test]
    #[ignore = "requires DATABASE_URL"]
    async fn test_lookup_respects_expiry_and_scope(pool: PgPool) {
        let store = PgStore::new(pool);
        let user = alice(&store).await;
        let hash = TokenHash::of("plain-secret");
        let expires_at = Utc::now() + Duration::hours(1);

        store
            .store_token(&hash, user.id, expires_at, Scope::Authentication)
            .await
            .unwrap();

        let before = expires_at - Duration::seconds(1);
        let owner = store
            .find_active_token_owner(&hash, Scope::Authentication, before)
            .await
            .unwrap();
        assert_eq!(owner.map(|u| u.id), Some(user.id));

        let owner = store
            .find_active_token_owner(&hash, Scope::Authentication, expires_at)
            .await
            .unwrap();
        assert!(owner.is_none());
    }

    #[sqlx::test]
    #[ignore = "requires DATABASE_URL"]
    async fn test_revoke(pool: PgPool) {
        let store = PgStore::new(pool);
        let user = alice(&store).await;
        let expires_at = Utc::now() + Duration::hours(1);

        for plain in ["first", "second"] {
            store
                .store_token(
                    &TokenHash::of(plain),
                    user.id,
                    expires_at,
                    Scope::Authentication,
                )
                .await
                .unwrap();
        }

        let revoked = store
            .revoke_tokens(user.id, Scope::Authentication)
            .await
            .unwrap();
        assert_eq!(revoked, 2);
        assert!(
            store
                .find_active_token_owner(
                    &TokenHash::of("first"),
                    Scope::Authentication,
                    Utc::now()
                )
                .await
                .unwrap()
                .is_none()
        );
    }
}
