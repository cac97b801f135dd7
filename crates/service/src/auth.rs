//! Login, JWT issuance/verification and password hashing.
//!
//! Couriers and back-office users authenticate with the same endpoint,
//! disambiguated by a `role` field. Passwords are stored as argon2 hashes;
//! tokens are HS256 JWTs carrying the account id in `sub`.

use std::time::Duration;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use repository::{CouriersRepository, UsersRepository};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::ServiceError;

/// JWT claims carried by issued tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Account id as a string.
    pub sub: String,
    /// Expiration time (UTC timestamp).
    pub exp: usize,
    /// Issued at (UTC timestamp).
    pub iat: usize,
}

impl Claims {
    pub fn account_id(&self) -> Result<i32, ServiceError> {
        self.sub
            .parse()
            .map_err(|_| ServiceError::Validation("invalid subject in token".into()))
    }
}

/// Trait describing the authentication operations exposed to the gateway.
#[async_trait]
pub trait Auth: Send + Sync {
    /// Verify credentials for the given role ("courier" or "user") and
    /// issue a bearer token.
    async fn login(&self, login: &str, password: &str, role: &str)
        -> Result<String, ServiceError>;

    /// Decode and validate a bearer token.
    fn verify(&self, token: &str) -> Result<Claims, ServiceError>;

    /// Hash a plaintext password for storage.
    fn hash_password(&self, password: &str) -> Result<String, ServiceError>;
}

/// Async implementation of [`Auth`] over the courier and user repositories.
pub struct AuthService<K, U> {
    couriers: K,
    users: U,
    jwt_secret: String,
    jwt_expiry: Duration,
}

impl<K, U> AuthService<K, U>
where
    K: CouriersRepository,
    U: UsersRepository,
{
    pub fn new(couriers: K, users: U, jwt_secret: String, jwt_expiry: Duration) -> Self {
        Self {
            couriers,
            users,
            jwt_secret,
            jwt_expiry,
        }
    }

    fn issue_token(&self, account_id: i32) -> Result<String, ServiceError> {
        let now = Utc::now().timestamp() as usize;
        let claims = Claims {
            sub: account_id.to_string(),
            exp: now + self.jwt_expiry.as_secs() as usize,
            iat: now,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )
        .map_err(|e| ServiceError::Unexpected(format!("failed to sign token: {e}")))
    }

    fn verify_password(&self, password: &str, stored_hash: &str) -> Result<(), ServiceError> {
        let parsed = PasswordHash::new(stored_hash)
            .map_err(|e| ServiceError::Unexpected(format!("stored hash is invalid: {e}")))?;
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .map_err(|_| ServiceError::Validation("invalid login or password".into()))
    }
}

#[async_trait]
impl<K, U> Auth for AuthService<K, U>
where
    K: CouriersRepository,
    U: UsersRepository,
{
    #[instrument(skip(self, password))]
    async fn login(
        &self,
        login: &str,
        password: &str,
        role: &str,
    ) -> Result<String, ServiceError> {
        let (account_id, stored_hash) = match role {
            "courier" => {
                let courier = self.couriers.get_by_login(login).await.map_err(|_| {
                    ServiceError::Validation("invalid login or password".into())
                })?;
                (courier.id, courier.password_hash)
            }
            "user" => {
                let user = self.users.get_by_login(login).await.map_err(|_| {
                    ServiceError::Validation("invalid login or password".into())
                })?;
                (user.id, user.password_hash)
            }
            _ => return Err(ServiceError::Validation("invalid role".into())),
        };

        self.verify_password(password, &stored_hash)?;
        self.issue_token(account_id)
    }

    fn verify(&self, token: &str) -> Result<Claims, ServiceError> {
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_bytes()),
            &Validation::default(),
        )
        .map(|data| data.claims)
        .map_err(|_| ServiceError::Validation("invalid or expired token".into()))
    }

    fn hash_password(&self, password: &str) -> Result<String, ServiceError> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| ServiceError::Unexpected(format!("failed to hash password: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use model::{Courier, User};
    use repository::{CourierData, RepositoryError, UserData};

    struct FakeCouriers {
        courier: Courier,
    }

    #[async_trait]
    impl CouriersRepository for FakeCouriers {
        async fn create(&self, _courier: &CourierData) -> Result<i32, RepositoryError> {
            unimplemented!()
        }

        async fn get(&self, _id: i32) -> Result<Courier, RepositoryError> {
            unimplemented!()
        }

        async fn get_by_login(&self, login: &str) -> Result<Courier, RepositoryError> {
            if login == self.courier.login {
                Ok(self.courier.clone())
            } else {
                Err(RepositoryError::NotFound)
            }
        }

        async fn list(
            &self,
            _page: i64,
            _limit: i64,
        ) -> Result<(Vec<Courier>, i64), RepositoryError> {
            unimplemented!()
        }

        async fn update(&self, _id: i32, _courier: &CourierData) -> Result<(), RepositoryError> {
            unimplemented!()
        }

        async fn delete(&self, _id: i32) -> Result<(), RepositoryError> {
            unimplemented!()
        }
    }

    struct NoUsers;

    #[async_trait]
    impl UsersRepository for NoUsers {
        async fn create(&self, _user: &UserData) -> Result<i32, RepositoryError> {
            unimplemented!()
        }

        async fn get(&self, _id: i32) -> Result<User, RepositoryError> {
            unimplemented!()
        }

        async fn get_by_login(&self, _login: &str) -> Result<User, RepositoryError> {
            Err(RepositoryError::NotFound)
        }

        async fn list(&self, _page: i64, _limit: i64) -> Result<(Vec<User>, i64), RepositoryError> {
            unimplemented!()
        }

        async fn update(&self, _id: i32, _user: &UserData) -> Result<(), RepositoryError> {
            unimplemented!()
        }

        async fn delete(&self, _id: i32) -> Result<(), RepositoryError> {
            unimplemented!()
        }
    }

    fn service_with_courier(password: &str) -> AuthService<FakeCouriers, NoUsers> {
        // Hash through a throwaway service so the stored hash matches what
        // the login path expects.
        let bootstrap = AuthService::new(
            FakeCouriers {
                courier: dummy_courier(String::new()),
            },
            NoUsers,
            "secret".to_string(),
            Duration::from_secs(3600),
        );
        let hash = bootstrap.hash_password(password).unwrap();
        AuthService::new(
            FakeCouriers {
                courier: dummy_courier(hash),
            },
            NoUsers,
            "secret".to_string(),
            Duration::from_secs(3600),
        )
    }

    fn dummy_courier(password_hash: String) -> Courier {
        Courier {
            id: 9,
            first_name: "Bek".to_string(),
            last_name: "Tashkentov".to_string(),
            branch_id: 2,
            phone: String::new(),
            login: "bek".to_string(),
            password_hash,
            max_order_count: 5,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[tokio::test]
    async fn test_login_issues_verifiable_token() {
        let auth = service_with_courier("hunter2");
        let token = auth.login("bek", "hunter2", "courier").await.unwrap();

        let claims = auth.verify(&token).unwrap();
        assert_eq!(claims.account_id().unwrap(), 9);
        assert!(claims.exp > claims.iat);
    }

    #[tokio::test]
    async fn test_login_rejects_wrong_password() {
        let auth = service_with_courier("hunter2");
        let err = auth.login("bek", "wrong", "courier").await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn test_login_rejects_unknown_login() {
        let auth = service_with_courier("hunter2");
        let err = auth.login("nobody", "hunter2", "courier").await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn test_login_rejects_unknown_role() {
        let auth = service_with_courier("hunter2");
        let err = auth.login("bek", "hunter2", "admin").await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[test]
    fn test_verify_rejects_garbage_token() {
        let auth = service_with_courier("hunter2");
        assert!(auth.verify("not-a-jwt").is_err());
    }
}
