// src/services/auth.rs

use bcrypt::{hash, verify};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use sqlx::PgPool;

use crate::{
    common::error::AppError,
    db::UserRepository,
    models::auth::{Claims, User, UserRole},
};

const TOKEN_TTL_DAYS: i64 = 7;

#[derive(Clone)]
pub struct AuthService {
    user_repo: UserRepository,
    jwt_secret: String,
    pool: PgPool,
}

impl AuthService {
    pub fn new(user_repo: UserRepository, jwt_secret: String, pool: PgPool) -> Self {
        Self { user_repo, jwt_secret, pool }
    }

    /// Auto-cadastro pelo portal: sempre como solicitante.
    pub async fn register_user(&self, email: &str, name: &str, password: &str) -> Result<String, AppError> {
        // Hashing fora do executor assíncrono
        let password_clone = password.to_owned();
        let hashed_password = tokio::task::spawn_blocking(move || {
            hash(&password_clone, bcrypt::DEFAULT_COST)
        })
        .await
        .map_err(|e| anyhow::anyhow!("Falha na task de hashing: {}", e))??;

        let email = email.trim().to_lowercase();
        let new_user = self
            .user_repo
            .create_user(&self.pool, &email, name.trim(), UserRole::Requester, Some(&hashed_password))
            .await?;

        tracing::info!("Novo solicitante cadastrado: {}", new_user.id);
        self.create_token(&new_user)
    }

    pub async fn login_user(&self, email: &str, password: &str) -> Result<String, AppError> {
        let user = self
            .user_repo
            .find_by_email(email.trim())
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        // Convidado que ainda não definiu senha não entra por aqui
        let Some(password_hash) = user.password_hash.clone() else {
            return Err(AppError::InvalidCredentials);
        };

        let password_clone = password.to_owned();
        let is_password_valid = tokio::task::spawn_blocking(move || {
            verify(&password_clone, &password_hash)
        })
        .await
        .map_err(|e| anyhow::anyhow!("Falha na task de verificação de senha: {}", e))??;

        if !is_password_valid {
            return Err(AppError::InvalidCredentials);
        }
        if !user.is_active {
            return Err(AppError::AccountInactive);
        }

        self.create_token(&user)
    }

    /// Decodifica o token e recarrega o usuário; o papel vem do banco, não
    /// do token, para que rebaixamentos valham na hora.
    pub async fn validate_token(&self, token: &str) -> Result<User, AppError> {
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_ref()),
            &Validation::default(),
        )
        .map_err(|_| AppError::InvalidToken)?;

        let user = self
            .user_repo
            .find_by_id(token_data.claims.sub)
            .await?
            .ok_or(AppError::UserNotFound)?;

        if !user.is_active {
            return Err(AppError::AccountInactive);
        }
        Ok(user)
    }

    pub fn create_token(&self, user: &User) -> Result<String, AppError> {
        let now = Utc::now();
        let expires_at = now + chrono::Duration::days(TOKEN_TTL_DAYS);

        let claims = Claims {
            sub: user.id,
            role: user.role,
            exp: expires_at.timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        Ok(encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_ref()),
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::postgres::PgPoolOptions;
    use uuid::Uuid;

    fn service() -> AuthService {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/servicedesk_test")
            .unwrap();
        AuthService::new(UserRepository::new(pool.clone()), "segredo-de-teste".into(), pool)
    }

    fn user(role: UserRole) -> User {
        User {
            id: Uuid::new_v4(),
            email: "ana@x.com".into(),
            name: "Ana".into(),
            role,
            password_hash: None,
            client_id: None,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_token_carries_subject_and_role() {
        let svc = service();
        let agent = user(UserRole::Agent);
        let token = svc.create_token(&agent).unwrap();

        let data = decode::<Claims>(
            &token,
            &DecodingKey::from_secret(b"segredo-de-teste"),
            &Validation::default(),
        )
        .unwrap();
        assert_eq!(data.claims.sub, agent.id);
        assert_eq!(data.claims.role, UserRole::Agent);
        assert_eq!(data.claims.exp - data.claims.iat, (TOKEN_TTL_DAYS * 24 * 3600) as usize);
    }

    #[tokio::test]
    async fn test_garbage_token_is_rejected_before_db() {
        let result = service().validate_token("nao-e-um-jwt").await;
        assert!(matches!(result, Err(AppError::InvalidToken)));
    }
}
