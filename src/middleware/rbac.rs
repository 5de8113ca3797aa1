// src/middleware/rbac.rs

use axum::{extract::FromRequestParts, http::request::Parts};
use std::marker::PhantomData;

use crate::{
    common::error::AppError,
    middleware::auth::AuthenticatedUser,
    models::auth::UserRole,
};

/// 1. O Trait que define quais papéis passam
pub trait RoleRequirement: Send + Sync + 'static {
    fn allows(role: UserRole) -> bool;
    fn describe() -> &'static str;
}

/// 2. O Extractor (Guardião)
pub struct RequireRole<T>(pub PhantomData<T>);

// 3. Implementação do FromRequestParts (roda depois do auth_guard)
impl<T, S> FromRequestParts<S> for RequireRole<T>
where
    T: RoleRequirement,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = parts
            .extensions
            .get::<AuthenticatedUser>()
            .ok_or(AppError::InvalidToken)?;

        if !T::allows(user.0.role) {
            tracing::warn!(
                "Acesso negado: usuário {} ({:?}) precisa de '{}'",
                user.0.id,
                user.0.role,
                T::describe()
            );
            return Err(AppError::Forbidden);
        }

        Ok(RequireRole(PhantomData))
    }
}

// ---
// PAPÉIS EXIGIDOS (TIPOS)
// ---

pub struct AdminOnly;
impl RoleRequirement for AdminOnly {
    fn allows(role: UserRole) -> bool {
        role == UserRole::Admin
    }
    fn describe() -> &'static str {
        "admin"
    }
}

/// Equipe de atendimento (agente ou administrador).
pub struct StaffOnly;
impl RoleRequirement for StaffOnly {
    fn allows(role: UserRole) -> bool {
        role >= UserRole::Agent
    }
    fn describe() -> &'static str {
        "agent"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;
    use chrono::Utc;
    use uuid::Uuid;

    use crate::models::auth::User;

    fn parts_with(role: Option<UserRole>) -> Parts {
        let mut request = Request::builder().uri("/").body(()).unwrap();
        if let Some(role) = role {
            request.extensions_mut().insert(AuthenticatedUser(User {
                id: Uuid::new_v4(),
                email: "x@x.com".into(),
                name: "X".into(),
                role,
                password_hash: None,
                client_id: None,
                is_active: true,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            }));
        }
        request.into_parts().0
    }

    #[test]
    fn test_role_requirements() {
        assert!(AdminOnly::allows(UserRole::Admin));
        assert!(!AdminOnly::allows(UserRole::Agent));
        assert!(StaffOnly::allows(UserRole::Agent));
        assert!(StaffOnly::allows(UserRole::Admin));
        assert!(!StaffOnly::allows(UserRole::Requester));
    }

    #[tokio::test]
    async fn test_guard_rejects_requester_on_staff_route() {
        let mut parts = parts_with(Some(UserRole::Requester));
        let result = RequireRole::<StaffOnly>::from_request_parts(&mut parts, &()).await;
        assert!(matches!(result, Err(AppError::Forbidden)));
    }

    #[tokio::test]
    async fn test_guard_without_user_is_unauthorized() {
        let mut parts = parts_with(None);
        let result = RequireRole::<AdminOnly>::from_request_parts(&mut parts, &()).await;
        assert!(matches!(result, Err(AppError::InvalidToken)));
    }

    #[tokio::test]
    async fn test_guard_lets_admin_through() {
        let mut parts = parts_with(Some(UserRole::Admin));
        assert!(RequireRole::<AdminOnly>::from_request_parts(&mut parts, &()).await.is_ok());
    }
}
