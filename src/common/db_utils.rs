use crate::common::error::AppError;
use crate::config::AppState;
use crate::middleware::auth::AuthenticatedUser;

// ---
// Helper RLS: A "Chave" para o Banco de Dados
// ---
/// Adquire uma conexão da pool e define as variáveis de sessão usadas pelas
/// políticas de RLS (o portal só enxerga os chamados do próprio solicitante).
pub(crate) async fn get_rls_connection(
    app_state: &AppState,
    user: &AuthenticatedUser,
) -> Result<sqlx::pool::PoolConnection<sqlx::Postgres>, AppError> {
    // 1. Adquire conexão
    let mut conn = app_state.db_pool.acquire().await?;

    // 2. Define User ID (escopo de sessão: a conexão volta para a pool
    //    e é sobrescrita na próxima aquisição)
    sqlx::query("SELECT set_config('app.user_id', $1, false)")
        .bind(user.0.id.to_string())
        .execute(&mut *conn)
        .await?;

    // 3. Define o papel
    sqlx::query("SELECT set_config('app.user_role', $1, false)")
        .bind(user.0.role.as_str())
        .execute(&mut *conn)
        .await?;

    Ok(conn)
}

/// Converte violações de constraint em erros de domínio; o resto vira
/// `DatabaseError`.
pub(crate) fn map_db_error(e: sqlx::Error, context: &str) -> AppError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.is_unique_violation() {
            return AppError::UniqueConstraintViolation(context.to_string());
        }
        if db_err.is_foreign_key_violation() {
            return AppError::ForeignKeyViolation(context.to_string());
        }
    }
    e.into()
}
