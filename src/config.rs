// src/config.rs

use std::{env, sync::Arc, time::Duration};

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    common::i18n::I18nStore,
    db::{
        CategoryRepository, DashboardRepository, DirectoryRepository, PgRateLimitStore,
        SlaPolicyRepository, TicketRepository, UserRepository,
    },
    models::sla::MissingResolutionPolicy,
    services::{
        admin_service::AdminService, auth::AuthService, category_service::CategoryService,
        dashboard_service::DashboardService, integration_service::IntegrationService,
        rate_limit::RateLimiter, sla_service::SlaService, ticket_service::TicketService,
    },
    sla::SlaEvaluator,
};

/// Provedor de identidade (convites).
#[derive(Clone)]
pub struct IdentityProviderConfig {
    pub store_url: String,
    pub service_role_key: String,
}

/// Destino do teste de webhook.
#[derive(Clone)]
pub struct WebhookConfig {
    pub url: String,
    pub user: String,
    pub password: String,
}

// Sem Debug: carrega segredos
#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub bind_addr: String,
    pub db_max_connections: u32,
    pub identity: Option<IdentityProviderConfig>,
    pub webhook: Option<WebhookConfig>,
    pub missing_resolution: MissingResolutionPolicy,
    pub rate_limit_max: u32,
    pub rate_limit_window_secs: i64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Monta a configuração a partir de uma função de busca (o ambiente, ou
    /// um mapa nos testes). Variáveis vazias contam como ausentes.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let database_url = get("DATABASE_URL").context("DATABASE_URL deve ser definida")?;
        let jwt_secret = get("JWT_SECRET").context("JWT_SECRET deve ser definido")?;

        let db_max_connections = match get("DB_MAX_CONNECTIONS") {
            Some(v) => v.parse().context("DB_MAX_CONNECTIONS inválido")?,
            None => 5,
        };
        let missing_resolution = match get("SLA_MISSING_RESOLUTION") {
            Some(v) => v.parse().map_err(anyhow::Error::msg)?,
            None => MissingResolutionPolicy::default(),
        };
        let rate_limit_max = match get("RATE_LIMIT_MAX") {
            Some(v) => v.parse().context("RATE_LIMIT_MAX inválido")?,
            None => 60,
        };
        let rate_limit_window_secs: i64 = match get("RATE_LIMIT_WINDOW_SECS") {
            Some(v) => v.parse().context("RATE_LIMIT_WINDOW_SECS inválido")?,
            None => 60,
        };
        anyhow::ensure!(rate_limit_window_secs > 0, "RATE_LIMIT_WINDOW_SECS deve ser positivo");

        // Integrações opcionais: só ficam ativas com todas as variáveis
        let identity = match (get("STORE_URL"), get("SERVICE_ROLE_KEY")) {
            (Some(store_url), Some(service_role_key)) => {
                Some(IdentityProviderConfig { store_url, service_role_key })
            }
            _ => None,
        };
        let webhook = match (get("WEBHOOK_URL"), get("WEBHOOK_USER"), get("WEBHOOK_PASSWORD")) {
            (Some(url), Some(user), Some(password)) => Some(WebhookConfig { url, user, password }),
            _ => None,
        };

        Ok(Self {
            database_url,
            jwt_secret,
            bind_addr: get("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:3000".to_string()),
            db_max_connections,
            identity,
            webhook,
            missing_resolution,
            rate_limit_max,
            rate_limit_window_secs,
        })
    }
}

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub config: Arc<Config>,
    pub i18n_store: Arc<I18nStore>,

    pub auth_service: AuthService,
    pub ticket_service: TicketService,
    pub category_service: CategoryService,
    pub sla_service: SlaService,
    pub dashboard_service: DashboardService,
    pub admin_service: AdminService,
    pub integration_service: IntegrationService,
    pub rate_limiter: RateLimiter,
}

impl AppState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let db_pool = PgPoolOptions::new()
            .max_connections(config.db_max_connections)
            .acquire_timeout(Duration::from_secs(3))
            // As variáveis de RLS são de sessão: limpa antes de devolver à pool
            .after_release(|conn, _meta| {
                Box::pin(async move {
                    sqlx::query(
                        "SELECT set_config('app.user_id', '', false), set_config('app.user_role', '', false)",
                    )
                    .execute(&mut *conn)
                    .await?;
                    Ok(true)
                })
            })
            .connect(&config.database_url)
            .await
            .context("Falha ao conectar ao banco de dados")?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        Self::with_pool(config, db_pool)
    }

    /// Monta o gráfico de dependências sobre uma pool já criada.
    pub fn with_pool(config: Config, db_pool: PgPool) -> anyhow::Result<Self> {
        let evaluator = SlaEvaluator::new(config.missing_resolution);

        let user_repo = UserRepository::new(db_pool.clone());
        let ticket_repo = TicketRepository::new(db_pool.clone());
        let category_repo = CategoryRepository::new(db_pool.clone());
        let sla_repo = SlaPolicyRepository::new(db_pool.clone());
        let directory_repo = DirectoryRepository::new(db_pool.clone());

        let http = reqwest::Client::builder()
            .user_agent(concat!("servicedesk/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Falha ao criar o cliente HTTP")?;

        let rate_limiter = RateLimiter::new(
            Arc::new(PgRateLimitStore::new(db_pool.clone())),
            config.rate_limit_max,
            chrono::Duration::seconds(config.rate_limit_window_secs),
        );

        Ok(Self {
            auth_service: AuthService::new(user_repo.clone(), config.jwt_secret.clone(), db_pool.clone()),
            ticket_service: TicketService::new(
                ticket_repo.clone(),
                category_repo.clone(),
                sla_repo.clone(),
                evaluator,
            ),
            category_service: CategoryService::new(category_repo),
            sla_service: SlaService::new(sla_repo, ticket_repo, evaluator),
            dashboard_service: DashboardService::new(DashboardRepository::new(db_pool.clone())),
            admin_service: AdminService::new(user_repo.clone(), directory_repo),
            integration_service: IntegrationService::new(
                http,
                user_repo,
                db_pool.clone(),
                config.identity.clone(),
                config.webhook.clone(),
            ),
            rate_limiter,
            i18n_store: Arc::new(I18nStore::new()),
            config: Arc::new(config),
            db_pool,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key: &str| map.get(key).cloned()
    }

    const REQUIRED: [(&str, &str); 2] = [("DATABASE_URL", "postgres://localhost/sd"), ("JWT_SECRET", "s3cr3t")];

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&REQUIRED)).unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0:3000");
        assert_eq!(config.db_max_connections, 5);
        assert_eq!(config.rate_limit_max, 60);
        assert_eq!(config.rate_limit_window_secs, 60);
        assert_eq!(config.missing_resolution, MissingResolutionPolicy::AssumeNow);
        assert!(config.identity.is_none());
        assert!(config.webhook.is_none());
    }

    #[test]
    fn test_missing_required_fails() {
        assert!(Config::from_lookup(lookup(&[("DATABASE_URL", "postgres://x")])).is_err());
        assert!(Config::from_lookup(lookup(&[("DATABASE_URL", " "), ("JWT_SECRET", "s")])).is_err());
    }

    #[test]
    fn test_optional_integrations_need_every_variable() {
        let mut pairs = REQUIRED.to_vec();
        pairs.extend([
            ("STORE_URL", "https://idp.local"),
            ("SERVICE_ROLE_KEY", "chave"),
            ("WEBHOOK_URL", "https://hooks.local/sd"),
            ("WEBHOOK_USER", "sd"),
        ]);
        let config = Config::from_lookup(lookup(&pairs)).unwrap();
        assert_eq!(config.identity.map(|i| i.store_url).as_deref(), Some("https://idp.local"));
        assert!(config.webhook.is_none());
    }

    #[test]
    fn test_parses_overrides() {
        let mut pairs = REQUIRED.to_vec();
        pairs.extend([
            ("SLA_MISSING_RESOLUTION", "unknown"),
            ("RATE_LIMIT_MAX", "5"),
            ("RATE_LIMIT_WINDOW_SECS", "10"),
            ("DB_MAX_CONNECTIONS", "12"),
        ]);
        let config = Config::from_lookup(lookup(&pairs)).unwrap();
        assert_eq!(config.missing_resolution, MissingResolutionPolicy::Unknown);
        assert_eq!(config.rate_limit_max, 5);
        assert_eq!(config.rate_limit_window_secs, 10);
        assert_eq!(config.db_max_connections, 12);
    }

    #[test]
    fn test_rejects_bad_values() {
        let mut zero_window = REQUIRED.to_vec();
        zero_window.push(("RATE_LIMIT_WINDOW_SECS", "0"));
        assert!(Config::from_lookup(lookup(&zero_window)).is_err());

        let mut bad_policy = REQUIRED.to_vec();
        bad_policy.push(("SLA_MISSING_RESOLUTION", "talvez"));
        assert!(Config::from_lookup(lookup(&bad_policy)).is_err());
    }
}
