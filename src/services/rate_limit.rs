// src/services/rate_limit.rs

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use crate::common::error::AppError;

/// Contador por chave e janela, guardado fora do processo para que o limite
/// valha entre várias instâncias.
#[async_trait]
pub trait RateLimitStore: Send + Sync {
    /// Soma um acesso à janela e devolve o total da janela após o incremento.
    async fn hit(
        &self,
        key: &str,
        window_start: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<u32, AppError>;

    /// Remove janelas expiradas; devolve quantas foram apagadas.
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, AppError>;
}

/// Janela fixa: no máximo `max_hits` por `window` para cada chave.
#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn RateLimitStore>,
    max_hits: u32,
    window: Duration,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn RateLimitStore>, max_hits: u32, window: Duration) -> Self {
        Self { store, max_hits, window }
    }

    /// `scope` separa os contadores por operação (ex: "login", "portal").
    pub async fn check(&self, scope: &str, subject: &str, now: DateTime<Utc>) -> Result<(), AppError> {
        let start = window_start(now, self.window);
        let end = start + self.window;
        let key = format!("{scope}:{subject}");

        let hits = self.store.hit(&key, start, end).await?;
        if hits > self.max_hits {
            let retry_after_secs = (end - now).num_seconds().max(1) as u64;
            tracing::warn!("Limite de requisições excedido para '{}' ({} acessos)", key, hits);
            return Err(AppError::RateLimited { retry_after_secs });
        }
        Ok(())
    }

    pub async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, AppError> {
        self.store.purge_expired(now).await
    }
}

/// Início da janela fixa que contém `now`.
pub fn window_start(now: DateTime<Utc>, window: Duration) -> DateTime<Utc> {
    let secs = window.num_seconds().max(1);
    let ts = now.timestamp();
    let start = ts - ts.rem_euclid(secs);
    DateTime::from_timestamp(start, 0).unwrap_or(now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    use chrono::TimeZone;

    #[derive(Default)]
    struct MemoryStore {
        windows: Mutex<HashMap<(String, DateTime<Utc>), (u32, DateTime<Utc>)>>,
    }

    #[async_trait]
    impl RateLimitStore for MemoryStore {
        async fn hit(
            &self,
            key: &str,
            window_start: DateTime<Utc>,
            expires_at: DateTime<Utc>,
        ) -> Result<u32, AppError> {
            let mut windows = self.windows.lock().unwrap();
            let entry = windows
                .entry((key.to_string(), window_start))
                .or_insert((0, expires_at));
            entry.0 += 1;
            Ok(entry.0)
        }

        async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, AppError> {
            let mut windows = self.windows.lock().unwrap();
            let before = windows.len();
            windows.retain(|_, (_, expires_at)| *expires_at > now);
            Ok((before - windows.len()) as u64)
        }
    }

    fn t(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, h, m, s).unwrap()
    }

    #[test]
    fn test_window_start_aligns_to_window() {
        assert_eq!(window_start(t(10, 0, 59), Duration::seconds(60)), t(10, 0, 0));
        assert_eq!(window_start(t(10, 7, 30), Duration::minutes(5)), t(10, 5, 0));
    }

    #[tokio::test]
    async fn test_blocks_after_max_hits_in_same_window() {
        let limiter = RateLimiter::new(Arc::new(MemoryStore::default()), 2, Duration::seconds(60));

        assert!(limiter.check("login", "ana@x.com", t(10, 0, 1)).await.is_ok());
        assert!(limiter.check("login", "ana@x.com", t(10, 0, 2)).await.is_ok());

        match limiter.check("login", "ana@x.com", t(10, 0, 50)).await {
            Err(AppError::RateLimited { retry_after_secs }) => assert_eq!(retry_after_secs, 10),
            other => panic!("esperava RateLimited, veio {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_counters_are_per_scope_and_subject() {
        let limiter = RateLimiter::new(Arc::new(MemoryStore::default()), 1, Duration::seconds(60));

        assert!(limiter.check("login", "a", t(10, 0, 1)).await.is_ok());
        assert!(limiter.check("login", "b", t(10, 0, 1)).await.is_ok());
        assert!(limiter.check("portal", "a", t(10, 0, 1)).await.is_ok());
        assert!(limiter.check("login", "a", t(10, 0, 2)).await.is_err());
    }

    #[tokio::test]
    async fn test_new_window_resets_counter() {
        let limiter = RateLimiter::new(Arc::new(MemoryStore::default()), 1, Duration::seconds(60));

        assert!(limiter.check("login", "a", t(10, 0, 59)).await.is_ok());
        assert!(limiter.check("login", "a", t(10, 1, 0)).await.is_ok());
    }

    #[tokio::test]
    async fn test_purge_drops_expired_windows() {
        let limiter = RateLimiter::new(Arc::new(MemoryStore::default()), 5, Duration::seconds(60));
        limiter.check("login", "a", t(10, 0, 0)).await.unwrap();
        limiter.check("login", "a", t(10, 2, 0)).await.unwrap();

        assert_eq!(limiter.purge_expired(t(10, 2, 30)).await.unwrap(), 1);
    }
}
