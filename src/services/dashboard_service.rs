// src/services/dashboard_service.rs

use chrono::{DateTime, Local, NaiveTime, TimeZone, Utc};

use crate::{
    common::error::AppError,
    db::DashboardRepository,
    models::dashboard::DashboardSummary,
};

#[derive(Clone)]
pub struct DashboardService {
    repo: DashboardRepository,
}

impl DashboardService {
    pub fn new(repo: DashboardRepository) -> Self {
        Self { repo }
    }

    /// Os quatro contadores são consultas independentes e rodam em paralelo,
    /// cada uma na sua conexão da pool.
    pub async fn get_summary(&self, now: DateTime<Utc>) -> Result<DashboardSummary, AppError> {
        let pool = self.repo.pool();
        let since = start_of_day(now.with_timezone(&Local));

        let (open_total, at_risk, resolved_today, critical_problems) = tokio::try_join!(
            self.repo.count_open(pool),
            self.repo.count_at_risk(pool, now),
            self.repo.count_resolved_since(pool, since),
            self.repo.count_critical_problems(pool),
        )?;

        Ok(DashboardSummary { open_total, at_risk, resolved_today, critical_problems })
    }
}

/// Meia-noite do dia de `now` no fuso de `now`, em UTC.
pub fn start_of_day<Tz: TimeZone>(now: DateTime<Tz>) -> DateTime<Utc> {
    let midnight = now.date_naive().and_time(NaiveTime::MIN);
    now.timezone()
        .from_local_datetime(&midnight)
        .earliest()
        .map(|local| local.with_timezone(&Utc))
        // Fusos sem meia-noite naquele dia (horário de verão)
        .unwrap_or_else(|| midnight.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    #[test]
    fn test_start_of_day_uses_local_calendar_day() {
        let brt = FixedOffset::west_opt(3 * 3600).unwrap();

        // 01:30 em Brasília ainda é o dia 15 local (04:30 UTC)
        let now = brt.with_ymd_and_hms(2024, 6, 15, 1, 30, 0).unwrap();
        assert_eq!(start_of_day(now), Utc.with_ymd_and_hms(2024, 6, 15, 3, 0, 0).unwrap());

        // 23:00 em Brasília já é dia 16 em UTC, mas o dia local é 15
        let late = brt.with_ymd_and_hms(2024, 6, 15, 23, 0, 0).unwrap();
        assert_eq!(start_of_day(late), Utc.with_ymd_and_hms(2024, 6, 15, 3, 0, 0).unwrap());
    }

    #[test]
    fn test_start_of_day_in_utc() {
        let now = Utc.with_ymd_and_hms(2024, 1, 10, 18, 45, 12).unwrap();
        assert_eq!(start_of_day(now), Utc.with_ymd_and_hms(2024, 1, 10, 0, 0, 0).unwrap());
    }
}
