// src/sla/evaluator.rs

use chrono::{DateTime, Utc};

use crate::models::{
    sla::{MissingResolutionPolicy, SlaRecord, SlaRiskRow, SlaStatus},
    ticket::{Ticket, TicketStatus},
};

/// Qualquer registro "tipo chamado" que o avaliador consegue classificar.
pub trait SlaSubject {
    fn status(&self) -> TicketStatus;
    fn resolution_due_at(&self) -> Option<DateTime<Utc>>;
    fn resolved_at(&self) -> Option<DateTime<Utc>>;
    fn closed_at(&self) -> Option<DateTime<Utc>>;
}

impl SlaSubject for Ticket {
    fn status(&self) -> TicketStatus {
        self.status
    }
    fn resolution_due_at(&self) -> Option<DateTime<Utc>> {
        self.resolution_due_at
    }
    fn resolved_at(&self) -> Option<DateTime<Utc>> {
        self.resolved_at
    }
    fn closed_at(&self) -> Option<DateTime<Utc>> {
        self.closed_at
    }
}

impl SlaSubject for SlaRecord {
    fn status(&self) -> TicketStatus {
        self.status
    }
    fn resolution_due_at(&self) -> Option<DateTime<Utc>> {
        self.resolution_due_at
    }
    fn resolved_at(&self) -> Option<DateTime<Utc>> {
        self.resolved_at
    }
    fn closed_at(&self) -> Option<DateTime<Utc>> {
        self.closed_at
    }
}

// A lista de risco só traz chamados em aberto
impl SlaSubject for SlaRiskRow {
    fn status(&self) -> TicketStatus {
        self.status
    }
    fn resolution_due_at(&self) -> Option<DateTime<Utc>> {
        self.resolution_due_at
    }
    fn resolved_at(&self) -> Option<DateTime<Utc>> {
        None
    }
    fn closed_at(&self) -> Option<DateTime<Utc>> {
        None
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SlaEvaluator {
    missing_resolution: MissingResolutionPolicy,
}

impl SlaEvaluator {
    pub fn new(missing_resolution: MissingResolutionPolicy) -> Self {
        Self { missing_resolution }
    }

    /// Classifica um registro no instante `now`.
    ///
    /// - sem prazo de resolução: `NoSla`, qualquer que seja o status;
    /// - terminal: compara resolução (ou fechamento) com o prazo;
    /// - em aberto: compara `now` com o prazo.
    ///
    /// A comparação é `<=`: terminar exatamente no prazo conta como no prazo.
    pub fn classify<T: SlaSubject + ?Sized>(&self, record: &T, now: DateTime<Utc>) -> SlaStatus {
        let Some(due) = record.resolution_due_at() else {
            return SlaStatus::NoSla;
        };

        let instant = if record.status().is_terminal() {
            match record.resolved_at().or_else(|| record.closed_at()) {
                Some(finished) => finished,
                None => match self.missing_resolution {
                    MissingResolutionPolicy::Unknown => return SlaStatus::Unknown,
                    MissingResolutionPolicy::AssumeNow => {
                        tracing::warn!(
                            "Chamado terminal sem data de resolução/fechamento; comparando o prazo com o instante atual."
                        );
                        now
                    }
                },
            }
        } else {
            now
        };

        if instant <= due {
            SlaStatus::OnTime
        } else {
            SlaStatus::Breached
        }
    }
}

/// Minutos até o prazo (negativo quando já venceu).
pub fn minutes_remaining(due: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (due - now).num_minutes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    use crate::models::ticket::TicketKind;

    fn ts(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn record(
        status: TicketStatus,
        due: Option<DateTime<Utc>>,
        resolved: Option<DateTime<Utc>>,
        closed: Option<DateTime<Utc>>,
    ) -> SlaRecord {
        SlaRecord {
            kind: TicketKind::Incident,
            status,
            resolution_due_at: due,
            resolved_at: resolved,
            closed_at: closed,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_no_due_is_no_sla_for_every_status() {
        let eval = SlaEvaluator::default();
        let past = Some(now() - Duration::days(3));
        for status in [
            TicketStatus::Open,
            TicketStatus::InProgress,
            TicketStatus::Pending,
            TicketStatus::Resolved,
            TicketStatus::Closed,
        ] {
            assert_eq!(eval.classify(&record(status, None, past, past), now()), SlaStatus::NoSla);
            assert_eq!(eval.classify(&record(status, None, None, None), now()), SlaStatus::NoSla);
        }
    }

    #[test]
    fn test_resolved_one_second_before_due_is_on_time() {
        let eval = SlaEvaluator::default();
        let r = record(
            TicketStatus::Resolved,
            Some(ts("2024-01-10T00:00:00Z")),
            Some(ts("2024-01-09T23:59:59Z")),
            None,
        );
        assert_eq!(eval.classify(&r, now()), SlaStatus::OnTime);
    }

    #[test]
    fn test_resolved_one_second_after_due_is_breached() {
        let eval = SlaEvaluator::default();
        let r = record(
            TicketStatus::Resolved,
            Some(ts("2024-01-10T00:00:00Z")),
            Some(ts("2024-01-10T00:00:01Z")),
            None,
        );
        assert_eq!(eval.classify(&r, now()), SlaStatus::Breached);
    }

    #[test]
    fn test_resolved_exactly_at_due_is_on_time() {
        let eval = SlaEvaluator::default();
        let due = ts("2024-01-10T00:00:00Z");
        let r = record(TicketStatus::Closed, Some(due), Some(due), None);
        assert_eq!(eval.classify(&r, now()), SlaStatus::OnTime);
    }

    #[test]
    fn test_closed_falls_back_to_closure_instant() {
        let eval = SlaEvaluator::default();
        let due = ts("2024-01-10T00:00:00Z");
        let late = record(TicketStatus::Closed, Some(due), None, Some(ts("2024-01-11T08:00:00Z")));
        let early = record(TicketStatus::Closed, Some(due), None, Some(ts("2024-01-09T08:00:00Z")));
        assert_eq!(eval.classify(&late, now()), SlaStatus::Breached);
        assert_eq!(eval.classify(&early, now()), SlaStatus::OnTime);
    }

    #[test]
    fn test_resolution_instant_wins_over_closure() {
        let eval = SlaEvaluator::default();
        let due = ts("2024-01-10T00:00:00Z");
        let r = record(
            TicketStatus::Closed,
            Some(due),
            Some(ts("2024-01-09T10:00:00Z")),
            Some(ts("2024-01-12T10:00:00Z")),
        );
        assert_eq!(eval.classify(&r, now()), SlaStatus::OnTime);
    }

    #[test]
    fn test_open_ticket_compares_now_with_due() {
        let eval = SlaEvaluator::default();
        let overdue = record(TicketStatus::Open, Some(now() - Duration::hours(1)), None, None);
        let upcoming = record(TicketStatus::Open, Some(now() + Duration::hours(1)), None, None);
        assert_eq!(eval.classify(&overdue, now()), SlaStatus::Breached);
        assert_eq!(eval.classify(&upcoming, now()), SlaStatus::OnTime);
    }

    #[test]
    fn test_open_ticket_flips_when_clock_passes_due() {
        let eval = SlaEvaluator::default();
        let due = now();
        let r = record(TicketStatus::Pending, Some(due), None, None);
        assert_eq!(eval.classify(&r, due), SlaStatus::OnTime);
        assert_eq!(eval.classify(&r, due + Duration::seconds(1)), SlaStatus::Breached);
    }

    #[test]
    fn test_open_ticket_ignores_stale_resolution_stamp() {
        let eval = SlaEvaluator::default();
        let r = record(
            TicketStatus::InProgress,
            Some(now() - Duration::hours(2)),
            Some(now() - Duration::hours(5)),
            None,
        );
        assert_eq!(eval.classify(&r, now()), SlaStatus::Breached);
    }

    #[test]
    fn test_terminal_without_stamps_assumes_now_by_default() {
        let eval = SlaEvaluator::default();
        let before = record(TicketStatus::Resolved, Some(now() + Duration::hours(1)), None, None);
        let after = record(TicketStatus::Resolved, Some(now() - Duration::hours(1)), None, None);
        assert_eq!(eval.classify(&before, now()), SlaStatus::OnTime);
        assert_eq!(eval.classify(&after, now()), SlaStatus::Breached);
    }

    #[test]
    fn test_terminal_without_stamps_is_unknown_under_strict_policy() {
        let eval = SlaEvaluator::new(MissingResolutionPolicy::Unknown);
        let r = record(TicketStatus::Closed, Some(now() + Duration::hours(1)), None, None);
        assert_eq!(eval.classify(&r, now()), SlaStatus::Unknown);
    }

    #[test]
    fn test_minutes_remaining_sign() {
        assert_eq!(minutes_remaining(now() + Duration::minutes(90), now()), 90);
        assert_eq!(minutes_remaining(now() - Duration::minutes(30), now()), -30);
    }
}
