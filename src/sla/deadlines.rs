// src/sla/deadlines.rs

use chrono::{DateTime, Duration, Utc};

use crate::models::sla::SlaPolicy;

/// Prazos de resposta e resolução de um chamado.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Deadlines {
    pub response_due_at: Option<DateTime<Utc>>,
    pub resolution_due_at: Option<DateTime<Utc>>,
}

/// Calculados na criação e na troca de categoria/SLA, a partir da abertura.
/// Transições de status nunca recalculam prazos.
pub fn compute_deadlines(opened_at: DateTime<Utc>, policy: Option<&SlaPolicy>) -> Deadlines {
    match policy {
        Some(p) if p.is_active => Deadlines {
            response_due_at: Some(opened_at + Duration::hours(p.response_hours.into())),
            resolution_due_at: Some(opened_at + Duration::hours(p.resolution_hours.into())),
        },
        _ => Deadlines::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use uuid::Uuid;

    fn policy(response: i32, resolution: i32, is_active: bool) -> SlaPolicy {
        let now = Utc::now();
        SlaPolicy {
            id: Uuid::new_v4(),
            name: "Padrão".into(),
            response_hours: response,
            resolution_hours: resolution,
            is_active,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_deadlines_are_offsets_from_opening() {
        let opened = Utc.with_ymd_and_hms(2024, 2, 1, 9, 30, 0).unwrap();
        let d = compute_deadlines(opened, Some(&policy(4, 48, true)));
        assert_eq!(d.response_due_at, Some(Utc.with_ymd_and_hms(2024, 2, 1, 13, 30, 0).unwrap()));
        assert_eq!(d.resolution_due_at, Some(Utc.with_ymd_and_hms(2024, 2, 3, 9, 30, 0).unwrap()));
    }

    #[test]
    fn test_no_policy_means_no_deadlines() {
        let opened = Utc.with_ymd_and_hms(2024, 2, 1, 9, 30, 0).unwrap();
        assert_eq!(compute_deadlines(opened, None), Deadlines::default());
    }

    #[test]
    fn test_inactive_policy_is_ignored() {
        let opened = Utc.with_ymd_and_hms(2024, 2, 1, 9, 30, 0).unwrap();
        assert_eq!(compute_deadlines(opened, Some(&policy(1, 2, false))), Deadlines::default());
    }
}
