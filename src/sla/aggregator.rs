// src/sla/aggregator.rs

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::{
    models::{
        sla::{SlaPerformanceRow, SlaRecord, SlaStatus},
        ticket::TicketKind,
    },
    sla::evaluator::SlaEvaluator,
};

/// Meta de cumprimento de SLA (%).
pub const SLA_TARGET_PERCENT: u32 = 95;

pub const OVERALL_KEY: &str = "overall";
pub const OVERALL_LABEL: &str = "Geral";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Tally {
    total: u32,
    on_time: u32,
    breached: u32,
    unknown: u32,
    without_sla: u32,
}

impl Tally {
    fn record(&mut self, status: SlaStatus) {
        match status {
            SlaStatus::NoSla => self.without_sla += 1,
            SlaStatus::OnTime => {
                self.total += 1;
                self.on_time += 1;
            }
            SlaStatus::Breached => {
                self.total += 1;
                self.breached += 1;
            }
            SlaStatus::Unknown => {
                self.total += 1;
                self.unknown += 1;
            }
        }
    }

    fn merge(&mut self, other: &Tally) {
        self.total += other.total;
        self.on_time += other.on_time;
        self.breached += other.breached;
        self.unknown += other.unknown;
        self.without_sla += other.without_sla;
    }

    fn into_row(self, key: &str, label: &str) -> SlaPerformanceRow {
        SlaPerformanceRow {
            key: key.to_string(),
            label: label.to_string(),
            total: self.total,
            on_time: self.on_time,
            breached: self.breached,
            unknown: self.unknown,
            without_sla: self.without_sla,
            percentage: percentage(self.on_time, self.total),
            target: SLA_TARGET_PERCENT,
        }
    }
}

/// round(part / total * 100), 0 quando não há registros.
pub fn percentage(part: u32, total: u32) -> u32 {
    if total == 0 {
        return 0;
    }
    // Arredondamento meio-para-cima em aritmética inteira
    let part = part as u64;
    let total = total as u64;
    ((part * 200 + total) / (total * 2)) as u32
}

/// Agrupa por tipo, classifica cada registro e produz uma linha por tipo
/// (ordem fixa) precedida da linha "Geral".
///
/// A linha geral soma as contagens e recalcula o percentual a partir das
/// somas; ela não é a média dos percentuais por tipo.
pub fn aggregate<'a, I>(
    records: I,
    evaluator: &SlaEvaluator,
    now: DateTime<Utc>,
) -> Vec<SlaPerformanceRow>
where
    I: IntoIterator<Item = &'a SlaRecord>,
{
    let mut by_kind: HashMap<TicketKind, Tally> = HashMap::new();
    for record in records {
        by_kind
            .entry(record.kind)
            .or_default()
            .record(evaluator.classify(record, now));
    }

    let mut overall = Tally::default();
    let mut rows = Vec::with_capacity(TicketKind::ALL.len() + 1);
    for kind in TicketKind::ALL {
        let tally = by_kind.get(&kind).copied().unwrap_or_default();
        overall.merge(&tally);
        rows.push(tally.into_row(kind.key(), kind.label()));
    }

    rows.insert(0, overall.into_row(OVERALL_KEY, OVERALL_LABEL));
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    use crate::models::ticket::TicketStatus;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()
    }

    fn on_time(kind: TicketKind) -> SlaRecord {
        SlaRecord {
            kind,
            status: TicketStatus::Resolved,
            resolution_due_at: Some(now() - Duration::hours(1)),
            resolved_at: Some(now() - Duration::hours(2)),
            closed_at: None,
        }
    }

    fn breached(kind: TicketKind) -> SlaRecord {
        SlaRecord {
            kind,
            status: TicketStatus::Open,
            resolution_due_at: Some(now() - Duration::hours(1)),
            resolved_at: None,
            closed_at: None,
        }
    }

    fn row<'a>(rows: &'a [SlaPerformanceRow], key: &str) -> &'a SlaPerformanceRow {
        rows.iter().find(|r| r.key == key).unwrap()
    }

    #[test]
    fn test_empty_input_yields_zero_percentages() {
        let rows = aggregate(&Vec::<SlaRecord>::new(), &SlaEvaluator::default(), now());
        assert_eq!(rows.len(), 5);
        for r in &rows {
            assert_eq!(r.total, 0);
            assert_eq!(r.percentage, 0);
            assert_eq!(r.target, 95);
        }
    }

    #[test]
    fn test_overall_row_is_first_and_kinds_keep_fixed_order() {
        let rows = aggregate(&Vec::<SlaRecord>::new(), &SlaEvaluator::default(), now());
        let keys: Vec<&str> = rows.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, vec!["overall", "incident", "request", "problem", "change"]);
        assert_eq!(rows[0].label, "Geral");
    }

    #[test]
    fn test_overall_is_weighted_by_volume() {
        // A: 1/1 no prazo (100%), B: 0/9 (0%) => geral 10%, não 50%
        let mut records = vec![on_time(TicketKind::Incident)];
        records.extend((0..9).map(|_| breached(TicketKind::Change)));

        let rows = aggregate(&records, &SlaEvaluator::default(), now());
        assert_eq!(row(&rows, "incident").percentage, 100);
        assert_eq!(row(&rows, "change").percentage, 0);

        let overall = row(&rows, "overall");
        assert_eq!(overall.total, 10);
        assert_eq!(overall.on_time, 1);
        assert_eq!(overall.breached, 9);
        assert_eq!(overall.percentage, 10);
    }

    #[test]
    fn test_no_sla_records_are_reported_but_not_counted() {
        let mut unlimited = breached(TicketKind::Problem);
        unlimited.resolution_due_at = None;

        let rows = aggregate(
            &[unlimited, on_time(TicketKind::Problem)],
            &SlaEvaluator::default(),
            now(),
        );
        let problem = row(&rows, "problem");
        assert_eq!(problem.total, 1);
        assert_eq!(problem.without_sla, 1);
        assert_eq!(problem.percentage, 100);
    }

    #[test]
    fn test_request_rows_include_legacy_kind_key() {
        let legacy = SlaRecord {
            kind: TicketKind::from_key("service_request").unwrap(),
            ..on_time(TicketKind::Incident)
        };
        let rows = aggregate(
            &[legacy, breached(TicketKind::Request)],
            &SlaEvaluator::default(),
            now(),
        );
        let request = row(&rows, "request");
        assert_eq!(request.total, 2);
        assert_eq!(request.on_time, 1);
        assert_eq!(request.percentage, 50);
    }

    #[test]
    fn test_unknown_counts_in_total_only() {
        let evaluator =
            SlaEvaluator::new(crate::models::sla::MissingResolutionPolicy::Unknown);
        let mut missing = on_time(TicketKind::Incident);
        missing.resolved_at = None;

        let rows = aggregate(&[missing, on_time(TicketKind::Incident)], &evaluator, now());
        let incident = row(&rows, "incident");
        assert_eq!(incident.total, 2);
        assert_eq!(incident.unknown, 1);
        assert_eq!(incident.on_time, 1);
        assert_eq!(incident.breached, 0);
        assert_eq!(incident.percentage, 50);
    }

    #[test]
    fn test_percentage_rounds_half_up() {
        assert_eq!(percentage(0, 0), 0);
        assert_eq!(percentage(1, 9), 11);
        assert_eq!(percentage(5, 8), 63);
        assert_eq!(percentage(2, 3), 67);
        assert_eq!(percentage(1, 3), 33);
        assert_eq!(percentage(7, 7), 100);
    }
}
