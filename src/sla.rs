//! Regras de SLA: classificação de um chamado, consolidação por tipo e
//! cálculo de prazos. Tudo aqui é puro: nada é persistido.

pub mod aggregator;
pub mod deadlines;
pub mod evaluator;

pub use aggregator::aggregate;
pub use deadlines::{compute_deadlines, Deadlines};
pub use evaluator::{minutes_remaining, SlaEvaluator};
