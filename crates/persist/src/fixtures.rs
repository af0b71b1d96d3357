use serde::{Deserialize, Serialize};

use crate::LogEvent;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tally {
    pub id: String,
    pub amount: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence: Option<u64>,
}

impl Tally {
    pub fn new(id: &str, amount: i64) -> Self {
        Self {
            id: id.to_string(),
            amount,
            sequence: None,
        }
    }
}

impl LogEvent for Tally {
    fn sequence(&self) -> Option<u64> {
        self.sequence
    }

    fn set_sequence(&mut self, sequence: u64) {
        self.sequence = Some(sequence);
    }
}

/// Running total plus an order-sensitive trace so paging bugs show up.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ledger {
    pub total: i64,
    pub trace: Vec<String>,
}

pub fn fold(mut ledger: Ledger, event: &Tally) -> Ledger {
    ledger.total += event.amount;
    ledger.trace.push(event.id.clone());
    ledger
}

pub fn tallies(prefix: &str, count: usize) -> Vec<Tally> {
    (0..count)
        .map(|i| Tally::new(&format!("{prefix}-{i}"), i as i64 % 7 - 3))
        .collect()
}
