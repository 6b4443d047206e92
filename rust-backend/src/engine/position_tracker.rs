// src/engine/position_tracker.rs
//
// Resolves Open Question 1 (spec.md §9): classifies each master execution as
// an entry or exit by tracking per-(account, symbol) signed open size in
// memory, updated from every normalised execution processed for that
// account. An execution extends or opens a position in its own direction
// (including flipping through flat) is an **entry**; anything that reduces
// or reverses an existing position is an **exit** (§4.3.3).

use std::collections::HashMap;
use std::sync::Mutex;

use uuid::Uuid;

use crate::adapter::model::{NormalizedExecution, TradeSide};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Entry,
    Exit,
}

/// Per-copier position tracker (one master account per copier, so keying by
/// symbol alone is sufficient within a single tracker instance).
#[derive(Default)]
pub struct PositionTracker {
    // signed size: positive = long, negative = short, 0/absent = flat.
    open_size: Mutex<HashMap<String, i64>>,
}

impl PositionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classifies `exec` against the current tracked position for its
    /// symbol, then updates the tracked position to reflect it.
    pub fn classify_and_update(&self, exec: &NormalizedExecution) -> Classification {
        let delta = exec.quantity * exec.side.sign();
        let mut positions = self.open_size.lock().unwrap();
        let current = positions.entry(exec.symbol.clone()).or_insert(0);

        let classification = if *current == 0 {
            Classification::Entry
        } else if current.signum() == exec.side.sign().signum() {
            Classification::Entry
        } else {
            Classification::Exit
        };

        *current += delta;
        classification
    }

    /// Seeds tracked position state from a prior open position snapshot —
    /// used on copier restart so classification is correct immediately
    /// rather than only after the first post-restart execution (§4.3.7).
    pub fn seed(&self, symbol: &str, signed_size: i64) {
        self.open_size.lock().unwrap().insert(symbol.to_string(), signed_size);
    }
}

/// Process-wide registry of trackers, one per active copier, so the
/// supervisor can drop a tracker's state when its copier stops.
#[derive(Default)]
pub struct TrackerRegistry {
    trackers: Mutex<HashMap<Uuid, std::sync::Arc<PositionTracker>>>,
}

impl TrackerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_create(&self, copier_id: Uuid) -> std::sync::Arc<PositionTracker> {
        self.trackers
            .lock()
            .unwrap()
            .entry(copier_id)
            .or_insert_with(|| std::sync::Arc::new(PositionTracker::new()))
            .clone()
    }

    pub fn remove(&self, copier_id: Uuid) {
        self.trackers.lock().unwrap().remove(&copier_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::model::{OrderKind, TradeStatus};

    fn exec(symbol: &str, side: TradeSide, qty: i64) -> NormalizedExecution {
        NormalizedExecution {
            external_order_id: "o".into(),
            external_trade_id: Some("t".into()),
            symbol: symbol.to_string(),
            side,
            order_kind: OrderKind::Market,
            quantity: qty,
            price: Some(100.0),
            stop_loss: None,
            take_profit: None,
            status: TradeStatus::Filled,
            realised_pnl: None,
            filled_at: None,
            is_modification: false,
        }
    }

    #[test]
    fn first_fill_on_a_symbol_is_always_an_entry() {
        let tracker = PositionTracker::new();
        let c = tracker.classify_and_update(&exec("ES", TradeSide::Buy, 1));
        assert_eq!(c, Classification::Entry);
    }

    #[test]
    fn same_direction_fill_extends_as_entry() {
        let tracker = PositionTracker::new();
        tracker.classify_and_update(&exec("ES", TradeSide::Buy, 1));
        let c = tracker.classify_and_update(&exec("ES", TradeSide::Buy, 1));
        assert_eq!(c, Classification::Entry);
    }

    #[test]
    fn opposing_fill_against_open_position_is_an_exit() {
        let tracker = PositionTracker::new();
        tracker.classify_and_update(&exec("ES", TradeSide::Buy, 2));
        let c = tracker.classify_and_update(&exec("ES", TradeSide::Sell, 1));
        assert_eq!(c, Classification::Exit);
    }

    #[test]
    fn flip_through_flat_becomes_entry_once_position_crosses_zero() {
        let tracker = PositionTracker::new();
        tracker.classify_and_update(&exec("ES", TradeSide::Buy, 1));
        // Closes the long exactly (exit), net position now flat.
        let closing = tracker.classify_and_update(&exec("ES", TradeSide::Sell, 1));
        assert_eq!(closing, Classification::Exit);
        // From flat, next fill in either direction is a fresh entry.
        let reopen = tracker.classify_and_update(&exec("ES", TradeSide::Sell, 1));
        assert_eq!(reopen, Classification::Entry);
    }

    #[test]
    fn tracks_symbols_independently() {
        let tracker = PositionTracker::new();
        tracker.classify_and_update(&exec("ES", TradeSide::Buy, 1));
        let c = tracker.classify_and_update(&exec("NQ", TradeSide::Sell, 1));
        assert_eq!(c, Classification::Entry);
    }
}
