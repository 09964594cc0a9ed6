//! Inventory ledger: the only mutator of stock levels.
//!
//! Each (hospital, blood type) key has its own mutex. Single-key operations
//! hold that mutex for the whole read-modify-write; transfers hold both keys,
//! acquired in ascending key order so opposite-direction transfers cannot
//! deadlock.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use bloodline_core::{BloodType, DomainError, DomainResult, HospitalId};

use crate::level::InventoryLevel;

type Key = (HospitalId, BloodType);
type Slot = Arc<Mutex<InventoryLevel>>;

/// Bounds applied to rows created on first write.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct LevelBounds {
    pub min_required: u32,
    pub max_capacity: u32,
}

impl Default for LevelBounds {
    fn default() -> Self {
        Self {
            min_required: 10,
            max_capacity: 100,
        }
    }
}

/// Levels at both ends after a committed transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferOutcome {
    pub source: InventoryLevel,
    pub destination: InventoryLevel,
}

#[derive(Debug, Default)]
pub struct InventoryLedger {
    slots: RwLock<HashMap<Key, Slot>>,
}

fn lock(slot: &Slot) -> MutexGuard<'_, InventoryLevel> {
    slot.lock().unwrap_or_else(|p| p.into_inner())
}

fn missing(hospital: HospitalId, blood_type: BloodType) -> DomainError {
    DomainError::not_found(format!("inventory for hospital {hospital} / {blood_type}"))
}

impl InventoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a row.
    pub fn register(&self, level: InventoryLevel) {
        let key = (level.hospital_id, level.blood_type);
        let mut slots = self.slots.write().unwrap_or_else(|p| p.into_inner());
        match slots.get(&key) {
            Some(slot) => *lock(slot) = level,
            None => {
                slots.insert(key, Arc::new(Mutex::new(level)));
            }
        }
    }

    fn slot(&self, hospital: HospitalId, blood_type: BloodType) -> DomainResult<Slot> {
        self.slots
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .get(&(hospital, blood_type))
            .cloned()
            .ok_or_else(|| missing(hospital, blood_type))
    }

    pub fn get(&self, hospital: HospitalId, blood_type: BloodType) -> DomainResult<InventoryLevel> {
        let slot = self.slot(hospital, blood_type)?;
        let level = lock(&slot).clone();
        Ok(level)
    }

    /// Snapshot of matching rows ordered by (hospital, blood type).
    ///
    /// Each row is read under its own lock; the list as a whole is not a
    /// point-in-time cut across keys.
    pub fn list(&self, blood_type: Option<BloodType>, hospital: Option<HospitalId>) -> Vec<InventoryLevel> {
        let slots: Vec<(Key, Slot)> = {
            let guard = self.slots.read().unwrap_or_else(|p| p.into_inner());
            guard
                .iter()
                .filter(|((h, bt), _)| {
                    blood_type.is_none_or(|want| *bt == want) && hospital.is_none_or(|want| *h == want)
                })
                .map(|(k, s)| (*k, Arc::clone(s)))
                .collect()
        };

        let mut out: Vec<InventoryLevel> = slots.iter().map(|(_, s)| lock(s).clone()).collect();
        out.sort_by_key(|l| (l.hospital_id, l.blood_type));
        out
    }

    pub fn len(&self) -> usize {
        self.slots.read().unwrap_or_else(|p| p.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Atomic signed adjustment of one key.
    pub fn adjust(
        &self,
        hospital: HospitalId,
        blood_type: BloodType,
        delta: i64,
        now: DateTime<Utc>,
    ) -> DomainResult<InventoryLevel> {
        let slot = self.slot(hospital, blood_type)?;
        let mut level = lock(&slot);
        level.apply_delta(delta, now)?;
        debug!(hospital = %hospital, blood_type = %blood_type, delta, current = level.current_units, "inventory adjusted");
        Ok(level.clone())
    }

    /// Set `current_units` directly, creating the row with `bounds` if it
    /// does not exist yet.
    pub fn set_current(
        &self,
        hospital: HospitalId,
        blood_type: BloodType,
        units: u32,
        bounds: LevelBounds,
        now: DateTime<Utc>,
    ) -> DomainResult<InventoryLevel> {
        let slot = {
            let mut slots = self.slots.write().unwrap_or_else(|p| p.into_inner());
            match slots.get(&(hospital, blood_type)) {
                Some(slot) => Arc::clone(slot),
                None => {
                    let level = InventoryLevel::new(
                        hospital,
                        blood_type,
                        units,
                        bounds.min_required,
                        bounds.max_capacity,
                        now,
                    )?;
                    slots.insert((hospital, blood_type), Arc::new(Mutex::new(level.clone())));
                    info!(hospital = %hospital, blood_type = %blood_type, units, "inventory row created");
                    return Ok(level);
                }
            }
        };

        let mut level = lock(&slot);
        level.set_current(units, now)?;
        info!(hospital = %hospital, blood_type = %blood_type, units, "inventory updated");
        Ok(level.clone())
    }

    /// Move `units` from one hospital to another, all or nothing.
    pub fn transfer(
        &self,
        from: HospitalId,
        to: HospitalId,
        blood_type: BloodType,
        units: u32,
        now: DateTime<Utc>,
    ) -> DomainResult<TransferOutcome> {
        check_transfer(from, to, units)?;

        let src_slot = self.slot(from, blood_type)?;
        let dst_slot = self.slot(to, blood_type)?;

        let (mut src, mut dst) = if (from, blood_type) < (to, blood_type) {
            let s = lock(&src_slot);
            let d = lock(&dst_slot);
            (s, d)
        } else {
            let d = lock(&dst_slot);
            let s = lock(&src_slot);
            (s, d)
        };

        let src_before = src.clone();
        if let Err(err) = src.apply_delta(-i64::from(units), now) {
            warn!(from = %from, to = %to, blood_type = %blood_type, units, error = %err, "transfer rejected");
            return Err(err);
        }
        if let Err(err) = dst.apply_delta(i64::from(units), now) {
            *src = src_before;
            warn!(from = %from, to = %to, blood_type = %blood_type, units, error = %err, "transfer rolled back");
            return Err(err);
        }

        info!(
            from = %from,
            to = %to,
            blood_type = %blood_type,
            units,
            source_remaining = src.current_units,
            destination_level = dst.current_units,
            "transfer executed"
        );

        Ok(TransferOutcome {
            source: src.clone(),
            destination: dst.clone(),
        })
    }

    /// Like [`transfer`](Self::transfer), but a missing destination row is
    /// created with `bounds`. The new row is inserted only when the transfer
    /// commits; a rejected transfer leaves the set of rows untouched.
    pub fn transfer_into(
        &self,
        from: HospitalId,
        to: HospitalId,
        blood_type: BloodType,
        units: u32,
        bounds: LevelBounds,
        now: DateTime<Utc>,
    ) -> DomainResult<TransferOutcome> {
        check_transfer(from, to, units)?;

        // Map lock before slot lock, the same order `register` uses.
        let mut slots = self.slots.write().unwrap_or_else(|p| p.into_inner());
        if slots.contains_key(&(to, blood_type)) {
            drop(slots);
            return self.transfer(from, to, blood_type, units, now);
        }
        let src_slot = slots
            .get(&(from, blood_type))
            .cloned()
            .ok_or_else(|| missing(from, blood_type))?;

        let mut src = lock(&src_slot);
        let src_before = src.clone();
        if let Err(err) = src.apply_delta(-i64::from(units), now) {
            warn!(from = %from, to = %to, blood_type = %blood_type, units, error = %err, "transfer rejected");
            return Err(err);
        }
        let dst = match InventoryLevel::new(to, blood_type, units, bounds.min_required, bounds.max_capacity, now) {
            Ok(level) => level,
            Err(err) => {
                *src = src_before;
                warn!(from = %from, to = %to, blood_type = %blood_type, units, error = %err, "transfer rolled back");
                return Err(err);
            }
        };
        slots.insert((to, blood_type), Arc::new(Mutex::new(dst.clone())));

        info!(
            from = %from,
            to = %to,
            blood_type = %blood_type,
            units,
            source_remaining = src.current_units,
            destination_level = dst.current_units,
            "transfer executed into new inventory row"
        );

        Ok(TransferOutcome {
            source: src.clone(),
            destination: dst,
        })
    }
}

fn check_transfer(from: HospitalId, to: HospitalId, units: u32) -> DomainResult<()> {
    if units == 0 {
        return Err(DomainError::validation("transfer units must be positive"));
    }
    if from == to {
        return Err(DomainError::validation("source and destination must differ"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const A: HospitalId = HospitalId::new(1);
    const B: HospitalId = HospitalId::new(2);

    fn ledger_with(a: u32, b: u32, min: u32, cap: u32) -> InventoryLedger {
        let ledger = InventoryLedger::new();
        let now = Utc::now();
        ledger.register(InventoryLevel::new(A, BloodType::OPos, a, min, cap, now).unwrap());
        ledger.register(InventoryLevel::new(B, BloodType::OPos, b, min, cap, now).unwrap());
        ledger
    }

    fn units(ledger: &InventoryLedger, h: HospitalId) -> u32 {
        ledger.get(h, BloodType::OPos).unwrap().current_units
    }

    #[test]
    fn transfer_moves_units() {
        let ledger = ledger_with(44, 2, 16, 100);
        let out = ledger.transfer(A, B, BloodType::OPos, 14, Utc::now()).unwrap();
        assert_eq!(out.source.current_units, 30);
        assert_eq!(out.destination.current_units, 16);
    }

    #[test]
    fn overdraw_leaves_both_sides_unchanged() {
        let ledger = ledger_with(5, 2, 16, 100);
        let err = ledger.transfer(A, B, BloodType::OPos, 6, Utc::now()).unwrap_err();
        assert_eq!(err.kind(), "insufficient_inventory");
        assert_eq!((units(&ledger, A), units(&ledger, B)), (5, 2));
    }

    #[test]
    fn failed_credit_rolls_back_debit() {
        let ledger = ledger_with(50, 95, 10, 100);
        let err = ledger.transfer(A, B, BloodType::OPos, 10, Utc::now()).unwrap_err();
        assert_eq!(err.kind(), "capacity_exceeded");
        assert_eq!((units(&ledger, A), units(&ledger, B)), (50, 95));
    }

    #[test]
    fn transfer_validates_inputs() {
        let ledger = ledger_with(10, 10, 5, 100);
        let now = Utc::now();
        assert_eq!(ledger.transfer(A, B, BloodType::OPos, 0, now).unwrap_err().kind(), "validation_error");
        assert_eq!(ledger.transfer(A, A, BloodType::OPos, 1, now).unwrap_err().kind(), "validation_error");
        assert_eq!(ledger.transfer(A, B, BloodType::ANeg, 1, now).unwrap_err().kind(), "not_found");
    }

    #[test]
    fn set_current_creates_missing_rows_with_bounds() {
        let ledger = InventoryLedger::new();
        let level = ledger
            .set_current(A, BloodType::BNeg, 7, LevelBounds::default(), Utc::now())
            .unwrap();
        assert_eq!((level.current_units, level.min_required, level.max_capacity), (7, 10, 100));

        let err = ledger
            .set_current(A, BloodType::BNeg, 101, LevelBounds::default(), Utc::now())
            .unwrap_err();
        assert_eq!(err.kind(), "capacity_exceeded");
        assert_eq!(units_of(&ledger, A, BloodType::BNeg), 7);

        assert!(ledger
            .set_current(B, BloodType::BNeg, 500, LevelBounds::default(), Utc::now())
            .is_err());
        assert!(ledger.get(B, BloodType::BNeg).is_err());
    }

    #[test]
    fn transfer_into_creates_row_only_on_commit() {
        let ledger = ledger_with(30, 5, 10, 100);
        let now = Utc::now();

        let err = ledger
            .transfer_into(A, B, BloodType::OPos, 40, LevelBounds::default(), now)
            .unwrap_err();
        assert_eq!(err.kind(), "insufficient_inventory");
        assert_eq!((units(&ledger, A), units(&ledger, B)), (30, 5));

        ledger.register(InventoryLevel::new(A, BloodType::AbNeg, 3, 5, 100, now).unwrap());
        let err = ledger
            .transfer_into(A, B, BloodType::AbNeg, 50, LevelBounds::default(), now)
            .unwrap_err();
        assert_eq!(err.kind(), "insufficient_inventory");
        assert_eq!(ledger.len(), 3);
        assert!(ledger.get(B, BloodType::AbNeg).is_err());

        let tight = LevelBounds {
            min_required: 1,
            max_capacity: 2,
        };
        let err = ledger
            .transfer_into(A, B, BloodType::AbNeg, 3, tight, now)
            .unwrap_err();
        assert_eq!(err.kind(), "capacity_exceeded");
        assert_eq!(units_of(&ledger, A, BloodType::AbNeg), 3);
        assert_eq!(ledger.len(), 3);

        let out = ledger
            .transfer_into(A, B, BloodType::AbNeg, 2, LevelBounds::default(), now)
            .unwrap();
        assert_eq!((out.source.current_units, out.destination.current_units), (1, 2));
        assert_eq!(out.destination.min_required, 10);
        assert_eq!(ledger.len(), 4);
    }

    fn units_of(ledger: &InventoryLedger, h: HospitalId, bt: BloodType) -> u32 {
        ledger.get(h, bt).unwrap().current_units
    }

    #[test]
    fn len_recovers_from_poisoned_map_lock() {
        let ledger = Arc::new(ledger_with(1, 1, 0, 10));
        let poisoner = Arc::clone(&ledger);
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.slots.write().unwrap();
            panic!("writer died mid-update");
        })
        .join();

        assert!(ledger.slots.is_poisoned());
        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger.list(None, None).len(), 2);
    }

    #[test]
    fn list_filters_and_sorts() {
        let ledger = ledger_with(1, 2, 5, 10);
        ledger.register(InventoryLevel::new(A, BloodType::APos, 3, 5, 10, Utc::now()).unwrap());

        let all = ledger.list(None, None);
        let keys: Vec<_> = all.iter().map(|l| (l.hospital_id.get(), l.blood_type)).collect();
        assert_eq!(
            keys,
            vec![(1, BloodType::APos), (1, BloodType::OPos), (2, BloodType::OPos)]
        );
        assert_eq!(ledger.list(Some(BloodType::OPos), None).len(), 2);
        assert_eq!(ledger.list(None, Some(B)).len(), 1);
    }

    #[test]
    fn opposing_transfers_do_not_deadlock() {
        let ledger = Arc::new(ledger_with(500, 500, 0, 1000));
        std::thread::scope(|s| {
            for i in 0..8 {
                let ledger = Arc::clone(&ledger);
                s.spawn(move || {
                    for _ in 0..200 {
                        let (from, to) = if i % 2 == 0 { (A, B) } else { (B, A) };
                        let _ = ledger.transfer(from, to, BloodType::OPos, 1, Utc::now());
                    }
                });
            }
        });
        assert_eq!(units(&ledger, A) + units(&ledger, B), 1000);
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 64,
            ..ProptestConfig::default()
        })]

        /// Interleaved adjusts on one key never leave it outside [0, capacity],
        /// and the final level equals the start plus every accepted delta.
        #[test]
        fn concurrent_adjusts_respect_bounds(
            start in 0u32..=50,
            deltas in prop::collection::vec(-30i64..=30, 1..64),
        ) {
            let ledger = Arc::new(ledger_with(start, 0, 0, 50));
            let accepted: i64 = std::thread::scope(|s| {
                let handles: Vec<_> = deltas
                    .chunks(8)
                    .map(|chunk| {
                        let ledger = Arc::clone(&ledger);
                        s.spawn(move || {
                            chunk
                                .iter()
                                .filter(|&&d| ledger.adjust(A, BloodType::OPos, d, Utc::now()).is_ok())
                                .sum::<i64>()
                        })
                    })
                    .collect();
                handles.into_iter().map(|h| h.join().unwrap()).sum()
            });

            let last = units(&ledger, A);
            prop_assert!(last <= 50);
            prop_assert_eq!(i64::from(last), i64::from(start) + accepted);
        }

        /// A transfer followed by its reverse restores both levels.
        #[test]
        fn transfer_round_trip(a in 0u32..=100, b in 0u32..=100, n in 1u32..=100) {
            let ledger = ledger_with(a, b, 0, 100);
            if ledger.transfer(A, B, BloodType::OPos, n, Utc::now()).is_ok() {
                ledger.transfer(B, A, BloodType::OPos, n, Utc::now()).unwrap();
            }
            prop_assert_eq!((units(&ledger, A), units(&ledger, B)), (a, b));
        }
    }
}
