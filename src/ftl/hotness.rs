/// Hybrid-only hotness tracking and SLC->QLC migration candidate scan.
///
/// Fixed-capacity, open-addressed hash table with linear probing — the
/// source deliberately caps memory here, so this stays an array with
/// explicit occupancy rather than a growable map (see SPEC_FULL.md §9).
use alloc::vec::Vec;

use super::error::FtlError;
use super::ppa::UNMAPPED_LPN;

/// Gap since `last_access_time` past which `recent_access` decays by one
/// (§4.7: "when the gap since last_access_time exceeds 1s").
const AGING_GAP_NS: u64 = 1_000_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageType {
    Slc,
    Qlc,
}

#[derive(Debug, Clone, Copy)]
struct HotnessEntry {
    lpn: u32,
    access_count: u64,
    recent_access: u32,
    last_access_time: u64,
    storage_type: StorageType,
    is_migrating: bool,
}

impl HotnessEntry {
    const fn empty() -> Self {
        HotnessEntry {
            lpn: UNMAPPED_LPN,
            access_count: 0,
            recent_access: 0,
            last_access_time: 0,
            storage_type: StorageType::Slc,
            is_migrating: false,
        }
    }
}

pub struct HotnessTable {
    entries: Vec<HotnessEntry>,
    last_migration_check: u64,
}

impl HotnessTable {
    pub fn new(table_size: usize) -> Self {
        HotnessTable {
            entries: alloc::vec![HotnessEntry::empty(); table_size],
            last_migration_check: 0,
        }
    }

    fn find_slot(&self, lpn: u32) -> Result<usize, ()> {
        let n = self.entries.len();
        let start = lpn as usize % n;
        for step in 0..n {
            let idx = (start + step) % n;
            if self.entries[idx].lpn == lpn || self.entries[idx].lpn == UNMAPPED_LPN {
                return Ok(idx);
            }
        }
        Err(())
    }

    /// Locate or install an entry for `lpn` and record one access. New
    /// entries start in SLC. Returns `HotnessTableFull` (logged by the
    /// caller, tracking dropped, write proceeds regardless) if the table
    /// has no free slot and `lpn` has no existing entry.
    pub fn record_write(&mut self, lpn: u32, now: u64) -> Result<(), FtlError> {
        let idx = self.find_slot(lpn).map_err(|_| FtlError::HotnessTableFull(lpn))?;
        let e = &mut self.entries[idx];
        if e.lpn == UNMAPPED_LPN {
            *e = HotnessEntry { lpn, ..HotnessEntry::empty() };
        }
        e.access_count += 1;
        e.recent_access += 1;
        e.last_access_time = now;
        Ok(())
    }

    /// Decay `recent_access` for entries that have gone stale. Kept as a
    /// standalone sweep (not folded into `record_write`) because stamping
    /// `last_access_time` in the same call that checks its age makes the
    /// decrement permanently unreachable — see SPEC_FULL.md §4.7/§9.
    pub fn age_entries(&mut self, now: u64) {
        for e in self.entries.iter_mut() {
            if e.lpn != UNMAPPED_LPN
                && e.recent_access > 0
                && now.saturating_sub(e.last_access_time) > AGING_GAP_NS
            {
                e.recent_access -= 1;
            }
        }
    }

    /// Gated scan for migration candidates: mapped, not already migrating,
    /// SLC-resident, and at or below `cold_threshold`. QLC->SLC promotion
    /// is intentionally not considered (§4.7, §9).
    pub fn scan_candidates(
        &mut self,
        now: u64,
        migration_interval: u64,
        cold_threshold: u32,
        max_migrations_per_check: u32,
    ) -> Vec<u32> {
        if now.saturating_sub(self.last_migration_check) < migration_interval {
            return Vec::new();
        }
        self.last_migration_check = now;
        self.age_entries(now);

        let mut out = Vec::new();
        for e in self.entries.iter() {
            if out.len() as u32 >= max_migrations_per_check {
                break;
            }
            if e.lpn != UNMAPPED_LPN
                && !e.is_migrating
                && e.storage_type == StorageType::Slc
                && e.recent_access <= cold_threshold
            {
                out.push(e.lpn);
            }
        }
        out
    }

    pub fn set_migrating(&mut self, lpn: u32, migrating: bool) {
        if let Ok(idx) = self.find_slot(lpn) {
            if self.entries[idx].lpn == lpn {
                self.entries[idx].is_migrating = migrating;
            }
        }
    }

    pub fn set_storage_type(&mut self, lpn: u32, ty: StorageType) {
        if let Ok(idx) = self.find_slot(lpn) {
            if self.entries[idx].lpn == lpn {
                self.entries[idx].storage_type = ty;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_then_find_round_trips() {
        let mut table = HotnessTable::new(8);
        table.record_write(3, 100).unwrap();
        table.record_write(3, 200).unwrap();
        let idx = table.find_slot(3).unwrap();
        assert_eq!(table.entries[idx].access_count, 2);
        assert_eq!(table.entries[idx].recent_access, 2);
    }

    #[test]
    fn table_full_reports_error_for_new_lpn() {
        let mut table = HotnessTable::new(2);
        table.record_write(0, 0).unwrap();
        table.record_write(2, 0).unwrap(); // collides with slot 0, probes to slot 1
        let err = table.record_write(4, 0).unwrap_err();
        assert_eq!(err, FtlError::HotnessTableFull(4));
    }

    #[test]
    fn s6_migration_scan_finds_cold_entry_after_one_second() {
        let mut table = HotnessTable::new(8);
        table.record_write(5, 0).unwrap();
        let candidates = table.scan_candidates(1_000_000_001, 0, 0, 1000);
        assert_eq!(candidates, alloc::vec![5]);
    }

    #[test]
    fn migration_interval_gates_repeated_scans() {
        let mut table = HotnessTable::new(8);
        table.record_write(1, 0).unwrap();
        let first = table.scan_candidates(2_000_000_000, 1_000_000_000, 0, 1000);
        assert_eq!(first, alloc::vec![1]);
        // Too soon since last_migration_check — gated out even though the
        // entry is still cold.
        let second = table.scan_candidates(2_100_000_000, 1_000_000_000, 0, 1000);
        assert!(second.is_empty());
    }
}
