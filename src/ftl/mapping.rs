/// Forward (LPN -> PPA) and reverse (pgidx -> LPN) mapping tables.
use alloc::vec;
use alloc::vec::Vec;

use super::error::FtlError;
use super::geometry::Geometry;
use super::ppa::{Ppa, UNMAPPED_LPN, UNMAPPED_PPA};

/// Total forward/reverse mapping tables, preinitialized to their sentinels.
pub struct MappingTable {
    forward: Vec<u64>,
    reverse: Vec<u32>,
}

impl MappingTable {
    pub fn new(geo: &Geometry) -> Self {
        let tt_pgs = geo.tt_pgs() as usize;
        MappingTable {
            forward: vec![UNMAPPED_PPA; tt_pgs],
            reverse: vec![UNMAPPED_LPN; tt_pgs],
        }
    }

    /// Returns the sentinel PPA if `lpn` was never written.
    pub fn get(&self, lpn: u32) -> u64 {
        self.forward[lpn as usize]
    }

    pub fn is_mapped(&self, lpn: u32) -> bool {
        self.get(lpn) != UNMAPPED_PPA
    }

    /// Unconditionally overwrite the forward mapping for `lpn`.
    pub fn set(&mut self, lpn: u32, geo: &Geometry, ppa: &Ppa) -> Result<(), FtlError> {
        if lpn as usize >= self.forward.len() {
            return Err(FtlError::OutOfRange(lpn));
        }
        self.forward[lpn as usize] = ppa.pgidx(geo);
        Ok(())
    }

    pub fn unset(&mut self, lpn: u32) {
        self.forward[lpn as usize] = UNMAPPED_PPA;
    }

    /// Reverse lookup by linearized page index.
    pub fn rmap_get(&self, pgidx: u64) -> u32 {
        self.reverse[pgidx as usize]
    }

    pub fn rmap_set(&mut self, pgidx: u64, lpn: u32) {
        self.reverse[pgidx as usize] = lpn;
    }

    pub fn rmap_unset(&mut self, pgidx: u64) {
        self.reverse[pgidx as usize] = UNMAPPED_LPN;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ftl::geometry::CellMode;

    fn geo() -> Geometry {
        Geometry::from_params(2, 2, 1, 4, 4, 2, 4, 4096, 1, CellMode::Plain).unwrap()
    }

    #[test]
    fn fresh_table_is_all_unmapped() {
        let geo = geo();
        let map = MappingTable::new(&geo);
        assert_eq!(map.get(0), UNMAPPED_PPA);
        assert_eq!(map.rmap_get(0), UNMAPPED_LPN);
        assert!(!map.is_mapped(0));
    }

    #[test]
    fn set_then_get_round_trips() {
        let geo = geo();
        let mut map = MappingTable::new(&geo);
        let ppa = Ppa { ch: 1, lun: 0, pl: 0, blk: 2, pg: 3 };
        map.set(5, &geo, &ppa).unwrap();
        map.rmap_set(ppa.pgidx(&geo), 5);
        assert_eq!(map.get(5), ppa.pgidx(&geo));
        assert_eq!(map.rmap_get(ppa.pgidx(&geo)), 5);
        assert!(map.is_mapped(5));
    }

    #[test]
    fn set_out_of_range_lpn_errors() {
        let geo = geo();
        let mut map = MappingTable::new(&geo);
        let ppa = Ppa { ch: 0, lun: 0, pl: 0, blk: 0, pg: 0 };
        let err = map.set(geo.tt_pgs(), &geo, &ppa).unwrap_err();
        assert_eq!(err, FtlError::OutOfRange(geo.tt_pgs()));
    }
}
