/// Physical page addressing — the (channel, LUN, plane, block, page) tuple
/// and its linearization into a dense page index.
use super::geometry::Geometry;

/// Sentinel marking an unmapped forward-map entry.
pub const UNMAPPED_PPA: u64 = u64::MAX;

/// Sentinel marking an empty reverse-map entry / hotness table slot.
pub const UNMAPPED_LPN: u32 = u32::MAX;

/// A physical page address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ppa {
    pub ch: u32,
    pub lun: u32,
    pub pl: u32,
    pub blk: u32,
    pub pg: u32,
}

impl Ppa {
    /// Linearize into `pgidx = ch*pgs_per_ch + lun*pgs_per_lun + pl*pgs_per_pl + blk*pgs_per_blk + pg`.
    pub fn pgidx(&self, geo: &Geometry) -> u64 {
        let mut idx = self.ch as u64 * geo.pgs_per_ch() as u64;
        idx += self.lun as u64 * geo.pgs_per_lun() as u64;
        idx += self.pl as u64 * geo.pgs_per_pl() as u64;
        idx += self.blk as u64 * geo.pgs_per_blk as u64;
        idx += self.pg as u64;
        idx
    }

    /// Inverse of `pgidx`.
    pub fn from_pgidx(idx: u64, geo: &Geometry) -> Self {
        let mut rem = idx;
        let pgs_per_ch = geo.pgs_per_ch() as u64;
        let pgs_per_lun = geo.pgs_per_lun() as u64;
        let pgs_per_pl = geo.pgs_per_pl() as u64;
        let pgs_per_blk = geo.pgs_per_blk as u64;

        let ch = rem / pgs_per_ch;
        rem %= pgs_per_ch;
        let lun = rem / pgs_per_lun;
        rem %= pgs_per_lun;
        let pl = rem / pgs_per_pl;
        rem %= pgs_per_pl;
        let blk = rem / pgs_per_blk;
        rem %= pgs_per_blk;
        let pg = rem;

        Ppa {
            ch: ch as u32,
            lun: lun as u32,
            pl: pl as u32,
            blk: blk as u32,
            pg: pg as u32,
        }
    }

    /// Global LUN index, `lun*nchs + ch` — used to key the per-LUN line
    /// managers in DA/hybrid mode.
    pub fn glun(&self, geo: &Geometry) -> u32 {
        self.lun * geo.nchs + self.ch
    }
}
