/// Write pointers and allocators: round-robin (user, plain mode, and GC
/// copy-forward in every mode), die-interleaved (DA, hybrid SLC user
/// writes), and a QLC-confined walker (hybrid migration targets).
///
/// SPEC_FULL.md's design notes call for modeling RR/DA/QLC as one sum type
/// with explicit variants rather than a compile-time or runtime flag
/// re-checked on every call; `Allocator` below is that sum type.
use alloc::vec::Vec;

use super::geometry::Geometry;
use super::line::LineManager;
use super::ppa::Ppa;

/// Round-robin pointer: advances `pg -> ch -> lun -> pl -> (next wordline)`,
/// finalizing and reallocating a line from `lines` once a whole block has
/// been written. Used as the sole user pointer in plain mode and as the GC
/// copy-forward pointer in every mode.
pub struct RrPointer {
    pub ch: u32,
    pub lun: u32,
    pub pl: u32,
    pub blk: u32,
    pub pg: u32,
    pub curline: u32,
}

impl RrPointer {
    pub fn new(lines: &mut LineManager) -> Self {
        let curline = lines.allocate_free_line();
        RrPointer { ch: 0, lun: 0, pl: 0, blk: curline, pg: 0, curline }
    }

    pub fn current_ppa(&self) -> Ppa {
        Ppa { ch: self.ch, lun: self.lun, pl: self.pl, blk: self.blk, pg: self.pg }
    }

    /// Advance to the next slot, finalizing/reallocating the line on block
    /// rollover. Mirrors `advance_write_pointer` in the original: `pg`
    /// increments first; only a oneshot-page boundary triggers the
    /// ch/lun/pl rotation; only a lun *and* plane rollover pushes `pg` to
    /// the next wordline; only then might the block (and line) roll over.
    pub fn advance(&mut self, geo: &Geometry, lines: &mut LineManager) {
        self.pg += 1;
        if self.pg % geo.pgs_per_oneshotpg != 0 {
            return;
        }
        self.pg -= geo.pgs_per_oneshotpg;
        self.ch += 1;
        if self.ch != geo.nchs {
            return;
        }
        self.ch = 0;
        self.lun += 1;
        if self.lun != geo.luns_per_ch {
            return;
        }
        self.lun = 0;
        self.pl += 1;
        if self.pl != geo.pls_per_lun {
            return;
        }
        self.pl = 0;
        self.pg += geo.pgs_per_oneshotpg;
        if self.pg != geo.pgs_per_blk {
            return;
        }
        self.pg = 0;
        lines.on_line_written_out(self.curline);
        self.curline = lines.allocate_free_line();
        self.blk = self.curline;
    }
}

/// Die-interleaved pointer: one `(ch, lun, pl, blk, pg)` slot per active
/// LUN, rotated through by a global `lunpointer`. `lunpointer` only moves
/// (and a LUN-local line only finalizes) on a oneshot-page boundary — a
/// write that doesn't cross one returns before either happens, so
/// `lunpointer` advances once per oneshot page, not once per page.
pub struct DaPointer {
    pub lunpointer: u32,
    active_luns: u32,
    slc_channels: u32,
    ch: Vec<u32>,
    lun: Vec<u32>,
    pg: Vec<u32>,
    blk: Vec<u32>,
    curline: Vec<u32>,
}

impl DaPointer {
    /// `active_luns` addresses are laid out channel-fastest:
    /// `idx = lun_idx * slc_channels + ch_idx`.
    pub fn new(slc_channels: u32, slc_luns_per_ch: u32, lines: &mut [LineManager]) -> Self {
        let active_luns = slc_channels * slc_luns_per_ch;
        let mut ch = Vec::with_capacity(active_luns as usize);
        let mut lun = Vec::with_capacity(active_luns as usize);
        let mut curline = Vec::with_capacity(active_luns as usize);
        for idx in 0..active_luns {
            ch.push(idx % slc_channels);
            lun.push(idx / slc_channels);
            curline.push(lines[idx as usize].allocate_free_line());
        }
        DaPointer {
            lunpointer: 0,
            active_luns,
            slc_channels,
            ch,
            lun,
            pg: alloc::vec![0u32; active_luns as usize],
            blk: curline.clone(),
            curline,
        }
    }

    /// The DA allocator only ever emits channel indices in `0..slc_channels`
    /// (SPEC_FULL.md §9 open question on DA/QLC pointer disjointness);
    /// checked here rather than trusted silently.
    pub fn current_ppa(&self) -> Ppa {
        let idx = self.lunpointer as usize;
        debug_assert!(self.ch[idx] < self.slc_channels, "DA pointer produced a channel outside the SLC range");
        Ppa {
            ch: self.ch[idx],
            lun: self.lun[idx],
            pl: 0,
            blk: self.blk[idx],
            pg: self.pg[idx],
        }
    }

    pub fn active_luns(&self) -> u32 {
        self.active_luns
    }

    /// `lines` is indexed the same way as `active_luns`: one LUN-local
    /// `LineManager` per active LUN.
    pub fn advance(&mut self, geo: &Geometry, lines: &mut [LineManager]) {
        let idx = self.lunpointer as usize;
        self.pg[idx] += 1;
        if self.pg[idx] % geo.pgs_per_oneshotpg != 0 {
            return;
        }
        if self.pg[idx] == geo.pgs_per_blk {
            lines[idx].on_line_written_out(self.curline[idx]);
            self.curline[idx] = lines[idx].allocate_free_line();
            self.blk[idx] = self.curline[idx];
            self.pg[idx] = 0;
        }
        self.lunpointer = (self.lunpointer + 1) % self.active_luns;
    }
}

/// Traditional round-robin walker confined to the QLC channel range,
/// nested `pg -> blk -> pl -> lun -> ch` (the opposite nesting order from
/// `RrPointer`). Carries no line manager of its own — hybrid migration is
/// the only writer into this range and does not participate in GC.
pub struct QlcPointer {
    pub ch: u32,
    pub lun: u32,
    pub pl: u32,
    pub blk: u32,
    pub pg: u32,
    slc_channels: u32,
    qlc_channels: u32,
}

impl QlcPointer {
    pub fn new(slc_channels: u32, qlc_channels: u32) -> Self {
        QlcPointer { ch: slc_channels, lun: 0, pl: 0, blk: 0, pg: 0, slc_channels, qlc_channels }
    }

    /// The QLC allocator only ever emits channel indices in
    /// `slc_channels..slc_channels+qlc_channels` (SPEC_FULL.md §9), the
    /// mirror image of `DaPointer::current_ppa`'s assertion.
    pub fn current_ppa(&self) -> Ppa {
        debug_assert!(
            self.ch >= self.slc_channels && self.ch < self.slc_channels + self.qlc_channels,
            "QLC pointer produced a channel outside the QLC range"
        );
        Ppa { ch: self.ch, lun: self.lun, pl: self.pl, blk: self.blk, pg: self.pg }
    }

    pub fn advance(&mut self, geo: &Geometry) {
        self.pg += 1;
        if self.pg % geo.pgs_per_oneshotpg != 0 {
            return;
        }
        if self.pg != geo.pgs_per_blk {
            return;
        }
        self.pg = 0;
        self.blk += 1;
        if self.blk != geo.blks_per_pl {
            return;
        }
        self.blk = 0;
        self.pl += 1;
        if self.pl != geo.pls_per_lun {
            return;
        }
        self.pl = 0;
        self.lun += 1;
        if self.lun != geo.luns_per_ch {
            return;
        }
        self.lun = 0;
        self.ch += 1;
        if self.ch >= self.slc_channels + self.qlc_channels {
            self.ch = self.slc_channels;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ftl::geometry::CellMode;

    fn s1_geometry() -> Geometry {
        Geometry::from_params(2, 2, 1, 4, 4, 2, 4, 4096, 1, CellMode::Plain).unwrap()
    }

    #[test]
    fn s1_round_robin_traversal_order() {
        let geo = s1_geometry();
        let mut lines = LineManager::new(geo.num_lines(), geo.pgs_per_line());
        let mut wp = RrPointer::new(&mut lines);

        let expected = [
            (0, 0, 0), (0, 0, 1), (1, 0, 0), (1, 0, 1),
            (0, 1, 0), (0, 1, 1), (1, 1, 0), (1, 1, 1),
            (0, 0, 2), (0, 0, 3), (1, 0, 2), (1, 0, 3),
            (0, 1, 2), (0, 1, 3), (1, 1, 2), (1, 1, 3),
        ];

        for &(ch, lun, pg) in expected.iter() {
            let ppa = wp.current_ppa();
            assert_eq!((ppa.ch, ppa.lun, ppa.pg), (ch, lun, pg));
            wp.advance(&geo, &mut lines);
        }
        // Exactly one line (16 pages) was consumed; a second was allocated.
        assert_eq!(lines.free_count(), 4 - 2);
    }

    #[test]
    fn s4_da_lunpointer_trajectory() {
        let slc_channels = 2;
        let slc_luns_per_ch = 2;
        let geo = Geometry::from_params(
            slc_channels + 2, 2, 1, 4, 4, 1, 4, 4096, 1,
            CellMode::Hybrid { slc_channels, slc_luns_per_ch },
        )
        .unwrap();
        let active = (slc_channels * slc_luns_per_ch) as usize;
        let mut lines: Vec<LineManager> =
            (0..active).map(|_| LineManager::new(geo.num_lines(), geo.pgs_per_lun_line())).collect();
        let mut da = DaPointer::new(slc_channels, slc_luns_per_ch, &mut lines);

        let mut trajectory = Vec::new();
        for _ in 0..8 {
            trajectory.push(da.lunpointer);
            da.advance(&geo, &mut lines);
        }
        assert_eq!(trajectory, alloc::vec![0, 1, 2, 3, 0, 1, 2, 3]);
    }

    #[test]
    fn qlc_pointer_stays_within_qlc_channel_range() {
        let geo = Geometry::from_params(
            4, 1, 1, 1, 2, 1, 2, 4096, 1,
            CellMode::Hybrid { slc_channels: 2, slc_luns_per_ch: 1 },
        )
        .unwrap();
        let mut qlc = QlcPointer::new(2, 2);
        for _ in 0..20 {
            let ppa = qlc.current_ppa();
            assert!(ppa.ch >= 2 && ppa.ch < 4);
            qlc.advance(&geo);
        }
    }
}
