//! Flash Translation Layer core: mapping tables, line/write-pointer
//! management, foreground GC, the write-flow credit scheduler, SLC/QLC
//! migration, and the per-LUN/per-channel NAND latency model.
//!
//! Layout mirrors `storage/`: one small module per concern, wired together
//! by the `Ftl` struct defined here, with `impl Ftl` blocks split across
//! `gc.rs`, `migration.rs` and `io.rs` for the operations that cut across
//! more than one of those concerns.
use alloc::sync::Arc;
use alloc::vec::Vec;

use log::warn;

pub mod buffer;
pub mod credit;
pub mod device;
pub mod error;
pub mod gc;
pub mod geometry;
pub mod hotness;
pub mod io;
pub mod line;
pub mod mapping;
pub mod migration;
pub mod nvme;
pub mod ppa;
pub mod wp;

pub use error::{ConfigError, FtlError};
pub use geometry::{CellMode, Geometry};

use credit::WriteFlowController;
use device::NandModel;
use hotness::HotnessTable;
use line::LineManager;
use mapping::MappingTable;
use ppa::Ppa;
use wp::{DaPointer, QlcPointer, RrPointer};

/// Tunable thresholds that in the original are compile-time constants;
/// kept as plain config fields here so degenerate boundary-scenario
/// geometries can also pick degenerate thresholds (§4.5, §4.6, §4.7).
#[derive(Debug, Clone, Copy)]
pub struct FtlConfig {
    pub gc_thres_lines: u32,
    pub gc_thres_lines_high: u32,
    pub migration_interval_ns: u64,
    pub cold_threshold: u32,
    pub max_migrations_per_check: u32,
    pub hotness_table_size: usize,
}

impl Default for FtlConfig {
    fn default() -> Self {
        FtlConfig {
            gc_thres_lines: 2,
            gc_thres_lines_high: 1,
            migration_interval_ns: 1_000_000_000,
            cold_threshold: 2,
            max_migrations_per_check: 16,
            hotness_table_size: 4096,
        }
    }
}

/// The write-pointer/line-manager state that differs between plain and
/// hybrid geometries. Modeled as one sum type with a variant per strategy
/// rather than a runtime flag re-checked on every allocation (§4.4).
enum Strategy {
    Plain {
        user_wp: RrPointer,
        gc_wp: RrPointer,
    },
    Hybrid {
        lun_lines: Vec<LineManager>,
        da_wp: DaPointer,
        /// Shared by GC copy-forward and migration writes: both are
        /// "write into QLC" operations and in the source are literally the
        /// same `GC_IO`-typed write pointer (`examples/original_source/
        /// conv_ftl.c`'s `gc_write_page` and `migrate_page` both call
        /// `get_new_page(conv_ftl, GC_IO)`), so a single shared cursor is
        /// used here rather than two independent walkers that could each
        /// think an address the other already claimed was free (§4.4, §9).
        qlc_wp: QlcPointer,
        hotness: HotnessTable,
    },
}

pub struct Ftl {
    pub geo: Geometry,
    pub config: FtlConfig,
    pub mapping: MappingTable,
    pub device: NandModel,
    pub credits: WriteFlowController,
    pub buffer: Arc<buffer::WriteBuffer>,
    global_lines: LineManager,
    strategy: Strategy,
}

impl Ftl {
    /// Builds a standalone `Ftl` with its own private write buffer and PCIe
    /// timeline. A `Namespace` with more than one partition does not use
    /// this — it builds one shared buffer and one shared `PcieModel` up
    /// front and hands each partition its own clone via `with_shared_io`,
    /// matching the source's per-partition `ssd_init` sharing `pcie` and
    /// `write_buffer` from partition 0 (§5, §6).
    pub fn new(geo: Geometry, config: FtlConfig, write_buffer_bytes: u64) -> Self {
        let buffer = Arc::new(buffer::WriteBuffer::new(write_buffer_bytes));
        Self::with_shared_io(geo, config, buffer, Arc::new(device::PcieModel::new()))
    }

    /// Builds an `Ftl` that shares a write buffer and PCIe timeline with
    /// its namespace siblings. Everything else — the NAND channel/LUN
    /// state, line manager, mapping table, write pointers — stays
    /// per-partition; only the buffer and the PCIe model are singleton.
    pub fn with_shared_io(
        geo: Geometry,
        config: FtlConfig,
        buffer: Arc<buffer::WriteBuffer>,
        pcie: Arc<device::PcieModel>,
    ) -> Self {
        let mut global_lines = LineManager::new(geo.num_lines(), geo.pgs_per_line());
        let credits = WriteFlowController::new(geo.pgs_per_line());
        let device = NandModel::with_shared_pcie(&geo, pcie);
        let mapping = MappingTable::new(&geo);

        let strategy = match geo.mode {
            CellMode::Plain => {
                // Plain mode has no per-LUN split, so the user pointer draws
                // from the same global line pool as the GC pointer — they
                // are two independent RR walkers sharing one free-line list.
                let user_wp = RrPointer::new(&mut global_lines);
                let gc_wp = RrPointer::new(&mut global_lines);
                Strategy::Plain { user_wp, gc_wp }
            }
            CellMode::Hybrid { slc_channels, slc_luns_per_ch } => {
                let active = (slc_channels * slc_luns_per_ch) as usize;
                let mut lun_lines: Vec<LineManager> =
                    (0..active).map(|_| LineManager::new(geo.num_lines(), geo.pgs_per_lun_line())).collect();
                let da_wp = DaPointer::new(slc_channels, slc_luns_per_ch, &mut lun_lines);
                // QLC-confined: used both to copy GC victims forward and to
                // land SLC->QLC migrations, never by host writes (those go
                // through `da_wp` above).
                let qlc_wp = QlcPointer::new(slc_channels, geo.qlc_channels());
                let hotness = HotnessTable::new(config.hotness_table_size);
                Strategy::Hybrid { lun_lines, da_wp, qlc_wp, hotness }
            }
        };

        Ftl { geo, config, mapping, device, credits, buffer, global_lines, strategy }
    }

    pub fn is_hybrid(&self) -> bool {
        matches!(self.strategy, Strategy::Hybrid { .. })
    }

    pub fn free_line_count(&self) -> usize {
        self.global_lines.free_count()
    }

    /// `on_page_invalidated` on both the global line and, in hybrid mode
    /// for an SLC-tier page, the owning LUN-local line (§4.3).
    pub(crate) fn mark_page_invalid(&mut self, ppa: &Ppa) {
        self.global_lines.on_page_invalidated(ppa.blk);
        if let Strategy::Hybrid { lun_lines, .. } = &mut self.strategy {
            if let Some(idx) = Self::active_lun_index_static(&self.geo, ppa) {
                lun_lines[idx].on_page_invalidated(ppa.blk);
            }
        }
    }

    pub(crate) fn mark_page_valid(&mut self, ppa: &Ppa) {
        self.global_lines.on_page_validated(ppa.blk);
        if let Strategy::Hybrid { lun_lines, .. } = &mut self.strategy {
            if let Some(idx) = Self::active_lun_index_static(&self.geo, ppa) {
                lun_lines[idx].on_page_validated(ppa.blk);
            }
        }
    }

    /// Index into the per-LUN line managers for an SLC-tier PPA, laid out
    /// the same way `DaPointer` addresses active LUNs: `lun * slc_channels
    /// + ch`. `None` for a QLC-tier PPA (no per-LUN line manager there).
    /// Takes `geo` rather than `&self` so it can be called while `strategy`
    /// is already borrowed mutably.
    fn active_lun_index_static(geo: &Geometry, ppa: &Ppa) -> Option<usize> {
        let slc_channels = geo.slc_channels();
        if ppa.ch < slc_channels && ppa.lun < geo.slc_luns_per_ch() {
            Some((ppa.lun * slc_channels + ppa.ch) as usize)
        } else {
            None
        }
    }

    /// Current PPA + advance for a host write, SLC/DA in hybrid mode, RR
    /// in plain mode (§4.4 allocation rule).
    pub(crate) fn user_new_page(&mut self) -> Ppa {
        match &mut self.strategy {
            Strategy::Plain { user_wp, .. } => {
                let ppa = user_wp.current_ppa();
                user_wp.advance(&self.geo, &mut self.global_lines);
                ppa
            }
            Strategy::Hybrid { lun_lines, da_wp, .. } => {
                let ppa = da_wp.current_ppa();
                da_wp.advance(&self.geo, lun_lines);
                ppa
            }
        }
    }

    /// Current PPA + advance for GC copy-forward. Never the DA pointer; in
    /// plain mode this is the global RR pointer, but in hybrid mode it must
    /// additionally be confined to the QLC channel range regardless of
    /// which tier's line is being cleaned, so hybrid mode reuses the same
    /// QLC-confined cursor `migration_new_page` uses rather than the
    /// unconfined RR pointer (§4.4, §9: "GC/migration→RR→QLC").
    pub(crate) fn gc_new_page(&mut self) -> Ppa {
        match &mut self.strategy {
            Strategy::Plain { gc_wp, .. } => {
                let ppa = gc_wp.current_ppa();
                gc_wp.advance(&self.geo, &mut self.global_lines);
                ppa
            }
            Strategy::Hybrid { qlc_wp, .. } => {
                let ppa = qlc_wp.current_ppa();
                qlc_wp.advance(&self.geo);
                ppa
            }
        }
    }

    /// Current PPA + advance for a migration write; hybrid only (§4.7).
    /// Shares its cursor with `gc_new_page`'s hybrid branch — see the
    /// `qlc_wp` field doc on `Strategy::Hybrid`.
    pub(crate) fn migration_new_page(&mut self) -> Ppa {
        match &mut self.strategy {
            Strategy::Plain { .. } => {
                unreachable!("migration_new_page called on a plain-mode Ftl")
            }
            Strategy::Hybrid { qlc_wp, .. } => {
                let ppa = qlc_wp.current_ppa();
                qlc_wp.advance(&self.geo);
                ppa
            }
        }
    }

    pub(crate) fn hotness_mut(&mut self) -> Option<&mut HotnessTable> {
        match &mut self.strategy {
            Strategy::Plain { .. } => None,
            Strategy::Hybrid { hotness, .. } => Some(hotness),
        }
    }

    pub(crate) fn global_lines(&self) -> &LineManager {
        &self.global_lines
    }

    pub(crate) fn global_lines_mut(&mut self) -> &mut LineManager {
        &mut self.global_lines
    }

    pub(crate) fn record_hotness_write(&mut self, lpn: u32, now: u64) {
        if let Some(h) = self.hotness_mut() {
            if let Err(e) = h.record_write(lpn, now) {
                warn!("{}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain_geo() -> Geometry {
        Geometry::from_params(2, 2, 1, 4, 4, 2, 4, 4096, 1, CellMode::Plain).unwrap()
    }

    #[test]
    fn fresh_ftl_has_all_lines_free_minus_the_two_pointers() {
        let geo = plain_geo();
        let ftl = Ftl::new(geo, FtlConfig::default(), 1 << 20);
        // 4 lines total; one consumed by the GC pointer, one by the user pointer.
        assert_eq!(ftl.free_line_count(), 2);
        assert!(!ftl.is_hybrid());
    }

    #[test]
    fn hybrid_ftl_constructs_with_active_luns_and_hotness_table() {
        let geo = Geometry::from_params(
            4, 2, 1, 4, 4, 2, 4, 4096, 1,
            CellMode::Hybrid { slc_channels: 2, slc_luns_per_ch: 2 },
        )
        .unwrap();
        let ftl = Ftl::new(geo, FtlConfig::default(), 1 << 20);
        assert!(ftl.is_hybrid());
    }

    #[test]
    fn standalone_ftl_new_gets_a_private_write_buffer() {
        let geo = plain_geo();
        let a = Ftl::new(geo, FtlConfig::default(), 100);
        let b = Ftl::new(geo, FtlConfig::default(), 100);
        a.buffer.allocate(100);
        assert_eq!(a.buffer.remaining(), 0);
        assert_eq!(b.buffer.remaining(), 100);
    }

    #[test]
    fn with_shared_io_partitions_share_one_write_buffer() {
        let geo = plain_geo();
        let buffer = Arc::new(buffer::WriteBuffer::new(100));
        let pcie = Arc::new(device::PcieModel::new());
        let part_a = Ftl::with_shared_io(geo, FtlConfig::default(), buffer.clone(), pcie.clone());
        let part_b = Ftl::with_shared_io(geo, FtlConfig::default(), buffer.clone(), pcie.clone());

        // Draining the buffer via one partition must be visible to the
        // other — they are two Arc handles onto the same WriteBuffer.
        part_a.buffer.allocate(100);
        assert_eq!(part_b.buffer.remaining(), 0);
    }
}
