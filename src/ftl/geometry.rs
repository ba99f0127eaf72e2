/// SSD geometry derivation and validation.
///
/// Mirrors the validate-before-committing style of `storage::block_alloc`'s
/// `format()`: every derived count is computed once at construction and
/// handed out as plain fields, rather than recomputed (and potentially
/// panicking) on every access.
use super::error::ConfigError;

/// Cell mode — plain single-tier, or hybrid SLC/QLC with an explicit
/// channel split.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellMode {
    Plain,
    Hybrid {
        slc_channels: u32,
        slc_luns_per_ch: u32,
    },
}

/// Default per-tier NAND latency constants, in nanoseconds. Hybrid SLC is
/// fast and uniform; QLC read latency is banded Q1..Q4 by page-within-block
/// position (lower bands are faster, matching the real hybrid NAND timing
/// model this is drawn from).
#[derive(Debug, Clone, Copy)]
pub struct Latencies {
    pub slc_read_ns: u64,
    pub slc_write_ns: u64,
    pub slc_erase_ns: u64,
    pub qlc_read_ns: [u64; 4],
    pub qlc_write_ns: u64,
    pub qlc_erase_ns: u64,
    pub fw_4kb_rd_lat_ns: u64,
    pub fw_rd_lat_ns: u64,
    pub ch_xfer_ns_per_byte: u64,
}

impl Default for Latencies {
    fn default() -> Self {
        Latencies {
            slc_read_ns: 40_000,
            slc_write_ns: 300_000,
            slc_erase_ns: 1_500_000,
            qlc_read_ns: [160_000, 220_000, 280_000, 340_000],
            qlc_write_ns: 2_000_000,
            qlc_erase_ns: 15_000_000,
            fw_4kb_rd_lat_ns: 7_000,
            fw_rd_lat_ns: 13_000,
            ch_xfer_ns_per_byte: 1,
        }
    }
}

/// A fully validated SSD geometry for one FTL partition.
#[derive(Debug, Clone, Copy)]
pub struct Geometry {
    pub nchs: u32,
    pub luns_per_ch: u32,
    pub pls_per_lun: u32,
    pub blks_per_pl: u32,
    pub pgs_per_blk: u32,
    pub pgs_per_oneshotpg: u32,
    pub pgs_per_flashpg: u32,
    pub pg_size_bytes: u32,
    pub partitions: u32,
    pub mode: CellMode,
    pub latencies: Latencies,
}

impl Geometry {
    /// Construct and validate a geometry from explicit parameters. This is
    /// the constructor the boundary scenarios in SPEC_FULL.md §8 use
    /// directly, since they name exact small geometries rather than a
    /// derived capacity.
    pub fn from_params(
        nchs: u32,
        luns_per_ch: u32,
        pls_per_lun: u32,
        blks_per_pl: u32,
        pgs_per_blk: u32,
        pgs_per_oneshotpg: u32,
        pgs_per_flashpg: u32,
        pg_size_bytes: u32,
        partitions: u32,
        mode: CellMode,
    ) -> Result<Self, ConfigError> {
        if nchs == 0
            || luns_per_ch == 0
            || pls_per_lun == 0
            || blks_per_pl == 0
            || pgs_per_blk == 0
            || pgs_per_oneshotpg == 0
            || pgs_per_flashpg == 0
            || pg_size_bytes == 0
            || partitions == 0
        {
            return Err(ConfigError::InvalidGeometry);
        }
        if pgs_per_blk % pgs_per_oneshotpg != 0 {
            return Err(ConfigError::InvalidGeometry);
        }
        if let CellMode::Hybrid { slc_channels, slc_luns_per_ch } = mode {
            if slc_channels == 0
                || slc_channels >= nchs
                || slc_luns_per_ch == 0
                || slc_luns_per_ch > luns_per_ch
            {
                return Err(ConfigError::ChannelSplitMismatch);
            }
        }

        Ok(Geometry {
            nchs,
            luns_per_ch,
            pls_per_lun,
            blks_per_pl,
            pgs_per_blk,
            pgs_per_oneshotpg,
            pgs_per_flashpg,
            pg_size_bytes,
            partitions,
            mode,
            latencies: Latencies::default(),
        })
    }

    /// Derive a geometry for a target total capacity, dividing the channel
    /// count across `partitions` FTL instances (§6 `init`). Per-channel
    /// shape (`luns_per_ch`, `pls_per_lun`, `pgs_per_blk`) is taken as given
    /// rather than re-derived; only the per-plane block count is solved for
    /// so the total capacity is met.
    pub fn for_capacity(
        total_bytes: u64,
        channels_total: u32,
        luns_per_ch: u32,
        pls_per_lun: u32,
        pgs_per_blk: u32,
        pgs_per_oneshotpg: u32,
        pgs_per_flashpg: u32,
        pg_size_bytes: u32,
        partitions: u32,
        mode: CellMode,
    ) -> Result<Self, ConfigError> {
        if total_bytes == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        if partitions == 0 || channels_total % partitions != 0 {
            return Err(ConfigError::ChannelSplitMismatch);
        }
        let nchs = channels_total / partitions;
        if nchs == 0 || luns_per_ch == 0 || pls_per_lun == 0 || pgs_per_blk == 0 || pg_size_bytes == 0 {
            return Err(ConfigError::InvalidGeometry);
        }

        let bytes_per_partition = total_bytes / partitions as u64;
        let bytes_per_block_row = nchs as u64
            * luns_per_ch as u64
            * pls_per_lun as u64
            * pgs_per_blk as u64
            * pg_size_bytes as u64;
        let blks_per_pl = ((bytes_per_partition + bytes_per_block_row - 1) / bytes_per_block_row).max(1) as u32;

        Self::from_params(
            nchs,
            luns_per_ch,
            pls_per_lun,
            blks_per_pl,
            pgs_per_blk,
            pgs_per_oneshotpg,
            pgs_per_flashpg,
            pg_size_bytes,
            partitions,
            mode,
        )
    }

    pub fn pgs_per_pl(&self) -> u32 {
        self.blks_per_pl * self.pgs_per_blk
    }

    pub fn pgs_per_lun(&self) -> u32 {
        self.pls_per_lun * self.pgs_per_pl()
    }

    pub fn pgs_per_ch(&self) -> u32 {
        self.luns_per_ch * self.pgs_per_lun()
    }

    /// Total logical pages addressable by this partition.
    pub fn tt_pgs(&self) -> u32 {
        self.nchs * self.pgs_per_ch()
    }

    /// Number of blocks contributing to one global line (one per
    /// plane-LUN-channel).
    pub fn blks_per_line(&self) -> u32 {
        self.nchs * self.luns_per_ch * self.pls_per_lun
    }

    /// Pages held by one fully-written global line.
    pub fn pgs_per_line(&self) -> u32 {
        self.blks_per_line() * self.pgs_per_blk
    }

    /// Number of distinct lines (= number of blocks in a single plane).
    pub fn num_lines(&self) -> u32 {
        self.blks_per_pl
    }

    /// Blocks contributing to one LUN-local (DA) line — one per plane of a
    /// single LUN.
    pub fn blks_per_lun_line(&self) -> u32 {
        self.pls_per_lun
    }

    /// Pages held by one fully-written LUN-local (DA) line.
    pub fn pgs_per_lun_line(&self) -> u32 {
        self.blks_per_lun_line() * self.pgs_per_blk
    }

    pub fn oneshotpgs_per_blk(&self) -> u32 {
        self.pgs_per_blk / self.pgs_per_oneshotpg
    }

    /// Total number of global LUNs (`lun*nchs+ch` addressing space size).
    pub fn num_luns(&self) -> u32 {
        self.nchs * self.luns_per_ch
    }

    /// SLC channel range `[0, slc_channels)`, hybrid mode only.
    pub fn slc_channels(&self) -> u32 {
        match self.mode {
            CellMode::Plain => self.nchs,
            CellMode::Hybrid { slc_channels, .. } => slc_channels,
        }
    }

    /// QLC channel range `[slc_channels, nchs)`, hybrid mode only (zero in
    /// plain mode).
    pub fn qlc_channels(&self) -> u32 {
        match self.mode {
            CellMode::Plain => 0,
            CellMode::Hybrid { slc_channels, .. } => self.nchs - slc_channels,
        }
    }

    pub fn slc_luns_per_ch(&self) -> u32 {
        match self.mode {
            CellMode::Plain => self.luns_per_ch,
            CellMode::Hybrid { slc_luns_per_ch, .. } => slc_luns_per_ch,
        }
    }

    /// LPN range covered by the SLC tier: `[0, slc_tt_pgs)`.
    pub fn slc_tt_pgs(&self) -> u32 {
        self.slc_channels() * self.pgs_per_ch()
    }

    /// LPN range covered by the QLC tier: `[slc_tt_pgs, slc_tt_pgs + qlc_tt_pgs)`.
    pub fn qlc_tt_pgs(&self) -> u32 {
        self.qlc_channels() * self.pgs_per_ch()
    }

    pub fn is_hybrid(&self) -> bool {
        matches!(self.mode, CellMode::Hybrid { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s1_geometry() -> Geometry {
        Geometry::from_params(2, 2, 1, 4, 4, 2, 4, 4096, 1, CellMode::Plain).unwrap()
    }

    #[test]
    fn s1_derived_quantities() {
        let geo = s1_geometry();
        assert_eq!(geo.blks_per_line(), 4);
        assert_eq!(geo.pgs_per_line(), 16);
        assert_eq!(geo.num_lines(), 4);
        assert_eq!(geo.tt_pgs(), 2 * 2 * 1 * 4 * 4);
    }

    #[test]
    fn rejects_zero_capacity() {
        let err = Geometry::for_capacity(0, 4, 2, 1, 4, 2, 4, 4096, 1, CellMode::Plain).unwrap_err();
        assert_eq!(err, ConfigError::ZeroCapacity);
    }

    #[test]
    fn rejects_uneven_partition_split() {
        let err = Geometry::for_capacity(1 << 30, 3, 2, 1, 4, 2, 4, 4096, 2, CellMode::Plain).unwrap_err();
        assert_eq!(err, ConfigError::ChannelSplitMismatch);
    }

    #[test]
    fn rejects_slc_channels_covering_whole_device() {
        let err = Geometry::from_params(
            4, 2, 1, 4, 4, 2, 4, 4096, 1,
            CellMode::Hybrid { slc_channels: 4, slc_luns_per_ch: 2 },
        )
        .unwrap_err();
        assert_eq!(err, ConfigError::ChannelSplitMismatch);
    }

    #[test]
    fn hybrid_tier_ranges_are_disjoint_and_cover_tt_pgs() {
        let geo = Geometry::from_params(
            4, 2, 1, 4, 4, 2, 4, 4096, 1,
            CellMode::Hybrid { slc_channels: 2, slc_luns_per_ch: 2 },
        )
        .unwrap();
        assert_eq!(geo.slc_tt_pgs() + geo.qlc_tt_pgs(), geo.tt_pgs());
    }
}
