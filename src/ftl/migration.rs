//! SLC -> QLC migration driven by the hotness table (§4.7, hybrid only).
use log::error;

use super::device::{NandCmd, NandCmdKind};
use super::error::FtlError;
use super::hotness::StorageType;
use super::ppa::Ppa;
use super::Ftl;

impl Ftl {
    /// Gated scan + migrate pass, called at the end of the write path in
    /// hybrid mode. A no-op in plain mode or while the interval hasn't
    /// elapsed.
    pub fn check_and_perform_migrations(&mut self, now: u64) {
        let candidates = match self.hotness_mut() {
            Some(h) => h.scan_candidates(
                now,
                self.config.migration_interval_ns,
                self.config.cold_threshold,
                self.config.max_migrations_per_check,
            ),
            None => return,
        };
        for lpn in candidates {
            if let Err(e) = self.migrate_page(lpn, now) {
                error!("migration of lpn {} failed: {}", lpn, e);
            }
        }
    }

    /// Migrate one SLC-resident page to QLC (§4.7 steps 1-5).
    pub fn migrate_page(&mut self, lpn: u32, now: u64) -> Result<(), FtlError> {
        let old_pgidx = self.mapping.get(lpn);
        if old_pgidx == super::ppa::UNMAPPED_PPA {
            return Err(FtlError::Unmapped(lpn));
        }
        let old_ppa = Ppa::from_pgidx(old_pgidx, &self.geo);

        if let Some(h) = self.hotness_mut() {
            h.set_migrating(lpn, true);
        }

        self.device.advance_nand(
            NandCmd { kind: NandCmdKind::Read, ppa: old_ppa, stime: now, xfer_bytes: self.geo.pg_size_bytes as u64 },
            self.geo.pgs_per_blk,
        );

        let new_ppa = self.migration_new_page();
        self.device.advance_nand(
            NandCmd { kind: NandCmdKind::Write, ppa: new_ppa, stime: now, xfer_bytes: self.geo.pg_size_bytes as u64 },
            self.geo.pgs_per_blk,
        );

        self.mapping.set(lpn, &self.geo, &new_ppa)?;
        self.mapping.rmap_unset(old_pgidx);
        self.mapping.rmap_set(new_ppa.pgidx(&self.geo), lpn);

        // Mirrors the `on_page_validated` call `gc_write_page` makes for
        // copy-forward — without it the destination line's vpc would
        // understate the pages it actually holds (invariant 3, §8).
        self.mark_page_valid(&new_ppa);
        self.mark_page_invalid(&old_ppa);

        if let Some(h) = self.hotness_mut() {
            h.set_storage_type(lpn, StorageType::Qlc);
            h.set_migrating(lpn, false);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::geometry::CellMode;
    use super::super::{Ftl, FtlConfig, Geometry};
    use super::super::error::FtlError;

    fn hybrid_geo() -> Geometry {
        Geometry::from_params(
            4, 2, 1, 4, 4, 2, 4, 4096, 1,
            CellMode::Hybrid { slc_channels: 2, slc_luns_per_ch: 2 },
        )
        .unwrap()
    }

    #[test]
    fn migrate_unmapped_lpn_errors() {
        let geo = hybrid_geo();
        let mut ftl = Ftl::new(geo, FtlConfig::default(), 1 << 20);
        assert_eq!(ftl.migrate_page(0, 0), Err(FtlError::Unmapped(0)));
    }

    #[test]
    fn s6_migrated_page_lands_in_qlc_channel_range() {
        let geo = hybrid_geo();
        let mut ftl = Ftl::new(geo, FtlConfig::default(), 1 << 20);
        let ppa = ftl.user_new_page();
        let geo2 = ftl.geo;
        ftl.mapping.set(7, &geo2, &ppa).unwrap();
        ftl.mapping.rmap_set(ppa.pgidx(&geo2), 7);
        ftl.mark_page_valid(&ppa);

        ftl.migrate_page(7, 0).unwrap();

        let new_pgidx = ftl.mapping.get(7);
        let new_ppa = super::super::ppa::Ppa::from_pgidx(new_pgidx, &ftl.geo);
        assert!(new_ppa.ch >= geo2.slc_channels());
        assert_eq!(ftl.mapping.rmap_get(new_pgidx), 7);
    }
}
