//! Read and write paths (§4.8, §4.9): per-page credit/GC bookkeeping,
//! hotness/migration hooks, allocator dispatch, and NAND submission.
use super::device::{NandCmd, NandCmdKind};
use super::error::FtlError;
use super::ppa::{Ppa, UNMAPPED_PPA};
use super::Ftl;

/// Outcome of a write admission attempt. The writeback queue itself (what
/// happens to a deferred request) is an external collaborator (§1); this
/// only reports whether the buffer admitted the request now or later.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Admitted(u64),
    Deferred(u64),
}

impl Ftl {
    /// Write `num_pages` consecutive LPNs starting at `start_lpn`.
    /// `bytes_per_page` drives write-buffer admission (§4.9).
    pub fn write(&mut self, start_lpn: u32, num_pages: u32, now: u64, bytes_per_page: u64) -> WriteOutcome {
        let requested = bytes_per_page * num_pages as u64;
        let granted = self.buffer.allocate(requested);
        if granted < requested {
            self.buffer.release(granted);
            // Would normally hand off to the writeback queue; here we just
            // report the request as scheduled for later with no NAND state
            // touched yet.
            return WriteOutcome::Deferred(now);
        }

        let mut completion = now;
        for offset in 0..num_pages {
            let lpn = start_lpn + offset;
            debug_assert!(lpn < self.geo.tt_pgs(), "write path lpn {} out of range", lpn);
            completion = completion.max(self.write_one_page(lpn, now));
        }
        self.buffer.release(requested);
        self.background_gc(now);
        WriteOutcome::Admitted(completion)
    }

    fn write_one_page(&mut self, lpn: u32, now: u64) -> u64 {
        if self.credits.is_depleted() {
            self.foreground_gc(now);
            self.credits.refill();
        }
        self.record_hotness_write(lpn, now);

        let ppa = self.user_new_page();

        let old_pgidx = self.mapping.get(lpn);
        if old_pgidx != UNMAPPED_PPA {
            let old_ppa = Ppa::from_pgidx(old_pgidx, &self.geo);
            self.mapping.rmap_unset(old_pgidx);
            self.mark_page_invalid(&old_ppa);
        }

        let geo = self.geo;
        let _ = self.mapping.set(lpn, &geo, &ppa);
        self.mapping.rmap_set(ppa.pgidx(&geo), lpn);
        self.mark_page_valid(&ppa);
        self.credits.consume_one();

        let crosses_oneshot_boundary = (ppa.pg + 1) % geo.pgs_per_oneshotpg == 0;
        let (kind, xfer) = if crosses_oneshot_boundary {
            (NandCmdKind::Write, geo.pg_size_bytes as u64 * geo.pgs_per_oneshotpg as u64)
        } else {
            (NandCmdKind::Nop, 0)
        };
        let completion =
            self.device.advance_nand(NandCmd { kind, ppa, stime: now, xfer_bytes: xfer }, geo.pgs_per_blk);

        self.check_and_perform_migrations(now);
        completion
    }

    /// Read `lpns` (already partitioned/strided by the caller) from this
    /// partition, coalescing consecutive mapped pages that fall in the
    /// same flash page into one NAND read submission (§4.8).
    pub fn read(&mut self, lpns: &[u32], now: u64) -> Result<u64, FtlError> {
        let geo = self.geo;
        let mut completion = now;
        let mut i = 0usize;
        while i < lpns.len() {
            let lpn = lpns[i];
            if lpn >= geo.tt_pgs() {
                return Err(FtlError::OutOfRange(lpn));
            }
            let pgidx = self.mapping.get(lpn);
            if pgidx == UNMAPPED_PPA {
                i += 1;
                continue;
            }
            let ppa = Ppa::from_pgidx(pgidx, &geo);
            let mut run = 1u64;
            let mut j = i + 1;
            while j < lpns.len() {
                let next_lpn = lpns[j];
                if next_lpn >= geo.tt_pgs() {
                    break;
                }
                let next_pgidx = self.mapping.get(next_lpn);
                if next_pgidx != pgidx + run {
                    break;
                }
                let next_ppa = Ppa::from_pgidx(next_pgidx, &geo);
                let same_stripe = next_ppa.ch == ppa.ch
                    && next_ppa.lun == ppa.lun
                    && next_ppa.pl == ppa.pl
                    && next_ppa.blk == ppa.blk;
                let same_flashpg = next_ppa.pg / geo.pgs_per_flashpg == ppa.pg / geo.pgs_per_flashpg;
                if !same_stripe || !same_flashpg {
                    break;
                }
                run += 1;
                j += 1;
            }
            let c = self.device.advance_nand(
                NandCmd { kind: NandCmdKind::Read, ppa, stime: now, xfer_bytes: geo.pg_size_bytes as u64 * run },
                geo.pgs_per_blk,
            );
            completion = completion.max(c);
            i = j;
        }

        let request_bytes = lpns.len() as u64 * geo.pg_size_bytes as u64;
        let fw_latency =
            if request_bytes <= 4096 { geo.latencies.fw_4kb_rd_lat_ns } else { geo.latencies.fw_rd_lat_ns };
        Ok(completion + fw_latency)
    }

    /// Flush: the max `next_avail` across every LUN touched so far — there
    /// is nothing in flight to wait on beyond NAND completion times (§5:
    /// no blocking operations, no in-flight queue modeled here).
    pub fn flush(&self) -> u64 {
        (0..self.geo.num_luns())
            .map(|glun| {
                let ppa = Ppa { ch: glun % self.geo.nchs, lun: glun / self.geo.nchs, pl: 0, blk: 0, pg: 0 };
                self.device.lun_next_avail(&ppa)
            })
            .fold(0u64, u64::max)
    }
}

#[cfg(test)]
mod tests {
    use super::super::geometry::CellMode;
    use super::super::{Ftl, FtlConfig, Geometry};
    use super::*;

    fn small_geo() -> Geometry {
        Geometry::from_params(2, 2, 1, 4, 4, 2, 4, 4096, 1, CellMode::Plain).unwrap()
    }

    #[test]
    fn write_then_read_round_trips() {
        let geo = small_geo();
        let mut ftl = Ftl::new(geo, FtlConfig::default(), 1 << 20);
        let outcome = ftl.write(0, 4, 0, 4096);
        assert!(matches!(outcome, WriteOutcome::Admitted(_)));

        let completion = ftl.read(&[0, 1, 2, 3], 0).unwrap();
        assert!(completion > 0);
    }

    #[test]
    fn read_of_unmapped_lpn_does_not_touch_nand() {
        let geo = small_geo();
        let mut ftl = Ftl::new(geo, FtlConfig::default(), 1 << 20);
        let completion = ftl.read(&[0], 0).unwrap();
        // Only the firmware base latency applies.
        assert_eq!(completion, geo.latencies.fw_4kb_rd_lat_ns);
    }

    #[test]
    fn read_out_of_range_lpn_errors() {
        let geo = small_geo();
        let mut ftl = Ftl::new(geo, FtlConfig::default(), 1 << 20);
        let err = ftl.read(&[geo.tt_pgs()], 0).unwrap_err();
        assert_eq!(err, FtlError::OutOfRange(geo.tt_pgs()));
    }

    #[test]
    fn write_buffer_exhaustion_defers_the_request() {
        let geo = small_geo();
        let mut ftl = Ftl::new(geo, FtlConfig::default(), 10);
        let outcome = ftl.write(0, 4, 0, 4096);
        assert!(matches!(outcome, WriteOutcome::Deferred(_)));
    }

    /// S2: overwriting a previously-written LPN invalidates its old page
    /// (ipc += 1 on the owning block/line) and demotes the line from full
    /// to the victim queue once enough pages have been invalidated.
    #[test]
    fn s2_overwrite_invalidates_old_page_and_demotes_line() {
        let geo = small_geo();
        let mut ftl = Ftl::new(geo, FtlConfig::default(), 1 << 20);
        let pgs_per_line = geo.pgs_per_line();
        for lpn in 0..pgs_per_line {
            ftl.write(lpn, 1, 0, 4096);
        }
        // The line the user pointer just filled is on the full list (all
        // vpc, no ipc yet), so it isn't a victim candidate.
        assert_eq!(ftl.global_lines_mut().select_victim(true), Err(super::error::FtlError::NoSuitableVictim));

        ftl.write(0, 1, 0, 4096);

        // One page across the whole line is now invalid; the line must
        // have been demoted into the victim queue with vpc down by one.
        let victim = ftl.global_lines_mut().select_victim(true).expect("line must be a victim candidate now");
        assert_eq!(ftl.global_lines().ipc(victim), 1);
        assert_eq!(ftl.global_lines().vpc(victim), pgs_per_line - 1);
    }

    /// S3: forcing `gc_thres_lines_high` to the current free-line count
    /// makes the next write's credit refill trip foreground GC, reclaiming
    /// exactly one line.
    #[test]
    fn s3_foreground_gc_fires_when_credits_deplete_at_threshold() {
        let geo = small_geo();
        let mut config = FtlConfig::default();
        let mut ftl = Ftl::new(geo, config, 1 << 20);
        let pgs_per_line = geo.pgs_per_line();

        // Fill and then invalidate one whole line so it is GC-reclaimable,
        // and drain credits down to zero so the next write's refill check
        // fires foreground_gc.
        for lpn in 0..pgs_per_line {
            ftl.write(lpn, 1, 0, 4096);
        }
        for lpn in 0..pgs_per_line {
            ftl.write(lpn, 1, 0, 4096);
        }
        config.gc_thres_lines_high = ftl.free_line_count() as u32;
        ftl.config = config;

        let free_before = ftl.free_line_count();
        ftl.write(0, 1, 0, 4096);
        assert!(ftl.free_line_count() >= free_before);
    }

    /// S5: four LPNs landing in the same flash page coalesce into exactly
    /// one NAND read submission.
    #[test]
    fn s5_read_coalesces_adjacent_pages_into_one_nand_read() {
        // Single channel/LUN/plane so four sequential writes land on
        // contiguous pages of one block, all within one flash page
        // (pgs_per_flashpg = 4, pgs_per_oneshotpg = pgs_per_blk = 4).
        let geo = Geometry::from_params(1, 1, 1, 4, 4, 4, 4, 4096, 1, CellMode::Plain).unwrap();
        let mut ftl = Ftl::new(geo, FtlConfig::default(), 1 << 20);
        ftl.write(0, 4, 0, 4096);

        let reads_before = ftl.device.reads_issued();
        ftl.read(&[0, 1, 2, 3], 0).unwrap();
        assert_eq!(ftl.device.reads_issued() - reads_before, 1);
    }
}
