//! Foreground GC reclaim protocol with copy-forward (§4.6).
use log::info;

use super::device::{NandCmd, NandCmdKind};
use super::ppa::Ppa;
use super::Ftl;

impl Ftl {
    /// Called from the write path once free lines drop to or below
    /// `gc_thres_lines_high`; always forces a reclaim.
    pub fn foreground_gc(&mut self, now: u64) {
        if self.free_line_count() as u32 <= self.config.gc_thres_lines_high {
            self.do_gc(true, now);
        }
    }

    /// Called at the end of the write path; reclaims opportunistically.
    pub fn background_gc(&mut self, now: u64) {
        if self.free_line_count() as u32 <= self.config.gc_thres_lines {
            self.do_gc(false, now);
        }
    }

    /// One GC pass: select a victim, copy its valid pages forward, erase
    /// and free the reclaimed line. Not a loop — one victim per call
    /// (§4.6).
    pub fn do_gc(&mut self, force: bool, now: u64) {
        let victim = match self.global_lines_mut().select_victim(force) {
            Ok(id) => id,
            Err(e) => {
                info!("gc: {} (force={})", e, force);
                return;
            }
        };
        let ipc = self.global_lines().ipc(victim);
        self.credits.set_refill_amount(ipc);

        let blks_per_line = self.geo.blks_per_line();
        let oneshotpgs_per_blk = self.geo.oneshotpgs_per_blk();
        let mut reclaimed = 0u32;

        for oneshot in 0..oneshotpgs_per_blk {
            for stripe in 0..blks_per_line {
                let ch = stripe % self.geo.nchs;
                let lun = (stripe / self.geo.nchs) % self.geo.luns_per_ch;
                let pl = stripe / (self.geo.nchs * self.geo.luns_per_ch);
                let ppa = Ppa {
                    ch,
                    lun,
                    pl,
                    blk: victim,
                    pg: oneshot * self.geo.pgs_per_oneshotpg,
                };
                reclaimed += self.clean_one_flashpg(&ppa, now);
            }
        }
        // Every block contributing to this line has now had all of its
        // flash-pages cleaned; erase each and mark it free.
        for stripe in 0..blks_per_line {
            let ch = stripe % self.geo.nchs;
            let lun = (stripe / self.geo.nchs) % self.geo.luns_per_ch;
            let pl = stripe / (self.geo.nchs * self.geo.luns_per_ch);
            let erase_ppa = Ppa { ch, lun, pl, blk: victim, pg: 0 };
            self.device.advance_nand(
                NandCmd { kind: NandCmdKind::Erase, ppa: erase_ppa, stime: now, xfer_bytes: 0 },
                self.geo.pgs_per_blk,
            );
        }
        self.global_lines_mut().free_line(victim);
        info!("gc: reclaimed line {} (ipc={}, copied {} pages)", victim, ipc, reclaimed);
    }

    /// Clean one flash-page's worth of pages across a channel/LUN/plane
    /// stripe: count valid pages, issue one aggregated read, then copy
    /// each valid page forward. Returns the number of pages copied.
    fn clean_one_flashpg(&mut self, ppa: &Ppa, now: u64) -> u32 {
        let pgs_per_flashpg = self.geo.pgs_per_flashpg;
        let mut valid = alloc::vec::Vec::with_capacity(pgs_per_flashpg as usize);
        for off in 0..pgs_per_flashpg {
            let p = Ppa { pg: ppa.pg + off, ..*ppa };
            let pgidx = p.pgidx(&self.geo);
            if self.mapping.rmap_get(pgidx) != super::ppa::UNMAPPED_LPN {
                valid.push(p);
            }
        }
        if valid.is_empty() {
            return 0;
        }
        self.device.advance_nand(
            NandCmd {
                kind: NandCmdKind::Read,
                ppa: *ppa,
                stime: now,
                xfer_bytes: self.geo.pg_size_bytes as u64 * valid.len() as u64,
            },
            self.geo.pgs_per_blk,
        );
        let count = valid.len() as u32;
        for old_ppa in valid {
            self.gc_write_page(&old_ppa, now);
        }
        count
    }

    /// Copy one valid page forward via the GC pointer — never the DA
    /// pointer, and in hybrid mode confined to the QLC channel range
    /// regardless of which tier the victim line belongs to, so a hybrid
    /// SLC victim's surviving pages still get copied into QLC (§4.6, §4.4).
    fn gc_write_page(&mut self, old_ppa: &Ppa, now: u64) {
        let old_pgidx = old_ppa.pgidx(&self.geo);
        let lpn = self.mapping.rmap_get(old_pgidx);
        debug_assert_ne!(lpn, super::ppa::UNMAPPED_LPN, "gc copy-forward hit an invalid page");

        let new_ppa = self.gc_new_page();
        let _ = self.mapping.set(lpn, &self.geo, &new_ppa);
        self.mapping.rmap_unset(old_pgidx);
        self.mapping.rmap_set(new_ppa.pgidx(&self.geo), lpn);
        self.mark_page_valid(&new_ppa);

        let crosses_oneshot_boundary = (new_ppa.pg + 1) % self.geo.pgs_per_oneshotpg == 0;
        let kind = if crosses_oneshot_boundary { NandCmdKind::Write } else { NandCmdKind::Nop };
        let xfer = if crosses_oneshot_boundary {
            self.geo.pg_size_bytes as u64 * self.geo.pgs_per_oneshotpg as u64
        } else {
            0
        };
        self.device.advance_nand(
            NandCmd { kind, ppa: new_ppa, stime: now, xfer_bytes: xfer },
            self.geo.pgs_per_blk,
        );
    }
}
