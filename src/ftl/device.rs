/// Discrete-event NAND device model: per-LUN next-available-time, a
/// per-channel bandwidth model, and a shared PCIe bandwidth model.
///
/// Every submission advances simulated time rather than wall-clock time;
/// there is nothing to poll or block on here (§5: "there are no blocking
/// operations — the dispatcher returns a future completion timestamp
/// rather than sleeping").
use alloc::sync::Arc;
use alloc::vec::Vec;

use spin::Mutex;

use super::geometry::{Geometry, Latencies};
use super::ppa::Ppa;

/// The PCIe/DMA timeline, shared by every partition's `NandModel` in a
/// namespace (spec: "creates `SSD_PARTITIONS` FTL instances sharing one
/// PCIe model and one write buffer"). Holds only a running high-water
/// mark, so a `Mutex` is enough — no ordering beyond "never regress".
pub struct PcieModel {
    next_avail: Mutex<u64>,
}

impl PcieModel {
    pub fn new() -> Self {
        PcieModel { next_avail: Mutex::new(0) }
    }

    fn bump(&self, t: u64) {
        let mut n = self.next_avail.lock();
        *n = (*n).max(t);
    }

    pub fn next_avail(&self) -> u64 {
        *self.next_avail.lock()
    }
}

impl Default for PcieModel {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NandCmdKind {
    Read,
    Write,
    Erase,
    Nop,
}

/// One NAND command submission.
#[derive(Debug, Clone, Copy)]
pub struct NandCmd {
    pub kind: NandCmdKind,
    pub ppa: Ppa,
    /// Caller-observed start time; the LUN's own `next_avail` may push the
    /// effective start later (the monotonicity invariant, §8 property 6).
    pub stime: u64,
    pub xfer_bytes: u64,
}

/// Per-LUN state. `next_avail` only ever increases (§3, §8 property 6).
struct Lun {
    next_avail: u64,
}

pub struct NandModel {
    luns: Vec<Lun>,
    nchs: u32,
    slc_channels: u32,
    latencies: Latencies,
    max_ch_xfer_bytes: u64,
    interleave_pci_dma: bool,
    pcie: Arc<PcieModel>,
    /// Commands submitted per kind, for read-coalescing assertions and
    /// coarse utilization reporting — not part of the simulated timeline.
    reads_issued: u32,
    writes_issued: u32,
    erases_issued: u32,
}

impl NandModel {
    /// Builds its own private PCIe timeline — for a standalone `Ftl` not
    /// attached to a `Namespace`. A namespace's partitions instead share
    /// one `PcieModel` via `with_shared_pcie` (§5, §6).
    pub fn new(geo: &Geometry) -> Self {
        Self::with_shared_pcie(geo, Arc::new(PcieModel::new()))
    }

    pub fn with_shared_pcie(geo: &Geometry, pcie: Arc<PcieModel>) -> Self {
        let num_luns = geo.num_luns();
        NandModel {
            luns: (0..num_luns).map(|_| Lun { next_avail: 0 }).collect(),
            nchs: geo.nchs,
            slc_channels: geo.slc_channels(),
            latencies: geo.latencies,
            max_ch_xfer_bytes: 4096 * 8, // one oneshot page's worth per chunk by default
            interleave_pci_dma: true,
            pcie,
            reads_issued: 0,
            writes_issued: 0,
            erases_issued: 0,
        }
    }

    pub fn reads_issued(&self) -> u32 {
        self.reads_issued
    }

    fn glun(&self, ppa: &Ppa) -> usize {
        (ppa.lun * self.nchs + ppa.ch) as usize
    }

    fn is_qlc(&self, ppa: &Ppa) -> bool {
        ppa.ch >= self.slc_channels
    }

    /// Four read-latency bands (Q1..Q4), selected by the page's position
    /// within its block — matches the banded QLC read timing the hybrid
    /// NAND model this is drawn from uses.
    fn qlc_read_region(&self, ppa: &Ppa, geo_pgs_per_blk: u32) -> u64 {
        if geo_pgs_per_blk == 0 {
            return self.latencies.qlc_read_ns[0];
        }
        let band = (ppa.pg.saturating_mul(4) / geo_pgs_per_blk).min(3) as usize;
        self.latencies.qlc_read_ns[band]
    }

    fn read_latency(&self, ppa: &Ppa, pgs_per_blk: u32) -> u64 {
        if self.is_qlc(ppa) {
            self.qlc_read_region(ppa, pgs_per_blk)
        } else {
            self.latencies.slc_read_ns
        }
    }

    fn write_latency(&self, ppa: &Ppa) -> u64 {
        if self.is_qlc(ppa) {
            self.latencies.qlc_write_ns
        } else {
            self.latencies.slc_write_ns
        }
    }

    fn erase_latency(&self, ppa: &Ppa) -> u64 {
        if self.is_qlc(ppa) {
            self.latencies.qlc_erase_ns
        } else {
            self.latencies.slc_erase_ns
        }
    }

    fn channel_xfer_ns(&mut self, xfer_bytes: u64, start: u64) -> u64 {
        let chunks = (xfer_bytes + self.max_ch_xfer_bytes - 1) / self.max_ch_xfer_bytes;
        let ch_ns = xfer_bytes * self.latencies.ch_xfer_ns_per_byte;
        if self.interleave_pci_dma {
            // Each chunk may overlap an equally-sized PCIe transfer; the
            // PCIe model's own timeline only needs to not regress.
            let mut t = start;
            for _ in 0..chunks.max(1) {
                let chunk_ns = ch_ns / chunks.max(1);
                t += chunk_ns;
                self.pcie.bump(t);
            }
            t - start
        } else {
            ch_ns
        }
    }

    /// Advance the device model by one command, returning the completion
    /// time and updating the owning LUN's `next_avail`.
    pub fn advance_nand(&mut self, cmd: NandCmd, pgs_per_blk: u32) -> u64 {
        let idx = self.glun(&cmd.ppa);
        let cmd_stime = self.luns[idx].next_avail.max(cmd.stime);

        match cmd.kind {
            NandCmdKind::Read => self.reads_issued += 1,
            NandCmdKind::Write => self.writes_issued += 1,
            NandCmdKind::Erase => self.erases_issued += 1,
            NandCmdKind::Nop => {}
        }

        let completion = match cmd.kind {
            NandCmdKind::Read => {
                let busy_until = cmd_stime + self.read_latency(&cmd.ppa, pgs_per_blk);
                let xfer_ns = self.channel_xfer_ns(cmd.xfer_bytes, busy_until);
                busy_until + xfer_ns
            }
            NandCmdKind::Write => {
                let xfer_ns = self.channel_xfer_ns(cmd.xfer_bytes, cmd_stime);
                cmd_stime + xfer_ns + self.write_latency(&cmd.ppa)
            }
            NandCmdKind::Erase => cmd_stime + self.erase_latency(&cmd.ppa),
            NandCmdKind::Nop => cmd_stime,
        };

        self.luns[idx].next_avail = completion;
        completion
    }

    pub fn lun_next_avail(&self, ppa: &Ppa) -> u64 {
        self.luns[self.glun(ppa)].next_avail
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
    fn next_avail_is_monotone_across_submissions() {
        let geo = geo();
        let mut dev = NandModel::new(&geo);
        let ppa = Ppa { ch: 0, lun: 0, pl: 0, blk: 0, pg: 0 };
        let mut last = 0u64;
        for i in 0..5u64 {
            let c = dev.advance_nand(
                NandCmd { kind: NandCmdKind::Write, ppa, stime: i, xfer_bytes: 4096 },
                geo.pgs_per_blk,
            );
            assert!(c >= last);
            last = c;
        }
    }

    #[test]
    fn different_luns_do_not_serialize_each_other() {
        let geo = geo();
        let mut dev = NandModel::new(&geo);
        let ppa_a = Ppa { ch: 0, lun: 0, pl: 0, blk: 0, pg: 0 };
        let ppa_b = Ppa { ch: 1, lun: 1, pl: 0, blk: 0, pg: 0 };
        let c_a = dev.advance_nand(
            NandCmd { kind: NandCmdKind::Write, ppa: ppa_a, stime: 0, xfer_bytes: 4096 },
            geo.pgs_per_blk,
        );
        let c_b = dev.advance_nand(
            NandCmd { kind: NandCmdKind::Write, ppa: ppa_b, stime: 0, xfer_bytes: 4096 },
            geo.pgs_per_blk,
        );
        assert_eq!(dev.lun_next_avail(&ppa_a), c_a);
        assert_eq!(dev.lun_next_avail(&ppa_b), c_b);
    }

    #[test]
    fn nop_never_regresses_next_avail() {
        let geo = geo();
        let mut dev = NandModel::new(&geo);
        let ppa = Ppa { ch: 0, lun: 0, pl: 0, blk: 0, pg: 0 };
        let c1 = dev.advance_nand(
            NandCmd { kind: NandCmdKind::Write, ppa, stime: 0, xfer_bytes: 4096 },
            geo.pgs_per_blk,
        );
        let c2 = dev.advance_nand(
            NandCmd { kind: NandCmdKind::Nop, ppa, stime: 0, xfer_bytes: 0 },
            geo.pgs_per_blk,
        );
        assert_eq!(c2, c1);
    }
}
