//! NVMe-facing surface: opcode dispatch and namespace initialization
//! (§6). The command/queue plumbing itself (SQ/CQ handling, PRP/SGL
//! resolution, PCIe transport) is out of scope (§1) — this only covers
//! what WRITE/READ/FLUSH need from the FTL core and how a namespace's
//! logical size is derived.
use alloc::sync::Arc;
use alloc::vec;
use alloc::vec::Vec;

use log::warn;

use super::buffer::WriteBuffer;
use super::device::PcieModel;
use super::io::WriteOutcome;
use super::{Ftl, FtlConfig, Geometry};

pub const SECTOR_SIZE_BYTES: u32 = 512;
pub const PAGE_SIZE_BYTES: u32 = 4096;
pub const SECTORS_PER_PAGE: u32 = PAGE_SIZE_BYTES / SECTOR_SIZE_BYTES;

pub const STATUS_SUCCESS: u16 = 0;
pub const STATUS_UNKNOWN_OPCODE: u16 = 0x01;
pub const STATUS_INVALID_FIELD: u16 = 0x02;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NvmeOpcode {
    Write,
    Read,
    Flush,
    Unknown(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NvmeResult {
    pub status: u16,
    pub nsecs_target: u64,
}

/// One namespace's worth of FTL partitions, striped by `lpn mod
/// partitions.len()` (§4.8/§6).
pub struct Namespace {
    partitions: Vec<Ftl>,
    op_area_pcent: u32,
}

impl Namespace {
    /// `size_bytes` is the raw (pre-overprovisioning) capacity; the
    /// reported logical size is derived via `pba_pcent` below.
    pub fn init(
        size_bytes: u64,
        channels_total: u32,
        luns_per_ch: u32,
        pls_per_lun: u32,
        pgs_per_blk: u32,
        pgs_per_oneshotpg: u32,
        pgs_per_flashpg: u32,
        mode: super::CellMode,
        ssd_partitions: u32,
        op_area_pcent: u32,
        config: FtlConfig,
        write_buffer_bytes: u64,
    ) -> Result<Self, super::ConfigError> {
        let geo = Geometry::for_capacity(
            size_bytes,
            channels_total,
            luns_per_ch,
            pls_per_lun,
            pgs_per_blk,
            pgs_per_oneshotpg,
            pgs_per_flashpg,
            PAGE_SIZE_BYTES,
            ssd_partitions,
            mode,
        )?;
        // One write buffer and one PCIe timeline for the whole namespace,
        // shared by every partition's `Ftl`; each partition still gets its
        // own NAND channel/LUN state via `with_shared_io` (§5, §6).
        let buffer = Arc::new(WriteBuffer::new(write_buffer_bytes));
        let pcie = Arc::new(PcieModel::new());
        let partitions = (0..ssd_partitions)
            .map(|_| Ftl::with_shared_io(geo, config, buffer.clone(), pcie.clone()))
            .collect();
        Ok(Namespace { partitions, op_area_pcent })
    }

    /// `pba_pcent = (1 + op_area_pcent) * 100`; reported size = `size *
    /// 100 / pba_pcent` (§6).
    pub fn logical_size_bytes(&self, raw_size_bytes: u64) -> u64 {
        let pba_pcent = (1 + self.op_area_pcent) as u64 * 100;
        raw_size_bytes * 100 / pba_pcent
    }

    fn global_to_local(&self, global_lpn: u64) -> (usize, u32) {
        let nr_parts = self.partitions.len() as u64;
        ((global_lpn % nr_parts) as usize, (global_lpn / nr_parts) as u32)
    }

    pub fn dispatch(&mut self, opcode: NvmeOpcode, starting_lba: u64, length_sectors_minus_one: u32, now: u64) -> NvmeResult {
        match opcode {
            NvmeOpcode::Write => self.do_write(starting_lba, length_sectors_minus_one, now),
            NvmeOpcode::Read => self.do_read(starting_lba, length_sectors_minus_one, now),
            NvmeOpcode::Flush => self.do_flush(now),
            NvmeOpcode::Unknown(op) => {
                warn!("unknown nvme opcode {:#x}", op);
                NvmeResult { status: STATUS_UNKNOWN_OPCODE, nsecs_target: now }
            }
        }
    }

    fn page_span(&self, starting_lba: u64, length_sectors_minus_one: u32) -> Option<(u64, u64)> {
        let num_sectors = length_sectors_minus_one as u64 + 1;
        if num_sectors % SECTORS_PER_PAGE as u64 != 0 || starting_lba % SECTORS_PER_PAGE as u64 != 0 {
            return None;
        }
        Some((starting_lba / SECTORS_PER_PAGE as u64, num_sectors / SECTORS_PER_PAGE as u64))
    }

    fn do_write(&mut self, starting_lba: u64, length_sectors_minus_one: u32, now: u64) -> NvmeResult {
        let (start_lpn, num_pages) = match self.page_span(starting_lba, length_sectors_minus_one) {
            Some(span) => span,
            None => return NvmeResult { status: STATUS_INVALID_FIELD, nsecs_target: now },
        };
        let mut completion = now;
        for i in 0..num_pages {
            let (part, local_lpn) = self.global_to_local(start_lpn + i);
            match self.partitions[part].write(local_lpn, 1, now, PAGE_SIZE_BYTES as u64) {
                WriteOutcome::Admitted(c) | WriteOutcome::Deferred(c) => completion = completion.max(c),
            }
        }
        NvmeResult { status: STATUS_SUCCESS, nsecs_target: completion }
    }

    fn do_read(&mut self, starting_lba: u64, length_sectors_minus_one: u32, now: u64) -> NvmeResult {
        let (start_lpn, num_pages) = match self.page_span(starting_lba, length_sectors_minus_one) {
            Some(span) => span,
            None => return NvmeResult { status: STATUS_INVALID_FIELD, nsecs_target: now },
        };
        let mut per_part: Vec<Vec<u32>> = vec![Vec::new(); self.partitions.len()];
        for i in 0..num_pages {
            let (part, local_lpn) = self.global_to_local(start_lpn + i);
            per_part[part].push(local_lpn);
        }
        let mut completion = now;
        for (part, lpns) in per_part.into_iter().enumerate() {
            if lpns.is_empty() {
                continue;
            }
            match self.partitions[part].read(&lpns, now) {
                Ok(c) => completion = completion.max(c),
                Err(_) => return NvmeResult { status: STATUS_INVALID_FIELD, nsecs_target: now },
            }
        }
        NvmeResult { status: STATUS_SUCCESS, nsecs_target: completion }
    }

    fn do_flush(&self, now: u64) -> NvmeResult {
        let completion = self.partitions.iter().map(|p| p.flush()).fold(now, u64::max);
        NvmeResult { status: STATUS_SUCCESS, nsecs_target: completion }
    }
}
