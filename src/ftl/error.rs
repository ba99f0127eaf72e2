/// Error kinds raised by the FTL core.
use core::fmt;

/// Recoverable error conditions a caller can branch on.
///
/// `NoFreeLines` and block/line counter drift are not represented here —
/// both are treated as programmer assertions (see module docs on
/// `LineManager`/`WritePointer`) because admission control via write
/// credits is supposed to make them unreachable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FtlError {
    /// LPN outside `[0, tt_pgs)`.
    OutOfRange(u32),
    /// GC ran but no line in the victim queue met the reclaim threshold.
    NoSuitableVictim,
    /// Hotness table has no free slot for a new LPN.
    HotnessTableFull(u32),
    /// Migration targeted an LPN with no current mapping.
    Unmapped(u32),
}

impl fmt::Display for FtlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FtlError::OutOfRange(lpn) => write!(f, "lpn {} out of range", lpn),
            FtlError::NoSuitableVictim => write!(f, "no line meets the gc reclaim threshold"),
            FtlError::HotnessTableFull(lpn) => {
                write!(f, "hotness table full, dropped tracking update for lpn {}", lpn)
            }
            FtlError::Unmapped(lpn) => write!(f, "migration target lpn {} is unmapped", lpn),
        }
    }
}

/// Errors raised while validating a `Geometry` at construction time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// Total capacity was zero.
    ZeroCapacity,
    /// Channel count does not divide evenly across partitions, or the
    /// SLC/QLC channel split does not divide the channel count.
    ChannelSplitMismatch,
    /// A geometry parameter (lun/plane/block/page count) was zero.
    InvalidGeometry,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ZeroCapacity => write!(f, "requested capacity is zero"),
            ConfigError::ChannelSplitMismatch => {
                write!(f, "channel count does not divide evenly across partitions/tiers")
            }
            ConfigError::InvalidGeometry => write!(f, "geometry parameter must be non-zero"),
        }
    }
}
