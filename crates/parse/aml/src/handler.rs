//! Host services the interpreter needs from the kernel.
//!
//! The kernel implements [`Handler`] once and hands it to
//! [`Interpreter::new`](crate::Interpreter::new). Every hardware access AML
//! performs goes through it: memory-mapped and port I/O for operation
//! regions, PCI configuration space, timing, and (through the [`Blocker`]
//! supertrait) thread blocking for `Acquire`/`Wait`.
//!
//! Access widths are given in bytes (1, 2, 4 or 8).

use crate::error::AmlError;
use crate::object::RegionSpace;
use crate::sync::Blocker;

/// A PCI function address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PciAddress {
    /// PCI segment group (`_SEG`).
    pub segment: u16,
    /// Bus number (`_BBN`).
    pub bus: u8,
    /// Device number (`_ADR` bits 31:16).
    pub device: u8,
    /// Function number (`_ADR` bits 15:0).
    pub function: u8,
}

impl core::fmt::Display for PciAddress {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "{:04x}:{:02x}:{:02x}.{}",
            self.segment, self.bus, self.device, self.function
        )
    }
}

/// Kernel services backing operation regions and timing.
///
/// Region accessors default to [`AmlError::UnsupportedRegionSpace`], so a
/// handler only implements the spaces its platform has.
pub trait Handler: Blocker + Send + Sync {
    /// Reads `width` bytes of physical memory.
    fn read_memory(&self, address: u64, width: u8) -> Result<u64, AmlError> {
        let _ = (address, width);
        Err(AmlError::UnsupportedRegionSpace(RegionSpace::SystemMemory))
    }

    /// Writes `width` bytes of physical memory.
    fn write_memory(&self, address: u64, width: u8, value: u64) -> Result<(), AmlError> {
        let _ = (address, width, value);
        Err(AmlError::UnsupportedRegionSpace(RegionSpace::SystemMemory))
    }

    /// Reads an I/O port.
    fn read_io(&self, port: u16, width: u8) -> Result<u64, AmlError> {
        let _ = (port, width);
        Err(AmlError::UnsupportedRegionSpace(RegionSpace::SystemIo))
    }

    /// Writes an I/O port.
    fn write_io(&self, port: u16, width: u8, value: u64) -> Result<(), AmlError> {
        let _ = (port, width, value);
        Err(AmlError::UnsupportedRegionSpace(RegionSpace::SystemIo))
    }

    /// Reads PCI configuration space.
    fn read_pci(&self, address: PciAddress, offset: u16, width: u8) -> Result<u64, AmlError> {
        let _ = (address, offset, width);
        Err(AmlError::UnsupportedRegionSpace(RegionSpace::PciConfig))
    }

    /// Writes PCI configuration space.
    fn write_pci(
        &self,
        address: PciAddress,
        offset: u16,
        width: u8,
        value: u64,
    ) -> Result<(), AmlError> {
        let _ = (address, offset, width, value);
        Err(AmlError::UnsupportedRegionSpace(RegionSpace::PciConfig))
    }

    /// Sleeps for at least `ms` milliseconds (`Sleep`), yielding the CPU.
    fn sleep_ms(&self, ms: u64) {
        let deadline = self.ms_since_boot().saturating_add(ms);
        loop {
            let now = self.ms_since_boot();
            if now >= deadline {
                break;
            }
            self.block_with_timeout_ms(deadline - now);
        }
    }

    /// Busy-waits for at least `us` microseconds (`Stall`).
    ///
    /// The default spins on the millisecond clock, so it rounds up to the
    /// next millisecond.
    fn stall_us(&self, us: u64) {
        let deadline = self.ms_since_boot().saturating_add(us.div_ceil(1000));
        while self.ms_since_boot() < deadline {
            core::hint::spin_loop();
        }
    }

    /// Monotonic timer in 100 ns units (`Timer`).
    fn timer_100ns(&self) -> u64 {
        self.ms_since_boot().saturating_mul(10_000)
    }
}
