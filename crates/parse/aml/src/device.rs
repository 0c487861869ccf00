//! Device initialization (`_STA` / `_INI`).

use alloc::vec::Vec;

use crate::Interpreter;
use crate::convert;
use crate::error::AmlError;
use crate::handler::Handler;
use crate::name::{AmlPath, NameSeg};
use crate::object::Object;

const STA: NameSeg = NameSeg::from_str("_STA");
const INI: NameSeg = NameSeg::from_str("_INI");

/// `_STA` value assumed when a device has none: present, enabled, shown and
/// functioning.
const DEFAULT_STATUS: u64 = 0x0F;

const STA_PRESENT: u64 = 1 << 0;
const STA_FUNCTIONING: u64 = 1 << 3;

/// Counters reported by [`Interpreter::initialize_devices`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InitSummary {
    /// Devices and processors whose `_STA` was consulted.
    pub devices: usize,
    /// `_INI` methods that ran successfully.
    pub initialized: usize,
    /// `_INI` methods that failed.
    pub failed: usize,
}

impl<H: Handler> Interpreter<H> {
    /// Runs `\_SB._INI`, then walks the namespace depth-first running
    /// `_INI` on every present device.
    ///
    /// A device's children are visited if it is present or functioning.
    /// Failing `_INI` methods are logged and counted, not propagated; a
    /// device whose `_STA` fails is skipped along with its children.
    pub fn initialize_devices(&self) -> Result<InitSummary, AmlError> {
        let mut summary = InitSummary::default();
        let sb = AmlPath::parse_str("\\_SB")?;
        self.run_ini(&sb, &mut summary);
        self.initialize_children(&AmlPath::ROOT, &mut summary)?;
        log::debug!(
            "aml: device init: {} devices, {} _INI ok, {} failed",
            summary.devices,
            summary.initialized,
            summary.failed
        );
        Ok(summary)
    }

    /// Evaluates `_STA` of the device at `path`, or returns
    /// `0x0F` (present and functioning) if it has none.
    pub fn device_status(&self, path: &AmlPath) -> Result<u64, AmlError> {
        let sta = path.join(STA)?;
        if !self.namespace.read().contains(&sta) {
            return Ok(DEFAULT_STATUS);
        }
        let value = self.evaluate(&sta, Vec::new())?;
        convert::to_integer(&value, self.integer_width())
    }

    fn initialize_children(&self, scope: &AmlPath, summary: &mut InitSummary) -> Result<(), AmlError> {
        let children = self.namespace.read().children(scope);
        for seg in children {
            let path = scope.join(seg)?;
            let kind = match self.namespace.read().get(&path) {
                Some(Object::Device | Object::Processor(_)) => Visit::Device,
                Some(Object::Scope | Object::ThermalZone | Object::PowerResource(_)) => Visit::Scope,
                _ => Visit::Skip,
            };
            match kind {
                Visit::Device => {
                    summary.devices += 1;
                    let status = match self.device_status(&path) {
                        Ok(status) => status,
                        Err(err) => {
                            log::warn!("aml: {path}._STA failed: {err}");
                            continue;
                        }
                    };
                    if status & STA_PRESENT != 0 {
                        self.run_ini(&path, summary);
                    }
                    if status & (STA_PRESENT | STA_FUNCTIONING) != 0 {
                        self.initialize_children(&path, summary)?;
                    } else {
                        log::trace!("aml: {path} absent (_STA {status:#x})");
                    }
                }
                Visit::Scope => self.initialize_children(&path, summary)?,
                Visit::Skip => {}
            }
        }
        Ok(())
    }

    fn run_ini(&self, device: &AmlPath, summary: &mut InitSummary) {
        let Ok(ini) = device.join(INI) else {
            return;
        };
        if !self.namespace.read().contains(&ini) {
            return;
        }
        match self.evaluate(&ini, Vec::new()) {
            Ok(_) => summary.initialized += 1,
            Err(err) => {
                log::warn!("aml: {ini} failed: {err}");
                summary.failed += 1;
            }
        }
    }
}

enum Visit {
    Device,
    Scope,
    Skip,
}
