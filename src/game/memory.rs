//! Writes patches into the running game.

use std::ffi::c_void;

use eyre::{Result, WrapErr};
use windows::Win32::System::{
    Diagnostics::Debug::FlushInstructionCache,
    Memory::{VirtualProtect, PAGE_EXECUTE_READWRITE, PAGE_PROTECTION_FLAGS},
    Threading::GetCurrentProcess,
};

use super::patches::PatchTarget;
use crate::hook;

/// The game's own image, addressed by offsets from its base.
pub struct ProcessMemory;

impl PatchTarget for ProcessMemory {
    fn issue(&mut self, address: usize, bytes: &[u8]) -> Result<()> {
        let dest = hook::slide::<u8>(address)?;
        let region = dest as *const c_void;

        unsafe {
            let mut old_protect = PAGE_PROTECTION_FLAGS::default();

            VirtualProtect(region, bytes.len(), PAGE_EXECUTE_READWRITE, &mut old_protect)
                .ok()
                .wrap_err_with(|| format!("Unable to unprotect {address:#x}"))?;

            dest.copy_from_nonoverlapping(bytes.as_ptr(), bytes.len());

            let mut unused = PAGE_PROTECTION_FLAGS::default();

            // The bytes are already written, so a failure here only leaves the page writable.
            if let Err(err) = VirtualProtect(region, bytes.len(), old_protect, &mut unused).ok() {
                log::warn!("Unable to restore protection at {address:#x}: {err}");
            }

            FlushInstructionCache(GetCurrentProcess(), Some(region), bytes.len())
                .ok()
                .wrap_err("Unable to flush instruction cache")?;
        }

        Ok(())
    }
}
