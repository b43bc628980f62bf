//! Byte patches that make the game accept a level list of a different length.
//!
//! Patches are planned from a validated config and handed to a `PatchTarget`, which is the only
//! thing that ever writes to the game's memory.

use crate::meta::config::Config;

/// Skips the check that rejects a main level count the game doesn't expect.
const LOAD_FAILED_JUMP: usize = 0x1fc352;

/// The immediate operand holding the number of main level pages.
const LEVEL_COUNT: usize = 0x1859ae;

/// Gates that keep demon levels locked until enough stars have been collected.
const DEMON_GATE_PAGE: usize = 0x187a1d;
const DEMON_GATE_PLAY: usize = 0x188ce1;

/// Something that can have bytes written into it at an address.
pub trait PatchTarget {
    /// Overwrites the bytes at `address` (an offset from the game's image base).
    fn issue(&mut self, address: usize, bytes: &[u8]) -> eyre::Result<()>;
}

/// A literal byte sequence to be written at an image offset.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Patch {
    pub address: usize,
    pub bytes: Vec<u8>,
    pub purpose: &'static str,
}

impl Patch {
    fn new(address: usize, bytes: &[u8], purpose: &'static str) -> Patch {
        Patch {
            address,
            bytes: bytes.to_vec(),
            purpose,
        }
    }

    /// Returns true if this patch rewrites code rather than data.
    pub fn is_control_flow(&self) -> bool {
        self.address != LEVEL_COUNT
    }
}

/// Returns the patches needed for `config`, in the order they should be applied.
pub fn plan(config: &Config) -> Vec<Patch> {
    let mut patches = vec![Patch::new(
        LOAD_FAILED_JUMP,
        &[0xe9, 0xaa, 0x00, 0x00, 0x00],
        "skip load failure",
    )];

    // The game always shows one page after the last main level, so the constant counts it too.
    match u8::try_from(config.levels.len() + 1) {
        Ok(page_count) => patches.push(Patch::new(LEVEL_COUNT, &[page_count], "level count")),
        Err(_) => log::error!(
            "{} levels don't fit in the game's level count, leaving it alone",
            config.levels.len()
        ),
    }

    if config.unlock_demons {
        patches.push(Patch::new(
            DEMON_GATE_PAGE,
            &[0xe9, 0xe7, 0x01, 0x00, 0x00],
            "demon page gate",
        ));

        patches.push(Patch::new(
            DEMON_GATE_PLAY,
            &[0xe9, 0x8a, 0x00, 0x00, 0x00, 0x90],
            "demon play gate",
        ));
    }

    patches
}

/// Writes every patch for `config` to `target`. A patch that fails is logged and skipped; there
/// is nothing to roll back to.
pub fn apply(config: &Config, target: &mut dyn PatchTarget) {
    for patch in plan(config) {
        match target.issue(patch.address, &patch.bytes) {
            Ok(()) => log::info!(
                "Patched {} at {:#x} with {:02x?}",
                patch.purpose,
                patch.address,
                patch.bytes
            ),

            Err(err) => log::error!(
                "Failed to patch {} at {:#x}: {err:?}",
                patch.purpose,
                patch.address
            ),
        }
    }
}
