//! Code that changes how the game behaves.

pub mod patches;

#[cfg(all(windows, target_arch = "x86"))]
mod cocos;
#[cfg(all(windows, target_arch = "x86"))]
mod levels;
#[cfg(all(windows, target_arch = "x86"))]
mod memory;
#[cfg(all(windows, target_arch = "x86"))]
mod menu;

#[cfg(all(windows, target_arch = "x86"))]
pub use {cocos::CCNode, levels::MsvcString};

#[cfg(all(windows, target_arch = "x86"))]
use crate::meta::{customizer::Customizer, resources};

/// Returns the customizer shared by every hook. The level document is loaded, and the game
/// patched, the first time this is called.
#[cfg(all(windows, target_arch = "x86"))]
fn customizer() -> &'static Customizer {
    static CUSTOMIZER: once_cell::sync::OnceCell<Customizer> = once_cell::sync::OnceCell::new();

    CUSTOMIZER.get_or_init(|| {
        Customizer::initialise(resources::config_path(), &mut memory::ProcessMemory)
    })
}

#[cfg(all(windows, target_arch = "x86"))]
pub fn init() {
    menu::init();
    levels::init();
}
