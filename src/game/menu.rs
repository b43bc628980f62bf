//! Tells the user on the main menu when their level document couldn't be used.

use eyre::Result;

use super::cocos::{self, CCNode};
use crate::{call_original, meta::config::LoadError, meta::label::ErrorLabel, targets};

unsafe fn show_error(layer: *mut CCNode, error: LoadError) -> Result<()> {
    let label = ErrorLabel::new(error, cocos::window_size()?);
    cocos::add_label(layer, &label)
}

extern "thiscall" fn menu_layer_init(layer: *mut CCNode) -> bool {
    if !call_original!(targets::menu_layer_init, layer).unwrap_or(false) {
        return false;
    }

    // The first menu is also where the level document gets loaded.
    if let Some(error) = super::customizer().load_error() {
        if let Err(err) = unsafe { show_error(layer, error) } {
            log::error!("Unable to show load error on the menu: {err:?}");
        }
    }

    true
}

pub fn init() {
    if let Err(err) = targets::menu_layer_init::install(menu_layer_init) {
        log::error!("{err:?}");
    }
}
