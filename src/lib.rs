//! Replaces Geometry Dash's main levels with a list read from `Resources/levelCustomizer.json`.

#[cfg_attr(not(all(windows, target_arch = "x86")), allow(dead_code))]
mod hook;

#[cfg_attr(not(all(windows, target_arch = "x86")), allow(dead_code))]
mod logging;

pub mod game;
pub mod meta;

#[cfg(all(windows, target_arch = "x86"))]
mod targets {
    #![allow(clippy::unreadable_literal)]

    use crate::{
        create_target,
        game::{CCNode, MsvcString},
    };
    use std::ffi::{c_int, c_void};

    create_target!(menu_layer_init, 0x1907b0, unsafe extern "thiscall" fn(*mut CCNode) -> bool);

    create_target!(
        level_select_init,
        0x1855a0,
        unsafe extern "thiscall" fn(*mut c_void, c_int) -> bool
    );

    create_target!(
        level_select_back,
        0x1864b0,
        unsafe extern "thiscall" fn(*mut c_void, *mut c_void)
    );

    create_target!(
        level_page_setup,
        0x187220,
        unsafe extern "thiscall" fn(*mut c_void, *mut u8)
    );

    create_target!(
        get_audio_file_name,
        0x189fa0,
        unsafe extern "fastcall" fn(*mut MsvcString, c_int) -> *mut MsvcString
    );
}

#[cfg(all(windows, target_arch = "x86"))]
#[ctor::ctor]
fn load() {
    // Load the logging system before everything else so hook failures are recorded.
    logging::init();

    log::info!("Level customizer {} loaded", env!("CARGO_PKG_VERSION"));

    match hook::image_base() {
        Ok(base) => log::info!("game image base is {base:#x}"),
        Err(err) => log::error!("{err:?}"),
    }

    if let Err(err) = hook::init() {
        log::error!("Unable to load the hooking library, the game will not be modified: {err:?}");
        return;
    }

    game::init();
}
