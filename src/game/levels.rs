//! Hooks that make the main level select show the custom levels.

use std::ffi::{c_int, c_void};

use dlopen::symbor::Library;
use eyre::{Result, WrapErr};
use once_cell::sync::OnceCell;

use crate::{call_original, meta::customizer::LevelFields, targets};

/// The C++ standard library the game was built against. Strings handed to the game must be
/// built by its `std::string`, which has its own rules for large buffers.
const RUNTIME_LIBRARY: &str = "MSVCP120.dll";

/// `std::basic_string<char>::assign(const char *, size_t)`
const ASSIGN_SYMBOL: &str =
    "?assign@?$basic_string@DU?$char_traits@D@std@@V?$allocator@D@2@@std@@QAEAAV12@PBDI@Z";

type AssignFn = unsafe extern "thiscall" fn(*mut MsvcString, *const u8, usize) -> *mut MsvcString;

struct Runtime {
    _library: Library,
    assign: AssignFn,
}

impl Runtime {
    fn shared() -> Result<&'static Runtime> {
        static RUNTIME: OnceCell<Runtime> = OnceCell::new();

        RUNTIME.get_or_try_init(|| {
            let library = Library::open(RUNTIME_LIBRARY).wrap_err("Failed to open C++ runtime")?;

            let assign = *unsafe { library.symbol::<AssignFn>(ASSIGN_SYMBOL) }
                .wrap_err("Unable to find std::string::assign in C++ runtime")?;

            Ok(Runtime {
                _library: library,
                assign,
            })
        })
    }
}

/// An x86 MSVC `std::string`. Only ever touched through the runtime's own functions.
#[repr(C)]
pub struct MsvcString {
    _storage: [u8; 16],
    _len: usize,
    _capacity: usize,
}

impl MsvcString {
    /// Replaces the contents of the string using the game's own `std::string::assign`.
    pub unsafe fn assign(&mut self, value: &str) -> Result<()> {
        let runtime = Runtime::shared()?;
        (runtime.assign)(self, value.as_ptr(), value.len());

        Ok(())
    }
}

/// Field offsets within `GJGameLevel`.
mod layout {
    pub const LEVEL_ID_RAND: usize = 0xf0;
    pub const LEVEL_ID_SEED: usize = 0xf4;
    pub const LEVEL_NAME: usize = 0xfc;
    pub const DIFFICULTY: usize = 0x1bc;
    pub const STARS_RAND: usize = 0x2a4;
    pub const STARS_SEED: usize = 0x2a8;
}

/// A `GJGameLevel` owned by the game.
struct GameLevel(*mut u8);

impl GameLevel {
    unsafe fn field<T>(&self, offset: usize) -> *mut T {
        self.0.add(offset).cast()
    }

    /// The level's id, stored as `rand - seed`.
    unsafe fn derived_id(&self) -> i32 {
        let rand = *self.field::<i32>(layout::LEVEL_ID_RAND);
        let seed = *self.field::<i32>(layout::LEVEL_ID_SEED);

        rand.wrapping_sub(seed)
    }

}

// Only built for pointers the game has just handed to a hook.
impl LevelFields for GameLevel {
    fn set_stars(&mut self, rand: i32, seed: i32) {
        unsafe {
            *self.field::<i32>(layout::STARS_RAND) = rand;
            *self.field::<i32>(layout::STARS_SEED) = seed;
        }
    }

    fn set_difficulty(&mut self, difficulty: i32) {
        unsafe { *self.field::<i32>(layout::DIFFICULTY) = difficulty }
    }

    fn set_name(&mut self, name: &str) -> Result<()> {
        unsafe { (*self.field::<MsvcString>(layout::LEVEL_NAME)).assign(name) }
    }
}

extern "thiscall" fn level_select_init(layer: *mut c_void, page: c_int) -> bool {
    super::customizer().enter_browsing();
    call_original!(targets::level_select_init, layer, page).unwrap_or(false)
}

extern "thiscall" fn level_select_back(layer: *mut c_void, sender: *mut c_void) {
    super::customizer().exit_browsing();
    call_original!(targets::level_select_back, layer, sender);
}

extern "thiscall" fn level_page_setup(page: *mut c_void, level: *mut u8) {
    if !level.is_null() {
        let mut game_level = GameLevel(level);
        let id = unsafe { game_level.derived_id() };

        if let Some(replacement) = super::customizer().level_override(id) {
            if let Err(err) = replacement.write_to(&mut game_level) {
                log::error!("Unable to customize level page: {err:?}");
            }
        }
    }

    call_original!(targets::level_page_setup, page, level);
}

extern "fastcall" fn get_audio_file_name(out: *mut MsvcString, id: c_int) -> *mut MsvcString {
    // Without the original, `out` was never constructed and can't be assigned to.
    let Some(ret) = call_original!(targets::get_audio_file_name, out, id) else {
        return out;
    };

    if out.is_null() {
        return ret;
    }

    if let Some(song) = super::customizer().audio_track(id) {
        if let Err(err) = unsafe { (*out).assign(song) } {
            log::error!("Unable to replace song for level {id}: {err:?}");
        }
    }

    ret
}

pub fn init() {
    let results = [
        targets::level_select_init::install(level_select_init),
        targets::level_select_back::install(level_select_back),
        targets::level_page_setup::install(level_page_setup),
        targets::get_audio_file_name::install(get_audio_file_name),
    ];

    for result in results {
        if let Err(err) = result {
            log::error!("{err:?}");
        }
    }
}
