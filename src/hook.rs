//! Handles finding a hooking library, and provides types and macros for using the library
//! to hook game code.

use once_cell::sync::OnceCell;

#[cfg(all(windows, target_arch = "x86"))]
use {
    cached::proc_macro::cached,
    dlopen::symbor::Library,
    eyre::{eyre, Result, WrapErr},
    std::{ffi::c_void, ptr},
    windows::{core::PCWSTR, Win32::System::LibraryLoader::GetModuleHandleW},
};

/// MinHook is shipped next to the game by most mod loaders.
#[cfg(all(windows, target_arch = "x86"))]
const HOOK_LIBRARY: &str = "MinHook.x86.dll";

#[cfg(all(windows, target_arch = "x86"))]
const MH_OK: i32 = 0;
#[cfg(all(windows, target_arch = "x86"))]
const MH_ERROR_ALREADY_INITIALIZED: i32 = 1;

#[cfg(all(windows, target_arch = "x86"))]
type InitializeFn = unsafe extern "system" fn() -> i32;
#[cfg(all(windows, target_arch = "x86"))]
type CreateHookFn =
    unsafe extern "system" fn(target: *mut c_void, detour: *mut c_void, original: *mut *mut c_void) -> i32;
#[cfg(all(windows, target_arch = "x86"))]
type EnableHookFn = unsafe extern "system" fn(target: *mut c_void) -> i32;

#[cfg(all(windows, target_arch = "x86"))]
struct MinHook {
    // The functions below point into this library, so it has to stay loaded.
    _library: Library,
    initialize: InitializeFn,
    create_hook: CreateHookFn,
    enable_hook: EnableHookFn,
}

#[cfg(all(windows, target_arch = "x86"))]
impl MinHook {
    fn load() -> Result<MinHook> {
        let library = Library::open(HOOK_LIBRARY).wrap_err("Failed to open hooking library")?;

        fn symbol<T: Copy>(library: &Library, name: &str) -> Result<T> {
            let symbol = unsafe { library.symbol::<T>(name) }
                .wrap_err_with(|| format!("Unable to find {name} in hooking library"))?;
            Ok(*symbol)
        }

        Ok(MinHook {
            initialize: symbol(&library, "MH_Initialize")?,
            create_hook: symbol(&library, "MH_CreateHook")?,
            enable_hook: symbol(&library, "MH_EnableHook")?,
            _library: library,
        })
    }

    fn shared() -> Result<&'static MinHook> {
        static MINHOOK: OnceCell<MinHook> = OnceCell::new();
        MINHOOK.get_or_try_init(MinHook::load)
    }
}

#[cfg(all(windows, target_arch = "x86"))]
fn check(status: i32, action: &str) -> Result<()> {
    if status == MH_OK {
        Ok(())
    } else {
        Err(eyre!("{action} failed with MinHook status {status}"))
    }
}

/// Loads and initialises the hooking library. Hooks can't be installed until this has succeeded.
#[cfg(all(windows, target_arch = "x86"))]
pub fn init() -> Result<()> {
    let minhook = MinHook::shared()?;

    match unsafe { (minhook.initialize)() } {
        MH_OK | MH_ERROR_ALREADY_INITIALIZED => Ok(()),
        status => check(status, "MH_Initialize"),
    }
}

/// Returns the address that the game's executable was loaded at.
#[cfg(all(windows, target_arch = "x86"))]
#[cached(result = true)]
pub fn image_base() -> Result<usize> {
    let module = unsafe { GetModuleHandleW(PCWSTR::null()) }
        .wrap_err("Unable to find the game's module handle")?;

    Ok(module.0 as usize)
}

/// Returns `offset` relative to the game's image base as a pointer.
#[cfg(all(windows, target_arch = "x86"))]
pub fn slide<T>(offset: usize) -> Result<*mut T> {
    Ok((image_base()? + offset) as *mut T)
}

pub struct Hook<FnType> {
    name: &'static str,
    address: usize,
    original_fn: OnceCell<FnType>,
}

impl<FnType: Copy> Hook<FnType> {
    /// Creates a new hook for a function at an offset from the image base. This does not
    /// install the hook.
    pub const fn new(name: &'static str, address: usize) -> Hook<FnType> {
        Hook {
            name,
            address,
            original_fn: OnceCell::new(),
        }
    }

    /// Returns a pointer to the original implementation of the hooked function, or `None` if
    /// the hook hasn't been installed.
    pub fn original(&self) -> Option<FnType> {
        let original = self.original_fn.get().copied();

        if original.is_none() {
            log::error!("{} was called through a hook that isn't installed", self.name);
        }

        original
    }
}

#[cfg(all(windows, target_arch = "x86"))]
impl<FnType: Copy> Hook<FnType> {
    /// Replaces the target function's implementation with that of the function given. The
    /// original function pointer can be obtained by calling `original()`.
    pub fn install(&self, replacement: FnType) -> Result<()> {
        let minhook = MinHook::shared()?;
        let target = slide::<c_void>(self.address)?;

        let mut original: *mut c_void = ptr::null_mut();

        unsafe {
            let detour: *mut c_void = std::mem::transmute_copy(&replacement);

            check(
                (minhook.create_hook)(target, detour, &mut original),
                "MH_CreateHook",
            )
            .wrap_err_with(|| format!("Unable to hook {}", self.name))?;

            // The original has to be reachable before the first call can arrive.
            self.original_fn
                .set(std::mem::transmute_copy(&original))
                .map_err(|_| eyre!("{} was hooked twice", self.name))?;

            check((minhook.enable_hook)(target), "MH_EnableHook")
                .wrap_err_with(|| format!("Unable to enable hook on {}", self.name))?;
        }

        log::info!("Hooked {} at {:#x}", self.name, self.address);

        Ok(())
    }
}

#[macro_export]
macro_rules! create_target {
    ($name:ident, $addr:literal, $sig:ty) => {
        #[allow(dead_code)]
        pub mod $name {
            #[allow(unused_imports)]
            use super::*;

            pub static HOOK: $crate::hook::Hook<$sig> =
                $crate::hook::Hook::new(stringify!($name), $addr);

            pub fn install(replacement: $sig) -> eyre::Result<()> {
                HOOK.install(replacement)
            }
        }
    };
}

/// Calls the original implementation behind a hook. Evaluates to `None` if the hook was never
/// installed.
#[macro_export]
macro_rules! call_original {
    ($hook_module:path) => {{
        use $hook_module as base;
        #[allow(unused_unsafe)]
        unsafe { base::HOOK.original().map(|original| original()) }
    }};
    ($hook_module:path, $($args:expr),+) => {{
        // Workaround for $hook_module::x not working - see #48067.
        use $hook_module as base;
        #[allow(unused_unsafe)]
        unsafe { base::HOOK.original().map(|original| original($($args),+)) }
    }}
}

#[cfg(test)]
mod tests {
    use super::Hook;

    mod doubler {
        pub static HOOK: super::Hook<fn(i32) -> i32> = super::Hook::new("doubler", 0x10);
    }

    mod missing {
        pub static HOOK: super::Hook<fn(i32) -> i32> = super::Hook::new("missing", 0x20);
    }

    #[test]
    fn uninstalled_hook_has_no_original() {
        let hook: Hook<fn() -> bool> = Hook::new("menu", 0x1907b0);

        assert!(hook.original().is_none());
        assert_eq!(crate::call_original!(missing, 4), None);
    }

    #[test]
    fn calls_through_to_original() {
        doubler::HOOK.original_fn.set(|value| value * 2).unwrap();

        assert_eq!(crate::call_original!(doubler, 21), Some(42));
    }
}
