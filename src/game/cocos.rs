//! The handful of cocos2d-x functions needed to put a label on screen. They're exported by the
//! game's copy of the engine, so they're looked up by their decorated names.

use std::ffi::{c_char, c_void, CString};

use dlopen::symbor::Library;
use eyre::{eyre, Result, WrapErr};
use once_cell::sync::OnceCell;
use vector2d::Vector2D;

use crate::meta::label::ErrorLabel;

const ENGINE_LIBRARY: &str = "libcocos2d.dll";

/// Opaque `cocos2d::CCNode`.
#[repr(C)]
pub struct CCNode {
    _private: [u8; 0],
}

#[repr(C)]
#[derive(Default)]
struct CCSize {
    width: f32,
    height: f32,
}

#[repr(C)]
struct CCPoint {
    x: f32,
    y: f32,
}

#[repr(C)]
struct CcColor3B {
    r: u8,
    g: u8,
    b: u8,
}

struct Cocos {
    _library: Library,
    shared_director: unsafe extern "C" fn() -> *mut c_void,

    // `CCSize` is returned through a hidden pointer which comes after `this`.
    get_win_size: unsafe extern "thiscall" fn(*mut c_void, *mut CCSize) -> *mut CCSize,

    create_label: unsafe extern "C" fn(*const c_char, *const c_char) -> *mut CCNode,
    set_color: unsafe extern "thiscall" fn(*mut CCNode, *const CcColor3B),
    set_scale: unsafe extern "thiscall" fn(*mut CCNode, f32),
    set_position: unsafe extern "thiscall" fn(*mut CCNode, *const CCPoint),
    add_child: unsafe extern "thiscall" fn(*mut CCNode, *mut CCNode),
}

impl Cocos {
    fn load() -> Result<Cocos> {
        let library = Library::open(ENGINE_LIBRARY).wrap_err("Failed to open cocos2d")?;

        fn symbol<T: Copy>(library: &Library, name: &str) -> Result<T> {
            let symbol = unsafe { library.symbol::<T>(name) }
                .wrap_err_with(|| format!("Unable to find {name} in cocos2d"))?;
            Ok(*symbol)
        }

        Ok(Cocos {
            shared_director: symbol(&library, "?sharedDirector@CCDirector@cocos2d@@SAPAV12@XZ")?,
            get_win_size: symbol(&library, "?getWinSize@CCDirector@cocos2d@@QAE?AVCCSize@2@XZ")?,
            create_label: symbol(&library, "?create@CCLabelBMFont@cocos2d@@SAPAV12@PBD0@Z")?,
            set_color: symbol(
                &library,
                "?setColor@CCLabelBMFont@cocos2d@@UAEXABU_ccColor3B@2@@Z",
            )?,
            set_scale: symbol(&library, "?setScale@CCLabelBMFont@cocos2d@@UAEXM@Z")?,
            set_position: symbol(&library, "?setPosition@CCNode@cocos2d@@UAEXABVCCPoint@2@@Z")?,
            add_child: symbol(&library, "?addChild@CCNode@cocos2d@@UAEXPAV12@@Z")?,
            _library: library,
        })
    }

    fn shared() -> Result<&'static Cocos> {
        static COCOS: OnceCell<Cocos> = OnceCell::new();
        COCOS.get_or_try_init(Cocos::load)
    }
}

/// Returns the size of the game window in points.
pub fn window_size() -> Result<Vector2D<f32>> {
    let cocos = Cocos::shared()?;

    let mut size = CCSize::default();

    unsafe {
        let director = (cocos.shared_director)();

        if director.is_null() {
            return Err(eyre!("CCDirector doesn't exist yet"));
        }

        (cocos.get_win_size)(director, &mut size);
    }

    Ok(Vector2D::new(size.width, size.height))
}

/// Creates a bitmap font label matching `label` and adds it to `parent`.
///
/// # Safety
/// `parent` must point to a live `CCNode`.
pub unsafe fn add_label(parent: *mut CCNode, label: &ErrorLabel) -> Result<()> {
    let cocos = Cocos::shared()?;

    let text = CString::new(label.text)?;
    let font = CString::new(label.font)?;

    let node = (cocos.create_label)(text.as_ptr(), font.as_ptr());

    if node.is_null() {
        return Err(eyre!("CCLabelBMFont::create returned null"));
    }

    let (r, g, b) = label.colour;
    (cocos.set_color)(node, &CcColor3B { r, g, b });
    (cocos.set_scale)(node, label.scale);

    (cocos.set_position)(
        node,
        &CCPoint {
            x: label.position.x,
            y: label.position.y,
        },
    );

    (cocos.add_child)(parent, node);

    Ok(())
}
