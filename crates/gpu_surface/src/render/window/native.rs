//! Native window handles
//!
//! A [`NativeWindow`] is a shared reference to a platform window that the
//! platform owns. The platform may destroy the window at any moment from its UI
//! thread, so holders revalidate the handle before every use instead of
//! trusting that a handle they stored earlier is still alive.

use std::ffi::c_void;
use std::fmt;
use std::os::raw::c_ulong;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use raw_window_handle::{
    AndroidNdkWindowHandle, AppKitWindowHandle, RawWindowHandle, UiKitWindowHandle,
    WaylandWindowHandle, Win32WindowHandle, XlibWindowHandle,
};

use crate::render::context::{SurfaceError, SurfaceResult};
use crate::render::SurfaceSize;

static NEXT_WINDOW_ID: AtomicU64 = AtomicU64::new(1);

/// Platform family a native window handle belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WindowHandleKind {
    /// `ANativeWindow*`
    AndroidNdk,
    /// `wl_surface*`
    Wayland,
    /// X11 window id
    Xlib,
    /// `HWND`
    Win32,
    /// `NSView*`
    AppKit,
    /// `UIView*`
    UiKit,
}

struct WindowInner {
    id: u64,
    kind: WindowHandleKind,
    address: usize,
    valid: AtomicBool,
    size: Mutex<SurfaceSize>,
}

/// Shared handle to a platform window
///
/// Cloning is cheap and every clone observes the same validity flag and
/// geometry. The raw handle is stored as an address so the handle can cross
/// from the UI thread to the render thread.
#[derive(Clone)]
pub struct NativeWindow {
    inner: Arc<WindowInner>,
}

impl NativeWindow {
    fn with_parts(kind: WindowHandleKind, address: usize, size: SurfaceSize) -> Self {
        Self {
            inner: Arc::new(WindowInner {
                id: NEXT_WINDOW_ID.fetch_add(1, Ordering::Relaxed),
                kind,
                address,
                valid: AtomicBool::new(address != 0),
                size: Mutex::new(size),
            }),
        }
    }

    /// Wrap an `ANativeWindow*` address
    pub fn android(address: usize, size: SurfaceSize) -> Self {
        Self::with_parts(WindowHandleKind::AndroidNdk, address, size)
    }

    /// An absent window. Never valid.
    pub fn null() -> Self {
        Self::with_parts(WindowHandleKind::AndroidNdk, 0, SurfaceSize::default())
    }

    /// Wrap a raw window handle from a windowing library
    pub fn from_raw(handle: RawWindowHandle, size: SurfaceSize) -> SurfaceResult<Self> {
        let (kind, address) = match handle {
            RawWindowHandle::AndroidNdk(h) => (WindowHandleKind::AndroidNdk, h.a_native_window as usize),
            RawWindowHandle::Wayland(h) => (WindowHandleKind::Wayland, h.surface as usize),
            RawWindowHandle::Xlib(h) => (WindowHandleKind::Xlib, h.window as usize),
            RawWindowHandle::Win32(h) => (WindowHandleKind::Win32, h.hwnd as usize),
            RawWindowHandle::AppKit(h) => (WindowHandleKind::AppKit, h.ns_view as usize),
            RawWindowHandle::UiKit(h) => (WindowHandleKind::UiKit, h.ui_view as usize),
            other => return Err(SurfaceError::UnsupportedWindowHandle(format!("{other:?}"))),
        };
        Ok(Self::with_parts(kind, address, size))
    }

    /// Rebuild the raw window handle for handing to a platform API
    pub fn raw_window_handle(&self) -> RawWindowHandle {
        let address = self.inner.address;
        match self.inner.kind {
            WindowHandleKind::AndroidNdk => {
                let mut handle = AndroidNdkWindowHandle::empty();
                handle.a_native_window = address as *mut c_void;
                RawWindowHandle::AndroidNdk(handle)
            }
            WindowHandleKind::Wayland => {
                let mut handle = WaylandWindowHandle::empty();
                handle.surface = address as *mut c_void;
                RawWindowHandle::Wayland(handle)
            }
            WindowHandleKind::Xlib => {
                let mut handle = XlibWindowHandle::empty();
                handle.window = address as c_ulong;
                RawWindowHandle::Xlib(handle)
            }
            WindowHandleKind::Win32 => {
                let mut handle = Win32WindowHandle::empty();
                handle.hwnd = address as *mut c_void;
                RawWindowHandle::Win32(handle)
            }
            WindowHandleKind::AppKit => {
                let mut handle = AppKitWindowHandle::empty();
                handle.ns_view = address as *mut c_void;
                RawWindowHandle::AppKit(handle)
            }
            WindowHandleKind::UiKit => {
                let mut handle = UiKitWindowHandle::empty();
                handle.ui_view = address as *mut c_void;
                RawWindowHandle::UiKit(handle)
            }
        }
    }

    /// Process-unique id of this window
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Platform family of the handle
    pub fn kind(&self) -> WindowHandleKind {
        self.inner.kind
    }

    /// Raw handle address
    pub fn address(&self) -> usize {
        self.inner.address
    }

    /// False once the platform destroyed the window, or for a null handle
    pub fn is_valid(&self) -> bool {
        self.inner.valid.load(Ordering::Acquire)
    }

    /// Mark the window destroyed by the platform
    pub fn invalidate(&self) {
        if self.inner.valid.swap(false, Ordering::AcqRel) {
            log::debug!("Native window {} invalidated", self.inner.id);
        }
    }

    /// Current drawable size of the window
    pub fn size(&self) -> SurfaceSize {
        *self.inner.size.lock()
    }

    /// Record a geometry change reported by the platform
    pub fn set_size(&self, size: SurfaceSize) {
        *self.inner.size.lock() = size;
    }

    /// True when both handles refer to the same window
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Number of live references to this window, including this one
    pub fn reference_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }
}

impl PartialEq for NativeWindow {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for NativeWindow {}

impl fmt::Debug for NativeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeWindow")
            .field("id", &self.inner.id)
            .field("kind", &self.inner.kind)
            .field("address", &format_args!("{:#x}", self.inner.address))
            .field("valid", &self.is_valid())
            .field("size", &self.size())
            .finish()
    }
}
