//! Ownership contract for strings that cross the shell/engine boundary.
//!
//! The two sides may link different runtimes with incompatible heaps, so a
//! buffer is only ever freed by the side that allocated it. A
//! [`CrossBoundaryBuffer`] carries a handle to its allocator's deallocation
//! function and frees through it exactly once, when the buffer is dropped.
//! Consumers copy out what they need before letting the buffer go.

use std::ffi::{c_char, CStr, CString};
use std::fmt;
use std::ptr::NonNull;
use std::sync::Arc;

use tether_common::BridgeError;

/// Which side of the boundary owns a heap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Shell,
    Engine,
}

/// The deallocation half of a heap, supplied by the side that allocated.
pub trait Deallocate: Send + Sync {
    fn side(&self) -> Side;

    /// Release a NUL-terminated buffer.
    ///
    /// # Safety
    /// `ptr` must have been allocated by this heap and not freed yet.
    unsafe fn free(&self, ptr: NonNull<c_char>);
}

/// A heap this process can allocate cross-boundary strings from.
pub trait Allocate: Deallocate {
    /// Copy `text` into a fresh NUL-terminated buffer on this heap.
    fn allocate(&self, text: &str) -> Result<NonNull<c_char>, BridgeError>;
}

/// The shell's own heap (the Rust global allocator via `CString`).
#[derive(Debug, Default, Clone, Copy)]
pub struct ShellHeap;

impl Deallocate for ShellHeap {
    fn side(&self) -> Side {
        Side::Shell
    }

    unsafe fn free(&self, ptr: NonNull<c_char>) {
        drop(CString::from_raw(ptr.as_ptr()));
    }
}

impl Allocate for ShellHeap {
    fn allocate(&self, text: &str) -> Result<NonNull<c_char>, BridgeError> {
        let owned = CString::new(text).map_err(|_| BridgeError::NulByte)?;
        // CString::into_raw never returns null
        NonNull::new(owned.into_raw()).ok_or(BridgeError::NulByte)
    }
}

/// Deallocation function exported by a foreign engine.
pub type ForeignFreeFn = unsafe extern "C" fn(*mut c_char);

/// The engine's heap, reachable only through the free function it supplied.
#[derive(Clone, Copy)]
pub struct ForeignHeap {
    free: ForeignFreeFn,
}

impl ForeignHeap {
    pub fn new(free: ForeignFreeFn) -> Self {
        Self { free }
    }
}

impl fmt::Debug for ForeignHeap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForeignHeap").finish_non_exhaustive()
    }
}

impl Deallocate for ForeignHeap {
    fn side(&self) -> Side {
        Side::Engine
    }

    unsafe fn free(&self, ptr: NonNull<c_char>) {
        (self.free)(ptr.as_ptr());
    }
}

/// An owned NUL-terminated string living on one side's heap.
///
/// Moving the buffer moves ownership; dropping it frees through the
/// allocating heap. [`into_raw`](Self::into_raw) hands ownership across the
/// boundary without freeing.
pub struct CrossBoundaryBuffer {
    ptr: NonNull<c_char>,
    len: usize,
    heap: Arc<dyn Deallocate>,
}

// The buffer is uniquely owned and the heap handle is Send + Sync.
unsafe impl Send for CrossBoundaryBuffer {}

impl CrossBoundaryBuffer {
    /// Allocate a copy of `text` on `heap`.
    pub fn allocate<A: Allocate + 'static>(heap: Arc<A>, text: &str) -> Result<Self, BridgeError> {
        let ptr = heap.allocate(text)?;
        Ok(Self {
            ptr,
            len: text.len(),
            heap,
        })
    }

    /// Take ownership of a buffer received from the other side.
    ///
    /// Returns `None` for a null pointer.
    ///
    /// # Safety
    /// `ptr` must be a NUL-terminated buffer allocated by `heap`, and the
    /// caller must not use or free it afterwards.
    pub unsafe fn from_raw(ptr: *mut c_char, heap: Arc<dyn Deallocate>) -> Option<Self> {
        let ptr = NonNull::new(ptr)?;
        let len = CStr::from_ptr(ptr.as_ptr()).to_bytes().len();
        Some(Self { ptr, len, heap })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Side whose heap this buffer lives on.
    pub fn owner(&self) -> Side {
        self.heap.side()
    }

    /// Borrow the buffer for a call across the boundary. The pointer is
    /// valid until `self` is dropped.
    pub fn as_ptr(&self) -> *const c_char {
        self.ptr.as_ptr()
    }

    pub fn as_bytes(&self) -> &[u8] {
        // SAFETY: ptr is valid for len bytes for as long as self is alive.
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr().cast::<u8>(), self.len) }
    }

    pub fn to_str(&self) -> Result<&str, BridgeError> {
        std::str::from_utf8(self.as_bytes()).map_err(|e| BridgeError::InvalidUtf8(e.to_string()))
    }

    /// Copy the contents out and free the buffer through its owner.
    pub fn into_string(self) -> Result<String, BridgeError> {
        let text = self.to_str()?.to_owned();
        Ok(text)
    }

    /// Give up ownership without freeing. The receiver of the pointer must
    /// return it to this buffer's heap.
    pub fn into_raw(self) -> *mut c_char {
        let ptr = self.ptr.as_ptr();
        std::mem::forget(self);
        ptr
    }
}

impl Drop for CrossBoundaryBuffer {
    fn drop(&mut self) {
        // SAFETY: we own ptr and it came from self.heap.
        unsafe { self.heap.free(self.ptr) }
    }
}

impl fmt::Debug for CrossBoundaryBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CrossBoundaryBuffer")
            .field("len", &self.len)
            .field("owner", &self.owner())
            .finish()
    }
}
