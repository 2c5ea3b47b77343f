//! RAII wrapper for ID3DBlob

use crate::{Error, Result};
use fxc_sys::ID3DBlob;
use std::ptr::NonNull;
use std::slice;

/// Owning handle to a blob returned by the compiler.
///
/// Holds exactly one reference, released on drop. The handle is move-only
/// and never leaves this crate: callers only ever see the copied bytes.
pub(crate) struct Blob {
    ptr: NonNull<ID3DBlob>,
}

impl Blob {
    /// Takes ownership of a blob pointer, or returns `None` for null.
    ///
    /// # Safety
    /// The pointer must be a valid ID3DBlob pointer or null.
    /// Takes ownership of the reference count (does not AddRef).
    pub(crate) unsafe fn from_raw(ptr: *mut ID3DBlob) -> Option<Self> {
        NonNull::new(ptr).map(|ptr| Blob { ptr })
    }

    /// Returns the size the blob reports, in bytes.
    pub(crate) fn len(&self) -> usize {
        unsafe { ID3DBlob::get_buffer_size(self.ptr.as_ptr()) }
    }

    /// Copies the blob's contents into an owned buffer.
    ///
    /// A blob that reports a size but has no buffer, or a size no allocation
    /// can have, is an internal consistency error rather than a short read.
    pub(crate) fn read_all_bytes(&self) -> Result<Vec<u8>> {
        let (data, size) = unsafe {
            let this = self.ptr.as_ptr();
            (
                ID3DBlob::get_buffer_pointer(this) as *const u8,
                ID3DBlob::get_buffer_size(this),
            )
        };

        if size == 0 {
            return Ok(Vec::new());
        }
        if data.is_null() {
            return Err(Error::InternalConsistency(format!(
                "blob reports {} bytes but has no buffer",
                size
            )));
        }
        if size > isize::MAX as usize {
            return Err(Error::InternalConsistency(format!(
                "blob reports an impossible size of {} bytes",
                size
            )));
        }

        // SAFETY: the blob owns `size` readable bytes at `data` while we hold it
        Ok(unsafe { slice::from_raw_parts(data, size) }.to_vec())
    }

    /// Copies the contents out and releases the blob.
    pub(crate) fn into_bytes(self) -> Result<Vec<u8>> {
        self.read_all_bytes()
    }

    /// Copies the contents out as text and releases the blob.
    pub(crate) fn into_text(self) -> Result<String> {
        self.into_bytes().map(|bytes| decode_text(&bytes))
    }
}

impl Drop for Blob {
    fn drop(&mut self) {
        unsafe {
            ID3DBlob::release(self.ptr.as_ptr());
        }
    }
}

impl std::fmt::Debug for Blob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Blob")
            .field("len", &self.len())
            .field("ptr", &self.ptr)
            .finish()
    }
}

/// Decodes compiler text output as ASCII.
///
/// Trailing NULs are trimmed. Each remaining byte becomes one char; bytes
/// above 0x7F become `?`.
pub(crate) fn decode_text(bytes: &[u8]) -> String {
    let trimmed = bytes
        .iter()
        .rposition(|&b| b != 0)
        .map(|i| &bytes[..=i])
        .unwrap_or(&[]);
    trimmed
        .iter()
        .map(|&b| if b.is_ascii() { b as char } else { '?' })
        .collect()
}
