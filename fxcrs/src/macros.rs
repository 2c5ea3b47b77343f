//! Preprocessor macros and the native macro table

use crate::{Error, Result};
use fxc_sys::{D3D_SHADER_MACRO, LPCSTR};
use std::ffi::c_void;
use std::mem::size_of;
use std::ptr;

/// A preprocessor macro definition
///
/// Order and duplicates are preserved when macros are handed to the
/// compiler.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ShaderMacro {
    name: String,
    definition: String,
}

impl ShaderMacro {
    /// Creates a new preprocessor macro
    ///
    /// # Example
    /// ```
    /// use fxcrs::ShaderMacro;
    /// let define = ShaderMacro::new("DEBUG", "1");
    /// assert_eq!(define.name(), "DEBUG");
    /// ```
    pub fn new(name: impl Into<String>, definition: impl Into<String>) -> Self {
        ShaderMacro {
            name: name.into(),
            definition: definition.into(),
        }
    }

    /// Creates a macro with an empty definition
    pub fn flag(name: impl Into<String>) -> Self {
        Self::new(name, "")
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn definition(&self) -> &str {
        &self.definition
    }

    fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(Error::InvalidArgument(
                "macro name must not be empty".to_string(),
            ));
        }
        if self.name.contains('\0') {
            return Err(Error::InvalidArgument(format!(
                "macro name {:?} contains a NUL byte",
                self.name
            )));
        }
        if self.definition.contains('\0') {
            return Err(Error::InvalidArgument(format!(
                "definition of macro {:?} contains a NUL byte",
                self.name
            )));
        }
        Ok(())
    }
}

impl<N: Into<String>, D: Into<String>> From<(N, D)> for ShaderMacro {
    fn from((name, definition): (N, D)) -> Self {
        Self::new(name, definition)
    }
}

/// Natively allocated `D3D_SHADER_MACRO` array.
///
/// Holds `2N + 2` pointer slots for `N` macros: name/definition pairs in
/// input order followed by two null slots. Every string and the slot array
/// itself are freed exactly once on drop, including after a partial build.
pub(crate) struct MacroTable {
    slots: *mut LPCSTR,
    len: usize,
}

impl MacroTable {
    /// Builds the table, or returns `None` for an empty macro list so the
    /// compiler receives a null pointer.
    pub(crate) fn build(macros: &[ShaderMacro]) -> Result<Option<Self>> {
        if macros.is_empty() {
            return Ok(None);
        }
        for m in macros {
            m.validate()?;
        }

        let len = 2 * macros.len() + 2;
        let slots = alloc_slots(len)?;
        let mut table = MacroTable { slots, len };

        // An early return drops `table`, which frees whatever was filled in
        for (i, m) in macros.iter().enumerate() {
            table.set(2 * i, &m.name)?;
            table.set(2 * i + 1, &m.definition)?;
        }

        Ok(Some(table))
    }

    fn set(&mut self, index: usize, text: &str) -> Result<()> {
        debug_assert!(index < self.len - 2, "sentinel slots stay null");
        let copy = alloc_cstr(text)?;
        // SAFETY: index is within the calloc'd slot array
        unsafe { *self.slots.add(index) = copy };
        Ok(())
    }

    /// Pointer suitable for the `pDefines` parameter.
    pub(crate) fn as_ptr(&self) -> *const D3D_SHADER_MACRO {
        self.slots as *const D3D_SHADER_MACRO
    }

    /// Number of macros in the table.
    pub(crate) fn macro_count(&self) -> usize {
        (self.len - 2) / 2
    }

    /// Raw view of all `2N + 2` slots.
    #[cfg(test)]
    pub(crate) fn slots(&self) -> &[LPCSTR] {
        // SAFETY: slots points to len initialised pointers owned by self
        unsafe { std::slice::from_raw_parts(self.slots, self.len) }
    }
}

impl Drop for MacroTable {
    fn drop(&mut self) {
        // SAFETY: every non-null slot came from alloc_cstr and is freed once;
        // the array itself came from alloc_slots.
        unsafe {
            for i in 0..self.len {
                let entry = *self.slots.add(i);
                if !entry.is_null() {
                    free_native(entry as *mut c_void);
                }
            }
            free_native(self.slots as *mut c_void);
        }
    }
}

fn alloc_slots(len: usize) -> Result<*mut LPCSTR> {
    #[cfg(test)]
    ledger::maybe_fail()?;

    // SAFETY: calloc zeroes the array, which makes every slot a null pointer
    let slots = unsafe { libc::calloc(len, size_of::<LPCSTR>()) } as *mut LPCSTR;
    if slots.is_null() {
        return Err(Error::OutOfMemory);
    }

    #[cfg(test)]
    ledger::allocated(slots as *mut c_void);
    Ok(slots)
}

fn alloc_cstr(text: &str) -> Result<LPCSTR> {
    #[cfg(test)]
    ledger::maybe_fail()?;

    let bytes = encode_ascii(text);
    // SAFETY: the buffer is len + 1 bytes, filled and terminated below
    let copy = unsafe { libc::malloc(bytes.len() + 1) } as *mut u8;
    if copy.is_null() {
        return Err(Error::OutOfMemory);
    }
    unsafe {
        ptr::copy_nonoverlapping(bytes.as_ptr(), copy, bytes.len());
        *copy.add(bytes.len()) = 0;
    }

    #[cfg(test)]
    ledger::allocated(copy as *mut c_void);
    Ok(copy as LPCSTR)
}

/// One byte per char; chars outside ASCII become `?`.
fn encode_ascii(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| if c.is_ascii() { c as u8 } else { b'?' })
        .collect()
}

unsafe fn free_native(allocation: *mut c_void) {
    #[cfg(test)]
    ledger::freed(allocation);

    unsafe { libc::free(allocation) }
}
