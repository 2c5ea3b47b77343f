//! Error types for fxcrs operations

use std::fmt;
use thiserror::Error;

/// HRESULT status codes returned by the native compiler
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct HResult(pub i32);

impl HResult {
    /// Success
    pub const S_OK: HResult = HResult(0);
    /// Generic failure
    pub const E_FAIL: HResult = HResult(0x80004005u32 as i32);
    /// Invalid argument
    pub const E_INVALIDARG: HResult = HResult(0x80070057u32 as i32);

    /// Returns true only for `S_OK`; every other code is a failure here.
    #[inline]
    pub fn is_ok(&self) -> bool {
        self.0 == 0
    }

    /// Returns the raw HRESULT value
    #[inline]
    pub fn code(&self) -> i32 {
        self.0
    }
}

impl fmt::Debug for HResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HResult(0x{:08x})", self.0 as u32)
    }
}

impl fmt::Display for HResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x}", self.0 as u32)
    }
}

impl From<i32> for HResult {
    fn from(hr: i32) -> Self {
        HResult(hr)
    }
}

fn or_none(diagnostics: &Option<String>) -> &str {
    diagnostics.as_deref().unwrap_or("no diagnostics")
}

/// Error type for fxcrs operations
#[derive(Error, Debug)]
pub enum Error {
    /// A required input was missing, empty or not representable as a C string.
    /// Raised before the native library is touched.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The compiler returned a failure status
    #[error("Compilation failed (HRESULT: {hresult}): {}", or_none(.diagnostics))]
    Compilation {
        /// The HRESULT error code
        hresult: HResult,
        /// Error text from the compiler, absent when it returned no error blob
        diagnostics: Option<String>,
    },

    /// The preprocessor returned a failure status
    #[error("Preprocessing failed (HRESULT: {hresult}): {}", or_none(.diagnostics))]
    Preprocessing {
        /// The HRESULT error code
        hresult: HResult,
        /// Error text from the preprocessor, if any
        diagnostics: Option<String>,
    },

    /// Disassembly failed
    #[error("Disassembly failed (HRESULT: {hresult})")]
    Disassembly {
        /// The HRESULT error code
        hresult: HResult,
    },

    /// The native layer contradicted itself, e.g. reported success without
    /// producing bytecode, or a blob whose size disagrees with its buffer.
    #[error("Internal consistency error: {0}")]
    InternalConsistency(String),

    /// A native allocation failed while building the macro table
    #[error("Out of memory while building the macro table")]
    OutOfMemory,

    /// The compiler library could not be located, verified or loaded
    #[error(transparent)]
    Library(#[from] fxc_sys::D3DCompilerError),
}

impl Error {
    /// Diagnostic text carried by a compilation or preprocessing failure.
    pub fn diagnostics(&self) -> Option<&str> {
        match self {
            Error::Compilation { diagnostics, .. } | Error::Preprocessing { diagnostics, .. } => {
                diagnostics.as_deref()
            }
            _ => None,
        }
    }

    /// Status code of a native failure.
    pub fn hresult(&self) -> Option<HResult> {
        match self {
            Error::Compilation { hresult, .. }
            | Error::Preprocessing { hresult, .. }
            | Error::Disassembly { hresult } => Some(*hresult),
            _ => None,
        }
    }
}

/// Result type for fxcrs operations
pub type Result<T> = std::result::Result<T, Error>;
