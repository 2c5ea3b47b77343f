//! Raw bindings for the `D3DCompile` shader compiler ABI
//!
//! This crate declares the C layouts the native compiler speaks (shader
//! macros, blobs, the include sentinel) and loads a library exporting the
//! entry points at runtime: `d3dcompiler_47.dll` on Windows, or any
//! ABI-compatible implementation such as vkd3d-utils elsewhere.
//!
//! Nothing here is safe to call directly; see the `fxcrs` crate for the
//! safe API.

#![allow(non_snake_case)]
#![allow(non_camel_case_types)]

mod loader;

use fxc_proc::{com_interface, native_exports};
use std::ffi::{c_char, c_void};
use thiserror::Error;

pub use loader::{
    D3DCompiler, DEFAULT_LIBRARY_NAME, LIBRARY_ENV, LibraryConfig, SHA1_ENV, sha1_hex,
};

#[derive(Error, Debug)]
pub enum D3DCompilerError {
    #[error("Failed to load shader compiler library: {0}")]
    LoadError(String),
    #[error("Function not found: {0}")]
    FunctionNotFound(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Checksum mismatch for {path}: expected {expected}, found {found}")]
    ChecksumMismatch {
        path: String,
        expected: String,
        found: String,
    },
    #[error("No {name} file to verify; give an explicit library path to pin its checksum")]
    PinnedLibraryNotFound { name: String },
    #[error("Shader compiler unavailable: {0}")]
    Unavailable(String),
}

pub type Result<T> = std::result::Result<T, D3DCompilerError>;

// D3D Compiler types
pub type HRESULT = i32;
pub type UINT = u32;
pub type SIZE_T = usize;
pub type LPCSTR = *const c_char;
pub type LPVOID = *mut c_void;

pub const S_OK: HRESULT = 0;
pub const E_FAIL: HRESULT = 0x80004005u32 as i32;

// D3D_SHADER_MACRO
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct D3D_SHADER_MACRO {
    pub Name: LPCSTR,
    pub Definition: LPCSTR,
}

com_interface! {
    /// `ID3DBlob`: a reference-counted buffer returned by the compiler.
    ID3DBlob {
        vtable: ID3DBlobVtbl,
        fn QueryInterface(riid: *const c_void, ppv: *mut *mut c_void) -> HRESULT;
        fn AddRef() -> u32;
        fn Release() -> u32;
        fn GetBufferPointer() -> LPVOID;
        fn GetBufferSize() -> SIZE_T;
    }
}

com_interface! {
    /// `ID3DInclude`: include resolution callbacks.
    ///
    /// Only the layout is declared; callers pass the
    /// [`D3D_COMPILE_STANDARD_FILE_INCLUDE`] sentinel instead of a real object.
    ID3DInclude {
        vtable: ID3DIncludeVtbl,
        fn Open(
            IncludeType: u32,
            pFileName: LPCSTR,
            pParentData: *const c_void,
            ppData: *mut *const c_void,
            pBytes: *mut UINT
        ) -> HRESULT;
        fn Close(pData: *const c_void) -> HRESULT;
    }
}

/// `D3D_COMPILE_STANDARD_FILE_INCLUDE`: asks the compiler to resolve
/// `#include` directives itself, relative to the current working directory.
///
/// This is not a valid object pointer and must never be dereferenced.
pub const D3D_COMPILE_STANDARD_FILE_INCLUDE: *mut ID3DInclude = 1 as *mut ID3DInclude;

native_exports! {
    /// Entry points resolved from the loaded compiler library.
    pub struct D3DCompilerFns {
        fn D3DCompile(
            pSrcData: *const c_void,
            SrcDataSize: SIZE_T,
            pSourceName: LPCSTR,
            pDefines: *const D3D_SHADER_MACRO,
            pInclude: *mut ID3DInclude,
            pEntrypoint: LPCSTR,
            pTarget: LPCSTR,
            Flags1: UINT,
            Flags2: UINT,
            ppCode: *mut *mut ID3DBlob,
            ppErrorMsgs: *mut *mut ID3DBlob
        ) -> HRESULT;

        fn D3DPreprocess(
            pSrcData: *const c_void,
            SrcDataSize: SIZE_T,
            pSourceName: LPCSTR,
            pDefines: *const D3D_SHADER_MACRO,
            pInclude: *mut ID3DInclude,
            ppCodeText: *mut *mut ID3DBlob,
            ppErrorMsgs: *mut *mut ID3DBlob
        ) -> HRESULT;

        fn D3DDisassemble(
            pSrcData: *const c_void,
            SrcDataSize: SIZE_T,
            Flags: UINT,
            szComments: LPCSTR,
            ppDisassembly: *mut *mut ID3DBlob
        ) -> HRESULT;
    }
}
