//! The native entry points the safe API drives

use crate::Result;
use fxc_sys::{D3D_SHADER_MACRO, D3DCompiler, HRESULT, ID3DBlob, ID3DInclude, LPCSTR, SIZE_T, UINT};
use std::ffi::c_void;

/// A provider of the `D3DCompile`-family entry points.
///
/// The builders in this crate never call the native library directly; they
/// go through a `Backend`. [`D3DCompiler`] is the real implementation, loaded
/// on demand by [`default_backend`]. Tests substitute their own.
///
/// Calls are synchronous. Concurrent calls from several threads are only as
/// safe as the implementation behind the backend; the native compiler is
/// assumed to be reentrant.
///
/// # Safety
/// Implementations must follow the native contract: out-parameters are
/// either left null or receive a blob carrying one reference that the caller
/// now owns, and blob buffers stay valid until that reference is released.
pub unsafe trait Backend: Send + Sync {
    /// `D3DCompile`
    ///
    /// # Safety
    /// All pointers must satisfy the native parameter contract.
    #[allow(clippy::too_many_arguments)]
    unsafe fn d3d_compile(
        &self,
        src_data: *const c_void,
        src_data_size: SIZE_T,
        source_name: LPCSTR,
        defines: *const D3D_SHADER_MACRO,
        include: *mut ID3DInclude,
        entry_point: LPCSTR,
        target: LPCSTR,
        flags1: UINT,
        flags2: UINT,
        code: *mut *mut ID3DBlob,
        error_msgs: *mut *mut ID3DBlob,
    ) -> HRESULT;

    /// `D3DPreprocess`
    ///
    /// # Safety
    /// All pointers must satisfy the native parameter contract.
    #[allow(clippy::too_many_arguments)]
    unsafe fn d3d_preprocess(
        &self,
        src_data: *const c_void,
        src_data_size: SIZE_T,
        source_name: LPCSTR,
        defines: *const D3D_SHADER_MACRO,
        include: *mut ID3DInclude,
        code_text: *mut *mut ID3DBlob,
        error_msgs: *mut *mut ID3DBlob,
    ) -> HRESULT;

    /// `D3DDisassemble`
    ///
    /// # Safety
    /// All pointers must satisfy the native parameter contract.
    unsafe fn d3d_disassemble(
        &self,
        src_data: *const c_void,
        src_data_size: SIZE_T,
        flags: UINT,
        comments: LPCSTR,
        disassembly: *mut *mut ID3DBlob,
    ) -> HRESULT;
}

unsafe impl Backend for D3DCompiler {
    unsafe fn d3d_compile(
        &self,
        src_data: *const c_void,
        src_data_size: SIZE_T,
        source_name: LPCSTR,
        defines: *const D3D_SHADER_MACRO,
        include: *mut ID3DInclude,
        entry_point: LPCSTR,
        target: LPCSTR,
        flags1: UINT,
        flags2: UINT,
        code: *mut *mut ID3DBlob,
        error_msgs: *mut *mut ID3DBlob,
    ) -> HRESULT {
        unsafe {
            (self.fns().d3d_compile)(
                src_data,
                src_data_size,
                source_name,
                defines,
                include,
                entry_point,
                target,
                flags1,
                flags2,
                code,
                error_msgs,
            )
        }
    }

    unsafe fn d3d_preprocess(
        &self,
        src_data: *const c_void,
        src_data_size: SIZE_T,
        source_name: LPCSTR,
        defines: *const D3D_SHADER_MACRO,
        include: *mut ID3DInclude,
        code_text: *mut *mut ID3DBlob,
        error_msgs: *mut *mut ID3DBlob,
    ) -> HRESULT {
        unsafe {
            (self.fns().d3d_preprocess)(
                src_data,
                src_data_size,
                source_name,
                defines,
                include,
                code_text,
                error_msgs,
            )
        }
    }

    unsafe fn d3d_disassemble(
        &self,
        src_data: *const c_void,
        src_data_size: SIZE_T,
        flags: UINT,
        comments: LPCSTR,
        disassembly: *mut *mut ID3DBlob,
    ) -> HRESULT {
        unsafe {
            (self.fns().d3d_disassemble)(src_data, src_data_size, flags, comments, disassembly)
        }
    }
}

/// The process-wide compiler library, loaded from the environment on first
/// use (see [`fxc_sys::LibraryConfig::from_env`]).
pub fn default_backend() -> Result<&'static D3DCompiler> {
    Ok(D3DCompiler::global()?)
}

pub(crate) fn resolve<'a>(backend: Option<&'a dyn Backend>) -> Result<&'a dyn Backend> {
    match backend {
        Some(backend) => Ok(backend),
        None => Ok(default_backend()?),
    }
}
