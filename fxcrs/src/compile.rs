//! Shader compilation API

use crate::backend::{self, Backend};
use crate::blob::Blob;
use crate::macros::MacroTable;
use crate::{
    CompileFlags, CompileOutcome, CompileResult, Error, HResult, Result, ShaderMacro,
};
use fxc_sys::{D3D_COMPILE_STANDARD_FILE_INCLUDE, ID3DBlob};
use log::debug;
use std::ffi::CString;
use std::ptr;

/// Source name reported in diagnostics when none is given.
pub const DEFAULT_SOURCE_NAME: &str = "Unknown";

/// Converts `value` to a C string, rejecting interior NULs.
pub(crate) fn to_cstring(what: &str, value: &str) -> Result<CString> {
    CString::new(value)
        .map_err(|_| Error::InvalidArgument(format!("{} contains a NUL byte", what)))
}

/// Like [`to_cstring`], but also rejects an empty value.
pub(crate) fn required_cstring(what: &str, value: &str) -> Result<CString> {
    if value.is_empty() {
        return Err(Error::InvalidArgument(format!("{} must not be empty", what)));
    }
    to_cstring(what, value)
}

/// Builder for shader compilation with fluent API
///
/// # Example
/// ```no_run
/// use fxcrs::{CompileBuilder, CompileFlags, ShaderTarget};
///
/// let source = "float4 main() : SV_TARGET { return float4(1,0,0,1); }";
///
/// let result = CompileBuilder::new(source, "main", ShaderTarget::Ps5_0)
///     .source_name("my_shader.hlsl")
///     .define("DEBUG", "1")
///     .flags(CompileFlags::DEBUG | CompileFlags::WARNINGS_ARE_ERRORS)
///     .optimization_level(3)
///     .compile()
///     .unwrap();
/// ```
pub struct CompileBuilder<'a> {
    source: &'a [u8],
    source_name: Option<&'a str>,
    entry_point: &'a str,
    target: String,
    macros: Vec<ShaderMacro>,
    flags1: CompileFlags,
    flags2: u32,
    backend: Option<&'a dyn Backend>,
}

impl<'a> CompileBuilder<'a> {
    /// Creates a new compile builder with the required parameters.
    ///
    /// # Arguments
    /// * `source` - The HLSL source code
    /// * `entry_point` - The name of the entry point function (e.g., "main")
    /// * `target` - The target profile, either a [`crate::ShaderTarget`] or
    ///   any profile string the compiler understands
    pub fn new(source: &'a str, entry_point: &'a str, target: impl Into<String>) -> Self {
        Self::from_bytes(source.as_bytes(), entry_point, target)
    }

    /// Creates a compile builder from raw bytes.
    pub fn from_bytes(source: &'a [u8], entry_point: &'a str, target: impl Into<String>) -> Self {
        CompileBuilder {
            source,
            source_name: None,
            entry_point,
            target: target.into(),
            macros: Vec::new(),
            flags1: CompileFlags::empty(),
            flags2: 0,
            backend: None,
        }
    }

    /// Sets the source file name (used in error messages).
    pub fn source_name(mut self, name: &'a str) -> Self {
        self.source_name = Some(name);
        self
    }

    /// Adds a preprocessor macro.
    pub fn define(mut self, name: &str, value: &str) -> Self {
        self.macros.push(ShaderMacro::new(name, value));
        self
    }

    /// Adds a preprocessor macro with an empty definition.
    pub fn define_flag(mut self, name: &str) -> Self {
        self.macros.push(ShaderMacro::flag(name));
        self
    }

    /// Adds multiple preprocessor macros from an iterator.
    pub fn defines<I, M>(mut self, macros: I) -> Self
    where
        I: IntoIterator<Item = M>,
        M: Into<ShaderMacro>,
    {
        self.macros.extend(macros.into_iter().map(Into::into));
        self
    }

    /// Adds a pre-built macro.
    pub fn with_macro(mut self, shader_macro: ShaderMacro) -> Self {
        self.macros.push(shader_macro);
        self
    }

    /// Sets compilation flags (replaces any existing flags).
    pub fn flags(mut self, flags: CompileFlags) -> Self {
        self.flags1 = flags;
        self
    }

    /// Adds compilation flags (bitwise OR with existing).
    pub fn with_flags(mut self, flags: CompileFlags) -> Self {
        self.flags1 |= flags;
        self
    }

    /// Enables debug mode (D3DCOMPILE_DEBUG).
    pub fn debug(self) -> Self {
        self.with_flags(CompileFlags::DEBUG)
    }

    /// Skips optimization (D3DCOMPILE_SKIP_OPTIMIZATION).
    pub fn skip_optimization(self) -> Self {
        self.with_flags(CompileFlags::SKIP_OPTIMIZATION)
    }

    /// Treats warnings as errors.
    pub fn warnings_are_errors(self) -> Self {
        self.with_flags(CompileFlags::WARNINGS_ARE_ERRORS)
    }

    /// Sets the optimization level (0-3).
    pub fn optimization_level(mut self, level: u32) -> Self {
        self.flags1 = self.flags1.with_optimization_level(level);
        self
    }

    /// Sets the matrix packing order to row-major.
    pub fn row_major_matrices(self) -> Self {
        self.with_flags(CompileFlags::PACK_MATRIX_ROW_MAJOR)
    }

    /// Sets the matrix packing order to column-major.
    pub fn column_major_matrices(self) -> Self {
        self.with_flags(CompileFlags::PACK_MATRIX_COLUMN_MAJOR)
    }

    /// Sets secondary (effect) flags, the `Flags2` parameter.
    pub fn flags2(mut self, flags: u32) -> Self {
        self.flags2 = flags;
        self
    }

    /// Compiles through `backend` instead of the process-wide library.
    pub fn with_backend(mut self, backend: &'a dyn Backend) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Compiles the shader.
    ///
    /// Returns the compiled bytecode and any warning messages; a failure
    /// status is raised as [`Error::Compilation`].
    pub fn compile(self) -> Result<CompileResult> {
        self.outcome()?.into_result()
    }

    /// Compiles the shader, returning failures as a [`CompileOutcome`]
    /// instead of an error.
    pub fn outcome(self) -> Result<CompileOutcome> {
        if self.source.is_empty() {
            return Err(Error::InvalidArgument(
                "shader source must not be empty".to_string(),
            ));
        }
        let entry_point = required_cstring("entry point", self.entry_point)?;
        let target = required_cstring("target profile", &self.target)?;
        let source_name = to_cstring(
            "source name",
            self.source_name
                .filter(|name| !name.is_empty())
                .unwrap_or(DEFAULT_SOURCE_NAME),
        )?;

        let table = MacroTable::build(&self.macros)?;
        let backend = backend::resolve(self.backend)?;

        debug!(
            "compiling {}:{} for {} ({} bytes, {} macros)",
            source_name.to_string_lossy(),
            self.entry_point,
            self.target,
            self.source.len(),
            table.as_ref().map_or(0, MacroTable::macro_count)
        );

        let mut code: *mut ID3DBlob = ptr::null_mut();
        let mut errors: *mut ID3DBlob = ptr::null_mut();

        let (status, code, errors) = unsafe {
            let result = backend.d3d_compile(
                self.source.as_ptr() as *const _,
                self.source.len(),
                source_name.as_ptr(),
                table.as_ref().map_or(ptr::null(), MacroTable::as_ptr),
                D3D_COMPILE_STANDARD_FILE_INCLUDE,
                entry_point.as_ptr(),
                target.as_ptr(),
                self.flags1.bits(),
                self.flags2,
                &mut code,
                &mut errors,
            );
            (HResult(result), Blob::from_raw(code), Blob::from_raw(errors))
        };
        drop(table);

        debug!("compile finished with status {}", status);

        let diagnostics = errors
            .map(Blob::into_text)
            .transpose()?
            .filter(|text| !text.is_empty());

        // Bytecode only matters on success; otherwise the blob is just released
        let bytecode = if status.is_ok() {
            code.map(Blob::into_bytes).transpose()?
        } else {
            None
        };

        CompileOutcome::reconcile(status, bytecode, diagnostics)
    }
}

/// Convenience function for simple shader compilation.
///
/// # Example
/// ```no_run
/// use fxcrs::{compile, ShaderTarget};
///
/// let source = "float4 main() : SV_TARGET { return float4(1,0,0,1); }";
/// let bytecode = compile(source, "main", ShaderTarget::Ps5_0).unwrap();
/// ```
pub fn compile(
    source: &str,
    entry_point: &str,
    target: impl Into<String>,
) -> Result<crate::CompiledShader> {
    CompileBuilder::new(source, entry_point, target)
        .compile()
        .map(|r| r.bytecode)
}
