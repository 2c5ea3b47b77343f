//! HLSL preprocessing API

use crate::backend::{self, Backend};
use crate::blob::Blob;
use crate::compile::{DEFAULT_SOURCE_NAME, to_cstring};
use crate::macros::MacroTable;
use crate::{Error, HResult, Result, ShaderMacro};
use fxc_sys::{D3D_COMPILE_STANDARD_FILE_INCLUDE, ID3DBlob};
use log::debug;
use std::ptr;

/// Result of successful preprocessing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreprocessResult {
    /// The preprocessed source code
    pub source: String,
    /// Any warning messages
    pub warnings: Option<String>,
}

/// Builder for HLSL preprocessing
///
/// # Example
/// ```no_run
/// use fxcrs::PreprocessBuilder;
///
/// let source = r#"
///     #define PI 3.14159
///     float4 main() : SV_TARGET { return float4(PI, 0, 0, 1); }
/// "#;
///
/// let result = PreprocessBuilder::new(source)
///     .source_name("my_shader.hlsl")
///     .define("EXTRA", "1")
///     .preprocess()
///     .unwrap();
///
/// println!("Preprocessed: {}", result.source);
/// ```
pub struct PreprocessBuilder<'a> {
    source: &'a [u8],
    source_name: Option<&'a str>,
    macros: Vec<ShaderMacro>,
    backend: Option<&'a dyn Backend>,
}

impl<'a> PreprocessBuilder<'a> {
    /// Creates a new preprocess builder.
    pub fn new(source: &'a str) -> Self {
        Self::from_bytes(source.as_bytes())
    }

    /// Creates a preprocess builder from raw bytes.
    pub fn from_bytes(source: &'a [u8]) -> Self {
        PreprocessBuilder {
            source,
            source_name: None,
            macros: Vec::new(),
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

    /// Adds multiple preprocessor macros from an iterator.
    pub fn defines<I, M>(mut self, macros: I) -> Self
    where
        I: IntoIterator<Item = M>,
        M: Into<ShaderMacro>,
    {
        self.macros.extend(macros.into_iter().map(Into::into));
        self
    }

    /// Adds a macro with an empty definition.
    pub fn define_flag(mut self, name: &str) -> Self {
        self.macros.push(ShaderMacro::flag(name));
        self
    }

    pub fn with_macro(mut self, shader_macro: ShaderMacro) -> Self {
        self.macros.push(shader_macro);
        self
    }

    /// Preprocesses through `backend` instead of the process-wide library.
    pub fn with_backend(mut self, backend: &'a dyn Backend) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Preprocesses the source.
    pub fn preprocess(self) -> Result<PreprocessResult> {
        if self.source.is_empty() {
            return Err(Error::InvalidArgument(
                "shader source must not be empty".to_string(),
            ));
        }
        let source_name = to_cstring(
            "source name",
            self.source_name
                .filter(|name| !name.is_empty())
                .unwrap_or(DEFAULT_SOURCE_NAME),
        )?;

        let table = MacroTable::build(&self.macros)?;
        let backend = backend::resolve(self.backend)?;

        debug!(
            "preprocessing {} ({} bytes)",
            source_name.to_string_lossy(),
            self.source.len()
        );

        let mut code: *mut ID3DBlob = ptr::null_mut();
        let mut errors: *mut ID3DBlob = ptr::null_mut();

        let (status, code, errors) = unsafe {
            let result = backend.d3d_preprocess(
                self.source.as_ptr() as *const _,
                self.source.len(),
                source_name.as_ptr(),
                table.as_ref().map_or(ptr::null(), MacroTable::as_ptr),
                D3D_COMPILE_STANDARD_FILE_INCLUDE,
                &mut code,
                &mut errors,
            );
            (HResult(result), Blob::from_raw(code), Blob::from_raw(errors))
        };
        drop(table);

        let diagnostics = errors
            .map(Blob::into_text)
            .transpose()?
            .filter(|text| !text.is_empty());

        if !status.is_ok() {
            return Err(Error::Preprocessing {
                hresult: status,
                diagnostics,
            });
        }

        let source = code
            .ok_or_else(|| {
                Error::InternalConsistency(
                    "preprocessor reported success but produced no output".to_string(),
                )
            })?
            .into_text()?;

        Ok(PreprocessResult {
            source,
            warnings: diagnostics,
        })
    }
}

/// Convenience function for simple preprocessing.
///
/// # Example
/// ```no_run
/// use fxcrs::preprocess;
///
/// let source = "#define X 1\nfloat4 main() : SV_TARGET { return X; }";
/// let preprocessed = preprocess(source).unwrap();
/// ```
pub fn preprocess(source: &str) -> Result<String> {
    PreprocessBuilder::new(source)
        .preprocess()
        .map(|r| r.source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::macros::ledger;
    use crate::testing::{FakeOutput, RecordingBackend};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_preprocess_returns_text_and_frees_macros() {
        let backend = RecordingBackend::new(
            0,
            FakeOutput::Bytes(b"float4 main() : SV_TARGET { return 1; }\0".to_vec()),
            FakeOutput::Absent,
        );

        let result = PreprocessBuilder::new("#define X 1\nfloat4 main() : SV_TARGET { return X; }")
            .defines([("EXTRA", "2")])
            .with_backend(&backend)
            .preprocess()
            .unwrap();

        assert_eq!(result.source, "float4 main() : SV_TARGET { return 1; }");
        assert_eq!(result.warnings, None);

        let seen = backend.seen();
        assert_eq!(seen.source_name.as_deref(), Some(DEFAULT_SOURCE_NAME));
        assert_eq!(seen.macro_slots.map(|s| s.len()), Some(4));
        assert_eq!(ledger::live(), 0);
        assert!(backend.all_released());
    }

    #[test]
    fn test_preprocess_failure_carries_diagnostics() {
        let backend = RecordingBackend::new(
            HResult::E_FAIL.0,
            FakeOutput::Absent,
            FakeOutput::Bytes(b"error X1507: failed to open source file".to_vec()),
        );

        let result = PreprocessBuilder::new("#include \"missing.hlsl\"")
            .with_backend(&backend)
            .preprocess();

        match result {
            Err(err @ Error::Preprocessing { .. }) => {
                assert!(err.diagnostics().unwrap().contains("X1507"));
            }
            other => panic!("expected preprocessing error, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_source_is_rejected() {
        let backend = RecordingBackend::succeeding(b"x");
        let result = PreprocessBuilder::new("").with_backend(&backend).preprocess();
        assert!(matches!(result, Err(Error::InvalidArgument(_))));
        assert_eq!(backend.calls(), 0);
    }
}
