//! Reconciling native status and output blobs into one outcome

use crate::{Error, HResult, Result};
use std::ops::Deref;

/// Compiled shader bytecode. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CompiledShader(Vec<u8>);

impl CompiledShader {
    /// Wraps `bytes`, or returns `None` if there are none.
    pub fn new(bytes: Vec<u8>) -> Option<Self> {
        if bytes.is_empty() {
            None
        } else {
            Some(CompiledShader(bytes))
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

impl Deref for CompiledShader {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<[u8]> for CompiledShader {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<CompiledShader> for Vec<u8> {
    fn from(shader: CompiledShader) -> Self {
        shader.0
    }
}

/// What a compilation produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileOutcome {
    /// Bytecode was produced. `diagnostics` holds any warnings.
    Success {
        shader: CompiledShader,
        diagnostics: Option<String>,
    },
    /// The compiler returned a failure status.
    Failure {
        hresult: HResult,
        diagnostics: Option<String>,
    },
}

impl CompileOutcome {
    /// Combines the native status with the extracted outputs.
    ///
    /// Bytecode is ignored on failure. A success status without bytecode (or
    /// with zero-length bytecode) is an [`Error::InternalConsistency`].
    pub fn reconcile(
        status: HResult,
        bytecode: Option<Vec<u8>>,
        diagnostics: Option<String>,
    ) -> Result<Self> {
        if !status.is_ok() {
            return Ok(CompileOutcome::Failure {
                hresult: status,
                diagnostics,
            });
        }

        match bytecode.and_then(CompiledShader::new) {
            Some(shader) => Ok(CompileOutcome::Success {
                shader,
                diagnostics,
            }),
            None => Err(Error::InternalConsistency(
                "compiler reported success but produced no bytecode".to_string(),
            )),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, CompileOutcome::Success { .. })
    }

    pub fn diagnostics(&self) -> Option<&str> {
        match self {
            CompileOutcome::Success { diagnostics, .. }
            | CompileOutcome::Failure { diagnostics, .. } => diagnostics.as_deref(),
        }
    }

    /// Raises a failure as [`Error::Compilation`].
    pub fn into_result(self) -> Result<CompileResult> {
        match self {
            CompileOutcome::Success {
                shader,
                diagnostics,
            } => Ok(CompileResult {
                bytecode: shader,
                warnings: diagnostics,
            }),
            CompileOutcome::Failure {
                hresult,
                diagnostics,
            } => Err(Error::Compilation {
                hresult,
                diagnostics,
            }),
        }
    }
}

/// Result of a successful shader compilation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileResult {
    /// The compiled shader bytecode
    pub bytecode: CompiledShader,
    /// Any warning messages from the compiler (if present)
    pub warnings: Option<String>,
}
