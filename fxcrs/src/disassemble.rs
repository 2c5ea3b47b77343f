//! Shader disassembly API

use crate::backend::{self, Backend};
use crate::blob::Blob;
use crate::compile::to_cstring;
use crate::{DisassembleFlags, Error, HResult, Result};
use fxc_sys::ID3DBlob;
use log::debug;
use std::ptr;

/// Builder for shader disassembly
///
/// # Example
/// ```no_run
/// use fxcrs::{compile, DisassembleBuilder, DisassembleFlags, ShaderTarget};
///
/// let bytecode = compile(
///     "float4 main() : SV_TARGET { return float4(1,0,0,1); }",
///     "main",
///     ShaderTarget::Ps5_0
/// ).unwrap();
///
/// let text = DisassembleBuilder::new(&bytecode)
///     .flags(DisassembleFlags::ENABLE_INSTRUCTION_NUMBERING)
///     .comment("My shader")
///     .disassemble()
///     .unwrap();
///
/// println!("{}", text);
/// ```
pub struct DisassembleBuilder<'a> {
    bytecode: &'a [u8],
    flags: DisassembleFlags,
    comment: Option<&'a str>,
    backend: Option<&'a dyn Backend>,
}

impl<'a> DisassembleBuilder<'a> {
    /// Creates a new disassemble builder from compiled bytecode.
    pub fn new(bytecode: &'a [u8]) -> Self {
        DisassembleBuilder {
            bytecode,
            flags: DisassembleFlags::empty(),
            comment: None,
            backend: None,
        }
    }

    /// Sets disassembly flags.
    pub fn flags(mut self, flags: DisassembleFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Adds disassembly flags.
    pub fn with_flags(mut self, flags: DisassembleFlags) -> Self {
        self.flags |= flags;
        self
    }

    /// Enables instruction numbering.
    pub fn with_instruction_numbering(self) -> Self {
        self.with_flags(DisassembleFlags::ENABLE_INSTRUCTION_NUMBERING)
    }

    /// Enables instruction offsets.
    pub fn with_instruction_offsets(self) -> Self {
        self.with_flags(DisassembleFlags::ENABLE_INSTRUCTION_OFFSET)
    }

    /// Sets a comment placed at the top of the output.
    pub fn comment(mut self, comment: &'a str) -> Self {
        self.comment = Some(comment);
        self
    }

    /// Disassembles through `backend` instead of the process-wide library.
    pub fn with_backend(mut self, backend: &'a dyn Backend) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Disassembles the bytecode into text.
    pub fn disassemble(self) -> Result<String> {
        if self.bytecode.is_empty() {
            return Err(Error::InvalidArgument(
                "bytecode to disassemble must not be empty".to_string(),
            ));
        }
        let comment = self
            .comment
            .map(|c| to_cstring("comment", &terminate_line(c)))
            .transpose()?;
        let backend = backend::resolve(self.backend)?;

        debug!(
            "disassembling {} bytes (flags {:?})",
            self.bytecode.len(),
            self.flags
        );

        let mut disasm: *mut ID3DBlob = ptr::null_mut();
        let (status, blob) = unsafe {
            let result = backend.d3d_disassemble(
                self.bytecode.as_ptr() as *const _,
                self.bytecode.len(),
                self.flags.bits(),
                comment.as_ref().map_or(ptr::null(), |c| c.as_ptr()),
                &mut disasm,
            );
            (HResult(result), Blob::from_raw(disasm))
        };

        if !status.is_ok() {
            return Err(Error::Disassembly { hresult: status });
        }

        blob.ok_or(Error::Disassembly { hresult: status })?
            .into_text()
    }
}

/// Appends a newline unless `comment` already ends with one.
fn terminate_line(comment: &str) -> String {
    if comment.ends_with('\n') {
        comment.to_string()
    } else {
        format!("{}\n", comment)
    }
}

/// Convenience function for simple disassembly.
///
/// # Example
/// ```no_run
/// use fxcrs::{compile, disassemble, ShaderTarget};
///
/// let bytecode = compile(
///     "float4 main() : SV_TARGET { return float4(1,0,0,1); }",
///     "main",
///     ShaderTarget::Ps4_0
/// ).unwrap();
///
/// let asm = disassemble(&bytecode).unwrap();
/// assert!(asm.contains("ps_4_0"));
/// ```
pub fn disassemble(bytecode: &[u8]) -> Result<String> {
    DisassembleBuilder::new(bytecode).disassemble()
}
