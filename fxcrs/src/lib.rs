//! Safe, ergonomic Rust API over a native HLSL shader compiler
//!
//! Source text goes in, bytecode (or diagnostics) comes out. The native
//! `D3DCompile` family is reached through [`Backend`]; by default that is the
//! process-wide library loaded by [`fxc_sys::D3DCompiler::global`].
//!
//! RAII wrappers own every native resource. The macro table is freed and
//! every output blob released before any call returns, on every path.
//!
//! # Example
//!
//! ```no_run
//! use fxcrs::{compile, disassemble, ShaderTarget};
//!
//! let source = r#"
//!     float4 main(float4 pos : SV_POSITION) : SV_TARGET {
//!         return pos;
//!     }
//! "#;
//!
//! let bytecode = compile(source, "main", ShaderTarget::Ps4_0).unwrap();
//! println!("{}", disassemble(&bytecode).unwrap());
//! ```

mod backend;
mod blob;
mod compile;
mod disassemble;
mod error;
mod flags;
mod macros;
mod outcome;
mod preprocess;
mod target;

#[cfg(test)]
mod testing;

pub use backend::{Backend, default_backend};
pub use compile::{CompileBuilder, DEFAULT_SOURCE_NAME, compile};
pub use disassemble::{DisassembleBuilder, disassemble};
pub use error::{Error, HResult, Result};
pub use flags::{CompileFlags, DisassembleFlags};
pub use macros::ShaderMacro;
pub use outcome::{CompileOutcome, CompileResult, CompiledShader};
pub use preprocess::{PreprocessBuilder, PreprocessResult, preprocess};
pub use target::{ShaderTarget, ShaderType, UnknownTarget};

pub use fxc_sys::{D3DCompiler, LibraryConfig};
