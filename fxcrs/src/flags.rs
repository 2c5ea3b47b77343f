//! Compile and disassemble option bitmasks
//!
//! Values are handed to the compiler unmodified.

use bitflags::bitflags;

bitflags! {
    /// D3DCOMPILE flags, passed as `Flags1`
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct CompileFlags: u32 {
        /// Insert debug information into the output
        const DEBUG = 1 << 0;
        /// Skip validation of the generated code
        const SKIP_VALIDATION = 1 << 1;
        /// Skip optimization passes
        const SKIP_OPTIMIZATION = 1 << 2;
        /// Pack matrices in row-major order
        const PACK_MATRIX_ROW_MAJOR = 1 << 3;
        /// Pack matrices in column-major order, the compiler default
        const PACK_MATRIX_COLUMN_MAJOR = 1 << 4;
        /// Allow partial precision arithmetic
        const PARTIAL_PRECISION = 1 << 5;
        /// Compile a vertex shader for the software pipeline, unoptimized
        const FORCE_VS_SOFTWARE_NO_OPT = 1 << 6;
        /// Compile a pixel shader for the software pipeline, unoptimized
        const FORCE_PS_SOFTWARE_NO_OPT = 1 << 7;
        /// Disable preshaders
        const NO_PRESHADER = 1 << 8;
        /// Avoid flow control constructs where possible
        const AVOID_FLOW_CONTROL = 1 << 9;
        /// Prefer flow control constructs where possible
        const PREFER_FLOW_CONTROL = 1 << 10;
        /// Reject deprecated syntax
        const ENABLE_STRICTNESS = 1 << 11;
        /// Accept older shader syntax for newer targets
        const ENABLE_BACKWARDS_COMPATIBILITY = 1 << 12;
        /// Require IEEE-strict floating point
        const IEEE_STRICTNESS = 1 << 13;
        /// Optimization level 0 (lowest)
        const OPTIMIZATION_LEVEL0 = 1 << 14;
        /// Optimization level 1, the absence of both level bits
        const OPTIMIZATION_LEVEL1 = 0;
        /// Optimization level 2
        const OPTIMIZATION_LEVEL2 = (1 << 14) | (1 << 15);
        /// Optimization level 3 (highest)
        const OPTIMIZATION_LEVEL3 = 1 << 15;
        /// Treat warnings as errors
        const WARNINGS_ARE_ERRORS = 1 << 18;
        /// Resources may alias one another
        const RESOURCES_MAY_ALIAS = 1 << 19;
        /// Enable unbounded descriptor tables
        const ENABLE_UNBOUNDED_DESCRIPTOR_TABLES = 1 << 20;
        /// Every resource is bound at draw time
        const ALL_RESOURCES_BOUND = 1 << 21;
        /// Name the debug info after the source
        const DEBUG_NAME_FOR_SOURCE = 1 << 22;
        /// Name the debug info after the binary
        const DEBUG_NAME_FOR_BINARY = 1 << 23;
    }
}

impl CompileFlags {
    const OPTIMIZATION_MASK: CompileFlags = CompileFlags::OPTIMIZATION_LEVEL2;

    /// Flags selecting optimization `level`. Anything above 3 means 3.
    pub fn optimization_level(level: u32) -> Self {
        match level {
            0 => CompileFlags::OPTIMIZATION_LEVEL0,
            1 => CompileFlags::OPTIMIZATION_LEVEL1,
            2 => CompileFlags::OPTIMIZATION_LEVEL2,
            _ => CompileFlags::OPTIMIZATION_LEVEL3,
        }
    }

    /// Replaces the optimization bits with those for `level`.
    pub fn with_optimization_level(self, level: u32) -> Self {
        (self - Self::OPTIMIZATION_MASK) | Self::optimization_level(level)
    }
}

impl Default for CompileFlags {
    fn default() -> Self {
        CompileFlags::empty()
    }
}

bitflags! {
    /// D3D_DISASM flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct DisassembleFlags: u32 {
        /// Color-coded output
        const ENABLE_COLOR_CODE = 1 << 0;
        /// Print default values for parameters
        const ENABLE_DEFAULT_VALUE_PRINTS = 1 << 1;
        /// Number each instruction
        const ENABLE_INSTRUCTION_NUMBERING = 1 << 2;
        /// Include instruction cycle counts
        const ENABLE_INSTRUCTION_CYCLE = 1 << 3;
        /// Leave debug info out of the listing
        const DISABLE_DEBUG_INFO = 1 << 4;
        /// Include the byte offset of each instruction
        const ENABLE_INSTRUCTION_OFFSET = 1 << 5;
        /// Instructions only, no declarations
        const INSTRUCTION_ONLY = 1 << 6;
        /// Print literals in hex
        const PRINT_HEX_LITERALS = 1 << 7;
    }
}

impl Default for DisassembleFlags {
    fn default() -> Self {
        DisassembleFlags::empty()
    }
}
