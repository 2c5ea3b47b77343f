//! Integration tests for library loading and the raw entry points
//!
//! Tests that call into the compiler return early when no compiler library
//! can be loaded (see `FXC_COMPILER_LIBRARY`).

use fxc_sys::*;
use pretty_assertions::assert_eq;
use std::ffi::c_void;
use std::io::Write;
use std::ptr;

/// Helper to copy blob data out
unsafe fn get_blob_data(blob: *mut ID3DBlob) -> Vec<u8> {
    if blob.is_null() {
        return Vec::new();
    }
    unsafe {
        let ptr = ID3DBlob::get_buffer_pointer(blob);
        let size = ID3DBlob::get_buffer_size(blob);
        std::slice::from_raw_parts(ptr as *const u8, size).to_vec()
    }
}

/// Helper to release a blob
unsafe fn release_blob(blob: *mut ID3DBlob) {
    if !blob.is_null() {
        unsafe {
            ID3DBlob::release(blob);
        }
    }
}

fn compiler() -> Option<&'static D3DCompiler> {
    match D3DCompiler::global() {
        Ok(compiler) => Some(compiler),
        Err(e) => {
            eprintln!("skipping: {}", e);
            None
        }
    }
}

const PIXEL_SHADER: &[u8] = b"float4 main() : SV_TARGET { return float4(1, 0, 0, 1); }";

#[test]
fn test_missing_library_is_load_error() {
    let config = LibraryConfig::new().with_path("/nonexistent/fxc/libnothing.so");
    match D3DCompiler::load(&config) {
        Err(D3DCompilerError::LoadError(message)) => {
            assert!(message.contains("libnothing"), "{}", message);
        }
        other => panic!("expected LoadError, got {:?}", other),
    }
}

#[test]
fn test_checksum_mismatch_is_checked_before_loading() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"not a shared library").unwrap();

    let config = LibraryConfig::new()
        .with_path(file.path())
        .with_expected_sha1("0000000000000000000000000000000000000000");

    match D3DCompiler::load(&config) {
        Err(D3DCompilerError::ChecksumMismatch {
            expected, found, ..
        }) => {
            assert_eq!(expected, "0000000000000000000000000000000000000000");
            assert_eq!(found, sha1_hex(b"not a shared library"));
        }
        other => panic!("expected ChecksumMismatch, got {:?}", other),
    }
}

#[test]
fn test_matching_checksum_proceeds_to_load() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"not a shared library").unwrap();

    let digest = sha1_hex(b"not a shared library").to_uppercase();
    let config = LibraryConfig::new()
        .with_path(file.path())
        .with_expected_sha1(&digest);

    // The checksum passes, so the failure comes from the platform loader
    assert!(matches!(
        D3DCompiler::load(&config),
        Err(D3DCompilerError::LoadError(_))
    ));
}

#[test]
fn test_pin_ignores_a_same_named_file_in_the_working_directory() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(DEFAULT_LIBRARY_NAME), b"decoy").unwrap();

    let previous = std::env::current_dir().unwrap();
    std::env::set_current_dir(dir.path()).unwrap();
    let config = LibraryConfig::new().with_expected_sha1(&sha1_hex(b"decoy"));
    let result = D3DCompiler::load(&config);
    std::env::set_current_dir(previous).unwrap();

    match result {
        Err(D3DCompilerError::PinnedLibraryNotFound { name }) => {
            assert_eq!(name, DEFAULT_LIBRARY_NAME);
        }
        other => panic!("expected PinnedLibraryNotFound, got {:?}", other),
    }
}

#[test]
fn test_pinned_load_reports_the_hashed_path() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"not a shared library").unwrap();

    let config = LibraryConfig::new()
        .with_path(file.path())
        .with_expected_sha1(&sha1_hex(b"not a shared library"));

    // The loader must be handed the same absolute file that was hashed
    let hashed = std::fs::canonicalize(file.path()).unwrap();
    match D3DCompiler::load(&config) {
        Err(D3DCompilerError::LoadError(message)) => {
            assert!(message.starts_with(&hashed.display().to_string()), "{}", message);
        }
        other => panic!("expected LoadError, got {:?}", other),
    }
}

#[test]
fn test_missing_checksum_file_is_io_error() {
    let config = LibraryConfig::new()
        .with_path("/nonexistent/fxc/libnothing.so")
        .with_expected_sha1("00");
    assert!(matches!(
        D3DCompiler::load(&config),
        Err(D3DCompilerError::Io(_))
    ));
}

#[test]
fn test_raw_compile_and_disassemble() {
    let Some(compiler) = compiler() else { return };
    let fns = compiler.fns();

    unsafe {
        let mut code: *mut ID3DBlob = ptr::null_mut();
        let mut errors: *mut ID3DBlob = ptr::null_mut();

        let result = (fns.d3d_compile)(
            PIXEL_SHADER.as_ptr() as *const c_void,
            PIXEL_SHADER.len(),
            c"pixel.hlsl".as_ptr(),
            ptr::null(),
            D3D_COMPILE_STANDARD_FILE_INCLUDE,
            c"main".as_ptr(),
            c"ps_4_0".as_ptr(),
            0,
            0,
            &mut code,
            &mut errors,
        );
        release_blob(errors);
        assert_eq!(result, S_OK, "compilation should succeed");

        let bytecode = get_blob_data(code);
        release_blob(code);
        assert!(!bytecode.is_empty());

        let mut disasm: *mut ID3DBlob = ptr::null_mut();
        let result = (fns.d3d_disassemble)(
            bytecode.as_ptr() as *const c_void,
            bytecode.len(),
            0,
            ptr::null(),
            &mut disasm,
        );
        let text = String::from_utf8_lossy(&get_blob_data(disasm)).into_owned();
        release_blob(disasm);

        assert_eq!(result, S_OK, "disassembly should succeed");
        assert!(text.contains("ps_4_0"), "{}", text);
    }
}

#[test]
fn test_raw_compile_reports_errors() {
    let Some(compiler) = compiler() else { return };
    let fns = compiler.fns();
    let source = b"float4 main() : SV_TARGET { return undefined_variable; }";

    unsafe {
        let mut code: *mut ID3DBlob = ptr::null_mut();
        let mut errors: *mut ID3DBlob = ptr::null_mut();

        let result = (fns.d3d_compile)(
            source.as_ptr() as *const c_void,
            source.len(),
            ptr::null(),
            ptr::null(),
            ptr::null_mut(),
            c"main".as_ptr(),
            c"ps_4_0".as_ptr(),
            0,
            0,
            &mut code,
            &mut errors,
        );
        let message = String::from_utf8_lossy(&get_blob_data(errors)).into_owned();
        release_blob(errors);
        release_blob(code);

        assert_ne!(result, S_OK);
        assert!(!message.is_empty());
    }
}
