//! Locating, verifying and loading the native compiler library

use crate::{D3DCompilerError, D3DCompilerFns, Result};
use libloading::Library;
use log::debug;
use sha1::{Digest, Sha1};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Environment variable holding an explicit path to the compiler library.
pub const LIBRARY_ENV: &str = "FXC_COMPILER_LIBRARY";

/// Environment variable holding the expected SHA-1 (hex) of the library file.
pub const SHA1_ENV: &str = "FXC_COMPILER_SHA1";

#[cfg(windows)]
pub const DEFAULT_LIBRARY_NAME: &str = "d3dcompiler_47.dll";
#[cfg(target_os = "macos")]
pub const DEFAULT_LIBRARY_NAME: &str = "libvkd3d-utils.1.dylib";
#[cfg(all(unix, not(target_os = "macos")))]
pub const DEFAULT_LIBRARY_NAME: &str = "libvkd3d-utils.so.1";

/// Where to find the compiler library and how to verify it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LibraryConfig {
    /// Explicit library path. When unset the default name is looked up next
    /// to the executable, then handed to the platform loader as-is.
    pub path: Option<PathBuf>,
    /// Hex SHA-1 the library file must match.
    pub expected_sha1: Option<String>,
}

impl LibraryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads [`LIBRARY_ENV`] and [`SHA1_ENV`]. Empty values count as unset.
    pub fn from_env() -> Self {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());
        LibraryConfig {
            path: var(LIBRARY_ENV).map(PathBuf::from),
            expected_sha1: var(SHA1_ENV),
        }
    }

    pub fn with_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_expected_sha1(mut self, sha1: &str) -> Self {
        self.expected_sha1 = Some(sha1.to_string());
        self
    }

    /// Returns the path that will be passed to the platform loader.
    ///
    /// Without a pinned checksum this may be the bare default name, which the
    /// platform loader looks up on its own search path.
    pub fn resolve_path(&self) -> PathBuf {
        if let Some(path) = &self.path {
            return path.clone();
        }
        adjacent_library().unwrap_or_else(|| PathBuf::from(DEFAULT_LIBRARY_NAME))
    }

    /// Returns the absolute path of the concrete file a pinned load hashes
    /// and then opens.
    ///
    /// Never falls back to the bare default name: the file the platform
    /// loader would pick for it cannot be known in advance.
    pub fn resolve_pinned_path(&self) -> Result<PathBuf> {
        let path = match &self.path {
            Some(path) => path.clone(),
            None => adjacent_library().ok_or_else(|| D3DCompilerError::PinnedLibraryNotFound {
                name: DEFAULT_LIBRARY_NAME.to_string(),
            })?,
        };
        Ok(std::fs::canonicalize(path)?)
    }
}

/// The default library next to the executable, if there is one.
fn adjacent_library() -> Option<PathBuf> {
    let exe = std::env::current_exe().ok()?;
    let path = exe.with_file_name(DEFAULT_LIBRARY_NAME);
    path.is_file().then_some(path)
}

/// Lowercase hex SHA-1 of `bytes`.
pub fn sha1_hex(bytes: &[u8]) -> String {
    Sha1::digest(bytes)
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

fn verify_checksum(path: &Path, expected: &str) -> Result<()> {
    let found = sha1_hex(&std::fs::read(path)?);
    debug!("{} sha1 {}", path.display(), found);
    if !found.eq_ignore_ascii_case(expected.trim()) {
        return Err(D3DCompilerError::ChecksumMismatch {
            path: path.display().to_string(),
            expected: expected.trim().to_ascii_lowercase(),
            found,
        });
    }
    Ok(())
}

/// A loaded compiler library and its resolved entry points.
///
/// The function table is immutable once loaded, so a `D3DCompiler` can be
/// shared freely between threads. Whether concurrent calls are safe is up to
/// the native library itself.
pub struct D3DCompiler {
    fns: D3DCompilerFns,
    path: PathBuf,
    _library: Library,
}

impl D3DCompiler {
    /// Loads an independent instance of the library described by `config`.
    pub fn load(config: &LibraryConfig) -> Result<Self> {
        let path = match &config.expected_sha1 {
            Some(expected) => {
                let path = config.resolve_pinned_path()?;
                verify_checksum(&path, expected)?;
                path
            }
            None => config.resolve_path(),
        };
        debug!("loading shader compiler from {}", path.display());

        // SAFETY: loading runs the library's initialisers; the caller chose
        // this library as a D3DCompile implementation.
        let library = unsafe { Library::new(&path) }
            .map_err(|e| D3DCompilerError::LoadError(format!("{}: {}", path.display(), e)))?;
        // SAFETY: the table is stored alongside the library that backs it.
        let fns = unsafe { D3DCompilerFns::resolve(&library)? };

        debug!(
            "resolved {} exports from {}",
            D3DCompilerFns::SYMBOLS.len(),
            path.display()
        );

        Ok(D3DCompiler {
            fns,
            path,
            _library: library,
        })
    }

    /// Returns the process-wide instance, loading it from
    /// [`LibraryConfig::from_env`] on first use.
    ///
    /// A failed load is remembered; later calls report the same failure.
    pub fn global() -> Result<&'static D3DCompiler> {
        static STATE: OnceLock<Result<D3DCompiler>> = OnceLock::new();

        match STATE.get_or_init(|| D3DCompiler::load(&LibraryConfig::from_env())) {
            Ok(compiler) => Ok(compiler),
            Err(e) => Err(D3DCompilerError::Unavailable(e.to_string())),
        }
    }

    /// The resolved entry points.
    pub fn fns(&self) -> &D3DCompilerFns {
        &self.fns
    }

    /// The path the library was loaded from.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl std::fmt::Debug for D3DCompiler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("D3DCompiler")
            .field("path", &self.path)
            .field("fns", &self.fns)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha1_hex() {
        assert_eq!(sha1_hex(b"abc"), "a9993e364706816aba3e25717850c26c9cd0d89d");
        assert_eq!(sha1_hex(b""), "da39a3ee5e6b4b0d3255bfef95601890afd80709");
    }

    #[test]
    fn test_explicit_path_wins() {
        let config = LibraryConfig::new().with_path("/opt/fxc/libcompiler.so");
        assert_eq!(
            config.resolve_path(),
            PathBuf::from("/opt/fxc/libcompiler.so")
        );
    }

    #[test]
    fn test_pinned_path_is_absolute() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("libcompiler.so");
        std::fs::write(&file, b"library").unwrap();

        let config = LibraryConfig::new()
            .with_path(dir.path().join(".").join("libcompiler.so"))
            .with_expected_sha1(&sha1_hex(b"library"));
        let pinned = config.resolve_pinned_path().unwrap();
        assert!(pinned.is_absolute());
        assert_eq!(pinned, std::fs::canonicalize(&file).unwrap());
    }

    #[test]
    fn test_pinned_default_needs_a_concrete_file() {
        // Test binaries never ship with the compiler library beside them
        let config = LibraryConfig::new().with_expected_sha1(&sha1_hex(b"decoy"));
        assert!(matches!(
            config.resolve_pinned_path(),
            Err(D3DCompilerError::PinnedLibraryNotFound { .. })
        ));
        assert!(matches!(
            D3DCompiler::load(&config),
            Err(D3DCompilerError::PinnedLibraryNotFound { .. })
        ));
    }

    #[test]
    fn test_default_name_fallback() {
        let path = LibraryConfig::new().resolve_path();
        assert_eq!(
            path.file_name().and_then(|n| n.to_str()),
            Some(DEFAULT_LIBRARY_NAME)
        );
    }
}
