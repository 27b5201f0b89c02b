//! Version and build information for symdex
//!
//! Provides version string and build metadata (commit SHA, build date, rustc version).

/// Get the full version string including build metadata
///
/// Returns format: "symdex {version} ({commit} {date}) rustc {rustc_version}"
pub fn version() -> String {
    format!(
        "symdex {} ({} {}) rustc {}",
        package_version(),
        build_commit(),
        build_date(),
        rustc_version()
    )
}

/// Get the package version (e.g., "0.3.0")
pub fn package_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Returns "unknown" if not built with commit info
pub fn build_commit() -> &'static str {
    option_env!("SYMDEX_COMMIT_SHA").unwrap_or("unknown")
}

pub fn build_date() -> &'static str {
    option_env!("SYMDEX_BUILD_DATE").unwrap_or("unknown")
}

/// Rust compiler version used for the build, "unknown" when not recorded
pub fn rustc_version() -> &'static str {
    option_env!("SYMDEX_RUSTC_VERSION").unwrap_or("unknown")
}
