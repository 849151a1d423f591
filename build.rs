#![forbid(unsafe_code)]

// Export build information as compile time environment variables.  Builds
// outside of a git checkout still succeed, they just report "unknown".
fn main() {
    let branch = build_data::get_git_branch().unwrap_or_else(|_| "unknown".to_string());
    let commit = build_data::get_git_commit_short().unwrap_or_else(|_| "unknown".to_string());
    let dirty = build_data::get_git_dirty()
        .map(|d| d.to_string())
        .unwrap_or_else(|_| "unknown".to_string());
    // SOURCE_TIMESTAMP rather than a build timestamp keeps builds reproducible.
    let source_ts = build_data::get_source_time()
        .map(|t| t.to_string())
        .unwrap_or_else(|_| "unknown".to_string());
    let rustc = build_data::get_rustc_version().unwrap_or_else(|_| "unknown".to_string());

    println!("cargo:rustc-env=GIT_BRANCH={}", branch);
    println!("cargo:rustc-env=GIT_COMMIT_SHORT={}", commit);
    println!("cargo:rustc-env=GIT_DIRTY={}", dirty);
    println!("cargo:rustc-env=SOURCE_TIMESTAMP={}", source_ts);
    println!("cargo:rustc-env=RUSTC_VERSION={}", rustc);
}
