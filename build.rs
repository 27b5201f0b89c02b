use std::process::Command;

/// Trimmed stdout of a successful command.
fn command_output(program: &str, args: &[&str]) -> Option<String> {
    Command::new(program)
        .args(args)
        .output()
        .ok()
        .filter(|output| output.status.success())
        .and_then(|output| String::from_utf8(output.stdout).ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn main() {
    let commit_sha = command_output("git", &["rev-parse", "--short", "HEAD"]);
    let build_date = command_output("date", &["+%Y-%m-%d"]);

    // "rustc 1.92.0 (..." -> "1.92.0"
    let rustc = std::env::var("RUSTC").unwrap_or_else(|_| "rustc".to_string());
    let rustc_version = command_output(&rustc, &["--version"]).and_then(|s| {
        s.strip_prefix("rustc ")
            .and_then(|v| v.split_whitespace().next())
            .map(str::to_string)
    });

    for (key, value) in [
        ("SYMDEX_COMMIT_SHA", commit_sha),
        ("SYMDEX_BUILD_DATE", build_date),
        ("SYMDEX_RUSTC_VERSION", rustc_version),
    ] {
        println!(
            "cargo:rustc-env={}={}",
            key,
            value.unwrap_or_else(|| "unknown".to_string())
        );
    }

    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-env-changed=SYMDEX_COMMIT_SHA");
}
