use std::process::Command;

// Stamps the bootstrap binary with the commit and build time it was built from,
// so the startup log line identifies the deployed artifact.
fn main() {
    let git_hash = Command::new("git")
        .args(["rev-parse", "--short=8", "HEAD"])
        .output()
        .ok()
        .filter(|output| output.status.success())
        .and_then(|output| String::from_utf8(output.stdout).ok())
        .map(|hash| hash.trim().to_string())
        .unwrap_or_else(|| "unknown".to_string());

    println!("cargo:rustc-env=SQS2S3_GIT_HASH={}", git_hash);
    println!(
        "cargo:rustc-env=SQS2S3_BUILD_TIMESTAMP={}",
        chrono::Utc::now().to_rfc3339()
    );

    println!("cargo:rerun-if-changed=../../.git/HEAD");
}
