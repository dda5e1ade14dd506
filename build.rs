//! Build script for BakeCalc
//!
//! Embeds the build timestamp so the status tool can report it.

fn main() {
    println!("cargo:rerun-if-changed=src");
    println!("cargo:rerun-if-changed=build.rs");

    let timestamp = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string();
    println!("cargo:rustc-env=BAKECALC_BUILD_TIMESTAMP={}", timestamp);
}
