use std::env;
use std::process::Command;

fn main() {
    let version = match Command::new("git").args(["describe", "--tags"]).output() {
        Ok(output) if output.status.success() => String::from_utf8_lossy(&output.stdout).trim().to_string(),
        _ => env::var("BUILD_VERSION").unwrap_or_else(|_| env::var("CARGO_PKG_VERSION").unwrap()),
    };
    println!("cargo:rustc-env=BUILD_VERSION={}", version);

    generate_build_info();
}

// uses the 'built' crate to generate a build-info.rs file with a bunch of build information. We then
// include this file in the app module.
fn generate_build_info() {
    let manifest_dir = env::var("CARGO_MANIFEST_DIR").unwrap();
    let src = std::path::Path::new(&manifest_dir);
    let dst = std::path::Path::new(&env::var("OUT_DIR").unwrap()).join("build-info.rs");
    built::write_built_file_with_opts(Some(src), &dst).expect("Failed to acquire build-time information");
}
