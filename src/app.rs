#![allow(dead_code)]

/// The application name
pub const NAME: &str = "memberauth";

/// The application version
pub const VERSION: &str = env!("BUILD_VERSION");

// The file has been placed here by the build script. See build.rs
include!(concat!(env!("OUT_DIR"), "/build-info.rs"));

lazy_static! {
    static ref LONG_VERSION: String = {
        [
            PKG_VERSION.to_string(),
            format!(" - Git version:\t{}", GIT_VERSION.unwrap_or("unknown")),
            format!(" - Built:\t{}", BUILT_TIME_UTC),
            format!(" - hyper:\tv{}", dependency_version("hyper")),
            format!(" - Compiler:\t{}", RUSTC_VERSION),
            format!(" - OS/Arch:\t{}/{}", CFG_OS, CFG_TARGET_ARCH),
            format!(" - Features:\t{}", FEATURES_STR),
            format!(" - Debug:\t{}", DEBUG),
        ]
        .join("\n")
    };
}

pub fn long_version() -> &'static str {
    (*LONG_VERSION).as_str()
}

/// Looks up the resolved version of a dependency as recorded in Cargo.lock at build time.
pub fn dependency_version(crate_name: &str) -> &'static str {
    DEPENDENCIES
        .iter()
        .find_map(|(name, version)| if *name == crate_name { Some(*version) } else { None })
        .unwrap_or("unknown")
}
