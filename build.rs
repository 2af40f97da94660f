use std::env;

fn main() {
    println!("cargo:rustc-check-cfg=cfg(quiet_logging)");

    // Set compile-time log level based on build profile
    let profile = env::var("PROFILE").unwrap_or_else(|_| "debug".to_string());

    match profile.as_str() {
        "release" => {
            // Only warnings and errors in release (and profiling) builds
            println!("cargo:rustc-cfg=quiet_logging");
        }
        _ => {
            // Full crate logging for debug builds
        }
    }

    println!("cargo:rerun-if-env-changed=PROFILE");
}
