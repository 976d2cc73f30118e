//! Bakes the optional gas baseline override into the firmware image.
//!
//! `ENVMON_R_ZERO` is taken from the process environment or from a `.env`
//! file next to this crate (or any parent directory) and re-exported to the
//! compiler, where `option_env!` picks it up.

fn main() {
    println!("cargo:rerun-if-changed=.env");
    println!("cargo:rerun-if-env-changed=ENVMON_R_ZERO");

    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            println!("cargo:warning=could not load .env: {e}");
        }
    }

    if let Ok(r_zero) = std::env::var("ENVMON_R_ZERO") {
        if r_zero.trim().parse::<f32>().is_err() {
            println!("cargo:warning=ENVMON_R_ZERO={r_zero} is not a number, ignoring it");
        } else {
            println!("cargo:rustc-env=ENVMON_R_ZERO={}", r_zero.trim());
        }
    }
}
