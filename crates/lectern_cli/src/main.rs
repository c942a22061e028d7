//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `lectern_core` linkage.
//! - Keep output deterministic for quick local sanity checks.

fn main() {
    // Why: keep a tiny CLI probe to validate core crate wiring independently
    // from the embedding UI runtime.
    println!("lectern_core ping={}", lectern_core::ping());
    println!("lectern_core version={}", lectern_core::core_version());
}
