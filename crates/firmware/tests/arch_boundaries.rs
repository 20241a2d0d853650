//! Architecture boundary tests. Run with `cargo test -p firmware --test arch_boundaries`
//!
//! Layering rules:
//!   Rule 1: platform (HAL traits) depends on nothing board-specific
//!   Rule 2: capture (engine) depends on platform only, never on firmware or embassy
//!   Rule 3: both library crates stay `no_std` outside tests

// Architecture test file: expect/unwrap/panic are intentional test mechanisms.
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, clippy::indexing_slicing)]

fn dependency_section(manifest: &str) -> &str {
    let start = manifest.find("[dependencies]").expect("manifest has [dependencies]");
    let rest = &manifest[start..];
    let end = rest.find("[dev-dependencies]").unwrap_or(rest.len());
    &rest[..end]
}

#[test]
fn platform_has_no_board_dependencies() {
    let deps = dependency_section(include_str!("../../platform/Cargo.toml"));
    for banned in ["firmware", "capture", "embassy", "cortex-m"] {
        assert!(!deps.contains(banned), "platform must not depend on {banned}");
    }
}

#[test]
fn capture_depends_on_platform_only() {
    let deps = dependency_section(include_str!("../../capture/Cargo.toml"));
    assert!(deps.contains("platform"));
    for banned in ["firmware", "embassy", "cortex-m", "pio"] {
        assert!(!deps.contains(banned), "capture must not depend on {banned}");
    }
}

#[test]
fn library_crates_are_no_std() {
    assert!(include_str!("../../platform/src/lib.rs").contains("no_std"));
    assert!(include_str!("../../capture/src/lib.rs").contains("#![cfg_attr(not(test), no_std)]"));
}

#[test]
fn capture_denies_unsafe() {
    let lib = include_str!("../../capture/src/lib.rs");
    assert!(lib.contains("#![deny(unsafe_code)]"));
}

#[test]
fn boot_steps_are_numbered_in_order() {
    let steps: Vec<u32> = include_str!("../src/main.rs")
        .lines()
        .filter_map(|line| line.trim().strip_prefix("// Step "))
        .map(|rest| rest.split(':').next().unwrap().parse().unwrap())
        .collect();
    assert_eq!(steps, (1..=4).collect::<Vec<_>>());
}

/// Compile-time check: firmware's calibration and state probe satisfy the
/// platform traits the engine is generic over.
#[test]
fn firmware_parts_implement_platform_traits() {
    fn calibration<T: platform::CalibrationTable>() {}
    fn probe<T: platform::StateProbe>() {}
    calibration::<firmware::BoardCalibration>();
    probe::<firmware::DeviceStateProbe>();
}
