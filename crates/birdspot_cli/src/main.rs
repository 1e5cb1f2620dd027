//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `birdspot_core` linkage.
//! - Print the static lookup tables; no network or storage access.

fn main() {
    println!("birdspot_core ping={}", birdspot_core::ping());
    println!("birdspot_core version={}", birdspot_core::core_version());
    for level in birdspot_core::all_levels() {
        println!(
            "rarity id={} name={} color={}",
            level.id, level.name, level.color
        );
    }
    for option in birdspot_core::radius_options() {
        println!("radius km={} label={}", option.value, option.label);
    }
}
