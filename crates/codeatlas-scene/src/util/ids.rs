use codeatlas_core::SchemeColor;
use std::hash::{Hash, Hasher};

pub fn stable_u32(s: &str) -> u32 {
    let mut h = std::collections::hash_map::DefaultHasher::new();
    s.hash(&mut h);
    (h.finish() & 0xFFFF_FFFF) as u32
}

pub fn name_to_color(name: &str) -> SchemeColor {
    let hue = (stable_u32(name) % 360) as f32;
    SchemeColor::from_hsv(hue, 0.55, 0.9)
}
