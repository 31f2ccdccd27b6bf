//! # Pin
//!
//! A typed endpoint on a node. Pins carry the connection-compatibility rules
//! and the deterministic color-from-type-name hash.

use std::collections::HashMap;
use std::sync::{Mutex, OnceLock};

use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};
use smallvec::SmallVec;

use super::types::{ColorHex, ConnectionId, PinCategory, PinDirection};

/// Wildcard type name accepted by any data pin.
pub const ANY_TYPE: &str = "any";

/// Fixed type name used for execution pins.
pub const EXEC_TYPE: &str = "exec";

fn color_cache() -> &'static Mutex<HashMap<String, ColorHex>> {
    static CACHE: OnceLock<Mutex<HashMap<String, ColorHex>>> = OnceLock::new();
    CACHE.get_or_init(|| Mutex::new(HashMap::new()))
}

/// Derive the wire/marker color for a (lowercased) type name.
///
/// `any` is special-cased to neutral grey; every other name is hashed with
/// SHA-1 and the first 12 hex digits of the digest are sliced into
/// Hue/Saturation/Value fields, matching the source design bit-for-bit so
/// that two sessions looking at the same type name agree on its color.
/// Results are cached since the hash is pure but not free.
pub fn color_from_type_name(type_name: &str) -> ColorHex {
    if type_name.eq_ignore_ascii_case(ANY_TYPE) {
        return "#C0C0C0".to_string();
    }

    if let Some(cached) = color_cache().lock().unwrap().get(type_name) {
        return cached.clone();
    }

    let mut hasher = Sha1::new();
    hasher.update(type_name.as_bytes());
    let digest = hasher.finalize();
    let hex = hex_digest(&digest);

    let hue = u32::from_str_radix(&hex[0..4], 16).unwrap_or(0) % 360;
    let saturation = 180 + (u32::from_str_radix(&hex[4..8], 16).unwrap_or(0) % 76);
    let value = 200 + (u32::from_str_radix(&hex[8..12], 16).unwrap_or(0) % 56);

    let (r, g, b) = hsv_to_rgb(hue as f64, saturation as f64 / 255.0, value as f64 / 255.0);
    let color = format!("#{:02X}{:02X}{:02X}", r, g, b);

    color_cache()
        .lock()
        .unwrap()
        .insert(type_name.to_string(), color.clone());
    color
}

fn hex_digest(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

fn hsv_to_rgb(h: f64, s: f64, v: f64) -> (u8, u8, u8) {
    let c = v * s;
    let h_prime = h / 60.0;
    let x = c * (1.0 - (h_prime.rem_euclid(2.0) - 1.0).abs());
    let (r1, g1, b1) = match h_prime as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    let m = v - c;
    (
        ((r1 + m) * 255.0).round() as u8,
        ((g1 + m) * 255.0).round() as u8,
        ((b1 + m) * 255.0).round() as u8,
    )
}

/// A typed endpoint on a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pin {
    pub name: String,
    pub direction: PinDirection,
    pub category: PinCategory,
    /// Lowercased type annotation text; `exec` for execution pins, `any`
    /// as the data wildcard.
    pub type_name: String,
    pub connections: SmallVec<[ConnectionId; 2]>,
}

impl Pin {
    pub fn data(name: impl Into<String>, direction: PinDirection, type_name: impl Into<String>) -> Self {
        let mut type_name = type_name.into();
        type_name.make_ascii_lowercase();
        Self {
            name: name.into(),
            direction,
            category: PinCategory::Data,
            type_name,
            connections: SmallVec::new(),
        }
    }

    pub fn execution(name: impl Into<String>, direction: PinDirection) -> Self {
        Self {
            name: name.into(),
            direction,
            category: PinCategory::Execution,
            type_name: EXEC_TYPE.to_string(),
            connections: SmallVec::new(),
        }
    }

    pub fn is_input(&self) -> bool {
        self.direction == PinDirection::Input
    }

    pub fn is_output(&self) -> bool {
        self.direction == PinDirection::Output
    }

    pub fn is_execution(&self) -> bool {
        self.category == PinCategory::Execution
    }

    pub fn is_connected(&self) -> bool {
        !self.connections.is_empty()
    }

    pub fn add_connection(&mut self, id: ConnectionId) {
        if !self.connections.contains(&id) {
            self.connections.push(id);
        }
    }

    pub fn remove_connection(&mut self, id: ConnectionId) {
        self.connections.retain(|c| *c != id);
    }

    /// Color derived from this pin's type name.
    pub fn color(&self) -> ColorHex {
        if self.category == PinCategory::Execution {
            return "#FFFFFF".to_string();
        }
        color_from_type_name(&self.type_name)
    }

    /// Compatibility test, symmetric by construction: swapping `self`/`other`
    /// and swapping the roles they play yields the same verdict.
    pub fn can_connect_to(&self, other: &Pin) -> bool {
        if std::ptr::eq(self, other) {
            return false;
        }
        if self.category != other.category {
            return false;
        }
        let (output, input) = match (self.direction, other.direction) {
            (PinDirection::Output, PinDirection::Input) => (self, other),
            (PinDirection::Input, PinDirection::Output) => (other, self),
            _ => return false,
        };
        if input.is_connected() {
            return false;
        }
        if self.category == PinCategory::Execution {
            return true;
        }
        output.type_name.eq_ignore_ascii_case(ANY_TYPE)
            || input.type_name.eq_ignore_ascii_case(ANY_TYPE)
            || output.type_name.eq_ignore_ascii_case(&input.type_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn any_type_is_grey() {
        assert_eq!(color_from_type_name("any"), "#C0C0C0");
        assert_eq!(color_from_type_name("ANY"), "#C0C0C0");
    }

    #[test]
    fn color_is_deterministic_and_case_insensitive() {
        let a = color_from_type_name("int");
        let b = color_from_type_name("int");
        assert_eq!(a, b);
    }

    #[test]
    fn different_types_usually_differ() {
        assert_ne!(color_from_type_name("int"), color_from_type_name("string"));
    }

    #[test]
    fn data_pins_reject_mismatched_types() {
        let out = Pin::data("result", PinDirection::Output, "int");
        let inp = Pin::data("value", PinDirection::Input, "string");
        assert!(!out.can_connect_to(&inp));
    }

    #[test]
    fn any_type_is_wildcard() {
        let out = Pin::data("result", PinDirection::Output, "int");
        let inp = Pin::data("value", PinDirection::Input, "any");
        assert!(out.can_connect_to(&inp));
        assert!(inp.can_connect_to(&out));
    }

    #[test]
    fn same_direction_never_connects() {
        let a = Pin::data("a", PinDirection::Output, "int");
        let b = Pin::data("b", PinDirection::Output, "int");
        assert!(!a.can_connect_to(&b));
    }

    #[test]
    fn input_with_existing_connection_is_full() {
        let mut inp = Pin::data("value", PinDirection::Input, "int");
        inp.add_connection(uuid::Uuid::new_v4());
        let out = Pin::data("result", PinDirection::Output, "int");
        assert!(!out.can_connect_to(&inp));
    }

    #[test]
    fn execution_pins_ignore_type_name() {
        let out = Pin::execution("exec_out", PinDirection::Output);
        let inp = Pin::execution("exec_in", PinDirection::Input);
        assert!(out.can_connect_to(&inp));
    }

    #[test]
    fn type_name_is_lowercased_on_construction() {
        let pin = Pin::data("x", PinDirection::Input, "Dict[str, int]");
        assert_eq!(pin.type_name, "dict[str, int]");
    }
}
