//! Physics materials and the rules for pairing two of them at a contact.

use serde::{Deserialize, Serialize};

/// Named bundle of surface and bulk properties.
///
/// Combination is done through associated functions rather than methods so
/// any two materials can be paired without an ownership hierarchy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsMaterial {
    pub name: String,
    /// Inverse stiffness; 0 is perfectly rigid.
    pub compliance: f32,
    pub static_friction: f32,
    pub dynamic_friction: f32,
    /// 0 is perfectly inelastic, 1 perfectly elastic.
    pub restitution: f32,
    pub damping: f32,
    /// kg/m³, used for density-derived mass.
    pub density: f32,
}

impl PhysicsMaterial {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Effective material for a contact between `a` and `b`.
    pub fn combine(a: &PhysicsMaterial, b: &PhysicsMaterial) -> PhysicsMaterial {
        PhysicsMaterial {
            name: "Combined".to_string(),
            compliance: Self::combine_compliance(a.compliance, b.compliance),
            static_friction: Self::combine_static_friction(a.static_friction, b.static_friction),
            dynamic_friction: Self::combine_dynamic_friction(
                a.dynamic_friction,
                b.dynamic_friction,
            ),
            restitution: Self::combine_restitution(a.restitution, b.restitution),
            damping: Self::combine_damping(a.damping, b.damping),
            density: (a.density + b.density) * 0.5,
        }
    }

    /// Geometric mean.
    pub fn combine_static_friction(a: f32, b: f32) -> f32 {
        (a * b).max(0.0).sqrt()
    }

    /// Geometric mean.
    pub fn combine_dynamic_friction(a: f32, b: f32) -> f32 {
        (a * b).max(0.0).sqrt()
    }

    /// The bouncier surface wins.
    pub fn combine_restitution(a: f32, b: f32) -> f32 {
        a.max(b)
    }

    /// Springs in series: `1/k = 1/k_a + 1/k_b`, and compliance is `1/k`.
    pub fn combine_compliance(a: f32, b: f32) -> f32 {
        a + b
    }

    pub fn combine_damping(a: f32, b: f32) -> f32 {
        (a + b) * 0.5
    }

    pub fn rigid() -> Self {
        Self {
            name: "Rigid".to_string(),
            compliance: 0.0,
            static_friction: 0.6,
            dynamic_friction: 0.4,
            restitution: 0.3,
            damping: 0.01,
            density: 2000.0,
        }
    }

    pub fn rubber() -> Self {
        Self {
            name: "Rubber".to_string(),
            compliance: 0.001,
            static_friction: 1.0,
            dynamic_friction: 0.8,
            restitution: 0.9,
            damping: 0.05,
            density: 1100.0,
        }
    }

    pub fn metal() -> Self {
        Self {
            name: "Metal".to_string(),
            compliance: 0.0,
            static_friction: 0.4,
            dynamic_friction: 0.3,
            restitution: 0.5,
            damping: 0.005,
            density: 7800.0,
        }
    }

    pub fn wood() -> Self {
        Self {
            name: "Wood".to_string(),
            compliance: 0.0001,
            static_friction: 0.5,
            dynamic_friction: 0.3,
            restitution: 0.4,
            damping: 0.02,
            density: 600.0,
        }
    }

    pub fn ice() -> Self {
        Self {
            name: "Ice".to_string(),
            compliance: 0.0,
            static_friction: 0.1,
            dynamic_friction: 0.05,
            restitution: 0.2,
            damping: 0.001,
            density: 917.0,
        }
    }

    pub fn cloth() -> Self {
        Self {
            name: "Cloth".to_string(),
            compliance: 0.01,
            static_friction: 0.7,
            dynamic_friction: 0.5,
            restitution: 0.1,
            damping: 0.1,
            density: 200.0,
        }
    }

    pub fn soft() -> Self {
        Self {
            name: "Soft".to_string(),
            compliance: 0.1,
            static_friction: 0.8,
            dynamic_friction: 0.6,
            restitution: 0.2,
            damping: 0.2,
            density: 500.0,
        }
    }

    /// Look up a preset by case-insensitive name.
    pub fn preset(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "rigid" => Some(Self::rigid()),
            "rubber" => Some(Self::rubber()),
            "metal" => Some(Self::metal()),
            "wood" => Some(Self::wood()),
            "ice" => Some(Self::ice()),
            "cloth" => Some(Self::cloth()),
            "soft" => Some(Self::soft()),
            _ => None,
        }
    }
}

impl Default for PhysicsMaterial {
    fn default() -> Self {
        // Water density, rigid surface.
        Self {
            name: "Default".to_string(),
            compliance: 0.0,
            static_friction: 0.6,
            dynamic_friction: 0.4,
            restitution: 0.3,
            damping: 0.01,
            density: 1000.0,
        }
    }
}
