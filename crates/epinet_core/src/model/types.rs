//! Serializable configuration for compartmental models and ODE assembly.

use serde::{Deserialize, Serialize};

/// Settings controlling which tuples an ODE system tracks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemSettings {
    /// Also track tuples in which every vertex holds the base state.
    #[serde(default)]
    pub closures: bool,
    /// Replace tuples spanning a cut vertex by closures over smaller tuples.
    #[serde(default)]
    pub reduce: bool,
}

/// One `from -> to` transition as written in a model file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionConfig {
    pub from: char,
    pub to: char,
    pub rate: f64,
    /// Printable name for the rate, e.g. `τ`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
}

/// Raw model definition. Converted into `ModelParams` with `TryFrom`, which
/// validates it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    pub states: Vec<char>,
    /// Entry requirement per state: 0 absent, 1 unconditional, 2 neighbour.
    pub to_enter: Vec<u8>,
    /// Exit requirement per state, same encoding as `to_enter`.
    pub to_exit: Vec<u8>,
    #[serde(default)]
    pub transitions: Vec<TransitionConfig>,
}
