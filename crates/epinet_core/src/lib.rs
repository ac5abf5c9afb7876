//! The `epinet_core` crate generates the ODE systems describing compartmental
//! epidemics (SIR and friends) on fixed contact networks.
//!
//! Key components:
//! - **Graph**: contact networks with cut-vertex search and biconnected splicing.
//! - **Model**: states and transitions, required-tuple enumeration, chain-rule
//!   equations, closure-based reduction and the assembled `OdeSystem`.
//! - **Traits**: `Scalar`, `DynamicalSystem` and `Steppable`, shared with the solvers.
//! - **Solvers**: a fixed-step RK4 integrator producing `Trajectory` samples.

pub mod error;
pub mod graph;
pub mod model;
pub mod solvers;
pub mod traits;

pub use error::{GraphError, ModelError};
pub use graph::Graph;
pub use model::{ModelParams, OdeSystem, RequiredTuples, SystemSettings, Tuple, Vertex};
