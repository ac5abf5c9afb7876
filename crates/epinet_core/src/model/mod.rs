//! Compartmental epidemic models on contact networks.
//!
//! Data flows one way: a `Graph` and `ModelParams` give `RequiredTuples`, each
//! required tuple gets an `Equation`, and `OdeSystem` assembles them (optionally
//! reduced at cut vertices) into a vector field any `Steppable` can integrate.

pub mod bound;
pub mod equation;
pub mod ode;
pub mod params;
pub mod reduction;
pub mod required;
pub mod tuple;
pub mod types;
pub mod vertex;

pub use bound::upper_bound;
pub use equation::{Equation, Rate};
pub use ode::OdeSystem;
pub use params::{ModelParams, Requirement, StateBehaviour, Transition, TransitionKind};
pub use reduction::{reduce, Closure, Reduction};
pub use required::RequiredTuples;
pub use tuple::Tuple;
pub use types::{ModelConfig, SystemSettings, TransitionConfig};
pub use vertex::Vertex;
