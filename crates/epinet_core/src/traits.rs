//! Numeric seams between assembled ODE systems and the integrators that drive them.

use num_traits::{Float, FromPrimitive};
use std::fmt::Debug;

/// Floating point types an ODE system can be evaluated over.
pub trait Scalar: Float + FromPrimitive + Debug + 'static {}

impl<T: Float + FromPrimitive + Debug + 'static> Scalar for T {}

/// Converts an `f64` constant (a rate, a step size) into the scalar type.
/// Every `Float` type can represent an `f64`, so the NaN fallback is unreachable
/// for the types this crate is used with.
pub fn lift<T: Scalar>(value: f64) -> T {
    T::from_f64(value).unwrap_or_else(T::nan)
}

/// An autonomous or time-dependent system `dx/dt = f(t, x)`.
pub trait DynamicalSystem<T: Scalar> {
    /// Number of state variables.
    fn dimension(&self) -> usize;

    /// Writes `f(t, x)` into `out`, overwriting whatever it held.
    fn apply(&self, t: T, x: &[T], out: &mut [T]);

    /// Allocating form of [`DynamicalSystem::apply`].
    fn evaluate(&self, t: T, x: &[T]) -> Vec<T> {
        let mut out = vec![T::zero(); self.dimension()];
        self.apply(t, x, &mut out);
        out
    }
}

/// Fixed-step integrators.
pub trait Steppable<T: Scalar> {
    /// Advances `state` from `t` to `t + dt`, updating both in place.
    fn step(&mut self, system: &impl DynamicalSystem<T>, t: &mut T, state: &mut [T], dt: T);
}
