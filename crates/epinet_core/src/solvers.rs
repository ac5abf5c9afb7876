//! Fixed-step integration of an ODE system.
//!
//! `RK4` is the reference stepper used to check that reduced systems track the
//! exact ones. Anything implementing `DynamicalSystem` can be stepped.

use crate::traits::{lift, DynamicalSystem, Scalar, Steppable};
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

/// Classic fourth order Runge-Kutta stepper with preallocated stage buffers.
pub struct RK4<T: Scalar> {
    k1: Vec<T>,
    k2: Vec<T>,
    k3: Vec<T>,
    k4: Vec<T>,
    tmp: Vec<T>,
}

impl<T: Scalar> RK4<T> {
    pub fn new(dim: usize) -> Self {
        let z = T::zero();
        Self {
            k1: vec![z; dim],
            k2: vec![z; dim],
            k3: vec![z; dim],
            k4: vec![z; dim],
            tmp: vec![z; dim],
        }
    }
}

/// tmp = y + h * k
fn offset<T: Scalar>(tmp: &mut [T], y: &[T], k: &[T], h: T) {
    for ((out, &yi), &ki) in tmp.iter_mut().zip(y).zip(k) {
        *out = yi + h * ki;
    }
}

impl<T: Scalar> Steppable<T> for RK4<T> {
    fn step(&mut self, system: &impl DynamicalSystem<T>, t: &mut T, state: &mut [T], dt: T) {
        let half = dt * lift::<T>(0.5);
        let sixth = dt / lift::<T>(6.0);
        let two = lift::<T>(2.0);
        let t0 = *t;

        system.apply(t0, state, &mut self.k1);
        offset(&mut self.tmp, state, &self.k1, half);
        system.apply(t0 + half, &self.tmp, &mut self.k2);
        offset(&mut self.tmp, state, &self.k2, half);
        system.apply(t0 + half, &self.tmp, &mut self.k3);
        offset(&mut self.tmp, state, &self.k3, dt);
        system.apply(t0 + dt, &self.tmp, &mut self.k4);

        for (i, y) in state.iter_mut().enumerate() {
            *y = *y + sixth * (self.k1[i] + two * self.k2[i] + two * self.k3[i] + self.k4[i]);
        }
        *t = t0 + dt;
    }
}

/// Sampled solution of an ODE system, one row per time point.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    pub times: Vec<f64>,
    pub states: Vec<Vec<f64>>,
}

impl Trajectory {
    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub fn last(&self) -> Option<&[f64]> {
        self.states.last().map(Vec::as_slice)
    }

    /// Values of one state variable over time.
    pub fn column(&self, index: usize) -> Vec<f64> {
        self.states
            .iter()
            .filter_map(|row| row.get(index).copied())
            .collect()
    }
}

/// Integrates `system` from `y0` at `t0` with `steps` RK4 steps of size `dt`.
/// The trajectory holds the initial point plus one row per step.
#[instrument(skip_all, fields(dim = system.dimension(), steps = steps, dt = dt))]
pub fn integrate(
    system: &impl DynamicalSystem<f64>,
    y0: &[f64],
    t0: f64,
    dt: f64,
    steps: usize,
) -> Result<Trajectory> {
    if y0.len() != system.dimension() {
        bail!(
            "Initial state has dimension {}, system has dimension {}",
            y0.len(),
            system.dimension()
        );
    }
    if !dt.is_finite() || dt <= 0.0 {
        bail!("Step size must be positive and finite, got {}", dt);
    }

    let mut solver = RK4::new(y0.len());
    let mut t = t0;
    let mut state = y0.to_vec();
    let mut trajectory = Trajectory {
        times: Vec::with_capacity(steps + 1),
        states: Vec::with_capacity(steps + 1),
    };
    trajectory.times.push(t);
    trajectory.states.push(state.clone());

    for _ in 0..steps {
        solver.step(system, &mut t, &mut state, dt);
        if state.iter().any(|v| !v.is_finite()) {
            bail!("Integration diverged at t = {}", t);
        }
        trajectory.times.push(t);
        trajectory.states.push(state.clone());
    }

    debug!(t_end = t, "integration finished");
    Ok(trajectory)
}
