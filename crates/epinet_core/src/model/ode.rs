//! Assembled ODE systems.
//!
//! Every tracked tuple owns one row. Contributions from tracked tuples form a
//! sparse linear operator; contributions from closed tuples are evaluated from
//! their factors on every call.

use super::equation::Equation;
use super::params::ModelParams;
use super::reduction::{self, Closure};
use super::required::RequiredTuples;
use super::tuple::Tuple;
use super::types::SystemSettings;
use crate::graph::Graph;
use crate::traits::{lift, DynamicalSystem, Scalar};
use anyhow::{anyhow, bail, Result};
use nalgebra_sparse::{CooMatrix, CsrMatrix};
use std::collections::HashMap;
use std::fmt;
use tracing::{info, instrument};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Source {
    Tracked(usize),
    Closed(usize),
}

/// Closure formula over resolved sources.
#[derive(Debug, Clone)]
struct ClosureRule {
    factors: Vec<Source>,
    denominator: Source,
    power: i32,
}

/// A contribution to `row` from the value of closure `closure`.
#[derive(Debug, Clone)]
struct ClosedTerm {
    row: usize,
    closure: usize,
    coefficient: f64,
}

#[derive(Debug, Clone)]
pub struct OdeSystem {
    equations: Vec<Equation>,
    /// Ordered so that every closure only depends on earlier ones.
    closures: Vec<Closure>,
    index: HashMap<Tuple, usize>,
    linear: CsrMatrix<f64>,
    rules: Vec<ClosureRule>,
    closed_terms: Vec<ClosedTerm>,
}

impl OdeSystem {
    /// Enumerates the required tuples of `graph` under `model`, derives their
    /// equations and, when asked to, reduces the system at cut vertices.
    #[instrument(skip_all, fields(graph = graph.name(), closures = settings.closures, reduce = settings.reduce))]
    pub fn new(graph: &Graph, model: &ModelParams, settings: SystemSettings) -> Result<Self> {
        let required = RequiredTuples::new(graph, model, settings.closures);
        let system = if settings.reduce {
            let reduced = reduction::reduce(graph, model, &required);
            Self::from_equations(reduced.equations, reduced.closures)?
        } else {
            let equations = required
                .iter()
                .map(|t| Equation::new(t.clone(), model, graph))
                .collect();
            Self::from_equations(equations, Vec::new())?
        };
        info!(
            equations = system.dimension(),
            closures = system.closures.len(),
            "assembled ODE system"
        );
        Ok(system)
    }

    /// Assembles a system from derived equations and closures. Fails when an
    /// equation or closure refers to a tuple that is neither tracked nor closed.
    pub fn from_equations(mut equations: Vec<Equation>, mut closures: Vec<Closure>) -> Result<Self> {
        equations.sort_by(|a, b| a.tuple().cmp(b.tuple()));
        let index: HashMap<Tuple, usize> = equations
            .iter()
            .enumerate()
            .map(|(i, eq)| (eq.tuple().clone(), i))
            .collect();
        if index.len() != equations.len() {
            bail!("Two equations were given for the same tuple.");
        }

        // Factors are strictly smaller than the tuple they close.
        closures.sort_by(|a, b| a.tuple.cmp(&b.tuple));
        let closed_index: HashMap<Tuple, usize> = closures
            .iter()
            .enumerate()
            .map(|(i, c)| (c.tuple.clone(), i))
            .collect();
        if closed_index.len() != closures.len() {
            bail!("Two closures were given for the same tuple.");
        }
        if let Some(both) = closures.iter().find(|c| index.contains_key(&c.tuple)) {
            bail!("Tuple {} is both tracked and closed.", both.tuple);
        }

        let resolve = |tuple: &Tuple| -> Result<Source> {
            index
                .get(tuple)
                .map(|&i| Source::Tracked(i))
                .or_else(|| closed_index.get(tuple).map(|&i| Source::Closed(i)))
                .ok_or_else(|| anyhow!("Tuple {} is neither tracked nor closed.", tuple))
        };

        let mut rules = Vec::with_capacity(closures.len());
        for (position, closure) in closures.iter().enumerate() {
            let factors = closure
                .factors
                .iter()
                .map(&resolve)
                .collect::<Result<Vec<_>>>()?;
            let denominator = resolve(&closure.denominator)?;
            let later = factors
                .iter()
                .chain(std::iter::once(&denominator))
                .any(|s| matches!(*s, Source::Closed(j) if j >= position));
            if later {
                bail!("Closure of {} depends on a closure that is not smaller.", closure.tuple);
            }
            rules.push(ClosureRule {
                factors,
                denominator,
                power: closure.power(),
            });
        }

        let n = equations.len();
        let mut coo = CooMatrix::new(n, n);
        let mut closed_terms = Vec::new();
        for (row, equation) in equations.iter().enumerate() {
            for source in equation.sources() {
                let coefficient = equation.coefficient(source);
                match resolve(source)? {
                    Source::Tracked(col) => coo.push(row, col, coefficient),
                    Source::Closed(closure) => closed_terms.push(ClosedTerm {
                        row,
                        closure,
                        coefficient,
                    }),
                }
            }
        }

        Ok(Self {
            equations,
            closures,
            index,
            linear: CsrMatrix::from(&coo),
            rules,
            closed_terms,
        })
    }

    pub fn dimension(&self) -> usize {
        self.equations.len()
    }

    /// Row of `tuple`, if it is tracked.
    pub fn index_of(&self, tuple: &Tuple) -> Option<usize> {
        self.index.get(tuple).copied()
    }

    pub fn tuple(&self, index: usize) -> Option<&Tuple> {
        self.equations.get(index).map(Equation::tuple)
    }

    /// Tracked tuples in row order.
    pub fn tuples(&self) -> impl Iterator<Item = &Tuple> + '_ {
        self.equations.iter().map(Equation::tuple)
    }

    pub fn equations(&self) -> &[Equation] {
        &self.equations
    }

    pub fn closures(&self) -> &[Closure] {
        &self.closures
    }

    /// Sparse operator holding the contributions of tracked tuples.
    pub fn linear_part(&self) -> &CsrMatrix<f64> {
        &self.linear
    }

    /// Deterministic initial condition: a tuple is 1 when every member's state
    /// matches `assignment[location]` and 0 otherwise.
    pub fn initial_state(&self, assignment: &[char]) -> Vec<f64> {
        self.tuples()
            .map(|t| {
                let holds = t
                    .vertices()
                    .iter()
                    .all(|v| assignment.get(v.location) == Some(&v.state));
                if holds {
                    1.0
                } else {
                    0.0
                }
            })
            .collect()
    }

    /// Derivative at `(t, y)`.
    pub fn compute_derivatives(&self, t: f64, y: &[f64]) -> Result<Vec<f64>> {
        if y.len() != self.dimension() {
            bail!(
                "State has dimension {}, system has dimension {}",
                y.len(),
                self.dimension()
            );
        }
        Ok(<Self as DynamicalSystem<f64>>::evaluate(self, t, y))
    }

    fn closure_values<T: Scalar>(&self, x: &[T]) -> Vec<T> {
        let mut values: Vec<T> = Vec::with_capacity(self.rules.len());
        for rule in &self.rules {
            let value_of = |s: Source| match s {
                Source::Tracked(i) => x[i],
                Source::Closed(j) => values[j],
            };
            let denominator = value_of(rule.denominator);
            let value = if denominator == T::zero() {
                T::zero()
            } else {
                let numerator = rule
                    .factors
                    .iter()
                    .fold(T::one(), |acc, &f| acc * value_of(f));
                numerator / denominator.powi(rule.power)
            };
            values.push(value);
        }
        values
    }
}

impl<T: Scalar> DynamicalSystem<T> for OdeSystem {
    fn dimension(&self) -> usize {
        self.equations.len()
    }

    fn apply(&self, _t: T, x: &[T], out: &mut [T]) {
        let closed = self.closure_values(x);
        for (row, slot) in out.iter_mut().enumerate() {
            let lane = self.linear.row(row);
            *slot = lane
                .col_indices()
                .iter()
                .zip(lane.values())
                .fold(T::zero(), |acc, (&col, &rate)| acc + lift::<T>(rate) * x[col]);
        }
        for term in &self.closed_terms {
            out[term.row] = out[term.row] + lift::<T>(term.coefficient) * closed[term.closure];
        }
    }
}

impl fmt::Display for OdeSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for equation in &self.equations {
            writeln!(f, "{equation}")?;
        }
        for closure in &self.closures {
            writeln!(f, "{closure}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::generators;
    use crate::model::Vertex;
    use crate::solvers::integrate;

    fn sir() -> ModelParams {
        ModelParams::sir(0.8, 0.1).unwrap()
    }

    fn tuple(members: &[(usize, char)]) -> Tuple {
        Tuple::new(members.iter().map(|&(l, s)| Vertex::new(l, s)))
    }

    const REDUCE: SystemSettings = SystemSettings {
        closures: false,
        reduce: true,
    };

    #[test]
    fn test_full_systems_are_closed() {
        for g in [
            generators::triangle(),
            generators::lollipop(),
            generators::bow_tie(),
            generators::path(5),
        ] {
            let system = OdeSystem::new(&g, &sir(), SystemSettings::default()).unwrap();
            for equation in system.equations() {
                for source in equation.sources() {
                    assert!(system.index_of(source).is_some(), "{} in {}", source, g.name());
                }
            }
            assert!(system.closures().is_empty());
        }
    }

    #[test]
    fn test_index_is_a_bijection() {
        let system = OdeSystem::new(&generators::lollipop(), &sir(), SystemSettings::default()).unwrap();
        assert_eq!(system.dimension(), 48);
        for (i, t) in system.tuples().enumerate() {
            assert_eq!(system.index_of(t), Some(i));
            assert_eq!(system.tuple(i), Some(t));
        }
        assert_eq!(system.tuple(48), None);
    }

    #[test]
    fn test_triangle_derivative() {
        let system = OdeSystem::new(&generators::triangle(), &sir(), SystemSettings::default()).unwrap();
        let y = system.initial_state(&['S', 'S', 'I']);
        assert_eq!(y.iter().filter(|&&v| v == 1.0).count(), 6);

        let dy = system.compute_derivatives(0.0, &y).unwrap();
        let at = |members: &[(usize, char)]| dy[system.index_of(&tuple(members)).unwrap()];
        assert!((at(&[(0, 'S')]) + 0.8).abs() < 1e-12);
        assert!((at(&[(0, 'I')]) - 0.8).abs() < 1e-12);
        assert!((at(&[(2, 'I')]) + 0.1).abs() < 1e-12);
        assert!((at(&[(0, 'S'), (2, 'I')]) + 0.9).abs() < 1e-12);
        assert!((at(&[(0, 'S'), (1, 'S'), (2, 'I')]) + 1.7).abs() < 1e-12);
        assert!((at(&[(0, 'I'), (1, 'S'), (2, 'I')]) - 0.8).abs() < 1e-12);
        assert!((at(&[(0, 'I'), (1, 'S')]) - 0.8).abs() < 1e-12);
        assert!((at(&[(1, 'S'), (2, 'I')]) + 0.9).abs() < 1e-12);

        assert!(system.compute_derivatives(0.0, &y[1..]).is_err());
    }

    #[test]
    fn test_lollipop_reduction() {
        let system = OdeSystem::new(&generators::lollipop(), &sir(), REDUCE).unwrap();
        assert_eq!(system.dimension(), 39);
        assert_eq!(system.closures().len(), 13);
        assert!(system.index_of(&tuple(&[(0, 'S'), (1, 'I'), (3, 'I')])).is_none());
        assert!(system.index_of(&tuple(&[(0, 'S'), (1, 'S'), (2, 'S')])).is_some());
        assert_eq!(system.to_string().lines().count(), 39 + 13);
    }

    #[test]
    fn test_reduced_system_tracks_exact_singles() {
        let g = generators::lollipop();
        let full = OdeSystem::new(&g, &sir(), SystemSettings::default()).unwrap();
        let reduced = OdeSystem::new(&g, &sir(), REDUCE).unwrap();

        for assignment in [['S', 'S', 'S', 'I'], ['I', 'S', 'S', 'S'], ['S', 'I', 'S', 'S']] {
            let a = integrate(&full, &full.initial_state(&assignment), 0.0, 0.01, 1000).unwrap();
            let b = integrate(&reduced, &reduced.initial_state(&assignment), 0.0, 0.01, 1000).unwrap();
            let (a, b) = (a.last().unwrap(), b.last().unwrap());
            for location in 0..4 {
                for state in ['S', 'I'] {
                    let single = Tuple::single(Vertex::new(location, state));
                    let exact = a[full.index_of(&single).unwrap()];
                    let closed = b[reduced.index_of(&single).unwrap()];
                    assert!((exact - closed).abs() < 1e-9, "{single} from {assignment:?}");
                }
            }
        }
    }

    #[test]
    fn test_missing_tuple_is_fatal() {
        let g = generators::triangle();
        let model = sir();
        let singles: Vec<Equation> = RequiredTuples::new(&g, &model, false)
            .singles()
            .map(|t| Equation::new(t.clone(), &model, &g))
            .collect();
        let err = OdeSystem::from_equations(singles, Vec::new()).unwrap_err();
        assert!(err.to_string().contains("neither tracked nor closed"));
    }

    #[test]
    fn test_zero_denominator_closes_to_zero() {
        let g = generators::star(3);
        let model = sir();
        let closure = Closure {
            tuple: tuple(&[(0, 'S'), (1, 'I'), (2, 'I')]),
            factors: vec![tuple(&[(0, 'S'), (1, 'I')]), tuple(&[(0, 'S'), (2, 'I')])],
            denominator: tuple(&[(0, 'S')]),
        };
        let equations: Vec<Equation> = [
            tuple(&[(0, 'S')]),
            tuple(&[(0, 'S'), (1, 'I')]),
            tuple(&[(0, 'S'), (2, 'I')]),
        ]
        .into_iter()
        .map(|t| Equation::new(t, &model, &g))
        .collect();
        let system = OdeSystem::from_equations(equations, vec![closure]).unwrap();

        assert_eq!(system.closure_values(&[0.0, 0.5, 0.5]), vec![0.0]);
        assert_eq!(system.closure_values(&[0.5, 0.25, 0.5]), vec![0.25]);
    }
}
