//! Chain-rule derivation of a single tuple's equation.
//!
//! The probability of a tuple is a product over its members, so its derivative
//! is the sum over members `v` of `dv/dt` with the other members held fixed.
//! For each `v` the transitions out of its state give outflows and the
//! transitions into its state give inflows. A contact transition fires through a
//! graph neighbour holding the target state, which joins the source tuple.

use super::params::{ModelParams, TransitionKind};
use super::tuple::Tuple;
use super::vertex::Vertex;
use crate::graph::Graph;
use std::collections::BTreeMap;
use std::fmt;

/// A signed rate contribution. Negative values are outflows.
#[derive(Debug, Clone, PartialEq)]
pub struct Rate {
    pub value: f64,
    pub symbol: Option<String>,
}

impl Rate {
    fn inflow(rate: f64, symbol: &Option<String>) -> Self {
        Self {
            value: rate,
            symbol: symbol.clone(),
        }
    }

    fn outflow(rate: f64, symbol: &Option<String>) -> Self {
        Self {
            value: -rate,
            symbol: symbol.clone(),
        }
    }
}

impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.value < 0.0 { '-' } else { '+' };
        match &self.symbol {
            Some(symbol) => write!(f, "{sign}{symbol}"),
            None => write!(f, "{sign}{}", self.value.abs()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Equation {
    tuple: Tuple,
    /// Source tuple to every contribution it makes. Contributions are not summed.
    terms: BTreeMap<Tuple, Vec<Rate>>,
}

impl Equation {
    pub fn new(tuple: Tuple, model: &ModelParams, graph: &Graph) -> Self {
        let mut terms: BTreeMap<Tuple, Vec<Rate>> = BTreeMap::new();
        let mut push = |source: Tuple, rate: Rate| terms.entry(source).or_default().push(rate);

        for &v in tuple.vertices() {
            let others = tuple.without(&v);
            let neighbours = if v.location < graph.num_vertices() {
                graph.neighbours(v.location)
            } else {
                Vec::new()
            };

            for t in model.exits_from(v.state) {
                let rate = Rate::outflow(t.rate, &t.symbol);
                match t.kind {
                    TransitionKind::Contact => {
                        let held = others.with(v);
                        for &w in &neighbours {
                            push(held.with(Vertex::new(w, t.to)), rate.clone());
                        }
                    }
                    TransitionKind::Spontaneous => push(tuple.clone(), rate),
                }
            }

            for t in model.entries_into(v.state) {
                let rate = Rate::inflow(t.rate, &t.symbol);
                let prior = others.with(v.in_state(t.from));
                match t.kind {
                    TransitionKind::Contact => {
                        for &w in &neighbours {
                            push(prior.with(Vertex::new(w, v.state)), rate.clone());
                        }
                    }
                    TransitionKind::Spontaneous => push(prior, rate),
                }
            }
        }

        terms.retain(|source, _| source.locations_are_different());
        Self { tuple, terms }
    }

    pub fn tuple(&self) -> &Tuple {
        &self.tuple
    }

    pub fn terms(&self) -> &BTreeMap<Tuple, Vec<Rate>> {
        &self.terms
    }

    /// Contributions made by `source`, empty when it does not appear.
    pub fn rates(&self, source: &Tuple) -> &[Rate] {
        self.terms.get(source).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Net coefficient of `source`.
    pub fn coefficient(&self, source: &Tuple) -> f64 {
        self.rates(source).iter().map(|r| r.value).sum()
    }

    pub fn sources(&self) -> impl Iterator<Item = &Tuple> + '_ {
        self.terms.keys()
    }
}

impl fmt::Display for Equation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}=", self.tuple)?;
        let mut first = true;
        for (source, rates) in &self.terms {
            for rate in rates {
                let rendered = rate.to_string();
                let rendered = match rendered.strip_prefix('+') {
                    Some(rest) if first => rest,
                    _ => rendered.as_str(),
                };
                write!(f, "{rendered}{source}")?;
                first = false;
            }
        }
        Ok(())
    }
}
