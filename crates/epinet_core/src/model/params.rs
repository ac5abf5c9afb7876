//! Compartmental model definitions.
//!
//! A model is an ordered list of states, each with an entry and an exit
//! requirement, plus the rated transitions between them. The first state is the
//! base state (the susceptible compartment in SIR-like models).

use super::types::{ModelConfig, TransitionConfig};
use crate::error::ModelError;
use crate::graph::Graph;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::debug;

/// What a vertex needs in order to enter or leave a state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Requirement {
    /// The state is never entered (or never left) this way.
    Absent,
    /// Happens spontaneously at a fixed rate.
    Unconditional,
    /// Needs an interacting neighbour.
    Neighbour,
}

impl Requirement {
    pub fn code(self) -> u8 {
        match self {
            Requirement::Absent => 0,
            Requirement::Unconditional => 1,
            Requirement::Neighbour => 2,
        }
    }
}

impl TryFrom<u8> for Requirement {
    type Error = ModelError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Requirement::Absent),
            1 => Ok(Requirement::Unconditional),
            2 => Ok(Requirement::Neighbour),
            other => Err(ModelError::InvalidRequirement(other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateBehaviour {
    pub symbol: char,
    pub enter: Requirement,
    pub exit: Requirement,
}

impl StateBehaviour {
    /// States entered unconditionally and never left are fixed by conservation
    /// and get no single-vertex equation.
    pub fn needs_single(&self) -> bool {
        !(self.enter == Requirement::Unconditional && self.exit == Requirement::Absent)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionKind {
    /// Triggered by a neighbour holding the target state.
    Contact,
    Spontaneous,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub from: char,
    pub to: char,
    pub rate: f64,
    pub symbol: Option<String>,
    pub kind: TransitionKind,
}

#[derive(Debug, Clone)]
pub struct ModelParams {
    states: Vec<StateBehaviour>,
    transitions: Vec<Transition>,
    rates: DMatrix<f64>,
    transition_graph: Graph,
    filter_graph: Graph,
}

impl ModelParams {
    pub fn new(states: &[char], to_enter: &[u8], to_exit: &[u8]) -> Result<Self, ModelError> {
        if states.is_empty() {
            return Err(ModelError::NoStates);
        }
        let mut seen = BTreeSet::new();
        if let Some(&dup) = states.iter().find(|&&s| !seen.insert(s)) {
            return Err(ModelError::DuplicateState(dup));
        }
        for (kind, codes) in [("entry", to_enter), ("exit", to_exit)] {
            if codes.len() != states.len() {
                return Err(ModelError::RequirementCount {
                    kind,
                    expected: states.len(),
                    found: codes.len(),
                });
            }
        }

        let states = states
            .iter()
            .zip(to_enter.iter().zip(to_exit))
            .map(|(&symbol, (&enter, &exit))| {
                Ok(StateBehaviour {
                    symbol,
                    enter: Requirement::try_from(enter)?,
                    exit: Requirement::try_from(exit)?,
                })
            })
            .collect::<Result<Vec<_>, ModelError>>()?;

        let n = states.len();
        Ok(Self {
            states,
            transitions: Vec::new(),
            rates: DMatrix::zeros(n, n),
            transition_graph: Graph::new(n, "transitions"),
            filter_graph: Graph::new(n, "filter"),
        })
    }

    /// Standard SIR model with transmission rate `τ` and recovery rate `γ`.
    pub fn sir(tau: f64, gamma: f64) -> Result<Self, ModelError> {
        let mut model = Self::new(&['S', 'I', 'R'], &[0, 2, 1], &[2, 1, 0])?;
        model.add_transition('S', 'I', tau, Some("τ"))?;
        model.add_transition('I', 'R', gamma, Some("γ"))?;
        Ok(model)
    }

    /// Adds or replaces the transition `from -> to`. A zero rate leaves the model
    /// unchanged.
    pub fn add_transition(
        &mut self,
        from: char,
        to: char,
        rate: f64,
        symbol: Option<&str>,
    ) -> Result<(), ModelError> {
        let i = self.index_of(from).ok_or(ModelError::UnknownState(from))?;
        let j = self.index_of(to).ok_or(ModelError::UnknownState(to))?;
        if i == j {
            return Err(ModelError::SelfTransition(from));
        }
        if !rate.is_finite() || rate < 0.0 {
            return Err(ModelError::InvalidRate { from, to, rate });
        }
        if rate == 0.0 {
            debug!(%from, %to, "ignoring zero-rate transition");
            return Ok(());
        }

        let kind = if self.states[j].enter == Requirement::Neighbour
            || self.states[i].exit == Requirement::Neighbour
        {
            TransitionKind::Contact
        } else {
            TransitionKind::Spontaneous
        };

        self.transitions.retain(|t| !(t.from == from && t.to == to));
        self.transitions.push(Transition {
            from,
            to,
            rate,
            symbol: symbol.map(str::to_owned),
            kind,
        });
        self.rates[(i, j)] = rate;
        self.transition_graph.add_weighted_directed_edge(i, j, rate)?;
        if kind == TransitionKind::Contact {
            self.filter_graph.add_weighted_directed_edge(i, j, rate)?;
        }
        Ok(())
    }

    pub fn states(&self) -> &[StateBehaviour] {
        &self.states
    }

    pub fn symbols(&self) -> impl Iterator<Item = char> + '_ {
        self.states.iter().map(|s| s.symbol)
    }

    pub fn index_of(&self, symbol: char) -> Option<usize> {
        self.states.iter().position(|s| s.symbol == symbol)
    }

    pub fn behaviour(&self, symbol: char) -> Option<&StateBehaviour> {
        self.states.iter().find(|s| s.symbol == symbol)
    }

    /// The first state in the list.
    pub fn base_state(&self) -> char {
        self.states[0].symbol
    }

    /// States that get a single-vertex equation, in model order.
    pub fn single_states(&self) -> Vec<char> {
        self.states
            .iter()
            .filter(|s| s.needs_single())
            .map(|s| s.symbol)
            .collect()
    }

    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    pub fn exits_from(&self, state: char) -> impl Iterator<Item = &Transition> + '_ {
        self.transitions.iter().filter(move |t| t.from == state)
    }

    pub fn entries_into(&self, state: char) -> impl Iterator<Item = &Transition> + '_ {
        self.transitions.iter().filter(move |t| t.to == state)
    }

    /// Rate of `from -> to`, zero when there is no such transition.
    pub fn rate(&self, from: char, to: char) -> f64 {
        match (self.index_of(from), self.index_of(to)) {
            (Some(i), Some(j)) => self.rates[(i, j)],
            _ => 0.0,
        }
    }

    pub fn rate_matrix(&self) -> &DMatrix<f64> {
        &self.rates
    }

    /// Directed graph over state indices, weighted by rate.
    pub fn transition_graph(&self) -> &Graph {
        &self.transition_graph
    }

    /// The transition graph restricted to contact transitions.
    pub fn filter_graph(&self) -> &Graph {
        &self.filter_graph
    }
}

impl TryFrom<ModelConfig> for ModelParams {
    type Error = ModelError;

    fn try_from(config: ModelConfig) -> Result<Self, Self::Error> {
        let mut model = Self::new(&config.states, &config.to_enter, &config.to_exit)?;
        for t in &config.transitions {
            model.add_transition(t.from, t.to, t.rate, t.symbol.as_deref())?;
        }
        Ok(model)
    }
}

impl From<&ModelParams> for ModelConfig {
    fn from(model: &ModelParams) -> Self {
        ModelConfig {
            states: model.symbols().collect(),
            to_enter: model.states.iter().map(|s| s.enter.code()).collect(),
            to_exit: model.states.iter().map(|s| s.exit.code()).collect(),
            transitions: model
                .transitions
                .iter()
                .map(|t| TransitionConfig {
                    from: t.from,
                    to: t.to,
                    rate: t.rate,
                    symbol: t.symbol.clone(),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sir_model() {
        let model = ModelParams::sir(0.8, 0.1).unwrap();
        assert_eq!(model.base_state(), 'S');
        assert_eq!(model.single_states(), vec!['S', 'I']);
        assert_eq!(model.rate('S', 'I'), 0.8);
        assert_eq!(model.rate('I', 'S'), 0.0);
        assert_eq!(model.rate('S', 'X'), 0.0);

        let kinds: Vec<_> = model.transitions().iter().map(|t| t.kind).collect();
        assert_eq!(kinds, vec![TransitionKind::Contact, TransitionKind::Spontaneous]);

        assert_eq!(model.transition_graph().num_edges(), 2);
        assert!(model.transition_graph().has_directed_edge(1, 2));
        assert_eq!(model.filter_graph().num_edges(), 1);
        assert_eq!(model.filter_graph().weight(0, 1), Some(0.8));
    }

    #[test]
    fn test_invalid_definitions() {
        assert_eq!(ModelParams::new(&[], &[], &[]).unwrap_err(), ModelError::NoStates);
        assert_eq!(
            ModelParams::new(&['S', 'S'], &[0, 0], &[0, 0]).unwrap_err(),
            ModelError::DuplicateState('S')
        );
        assert_eq!(
            ModelParams::new(&['S', 'I'], &[0], &[0, 0]).unwrap_err(),
            ModelError::RequirementCount {
                kind: "entry",
                expected: 2,
                found: 1
            }
        );
        assert_eq!(
            ModelParams::new(&['S', 'I'], &[0, 3], &[0, 0]).unwrap_err(),
            ModelError::InvalidRequirement(3)
        );
    }

    #[test]
    fn test_invalid_transitions() {
        let mut model = ModelParams::new(&['S', 'I'], &[1, 2], &[2, 1]).unwrap();
        assert_eq!(
            model.add_transition('S', 'Q', 1.0, None),
            Err(ModelError::UnknownState('Q'))
        );
        assert_eq!(
            model.add_transition('I', 'I', 1.0, None),
            Err(ModelError::SelfTransition('I'))
        );
        assert!(matches!(
            model.add_transition('I', 'S', f64::NAN, None),
            Err(ModelError::InvalidRate { .. })
        ));
        assert!(model.transitions().is_empty());
    }

    #[test]
    fn test_zero_rate_and_replacement() {
        let mut model = ModelParams::new(&['S', 'I'], &[1, 2], &[2, 1]).unwrap();
        model.add_transition('S', 'I', 0.0, None).unwrap();
        assert!(model.transitions().is_empty());

        model.add_transition('S', 'I', 0.5, None).unwrap();
        model.add_transition('S', 'I', 0.7, Some("β")).unwrap();
        model.add_transition('I', 'S', 0.2, None).unwrap();
        assert_eq!(model.transitions().len(), 2);
        assert_eq!(model.rate('S', 'I'), 0.7);
        assert_eq!(model.exits_from('S').count(), 1);
        assert_eq!(model.entries_into('S').next().map(|t| t.kind), Some(TransitionKind::Spontaneous));
        // SIS: both states need their own single-vertex equation.
        assert_eq!(model.single_states(), vec!['S', 'I']);

        let transitions = model.transition_graph();
        assert!(transitions.has_directed_edge(0, 1) && transitions.has_directed_edge(1, 0));
        assert_eq!(transitions.weight(0, 1), Some(0.7));
        assert_eq!(transitions.weight(1, 0), Some(0.2));
        assert_eq!(transitions.count_walks(2), 2);
        assert!(model.filter_graph().has_directed_edge(0, 1));
        assert!(!model.filter_graph().has_directed_edge(1, 0));
    }

    #[test]
    fn test_config_round_trip() {
        let json = r#"{
            "states": ["S", "I", "R"],
            "to_enter": [0, 2, 1],
            "to_exit": [2, 1, 0],
            "transitions": [
                {"from": "S", "to": "I", "rate": 0.8, "symbol": "τ"},
                {"from": "I", "to": "R", "rate": 0.1}
            ]
        }"#;
        let config: ModelConfig = serde_json::from_str(json).unwrap();
        let model = ModelParams::try_from(config.clone()).unwrap();
        assert_eq!(model.rate('I', 'R'), 0.1);
        assert_eq!(model.transitions()[0].symbol.as_deref(), Some("τ"));
        assert_eq!(ModelConfig::from(&model), config);

        let bad = ModelConfig {
            transitions: vec![TransitionConfig {
                from: 'S',
                to: 'Z',
                rate: 1.0,
                symbol: None,
            }],
            ..config
        };
        assert_eq!(
            ModelParams::try_from(bad).unwrap_err(),
            ModelError::UnknownState('Z')
        );
    }
}
