//! Net data model: places, transitions, guards, arcs and firing results.
//!
//! Every [`Vector`] is dense and indexed by [`Place::offset`]. A transition's
//! `delta` is the authoritative effect of firing it; the arc list on a
//! [`Net`](crate::net::Net) is a derived view.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Token counts, capacities or signed per-place effects, one slot per place.
pub type Vector = Vec<i64>;

/// Label of the role assigned to transitions that do not name one.
pub const DEFAULT_ROLE: &str = "default";

/// Net semantics selecting validation and commit rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum NetType {
    /// Classic place/transition net; raw token counts.
    #[default]
    #[serde(rename = "petriNet", alias = "general")]
    General,
    /// Safety net: 0/1 tokens, one token in flight.
    #[serde(rename = "elementary")]
    Elementary,
    /// Workflow net: saturated 0/1 output, optional reentry.
    #[serde(rename = "workflow")]
    Workflow,
}

impl fmt::Display for NetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetType::General => f.write_str("petriNet"),
            NetType::Elementary => f.write_str("elementary"),
            NetType::Workflow => f.write_str("workflow"),
        }
    }
}

impl std::str::FromStr for NetType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "petriNet" | "general" => Ok(NetType::General),
            "elementary" => Ok(NetType::Elementary),
            "workflow" => Ok(NetType::Workflow),
            other => Err(format!("unknown net type: {}", other)),
        }
    }
}

/// Opaque layout metadata. Stored and exported, never interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A role groups transitions by actor. Purely descriptive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(pub String);

impl Role {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Role {
    fn default() -> Self {
        Self(DEFAULT_ROLE.to_string())
    }
}

/// A labeled token counter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub label: String,
    /// Dense index of this place in every vector.
    pub offset: usize,
    pub initial: i64,
    /// Upper bound on tokens; 0 means unbounded.
    pub capacity: i64,
    pub position: Position,
}

/// Inhibitor predicate on a single place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Guard {
    /// Label of the inspected place.
    pub label: String,
    /// Single non-zero (negative) slot at the inspected place's offset.
    pub delta: Vector,
    /// Reverse inhibitor: blocks until the threshold is reached.
    #[serde(default)]
    pub inverted: bool,
}

impl Guard {
    /// Builds a guard on the place at `offset` with the given threshold.
    pub fn new(label: impl Into<String>, width: usize, offset: usize, weight: i64, inverted: bool) -> Self {
        let mut delta = vec![0; width];
        delta[offset] = -weight;
        Self {
            label: label.into(),
            delta,
            inverted,
        }
    }

    /// Returns `(offset, threshold)` of the inspected slot, if any.
    pub fn threshold(&self) -> Option<(usize, i64)> {
        self.delta
            .iter()
            .enumerate()
            .find(|(_, d)| **d != 0)
            .map(|(i, d)| (i, -d))
    }
}

/// A guarded state-change operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transition {
    pub label: String,
    pub role: Role,
    pub position: Position,
    /// Signed effect per place: positive produces, negative consumes.
    pub delta: Vector,
    /// Guards keyed by inspected place label.
    pub guards: IndexMap<String, Guard>,
    /// Workflow nets only: output may re-mark an occupied place.
    pub allow_reentry: bool,
}

impl Transition {
    pub fn new(label: impl Into<String>, role: Role, position: Position, width: usize) -> Self {
        Self {
            label: label.into(),
            role,
            position,
            delta: vec![0; width],
            guards: IndexMap::new(),
            allow_reentry: false,
        }
    }
}

/// One endpoint of an arc.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Node {
    Place(String),
    Transition(String),
}

impl Node {
    pub fn label(&self) -> &str {
        match self {
            Node::Place(label) | Node::Transition(label) => label,
        }
    }

    pub fn is_place(&self) -> bool {
        matches!(self, Node::Place(_))
    }

    pub fn is_transition(&self) -> bool {
        matches!(self, Node::Transition(_))
    }
}

/// Authoring-time edge between a place and a transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Arc {
    /// Position in the net's arc sequence.
    pub offset: usize,
    pub source: Node,
    pub target: Node,
    pub weight: i64,
    #[serde(default)]
    pub inhibit: bool,
    /// Inhibitor arc drawn transition -> place (reverse guard).
    #[serde(default)]
    pub inverted: bool,
    #[serde(default)]
    pub reentry: bool,
}

impl Arc {
    /// Returns `(place, transition)` labels when the arc joins one of each.
    pub fn endpoints(&self) -> Option<(&str, &str)> {
        match (&self.source, &self.target) {
            (Node::Place(p), Node::Transition(t)) | (Node::Transition(t), Node::Place(p)) => {
                Some((p.as_str(), t.as_str()))
            }
            _ => None,
        }
    }

    /// Returns whether the arc flows from a transition into a place.
    pub fn is_output(&self) -> bool {
        self.source.is_transition() && self.target.is_place()
    }

    pub fn touches(&self, node: &Node) -> bool {
        &self.source == node || &self.target == node
    }
}

/// Outcome of a (test) firing.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FireResult {
    /// Resulting vector; raw counts for general/elementary nets, saturated
    /// 0/1 marking for workflow nets. Empty when inhibited.
    pub out: Vector,
    pub ok: bool,
    pub role: String,
    #[serde(default)]
    pub inhibited: bool,
    #[serde(default)]
    pub overflow: bool,
    #[serde(default)]
    pub underflow: bool,
}
