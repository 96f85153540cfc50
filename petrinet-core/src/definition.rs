//! Net definitions: the declarative object and the procedural builder.
//!
//! Declarations use a versioned JSON object:
//!
//! ```json
//! {
//!   "netType": "petriNet",
//!   "version": "v0",
//!   "places": { "foo": { "initial": 1, "x": 480, "y": 160 } },
//!   "transitions": { "bar": { "x": 400, "y": 320 }, "baz": { "role": "admin", "x": 560, "y": 320 } },
//!   "arcs": [
//!     { "source": "foo", "target": "bar", "weight": 1 },
//!     { "source": "foo", "target": "baz", "weight": 1, "inhibit": true }
//!   ]
//! }
//! ```
//!
//! Arc direction follows from whether `source` names a place or a transition.
//! An inhibit arc drawn place -> transition is a standard guard, drawn
//! transition -> place it is a reverse guard.

use crate::error::CoreError;
use crate::model::{NetType, Node, Place, Position, Role, Transition, DEFAULT_ROLE};
use crate::net::Net;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// The only declaration version this crate reads and writes.
pub const DECLARATION_VERSION: &str = "v0";

fn is_zero(n: &i64) -> bool {
    *n == 0
}

fn is_false(b: &bool) -> bool {
    !*b
}

/// A place entry in a declaration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PlaceDecl {
    #[serde(default, skip_serializing_if = "is_zero")]
    pub initial: i64,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub capacity: i64,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
}

/// A transition entry in a declaration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TransitionDecl {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
}

/// An arc entry in a declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArcDecl {
    pub source: String,
    pub target: String,
    pub weight: i64,
    #[serde(default, skip_serializing_if = "is_false")]
    pub inhibit: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub reentry: bool,
}

/// Declarative net description as stored/transmitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Declaration {
    #[serde(rename = "netType", alias = "modelType", default)]
    pub net_type: NetType,
    pub version: String,
    /// Places in document order; this order assigns offsets.
    #[serde(default)]
    pub places: IndexMap<String, PlaceDecl>,
    #[serde(default)]
    pub transitions: IndexMap<String, TransitionDecl>,
    #[serde(default)]
    pub arcs: Vec<ArcDecl>,
}

impl Declaration {
    /// An empty declaration at the supported version.
    pub fn new(net_type: NetType) -> Self {
        Self {
            net_type,
            version: DECLARATION_VERSION.to_string(),
            places: IndexMap::new(),
            transitions: IndexMap::new(),
            arcs: Vec::new(),
        }
    }

    /// Parses a declaration and checks its version.
    pub fn from_json_str(json: &str) -> Result<Self, CoreError> {
        let decl: Declaration = serde_json::from_str(json)?;
        decl.check_version()?;
        Ok(decl)
    }

    /// Parses a declaration from a JSON value and checks its version.
    pub fn from_json(json: &serde_json::Value) -> Result<Self, CoreError> {
        let decl: Declaration = serde_json::from_value(json.clone())?;
        decl.check_version()?;
        Ok(decl)
    }

    pub fn check_version(&self) -> Result<(), CoreError> {
        if self.version != DECLARATION_VERSION {
            return Err(CoreError::VersionMismatch {
                expected: DECLARATION_VERSION.to_string(),
                found: self.version.clone(),
            });
        }
        Ok(())
    }

    pub fn to_json(&self) -> Result<serde_json::Value, CoreError> {
        Ok(serde_json::to_value(self)?)
    }

    /// CRC32C of the canonical JSON encoding.
    pub fn checksum(&self) -> Result<String, CoreError> {
        let json_bytes = serde_json::to_vec(self)?;
        Ok(format!("{:08x}", crc32c::crc32c(&json_bytes)))
    }
}

/// Handle to a place created through [`Dsl::place`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceNode {
    pub label: String,
}

/// Handle to a transition created through [`Dsl::transition`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionNode {
    pub label: String,
}

impl From<&PlaceNode> for Node {
    fn from(node: &PlaceNode) -> Self {
        Node::Place(node.label.clone())
    }
}

impl From<&TransitionNode> for Node {
    fn from(node: &TransitionNode) -> Self {
        Node::Transition(node.label.clone())
    }
}

/// Procedural net builder handed to [`Net::build`].
///
/// Constructors append entities in call order; arcs are indexed once the
/// declaration function returns.
pub struct Dsl {
    net: Net,
}

impl Dsl {
    pub fn net_type(&self) -> NetType {
        self.net.net_type
    }

    /// Registers a role (idempotent) and returns it.
    pub fn role(&mut self, label: &str) -> Role {
        self.net.ensure_role(label)
    }

    /// Appends a place at the next offset.
    pub fn place(
        &mut self,
        label: &str,
        initial: i64,
        capacity: i64,
        position: Position,
    ) -> Result<PlaceNode, CoreError> {
        if self.net.object_exists(label) {
            return Err(CoreError::LabelInUse {
                label: label.to_string(),
            });
        }
        let offset = self.net.places.len();
        self.net.places.insert(
            label.to_string(),
            Place {
                label: label.to_string(),
                offset,
                initial,
                capacity,
                position,
            },
        );
        Ok(PlaceNode {
            label: label.to_string(),
        })
    }

    /// Appends a transition owned by `role`.
    pub fn transition(
        &mut self,
        label: &str,
        role: &Role,
        position: Position,
    ) -> Result<TransitionNode, CoreError> {
        if self.net.object_exists(label) {
            return Err(CoreError::LabelInUse {
                label: label.to_string(),
            });
        }
        let role = self.net.ensure_role(role.as_str());
        // Delta is sized by index_arcs once all places exist.
        self.net.transitions.insert(
            label.to_string(),
            Transition::new(label, role, position, 0),
        );
        Ok(TransitionNode {
            label: label.to_string(),
        })
    }

    /// Adds a production (transition -> place) or consumption
    /// (place -> transition) arc.
    pub fn connect(
        &mut self,
        source: impl Into<Node>,
        weight: i64,
        target: impl Into<Node>,
    ) -> Result<(), CoreError> {
        self.check_weight(weight)?;
        self.net
            .push_arc(source.into(), target.into(), weight, false, false, false);
        Ok(())
    }

    /// Adds an inhibitor arc. A place source yields a standard guard, a
    /// transition source a reverse guard on the target place.
    pub fn guard(
        &mut self,
        source: impl Into<Node>,
        weight: i64,
        target: impl Into<Node>,
    ) -> Result<(), CoreError> {
        self.check_weight(weight)?;
        let source = source.into();
        let inverted = source.is_transition();
        self.net
            .push_arc(source, target.into(), weight, true, inverted, false);
        Ok(())
    }

    /// Marks `transition` as allowed to re-mark `place`. Workflow nets only.
    pub fn reentry(
        &mut self,
        transition: &TransitionNode,
        place: &PlaceNode,
    ) -> Result<(), CoreError> {
        if self.net.net_type != NetType::Workflow {
            return Err(CoreError::UnsupportedOperation {
                reason: "reentry only supported for workflow nets".to_string(),
            });
        }
        let t = self
            .net
            .transitions
            .get_mut(&transition.label)
            .ok_or_else(|| CoreError::UnknownTransition {
                label: transition.label.clone(),
            })?;
        t.allow_reentry = true;
        self.net
            .push_arc(transition.into(), place.into(), 0, false, false, true);
        Ok(())
    }

    fn check_weight(&self, weight: i64) -> Result<(), CoreError> {
        if weight <= 0 {
            return Err(CoreError::InvalidWeight { weight });
        }
        if self.net.net_type == NetType::Elementary && weight != 1 {
            return Err(CoreError::UnsupportedOperation {
                reason: format!("elementary nets only support weight 1, got {}", weight),
            });
        }
        Ok(())
    }
}

impl Net {
    /// Builds a net from a procedural declaration.
    ///
    /// Fails if the declaration function fails or the resulting arcs cannot
    /// be indexed; a partially indexed net is never returned.
    pub fn build<F>(schema: impl Into<String>, net_type: NetType, declare: F) -> Result<Self, CoreError>
    where
        F: FnOnce(&mut Dsl) -> Result<(), CoreError>,
    {
        let mut dsl = Dsl {
            net: Net::new(schema, net_type),
        };
        declare(&mut dsl)?;
        dsl.net.finish()
    }

    /// Builds a net from a declarative object.
    pub fn from_declaration(schema: impl Into<String>, decl: &Declaration) -> Result<Self, CoreError> {
        decl.check_version()?;

        Net::build(schema, decl.net_type, |dsl| {
            let mut nodes: IndexMap<&str, Node> = IndexMap::new();

            for (label, p) in &decl.places {
                let node = dsl.place(label, p.initial, p.capacity, Position::new(p.x, p.y))?;
                nodes.insert(label, (&node).into());
            }

            for (label, t) in &decl.transitions {
                let role = dsl.role(t.role.as_deref().unwrap_or(DEFAULT_ROLE));
                let node = dsl.transition(label, &role, Position::new(t.x, t.y))?;
                nodes.insert(label, (&node).into());
            }

            for arc in &decl.arcs {
                let source = nodes.get(arc.source.as_str()).ok_or_else(|| CoreError::InvalidArc {
                    reason: format!("unknown arc source: {}", arc.source),
                })?;
                let target = nodes.get(arc.target.as_str()).ok_or_else(|| CoreError::InvalidArc {
                    reason: format!("unknown arc target: {}", arc.target),
                })?;

                match (source, target) {
                    (Node::Place(_), Node::Transition(_)) => {
                        if arc.reentry {
                            return Err(CoreError::InvalidArc {
                                reason: format!(
                                    "reentry must use a transition->place arc: {} -> {}",
                                    arc.source, arc.target
                                ),
                            });
                        }
                    }
                    (Node::Transition(t), Node::Place(p)) => {
                        if arc.reentry {
                            // A weighted reentry arc also produces; weight 0
                            // is the bare marker written by `to_declaration`.
                            if arc.weight > 0 {
                                if arc.inhibit {
                                    dsl.guard(source.clone(), arc.weight, target.clone())?;
                                } else {
                                    dsl.connect(source.clone(), arc.weight, target.clone())?;
                                }
                            }
                            dsl.reentry(
                                &TransitionNode { label: t.clone() },
                                &PlaceNode { label: p.clone() },
                            )?;
                            continue;
                        }
                    }
                    _ => {
                        return Err(CoreError::InvalidArc {
                            reason: format!(
                                "arc must join a place and a transition: {} -> {}",
                                arc.source, arc.target
                            ),
                        });
                    }
                }

                if arc.inhibit {
                    dsl.guard(source.clone(), arc.weight, target.clone())?;
                } else {
                    dsl.connect(source.clone(), arc.weight, target.clone())?;
                }
            }

            Ok(())
        })
    }

    /// Parses, version-checks and builds a net from declaration JSON.
    pub fn from_json_str(schema: impl Into<String>, json: &str) -> Result<Self, CoreError> {
        let decl = Declaration::from_json_str(json)?;
        Net::from_declaration(schema, &decl)
    }

    /// Exports the sparse declarative form of this net.
    ///
    /// Zero initial/capacity values and the default role are omitted and arc
    /// weights are written as magnitudes.
    pub fn to_declaration(&self) -> Declaration {
        let mut decl = Declaration::new(self.net_type);

        for p in self.places.values() {
            decl.places.insert(
                p.label.clone(),
                PlaceDecl {
                    initial: p.initial,
                    capacity: p.capacity,
                    x: p.position.x,
                    y: p.position.y,
                },
            );
        }

        for t in self.transitions.values() {
            let role = (t.role.as_str() != DEFAULT_ROLE).then(|| t.role.as_str().to_string());
            decl.transitions.insert(
                t.label.clone(),
                TransitionDecl {
                    role,
                    x: t.position.x,
                    y: t.position.y,
                },
            );
        }

        decl.arcs = self
            .arcs
            .iter()
            .map(|a| ArcDecl {
                source: a.source.label().to_string(),
                target: a.target.label().to_string(),
                weight: a.weight.abs(),
                inhibit: a.inhibit,
                reentry: a.reentry,
            })
            .collect();

        decl
    }

    /// Exports the full object form: offsets, deltas, guards and arc flags.
    pub fn to_full_object(&self) -> Result<serde_json::Value, CoreError> {
        let places: IndexMap<&str, &Place> = self
            .places
            .iter()
            .map(|(k, v)| (k.as_str(), v))
            .collect();
        let transitions: IndexMap<&str, &Transition> = self
            .transitions
            .iter()
            .map(|(k, v)| (k.as_str(), v))
            .collect();

        Ok(serde_json::json!({
            "netType": self.net_type,
            "version": DECLARATION_VERSION,
            "schema": self.schema,
            "places": serde_json::to_value(places)?,
            "transitions": serde_json::to_value(transitions)?,
            "arcs": serde_json::to_value(&self.arcs)?,
        }))
    }
}
