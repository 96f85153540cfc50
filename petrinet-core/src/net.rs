//! The net: entity maps, arc sequence and vector helpers.

use crate::error::CoreError;
use crate::label;
use crate::model::{Arc, NetType, Node, Place, Role, Transition, Vector};
use indexmap::IndexMap;

const LAYOUT_MARGIN: f64 = 60.0;

/// A Petri net definition.
///
/// Places are kept in offset order, so `places[i].offset == i` at all times.
/// Transitions and roles keep insertion order.
#[derive(Debug, Clone)]
pub struct Net {
    pub(crate) schema: String,
    pub(crate) net_type: NetType,
    pub(crate) roles: IndexMap<String, Role>,
    pub(crate) places: IndexMap<String, Place>,
    pub(crate) transitions: IndexMap<String, Transition>,
    pub(crate) arcs: Vec<Arc>,
}

impl Net {
    /// Creates an empty net.
    pub fn new(schema: impl Into<String>, net_type: NetType) -> Self {
        Self {
            schema: schema.into(),
            net_type,
            roles: IndexMap::new(),
            places: IndexMap::new(),
            transitions: IndexMap::new(),
            arcs: Vec::new(),
        }
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }

    pub fn net_type(&self) -> NetType {
        self.net_type
    }

    pub fn places(&self) -> impl Iterator<Item = &Place> {
        self.places.values()
    }

    pub fn transitions(&self) -> impl Iterator<Item = &Transition> {
        self.transitions.values()
    }

    pub fn roles(&self) -> impl Iterator<Item = &Role> {
        self.roles.values()
    }

    pub fn arcs(&self) -> &[Arc] {
        &self.arcs
    }

    pub fn place_count(&self) -> usize {
        self.places.len()
    }

    pub fn transition_count(&self) -> usize {
        self.transitions.len()
    }

    /// Looks up a place by label.
    pub fn place(&self, label: &str) -> Result<&Place, CoreError> {
        self.places.get(label).ok_or_else(|| CoreError::UnknownPlace {
            label: label.to_string(),
        })
    }

    /// Looks up a place by offset.
    pub fn place_at(&self, offset: usize) -> Result<&Place, CoreError> {
        self.places
            .get_index(offset)
            .map(|(_, p)| p)
            .ok_or_else(|| CoreError::UnknownPlace {
                label: format!("#{}", offset),
            })
    }

    /// Looks up a transition by label.
    pub fn transition(&self, label: &str) -> Result<&Transition, CoreError> {
        self.transitions
            .get(label)
            .ok_or_else(|| CoreError::UnknownTransition {
                label: label.to_string(),
            })
    }

    /// Returns whether a place or transition carries this label.
    pub fn object_exists(&self, label: &str) -> bool {
        self.places.contains_key(label) || self.transitions.contains_key(label)
    }

    /// Returns a free label derived from `label`, bumping a numeric suffix on
    /// collision with any place or transition.
    pub fn new_label(&self, label: &str) -> String {
        label::next_free_label(label, |l| self.object_exists(l))
    }

    pub(crate) fn place_seq(&self) -> String {
        label::sequence_label("place", |l| self.places.contains_key(l))
    }

    pub(crate) fn transition_seq(&self) -> String {
        label::sequence_label("txn", |l| self.transitions.contains_key(l))
    }

    /// A zero vector sized to the current place count.
    pub fn empty_vector(&self) -> Vector {
        vec![0; self.places.len()]
    }

    /// Initial marking.
    pub fn initial_vector(&self) -> Vector {
        self.places.values().map(|p| p.initial).collect()
    }

    /// Per-place capacity, 0 meaning unbounded.
    pub fn capacity_vector(&self) -> Vector {
        self.places.values().map(|p| p.capacity).collect()
    }

    /// Layout extent as `(width, height)`: the furthest node coordinates
    /// plus a fixed margin.
    pub fn size(&self) -> (f64, f64) {
        let positions = self
            .places
            .values()
            .map(|p| p.position)
            .chain(self.transitions.values().map(|t| t.position));
        let (x, y) = positions.fold((0.0_f64, 0.0_f64), |(x, y), pos| (x.max(pos.x), y.max(pos.y)));
        (x + LAYOUT_MARGIN, y + LAYOUT_MARGIN)
    }

    pub(crate) fn ensure_role(&mut self, label: &str) -> Role {
        self.roles
            .entry(label.to_string())
            .or_insert_with(|| Role::new(label))
            .clone()
    }

    pub(crate) fn push_arc(
        &mut self,
        source: Node,
        target: Node,
        weight: i64,
        inhibit: bool,
        inverted: bool,
        reentry: bool,
    ) {
        let offset = self.arcs.len();
        self.arcs.push(Arc {
            offset,
            source,
            target,
            weight,
            inhibit,
            inverted,
            reentry,
        });
    }

    pub(crate) fn renumber_arcs(&mut self) {
        for (i, arc) in self.arcs.iter_mut().enumerate() {
            arc.offset = i;
        }
    }

    /// Checks place values against the net type.
    pub(crate) fn validate_places(&self) -> Result<(), CoreError> {
        for p in self.places.values() {
            if p.initial < 0 || p.capacity < 0 {
                return Err(CoreError::InvalidDeclaration {
                    reason: format!("place '{}' has a negative initial or capacity", p.label),
                });
            }
        }

        if self.net_type == NetType::Elementary {
            if let Some(p) = self
                .places
                .values()
                .find(|p| p.initial > 1 || p.capacity > 1)
            {
                return Err(CoreError::InvalidDeclaration {
                    reason: format!(
                        "elementary place '{}' must have initial and capacity of 0 or 1",
                        p.label
                    ),
                });
            }
            let marked = self.places.values().filter(|p| p.initial > 0).count();
            if marked > 1 {
                return Err(CoreError::InvalidDeclaration {
                    reason: format!(
                        "elementary nets allow one initial token, found {}",
                        marked
                    ),
                });
            }
        }

        Ok(())
    }

    /// Indexes arcs and validates the result; the last step of construction.
    pub(crate) fn finish(mut self) -> Result<Self, CoreError> {
        self.validate_places()?;
        if let Err(e) = self.index_arcs() {
            tracing::warn!("Failed to index net {}: {}", self.schema, e);
            return Err(match e {
                CoreError::InvalidArc { reason } => CoreError::InvalidDeclaration { reason },
                other => other,
            });
        }

        tracing::info!(
            "Built {} net {}: {} places, {} transitions, {} arcs",
            self.net_type,
            self.schema,
            self.places.len(),
            self.transitions.len(),
            self.arcs.len()
        );

        Ok(self)
    }
}
