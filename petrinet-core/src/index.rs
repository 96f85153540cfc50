//! Compiles the arc list into per-transition delta vectors and guards, and
//! regenerates an arc list from that index.
//!
//! The dense index is authoritative at runtime. [`Net::rebuild_arcs`] is a
//! best-effort inverse: it yields an operationally equivalent arc list, not
//! the original one. Arc order and offsets change, weights come back as
//! magnitudes, and reentry arcs are not re-emitted (the transition keeps its
//! `allow_reentry` flag, but the place the arc pointed at is not recorded in
//! the index).

use crate::error::CoreError;
use crate::model::{Arc, Guard, NetType, Node};
use crate::net::Net;

impl Net {
    /// Rebuilds every transition's delta vector and guard map from the arcs.
    ///
    /// Each delta is reset to zeros sized to the current place count. When
    /// two arcs join the same place and transition, the later one wins.
    /// Arcs that do not join a known place and a known transition are
    /// reported as [`CoreError::InvalidArc`]; the index must then be treated
    /// as unusable.
    pub fn index_arcs(&mut self) -> Result<(), CoreError> {
        let width = self.places.len();
        for t in self.transitions.values_mut() {
            t.delta = vec![0; width];
            t.guards.clear();
        }

        let mut invalid = Vec::new();
        for arc in &self.arcs {
            if arc.reentry {
                if self.net_type != NetType::Workflow {
                    return Err(CoreError::UnsupportedOperation {
                        reason: "reentry only supported for workflow nets".to_string(),
                    });
                }
                if let Some((_, label)) = arc.endpoints() {
                    if let Some(t) = self.transitions.get_mut(label) {
                        t.allow_reentry = true;
                    }
                }
                continue;
            }

            if self.net_type == NetType::Elementary && arc.weight.abs() > 1 {
                return Err(CoreError::UnsupportedOperation {
                    reason: format!(
                        "elementary nets only support weight 1, arc {} has {}",
                        arc.offset, arc.weight
                    ),
                });
            }

            let Some((p, t)) = arc.endpoints() else {
                invalid.push(arc.offset);
                continue;
            };
            let (Some(place), Some(transition)) = (self.places.get(p), self.transitions.get_mut(t))
            else {
                invalid.push(arc.offset);
                continue;
            };

            if arc.inhibit {
                let guard = Guard::new(&place.label, width, place.offset, arc.weight, arc.inverted);
                transition.guards.insert(place.label.clone(), guard);
            } else if arc.is_output() {
                transition.delta[place.offset] = arc.weight;
            } else {
                transition.delta[place.offset] = -arc.weight;
            }
        }

        if !invalid.is_empty() {
            return Err(CoreError::InvalidArc {
                reason: format!(
                    "arcs at offsets {:?} must join an existing place and transition",
                    invalid
                ),
            });
        }

        tracing::debug!(
            "Indexed {} arcs over {} places for {}",
            self.arcs.len(),
            width,
            self.schema
        );
        Ok(())
    }

    /// Replaces the arc list with one derived from the delta/guard index.
    pub fn rebuild_arcs(&mut self) {
        let mut arcs: Vec<Arc> = Vec::new();

        for t in self.transitions.values() {
            let transition = Node::Transition(t.label.clone());

            for (i, d) in t.delta.iter().enumerate() {
                let Some((label, _)) = self.places.get_index(i) else {
                    continue;
                };
                let place = Node::Place(label.clone());
                let (source, target) = match d.signum() {
                    -1 => (place, transition.clone()),
                    1 => (transition.clone(), place),
                    _ => continue,
                };
                arcs.push(Arc {
                    offset: arcs.len(),
                    source,
                    target,
                    weight: d.abs(),
                    inhibit: false,
                    inverted: false,
                    reentry: false,
                });
            }

            for guard in t.guards.values() {
                let Some((_, threshold)) = guard.threshold() else {
                    continue;
                };
                let place = Node::Place(guard.label.clone());
                let (source, target) = if guard.inverted {
                    (transition.clone(), place)
                } else {
                    (place, transition.clone())
                };
                arcs.push(Arc {
                    offset: arcs.len(),
                    source,
                    target,
                    weight: threshold.abs(),
                    inhibit: true,
                    inverted: guard.inverted,
                    reentry: false,
                });
            }
        }

        self.arcs = arcs;
    }
}
