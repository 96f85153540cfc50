//! Structural editing of a live net.
//!
//! Every operation updates the arc list and the delta/guard index together,
//! so that [`Net::index_arcs`] over the edited arcs reproduces the edited
//! index. Place offsets stay a contiguous `0..n` range: deleting the place at
//! offset `k` shifts every higher offset down by one.

use crate::error::CoreError;
use crate::model::{Guard, NetType, Node, Place, Position, Role, Transition};
use crate::net::Net;

impl Net {
    /// Appends a place labeled `place<N>` (lowest unused N) and widens every
    /// transition's delta and guards with a zero slot. Returns the label.
    pub fn add_place(&mut self, position: Position) -> String {
        let label = self.place_seq();
        let offset = self.places.len();
        self.places.insert(
            label.clone(),
            Place {
                label: label.clone(),
                offset,
                initial: 0,
                capacity: 0,
                position,
            },
        );
        for t in self.transitions.values_mut() {
            t.delta.push(0);
            for g in t.guards.values_mut() {
                g.delta.push(0);
            }
        }
        tracing::debug!("{}: added place {} at offset {}", self.schema, label, offset);
        label
    }

    /// Appends a transition labeled `txn<N>` (lowest unused N) with the
    /// default role. Returns the label.
    pub fn add_transition(&mut self, position: Position) -> String {
        let label = self.transition_seq();
        let role = self.ensure_role(Role::default().as_str());
        let width = self.places.len();
        self.transitions
            .insert(label.clone(), Transition::new(label.clone(), role, position, width));
        tracing::debug!("{}: added transition {}", self.schema, label);
        label
    }

    /// Adds an arc between an existing place and transition, in either
    /// direction, and applies it to the index.
    pub fn add_arc(
        &mut self,
        source: &str,
        target: &str,
        weight: i64,
        inhibit: bool,
    ) -> Result<usize, CoreError> {
        if weight <= 0 {
            return Err(CoreError::InvalidWeight { weight });
        }
        self.check_elementary_weight(weight)?;

        let source = self.node(source)?;
        let target = self.node(target)?;
        if source.is_place() == target.is_place() {
            return Err(CoreError::InvalidArc {
                reason: format!(
                    "arc must join a place and a transition: {} -> {}",
                    source.label(),
                    target.label()
                ),
            });
        }

        let inverted = inhibit && source.is_transition();
        self.push_arc(source, target, weight, inhibit, inverted, false);
        let offset = self.arcs.len() - 1;
        self.apply_arc(offset)?;
        Ok(offset)
    }

    /// Removes a place, its column in every delta and guard, its guards and
    /// every arc touching it.
    pub fn delete_place(&mut self, label: &str) -> Result<(), CoreError> {
        let Some((offset, _, _)) = self.places.shift_remove_full(label) else {
            return Err(CoreError::UnknownPlace {
                label: label.to_string(),
            });
        };

        for p in self.places.values_mut() {
            if p.offset > offset {
                p.offset -= 1;
            }
        }

        for t in self.transitions.values_mut() {
            if offset < t.delta.len() {
                t.delta.remove(offset);
            }
            t.guards.shift_remove(label);
            for g in t.guards.values_mut() {
                if offset < g.delta.len() {
                    g.delta.remove(offset);
                }
            }
        }

        self.remove_arcs_touching(&Node::Place(label.to_string()));
        tracing::debug!("{}: deleted place {} at offset {}", self.schema, label, offset);
        Ok(())
    }

    /// Removes a transition and every arc touching it.
    pub fn delete_transition(&mut self, label: &str) -> Result<(), CoreError> {
        if self.transitions.shift_remove(label).is_none() {
            return Err(CoreError::UnknownTransition {
                label: label.to_string(),
            });
        }
        self.remove_arcs_touching(&Node::Transition(label.to_string()));
        tracing::debug!("{}: deleted transition {}", self.schema, label);
        Ok(())
    }

    /// Removes the arc at `offset`, clearing the delta slot or guard it
    /// produced, and renumbers the remaining arcs.
    pub fn delete_arc(&mut self, offset: usize) -> Result<(), CoreError> {
        let arc = self
            .arcs
            .get(offset)
            .cloned()
            .ok_or(CoreError::UnknownArc { offset })?;
        self.clear_arc_effect(offset)?;
        self.arcs.remove(offset);
        self.renumber_arcs();

        if arc.reentry {
            self.refresh_reentry(arc.source.label());
        }
        tracing::debug!(
            "{}: deleted arc {} ({} -> {})",
            self.schema,
            offset,
            arc.source.label(),
            arc.target.label()
        );
        Ok(())
    }

    /// Relabels a place, including guard keys and arcs that reference it.
    pub fn rename_place(&mut self, old: &str, new: &str) -> Result<(), CoreError> {
        if old == new {
            return self.place(old).map(|_| ());
        }
        if !self.places.contains_key(old) {
            return Err(CoreError::UnknownPlace {
                label: old.to_string(),
            });
        }
        self.check_free(new)?;

        if let Some((index, _, mut place)) = self.places.shift_remove_full(old) {
            place.label = new.to_string();
            self.places.shift_insert(index, new.to_string(), place);
        }

        for t in self.transitions.values_mut() {
            if let Some((index, _, mut guard)) = t.guards.shift_remove_full(old) {
                guard.label = new.to_string();
                t.guards.shift_insert(index, new.to_string(), guard);
            }
        }

        self.relabel_arcs(&Node::Place(old.to_string()), Node::Place(new.to_string()));
        Ok(())
    }

    /// Relabels a transition and the arcs that reference it.
    pub fn rename_transition(&mut self, old: &str, new: &str) -> Result<(), CoreError> {
        if old == new {
            return self.transition(old).map(|_| ());
        }
        if !self.transitions.contains_key(old) {
            return Err(CoreError::UnknownTransition {
                label: old.to_string(),
            });
        }
        self.check_free(new)?;

        if let Some((index, _, mut transition)) = self.transitions.shift_remove_full(old) {
            transition.label = new.to_string();
            self.transitions.shift_insert(index, new.to_string(), transition);
        }

        self.relabel_arcs(
            &Node::Transition(old.to_string()),
            Node::Transition(new.to_string()),
        );
        Ok(())
    }

    /// Flips an arc between a production/consumption edge and an inhibitor,
    /// moving its weight between the delta slot and the guard map.
    ///
    /// An arc drawn transition -> place becomes a reverse guard.
    pub fn toggle_inhibitor(&mut self, offset: usize) -> Result<(), CoreError> {
        let arc = self.arcs.get(offset).ok_or(CoreError::UnknownArc { offset })?;
        if arc.reentry {
            return Err(CoreError::UnsupportedOperation {
                reason: "reentry arcs cannot become inhibitors".to_string(),
            });
        }

        self.clear_arc_effect(offset)?;
        let arc = &mut self.arcs[offset];
        arc.inhibit = !arc.inhibit;
        arc.inverted = arc.inhibit && arc.is_output();
        self.apply_arc(offset)
    }

    /// Sets a positive arc weight and updates the delta slot or guard
    /// threshold it drives.
    pub fn set_arc_weight(&mut self, offset: usize, weight: i64) -> Result<(), CoreError> {
        if weight <= 0 {
            return Err(CoreError::InvalidWeight { weight });
        }
        let arc = self.arcs.get(offset).ok_or(CoreError::UnknownArc { offset })?;
        if arc.reentry {
            return Err(CoreError::UnsupportedOperation {
                reason: "reentry arcs carry no weight".to_string(),
            });
        }
        self.check_elementary_weight(weight)?;

        self.arcs[offset].weight = weight;
        self.apply_arc(offset)
    }

    fn node(&self, label: &str) -> Result<Node, CoreError> {
        if self.places.contains_key(label) {
            Ok(Node::Place(label.to_string()))
        } else if self.transitions.contains_key(label) {
            Ok(Node::Transition(label.to_string()))
        } else {
            Err(CoreError::InvalidArc {
                reason: format!("unknown arc endpoint: {}", label),
            })
        }
    }

    fn check_free(&self, label: &str) -> Result<(), CoreError> {
        if self.object_exists(label) {
            return Err(CoreError::LabelInUse {
                label: label.to_string(),
            });
        }
        Ok(())
    }

    fn check_elementary_weight(&self, weight: i64) -> Result<(), CoreError> {
        if self.net_type == NetType::Elementary && weight != 1 {
            return Err(CoreError::UnsupportedOperation {
                reason: format!("elementary nets only support weight 1, got {}", weight),
            });
        }
        Ok(())
    }

    /// Writes the effect of the arc at `offset` into the index.
    fn apply_arc(&mut self, offset: usize) -> Result<(), CoreError> {
        let width = self.places.len();
        let arc = &self.arcs[offset];
        let (p, t) = arc.endpoints().ok_or_else(|| CoreError::InvalidArc {
            reason: format!("arc {} must join a place and a transition", offset),
        })?;
        let place = self.places.get(p).ok_or_else(|| CoreError::UnknownPlace {
            label: p.to_string(),
        })?;
        let transition = self
            .transitions
            .get_mut(t)
            .ok_or_else(|| CoreError::UnknownTransition {
                label: t.to_string(),
            })?;

        if arc.reentry {
            transition.allow_reentry = true;
        } else if arc.inhibit {
            let guard = Guard::new(&place.label, width, place.offset, arc.weight, arc.inverted);
            transition.guards.insert(place.label.clone(), guard);
        } else if arc.is_output() {
            transition.delta[place.offset] = arc.weight;
        } else {
            transition.delta[place.offset] = -arc.weight;
        }
        Ok(())
    }

    /// Removes the effect of the arc at `offset` from the index.
    fn clear_arc_effect(&mut self, offset: usize) -> Result<(), CoreError> {
        let arc = &self.arcs[offset];
        if arc.reentry {
            return Ok(());
        }
        let (p, t) = arc.endpoints().ok_or_else(|| CoreError::InvalidArc {
            reason: format!("arc {} must join a place and a transition", offset),
        })?;
        let place = self.places.get(p).ok_or_else(|| CoreError::UnknownPlace {
            label: p.to_string(),
        })?;
        let transition = self
            .transitions
            .get_mut(t)
            .ok_or_else(|| CoreError::UnknownTransition {
                label: t.to_string(),
            })?;

        if arc.inhibit {
            transition.guards.shift_remove(p);
        } else {
            transition.delta[place.offset] = 0;
        }
        Ok(())
    }

    fn remove_arcs_touching(&mut self, node: &Node) {
        let reentrant: Vec<String> = self
            .arcs
            .iter()
            .filter(|a| a.reentry && a.touches(node))
            .map(|a| a.source.label().to_string())
            .collect();
        self.arcs.retain(|a| !a.touches(node));
        self.renumber_arcs();
        for t in reentrant {
            self.refresh_reentry(&t);
        }
    }

    /// Clears `allow_reentry` on a transition left without reentry arcs.
    fn refresh_reentry(&mut self, transition: &str) {
        let still_reentrant = self
            .arcs
            .iter()
            .any(|a| a.reentry && a.source.label() == transition);
        if let Some(t) = self.transitions.get_mut(transition) {
            t.allow_reentry = still_reentrant;
        }
    }

    fn relabel_arcs(&mut self, old: &Node, new: Node) {
        for arc in &mut self.arcs {
            if &arc.source == old {
                arc.source = new.clone();
            }
            if &arc.target == old {
                arc.target = new.clone();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Vector;
    use proptest::prelude::*;
    use std::collections::BTreeMap;

    fn sample_net() -> Net {
        Net::build("editor", NetType::General, |dsl| {
            let role = dsl.role("default");
            let foo = dsl.place("foo", 1, 0, Position::default())?;
            let mid = dsl.place("mid", 0, 0, Position::default())?;
            let qux = dsl.place("qux", 0, 5, Position::default())?;
            let bar = dsl.transition("bar", &role, Position::default())?;
            let baz = dsl.transition("baz", &role, Position::default())?;
            dsl.connect(&foo, 1, &bar)?;
            dsl.connect(&bar, 2, &mid)?;
            dsl.connect(&bar, 3, &qux)?;
            dsl.guard(&foo, 1, &baz)?;
            dsl.guard(&baz, 2, &qux)?;
            Ok(())
        })
        .unwrap()
    }

    type Snapshot = BTreeMap<String, (Vector, BTreeMap<String, (Vector, bool)>, bool)>;

    fn snapshot(net: &Net) -> Snapshot {
        net.transitions()
            .map(|t| {
                let guards = t
                    .guards
                    .iter()
                    .map(|(k, g)| (k.clone(), (g.delta.clone(), g.inverted)))
                    .collect();
                (t.label.clone(), (t.delta.clone(), guards, t.allow_reentry))
            })
            .collect()
    }

    fn assert_consistent(net: &Net) {
        let width = net.place_count();
        for (i, p) in net.places().enumerate() {
            assert_eq!(p.offset, i);
        }
        for t in net.transitions() {
            assert_eq!(t.delta.len(), width);
            for g in t.guards.values() {
                assert_eq!(g.delta.len(), width);
            }
        }
        for (i, a) in net.arcs().iter().enumerate() {
            assert_eq!(a.offset, i);
        }
        let mut reindexed = net.clone();
        reindexed.index_arcs().unwrap();
        assert_eq!(snapshot(&reindexed), snapshot(net));
    }

    #[test]
    fn test_add_place_widens_deltas() {
        let mut net = sample_net();
        let label = net.add_place(Position::new(10.0, 20.0));
        assert_eq!(label, "place0");
        assert_eq!(net.place("place0").unwrap().offset, 3);
        assert_eq!(net.transition("bar").unwrap().delta, vec![-1, 2, 3, 0]);
        assert_eq!(net.transition("baz").unwrap().guards["foo"].delta.len(), 4);
        assert_eq!(net.add_place(Position::default()), "place1");
        assert_consistent(&net);
    }

    #[test]
    fn test_add_transition() {
        let mut net = sample_net();
        assert_eq!(net.add_transition(Position::default()), "txn0");
        assert_eq!(net.add_transition(Position::default()), "txn1");
        let t = net.transition("txn0").unwrap();
        assert_eq!(t.delta, vec![0, 0, 0]);
        assert_eq!(t.role.as_str(), "default");
        assert_consistent(&net);
    }

    #[test]
    fn test_delete_middle_place_compacts_offsets() {
        let mut net = sample_net();
        net.delete_place("mid").unwrap();

        assert_eq!(net.place("foo").unwrap().offset, 0);
        assert_eq!(net.place("qux").unwrap().offset, 1);
        assert_eq!(net.transition("bar").unwrap().delta, vec![-1, 3]);
        assert_eq!(net.transition("baz").unwrap().guards["qux"].delta, vec![0, -2]);
        assert_eq!(net.arcs().len(), 4);
        assert_consistent(&net);

        assert!(matches!(
            net.delete_place("mid"),
            Err(CoreError::UnknownPlace { .. })
        ));
    }

    #[test]
    fn test_delete_guarded_place_removes_guard() {
        let mut net = sample_net();
        net.delete_place("foo").unwrap();
        assert!(net.transition("baz").unwrap().guards.get("foo").is_none());
        assert_eq!(net.transition("bar").unwrap().delta, vec![2, 3]);
        assert_consistent(&net);
    }

    #[test]
    fn test_delete_transition() {
        let mut net = sample_net();
        net.delete_transition("bar").unwrap();
        assert_eq!(net.transition_count(), 1);
        assert_eq!(net.arcs().len(), 2);
        assert_consistent(&net);
        assert!(matches!(
            net.delete_transition("bar"),
            Err(CoreError::UnknownTransition { .. })
        ));
    }

    #[test]
    fn test_delete_arc() {
        let mut net = sample_net();
        // bar -> mid
        net.delete_arc(1).unwrap();
        assert_eq!(net.transition("bar").unwrap().delta, vec![-1, 0, 3]);
        assert_consistent(&net);

        // foo -| baz, now at offset 2
        net.delete_arc(2).unwrap();
        assert!(net.transition("baz").unwrap().guards.get("foo").is_none());
        assert_consistent(&net);

        assert!(matches!(net.delete_arc(10), Err(CoreError::UnknownArc { .. })));
    }

    #[test]
    fn test_rename_place_updates_guards_and_arcs() {
        let mut net = sample_net();
        net.rename_place("foo", "foo2").unwrap();

        assert_eq!(net.place("foo2").unwrap().offset, 0);
        assert!(net.place("foo").is_err());
        let guard = &net.transition("baz").unwrap().guards["foo2"];
        assert_eq!(guard.label, "foo2");
        assert_eq!(net.arcs()[0].source, Node::Place("foo2".into()));
        assert_consistent(&net);

        assert!(matches!(
            net.rename_place("foo2", "bar"),
            Err(CoreError::LabelInUse { .. })
        ));
        assert!(matches!(
            net.rename_place("nope", "x"),
            Err(CoreError::UnknownPlace { .. })
        ));
    }

    #[test]
    fn test_rename_transition_updates_arcs() {
        let mut net = sample_net();
        net.rename_transition("bar", "bar2").unwrap();
        assert_eq!(net.transitions().next().unwrap().label, "bar2");
        assert_eq!(net.arcs()[0].target, Node::Transition("bar2".into()));
        assert_consistent(&net);
    }

    #[test]
    fn test_toggle_inhibitor_moves_weight() {
        let mut net = sample_net();

        // foo -> bar consumption becomes a standard guard.
        net.toggle_inhibitor(0).unwrap();
        let bar = net.transition("bar").unwrap();
        assert_eq!(bar.delta, vec![0, 2, 3]);
        assert_eq!(bar.guards["foo"].delta, vec![-1, 0, 0]);
        assert!(!bar.guards["foo"].inverted);
        assert_consistent(&net);

        // bar -> qux production becomes a reverse guard.
        net.toggle_inhibitor(2).unwrap();
        let bar = net.transition("bar").unwrap();
        assert_eq!(bar.delta, vec![0, 2, 0]);
        assert!(bar.guards["qux"].inverted);
        assert_eq!(bar.guards["qux"].delta, vec![0, 0, -3]);
        assert_consistent(&net);

        // And back again.
        net.toggle_inhibitor(2).unwrap();
        net.toggle_inhibitor(0).unwrap();
        assert_eq!(net.transition("bar").unwrap().delta, vec![-1, 2, 3]);
        assert!(net.transition("bar").unwrap().guards.is_empty());
        assert_consistent(&net);
    }

    #[test]
    fn test_set_arc_weight() {
        let mut net = sample_net();
        net.set_arc_weight(0, 4).unwrap();
        assert_eq!(net.transition("bar").unwrap().delta[0], -4);

        // Guard keeps its inhibitor status.
        net.set_arc_weight(4, 5).unwrap();
        let guard = &net.transition("baz").unwrap().guards["qux"];
        assert_eq!(guard.delta, vec![0, 0, -5]);
        assert!(guard.inverted);
        assert_eq!(net.transition("baz").unwrap().delta, vec![0, 0, 0]);
        assert_consistent(&net);

        assert!(matches!(
            net.set_arc_weight(0, 0),
            Err(CoreError::InvalidWeight { .. })
        ));
        assert!(matches!(
            net.set_arc_weight(0, -2),
            Err(CoreError::InvalidWeight { .. })
        ));
    }

    #[test]
    fn test_add_arc() {
        let mut net = sample_net();
        let offset = net.add_arc("mid", "baz", 2, false).unwrap();
        assert_eq!(offset, 5);
        assert_eq!(net.transition("baz").unwrap().delta, vec![0, -2, 0]);

        net.add_arc("baz", "foo", 1, true).unwrap();
        assert!(net.transition("baz").unwrap().guards["foo"].inverted);
        assert_consistent(&net);

        assert!(matches!(
            net.add_arc("foo", "mid", 1, false),
            Err(CoreError::InvalidArc { .. })
        ));
        assert!(matches!(
            net.add_arc("foo", "nope", 1, false),
            Err(CoreError::InvalidArc { .. })
        ));
    }

    #[test]
    fn test_elementary_weight_edits_rejected() {
        let mut net = Net::build("safe", NetType::Elementary, |dsl| {
            let role = dsl.role("default");
            let p = dsl.place("p", 1, 1, Position::default())?;
            let t = dsl.transition("t", &role, Position::default())?;
            dsl.connect(&p, 1, &t)
        })
        .unwrap();
        assert!(matches!(
            net.set_arc_weight(0, 2),
            Err(CoreError::UnsupportedOperation { .. })
        ));
    }

    #[test]
    fn test_reentry_arc_edits() {
        let mut net = Net::build("wf", NetType::Workflow, |dsl| {
            let role = dsl.role("default");
            let p = dsl.place("p", 1, 0, Position::default())?;
            let t = dsl.transition("t", &role, Position::default())?;
            dsl.connect(&t, 1, &p)?;
            dsl.reentry(&t, &p)
        })
        .unwrap();

        assert!(matches!(
            net.toggle_inhibitor(1),
            Err(CoreError::UnsupportedOperation { .. })
        ));
        assert!(net.transition("t").unwrap().allow_reentry);
        net.delete_arc(1).unwrap();
        assert!(!net.transition("t").unwrap().allow_reentry);
        assert_eq!(net.transition("t").unwrap().delta, vec![1]);
        assert_consistent(&net);
    }

    #[derive(Debug, Clone)]
    enum Edit {
        AddPlace,
        AddTransition,
        DeletePlace(usize),
        DeleteTransition(usize),
        DeleteArc(usize),
        Toggle(usize),
        SetWeight(usize, i64),
        RenamePlace(usize),
    }

    fn arb_edit() -> impl Strategy<Value = Edit> {
        prop_oneof![
            Just(Edit::AddPlace),
            Just(Edit::AddTransition),
            any::<usize>().prop_map(Edit::DeletePlace),
            any::<usize>().prop_map(Edit::DeleteTransition),
            any::<usize>().prop_map(Edit::DeleteArc),
            any::<usize>().prop_map(Edit::Toggle),
            (any::<usize>(), 1i64..5).prop_map(|(i, w)| Edit::SetWeight(i, w)),
            any::<usize>().prop_map(Edit::RenamePlace),
        ]
    }

    /// At most one arc per (transition, place) pair.
    fn arb_net() -> impl Strategy<Value = Net> {
        (1usize..5, 1usize..4)
            .prop_flat_map(|(places, transitions)| {
                (
                    Just(places),
                    Just(transitions),
                    prop::collection::vec(0u8..5, places * transitions),
                    prop::collection::vec(1i64..4, places * transitions),
                )
            })
            .prop_map(|(places, transitions, kinds, weights)| {
                Net::build("arb", NetType::General, |dsl| {
                    let role = dsl.role("default");
                    let ps: Vec<_> = (0..places)
                        .map(|i| dsl.place(&format!("p{}", i), 0, 0, Position::default()))
                        .collect::<Result<_, _>>()?;
                    for ti in 0..transitions {
                        let t = dsl.transition(&format!("t{}", ti), &role, Position::default())?;
                        for (pi, p) in ps.iter().enumerate() {
                            let cell = ti * places + pi;
                            let w = weights[cell];
                            match kinds[cell] {
                                1 => dsl.connect(p, w, &t)?,
                                2 => dsl.connect(&t, w, p)?,
                                3 => dsl.guard(p, w, &t)?,
                                4 => dsl.guard(&t, w, p)?,
                                _ => {}
                            }
                        }
                    }
                    Ok(())
                })
                .unwrap()
            })
    }

    fn apply(net: &mut Net, edit: &Edit) {
        let places: Vec<String> = net.places().map(|p| p.label.clone()).collect();
        let transitions: Vec<String> = net.transitions().map(|t| t.label.clone()).collect();
        let arcs = net.arcs().len();

        match edit {
            Edit::AddPlace => {
                net.add_place(Position::default());
            }
            Edit::AddTransition => {
                net.add_transition(Position::default());
            }
            Edit::DeletePlace(i) if !places.is_empty() => {
                net.delete_place(&places[i % places.len()]).unwrap();
            }
            Edit::DeleteTransition(i) if !transitions.is_empty() => {
                net.delete_transition(&transitions[i % transitions.len()]).unwrap();
            }
            Edit::DeleteArc(i) if arcs > 0 => net.delete_arc(i % arcs).unwrap(),
            Edit::Toggle(i) if arcs > 0 => net.toggle_inhibitor(i % arcs).unwrap(),
            Edit::SetWeight(i, w) if arcs > 0 => net.set_arc_weight(i % arcs, *w).unwrap(),
            Edit::RenamePlace(i) if !places.is_empty() => {
                let old = &places[i % places.len()];
                let new = net.new_label(&format!("{}r", old));
                net.rename_place(old, &new).unwrap();
            }
            _ => {}
        }
    }

    proptest! {
        #[test]
        fn prop_edits_keep_index_consistent(
            mut net in arb_net(),
            edits in prop::collection::vec(arb_edit(), 0..16),
        ) {
            for edit in &edits {
                apply(&mut net, edit);
                assert_consistent(&net);
            }
        }

        #[test]
        fn prop_delete_place_removes_one_slot(net in arb_net(), pick in any::<usize>()) {
            let n = net.place_count();
            let k = pick % n;
            let label = net.place_at(k).unwrap().label.clone();
            let before = snapshot(&net);

            let mut edited = net.clone();
            edited.delete_place(&label).unwrap();

            let offsets: Vec<usize> = edited.places().map(|p| p.offset).collect();
            prop_assert_eq!(offsets, (0..n - 1).collect::<Vec<_>>());

            for t in edited.transitions() {
                let (delta, guards, _) = &before[&t.label];
                let mut expected = delta.clone();
                expected.remove(k);
                prop_assert_eq!(&t.delta, &expected);
                prop_assert!(!t.guards.contains_key(&label));
                prop_assert_eq!(t.guards.len(), guards.len() - usize::from(guards.contains_key(&label)));
                for g in t.guards.values() {
                    prop_assert_eq!(g.delta.len(), n - 1);
                }
            }
        }
    }
}
