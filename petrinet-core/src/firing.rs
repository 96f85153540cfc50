//! Firing engine: guard checks, vector addition and the per-net-type commit
//! policies.
//!
//! Every policy starts from [`Net::test_fire`], which never mutates state.
//! Only [`Net::fire`] (and [`Net::push_state`]) write back, and only when the
//! result is `ok`.

use crate::error::CoreError;
use crate::model::{FireResult, NetType, Transition, Vector};
use crate::net::Net;

/// Result of `state + delta * multiple`, checked against capacity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VectorSum {
    pub out: Vector,
    pub ok: bool,
    pub overflow: bool,
    pub underflow: bool,
}

/// Adds `delta * multiple` to `state` slot by slot.
///
/// A negative slot sets `underflow`; a slot above a positive capacity sets
/// `overflow`. Missing delta or capacity slots count as 0, and a capacity of
/// 0 (or `None` for the whole vector) is unbounded.
///
/// Arithmetic that leaves the `i64` range saturates: past the top it counts
/// as `overflow`, past the bottom as `underflow`.
pub fn vector_add(state: &[i64], delta: &[i64], multiple: i64, capacity: Option<&[i64]>) -> VectorSum {
    let mut overflow = false;
    let mut underflow = false;

    let out: Vector = state
        .iter()
        .enumerate()
        .map(|(i, s)| {
            let d = delta.get(i).copied().unwrap_or(0);
            let cap = capacity.and_then(|c| c.get(i).copied()).unwrap_or(0);
            let Some(value) = d.checked_mul(multiple).and_then(|step| s.checked_add(step)) else {
                // i64 * i64 + i64 always fits in i128.
                let exact = i128::from(*s) + i128::from(d) * i128::from(multiple);
                if exact > 0 {
                    overflow = true;
                    return i64::MAX;
                }
                underflow = true;
                return i64::MIN;
            };
            if value < 0 {
                underflow = true;
            } else if cap > 0 && value > cap {
                overflow = true;
            }
            value
        })
        .collect();

    VectorSum {
        out,
        ok: !overflow && !underflow,
        overflow,
        underflow,
    }
}

/// Elementary nets: on top of a successful base result, no slot may exceed
/// 1 and at most one place may hold a token.
fn commit_elementary(base: FireResult) -> FireResult {
    if !base.ok {
        return base;
    }
    let exceeds = base.out.iter().any(|v| *v > 1);
    let marked = base.out.iter().filter(|v| **v > 0).count();
    FireResult {
        ok: !exceeds && marked < 2,
        overflow: exceeds,
        ..base
    }
}

/// Workflow nets: saturate the raw result to a 0/1 marking.
///
/// Consumption underflow is forgiven. The firing commits when no place or
/// exactly one place ends up marked; a marked place that would have held
/// more than one token is accepted only for reentrant transitions.
fn commit_workflow(base: FireResult, allow_reentry: bool) -> FireResult {
    if base.inhibited {
        return base;
    }

    let mut outputs = 0;
    let mut overflow_outputs = 0;
    let saturated: Vector = base
        .out
        .iter()
        .map(|raw| {
            if *raw > 1 {
                overflow_outputs += 1;
            }
            if *raw > 0 {
                outputs += 1;
                1
            } else {
                0
            }
        })
        .collect();

    let (ok, overflow) = match (outputs, overflow_outputs) {
        (0, _) => (true, false),
        (1, 0) => (true, false),
        (1, _) if allow_reentry => (true, false),
        (1, _) => (false, true),
        _ => (false, overflow_outputs > 0),
    };

    FireResult {
        out: saturated,
        ok,
        overflow,
        underflow: false,
        ..base
    }
}

impl Net {
    fn action(&self, action: &str) -> Result<&Transition, CoreError> {
        self.transitions
            .get(action)
            .ok_or_else(|| CoreError::UnknownAction {
                action: action.to_string(),
            })
    }

    /// Returns whether any guard on `action` blocks firing from `state`.
    ///
    /// A standard guard blocks while the place holds at least
    /// `threshold * multiple` tokens; an inverted guard blocks until it does.
    pub fn guard_fails(&self, state: &[i64], action: &str, multiple: i64) -> Result<bool, CoreError> {
        let t = self.action(action)?;
        Ok(guards_block(t, state, multiple))
    }

    /// Computes the base result of firing `action` without touching `state`.
    pub fn test_fire(&self, state: &[i64], action: &str, multiple: i64) -> Result<FireResult, CoreError> {
        let t = self.action(action)?;
        Ok(self.base_result(t, state, multiple))
    }

    fn base_result(&self, t: &Transition, state: &[i64], multiple: i64) -> FireResult {
        if guards_block(t, state, multiple) {
            return FireResult {
                out: Vector::new(),
                ok: false,
                role: t.role.as_str().to_string(),
                inhibited: true,
                overflow: false,
                underflow: false,
            };
        }

        let capacity = self.capacity_vector();
        let sum = vector_add(state, &t.delta, multiple, Some(&capacity));
        FireResult {
            out: sum.out,
            ok: sum.ok,
            role: t.role.as_str().to_string(),
            inhibited: false,
            overflow: sum.overflow,
            underflow: sum.underflow,
        }
    }

    /// Applies the net type's commit policy to a hypothetical firing.
    /// Never mutates `state`.
    pub fn evaluate(&self, state: &[i64], action: &str, multiple: i64) -> Result<FireResult, CoreError> {
        let t = self.action(action)?;
        let base = self.base_result(t, state, multiple);
        Ok(match self.net_type {
            NetType::General => base,
            NetType::Elementary => commit_elementary(base),
            NetType::Workflow => commit_workflow(base, t.allow_reentry),
        })
    }

    /// Fires `action`, writing the result into `state` only when it is ok.
    pub fn fire(&self, state: &mut [i64], action: &str, multiple: i64) -> Result<FireResult, CoreError> {
        self.fire_with(state, action, multiple, |_| {}, |_| {})
    }

    /// Like [`Net::fire`], then runs `on_commit` or `on_reject` before
    /// returning.
    pub fn fire_with<C, R>(
        &self,
        state: &mut [i64],
        action: &str,
        multiple: i64,
        on_commit: C,
        on_reject: R,
    ) -> Result<FireResult, CoreError>
    where
        C: FnOnce(&FireResult),
        R: FnOnce(&FireResult),
    {
        let res = self.evaluate(state, action, multiple)?;
        if res.ok {
            commit(state, &res.out);
            tracing::debug!("{}: fired {} x{} -> {:?}", self.schema, action, multiple, res.out);
            on_commit(&res);
        } else {
            tracing::debug!(
                "{}: rejected {} x{} (inhibited={}, overflow={}, underflow={})",
                self.schema,
                action,
                multiple,
                res.inhibited,
                res.overflow,
                res.underflow
            );
            on_reject(&res);
        }
        Ok(res)
    }

    /// OR-branch firing without workflow validation.
    ///
    /// Accepts the base result when it is ok or when at most one place ends up
    /// marked, clamping negative slots to 0, and writes it into `state`.
    /// Guards still apply.
    pub fn push_state(&self, state: &mut [i64], action: &str, multiple: i64) -> Result<FireResult, CoreError> {
        let base = self.test_fire(state, action, multiple)?;
        if base.inhibited {
            return Ok(base);
        }

        let marked = base.out.iter().filter(|v| **v > 0).count();
        let out: Vector = base.out.iter().map(|v| (*v).max(0)).collect();
        let res = FireResult {
            ok: base.ok || marked <= 1,
            out,
            ..base
        };
        if res.ok {
            commit(state, &res.out);
        }
        Ok(res)
    }

    /// Labels of transitions the commit policy would accept from `state`.
    pub fn enabled_transitions(&self, state: &[i64]) -> Vec<&str> {
        self.transitions
            .keys()
            .filter(|label| {
                self.evaluate(state, label, 1)
                    .map(|res| res.ok)
                    .unwrap_or(false)
            })
            .map(|label| label.as_str())
            .collect()
    }
}

fn guards_block(t: &Transition, state: &[i64], multiple: i64) -> bool {
    t.guards.values().any(|guard| {
        let res = vector_add(state, &guard.delta, multiple, None);
        if guard.inverted {
            !res.ok
        } else {
            res.ok
        }
    })
}

fn commit(state: &mut [i64], out: &[i64]) {
    for (slot, value) in state.iter_mut().zip(out) {
        *slot = *value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::Declaration;
    use crate::model::Position;
    use proptest::prelude::*;

    fn inhibit_net() -> Net {
        Net::build("inhibit", NetType::General, |dsl| {
            let role = dsl.role("default");
            let foo = dsl.place("foo", 1, 0, Position::default())?;
            let bar = dsl.transition("bar", &role, Position::default())?;
            let baz = dsl.transition("baz", &role, Position::default())?;
            dsl.guard(&foo, 1, &baz)?;
            dsl.connect(&foo, 1, &bar)?;
            Ok(())
        })
        .unwrap()
    }

    fn reverse_guard_net() -> Net {
        Net::build("reverse", NetType::General, |dsl| {
            let role = dsl.role("default");
            let foo = dsl.place("foo", 0, 0, Position::default())?;
            let bar = dsl.transition("bar", &role, Position::default())?;
            let baz = dsl.transition("baz", &role, Position::default())?;
            dsl.connect(&bar, 1, &foo)?;
            dsl.guard(&baz, 3, &foo)?;
            Ok(())
        })
        .unwrap()
    }

    fn reentry_net(allow_reentry: bool) -> Net {
        Net::build("reentry", NetType::Workflow, |dsl| {
            let role = dsl.role("default");
            let p = dsl.place("p", 1, 0, Position::default())?;
            let t = dsl.transition("t", &role, Position::default())?;
            dsl.connect(&t, 1, &p)?;
            if allow_reentry {
                dsl.reentry(&t, &p)?;
            }
            Ok(())
        })
        .unwrap()
    }

    #[test]
    fn test_vector_add() {
        let sum = vector_add(&[1, 2], &[-1, 1], 1, None);
        assert_eq!(sum.out, vec![0, 3]);
        assert!(sum.ok);

        let sum = vector_add(&[1, 2], &[-1, 1], 2, Some(&[0, 3]));
        assert_eq!(sum.out, vec![-1, 4]);
        assert!(sum.underflow);
        assert!(sum.overflow);
        assert!(!sum.ok);

        // Short delta and capacity vectors pad with zeros.
        let sum = vector_add(&[5, 5], &[1], 1, Some(&[6]));
        assert_eq!(sum.out, vec![6, 5]);
        assert!(sum.ok);
    }

    #[test]
    fn test_vector_add_out_of_range() {
        let sum = vector_add(&[0], &[2], i64::MAX, None);
        assert_eq!(sum.out, vec![i64::MAX]);
        assert!(sum.overflow);
        assert!(!sum.ok);

        let sum = vector_add(&[1], &[-2], i64::MAX, None);
        assert!(sum.underflow);
        assert!(!sum.overflow);

        let sum = vector_add(&[i64::MAX], &[1], 1, None);
        assert!(sum.overflow);
    }

    #[test]
    fn test_fire_huge_multiple_is_rejected() {
        let net = Net::build("big", NetType::General, |dsl| {
            let role = dsl.role("default");
            let p = dsl.place("p", 0, 0, Position::default())?;
            let t = dsl.transition("t", &role, Position::default())?;
            dsl.connect(&t, 2, &p)
        })
        .unwrap();

        let mut state = net.initial_vector();
        let res = net.fire(&mut state, "t", i64::MAX).unwrap();
        assert!(!res.ok);
        assert!(res.overflow);
        assert_eq!(state, vec![0]);
    }

    #[test]
    fn test_inhibitor_scenario() {
        let net = inhibit_net();
        let mut state = net.initial_vector();

        let res = net.fire(&mut state, "baz", 1).unwrap();
        assert!(!res.ok);
        assert!(res.inhibited);
        assert_eq!(state, vec![1]);

        let res = net.fire(&mut state, "bar", 1).unwrap();
        assert!(res.ok);
        assert_eq!(state, vec![0]);

        let res = net.fire(&mut state, "baz", 1).unwrap();
        assert!(res.ok);
        assert_eq!(res.role, "default");

        let res = net.fire(&mut state, "bar", 1).unwrap();
        assert!(!res.ok);
        assert!(res.underflow);
        assert_eq!(state, vec![0]);
    }

    #[test]
    fn test_reverse_guard_scenario() {
        let net = reverse_guard_net();
        let mut state = net.initial_vector();

        for expected in 1..=3 {
            assert!(net.guard_fails(&state, "baz", 1).unwrap());
            assert!(!net.fire(&mut state, "baz", 1).unwrap().ok);
            assert!(net.fire(&mut state, "bar", 1).unwrap().ok);
            assert_eq!(state, vec![expected]);
        }

        assert!(!net.guard_fails(&state, "baz", 1).unwrap());
        assert!(net.fire(&mut state, "baz", 1).unwrap().ok);
    }

    #[test]
    fn test_workflow_reentry() {
        let net = reentry_net(true);
        let mut state = net.initial_vector();
        let res = net.fire(&mut state, "t", 1).unwrap();
        assert!(res.ok);
        assert!(!res.overflow);
        assert_eq!(state, vec![1]);

        let net = reentry_net(false);
        let mut state = net.initial_vector();
        let res = net.fire(&mut state, "t", 1).unwrap();
        assert!(!res.ok);
        assert!(res.overflow);
        assert_eq!(state, vec![1]);
    }

    #[test]
    fn test_workflow_net_forgives_underflow() {
        let json = r#"{
            "netType": "workflow",
            "version": "v0",
            "places": {
                "entry": {"initial": 1, "x": 852, "y": 54},
                "exit": {"x": 863, "y": 546},
                "place2": {"x": 738, "y": 367},
                "place3": {"x": 962, "y": 359}
            },
            "transitions": {
                "txn0": {"x": 728, "y": 155},
                "txn1": {"x": 964, "y": 147},
                "txn6": {"x": 861, "y": 455}
            },
            "arcs": [
                {"source": "entry", "target": "txn0", "weight": 1},
                {"source": "entry", "target": "txn1", "weight": 1},
                {"source": "place3", "target": "txn6", "weight": 1},
                {"source": "place2", "target": "txn6", "weight": 1},
                {"source": "txn6", "target": "exit", "weight": 1},
                {"source": "txn0", "target": "place2", "weight": 1},
                {"source": "txn1", "target": "place3", "weight": 1}
            ]
        }"#;
        let decl = Declaration::from_json_str(json).unwrap();
        let net = Net::from_declaration("wfNet", &decl).unwrap();
        assert_eq!(net.net_type(), NetType::Workflow);

        let mut state = net.initial_vector();
        assert_eq!(state, vec![1, 0, 0, 0]);

        // Two places would be marked.
        assert!(!net.fire(&mut state, "txn6", 1).unwrap().ok);
        assert_eq!(state, vec![1, 0, 0, 0]);

        assert!(net.fire(&mut state, "txn0", 1).unwrap().ok);
        assert_eq!(state, vec![0, 0, 1, 0]);

        // place3 underflows, which workflow nets ignore.
        let res = net.fire(&mut state, "txn6", 1).unwrap();
        assert!(res.ok);
        assert!(!res.underflow);
        assert_eq!(state, vec![0, 1, 0, 0]);
    }

    #[test]
    fn test_elementary_single_token() {
        let net = Net::build("safe", NetType::Elementary, |dsl| {
            let role = dsl.role("default");
            let a = dsl.place("a", 1, 1, Position::default())?;
            let b = dsl.place("b", 0, 1, Position::default())?;
            let c = dsl.place("c", 0, 1, Position::default())?;
            let split = dsl.transition("split", &role, Position::default())?;
            let step = dsl.transition("step", &role, Position::default())?;
            dsl.connect(&a, 1, &split)?;
            dsl.connect(&split, 1, &b)?;
            dsl.connect(&split, 1, &c)?;
            dsl.connect(&a, 1, &step)?;
            dsl.connect(&step, 1, &b)?;
            Ok(())
        })
        .unwrap();

        let mut state = net.initial_vector();
        let res = net.fire(&mut state, "split", 1).unwrap();
        assert!(!res.ok);
        assert_eq!(state, vec![1, 0, 0]);

        let res = net.fire(&mut state, "step", 1).unwrap();
        assert!(res.ok);
        assert_eq!(state, vec![0, 1, 0]);
    }

    #[test]
    fn test_capacity_overflow() {
        let net = Net::build("cap", NetType::General, |dsl| {
            let role = dsl.role("default");
            let p = dsl.place("p", 0, 2, Position::default())?;
            let t = dsl.transition("t", &role, Position::default())?;
            dsl.connect(&t, 1, &p)
        })
        .unwrap();

        let mut state = net.initial_vector();
        assert!(net.fire(&mut state, "t", 2).unwrap().ok);
        let res = net.fire(&mut state, "t", 1).unwrap();
        assert!(!res.ok);
        assert!(res.overflow);
        assert_eq!(state, vec![2]);
    }

    #[test]
    fn test_unknown_action() {
        let net = inhibit_net();
        let mut state = net.initial_vector();
        assert!(matches!(
            net.fire(&mut state, "nope", 1),
            Err(CoreError::UnknownAction { .. })
        ));
        assert!(matches!(
            net.guard_fails(&state, "nope", 1),
            Err(CoreError::UnknownAction { .. })
        ));
    }

    #[test]
    fn test_fire_with_callbacks() {
        let net = inhibit_net();
        let mut state = net.initial_vector();
        let mut committed = Vec::new();
        let mut rejected = Vec::new();

        net.fire_with(
            &mut state,
            "baz",
            1,
            |r| committed.push(r.clone()),
            |r| rejected.push(r.clone()),
        )
        .unwrap();
        net.fire_with(
            &mut state,
            "bar",
            1,
            |r| committed.push(r.clone()),
            |r| rejected.push(r.clone()),
        )
        .unwrap();

        assert_eq!(committed.len(), 1);
        assert_eq!(rejected.len(), 1);
        assert!(rejected[0].inhibited);
    }

    #[test]
    fn test_push_state_clamps_and_accepts_single_output() {
        let net = Net::build("or", NetType::General, |dsl| {
            let role = dsl.role("default");
            let a = dsl.place("a", 0, 0, Position::default())?;
            let b = dsl.place("b", 0, 0, Position::default())?;
            let t = dsl.transition("t", &role, Position::default())?;
            dsl.connect(&a, 1, &t)?;
            dsl.connect(&t, 1, &b)
        })
        .unwrap();

        let mut state = net.initial_vector();
        assert!(!net.fire(&mut state, "t", 1).unwrap().ok);

        let res = net.push_state(&mut state, "t", 1).unwrap();
        assert!(res.ok);
        assert_eq!(res.out, vec![0, 1]);
        assert_eq!(state, vec![0, 1]);
    }

    #[test]
    fn test_enabled_transitions() {
        let net = inhibit_net();
        let state = net.initial_vector();
        assert_eq!(net.enabled_transitions(&state), vec!["bar"]);
        assert_eq!(net.enabled_transitions(&[0]), vec!["baz"]);
    }

    /// A net with a single place holding `tokens` and one guarded transition.
    fn guard_net(tokens: i64, weight: i64, inverted: bool) -> Net {
        Net::build("guard", NetType::General, |dsl| {
            let role = dsl.role("default");
            let p = dsl.place("p", tokens, 0, Position::default())?;
            let t = dsl.transition("t", &role, Position::default())?;
            if inverted {
                dsl.guard(&t, weight, &p)
            } else {
                dsl.guard(&p, weight, &t)
            }
        })
        .unwrap()
    }

    /// Single token in place 0; each transition moves between places with
    /// unit weights.
    fn arb_unit_net(net_type: NetType) -> impl Strategy<Value = (Net, Vec<usize>)> {
        (1usize..5, 1usize..4)
            .prop_flat_map(|(places, transitions)| {
                (
                    Just(places),
                    Just(transitions),
                    prop::collection::vec(-1i64..=1, places * transitions),
                    prop::collection::vec(0..transitions, 0..12),
                )
            })
            .prop_map(move |(places, transitions, deltas, sequence)| {
                let net = Net::build("arb", net_type, |dsl| {
                    let role = dsl.role("default");
                    let mut ps = Vec::new();
                    for i in 0..places {
                        let initial = if i == 0 { 1 } else { 0 };
                        ps.push(dsl.place(&format!("p{}", i), initial, 1, Position::default())?);
                    }
                    for ti in 0..transitions {
                        let t = dsl.transition(&format!("t{}", ti), &role, Position::default())?;
                        for (pi, p) in ps.iter().enumerate() {
                            match deltas[ti * places + pi] {
                                1 => dsl.connect(&t, 1, p)?,
                                -1 => dsl.connect(p, 1, &t)?,
                                _ => {}
                            }
                        }
                    }
                    Ok(())
                })
                .unwrap();
                (net, sequence)
            })
    }

    proptest! {
        #[test]
        fn prop_guard_inversion(tokens in 0i64..12, weight in 1i64..5, multiple in 1i64..4) {
            let standard = guard_net(tokens, weight, false);
            let state = standard.initial_vector();
            prop_assert_eq!(
                standard.guard_fails(&state, "t", multiple).unwrap(),
                tokens >= weight * multiple
            );

            let inverted = guard_net(tokens, weight, true);
            prop_assert_eq!(
                inverted.guard_fails(&state, "t", multiple).unwrap(),
                tokens < weight * multiple
            );
        }

        #[test]
        fn prop_test_fire_is_pure((net, sequence) in arb_unit_net(NetType::General)) {
            let mut state = net.initial_vector();
            for ti in sequence {
                let action = format!("t{}", ti);
                let before = state.clone();
                let probe = net.test_fire(&state, &action, 1).unwrap();
                prop_assert_eq!(&state, &before);

                let res = net.fire(&mut state, &action, 1).unwrap();
                prop_assert_eq!(res.ok, probe.ok);
                if res.ok {
                    prop_assert_eq!(&state, &res.out);
                } else {
                    prop_assert_eq!(&state, &before);
                }
            }
        }

        #[test]
        fn prop_elementary_single_token((net, sequence) in arb_unit_net(NetType::Elementary)) {
            let mut state = net.initial_vector();
            for ti in sequence {
                let res = net.fire(&mut state, &format!("t{}", ti), 1).unwrap();
                if res.ok {
                    prop_assert!(state.iter().all(|v| (0..=1).contains(v)));
                    prop_assert!(state.iter().filter(|v| **v > 0).count() <= 1);
                }
            }
        }

        #[test]
        fn prop_workflow_output_saturated((net, sequence) in arb_unit_net(NetType::Workflow)) {
            let mut state = net.initial_vector();
            for ti in sequence {
                let res = net.fire(&mut state, &format!("t{}", ti), 1).unwrap();
                if res.ok {
                    prop_assert!(res.out.iter().all(|v| *v == 0 || *v == 1));
                    prop_assert!(state.iter().all(|v| *v == 0 || *v == 1));
                }
            }
        }
    }
}
