use log::trace;

use crate::constraints::{ConstraintId, ConstraintKind, OverloadChoice};
use crate::score::ScoreKind;
use crate::system::{ConstraintSystem, ResolvedOverload};
use crate::types::{Ty, TypeVarId};

/// Outcome of simplifying a single constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimplifyResult {
    /// The constraint is satisfied and can be retired.
    Solved,
    /// The constraint cannot be satisfied under the current bindings.
    Error,
    /// Not enough information yet; the constraint stays active.
    Unsolved,
}

/// Outcome of driving the active list to a fixpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimplifyOutcome {
    /// No contradiction; anything solvable has been retired.
    Simplified,
    /// Some constraint reported an inconsistency.
    Contradiction,
}

/// Where a candidate binding came from. Determines both its priority in
/// the producer ordering and its score contribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingSource {
    /// A bound stated directly by a constraint.
    Exact,
    /// A widening of a stated lower bound.
    Supertype,
    /// The variable's literal-default metadata; last resort.
    LiteralDefault,
}

/// Simplifies one constraint under the current bindings. Equalities unify
/// (binding variables or merging equivalence classes); conformances check
/// convertibility once both sides are concrete, charging a conversion
/// penalty when the types differ; overload bindings commit their choice.
/// Disjunctions are never decided here, that is the step machine's job.
pub fn simplify_constraint(cs: &mut ConstraintSystem, id: ConstraintId) -> SimplifyResult {
    let kind = cs.constraint(id).kind.clone();
    match kind {
        ConstraintKind::Equal { lhs, rhs } => {
            let (a, b) = (cs.resolved_ty(&lhs), cs.resolved_ty(&rhs));
            match (a, b) {
                (Ty::Con(x), Ty::Con(y)) => {
                    if x == y {
                        SimplifyResult::Solved
                    } else {
                        trace!("equality contradiction: {} vs {}", x, y);
                        SimplifyResult::Error
                    }
                }
                (Ty::Var(root), concrete @ Ty::Con(_))
                | (concrete @ Ty::Con(_), Ty::Var(root)) => {
                    cs.bind(root, concrete);
                    SimplifyResult::Solved
                }
                (Ty::Var(r1), Ty::Var(r2)) => {
                    if r1 != r2 {
                        cs.merge(r1, r2);
                    }
                    SimplifyResult::Solved
                }
            }
        }
        ConstraintKind::Conforms { lhs, rhs } => {
            let (a, b) = (cs.resolved_ty(&lhs), cs.resolved_ty(&rhs));
            match (a, b) {
                (Ty::Con(x), Ty::Con(y)) => {
                    if x == y {
                        SimplifyResult::Solved
                    } else if cs.conversions().converts(&x, &y) {
                        cs.bump_score(ScoreKind::ValueConversion);
                        SimplifyResult::Solved
                    } else {
                        trace!("conformance contradiction: {} <= {}", x, y);
                        SimplifyResult::Error
                    }
                }
                _ => SimplifyResult::Unsolved,
            }
        }
        ConstraintKind::BindOverload { var, choice } => apply_choice(cs, var, &choice),
        ConstraintKind::Disjunction { nested } => {
            let any_enabled = nested.iter().any(|alt| cs.constraint(*alt).is_enabled());
            if any_enabled {
                SimplifyResult::Unsolved
            } else {
                SimplifyResult::Error
            }
        }
    }
}

/// Drives the active constraint list to a fixpoint, retiring everything
/// that simplifies to solved. A single binding can make further
/// constraints solvable, hence the outer loop.
pub fn simplify_active(cs: &mut ConstraintSystem) -> SimplifyOutcome {
    loop {
        let mut progressed = false;
        for id in cs.active().to_vec() {
            if !cs.is_active(id) {
                continue;
            }
            match simplify_constraint(cs, id) {
                SimplifyResult::Solved => {
                    cs.retire_constraint(id);
                    progressed = true;
                }
                SimplifyResult::Error => return SimplifyOutcome::Contradiction,
                SimplifyResult::Unsolved => {}
            }
        }
        if !progressed {
            return SimplifyOutcome::Simplified;
        }
    }
}

/// Records a binding for `var`'s representative. A literal-default source
/// charges its penalty; conversion costs of supertype bindings surface
/// later, when the conformance constraints that motivated them simplify.
pub fn apply_binding(
    cs: &mut ConstraintSystem,
    var: TypeVarId,
    ty: &Ty,
    source: BindingSource,
) -> SimplifyResult {
    let root = cs.find_root(var);
    if let Some(existing) = cs.binding_of(root).cloned() {
        return if existing == *ty {
            SimplifyResult::Solved
        } else {
            SimplifyResult::Error
        };
    }
    cs.bind(root, ty.clone());
    if source == BindingSource::LiteralDefault {
        cs.bump_score(ScoreKind::LiteralDefault);
    }
    SimplifyResult::Solved
}

/// Commits one overload choice: binds the set's variable, pushes a
/// resolved-overload record, and charges the generic penalty if the
/// declaration is generic.
pub fn apply_choice(
    cs: &mut ConstraintSystem,
    var: TypeVarId,
    choice: &OverloadChoice,
) -> SimplifyResult {
    let root = cs.find_root(var);
    match cs.binding_of(root).cloned() {
        Some(existing) => {
            if existing != cs.resolved_ty(&choice.ty) {
                return SimplifyResult::Error;
            }
        }
        None => match cs.resolved_ty(&choice.ty) {
            concrete @ Ty::Con(_) => cs.bind(root, concrete),
            Ty::Var(other) => cs.merge(root, other),
        },
    }
    // Record against the representative as it stands after the merge, so
    // later overload sets chained through equalities can find it.
    let representative = cs.find_root(root);
    cs.push_resolved_overload(ResolvedOverload {
        var: representative,
        decl: choice.decl.clone(),
    });
    if choice.generic {
        cs.bump_score(ScoreKind::GenericOverload);
    }
    SimplifyResult::Solved
}

/// Applies one disjunction alternative inside an attempt scope. An
/// alternative that simplifies away is committed; one that stays unsolved
/// is activated into the active list so the follow-up split picks it up.
pub fn apply_choice_constraint(cs: &mut ConstraintSystem, alt: ConstraintId) -> SimplifyResult {
    match simplify_constraint(cs, alt) {
        SimplifyResult::Unsolved => {
            cs.activate_constraint(alt);
            SimplifyResult::Solved
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::{
        apply_binding, apply_choice, simplify_active, simplify_constraint, BindingSource,
        SimplifyOutcome, SimplifyResult,
    };
    use crate::constraints::{ConstraintKind, OverloadChoice};
    use crate::score::{Score, ScoreKind};
    use crate::system::ConstraintSystem;
    use crate::types::Ty;

    #[test]
    fn equality_binds_through_chains() {
        let mut cs = ConstraintSystem::default();
        let t = cs.new_var("T");
        let u = cs.new_var("U");
        cs.add_constraint(ConstraintKind::Equal {
            lhs: Ty::Var(t),
            rhs: Ty::Var(u),
        });
        cs.add_constraint(ConstraintKind::Equal {
            lhs: Ty::Var(u),
            rhs: Ty::con("Int"),
        });

        assert_eq!(simplify_active(&mut cs), SimplifyOutcome::Simplified);
        assert!(cs.active().is_empty());
        assert_eq!(cs.binding_of(t), Some(&Ty::con("Int")));
        assert_eq!(cs.binding_of(u), Some(&Ty::con("Int")));
    }

    #[test]
    fn conformance_charges_a_conversion() {
        let mut cs = ConstraintSystem::default();
        let id = cs.add_constraint(ConstraintKind::Conforms {
            lhs: Ty::con("Int"),
            rhs: Ty::con("Float"),
        });
        assert_eq!(simplify_constraint(&mut cs, id), SimplifyResult::Solved);
        assert_eq!(cs.current_score(), Score::of(ScoreKind::ValueConversion));
    }

    #[test]
    fn conformance_waits_for_bindings() {
        let mut cs = ConstraintSystem::default();
        let t = cs.new_var("T");
        let id = cs.add_constraint(ConstraintKind::Conforms {
            lhs: Ty::Var(t),
            rhs: Ty::con("Float"),
        });
        assert_eq!(simplify_constraint(&mut cs, id), SimplifyResult::Unsolved);
    }

    #[test]
    fn contradiction_surfaces_from_fixpoint() {
        let mut cs = ConstraintSystem::default();
        let t = cs.new_var("T");
        cs.add_constraint(ConstraintKind::Equal {
            lhs: Ty::Var(t),
            rhs: Ty::con("Int"),
        });
        cs.add_constraint(ConstraintKind::Equal {
            lhs: Ty::Var(t),
            rhs: Ty::con("String"),
        });
        assert_eq!(simplify_active(&mut cs), SimplifyOutcome::Contradiction);
    }

    #[test]
    fn rebinding_conflicts_are_errors() {
        let mut cs = ConstraintSystem::default();
        let t = cs.new_var("T");
        assert_eq!(
            apply_binding(&mut cs, t, &Ty::con("Int"), BindingSource::Exact),
            SimplifyResult::Solved
        );
        assert_eq!(
            apply_binding(&mut cs, t, &Ty::con("Float"), BindingSource::Exact),
            SimplifyResult::Error
        );
    }

    #[test]
    fn literal_default_binding_is_penalized() {
        let mut cs = ConstraintSystem::default();
        let t = cs.new_var("T");
        apply_binding(&mut cs, t, &Ty::con("Int"), BindingSource::LiteralDefault);
        assert_eq!(cs.current_score(), Score::of(ScoreKind::LiteralDefault));
    }

    #[test]
    fn overload_choice_records_resolution() {
        let mut cs = ConstraintSystem::default();
        let op = cs.new_var("op");
        let choice = OverloadChoice::generic("plus", Ty::con("Int"));
        assert_eq!(apply_choice(&mut cs, op, &choice), SimplifyResult::Solved);
        assert_eq!(cs.binding_of(op), Some(&Ty::con("Int")));
        assert_eq!(cs.resolved_overloads().len(), 1);
        assert_eq!(cs.resolved_overloads()[0].decl, "plus");
        assert_eq!(cs.current_score(), Score::of(ScoreKind::GenericOverload));
    }

    #[test]
    fn disjunction_with_no_enabled_choices_is_an_error() {
        let mut cs = ConstraintSystem::default();
        let t = cs.new_var("T");
        let alt = cs.alloc_constraint(ConstraintKind::Equal {
            lhs: Ty::Var(t),
            rhs: Ty::con("Int"),
        });
        let d = cs.add_constraint(ConstraintKind::Disjunction { nested: vec![alt] });
        cs.set_choice_enabled_untracked(alt, false);
        assert_eq!(simplify_constraint(&mut cs, d), SimplifyResult::Error);
    }
}
