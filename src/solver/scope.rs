use indexmap::IndexSet;

use crate::constraints::ConstraintId;
use crate::system::TrailMark;
use crate::types::TypeVarId;

/// A transaction over solver mutations: captures the trail position at
/// creation; closing it through
/// [close_scope](crate::system::ConstraintSystem::close_scope) reverses
/// every tracked mutation made while it was live, restoring the tracked
/// slice of the constraint system byte for byte.
///
/// Scopes nest strictly. The depth token is checked on close, so dropping
/// one out of LIFO order aborts the solve instead of corrupting state.
#[derive(Debug)]
pub struct Scope {
    pub(crate) mark: TrailMark,
    pub(crate) depth: usize,
}

/// The component variant of [Scope]: on top of the trail mark it holds the
/// shared active lists that were swapped aside while one component runs.
/// A `single` component skips this entirely, the whole system already is
/// the component.
#[derive(Debug)]
pub struct ComponentScope {
    pub(crate) scope: Scope,
    pub(crate) saved_active: Vec<ConstraintId>,
    pub(crate) saved_vars: IndexSet<TypeVarId>,
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::constraints::ConstraintKind;
    use crate::system::ConstraintSystem;
    use crate::types::Ty;

    #[test]
    fn nested_scopes_rewind_in_lifo_order() {
        let mut cs = ConstraintSystem::default();
        let t = cs.new_var("T");
        let u = cs.new_var("U");

        let outer = cs.open_scope();
        cs.bind(t, Ty::con("Int"));
        let inner = cs.open_scope();
        cs.bind(u, Ty::con("Float"));

        cs.close_scope(inner);
        assert_eq!(cs.binding_of(u), None);
        assert_eq!(cs.binding_of(t), Some(&Ty::con("Int")));

        cs.close_scope(outer);
        assert_eq!(cs.binding_of(t), None);
    }

    #[test]
    fn component_isolation_swaps_and_restores_active_lists() {
        let mut cs = ConstraintSystem::default();
        let a = cs.new_var("A");
        let b = cs.new_var("B");
        let ca = cs.add_constraint(ConstraintKind::Conforms {
            lhs: Ty::Var(a),
            rhs: Ty::con("Int"),
        });
        let cb = cs.add_constraint(ConstraintKind::Conforms {
            lhs: Ty::Var(b),
            rhs: Ty::con("Int"),
        });
        let digest = cs.state_digest();

        let scope = cs.isolate_component(&[a], &[ca]);
        assert_eq!(cs.active(), &[ca]);
        assert!(cs.active_vars().contains(&a));
        assert!(!cs.active_vars().contains(&b));

        // Mutations inside the component are rewound before the swap back.
        cs.bind(a, Ty::con("Int"));
        cs.retire_constraint(ca);

        cs.restore_component(scope);
        assert_eq!(cs.active(), &[ca, cb]);
        assert_eq!(cs.state_digest(), digest);
    }
}
