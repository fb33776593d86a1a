use indexmap::IndexMap;
use petgraph::unionfind::UnionFind;

use crate::constraints::{ConstraintId, ConstraintKind};
use crate::system::ConstraintSystem;
use crate::types::{Ty, TypeVarId};

/// One independently solvable slice of the active system: the free
/// representative variables it spans and its constraints in active-list
/// order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Component {
    /// Free representative variables of the component, sorted by id.
    pub vars: Vec<TypeVarId>,
    /// The component's constraints, in active-list order.
    pub constraints: Vec<ConstraintId>,
}

/// Result of partitioning the active constraints: components numbered by
/// their smallest variable id, plus the orphans (active constraints with
/// no free variables left).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    /// Independently solvable components, in stable order.
    pub components: Vec<Component>,
    /// Constraints with no free type variables at partition time.
    pub orphans: Vec<ConstraintId>,
}

fn collect_ty_vars(cs: &ConstraintSystem, ty: &Ty, out: &mut Vec<TypeVarId>) {
    if let Ty::Var(root) = cs.resolved_ty(ty) {
        if !out.contains(&root) {
            out.push(root);
        }
    }
}

/// The unbound representative variables a constraint mentions. A
/// disjunction spans the union over its nested alternatives.
pub fn free_vars(cs: &ConstraintSystem, id: ConstraintId) -> Vec<TypeVarId> {
    let mut out = Vec::new();
    let mut stack = vec![id];
    while let Some(id) = stack.pop() {
        match &cs.constraint(id).kind {
            ConstraintKind::Equal { lhs, rhs } | ConstraintKind::Conforms { lhs, rhs } => {
                collect_ty_vars(cs, lhs, &mut out);
                collect_ty_vars(cs, rhs, &mut out);
            }
            ConstraintKind::BindOverload { var, choice } => {
                collect_ty_vars(cs, &Ty::Var(*var), &mut out);
                collect_ty_vars(cs, &choice.ty, &mut out);
            }
            ConstraintKind::Disjunction { nested } => stack.extend(nested.iter().copied()),
        }
    }
    out
}

/// Partitions the active constraint set: two constraints land in the same
/// component iff they are connected through a shared free type variable.
/// Unbound active variables touched by no constraint become singleton
/// components of their own so that literal defaults can still bind them.
pub fn connected_components(cs: &ConstraintSystem) -> Partition {
    let per_constraint: Vec<(ConstraintId, Vec<TypeVarId>)> = cs
        .active()
        .iter()
        .map(|id| (*id, free_vars(cs, *id)))
        .collect();

    // Dense indices for every free representative in play.
    let mut dense: IndexMap<TypeVarId, usize> = IndexMap::new();
    let mut note = |var: TypeVarId, dense: &mut IndexMap<TypeVarId, usize>| {
        let next = dense.len();
        *dense.entry(var).or_insert(next)
    };
    for (_, vars) in per_constraint.iter() {
        for var in vars.iter() {
            note(*var, &mut dense);
        }
    }
    for var in cs.active_vars().iter() {
        let root = cs.find_root(*var);
        if cs.binding_of(root).is_none() {
            note(root, &mut dense);
        }
    }

    let mut uf: UnionFind<usize> = UnionFind::new(dense.len());
    let mut orphans = Vec::new();
    for (id, vars) in per_constraint.iter() {
        if vars.is_empty() {
            orphans.push(*id);
            continue;
        }
        for pair in vars.windows(2) {
            uf.union(dense[&pair[0]], dense[&pair[1]]);
        }
    }

    let mut grouped: IndexMap<usize, Component> = IndexMap::new();
    for (var, idx) in dense.iter() {
        let rep = uf.find(*idx);
        grouped
            .entry(rep)
            .or_insert_with(|| Component {
                vars: vec![],
                constraints: vec![],
            })
            .vars
            .push(*var);
    }
    for (id, vars) in per_constraint.iter() {
        if vars.is_empty() {
            continue;
        }
        let rep = uf.find(dense[&vars[0]]);
        grouped.get_mut(&rep).unwrap().constraints.push(*id);
    }

    let mut components: Vec<Component> = grouped.into_iter().map(|(_, c)| c).collect();
    for component in components.iter_mut() {
        component.vars.sort();
    }
    components.sort_by_key(|c| c.vars[0]);

    Partition {
        components,
        orphans,
    }
}
