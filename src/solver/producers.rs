use indexmap::IndexSet;

use crate::constraints::{ConstraintId, ConstraintKind};
use crate::simplify::BindingSource;
use crate::system::ConstraintSystem;
use crate::types::{Ty, TypeVarId};

/// One candidate type for a variable, with its provenance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PotentialBinding {
    /// The candidate type.
    pub ty: Ty,
    /// Where the candidate came from; literal defaults sort last.
    pub source: BindingSource,
}

/// The ranked candidate set for one variable: direct bounds stated by its
/// constraints first, then widenings of lower bounds, then the literal
/// default. Duplicates keep their highest-priority occurrence.
#[derive(Debug, Clone)]
pub struct PotentialBindings {
    /// The representative variable the candidates are for.
    pub type_var: TypeVarId,
    /// Candidates in priority order.
    pub bindings: Vec<PotentialBinding>,
    /// How many active constraints mention the variable; used to prefer
    /// the most constrained variable on ties.
    pub involved_constraints: usize,
}

impl PotentialBindings {
    /// Collects candidates for `var` from the active constraints.
    pub fn collect(cs: &ConstraintSystem, var: TypeVarId) -> PotentialBindings {
        let root = cs.find_root(var);
        let mentions = |lhs: &Ty, rhs: &Ty| {
            [lhs, rhs]
                .iter()
                .any(|t| cs.resolved_ty(t) == Ty::Var(root))
        };

        let mut exact: Vec<Ty> = Vec::new();
        let mut lower_bounds: Vec<String> = Vec::new();
        let mut involved = 0;
        for id in cs.active() {
            match &cs.constraint(*id).kind {
                ConstraintKind::Equal { lhs, rhs } | ConstraintKind::Conforms { lhs, rhs }
                    if mentions(lhs, rhs) =>
                {
                    involved += 1;
                    let (a, b) = (cs.resolved_ty(lhs), cs.resolved_ty(rhs));
                    match (a, b) {
                        // var <= T or var == T: T itself is a candidate.
                        (Ty::Var(_), Ty::Con(upper)) => exact.push(Ty::Con(upper)),
                        // T <= var: T is a candidate, and so is anything
                        // T widens to.
                        (Ty::Con(lower), Ty::Var(_)) => {
                            exact.push(Ty::con(&lower));
                            lower_bounds.push(lower);
                        }
                        _ => {}
                    }
                }
                ConstraintKind::Disjunction { .. } | ConstraintKind::BindOverload { .. } => {}
                _ => {}
            }
        }

        let mut seen: IndexSet<Ty> = IndexSet::new();
        let mut bindings = Vec::new();
        for ty in exact {
            if seen.insert(ty.clone()) {
                bindings.push(PotentialBinding {
                    ty,
                    source: BindingSource::Exact,
                });
            }
        }
        for lower in lower_bounds {
            for wider in cs.conversions().supertypes_of(&lower) {
                let ty = Ty::con(&wider);
                if seen.insert(ty.clone()) {
                    bindings.push(PotentialBinding {
                        ty,
                        source: BindingSource::Supertype,
                    });
                }
            }
        }
        if let Some(default) = cs.literal_default(root) {
            if seen.insert(default.clone()) {
                bindings.push(PotentialBinding {
                    ty: default.clone(),
                    source: BindingSource::LiteralDefault,
                });
            }
        }

        PotentialBindings {
            type_var: root,
            bindings,
            involved_constraints: involved,
        }
    }

    /// Whether attempting this variable can make progress at all.
    pub fn is_viable(&self) -> bool {
        !self.bindings.is_empty()
    }
}

/// Picks the best variable to attempt next: fewest candidates first, ties
/// broken by most adjacent constraints, then smallest id.
pub fn best_binding_target(cs: &ConstraintSystem) -> Option<PotentialBindings> {
    let mut roots: IndexSet<TypeVarId> = IndexSet::new();
    for var in cs.active_vars() {
        let root = cs.find_root(*var);
        if cs.binding_of(root).is_none() {
            roots.insert(root);
        }
    }
    roots
        .into_iter()
        .map(|root| PotentialBindings::collect(cs, root))
        .filter(PotentialBindings::is_viable)
        .min_by_key(|pb| {
            (
                pb.bindings.len(),
                usize::MAX - pb.involved_constraints,
                pb.type_var,
            )
        })
}

/// Cursor over a variable's candidates, in priority order. The cursor
/// only moves forward; once exhausted the producer is done.
#[derive(Debug)]
pub struct TypeVarBindingProducer {
    bindings: Vec<PotentialBinding>,
    cursor: usize,
}

impl TypeVarBindingProducer {
    /// A producer over a collected candidate set.
    pub fn new(bindings: PotentialBindings) -> TypeVarBindingProducer {
        TypeVarBindingProducer {
            bindings: bindings.bindings,
            cursor: 0,
        }
    }

    /// The next candidate without advancing.
    pub fn peek(&self) -> Option<&PotentialBinding> {
        self.bindings.get(self.cursor)
    }

    /// Pulls the next candidate.
    pub fn next(&mut self) -> Option<PotentialBinding> {
        let binding = self.bindings.get(self.cursor).cloned();
        if binding.is_some() {
            self.cursor += 1;
        }
        binding
    }
}

/// Cursor over a disjunction's alternatives, in declared order.
#[derive(Debug)]
pub struct DisjunctionChoiceProducer {
    choices: Vec<ConstraintId>,
    cursor: usize,
}

impl DisjunctionChoiceProducer {
    /// A producer over the alternatives of `disjunction`.
    pub fn new(cs: &ConstraintSystem, disjunction: ConstraintId) -> DisjunctionChoiceProducer {
        let choices = match &cs.constraint(disjunction).kind {
            ConstraintKind::Disjunction { nested } => nested.clone(),
            other => panic!("disjunction step over non-disjunction: {}", other),
        };
        DisjunctionChoiceProducer { choices, cursor: 0 }
    }

    /// The next pending alternative and its declared index, without
    /// advancing.
    pub fn peek(&self) -> Option<(ConstraintId, usize)> {
        self.choices.get(self.cursor).map(|c| (*c, self.cursor))
    }

    /// Moves past the current alternative.
    pub fn advance(&mut self) {
        self.cursor += 1;
    }
}
