use std::collections::HashMap;

use anyhow::{anyhow, bail, Result};
use indexmap::IndexSet;
use log::trace;

use crate::constraints::{
    parse_constraint_set, Constraint, ConstraintId, ConstraintKind, OverloadChoice,
    ParsedConstraint, ParsedTerm,
};
use crate::score::{Score, ScoreKind};
use crate::solution::Solution;
use crate::solver::scope::{ComponentScope, Scope};
use crate::types::{ConversionTable, Ty, TypeVarId, TypeVarInfo};

/// A committed overload resolution: the representative variable it was
/// bound through and the declaration that was picked. The history forms a
/// stack on the system, unwound together with the trail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedOverload {
    /// Representative of the overload set's variable at resolution time.
    pub var: TypeVarId,
    /// Name of the chosen declaration.
    pub decl: String,
}

/// One reversible mutation recorded on the trail.
#[derive(Debug)]
pub(crate) enum Change {
    /// `var` went from unbound to bound.
    Bound(TypeVarId),
    /// `var` was a representative and became a child of another root.
    Merged(TypeVarId),
    /// `var`, a representative with no literal default of its own,
    /// inherited one from a merged-in child.
    DefaultInherited(TypeVarId),
    /// One penalty of the given kind was added to the current score.
    ScoreBumped(ScoreKind),
    /// An entry was pushed onto the resolved-overload history.
    OverloadResolved,
    /// `constraint` was removed from the active list at `index`.
    Retired {
        constraint: ConstraintId,
        index: usize,
    },
    /// `constraint` was appended to the active list.
    Activated(ConstraintId),
}

/// Undo log of solver mutations. Rewinding to a mark reverses every entry
/// recorded after it, newest first.
#[derive(Debug, Default)]
pub(crate) struct Trail {
    entries: Vec<Change>,
}

/// Opaque position in the trail, captured when a scope opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrailMark(pub(crate) usize);

/// The shared mutable context of a solve: the variable table, the ordered
/// active-constraint list, the cumulative score, the resolved-overload
/// history, and the trail that makes every solver mutation reversible.
///
/// The system is shared by reference across all live steps; ownership of a
/// mutation window is conferred by holding a live [Scope], and scopes nest
/// strictly.
pub struct ConstraintSystem {
    vars: Vec<TypeVarInfo>,
    var_names: HashMap<String, TypeVarId>,
    active_vars: IndexSet<TypeVarId>,
    constraints: Vec<Constraint>,
    active: Vec<ConstraintId>,
    current_score: Score,
    resolved_overloads: Vec<ResolvedOverload>,
    trail: Trail,
    conversions: ConversionTable,
    scope_depth: usize,
}

impl ConstraintSystem {
    /// An empty system using the given conversion table.
    pub fn new(conversions: ConversionTable) -> ConstraintSystem {
        ConstraintSystem {
            vars: Vec::new(),
            var_names: HashMap::new(),
            active_vars: IndexSet::new(),
            constraints: Vec::new(),
            active: Vec::new(),
            current_score: Score::zero(),
            resolved_overloads: Vec::new(),
            trail: Trail::default(),
            conversions,
            scope_depth: 0,
        }
    }

    /// The conversion table consulted for conformance checks.
    pub fn conversions(&self) -> &ConversionTable {
        &self.conversions
    }

    /// The cumulative score of the current solve path.
    pub fn current_score(&self) -> Score {
        self.current_score
    }

    /// The resolved-overload history, oldest first.
    pub fn resolved_overloads(&self) -> &[ResolvedOverload] {
        &self.resolved_overloads
    }

    // ---- variables -------------------------------------------------------

    /// Creates a fresh type variable with a display name. Names are
    /// interned: asking for an existing name returns the existing variable.
    pub fn new_var(&mut self, name: &str) -> TypeVarId {
        if let Some(id) = self.var_names.get(name) {
            return *id;
        }
        let id = TypeVarId(self.vars.len() as u32);
        self.vars.push(TypeVarInfo::new(name.to_owned(), id));
        self.var_names.insert(name.to_owned(), id);
        self.active_vars.insert(id);
        id
    }

    /// Sets the literal-default metadata of a variable.
    pub fn set_literal_default(&mut self, var: TypeVarId, ty: Ty) {
        self.vars[var.index()].literal_default = Some(ty);
    }

    pub(crate) fn literal_default(&self, var: TypeVarId) -> Option<&Ty> {
        self.vars[self.find_root(var).index()].literal_default.as_ref()
    }

    /// The display name of a variable.
    pub fn var_name(&self, var: TypeVarId) -> &str {
        self.vars[var.index()].get_name()
    }

    /// Walks union-find parents to the representative of `var`.
    pub fn find_root(&self, var: TypeVarId) -> TypeVarId {
        let mut cur = var;
        loop {
            let parent = self.vars[cur.index()].parent;
            if parent == cur {
                return cur;
            }
            cur = parent;
        }
    }

    /// The binding of a variable's representative, if any.
    pub fn binding_of(&self, var: TypeVarId) -> Option<&Ty> {
        self.vars[self.find_root(var).index()].binding.as_ref()
    }

    /// Resolves a term through bindings: a bound variable resolves to its
    /// representative's concrete type, an unbound one to its representative.
    pub fn resolved_ty(&self, ty: &Ty) -> Ty {
        match ty {
            Ty::Con(_) => ty.clone(),
            Ty::Var(v) => {
                let root = self.find_root(*v);
                match &self.vars[root.index()].binding {
                    Some(bound) => bound.clone(),
                    None => Ty::Var(root),
                }
            }
        }
    }

    pub(crate) fn bind(&mut self, var: TypeVarId, ty: Ty) {
        let root = self.find_root(var);
        debug_assert!(self.vars[root.index()].binding.is_none());
        self.vars[root.index()].binding = Some(ty);
        self.trail.entries.push(Change::Bound(root));
        trace!("bound {} ({})", root, self.var_name(root));
    }

    /// Merges the equivalence classes of two unbound roots. The smaller id
    /// becomes the representative, keeping merge order deterministic.
    /// Literal defaults belong to the equivalence class: a representative
    /// without one inherits the merged-in child's, so the default is still
    /// reachable through the new root.
    pub(crate) fn merge(&mut self, a: TypeVarId, b: TypeVarId) {
        let (ra, rb) = (self.find_root(a), self.find_root(b));
        if ra == rb {
            return;
        }
        let (root, child) = if ra < rb { (ra, rb) } else { (rb, ra) };
        self.vars[child.index()].parent = root;
        self.trail.entries.push(Change::Merged(child));
        if self.vars[root.index()].literal_default.is_none() {
            if let Some(default) = self.vars[child.index()].literal_default.clone() {
                self.vars[root.index()].literal_default = Some(default);
                self.trail.entries.push(Change::DefaultInherited(root));
            }
        }
    }

    pub(crate) fn bump_score(&mut self, kind: ScoreKind) {
        self.current_score.bump(kind);
        self.trail.entries.push(Change::ScoreBumped(kind));
    }

    pub(crate) fn push_resolved_overload(&mut self, resolved: ResolvedOverload) {
        self.resolved_overloads.push(resolved);
        self.trail.entries.push(Change::OverloadResolved);
    }

    // ---- constraints -----------------------------------------------------

    /// Allocates a constraint without activating it (used for disjunction
    /// alternatives, which live nested inside their parent).
    pub fn alloc_constraint(&mut self, kind: ConstraintKind) -> ConstraintId {
        let id = ConstraintId(self.constraints.len() as u32);
        self.constraints.push(Constraint::new(kind));
        id
    }

    /// Allocates a constraint and appends it to the active list. Meant for
    /// building the initial system, before solving starts.
    pub fn add_constraint(&mut self, kind: ConstraintKind) -> ConstraintId {
        let id = self.alloc_constraint(kind);
        self.active.push(id);
        id
    }

    /// Builds a disjunction over overload choices for `var`, one nested
    /// bind-overload alternative per choice, in the given order.
    pub fn add_overload_disjunction(
        &mut self,
        var: TypeVarId,
        choices: Vec<OverloadChoice>,
    ) -> ConstraintId {
        let nested = choices
            .into_iter()
            .map(|choice| self.alloc_constraint(ConstraintKind::BindOverload { var, choice }))
            .collect();
        self.add_constraint(ConstraintKind::Disjunction { nested })
    }

    /// The constraint stored under `id`.
    pub fn constraint(&self, id: ConstraintId) -> &Constraint {
        &self.constraints[id.index()]
    }

    /// The ordered list of active constraint ids.
    pub fn active(&self) -> &[ConstraintId] {
        &self.active
    }

    /// The insertion-ordered set of active type variables.
    pub fn active_vars(&self) -> &IndexSet<TypeVarId> {
        &self.active_vars
    }

    pub(crate) fn is_active(&self, id: ConstraintId) -> bool {
        self.active.contains(&id)
    }

    /// Removes a constraint from the active list, recording the removal on
    /// the trail so the enclosing scope restores it.
    pub(crate) fn retire_constraint(&mut self, id: ConstraintId) {
        let index = self
            .active
            .iter()
            .position(|c| *c == id)
            .expect("retired constraint must be active");
        self.active.remove(index);
        self.trail.entries.push(Change::Retired {
            constraint: id,
            index,
        });
    }

    /// Appends a constraint to the active list, recording the addition on
    /// the trail.
    pub(crate) fn activate_constraint(&mut self, id: ConstraintId) {
        self.active.push(id);
        self.trail.entries.push(Change::Activated(id));
    }

    /// Removes a constraint from the active list without touching the
    /// trail. The caller owns the restore; see [DisjunctionStep]
    /// (crate::solver::steps), which erases its disjunction for its whole
    /// lifetime and puts it back itself.
    pub(crate) fn erase_constraint_untracked(&mut self, id: ConstraintId) -> usize {
        let index = self
            .active
            .iter()
            .position(|c| *c == id)
            .expect("erased constraint must be active");
        self.active.remove(index);
        index
    }

    pub(crate) fn restore_constraint_untracked(&mut self, id: ConstraintId, index: usize) {
        self.active.insert(index, id);
    }

    pub(crate) fn set_choice_enabled_untracked(&mut self, id: ConstraintId, enabled: bool) {
        self.constraints[id.index()].enabled = enabled;
    }

    // ---- scopes ----------------------------------------------------------

    /// Opens a transaction over solver mutations. Scopes nest strictly;
    /// closing out of order is an invariant violation and panics.
    pub fn open_scope(&mut self) -> Scope {
        self.scope_depth += 1;
        Scope {
            mark: TrailMark(self.trail.entries.len()),
            depth: self.scope_depth,
        }
    }

    /// Closes the most recently opened scope, reversing every mutation
    /// recorded since it opened.
    pub fn close_scope(&mut self, scope: Scope) {
        assert_eq!(
            scope.depth, self.scope_depth,
            "scopes must close in LIFO order"
        );
        self.scope_depth -= 1;
        self.rollback_to(scope.mark);
    }

    pub(crate) fn scope_depth(&self) -> usize {
        self.scope_depth
    }

    fn rollback_to(&mut self, mark: TrailMark) {
        while self.trail.entries.len() > mark.0 {
            match self.trail.entries.pop().unwrap() {
                Change::Bound(var) => {
                    self.vars[var.index()].binding = None;
                }
                Change::Merged(var) => {
                    self.vars[var.index()].parent = var;
                }
                Change::DefaultInherited(var) => {
                    self.vars[var.index()].literal_default = None;
                }
                Change::ScoreBumped(kind) => {
                    self.current_score.unbump(kind);
                }
                Change::OverloadResolved => {
                    self.resolved_overloads.pop();
                }
                Change::Retired { constraint, index } => {
                    self.active.insert(index, constraint);
                }
                Change::Activated(constraint) => {
                    let popped = self.active.pop();
                    debug_assert_eq!(popped, Some(constraint));
                }
            }
        }
    }

    /// Narrows the shared active lists down to one component's slice,
    /// setting the rest aside until [restore_component](Self::restore_component).
    pub(crate) fn isolate_component(
        &mut self,
        vars: &[TypeVarId],
        constraints: &[ConstraintId],
    ) -> ComponentScope {
        let scope = self.open_scope();
        let saved_active = std::mem::replace(&mut self.active, constraints.to_vec());
        let saved_vars =
            std::mem::replace(&mut self.active_vars, vars.iter().copied().collect());
        ComponentScope {
            scope,
            saved_active,
            saved_vars,
        }
    }

    /// Rolls back the component's mutations, then puts the full active
    /// lists back. The rollback must run first: trail entries recorded
    /// inside the component reference positions in the component-local
    /// list.
    pub(crate) fn restore_component(&mut self, component: ComponentScope) {
        let ComponentScope {
            scope,
            saved_active,
            saved_vars,
        } = component;
        self.close_scope(scope);
        self.active = saved_active;
        self.active_vars = saved_vars;
    }

    // ---- snapshots and checks -------------------------------------------

    /// Whether every active variable's representative is bound.
    pub fn all_active_vars_bound(&self) -> bool {
        self.active_vars
            .iter()
            .all(|v| self.binding_of(*v).is_some())
    }

    /// Snapshots the current assignments into a [Solution]: every variable
    /// in the system whose representative is bound contributes an entry.
    pub fn snapshot_solution(&self) -> Solution {
        let mut solution = Solution {
            assignments: Default::default(),
            overloads: Default::default(),
            fixed_score: self.current_score,
        };
        for (index, _) in self.vars.iter().enumerate() {
            let id = TypeVarId(index as u32);
            if let Ty::Con(name) = self.resolved_ty(&Ty::Var(id)) {
                solution.assignments.insert(id, Ty::Con(name));
            }
        }
        for resolved in self.resolved_overloads.iter() {
            solution
                .overloads
                .insert(resolved.var, resolved.decl.clone());
        }
        solution
    }

    /// Whether `id` holds under the current bindings extended with a merged
    /// solution's assignments. Used to validate orphaned constraints, which
    /// have no free variables left at partition time.
    pub fn constraint_holds(&self, solution: &Solution, id: ConstraintId) -> bool {
        let resolve = |ty: &Ty| -> Option<String> {
            match self.resolved_ty(ty) {
                Ty::Con(name) => Some(name),
                Ty::Var(root) => solution.binding_for(root).and_then(|t| match t {
                    Ty::Con(name) => Some(name.clone()),
                    Ty::Var(_) => None,
                }),
            }
        };
        match &self.constraints[id.index()].kind {
            ConstraintKind::Equal { lhs, rhs } => match (resolve(lhs), resolve(rhs)) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            },
            ConstraintKind::Conforms { lhs, rhs } => match (resolve(lhs), resolve(rhs)) {
                (Some(a), Some(b)) => self.conversions.converts(&a, &b),
                _ => false,
            },
            ConstraintKind::BindOverload { var, choice } => {
                match (resolve(&Ty::Var(*var)), resolve(&choice.ty)) {
                    (Some(bound), Some(target)) => bound == target,
                    _ => false,
                }
            }
            ConstraintKind::Disjunction { nested } => nested.iter().any(|alt| {
                self.constraints[alt.index()].is_enabled() && self.constraint_holds(solution, *alt)
            }),
        }
    }

    /// A textual digest of the mutation-sensitive state, for asserting that
    /// a solve left the system exactly as it found it.
    pub fn state_digest(&self) -> String {
        use std::fmt::Write;
        let mut out = String::new();
        for (index, info) in self.vars.iter().enumerate() {
            writeln!(
                out,
                "var {} parent={} binding={:?} default={:?}",
                index, info.parent, info.binding, info.literal_default
            )
            .unwrap();
        }
        writeln!(out, "active {:?}", self.active).unwrap();
        writeln!(out, "active_vars {:?}", self.active_vars).unwrap();
        for (index, c) in self.constraints.iter().enumerate() {
            writeln!(out, "constraint {} enabled={}", index, c.enabled).unwrap();
        }
        writeln!(out, "score {}", self.current_score).unwrap();
        writeln!(out, "overloads {}", self.resolved_overloads.len()).unwrap();
        out
    }

    // ---- the textual constraint language --------------------------------

    fn term_to_ty(&mut self, term: &ParsedTerm) -> Ty {
        match term {
            ParsedTerm::Var(name) => Ty::Var(self.new_var(name)),
            ParsedTerm::Con(name) => Ty::con(name),
        }
    }

    fn relation_kind(&mut self, parsed: &ParsedConstraint) -> Result<ConstraintKind> {
        match parsed {
            ParsedConstraint::Equal(lhs, rhs) => Ok(ConstraintKind::Equal {
                lhs: self.term_to_ty(lhs),
                rhs: self.term_to_ty(rhs),
            }),
            ParsedConstraint::Conforms(lhs, rhs) => Ok(ConstraintKind::Conforms {
                lhs: self.term_to_ty(lhs),
                rhs: self.term_to_ty(rhs),
            }),
            ParsedConstraint::Default(..) => {
                bail!("literal defaults cannot appear inside a disjunction")
            }
            ParsedConstraint::Disjunction(..) => bail!("disjunctions do not nest"),
        }
    }

    /// Parses a constraint listing and installs it into the system.
    pub fn parse_and_add(&mut self, text: &str) -> Result<()> {
        let parsed = parse_constraint_set(text).map_err(|e| anyhow!(e))?;
        for constraint in parsed.iter() {
            match constraint {
                ParsedConstraint::Default(var, ty) => match var {
                    ParsedTerm::Var(name) => {
                        let id = self.new_var(name);
                        let ty = self.term_to_ty(ty);
                        self.set_literal_default(id, ty);
                    }
                    ParsedTerm::Con(name) => {
                        bail!("literal default target must be a variable, got {}", name)
                    }
                },
                ParsedConstraint::Disjunction(alternatives) => {
                    let nested = alternatives
                        .iter()
                        .map(|alt| {
                            let kind = self.relation_kind(alt)?;
                            Ok(self.alloc_constraint(kind))
                        })
                        .collect::<Result<Vec<_>>>()?;
                    self.add_constraint(ConstraintKind::Disjunction { nested });
                }
                relation => {
                    let kind = self.relation_kind(relation)?;
                    self.add_constraint(kind);
                }
            }
        }
        Ok(())
    }
}

impl Default for ConstraintSystem {
    fn default() -> ConstraintSystem {
        ConstraintSystem::new(ConversionTable::default())
    }
}
