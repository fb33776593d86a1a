use itertools::Itertools;
use log::debug;

use crate::constraints::{ConstraintId, ConstraintKind};
use crate::graph::{connected_components, Component};
use crate::score::{filter_solutions, Score, ScoreKind};
use crate::simplify::{
    apply_binding, apply_choice_constraint, simplify_active, BindingSource, SimplifyOutcome,
    SimplifyResult,
};
use crate::solution::Solution;
use crate::solver::driver::SolveCtx;
use crate::solver::producers::{
    best_binding_target, DisjunctionChoiceProducer, PotentialBinding, PotentialBindings,
    TypeVarBindingProducer,
};
use crate::solver::scope::{ComponentScope, Scope};
use crate::system::ConstraintSystem;
use crate::types::TypeVarId;

/// States a step passes through during its lifetime. The only legal path
/// is `Setup -> Ready -> Running -> (Suspended -> Running)* -> Done`;
/// anything else aborts the solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepState {
    /// Created but not yet prepared.
    Setup,
    /// Prepared, waiting for its first dispatch.
    Ready,
    /// Currently executing on the driver.
    Running,
    /// Waiting for its follow-up steps to complete.
    Suspended,
    /// Finished, with either disposition.
    Done,
}

pub(crate) fn valid_transition(from: StepState, to: StepState) -> bool {
    matches!(
        (from, to),
        (StepState::Setup, StepState::Ready)
            | (StepState::Ready, StepState::Running)
            | (StepState::Running, StepState::Suspended)
            | (StepState::Suspended, StepState::Running)
            | (StepState::Running, StepState::Done)
    )
}

/// Identifies a step in the per-solve arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepId(pub(crate) usize);

impl StepId {
    pub(crate) fn index(&self) -> usize {
        self.0
    }
}

/// Identifies a solution buffer in the per-solve arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferId(pub(crate) usize);

/// Disposition a step reports to the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    /// The step completed and contributed at least one solution.
    Solved,
    /// The step completed without a solution.
    Error,
    /// The step suspended behind follow-up work.
    Unsolved,
}

/// Result of one `take`/`resume`: a status, plus follow-up steps to run
/// before the step is considered again. Only [StepStatus::Unsolved]
/// carries follow-ups.
#[derive(Debug)]
pub struct StepResult {
    status: StepStatus,
    followups: Vec<StepId>,
}

impl StepResult {
    fn solved() -> StepResult {
        StepResult {
            status: StepStatus::Solved,
            followups: vec![],
        }
    }

    fn error() -> StepResult {
        StepResult {
            status: StepStatus::Error,
            followups: vec![],
        }
    }

    fn unsolved(followups: Vec<StepId>) -> StepResult {
        StepResult {
            status: StepStatus::Unsolved,
            followups,
        }
    }

    /// The reported status.
    pub fn status(&self) -> StepStatus {
        self.status
    }

    pub(crate) fn into_followups(self) -> Vec<StepId> {
        self.followups
    }
}

/// Which entry point the driver is dispatching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Entry {
    Take,
    Resume,
}

enum Outcome {
    Done(bool),
    Suspend(Vec<StepId>),
}

/// A single schedulable unit of solving, dispatched by the driver through
/// its work list. The four kinds share only the state tag and the
/// destination solution buffer.
pub(crate) struct Step {
    state: StepState,
    out: BufferId,
    kind: StepKind,
}

pub(crate) enum StepKind {
    Splitter(SplitterStep),
    Component(ComponentStep),
    TypeVar(TypeVariableStep),
    Disjunction(DisjunctionStep),
}

impl Step {
    pub(crate) fn new(kind: StepKind, out: BufferId) -> Step {
        Step {
            state: StepState::Setup,
            out,
            kind,
        }
    }

    pub(crate) fn state(&self) -> StepState {
        self.state
    }

    fn transition(&mut self, to: StepState) {
        assert!(
            valid_transition(self.state, to),
            "illegal step transition {:?} -> {:?}",
            self.state,
            to
        );
        self.state = to;
    }

    /// Preliminary setup right before the step is taken for the first
    /// time; leaves the step in [StepState::Ready].
    pub(crate) fn setup(&mut self, ctx: &mut SolveCtx) {
        self.transition(StepState::Ready);
        if let StepKind::Component(component) = &mut self.kind {
            component.setup(ctx);
        }
    }

    /// Runs the step's entry point and converts its outcome into the
    /// state/result pair the driver expects.
    pub(crate) fn execute(
        &mut self,
        ctx: &mut SolveCtx,
        entry: Entry,
        prev_failed: bool,
    ) -> StepResult {
        self.transition(StepState::Running);
        let out = self.out;
        let outcome = match (&mut self.kind, entry) {
            (StepKind::Splitter(step), Entry::Take) => step.take(ctx, out),
            (StepKind::Splitter(step), Entry::Resume) => step.resume(ctx, out),
            (StepKind::Component(step), Entry::Take) => step.take(ctx, out, prev_failed),
            (StepKind::Component(step), Entry::Resume) => step.resume(ctx, prev_failed),
            // Binding and disjunction steps drive one loop from both entry
            // points, distinguished by whether a choice is in flight.
            (StepKind::TypeVar(step), _) => step.advance(ctx, out, prev_failed),
            (StepKind::Disjunction(step), _) => step.advance(ctx, out, prev_failed),
        };
        match outcome {
            Outcome::Done(success) => {
                self.transition(StepState::Done);
                if success {
                    StepResult::solved()
                } else {
                    StepResult::error()
                }
            }
            Outcome::Suspend(followups) => {
                self.transition(StepState::Suspended);
                StepResult::unsolved(followups)
            }
        }
    }

    /// Unwinds whatever the step still holds open. Called top-down over
    /// the remaining work list when a budget cancels the solve, so scopes
    /// close in LIFO order.
    pub(crate) fn abandon(&mut self, ctx: &mut SolveCtx) {
        match &mut self.kind {
            StepKind::Splitter(_) => {}
            StepKind::Component(step) => step.finish(ctx),
            StepKind::TypeVar(step) => {
                if let Some(active) = step.active_choice.take() {
                    ctx.cs.close_scope(active.scope);
                }
            }
            StepKind::Disjunction(step) => {
                // Rewind the active choice first, then put the disjunction
                // back and re-enable its pruned siblings.
                if let Some(active) = step.active_choice.take() {
                    ctx.cs.close_scope(active.scope);
                }
                step.finish(ctx.cs);
            }
        }
    }
}

fn best_score(solutions: &[Solution]) -> Option<Score> {
    solutions.iter().map(|s| s.get_fixed_score()).min()
}

/// Picks the highest-priority disjunction among the active constraints:
/// fewest enabled alternatives first, ties broken by active-list order.
fn best_disjunction(cs: &ConstraintSystem) -> Option<ConstraintId> {
    cs.active()
        .iter()
        .copied()
        .filter_map(|id| match &cs.constraint(id).kind {
            ConstraintKind::Disjunction { nested } => {
                let enabled = nested
                    .iter()
                    .filter(|alt| cs.constraint(**alt).is_enabled())
                    .count();
                Some((id, enabled))
            }
            _ => None,
        })
        .enumerate()
        .min_by_key(|(position, (_, enabled))| (*enabled, *position))
        .map(|(_, (id, _))| id)
}

/// Entry point for a (sub)problem: partitions the active constraints into
/// independent components, runs one [ComponentStep] per component, and
/// cross-merges the per-component solutions on resume.
pub(crate) struct SplitterStep {
    entry_score: Score,
    partial_buffers: Vec<BufferId>,
    orphans: Vec<ConstraintId>,
}

impl SplitterStep {
    pub(crate) fn new(entry_score: Score) -> SplitterStep {
        SplitterStep {
            entry_score,
            partial_buffers: vec![],
            orphans: vec![],
        }
    }

    fn take(&mut self, ctx: &mut SolveCtx, out: BufferId) -> Outcome {
        let partition = connected_components(ctx.cs);

        // Orphans are held aside for validation at merge time. Retiring
        // them is trail-recorded, so the enclosing scope restores them.
        for orphan in partition.orphans.iter() {
            ctx.cs.retire_constraint(*orphan);
        }
        self.orphans = partition.orphans;

        if partition.components.is_empty() {
            // Nothing left to solve. The current assignments are the
            // solution, provided the ground constraints hold.
            let solution = ctx.cs.snapshot_solution();
            let ok = self
                .orphans
                .iter()
                .all(|orphan| ctx.cs.constraint_holds(&solution, *orphan));
            if ok {
                ctx.push_solution(out, solution);
            }
            return Outcome::Done(ok);
        }

        let single = partition.components.len() == 1 && self.orphans.is_empty();
        debug!(
            "split into {} component(s), {} orphan(s)",
            partition.components.len(),
            self.orphans.len()
        );

        let mut followups = Vec::with_capacity(partition.components.len());
        for (index, component) in partition.components.into_iter().enumerate() {
            let buffer = ctx.new_buffer();
            self.partial_buffers.push(buffer);
            let step = ComponentStep::new(index, single, component);
            followups.push(ctx.spawn(StepKind::Component(step), buffer));
        }
        Outcome::Suspend(followups)
    }

    fn resume(&mut self, ctx: &mut SolveCtx, out: BufferId) -> Outcome {
        let mut merged: Vec<Solution> = {
            let partials: Vec<&[Solution]> = self
                .partial_buffers
                .iter()
                .map(|buffer| ctx.buffer(*buffer))
                .collect();
            if partials.iter().any(|solutions| solutions.is_empty()) {
                return Outcome::Done(false);
            }
            partials
                .iter()
                .map(|solutions| solutions.iter())
                .multi_cartesian_product()
                .map(|parts| Solution::merged(self.entry_score, &parts))
                .filter(|solution| {
                    self.orphans
                        .iter()
                        .all(|orphan| ctx.cs.constraint_holds(solution, *orphan))
                })
                .collect()
        };

        if !ctx.config.retain_all_solutions {
            filter_solutions(&mut merged, true);
        }
        let any = !merged.is_empty();
        debug!("merged {} solution(s) across components", merged.len());
        ctx.buffer_mut(out).extend(merged);
        Outcome::Done(any)
    }
}

/// Solves one independent component: simplifies it, and if that is not
/// decisive, drives a binding or disjunction step to completion under a
/// scope that keeps the rest of the system out of reach.
pub(crate) struct ComponentStep {
    index: usize,
    single: bool,
    component: Component,
    scope: Option<ComponentScope>,
}

impl ComponentStep {
    fn new(index: usize, single: bool, component: Component) -> ComponentStep {
        ComponentStep {
            index,
            single,
            component,
            scope: None,
        }
    }

    fn setup(&mut self, ctx: &mut SolveCtx) {
        // A single component with no orphans is the whole system already;
        // nothing needs to be temporarily removed.
        if !self.single {
            self.scope = Some(
                ctx.cs
                    .isolate_component(&self.component.vars, &self.component.constraints),
            );
        }
    }

    fn take(&mut self, ctx: &mut SolveCtx, out: BufferId, prev_failed: bool) -> Outcome {
        if prev_failed {
            // A sibling component already failed; the splitter cannot
            // succeed, so don't spend work on this one.
            self.finish(ctx);
            return Outcome::Done(false);
        }

        match simplify_active(ctx.cs) {
            SimplifyOutcome::Contradiction => {
                debug!("component #{} hit a contradiction", self.index);
                self.finish(ctx);
                Outcome::Done(false)
            }
            SimplifyOutcome::Simplified => {
                if ctx.cs.active().is_empty() && ctx.cs.all_active_vars_bound() {
                    let solution = ctx.cs.snapshot_solution();
                    debug!(
                        "component #{} solved, score {}",
                        self.index,
                        solution.get_fixed_score()
                    );
                    ctx.push_solution(out, solution);
                    self.finish(ctx);
                    return Outcome::Done(true);
                }

                if let Some(disjunction) = best_disjunction(ctx.cs) {
                    let step = DisjunctionStep::new(ctx, disjunction);
                    let id = ctx.spawn(StepKind::Disjunction(step), out);
                    return Outcome::Suspend(vec![id]);
                }
                if let Some(bindings) = best_binding_target(ctx.cs) {
                    let step = TypeVariableStep::new(bindings);
                    let id = ctx.spawn(StepKind::TypeVar(step), out);
                    return Outcome::Suspend(vec![id]);
                }

                // Unsolved constraints remain but there is nothing to
                // attempt: no disjunction, no bindable variable.
                debug!("component #{} is stuck", self.index);
                self.finish(ctx);
                Outcome::Done(false)
            }
        }
    }

    fn resume(&mut self, ctx: &mut SolveCtx, prev_failed: bool) -> Outcome {
        // The sole follow-up pushed its solutions into this component's
        // buffer already; all that is left is to report its disposition
        // and let the scope rewind whatever was not finalized.
        let produced = !prev_failed;
        self.finish(ctx);
        Outcome::Done(produced)
    }

    fn finish(&mut self, ctx: &mut SolveCtx) {
        if let Some(scope) = self.scope.take() {
            ctx.cs.restore_component(scope);
        }
    }
}

struct ActiveBinding {
    scope: Scope,
    binding: PotentialBinding,
}

/// Attempts candidate bindings for one type variable in strict priority
/// order, re-splitting the system after each binding. Once any earlier
/// binding has produced a solution, literal-default candidates are not
/// attempted; they are last-resort only.
pub(crate) struct TypeVariableStep {
    type_var: TypeVarId,
    producer: TypeVarBindingProducer,
    any_solved: bool,
    saw_first_literal: bool,
    active_choice: Option<ActiveBinding>,
}

impl TypeVariableStep {
    fn new(bindings: PotentialBindings) -> TypeVariableStep {
        TypeVariableStep {
            type_var: bindings.type_var,
            producer: TypeVarBindingProducer::new(bindings),
            any_solved: false,
            saw_first_literal: false,
            active_choice: None,
        }
    }

    fn advance(&mut self, ctx: &mut SolveCtx, out: BufferId, prev_failed: bool) -> Outcome {
        if let Some(active) = self.active_choice.take() {
            if !prev_failed {
                self.any_solved = true;
            }
            debug!(
                "binding {} := {} {}",
                ctx.cs.var_name(self.type_var),
                active.binding.ty,
                if prev_failed { "failed" } else { "solved" }
            );
            ctx.cs.close_scope(active.scope);
        }

        loop {
            let next = match self.producer.peek() {
                Some(next) => next,
                None => return Outcome::Done(self.any_solved),
            };

            if ctx.config.literal_default_early_exit && self.any_solved {
                // Literal defaults are last resort: once anything earlier
                // worked, neither untried defaults nor candidates past an
                // attempted one are worth exploring.
                if self.saw_first_literal || next.source == BindingSource::LiteralDefault {
                    debug!(
                        "skipping literal-default candidates for {}",
                        ctx.cs.var_name(self.type_var)
                    );
                    return Outcome::Done(true);
                }
            }

            let binding = self.producer.next().expect("peeked candidate exists");
            ctx.stats.binding_attempts += 1;
            if binding.source == BindingSource::LiteralDefault {
                ctx.stats.literal_attempts += 1;
                self.saw_first_literal = true;
            }

            let scope = ctx.cs.open_scope();
            let applied = apply_binding(ctx.cs, self.type_var, &binding.ty, binding.source);
            if applied == SimplifyResult::Error
                || simplify_active(ctx.cs) == SimplifyOutcome::Contradiction
            {
                // Contradicts immediately; rewind and try the next
                // candidate.
                ctx.cs.close_scope(scope);
                continue;
            }

            // Binding may have connected or disconnected components in
            // the graph; re-split before going deeper.
            let splitter = SplitterStep::new(ctx.cs.current_score());
            let id = ctx.spawn(StepKind::Splitter(splitter), out);
            self.active_choice = Some(ActiveBinding { scope, binding });
            return Outcome::Suspend(vec![id]);
        }
    }
}

struct ActiveChoice {
    scope: Scope,
    choice: ConstraintId,
    solutions_at_start: usize,
}

/// Attempts each alternative of one disjunction in declared order. The
/// disjunction itself is erased from the active list for the lifetime of
/// the step and put back, at the position it was erased from, when the
/// step finishes; pruned siblings are re-enabled at the same point.
pub(crate) struct DisjunctionStep {
    disjunction: ConstraintId,
    restore_index: usize,
    producer: DisjunctionChoiceProducer,
    best_non_generic_score: Option<Score>,
    last_solved_choice: Option<(ConstraintId, Score)>,
    pruned_choices: Vec<ConstraintId>,
    active_choice: Option<ActiveChoice>,
    restored: bool,
}

impl DisjunctionStep {
    fn new(ctx: &mut SolveCtx, disjunction: ConstraintId) -> DisjunctionStep {
        let producer = DisjunctionChoiceProducer::new(ctx.cs, disjunction);
        let restore_index = ctx.cs.erase_constraint_untracked(disjunction);
        let pruned_choices = Self::prune_overload_set(ctx, disjunction);
        DisjunctionStep {
            disjunction,
            restore_index,
            producer,
            best_non_generic_score: None,
            last_solved_choice: None,
            pruned_choices,
            active_choice: None,
            restored: false,
        }
    }

    /// If the disjunction's variable has a representative that a previous
    /// overload resolution already bound, alternatives naming any other
    /// declaration cannot win; disable them for the lifetime of this step.
    /// This is what keeps chained operator overloads from re-exploring
    /// mismatched declarations.
    fn prune_overload_set(ctx: &mut SolveCtx, disjunction: ConstraintId) -> Vec<ConstraintId> {
        let nested = match &ctx.cs.constraint(disjunction).kind {
            ConstraintKind::Disjunction { nested } => nested.clone(),
            _ => return vec![],
        };
        let first = match nested.first() {
            Some(first) => *first,
            None => return vec![],
        };
        let var = match &ctx.cs.constraint(first).kind {
            ConstraintKind::BindOverload { var, .. } => *var,
            _ => return vec![],
        };
        let representative = ctx.cs.find_root(var);
        if representative == var {
            return vec![];
        }

        let decl = match ctx
            .cs
            .resolved_overloads()
            .iter()
            .rev()
            .find(|resolved| resolved.var == representative)
        {
            Some(resolved) => resolved.decl.clone(),
            None => return vec![],
        };

        let mut disabled = Vec::new();
        for alt in nested.iter() {
            let mismatched = match &ctx.cs.constraint(*alt).kind {
                ConstraintKind::BindOverload { choice, .. } => choice.decl != decl,
                _ => false,
            };
            if mismatched && ctx.cs.constraint(*alt).is_enabled() {
                ctx.cs.set_choice_enabled_untracked(*alt, false);
                disabled.push(*alt);
            }
        }
        debug!(
            "pruned {} overload choice(s) against resolved {}",
            disabled.len(),
            decl
        );
        ctx.stats.pruned_choices += disabled.len() as u64;
        disabled
    }

    fn advance(&mut self, ctx: &mut SolveCtx, out: BufferId, prev_failed: bool) -> Outcome {
        if let Some(active) = self.active_choice.take() {
            if !prev_failed {
                let since = &ctx.buffer(out)[active.solutions_at_start..];
                let best = best_score(since).or_else(|| best_score(ctx.buffer(out)));
                if let Some(best) = best {
                    self.last_solved_choice = Some((active.choice, best));
                    if !Self::choice_is_generic(ctx.cs, active.choice) {
                        self.best_non_generic_score = Some(match self.best_non_generic_score {
                            Some(known) if known <= best => known,
                            _ => best,
                        });
                    }
                }
            }
            ctx.cs.close_scope(active.scope);
        }

        loop {
            let (choice, index) = match self.producer.peek() {
                Some(next) => next,
                None => {
                    let solved = self.last_solved_choice.is_some();
                    self.finish(ctx.cs);
                    return Outcome::Done(solved);
                }
            };

            if ctx.config.disjunction_short_circuit && self.should_short_circuit_at(ctx.cs, choice)
            {
                debug!("short-circuiting disjunction at choice #{}", index);
                self.finish(ctx.cs);
                return Outcome::Done(true);
            }
            if self.should_skip_choice(ctx.cs, choice) {
                self.producer.advance();
                continue;
            }
            self.producer.advance();

            let scope = ctx.cs.open_scope();
            let solutions_at_start = ctx.buffer(out).len();
            let applied = apply_choice_constraint(ctx.cs, choice);
            if applied == SimplifyResult::Error
                || simplify_active(ctx.cs) == SimplifyOutcome::Contradiction
            {
                ctx.cs.close_scope(scope);
                continue;
            }
            debug!("attempting disjunction choice #{}", index);
            ctx.stats.disjunction_choices += 1;

            let splitter = SplitterStep::new(ctx.cs.current_score());
            let id = ctx.spawn(StepKind::Splitter(splitter), out);
            self.active_choice = Some(ActiveChoice {
                scope,
                choice,
                solutions_at_start,
            });
            return Outcome::Suspend(vec![id]);
        }
    }

    fn choice_is_generic(cs: &ConstraintSystem, choice: ConstraintId) -> bool {
        match &cs.constraint(choice).kind {
            ConstraintKind::BindOverload { choice, .. } => choice.generic,
            _ => false,
        }
    }

    /// Disabled alternatives are never attempted; neither is a generic one
    /// once a non-generic solution exists that its penalty cannot beat.
    fn should_skip_choice(&self, cs: &ConstraintSystem, choice: ConstraintId) -> bool {
        if !cs.constraint(choice).is_enabled() {
            return true;
        }
        if let Some(best) = self.best_non_generic_score {
            if Self::choice_is_generic(cs, choice) {
                let floor = cs
                    .current_score()
                    .add(&Score::of(ScoreKind::GenericOverload));
                return best < floor;
            }
        }
        false
    }

    /// Whether the whole disjunction should be considered complete when
    /// the next pending alternative comes up: a solved non-generic choice
    /// cannot be beaten by a generic one.
    fn should_short_circuit_at(&self, cs: &ConstraintSystem, choice: ConstraintId) -> bool {
        self.last_solved_choice.is_some()
            && self.best_non_generic_score.is_some()
            && cs.constraint(choice).is_enabled()
            && Self::choice_is_generic(cs, choice)
    }

    /// Puts the disjunction back where it was erased from and re-enables
    /// the pruned alternatives. Runs after the active choice has been
    /// rewound; the order matters.
    fn finish(&mut self, cs: &mut ConstraintSystem) {
        debug_assert!(self.active_choice.is_none());
        if self.restored {
            return;
        }
        cs.restore_constraint_untracked(self.disjunction, self.restore_index);
        for choice in self.pruned_choices.iter() {
            cs.set_choice_enabled_untracked(*choice, true);
        }
        self.restored = true;
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::{valid_transition, DisjunctionStep, StepState};
    use crate::constraints::{ConstraintKind, OverloadChoice};
    use crate::simplify::apply_choice;
    use crate::solver::driver::SolveCtx;
    use crate::solver::SolverConfig;
    use crate::system::ConstraintSystem;
    use crate::types::Ty;

    #[test]
    fn overload_set_pruning_follows_the_representative() {
        let mut cs = ConstraintSystem::default();
        let config = SolverConfig::default();
        let op1 = cs.new_var("op1");
        let op2 = cs.new_var("op2");
        let d2 = cs.add_overload_disjunction(
            op2,
            vec![
                OverloadChoice::concrete("plusInt", Ty::con("Int")),
                OverloadChoice::concrete("plusFloat", Ty::con("Float")),
            ],
        );
        // Chain the two overload sets: op2's representative becomes op1,
        // and op1 resolves to plusInt.
        cs.merge(op1, op2);
        apply_choice(
            &mut cs,
            op1,
            &OverloadChoice::concrete("plusInt", Ty::con("Int")),
        );

        let nested = match &cs.constraint(d2).kind {
            ConstraintKind::Disjunction { nested } => nested.clone(),
            _ => unreachable!(),
        };

        let mut ctx = SolveCtx::new(&mut cs, &config);
        let mut step = DisjunctionStep::new(&mut ctx, d2);
        assert!(ctx.cs.constraint(nested[0]).is_enabled());
        assert!(!ctx.cs.constraint(nested[1]).is_enabled());
        assert_eq!(ctx.stats.pruned_choices, 1);
        assert!(!ctx.cs.is_active(d2));

        // Finishing re-enables the pruned sibling and puts the
        // disjunction back where it was erased from.
        step.finish(ctx.cs);
        assert!(ctx.cs.constraint(nested[1]).is_enabled());
        assert!(ctx.cs.is_active(d2));
    }

    #[test]
    fn only_the_documented_state_path_is_legal() {
        use StepState::*;
        let legal = [
            (Setup, Ready),
            (Ready, Running),
            (Running, Suspended),
            (Suspended, Running),
            (Running, Done),
        ];
        for from in [Setup, Ready, Running, Suspended, Done] {
            for to in [Setup, Ready, Running, Suspended, Done] {
                assert_eq!(
                    valid_transition(from, to),
                    legal.contains(&(from, to)),
                    "transition {:?} -> {:?}",
                    from,
                    to
                );
            }
        }
    }
}
