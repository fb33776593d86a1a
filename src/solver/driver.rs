use std::time::Instant;

use log::{debug, info};

use crate::solution::Solution;
use crate::solver::steps::{BufferId, Entry, SplitterStep, Step, StepId, StepKind, StepState, StepStatus};
use crate::solver::{SolveResult, SolveStats, SolveStatus, SolverConfig};
use crate::system::ConstraintSystem;

/// Per-solve working storage shared by the driver and the steps it
/// dispatches: the step arena, the solution buffers, and the counters.
/// Steps borrow the constraint system through here; only the currently
/// executing step holds it.
pub(crate) struct SolveCtx<'a> {
    pub(crate) cs: &'a mut ConstraintSystem,
    pub(crate) config: &'a SolverConfig,
    pub(crate) stats: SolveStats,
    steps: Vec<Option<Step>>,
    buffers: Vec<Vec<Solution>>,
}

impl<'a> SolveCtx<'a> {
    pub(crate) fn new(cs: &'a mut ConstraintSystem, config: &'a SolverConfig) -> SolveCtx<'a> {
        SolveCtx {
            cs,
            config,
            stats: SolveStats::default(),
            steps: Vec::new(),
            buffers: Vec::new(),
        }
    }

    /// Allocates a step in the arena; it lives there until the solve ends.
    pub(crate) fn spawn(&mut self, kind: StepKind, out: BufferId) -> StepId {
        let id = StepId(self.steps.len());
        self.steps.push(Some(Step::new(kind, out)));
        id
    }

    pub(crate) fn new_buffer(&mut self) -> BufferId {
        let id = BufferId(self.buffers.len());
        self.buffers.push(Vec::new());
        id
    }

    pub(crate) fn buffer(&self, id: BufferId) -> &[Solution] {
        &self.buffers[id.0]
    }

    pub(crate) fn buffer_mut(&mut self, id: BufferId) -> &mut Vec<Solution> {
        &mut self.buffers[id.0]
    }

    pub(crate) fn push_solution(&mut self, id: BufferId, solution: Solution) {
        self.buffers[id.0].push(solution);
    }

    fn take_step(&mut self, id: StepId) -> Step {
        self.steps[id.index()]
            .take()
            .expect("a step is owned by exactly one work-list entry")
    }

    fn put_step(&mut self, id: StepId, step: Step) {
        debug_assert!(self.steps[id.index()].is_none());
        self.steps[id.index()] = Some(step);
    }

    fn take_buffer(&mut self, id: BufferId) -> Vec<Solution> {
        std::mem::take(&mut self.buffers[id.0])
    }
}

/// The work-list driver: pops the top step, dispatches `take` or `resume`,
/// pushes follow-ups, and propagates failure dispositions. Exploration is
/// single-threaded and cooperative; a step may only suspend by returning
/// follow-ups.
pub struct Solver {
    config: SolverConfig,
}

impl Solver {
    /// A solver with the given configuration.
    pub fn new(config: SolverConfig) -> Solver {
        Solver { config }
    }

    /// A solver with the default configuration.
    pub fn with_defaults() -> Solver {
        Solver::new(SolverConfig::default())
    }

    fn budget_exhausted(&self, stats: &SolveStats) -> bool {
        if stats.steps_taken >= self.config.max_steps {
            return true;
        }
        match self.config.deadline {
            Some(deadline) => Instant::now() >= deadline,
            None => false,
        }
    }

    fn unwind(ctx: &mut SolveCtx, work: &mut Vec<StepId>) {
        // Top of the work list first: in-flight scopes close in LIFO order.
        while let Some(id) = work.pop() {
            let mut step = ctx.take_step(id);
            step.abandon(ctx);
            ctx.put_step(id, step);
        }
    }

    /// Runs the step machine over the system's active constraints and
    /// returns the surviving solutions. The whole solve runs inside a
    /// root scope, so the system is returned to its pre-solve state no
    /// matter how the solve ends; solutions are snapshots.
    pub fn solve(&self, cs: &mut ConstraintSystem) -> SolveResult {
        info!(
            "solving: {} active constraint(s), {} type variable(s)",
            cs.active().len(),
            cs.active_vars().len()
        );
        let root_scope = cs.open_scope();

        let (solutions, completed, stats) = {
            let mut ctx = SolveCtx::new(cs, &self.config);
            let top_buffer = ctx.new_buffer();
            let entry_score = ctx.cs.current_score();
            let root = ctx.spawn(
                StepKind::Splitter(SplitterStep::new(entry_score)),
                top_buffer,
            );
            let mut work = vec![root];
            let mut prev_failed = false;

            let completed = loop {
                let top = match work.last() {
                    Some(id) => *id,
                    None => break true,
                };
                if self.budget_exhausted(&ctx.stats) {
                    info!("budget exhausted after {} step(s)", ctx.stats.steps_taken);
                    Self::unwind(&mut ctx, &mut work);
                    break false;
                }
                ctx.stats.steps_taken += 1;

                let mut step = ctx.take_step(top);
                if step.state() == StepState::Setup {
                    step.setup(&mut ctx);
                }
                let entry = match step.state() {
                    StepState::Ready => Entry::Take,
                    StepState::Suspended => Entry::Resume,
                    other => panic!("step dispatched in state {:?}", other),
                };

                let result = step.execute(&mut ctx, entry, prev_failed);
                prev_failed = result.status() == StepStatus::Error;
                match result.status() {
                    StepStatus::Unsolved => {
                        ctx.put_step(top, step);
                        // Reverse push: the first emitted follow-up runs
                        // first.
                        for id in result.into_followups().into_iter().rev() {
                            work.push(id);
                        }
                    }
                    StepStatus::Solved | StepStatus::Error => {
                        work.pop();
                        ctx.put_step(top, step);
                    }
                }
            };

            (ctx.take_buffer(top_buffer), completed, ctx.stats)
        };

        cs.close_scope(root_scope);
        assert_eq!(cs.scope_depth(), 0, "unbalanced scopes after solve");

        let status = if !completed {
            SolveStatus::Incomplete
        } else if solutions.is_empty() {
            SolveStatus::Failed
        } else {
            SolveStatus::Complete
        };
        debug!(
            "solve finished: {:?}, {} solution(s), {} step(s)",
            status,
            solutions.len(),
            stats.steps_taken
        );
        SolveResult {
            solutions,
            status,
            stats,
        }
    }
}
