//! # Iterative constraint solving for type inference
//!
//! An iterative solver driver for a Hindley–Milner-style type-inference
//! constraint system with overloading, subtyping, generics and
//! literal-default rules. The solver decomposes a system of typing
//! constraints into independently solvable parts, explores a tree of
//! binding and overload choices without recursion or leaked mutations,
//! and yields candidate solutions scored by desirability.
//!
//! The core is the step machine in [solver]: a stack-based, resumable
//! scheduler coordinating splitter, component, type-variable and
//! disjunction steps, with a transactional rewind discipline
//! ([solver::scope]) that lets exploration backtrack cheaply.
#![warn(missing_docs)]

/// The constraint model and the textual constraint language parser.
pub mod constraints;

/// Connected components over the active constraint graph.
pub mod graph;

/// Solution scoring and filtering.
pub mod score;

/// Constraint simplification: unification, conformance checks, and
/// overload commitment.
pub mod simplify;

/// Finalized, scored variable assignments.
pub mod solution;

/// The step machine: driver, steps, scopes, and choice producers.
pub mod solver;

/// The shared mutable constraint system and its mutation trail.
pub mod system;

/// Type terms, variables, and the conversion table.
pub mod types;

#[cfg(test)]
pub(crate) mod test_utils;

// End-to-end scenarios over the whole step machine.
#[cfg(test)]
mod tests {
    use std::time::Instant;

    use pretty_assertions::assert_eq;

    use crate::constraints::{ConstraintKind, OverloadChoice};
    use crate::score::{Score, ScoreKind};
    use crate::solver::{SolveStatus, Solver, SolverConfig};
    use crate::system::ConstraintSystem;
    use crate::test_utils::init_logging;
    use crate::types::Ty;

    fn solve_text(text: &str, config: SolverConfig) -> (ConstraintSystem, crate::solver::SolveResult) {
        init_logging();
        let mut cs = ConstraintSystem::default();
        cs.parse_and_add(text).unwrap();
        let result = Solver::new(config).solve(&mut cs);
        (cs, result)
    }

    fn assigned(cs: &ConstraintSystem, solution: &crate::solution::Solution, name: &str) -> Ty {
        let var = cs
            .active_vars()
            .iter()
            .copied()
            .find(|v| cs.var_name(*v) == name)
            .unwrap_or_else(|| panic!("no variable named {}", name));
        solution.binding_for(var).cloned().unwrap()
    }

    #[test]
    fn equality_selects_the_only_valid_disjunct() {
        let (cs, result) = solve_text(
            "$T == Int | $T == Float\n$U == Int\n$T == $U\n",
            SolverConfig::default(),
        );
        assert_eq!(result.status, SolveStatus::Complete);
        assert_eq!(result.solutions.len(), 1);
        let solution = &result.solutions[0];
        assert_eq!(assigned(&cs, solution, "T"), Ty::con("Int"));
        assert_eq!(assigned(&cs, solution, "U"), Ty::con("Int"));
    }

    #[test]
    fn independent_components_cross_merge() {
        let (cs, result) = solve_text(
            "$A == Int | $A == String\n$B == Int | $B == String\n",
            SolverConfig::default(),
        );
        assert_eq!(result.status, SolveStatus::Complete);
        assert_eq!(result.solutions.len(), 4);

        let mut pairs: Vec<(Ty, Ty)> = result
            .solutions
            .iter()
            .map(|s| (assigned(&cs, s, "A"), assigned(&cs, s, "B")))
            .collect();
        pairs.sort();
        pairs.dedup();
        assert_eq!(pairs.len(), 4);
        assert!(result
            .solutions
            .iter()
            .all(|s| s.get_fixed_score() == Score::zero()));
    }

    #[test]
    fn chained_overloads_prune_the_second_set() {
        init_logging();
        let mut cs = ConstraintSystem::default();
        let op1 = cs.new_var("op1");
        let op2 = cs.new_var("op2");
        cs.add_constraint(ConstraintKind::Equal {
            lhs: Ty::Var(op1),
            rhs: Ty::Var(op2),
        });
        cs.add_constraint(ConstraintKind::Equal {
            lhs: Ty::Var(op1),
            rhs: Ty::con("Int"),
        });
        cs.add_overload_disjunction(
            op1,
            vec![
                OverloadChoice::concrete("plusInt", Ty::con("Int")),
                OverloadChoice::concrete("plusFloat", Ty::con("Float")),
            ],
        );
        cs.add_overload_disjunction(
            op2,
            vec![
                OverloadChoice::concrete("plusInt", Ty::con("Int")),
                OverloadChoice::concrete("plusFloat", Ty::con("Float")),
            ],
        );

        let result = Solver::with_defaults().solve(&mut cs);
        assert_eq!(result.status, SolveStatus::Complete);
        assert_eq!(result.solutions.len(), 1);
        let solution = &result.solutions[0];
        assert_eq!(solution.binding_for(op1), Some(&Ty::con("Int")));
        assert_eq!(solution.binding_for(op2), Some(&Ty::con("Int")));
        assert_eq!(solution.overloads.get(&op1), Some(&"plusInt".to_owned()));

        // Once the first set resolves, the second never has to be
        // explored choice by choice.
        assert!(result.stats.disjunction_choices <= 2);
    }

    #[test]
    fn literal_defaults_are_not_attempted_after_a_solution() {
        let mut config = SolverConfig::default();
        config.retain_all_solutions = true;
        let (_, result) = solve_text("Int <= $T\n$T ~= String\n", config);

        assert_eq!(result.status, SolveStatus::Complete);
        // The exact bound and its widening both solve; the literal
        // default is never pulled.
        assert_eq!(result.solutions.len(), 2);
        assert_eq!(result.stats.literal_attempts, 0);
    }

    #[test]
    fn literal_default_early_exit_can_be_disabled() {
        let mut config = SolverConfig::default();
        config.retain_all_solutions = true;
        config.literal_default_early_exit = false;
        let (_, result) = solve_text("Int <= $T\n$T ~= String\n", config);

        // With the pruning off the default is attempted; it fails the
        // conformance, so the solution set does not change.
        assert_eq!(result.stats.literal_attempts, 1);
        assert_eq!(result.solutions.len(), 2);
    }

    #[test]
    fn literal_default_is_attempted_when_bounds_fail() {
        let (_, result) = solve_text(
            "$T <= Float\n$T <= String\n$T ~= Int\n",
            SolverConfig::default(),
        );
        // Float and String each violate the other bound, and the Int
        // default converts to Float but not String.
        assert_eq!(result.status, SolveStatus::Failed);
        assert!(result.solutions.is_empty());
        assert_eq!(result.stats.literal_attempts, 1);
    }

    #[test]
    fn literal_default_survives_unification() {
        let (cs, result) = solve_text("$U == $T\n$T ~= Int\n", SolverConfig::default());
        // Unifying U and T reparents T under U; the default set on T
        // still binds the merged class.
        assert_eq!(result.status, SolveStatus::Complete);
        assert_eq!(result.solutions.len(), 1);
        let solution = &result.solutions[0];
        assert_eq!(assigned(&cs, solution, "T"), Ty::con("Int"));
        assert_eq!(assigned(&cs, solution, "U"), Ty::con("Int"));
        assert_eq!(result.stats.literal_attempts, 1);
        assert_eq!(
            solution.get_fixed_score(),
            Score::of(ScoreKind::LiteralDefault)
        );
    }

    #[test]
    fn lonely_variable_binds_through_its_literal_default() {
        init_logging();
        let mut cs = ConstraintSystem::default();
        let t = cs.new_var("T");
        cs.set_literal_default(t, Ty::con("Int"));

        let result = Solver::with_defaults().solve(&mut cs);
        assert_eq!(result.status, SolveStatus::Complete);
        assert_eq!(result.solutions.len(), 1);
        assert_eq!(result.solutions[0].binding_for(t), Some(&Ty::con("Int")));
        assert_eq!(
            result.solutions[0].get_fixed_score(),
            Score::of(ScoreKind::LiteralDefault)
        );
    }

    #[test]
    fn step_budget_cuts_exploration_and_restores_state() {
        init_logging();
        let mut cs = ConstraintSystem::default();
        cs.parse_and_add(
            "$A == Int | $A == Float\n$B == Int | $B == Float\n$C == Int | $C == Float\n",
        )
        .unwrap();
        let digest = cs.state_digest();

        let mut config = SolverConfig::default();
        config.max_steps = 1;
        let result = Solver::new(config).solve(&mut cs);

        assert_eq!(result.status, SolveStatus::Incomplete);
        assert!(result.solutions.is_empty());
        assert_eq!(result.stats.steps_taken, 1);
        assert_eq!(cs.state_digest(), digest);
    }

    #[test]
    fn elapsed_deadline_stops_before_the_first_step() {
        init_logging();
        let mut cs = ConstraintSystem::default();
        cs.parse_and_add("$A == Int | $A == Float\n").unwrap();
        let digest = cs.state_digest();

        let mut config = SolverConfig::default();
        config.deadline = Some(Instant::now());
        let result = Solver::new(config).solve(&mut cs);

        assert_eq!(result.status, SolveStatus::Incomplete);
        assert!(result.solutions.is_empty());
        assert_eq!(result.stats.steps_taken, 0);
        assert_eq!(cs.state_digest(), digest);
    }

    #[test]
    fn contradictory_disjunction_fails_the_whole_solve() {
        let (cs, result) = solve_text(
            "$T == Int\n$T == Float | $T == String\n",
            SolverConfig::default(),
        );
        assert_eq!(result.status, SolveStatus::Failed);
        assert!(result.solutions.is_empty());
        // Failure still rewinds every mutation.
        assert!(cs.active_vars().iter().all(|v| cs.binding_of(*v).is_none()));
    }

    #[test]
    fn zero_constraints_yield_one_trivial_solution() {
        init_logging();
        let mut cs = ConstraintSystem::default();
        let result = Solver::with_defaults().solve(&mut cs);
        assert_eq!(result.status, SolveStatus::Complete);
        assert_eq!(result.solutions.len(), 1);
        assert!(result.solutions[0].assignments.is_empty());
        assert_eq!(result.solutions[0].get_fixed_score(), Score::zero());
    }

    #[test]
    fn disjunction_with_no_enabled_choices_fails() {
        init_logging();
        let mut cs = ConstraintSystem::default();
        let t = cs.new_var("T");
        let d = cs.add_overload_disjunction(
            t,
            vec![
                OverloadChoice::concrete("a", Ty::con("Int")),
                OverloadChoice::concrete("b", Ty::con("Float")),
            ],
        );
        match cs.constraint(d).kind.clone() {
            ConstraintKind::Disjunction { nested } => {
                for alt in nested {
                    cs.set_choice_enabled_untracked(alt, false);
                }
            }
            _ => unreachable!(),
        }

        let result = Solver::with_defaults().solve(&mut cs);
        assert_eq!(result.status, SolveStatus::Failed);
        assert!(result.solutions.is_empty());
    }

    #[test]
    fn worse_scored_merges_are_filtered_out() {
        let (_, result) = solve_text("Int <= $T\n", SolverConfig::default());
        assert_eq!(result.status, SolveStatus::Complete);
        // Binding T to Int is conversion free; the widening to Float is
        // filtered out by the minimum-score policy.
        assert_eq!(result.solutions.len(), 1);
        assert_eq!(result.solutions[0].get_fixed_score(), Score::zero());
    }

    #[test]
    fn retaining_all_solutions_suppresses_filtering() {
        let mut config = SolverConfig::default();
        config.retain_all_solutions = true;
        let (_, result) = solve_text("Int <= $T\n", config);
        assert_eq!(result.solutions.len(), 2);
    }

    #[test]
    fn solving_is_deterministic_and_repeatable() {
        init_logging();
        let mut cs = ConstraintSystem::default();
        cs.parse_and_add("$A == Int | $A == String\n$B == Int | $B == String\n")
            .unwrap();

        let solver = Solver::with_defaults();
        let first = solver.solve(&mut cs);
        // The solve restored the system, so running it again must
        // reproduce the same solutions, scores, and counters.
        let second = solver.solve(&mut cs);

        assert_eq!(first.solutions, second.solutions);
        assert_eq!(first.stats, second.stats);
        assert_eq!(first.status, second.status);
    }

    #[test]
    fn generic_overloads_lose_to_concrete_ones() {
        init_logging();
        let mut cs = ConstraintSystem::default();
        let op = cs.new_var("op");
        cs.add_overload_disjunction(
            op,
            vec![
                OverloadChoice::concrete("plusInt", Ty::con("Int")),
                OverloadChoice::generic("plusGeneric", Ty::con("Int")),
            ],
        );

        let result = Solver::with_defaults().solve(&mut cs);
        assert_eq!(result.status, SolveStatus::Complete);
        assert_eq!(result.solutions.len(), 1);
        assert_eq!(
            result.solutions[0].overloads.get(&op),
            Some(&"plusInt".to_owned())
        );
        // The generic alternative is short-circuited, not explored.
        assert_eq!(result.stats.disjunction_choices, 1);
    }
}
