extern crate overload_inference;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use overload_inference::constraints::ConstraintKind;
use overload_inference::solver::Solver;
use overload_inference::system::ConstraintSystem;
use overload_inference::types::Ty;

fn independent_disjunctions(n: usize) -> ConstraintSystem {
    let mut cs = ConstraintSystem::default();
    for i in 0..n {
        let var = cs.new_var(&format!("v{}", i));
        let int = cs.alloc_constraint(ConstraintKind::Equal {
            lhs: Ty::Var(var),
            rhs: Ty::con("Int"),
        });
        let float = cs.alloc_constraint(ConstraintKind::Equal {
            lhs: Ty::Var(var),
            rhs: Ty::con("Float"),
        });
        cs.add_constraint(ConstraintKind::Disjunction {
            nested: vec![int, float],
        });
    }
    cs
}

fn chained_equalities(n: usize) -> ConstraintSystem {
    let mut cs = ConstraintSystem::default();
    let first = cs.new_var("v0");
    let mut prev = first;
    for i in 1..n {
        let var = cs.new_var(&format!("v{}", i));
        cs.add_constraint(ConstraintKind::Equal {
            lhs: Ty::Var(prev),
            rhs: Ty::Var(var),
        });
        prev = var;
    }
    cs.add_constraint(ConstraintKind::Equal {
        lhs: Ty::Var(prev),
        rhs: Ty::con("Int"),
    });
    cs
}

fn criterion_bench_split_and_merge(c: &mut Criterion) {
    c.bench_function("solve 8 independent disjunctions", |b| {
        let mut cs = independent_disjunctions(8);
        let solver = Solver::with_defaults();
        b.iter(|| {
            let result = solver.solve(&mut cs);
            black_box(result.solutions.len())
        });
    });
}

fn criterion_bench_unification_chain(c: &mut Criterion) {
    c.bench_function("solve 64 chained equalities", |b| {
        let mut cs = chained_equalities(64);
        let solver = Solver::with_defaults();
        b.iter(|| {
            let result = solver.solve(&mut cs);
            black_box(result.solutions.len())
        });
    });
}

criterion_group!(
    solver,
    criterion_bench_split_and_merge,
    criterion_bench_unification_chain
);
criterion_main!(solver);
