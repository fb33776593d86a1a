use std::fmt::{self, Display};

use serde::Serialize;

use crate::solution::Solution;

/// The number of tracked score kinds.
pub const SCORE_KIND_COUNT: usize = 3;

/// Kinds of penalties a solution can accumulate, most significant first.
/// The ordering here defines the lexicographic significance in [Score].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreKind {
    /// A type variable was bound through its literal-default metadata.
    LiteralDefault = 0,
    /// A generic overload declaration was committed.
    GenericOverload = 1,
    /// A value conversion (widening) was required.
    ValueConversion = 2,
}

/// Totally ordered rank of a (partial) solution; lower is better.
/// Accumulated monotonically as choices are made.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Score([u32; SCORE_KIND_COUNT]);

impl Score {
    /// The score with no recorded penalties.
    pub fn zero() -> Score {
        Score::default()
    }

    /// A score consisting of a single penalty of the given kind.
    pub fn of(kind: ScoreKind) -> Score {
        let mut s = Score::zero();
        s.bump(kind);
        s
    }

    /// Records one penalty of the given kind.
    pub fn bump(&mut self, kind: ScoreKind) {
        self.0[kind as usize] += 1;
    }

    pub(crate) fn unbump(&mut self, kind: ScoreKind) {
        self.0[kind as usize] -= 1;
    }

    /// Component-wise sum.
    pub fn add(&self, other: &Score) -> Score {
        let mut out = *self;
        for (slot, v) in out.0.iter_mut().zip(other.0.iter()) {
            *slot += v;
        }
        out
    }

    /// The penalties accumulated since `entry`. Scores only grow along a
    /// solve path, so the subtraction cannot underflow; it saturates to
    /// guard against misuse across unrelated paths.
    pub fn delta_from(&self, entry: &Score) -> Score {
        let mut out = Score::zero();
        for (slot, (cur, before)) in out.0.iter_mut().zip(self.0.iter().zip(entry.0.iter())) {
            *slot = cur.saturating_sub(*before);
        }
        out
    }

    /// The recorded count for one kind.
    pub fn get(&self, kind: ScoreKind) -> u32 {
        self.0[kind as usize]
    }
}

impl Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[lit:{} gen:{} conv:{}]",
            self.0[0], self.0[1], self.0[2]
        )
    }
}

/// Keeps only the minimum-score survivors of `solutions`, preserving the
/// relative order of equal-scored entries. With `minimize` unset, entries
/// that match the minimum on the significant kinds (literal defaults and
/// generic overloads) are also retained even if they cost extra
/// conversions. Never adds solutions; applying it twice is a no-op.
pub fn filter_solutions(solutions: &mut Vec<Solution>, minimize: bool) {
    let best = match solutions.iter().map(|s| s.get_fixed_score()).min() {
        Some(best) => best,
        None => return,
    };
    if minimize {
        solutions.retain(|s| s.get_fixed_score() == best);
    } else {
        solutions.retain(|s| {
            let score = s.get_fixed_score();
            score.get(ScoreKind::LiteralDefault) == best.get(ScoreKind::LiteralDefault)
                && score.get(ScoreKind::GenericOverload) == best.get(ScoreKind::GenericOverload)
        });
    }
}
