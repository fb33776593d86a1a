use std::collections::BTreeMap;
use std::fmt::{self, Display};

use serde::Serialize;

use crate::score::Score;
use crate::types::{Ty, TypeVarId};

/// A fully determined assignment produced by a terminal step. Carries the
/// fixed score used for ranking; lower scores are preferred.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Solution {
    /// Concrete type for every variable whose representative was bound at
    /// snapshot time.
    pub assignments: BTreeMap<TypeVarId, Ty>,
    /// Overload declarations committed along the way, keyed by the
    /// representative variable they were resolved for.
    pub overloads: BTreeMap<TypeVarId, String>,
    /// Ranking score fixed at snapshot time.
    pub fixed_score: Score,
}

impl Solution {
    /// The score this solution was finalized with.
    pub fn get_fixed_score(&self) -> Score {
        self.fixed_score
    }

    /// The concrete type assigned to `var`, if the solution determined one.
    pub fn binding_for(&self, var: TypeVarId) -> Option<&Ty> {
        self.assignments.get(&var)
    }

    /// Combines one solution per disjoint component into a single merged
    /// solution. Bindings are unioned (components share no free variables,
    /// so overlapping entries agree by construction) and score deltas are
    /// summed against the score at the split point.
    pub(crate) fn merged(entry_score: Score, parts: &[&Solution]) -> Solution {
        let mut assignments = BTreeMap::new();
        let mut overloads = BTreeMap::new();
        let mut score = entry_score;
        for part in parts {
            assignments.extend(part.assignments.iter().map(|(k, v)| (*k, v.clone())));
            overloads.extend(part.overloads.iter().map(|(k, v)| (*k, v.clone())));
            score = score.add(&part.fixed_score.delta_from(&entry_score));
        }
        Solution {
            assignments,
            overloads,
            fixed_score: score,
        }
    }
}

impl Display for Solution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (var, ty) in self.assignments.iter() {
            writeln!(f, "{} := {}", var, ty)?;
        }
        for (var, decl) in self.overloads.iter() {
            writeln!(f, "{} via {}", var, decl)?;
        }
        write!(f, "score {}", self.fixed_score)
    }
}
