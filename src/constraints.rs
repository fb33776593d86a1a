use std::fmt::{self, Display};

use nom::branch::alt;
use nom::bytes::complete::tag;
use nom::character::complete::{alphanumeric1, char, space0};
use nom::combinator::map;
use nom::multi::separated_list1;
use nom::sequence::{delimited, preceded, tuple};
use nom::IResult;

use crate::types::{Ty, TypeVarId};

fn parse_term(input: &str) -> IResult<&str, ParsedTerm> {
    alt((
        map(preceded(char('$'), alphanumeric1), |s: &str| {
            ParsedTerm::Var(s.to_owned())
        }),
        map(alphanumeric1, |s: &str| ParsedTerm::Con(s.to_owned())),
    ))(input)
}

fn parse_relation(input: &str) -> IResult<&str, ParsedConstraint> {
    let parser = tuple((
        parse_term,
        delimited(space0, alt((tag("=="), tag("<="), tag("~="))), space0),
        parse_term,
    ));
    map(parser, |(lhs, op, rhs)| match op {
        "==" => ParsedConstraint::Equal(lhs, rhs),
        "<=" => ParsedConstraint::Conforms(lhs, rhs),
        _ => ParsedConstraint::Default(lhs, rhs),
    })(input)
}

/// Parses one line of the constraint language: a relation, or several
/// relations joined by `|` forming a disjunction.
pub fn parse_constraint_line(input: &str) -> IResult<&str, ParsedConstraint> {
    map(
        separated_list1(delimited(space0, char('|'), space0), parse_relation),
        |mut alternatives| {
            if alternatives.len() == 1 {
                alternatives.pop().unwrap()
            } else {
                ParsedConstraint::Disjunction(alternatives)
            }
        },
    )(input)
}

/// Parses a whole constraint listing, one constraint per line. Blank lines
/// and lines starting with `#` are skipped.
pub fn parse_constraint_set(input: &str) -> Result<Vec<ParsedConstraint>, String> {
    let mut out = Vec::new();
    for (lineno, line) in input.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        match parse_constraint_line(line) {
            Ok(("", parsed)) => out.push(parsed),
            Ok((rest, _)) => return Err(format!("line {}: trailing input {:?}", lineno + 1, rest)),
            Err(e) => return Err(format!("line {}: {}", lineno + 1, e)),
        }
    }
    Ok(out)
}

/// A term of the textual constraint language: `$name` references a type
/// variable, a bare identifier names a concrete constructor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedTerm {
    /// A type variable reference.
    Var(String),
    /// A concrete constructor name.
    Con(String),
}

/// Parsed form of one line of the constraint language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedConstraint {
    /// `a == b`: the two terms must unify.
    Equal(ParsedTerm, ParsedTerm),
    /// `a <= b`: `a` must convert to `b`.
    Conforms(ParsedTerm, ParsedTerm),
    /// `$v ~= T`: literal-default metadata for a variable.
    Default(ParsedTerm, ParsedTerm),
    /// `c1 | c2 | ...`: exactly one enabled alternative must hold.
    Disjunction(Vec<ParsedConstraint>),
}

/// Identifies a constraint within a [ConstraintSystem](crate::system::ConstraintSystem).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConstraintId(pub u32);

impl ConstraintId {
    /// The position of this constraint in the system's constraint arena.
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

/// One selectable overload alternative: committing it binds the overload
/// set's variable to `ty` and records `decl` as resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverloadChoice {
    /// The declaration this choice names.
    pub decl: String,
    /// The type the overload set's variable is bound to.
    pub ty: Ty,
    /// Generic declarations are penalized but not forbidden.
    pub generic: bool,
}

impl OverloadChoice {
    /// A non-generic overload choice.
    pub fn concrete(decl: &str, ty: Ty) -> OverloadChoice {
        OverloadChoice {
            decl: decl.to_owned(),
            ty,
            generic: false,
        }
    }

    /// A generic overload choice.
    pub fn generic(decl: &str, ty: Ty) -> OverloadChoice {
        OverloadChoice {
            decl: decl.to_owned(),
            ty,
            generic: true,
        }
    }
}

/// Distinguishes what a constraint requires of the types it relates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConstraintKind {
    /// The two terms must unify exactly.
    Equal {
        /// Left hand side of the equality.
        lhs: Ty,
        /// Right hand side of the equality.
        rhs: Ty,
    },
    /// `lhs` must be convertible to `rhs`.
    Conforms {
        /// The converting term.
        lhs: Ty,
        /// The conversion target.
        rhs: Ty,
    },
    /// Commits one overload choice to a variable.
    BindOverload {
        /// The overload set's variable.
        var: TypeVarId,
        /// The committed alternative.
        choice: OverloadChoice,
    },
    /// Satisfied by exactly one of the enabled nested alternatives, in
    /// declared order.
    Disjunction {
        /// Ids of the nested alternative constraints.
        nested: Vec<ConstraintId>,
    },
}

/// A relation among types the solver must satisfy. Nested disjunction
/// alternatives carry an enabled flag the solver can toggle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constraint {
    /// What this constraint requires.
    pub kind: ConstraintKind,
    pub(crate) enabled: bool,
}

impl Constraint {
    /// A new, enabled constraint.
    pub fn new(kind: ConstraintKind) -> Constraint {
        Constraint {
            kind,
            enabled: true,
        }
    }

    /// Whether this constraint may currently be chosen.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

impl Display for ConstraintKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstraintKind::Equal { lhs, rhs } => write!(f, "{} == {}", lhs, rhs),
            ConstraintKind::Conforms { lhs, rhs } => write!(f, "{} <= {}", lhs, rhs),
            ConstraintKind::BindOverload { var, choice } => {
                write!(f, "{} bind {} : {}", var, choice.decl, choice.ty)
            }
            ConstraintKind::Disjunction { nested } => {
                write!(f, "disjunction of {} alternatives", nested.len())
            }
        }
    }
}
