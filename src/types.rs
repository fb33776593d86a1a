use std::collections::HashMap;
use std::fmt::{self, Display};

use petgraph::visit::{Dfs, Walker};
use petgraph::{graph::NodeIndex, Directed, Graph};
use serde::{Deserialize, Serialize};

/// Identifies a type variable within a [ConstraintSystem](crate::system::ConstraintSystem).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TypeVarId(pub u32);

impl TypeVarId {
    /// The position of this variable in the system's variable table.
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl Display for TypeVarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}", self.0)
    }
}

/// A type term: either a reference to a type variable or a named
/// concrete constructor such as `Int` or `Float`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Ty {
    /// A (possibly bound) type variable.
    Var(TypeVarId),
    /// A nominal concrete type.
    Con(String),
}

impl Ty {
    /// A concrete type with the given constructor name.
    pub fn con(name: &str) -> Ty {
        Ty::Con(name.to_owned())
    }

    /// The variable referenced by this term, if it is one.
    pub fn as_var(&self) -> Option<TypeVarId> {
        match self {
            Ty::Var(v) => Some(*v),
            Ty::Con(_) => None,
        }
    }

    /// Whether this term is a concrete constructor.
    pub fn is_concrete(&self) -> bool {
        matches!(self, Ty::Con(_))
    }
}

impl Display for Ty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ty::Var(v) => write!(f, "{}", v),
            Ty::Con(name) => f.write_str(name),
        }
    }
}

/// Per-variable solver state: the union-find parent (no path compression,
/// merges must stay reversible), the fixed binding if any, and the
/// literal-default metadata used as a last-resort binding candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeVarInfo {
    pub(crate) name: String,
    pub(crate) parent: TypeVarId,
    pub(crate) binding: Option<Ty>,
    pub(crate) literal_default: Option<Ty>,
}

impl TypeVarInfo {
    pub(crate) fn new(name: String, id: TypeVarId) -> TypeVarInfo {
        TypeVarInfo {
            name,
            parent: id,
            binding: None,
            literal_default: None,
        }
    }

    /// The display name this variable was created with.
    pub fn get_name(&self) -> &str {
        &self.name
    }
}

/// User input that defines the widening relation between concrete types.
/// Each pair `(from, to)` declares that `from` converts to `to`;
/// convertibility is the reflexive transitive closure of the pairs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionTableDefinition {
    widenings: Vec<(String, String)>,
}

impl ConversionTableDefinition {
    /// A definition from explicit widening pairs.
    pub fn new(widenings: Vec<(String, String)>) -> ConversionTableDefinition {
        ConversionTableDefinition { widenings }
    }
}

/// Directed reachability over the declared widenings. Supertype queries
/// enumerate reachable constructors in a deterministic order derived from
/// the declaration order of the pairs.
#[derive(Debug, Clone)]
pub struct ConversionTable {
    graph: Graph<String, (), Directed>,
    nodes: HashMap<String, NodeIndex>,
}

impl ConversionTable {
    /// An empty table: only reflexive conversions hold.
    pub fn empty() -> ConversionTable {
        ConversionTable {
            graph: Graph::new(),
            nodes: HashMap::new(),
        }
    }

    /// Builds the reachability graph for a definition.
    pub fn from_definition(def: &ConversionTableDefinition) -> ConversionTable {
        let mut table = ConversionTable::empty();
        for (from, to) in def.widenings.iter() {
            let from = table.intern(from);
            let to = table.intern(to);
            if !table.graph.contains_edge(from, to) {
                table.graph.add_edge(from, to, ());
            }
        }
        table
    }

    fn intern(&mut self, name: &str) -> NodeIndex {
        if let Some(idx) = self.nodes.get(name) {
            return *idx;
        }
        let idx = self.graph.add_node(name.to_owned());
        self.nodes.insert(name.to_owned(), idx);
        idx
    }

    /// Whether `from` converts to `to` (reflexive, transitive).
    pub fn converts(&self, from: &str, to: &str) -> bool {
        if from == to {
            return true;
        }
        let (from, to) = match (self.nodes.get(from), self.nodes.get(to)) {
            (Some(f), Some(t)) => (*f, *t),
            _ => return false,
        };
        Dfs::new(&self.graph, from).iter(&self.graph).any(|n| n == to)
    }

    /// All constructors `name` widens to, excluding `name` itself, in
    /// deterministic traversal order.
    pub fn supertypes_of(&self, name: &str) -> Vec<String> {
        let start = match self.nodes.get(name) {
            Some(idx) => *idx,
            None => return vec![],
        };
        Dfs::new(&self.graph, start)
            .iter(&self.graph)
            .filter(|n| *n != start)
            .map(|n| self.graph[n].clone())
            .collect()
    }
}

impl Default for ConversionTable {
    /// The stock table used by the tests and the CLI: `Int` widens to `Float`.
    fn default() -> ConversionTable {
        ConversionTable::from_definition(&ConversionTableDefinition::new(vec![(
            "Int".to_owned(),
            "Float".to_owned(),
        )]))
    }
}

#[cfg(test)]
mod tests {
    use super::{ConversionTable, ConversionTableDefinition, Ty, TypeVarId};

    #[test]
    fn reflexive_conversion_without_declaration() {
        let table = ConversionTable::empty();
        assert!(table.converts("Int", "Int"));
        assert!(!table.converts("Int", "Float"));
    }

    #[test]
    fn transitive_widening() {
        let def = ConversionTableDefinition::new(vec![
            ("Int".to_owned(), "Float".to_owned()),
            ("Float".to_owned(), "Double".to_owned()),
        ]);
        let table = ConversionTable::from_definition(&def);
        assert!(table.converts("Int", "Double"));
        assert!(!table.converts("Double", "Int"));
        assert_eq!(
            table.supertypes_of("Int"),
            vec!["Float".to_owned(), "Double".to_owned()]
        );
    }

    #[test]
    fn term_display() {
        assert_eq!(format!("{}", Ty::Var(TypeVarId(3))), "$3");
        assert_eq!(format!("{}", Ty::con("Int")), "Int");
    }
}
