use crate::{Node, Problem};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Index, IndexMut};

/// Group label of a single node.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Default, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
#[repr(u8)]
pub enum Group {
    #[default]
    Unset = 0,
    First = 1,
    Second = 2,
}

impl Group {
    /// The other group. Inverting `Unset` breaks the search invariants and aborts.
    pub fn opposite(self) -> Group {
        match self {
            Group::First => Group::Second,
            Group::Second => Group::First,
            Group::Unset => panic!("cannot invert the group of an unassigned node"),
        }
    }

    pub fn is_set(self) -> bool {
        self != Group::Unset
    }
}

impl From<Group> for u8 {
    fn from(g: Group) -> Self {
        g as u8
    }
}

impl TryFrom<u8> for Group {
    type Error = String;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        match v {
            0 => Ok(Group::Unset),
            1 => Ok(Group::First),
            2 => Ok(Group::Second),
            _ => Err(format!("invalid group label {v}")),
        }
    }
}

/// Per-node group labels.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Assignment(Vec<Group>);

impl Assignment {
    pub fn unset(n: usize) -> Self {
        Self(vec![Group::Unset; n])
    }

    /// All nodes unset except node 0, which starts in `Group::First`.
    /// Mirrored assignments cost the same, so fixing one node loses nothing.
    pub fn rooted(n: usize) -> Self {
        let mut a = Self::unset(n);
        if n > 0 {
            a.0[0] = Group::First;
        }
        a
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn is_complete(&self) -> bool {
        self.0.iter().all(|g| g.is_set())
    }

    pub fn groups(&self) -> &[Group] {
        &self.0
    }

    /// Every label swapped for its opposite.
    pub fn flipped(&self) -> Self {
        Self(self.0.iter().map(|g| g.opposite()).collect())
    }
}

impl From<Vec<Group>> for Assignment {
    fn from(groups: Vec<Group>) -> Self {
        Self(groups)
    }
}

impl Index<usize> for Assignment {
    type Output = Group;

    fn index(&self, i: usize) -> &Group {
        &self.0[i]
    }
}

impl IndexMut<usize> for Assignment {
    fn index_mut(&mut self, i: usize) -> &mut Group {
        &mut self.0[i]
    }
}

impl fmt::Display for Assignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, g) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{}", *g as u8)?;
        }
        write!(f, "]")
    }
}

/// A complete assignment together with its cut weight.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Solution {
    pub assignment: Assignment,
    pub weight: f64,
}

impl Solution {
    pub fn new(assignment: Assignment, weight: f64) -> Self {
        Self { assignment, weight }
    }
}

impl Problem {
    /// Sum of weights of edges whose endpoints sit in different groups.
    /// Edges touching an unset node are ignored.
    pub fn cut_weight(&self, assignment: &Assignment) -> f64 {
        self.edges()
            .iter()
            .filter(|e| {
                let (ga, gb) = (assignment[e.a as usize], assignment[e.b as usize]);
                ga.is_set() && gb.is_set() && ga != gb
            })
            .map(|e| e.weight)
            .sum()
    }

    /// Exclusion pairs whose nodes do not end up in opposite groups.
    pub fn violated_exclusions(&self, assignment: &Assignment) -> Vec<(Node, Node)> {
        self.exclusions()
            .iter()
            .copied()
            .filter(|&(t, d)| {
                let (gt, gd) = (assignment[t as usize], assignment[d as usize]);
                !(gt.is_set() && gd.is_set() && gt != gd)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Edge;

    #[test]
    fn opposite_swaps_groups() {
        assert_eq!(Group::First.opposite(), Group::Second);
        assert_eq!(Group::Second.opposite(), Group::First);
    }

    #[test]
    #[should_panic(expected = "unassigned")]
    fn opposite_of_unset_panics() {
        Group::Unset.opposite();
    }

    #[test]
    fn rooted_fixes_node_zero() {
        let a = Assignment::rooted(3);
        assert_eq!(a.groups(), &[Group::First, Group::Unset, Group::Unset]);
        assert!(!a.is_complete());
    }

    #[test]
    fn display_uses_numeric_labels() {
        let a = Assignment::from(vec![Group::First, Group::Second, Group::First]);
        assert_eq!(a.to_string(), "[1 2 1]");
    }

    #[test]
    fn labels_serialize_as_numbers() {
        let a = Assignment::from(vec![Group::First, Group::Second, Group::Unset]);
        assert_eq!(serde_json::to_string(&a).unwrap(), "[1,2,0]");
        assert!(serde_json::from_str::<Assignment>("[1,3]").is_err());
    }

    #[test]
    fn cut_weight_and_exclusions() {
        let p = Problem::new(
            "p",
            3,
            2,
            vec![Edge::new(0, 1, 2.0), Edge::new(1, 2, 3.0), Edge::new(0, 2, 5.0)],
            vec![(0, 2)],
        )
        .unwrap();
        let a = Assignment::from(vec![Group::First, Group::First, Group::Second]);
        assert_eq!(p.cut_weight(&a), 8.0);
        assert_eq!(p.cut_weight(&a.flipped()), 8.0);
        assert!(p.violated_exclusions(&a).is_empty());

        let same = Assignment::from(vec![Group::First; 3]);
        assert_eq!(p.violated_exclusions(&same), vec![(0, 2)]);
    }
}
