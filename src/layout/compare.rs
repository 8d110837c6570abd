//! Structural and value comparison of two layout trees

use std::fmt;

use serde::Serialize;

use crate::layout::node::Node;
use crate::layout::scalar::Scalar;

/// Outcome of a comparison, ordered by severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum CmpStatus {
    Equal,
    ValueMismatch,
    TypeMismatch,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum MismatchKind {
    /// Same shape, different leaf values
    Value { actual: String, expected: String },
    /// Type name, array rank or field count differ; the subtree was not descended
    Type { actual: String, expected: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Mismatch {
    pub path: String,
    pub field_index: u32,
    pub kind: MismatchKind,
}

impl Mismatch {
    pub fn status(&self) -> CmpStatus {
        match self.kind {
            MismatchKind::Value { .. } => CmpStatus::ValueMismatch,
            MismatchKind::Type { .. } => CmpStatus::TypeMismatch,
        }
    }
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            MismatchKind::Value { actual, expected } => {
                write!(f, "{} is {}, expected {}", self.path, actual, expected)
            }
            MismatchKind::Type { actual, expected } => {
                write!(f, "{}: {} compared with {}", self.path, actual, expected)
            }
        }
    }
}

fn render(values: &[Scalar]) -> String {
    let items: Vec<String> = values.iter().map(Scalar::to_string).collect();
    format!("({})", items.join(", "))
}

fn shape_of(node: &Node) -> String {
    match node {
        Node::Struct(s) => format!("{} with {} fields", s.name, s.fields.len()),
        Node::Matrix(m) if !m.column_major => format!("row_major {}", node.type_name()),
        _ => node.describe(),
    }
}

impl Node {
    /// Compares `self` (the observed tree) against `expected`, appending one record
    /// per differing leaf or mismatched subtree. Siblings are always visited.
    pub fn compare_with(
        &self,
        expected: &Node,
        field_index: u32,
        path: &str,
        mismatches: &mut Vec<Mismatch>,
    ) -> CmpStatus {
        let type_mismatch = |mismatches: &mut Vec<Mismatch>| {
            mismatches.push(Mismatch {
                path: path.to_string(),
                field_index,
                kind: MismatchKind::Type {
                    actual: shape_of(self),
                    expected: shape_of(expected),
                },
            });
            CmpStatus::TypeMismatch
        };

        if self.type_name() != expected.type_name() || self.is_array() != expected.is_array() {
            return type_mismatch(mismatches);
        }

        let (actual_values, expected_values) = match (self, expected) {
            (Node::Scalar(a), Node::Scalar(b)) => (vec![a.value], vec![b.value]),
            (Node::Vector(a), Node::Vector(b)) => (a.values.clone(), b.values.clone()),
            (Node::Matrix(a), Node::Matrix(b)) => {
                if a.column_major != b.column_major {
                    return type_mismatch(mismatches);
                }
                (a.values.clone(), b.values.clone())
            }
            (Node::Array(a), Node::Array(b)) => {
                if a.kind != b.kind {
                    return type_mismatch(mismatches);
                }
                return a
                    .elements
                    .iter()
                    .zip(&b.elements)
                    .enumerate()
                    .map(|(i, (x, y))| {
                        x.compare_with(y, i as u32, &format!("{}[{}]", path, i), mismatches)
                    })
                    .fold(CmpStatus::Equal, CmpStatus::max);
            }
            (Node::Struct(a), Node::Struct(b)) => {
                if a.fields.len() != b.fields.len() {
                    return type_mismatch(mismatches);
                }
                return a
                    .fields
                    .iter()
                    .zip(&b.fields)
                    .enumerate()
                    .map(|(i, (x, y))| {
                        let i = i as u32;
                        let field_path = format!("{}.{}", path, x.field_name(i, false));
                        x.compare_with(y, i, &field_path, mismatches)
                    })
                    .fold(CmpStatus::Equal, CmpStatus::max);
            }
            _ => return type_mismatch(mismatches),
        };

        if actual_values == expected_values {
            return CmpStatus::Equal;
        }
        let (actual, expected) = match (actual_values.as_slice(), expected_values.as_slice()) {
            ([a], [b]) => (a.to_string(), b.to_string()),
            (a, b) => (render(a), render(b)),
        };
        mismatches.push(Mismatch {
            path: path.to_string(),
            field_index,
            kind: MismatchKind::Value { actual, expected },
        });
        CmpStatus::ValueMismatch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::scalar::ScalarType;

    fn sample() -> Node {
        let inner = Node::structure(
            "Inner",
            &[Node::scalar(ScalarType::Int), Node::vector(ScalarType::Float, 3).unwrap()],
        )
        .unwrap();
        let mut root = Node::structure(
            "Root",
            &[
                Node::array(&inner, 2, false).unwrap(),
                Node::matrix(2, 2, true).unwrap(),
                Node::fixed_array(ScalarType::Uint, 3, false).unwrap(),
            ],
        )
        .unwrap();
        let mut seed = 0.0;
        root.loop_seed(&mut seed);
        root
    }

    #[test]
    fn test_equal_trees() {
        let a = sample();
        let mut mismatches = Vec::new();
        assert_eq!(a.compare_with(&a.clone(), 0, "Root", &mut mismatches), CmpStatus::Equal);
        assert!(mismatches.is_empty());
    }

    #[test]
    fn test_value_mismatches_are_all_reported() {
        let expected = sample();
        let mut actual = expected.clone();
        {
            let mut slots = actual.scalars_mut();
            *slots[1] = Scalar::Float(99.0);
            *slots[13] = Scalar::Uint(1000);
        }
        let mut mismatches = Vec::new();
        let status = actual.compare_with(&expected, 0, "Root", &mut mismatches);
        assert_eq!(status, CmpStatus::ValueMismatch);
        assert_eq!(mismatches.len(), 2);
        assert_eq!(mismatches[0].path, "Root.Inner_0[0].vec3_1");
        assert_eq!(
            mismatches[0].kind,
            MismatchKind::Value {
                actual: "(99, 2, 3)".to_string(),
                expected: "(1, 2, 3)".to_string(),
            }
        );
        assert_eq!(mismatches[1].path, "Root.uint_2[1]");
        assert_eq!(mismatches[1].to_string(), "Root.uint_2[1] is 1000, expected 13");
    }

    #[test]
    fn test_type_mismatch_stops_descent_but_not_siblings() {
        let expected = sample();
        let mut actual = Node::structure(
            "Root",
            &[
                Node::scalar(ScalarType::Int),
                Node::matrix(2, 2, true).unwrap(),
                Node::fixed_array(ScalarType::Uint, 3, false).unwrap(),
            ],
        )
        .unwrap();
        let mut seed = 100.0;
        actual.loop_seed(&mut seed);

        let mut mismatches = Vec::new();
        let status = actual.compare_with(&expected, 0, "Root", &mut mismatches);
        assert_eq!(status, CmpStatus::TypeMismatch);
        assert_eq!(mismatches[0].status(), CmpStatus::TypeMismatch);
        assert_eq!(mismatches[0].to_string(), "Root.int_0: int compared with Inner[2]");
        // the matrix and the uint array still get compared
        // one record for the matrix, one per uint element
        assert_eq!(mismatches.len(), 5);
        assert!(mismatches[1..].iter().all(|m| m.status() == CmpStatus::ValueMismatch));
    }

    #[test]
    fn test_array_count_and_field_count_mismatch() {
        let four = Node::fixed_array(ScalarType::Int, 4, false).unwrap();
        let five = Node::fixed_array(ScalarType::Int, 5, false).unwrap();
        let mut mismatches = Vec::new();
        assert_eq!(four.compare_with(&five, 0, "a", &mut mismatches), CmpStatus::TypeMismatch);

        let one = Node::structure("S", &[Node::scalar(ScalarType::Int)]).unwrap();
        let two = Node::structure("S", &[Node::scalar(ScalarType::Int), Node::scalar(ScalarType::Int)])
            .unwrap();
        mismatches.clear();
        assert_eq!(one.compare_with(&two, 0, "S", &mut mismatches), CmpStatus::TypeMismatch);
        assert_eq!(mismatches[0].to_string(), "S: S with 1 fields compared with S with 2 fields");
    }

    #[test]
    fn test_status_ordering() {
        assert!(CmpStatus::Equal < CmpStatus::ValueMismatch);
        assert!(CmpStatus::ValueMismatch < CmpStatus::TypeMismatch);
    }
}
