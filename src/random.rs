//! Seeded random structure builder
//!
//! Builds the kind of deeply mixed composite the round-trip harness feeds to
//! the codec: every leaf type, an array of each, composites made of runs of
//! those, arrays of the composites, all shuffled into one root.

use std::fmt;
use std::str::FromStr;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::RandomConfig;
use crate::constants::codegen::ROOT_STRUCT_NAME;
use crate::constants::packing::{MAX_VECTOR_WIDTH, MIN_VECTOR_WIDTH};
use crate::error::{LayoutError, LayoutResult};
use crate::layout::{Node, ScalarType};

/// A leaf type that can appear in the random type pool, spelled like the shading language
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum FieldKind {
    Scalar(ScalarType),
    Vector(ScalarType, usize),
    Matrix {
        cols: usize,
        rows: usize,
        column_major: bool,
    },
}

impl FieldKind {
    pub fn build(&self) -> LayoutResult<Node> {
        match *self {
            FieldKind::Scalar(ty) => Ok(Node::scalar(ty)),
            FieldKind::Vector(ty, width) => Node::vector(ty, width),
            FieldKind::Matrix {
                cols,
                rows,
                column_major,
            } => Node::matrix(cols, rows, column_major),
        }
    }

    /// The pool the round-trip harness has always used
    pub fn default_pool() -> Vec<FieldKind> {
        let mat = |cols, rows| FieldKind::Matrix {
            cols,
            rows,
            column_major: true,
        };
        vec![
            FieldKind::Scalar(ScalarType::Int),
            FieldKind::Scalar(ScalarType::Float),
            FieldKind::Vector(ScalarType::Float, 2),
            FieldKind::Vector(ScalarType::Float, 3),
            FieldKind::Vector(ScalarType::Float, 4),
            mat(2, 2),
            mat(2, 3),
            mat(2, 4),
            mat(3, 2),
            mat(3, 3),
            mat(3, 4),
            mat(4, 4),
        ]
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            FieldKind::Scalar(ty) => write!(f, "{}", ty),
            FieldKind::Vector(ty, width) => write!(f, "{}vec{}", ty.vector_prefix(), width),
            FieldKind::Matrix {
                cols,
                rows,
                column_major,
            } => {
                if !column_major {
                    f.write_str("row_major ")?;
                }
                if cols == rows {
                    write!(f, "mat{}", cols)
                } else {
                    write!(f, "mat{}x{}", cols, rows)
                }
            }
        }
    }
}

fn parse_dimension(s: &str, name: &str) -> LayoutResult<usize> {
    let bad = || LayoutError::Config(format!("unknown field kind '{}'", name));
    let n: usize = s.parse().map_err(|_| bad())?;
    if (MIN_VECTOR_WIDTH..=MAX_VECTOR_WIDTH).contains(&n) {
        Ok(n)
    } else {
        Err(bad())
    }
}

impl FromStr for FieldKind {
    type Err = LayoutError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        let trimmed = name.trim();
        let (column_major, spelled) = match trimmed.strip_prefix("row_major ") {
            Some(rest) => (false, rest.trim()),
            None => (true, trimmed),
        };

        if let Some(dims) = spelled.strip_prefix("mat") {
            let (cols, rows) = match dims.split_once('x') {
                Some((c, r)) => (parse_dimension(c, name)?, parse_dimension(r, name)?),
                None => {
                    let n = parse_dimension(dims, name)?;
                    (n, n)
                }
            };
            return Ok(FieldKind::Matrix {
                cols,
                rows,
                column_major,
            });
        }
        if !column_major {
            return Err(LayoutError::Config(format!(
                "row_major only applies to matrices, got '{}'",
                name
            )));
        }

        match spelled {
            "int" => return Ok(FieldKind::Scalar(ScalarType::Int)),
            "uint" => return Ok(FieldKind::Scalar(ScalarType::Uint)),
            "float" => return Ok(FieldKind::Scalar(ScalarType::Float)),
            _ => {}
        }

        let (ty, rest) = if let Some(rest) = spelled.strip_prefix("ivec") {
            (ScalarType::Int, rest)
        } else if let Some(rest) = spelled.strip_prefix("uvec") {
            (ScalarType::Uint, rest)
        } else if let Some(rest) = spelled.strip_prefix("vec") {
            (ScalarType::Float, rest)
        } else {
            return Err(LayoutError::Config(format!("unknown field kind '{}'", name)));
        };
        Ok(FieldKind::Vector(ty, parse_dimension(rest, name)?))
    }
}

impl TryFrom<String> for FieldKind {
    type Error = LayoutError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<FieldKind> for String {
    fn from(kind: FieldKind) -> Self {
        kind.to_string()
    }
}

/// A generated root composite plus the length of the outer open array of blocks
#[derive(Debug, Clone)]
pub struct RandomStructure {
    pub root: Node,
    pub open_array_len: u32,
}

/// Builds a random root composite using the caller's generator
pub fn generate_structure<R: Rng + ?Sized>(
    config: &RandomConfig,
    rng: &mut R,
) -> LayoutResult<RandomStructure> {
    let n = config.type_pool.len();
    if n < 2 {
        return Err(LayoutError::Config(
            "random type pool needs at least two entries".to_string(),
        ));
    }
    if config.max_array_len == 0 || config.max_root_array_multiplier == 0 || config.root_array_granularity == 0 {
        return Err(LayoutError::Config(
            "random array lengths must be at least one".to_string(),
        ));
    }
    let max_len = config.max_array_len as usize;

    let types = config
        .type_pool
        .iter()
        .map(FieldKind::build)
        .collect::<LayoutResult<Vec<_>>>()?;

    let arrays = types
        .iter()
        .map(|ty| Node::array(ty, rng.gen_range(1..=max_len), false))
        .collect::<LayoutResult<Vec<_>>>()?;

    let mut structures = Vec::with_capacity(n);
    for i in 0..n {
        let start_t = rng.gen_range(0..n - 1);
        let end_t = (start_t + rng.gen_range(1..=n)).min(n);
        let start_a = rng.gen_range(0..n - 1);
        let end_a = (start_a + rng.gen_range(1..=n)).min(n);

        let fields: Vec<Node> = types[start_t..end_t]
            .iter()
            .chain(&arrays[start_a..end_a])
            .cloned()
            .collect();
        structures.push(Node::structure(format!("S{}", i), &fields)?);
    }

    let struct_arrays = structures
        .iter()
        .map(|s| Node::array(s, rng.gen_range(1..=max_len), false))
        .collect::<LayoutResult<Vec<_>>>()?;

    let mut all: Vec<Node> = struct_arrays
        .into_iter()
        .chain(structures.iter().cloned())
        .chain(arrays)
        .chain(types)
        .collect();
    all.shuffle(rng);

    let mut biggest = 0;
    let mut biggest_size = 0;
    for (i, s) in structures.iter().enumerate() {
        let size = s.logical_size();
        if size > biggest_size {
            biggest_size = size;
            biggest = i;
        }
    }

    let open_array_len =
        rng.gen_range(1..=config.max_root_array_multiplier) * config.root_array_granularity;
    let mut root = Node::structure(ROOT_STRUCT_NAME, &all)?;
    let tail = Node::array(&structures[biggest], rng.gen_range(1..=max_len), true)?;
    root.children_mut()?.push(tail);

    log::debug!(
        "[RandomStructure] {} fields, {} bytes, {} leaves, open array of {}",
        all.len() + 1,
        root.logical_size(),
        root.visit_count(),
        open_array_len
    );

    Ok(RandomStructure {
        root,
        open_array_len,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_field_kind_names_round_trip() {
        for kind in FieldKind::default_pool() {
            let name = kind.to_string();
            assert_eq!(name.parse::<FieldKind>().unwrap(), kind);
            assert_eq!(kind.build().unwrap().type_name(), name);
        }
        let row = "row_major mat3x2".parse::<FieldKind>().unwrap();
        assert_eq!(
            row,
            FieldKind::Matrix {
                cols: 3,
                rows: 2,
                column_major: false
            }
        );
        assert_eq!("uvec3".parse::<FieldKind>().unwrap(), FieldKind::Vector(ScalarType::Uint, 3));
    }

    #[test]
    fn test_bad_field_kinds() {
        assert!("vec5".parse::<FieldKind>().is_err());
        assert!("mat1x4".parse::<FieldKind>().is_err());
        assert!("double".parse::<FieldKind>().is_err());
        assert!("row_major vec3".parse::<FieldKind>().is_err());
    }

    #[test]
    fn test_same_seed_same_structure() {
        let config = RandomConfig::default();
        let a = generate_structure(&config, &mut StdRng::seed_from_u64(7)).unwrap();
        let b = generate_structure(&config, &mut StdRng::seed_from_u64(7)).unwrap();
        assert_eq!(a.root, b.root);
        assert_eq!(a.open_array_len, b.open_array_len);
    }

    #[test]
    fn test_structure_shape() {
        let config = RandomConfig::default();
        let n = config.type_pool.len();
        let s = generate_structure(&config, &mut StdRng::seed_from_u64(3)).unwrap();

        assert_eq!(s.root.type_name(), ROOT_STRUCT_NAME);
        let fields = s.root.children().unwrap();
        assert_eq!(fields.len(), 4 * n + 1);

        let last = fields.last().unwrap();
        match last {
            Node::Array(a) => {
                assert!(a.is_runtime());
                assert!(a.element().is_struct());
            }
            other => panic!("expected trailing runtime array, got {}", other.describe()),
        }

        assert_eq!(s.open_array_len % config.root_array_granularity, 0);
        assert!(s.open_array_len >= config.root_array_granularity);
    }

    #[test]
    fn test_pool_too_small() {
        let config = RandomConfig {
            type_pool: vec![FieldKind::Scalar(ScalarType::Int)],
            ..RandomConfig::default()
        };
        let err = generate_structure(&config, &mut StdRng::seed_from_u64(1)).unwrap_err();
        assert!(matches!(err, LayoutError::Config(_)));
    }
}
