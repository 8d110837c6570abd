//! StructGenerator facade
//!
//! Builds layout trees from primitive, array and composite building blocks,
//! orders composites for declaration, and drives code generation, the codec
//! and comparison over whole trees.

use std::fmt::{self, Write};

use crate::constants::codec::ROOT_NESTING;
use crate::error::{LayoutError, LayoutResult};
use crate::layout::{CmpStatus, Mismatch, Node, ScalarType, SdCallback};

/// Result of comparing an observed tree against the expected one
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub status: CmpStatus,
    /// Every mismatch found, in traversal order; the last entry is the latest found
    pub mismatches: Vec<Mismatch>,
}

impl Comparison {
    pub fn is_equal(&self) -> bool {
        self.status == CmpStatus::Equal
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:?} ({} mismatches)", self.status, self.mismatches.len())?;
        for mismatch in &self.mismatches {
            writeln!(f, "  {}", mismatch)?;
        }
        Ok(())
    }
}

/// Declared type column for a field, including the matrix majority qualifier
fn declared_type(field: &Node) -> String {
    let element = match field {
        Node::Array(a) => a.element(),
        other => other,
    };
    match element {
        Node::Matrix(m) if !m.is_column_major() => format!("layout(row_major) {}", field.type_name()),
        _ => field.type_name(),
    }
}

fn collect_structs<'a>(node: &'a Node, list: &mut Vec<&'a Node>) {
    let Node::Struct(s) = node else {
        return;
    };
    for field in s.fields() {
        if let Node::Array(a) = field {
            if a.element().is_struct() {
                list.insert(0, a.element());
                collect_structs(a.element(), list);
            }
        }
        if field.is_struct() {
            list.insert(0, field);
            collect_structs(field, list);
        }
    }
}

fn field_types(node: &Node) -> Vec<String> {
    node.children()
        .map(|fields| fields.iter().map(Node::describe).collect())
        .unwrap_or_default()
}

#[derive(Debug, Default, Clone, Copy)]
pub struct StructGenerator;

impl StructGenerator {
    pub fn new() -> Self {
        Self
    }

    pub fn make_scalar(&self, ty: ScalarType) -> Node {
        Node::scalar(ty)
    }

    pub fn make_vector(&self, ty: ScalarType, width: usize) -> LayoutResult<Node> {
        Node::vector(ty, width)
    }

    pub fn make_matrix(&self, cols: usize, rows: usize, column_major: bool) -> LayoutResult<Node> {
        Node::matrix(cols, rows, column_major)
    }

    pub fn make_fixed_array(&self, ty: ScalarType, count: usize, runtime: bool) -> LayoutResult<Node> {
        Node::fixed_array(ty, count, runtime)
    }

    /// Array of `count` independent clones of `element`
    pub fn make_array_field(&self, element: &Node, count: usize, runtime: bool) -> LayoutResult<Node> {
        Node::array(element, count, runtime)
    }

    pub fn generate_struct(&self, type_name: &str, fields: &[Node]) -> LayoutResult<Node> {
        let node = Node::structure(type_name, fields)?;
        log::debug!(
            "[StructGenerator] Generated {} with {} fields ({} bytes, align {})",
            type_name,
            fields.len(),
            node.logical_size(),
            node.base_alignment()
        );
        Ok(node)
    }

    /// Appends a deep clone of `field` to the end of `root`'s field list
    pub fn structure_append_field(&self, root: &mut Node, field: &Node) -> LayoutResult<()> {
        root.children_mut()?.push(field.clone());
        Ok(())
    }

    /// Writes `struct Name { ... };`, or only the `{ ... }` body when `declaration` is false
    pub fn print_struct<W: Write>(&self, node: &Node, out: &mut W, declaration: bool) -> LayoutResult<()> {
        let fields = node.children()?;
        let types: Vec<String> = fields.iter().map(declared_type).collect();
        let longest = types.iter().map(String::len).max().unwrap_or(0);

        if declaration {
            write!(out, "struct {} ", node.type_name())?;
        }
        out.write_str("{\n")?;
        for (index, (field, ty)) in fields.iter().zip(&types).enumerate() {
            writeln!(
                out,
                "    {:width$} {};",
                ty,
                field.field_name(index as u32, true),
                width = longest
            )?;
        }
        out.write_char('}')?;
        if declaration {
            out.write_str(";\n")?;
        }
        Ok(())
    }

    /// Every composite reachable from `root`, root last, each after the composites it contains.
    /// Composites are identified by type name alone; equal names must mean equal shapes.
    pub fn get_struct_list<'a>(&self, root: &'a Node) -> LayoutResult<Vec<&'a Node>> {
        if !root.is_struct() {
            return Err(LayoutError::unsupported(root.type_name(), "get_struct_list"));
        }
        let mut found = vec![root];
        collect_structs(root, &mut found);

        let mut list: Vec<&Node> = Vec::with_capacity(found.len());
        for node in found {
            match list.iter().find(|seen| seen.type_name() == node.type_name()) {
                Some(seen) => {
                    if field_types(seen) != field_types(node) {
                        log::warn!(
                            "[StructGenerator] Coalescing two different shapes named {}",
                            node.type_name()
                        );
                    }
                }
                None => list.push(node),
            }
        }
        log::debug!("[StructGenerator] {} distinct composites under {}", list.len(), root.type_name());
        Ok(list)
    }

    /// Emits loops assigning `rhs` to every leaf of `root`, addressed from `root_name`
    pub fn generate_loops<W: Write>(
        &self,
        root: &Node,
        root_name: &str,
        out: &mut W,
        indent: u32,
        rhs: &str,
    ) -> LayoutResult<()> {
        let mut iterator_seed = 0;
        root.gen_loops(out, root_name, rhs, 0, indent, &mut iterator_seed)?;
        Ok(())
    }

    pub fn print_values<W: Write>(&self, node: &Node, out: &mut W, level: u32) -> LayoutResult<()> {
        node.print_value(out, level)?;
        Ok(())
    }

    pub fn values_string(&self, node: &Node) -> LayoutResult<String> {
        let mut out = String::new();
        self.print_values(node, &mut out, 0)?;
        Ok(out)
    }

    /// Serializes `node` at the start of `dst`, returning the bytes it spans
    pub fn serialize_struct(
        &self,
        node: &Node,
        dst: &mut [u8],
        nesting: i32,
        on_field: Option<SdCallback<'_>>,
    ) -> LayoutResult<usize> {
        let mut offset = 0;
        let mut nesting = nesting;
        node.serialize(dst, &mut offset, &mut nesting, on_field)?;
        log::trace!("[StructGenerator] Serialized {} into {} bytes", node.type_name(), offset);
        Ok(offset)
    }

    /// Deserializes `node` from the start of `src`, returning the bytes it spans
    pub fn deserialize_struct(
        &self,
        src: &[u8],
        node: &mut Node,
        nesting: i32,
        on_field: Option<SdCallback<'_>>,
    ) -> LayoutResult<usize> {
        let mut offset = 0;
        let mut nesting = nesting;
        node.deserialize(src, &mut offset, &mut nesting, on_field)?;
        log::trace!("[StructGenerator] Deserialized {} from {} bytes", node.type_name(), offset);
        Ok(offset)
    }

    /// Serializes a whole root with no diagnostics
    pub fn serialize_root(&self, node: &Node, dst: &mut [u8]) -> LayoutResult<usize> {
        self.serialize_struct(node, dst, ROOT_NESTING, None)
    }

    pub fn deserialize_root(&self, src: &[u8], node: &mut Node) -> LayoutResult<usize> {
        self.deserialize_struct(src, node, ROOT_NESTING, None)
    }

    pub fn compare(&self, actual: &Node, expected: &Node) -> Comparison {
        let mut mismatches = Vec::new();
        let status = actual.compare_with(expected, 0, &expected.type_name(), &mut mismatches);
        if status != CmpStatus::Equal {
            log::debug!(
                "[StructGenerator] {} differs: {:?}, {} mismatches",
                expected.type_name(),
                status,
                mismatches.len()
            );
        }
        Comparison { status, mismatches }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{SdAction, SdParams};

    fn sg() -> StructGenerator {
        StructGenerator::new()
    }

    #[test]
    fn test_scenario_a_vec3_after_int() {
        let sg = sg();
        let s = sg
            .generate_struct(
                "A",
                &[sg.make_scalar(ScalarType::Int), sg.make_vector(ScalarType::Float, 3).unwrap()],
            )
            .unwrap();
        assert_eq!(s.base_alignment(), 16);
        assert_eq!(s.logical_size(), 32);

        let mut offsets = Vec::new();
        let mut record = |p: &SdParams| {
            if p.action == SdAction::Serialize {
                offsets.push(p.absolute_offset());
            }
        };
        let mut buffer = vec![0u8; 32];
        let used = sg
            .serialize_struct(&s, &mut buffer, ROOT_NESTING, Some(&mut record))
            .unwrap();
        assert_eq!(used, 32);
        assert_eq!(offsets, vec![0, 16]);
    }

    #[test]
    fn test_scenario_b_loop_seed() {
        let sg = sg();
        let mut s = sg
            .generate_struct(
                "B",
                &[sg.make_scalar(ScalarType::Float), sg.make_vector(ScalarType::Float, 2).unwrap()],
            )
            .unwrap();
        let mut seed = 0.0;
        s.loop_seed(&mut seed);
        assert_eq!(seed, 3.0);
        assert_eq!(
            sg.values_string(&s).unwrap(),
            "B B0 { float float1 = 0 vec2 vec21 = [0](1)[1](2) } "
        );
    }

    #[test]
    fn test_scenario_c_vec3_against_other_type() {
        let sg = sg();
        let make = |second: Node| {
            let mut s = sg
                .generate_struct(
                    "C",
                    &[
                        sg.make_vector(ScalarType::Float, 3).unwrap(),
                        second,
                        sg.make_scalar(ScalarType::Uint),
                    ],
                )
                .unwrap();
            let mut seed = 1.0;
            s.loop_seed(&mut seed);
            s
        };
        let actual = make(sg.make_vector(ScalarType::Float, 3).unwrap());
        // same byte size, different type
        let mut expected = make(sg.make_fixed_array(ScalarType::Float, 3, false).unwrap());
        if let Some(last) = expected.scalars_mut().pop() {
            *last = crate::layout::Scalar::Uint(100);
        }

        let result = sg.compare(&actual, &expected);
        assert_eq!(result.status, CmpStatus::TypeMismatch);
        assert!(!result.is_equal());
        assert_eq!(result.mismatches.len(), 2);
        assert_eq!(result.mismatches[0].status(), CmpStatus::TypeMismatch);
        assert_eq!(result.mismatches[0].path, "C.vec3_1");
        // the trailing uint is still compared
        assert_eq!(result.mismatches[1].path, "C.uint_2");
    }

    #[test]
    fn test_scenario_d_inner_before_outer() {
        let sg = sg();
        let inner = sg.generate_struct("Inner", &[sg.make_scalar(ScalarType::Int)]).unwrap();
        let outer = sg
            .generate_struct("Outer", &[sg.make_array_field(&inner, 4, false).unwrap()])
            .unwrap();
        let names: Vec<String> = sg
            .get_struct_list(&outer)
            .unwrap()
            .iter()
            .map(|n| n.type_name())
            .collect();
        assert_eq!(names, vec!["Inner", "Outer"]);
    }

    #[test]
    fn test_struct_list_dedups_and_orders() {
        let sg = sg();
        let a = sg.generate_struct("A", &[sg.make_scalar(ScalarType::Int)]).unwrap();
        let b = sg
            .generate_struct("B", &[a.clone(), sg.make_array_field(&a, 2, false).unwrap()])
            .unwrap();
        let root = sg
            .generate_struct("Root", &[b.clone(), a.clone(), sg.make_array_field(&b, 3, true).unwrap()])
            .unwrap();
        let names: Vec<String> = sg
            .get_struct_list(&root)
            .unwrap()
            .iter()
            .map(|n| n.type_name())
            .collect();
        assert_eq!(names, vec!["A", "B", "Root"]);

        let leaf = sg.make_scalar(ScalarType::Int);
        assert!(sg.get_struct_list(&leaf).is_err());
    }

    #[test]
    fn test_print_struct_alignment() {
        let sg = sg();
        let s = sg
            .generate_struct(
                "P",
                &[
                    sg.make_scalar(ScalarType::Int),
                    sg.make_matrix(3, 3, true).unwrap(),
                    sg.make_fixed_array(ScalarType::Float, 4, true).unwrap(),
                ],
            )
            .unwrap();
        let mut out = String::new();
        sg.print_struct(&s, &mut out, true).unwrap();
        assert_eq!(
            out,
            "struct P {\n    int   int_0;\n    mat3  mat3_1;\n    float float_2[/* 4 */];\n};\n"
        );

        let mut body = String::new();
        sg.print_struct(&s, &mut body, false).unwrap();
        assert!(body.starts_with("{\n"));
        assert!(body.ends_with('}'));
    }

    #[test]
    fn test_print_struct_row_major() {
        let sg = sg();
        let s = sg
            .generate_struct("R", &[sg.make_matrix(2, 3, false).unwrap(), sg.make_scalar(ScalarType::Int)])
            .unwrap();
        let mut out = String::new();
        sg.print_struct(&s, &mut out, true).unwrap();
        assert!(out.contains("    layout(row_major) mat2x3 mat2x3_0;\n"));
        assert!(out.contains("    int                      int_1;\n"));
    }

    #[test]
    fn test_append_field_clones() {
        let sg = sg();
        let mut root = sg.generate_struct("Root", &[sg.make_scalar(ScalarType::Int)]).unwrap();
        let mut tail = sg.make_vector(ScalarType::Int, 4).unwrap();
        sg.structure_append_field(&mut root, &tail).unwrap();
        let mut seed = 5.0;
        tail.loop_seed(&mut seed);
        assert_eq!(root.children().unwrap().len(), 2);
        assert_eq!(root.visit_count(), 5);
        assert!(root.scalars().iter().all(|s| s.to_string() == "0"));

        let mut leaf = sg.make_scalar(ScalarType::Float);
        assert!(matches!(
            sg.structure_append_field(&mut leaf, &tail),
            Err(LayoutError::Unsupported { .. })
        ));
    }

    #[test]
    fn test_round_trip_through_facade() {
        let sg = sg();
        let inner = sg
            .generate_struct(
                "Inner",
                &[sg.make_vector(ScalarType::Uint, 3).unwrap(), sg.make_matrix(4, 2, false).unwrap()],
            )
            .unwrap();
        let mut root = sg
            .generate_struct(
                "Root",
                &[
                    sg.make_fixed_array(ScalarType::Int, 3, false).unwrap(),
                    inner.clone(),
                    sg.make_array_field(&inner, 2, true).unwrap(),
                ],
            )
            .unwrap();
        let mut seed = 40.0;
        root.loop_seed(&mut seed);

        let mut buffer = vec![0u8; root.logical_size()];
        let written = sg.serialize_root(&root, &mut buffer).unwrap();
        assert_eq!(written, root.logical_size());

        let mut copy = root.clone_shape();
        let read = sg.deserialize_root(&buffer, &mut copy).unwrap();
        assert_eq!(read, written);
        assert!(sg.compare(&copy, &root).is_equal());
        assert_eq!(sg.values_string(&copy).unwrap(), sg.values_string(&root).unwrap());
    }

    #[test]
    fn test_leaf_roots_report_bytes_used() {
        let sg = sg();
        let vec4 = sg.make_vector(ScalarType::Float, 4).unwrap();
        let ints = sg.make_fixed_array(ScalarType::Int, 3, false).unwrap();
        let mut buffer = vec![0u8; 16];
        assert_eq!(sg.serialize_struct(&vec4, &mut buffer, ROOT_NESTING, None).unwrap(), 16);
        assert_eq!(sg.serialize_root(&ints, &mut buffer).unwrap(), 12);

        let mut copy = ints.clone_shape();
        assert_eq!(sg.deserialize_root(&buffer, &mut copy).unwrap(), 12);
    }
}
