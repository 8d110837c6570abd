//! Byte placement report
//!
//! Serializes a tree into a scratch buffer with a recording callback, so
//! every padding and visit decision the codec makes can be printed or dumped
//! as JSON.

use serde::Serialize;

use crate::constants::codec::ROOT_NESTING;
use crate::constants::packing::SCALAR_WIDTH;
use crate::error::LayoutResult;
use crate::layout::{Node, SdAction, SdParams};

#[derive(Debug, Clone, Serialize)]
pub struct LayoutReport {
    pub type_name: String,
    pub total_size: usize,
    pub alignment: usize,
    pub visit_count: u32,
    pub entries: Vec<SdParams>,
}

impl LayoutReport {
    pub fn capture(node: &Node) -> LayoutResult<Self> {
        let mut entries = Vec::new();
        let mut record = |params: &SdParams| entries.push(params.clone());

        let mut scratch = vec![0u8; node.logical_size()];
        let mut offset = 0;
        let mut nesting = ROOT_NESTING;
        node.serialize(&mut scratch, &mut offset, &mut nesting, Some(&mut record))?;

        Ok(Self {
            type_name: node.type_name(),
            total_size: offset,
            alignment: node.base_alignment(),
            visit_count: node.visit_count(),
            entries,
        })
    }

    /// Bytes lost to padding
    pub fn padding(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e.action, SdAction::PadBefore | SdAction::PadAfter))
            .map(|e| e.pad)
            .sum()
    }

    pub fn visualize(&self) -> String {
        let mut viz = String::new();

        viz.push_str(&format!(
            "=== {} Layout ({} bytes, align {}, {} leaves, {} padding) ===\n",
            self.type_name,
            self.total_size,
            self.alignment,
            self.visit_count,
            self.padding()
        ));
        viz.push_str("Offset | Size  | Pad   | Field\n");
        viz.push_str("-------|-------|-------|------------------\n");

        for entry in &self.entries {
            let at = entry.absolute_offset();
            match entry.action {
                SdAction::PadBefore | SdAction::PadAfter => {
                    viz.push_str(&format!(
                        "{:6} |       | {:5} | [padding] {}\n",
                        at, entry.pad, entry.field_path
                    ));
                }
                SdAction::Serialize | SdAction::Deserialize => {
                    viz.push_str(&format!(
                        "{:6} | {:5} |       | {} : {}\n",
                        at, entry.size, entry.field_path, entry.field_type
                    ));
                }
            }
        }

        viz
    }

    pub fn to_json(&self) -> LayoutResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Index of the first 4-byte word where two buffers disagree
pub fn first_word_difference(lhs: &[u8], rhs: &[u8]) -> Option<usize> {
    lhs.chunks(SCALAR_WIDTH)
        .zip(rhs.chunks(SCALAR_WIDTH))
        .position(|(a, b)| a != b)
        .or_else(|| {
            if lhs.len() == rhs.len() {
                None
            } else {
                Some(lhs.len().min(rhs.len()) / SCALAR_WIDTH)
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::ScalarType;

    fn sample() -> Node {
        Node::structure(
            "A",
            &[Node::scalar(ScalarType::Int), Node::vector(ScalarType::Float, 3).unwrap()],
        )
        .unwrap()
    }

    #[test]
    fn test_capture_records_padding() {
        let report = LayoutReport::capture(&sample()).unwrap();
        assert_eq!(report.total_size, 32);
        assert_eq!(report.alignment, 16);
        assert_eq!(report.visit_count, 4);
        // 12 bytes before the vec3, 4 after it
        assert_eq!(report.padding(), 16);
        assert_eq!(report.entries.len(), 4);
    }

    #[test]
    fn test_capture_leaf_root() {
        let report = LayoutReport::capture(&Node::vector(ScalarType::Float, 4).unwrap()).unwrap();
        assert_eq!(report.total_size, 16);
        assert_eq!(report.visit_count, 4);
        assert_eq!(report.padding(), 0);
    }

    #[test]
    fn test_visualize_table() {
        let viz = LayoutReport::capture(&sample()).unwrap().visualize();
        assert!(viz.starts_with("=== A Layout (32 bytes, align 16, 4 leaves, 16 padding) ===\n"));
        assert!(viz.contains("     0 |     4 |       | A.int_0 : int\n"));
        assert!(viz.contains("     4 |       |    12 | [padding] A.vec3_1\n"));
        assert!(viz.contains("    16 |    12 |       | A.vec3_1 : vec3\n"));
        assert!(viz.contains("    28 |       |     4 | [padding] A\n"));
    }

    #[test]
    fn test_json_dump() {
        let json = LayoutReport::capture(&sample()).unwrap().to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["total_size"], 32);
        assert_eq!(value["entries"][1]["action"], "PadBefore");
        assert_eq!(value["entries"][1]["field_index"], 1);
        assert!(value["entries"][3]["field_index"].is_null());
    }

    #[test]
    fn test_first_word_difference() {
        let a = [0u8, 0, 0, 0, 1, 2, 3, 4];
        let mut b = a;
        assert_eq!(first_word_difference(&a, &b), None);
        b[6] = 9;
        assert_eq!(first_word_difference(&a, &b), Some(1));
        assert_eq!(first_word_difference(&a, &a[..4]), Some(1));
    }
}
