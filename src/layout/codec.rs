//! Serialize/deserialize between a layout tree and a flat std430 buffer
//!
//! The walk is shared by both directions: it decides where every scalar lands
//! and reports each padding/visit decision to an optional callback. Bytes are
//! moved afterwards, pairing the planned offsets with the tree's scalars in
//! `loop_seed` order.

use serde::Serialize;

use crate::constants::codec::ROOT_NESTING;
use crate::constants::packing::SCALAR_WIDTH;
use crate::error::{LayoutError, LayoutResult};
use crate::layout::node::{ArrayKind, Node, StructNode};
use crate::layout::{align_size, padding_for_alignment};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Direction {
    Serialize,
    Deserialize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SdAction {
    Serialize,
    Deserialize,
    PadBefore,
    PadAfter,
}

/// One padding or visit decision made by the codec
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SdParams {
    pub alignment: usize,
    pub size: usize,
    /// Start of the self-contained block the offset is relative to
    pub base: usize,
    /// Offset inside that block where this step starts
    pub offset: usize,
    pub pad: usize,
    /// `None` for the padding a composite applies around itself
    pub field_index: Option<u32>,
    pub nesting: i32,
    pub action: SdAction,
    pub direction: Direction,
    pub field_path: String,
    pub field_type: String,
}

impl SdParams {
    pub fn absolute_offset(&self) -> usize {
        self.base + self.offset
    }
}

/// Diagnostic callback invoked once per codec decision
pub type SdCallback<'a> = &'a mut dyn FnMut(&SdParams);

pub(crate) struct Walk<'cb> {
    direction: Direction,
    on_field: Option<SdCallback<'cb>>,
    path: String,
    leaves: Vec<usize>,
}

impl<'cb> Walk<'cb> {
    fn new(direction: Direction, root: &Node, on_field: Option<SdCallback<'cb>>) -> Self {
        Self {
            direction,
            on_field,
            path: root.type_name(),
            leaves: Vec::with_capacity(root.visit_count() as usize),
        }
    }

    fn observing(&self) -> bool {
        self.on_field.is_some()
    }

    fn report(&mut self, params: impl FnOnce(&str) -> SdParams) {
        if let Some(callback) = self.on_field.as_deref_mut() {
            let params = params(&self.path);
            callback(&params);
        }
    }

    fn enter(&mut self, segment: &str) -> usize {
        let mark = self.path.len();
        self.path.push_str(segment);
        mark
    }

    fn leave(&mut self, mark: usize) {
        self.path.truncate(mark);
    }

    fn visit_action(&self) -> SdAction {
        match self.direction {
            Direction::Serialize => SdAction::Serialize,
            Direction::Deserialize => SdAction::Deserialize,
        }
    }
}

impl Node {
    /// Writes this tree into `dst` starting at `offset`, leaving `offset` past its contribution
    pub fn serialize(
        &self,
        dst: &mut [u8],
        offset: &mut usize,
        nesting: &mut i32,
        on_field: Option<SdCallback<'_>>,
    ) -> LayoutResult<()> {
        let leaves = self.plan(Direction::Serialize, offset, nesting, on_field)?;
        check_bounds(&leaves, *offset, dst.len())?;
        for (slot, at) in self.scalars().into_iter().zip(leaves) {
            slot.write_bytes(&mut dst[at..at + SCALAR_WIDTH]);
        }
        Ok(())
    }

    /// Reads this tree's values from `src` starting at `offset`
    pub fn deserialize(
        &mut self,
        src: &[u8],
        offset: &mut usize,
        nesting: &mut i32,
        on_field: Option<SdCallback<'_>>,
    ) -> LayoutResult<()> {
        let leaves = self.plan(Direction::Deserialize, offset, nesting, on_field)?;
        check_bounds(&leaves, *offset, src.len())?;
        for (slot, at) in self.scalars_mut().into_iter().zip(leaves) {
            slot.read_bytes(&src[at..at + SCALAR_WIDTH]);
        }
        Ok(())
    }

    fn plan(
        &self,
        direction: Direction,
        offset: &mut usize,
        nesting: &mut i32,
        on_field: Option<SdCallback<'_>>,
    ) -> LayoutResult<Vec<usize>> {
        let mut walk = Walk::new(direction, self, on_field);
        self.serialize_or_deserialize(&mut walk, 0, offset, false, nesting);
        if !self.is_struct() {
            *offset += self.logical_size();
        }
        if walk.leaves.len() != self.visit_count() as usize {
            return Err(LayoutError::invariant(
                self.type_name(),
                format!(
                    "codec placed {} scalars, tree has {}",
                    walk.leaves.len(),
                    self.visit_count()
                ),
            ));
        }
        Ok(walk.leaves)
    }

    /// Places this node at `base + offset`. Composites advance `offset` themselves,
    /// every other kind leaves that to the caller.
    pub(crate) fn serialize_or_deserialize(
        &self,
        walk: &mut Walk<'_>,
        base: usize,
        offset: &mut usize,
        array_element: bool,
        nesting: &mut i32,
    ) {
        match self {
            Node::Scalar(_) => walk.leaves.push(base + *offset),
            Node::Vector(v) => {
                let start = base + *offset;
                walk.leaves
                    .extend((0..v.values.len()).map(|i| start + i * SCALAR_WIDTH));
            }
            Node::Matrix(m) => {
                let start = base + *offset;
                for col in 0..m.cols {
                    for row in 0..m.rows {
                        walk.leaves.push(start + m.element_offset(col, row));
                    }
                }
            }
            Node::Array(a) => {
                let stride = a.stride();
                match a.kind {
                    ArrayKind::Fixed => {
                        for (i, element) in a.elements.iter().enumerate() {
                            let mut at = *offset + i * stride;
                            element.serialize_or_deserialize(walk, base, &mut at, true, nesting);
                        }
                    }
                    ArrayKind::Dynamic => {
                        for (i, element) in a.elements.iter().enumerate() {
                            let mark = walk.enter(&format!("[{}]", i));
                            let mut local = 0;
                            element.serialize_or_deserialize(
                                walk,
                                base + *offset + i * stride,
                                &mut local,
                                true,
                                nesting,
                            );
                            walk.leave(mark);
                        }
                    }
                }
            }
            Node::Struct(s) => self.struct_codec(s, walk, base, offset, array_element, nesting),
        }
    }

    fn struct_codec(
        &self,
        s: &StructNode,
        walk: &mut Walk<'_>,
        base: usize,
        offset: &mut usize,
        array_element: bool,
        nesting: &mut i32,
    ) {
        let root = *nesting == ROOT_NESTING;
        *nesting += 1;

        let alignment = self.base_alignment();
        let size = if walk.observing() { self.logical_size() } else { 0 };
        let direction = walk.direction;
        let depth = *nesting;

        if !root {
            let pad = padding_for_alignment(*offset, alignment);
            *offset += pad;
            if pad > 0 {
                let at = *offset - pad;
                walk.report(|path| SdParams {
                    alignment,
                    size,
                    base,
                    offset: at,
                    pad,
                    field_index: None,
                    nesting: depth,
                    action: SdAction::PadBefore,
                    direction,
                    field_path: path.to_string(),
                    field_type: s.name.clone(),
                });
            }
        }

        let visit = walk.visit_action();
        for (index, field) in s.fields.iter().enumerate() {
            let index = index as u32;
            let field_alignment = field.base_alignment();
            let field_size = field.logical_size();
            let nested = field.is_struct();
            let mark = walk.enter(&format!(".{}", field.field_name(index, false)));

            if !nested {
                let pad = padding_for_alignment(*offset, field_alignment);
                *offset += pad;
                if pad > 0 {
                    let at = *offset - pad;
                    walk.report(|path| SdParams {
                        alignment: field_alignment,
                        size: field_size,
                        base,
                        offset: at,
                        pad,
                        field_index: Some(index),
                        nesting: depth,
                        action: SdAction::PadBefore,
                        direction,
                        field_path: path.to_string(),
                        field_type: field.describe(),
                    });
                }
            }

            log::trace!(
                "[Codec] {:?} {}::{} at {} (align {}, size {}, element {})",
                direction,
                s.name,
                field.field_name(index, true),
                base + *offset,
                field_alignment,
                field_size,
                array_element
            );
            // a nested composite pads itself, report where it will start
            let at = if nested { align_size(*offset, field_alignment) } else { *offset };
            walk.report(|path| SdParams {
                alignment: field_alignment,
                size: field_size,
                base,
                offset: at,
                pad: 0,
                field_index: Some(index),
                nesting: depth,
                action: visit,
                direction,
                field_path: path.to_string(),
                field_type: field.describe(),
            });

            field.serialize_or_deserialize(walk, base, offset, false, nesting);
            if !nested {
                *offset += field_size;
            }
            walk.leave(mark);
        }

        let pad = padding_for_alignment(*offset, alignment);
        *offset += pad;
        if pad > 0 {
            let at = *offset - pad;
            walk.report(|path| SdParams {
                alignment,
                size,
                base,
                offset: at,
                pad,
                field_index: None,
                nesting: depth,
                action: SdAction::PadAfter,
                direction,
                field_path: path.to_string(),
                field_type: s.name.clone(),
            });
        }

        *nesting -= 1;
    }
}

fn check_bounds(leaves: &[usize], end: usize, available: usize) -> LayoutResult<()> {
    let required = leaves
        .iter()
        .map(|at| at + SCALAR_WIDTH)
        .max()
        .unwrap_or(0)
        .max(end);
    if required > available {
        return Err(LayoutError::BufferTooSmall { required, available });
    }
    Ok(())
}
