//! std430 layout tree
//!
//! Nodes know their own alignment and size; the codec packs a tree into a flat
//! buffer and back, the text module prints source and values, and the compare
//! module diffs two trees of the same shape.

pub mod codec;
pub mod compare;
pub mod node;
pub mod scalar;
pub mod text;

pub use codec::{Direction, SdAction, SdCallback, SdParams};
pub use compare::{CmpStatus, Mismatch, MismatchKind};
pub use node::{vector_alignment, ArrayKind, ArrayNode, MatrixNode, Node, StructNode};
pub use scalar::{Scalar, ScalarType};

/// Align a size to the given power-of-two alignment
pub fn align_size(size: usize, alignment: usize) -> usize {
    (size + alignment - 1) & !(alignment - 1)
}

/// Padding needed to bring `current_offset` up to `alignment`
pub fn padding_for_alignment(current_offset: usize, alignment: usize) -> usize {
    (alignment - (current_offset % alignment)) % alignment
}
