//! Layout tree node kinds
//!
//! A tree is a closed set of variants stored by value: composites own their
//! fields, arrays own their elements. Nothing is shared between trees, so a
//! clone is always an independent instance.

use crate::constants::packing::{MAX_VECTOR_WIDTH, MIN_STRUCT_ALIGNMENT, MIN_VECTOR_WIDTH, SCALAR_WIDTH};
use crate::error::{LayoutError, LayoutResult};
use crate::layout::align_size;
use crate::layout::scalar::{Scalar, ScalarType};

/// Base alignment of an N-wide vector of 4-byte scalars (3-wide packs like 4-wide)
pub fn vector_alignment(width: usize) -> usize {
    let slots = if width == 3 { 4 } else { width };
    slots * SCALAR_WIDTH
}

/// One typed element of a layout tree
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Scalar(ScalarNode),
    Vector(VectorNode),
    Matrix(MatrixNode),
    Array(ArrayNode),
    Struct(StructNode),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScalarNode {
    pub(crate) value: Scalar,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VectorNode {
    pub(crate) ty: ScalarType,
    pub(crate) values: Vec<Scalar>,
}

/// Float matrix. Values are kept in `[column][row]` order whatever the major flag.
#[derive(Debug, Clone, PartialEq)]
pub struct MatrixNode {
    pub(crate) cols: usize,
    pub(crate) rows: usize,
    pub(crate) column_major: bool,
    pub(crate) values: Vec<Scalar>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrayKind {
    /// Homogeneous scalar array, element stride equals the element's base alignment
    Fixed,
    /// Array of cloned element shapes, each element encoded as a self-contained block
    Dynamic,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArrayNode {
    pub(crate) kind: ArrayKind,
    pub(crate) runtime: bool,
    pub(crate) elements: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructNode {
    pub(crate) name: String,
    pub(crate) fields: Vec<Node>,
}

impl MatrixNode {
    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn is_column_major(&self) -> bool {
        self.column_major
    }

    /// Components per stored vector (a column when column-major, a row otherwise)
    pub fn vector_len(&self) -> usize {
        if self.column_major {
            self.rows
        } else {
            self.cols
        }
    }

    /// Number of stored vectors
    pub fn vector_count(&self) -> usize {
        if self.column_major {
            self.cols
        } else {
            self.rows
        }
    }

    pub fn vector_stride(&self) -> usize {
        vector_alignment(self.vector_len())
    }

    /// Byte offset of element `[col][row]` relative to the matrix start
    pub fn element_offset(&self, col: usize, row: usize) -> usize {
        if self.column_major {
            col * self.vector_stride() + row * SCALAR_WIDTH
        } else {
            row * self.vector_stride() + col * SCALAR_WIDTH
        }
    }

    pub fn value(&self, col: usize, row: usize) -> Option<&Scalar> {
        if col < self.cols && row < self.rows {
            self.values.get(col * self.rows + row)
        } else {
            None
        }
    }
}

impl ArrayNode {
    pub fn kind(&self) -> ArrayKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Whether the array is unsized in generated source
    pub fn is_runtime(&self) -> bool {
        self.runtime
    }

    pub fn elements(&self) -> &[Node] {
        &self.elements
    }

    pub fn elements_mut(&mut self) -> &mut [Node] {
        &mut self.elements
    }

    /// Representative element; arrays are never built empty
    pub fn element(&self) -> &Node {
        &self.elements[0]
    }

    pub fn stride(&self) -> usize {
        let element = self.element();
        match self.kind {
            ArrayKind::Fixed => element.base_alignment(),
            ArrayKind::Dynamic => align_size(element.logical_size(), element.base_alignment()),
        }
    }
}

impl StructNode {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[Node] {
        &self.fields
    }
}

impl Node {
    pub fn scalar(ty: ScalarType) -> Node {
        Node::Scalar(ScalarNode { value: ty.zero() })
    }

    pub fn vector(ty: ScalarType, width: usize) -> LayoutResult<Node> {
        if !(MIN_VECTOR_WIDTH..=MAX_VECTOR_WIDTH).contains(&width) {
            return Err(LayoutError::invariant(
                format!("{}vec{}", ty.vector_prefix(), width),
                format!("vector width must be {}..={}", MIN_VECTOR_WIDTH, MAX_VECTOR_WIDTH),
            ));
        }
        Ok(Node::Vector(VectorNode {
            ty,
            values: vec![ty.zero(); width],
        }))
    }

    /// Float matrix with `cols` columns and `rows` rows
    pub fn matrix(cols: usize, rows: usize, column_major: bool) -> LayoutResult<Node> {
        let valid = MIN_VECTOR_WIDTH..=MAX_VECTOR_WIDTH;
        if !valid.contains(&cols) || !valid.contains(&rows) {
            return Err(LayoutError::invariant(
                format!("mat{}x{}", cols, rows),
                format!("matrix dimensions must be {}..={}", MIN_VECTOR_WIDTH, MAX_VECTOR_WIDTH),
            ));
        }
        Ok(Node::Matrix(MatrixNode {
            cols,
            rows,
            column_major,
            values: vec![ScalarType::Float.zero(); cols * rows],
        }))
    }

    pub fn fixed_array(ty: ScalarType, count: usize, runtime: bool) -> LayoutResult<Node> {
        Self::build_array(ArrayKind::Fixed, &Node::scalar(ty), count, runtime)
    }

    /// Array of `count` clones of `element`
    pub fn array(element: &Node, count: usize, runtime: bool) -> LayoutResult<Node> {
        Self::build_array(ArrayKind::Dynamic, element, count, runtime)
    }

    fn build_array(kind: ArrayKind, element: &Node, count: usize, runtime: bool) -> LayoutResult<Node> {
        let type_name = element.type_name();
        if count == 0 {
            return Err(LayoutError::invariant(type_name, "arrays need at least one element"));
        }
        if element.is_array().is_some() {
            return Err(LayoutError::invariant(type_name, "arrays of arrays are not supported"));
        }
        if kind == ArrayKind::Fixed && !matches!(element, Node::Scalar(_)) {
            return Err(LayoutError::invariant(type_name, "fixed arrays hold scalars only"));
        }
        Ok(Node::Array(ArrayNode {
            kind,
            runtime,
            elements: vec![element.clone(); count],
        }))
    }

    /// Composite named `name` owning deep clones of `fields`
    pub fn structure(name: impl Into<String>, fields: &[Node]) -> LayoutResult<Node> {
        let name = name.into();
        if name.is_empty() {
            return Err(LayoutError::invariant("<unnamed>", "composites need a type name"));
        }
        if fields.is_empty() {
            return Err(LayoutError::invariant(name, "composites need at least one field"));
        }
        Ok(Node::Struct(StructNode {
            name,
            fields: fields.to_vec(),
        }))
    }

    /// Semantic type name; arrays report their element's name
    pub fn type_name(&self) -> String {
        match self {
            Node::Scalar(s) => s.value.scalar_type().glsl_name().to_string(),
            Node::Vector(v) => format!("{}vec{}", v.ty.vector_prefix(), v.values.len()),
            Node::Matrix(m) if m.cols == m.rows => format!("mat{}", m.cols),
            Node::Matrix(m) => format!("mat{}x{}", m.cols, m.rows),
            Node::Array(a) => a.element().type_name(),
            Node::Struct(s) => s.name.clone(),
        }
    }

    /// Type name with the array rank, e.g. `vec3[4]`
    pub fn describe(&self) -> String {
        match self.is_array() {
            Some(count) => format!("{}[{}]", self.type_name(), count),
            None => self.type_name(),
        }
    }

    pub fn children(&self) -> LayoutResult<&[Node]> {
        match self {
            Node::Struct(s) => Ok(&s.fields),
            _ => Err(LayoutError::unsupported(self.type_name(), "children")),
        }
    }

    pub(crate) fn children_mut(&mut self) -> LayoutResult<&mut Vec<Node>> {
        match self {
            Node::Struct(s) => Ok(&mut s.fields),
            _ => Err(LayoutError::unsupported(self.type_name(), "children")),
        }
    }

    pub fn element_type(&self) -> LayoutResult<&Node> {
        match self {
            Node::Array(a) => Ok(a.element()),
            _ => Err(LayoutError::unsupported(self.type_name(), "element_type")),
        }
    }

    /// Element count for array kinds
    pub fn is_array(&self) -> Option<usize> {
        match self {
            Node::Array(a) => Some(a.len()),
            _ => None,
        }
    }

    pub fn is_struct(&self) -> bool {
        matches!(self, Node::Struct(_))
    }

    /// Element type of leaf kinds
    pub fn scalar_type(&self) -> Option<ScalarType> {
        match self {
            Node::Scalar(s) => Some(s.value.scalar_type()),
            Node::Vector(v) => Some(v.ty),
            Node::Matrix(_) => Some(ScalarType::Float),
            Node::Array(_) | Node::Struct(_) => None,
        }
    }

    /// Deep copy with every leaf reset to zero
    pub fn clone_shape(&self) -> Node {
        let mut shape = self.clone();
        for slot in shape.scalars_mut() {
            *slot = slot.scalar_type().zero();
        }
        shape
    }

    /// Assigns `seed, seed + 1, ...` to every leaf in field/element order
    pub fn loop_seed(&mut self, seed: &mut f32) {
        for slot in self.scalars_mut() {
            *slot = slot.scalar_type().from_seed(*seed);
            *seed += 1.0;
        }
    }

    pub fn base_alignment(&self) -> usize {
        match self {
            Node::Scalar(_) => SCALAR_WIDTH,
            Node::Vector(v) => vector_alignment(v.values.len()),
            Node::Matrix(m) => m.vector_stride(),
            Node::Array(a) => a.element().base_alignment(),
            Node::Struct(s) => s
                .fields
                .iter()
                .map(Node::base_alignment)
                .fold(MIN_STRUCT_ALIGNMENT, usize::max),
        }
    }

    pub fn logical_size(&self) -> usize {
        match self {
            Node::Scalar(_) => SCALAR_WIDTH,
            Node::Vector(v) => v.values.len() * SCALAR_WIDTH,
            Node::Matrix(m) => m.vector_count() * m.vector_stride(),
            Node::Array(a) => a.len() * a.stride(),
            Node::Struct(s) => {
                let mut offset = 0;
                for field in &s.fields {
                    offset = align_size(offset, field.base_alignment());
                    offset += field.logical_size();
                }
                align_size(offset, self.base_alignment())
            }
        }
    }

    /// Number of scalar leaves in the subtree
    pub fn visit_count(&self) -> u32 {
        match self {
            Node::Scalar(_) => 1,
            Node::Vector(v) => v.values.len() as u32,
            Node::Matrix(m) => m.values.len() as u32,
            Node::Array(a) => a.elements.iter().map(Node::visit_count).sum(),
            Node::Struct(s) => s.fields.iter().map(Node::visit_count).sum(),
        }
    }

    /// Every scalar slot in `loop_seed` order
    pub fn scalars(&self) -> Vec<&Scalar> {
        let mut out = Vec::with_capacity(self.visit_count() as usize);
        self.collect_scalars(&mut out);
        out
    }

    fn collect_scalars<'a>(&'a self, out: &mut Vec<&'a Scalar>) {
        match self {
            Node::Scalar(s) => out.push(&s.value),
            Node::Vector(v) => out.extend(v.values.iter()),
            Node::Matrix(m) => out.extend(m.values.iter()),
            Node::Array(a) => a.elements.iter().for_each(|e| e.collect_scalars(out)),
            Node::Struct(s) => s.fields.iter().for_each(|f| f.collect_scalars(out)),
        }
    }

    pub fn scalars_mut(&mut self) -> Vec<&mut Scalar> {
        let mut out = Vec::with_capacity(self.visit_count() as usize);
        self.collect_scalars_mut(&mut out);
        out
    }

    fn collect_scalars_mut<'a>(&'a mut self, out: &mut Vec<&'a mut Scalar>) {
        match self {
            Node::Scalar(s) => out.push(&mut s.value),
            Node::Vector(v) => out.extend(v.values.iter_mut()),
            Node::Matrix(m) => out.extend(m.values.iter_mut()),
            Node::Array(a) => a.elements.iter_mut().for_each(|e| e.collect_scalars_mut(out)),
            Node::Struct(s) => s.fields.iter_mut().for_each(|f| f.collect_scalars_mut(out)),
        }
    }
}
