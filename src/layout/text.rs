//! Source text and value dumps for layout trees

use std::fmt::{self, Write};

use crate::constants::codegen::INDENT_WIDTH;
use crate::layout::node::{ArrayKind, Node};
use crate::layout::scalar::Scalar;

pub(crate) fn put_indent<W: Write>(out: &mut W, indent: u32) -> fmt::Result {
    write!(out, "{:width$}", "", width = indent as usize * INDENT_WIDTH)
}

fn write_indexed<W: Write>(out: &mut W, values: &[Scalar]) -> fmt::Result {
    for (i, value) in values.iter().enumerate() {
        write!(out, "[{}]({})", i, value)?;
    }
    Ok(())
}

impl Node {
    /// Generated field name, `{type}_{index}`, optionally followed by the array rank
    pub fn field_name(&self, index: u32, append_rank: bool) -> String {
        let name = format!("{}_{}", self.type_name(), index);
        match self {
            Node::Array(a) if append_rank && a.is_runtime() => format!("{}[/* {} */]", name, a.len()),
            Node::Array(a) if append_rank => format!("{}[{}]", name, a.len()),
            _ => name,
        }
    }

    /// Human-readable dump of the current values
    pub fn print_value<W: Write>(&self, out: &mut W, level: u32) -> fmt::Result {
        let ty = self.type_name();
        match self {
            Node::Scalar(s) => write!(out, "{} {}{} = {} ", ty, ty, level, s.value),
            Node::Vector(v) => {
                write!(out, "{} {}{} = ", ty, ty, level)?;
                write_indexed(out, &v.values)?;
                out.write_char(' ')
            }
            Node::Matrix(m) => {
                write!(out, "{} {}_{} = ", ty, ty, level)?;
                for col in 0..m.cols {
                    for row in 0..m.rows {
                        write!(out, "[{},{}]({})", col, row, m.values[col * m.rows + row])?;
                    }
                }
                out.write_char(' ')
            }
            Node::Array(a) => {
                write!(out, "{} {}{}[{}] = ", ty, ty, level, a.len())?;
                match a.kind {
                    ArrayKind::Fixed => {
                        for (i, element) in a.elements.iter().enumerate() {
                            if let Node::Scalar(s) = element {
                                write!(out, "[{}]({})", i, s.value)?;
                            }
                        }
                        out.write_char(' ')
                    }
                    ArrayKind::Dynamic => {
                        for (i, element) in a.elements.iter().enumerate() {
                            write!(out, "[{}](", i)?;
                            element.print_value(out, level + 1)?;
                            out.write_str(") ")?;
                        }
                        Ok(())
                    }
                }
            }
            Node::Struct(s) => {
                write!(out, "{} {}{} {{ ", ty, ty, level)?;
                for field in &s.fields {
                    field.print_value(out, level + 1)?;
                }
                out.write_str("} ")
            }
        }
    }

    /// Emits statements assigning `rhs` to every leaf reachable from `path`,
    /// in the same order `loop_seed` visits them
    pub fn gen_loops<W: Write>(
        &self,
        out: &mut W,
        path: &str,
        rhs: &str,
        field_index: u32,
        indent: u32,
        iterator_seed: &mut u32,
    ) -> fmt::Result {
        match self {
            Node::Scalar(_) => {
                *iterator_seed += 1;
                put_indent(out, indent)?;
                writeln!(out, "{} = {}({});", path, self.type_name(), rhs)
            }
            Node::Vector(v) => {
                let it = next_iterator(self, field_index, iterator_seed);
                open_loop(out, indent, &it, v.values.len())?;
                put_indent(out, indent + 1)?;
                writeln!(out, "{}[{}] = {}({});", path, it, v.ty, rhs)?;
                close_loop(out, indent)
            }
            Node::Matrix(m) => {
                let ic = next_iterator(self, field_index, iterator_seed);
                let ir = next_iterator(self, field_index, iterator_seed);
                open_loop(out, indent, &ic, m.cols)?;
                open_loop(out, indent + 1, &ir, m.rows)?;
                put_indent(out, indent + 2)?;
                writeln!(out, "{}[{}][{}] = float({});", path, ic, ir, rhs)?;
                close_loop(out, indent + 1)?;
                close_loop(out, indent)
            }
            Node::Array(a) => {
                let it = next_iterator(self, field_index, iterator_seed);
                open_loop(out, indent, &it, a.len())?;
                let element_path = format!("{}[{}]", path, it);
                match a.kind {
                    ArrayKind::Fixed => {
                        put_indent(out, indent + 1)?;
                        writeln!(out, "{} = {}({});", element_path, a.element().type_name(), rhs)?;
                    }
                    ArrayKind::Dynamic => {
                        a.element()
                            .gen_loops(out, &element_path, rhs, 0, indent + 1, iterator_seed)?;
                    }
                }
                close_loop(out, indent)
            }
            Node::Struct(s) => {
                for (index, field) in s.fields.iter().enumerate() {
                    let index = index as u32;
                    let field_path = format!("{}.{}", path, field.field_name(index, false));
                    field.gen_loops(out, &field_path, rhs, index, indent, iterator_seed)?;
                }
                Ok(())
            }
        }
    }
}

fn next_iterator(node: &Node, field_index: u32, iterator_seed: &mut u32) -> String {
    let it = format!("{}_{}", node.field_name(field_index, false), iterator_seed);
    *iterator_seed += 1;
    it
}

fn open_loop<W: Write>(out: &mut W, indent: u32, it: &str, count: usize) -> fmt::Result {
    put_indent(out, indent)?;
    writeln!(out, "for (uint {it} = 0; {it} < {count}; ++{it}) {{", it = it, count = count)
}

fn close_loop<W: Write>(out: &mut W, indent: u32) -> fmt::Result {
    put_indent(out, indent)?;
    out.write_str("}\n")
}
