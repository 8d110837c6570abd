//! Compute shader assembly and its host-side mirror
//!
//! The shader writes `seed++` into every leaf of one root block per
//! invocation. The host mirror runs `loop_seed` on clones of the same root
//! with a shared running seed, which is what the invocations produce.

use std::fmt::Write;

use crate::config::ShaderConfig;
use crate::error::{LayoutError, LayoutErrorContext, LayoutResult};
use crate::generator::StructGenerator;
use crate::layout::text::put_indent;
use crate::layout::{align_size, Node};

/// GLSL compute source filling `open_array_len` root blocks (or a single one when zero)
pub fn generate_compute_shader(
    sg: &StructGenerator,
    root: &Node,
    open_array_len: u32,
    config: &ShaderConfig,
) -> LayoutResult<String> {
    let list = sg.get_struct_list(root)?;
    let (root_struct, nested) = list
        .split_last()
        .layout_context(&root.type_name(), "empty struct list")?;
    let open = open_array_len > 0;
    let name = &config.root_name;

    let mut code = String::new();
    writeln!(code, "#version {}", config.version)?;
    if open {
        writeln!(code, "#extension GL_EXT_nonuniform_qualifier : require")?;
    }
    writeln!(
        code,
        "layout(local_size_x = {}, local_size_y = 1, local_size_z = 1) in;",
        open_array_len.max(1)
    )?;
    writeln!(code, "layout(push_constant) uniform PC {{")?;
    put_indent(&mut code, 1)?;
    writeln!(code, "float seed;")?;
    put_indent(&mut code, 1)?;
    writeln!(code, "int visits;")?;
    writeln!(code, "}} pc;")?;

    for s in nested {
        sg.print_struct(s, &mut code, true)?;
    }
    write!(code, "layout(std430, binding = 0) buffer {} ", root_struct.type_name())?;
    sg.print_struct(root_struct, &mut code, false)?;
    write!(code, " {}", name)?;
    if open {
        write!(code, "[/* {} */]", open_array_len)?;
    }
    writeln!(code, ";")?;

    writeln!(code, "void main() {{")?;
    put_indent(&mut code, 1)?;
    writeln!(code, "float seed = pc.seed + gl_LocalInvocationID.x * pc.visits;")?;
    if open {
        let it = format!("{}_0", name);
        put_indent(&mut code, 1)?;
        writeln!(code, "for (uint {it} = 0; {it} < {}; ++{it}) {{", open_array_len, it = it)?;
        put_indent(&mut code, 2)?;
        writeln!(code, "if ({} == gl_LocalInvocationID.x) {{", it)?;
        let path = format!("{}[nonuniformEXT({})]", name, it);
        sg.generate_loops(root_struct, &path, &mut code, 3, &config.rhs_expression)?;
        put_indent(&mut code, 2)?;
        writeln!(code, "}}")?;
        put_indent(&mut code, 1)?;
        writeln!(code, "}}")?;
    } else {
        sg.generate_loops(root_struct, name, &mut code, 1, &config.rhs_expression)?;
    }
    writeln!(code, "}}")?;

    log::debug!(
        "[Shader] {} lines, {} struct declarations, {} invocations",
        code.lines().count(),
        list.len(),
        open_array_len.max(1)
    );
    Ok(code)
}

/// Push constant block the generated shader expects
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct PushConstants {
    pub seed: f32,
    pub visits: i32,
}

impl PushConstants {
    pub fn new(seed: f32, root: &Node) -> Self {
        Self {
            seed,
            visits: root.visit_count() as i32,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }
}

/// Byte distance between consecutive root blocks in one buffer
pub fn instance_stride(root: &Node, alignment: usize) -> LayoutResult<usize> {
    if !alignment.is_power_of_two() {
        return Err(LayoutError::invariant(
            root.type_name(),
            format!("instance alignment {} is not a power of two", alignment),
        ));
    }
    Ok(align_size(root.logical_size(), alignment))
}

/// What `count` invocations write, one seeded clone per invocation
pub fn simulate_invocations(root: &Node, count: u32, seed: f32) -> Vec<Node> {
    let mut seed = seed;
    (0..count.max(1))
        .map(|_| {
            let mut instance = root.clone_shape();
            instance.loop_seed(&mut seed);
            instance
        })
        .collect()
}

/// Serializes every instance into one buffer, `stride` bytes apart
pub fn pack_instances(sg: &StructGenerator, instances: &[Node], stride: usize) -> LayoutResult<Vec<u8>> {
    let mut buffer = vec![0u8; stride * instances.len()];
    for (i, instance) in instances.iter().enumerate() {
        let start = i * stride;
        sg.serialize_root(instance, &mut buffer[start..start + stride])?;
    }
    Ok(buffer)
}

/// Reads `count` instances shaped like `root` back out of a packed buffer
pub fn unpack_instances(
    sg: &StructGenerator,
    root: &Node,
    buffer: &[u8],
    count: usize,
    stride: usize,
) -> LayoutResult<Vec<Node>> {
    let needed = stride * count;
    if buffer.len() < needed {
        return Err(LayoutError::BufferTooSmall {
            required: needed,
            available: buffer.len(),
        });
    }
    (0..count)
        .map(|i| {
            let mut instance = root.clone_shape();
            sg.deserialize_root(&buffer[i * stride..(i + 1) * stride], &mut instance)?;
            Ok(instance)
        })
        .collect()
}
