// Layout engine constants
//
// Packing rules and code generation defaults live here so the codec, the
// text generators and the tests agree on them.

/// std430 packing constants
pub mod packing {
    /// Every supported scalar (int, uint, float) is 4 bytes wide
    pub const SCALAR_WIDTH: usize = 4;

    /// Floor for a composite's base alignment
    pub const MIN_STRUCT_ALIGNMENT: usize = SCALAR_WIDTH;

    /// Smallest and largest vector width / matrix dimension
    pub const MIN_VECTOR_WIDTH: usize = 2;
    pub const MAX_VECTOR_WIDTH: usize = 4;
}

/// Codec constants
pub mod codec {
    /// Nesting value marking the outermost serialize/deserialize call
    pub const ROOT_NESTING: i32 = -1;
}

/// Generated source defaults
pub mod codegen {
    /// Spaces per indentation level
    pub const INDENT_WIDTH: usize = 4;

    pub const DEFAULT_GLSL_VERSION: &str = "450 core";
    pub const DEFAULT_ROOT_NAME: &str = "root";
    pub const DEFAULT_RHS_EXPRESSION: &str = "seed++";

    /// Name given to the outermost composite by the random builder
    pub const ROOT_STRUCT_NAME: &str = "Root";
}

/// Harness defaults taken from the struct generator test
pub mod harness {
    pub const DEFAULT_SEED: u64 = 17;
    pub const DEFAULT_VALUE_SEED: f32 = 17.0;

    /// Outer open-array length is always a multiple of this
    pub const ROOT_ARRAY_GRANULARITY: u32 = 4;

    /// Default storage buffer offset alignment used to space instances
    pub const DEFAULT_INSTANCE_ALIGNMENT: usize = 256;
}
