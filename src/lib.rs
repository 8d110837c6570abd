pub mod config;
pub mod constants;
pub mod error;
pub mod generator;
pub mod layout;
pub mod random;
pub mod report;
pub mod shader;

pub use config::{HarnessConfig, RandomConfig, ShaderConfig};
pub use error::{LayoutError, LayoutErrorContext, LayoutResult};
pub use generator::{Comparison, StructGenerator};
pub use layout::{
    ArrayKind, CmpStatus, Direction, Mismatch, MismatchKind, Node, Scalar, ScalarType, SdAction,
    SdCallback, SdParams,
};
pub use random::{generate_structure, FieldKind, RandomStructure};
pub use report::LayoutReport;
pub use shader::{generate_compute_shader, PushConstants};
