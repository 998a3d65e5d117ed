pub mod builder;
pub mod canvas;
pub mod dsl;
pub mod error;
pub mod host;
pub mod id;
pub mod model;
pub mod schema;
pub mod serializer;

pub use builder::{BuildOptions, build_node, build_scene};
pub use canvas::MemoryHost;
pub use error::{BuildError, HostError, ParseError, SerializeError};
pub use host::{Host, HostKind, HostMutation, HostObject};
pub use id::HostId;
pub use model::*;
pub use schema::{DesignFile, ValidationReport, validate};
pub use serializer::{serialize_node, serialize_selection};
