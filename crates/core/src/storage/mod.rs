pub mod lock;
pub mod registry;

pub use registry::{FileModelRegistry, ModelKey, ModelStore};
