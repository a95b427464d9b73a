mod environments;
pub mod loader;
pub mod types;

pub use loader::*;
pub use types::*;
