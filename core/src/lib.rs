pub mod analysis;
pub mod assembler;
pub mod bundler;
pub mod cli;
pub mod config;
pub mod error;
pub mod interface;
pub mod packager;
pub mod parser;
pub mod reflector;
pub mod type_mapper;
pub mod types;

// Re-export main types
pub use types::*;

pub use assembler::{Assembler, DefaultAssembler};
pub use error::{Result, WasmifyError};
pub use interface::{synthesize, InterfaceWorld};
pub use type_mapper::{map_type, InterfaceType};
