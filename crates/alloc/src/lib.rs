//! A contiguous growable array over pluggable allocators.
//!
//! [`Vec`] manages its own block of raw memory: it asks an [`Allocator`] for blocks sized in
//! elements, constructs and destroys elements in place, and doubles its block when it runs out of
//! room. Two allocators are provided: [`Global`], the process heap, and [`Arena`], a fixed-size
//! region carved into blocks of a few size classes.
mod arena;
mod config;
mod containers;
mod error;
pub mod ptr;
mod traits;

pub use arena::Arena;
pub use config::{ArenaConfig, ConfigError};
pub use containers::{IntoIter, Vec};
pub use error::{AllocError, VecError};
pub use traits::{Allocator, Global};
