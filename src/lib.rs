#[macro_use]
extern crate log;

pub use tables::{Direction, TableSet};
pub use value::{Value, ValueKind};

pub mod config;
pub mod error;
pub mod tables;
pub mod timefmt;
pub mod value;

mod codec;
mod collections;
mod csv;
mod schema;

pub type Result<T> = std::result::Result<T, error::TableError>;
