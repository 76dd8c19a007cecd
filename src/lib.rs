//! Reader and writer for Feather V1 columnar files
//!
//! `feather-core` decodes and produces Feather V1 files: a buffer region of
//! 8-byte-aligned column arrays bracketed by `FEA1` magic markers, with
//! FlatBuffers table metadata in the footer.
//!
//! # Key Components
//!
//! - **DataFrame**: Whole-file reader view
//!   - Untyped cell access through [`FeatherValue`]
//!   - Typed cell access through the [`FromColumn`] coercion matrix
//!   - Zero- or one-based indexing chosen per frame via [`Basis`]
//!
//! - **Projections**: Typed views over a whole frame
//!   - [`DataFrame::map`] projects columns positionally onto tuples, eagerly
//!   - [`DataFrame::proxy`] projects rows by column name onto structs
//!     declared with [`feather_proxy!`]
//!
//! - **Writer**: One-shot file assembly through [`FeatherWriter`]
//!   - Typed column appends via [`ColumnElement`]
//!   - Dynamically typed appends with narrowest-type inference
//!
//! - **Categories**: Dictionary-encoded string columns
//!   - Read as labels, raw codes, or enums declared with [`feather_enum!`]
//!   - Enum resolution is by level name when every label matches a member,
//!     otherwise by underlying value
//!
//! # Example
//!
//! ```no_run
//! use feather_core::{Basis, DataFrame, FeatherWriter, WriteMode};
//!
//! # fn main() -> feather_core::Result<()> {
//! let mut writer = FeatherWriter::create("points.feather")?;
//! writer.add_column("x", vec![1_i32, 2, 3])?;
//! writer.add_column("label", vec![Some("a"), None, Some("c")])?;
//! writer.finish()?;
//!
//! let frame = DataFrame::open("points.feather", Basis::Zero)?;
//! let x: i64 = frame.get(2, 0)?;
//! let label: Option<String> = frame.get(1, 1)?;
//! assert_eq!((x, label), (3, None));
//! # Ok(())
//! # }
//! ```

pub mod buffers;
pub mod coerce;
pub mod error;
mod flatbuf;
mod footer;
pub mod frame;
mod infer;
pub mod projection;
pub mod reader;
pub mod schema;
pub mod value;
pub mod writer;

#[cfg(test)]
pub mod test_utils;

pub use coerce::{Categorical, CategoryStrategy, FromColumn};
pub use error::{ErrorContext, FeatherError, Result};
pub use frame::{Basis, ColumnView, DataFrame};
pub use projection::{Mapped, Proxied, ProxyView, Record};
pub use reader::read_table;
pub use schema::{Annotation, Column, Table, TimeUnit, WireType};
pub use value::FeatherValue;
pub use writer::{ColumnElement, FeatherWriter, WriteMode};
