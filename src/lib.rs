//! Arena-backed parser and serializer for Flattened Device Tree (FDT) blobs.
//!
//! A [`Dtb`] borrows an FDT blob, walks its structure block once, and
//! materializes a navigable tree of nodes and properties inside an
//! arena owned by the `Dtb` itself. Node and property payloads are
//! borrowed from the source blob, so the blob must outlive the `Dtb`.
//!
//! ```
//! use fdt_core::Dtb;
//!
//! # fn run(blob: &[u8]) -> Result<(), fdt_core::FdtError> {
//! let dtb = Dtb::parse(blob)?;
//! let root = dtb.find("/").unwrap();
//! println!("root has {} children", dtb.stat(root).child_count);
//! # Ok(())
//! # }
//! ```

mod arena;
mod decode;
mod define;
mod dtb;
mod error;
mod header;
mod mutate;
mod ops;
mod parser;
mod query;
mod serialize;

pub use arena::{NodeId, PropId};
pub use decode::{Pair, PairLayout, Quad, QuadLayout, Triplet, TripletLayout};
pub use define::{MemoryReservation, Phandle, Token, FDT_MAGIC};
pub use dtb::Dtb;
pub use error::FdtError;
pub use header::{query_total_size, Header};
pub use ops::{DtbOps, InitConfig, LogOps, NullOps};
pub use query::{NodeStat, Property};
