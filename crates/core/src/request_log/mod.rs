//! Gateway request log: one JSON line per proxied request.

mod entry;
mod handle;
mod sink;
mod writer;

pub use entry::*;
pub use handle::*;
pub use sink::*;
pub use writer::*;
