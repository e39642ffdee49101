mod pagination;
mod transfer_source;

pub use pagination::*;
pub use transfer_source::*;
