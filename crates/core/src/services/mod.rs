mod cancel;
mod filter;
mod grouping;
mod histogram;
mod ledger;
mod stream;
mod view;

#[cfg(test)]
mod testing;

pub use cancel::*;
pub use filter::*;
pub use grouping::*;
pub use histogram::*;
pub use ledger::*;
pub use stream::*;
pub use view::*;
