//! Seams to the outside world: the key authority and the local pair sink

mod authority;
mod sink;

pub use authority::KeyAuthority;
pub use sink::PairSink;
