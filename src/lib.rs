#![doc = include_str!("../README.md")]
#![no_std]
#![cfg_attr(feature = "doc_cfg", feature(doc_cfg))]

#[cfg(feature = "alloc")]
extern crate alloc;
#[cfg(any(test, feature = "std"))]
extern crate std;

#[macro_use]
mod macros;

pub mod rbtree;
pub mod search;
mod utils {
    pub mod panicking;
}

if_alloc! {
    #[cfg_attr(feature = "doc_cfg", doc(cfg(feature = "alloc")))]
    pub mod map;
    pub use map::RbMap;
}

pub use rbtree::{Color, Link, NodeId, NodeStorage, Root};
pub use search::Error;
