//! Page components rendered by the router.

mod index;

pub use index::Index;
