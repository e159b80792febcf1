//! Vector index backends: [`FlatIndex`] (in-process, persisted to a directory)
//! and [`LanceStore`] (LanceDB collection).

pub mod filter;
pub mod flat;
pub mod lance;
pub mod math;
pub mod persist;
pub mod schema;
pub mod table;

pub use flat::FlatIndex;
pub use lance::LanceStore;
