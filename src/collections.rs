pub mod bst_map;

pub use bst_map::BstMap;
