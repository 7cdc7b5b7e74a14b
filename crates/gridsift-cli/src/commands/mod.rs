pub mod explain;
pub mod select;
pub mod stats;
pub mod validate;
