pub mod document;
pub mod span;
pub mod tree;
pub mod visual;
