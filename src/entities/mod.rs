pub mod concept;
pub mod project;
pub mod render;
