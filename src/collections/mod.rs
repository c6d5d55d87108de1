pub mod arena;
pub mod avl;
