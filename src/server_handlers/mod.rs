pub mod pages;
pub mod cache;
pub mod docs;

pub use pages::*;
pub use cache::*;
pub use docs::*;
