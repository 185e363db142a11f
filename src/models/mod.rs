pub mod author;
pub mod illust;
pub mod page;
pub mod tag;

pub use author::*;
pub use illust::*;
pub use page::*;
pub use tag::*;
