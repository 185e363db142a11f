pub mod illust;
pub mod image;
pub mod stats;
pub mod tag;
