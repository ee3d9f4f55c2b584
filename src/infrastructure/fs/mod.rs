//! Local file system adapters

mod scanner;

pub use scanner::LocalAssetSource;
