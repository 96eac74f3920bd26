pub mod media;
pub mod product;
pub mod settings;
pub mod user;
