//! Shelfmark application library: the books, reviews, and users modules
//! plus their wiring into the module registry.

pub mod modules;

pub use modules::register_all;
