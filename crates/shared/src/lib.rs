pub mod domain;
pub mod languages;
pub mod protocol;
