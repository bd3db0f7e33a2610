pub mod package;
pub mod pickup;
pub mod principal;
pub mod vehicle;
