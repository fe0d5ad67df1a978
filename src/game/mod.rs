pub mod collision;
pub mod constants;
pub mod types;
pub mod vector;
pub mod world;
