pub mod address;
pub mod alias;
