pub mod gateway;
#[cfg(test)]
pub mod memory;
pub mod repository;
pub mod store;
