pub mod blob;
pub mod gallery;
pub mod gateway;
pub mod locations;
pub mod pin_store;
pub mod storage;
