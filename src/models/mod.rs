pub mod gallery;
pub mod pin;
pub mod session;
pub mod trip;
