// Concrete implementations of the domain ports.

pub mod storage;

pub use storage::LocalStorage;
