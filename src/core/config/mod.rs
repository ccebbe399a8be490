pub mod data;
pub mod io;

pub use data::{Settings, Theme};
pub use io::{DataStore, StoreError};

#[cfg(test)]
mod tests;
