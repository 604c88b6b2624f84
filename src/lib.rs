// Library exports for zerver
// This allows the test suite to import modules

pub mod child;
pub mod cli;
pub mod config;
pub mod console;
pub mod debounce;
pub mod protocol;
pub mod supervisor;
pub mod watch;
