pub mod api;
pub mod config;
pub mod extract;
pub mod policy;
pub mod session;
pub mod state;
#[cfg(test)]
pub mod test_support;
pub mod types;
pub mod util;
