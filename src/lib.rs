//! pgdeck library exports for testing

pub mod core;
pub mod driver;
pub mod tui;

#[cfg(test)]
pub mod test_support;
