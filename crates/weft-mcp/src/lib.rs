pub mod bridge;
pub mod client;
pub mod handler;

pub use bridge::{bridge_capabilities, is_disabled, ProviderCapability};
pub use client::StdioProvider;
