pub mod cluster_client;
pub mod hook_callback;

pub use cluster_client::*;
pub use hook_callback::*;
