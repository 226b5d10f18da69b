pub mod session;
pub mod settings;
pub mod utils;

pub use utils::{init_logging, open_settings};
