mod client;
mod history;
mod license;
mod validation_history;

pub use client::*;
pub use history::*;
pub use license::*;
pub use validation_history::*;
