pub mod console_host;
pub mod session;

pub use console_host::ConsoleHost;
pub use session::{Session, SessionArgs};
