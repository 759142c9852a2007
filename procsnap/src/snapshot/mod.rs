//! # Report sections
//!
//! The three read-only traversals that turn the runtime's state into report
//! lines. Each writes through the [`ReportWriter`](crate::report::ReportWriter)
//! so the file and the console always see the same text.
//!
//! | section  | on service failure                                  |
//! |----------|-----------------------------------------------------|
//! | modules  | one `Couldn't enumerate modules: ...` line, continue |
//! | threads  | session ends, partial report stays on disk          |
//! | domains  | session ends, partial report stays on disk          |

pub mod domains;
pub mod modules;
pub mod threads;

pub use domains::write_app_domains;
pub use modules::write_modules;
pub use threads::{write_threads, SEPARATOR};
