pub mod analytics;
pub mod common;
pub mod mindmap;
pub mod payload;
pub mod session;

pub use analytics::*;
pub use common::*;
pub use mindmap::*;
pub use payload::*;
pub use session::*;
