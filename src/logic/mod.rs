pub mod analytics;
pub mod generate;
pub mod ledger;
pub mod tree;
pub mod validate;

pub use analytics::*;
pub use generate::*;
pub use ledger::*;
pub use validate::*;
