pub mod client_info;
pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::*;
