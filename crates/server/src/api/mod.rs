pub mod gc;
pub mod handlers;
pub mod middleware;
pub mod nodes;
pub mod routes;
pub mod sync;

pub use routes::create_router;
