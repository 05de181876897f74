pub mod routes;

pub use routes::operations_routes;
