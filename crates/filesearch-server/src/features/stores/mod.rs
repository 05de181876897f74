pub mod routes;

pub use routes::stores_routes;
