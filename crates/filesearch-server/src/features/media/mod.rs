pub mod routes;

pub use routes::media_routes;
