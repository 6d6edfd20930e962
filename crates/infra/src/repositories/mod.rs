mod impls;

pub use impls::{InMemoryProFormaRequestRepository, SurrealProFormaRequestRepository};
