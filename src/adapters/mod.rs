// Adapters layer: concrete implementations for external systems (http sources, local storage).

pub mod http;
pub mod storage;

pub use http::{build_client, HttpGeometrySource, SocrataRecordSource};
pub use storage::LocalStorage;
