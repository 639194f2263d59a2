/*
[INPUT]:  Backend JSON schema and serde requirements
[OUTPUT]: Typed Rust structs with serialization support
[POS]:    Data layer - type definitions for API communication
[UPDATE]: When API schema changes or new types added
*/

pub mod models;
pub mod requests;
pub mod responses;

pub use models::*;
pub use requests::*;
pub use responses::*;
