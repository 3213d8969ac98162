//! Normalizes GraphQL HTTP requests, including the
//! [GraphQL multipart request](https://github.com/jaydenseric/graphql-multipart-request-spec)
//! convention, before handing each operation to an [`Executor`].
//!
//! A request is one of:
//!  - a `GET` with `query`, `variables` and `operationName` search params,
//!  - a `POST` carrying a JSON operation or a JSON batch of operations,
//!  - a `POST` `multipart/form-data` body with an `operations` field, a `map`
//!    field and the file parts referenced by `map`.
//!
//! Uploaded files are placed into the operations' variables at the paths
//! declared in `map`, then every operation is executed in order and the
//! results are encoded as a single JSON object or as a JSON array matching the
//! batch.

#![warn(unreachable_pub)]

pub mod configuration;
pub mod context;
pub mod demo;
pub mod error;
mod executable;
pub mod executor;
pub mod graphql;
pub mod map_field;
mod multipart;
pub mod path;
pub mod request;
pub mod server;
pub mod service;
pub mod upload;
pub mod value;

pub use configuration::Configuration;
pub use context::RequestContext;
pub use error::MultipartRequestError;
pub use executable::main;
pub use executor::Executor;
pub use request::Operation;
pub use request::Operations;
pub use service::MultipartRequestService;
pub use upload::Upload;
pub use value::Object;
pub use value::Value;
