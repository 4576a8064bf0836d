//! HTTP clients for the plan backend and the upload storage service.

mod error;
mod resource;
mod upload;

pub use error::ApiError;
pub use resource::{HttpResourceClient, ResourceClient};
pub use upload::{HttpUploadClient, UploadClient, UploadFile};
