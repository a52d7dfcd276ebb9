pub mod deadline;
pub mod request_id;
pub mod response;

pub use deadline::deadline_middleware;
pub use request_id::{request_id_middleware, RequestId, X_REQUEST_ID};
pub use response::{envelope_middleware, ApiError, ApiResponse, ApiResult, Envelope, ResponseHandler};
