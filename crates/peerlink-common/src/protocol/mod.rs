pub mod error;
pub mod requests;
pub mod responses;


pub use error::{PeerlinkError, Result};
pub use requests::{MethodName, Request, RequestId, RpcArgs};
pub use responses::{Response, RpcResult};
