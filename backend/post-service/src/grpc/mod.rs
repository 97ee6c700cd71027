//! gRPC surface of post-service
//!
//! - `server`: `PostService` implementation and server startup
//! - `convert`: record to protobuf message conversions

pub mod convert;
pub mod server;

// Import generated proto code
pub mod nova {
    pub mod post_service {
        pub mod v1 {
            tonic::include_proto!("nova.post_service.v1");
        }
        pub use v1::*;
    }
}

pub use server::{start_grpc_server, PostServiceImpl};
