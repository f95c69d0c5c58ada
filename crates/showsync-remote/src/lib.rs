pub mod cloud;
pub mod error;
pub mod http;
pub mod social;
pub mod traits;

pub use cloud::HttpCloudClient;
pub use error::RemoteError;
pub use social::HttpSocialClient;
pub use traits::{CloudService, SocialService};
