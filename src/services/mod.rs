//! Services layer - Business logic
//!
//! Services own every rule of the moderation workflow:
//! - Authorization (`policy`) and identity resolution (`identity`)
//! - The content lifecycle (`moderation`) over the kind-routed `registry`
//! - Markup cleaning (`sanitizer`) and the admin `explorer`

pub mod error;
pub mod explorer;
pub mod identity;
pub mod moderation;
pub mod password;
pub mod policy;
pub mod registry;
pub mod sanitizer;

pub use error::{ServiceError, ServiceResult};
pub use explorer::{ExplorerPage, ExplorerService, TableSpec, REDACTED};
pub use identity::{IdentityService, LoginInput, LoginResult};
pub use moderation::{ModerationService, ReviewAction, TransitionOutcome};
pub use password::{hash_password, verify_password};
pub use policy::Action;
pub use registry::{page_params, ContentRegistry};
pub use sanitizer::sanitize;
