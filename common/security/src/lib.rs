pub mod context;
pub mod error;
pub mod layer;
pub mod policy;
pub mod roles;
mod test_macros;

pub use context::{SecurityContext, SecurityCtxExtractor};
pub use error::SecurityError;
pub use layer::{enforce, Authenticator, SecurityGate};
pub use policy::{
    Access, AuthorizationPolicy, AuthorizationRule, PathPattern, PolicyBuilder, PolicyError,
};
pub use roles::{ensure_role, ensure_any_role, Role};
