//! Authentication: tokens, sessions, magic links and identity linking

pub mod cookies;
pub mod extract;
pub mod google;
pub mod jwt;
pub mod magic_link;
pub mod middleware;
pub mod password;
pub mod sessions;

pub use google::IdentityLinker;
pub use jwt::{Claims, JwtManager, TokenPair};
pub use magic_link::{LinkIntent, MagicLinkService};
pub use middleware::{require_auth, AuthUser};
pub use password::{hash_password, verify_password};
pub use sessions::SessionManager;
