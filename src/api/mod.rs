// Thin namespace wrapper for API-layer components
pub mod handlers {
    pub use crate::handlers::*;
}

pub mod ip_allowlist {
    pub use crate::ip_allowlist::*;
}

pub mod router {
    pub use crate::router::*;
}
