// Domain-layer modules and shared errors
pub mod payment_status {
    pub use crate::payment_status::*;
}

pub mod report {
    pub use crate::report::*;
}

pub mod errors {
    pub use crate::errors::*;
}
