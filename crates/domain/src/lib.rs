pub mod dispatch;
pub mod error;
pub mod identity;
pub mod intake;
pub mod issuance;
pub mod ports;
pub mod pro_forma;
pub mod token;
pub mod util;
pub mod worklist;

pub type DomainResult<T> = Result<T, error::DomainError>;
