mod access_policy;
mod error;

#[cfg(test)]
mod tests;

pub use access_policy::AccessPolicy;
pub(crate) use access_policy::Gate;
pub use error::Error;
