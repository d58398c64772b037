//! HTTP handlers. Every success body carries `"success": true`.

pub mod configs;
pub mod email_routing;
pub mod zones;

#[cfg(test)]
pub(crate) mod test_support;
