//! JSON decoding without serde_json's nesting limit.
//!
//! Input documents and handler results may nest arbitrarily deep. The
//! recursion limit is lifted and the stack grows on demand while descending.

use serde::de::{Deserialize, DeserializeOwned};

/// Parse JSON text of any nesting depth
pub fn from_str_unbounded<T: DeserializeOwned>(text: &str) -> serde_json::Result<T> {
    let mut deserializer = serde_json::Deserializer::from_str(text);
    deserializer.disable_recursion_limit();
    let value = T::deserialize(serde_stacker::Deserializer::new(&mut deserializer))?;
    deserializer.end()?;
    Ok(value)
}
