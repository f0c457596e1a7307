//! JSON decoding for persisted trees.
//!
//! Trees may nest to any depth, so the reader drops serde_json's recursion
//! limit and grows the stack on demand instead.

use serde::de::DeserializeOwned;

pub fn from_json<T: DeserializeOwned>(json: &str) -> serde_json::Result<T> {
    let mut deserializer = serde_json::Deserializer::from_str(json);
    deserializer.disable_recursion_limit();
    let value = {
        let stacked = serde_stacker::Deserializer::new(&mut deserializer);
        T::deserialize(stacked)?
    };
    deserializer.end()?;
    Ok(value)
}
