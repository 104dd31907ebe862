//! Terminal output.

#![allow(clippy::print_stdout)]

use serde::Serialize;

use super::CliError;

pub fn line(text: &str) {
    println!("{text}");
}

/// Pretty-printed JSON.
pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<(), CliError> {
    let text = serde_json::to_string_pretty(value).map_err(|e| CliError::Output(e.to_string()))?;
    println!("{text}");
    Ok(())
}
