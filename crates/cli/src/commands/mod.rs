//! Subcommand implementations.

pub mod admin;
pub mod fees;
pub mod migrate;
pub mod reports;

/// Write a value to stdout as pretty JSON.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn print_json<T: serde::Serialize>(value: &T) -> Result<(), serde_json::Error> {
    let out = serde_json::to_string_pretty(value)?;
    #[allow(clippy::print_stdout)]
    {
        println!("{out}");
    }
    Ok(())
}
