use serde_json::Value;
use std::io::{self, Read};

/// Read piped JSON from stdin. Interactive terminals and empty pipes
/// get None so commands can fall back to flags or `--input`.
pub fn read_stdin() -> Result<Option<Value>, Box<dyn std::error::Error>> {
    if atty::is(atty::Stream::Stdin) {
        return Ok(None);
    }

    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer)?;

    if buffer.trim().is_empty() {
        return Ok(None);
    }

    let value: Value =
        serde_json::from_str(buffer.trim()).map_err(|e| format!("Invalid JSON on stdin: {e}"))?;
    Ok(Some(value))
}
