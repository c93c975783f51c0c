/// Parse and validate a TCP port given on the command line.
///
/// The value is kept as a string since it is forwarded verbatim to Electron.
///
/// # Errors
///
/// Returns an error message unless the value is a number in `1..=65535`.
pub fn parse_port(s: &str) -> Result<String, String> {
    match s.parse::<u16>() {
        Ok(0) => Err("Port must be between 1 and 65535".to_string()),
        Ok(port) => Ok(port.to_string()),
        Err(_) => Err(format!("Invalid port: '{}'", s)),
    }
}
