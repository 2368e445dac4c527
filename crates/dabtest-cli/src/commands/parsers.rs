use dab_protocol::DabVersion;

/// Splits `host[:port]`, defaulting the port to 1883.
pub fn parse_broker(s: &str) -> Result<(String, u16), String> {
    match s.rsplit_once(':') {
        Some((host, port)) if !host.is_empty() => {
            let port: u16 = port
                .parse()
                .map_err(|_| format!("invalid broker port: {port}"))?;
            Ok((host.to_owned(), port))
        }
        Some(_) => Err(format!("invalid broker address: {s}")),
        None if s.is_empty() => Err("broker host cannot be empty".to_owned()),
        None => Ok((s.to_owned(), 1883)),
    }
}

pub fn parse_dab_version(s: &str) -> Result<DabVersion, String> {
    s.parse()
        .map_err(|_| format!("unknown DAB version: {s}. Use 2.0, 2.1 or 2.2"))
}
