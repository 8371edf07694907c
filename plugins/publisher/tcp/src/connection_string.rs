use replay_api::PublishError;

/// Parsed `Key=Value;Key=Value` connection string.
///
/// Keys are case-insensitive. `Endpoint=tcp://host:port` is required;
/// `SharedAccessKeyName` / `SharedAccessKey` are optional; unknown keys are
/// ignored so strings copied from other tooling still work.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionString {
    /// `host:port`, without scheme.
    pub addr: String,
    pub key_name: Option<String>,
    pub key: Option<String>,
}

impl ConnectionString {
    pub fn parse(s: &str) -> Result<Self, PublishError> {
        let mut endpoint = None;
        let mut key_name = None;
        let mut key = None;

        for part in s.split(';').map(str::trim).filter(|p| !p.is_empty()) {
            let (k, v) = part
                .split_once('=')
                .ok_or_else(|| PublishError::config(format!("connection string: expected Key=Value, got '{part}'")))?;
            let v = v.trim().to_string();
            match k.trim().to_ascii_lowercase().as_str() {
                "endpoint" => endpoint = Some(v),
                "sharedaccesskeyname" => key_name = Some(v),
                "sharedaccesskey" => key = Some(v),
                _ => {}
            }
        }

        let endpoint = endpoint.ok_or_else(|| PublishError::config("connection string: missing Endpoint"))?;
        let addr = parse_endpoint(&endpoint)?;

        Ok(Self { addr, key_name, key })
    }
}

impl std::fmt::Debug for ConnectionString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionString")
            .field("addr", &self.addr)
            .field("key_name", &self.key_name)
            .field("key", &self.key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

fn parse_endpoint(endpoint: &str) -> Result<String, PublishError> {
    let rest = match endpoint.split_once("://") {
        Some((scheme, rest)) if scheme.eq_ignore_ascii_case("tcp") => rest,
        Some((scheme, _)) => {
            return Err(PublishError::config(format!("connection string: unsupported scheme '{scheme}'")));
        }
        None => endpoint,
    };
    let addr = rest.trim_end_matches('/');

    match addr.rsplit_once(':') {
        Some((host, port)) if !host.is_empty() && port.parse::<u16>().is_ok() => Ok(addr.to_string()),
        _ => Err(PublishError::config(format!("connection string: endpoint '{endpoint}' must be host:port"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use replay_api::ErrorKind;

    #[test]
    fn parses_full_string() {
        let cs = ConnectionString::parse(
            "Endpoint=tcp://ingest.local:5672/;SharedAccessKeyName=send;SharedAccessKey=s3cr=t",
        )
        .unwrap();
        assert_eq!(cs.addr, "ingest.local:5672");
        assert_eq!(cs.key_name.as_deref(), Some("send"));
        // only the first '=' separates key from value
        assert_eq!(cs.key.as_deref(), Some("s3cr=t"));
    }

    #[test]
    fn keys_are_case_insensitive_and_unknown_ignored() {
        let cs = ConnectionString::parse("endpoint=127.0.0.1:9000; EntityPath=events;").unwrap();
        assert_eq!(cs.addr, "127.0.0.1:9000");
        assert_eq!(cs.key, None);
    }

    #[test]
    fn rejects_bad_strings() {
        for s in [
            "",
            "SharedAccessKey=x",
            "Endpoint=sb://hub.example.net/",
            "Endpoint=tcp://hostonly",
            "Endpoint=tcp://host:notaport",
            "garbage",
        ] {
            let err = ConnectionString::parse(s).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Config, "{s}");
        }
    }

    #[test]
    fn debug_hides_key() {
        let cs = ConnectionString::parse("Endpoint=tcp://h:1;SharedAccessKey=topsecret").unwrap();
        assert!(!format!("{cs:?}").contains("topsecret"));
    }
}
