//! Identity of the machine the templates are rendered for.
use crate::exec;

/// Host names exposed to templates as `hostname` and `fqdn`, and used to
/// auto-select a configuration file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostInfo {
    /// Short host name (everything before the first `.`).
    pub hostname: String,
    /// Fully-qualified domain name, or the full host name when unknown.
    pub fqdn: String,
}

impl HostInfo {
    /// Detect the current host.
    ///
    /// Asks `hostname` first, then falls back to `$HOSTNAME` and
    /// `/etc/hostname`, and finally to `localhost`.
    #[must_use]
    pub fn detect() -> Self {
        let full = command_output(&[])
            .or_else(|| std::env::var("HOSTNAME").ok().filter(|h| !h.trim().is_empty()))
            .or_else(|| {
                std::fs::read_to_string("/etc/hostname")
                    .ok()
                    .map(|h| h.trim().to_string())
                    .filter(|h| !h.is_empty())
            })
            .unwrap_or_else(|| "localhost".to_string());
        let fqdn = command_output(&["-f"]).unwrap_or_else(|| full.clone());
        Self::from_names(&full, &fqdn)
    }

    /// Create host information with explicit values.
    #[must_use]
    pub fn new(hostname: &str, fqdn: &str) -> Self {
        Self {
            hostname: hostname.to_string(),
            fqdn: fqdn.to_string(),
        }
    }

    fn from_names(full: &str, fqdn: &str) -> Self {
        let short = full.split('.').next().unwrap_or(full);
        Self::new(short, fqdn)
    }
}

fn command_output(args: &[&str]) -> Option<String> {
    exec::run("hostname", args)
        .ok()
        .map(|r| r.stdout.trim().to_string())
        .filter(|h| !h.is_empty())
}
