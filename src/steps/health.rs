use std::{thread, time::Duration};

use reqwest::{blocking::Client, StatusCode};

use crate::error::ProbeError;

pub const HEALTH_PATH: &str = "/api/healthz";

/// Asks a running agent whether it is healthy.
pub trait HealthProbe: Send + Sync {
    fn probe(&self, port: u16, token: Option<&str>) -> Result<(), ProbeError>;
}

/// `GET http://localhost:<port>/api/healthz`, healthy only on 200.
pub struct HttpProbe {
    timeout: Duration,
}

impl HttpProbe {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl HealthProbe for HttpProbe {
    fn probe(&self, port: u16, token: Option<&str>) -> Result<(), ProbeError> {
        let client = Client::builder().timeout(self.timeout).build()?;
        let mut request = client.get(format!("http://localhost:{port}{HEALTH_PATH}"));
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }

        let status = request.send()?.status();
        if status == StatusCode::OK {
            Ok(())
        } else {
            Err(ProbeError::Status(status.as_u16()))
        }
    }
}

/// Fixed retry budget for a service the installer has just started.
#[derive(Debug, Clone, Copy)]
pub struct HealthPolicy {
    /// Wait before the first attempt.
    pub settle: Duration,
    pub attempts: u32,
    /// Pause between failed attempts.
    pub interval: Duration,
    /// Per-attempt request timeout.
    pub timeout: Duration,
}

impl Default for HealthPolicy {
    fn default() -> Self {
        Self {
            settle: Duration::from_secs(1),
            attempts: 3,
            interval: Duration::from_millis(500),
            timeout: Duration::from_secs(2),
        }
    }
}

/// Probes until the first success or until the attempts run out. Returns
/// the attempt that succeeded, or the last error seen.
pub fn verify(
    probe: &dyn HealthProbe,
    port: u16,
    token: Option<&str>,
    policy: &HealthPolicy,
) -> Result<u32, ProbeError> {
    thread::sleep(policy.settle);

    let mut attempt = 1;
    loop {
        match probe.probe(port, token) {
            Ok(()) => return Ok(attempt),
            Err(e) if attempt >= policy.attempts => return Err(e),
            Err(e) => {
                log::debug!("health probe attempt {attempt} failed: {e}");
                attempt += 1;
                thread::sleep(policy.interval);
            }
        }
    }
}
