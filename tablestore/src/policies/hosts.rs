//! Location detection and pinning.

use tablestore_core::location::set_netloc;
use tablestore_core::{Context, LocationHosts, PipelineError, Request, Result, SansIoPolicy};
use tracing::debug;

/// Resolves which endpoint a request targets.
///
/// The current location is detected from the URL host, defaulting to the
/// primary. A request with `use_location` set is pinned: it is redirected
/// to that endpoint and never fails over.
#[derive(Debug, Clone)]
pub struct HostsPolicy {
    hosts: LocationHosts,
}

impl HostsPolicy {
    /// Create a policy for the given endpoints.
    pub fn new(hosts: LocationHosts) -> Self {
        Self { hosts }
    }

    /// The configured endpoints.
    pub fn hosts(&self) -> &LocationHosts {
        &self.hosts
    }
}

impl SansIoPolicy for HostsPolicy {
    fn on_request(&self, request: &mut Request, ctx: &mut Context) -> Result<()> {
        ctx.location.hosts = Some(self.hosts.clone());
        let mut mode = self.hosts.detect(&request.url).unwrap_or_default();

        if let Some(target) = ctx.options.use_location {
            ctx.location.pinned = true;
            let host = self
                .hosts
                .get(target)
                .ok_or(PipelineError::UndefinedLocation(target))?;
            if target != mode {
                set_netloc(&mut request.url, host)?;
                debug!(location = %target, host, "Request pinned to location");
                mode = target;
            }
        }

        ctx.location.mode = Some(mode);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use tablestore_core::LocationMode;
    use tablestore_core::http::Url;
    use tablestore_core::{MockTransport, RequestOptions, Transport};

    fn hosts() -> LocationHosts {
        LocationHosts::new("acct.table.core", "acct-secondary.table.core").unwrap()
    }

    fn context(options: RequestOptions) -> Context {
        let transport: Arc<dyn Transport> = Arc::new(MockTransport::new());
        Context::new(options, transport)
    }

    fn request(host: &str) -> Request {
        Request::get(Url::parse(&format!("https://{host}/Tables('people')")).unwrap())
    }

    #[test]
    fn test_detects_secondary() {
        let policy = HostsPolicy::new(hosts());
        let mut ctx = context(RequestOptions::new());
        let mut request = request("acct-secondary.table.core");

        policy.on_request(&mut request, &mut ctx).unwrap();

        assert_eq!(ctx.location.mode, Some(LocationMode::Secondary));
        assert_eq!(ctx.location.hosts, Some(hosts()));
        assert!(!ctx.location.pinned);
    }

    #[test]
    fn test_unknown_host_defaults_to_primary() {
        let policy = HostsPolicy::new(hosts());
        let mut ctx = context(RequestOptions::new());
        let mut request = request("proxy.local");

        policy.on_request(&mut request, &mut ctx).unwrap();

        assert_eq!(ctx.location.mode, Some(LocationMode::Primary));
        assert_eq!(request.url.host_str(), Some("proxy.local"));
    }

    #[test]
    fn test_use_location_redirects_and_pins() {
        let policy = HostsPolicy::new(hosts());
        let mut ctx = context(RequestOptions::new().use_location(LocationMode::Secondary));
        let mut request = request("acct.table.core");

        policy.on_request(&mut request, &mut ctx).unwrap();

        assert_eq!(
            request.url.as_str(),
            "https://acct-secondary.table.core/Tables('people')"
        );
        assert_eq!(ctx.location.mode, Some(LocationMode::Secondary));
        assert!(ctx.location.pinned);
    }

    #[test]
    fn test_use_location_same_host_keeps_url() {
        let policy = HostsPolicy::new(hosts());
        let mut ctx = context(RequestOptions::new().use_location(LocationMode::Primary));
        let mut request = request("acct.table.core");

        policy.on_request(&mut request, &mut ctx).unwrap();

        assert_eq!(request.url.host_str(), Some("acct.table.core"));
        assert!(ctx.location.pinned);
    }

    #[test]
    fn test_use_undefined_location_fails() {
        let policy = HostsPolicy::new(LocationHosts::primary("acct.table.core").unwrap());
        let mut ctx = context(RequestOptions::new().use_location(LocationMode::Secondary));
        let mut request = request("acct.table.core");

        let err = policy.on_request(&mut request, &mut ctx).unwrap_err();

        assert!(matches!(
            err,
            PipelineError::UndefinedLocation(LocationMode::Secondary)
        ));
    }
}
