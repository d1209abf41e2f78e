//! Per-call outcome descriptors supplied by transport adapters.
//!
//! A reporter is a short-lived view of one completed call: its method
//! label, status, route mapping, and remote service identity. Transport
//! adapters (HTTP clients, gRPC interceptors, …) implement the traits once
//! each; the collectors in this crate only read from them.

use crate::sampler::CallError;

/// Header name adapters use to carry the caller's service identity to the
/// callee. The core only deals in the logical value, not header mechanics.
pub const ACTIVE_SERVICE_HEADER: &str = "Active-Service";

/// Call shape, used as the `method_type` label by RPC adapters.
///
/// HTTP adapters pass the request verb as the method type instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodType {
    Unary,
    ClientStream,
    ServerStream,
    BidiStream,
}

impl MethodType {
    pub fn as_str(self) -> &'static str {
        match self {
            MethodType::Unary => "unary",
            MethodType::ClientStream => "client_stream",
            MethodType::ServerStream => "server_stream",
            MethodType::BidiStream => "bidi_stream",
        }
    }
}

impl std::fmt::Display for MethodType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one outbound (client-role) call.
pub trait ActiveReporter {
    /// Method label: the HTTP verb or the RPC method type.
    fn method(&self) -> &str;
    /// Status label, e.g. an HTTP status code or a gRPC code name.
    fn status(&self) -> &str;
    /// Route or method template, recorded as the `passive_method` label.
    fn mapping(&self) -> &str;
    /// The remote service this call targeted.
    fn passive_service(&self) -> &str;
    /// The call's error, if it failed.
    fn error(&self) -> Option<&CallError>;
}

/// Outcome of one inbound (server-role) call.
pub trait PassiveReporter {
    /// Method label: the HTTP verb or the RPC method type.
    fn method(&self) -> &str;
    /// Status label, e.g. an HTTP status code or a gRPC code name.
    fn status(&self) -> &str;
    /// Route or method template, recorded as the `passive_method` label.
    fn mapping(&self) -> &str;
    /// The caller's self-reported service identity (empty when unknown).
    fn active_service(&self) -> &str;
    /// The handler's error, if it failed.
    fn error(&self) -> Option<&CallError>;
}

/// Owned plain-data reporter for adapters and tests that already hold every
/// label value. Implements both directions; `service` is read as the
/// passive service on active calls and the active service on passive ones.
#[derive(Debug, Default)]
pub struct CallReport {
    pub method: String,
    pub status: String,
    pub mapping: String,
    pub service: String,
    pub error: Option<Box<CallError>>,
}

impl ActiveReporter for CallReport {
    fn method(&self) -> &str {
        &self.method
    }
    fn status(&self) -> &str {
        &self.status
    }
    fn mapping(&self) -> &str {
        &self.mapping
    }
    fn passive_service(&self) -> &str {
        &self.service
    }
    fn error(&self) -> Option<&CallError> {
        self.error.as_deref()
    }
}

impl PassiveReporter for CallReport {
    fn method(&self) -> &str {
        &self.method
    }
    fn status(&self) -> &str {
        &self.status
    }
    fn mapping(&self) -> &str {
        &self.mapping
    }
    fn active_service(&self) -> &str {
        &self.service
    }
    fn error(&self) -> Option<&CallError> {
        self.error.as_deref()
    }
}

/// Composition decorator that rewrites selected labels of an inner
/// reporter. Adapters use this for route-template normalization or status
/// overrides without reimplementing the whole reporter.
#[derive(Debug)]
pub struct Rewrite<R> {
    inner: R,
    status: Option<String>,
    mapping: Option<String>,
    service: Option<String>,
}

impl<R> Rewrite<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            status: None,
            mapping: None,
            service: None,
        }
    }

    /// Override the status label.
    pub fn status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    /// Override the route mapping label.
    pub fn mapping(mut self, mapping: impl Into<String>) -> Self {
        self.mapping = Some(mapping.into());
        self
    }

    /// Override the remote/caller service label.
    pub fn service(mut self, service: impl Into<String>) -> Self {
        self.service = Some(service.into());
        self
    }
}

impl<R: ActiveReporter> ActiveReporter for Rewrite<R> {
    fn method(&self) -> &str {
        self.inner.method()
    }
    fn status(&self) -> &str {
        self.status.as_deref().unwrap_or_else(|| self.inner.status())
    }
    fn mapping(&self) -> &str {
        self.mapping
            .as_deref()
            .unwrap_or_else(|| self.inner.mapping())
    }
    fn passive_service(&self) -> &str {
        self.service
            .as_deref()
            .unwrap_or_else(|| self.inner.passive_service())
    }
    fn error(&self) -> Option<&CallError> {
        self.inner.error()
    }
}

impl<R: PassiveReporter> PassiveReporter for Rewrite<R> {
    fn method(&self) -> &str {
        self.inner.method()
    }
    fn status(&self) -> &str {
        self.status.as_deref().unwrap_or_else(|| self.inner.status())
    }
    fn mapping(&self) -> &str {
        self.mapping
            .as_deref()
            .unwrap_or_else(|| self.inner.mapping())
    }
    fn active_service(&self) -> &str {
        self.service
            .as_deref()
            .unwrap_or_else(|| self.inner.active_service())
    }
    fn error(&self) -> Option<&CallError> {
        self.inner.error()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report() -> CallReport {
        CallReport {
            method: "GET".into(),
            status: "200".into(),
            mapping: "/orders/{id}".into(),
            service: "orders".into(),
            error: None,
        }
    }

    #[test]
    fn call_report_serves_both_directions() {
        let r = report();
        assert_eq!(ActiveReporter::method(&r), "GET");
        assert_eq!(r.passive_service(), "orders");
        assert_eq!(PassiveReporter::active_service(&r), "orders");
        assert!(ActiveReporter::error(&r).is_none());
    }

    #[test]
    fn rewrite_overrides_only_what_was_set() {
        let r = Rewrite::new(report()).status("500").mapping("/orders/:id");
        assert_eq!(ActiveReporter::status(&r), "500");
        assert_eq!(ActiveReporter::mapping(&r), "/orders/:id");
        // Untouched labels pass through.
        assert_eq!(ActiveReporter::method(&r), "GET");
        assert_eq!(r.passive_service(), "orders");
    }

    #[test]
    fn rewrite_service_applies_to_passive_direction() {
        let r = Rewrite::new(report()).service("gateway");
        assert_eq!(PassiveReporter::active_service(&r), "gateway");
    }

    #[test]
    fn method_type_labels() {
        assert_eq!(MethodType::Unary.as_str(), "unary");
        assert_eq!(MethodType::BidiStream.to_string(), "bidi_stream");
    }
}
