//! Request dispatch shared by every transport.
//!
//! A transport hands over the service name, the method name and the raw
//! JSON parameter text. The dispatcher looks up the service, decodes the
//! parameters against the candidate overloads, calls the broker and returns
//! the response. Framing the response is left to the transport.

use ormi_common::protocol::error::{RemotingError, Result};
use ormi_common::protocol::{ParamType, Value};
use ormi_common::transport::LineCodec;
use ormi_common::JsonMarshaller;
use std::sync::Arc;

use crate::broker::{Broker, InvocationRequest, InvocationResponse};
use crate::registry::ServiceRegistry;
use crate::resolver;

#[derive(Debug)]
pub struct Dispatcher {
    registry: Arc<ServiceRegistry>,
    broker: Arc<Broker>,
    marshaller: JsonMarshaller,
}

impl Dispatcher {
    /// Creates a dispatcher resolving services in `registry` and running
    /// them on `broker`.
    pub fn new(registry: Arc<ServiceRegistry>, broker: Arc<Broker>) -> Self {
        Self {
            registry,
            broker,
            marshaller: JsonMarshaller::new(),
        }
    }

    pub fn marshaller(&self) -> &JsonMarshaller {
        &self.marshaller
    }

    /// Builds the invocation request for a raw call.
    ///
    /// With a single overload of the requested arity the parameters are
    /// decoded strictly against its types and any conversion failure is a
    /// marshalling error. With several, the payload is decoded against each
    /// of them and a decoding is kept only when the resolver maps it back to
    /// the overload it was decoded for. Among the kept decodings the one
    /// closest to the payload's natural JSON types wins; a tie is
    /// `AmbiguousMethod`.
    ///
    /// # Errors
    ///
    /// `NotFound`, `MethodNotFound`, `Marshalling` or `AmbiguousMethod`.
    pub fn prepare(&self, service: &str, method: &str, params: &str) -> Result<InvocationRequest> {
        let service = self.registry.lookup(service)?;
        let raw = self.marshaller.parse_parameters(params)?;
        let candidates = resolver::decoding_candidates(&service, method, raw.len())?;

        let args = match candidates.as_slice() {
            [single] => self.marshaller.convert_parameters(&raw, single.params())?,
            several => {
                let natural = self
                    .marshaller
                    .convert_parameters(&raw, &vec![ParamType::Any; raw.len()])?;

                let mut first_error = None;
                let mut decoded: Vec<Vec<Value>> = Vec::new();
                for candidate in several {
                    let args = match self.marshaller.convert_parameters(&raw, candidate.params()) {
                        Ok(args) => args,
                        Err(e) => {
                            first_error.get_or_insert(e);
                            continue;
                        }
                    };
                    match resolver::resolve(&service, method, &args) {
                        Ok(resolved) if Arc::ptr_eq(&resolved, candidate) => decoded.push(args),
                        Ok(_) => {}
                        Err(e) => {
                            // Resolution errors say more than a failed decoding
                            if !matches!(first_error, Some(RemotingError::AmbiguousMethod(_))) {
                                first_error = Some(e);
                            }
                        }
                    }
                }

                pick_closest(decoded, &natural).map_err(|ambiguous| {
                    if ambiguous {
                        RemotingError::AmbiguousMethod(format!(
                            "{} parameters {} match several overloads on service {}",
                            method,
                            params.trim(),
                            service.id()
                        ))
                    } else {
                        first_error.unwrap_or_else(|| {
                            RemotingError::marshalling(format!("Cannot decode parameters of {}", method))
                        })
                    }
                })?
            }
        };

        Ok(InvocationRequest::new(service, method, args))
    }

    /// Dispatches a raw call to the broker.
    ///
    /// # Arguments
    /// * `service` - registered service name
    /// * `method` - method name, overloads resolved from `params`
    /// * `params` - JSON array text, empty for a zero-argument call
    ///
    /// # Returns
    /// The broker's response, or an `Error` response if the call could not
    /// be prepared.
    pub async fn dispatch(&self, service: &str, method: &str, params: &str) -> InvocationResponse {
        tracing::debug!("Dispatching {}#{}", service, method);
        match self.prepare(service, method, params) {
            Ok(request) => self.broker.invoke(request).await,
            Err(e) => {
                tracing::debug!("Rejected {}#{}: {}", service, method, e);
                InvocationResponse::Error(e)
            }
        }
    }

    /// Dispatches and encodes the result as JSON text.
    pub async fn dispatch_json(&self, service: &str, method: &str, params: &str) -> Result<String> {
        let value: Value = self.dispatch(service, method, params).await.into_result()?;
        self.marshaller.encode(&value)
    }

    /// Handles one `service|method|params` line and returns the reply line.
    ///
    /// # Example
    ///
    /// ```
    /// use ormi_server::{MiddlewareConfig, Platform};
    ///
    /// #[tokio::main]
    /// async fn main() {
    ///     let platform = Platform::new(MiddlewareConfig::default());
    ///     let reply = platform.dispatcher().dispatch_line("Nope|add|[1,2]").await;
    ///     assert!(reply.starts_with("ERROR: "));
    /// }
    /// ```
    pub async fn dispatch_line(&self, line: &str) -> String {
        let request = match LineCodec::decode_request(line) {
            Ok(request) => request,
            Err(e) => return LineCodec::encode_error(&e.to_string()),
        };

        match self
            .dispatch_json(&request.service, &request.method, &request.params)
            .await
        {
            Ok(json) => LineCodec::encode_success(&json),
            Err(e) => LineCodec::encode_error(&e.to_string()),
        }
    }
}

/// Picks the decoding whose kinds agree most with `natural`.
///
/// `Err(true)` on a tie, `Err(false)` when there is nothing to pick.
fn pick_closest(decoded: Vec<Vec<Value>>, natural: &[Value]) -> std::result::Result<Vec<Value>, bool> {
    let score = |args: &[Value]| args.iter().zip(natural).filter(|(a, n)| a.kind() == n.kind()).count();

    let best = decoded.iter().map(|args| score(args)).max().ok_or(false)?;
    let mut winners = decoded.into_iter().filter(|args| score(args) == best);
    match (winners.next(), winners.next()) {
        (Some(winner), None) => Ok(winner),
        _ => Err(true),
    }
}
