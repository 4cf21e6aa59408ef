//! Payment gateway webhook guard for Actix Web.
//!
//! The gateway calls the webhook without a user token, so anyone who can reach the server could try to mark orders
//! as paid. This middleware stands between the gateway and the webhook handler:
//!
//! * If an IP whitelist is configured, requests from other addresses are rejected.
//! * The raw request body is passed to a [`WebhookVerifier`]. [`HmacSha256Verifier`] compares a base64 HMAC-SHA256 of
//!   the body with the value in a signature header. [`NoVerification`] lets everything through, and is only meant for
//!   local testing.
//!
//! Rejected requests get a 403 response and never reach the handler. Accepted requests have their body restored, so
//! the handler can read it as usual.
use std::{
    future::{ready, Ready},
    net::IpAddr,
    rc::Rc,
    sync::Arc,
};

use actix_http::h1;
use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Payload, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::HeaderMap,
    web,
    Error,
};
use futures::future::LocalBoxFuture;
use log::*;
use topup_common::Secret;

use crate::{
    config::{GatewayConfig, ServerOptions},
    errors::{AuthError, ServerError},
    helpers::{get_remote_ip, verify_hmac},
};

/// Decides whether a webhook request really comes from the payment gateway.
pub trait WebhookVerifier {
    fn verify(&self, headers: &HeaderMap, body: &[u8]) -> Result<(), AuthError>;
}

pub struct HmacSha256Verifier {
    header: String,
    key: Secret<String>,
}

impl HmacSha256Verifier {
    pub fn new(header: &str, key: Secret<String>) -> Self {
        Self { header: header.to_string(), key }
    }
}

impl WebhookVerifier for HmacSha256Verifier {
    fn verify(&self, headers: &HeaderMap, body: &[u8]) -> Result<(), AuthError> {
        let signature = headers
            .get(self.header.as_str())
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AuthError::InvalidSignature(format!("No signature found in {}", self.header)))?;
        if self.key.is_empty() {
            warn!("🔐️ No webhook HMAC secret has been configured. Denying access.");
            return Err(AuthError::InvalidSignature("Webhook signatures cannot be checked".into()));
        }
        if verify_hmac(self.key.reveal(), body, signature) {
            trace!("🔐️ Webhook HMAC check ✅️");
            Ok(())
        } else {
            Err(AuthError::InvalidSignature("Signature does not match".into()))
        }
    }
}

/// Accepts every request.
pub struct NoVerification;

impl WebhookVerifier for NoVerification {
    fn verify(&self, _headers: &HeaderMap, _body: &[u8]) -> Result<(), AuthError> {
        warn!("🔐️ Webhook signature checks are disabled. Accepting request without verification.");
        Ok(())
    }
}

pub struct WebhookGuardFactory {
    verifier: Arc<dyn WebhookVerifier>,
    whitelist: Option<Vec<IpAddr>>,
    options: ServerOptions,
}

impl WebhookGuardFactory {
    pub fn new(verifier: Arc<dyn WebhookVerifier>, whitelist: Option<Vec<IpAddr>>, options: ServerOptions) -> Self {
        Self { verifier, whitelist, options }
    }

    pub fn from_config(config: &GatewayConfig, options: ServerOptions) -> Self {
        let verifier: Arc<dyn WebhookVerifier> = if config.hmac_checks {
            Arc::new(HmacSha256Verifier::new(&config.signature_header, config.hmac_secret.clone()))
        } else {
            Arc::new(NoVerification)
        };
        Self::new(verifier, config.whitelist.clone(), options)
    }
}

impl<S, B> Transform<S, ServiceRequest> for WebhookGuardFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<EitherBody<B>>;
    type Transform = WebhookGuardService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(WebhookGuardService {
            verifier: Arc::clone(&self.verifier),
            whitelist: self.whitelist.clone(),
            options: self.options,
            service: Rc::new(service),
        }))
    }
}

pub struct WebhookGuardService<S> {
    verifier: Arc<dyn WebhookVerifier>,
    whitelist: Option<Vec<IpAddr>>,
    options: ServerOptions,
    service: Rc<S>,
}

impl<S> WebhookGuardService<S> {
    fn check_peer(&self, req: &ServiceRequest) -> Result<(), AuthError> {
        let whitelist = match &self.whitelist {
            Some(w) => w,
            None => return Ok(()),
        };
        let ip = get_remote_ip(req.request(), self.options.use_x_forwarded_for, self.options.use_forwarded);
        match ip {
            Some(ip) if whitelist.contains(&ip) => {
                trace!("🔐️ Webhook call from whitelisted address {ip}");
                Ok(())
            },
            Some(ip) => {
                warn!("🔐️ Webhook call from {ip}, which is not whitelisted. Denying access.");
                Err(AuthError::ForbiddenPeer)
            },
            None => {
                warn!("🔐️ No IP address found for webhook call. Denying access.");
                Err(AuthError::ForbiddenPeer)
            },
        }
    }
}

impl<S, B> Service<ServiceRequest> for WebhookGuardService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;
    type Response = ServiceResponse<EitherBody<B>>;

    forward_ready!(service);

    fn call(&self, mut req: ServiceRequest) -> Self::Future {
        if let Err(e) = self.check_peer(&req) {
            let res = req.error_response(ServerError::from(e)).map_into_right_body();
            return Box::pin(async move { Ok(res) });
        }
        let service = Rc::clone(&self.service);
        let verifier = Arc::clone(&self.verifier);
        Box::pin(async move {
            let data = match req.extract::<web::Bytes>().await {
                Ok(data) => data,
                Err(e) => {
                    warn!("🔐️ Failed to extract webhook request body. {e}");
                    let err = ServerError::InvalidRequestBody(e.to_string());
                    return Ok(req.error_response(err).map_into_right_body());
                },
            };
            if let Err(e) = verifier.verify(req.headers(), data.as_ref()) {
                warn!("🔐️ Webhook verification failed. {e}. Denying access.");
                return Ok(req.error_response(ServerError::from(e)).map_into_right_body());
            }
            req.set_payload(bytes_to_payload(data));
            service.call(req).await.map(ServiceResponse::map_into_left_body)
        })
    }
}

fn bytes_to_payload(buf: web::Bytes) -> Payload {
    let (_, mut pl) = h1::Payload::create(true);
    pl.unread_data(buf);
    Payload::from(pl)
}
