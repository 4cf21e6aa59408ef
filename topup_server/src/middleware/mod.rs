mod acl;
mod webhook;

pub use acl::{AclMiddlewareFactory, AclMiddlewareService};
pub use webhook::{
    HmacSha256Verifier,
    NoVerification,
    WebhookGuardFactory,
    WebhookGuardService,
    WebhookVerifier,
};
