//! Access control list middleware for the top-up server.
//! This middleware can be placed on any route or service.
//!
//! It reads the bearer token from the `Authorization` header, validates it with the [`TokenValidator`] registered as
//! app data, and then checks the role in the token against the roles allowed on the route. If the token is valid and
//! the role is allowed, the claims are stored in the request extensions and the request continues. Otherwise an error
//! response is returned straight away:
//! * no token: 401 Unauthorized
//! * malformed, badly signed or expired token: 403 Forbidden
//! * a role that is not allowed on this route: 403 Forbidden
use std::rc::Rc;

use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::AUTHORIZATION,
    web,
    Error,
    HttpMessage,
};
use futures::future::{ok, LocalBoxFuture, Ready};
use log::*;
use topup_engine::db_types::Role;

use crate::{
    auth::{bearer_token, JwtClaims, TokenValidator},
    errors::{AuthError, ServerError},
};

pub struct AclMiddlewareFactory {
    allowed_roles: Vec<Role>,
}

impl AclMiddlewareFactory {
    /// The request is let through if the caller has any one of `allowed_roles`.
    pub fn new(allowed_roles: &[Role]) -> Self {
        AclMiddlewareFactory { allowed_roles: allowed_roles.to_vec() }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AclMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<EitherBody<B>>;
    type Transform = AclMiddlewareService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(AclMiddlewareService { allowed_roles: self.allowed_roles.clone(), service: Rc::new(service) })
    }
}

pub struct AclMiddlewareService<S> {
    allowed_roles: Vec<Role>,
    service: Rc<S>,
}

impl<S> AclMiddlewareService<S> {
    fn authorize(&self, req: &ServiceRequest) -> Result<JwtClaims, ServerError> {
        let header = req.headers().get(AUTHORIZATION).ok_or(AuthError::MissingToken)?;
        let token = header.to_str().ok().and_then(bearer_token).ok_or(AuthError::MissingToken)?;
        let validator = req.app_data::<web::Data<TokenValidator>>().ok_or_else(|| {
            error!("🔐️ No token validator has been configured for this app");
            ServerError::Unspecified("No token validator configured".into())
        })?;
        let claims = validator.validate(token)?;
        if self.allowed_roles.contains(&claims.role) {
            Ok(claims)
        } else {
            let msg = match self.allowed_roles.as_slice() {
                [Role::Admin] => "Admin access required",
                [Role::Customer] => "Customer access required",
                _ => "Insufficient permissions",
            };
            Err(AuthError::InsufficientPermissions(msg.into()).into())
        }
    }
}

impl<S, B> Service<ServiceRequest> for AclMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;
    type Response = ServiceResponse<EitherBody<B>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        match self.authorize(&req) {
            Ok(claims) => {
                trace!("🔐️ User #{} ({}) is allowed on {}", claims.user_id, claims.role, req.path());
                req.extensions_mut().insert(claims);
                let service = Rc::clone(&self.service);
                Box::pin(async move { service.call(req).await.map(ServiceResponse::map_into_left_body) })
            },
            Err(e) => {
                debug!("🔐️ Request to {} denied. {e}", req.path());
                let res = req.error_response(e).map_into_right_body();
                Box::pin(async move { Ok(res) })
            },
        }
    }
}
