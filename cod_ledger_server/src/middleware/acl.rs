//! Access control list middleware for the ledger server.
//! This middleware can be placed on any route or service inside a scope wrapped by
//! [`JwtAuthFactory`](super::JwtAuthFactory).
//!
//! It checks the claims of the authenticated caller against the roles the route requires. If the caller holds every
//! required role, the request continues. Otherwise, a 403 Forbidden response is returned.

use std::{pin::Pin, rc::Rc};

use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error,
    HttpMessage,
    HttpResponse,
};
use cod_ledger_engine::db_types::Role;
use futures::{
    future::{ok, Ready},
    Future,
};

use crate::{
    auth::JwtClaims,
    errors::{AuthError, ServerError},
};

pub struct AclMiddlewareFactory {
    required_roles: Vec<Role>,
}

impl AclMiddlewareFactory {
    pub fn new(required_roles: &[Role]) -> Self {
        AclMiddlewareFactory { required_roles: required_roles.to_vec() }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AclMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = AclMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(AclMiddlewareService { required_roles: self.required_roles.clone(), service: Rc::new(service) })
    }
}

pub struct AclMiddlewareService<S> {
    required_roles: Vec<Role>,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for AclMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let verdict = check_roles(req.extensions().get::<JwtClaims>(), &self.required_roles);
        match verdict {
            Ok(()) => {
                let service = Rc::clone(&self.service);
                Box::pin(async move { service.call(req).await.map(ServiceResponse::map_into_left_body) })
            },
            Err(e) => {
                log::debug!("💻️ Access to {} denied. {e}", req.path());
                let (request, _) = req.into_parts();
                let response = HttpResponse::from_error(ServerError::AuthenticationError(e)).map_into_right_body();
                Box::pin(async move { Ok(ServiceResponse::new(request, response)) })
            },
        }
    }
}

fn check_roles(claims: Option<&JwtClaims>, required: &[Role]) -> Result<(), AuthError> {
    let claims = claims.ok_or_else(|| {
        log::warn!("No JWT claims found in request extensions");
        AuthError::MissingToken
    })?;
    let missing = required.iter().filter(|r| !claims.has_role(**r)).map(|r| r.to_string()).collect::<Vec<_>>();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(AuthError::InsufficientPermissions(format!("Requires the {} role", missing.join(", "))))
    }
}
