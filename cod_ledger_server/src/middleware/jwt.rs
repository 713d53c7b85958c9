//! Bearer-token middleware.
//!
//! Wrap a scope with [`JwtAuthFactory`] and every request under it must carry `Authorization: Bearer <jwt>`. Valid
//! claims are stored in the request extensions, where the [`JwtClaims`] extractor and the ACL middleware find them.
//! Anything else is answered with a 401 and never reaches the handler.
use std::{pin::Pin, rc::Rc};

use actix_http::header::AUTHORIZATION;
use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error,
    HttpMessage,
    HttpResponse,
};
use futures::{
    future::{ok, Ready},
    Future,
};
use log::*;

use crate::{
    auth::{JwtClaims, TokenValidator},
    errors::{AuthError, ServerError},
};

pub struct JwtAuthFactory {
    validator: TokenValidator,
}

impl JwtAuthFactory {
    pub fn new(validator: TokenValidator) -> Self {
        Self { validator }
    }
}

impl<S, B> Transform<S, ServiceRequest> for JwtAuthFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = JwtAuthService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(JwtAuthService { validator: Rc::new(self.validator.clone()), service: Rc::new(service) })
    }
}

pub struct JwtAuthService<S> {
    validator: Rc<TokenValidator>,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for JwtAuthService<S>
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
        match bearer_claims(&req, &self.validator) {
            Ok(claims) => {
                trace!("💻️ Request to {} authenticated as {}", req.path(), claims.sub);
                req.extensions_mut().insert(claims);
                let service = Rc::clone(&self.service);
                Box::pin(async move { service.call(req).await.map(ServiceResponse::map_into_left_body) })
            },
            Err(e) => {
                debug!("💻️ Rejecting request to {}. {e}", req.path());
                let (request, _) = req.into_parts();
                let response = HttpResponse::from_error(ServerError::AuthenticationError(e)).map_into_right_body();
                Box::pin(async move { Ok(ServiceResponse::new(request, response)) })
            },
        }
    }
}

fn bearer_claims(req: &ServiceRequest, validator: &TokenValidator) -> Result<JwtClaims, AuthError> {
    let header = req.headers().get(AUTHORIZATION).ok_or(AuthError::MissingToken)?;
    let value = header.to_str().map_err(|e| AuthError::PoorlyFormattedToken(e.to_string()))?;
    let token = value
        .strip_prefix("Bearer ")
        .ok_or_else(|| AuthError::PoorlyFormattedToken("Expected a Bearer token".to_string()))?;
    validator.validate(token.trim())
}
