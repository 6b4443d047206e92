// src/middleware/auth.rs
//
// Bearer-token user-id extraction (§4.4's external collaborator note, §6):
// the core trusts whatever issued the JWT and only needs the subject claim
// to scope Persistence Gateway reads/writes by `user_id`. Full session
// management (issuing tokens, refresh, revocation) is an external
// collaborator's concern; this middleware only validates and extracts.

use actix_web::{
    dev::{Service, ServiceRequest, ServiceResponse, Transform},
    Error, HttpMessage,
};
use futures_util::future::{ok, LocalBoxFuture, Ready};
use futures_util::FutureExt;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
struct UserClaims {
    sub: Uuid,
}

/// The authenticated caller's user id, inserted into request extensions by
/// this middleware; route handlers pull it via `req.extensions()`.
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedUser(pub Uuid);

pub struct Auth {
    pub jwt_secret: String,
}

impl<S> Transform<S, ServiceRequest> for Auth
where
    S: Service<ServiceRequest, Response = ServiceResponse, Error = Error> + 'static,
{
    type Response = ServiceResponse;
    type Error = Error;
    type InitError = ();
    type Transform = AuthMw<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, srv: S) -> Self::Future {
        ok(AuthMw {
            inner: srv,
            jwt_secret: self.jwt_secret.clone(),
        })
    }
}

pub struct AuthMw<S> {
    inner: S,
    jwt_secret: String,
}

impl<S> Service<ServiceRequest> for AuthMw<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse, Error = Error> + 'static,
{
    type Response = ServiceResponse;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(
        &self,
        ctx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(ctx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let token = req
            .headers()
            .get("Authorization")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.strip_prefix("Bearer "))
            .map(str::to_owned);

        let secret = self.jwt_secret.clone();

        let claims = token.as_deref().and_then(|tok| {
            decode::<UserClaims>(
                tok,
                &DecodingKey::from_secret(secret.as_bytes()),
                &Validation::new(Algorithm::HS256),
            )
            .ok()
        });

        match claims {
            Some(data) => {
                req.extensions_mut().insert(AuthenticatedUser(data.claims.sub));
                let fut = self.inner.call(req);
                async move { fut.await }.boxed_local()
            }
            None => {
                async move { Err(actix_web::error::ErrorUnauthorized("auth failed")) }.boxed_local()
            }
        }
    }
}
