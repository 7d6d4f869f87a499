/// Permission-gated request extraction
///
/// `Authorized<P>` runs the authorization gate for permission `P::NAME` and
/// yields the verified claims. A handler that takes it as an argument cannot
/// run unless the caller's token grants that permission.
use actix_web::{dev::Payload, web, FromRequest, HttpRequest};
use auth_gate::{AuthorizationGate, Claims};
use futures::future::LocalBoxFuture;
use std::marker::PhantomData;
use tracing::{error, warn};

use crate::error::AppError;

/// A permission string required by an operation
pub trait Permission {
    const NAME: &'static str;
}

/// `get:drinks-detail`
#[derive(Debug, Clone, Copy)]
pub struct GetDrinksDetail;

/// `post:drinks`
#[derive(Debug, Clone, Copy)]
pub struct PostDrinks;

/// `patch:drinks`
#[derive(Debug, Clone, Copy)]
pub struct PatchDrinks;

/// `delete:drinks`
#[derive(Debug, Clone, Copy)]
pub struct DeleteDrinks;

impl Permission for GetDrinksDetail {
    const NAME: &'static str = "get:drinks-detail";
}

impl Permission for PostDrinks {
    const NAME: &'static str = "post:drinks";
}

impl Permission for PatchDrinks {
    const NAME: &'static str = "patch:drinks";
}

impl Permission for DeleteDrinks {
    const NAME: &'static str = "delete:drinks";
}

/// Claims of a caller holding permission `P`
#[derive(Debug, Clone)]
pub struct Authorized<P: Permission> {
    claims: Claims,
    _permission: PhantomData<fn() -> P>,
}

impl<P: Permission> Authorized<P> {
    pub fn claims(&self) -> &Claims {
        &self.claims
    }

    pub fn into_claims(self) -> Claims {
        self.claims
    }
}

impl<P: Permission + 'static> FromRequest for Authorized<P> {
    type Error = AppError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let gate = req.app_data::<web::Data<AuthorizationGate>>().cloned();
        let headers = req.headers().clone();
        let method = req.method().clone();
        let path = req.path().to_string();

        Box::pin(async move {
            let Some(gate) = gate else {
                error!("Authorization gate is not registered as app data");
                return Err(AppError::Internal(
                    "authorization gate not configured".to_string(),
                ));
            };

            match gate.authorize(&headers, P::NAME).await {
                Ok(claims) => Ok(Authorized {
                    claims,
                    _permission: PhantomData,
                }),
                Err(e) => {
                    warn!(
                        method = %method,
                        path = %path,
                        permission = P::NAME,
                        code = e.code(),
                        error = %e,
                        "Authorization denied"
                    );
                    Err(AppError::Auth(e))
                }
            }
        })
    }
}
