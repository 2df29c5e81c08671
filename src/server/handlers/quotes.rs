use axum::extract::{Extension, Json};

use crate::api::DynAPI;
use crate::auth::User;
use crate::entities::{Quote, QuoteRequest};
use crate::error::Error;

pub async fn create(
    Extension(api): Extension<DynAPI>,
    user: User,
    Json(request): Json<QuoteRequest>,
) -> Result<Json<Quote>, Error> {
    let quote = api.create_quote(user, request).await?;

    Ok(quote.into())
}
