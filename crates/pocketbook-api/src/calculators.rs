use axum::{Json, response::IntoResponse};

use pocketbook_calc::inheritance::{self, InheritanceInput};
use pocketbook_calc::ipci::{self, IpciInput};
use pocketbook_calc::pension::{self, PensionInput};

use crate::error::{ApiError, Payload};

pub async fn pension(Payload(input): Payload<PensionInput>) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(pension::project(&input)?))
}

pub async fn inheritance(
    Payload(input): Payload<InheritanceInput>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(inheritance::split(&input)?))
}

pub async fn ipci(Payload(input): Payload<IpciInput>) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(ipci::project(&input)?))
}
