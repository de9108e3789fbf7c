use crate::{entry::ConfigEntry, flow::FlowResult};
use actix_web::HttpResponse;
use anyhow::Result;
use log::error;
use serde::Serialize;

/// Trait for converting service results into HTTP responses
pub trait ServiceResultResponse {
    fn into_response(self) -> HttpResponse;
}

impl ServiceResultResponse for () {
    fn into_response(self) -> HttpResponse {
        HttpResponse::Ok().finish()
    }
}

impl<T: Serialize> ServiceResultResponse for FlowResult<T> {
    fn into_response(self) -> HttpResponse {
        json_response(&self, "flow result")
    }
}

impl ServiceResultResponse for Vec<ConfigEntry> {
    fn into_response(self) -> HttpResponse {
        json_response(&self, "config entries")
    }
}

fn json_response(value: &impl Serialize, what: &str) -> HttpResponse {
    match serde_json::to_string(value) {
        Ok(json) => HttpResponse::Ok()
            .content_type("application/json")
            .body(json),
        Err(e) => {
            error!("failed to serialize {what}: {e:#}");
            HttpResponse::InternalServerError().body("failed to serialize response")
        }
    }
}

/// Handle Result and convert its data into a Response
///
/// Successful data is rendered via [`ServiceResultResponse`], errors are
/// logged and answered with an internal server error.
///
/// # Arguments
/// * `result` - The Result to handle
/// * `operation` - Context message describing the operation
pub fn handle_service_result<T>(result: Result<T>, operation: &str) -> HttpResponse
where
    T: ServiceResultResponse,
{
    match result {
        Ok(data) => data.into_response(),
        Err(e) => {
            error!("{operation} failed: {e:#}");
            HttpResponse::InternalServerError().body(e.to_string())
        }
    }
}
