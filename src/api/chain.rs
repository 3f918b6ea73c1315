use actix_web::http::StatusCode;
use actix_web::http::header::ContentType;
use actix_web::{HttpResponse, Responder, get, post, web};
use log::{error, warn};
use serde::Serialize;

use super::models::{
    ErrorResponse, RejectedResponse, ReplaceResponse, ValidateResponse, WriteRequest,
};
use crate::blockchain::{Block, validate_chain as check_chain};
use crate::error::SubmitError;
use crate::state::{AppState, Submission};

/// Pretty JSON with `status`, or a bare 500 if serialization fails.
fn respond_with_json<T: Serialize + ?Sized>(status: StatusCode, payload: &T) -> HttpResponse {
    match serde_json::to_string_pretty(payload) {
        Ok(body) => HttpResponse::build(status)
            .content_type(ContentType::json())
            .body(body),
        Err(e) => {
            error!("failed to serialize response: {e}");
            internal_error()
        }
    }
}

fn internal_error() -> HttpResponse {
    HttpResponse::InternalServerError().body("HTTP 500: Internal Server Error")
}

/// Get the full blockchain.
#[get("/")]
pub async fn get_chain(state: web::Data<AppState>) -> impl Responder {
    let chain = state.store.snapshot();
    respond_with_json(StatusCode::OK, &chain)
}

/// Build, validate and append a block for the posted measurement.
/// Body: `{"BPM": <int>}`.
#[post("/")]
pub async fn write_block(state: web::Data<AppState>, body: web::Bytes) -> impl Responder {
    let req: WriteRequest = match serde_json::from_slice(&body) {
        Ok(req) => req,
        Err(e) => {
            warn!("malformed write request: {e}");
            return HttpResponse::BadRequest()
                .content_type(ContentType::plaintext())
                .body(body);
        }
    };
    respond_to_submission(state.submit(req.measurement).await)
}

fn respond_to_submission(result: Result<Submission, SubmitError>) -> HttpResponse {
    match result {
        Ok(Submission::Accepted(block)) => respond_with_json(StatusCode::CREATED, &block),
        Ok(Submission::Rejected { candidate, reason }) => respond_with_json(
            StatusCode::CONFLICT,
            &RejectedResponse {
                error: reason.to_string(),
                block: &candidate,
            },
        ),
        Err(e) => {
            error!("block submission failed: {e}");
            internal_error()
        }
    }
}

/// Validate the whole chain.
#[get("/validate/")]
pub async fn validate_chain(state: web::Data<AppState>) -> impl Responder {
    let chain = state.store.snapshot();
    let difficulty = state.store.difficulty();
    let result = check_chain(&chain, difficulty);
    respond_with_json(
        StatusCode::OK,
        &ValidateResponse {
            valid: result.is_ok(),
            length: chain.len(),
            difficulty,
            reason: result.err().map(|e| e.to_string()),
        },
    )
}

/// Offer a competing chain: adopted only if it is internally valid at our
/// difficulty and strictly longer than ours.
#[post("/chain/")]
pub async fn replace_chain(state: web::Data<AppState>, body: web::Bytes) -> impl Responder {
    let candidate: Vec<Block> = match serde_json::from_slice(&body) {
        Ok(chain) => chain,
        Err(e) => {
            warn!("malformed replacement chain: {e}");
            return HttpResponse::BadRequest()
                .content_type(ContentType::plaintext())
                .body(body);
        }
    };
    if let Err(e) = check_chain(&candidate, state.store.difficulty()) {
        warn!("refusing invalid replacement chain: {e}");
        return respond_with_json(
            StatusCode::UNPROCESSABLE_ENTITY,
            &ErrorResponse {
                error: e.to_string(),
            },
        );
    }
    let replaced = state.replace(candidate);
    respond_with_json(
        StatusCode::OK,
        &ReplaceResponse {
            replaced,
            length: state.store.len(),
        },
    )
}
