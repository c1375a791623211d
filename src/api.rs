//! HTTP surface for login travel checks
//!
//! One route, no logic: deserialize the login attempt, run the pipeline,
//! serialize the travel response.

use actix_web::{web, HttpResponse};

use crate::detection::TravelAnomalyBuilder;
use crate::models::LoginAttempt;

const JSON_CONTENT_TYPE: &str = "application/json; charset=UTF-8";

/// Register the login-check route.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/loginRequest").route(web::post().to(login_request)));
}

async fn login_request(
    builder: web::Data<TravelAnomalyBuilder>,
    request: web::Json<LoginAttempt>,
) -> HttpResponse {
    let request = request.into_inner();

    match builder.build(&request) {
        Ok(response) => match serde_json::to_string(&response) {
            Ok(body) => HttpResponse::Ok()
                .content_type(JSON_CONTENT_TYPE)
                .body(body),
            Err(e) => {
                log::error!("Failed to serialize travel response: {}", e);
                HttpResponse::InternalServerError().finish()
            }
        },
        Err(e) => {
            log::error!("Travel check failed for '{}': {}", request.username, e);
            HttpResponse::InternalServerError().finish()
        }
    }
}
