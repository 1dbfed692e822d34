use actix_web::{post, web, HttpResponse};
use serde::Serialize;

use crate::{
    domain::check_request::CheckRequest,
    services::{CheckError, IndexChecker, IndexingReport, ProgressEvent, RecordedProgress},
};

#[derive(Serialize)]
struct CheckResponse {
    report: IndexingReport,
    progress: Vec<ProgressEvent>,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

#[post("/check")]
async fn check_indexing(
    checker: web::Data<IndexChecker>,
    body: web::Json<CheckRequest>,
) -> HttpResponse {
    let progress = RecordedProgress::default();

    match checker.run(body.into_inner(), &progress).await {
        Ok(report) => HttpResponse::Ok().json(CheckResponse {
            report,
            progress: progress.events(),
        }),
        Err(e @ CheckError::InvalidRequest(_)) => HttpResponse::BadRequest().json(ErrorBody {
            error: e.to_string(),
        }),
        Err(e @ CheckError::SessionUnrecoverable(_)) => {
            log::error!("Indexing check aborted: {}", e);
            HttpResponse::BadGateway().json(ErrorBody {
                error: e.to_string(),
            })
        }
    }
}
