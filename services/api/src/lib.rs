mod cli;
mod demo;
mod infra;
mod registry_http;
mod routes;
mod server;

use trial_curation::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
