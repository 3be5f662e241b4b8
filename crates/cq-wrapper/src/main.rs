use std::io::{self, Read};
use std::process::ExitCode;

use anyhow::Context;
use tracing::error;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    // Logs go to stderr; stdout carries only the JSON response.
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .init();

    let mut input = String::new();
    let response = io::stdin()
        .read_to_string(&mut input)
        .context("failed to read request from stdin")
        .and_then(|_| cq_wrapper::handle_request(&input));

    match response {
        Ok(value) => {
            println!("{value}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(error = %err, "request failed");
            println!("{}", cq_wrapper::error_response(&err));
            ExitCode::FAILURE
        }
    }
}
