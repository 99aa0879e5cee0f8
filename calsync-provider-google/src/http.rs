//! Mapping of HTTP failures onto the engine's error taxonomy.

use calsync_core::CalSyncError;
use reqwest::{Response, StatusCode};
use serde::Deserialize;

/// Error body shared by the OAuth endpoint and the Calendar API.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorBody {
    OAuth {
        error: String,
        #[serde(default)]
        error_description: Option<String>,
    },
    Api {
        error: ApiError,
    },
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    message: String,
}

pub(crate) fn transport_error(context: &str, err: reqwest::Error) -> CalSyncError {
    CalSyncError::RemoteUnavailable(format!("{}: {}", context, err))
}

/// Turn a non-success response into an error. 400/401/403 are refusals
/// that retrying will not fix; everything else is treated as transient.
pub(crate) async fn error_for_response(context: &str, response: Response) -> CalSyncError {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();

    let detail = match serde_json::from_str::<ErrorBody>(&text) {
        Ok(ErrorBody::OAuth {
            error,
            error_description,
        }) => match error_description {
            Some(description) => format!("{} ({})", error, description),
            None => error,
        },
        Ok(ErrorBody::Api { error }) => error.message,
        Err(_) => text,
    };
    let message = format!("{}: {} {}", context, status.as_u16(), detail.trim());

    match status {
        StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            CalSyncError::AuthRejected(message)
        }
        _ => CalSyncError::RemoteUnavailable(message),
    }
}
