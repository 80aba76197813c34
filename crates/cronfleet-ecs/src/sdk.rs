//! Mapping of AWS SDK failures onto [`PlatformError`].
//!
//! Only throttling, server-side faults and transport failures are worth
//! retrying. Credential, permission and validation errors come back the
//! same way on every attempt.

use aws_sdk_ecs::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use cronfleet_protocols::PlatformError;

const RETRYABLE_CODES: &[&str] = &[
    "ThrottlingException",
    "Throttling",
    "TooManyRequestsException",
    "RequestLimitExceeded",
    "ServerException",
    "ServiceUnavailableException",
    "ServiceUnavailable",
    "InternalFailure",
    "InternalServerError",
    "RequestTimeout",
    "RequestTimeoutException",
];

const NOT_FOUND_CODES: &[&str] = &["ResourceNotFoundException", "ClusterNotFoundException"];

const DENIED_CODES: &[&str] = &[
    "AccessDeniedException",
    "AccessDenied",
    "UnrecognizedClientException",
    "InvalidClientTokenId",
    "ExpiredTokenException",
    "ExpiredToken",
    "InvalidSignatureException",
    "SignatureDoesNotMatch",
    "IncompleteSignature",
    "MissingAuthenticationToken",
    "UnauthorizedOperation",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Disposition {
    Retry,
    NotFound,
    Denied,
    Invalid,
}

/// Decide from a service error's code and HTTP status.
fn disposition(code: Option<&str>, status: Option<u16>) -> Disposition {
    if let Some(code) = code {
        if RETRYABLE_CODES.contains(&code) {
            return Disposition::Retry;
        }
        if NOT_FOUND_CODES.contains(&code) {
            return Disposition::NotFound;
        }
        if DENIED_CODES.contains(&code) {
            return Disposition::Denied;
        }
    }
    match status {
        Some(429) => Disposition::Retry,
        Some(401 | 403) => Disposition::Denied,
        Some(400..=499) => Disposition::Invalid,
        _ => Disposition::Retry,
    }
}

pub(crate) fn platform_error<E>(operation: &str, err: SdkError<E>) -> PlatformError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
{
    let disposition = match &err {
        SdkError::ConstructionFailure(_) => Disposition::Invalid,
        SdkError::ServiceError(_) => disposition(
            err.code(),
            err.raw_response().map(|r| r.status().as_u16()),
        ),
        _ => Disposition::Retry,
    };
    let message = format!("{}: {}", operation, DisplayErrorContext(&err));
    match disposition {
        Disposition::Retry => PlatformError::Request(message),
        Disposition::NotFound => PlatformError::NotFound(message),
        Disposition::Denied => PlatformError::Denied(message),
        Disposition::Invalid => PlatformError::InvalidParameters(message),
    }
}
