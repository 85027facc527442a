//! EC2 error classification
//!
//! SDK errors are mapped onto [`CloudError`] using the service error code
//! from `ProvideErrorMetadata`, never the Debug output.

use aws_sdk_ec2::error::ProvideErrorMetadata;
use hostflow_cloud::CloudError;

/// Error codes meaning the resource no longer exists
const NOT_FOUND_CODES: &[&str] = &[
    "InvalidInstanceID.NotFound",
    "InvalidInstanceID.Malformed",
    "InvalidVolume.NotFound",
    "InvalidAMIID.NotFound",
];

/// Classify an SDK error code for `resource`
pub fn classify_error_code(
    operation: &str,
    resource: &str,
    code: Option<&str>,
    message: Option<&str>,
) -> CloudError {
    match code {
        Some(c) if NOT_FOUND_CODES.contains(&c) => CloudError::NotFound(resource.to_string()),
        _ => CloudError::Api(format!(
            "EC2 {} failed for {} ({}): {}",
            operation,
            resource,
            code.unwrap_or("unknown"),
            message.unwrap_or("no message provided")
        )),
    }
}

/// Classify any SDK operation error
pub(crate) fn classify<E>(operation: &str, resource: &str, err: E) -> CloudError
where
    E: ProvideErrorMetadata + std::fmt::Display,
{
    let fallback = err.to_string();
    classify_error_code(
        operation,
        resource,
        err.code(),
        Some(err.message().unwrap_or(&fallback)),
    )
}
