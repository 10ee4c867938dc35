//! Shared HTTP constants (headers, form fields, problem URIs).

pub(crate) const HEADER_REQUEST_ID: &str = "x-request-id";
pub(crate) const FILE_FIELD: &str = "file";

pub(crate) const PROBLEM_INTERNAL: &str = "https://soundry.dev/problems/internal";
pub(crate) const PROBLEM_BAD_REQUEST: &str = "https://soundry.dev/problems/bad-request";
pub(crate) const PROBLEM_NOT_FOUND: &str = "https://soundry.dev/problems/not-found";
pub(crate) const PROBLEM_SERVICE_UNAVAILABLE: &str =
    "https://soundry.dev/problems/service-unavailable";
pub(crate) const PROBLEM_PROCESSING_FAILED: &str =
    "https://soundry.dev/problems/processing-failed";
pub(crate) const PROBLEM_PAYLOAD_TOO_LARGE: &str =
    "https://soundry.dev/problems/payload-too-large";
