//! Error catalog of the console REST API.

use console_errors::ErrDef;

pub struct ErrorCode;

impl ErrorCode {
    pub const UNAUTHENTICATED: ErrDef =
        ErrDef::new(401, "Unauthorized", "CONSOLE_UNAUTHENTICATED");
    pub const INVALID_CREDENTIALS: ErrDef =
        ErrDef::new(401, "Invalid Credentials", "CONSOLE_INVALID_CREDENTIALS");
    pub const ACCESS_DENIED: ErrDef = ErrDef::new(403, "Access Denied", "CONSOLE_ACCESS_DENIED");
    pub const FORBIDDEN: ErrDef = ErrDef::new(403, "Forbidden", "CONSOLE_FORBIDDEN");
    pub const NOT_FOUND: ErrDef = ErrDef::new(404, "Not Found", "CONSOLE_NOT_FOUND");
    pub const CONFLICT: ErrDef = ErrDef::new(409, "Conflict", "CONSOLE_CONFLICT");
    pub const VALIDATION: ErrDef = ErrDef::new(422, "Validation Failed", "CONSOLE_VALIDATION");
    pub const UPSTREAM: ErrDef = ErrDef::new(502, "Bad Gateway", "CONSOLE_UPSTREAM");
    pub const UPSTREAM_TIMEOUT: ErrDef =
        ErrDef::new(504, "Gateway Timeout", "CONSOLE_UPSTREAM_TIMEOUT");
    pub const INTERNAL: ErrDef = ErrDef::new(500, "Internal Server Error", "CONSOLE_INTERNAL");
}
