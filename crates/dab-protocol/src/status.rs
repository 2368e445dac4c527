//! DAB status codes carried in the `status` member of every response.

use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Status code of a DAB response.
///
/// The protocol reuses a small HTTP-like code space. A code outside the
/// recognized set round-trips unchanged through [`DabStatus::Other`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DabStatus {
    /// 200, request succeeded.
    Ok,
    /// 400, request invalid or malformed.
    BadRequest,
    /// 404, target (application, setting, key) not found.
    NotFound,
    /// 500, device-side internal error.
    InternalError,
    /// 501, operation recognized but not implemented on this device.
    NotImplemented,
    /// Any code outside the recognized set.
    Other(u16),
}

impl DabStatus {
    #[must_use]
    pub fn from_u16(code: u16) -> Self {
        match code {
            200 => Self::Ok,
            400 => Self::BadRequest,
            404 => Self::NotFound,
            500 => Self::InternalError,
            501 => Self::NotImplemented,
            other => Self::Other(other),
        }
    }

    #[must_use]
    pub fn as_u16(self) -> u16 {
        match self {
            Self::Ok => 200,
            Self::BadRequest => 400,
            Self::NotFound => 404,
            Self::InternalError => 500,
            Self::NotImplemented => 501,
            Self::Other(code) => code,
        }
    }

    /// `true` for the 2xx success class.
    #[must_use]
    pub fn is_success(self) -> bool {
        self.as_u16() / 100 == 2
    }

    /// `true` for the 4xx client-error class expected by negative test cases.
    #[must_use]
    pub fn is_client_error(self) -> bool {
        self.as_u16() / 100 == 4
    }

    #[must_use]
    pub fn is_not_implemented(self) -> bool {
        matches!(self, Self::NotImplemented)
    }

    #[must_use]
    pub fn is_internal_error(self) -> bool {
        matches!(self, Self::InternalError)
    }

    /// Short human description used in verdict messages.
    #[must_use]
    pub fn describe(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::BadRequest => "request invalid or malformed",
            Self::NotFound => "not found",
            Self::InternalError => "internal error",
            Self::NotImplemented => "not implemented",
            Self::Other(_) => "unrecognized status",
        }
    }
}

impl From<u16> for DabStatus {
    fn from(code: u16) -> Self {
        Self::from_u16(code)
    }
}

impl From<DabStatus> for u16 {
    fn from(status: DabStatus) -> Self {
        status.as_u16()
    }
}

impl fmt::Display for DabStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.as_u16(), self.describe())
    }
}

impl Serialize for DabStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u16(self.as_u16())
    }
}

impl<'de> Deserialize<'de> for DabStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Self::from_u16(u16::deserialize(deserializer)?))
    }
}
