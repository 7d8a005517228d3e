//! The SIP method / response-code sum type.
//!
//! Method constants and numeric response codes live in the same integer
//! space in raw SIP, which only works because the two ranges never
//! overlap by convention. [`ReqResp`] removes that accidental-overlap risk
//! by making the two cases explicit variants of a tagged union; the
//! transition table in `state.rs` matches on it directly instead of
//! comparing against a flat integer.

use bytesstr::BytesStr;
use std::fmt;

/// A SIP request method.
///
/// Follows the same representation idiom as `sip_types::Method`: well-known
/// methods are unit variants, anything else is captured verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Method {
    Invite,
    Ack,
    Bye,
    Cancel,
    Register,
    Options,
    Info,
    Update,
    Prack,
    Subscribe,
    Notify,
    Refer,
    Message,
    Publish,
    Other(BytesStr),
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Invite => f.write_str("INVITE"),
            Method::Ack => f.write_str("ACK"),
            Method::Bye => f.write_str("BYE"),
            Method::Cancel => f.write_str("CANCEL"),
            Method::Register => f.write_str("REGISTER"),
            Method::Options => f.write_str("OPTIONS"),
            Method::Info => f.write_str("INFO"),
            Method::Update => f.write_str("UPDATE"),
            Method::Prack => f.write_str("PRACK"),
            Method::Subscribe => f.write_str("SUBSCRIBE"),
            Method::Notify => f.write_str("NOTIFY"),
            Method::Refer => f.write_str("REFER"),
            Method::Message => f.write_str("MESSAGE"),
            Method::Publish => f.write_str("PUBLISH"),
            Method::Other(other) => f.write_str(other),
        }
    }
}

/// A 3-digit SIP response code, always in `100..=699` by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StatusCode(u16);

/// The five response-code classes, per the SIP spec's `Nxx` ranges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeKind {
    Provisional,
    Success,
    Redirect,
    RequestFailure,
    ServerFailure,
    GlobalFailure,
}

impl StatusCode {
    /// Clamps nothing: callers are expected to only construct response
    /// codes the parser actually observed (100..=699). Out-of-range values
    /// are accepted but will not match any transition table arm.
    pub fn new(code: u16) -> Self {
        Self(code)
    }

    pub fn code(&self) -> u16 {
        self.0
    }

    pub fn kind(&self) -> CodeKind {
        match self.0 {
            100..=199 => CodeKind::Provisional,
            200..=299 => CodeKind::Success,
            300..=399 => CodeKind::Redirect,
            400..=499 => CodeKind::RequestFailure,
            500..=599 => CodeKind::ServerFailure,
            _ => CodeKind::GlobalFailure,
        }
    }

    pub fn is_success(&self) -> bool {
        self.kind() == CodeKind::Success
    }

    /// `4xx..=6xx`, i.e. anything that is a final failure response.
    pub fn is_failure(&self) -> bool {
        self.0 >= 400
    }

    pub fn is_auth_challenge(&self) -> bool {
        matches!(self.0, 401 | 407)
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Either a request method or a final/provisional response code.
///
/// The two cases are never ambiguous at the construction site, since the
/// external parser already knows whether it parsed a request line or a
/// status line.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ReqResp {
    Method(Method),
    Response(StatusCode),
}

impl ReqResp {
    pub fn as_method(&self) -> Option<&Method> {
        match self {
            ReqResp::Method(m) => Some(m),
            ReqResp::Response(_) => None,
        }
    }

    pub fn as_status(&self) -> Option<StatusCode> {
        match self {
            ReqResp::Method(_) => None,
            ReqResp::Response(code) => Some(*code),
        }
    }

    pub fn is_method(&self, m: &Method) -> bool {
        matches!(self, ReqResp::Method(x) if x == m)
    }

    pub fn is_status(&self, code: u16) -> bool {
        matches!(self, ReqResp::Response(c) if c.code() == code)
    }
}

impl fmt::Display for ReqResp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReqResp::Method(m) => m.fmt(f),
            ReqResp::Response(c) => c.fmt(f),
        }
    }
}

/// The canonical `"<code> <reason>"` text for a SIP response code.
///
/// Used when formatting `disconnect_code` and similar attributes.
/// Unrecognised codes return `None`, at which point callers fall back to
/// the plain decimal form.
pub fn response_str(code: u16) -> Option<&'static str> {
    Some(match code {
        100 => "100 Trying",
        180 => "180 Ringing",
        181 => "181 Call Is Being Forwarded",
        182 => "182 Queued",
        183 => "183 Session Progress",
        200 => "200 OK",
        202 => "202 Accepted",
        300 => "300 Multiple Choices",
        301 => "301 Moved Permanently",
        302 => "302 Moved Temporarily",
        305 => "305 Use Proxy",
        380 => "380 Alternative Service",
        400 => "400 Bad Request",
        401 => "401 Unauthorized",
        403 => "403 Forbidden",
        404 => "404 Not Found",
        405 => "405 Method Not Allowed",
        407 => "407 Proxy Authentication Required",
        408 => "408 Request Timeout",
        410 => "410 Gone",
        413 => "413 Request Entity Too Large",
        414 => "414 Request-URI Too Long",
        415 => "415 Unsupported Media Type",
        416 => "416 Unsupported URI Scheme",
        420 => "420 Bad Extension",
        421 => "421 Extension Required",
        423 => "423 Interval Too Brief",
        480 => "480 Temporarily Unavailable",
        481 => "481 Call/Transaction Does Not Exist",
        482 => "482 Loop Detected",
        483 => "483 Too Many Hops",
        484 => "484 Address Incomplete",
        485 => "485 Ambiguous",
        486 => "486 Busy Here",
        487 => "487 Request Terminated",
        488 => "488 Not Acceptable Here",
        491 => "491 Request Pending",
        493 => "493 Undecipherable",
        500 => "500 Server Internal Error",
        501 => "501 Not Implemented",
        502 => "502 Bad Gateway",
        503 => "503 Service Unavailable",
        504 => "504 Server Time-out",
        505 => "505 Version Not Supported",
        513 => "513 Message Too Large",
        600 => "600 Busy Everywhere",
        603 => "603 Decline",
        604 => "604 Does Not Exist Anywhere",
        606 => "606 Not Acceptable",
        _ => return None,
    })
}

/// `response_str`, falling back to the plain decimal code when the reason
/// phrase is unknown.
pub fn response_str_or_code(code: u16) -> String {
    response_str(code)
        .map(str::to_owned)
        .unwrap_or_else(|| code.to_string())
}
