//! Per-call SIP dialog aggregation and state tracking.
//!
//! This crate is the core of a passive SIP traffic inspector: given a
//! stream of already-parsed [`Message`](message::Message) records grouped
//! by Call-ID, it maintains an ordered transcript per call, derives the
//! call's lifecycle state (call-setup, in-call, cancelled, rejected,
//! busy, diverted, completed), and attributes who ended the call and how.
//!
//! Packet capture, SIP header parsing, SDP parsing, RTP stream detection,
//! the call registry, and any UI layer are all external collaborators;
//! this crate only consumes their output and produces an observable
//! [`Call`](call::Call).
//!
//! The crate is synchronous and single-threaded: see the module docs on
//! [`call`] for the concurrency contract callers are expected to uphold.

#![forbid(unsafe_code)]

pub mod address;
pub mod attribute;
pub mod call;
pub mod compare;
pub mod error;
pub mod message;
pub mod reqresp;
mod retrans;
mod state;

pub use address::Endpoint;
pub use attribute::{Attribute, get_attribute};
pub use call::{CallState, CaptureRtp, Call, FilterCache, MediaStream, RtpPacketRecord};
pub use compare::compare;
pub use error::CallCreateError;
pub use message::{MediaDescriptor, Message, Transport};
pub use reqresp::{CodeKind, Method, ReqResp, StatusCode, response_str, response_str_or_code};
