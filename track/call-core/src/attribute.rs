//! The attribute projector — read-only queries returning textual attribute
//! values for display/sort, including the fallback inference for
//! `DisconnectBy`/`DisconnectCode` when attribution wasn't recorded during
//! a transition.

use crate::call::{Call, CallState};
use crate::reqresp::{Method, response_str_or_code};
use std::time::{Duration, SystemTime};

/// The attributes the projector knows how to format. `FirstRequestSrc` and
/// `FirstRequestDst` fall back to the first message's endpoints, mirroring
/// the default-arm behavior of older deployments that predate the richer
/// attribute set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Attribute {
    CallIndex,
    CallId,
    XCallId,
    MsgCount,
    State,
    Transport,
    ConversationDuration,
    TotalDuration,
    ReasonTxt,
    Warning,
    DisconnectBy,
    DisconnectCode,
    FirstRequestSrc,
    FirstRequestDst,
}

/// Projects a single attribute off a call into its display text. Returns
/// `None` for unset optional fields, an attribute that doesn't apply yet,
/// or a formatted value that turned out empty.
pub fn get_attribute(call: &Call, attr: Attribute) -> Option<String> {
    let value = match attr {
        Attribute::CallIndex => Some(call.index().to_string()),
        Attribute::CallId => Some(call.call_id().to_owned()),
        Attribute::XCallId => call.x_call_id().map(str::to_owned),
        Attribute::MsgCount => Some(call.msg_count().to_string()),
        Attribute::State => non_empty(call.state().as_str().to_owned()),
        Attribute::Transport => call.messages().first().map(|m| m.transport.as_str().to_owned()),
        Attribute::ConversationDuration => conversation_duration(call),
        Attribute::TotalDuration => total_duration(call),
        Attribute::ReasonTxt => call.reason_txt().map(str::to_owned),
        Attribute::Warning => call.warning().map(str::to_owned),
        Attribute::DisconnectBy => Some(disconnect_by(call)),
        Attribute::DisconnectCode => Some(disconnect_code(call)),
        Attribute::FirstRequestSrc => call.messages().first().map(|m| m.src.to_string()),
        Attribute::FirstRequestDst => call.messages().first().map(|m| m.dst.to_string()),
    };

    value.and_then(non_empty)
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() { None } else { Some(s) }
}

fn conversation_duration(call: &Call) -> Option<String> {
    let start = call.conv_start_msg()?;
    let end = call.conv_end_msg()?;
    Some(format_duration_between(start.timestamp, end.timestamp))
}

fn total_duration(call: &Call) -> Option<String> {
    let first = call.messages().first()?;
    let last = call.messages().last()?;
    Some(format_duration_between(first.timestamp, last.timestamp))
}

fn format_duration_between(start: SystemTime, end: SystemTime) -> String {
    let d = end.duration_since(start).unwrap_or(Duration::ZERO);
    let total_secs = d.as_secs();
    format!(
        "{:02}:{:02}:{:02}",
        total_secs / 3600,
        (total_secs % 3600) / 60,
        total_secs % 60
    )
}

/// Is this message (CANCEL, BYE, or a non-auth 4xx-6xx) the kind that can
/// terminate a dialog, for the purposes of the disconnect-attribute
/// fallback scan?
fn is_termination_message(m: &crate::message::Message) -> bool {
    if m.is_method(&Method::Cancel) || m.is_method(&Method::Bye) {
        return true;
    }
    match m.reqresp.as_status() {
        Some(code) => code.is_failure() && !code.is_auth_challenge(),
        None => false,
    }
}

fn disconnect_by(call: &Call) -> String {
    if call.state() == CallState::CallSetup {
        return "-".to_owned();
    }
    if let Some(by) = call.disconnect_by_raw() {
        return by;
    }
    let found = call
        .messages()
        .iter()
        .rev()
        .find(|m| is_termination_message(m));

    match found {
        Some(m) => m.src.to_string(),
        None if call.state() == CallState::InCall => "-".to_owned(),
        None => "Unknown".to_owned(),
    }
}

fn disconnect_code(call: &Call) -> String {
    if call.state() == CallState::CallSetup {
        return "-".to_owned();
    }
    if let Some(code) = call.disconnect_code() {
        return code.to_owned();
    }

    let has_bye = call.messages().iter().any(|m| m.is_method(&Method::Bye));
    let has_487 = call.messages().iter().any(|m| m.is_status(487));
    let non_auth_final = call
        .messages()
        .iter()
        .rev()
        .find_map(|m| m.reqresp.as_status().filter(|c| c.is_failure() && !c.is_auth_challenge()));

    match call.state() {
        CallState::InCall if has_bye => "BYE (No Response)".to_owned(),
        CallState::InCall => "-".to_owned(),
        CallState::Cancelled if has_487 => response_str_or_code(487),
        CallState::Cancelled => "CANCELLED".to_owned(),
        CallState::Diverted => non_auth_final
            .map(|c| response_str_or_code(c.code()))
            .unwrap_or_else(|| "DIVERTED".to_owned()),
        CallState::Rejected => "REJECTED".to_owned(),
        CallState::Busy => "BUSY".to_owned(),
        CallState::Completed => "BYE".to_owned(),
        CallState::Unset | CallState::CallSetup => "-".to_owned(),
    }
}
