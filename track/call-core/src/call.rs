//! The call aggregate — the central entity the rest of the crate
//! operates on.

use crate::address::Endpoint;
use crate::error::CallCreateError;
use crate::message::{MediaDescriptor, Message};
use crate::{retrans, state};
use bytesstr::BytesStr;
use std::time::SystemTime;

/// Derived call state. `Unset` covers both "no messages yet" and "first
/// message was not an INVITE" — the state engine never leaves `Unset` in
/// the latter case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallState {
    Unset,
    CallSetup,
    InCall,
    Cancelled,
    Rejected,
    Busy,
    Diverted,
    Completed,
}

impl CallState {
    /// The fixed state→string mapping used for display and filtering.
    pub fn as_str(&self) -> &'static str {
        match self {
            CallState::Unset => "",
            CallState::CallSetup => "CALL SETUP",
            CallState::InCall => "IN CALL",
            CallState::Cancelled => "CANCELLED",
            CallState::Rejected => "REJECTED",
            CallState::Busy => "BUSY",
            CallState::Diverted => "DIVERTED",
            CallState::Completed => "COMPLETED",
        }
    }
}

/// The "capture RTP" environment toggle. Consumed once, at `Call::create`;
/// never re-read afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureRtp {
    Enabled,
    Disabled,
}

/// Tri-state cache slot for the (external) display filter layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterCache {
    #[default]
    Unevaluated,
    Pass,
    Fail,
}

/// An RTP media stream descriptor, as handed to the core by the (external,
/// out-of-scope) stream-detection layer. The core stores these purely for
/// retrieval; it never inspects stream contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaStream {
    pub address: Endpoint,
}

/// A single captured RTP packet record, stored only when RTP capture is
/// enabled. Like `MediaStream`, this is an opaque record as far as the
/// core is concerned — RTP parsing and metrics live entirely outside this
/// crate's scope.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RtpPacketRecord {
    pub src: Endpoint,
    pub dst: Endpoint,
    pub timestamp: SystemTime,
}

/// The per-call aggregate: an ordered transcript of messages, any
/// associated media, cross-referenced related calls, and the derived
/// state and attribution built up from them.
#[derive(Debug)]
pub struct Call {
    call_id: BytesStr,
    x_call_id: Option<BytesStr>,
    index: u32,

    pub(crate) messages: Vec<Message>,
    media_streams: Vec<MediaStream>,
    rtp_packets: Option<Vec<RtpPacketRecord>>,
    /// Weak relation to other calls, held by call-id rather than by
    /// reference so eviction of a related call can never leave this call
    /// with a dangling pointer.
    x_calls: Vec<BytesStr>,

    pub(crate) state: CallState,
    pub(crate) invite_cseq: u32,
    pub(crate) conv_start_msg: Option<usize>,
    pub(crate) conv_end_msg: Option<usize>,

    pub(crate) disconnect_by: Option<String>,
    pub(crate) disconnect_code: Option<String>,
    reason_txt: Option<String>,
    warning: Option<String>,

    filtered: FilterCache,
    changed: bool,
}

impl Call {
    /// Creates a fresh, empty call. Infallible in the common case; see
    /// `try_create` for the fallible-allocation variant.
    pub fn create(call_id: BytesStr, x_call_id: Option<BytesStr>, capture_rtp: CaptureRtp) -> Self {
        Self {
            call_id,
            x_call_id,
            index: 0,
            messages: Vec::new(),
            media_streams: Vec::new(),
            rtp_packets: match capture_rtp {
                CaptureRtp::Enabled => Some(Vec::new()),
                CaptureRtp::Disabled => None,
            },
            x_calls: Vec::new(),
            state: CallState::Unset,
            invite_cseq: 0,
            conv_start_msg: None,
            conv_end_msg: None,
            disconnect_by: None,
            disconnect_code: None,
            reason_txt: None,
            warning: None,
            filtered: FilterCache::Unevaluated,
            changed: false,
        }
    }

    /// Fallible variant of `create`, for callers that want to observe
    /// allocation failure as absence rather than aborting. Reserves a
    /// small amount of upfront capacity so the failure, if any, happens
    /// here rather than silently on the first `add_message`.
    pub fn try_create(
        call_id: BytesStr,
        x_call_id: Option<BytesStr>,
        capture_rtp: CaptureRtp,
    ) -> Result<Self, CallCreateError> {
        let mut messages = Vec::new();
        messages
            .try_reserve(4)
            .map_err(|_| CallCreateError::OutOfMemory)?;

        let mut call = Self::create(call_id, x_call_id, capture_rtp);
        call.messages = messages;
        Ok(call)
    }

    /// Index assigned by the registry — stored here but never interpreted
    /// by the core.
    pub fn set_index(&mut self, index: u32) {
        self.index = index;
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn call_id(&self) -> &str {
        &self.call_id
    }

    pub fn x_call_id(&self) -> Option<&str> {
        self.x_call_id.as_deref()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn media_streams(&self) -> &[MediaStream] {
        &self.media_streams
    }

    pub fn rtp_packets(&self) -> Option<&[RtpPacketRecord]> {
        self.rtp_packets.as_deref()
    }

    pub fn x_calls(&self) -> &[BytesStr] {
        &self.x_calls
    }

    pub fn state(&self) -> CallState {
        self.state
    }

    pub fn invite_cseq(&self) -> u32 {
        self.invite_cseq
    }

    pub fn conv_start_msg(&self) -> Option<&Message> {
        self.conv_start_msg.map(|i| &self.messages[i])
    }

    pub fn conv_end_msg(&self) -> Option<&Message> {
        self.conv_end_msg.map(|i| &self.messages[i])
    }

    pub fn disconnect_by_raw(&self) -> Option<String> {
        self.disconnect_by.clone()
    }

    pub fn disconnect_code(&self) -> Option<&str> {
        self.disconnect_code.as_deref()
    }

    pub fn reason_txt(&self) -> Option<&str> {
        self.reason_txt.as_deref()
    }

    pub fn warning(&self) -> Option<&str> {
        self.warning.as_deref()
    }

    pub fn set_reason_txt(&mut self, v: Option<String>) {
        self.reason_txt = v;
        self.changed = true;
    }

    pub fn set_warning(&mut self, v: Option<String>) {
        self.warning = v;
        self.changed = true;
    }

    pub fn filtered(&self) -> FilterCache {
        self.filtered
    }

    pub fn set_filtered(&mut self, f: FilterCache) {
        self.filtered = f;
    }

    /// Appends a message to the transcript. Does not run the state engine
    /// or the retransmission detector — the caller composes `add_message`,
    /// `update_state`, and `retrans_check`, in that order. Returns the
    /// index the message was stored at.
    pub fn add_message(&mut self, mut msg: Message) -> usize {
        let index = self.messages.len();
        msg.call_id = self.call_id.clone();
        msg.index = index;
        self.messages.push(msg);
        self.changed = true;
        self.filtered = FilterCache::Unevaluated;
        tracing::trace!(call_id = %self.call_id, index, "message appended");
        index
    }

    /// Runs the state transition engine for the message at `index`.
    pub fn update_state(&mut self, index: usize) {
        state::apply(self, index);
    }

    /// Runs the retransmission detector for the message at `index`.
    pub fn retrans_check(&mut self, index: usize) {
        retrans::check(self, index);
    }

    pub fn add_stream(&mut self, stream: MediaStream) {
        self.media_streams.push(stream);
        self.changed = true;
    }

    /// Records a captured RTP packet. A no-op when RTP capture was not
    /// enabled at creation time — there is no packet list to append to.
    pub fn add_rtp_packet(&mut self, pkt: RtpPacketRecord) {
        if let Some(packets) = self.rtp_packets.as_mut() {
            packets.push(pkt);
            self.changed = true;
        } else {
            tracing::trace!(call_id = %self.call_id, "dropped rtp packet, capture disabled");
        }
    }

    /// Relates another call to this one by call-id. Silently ignores an
    /// attempt to relate the call to itself.
    pub fn add_xcall(&mut self, other_call_id: BytesStr) {
        if other_call_id == self.call_id {
            return;
        }
        self.x_calls.push(other_call_id);
        self.changed = true;
    }

    pub fn msg_count(&self) -> usize {
        self.messages.len()
    }

    pub fn has_changed(&self) -> bool {
        self.changed
    }

    /// Clears the publication hint — called by the external owner once it
    /// has observed the change.
    pub fn clear_changed(&mut self) {
        self.changed = false;
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, CallState::CallSetup | CallState::InCall)
    }

    pub fn is_invite(&self) -> bool {
        self.messages
            .first()
            .is_some_and(|m| m.is_method(&crate::reqresp::Method::Invite))
    }

    /// Cheap derived query for whether any media stream has been
    /// associated with this call, exposed as a named predicate rather
    /// than a raw counter.
    pub fn has_media(&self) -> bool {
        !self.media_streams.is_empty()
    }

    /// First message whose media list contains `addr`.
    pub fn msg_with_media(&self, addr: Endpoint) -> Option<&Message> {
        self.messages
            .iter()
            .find(|m| m.medias.iter().any(|media| media.address == addr))
    }

    pub(crate) fn record_attribution(&mut self, by: Endpoint, code: String) {
        if self.disconnect_by.is_none() {
            self.disconnect_by = Some(by.to_string());
        }
        if self.disconnect_code.is_none() {
            self.disconnect_code = Some(code);
        }
    }
}

impl MediaDescriptor {
    pub fn address(&self) -> Endpoint {
        self.address
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::MediaDescriptor as Media;
    use crate::reqresp::{Method, ReqResp};
    use std::time::SystemTime;

    fn ep(port: u16) -> Endpoint {
        Endpoint::new("127.0.0.1".parse().unwrap(), port)
    }

    #[test]
    fn add_message_sets_back_links() {
        let mut call = Call::create("abc".into(), None, CaptureRtp::Disabled);
        let msg = Message::new(
            ep(1),
            ep(2),
            ReqResp::Method(Method::Invite),
            1,
            vec![],
            SystemTime::now(),
            vec![],
        );
        let idx = call.add_message(msg);
        assert_eq!(idx, 0);
        assert_eq!(call.messages()[0].call_id(), "abc");
        assert_eq!(call.messages()[0].index(), 0);
        assert!(call.has_changed());
    }

    #[test]
    fn rtp_packets_absent_unless_enabled() {
        let call = Call::create("abc".into(), None, CaptureRtp::Disabled);
        assert!(call.rtp_packets().is_none());

        let call = Call::create("abc".into(), None, CaptureRtp::Enabled);
        assert_eq!(call.rtp_packets(), Some(&[][..]));
    }

    #[test]
    fn add_xcall_ignores_self_reference() {
        let mut call = Call::create("abc".into(), None, CaptureRtp::Disabled);
        call.add_xcall("abc".into());
        assert!(call.x_calls().is_empty());
        call.add_xcall("xyz".into());
        assert_eq!(call.x_calls().len(), 1);
        assert_eq!(call.x_calls()[0], BytesStr::from_static("xyz"));
    }

    #[test]
    fn msg_with_media_finds_first_match() {
        let mut call = Call::create("abc".into(), None, CaptureRtp::Disabled);
        let target = ep(9000);
        let msg = Message::new(
            ep(1),
            ep(2),
            ReqResp::Method(Method::Invite),
            1,
            vec![],
            SystemTime::now(),
            vec![Media::new(target)],
        );
        call.add_message(msg);

        assert!(call.msg_with_media(target).is_some());
        assert!(call.msg_with_media(ep(12345)).is_none());
    }

    #[test]
    fn is_invite_false_without_messages() {
        let call = Call::create("abc".into(), None, CaptureRtp::Disabled);
        assert!(!call.is_invite());
    }
}
