//! The read-only message view the core consumes from the external SIP
//! parser, plus the handful of fields the core itself populates once a
//! message is appended to a call (`index`, the owning call's id, and the
//! retransmission back-link).

use crate::address::Endpoint;
use crate::reqresp::ReqResp;
use bytesstr::BytesStr;
use std::time::SystemTime;

/// The transport a message was observed on, as classified by the (out of
/// scope) packet dissector. Needed only to answer the TRANSPORT attribute
/// query; the core never branches on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Udp,
    Tcp,
    Tls,
    Sctp,
    Other,
}

impl Transport {
    pub fn as_str(&self) -> &'static str {
        match self {
            Transport::Udp => "UDP",
            Transport::Tcp => "TCP",
            Transport::Tls => "TLS",
            Transport::Sctp => "SCTP",
            Transport::Other => "-",
        }
    }
}

/// A single SDP media descriptor attached to a message, as produced by the
/// (out-of-scope) SDP parser. Only the address is relevant to the core —
/// codec negotiation, direction attributes, etc. live entirely in the
/// external media layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaDescriptor {
    pub address: Endpoint,
}

impl MediaDescriptor {
    pub fn new(address: Endpoint) -> Self {
        Self { address }
    }
}

/// A parsed SIP message, already grouped into its Call-ID by the caller.
///
/// Everything but `index`, `retrans` and the owning call-id is supplied by
/// the external parser at construction time and never mutated afterwards;
/// the core only ever appends messages, never edits one in place.
#[derive(Debug, Clone)]
pub struct Message {
    pub src: Endpoint,
    pub dst: Endpoint,
    pub reqresp: ReqResp,
    pub cseq: u32,
    pub payload: Vec<u8>,
    pub timestamp: SystemTime,
    pub medias: Vec<MediaDescriptor>,
    pub transport: Transport,

    /// Back-link to the owning call, by call-id rather than by reference —
    /// messages live inside `Call::messages`, so a literal back-pointer
    /// would be self-referential. The call-id is already the call's unique
    /// key, so it is a faithful, allocation-cheap stand-in for one.
    pub(crate) call_id: BytesStr,
    /// Position of this message within its owning call's `messages`.
    pub(crate) index: usize,
    /// Index, within the same call's `messages`, of the earlier message
    /// this one retransmits. Set once by the retransmission detector at
    /// insertion time and never revisited.
    pub(crate) retrans: Option<usize>,
}

impl Message {
    /// Builds a message as the external parser would: no call association
    /// yet, not flagged as a retransmission. `Call::add_message` fills in
    /// the remaining bookkeeping fields when the message is appended.
    pub fn new(
        src: Endpoint,
        dst: Endpoint,
        reqresp: ReqResp,
        cseq: u32,
        payload: Vec<u8>,
        timestamp: SystemTime,
        medias: Vec<MediaDescriptor>,
    ) -> Self {
        Self::with_transport(src, dst, reqresp, cseq, payload, timestamp, medias, Transport::Udp)
    }

    /// As `new`, but recording the transport the message was observed on.
    #[allow(clippy::too_many_arguments)]
    pub fn with_transport(
        src: Endpoint,
        dst: Endpoint,
        reqresp: ReqResp,
        cseq: u32,
        payload: Vec<u8>,
        timestamp: SystemTime,
        medias: Vec<MediaDescriptor>,
        transport: Transport,
    ) -> Self {
        Self {
            src,
            dst,
            reqresp,
            cseq,
            payload,
            timestamp,
            medias,
            transport,
            call_id: BytesStr::from_static(""),
            index: 0,
            retrans: None,
        }
    }

    pub fn call_id(&self) -> &str {
        &self.call_id
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Index of the message this one retransmits, if the retransmission
    /// detector found one.
    pub fn retrans(&self) -> Option<usize> {
        self.retrans
    }

    pub fn is_retrans(&self) -> bool {
        self.retrans.is_some()
    }

    pub fn is_method(&self, m: &crate::reqresp::Method) -> bool {
        self.reqresp.is_method(m)
    }

    pub fn is_status(&self, code: u16) -> bool {
        self.reqresp.is_status(code)
    }
}
