//! The retransmission detector.

use crate::call::Call;

/// Flags the message at `idx` as a retransmission if an earlier message in
/// the same call has identical endpoints and a byte-for-byte (case
/// insensitive) identical payload. O(k), where k is the distance back to
/// the nearest message sharing src/dst — acceptable given typical dialog
/// lengths.
pub(crate) fn check(call: &mut Call, idx: usize) {
    let (src, dst) = {
        let m = &call.messages[idx];
        (m.src, m.dst)
    };

    let prior = call.messages[..idx]
        .iter()
        .rposition(|p| p.src == src && p.dst == dst);

    let Some(prior_idx) = prior else {
        return;
    };

    let same_payload = payload_eq_ascii_ci(&call.messages[prior_idx].payload, &call.messages[idx].payload);

    if same_payload {
        call.messages[idx].retrans = Some(prior_idx);
        tracing::trace!(
            call_id = call.call_id(),
            idx,
            prior_idx,
            "message flagged as retransmission"
        );
    }
}

/// Case-insensitive, byte-wise payload comparison.
fn payload_eq_ascii_ci(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.eq_ignore_ascii_case(y))
}
