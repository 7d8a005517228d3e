//! The comparator: a stable total order over two calls by a chosen
//! attribute, for sorted display.

use crate::attribute::{Attribute, get_attribute};
use crate::call::Call;
use std::cmp::Ordering;

/// Orders two calls by a chosen attribute. Numeric attributes compare as
/// integers; everything else projects through the attribute projector and
/// compares lexicographically, with the convention that an absent value
/// sorts after every present value (`Greater`), and two absent values
/// compare equal.
pub fn compare(a: &Call, b: &Call, attr: Attribute) -> Ordering {
    match attr {
        Attribute::CallIndex => a.index().cmp(&b.index()),
        Attribute::MsgCount => a.msg_count().cmp(&b.msg_count()),
        _ => compare_projected(a, b, attr),
    }
}

fn compare_projected(a: &Call, b: &Call, attr: Attribute) -> Ordering {
    match (get_attribute(a, attr), get_attribute(b, attr)) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(x), Some(y)) => x.cmp(&y),
    }
}
