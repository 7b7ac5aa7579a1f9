use chrono::{DateTime, Utc};

use crate::error::ClassifyError;
use crate::models::{ArpFrame, ArpOperation, RawArp, TrafficClass};

/// Maps a raw ARP payload seen on `interface` to its table and the frame to store.
///
/// A request whose target hardware address is broadcast and whose sender and
/// target protocol addresses match is a gratuitous announcement. Any operation
/// code other than request or reply is rejected.
pub fn classify(
    raw: &RawArp,
    interface: &str,
    observed_at: DateTime<Utc>,
) -> Result<(TrafficClass, ArpFrame), ClassifyError> {
    let (class, operation) = match raw.operation {
        ArpOperation::REQUEST_CODE if is_gratuitous(raw) => {
            (TrafficClass::GratuitousRequest, ArpOperation::Request)
        }
        ArpOperation::REQUEST_CODE => (TrafficClass::Request, ArpOperation::Request),
        ArpOperation::REPLY_CODE => (TrafficClass::Reply, ArpOperation::Reply),
        other => return Err(ClassifyError::UnknownOperation(other)),
    };

    Ok((class, ArpFrame::new(interface, operation, raw, observed_at)))
}

fn is_gratuitous(raw: &RawArp) -> bool {
    raw.target_mac.is_broadcast() && raw.sender_ip == raw.target_ip
}
