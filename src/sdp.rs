//! SDP (SECC Discovery Protocol) responder.
//!
//! Pure request/response logic lives here, decoupled from the socket it's
//! driven over, so it can be exercised directly in tests; `crate::server`
//! wires it to an actual `mio` UDP socket.

use std::net::Ipv6Addr;

use tracing::{debug, warn};

use crate::v2gtp::{self, PayloadType};

/// The 10-byte SDP discovery request: an 8-byte V2GTP header (payload
/// type `SDP_REQUEST`, payload length 2) followed by `security` and
/// `transport` bytes. (`spec.md` §4.2 labels this "12 bytes" in prose,
/// but its own literal example in §8 and the reference implementation's
/// `sdp_request` array both agree on 10; this crate follows the bytes.)
const SECURITY_NO_TLS: u8 = 0x10;
const TRANSPORT_TCP: u8 = 0x00;
const REQUEST_LEN: usize = 10;
const RESPONSE_LEN: usize = 28;

/// Validate an inbound datagram as an exact SDP discovery request.
/// Per `spec.md` §4.2, anything that does not match exactly is ignored,
/// not NACKed.
pub fn is_valid_discovery_request(datagram: &[u8]) -> bool {
    if datagram.len() != REQUEST_LEN {
        return false;
    }
    let header = match v2gtp::read_header_checked(datagram, datagram.len() - v2gtp::HEADER_LEN) {
        Ok(h) => h,
        Err(_) => return false,
    };
    header.payload_type == PayloadType::SdpRequest
        && header.payload_len == 2
        && datagram[8] == SECURITY_NO_TLS
        && datagram[9] == TRANSPORT_TCP
}

/// Build the 28-byte SDP discovery response for the station's link-local
/// address and TCP port.
pub fn build_discovery_response(link_local: Ipv6Addr, tcp_port: u16) -> [u8; RESPONSE_LEN] {
    let mut buf = [0u8; RESPONSE_LEN];
    v2gtp::write_header(&mut buf, 20, PayloadType::SdpResponse).expect("buffer is large enough");
    buf[8..24].copy_from_slice(&link_local.octets());
    buf[24..26].copy_from_slice(&tcp_port.to_be_bytes());
    buf[26] = SECURITY_NO_TLS;
    buf[27] = TRANSPORT_TCP;
    buf
}

/// Handle one received UDP datagram, returning the response bytes to send
/// back to the sender, or `None` if the datagram should be silently
/// dropped.
pub fn handle_datagram(datagram: &[u8], link_local: Ipv6Addr, tcp_port: u16) -> Option<[u8; RESPONSE_LEN]> {
    if is_valid_discovery_request(datagram) {
        debug!("valid SDP discovery request, responding");
        Some(build_discovery_response(link_local, tcp_port))
    } else {
        warn!(len = datagram.len(), "ignoring malformed SDP datagram");
        None
    }
}

/// Resolve the first link-local (`fe80::/10`) IPv6 address bound to the
/// named interface. Returns `None` if the interface doesn't exist or has
/// no link-local address; both are startup-fatal per `spec.md` §4.2.
pub fn resolve_link_local_address(ifname: &str) -> Option<Ipv6Addr> {
    let interfaces = if_addrs::get_if_addrs().ok()?;
    interfaces
        .into_iter()
        .filter(|iface| iface.name == ifname)
        .find_map(|iface| match iface.addr.ip() {
            std::net::IpAddr::V6(addr) if is_link_local(&addr) => Some(addr),
            _ => None,
        })
}

fn is_link_local(addr: &Ipv6Addr) -> bool {
    // fe80::/10: top 10 bits are 1111111010.
    let segments = addr.segments();
    (segments[0] & 0xffc0) == 0xfe80
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_request() -> [u8; REQUEST_LEN] {
        [0x01, 0xFE, 0x90, 0x00, 0x00, 0x00, 0x00, 0x02, 0x10, 0x00]
    }

    #[test]
    fn literal_request_bytes_match_spec() {
        let req = sample_request();
        assert!(is_valid_discovery_request(&req));
    }

    #[test]
    fn rejects_one_byte_altered() {
        let mut req = sample_request();
        req[8] = 0x11; // security byte altered
        assert!(!is_valid_discovery_request(&req));
    }

    #[test]
    fn rejects_wrong_length() {
        let req = sample_request();
        assert!(!is_valid_discovery_request(&req[..5]));
        let mut longer = req.to_vec();
        longer.push(0);
        assert!(!is_valid_discovery_request(&longer));
    }

    #[test]
    fn response_matches_literal_byte_layout() {
        let addr: Ipv6Addr = "fe80::1".parse().unwrap();
        let resp = build_discovery_response(addr, 51111);
        assert_eq!(resp.len(), RESPONSE_LEN);
        assert_eq!(&resp[8..24], &addr.octets());
        assert_eq!(&resp[24..26], &[0xC7, 0x07]); // 51111 big-endian
        assert_eq!(&resp[26..28], &[0x10, 0x00]);
    }

    #[test]
    fn link_local_classification() {
        assert!(is_link_local(&"fe80::1".parse().unwrap()));
        assert!(!is_link_local(&"2001:db8::1".parse().unwrap()));
        assert!(!is_link_local(&"::1".parse().unwrap()));
    }

    #[test]
    fn handle_datagram_drops_malformed() {
        let addr: Ipv6Addr = "fe80::1".parse().unwrap();
        let mut req = sample_request();
        req[9] = 0x01;
        assert!(handle_datagram(&req, addr, 51111).is_none());
    }
}
