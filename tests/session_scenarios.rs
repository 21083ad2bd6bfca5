//! End-to-end scenarios driven through V2GTP framing + the wire codec +
//! the session engine, exercising the concrete byte-level walkthrough in
//! `spec.md` §8 without opening any real sockets.

use secc_core::config::StationConfig;
use secc_core::exi::handshake::{
    AppProtocol, HandshakeDoc, HandshakeResponseCode, SupportedAppProtocolReq,
};
use secc_core::exi::iso::{
    Body, DcEvseStatusCode, EnergyTransferMode, MessageHeader, PhysicalValue, ResponseCode, Unit,
    V2GMessage,
};
use secc_core::exi::{self};
use secc_core::rand_source::SessionRng;
use secc_core::sdp;
use secc_core::v2gtp::{self, PayloadType};
use secc_core::Session;

fn frame(payload_type: PayloadType, payload: &[u8]) -> Vec<u8> {
    let mut buf = vec![0u8; v2gtp::HEADER_LEN + payload.len()];
    v2gtp::write_header(&mut buf, payload.len() as u32, payload_type).unwrap();
    buf[v2gtp::HEADER_LEN..].copy_from_slice(payload);
    buf
}

fn unframe(buf: &[u8]) -> (v2gtp::Header, &[u8]) {
    let available = buf.len() - v2gtp::HEADER_LEN;
    let header = v2gtp::read_header_checked(buf, available).unwrap();
    (header, &buf[v2gtp::HEADER_LEN..])
}

#[test]
fn sdp_discovery_round_trip_is_byte_exact() {
    let request: [u8; 10] = [0x01, 0xFE, 0x90, 0x00, 0x00, 0x00, 0x00, 0x02, 0x10, 0x00];
    let link_local: std::net::Ipv6Addr = "fe80::abcd".parse().unwrap();

    let response = sdp::handle_datagram(&request, link_local, 51111).expect("valid request");
    let (header, payload) = unframe(&response);
    assert_eq!(header.payload_type, PayloadType::SdpResponse);
    assert_eq!(&payload[..16], &link_local.octets());
    assert_eq!(&payload[16..18], &51111u16.to_be_bytes());
}

#[test]
fn altered_sdp_request_gets_no_response() {
    let mut request: [u8; 10] = [0x01, 0xFE, 0x90, 0x00, 0x00, 0x00, 0x00, 0x02, 0x10, 0x00];
    request[9] = 0x7F; // transport byte corrupted
    let link_local: std::net::Ipv6Addr = "fe80::abcd".parse().unwrap();
    assert!(sdp::handle_datagram(&request, link_local, 51111).is_none());
}

#[test]
fn handshake_then_full_dc_session_walkthrough() {
    let config = StationConfig::default();
    let mut rng = SessionRng::init().unwrap();
    let mut session = Session::new();

    // 1. Application handshake negotiates the 2013 namespace.
    let req = SupportedAppProtocolReq {
        protocols: vec![AppProtocol {
            namespace: config.protocol_namespace.clone(),
            schema_id: 1,
            priority: 1,
        }],
    };
    let hs_payload = {
        let mut buf = vec![0u8; 256];
        let len = exi::encode_handshake(&mut buf, 0, &HandshakeDoc::Req(req.clone())).unwrap();
        buf.truncate(len);
        buf
    };
    let hs_frame = frame(PayloadType::Exi, &hs_payload);
    let (_, payload) = unframe(&hs_frame);
    let decoded_req = match exi::decode_handshake(payload).unwrap() {
        HandshakeDoc::Req(r) => r,
        _ => panic!("expected request"),
    };
    let hs_res = session.handle_handshake(&decoded_req, &config).unwrap();
    assert_eq!(hs_res.response_code, HandshakeResponseCode::OkSuccessfulNegotiation);
    assert!(!session.handshake_pending);

    // 2. SessionSetupReq -> SessionSetupRes with a freshly minted SessionID.
    let setup_req = V2GMessage {
        header: MessageHeader { session_id: vec![] },
        body: Body::SessionSetupReq {
            evccid: vec![0xAA; 6],
        },
    };
    let setup_res = session.handle_iso(&setup_req, &config, &mut rng).unwrap().unwrap();
    assert_eq!(setup_res.header.session_id.len(), 8);
    let session_id = setup_res.header.session_id.clone();
    match setup_res.body {
        Body::SessionSetupRes { response_code, evseid } => {
            assert_eq!(response_code, ResponseCode::Ok);
            assert_eq!(evseid, config.evse_id);
        }
        other => panic!("unexpected {other:?}"),
    }

    // 3. ChargeParameterDiscoveryReq for DC_extended succeeds.
    let cpd_req = V2GMessage {
        header: MessageHeader {
            session_id: session_id.clone(),
        },
        body: Body::ChargeParameterDiscoveryReq {
            requested_energy_transfer_mode: EnergyTransferMode::DcExtended,
        },
    };
    let cpd_res = session.handle_iso(&cpd_req, &config, &mut rng).unwrap().unwrap();
    assert_eq!(cpd_res.header.session_id, session_id);
    match cpd_res.body {
        Body::ChargeParameterDiscoveryRes { response_code, .. } => {
            assert_eq!(response_code, ResponseCode::Ok);
        }
        other => panic!("unexpected {other:?}"),
    }

    // 4. PreChargeReq echoes the EV's requested target voltage.
    let target_voltage = PhysicalValue::new(400, 0, Unit::Volt).unwrap();
    let target_current = PhysicalValue::new(0, 0, Unit::Ampere).unwrap();
    let pre_charge_req = V2GMessage {
        header: MessageHeader {
            session_id: session_id.clone(),
        },
        body: Body::PreChargeReq {
            ev_target_voltage: target_voltage,
            ev_target_current: target_current,
        },
    };
    let pre_charge_res = session.handle_iso(&pre_charge_req, &config, &mut rng).unwrap().unwrap();
    match pre_charge_res.body {
        Body::PreChargeRes {
            evse_present_voltage, ..
        } => assert_eq!(evse_present_voltage, target_voltage),
        other => panic!("unexpected {other:?}"),
    }

    // 5. CurrentDemandReq echoes both targets and reports EVSE_Ready.
    let demand_voltage = PhysicalValue::new(398, 0, Unit::Volt).unwrap();
    let demand_current = PhysicalValue::new(100, 0, Unit::Ampere).unwrap();
    let demand_req = V2GMessage {
        header: MessageHeader {
            session_id: session_id.clone(),
        },
        body: Body::CurrentDemandReq {
            ev_target_voltage: demand_voltage,
            ev_target_current: demand_current,
        },
    };
    let demand_res = session.handle_iso(&demand_req, &config, &mut rng).unwrap().unwrap();
    match demand_res.body {
        Body::CurrentDemandRes {
            evse_present_voltage,
            evse_present_current,
            dc_evse_status,
            ..
        } => {
            assert_eq!(evse_present_voltage, demand_voltage);
            assert_eq!(evse_present_current, demand_current);
            assert_eq!(dc_evse_status.status_code, DcEvseStatusCode::Ready);
        }
        other => panic!("unexpected {other:?}"),
    }

    // 6. SessionStopReq closes out cleanly.
    let stop_req = V2GMessage {
        header: MessageHeader { session_id },
        body: Body::SessionStopReq,
    };
    let stop_res = session.handle_iso(&stop_req, &config, &mut rng).unwrap().unwrap();
    match stop_res.body {
        Body::SessionStopRes { response_code } => assert_eq!(response_code, ResponseCode::Ok),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn charge_parameter_discovery_rejects_ac_mode() {
    let config = StationConfig::default();
    let mut rng = SessionRng::init().unwrap();
    let mut session = Session::new();
    session.handshake_pending = false;

    let req = V2GMessage {
        header: MessageHeader { session_id: vec![1; 8] },
        body: Body::ChargeParameterDiscoveryReq {
            requested_energy_transfer_mode: EnergyTransferMode::AcSinglePhaseCore,
        },
    };
    let res = session.handle_iso(&req, &config, &mut rng).unwrap().unwrap();
    match res.body {
        Body::ChargeParameterDiscoveryRes { response_code, .. } => {
            assert_eq!(response_code, ResponseCode::FailedWrongEnergyTransferMode);
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn handshake_with_only_legacy_namespace_is_rejected() {
    let config = StationConfig::default();
    let mut session = Session::new();
    let req = SupportedAppProtocolReq {
        protocols: vec![AppProtocol {
            namespace: "urn:iso:15118:2:2010:MsgDef".to_string(),
            schema_id: 0,
            priority: 1,
        }],
    };
    assert!(session.handle_handshake(&req, &config).is_none());
    assert!(session.handshake_pending);
}

#[test]
fn oversized_declared_payload_length_is_rejected_as_framing_error() {
    let payload = [0u8; 4];
    let mut buf = vec![0u8; v2gtp::HEADER_LEN + payload.len()];
    // Declare a length longer than what's actually present.
    v2gtp::write_header(&mut buf, 999, PayloadType::Exi).unwrap();
    buf[v2gtp::HEADER_LEN..].copy_from_slice(&payload);

    let available = buf.len() - v2gtp::HEADER_LEN;
    assert!(v2gtp::read_header_checked(&buf, available).is_err());
}
