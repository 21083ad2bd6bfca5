//! Session Engine: the per-TCP-peer protocol state machine.
//!
//! Owns the per-session mutable state from `spec.md` §3 and the dispatch
//! rules of `spec.md` §4.3. This module is transport-agnostic — it knows
//! nothing about sockets, only about `V2GMessage`/`HandshakeDoc` values —
//! so it can be driven either by the real event loop (`crate::server`) or
//! directly by tests.

use tracing::{info, warn};

use crate::config::StationConfig;
use crate::error::SeccError;
use crate::exi::handshake::{HandshakeResponseCode, SupportedAppProtocolReq, SupportedAppProtocolRes};
use crate::exi::iso::{
    Body, ChargeService, DcEvseStatus, DcEvseStatusCode, EnergyTransferMode, EvseNotification,
    EvseProcessing, EvseStatus, MessageHeader, PaymentOption, ResponseCode, ServiceCategory, UnhandledKind,
    V2GMessage,
};
use crate::rand_source::SessionRng;

/// Coarse progress marker, logged for observability. The engine does not
/// gate dispatch on this — see `spec.md` §4.3: "The engine does NOT
/// enforce strict state ordering in the minimal implementation."
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Handshake,
    SessionSetup,
    ServiceDiscovery,
    PaymentSelection,
    PaymentDetails,
    Authorization,
    ParameterDiscovery,
    CableCheck,
    PreCharge,
    PowerDelivery,
    CurrentDemand,
    WeldingDetection,
    SessionStop,
}

/// Per-TCP-peer mutable state. One instance exists for the lifetime of a
/// connected peer; dropped on teardown.
pub struct Session {
    pub session_id: Option<[u8; 8]>,
    pub handshake_pending: bool,
    pub ev_target_voltage: Option<crate::exi::iso::PhysicalValue>,
    pub ev_target_current: Option<crate::exi::iso::PhysicalValue>,
    pub stage: Stage,
}

impl Session {
    /// A freshly accepted peer always starts awaiting the application
    /// handshake.
    pub fn new() -> Self {
        Self {
            session_id: None,
            handshake_pending: true,
            ev_target_voltage: None,
            ev_target_current: None,
            stage: Stage::Handshake,
        }
    }

    /// Handle the application-handshake request. Returns `None` when no
    /// offered namespace matches this EVSE's namespace — per `spec.md`
    /// §4.3, the frame is then dropped with no reply and the peer will
    /// time out.
    pub fn handle_handshake(
        &mut self,
        req: &SupportedAppProtocolReq,
        config: &StationConfig,
    ) -> Option<SupportedAppProtocolRes> {
        match req.find_schema_id(&config.protocol_namespace) {
            Some(schema_id) => {
                self.handshake_pending = false;
                self.stage = Stage::SessionSetup;
                info!(target: "secc::trace", schema_id, "handshake negotiated");
                Some(SupportedAppProtocolRes {
                    response_code: HandshakeResponseCode::OkSuccessfulNegotiation,
                    schema_id: Some(schema_id),
                })
            }
            None => {
                warn!("handshake: no compatible protocol namespace offered");
                None
            }
        }
    }

    /// Handle one ISO 15118-2 body message, returning the reply document
    /// (with header already populated per the `SessionID` echo rule), or
    /// `None` if the message is deliberately unhandled. `Err` propagates a
    /// random-source failure encountered while minting a `SessionID`.
    pub fn handle_iso(
        &mut self,
        msg: &V2GMessage,
        config: &StationConfig,
        rng: &mut SessionRng,
    ) -> Result<Option<V2GMessage>, SeccError> {
        let mut outbound_session_id: Vec<u8> = Vec::new();

        let body = match &msg.body {
            Body::SessionSetupReq { .. } => {
                let id = rng.session_id()?;
                self.session_id = Some(id);
                outbound_session_id = id.to_vec();
                self.stage = Stage::ServiceDiscovery;
                info!(target: "secc::trace", "SessionSetupReq -> SessionSetupRes");
                Body::SessionSetupRes {
                    response_code: ResponseCode::Ok,
                    evseid: config.evse_id.clone(),
                }
            }
            Body::ServiceDiscoveryReq => {
                self.stage = Stage::PaymentSelection;
                info!(target: "secc::trace", "ServiceDiscoveryReq -> ServiceDiscoveryRes");
                Body::ServiceDiscoveryRes {
                    response_code: ResponseCode::Ok,
                    payment_options: vec![PaymentOption::ExternalPayment],
                    charge_service: ChargeService {
                        service_id: 1,
                        service_category: ServiceCategory::EvCharging,
                        free_service: true,
                        supported_energy_transfer_mode: vec![EnergyTransferMode::DcExtended],
                    },
                }
            }
            Body::PaymentServiceSelectionReq { .. } => {
                self.stage = Stage::Authorization;
                info!(target: "secc::trace", "PaymentServiceSelectionReq -> PaymentServiceSelectionRes");
                Body::PaymentServiceSelectionRes {
                    response_code: ResponseCode::Ok,
                }
            }
            Body::PaymentDetailsReq { .. } => {
                self.stage = Stage::Authorization;
                info!(target: "secc::trace", "PaymentDetailsReq -> PaymentDetailsRes");
                Body::PaymentDetailsRes {
                    response_code: ResponseCode::Ok,
                }
            }
            Body::AuthorizationReq => {
                self.stage = Stage::ParameterDiscovery;
                info!(target: "secc::trace", "AuthorizationReq -> AuthorizationRes");
                Body::AuthorizationRes {
                    response_code: ResponseCode::Ok,
                    evse_processing: EvseProcessing::Finished,
                }
            }
            Body::ChargeParameterDiscoveryReq {
                requested_energy_transfer_mode,
            } => {
                self.stage = Stage::CableCheck;
                let compatible = *requested_energy_transfer_mode == EnergyTransferMode::DcExtended;
                info!(
                    target: "secc::trace",
                    compatible,
                    "ChargeParameterDiscoveryReq -> ChargeParameterDiscoveryRes"
                );
                Body::ChargeParameterDiscoveryRes {
                    response_code: if compatible {
                        ResponseCode::Ok
                    } else {
                        ResponseCode::FailedWrongEnergyTransferMode
                    },
                    evse_processing: EvseProcessing::Finished,
                    dc_charge_parameter: config.charge_envelope.as_dc_charge_parameter(),
                }
            }
            Body::CableCheckReq => {
                self.stage = Stage::PreCharge;
                info!(target: "secc::trace", "CableCheckReq -> CableCheckRes");
                Body::CableCheckRes {
                    response_code: ResponseCode::Ok,
                    evse_processing: EvseProcessing::Finished,
                    dc_evse_status: DcEvseStatus {
                        notification: EvseNotification::None,
                        notification_max_delay: config.notification_max_delay,
                        status_code: DcEvseStatusCode::NotReady,
                    },
                }
            }
            Body::PreChargeReq {
                ev_target_voltage,
                ev_target_current,
            } => {
                self.ev_target_voltage = Some(*ev_target_voltage);
                self.ev_target_current = Some(*ev_target_current);
                self.stage = Stage::PowerDelivery;
                info!(target: "secc::trace", "PreChargeReq -> PreChargeRes");
                Body::PreChargeRes {
                    response_code: ResponseCode::Ok,
                    evse_present_voltage: *ev_target_voltage,
                    dc_evse_status: DcEvseStatus {
                        notification: EvseNotification::None,
                        notification_max_delay: config.notification_max_delay,
                        status_code: DcEvseStatusCode::NotReady,
                    },
                }
            }
            Body::PowerDeliveryReq { .. } => {
                self.stage = match self.stage {
                    Stage::CurrentDemand => Stage::WeldingDetection,
                    _ => Stage::CurrentDemand,
                };
                info!(target: "secc::trace", "PowerDeliveryReq -> PowerDeliveryRes");
                // Open Question (a): the reply populates the AC-style
                // EVSEStatus, reproducing the reference implementation
                // literally rather than the DC_EVSEStatus one might expect.
                Body::PowerDeliveryRes {
                    response_code: ResponseCode::Ok,
                    evse_status: EvseStatus {
                        notification: EvseNotification::StopCharging,
                        notification_max_delay: config.notification_max_delay,
                    },
                }
            }
            Body::CurrentDemandReq {
                ev_target_voltage,
                ev_target_current,
            } => {
                self.ev_target_voltage = Some(*ev_target_voltage);
                self.ev_target_current = Some(*ev_target_current);
                self.stage = Stage::CurrentDemand;
                info!(target: "secc::trace", "CurrentDemandReq -> CurrentDemandRes");
                Body::CurrentDemandRes {
                    response_code: ResponseCode::Ok,
                    evse_present_voltage: *ev_target_voltage,
                    evse_present_current: *ev_target_current,
                    dc_evse_status: DcEvseStatus {
                        notification: EvseNotification::None,
                        notification_max_delay: config.notification_max_delay,
                        status_code: DcEvseStatusCode::Ready,
                    },
                }
            }
            Body::WeldingDetectionReq => {
                self.stage = Stage::SessionStop;
                let voltage = self.ev_target_voltage.unwrap_or(
                    crate::exi::iso::PhysicalValue::new(0, 0, crate::exi::iso::Unit::Volt).unwrap(),
                );
                info!(target: "secc::trace", "WeldingDetectionReq -> WeldingDetectionRes");
                Body::WeldingDetectionRes {
                    response_code: ResponseCode::Ok,
                    evse_present_voltage: voltage,
                    dc_evse_status: DcEvseStatus {
                        notification: EvseNotification::None,
                        notification_max_delay: config.notification_max_delay,
                        status_code: DcEvseStatusCode::NotReady,
                    },
                }
            }
            Body::SessionStopReq => {
                info!(target: "secc::trace", "SessionStopReq -> SessionStopRes");
                Body::SessionStopRes {
                    response_code: ResponseCode::Ok,
                }
            }
            Body::Unhandled(kind) => {
                warn!(?kind, "deliberately unhandled ISO body; dropping frame");
                return Ok(None);
            }
            // Response variants never arrive inbound; treat defensively
            // as an ignored frame rather than panicking.
            _ => {
                warn!("received a response-shaped body from the peer; dropping frame");
                return Ok(None);
            }
        };

        // Header echo rule: if we haven't set an outbound SessionID
        // ourselves (only SessionSetupRes does), and the peer sent one,
        // copy it verbatim.
        if outbound_session_id.is_empty() && !msg.header.session_id.is_empty() {
            outbound_session_id = msg.header.session_id.clone();
        }

        Ok(Some(V2GMessage {
            header: MessageHeader {
                session_id: outbound_session_id,
            },
            body,
        }))
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exi::iso::{PhysicalValue, Unit};

    fn config() -> StationConfig {
        StationConfig::default()
    }

    #[test]
    fn session_setup_generates_nonzero_session_id() {
        let mut session = Session::new();
        let mut rng = SessionRng::init().unwrap();
        let req = V2GMessage {
            header: MessageHeader { session_id: vec![] },
            body: Body::SessionSetupReq { evccid: vec![1; 6] },
        };
        let res = session.handle_iso(&req, &config(), &mut rng).unwrap().unwrap();
        assert_eq!(res.header.session_id.len(), 8);
        assert_ne!(res.header.session_id, vec![0; 8]);
        match res.body {
            Body::SessionSetupRes { response_code, evseid } => {
                assert_eq!(response_code, ResponseCode::Ok);
                assert_eq!(evseid, "ZZ00000");
            }
            other => panic!("unexpected body {other:?}"),
        }
    }

    #[test]
    fn session_id_persists_across_subsequent_messages() {
        let mut session = Session::new();
        let mut rng = SessionRng::init().unwrap();
        let setup = session
            .handle_iso(
                &V2GMessage {
                    header: MessageHeader { session_id: vec![] },
                    body: Body::SessionSetupReq { evccid: vec![] },
                },
                &config(),
                &mut rng,
            )
            .unwrap()
            .unwrap();
        let sid = setup.header.session_id.clone();

        let discovery = session
            .handle_iso(
                &V2GMessage {
                    header: MessageHeader {
                        session_id: sid.clone(),
                    },
                    body: Body::ServiceDiscoveryReq,
                },
                &config(),
                &mut rng,
            )
            .unwrap()
            .unwrap();
        assert_eq!(discovery.header.session_id, sid);
    }

    #[test]
    fn charge_parameter_discovery_rejects_wrong_mode() {
        let mut session = Session::new();
        let mut rng = SessionRng::init().unwrap();
        let res = session
            .handle_iso(
                &V2GMessage {
                    header: MessageHeader { session_id: vec![1; 8] },
                    body: Body::ChargeParameterDiscoveryReq {
                        requested_energy_transfer_mode: EnergyTransferMode::DcCore,
                    },
                },
                &config(),
                &mut rng,
            )
            .unwrap()
            .unwrap();
        match res.body {
            Body::ChargeParameterDiscoveryRes { response_code, .. } => {
                assert_eq!(response_code, ResponseCode::FailedWrongEnergyTransferMode);
            }
            other => panic!("unexpected body {other:?}"),
        }
    }

    #[test]
    fn pre_charge_echoes_target_voltage() {
        let mut session = Session::new();
        let mut rng = SessionRng::init().unwrap();
        let v = PhysicalValue::new(400, 0, Unit::Volt).unwrap();
        let c = PhysicalValue::new(10, 0, Unit::Ampere).unwrap();
        let res = session
            .handle_iso(
                &V2GMessage {
                    header: MessageHeader { session_id: vec![1; 8] },
                    body: Body::PreChargeReq {
                        ev_target_voltage: v,
                        ev_target_current: c,
                    },
                },
                &config(),
                &mut rng,
            )
            .unwrap()
            .unwrap();
        match res.body {
            Body::PreChargeRes {
                evse_present_voltage, ..
            } => assert_eq!(evse_present_voltage, v),
            other => panic!("unexpected body {other:?}"),
        }
        assert_eq!(session.ev_target_voltage, Some(v));
    }

    #[test]
    fn current_demand_echoes_targets_and_reports_ready() {
        let mut session = Session::new();
        let mut rng = SessionRng::init().unwrap();
        let v = PhysicalValue::new(400, 0, Unit::Volt).unwrap();
        let c = PhysicalValue::new(50, 0, Unit::Ampere).unwrap();
        let res = session
            .handle_iso(
                &V2GMessage {
                    header: MessageHeader { session_id: vec![1; 8] },
                    body: Body::CurrentDemandReq {
                        ev_target_voltage: v,
                        ev_target_current: c,
                    },
                },
                &config(),
                &mut rng,
            )
            .unwrap()
            .unwrap();
        match res.body {
            Body::CurrentDemandRes {
                evse_present_voltage,
                evse_present_current,
                dc_evse_status,
                ..
            } => {
                assert_eq!(evse_present_voltage, v);
                assert_eq!(evse_present_current, c);
                assert_eq!(dc_evse_status.status_code, DcEvseStatusCode::Ready);
            }
            other => panic!("unexpected body {other:?}"),
        }
    }

    #[test]
    fn unhandled_bodies_drop_silently() {
        let mut session = Session::new();
        let mut rng = SessionRng::init().unwrap();
        let res = session.handle_iso(
            &V2GMessage {
                header: MessageHeader { session_id: vec![] },
                body: Body::Unhandled(UnhandledKind::MeteringReceiptReq),
            },
            &config(),
            &mut rng,
        );
        assert!(res.unwrap().is_none());
    }

    #[test]
    fn handshake_rejects_unsupported_namespace() {
        let mut session = Session::new();
        let req = SupportedAppProtocolReq {
            protocols: vec![crate::exi::handshake::AppProtocol {
                namespace: "urn:iso:15118:2:2010:MsgDef".to_string(),
                schema_id: 0,
                priority: 1,
            }],
        };
        assert!(session.handle_handshake(&req, &config()).is_none());
        assert!(session.handshake_pending);
    }

    #[test]
    fn handshake_accepts_matching_namespace() {
        let mut session = Session::new();
        let req = SupportedAppProtocolReq {
            protocols: vec![crate::exi::handshake::AppProtocol {
                namespace: crate::exi::handshake::ISO_15118_2_2013_NAMESPACE.to_string(),
                schema_id: 3,
                priority: 1,
            }],
        };
        let res = session.handle_handshake(&req, &config()).unwrap();
        assert_eq!(res.schema_id, Some(3));
        assert!(!session.handshake_pending);
    }
}
