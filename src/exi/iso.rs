//! The ISO 15118-2 `V2G_Message` document family: the session-state-machine
//! body messages exchanged after the application handshake completes.

use super::stream::{Reader, Writer};
use crate::error::CodecError;

const MAX_SESSION_ID_LEN: usize = 8;
const MAX_ID_STRING_LEN: usize = 255;

/// A physical quantity encoded as `value * 10^multiplier` in `unit`,
/// matching ISO 15118-2's `PhysicalValueType`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhysicalValue {
    pub value: i16,
    pub multiplier: i8,
    pub unit: Unit,
}

impl PhysicalValue {
    pub fn new(value: i16, multiplier: i8, unit: Unit) -> Result<Self, CodecError> {
        if !(-3..=3).contains(&multiplier) {
            return Err(CodecError::MultiplierOutOfRange(multiplier));
        }
        Ok(Self {
            value,
            multiplier,
            unit,
        })
    }

    /// Convenience conversion to base SI units; used only by logging/tests,
    /// never by dispatch (dispatch echoes the triple verbatim).
    pub fn as_base_units(&self) -> f64 {
        self.value as f64 * 10f64.powi(self.multiplier as i32)
    }

    fn read(r: &mut Reader) -> Result<Self, CodecError> {
        let multiplier = r.read_i8()?;
        let unit = Unit::from_u8(r.read_u8()?)?;
        let value = r.read_i16()?;
        Self::new(value, multiplier, unit)
    }

    fn write(&self, w: &mut Writer) -> Result<(), CodecError> {
        w.write_i8(self.multiplier)?;
        w.write_u8(self.unit.to_u8())?;
        w.write_i16(self.value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    Ampere,
    Volt,
    Watt,
    WattHour,
}

impl Unit {
    fn to_u8(self) -> u8 {
        match self {
            Unit::Ampere => 0,
            Unit::Volt => 1,
            Unit::Watt => 2,
            Unit::WattHour => 3,
        }
    }

    fn from_u8(v: u8) -> Result<Self, CodecError> {
        match v {
            0 => Ok(Unit::Ampere),
            1 => Ok(Unit::Volt),
            2 => Ok(Unit::Watt),
            3 => Ok(Unit::WattHour),
            other => Err(CodecError::UnknownDiscriminant {
                field: "Unit",
                value: other as u32,
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseCode {
    Ok,
    OkNewSessionEstablished,
    OkOldSessionJoined,
    Failed,
    FailedSequenceError,
    FailedUnknownSession,
    FailedWrongEnergyTransferMode,
    FailedChallengeInvalid,
    FailedContactorError,
    FailedWrongChargeParameter,
}

impl ResponseCode {
    fn to_u8(self) -> u8 {
        match self {
            Self::Ok => 0,
            Self::OkNewSessionEstablished => 1,
            Self::OkOldSessionJoined => 2,
            Self::Failed => 3,
            Self::FailedSequenceError => 4,
            Self::FailedUnknownSession => 5,
            Self::FailedWrongEnergyTransferMode => 6,
            Self::FailedChallengeInvalid => 7,
            Self::FailedContactorError => 8,
            Self::FailedWrongChargeParameter => 9,
        }
    }

    fn from_u8(v: u8) -> Result<Self, CodecError> {
        Ok(match v {
            0 => Self::Ok,
            1 => Self::OkNewSessionEstablished,
            2 => Self::OkOldSessionJoined,
            3 => Self::Failed,
            4 => Self::FailedSequenceError,
            5 => Self::FailedUnknownSession,
            6 => Self::FailedWrongEnergyTransferMode,
            7 => Self::FailedChallengeInvalid,
            8 => Self::FailedContactorError,
            9 => Self::FailedWrongChargeParameter,
            other => {
                return Err(CodecError::UnknownDiscriminant {
                    field: "ResponseCode",
                    value: other as u32,
                })
            }
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvseProcessing {
    Finished,
    Ongoing,
}

impl EvseProcessing {
    fn to_u8(self) -> u8 {
        matches!(self, Self::Ongoing) as u8
    }
    fn from_u8(v: u8) -> Result<Self, CodecError> {
        match v {
            0 => Ok(Self::Finished),
            1 => Ok(Self::Ongoing),
            other => Err(CodecError::UnknownDiscriminant {
                field: "EVSEProcessing",
                value: other as u32,
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnergyTransferMode {
    AcSinglePhaseCore,
    AcThreePhaseCore,
    DcCore,
    DcExtended,
    DcCombo,
    DcUnique,
}

impl EnergyTransferMode {
    fn to_u8(self) -> u8 {
        match self {
            Self::AcSinglePhaseCore => 0,
            Self::AcThreePhaseCore => 1,
            Self::DcCore => 2,
            Self::DcExtended => 3,
            Self::DcCombo => 4,
            Self::DcUnique => 5,
        }
    }
    fn from_u8(v: u8) -> Result<Self, CodecError> {
        Ok(match v {
            0 => Self::AcSinglePhaseCore,
            1 => Self::AcThreePhaseCore,
            2 => Self::DcCore,
            3 => Self::DcExtended,
            4 => Self::DcCombo,
            5 => Self::DcUnique,
            other => {
                return Err(CodecError::UnknownDiscriminant {
                    field: "EnergyTransferMode",
                    value: other as u32,
                })
            }
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentOption {
    ExternalPayment,
    Contract,
}

impl PaymentOption {
    fn to_u8(self) -> u8 {
        matches!(self, Self::Contract) as u8
    }
    fn from_u8(v: u8) -> Result<Self, CodecError> {
        match v {
            0 => Ok(Self::ExternalPayment),
            1 => Ok(Self::Contract),
            other => Err(CodecError::UnknownDiscriminant {
                field: "PaymentOption",
                value: other as u32,
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceCategory {
    EvCharging,
}

impl ServiceCategory {
    fn to_u8(self) -> u8 {
        0
    }
    fn from_u8(v: u8) -> Result<Self, CodecError> {
        match v {
            0 => Ok(Self::EvCharging),
            other => Err(CodecError::UnknownDiscriminant {
                field: "ServiceCategory",
                value: other as u32,
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvseNotification {
    None,
    StopCharging,
    ReNegotiation,
}

impl EvseNotification {
    fn to_u8(self) -> u8 {
        match self {
            Self::None => 0,
            Self::StopCharging => 1,
            Self::ReNegotiation => 2,
        }
    }
    fn from_u8(v: u8) -> Result<Self, CodecError> {
        Ok(match v {
            0 => Self::None,
            1 => Self::StopCharging,
            2 => Self::ReNegotiation,
            other => {
                return Err(CodecError::UnknownDiscriminant {
                    field: "EVSENotification",
                    value: other as u32,
                })
            }
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DcEvseStatusCode {
    NotReady,
    Ready,
    Shutdown,
    UtilityInterruptEvent,
    IsolationMonitoringActive,
    EmergencyShutdown,
    Malfunction,
}

impl DcEvseStatusCode {
    fn to_u8(self) -> u8 {
        match self {
            Self::NotReady => 0,
            Self::Ready => 1,
            Self::Shutdown => 2,
            Self::UtilityInterruptEvent => 3,
            Self::IsolationMonitoringActive => 4,
            Self::EmergencyShutdown => 5,
            Self::Malfunction => 6,
        }
    }
    fn from_u8(v: u8) -> Result<Self, CodecError> {
        Ok(match v {
            0 => Self::NotReady,
            1 => Self::Ready,
            2 => Self::Shutdown,
            3 => Self::UtilityInterruptEvent,
            4 => Self::IsolationMonitoringActive,
            5 => Self::EmergencyShutdown,
            6 => Self::Malfunction,
            other => {
                return Err(CodecError::UnknownDiscriminant {
                    field: "DC_EVSEStatusCode",
                    value: other as u32,
                })
            }
        })
    }
}

/// Generic (AC-style) `EVSEStatus`, used by `PowerDeliveryRes` per Open
/// Question (a): the reference implementation populates this field rather
/// than `DC_EVSEStatus` for `PowerDeliveryRes`, and this crate reproduces
/// that literally rather than guessing at intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvseStatus {
    pub notification: EvseNotification,
    pub notification_max_delay: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DcEvseStatus {
    pub notification: EvseNotification,
    pub notification_max_delay: u16,
    pub status_code: DcEvseStatusCode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DcEvseChargeParameter {
    pub evse_maximum_current_limit: PhysicalValue,
    pub evse_maximum_power_limit: PhysicalValue,
    pub evse_maximum_voltage_limit: PhysicalValue,
    pub evse_minimum_current_limit: PhysicalValue,
    pub evse_minimum_voltage_limit: PhysicalValue,
    pub evse_peak_current_ripple: PhysicalValue,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChargeService {
    pub service_id: u16,
    pub service_category: ServiceCategory,
    pub free_service: bool,
    pub supported_energy_transfer_mode: Vec<EnergyTransferMode>,
}

/// Opaque V2GTP-level header fields carried by every ISO message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageHeader {
    pub session_id: Vec<u8>,
}

/// The deliberately-unhandled request kinds: recognized on the wire (so
/// the frame can be logged and dropped rather than treated as a decode
/// error) but never given a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnhandledKind {
    ServiceDetailReq,
    MeteringReceiptReq,
    CertificateUpdateReq,
    CertificateInstallationReq,
    ChargingStatusReq,
}

impl UnhandledKind {
    fn to_u8(self) -> u8 {
        match self {
            Self::ServiceDetailReq => 1,
            Self::MeteringReceiptReq => 2,
            Self::CertificateUpdateReq => 3,
            Self::CertificateInstallationReq => 4,
            Self::ChargingStatusReq => 5,
        }
    }
    fn from_u8(v: u8) -> Result<Self, CodecError> {
        Ok(match v {
            1 => Self::ServiceDetailReq,
            2 => Self::MeteringReceiptReq,
            3 => Self::CertificateUpdateReq,
            4 => Self::CertificateInstallationReq,
            5 => Self::ChargingStatusReq,
            other => {
                return Err(CodecError::UnknownDiscriminant {
                    field: "UnhandledKind",
                    value: other as u32,
                })
            }
        })
    }
}

/// The tagged body union. One variant per ISO 15118-2 message kind this
/// EVSE core understands, replacing the source's per-field `_isUsed` flags
/// (see `DESIGN.md`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
    SessionSetupReq { evccid: Vec<u8> },
    SessionSetupRes { response_code: ResponseCode, evseid: String },
    ServiceDiscoveryReq,
    ServiceDiscoveryRes {
        response_code: ResponseCode,
        payment_options: Vec<PaymentOption>,
        charge_service: ChargeService,
    },
    PaymentServiceSelectionReq { selected_payment_option: PaymentOption },
    PaymentServiceSelectionRes { response_code: ResponseCode },
    PaymentDetailsReq { emaid: String },
    PaymentDetailsRes { response_code: ResponseCode },
    AuthorizationReq,
    AuthorizationRes {
        response_code: ResponseCode,
        evse_processing: EvseProcessing,
    },
    ChargeParameterDiscoveryReq { requested_energy_transfer_mode: EnergyTransferMode },
    ChargeParameterDiscoveryRes {
        response_code: ResponseCode,
        evse_processing: EvseProcessing,
        dc_charge_parameter: DcEvseChargeParameter,
    },
    CableCheckReq,
    CableCheckRes {
        response_code: ResponseCode,
        evse_processing: EvseProcessing,
        dc_evse_status: DcEvseStatus,
    },
    PreChargeReq {
        ev_target_voltage: PhysicalValue,
        ev_target_current: PhysicalValue,
    },
    PreChargeRes {
        response_code: ResponseCode,
        evse_present_voltage: PhysicalValue,
        dc_evse_status: DcEvseStatus,
    },
    PowerDeliveryReq { ready_to_charge: bool },
    PowerDeliveryRes {
        response_code: ResponseCode,
        evse_status: EvseStatus,
    },
    CurrentDemandReq {
        ev_target_voltage: PhysicalValue,
        ev_target_current: PhysicalValue,
    },
    CurrentDemandRes {
        response_code: ResponseCode,
        evse_present_voltage: PhysicalValue,
        evse_present_current: PhysicalValue,
        dc_evse_status: DcEvseStatus,
    },
    WeldingDetectionReq,
    WeldingDetectionRes {
        response_code: ResponseCode,
        evse_present_voltage: PhysicalValue,
        dc_evse_status: DcEvseStatus,
    },
    SessionStopReq,
    SessionStopRes { response_code: ResponseCode },
    /// Recognized but intentionally not replied to; see `spec.md` §4.3.
    Unhandled(UnhandledKind),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct V2GMessage {
    pub header: MessageHeader,
    pub body: Body,
}

// Body tags. 1xx requests, 2xx responses, 99 unhandled.
mod tag {
    pub const SESSION_SETUP_REQ: u8 = 1;
    pub const SESSION_SETUP_RES: u8 = 2;
    pub const SERVICE_DISCOVERY_REQ: u8 = 3;
    pub const SERVICE_DISCOVERY_RES: u8 = 4;
    pub const PAYMENT_SERVICE_SELECTION_REQ: u8 = 5;
    pub const PAYMENT_SERVICE_SELECTION_RES: u8 = 6;
    pub const PAYMENT_DETAILS_REQ: u8 = 7;
    pub const PAYMENT_DETAILS_RES: u8 = 8;
    pub const AUTHORIZATION_REQ: u8 = 9;
    pub const AUTHORIZATION_RES: u8 = 10;
    pub const CHARGE_PARAMETER_DISCOVERY_REQ: u8 = 11;
    pub const CHARGE_PARAMETER_DISCOVERY_RES: u8 = 12;
    pub const CABLE_CHECK_REQ: u8 = 13;
    pub const CABLE_CHECK_RES: u8 = 14;
    pub const PRE_CHARGE_REQ: u8 = 15;
    pub const PRE_CHARGE_RES: u8 = 16;
    pub const POWER_DELIVERY_REQ: u8 = 17;
    pub const POWER_DELIVERY_RES: u8 = 18;
    pub const CURRENT_DEMAND_REQ: u8 = 19;
    pub const CURRENT_DEMAND_RES: u8 = 20;
    pub const WELDING_DETECTION_REQ: u8 = 21;
    pub const WELDING_DETECTION_RES: u8 = 22;
    pub const SESSION_STOP_REQ: u8 = 23;
    pub const SESSION_STOP_RES: u8 = 24;
    pub const UNHANDLED: u8 = 99;
}

fn write_dc_evse_status(w: &mut Writer, s: &DcEvseStatus) -> Result<(), CodecError> {
    w.write_u8(s.notification.to_u8())?;
    w.write_u16(s.notification_max_delay)?;
    w.write_u8(s.status_code.to_u8())
}

fn read_dc_evse_status(r: &mut Reader) -> Result<DcEvseStatus, CodecError> {
    let notification = EvseNotification::from_u8(r.read_u8()?)?;
    let notification_max_delay = r.read_u16()?;
    let status_code = DcEvseStatusCode::from_u8(r.read_u8()?)?;
    Ok(DcEvseStatus {
        notification,
        notification_max_delay,
        status_code,
    })
}

fn write_dc_charge_parameter(w: &mut Writer, p: &DcEvseChargeParameter) -> Result<(), CodecError> {
    p.evse_maximum_current_limit.write(w)?;
    p.evse_maximum_power_limit.write(w)?;
    p.evse_maximum_voltage_limit.write(w)?;
    p.evse_minimum_current_limit.write(w)?;
    p.evse_minimum_voltage_limit.write(w)?;
    p.evse_peak_current_ripple.write(w)
}

fn read_dc_charge_parameter(r: &mut Reader) -> Result<DcEvseChargeParameter, CodecError> {
    Ok(DcEvseChargeParameter {
        evse_maximum_current_limit: PhysicalValue::read(r)?,
        evse_maximum_power_limit: PhysicalValue::read(r)?,
        evse_maximum_voltage_limit: PhysicalValue::read(r)?,
        evse_minimum_current_limit: PhysicalValue::read(r)?,
        evse_minimum_voltage_limit: PhysicalValue::read(r)?,
        evse_peak_current_ripple: PhysicalValue::read(r)?,
    })
}

pub fn decode(buf: &[u8]) -> Result<V2GMessage, CodecError> {
    let mut r = Reader::new(buf);
    let session_id = r.read_byte_string("SessionID", MAX_SESSION_ID_LEN)?;
    let header = MessageHeader { session_id };

    let body = match r.read_u8()? {
        tag::SESSION_SETUP_REQ => Body::SessionSetupReq {
            evccid: r.read_byte_string("EVCCID", 32)?,
        },
        tag::SESSION_SETUP_RES => Body::SessionSetupRes {
            response_code: ResponseCode::from_u8(r.read_u8()?)?,
            evseid: r.read_string("EVSEID", MAX_ID_STRING_LEN)?,
        },
        tag::SERVICE_DISCOVERY_REQ => Body::ServiceDiscoveryReq,
        tag::SERVICE_DISCOVERY_RES => {
            let response_code = ResponseCode::from_u8(r.read_u8()?)?;
            let n_options = r.read_u8()? as usize;
            let mut payment_options = Vec::with_capacity(n_options);
            for _ in 0..n_options {
                payment_options.push(PaymentOption::from_u8(r.read_u8()?)?);
            }
            let service_id = r.read_u16()?;
            let service_category = ServiceCategory::from_u8(r.read_u8()?)?;
            let free_service = r.read_bool()?;
            let n_modes = r.read_u8()? as usize;
            let mut modes = Vec::with_capacity(n_modes);
            for _ in 0..n_modes {
                modes.push(EnergyTransferMode::from_u8(r.read_u8()?)?);
            }
            Body::ServiceDiscoveryRes {
                response_code,
                payment_options,
                charge_service: ChargeService {
                    service_id,
                    service_category,
                    free_service,
                    supported_energy_transfer_mode: modes,
                },
            }
        }
        tag::PAYMENT_SERVICE_SELECTION_REQ => Body::PaymentServiceSelectionReq {
            selected_payment_option: PaymentOption::from_u8(r.read_u8()?)?,
        },
        tag::PAYMENT_SERVICE_SELECTION_RES => Body::PaymentServiceSelectionRes {
            response_code: ResponseCode::from_u8(r.read_u8()?)?,
        },
        tag::PAYMENT_DETAILS_REQ => Body::PaymentDetailsReq {
            emaid: r.read_string("EMAID", MAX_ID_STRING_LEN)?,
        },
        tag::PAYMENT_DETAILS_RES => Body::PaymentDetailsRes {
            response_code: ResponseCode::from_u8(r.read_u8()?)?,
        },
        tag::AUTHORIZATION_REQ => Body::AuthorizationReq,
        tag::AUTHORIZATION_RES => Body::AuthorizationRes {
            response_code: ResponseCode::from_u8(r.read_u8()?)?,
            evse_processing: EvseProcessing::from_u8(r.read_u8()?)?,
        },
        tag::CHARGE_PARAMETER_DISCOVERY_REQ => Body::ChargeParameterDiscoveryReq {
            requested_energy_transfer_mode: EnergyTransferMode::from_u8(r.read_u8()?)?,
        },
        tag::CHARGE_PARAMETER_DISCOVERY_RES => Body::ChargeParameterDiscoveryRes {
            response_code: ResponseCode::from_u8(r.read_u8()?)?,
            evse_processing: EvseProcessing::from_u8(r.read_u8()?)?,
            dc_charge_parameter: read_dc_charge_parameter(&mut r)?,
        },
        tag::CABLE_CHECK_REQ => Body::CableCheckReq,
        tag::CABLE_CHECK_RES => Body::CableCheckRes {
            response_code: ResponseCode::from_u8(r.read_u8()?)?,
            evse_processing: EvseProcessing::from_u8(r.read_u8()?)?,
            dc_evse_status: read_dc_evse_status(&mut r)?,
        },
        tag::PRE_CHARGE_REQ => Body::PreChargeReq {
            ev_target_voltage: PhysicalValue::read(&mut r)?,
            ev_target_current: PhysicalValue::read(&mut r)?,
        },
        tag::PRE_CHARGE_RES => Body::PreChargeRes {
            response_code: ResponseCode::from_u8(r.read_u8()?)?,
            evse_present_voltage: PhysicalValue::read(&mut r)?,
            dc_evse_status: read_dc_evse_status(&mut r)?,
        },
        tag::POWER_DELIVERY_REQ => Body::PowerDeliveryReq {
            ready_to_charge: r.read_bool()?,
        },
        tag::POWER_DELIVERY_RES => {
            let response_code = ResponseCode::from_u8(r.read_u8()?)?;
            let notification = EvseNotification::from_u8(r.read_u8()?)?;
            let notification_max_delay = r.read_u16()?;
            Body::PowerDeliveryRes {
                response_code,
                evse_status: EvseStatus {
                    notification,
                    notification_max_delay,
                },
            }
        }
        tag::CURRENT_DEMAND_REQ => Body::CurrentDemandReq {
            ev_target_voltage: PhysicalValue::read(&mut r)?,
            ev_target_current: PhysicalValue::read(&mut r)?,
        },
        tag::CURRENT_DEMAND_RES => Body::CurrentDemandRes {
            response_code: ResponseCode::from_u8(r.read_u8()?)?,
            evse_present_voltage: PhysicalValue::read(&mut r)?,
            evse_present_current: PhysicalValue::read(&mut r)?,
            dc_evse_status: read_dc_evse_status(&mut r)?,
        },
        tag::WELDING_DETECTION_REQ => Body::WeldingDetectionReq,
        tag::WELDING_DETECTION_RES => Body::WeldingDetectionRes {
            response_code: ResponseCode::from_u8(r.read_u8()?)?,
            evse_present_voltage: PhysicalValue::read(&mut r)?,
            dc_evse_status: read_dc_evse_status(&mut r)?,
        },
        tag::SESSION_STOP_REQ => Body::SessionStopReq,
        tag::SESSION_STOP_RES => Body::SessionStopRes {
            response_code: ResponseCode::from_u8(r.read_u8()?)?,
        },
        tag::UNHANDLED => Body::Unhandled(UnhandledKind::from_u8(r.read_u8()?)?),
        other => {
            return Err(CodecError::UnknownDiscriminant {
                field: "Body",
                value: other as u32,
            })
        }
    };

    Ok(V2GMessage { header, body })
}

pub fn encode(buf: &mut [u8], at: usize, doc: &V2GMessage) -> Result<usize, CodecError> {
    let mut w = Writer::at(buf, at);
    w.write_byte_string(&doc.header.session_id)?;

    match &doc.body {
        Body::SessionSetupReq { evccid } => {
            w.write_u8(tag::SESSION_SETUP_REQ)?;
            w.write_byte_string(evccid)?;
        }
        Body::SessionSetupRes { response_code, evseid } => {
            w.write_u8(tag::SESSION_SETUP_RES)?;
            w.write_u8(response_code.to_u8())?;
            w.write_string(evseid)?;
        }
        Body::ServiceDiscoveryReq => {
            w.write_u8(tag::SERVICE_DISCOVERY_REQ)?;
        }
        Body::ServiceDiscoveryRes {
            response_code,
            payment_options,
            charge_service,
        } => {
            w.write_u8(tag::SERVICE_DISCOVERY_RES)?;
            w.write_u8(response_code.to_u8())?;
            w.write_u8(payment_options.len() as u8)?;
            for opt in payment_options {
                w.write_u8(opt.to_u8())?;
            }
            w.write_u16(charge_service.service_id)?;
            w.write_u8(charge_service.service_category.to_u8())?;
            w.write_bool(charge_service.free_service)?;
            w.write_u8(charge_service.supported_energy_transfer_mode.len() as u8)?;
            for mode in &charge_service.supported_energy_transfer_mode {
                w.write_u8(mode.to_u8())?;
            }
        }
        Body::PaymentServiceSelectionReq { selected_payment_option } => {
            w.write_u8(tag::PAYMENT_SERVICE_SELECTION_REQ)?;
            w.write_u8(selected_payment_option.to_u8())?;
        }
        Body::PaymentServiceSelectionRes { response_code } => {
            w.write_u8(tag::PAYMENT_SERVICE_SELECTION_RES)?;
            w.write_u8(response_code.to_u8())?;
        }
        Body::PaymentDetailsReq { emaid } => {
            w.write_u8(tag::PAYMENT_DETAILS_REQ)?;
            w.write_string(emaid)?;
        }
        Body::PaymentDetailsRes { response_code } => {
            w.write_u8(tag::PAYMENT_DETAILS_RES)?;
            w.write_u8(response_code.to_u8())?;
        }
        Body::AuthorizationReq => {
            w.write_u8(tag::AUTHORIZATION_REQ)?;
        }
        Body::AuthorizationRes {
            response_code,
            evse_processing,
        } => {
            w.write_u8(tag::AUTHORIZATION_RES)?;
            w.write_u8(response_code.to_u8())?;
            w.write_u8(evse_processing.to_u8())?;
        }
        Body::ChargeParameterDiscoveryReq {
            requested_energy_transfer_mode,
        } => {
            w.write_u8(tag::CHARGE_PARAMETER_DISCOVERY_REQ)?;
            w.write_u8(requested_energy_transfer_mode.to_u8())?;
        }
        Body::ChargeParameterDiscoveryRes {
            response_code,
            evse_processing,
            dc_charge_parameter,
        } => {
            w.write_u8(tag::CHARGE_PARAMETER_DISCOVERY_RES)?;
            w.write_u8(response_code.to_u8())?;
            w.write_u8(evse_processing.to_u8())?;
            write_dc_charge_parameter(&mut w, dc_charge_parameter)?;
        }
        Body::CableCheckReq => {
            w.write_u8(tag::CABLE_CHECK_REQ)?;
        }
        Body::CableCheckRes {
            response_code,
            evse_processing,
            dc_evse_status,
        } => {
            w.write_u8(tag::CABLE_CHECK_RES)?;
            w.write_u8(response_code.to_u8())?;
            w.write_u8(evse_processing.to_u8())?;
            write_dc_evse_status(&mut w, dc_evse_status)?;
        }
        Body::PreChargeReq {
            ev_target_voltage,
            ev_target_current,
        } => {
            w.write_u8(tag::PRE_CHARGE_REQ)?;
            ev_target_voltage.write(&mut w)?;
            ev_target_current.write(&mut w)?;
        }
        Body::PreChargeRes {
            response_code,
            evse_present_voltage,
            dc_evse_status,
        } => {
            w.write_u8(tag::PRE_CHARGE_RES)?;
            w.write_u8(response_code.to_u8())?;
            evse_present_voltage.write(&mut w)?;
            write_dc_evse_status(&mut w, dc_evse_status)?;
        }
        Body::PowerDeliveryReq { ready_to_charge } => {
            w.write_u8(tag::POWER_DELIVERY_REQ)?;
            w.write_bool(*ready_to_charge)?;
        }
        Body::PowerDeliveryRes {
            response_code,
            evse_status,
        } => {
            w.write_u8(tag::POWER_DELIVERY_RES)?;
            w.write_u8(response_code.to_u8())?;
            w.write_u8(evse_status.notification.to_u8())?;
            w.write_u16(evse_status.notification_max_delay)?;
        }
        Body::CurrentDemandReq {
            ev_target_voltage,
            ev_target_current,
        } => {
            w.write_u8(tag::CURRENT_DEMAND_REQ)?;
            ev_target_voltage.write(&mut w)?;
            ev_target_current.write(&mut w)?;
        }
        Body::CurrentDemandRes {
            response_code,
            evse_present_voltage,
            evse_present_current,
            dc_evse_status,
        } => {
            w.write_u8(tag::CURRENT_DEMAND_RES)?;
            w.write_u8(response_code.to_u8())?;
            evse_present_voltage.write(&mut w)?;
            evse_present_current.write(&mut w)?;
            write_dc_evse_status(&mut w, dc_evse_status)?;
        }
        Body::WeldingDetectionReq => {
            w.write_u8(tag::WELDING_DETECTION_REQ)?;
        }
        Body::WeldingDetectionRes {
            response_code,
            evse_present_voltage,
            dc_evse_status,
        } => {
            w.write_u8(tag::WELDING_DETECTION_RES)?;
            w.write_u8(response_code.to_u8())?;
            evse_present_voltage.write(&mut w)?;
            write_dc_evse_status(&mut w, dc_evse_status)?;
        }
        Body::SessionStopReq => {
            w.write_u8(tag::SESSION_STOP_REQ)?;
        }
        Body::SessionStopRes { response_code } => {
            w.write_u8(tag::SESSION_STOP_RES)?;
            w.write_u8(response_code.to_u8())?;
        }
        Body::Unhandled(kind) => {
            w.write_u8(tag::UNHANDLED)?;
            w.write_u8(kind.to_u8())?;
        }
    }

    Ok(w.position() - at)
}
