//! Immutable station configuration.
//!
//! Constructed once at startup and passed by reference into the SDP
//! responder and the session engine; see `spec.md` §9 "Design Notes" and
//! `SPEC_FULL.md` §2.

use crate::exi::iso::{DcEvseChargeParameter, PhysicalValue, Unit};

/// The DC charge envelope this EVSE advertises during charge-parameter
/// discovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChargeEnvelope {
    pub max_current: PhysicalValue,
    pub max_power: PhysicalValue,
    pub max_voltage: PhysicalValue,
    pub min_current: PhysicalValue,
    pub min_voltage: PhysicalValue,
    pub peak_current_ripple: PhysicalValue,
}

impl Default for ChargeEnvelope {
    fn default() -> Self {
        Self {
            max_current: PhysicalValue::new(3, 0, Unit::Ampere).unwrap(),
            max_power: PhysicalValue::new(2, 3, Unit::Watt).unwrap(),
            max_voltage: PhysicalValue::new(9, 2, Unit::Volt).unwrap(),
            min_current: PhysicalValue::new(0, 0, Unit::Ampere).unwrap(),
            min_voltage: PhysicalValue::new(15, 1, Unit::Volt).unwrap(),
            peak_current_ripple: PhysicalValue::new(0, 0, Unit::Ampere).unwrap(),
        }
    }
}

impl ChargeEnvelope {
    /// Render as the `DC_EVSEChargeParameter` sent in
    /// `ChargeParameterDiscoveryRes`.
    pub fn as_dc_charge_parameter(&self) -> DcEvseChargeParameter {
        DcEvseChargeParameter {
            evse_maximum_current_limit: self.max_current,
            evse_maximum_power_limit: self.max_power,
            evse_maximum_voltage_limit: self.max_voltage,
            evse_minimum_current_limit: self.min_current,
            evse_minimum_voltage_limit: self.min_voltage,
            evse_peak_current_ripple: self.peak_current_ripple,
        }
    }
}

/// Immutable, process-wide station configuration.
#[derive(Debug, Clone)]
pub struct StationConfig {
    /// Network interface the SDP responder and TCP listener bind to.
    pub interface: String,
    /// Protocol namespace this EVSE negotiates during the app handshake.
    pub protocol_namespace: String,
    /// EVSE identifier string carried in `SessionSetupRes`.
    pub evse_id: String,
    /// `DC_EVSEStatus`/`EVSEStatus` notification max-delay, in seconds.
    pub notification_max_delay: u16,
    /// DC charge envelope advertised during parameter discovery.
    pub charge_envelope: ChargeEnvelope,
    /// TCP port the session engine listens on.
    pub tcp_port: u16,
    /// UDP port the SDP responder listens on.
    pub sdp_port: u16,
}

impl StationConfig {
    pub const DEFAULT_INTERFACE: &'static str = "seth0";
    pub const SDP_MULTICAST_GROUP: &'static str = "ff02::1";

    pub fn new(interface: impl Into<String>) -> Self {
        Self {
            interface: interface.into(),
            protocol_namespace: crate::exi::handshake::ISO_15118_2_2013_NAMESPACE.to_string(),
            evse_id: "ZZ00000".to_string(),
            notification_max_delay: 12,
            charge_envelope: ChargeEnvelope::default(),
            tcp_port: 51111,
            sdp_port: 15118,
        }
    }
}

impl Default for StationConfig {
    fn default() -> Self {
        Self::new(Self::DEFAULT_INTERFACE)
    }
}
