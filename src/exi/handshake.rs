//! The `supportedAppProtocol` handshake document family.
//!
//! This is the first frame exchanged after TCP accept: the EV proposes a
//! list of `(ProtocolNamespace, SchemaID)` pairs it supports, and the EVSE
//! replies with the one it selected (or sends nothing if none match).

use super::stream::{Reader, Writer};
use crate::error::CodecError;

const MAX_NAMESPACE_LEN: usize = 128;
const MAX_PROTOCOLS: usize = 16;

/// The ISO 15118-2:2013 protocol namespace this EVSE speaks.
pub const ISO_15118_2_2013_NAMESPACE: &str = "urn:iso:15118:2:2013:MsgDef";

/// One `(ProtocolNamespace, SchemaID)` entry offered by the EV.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppProtocol {
    pub namespace: String,
    pub schema_id: u8,
    pub priority: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupportedAppProtocolReq {
    pub protocols: Vec<AppProtocol>,
}

impl SupportedAppProtocolReq {
    /// Find the first offered protocol whose namespace matches exactly,
    /// returning its `SchemaID`.
    pub fn find_schema_id(&self, namespace: &str) -> Option<u8> {
        self.protocols
            .iter()
            .find(|p| p.namespace == namespace)
            .map(|p| p.schema_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeResponseCode {
    OkSuccessfulNegotiation,
    OkSuccessfulNegotiationWithMinorDeviation,
    FailedNoNegotiation,
}

impl HandshakeResponseCode {
    fn to_u8(self) -> u8 {
        match self {
            Self::OkSuccessfulNegotiation => 0,
            Self::OkSuccessfulNegotiationWithMinorDeviation => 1,
            Self::FailedNoNegotiation => 2,
        }
    }

    fn from_u8(v: u8) -> Result<Self, CodecError> {
        match v {
            0 => Ok(Self::OkSuccessfulNegotiation),
            1 => Ok(Self::OkSuccessfulNegotiationWithMinorDeviation),
            2 => Ok(Self::FailedNoNegotiation),
            other => Err(CodecError::UnknownDiscriminant {
                field: "HandshakeResponseCode",
                value: other as u32,
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupportedAppProtocolRes {
    pub response_code: HandshakeResponseCode,
    pub schema_id: Option<u8>,
}

/// The handshake document is one of the two messages of this exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandshakeDoc {
    Req(SupportedAppProtocolReq),
    Res(SupportedAppProtocolRes),
}

const TAG_REQ: u8 = 1;
const TAG_RES: u8 = 2;

pub fn decode(buf: &[u8]) -> Result<HandshakeDoc, CodecError> {
    let mut r = Reader::new(buf);
    match r.read_u8()? {
        TAG_REQ => {
            let count = r.read_u8()? as usize;
            if count > MAX_PROTOCOLS {
                return Err(CodecError::StringTooLong {
                    field: "AppProtocol.arrayLen",
                    max: MAX_PROTOCOLS,
                });
            }
            let mut protocols = Vec::with_capacity(count);
            for _ in 0..count {
                let namespace = r.read_string("ProtocolNamespace", MAX_NAMESPACE_LEN)?;
                let schema_id = r.read_u8()?;
                let priority = r.read_u8()?;
                protocols.push(AppProtocol {
                    namespace,
                    schema_id,
                    priority,
                });
            }
            Ok(HandshakeDoc::Req(SupportedAppProtocolReq { protocols }))
        }
        TAG_RES => {
            let response_code = HandshakeResponseCode::from_u8(r.read_u8()?)?;
            let has_schema = r.read_bool()?;
            let schema_id = if has_schema { Some(r.read_u8()?) } else { None };
            Ok(HandshakeDoc::Res(SupportedAppProtocolRes {
                response_code,
                schema_id,
            }))
        }
        other => Err(CodecError::UnknownDiscriminant {
            field: "HandshakeDoc",
            value: other as u32,
        }),
    }
}

pub fn encode(buf: &mut [u8], at: usize, doc: &HandshakeDoc) -> Result<usize, CodecError> {
    let mut w = Writer::at(buf, at);
    match doc {
        HandshakeDoc::Req(req) => {
            w.write_u8(TAG_REQ)?;
            w.write_u8(req.protocols.len() as u8)?;
            for p in &req.protocols {
                w.write_string(&p.namespace)?;
                w.write_u8(p.schema_id)?;
                w.write_u8(p.priority)?;
            }
        }
        HandshakeDoc::Res(res) => {
            w.write_u8(TAG_RES)?;
            w.write_u8(res.response_code.to_u8())?;
            w.write_bool(res.schema_id.is_some())?;
            if let Some(id) = res.schema_id {
                w.write_u8(id)?;
            }
        }
    }
    Ok(w.position() - at)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_req() {
        let doc = HandshakeDoc::Req(SupportedAppProtocolReq {
            protocols: vec![AppProtocol {
                namespace: ISO_15118_2_2013_NAMESPACE.to_string(),
                schema_id: 0,
                priority: 1,
            }],
        });
        let mut buf = [0u8; 256];
        let len = encode(&mut buf, 0, &doc).unwrap();
        let decoded = decode(&buf[..len]).unwrap();
        assert_eq!(decoded, doc);
    }

    #[test]
    fn round_trips_res() {
        let doc = HandshakeDoc::Res(SupportedAppProtocolRes {
            response_code: HandshakeResponseCode::OkSuccessfulNegotiation,
            schema_id: Some(0),
        });
        let mut buf = [0u8; 64];
        let len = encode(&mut buf, 0, &doc).unwrap();
        let decoded = decode(&buf[..len]).unwrap();
        assert_eq!(decoded, doc);
    }

    #[test]
    fn find_schema_id_matches_exact_namespace() {
        let req = SupportedAppProtocolReq {
            protocols: vec![
                AppProtocol {
                    namespace: "urn:iso:15118:2:2010:MsgDef".to_string(),
                    schema_id: 1,
                    priority: 1,
                },
                AppProtocol {
                    namespace: ISO_15118_2_2013_NAMESPACE.to_string(),
                    schema_id: 7,
                    priority: 2,
                },
            ],
        };
        assert_eq!(req.find_schema_id(ISO_15118_2_2013_NAMESPACE), Some(7));
        assert_eq!(req.find_schema_id("urn:iso:15118:2:2099:MsgDef"), None);
    }
}
