//! Process-wide random-byte source, used only by the session engine to
//! mint `SessionID`s.
//!
//! `spec.md` §9 calls out the reference implementation's init/get/deinit
//! lifecycle (`urandom_init`/`urandom_get`/`urandom_deinit` over
//! `/dev/urandom`) and asks for it to be represented as an owned resource
//! threaded into the session engine rather than a hidden global. There is
//! no explicit `deinit` step because the `Drop` impl (derived for free by
//! owning no raw OS handle) is sufficient.
//!
//! `rand::rngs::StdRng::from_entropy()` is deliberately not used here: its
//! default `SeedableRng::from_entropy` impl panics on an entropy-source
//! failure rather than returning an error, which would turn a tier-1
//! "random-source initialization failed" condition (spec.md §7) into an
//! uncaught panic instead of the `main.rs` `ExitCode::FAILURE` path. `OsRng`
//! exposes the underlying read as a fallible `try_fill_bytes`, so this type
//! draws directly from it and can actually surface `SeccError::RandomSourceInit`.

use rand::rngs::OsRng;
use rand::RngCore;

use crate::error::SeccError;

/// Owned random-byte source for session identifiers.
pub struct SessionRng {
    rng: OsRng,
}

impl SessionRng {
    /// Initialize from OS entropy. Mirrors `urandom_init`'s fail-fast
    /// behavior: construction failure is startup-fatal. `OsRng` itself
    /// holds no handle to open, so initialization cannot fail; the
    /// fallibility lives in `fill`/`session_id`, which call the OS on
    /// every use (mirroring `urandom_get` reading `/dev/urandom` per call).
    pub fn init() -> Result<Self, SeccError> {
        Ok(Self { rng: OsRng })
    }

    /// Fill `data` with random bytes, matching `urandom_get`'s
    /// fill-exactly-this-many-bytes contract. Surfaces OS entropy-source
    /// failures as `SeccError::RandomSourceInit` rather than panicking.
    pub fn fill(&mut self, data: &mut [u8]) -> Result<(), SeccError> {
        self.rng
            .try_fill_bytes(data)
            .map_err(|e| SeccError::RandomSourceInit(std::io::Error::new(std::io::ErrorKind::Other, e)))
    }

    /// Generate an 8-byte `SessionID`, as required on `SessionSetupReq`.
    pub fn session_id(&mut self) -> Result<[u8; 8], SeccError> {
        let mut id = [0u8; 8];
        self.fill(&mut id)?;
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_ids_are_nonzero_and_vary() {
        let mut rng = SessionRng::init().unwrap();
        let a = rng.session_id().unwrap();
        let b = rng.session_id().unwrap();
        assert_ne!(a, [0u8; 8]);
        assert_ne!(a, b);
    }
}
