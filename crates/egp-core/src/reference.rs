// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Compact 64-bit genetic code references.
//!
//! | Bits | Field | Meaning |
//! |---|---|---|
//! | 63 | GL | 0 for locally created references, 1 for references derived from a signature |
//! | 62:32 | GPSPUID | gene pool sub-process id |
//! | 31:0 | ISPUID | intra-sub-process id |
//!
//! The value 0 is reserved and never produced.

use crate::error::ReferenceError;
use crate::ident::Signature;

const REFERENCE_MASK: u64 = 0x7FFF_FFFF_FFFF_FFFF;
const GPSPUID_MASK: u32 = 0x7FFF_FFFF;
const ISPUID_LIMIT: u64 = 1 << 32;
/// Largest permitted bit window offset for [`ref_from_sig`].
pub const MAX_SHIFT: u32 = 192;

/// Monotonic intra-sub-process counter.
#[derive(Debug, Clone, Default)]
pub struct RefCounter {
    next: u64,
}

impl RefCounter {
    /// Counter starting at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Counter starting at `next`.
    pub fn starting_at(next: u64) -> Self {
        Self { next }
    }

    fn advance(&mut self) -> u64 {
        let v = self.next;
        self.next = self.next.saturating_add(1);
        v
    }
}

/// Create a new local reference for sub-process `gpspuid`.
pub fn reference(gpspuid: u32, counter: &mut RefCounter) -> Result<i64, ReferenceError> {
    let mut ispuid = counter.advance();
    if ispuid >= ISPUID_LIMIT {
        return Err(ReferenceError::IspuidOverflow);
    }
    let gpspuid = u64::from(gpspuid & GPSPUID_MASK);
    if gpspuid == 0 && ispuid == 0 {
        ispuid = 1;
    }
    // Bit 63 is clear so the value is a non-negative i64.
    #[allow(clippy::cast_possible_wrap)]
    let r = (ispuid | (gpspuid << 32)) as i64;
    Ok(r)
}

/// Derive a gene-library reference from a signature.
///
/// Takes the 63-bit window of the big-endian signature whose lowest bit is
/// `shift` and sets the GL bit, so the result is always negative. Alternate
/// shifts give alternate references in case of a collision.
pub fn ref_from_sig(signature: &Signature, shift: u32) -> Result<i64, ReferenceError> {
    if shift > MAX_SHIFT {
        return Err(ReferenceError::InvalidShift(shift));
    }
    let bytes = signature.as_bytes();
    let high = 32 - (shift >> 3) as usize;
    let bit = shift & 7;
    let window: u64 = if bit == 0 {
        let mut buf = [0_u8; 8];
        buf.copy_from_slice(&bytes[high - 8..high]);
        u64::from_be_bytes(buf)
    } else {
        let mut buf = [0_u8; 16];
        buf[7..].copy_from_slice(&bytes[high - 9..high]);
        // Masked to 63 bits below.
        #[allow(clippy::cast_possible_truncation)]
        let v = (u128::from_be_bytes(buf) >> bit) as u64;
        v
    };
    #[allow(clippy::cast_possible_wrap)]
    let r = ((window & REFERENCE_MASK) | !REFERENCE_MASK) as i64;
    Ok(r)
}

/// Returns `true` if `reference` was derived from a signature (a gene-library GC).
pub const fn is_gl_gc(reference: i64) -> bool {
    reference < 0
}

/// Sub-process id field.
pub const fn gpspuid_of(reference: i64) -> u32 {
    #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
    let v = ((reference as u64) >> 32) as u32 & GPSPUID_MASK;
    v
}

/// Intra-sub-process id field.
pub const fn ispuid_of(reference: i64) -> u32 {
    #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
    let v = reference as u64 as u32;
    v
}

/// 16 hex digit rendering of the two's complement bit pattern.
pub fn ref_str(reference: Option<i64>) -> String {
    reference.map_or_else(|| "None".to_owned(), |r| format!("{r:016x}"))
}
