use std::fmt;

use crate::types::errors::TrieError;
use crate::types::family::{test_bit, Family};

//------------ Prefix ---------------------------------------------------------

/// An address together with a bit length, identifying a contiguous range of
/// addresses.
///
/// `Prefix` is a small, `Copy` value type (family + a 16-byte buffer + a
/// length byte). Some radix trie implementations reference-count prefixes
/// so a stack-allocated one can be adopted by a node without copying; here
/// every node that stores a prefix just holds its own copy, which is cheap
/// enough at this size to not be worth the indirection.
#[derive(Debug, Clone, Copy)]
pub struct Prefix {
    family: Family,
    bytes: [u8; 16],
    bitlen: u8,
}

impl Prefix {
    /// Builds a prefix from up to `family.byte_len()` bytes of address and a
    /// bit length. Bits beyond `bitlen` are zeroed, satisfying the
    /// prefix-anchoring invariant regardless of what the caller passed in.
    pub fn from_bytes(
        family: Family,
        bytes: &[u8],
        bitlen: u8,
    ) -> Result<Self, TrieError> {
        if bitlen > family.max_bits() {
            return Err(TrieError::InvalidPrefixLength);
        }
        let byte_len = family.byte_len();
        if bytes.len() < byte_len {
            return Err(TrieError::InvalidPrefixLength);
        }

        let mut buf = [0u8; 16];
        buf[..byte_len].copy_from_slice(&bytes[..byte_len]);
        sanitize(&mut buf, bitlen);

        Ok(Prefix {
            family,
            bytes: buf,
            bitlen,
        })
    }

    pub fn family(&self) -> Family {
        self.family
    }

    pub fn bitlen(&self) -> u8 {
        self.bitlen
    }

    /// The meaningful bytes of the address, network byte order.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes[..self.family.byte_len()]
    }

    /// Tests bit `idx` of this prefix's address.
    pub(crate) fn bit(&self, idx: u8) -> bool {
        test_bit(&self.bytes, idx)
    }

    /// The index of the first bit at which `self` and `other` disagree,
    /// capped at `cap`. Scans whole bytes with XOR, then finds the first
    /// set bit in the byte that differs.
    pub(crate) fn differ_bit(&self, other: &Prefix, cap: u8) -> u8 {
        let mut differ = 0u8;
        let mut i = 0usize;
        while (i as u8) * 8 < cap {
            let x = self.bytes[i] ^ other.bytes[i];
            if x == 0 {
                differ = ((i + 1) * 8) as u8;
                i += 1;
                continue;
            }
            let mut j = 0u8;
            while j < 8 {
                if x & (0x80 >> j) != 0 {
                    break;
                }
                j += 1;
            }
            differ = i as u8 * 8 + j;
            break;
        }
        if differ > cap {
            cap
        } else {
            differ
        }
    }

    /// Compares the first `bits` bits of `self` and `other`, treating `self`
    /// as the candidate mask.
    pub(crate) fn agrees_over(&self, other: &Prefix, bits: u8) -> bool {
        let full_bytes = (bits / 8) as usize;
        if self.bytes[..full_bytes] != other.bytes[..full_bytes] {
            return false;
        }
        let rem = bits % 8;
        if rem == 0 {
            return true;
        }
        let mask = 0xffu8 << (8 - rem);
        (self.bytes[full_bytes] & mask) == (other.bytes[full_bytes] & mask)
    }

    /// Whether `self` contains `other`: same family, `self` no longer than
    /// `other`, and `other` agrees with `self` over `self`'s bit length.
    pub fn contains(&self, other: &Prefix) -> bool {
        self.family == other.family
            && self.bitlen <= other.bitlen
            && other.agrees_over(self, self.bitlen)
    }
}

impl PartialEq for Prefix {
    fn eq(&self, other: &Self) -> bool {
        self.family == other.family
            && self.bitlen == other.bitlen
            && self.agrees_over(other, self.bitlen)
    }
}

impl Eq for Prefix {}

impl fmt::Display for Prefix {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.family {
            Family::V4 => {
                let octets: [u8; 4] = self.bytes[..4].try_into().unwrap();
                write!(
                    f,
                    "{}/{}",
                    std::net::Ipv4Addr::from(octets),
                    self.bitlen
                )
            }
            Family::V6 => {
                let octets: [u8; 16] = self.bytes;
                write!(
                    f,
                    "{}/{}",
                    std::net::Ipv6Addr::from(octets),
                    self.bitlen
                )
            }
        }
    }
}

fn sanitize(buf: &mut [u8; 16], bitlen: u8) {
    let full_bytes = (bitlen / 8) as usize;
    let rem = bitlen % 8;
    if rem != 0 {
        let mask = 0xffu8 << (8 - rem);
        buf[full_bytes] &= mask;
        for b in buf.iter_mut().skip(full_bytes + 1) {
            *b = 0;
        }
    } else {
        for b in buf.iter_mut().skip(full_bytes) {
            *b = 0;
        }
    }
}

//------------ interop with already-parsed host types -------------------------

impl TryFrom<inetnum::addr::Prefix> for Prefix {
    type Error = TrieError;

    fn try_from(value: inetnum::addr::Prefix) -> Result<Self, Self::Error> {
        match value.addr() {
            std::net::IpAddr::V4(addr) => {
                Prefix::from_bytes(Family::V4, &addr.octets(), value.len())
            }
            std::net::IpAddr::V6(addr) => {
                Prefix::from_bytes(Family::V6, &addr.octets(), value.len())
            }
        }
    }
}

impl From<Prefix> for inetnum::addr::Prefix {
    fn from(value: Prefix) -> Self {
        let ip = match value.family {
            Family::V4 => {
                let octets: [u8; 4] = value.bytes[..4].try_into().unwrap();
                std::net::IpAddr::V4(std::net::Ipv4Addr::from(octets))
            }
            Family::V6 => {
                std::net::IpAddr::V6(std::net::Ipv6Addr::from(value.bytes))
            }
        };
        // A `Prefix` always carries a bitlen valid for its own family, so
        // this cannot fail.
        inetnum::addr::Prefix::new(ip, value.bitlen)
            .expect("Prefix invariants guarantee a valid bitlen")
    }
}

impl TryFrom<(std::net::IpAddr, u8)> for Prefix {
    type Error = TrieError;

    fn try_from(value: (std::net::IpAddr, u8)) -> Result<Self, Self::Error> {
        match value.0 {
            std::net::IpAddr::V4(addr) => {
                Prefix::from_bytes(Family::V4, &addr.octets(), value.1)
            }
            std::net::IpAddr::V6(addr) => {
                Prefix::from_bytes(Family::V6, &addr.octets(), value.1)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v4(bytes: [u8; 4], bitlen: u8) -> Prefix {
        Prefix::from_bytes(Family::V4, &bytes, bitlen).unwrap()
    }

    #[test]
    fn sanitizes_trailing_bits() {
        let p = v4([10, 255, 255, 255], 8);
        assert_eq!(p.bytes(), &[10, 0, 0, 0]);
    }

    #[test]
    fn rejects_out_of_range_bitlen() {
        assert_eq!(
            Prefix::from_bytes(Family::V4, &[0, 0, 0, 0], 33),
            Err(TrieError::InvalidPrefixLength)
        );
    }

    #[test]
    fn equality_ignores_bits_past_len() {
        let a = v4([10, 0, 0, 0], 8);
        let b = Prefix::from_bytes(Family::V4, &[10, 1, 2, 3], 8).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn contains_is_reflexive_and_respects_length() {
        let parent = v4([10, 0, 0, 0], 8);
        let child = v4([10, 1, 0, 0], 16);
        assert!(parent.contains(&child));
        assert!(!child.contains(&parent));
        assert!(parent.contains(&parent));
    }

    #[test]
    fn differ_bit_finds_first_divergence() {
        let a = v4([0b1010_1010, 0, 0, 0], 32);
        let b = v4([0b1010_0000, 0, 0, 0], 32);
        assert_eq!(a.differ_bit(&b, 32), 4);
    }

    #[test]
    fn display_formats_as_cidr() {
        let p = v4([192, 0, 2, 0], 24);
        assert_eq!(p.to_string(), "192.0.2.0/24");
    }

    #[test]
    fn roundtrips_through_inetnum() {
        let p = v4([198, 51, 100, 0], 24);
        let inet: inetnum::addr::Prefix = p.into();
        let back: Prefix = inet.try_into().unwrap();
        assert_eq!(p, back);
    }
}
