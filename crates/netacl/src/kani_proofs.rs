//! Kani proofs for address masking and containment
//!
//! Bounded model checking over the whole IPv4 space: the properties the
//! policy tree depends on when it decides where a rule belongs.
//!
//! Run with: `cargo kani --tests --harness verify_*`

#[cfg(kani)]
use crate::network::{AddressFamily, NetworkAddress};

/// **Property**: construction is canonical
///
/// Bits past the prefix are always cleared, so re-masking is a no-op.
#[cfg(kani)]
#[kani::proof]
fn verify_construction_is_canonical() {
    let bits: u32 = kani::any();
    let prefix_len: u8 = kani::any();
    kani::assume(prefix_len <= 32);

    let net = NetworkAddress::new(AddressFamily::V4, u128::from(bits), prefix_len).unwrap();

    assert_eq!(net.bits() & !net.mask(), 0);
    assert_eq!(net.bits() & net.mask(), net.bits());
}

/// **Property**: containment is reflexive
#[cfg(kani)]
#[kani::proof]
fn verify_containment_reflexive() {
    let bits: u32 = kani::any();
    let prefix_len: u8 = kani::any();
    kani::assume(prefix_len <= 32);

    let net = NetworkAddress::new(AddressFamily::V4, u128::from(bits), prefix_len).unwrap();

    assert!(net.contains(&net));
}

/// **Property**: mutual containment implies equality
///
/// Two networks that contain each other are the same network, so a tree
/// can never hold two distinct nodes that nest both ways.
#[cfg(kani)]
#[kani::proof]
fn verify_containment_antisymmetric() {
    let a_bits: u32 = kani::any();
    let b_bits: u32 = kani::any();
    let a_len: u8 = kani::any();
    let b_len: u8 = kani::any();
    kani::assume(a_len <= 32 && b_len <= 32);

    let a = NetworkAddress::new(AddressFamily::V4, u128::from(a_bits), a_len).unwrap();
    let b = NetworkAddress::new(AddressFamily::V4, u128::from(b_bits), b_len).unwrap();

    if a.contains(&b) && b.contains(&a) {
        assert_eq!(a, b);
    }
}

/// **Property**: a network contains every host inside it
#[cfg(kani)]
#[kani::proof]
fn verify_enclosing_contains_host() {
    let bits: u32 = kani::any();
    let prefix_len: u8 = kani::any();
    kani::assume(prefix_len <= 32);

    let host = NetworkAddress::host(AddressFamily::V4, u128::from(bits)).unwrap();
    let net = host.enclosing(prefix_len).unwrap();

    assert!(net.contains(&host));
    assert!(AddressFamily::V4.all().contains(&net));
}
