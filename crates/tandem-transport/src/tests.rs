use libp2p::identity::Keypair;

use crate::{wire_peer_id, PROTOCOL};

#[test]
fn protocol_name_is_stable() {
    assert_eq!(PROTOCOL.as_ref(), "/tandem/share/1");
}

#[test]
fn wire_peer_id_round_trips_through_bytes() {
    let keypair = Keypair::generate_ed25519();
    let libp2p_id = keypair.public().to_peer_id();
    let wire = wire_peer_id(libp2p_id);
    assert_eq!(wire.as_bytes(), libp2p_id.to_bytes());
}

#[test]
fn distinct_keys_produce_distinct_peer_ids() {
    let a = wire_peer_id(Keypair::generate_ed25519().public().to_peer_id());
    let b = wire_peer_id(Keypair::generate_ed25519().public().to_peer_id());
    assert_ne!(a, b);
}

#[test]
fn identity_keypair_encodes_and_decodes() {
    let original = Keypair::generate_ed25519();
    let encoded = original.to_protobuf_encoding().unwrap();
    let decoded = Keypair::from_protobuf_encoding(&encoded).unwrap();
    assert_eq!(original.public().to_peer_id(), decoded.public().to_peer_id());
}
