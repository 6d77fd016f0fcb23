use libp2p::PeerId;

pub(crate) fn test_peer_id(n: u8) -> PeerId {
    let key = libp2p::identity::ed25519::SecretKey::try_from_bytes([n; 32]).unwrap();
    let keypair = libp2p::identity::Keypair::from(libp2p::identity::ed25519::Keypair::from(key));
    keypair.public().to_peer_id()
}
