use super::*;

const KEY_A: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
const ADDR_A: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";
const KEY_B: &str = "0x4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";
const ADDR_B: &str = "0x2c7536E3605D9C16a7a3D7b1898e529396a65c23";

#[test]
fn test_known_addresses() {
    assert_eq!(WalletSigner::from_hex(KEY_A).unwrap().address(), ADDR_A);
    assert_eq!(WalletSigner::from_hex(KEY_B).unwrap().address(), ADDR_B);
}

#[test]
fn test_prefix_is_optional() {
    let bare = WalletSigner::from_hex(KEY_A).unwrap();
    let prefixed = WalletSigner::from_hex(&format!("0x{}", KEY_A)).unwrap();
    assert_eq!(bare.address(), prefixed.address());
    assert_eq!(
        bare.sign_message(b"nonce-1").unwrap(),
        prefixed.sign_message(b"nonce-1").unwrap()
    );
}

#[test]
fn test_signature_shape() {
    let signer = WalletSigner::from_hex(KEY_A).unwrap();
    let sig = signer.sign_message(b"challenge-abc").unwrap();
    assert!(sig.starts_with("0x"));
    assert_eq!(sig.len(), 2 + 130);

    let v = u8::from_str_radix(&sig[130..], 16).unwrap();
    assert!(v == 27 || v == 28);
}

#[test]
fn test_signature_is_deterministic() {
    let signer = WalletSigner::from_hex(KEY_B).unwrap();
    assert_eq!(
        signer.sign_message(b"same").unwrap(),
        signer.sign_message(b"same").unwrap()
    );
    assert_ne!(
        signer.sign_message(b"same").unwrap(),
        signer.sign_message(b"different").unwrap()
    );
}

#[test]
fn test_recover_round_trip() {
    let signer = WalletSigner::from_hex(KEY_A).unwrap();
    let sig = signer.sign_message(b"moltbunker-auth:1700000000").unwrap();
    let recovered = recover_address(b"moltbunker-auth:1700000000", &sig).unwrap();
    assert_eq!(recovered, ADDR_A);

    let other = recover_address(b"tampered", &sig).unwrap();
    assert_ne!(other, ADDR_A);
}

#[test]
fn test_recover_rejects_bad_signature() {
    assert!(matches!(
        recover_address(b"m", "0x1234"),
        Err(AuthError::InvalidSignature(_))
    ));
    assert!(matches!(
        recover_address(b"m", "zz"),
        Err(AuthError::InvalidSignature(_))
    ));
}

#[test]
fn test_invalid_keys() {
    let zero = "00".repeat(32);
    for key in ["", "0x", "   ", "xyz", "0x1234", zero.as_str()] {
        assert!(
            matches!(WalletSigner::from_hex(key), Err(AuthError::InvalidKey(_))),
            "accepted {:?}",
            key
        );
    }
}

#[test]
fn test_personal_message_hash_prefix() {
    let mut manual = Keccak256::new();
    manual.update(b"\x19Ethereum Signed Message:\n5hello");
    assert_eq!(hash_personal_message(b"hello").as_slice(), manual.finalize().as_slice());
}

#[test]
fn test_debug_hides_key() {
    let signer = WalletSigner::from_hex(KEY_A).unwrap();
    let debug = format!("{:?}", signer);
    assert!(debug.contains(ADDR_A));
    assert!(!debug.contains(KEY_A));
}
