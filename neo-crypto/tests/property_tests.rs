use neo_crypto::{Crypto, ECPoint, KeyPair, Signature};
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn signatures_verify_only_for_the_signed_message(
        message in prop::collection::vec(any::<u8>(), 0..256),
        flip in any::<usize>(),
    ) {
        let key = KeyPair::generate();
        let signature = key.sign(&message).unwrap();
        prop_assert!(signature.verify(&message, &key.public_key()));

        let mut tampered = message.clone();
        if tampered.is_empty() {
            tampered.push(0);
        } else {
            let i = flip % tampered.len();
            tampered[i] ^= 0x01;
        }
        prop_assert!(!signature.verify(&tampered, &key.public_key()));
    }

    #[test]
    fn arbitrary_bytes_never_panic_point_or_signature_parsing(
        bytes in prop::collection::vec(any::<u8>(), 0..80),
    ) {
        let _ = ECPoint::from_bytes(&bytes);
        let _ = Signature::from_bytes(&bytes);
    }

    #[test]
    fn hash256_is_sha256_applied_twice(data in prop::collection::vec(any::<u8>(), 0..512)) {
        prop_assert_eq!(Crypto::hash256(&data), Crypto::sha256(&Crypto::sha256(&data)));
    }
}
