use crate::{api::TraceableAbe, Error, PrivateKey, PublicKey, SecretMasterKey};

#[cfg(feature = "serialization")]
pub mod non_regression;

/// Number of users of the test grid.
pub const USER_COUNT: usize = 8;

/// Sets up a grid of `USER_COUNT` users and issues one key per attribute set,
/// in order.
pub fn abe_keygen(
    abe: &TraceableAbe,
    attribute_sets: &[&[&str]],
) -> Result<(PublicKey, SecretMasterKey, Vec<PrivateKey>), Error> {
    let (mpk, mut msk) = abe.setup(USER_COUNT)?;
    let keys = attribute_sets
        .iter()
        .map(|attributes| abe.generate_user_key(&mut msk, attributes))
        .collect::<Result<Vec<_>, _>>()?;
    Ok((mpk, msk, keys))
}

#[cfg(test)]
mod tests {
    use std::{collections::HashSet, sync::Arc, thread};

    use super::*;
    use crate::{
        access_structure::AccessStructureKind,
        core::AtomicSlotAllocator,
        traitor_tracing::{KeyBlackBox, TracingParameters},
        DecryptionError,
    };

    #[test]
    fn test_facade_round_trip() -> Result<(), Error> {
        let abe = TraceableAbe::default();
        let (mpk, _, keys) = abe_keygen(
            &abe,
            &[&["Department::HR", "Level::Secret"], &["Level::Low"]],
        )?;

        let plaintext = b"quarterly figures";
        let encrypted = abe.encrypt_data(
            &mpk,
            "Department::HR and Level::Secret",
            AccessStructureKind::Tree,
            &[],
            plaintext,
        )?;
        assert_eq!(&**abe.decrypt_data(&keys[0], &encrypted)?, plaintext);
        assert!(!abe.can_decrypt(&keys[1], &encrypted.cipher_text));
        assert!(matches!(
            abe.decrypt_data(&keys[1], &encrypted),
            Err(Error::Decryption(DecryptionError::UnsatisfiedPolicy))
        ));

        // revoked users fail the authentication of the payload
        let encrypted = abe.encrypt_data(
            &mpk,
            "Department::HR",
            AccessStructureKind::Matrix,
            &[0],
            plaintext,
        )?;
        assert!(matches!(
            abe.decrypt_data(&keys[0], &encrypted),
            Err(Error::CryptoCoreError(_))
        ));
        Ok(())
    }

    #[test]
    fn test_invalid_policy() -> Result<(), Error> {
        let abe = TraceableAbe::default();
        let (mpk, _) = abe.setup(USER_COUNT)?;
        for policy in ["", "att1 and", "3 of (a, b)"] {
            assert!(matches!(
                abe.encrypt(&mpk, policy, AccessStructureKind::Matrix, &[], 0),
                Err(Error::Parse(_))
            ));
        }
        assert!(matches!(abe.setup(1), Err(Error::Setup(_))));
        Ok(())
    }

    #[test]
    fn test_shared_allocator() -> Result<(), Error> {
        let abe = Arc::new(TraceableAbe::default());
        let (_, mut msk) = abe.setup(100)?;
        let allocator = Arc::new(AtomicSlotAllocator::new(&msk));

        let handles = (0..4)
            .map(|_| {
                let abe = abe.clone();
                let allocator = allocator.clone();
                thread::spawn(move || {
                    (0..10)
                        .map(|_| abe.allocate_user_slot(&*allocator).map(|(_, slot)| slot))
                        .collect::<Result<Vec<_>, _>>()
                })
            })
            .collect::<Vec<_>>();
        let mut slots = HashSet::new();
        for handle in handles {
            slots.extend(handle.join().expect("allocation thread panicked")?);
        }
        assert_eq!(slots, (0..40).collect::<HashSet<_>>());

        msk.record_issued(&*allocator);
        assert_eq!(msk.counter(), 40);
        assert_eq!(abe.issue_user_slot(&mut msk)?.1, 40);
        Ok(())
    }

    #[test]
    fn test_facade_tracing() -> Result<(), Error> {
        let abe = TraceableAbe::default();
        let (mpk, mut msk) = abe.setup(3)?;
        let first = abe.generate_user_key(&mut msk, &["att1"])?;
        let traitor = abe.generate_user_key(&mut msk, &["att1"])?;
        let parameters = TracingParameters {
            confidence: 1.0,
            dispersion: 0.05,
            ..Default::default()
        };

        let black_box = KeyBlackBox::new(vec![traitor.clone()]);
        assert_eq!(
            abe.trace(&mpk, "att1", &black_box, &parameters)?,
            vec![traitor.position().counter()]
        );

        // the box keeps decrypting until the cut passes its last slot
        let black_box = KeyBlackBox::new(vec![first, traitor.clone()]);
        assert_eq!(
            abe.trace(&mpk, "att1", &black_box, &parameters)?,
            vec![traitor.position().counter()]
        );
        Ok(())
    }
}
