use cosmian_crypto_core::{
    reexport::{rand_core::CryptoRngCore, zeroize::Zeroizing},
    Aes256Gcm, CryptoCoreError, Dem, FixedSizeCBytes, Instantiable, Nonce, RandomFixedSizeCBytes,
    SymmetricKey,
};

use crate::{traits::AE, Error};

impl AE<{ Self::KEY_LENGTH }> for Aes256Gcm {
    type Error = Error;

    fn encrypt(
        rng: &mut impl CryptoRngCore,
        key: &SymmetricKey<{ Self::KEY_LENGTH }>,
        ptx: &[u8],
        ad: &[u8],
    ) -> Result<Vec<u8>, Error> {
        let nonce = Nonce::<{ Self::NONCE_LENGTH }>::new(&mut *rng);
        let ciphertext = Self::new(key).encrypt(&nonce, ptx, Some(ad))?;
        Ok([nonce.as_bytes(), &ciphertext].concat())
    }

    fn decrypt(
        key: &SymmetricKey<{ Self::KEY_LENGTH }>,
        ctx: &[u8],
        ad: &[u8],
    ) -> Result<Zeroizing<Vec<u8>>, Error> {
        if ctx.len() < Self::NONCE_LENGTH {
            return Err(Error::CryptoCoreError(CryptoCoreError::DecryptionError));
        }
        let nonce = Nonce::try_from_slice(&ctx[..Self::NONCE_LENGTH])?;
        Self::new(key)
            .decrypt(&nonce, &ctx[Self::NONCE_LENGTH..], Some(ad))
            .map_err(Error::CryptoCoreError)
            .map(Zeroizing::new)
    }
}

#[cfg(test)]
mod tests {
    use cosmian_crypto_core::{reexport::rand_core::SeedableRng, CsRng};

    use super::*;

    #[test]
    fn test_aes_gcm_binds_associated_data() {
        let mut rng = CsRng::from_entropy();
        let key = SymmetricKey::new(&mut rng);
        let ctx = <Aes256Gcm as AE<{ Aes256Gcm::KEY_LENGTH }>>::encrypt(
            &mut rng,
            &key,
            b"payload",
            b"att1 and att2",
        )
        .unwrap();
        let ptx =
            <Aes256Gcm as AE<{ Aes256Gcm::KEY_LENGTH }>>::decrypt(&key, &ctx, b"att1 and att2")
                .unwrap();
        assert_eq!(&**ptx, b"payload");
        assert!(
            <Aes256Gcm as AE<{ Aes256Gcm::KEY_LENGTH }>>::decrypt(&key, &ctx, b"att1").is_err()
        );
        assert!(
            <Aes256Gcm as AE<{ Aes256Gcm::KEY_LENGTH }>>::decrypt(&key, &ctx[..10], b"").is_err()
        );
    }
}
