use base64::{engine::general_purpose::STANDARD, Engine};
use cosmian_crypto_core::bytes_ser_de::Serializable;
use serde::{Deserialize, Serialize};

use crate::{
    abe_policy::AccessPolicy, access_structure::AccessStructureKind, api::TraceableAbe,
    AbeEncrypted, Error, PrivateKey, PublicKey, SecretMasterKey,
};

use super::USER_COUNT;

fn decode(value: &str) -> Result<Vec<u8>, Error> {
    STANDARD
        .decode(value)
        .map_err(|e| Error::Serialization(e.to_string()))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EncryptionTestVector {
    encryption_policy: String,
    kind: AccessStructureKind,
    revoked: Vec<usize>,
    plaintext: String,
    ciphertext: String,
}

impl EncryptionTestVector {
    pub fn new(
        abe: &TraceableAbe,
        mpk: &PublicKey,
        encryption_policy: &str,
        kind: AccessStructureKind,
        revoked: &[usize],
        plaintext: &str,
    ) -> Result<Self, Error> {
        let encrypted =
            abe.encrypt_data(mpk, encryption_policy, kind, revoked, plaintext.as_bytes())?;
        Ok(Self {
            encryption_policy: encryption_policy.to_string(),
            kind,
            revoked: revoked.to_vec(),
            plaintext: STANDARD.encode(plaintext),
            ciphertext: STANDARD.encode(encrypted.serialize()?),
        })
    }

    pub fn decrypt(&self, user_key: &str) -> Result<(), Error> {
        let abe = TraceableAbe::default();
        let user_key = PrivateKey::deserialize(&decode(user_key)?)?;
        let encrypted = AbeEncrypted::deserialize(&decode(&self.ciphertext)?)?;
        assert_eq!(encrypted.cipher_text.access_structure().kind(), self.kind);
        assert_eq!(
            encrypted.cipher_text.policy().to_string(),
            AccessPolicy::parse(&self.encryption_policy)?.to_string()
        );

        let plaintext = abe.decrypt_data(&user_key, &encrypted)?;
        assert_eq!(*plaintext, decode(&self.plaintext)?);
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserSecretKeyTestVector {
    attributes: Vec<String>,
    key: String,
}

impl UserSecretKeyTestVector {
    pub fn new(
        abe: &TraceableAbe,
        msk: &mut SecretMasterKey,
        attributes: &[&str],
    ) -> Result<Self, Error> {
        Ok(Self {
            key: STANDARD.encode(abe.generate_user_key(msk, attributes)?.serialize()?),
            attributes: attributes.iter().map(ToString::to_string).collect(),
        })
    }
}

/// Keys and ciphertexts whose decryption results must not change across
/// versions.
#[derive(Debug, Serialize, Deserialize)]
pub struct NonRegressionTestVector {
    public_key: String,
    master_secret_key: String,
    hr_secret_key: UserSecretKeyTestVector,
    fin_key: UserSecretKeyTestVector,
    hr_key: UserSecretKeyTestVector,
    revoked_hr_secret_key: UserSecretKeyTestVector,
    hr_secret_or_fin_vector: EncryptionTestVector,
    two_of_three_vector: EncryptionTestVector,
    hr_vector: EncryptionTestVector,
}

impl NonRegressionTestVector {
    pub fn new() -> Result<Self, Error> {
        let abe = TraceableAbe::default();
        let (mpk, mut msk) = abe.setup(USER_COUNT)?;

        // slots 0 to 3, in order
        let hr_secret_key =
            UserSecretKeyTestVector::new(&abe, &mut msk, &["Department::HR", "Level::Secret"])?;
        let fin_key = UserSecretKeyTestVector::new(&abe, &mut msk, &["Department::FIN"])?;
        let hr_key = UserSecretKeyTestVector::new(&abe, &mut msk, &["Department::HR"])?;
        let revoked_hr_secret_key =
            UserSecretKeyTestVector::new(&abe, &mut msk, &["Department::HR", "Level::Secret"])?;

        Ok(Self {
            public_key: STANDARD.encode(mpk.serialize()?),
            master_secret_key: STANDARD.encode(msk.serialize()?),
            hr_secret_key,
            fin_key,
            hr_key,
            revoked_hr_secret_key,
            hr_secret_or_fin_vector: EncryptionTestVector::new(
                &abe,
                &mpk,
                "(Department::HR and Level::Secret) or Department::FIN",
                AccessStructureKind::Matrix,
                &[],
                "hr_secret_or_fin_plaintext",
            )?,
            two_of_three_vector: EncryptionTestVector::new(
                &abe,
                &mpk,
                "2 of (Department::HR, Level::Secret, Department::FIN)",
                AccessStructureKind::Tree,
                &[3],
                "two_of_three_plaintext",
            )?,
            hr_vector: EncryptionTestVector::new(
                &abe,
                &mpk,
                "Department::HR",
                AccessStructureKind::Matrix,
                &[0],
                "hr_plaintext",
            )?,
        })
    }

    pub fn verify(&self) -> Result<(), Error> {
        let mpk = PublicKey::deserialize(&decode(&self.public_key)?)?;
        let msk = SecretMasterKey::deserialize(&decode(&self.master_secret_key)?)?;
        assert_eq!(msk.public_key(), &mpk);
        assert_eq!(msk.counter(), 4);

        // hr_secret_key
        self.hr_secret_or_fin_vector
            .decrypt(&self.hr_secret_key.key)?;
        self.two_of_three_vector.decrypt(&self.hr_secret_key.key)?;
        assert!(self.hr_vector.decrypt(&self.hr_secret_key.key).is_err());

        // fin_key
        self.hr_secret_or_fin_vector.decrypt(&self.fin_key.key)?;
        assert!(self.two_of_three_vector.decrypt(&self.fin_key.key).is_err());
        assert!(self.hr_vector.decrypt(&self.fin_key.key).is_err());

        // hr_key
        assert!(self
            .hr_secret_or_fin_vector
            .decrypt(&self.hr_key.key)
            .is_err());
        assert!(self.two_of_three_vector.decrypt(&self.hr_key.key).is_err());
        self.hr_vector.decrypt(&self.hr_key.key)?;

        // revoked_hr_secret_key
        self.hr_secret_or_fin_vector
            .decrypt(&self.revoked_hr_secret_key.key)?;
        assert!(self
            .two_of_three_vector
            .decrypt(&self.revoked_hr_secret_key.key)
            .is_err());
        self.hr_vector.decrypt(&self.revoked_hr_secret_key.key)?;
        Ok(())
    }
}

/// Location of the committed test vector.
#[cfg(test)]
fn non_regression_vector_path() -> std::path::PathBuf {
    std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests_data")
        .join("non_regression_vector.json")
}

#[test]
fn test_generate_non_regression_vector() -> Result<(), Error> {
    let reg_vector = NonRegressionTestVector::new()?;
    let json = serde_json::to_string(&reg_vector)?;
    let reg_vector: NonRegressionTestVector = serde_json::from_str(&json)?;
    reg_vector.verify()
}

#[test]
fn test_non_regression() -> Result<(), Error> {
    let path = non_regression_vector_path();
    let json = match std::fs::read_to_string(&path) {
        Ok(json) => json,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            // a checkout without the vector records it, to be committed
            let json = serde_json::to_string_pretty(&NonRegressionTestVector::new()?)?;
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(&path, &json).unwrap();
            json
        }
        Err(e) => panic!("cannot read {}: {e}", path.display()),
    };
    let reg_vector: NonRegressionTestVector = serde_json::from_str(&json)?;
    reg_vector.verify()
}
