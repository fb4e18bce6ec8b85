//! Fingerprints de chaves do cache.
//!
//! Um fingerprint é o hash SHA256 (em hex) da representação canônica de um
//! objeto. A representação canônica é o JSON compacto gerado via
//! `serde_json::Value`, cujos mapas têm as chaves ordenadas; assim um
//! `HashMap` produz sempre o mesmo texto, independente da ordem de iteração.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::types::errors::{CacheError, CacheResult};

/// Tamanho do fingerprint em caracteres hex.
pub const FINGERPRINT_LEN: usize = 64;

/// Identificador derivado do conteúdo de uma chave.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Calcula o fingerprint de qualquer objeto serializável.
    pub fn of<K: Serialize + ?Sized>(obj: &K) -> CacheResult<Self> {
        let canonical = canonical_repr(obj)?;
        Ok(Self::from_canonical(&canonical))
    }

    /// Calcula o fingerprint de uma representação canônica já pronta.
    pub fn from_canonical(repr: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(repr.as_bytes());
        Self(hex::encode(hasher.finalize()))
    }

    /// Valida um fingerprint vindo de fora (snapshots, linha de comando).
    pub fn parse(s: &str) -> CacheResult<Self> {
        let valid = s.len() == FINGERPRINT_LEN
            && s.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));

        if valid {
            Ok(Self(s.to_string()))
        } else {
            Err(CacheError::InvalidFingerprint(s.to_string()))
        }
    }

    /// Retorna o fingerprint como texto.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Prefixo curto para exibição.
    pub fn short(&self) -> &str {
        &self.0[..12.min(self.0.len())]
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Fingerprint {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Gera a representação canônica (JSON compacto, chaves ordenadas).
pub fn canonical_repr<K: Serialize + ?Sized>(obj: &K) -> CacheResult<String> {
    let value =
        serde_json::to_value(obj).map_err(|e| CacheError::UnrepresentableKey(e.to_string()))?;
    Ok(value.to_string())
}

/// Atalho para [`Fingerprint::of`].
pub fn fingerprint<K: Serialize + ?Sized>(obj: &K) -> CacheResult<Fingerprint> {
    Fingerprint::of(obj)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serializer;
    use std::collections::HashMap;

    struct Opaque;

    impl Serialize for Opaque {
        fn serialize<S: Serializer>(&self, _serializer: S) -> Result<S::Ok, S::Error> {
            Err(serde::ser::Error::custom("opaque"))
        }
    }

    #[test]
    fn test_fingerprint_is_deterministic() {
        let a = fingerprint("hello").unwrap();
        let b = fingerprint("hello").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), FINGERPRINT_LEN);
    }

    #[test]
    fn test_fingerprint_is_stable_across_runs() {
        // sha256("\"hello\"")
        assert_eq!(
            fingerprint("hello").unwrap().as_str(),
            "5aa762ae383fbb727af3c7a36d4940a5b8c40a989452d2304fc958ff3f354e7a"
        );
    }

    #[test]
    fn test_map_order_does_not_matter() {
        let mut first = HashMap::new();
        let mut second = HashMap::new();
        for i in 0..32 {
            first.insert(format!("k{}", i), i);
        }
        for i in (0..32).rev() {
            second.insert(format!("k{}", i), i);
        }

        assert_eq!(fingerprint(&first).unwrap(), fingerprint(&second).unwrap());
        assert_eq!(
            canonical_repr(&serde_json::json!({"b": [1, 2], "a": 1})).unwrap(),
            r#"{"a":1,"b":[1,2]}"#
        );
    }

    #[test]
    fn test_different_inputs_differ() {
        let a = fingerprint(&("prompt", 1)).unwrap();
        let b = fingerprint(&("prompt", 2)).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_same_representation_same_key() {
        // Objetos distintos com a mesma representação compartilham a chave.
        #[derive(Serialize)]
        struct Query<'a> {
            text: &'a str,
        }

        let from_struct = fingerprint(&Query { text: "x" }).unwrap();
        let from_json = fingerprint(&serde_json::json!({"text": "x"})).unwrap();
        assert_eq!(from_struct, from_json);
    }

    #[test]
    fn test_unserializable_key() {
        let err = fingerprint(&Opaque).unwrap_err();
        assert!(matches!(err, CacheError::UnrepresentableKey(_)));
    }

    #[test]
    fn test_parse() {
        let fp = fingerprint("hello").unwrap();
        assert_eq!(Fingerprint::parse(fp.as_str()).unwrap(), fp);

        assert!(Fingerprint::parse("abc").is_err());
        assert!(Fingerprint::parse(&"Z".repeat(FINGERPRINT_LEN)).is_err());
        assert!(Fingerprint::parse(&fp.as_str().to_uppercase()).is_err());
    }

    #[test]
    fn test_short() {
        let fp = fingerprint("hello").unwrap();
        assert_eq!(fp.short(), "5aa762ae383f");
    }
}
