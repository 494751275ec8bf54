use serde::{Deserialize, Serialize};

/// A named biological sequence record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Sequence {
    #[serde(alias = "name")]
    pub id: String,
    pub description: Option<String>,
    #[serde(with = "residues")]
    pub sequence: Vec<u8>,
}

/// Residues travel as a plain string in JSON rather than a byte array
mod residues {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(sequence: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&String::from_utf8_lossy(sequence))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        String::deserialize(deserializer).map(String::into_bytes)
    }
}

impl Sequence {
    pub fn new(id: String, sequence: Vec<u8>) -> Self {
        Self {
            id,
            description: None,
            sequence,
        }
    }

    pub fn with_description(mut self, description: String) -> Self {
        self.description = Some(description);
        self
    }

    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    pub fn residues(&self) -> String {
        String::from_utf8_lossy(&self.sequence).to_string()
    }

    pub fn header(&self) -> String {
        let mut header = format!(">{}", self.id);

        if let Some(desc) = &self.description {
            header.push(' ');
            header.push_str(desc);
        }

        header
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_with_description() {
        let seq = Sequence::new("P12345".to_string(), b"MKV".to_vec())
            .with_description("Example protein".to_string());
        assert_eq!(seq.header(), ">P12345 Example protein");
        assert_eq!(seq.len(), 3);
        assert_eq!(seq.residues(), "MKV");
    }

    #[test]
    fn test_header_without_description() {
        let seq = Sequence::new("query".to_string(), Vec::new());
        assert_eq!(seq.header(), ">query");
        assert!(seq.is_empty());
    }

    #[test]
    fn test_residues_serialize_as_string() {
        let seq = Sequence::new("q".to_string(), b"MKV".to_vec());
        let json = serde_json::to_string(&seq).unwrap();
        assert_eq!(json, r#"{"id":"q","description":null,"sequence":"MKV"}"#);
        let back: Sequence = serde_json::from_str(&json).unwrap();
        assert_eq!(back, seq);
    }
}
