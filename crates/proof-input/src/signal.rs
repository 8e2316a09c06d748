//! Circuit signal declarations: `name` or `name[N]`

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ProofInputError, Result};

/// A parsed signal declaration
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SignalDecl {
    /// Signal identifier
    pub name: String,
    /// Number of field elements (1 for scalars)
    pub arity: usize,
}

impl SignalDecl {
    /// Parse a declaration string
    pub fn parse(declaration: &str) -> Result<Self> {
        let reject = |reason: &str| ProofInputError::InvalidSignalDeclaration {
            declaration: declaration.to_string(),
            reason: reason.to_string(),
        };

        let (name, arity) = match declaration.find('[') {
            None => {
                if declaration.contains(']') {
                    return Err(reject("unmatched ']'"));
                }
                (declaration, 1)
            }
            Some(open) => {
                let inner = declaration[open + 1..]
                    .strip_suffix(']')
                    .ok_or_else(|| reject("expected closing ']' at end"))?;
                if inner.is_empty() || !inner.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(reject("arity must be a positive integer"));
                }
                let arity: usize = inner
                    .parse()
                    .map_err(|_| reject("arity out of range"))?;
                if arity == 0 {
                    return Err(reject("arity must be a positive integer"));
                }
                (&declaration[..open], arity)
            }
        };

        if !is_identifier(name) {
            return Err(reject("name must be an identifier"));
        }

        Ok(Self {
            name: name.to_string(),
            arity,
        })
    }

    /// Whether resolved values are stored as a single scalar
    pub fn is_scalar(&self) -> bool {
        self.arity == 1
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl FromStr for SignalDecl {
    type Err = ProofInputError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for SignalDecl {
    type Error = ProofInputError;

    fn try_from(s: String) -> Result<Self> {
        Self::parse(&s)
    }
}

impl From<SignalDecl> for String {
    fn from(decl: SignalDecl) -> Self {
        decl.to_string()
    }
}

impl fmt::Display for SignalDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_scalar() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}[{}]", self.name, self.arity)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_scalar_and_array() {
        assert_eq!(
            SignalDecl::parse("sig").unwrap(),
            SignalDecl {
                name: "sig".into(),
                arity: 1
            }
        );
        assert_eq!(
            SignalDecl::parse("sig[5]").unwrap(),
            SignalDecl {
                name: "sig".into(),
                arity: 5
            }
        );
    }

    #[test]
    fn test_rejects_malformed_brackets() {
        for bad in ["sig[[", "sig[", "sig[]", "sig[0]", "sig[2]x", "sig]", "[3]", "sig[-1]", "sig[2][3]", ""] {
            assert!(
                matches!(
                    SignalDecl::parse(bad),
                    Err(ProofInputError::InvalidSignalDeclaration { .. })
                ),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_display_matches_declaration() {
        assert_eq!(SignalDecl::parse("issuerPk[2]").unwrap().to_string(), "issuerPk[2]");
        assert_eq!(SignalDecl::parse("minAge").unwrap().to_string(), "minAge");
    }

    #[test]
    fn test_serde_uses_declaration_string() {
        let decl: SignalDecl = serde_json::from_str("\"claimsProof[16]\"").unwrap();
        assert_eq!(decl.arity, 16);
        assert!(serde_json::from_str::<SignalDecl>("\"bad[\"").is_err());
    }
}
