use serde::{Deserialize, Serialize};

/// Claim type under which the raw access token is saved when
/// [`IntrospectionOptions::save_tokens_as_claims`](crate::IntrospectionOptions::save_tokens_as_claims)
/// is enabled
pub const ACCESS_TOKEN_CLAIM: &str = "access_token";

/// A single statement about the authenticated subject
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Claim {
    /// The claim type, such as `sub` or `scope`
    #[serde(rename = "type")]
    pub claim_type: String,

    /// The claim value
    pub value: String,
}

impl Claim {
    /// Constructs a new claim
    pub fn new(claim_type: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            claim_type: claim_type.into(),
            value: value.into(),
        }
    }
}

/// An authenticated identity built from the claims of an active token
///
/// Claims are kept in the order the authorization server returned them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimsIdentity {
    claims: Vec<Claim>,
    authentication_scheme: String,
    name_claim_type: String,
    role_claim_type: String,
}

impl ClaimsIdentity {
    /// Constructs an identity from its claims and claim type mappings
    pub fn new(
        claims: Vec<Claim>,
        authentication_scheme: impl Into<String>,
        name_claim_type: impl Into<String>,
        role_claim_type: impl Into<String>,
    ) -> Self {
        Self {
            claims,
            authentication_scheme: authentication_scheme.into(),
            name_claim_type: name_claim_type.into(),
            role_claim_type: role_claim_type.into(),
        }
    }

    /// All claims held by the identity
    #[inline]
    pub fn claims(&self) -> &[Claim] {
        &self.claims
    }

    /// Consumes the identity, returning its claims
    #[inline]
    pub fn into_claims(self) -> Vec<Claim> {
        self.claims
    }

    /// The scheme that authenticated this identity
    #[inline]
    pub fn authentication_scheme(&self) -> &str {
        &self.authentication_scheme
    }

    /// The claim type that holds the subject's name
    #[inline]
    pub fn name_claim_type(&self) -> &str {
        &self.name_claim_type
    }

    /// The claim type that holds the subject's roles
    #[inline]
    pub fn role_claim_type(&self) -> &str {
        &self.role_claim_type
    }

    /// Whether the identity was established by an authentication scheme
    #[inline]
    pub fn is_authenticated(&self) -> bool {
        !self.authentication_scheme.is_empty()
    }

    /// The value of the first claim of the name claim type
    pub fn name(&self) -> Option<&str> {
        self.find_first(&self.name_claim_type)
    }

    /// The values of all claims of the role claim type
    pub fn roles(&self) -> impl Iterator<Item = &str> {
        self.find_all(&self.role_claim_type)
    }

    /// The value of the first claim with the given type
    pub fn find_first(&self, claim_type: &str) -> Option<&str> {
        self.claims
            .iter()
            .find(|c| c.claim_type == claim_type)
            .map(|c| c.value.as_str())
    }

    /// The values of every claim with the given type, in order
    pub fn find_all<'a>(&'a self, claim_type: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.claims
            .iter()
            .filter(move |c| c.claim_type == claim_type)
            .map(|c| c.value.as_str())
    }

    /// Whether the identity holds a claim with exactly this type and value
    pub fn has_claim(&self, claim_type: &str, value: &str) -> bool {
        self.find_all(claim_type).any(|v| v == value)
    }

    /// Whether the identity holds the given role
    pub fn is_in_role(&self, role: &str) -> bool {
        self.has_claim(&self.role_claim_type, role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> ClaimsIdentity {
        ClaimsIdentity::new(
            vec![
                Claim::new("sub", "248289761001"),
                Claim::new("preferred_username", "alice"),
                Claim::new("roles", "admin"),
                Claim::new("roles", "auditor"),
            ],
            "Bearer",
            "preferred_username",
            "roles",
        )
    }

    #[test]
    fn name_uses_the_configured_claim_type() {
        assert_eq!(identity().name(), Some("alice"));
    }

    #[test]
    fn roles_are_returned_in_order() {
        let identity = identity();
        let roles: Vec<_> = identity.roles().collect();

        assert_eq!(roles, ["admin", "auditor"]);
        assert!(identity.is_in_role("auditor"));
        assert!(!identity.is_in_role("owner"));
    }

    #[test]
    fn found_values_borrow_from_the_identity() {
        let identity = identity();

        let subject = {
            let claim_type = String::from("sub");
            identity.find_first(&claim_type)
        };

        assert_eq!(subject, Some("248289761001"));
        assert_eq!(identity.find_first("email"), None);
        assert!(identity.has_claim("roles", "admin"));
    }

    #[test]
    fn missing_name_claim_yields_none() {
        let identity = ClaimsIdentity::new(vec![Claim::new("sub", "1")], "Bearer", "name", "role");

        assert_eq!(identity.name(), None);
        assert!(identity.is_authenticated());
    }
}
