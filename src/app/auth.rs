use anyhow::{anyhow, Result};
use pasetors::claims::{Claims, ClaimsValidationRules};
use pasetors::keys::SymmetricKey;
use pasetors::token::UntrustedToken;
use pasetors::{local, version4::V4, Local};
use uuid::Uuid;

const TOKEN_ISSUER: &str = "agora";
const TOKEN_AUDIENCE: &str = "agora";

#[derive(Debug, Clone)]
pub struct AuthSession {
    pub user_id: Uuid,
}

/// Verifies PASETO v4.local access tokens.
///
/// Tokens are minted by the identity provider that shares `access_key`;
/// [`AuthService::issue_access_token`] exists for provisioning tools and tests.
#[derive(Clone)]
pub struct AuthService {
    access_key: [u8; 32],
    access_ttl_minutes: u64,
}

impl AuthService {
    pub fn new(access_key: [u8; 32], access_ttl_minutes: u64) -> Self {
        Self {
            access_key,
            access_ttl_minutes,
        }
    }

    /// `Ok(None)` for any token that does not verify.
    pub fn authenticate_access_token(&self, token: &str) -> Result<Option<AuthSession>> {
        let claims = match self.decrypt_claims(token)? {
            Some(claims) => claims,
            None => return Ok(None),
        };
        if !has_token_type(&claims, "access") {
            return Ok(None);
        }
        let user_id = claim_uuid(&claims, "sub")?;
        Ok(Some(AuthSession { user_id }))
    }

    pub fn issue_access_token(&self, user_id: Uuid) -> Result<String> {
        let seconds = self
            .access_ttl_minutes
            .checked_mul(60)
            .ok_or_else(|| anyhow!("access ttl overflows: {} minutes", self.access_ttl_minutes))?;
        let duration = std::time::Duration::from_secs(seconds);
        let mut claims = Claims::new_expires_in(&duration)?;
        claims.issuer(TOKEN_ISSUER)?;
        claims.audience(TOKEN_AUDIENCE)?;
        claims.subject(&user_id.to_string())?;
        claims.add_additional("typ", "access")?;

        let key = SymmetricKey::<V4>::from(&self.access_key)?;
        Ok(local::encrypt(&key, &claims, None, None)?)
    }

    fn decrypt_claims(&self, token: &str) -> Result<Option<Claims>> {
        let key = SymmetricKey::<V4>::from(&self.access_key)?;
        let mut rules = ClaimsValidationRules::new();
        rules.validate_issuer_with(TOKEN_ISSUER);
        rules.validate_audience_with(TOKEN_AUDIENCE);

        let untrusted = match UntrustedToken::<Local, V4>::try_from(token) {
            Ok(token) => token,
            Err(_) => return Ok(None),
        };
        let trusted = match local::decrypt(&key, &untrusted, &rules, None, None) {
            Ok(token) => token,
            Err(_) => return Ok(None),
        };
        Ok(trusted.payload_claims().cloned())
    }
}

fn claim_uuid(claims: &Claims, name: &str) -> Result<Uuid> {
    let value = claims
        .get_claim(name)
        .and_then(|value| value.as_str())
        .ok_or_else(|| anyhow!("missing {} claim", name))?;
    Ok(Uuid::parse_str(value)?)
}

fn has_token_type(claims: &Claims, expected: &str) -> bool {
    claims
        .get_claim("typ")
        .and_then(|value| value.as_str())
        .map(|value| value == expected)
        .unwrap_or(false)
}
