// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Passwordless email-link authentication.
//!
//! The auth service emails a one-time link; following it lands back on the
//! app with the tokens in the URL fragment. The access token's payload is
//! decoded locally (no signature check, the row store verifies it on every
//! request) to recover the user id and email, and the session is persisted
//! until sign-out.

use crate::db::SupabaseDb;
use crate::error::{AppError, Result};
use crate::models::{Session, SessionUser, TokenClaims};
use crate::store::{LocalStore, CACHE_KEY, SESSION_KEY};
use jsonwebtoken::{decode, DecodingKey, Validation};
use validator::ValidateEmail;

/// Outcome of asking for a sign-in link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStatus {
    /// Link emailed; wait for the user to follow it
    Sent,
    /// Demo mode: no email, go straight to profile setup
    Skipped,
}

/// Redirect `type` values that mean a completed sign-in.
const SIGN_IN_TYPES: [&str; 2] = ["magiclink", "signup"];

/// Magic-link auth flow and session persistence.
#[derive(Clone)]
pub struct AuthService {
    db: SupabaseDb,
    store: LocalStore,
    redirect_to: String,
}

impl AuthService {
    pub fn new(db: SupabaseDb, store: LocalStore, redirect_to: impl Into<String>) -> Self {
        Self {
            db,
            store,
            redirect_to: redirect_to.into(),
        }
    }

    /// Request a sign-in link for `email`.
    pub async fn request_link(&self, email: &str) -> Result<LinkStatus> {
        let email = email.trim();
        if !is_valid_email(email) {
            return Err(AppError::BadRequest("Invalid email address".to_string()));
        }
        if self.db.is_demo() {
            return Ok(LinkStatus::Skipped);
        }

        self.db
            .send_magic_link(email, &self.redirect_to)
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "Failed to send sign-in link");
                AppError::BadRequest("Couldn't send link. Check your email.".to_string())
            })?;

        tracing::info!("Sign-in link sent");
        Ok(LinkStatus::Sent)
    }

    /// Finish sign-in from the redirect URL fragment.
    ///
    /// Returns `Ok(None)` when the fragment carries no access token, or
    /// when it comes from a flow other than a sign-in (e.g. recovery).
    pub fn complete_from_redirect(&self, fragment: &str) -> Result<Option<Session>> {
        let params = parse_fragment(fragment);
        let Some(access_token) = param(&params, "access_token") else {
            return Ok(None);
        };
        let kind = param(&params, "type").unwrap_or_default();
        if !SIGN_IN_TYPES.contains(&kind) {
            tracing::info!(kind, "Ignoring redirect that isn't a sign-in");
            return Ok(None);
        }

        let claims = decode_claims(access_token)?;
        let session = Session {
            access_token: access_token.to_string(),
            refresh_token: param(&params, "refresh_token").map(str::to_string),
            user: SessionUser {
                id: claims.sub,
                email: claims.email,
            },
        };

        tracing::info!(kind, "Session established from redirect");
        self.persist(&session)?;
        Ok(Some(session))
    }

    /// Exchange a magic-link token through the auth service.
    pub async fn exchange(&self, token: &str) -> Result<Session> {
        let mut session = self.db.exchange_token(token).await?;
        if session.user.id.is_none() {
            let claims = decode_claims(&session.access_token)?;
            session.user.id = claims.sub;
            session.user.email = session.user.email.or(claims.email);
        }
        self.persist(&session)?;
        Ok(session)
    }

    /// Persisted session, if any. A corrupt blob counts as signed out.
    pub fn session(&self) -> Option<Session> {
        let raw = self.store.get(SESSION_KEY)?;
        serde_json::from_str(&raw)
            .map_err(|e| tracing::warn!(error = %e, "Stored session is corrupt"))
            .ok()
    }

    fn persist(&self, session: &Session) -> Result<()> {
        let encoded = serde_json::to_string(session)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to encode session: {}", e)))?;
        self.store.set(SESSION_KEY, &encoded)
    }

    /// Forget the session and the offline cache.
    pub fn sign_out(&self) -> Result<()> {
        self.store.remove(SESSION_KEY)?;
        self.store.remove(CACHE_KEY)?;
        tracing::info!("Signed out");
        Ok(())
    }
}

fn is_valid_email(email: &str) -> bool {
    !email.chars().any(char::is_whitespace) && email.validate_email()
}

/// Decode the payload of an access token without verifying it.
pub fn decode_claims(token: &str) -> Result<TokenClaims> {
    let mut validation = Validation::default();
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    decode::<TokenClaims>(token, &DecodingKey::from_secret(&[]), &validation)
        .map(|data| data.claims)
        .map_err(|e| {
            tracing::warn!(error = %e, "Failed to decode access token");
            AppError::InvalidToken
        })
}

/// Split `#a=1&b=2` into decoded pairs.
fn parse_fragment(fragment: &str) -> Vec<(String, String)> {
    fragment
        .trim_start_matches('#')
        .split('&')
        .filter(|pair| !pair.is_empty())
        .filter_map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            let value = value.replace('+', " ");
            let value = urlencoding::decode(&value).ok()?;
            Some((key.to_string(), value.into_owned()))
        })
        .collect()
}

fn param<'a>(params: &'a [(String, String)], key: &str) -> Option<&'a str> {
    params
        .iter()
        .find(|(k, v)| k == key && !v.is_empty())
        .map(|(_, v)| v.as_str())
}
