//! Row-level access filtering.
//!
//! A request may carry a flat claim map extracted from the caller's auth
//! cookie; no claims means an unauthenticated service call and no filtering.
//! The policy is keyed by the dimension being resolved (District, School,
//! Class, Teacher) and narrows the candidate element list through external
//! hierarchy lookups.
//!
//! Every failure in here is an explicit `FilterError`; the element resolver
//! is the single caller allowed to turn one into "no restriction applied".
//! That fail-open recovery is preserved from the observed behaviour of the
//! system and deliberately kept in one visible place.

use async_trait::async_trait;
use log::debug;
use std::collections::HashMap;
use thiserror::Error;

use crate::request::Element;

pub const CLAIM_ROLES: &str = "roles";
pub const CLAIM_SUBJECT: &str = "sub";
pub const CLAIM_DISTRICT: &str = "ATTR_DISTRICT";
pub const CLAIM_SCHOOL: &str = "ATTR_SCHOOL";

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_TEACHER: &str = "teacher";

pub type ClaimMap = HashMap<String, String>;

#[derive(Debug, Error)]
pub enum FilterError {
    #[error("claim {0} is missing")]
    MissingClaim(&'static str),

    #[error("claim {claim} is malformed: {value}")]
    MalformedClaim { claim: &'static str, value: String },

    #[error("restriction lookup failed: {0}")]
    Lookup(String),
}

/// External hierarchy lookups backing the restriction rules.
#[async_trait]
pub trait AccessLookup: Send + Sync {
    /// Configured parent district for each of the caller's district ids.
    async fn district_parents(&self, districts: &[i32]) -> Result<Vec<i64>, FilterError>;

    /// Class-unit ids reachable from the caller's subject id through the
    /// group assignment join.
    async fn teacher_classes(&self, subject: &str) -> Result<Vec<i64>, FilterError>;

    /// The caller's own resolved profile ids.
    async fn teacher_profiles(&self, subject: &str) -> Result<Vec<i64>, FilterError>;
}

fn claim<'c>(claims: &'c ClaimMap, name: &'static str) -> Result<&'c str, FilterError> {
    claims
        .get(name)
        .map(String::as_str)
        .ok_or(FilterError::MissingClaim(name))
}

/// Narrows the candidate set for one dimension under the caller's claims.
/// Never mutates `candidates`; dimensions without a restriction rule pass
/// through unchanged.
pub async fn narrow_elements(
    claims: Option<&ClaimMap>,
    lookup: &dyn AccessLookup,
    dimension: &str,
    candidates: &[Element],
) -> Result<Vec<Element>, FilterError> {
    let claims = match claims {
        Some(claims) => claims,
        None => return Ok(candidates.to_vec()),
    };

    match dimension {
        "District" if claims.contains_key(CLAIM_DISTRICT) => {
            filter_district(claims, lookup, candidates).await
        }
        "School" if claims.contains_key(CLAIM_SCHOOL) => filter_school(claims, candidates),
        "Class" => filter_class(claims, lookup, candidates).await,
        "Teacher" => filter_teacher(claims, lookup, candidates).await,
        _ => Ok(candidates.to_vec()),
    }
}

async fn filter_district(
    claims: &ClaimMap,
    lookup: &dyn AccessLookup,
    candidates: &[Element],
) -> Result<Vec<Element>, FilterError> {
    let roles = claim(claims, CLAIM_ROLES)?;
    if roles.contains(ROLE_ADMIN) {
        return Ok(candidates.to_vec());
    }

    let district = claim(claims, CLAIM_DISTRICT)?;
    if district.is_empty() {
        return Ok(candidates.to_vec());
    }

    debug!("user districts: {}", district);

    let districts = district
        .split(',')
        .map(|id| {
            id.trim()
                .parse::<i32>()
                .map_err(|_| FilterError::MalformedClaim {
                    claim: CLAIM_DISTRICT,
                    value: district.to_owned(),
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let parents = lookup.district_parents(&districts).await?;
    debug!("parent districts: {:?}", parents);

    Ok(retain_by_ids(
        candidates,
        parents.iter().map(i64::to_string),
    ))
}

fn filter_school(claims: &ClaimMap, candidates: &[Element]) -> Result<Vec<Element>, FilterError> {
    let school = claim(claims, CLAIM_SCHOOL)?;
    if school.is_empty() {
        return Ok(candidates.to_vec());
    }

    debug!("user schools: {}", school);

    Ok(retain_by_ids(
        candidates,
        school.split(',').map(|s| s.trim().to_owned()),
    ))
}

async fn filter_class(
    claims: &ClaimMap,
    lookup: &dyn AccessLookup,
    candidates: &[Element],
) -> Result<Vec<Element>, FilterError> {
    let roles = claim(claims, CLAIM_ROLES)?;
    if !roles.contains(ROLE_TEACHER) {
        return Ok(candidates.to_vec());
    }

    let subject = claim(claims, CLAIM_SUBJECT)?;
    let classes = lookup.teacher_classes(subject).await?;
    if classes.is_empty() {
        // Nothing assigned: leave the candidate set unrestricted.
        return Ok(candidates.to_vec());
    }

    Ok(retain_by_ids(
        candidates,
        classes.iter().map(i64::to_string),
    ))
}

async fn filter_teacher(
    claims: &ClaimMap,
    lookup: &dyn AccessLookup,
    candidates: &[Element],
) -> Result<Vec<Element>, FilterError> {
    let roles = claim(claims, CLAIM_ROLES)?;
    if !roles.contains(ROLE_TEACHER) {
        return Ok(candidates.to_vec());
    }

    let subject = claim(claims, CLAIM_SUBJECT)?;
    let profiles = lookup.teacher_profiles(subject).await?;
    if profiles.is_empty() {
        return Ok(candidates.to_vec());
    }

    let narrowed = retain_by_ids(candidates, profiles.iter().map(i64::to_string));
    if narrowed.is_empty() {
        // The caller's profiles matched nothing; keep the unfiltered set.
        return Ok(candidates.to_vec());
    }
    Ok(narrowed)
}

/// Keeps the candidates whose identifier matches one of the permitted ids,
/// in permitted-id order.
fn retain_by_ids(
    candidates: &[Element],
    permitted: impl Iterator<Item = String>,
) -> Vec<Element> {
    let mut narrowed = vec![];
    for id in permitted {
        if let Some(found) = candidates.iter().find(|c| c.name == id) {
            narrowed.push(found.clone());
        }
    }
    narrowed
}
