//! Claim parser: turns raw factory parameters into typed, tagged,
//! cardinality-classified dependency claims by inspecting the generic shape
//! of the parameter type.

use plait_common::error::{PlaitError, Result};
use plait_common::model::claim::{Cardinality, Claim};
use plait_common::model::declaration::{Declaration, RawParameter};
use plait_common::model::tags::TagSet;
use plait_common::model::token::{containers, TypeToken};
use tracing::debug;

/// One claim per factory parameter, parameter order preserved. A parameter
/// whose type the front end could not compute fails the whole declaration
/// with [`PlaitError::UnresolvedType`]; the failure stays local to it.
pub fn parse_declaration_claims(declaration: &Declaration) -> Result<Vec<Claim>> {
    let mut claims = Vec::with_capacity(declaration.params.len());
    for param in &declaration.params {
        claims.push(parse_parameter(param, &declaration.source)?);
    }
    debug!(
        "Parsed {} claim(s) for {}",
        claims.len(),
        declaration.describe()
    );
    Ok(claims)
}

pub fn parse_parameter(param: &RawParameter, owner_source: &str) -> Result<Claim> {
    let Some(type_repr) = param.type_repr.as_deref() else {
        return Err(PlaitError::UnresolvedType {
            owner_source: owner_source.to_string(),
            parameter: param.name.clone(),
        });
    };
    let token = TypeToken::parse(type_repr)?;
    let mut claim = classify(token, param.tags.clone(), param.nullable)?;
    claim.parameter = param.name.clone();
    Ok(claim)
}

/// Classifies a consumer root request the same way a parameter is
/// classified, so roots can use collect/lazy/token shapes too.
pub fn parse_root(type_repr: &str, tags: TagSet) -> Result<Claim> {
    let token = TypeToken::parse(type_repr)?;
    let mut claim = classify(token, tags, false)?;
    claim.parameter = "root".to_string();
    Ok(claim)
}

fn classify(token: TypeToken, tags: TagSet, nullable: bool) -> Result<Claim> {
    // An Option wrapper and an explicit nullable marker mean the same thing.
    let (token, nullable) = if token.raw == containers::OPTION {
        (token.into_inner()?, true)
    } else {
        (token, nullable)
    };

    let claim = match token.raw.as_str() {
        containers::TOKEN if !token.args.is_empty() => {
            // The inner type may itself be a token container; it stays
            // nested and is never resolved to a runtime value.
            Claim::new(token.into_inner()?, tags, Cardinality::TokenOnly)
        }
        containers::ALL if !token.args.is_empty() => {
            let element = token.into_inner()?;
            match element.raw.as_str() {
                containers::LAZY if !element.args.is_empty() => {
                    Claim::new(element.into_inner()?, tags, Cardinality::CollectAllLazy)
                }
                containers::PROMISE if !element.args.is_empty() => {
                    Claim::new(element.into_inner()?, tags, Cardinality::CollectAllPromise)
                }
                _ => Claim::new(element, tags, Cardinality::CollectAll),
            }
        }
        containers::LAZY if !token.args.is_empty() => {
            let cardinality = if nullable {
                Cardinality::OptionalLazy
            } else {
                Cardinality::Lazy
            };
            Claim::new(token.into_inner()?, tags, cardinality)
        }
        containers::PROMISE if !token.args.is_empty() => {
            let cardinality = if nullable {
                Cardinality::OptionalPromise
            } else {
                Cardinality::Promise
            };
            Claim::new(token.into_inner()?, tags, cardinality)
        }
        _ => {
            let cardinality = if nullable {
                Cardinality::Optional
            } else {
                Cardinality::ExactlyOne
            };
            Claim::new(token, tags, cardinality)
        }
    };
    Ok(claim)
}
