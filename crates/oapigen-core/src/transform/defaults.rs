//! Client initializer defaults inferred from the declared security schemes.

use log::warn;

use crate::error::GenerateError;
use crate::ir::{IrInitDefaults, IrParameterLocation};
use crate::parse::security::{ApiKeyLocation, SecurityScheme, SecuritySchemeType};
use crate::parse::spec::OpenApi;
use crate::resolve::{Pointer, Resolver};

/// Flows the client runtime cannot drive on its own.
const UNIMPLEMENTED_FLOWS: &[&str] = &["implicit", "authorizationCode"];

/// Dereference every security scheme, in declaration order.
pub fn security_schemes(
    resolver: &mut Resolver,
    document: &OpenApi,
) -> Result<Vec<SecurityScheme>, GenerateError> {
    let base = if document.security_definitions.is_empty() {
        Pointer::from_segments(["components", "securitySchemes"])
    } else {
        Pointer::from_segments(["securityDefinitions"])
    };
    let mut schemes = Vec::new();
    for (name, scheme) in document.security_schemes() {
        schemes.push(resolver.deref(scheme, &base.child(name))?.node);
    }
    Ok(schemes)
}

/// The header, query or cookie parameter the runtime fills with the API
/// key, if any API-key scheme is declared.
pub fn api_key_parameter(schemes: &[SecurityScheme]) -> Option<(String, IrParameterLocation)> {
    schemes
        .iter()
        .filter(|scheme| scheme.scheme_type == SecuritySchemeType::ApiKey)
        .find_map(|scheme| {
            let name = scheme.name.clone()?;
            let location = match scheme.location.unwrap_or(ApiKeyLocation::Header) {
                ApiKeyLocation::Header => IrParameterLocation::Header,
                ApiKeyLocation::Query => IrParameterLocation::Query,
                ApiKeyLocation::Cookie => IrParameterLocation::Cookie,
            };
            Some((name, location))
        })
}

pub fn init_defaults(schemes: &[SecurityScheme]) -> IrInitDefaults {
    let mut defaults = IrInitDefaults::default();

    if let Some(scheme) = schemes
        .iter()
        .find(|scheme| scheme.scheme_type == SecuritySchemeType::ApiKey && scheme.name.is_some())
    {
        defaults.api_key_in = scheme
            .location
            .unwrap_or(ApiKeyLocation::Header)
            .as_str()
            .to_string();
        defaults.api_key_name = scheme.name.clone().unwrap_or(defaults.api_key_name);
    }

    let oauth2: Vec<&SecurityScheme> = schemes
        .iter()
        .filter(|scheme| scheme.scheme_type == SecuritySchemeType::OAuth2)
        .collect();
    let flows: Vec<_> = oauth2
        .iter()
        .filter_map(|scheme| scheme.flows.as_ref())
        .flat_map(|flows| flows.iter())
        .collect();

    defaults.oauth2_authorization_url = flows
        .iter()
        .find_map(|(_, flow)| flow.authorization_url.clone())
        .or_else(|| oauth2.iter().find_map(|scheme| scheme.authorization_url.clone()));
    defaults.oauth2_token_url = flows
        .iter()
        .find_map(|(_, flow)| flow.token_url.clone())
        .or_else(|| oauth2.iter().find_map(|scheme| scheme.token_url.clone()));
    defaults.oauth2_refresh_url = flows.iter().find_map(|(_, flow)| flow.refresh_url.clone());

    let mut names: Vec<String> = flows.iter().map(|(name, _)| name.to_string()).collect();
    names.extend(
        oauth2
            .iter()
            .filter_map(|scheme| scheme.flow.as_deref())
            .map(|flow| swagger_flow_name(flow).to_string()),
    );
    names.sort();
    names.dedup();

    for name in &names {
        if UNIMPLEMENTED_FLOWS.contains(&name.as_str()) {
            warn!("OAuth2 flow `{name}` is not implemented by the client runtime");
            if defaults.oauth2_authorization_url.is_none() {
                warn!("OAuth2 flow `{name}` requires an authorization URL, but none is declared");
            }
        }
    }
    defaults.oauth2_flows = names;

    defaults.open_id_connect_url = schemes
        .iter()
        .find_map(|scheme| scheme.open_id_connect_url.clone());
    defaults
}

/// Map a 2.0 `flow` value to its 3.x name.
fn swagger_flow_name(flow: &str) -> &str {
    match flow {
        "accessCode" => "authorizationCode",
        "application" => "clientCredentials",
        other => other,
    }
}
