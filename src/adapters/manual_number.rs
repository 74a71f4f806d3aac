//! A number typed in by the user

use serde::Deserialize;
use url::Url;

use crate::collector::{
    CollectError, CollectResult, FetchedResponse, ParseContext, ParsedSource, RequestSpec,
    SourceAdapter, SourceParameters,
};
use crate::model::parse_number;

#[derive(Debug, Deserialize)]
struct ManualNumberParameters {
    number: String,
}

/// Reports the `number` parameter as the source's value. Issues no
/// requests.
#[derive(Debug, Default, Clone, Copy)]
pub struct ManualNumber;

impl ManualNumber {
    fn number(params: &SourceParameters) -> CollectResult<String> {
        let decoded: ManualNumberParameters = params.decode()?;
        let number = decoded.number.trim().to_string();
        if parse_number(&number).is_none() {
            return Err(CollectError::configuration(format!(
                "'number' must be a number, got '{number}'"
            )));
        }
        Ok(number)
    }
}

impl SourceAdapter for ManualNumber {
    fn source_type(&self) -> &'static str {
        "manual_number"
    }

    fn validate(&self, params: &SourceParameters) -> CollectResult<()> {
        Self::number(params).map(|_| ())
    }

    fn api_url(&self, _params: &SourceParameters) -> Option<Url> {
        None
    }

    fn next_request(
        &self,
        _params: &SourceParameters,
        _responses: &[FetchedResponse],
    ) -> CollectResult<Option<RequestSpec>> {
        Ok(None)
    }

    fn parse(&self, context: &ParseContext<'_>) -> CollectResult<ParsedSource> {
        Ok(ParsedSource::value(Self::number(context.params)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(value: serde_json::Value) -> SourceParameters {
        match value {
            serde_json::Value::Object(map) => SourceParameters::from_map(&map).unwrap(),
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_reports_number_without_requests() {
        let params = params(json!({"number": " 42 "}));
        assert!(ManualNumber.next_request(&params, &[]).unwrap().is_none());

        let context = ParseContext {
            params: &params,
            responses: &[],
            documents: Vec::new(),
        };
        assert_eq!(
            ManualNumber.parse(&context).unwrap().value.as_deref(),
            Some("42")
        );
    }

    #[test]
    fn test_non_numeric_is_configuration_error() {
        let result = ManualNumber.validate(&params(json!({"number": "many"})));
        assert!(matches!(result, Err(CollectError::Configuration(_))));
        let result = ManualNumber.validate(&params(json!({})));
        assert!(matches!(result, Err(CollectError::Configuration(_))));
    }
}
