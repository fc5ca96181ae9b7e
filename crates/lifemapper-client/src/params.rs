//! Request parameter handling

use url::form_urlencoded;

/// A request parameter whose value may be absent
pub type Param = (String, Option<String>);

/// Drop parameters whose value is absent, keeping the order of the rest.
/// Names are not deduplicated.
pub fn sanitize(params: &[Param]) -> Vec<(String, String)> {
    params
        .iter()
        .filter_map(|(name, value)| value.as_ref().map(|v| (name.clone(), v.clone())))
        .collect()
}

/// Encode pairs as `application/x-www-form-urlencoded`
pub fn encode(pairs: &[(String, String)]) -> String {
    form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish()
}
