//! Endpoint normalization.

use crate::error::{Error, Result};
use surrpc_client::EndpointTransform;
use url::Url;

const RPC_SUFFIX: &str = "/rpc";

/// Parses `endpoint` and applies `transform` to its path.
pub fn normalize_endpoint(endpoint: &str, transform: EndpointTransform) -> Result<Url> {
    let mut url = Url::parse(endpoint)
        .map_err(|e| Error::configuration(format!("invalid endpoint {endpoint:?}: {e}")))?;
    if url.cannot_be_a_base() {
        return Err(Error::configuration(format!(
            "invalid endpoint {endpoint:?}: not a hierarchical URL"
        )));
    }

    match transform {
        EndpointTransform::Auto => {
            let path = url.path();
            if !path.ends_with(RPC_SUFFIX) {
                let path = if path.ends_with('/') {
                    format!("{path}rpc")
                } else {
                    format!("{path}{RPC_SUFFIX}")
                };
                url.set_path(&path);
            }
        }
        EndpointTransform::Preserve => {}
    }

    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use surrpc_client::ErrorKind;

    fn auto(endpoint: &str) -> String {
        normalize_endpoint(endpoint, EndpointTransform::Auto)
            .unwrap()
            .to_string()
    }

    #[test]
    fn test_auto_appends_rpc() {
        assert_eq!(auto("http://localhost:8000"), "http://localhost:8000/rpc");
        assert_eq!(auto("http://localhost:8000/"), "http://localhost:8000/rpc");
        assert_eq!(auto("https://db.example.com/v1"), "https://db.example.com/v1/rpc");
        assert_eq!(auto("http://localhost:8000/rpc"), "http://localhost:8000/rpc");
        assert_eq!(auto("http://localhost:8000/a/rpc"), "http://localhost:8000/a/rpc");
    }

    #[test]
    fn test_auto_keeps_query() {
        assert_eq!(
            auto("http://localhost:8000/base?x=1"),
            "http://localhost:8000/base/rpc?x=1"
        );
    }

    #[test]
    fn test_preserve() {
        let url = normalize_endpoint("http://localhost:8000/custom", EndpointTransform::Preserve)
            .unwrap();
        assert_eq!(url.as_str(), "http://localhost:8000/custom");
    }

    #[test]
    fn test_invalid_endpoint() {
        let err = normalize_endpoint("not a url", EndpointTransform::Auto).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);

        let err = normalize_endpoint("mailto:root@example.com", EndpointTransform::Auto)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }
}
