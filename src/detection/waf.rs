//! WAF product fingerprinting from response headers and cookies

use reqwest::header::{HeaderMap, SET_COOKIE};

/// One WAF signature: any populated vector is sufficient for a match.
struct WafSignature {
    name: &'static str,
    /// Case-insensitive substring of the `Server` header value
    server_header: Option<&'static str>,
    /// Case-insensitive substring of any response header name
    custom_header: Option<&'static str>,
    /// Literal substring of any cookie name
    cookie_pattern: Option<&'static str>,
}

const SIGNATURES: &[WafSignature] = &[
    WafSignature {
        name: "Cloudflare",
        server_header: Some("cloudflare"),
        custom_header: None,
        cookie_pattern: Some("__cfduid"),
    },
    WafSignature {
        name: "AWS WAF",
        server_header: None,
        custom_header: Some("x-amz-cf-id"),
        cookie_pattern: None,
    },
    WafSignature {
        name: "Akamai",
        server_header: Some("akamaighost"),
        custom_header: None,
        cookie_pattern: None,
    },
    WafSignature {
        name: "Imperva",
        server_header: None,
        custom_header: Some("x-iinfo"),
        cookie_pattern: None,
    },
    WafSignature {
        name: "F5 BigIP",
        server_header: None,
        custom_header: None,
        cookie_pattern: Some("BIGipServer"),
    },
    WafSignature {
        name: "Sucuri",
        server_header: Some("sucuri"),
        custom_header: None,
        cookie_pattern: None,
    },
    WafSignature {
        name: "StackPath",
        server_header: Some("stackpath"),
        custom_header: None,
        cookie_pattern: None,
    },
    WafSignature {
        name: "Wordfence",
        server_header: None,
        custom_header: Some("x-wf-"),
        cookie_pattern: None,
    },
];

/// Returns the first matching WAF product name, or an empty string.
pub fn detect_waf(headers: &HeaderMap) -> String {
    let server = headers
        .get("server")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_lowercase();

    let cookie_names: Vec<String> = headers
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|cookie| cookie.split(';').next())
        .filter_map(|pair| pair.split('=').next())
        .map(|name| name.trim().to_string())
        .collect();

    for sig in SIGNATURES {
        if let Some(needle) = sig.server_header {
            if server.contains(needle) {
                return sig.name.to_string();
            }
        }

        if let Some(needle) = sig.custom_header {
            if headers.keys().any(|k| k.as_str().contains(needle)) {
                return sig.name.to_string();
            }
        }

        if let Some(needle) = sig.cookie_pattern {
            if cookie_names.iter().any(|name| name.contains(needle)) {
                return sig.name.to_string();
            }
        }
    }

    String::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{HeaderName, HeaderValue};

    fn headers_from(pairs: &[(&str, &str)]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for (k, v) in pairs {
            headers.append(
                k.parse::<HeaderName>().unwrap(),
                HeaderValue::from_str(v).unwrap(),
            );
        }
        headers
    }

    #[test]
    fn detects_cloudflare_server_header() {
        let headers = headers_from(&[("server", "cloudflare")]);
        assert_eq!(detect_waf(&headers), "Cloudflare");
    }

    #[test]
    fn detects_aws_waf_header_name() {
        let headers = headers_from(&[("x-amz-cf-id", "abc")]);
        assert_eq!(detect_waf(&headers), "AWS WAF");
    }

    #[test]
    fn detects_bigip_cookie() {
        let headers = headers_from(&[("set-cookie", "BIGipServerpool=1.2.3; path=/")]);
        assert_eq!(detect_waf(&headers), "F5 BigIP");
    }

    #[test]
    fn plain_nginx_is_clean() {
        let headers = headers_from(&[("server", "nginx")]);
        assert_eq!(detect_waf(&headers), "");
    }
}
