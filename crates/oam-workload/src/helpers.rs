//! Shared helper functions for workload compilation

use std::collections::BTreeMap;

use oam_common::crd::AccessMode;
use oam_common::{APPLICATION_KEY, COMPONENT_KEY, INSTANCE_KEY, ROLE_KEY};

/// Last path segment of a config file path, used as ConfigMap key and subPath
pub fn basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// ConfigMap holding a container's config files
pub fn config_map_name(instance: &str, container: &str) -> String {
    format!("{}-{}", instance, container)
}

/// Pod volume projecting a container's config files
pub fn config_volume_name(instance: &str, container: &str) -> String {
    format!("{}-{}-config", instance, container)
}

/// emptyDir volume collecting a container's logs
pub fn log_volume_name(container: &str) -> String {
    format!("{}-log", container)
}

/// Label and annotation set carried by every derived object
pub fn object_tags(
    application: &str,
    component: &str,
    instance: &str,
    role: &str,
) -> BTreeMap<String, String> {
    BTreeMap::from([
        (APPLICATION_KEY.to_string(), application.to_string()),
        (COMPONENT_KEY.to_string(), component.to_string()),
        (INSTANCE_KEY.to_string(), instance.to_string()),
        (ROLE_KEY.to_string(), role.to_string()),
    ])
}

/// PVC access mode for a declared volume access mode
pub fn pvc_access_mode(mode: Option<AccessMode>) -> &'static str {
    match mode {
        Some(AccessMode::RW) => "ReadWriteMany",
        Some(AccessMode::RO) => "ReadOnlyMany",
        None => "ReadWriteOnce",
    }
}

/// True if a quantity string is empty or has a zero numeric part (`0`, `0m`, `0Gi`)
pub fn is_zero_quantity(quantity: &str) -> bool {
    let trimmed = quantity.trim();
    if trimmed.is_empty() {
        return true;
    }
    let numeric_end = trimmed
        .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == '+' || c == '-'))
        .unwrap_or(trimmed.len());
    match trimmed[..numeric_end].parse::<f64>() {
        Ok(n) => n == 0.0,
        Err(_) => false,
    }
}

const NANOS: i128 = 1_000_000_000;

const DECIMAL_SUFFIXES: [(&str, i32); 10] = [
    ("E", 18),
    ("P", 15),
    ("T", 12),
    ("G", 9),
    ("M", 6),
    ("k", 3),
    ("", 0),
    ("m", -3),
    ("u", -6),
    ("n", -9),
];

const BINARY_SUFFIXES: [(&str, u32); 7] = [
    ("", 0),
    ("Ki", 1),
    ("Mi", 2),
    ("Gi", 3),
    ("Ti", 4),
    ("Pi", 5),
    ("Ei", 6),
];

/// A quantity in the form the API server stores it (`0.5` is `500m`, `1024Mi` is `1Gi`).
///
/// Exponent notation and unparseable input are returned unchanged.
pub fn canonical_quantity(quantity: &str) -> String {
    match parse_quantity(quantity.trim()) {
        Some((nanos, binary)) => format_quantity(nanos, binary),
        None => quantity.to_string(),
    }
}

/// Value in nano-units, and whether a binary suffix was used
fn parse_quantity(quantity: &str) -> Option<(i128, bool)> {
    let (negative, rest) = match quantity.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, quantity.strip_prefix('+').unwrap_or(quantity)),
    };
    let numeric_end = rest
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(rest.len());
    let (number, suffix) = rest.split_at(numeric_end);
    let (whole, fraction) = number.split_once('.').unwrap_or((number, ""));
    if whole.is_empty() && fraction.is_empty() {
        return None;
    }
    let digits: i128 = format!("{whole}{fraction}").parse().ok()?;
    let scale = 10i128.checked_pow(u32::try_from(fraction.len()).ok()?)?;

    let (nanos, binary) = if let Some((_, power)) = BINARY_SUFFIXES[1..].iter().find(|(s, _)| *s == suffix) {
        let scaled = digits.checked_mul(1i128 << (10 * power))?.checked_mul(NANOS)?;
        (ceil_div(scaled, scale), true)
    } else {
        let (_, exponent) = DECIMAL_SUFFIXES.iter().find(|(s, _)| *s == suffix)?;
        let unit = 10i128.checked_pow(u32::try_from(9 + exponent).ok()?)?;
        (ceil_div(digits.checked_mul(unit)?, scale), false)
    };
    Some((if negative { -nanos } else { nanos }, binary))
}

fn ceil_div(value: i128, divisor: i128) -> i128 {
    (value + divisor - 1) / divisor
}

fn format_quantity(nanos: i128, binary: bool) -> String {
    if nanos == 0 {
        return "0".to_string();
    }
    let sign = if nanos < 0 { "-" } else { "" };
    let value = nanos.abs();

    if binary && value % NANOS == 0 && value / NANOS >= 1024 {
        let bytes = value / NANOS;
        for (suffix, power) in BINARY_SUFFIXES.iter().rev() {
            let unit = 1i128 << (10 * power);
            if bytes % unit == 0 {
                return format!("{sign}{}{suffix}", bytes / unit);
            }
        }
    }

    for (suffix, exponent) in DECIMAL_SUFFIXES {
        let unit = 10i128.pow((9 + exponent) as u32);
        if value % unit == 0 {
            return format!("{sign}{}{suffix}", value / unit);
        }
    }
    format!("{sign}{value}n")
}

/// Look up a value bound through `fromParam`, if the reference is set and resolvable
pub fn param_value<'a>(
    from_param: Option<&str>,
    params: &'a BTreeMap<String, String>,
) -> Option<&'a String> {
    from_param
        .filter(|name| !name.is_empty())
        .and_then(|name| params.get(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basename() {
        assert_eq!(basename("/etc/nginx/nginx.conf"), "nginx.conf");
        assert_eq!(basename("app.yaml"), "app.yaml");
        assert_eq!(basename("/etc/dir/"), "");
    }

    #[test]
    fn test_names() {
        assert_eq!(config_map_name("web", "nginx"), "web-nginx");
        assert_eq!(config_volume_name("web", "nginx"), "web-nginx-config");
        assert_eq!(log_volume_name("nginx"), "nginx-log");
    }

    #[test]
    fn test_object_tags() {
        let tags = object_tags("shop", "frontend", "shop-frontend", "workload");
        assert_eq!(tags.len(), 4);
        assert_eq!(tags["application"], "shop");
        assert_eq!(tags["role"], "workload");
    }

    #[test]
    fn test_pvc_access_mode() {
        assert_eq!(pvc_access_mode(Some(AccessMode::RW)), "ReadWriteMany");
        assert_eq!(pvc_access_mode(Some(AccessMode::RO)), "ReadOnlyMany");
        assert_eq!(pvc_access_mode(None), "ReadWriteOnce");
    }

    #[test]
    fn test_zero_quantities() {
        assert!(is_zero_quantity(""));
        assert!(is_zero_quantity("0"));
        assert!(is_zero_quantity("0m"));
        assert!(is_zero_quantity("0.0Gi"));
        assert!(!is_zero_quantity("500m"));
        assert!(!is_zero_quantity("1Gi"));
        assert!(!is_zero_quantity("1e3"));
    }

    #[test]
    fn test_canonical_quantities_match_api_server() {
        assert_eq!(canonical_quantity("0.5"), "500m");
        assert_eq!(canonical_quantity("1024Mi"), "1Gi");
        assert_eq!(canonical_quantity("1.5Gi"), "1536Mi");
        assert_eq!(canonical_quantity("2000m"), "2");
        assert_eq!(canonical_quantity("1000"), "1k");
        assert_eq!(canonical_quantity("1.5"), "1500m");
        assert_eq!(canonical_quantity("0.5Ki"), "512");
        assert_eq!(canonical_quantity("0"), "0");
    }

    #[test]
    fn test_canonical_quantities_keep_canonical_input() {
        for q in ["500m", "2", "1Gi", "1536Mi", "10Gi", "20G", "100Mi", "250m"] {
            assert_eq!(canonical_quantity(q), q);
        }
    }

    #[test]
    fn test_canonical_quantity_leaves_unparseable_input() {
        assert_eq!(canonical_quantity("1e3"), "1e3");
        assert_eq!(canonical_quantity("lots"), "lots");
        assert_eq!(canonical_quantity(""), "");
    }

    #[test]
    fn test_param_value_requires_non_empty_reference() {
        let params = BTreeMap::from([("greeting".to_string(), "hi".to_string())]);
        assert_eq!(param_value(Some("greeting"), &params).map(String::as_str), Some("hi"));
        assert_eq!(param_value(Some(""), &params), None);
        assert_eq!(param_value(Some("missing"), &params), None);
        assert_eq!(param_value(None, &params), None);
    }
}
