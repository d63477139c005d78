//! Redirect chains.
//!
//! State is the remaining hop count carried in the URL. Each request performs
//! a single transition: either one more hop with the count decremented, or the
//! terminal "redirect finished" reply. Following the chain is up to the client.

use crate::error::ConsoleError;
use lazy_static::lazy_static;
use regex::Regex;

/// Status codes a redirect chain may use.
pub const REDIRECT_STATUSES: [u16; 6] = [300, 301, 302, 303, 307, 308];

/// Used when the status segment is not a number (or is zero).
pub const DEFAULT_REDIRECT_STATUS: u16 = 302;

lazy_static! {
    static ref LEADING_INTEGER: Regex = Regex::new(r"^\s*([+-]?\d+)").unwrap();
}

/// One transition of the chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedirectStep {
    Hop { status: u16, location: String },
    Finished,
}

/// Leading integer of `input`, ignoring trailing garbage (`"3abc"` is 3).
///
/// Values beyond the `i64` range saturate.
pub fn leading_integer(input: &str) -> Option<i64> {
    let digits = LEADING_INTEGER.captures(input)?.get(1)?.as_str();
    Some(match digits.parse::<i64>() {
        Ok(n) => n,
        Err(_) if digits.starts_with('-') => i64::MIN,
        Err(_) => i64::MAX,
    })
}

/// Compute the next step of a chain.
///
/// * `status` - raw status segment
/// * `count` - raw count segment; absent means 1, non-numeric is terminal
/// * `to` - final destination used on the last hop
/// * `origin` - `http://host:port` prefix of intermediate hops
pub fn next_step(
    status: &str,
    count: Option<&str>,
    to: Option<&str>,
    origin: &str,
) -> Result<RedirectStep, ConsoleError> {
    let status = match leading_integer(status) {
        None | Some(0) => i64::from(DEFAULT_REDIRECT_STATUS),
        Some(code) => code,
    };

    let status = REDIRECT_STATUSES
        .iter()
        .copied()
        .find(|valid| i64::from(*valid) == status)
        .ok_or(ConsoleError::InvalidRedirectStatus(status))?;

    let remaining = match count {
        None => 1,
        Some(raw) => match leading_integer(raw) {
            Some(n) => n,
            None => return Ok(RedirectStep::Finished),
        },
    };

    if remaining <= 0 {
        return Ok(RedirectStep::Finished);
    }

    let to = to.filter(|t| !t.is_empty());
    let location = match to {
        Some(to) if remaining == 1 => to.to_string(),
        Some(to) => format!(
            "{origin}/redirect/{status}/{}?to={}",
            remaining - 1,
            urlencoding::encode(to)
        ),
        None => format!("{origin}/redirect/{status}/{}", remaining - 1),
    };

    Ok(RedirectStep::Hop { status, location })
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORIGIN: &str = "http://localhost:8080";

    #[test]
    fn test_leading_integer() {
        assert_eq!(leading_integer("302"), Some(302));
        assert_eq!(leading_integer(" 7xyz"), Some(7));
        assert_eq!(leading_integer("-2"), Some(-2));
        assert_eq!(leading_integer("abc"), None);
        assert_eq!(leading_integer(""), None);
    }

    #[test]
    fn test_leading_integer_saturates() {
        assert_eq!(leading_integer("99999999999999999999"), Some(i64::MAX));
        assert_eq!(leading_integer("-99999999999999999999"), Some(i64::MIN));
    }

    #[test]
    fn test_huge_values() {
        assert!(matches!(
            next_step("99999999999999999999", Some("1"), None, ORIGIN),
            Err(ConsoleError::InvalidRedirectStatus(i64::MAX))
        ));
        assert_eq!(
            next_step("301", Some("99999999999999999999"), None, ORIGIN).unwrap(),
            RedirectStep::Hop {
                status: 301,
                location: format!("http://localhost:8080/redirect/301/{}", i64::MAX - 1)
            }
        );
    }

    #[test]
    fn test_chain_counts_down() {
        assert_eq!(
            next_step("302", Some("3"), None, ORIGIN).unwrap(),
            RedirectStep::Hop {
                status: 302,
                location: "http://localhost:8080/redirect/302/2".to_string()
            }
        );
        assert_eq!(
            next_step("302", Some("1"), None, ORIGIN).unwrap(),
            RedirectStep::Hop {
                status: 302,
                location: "http://localhost:8080/redirect/302/0".to_string()
            }
        );
        assert_eq!(
            next_step("302", Some("0"), None, ORIGIN).unwrap(),
            RedirectStep::Finished
        );
    }

    #[test]
    fn test_defaults() {
        // non-numeric status falls back to 302, missing count means one hop
        assert_eq!(
            next_step("abc", None, None, ORIGIN).unwrap(),
            RedirectStep::Hop {
                status: 302,
                location: "http://localhost:8080/redirect/302/0".to_string()
            }
        );
        assert_eq!(
            next_step("301", Some("nope"), None, ORIGIN).unwrap(),
            RedirectStep::Finished
        );
        assert_eq!(
            next_step("301", Some("-4"), None, ORIGIN).unwrap(),
            RedirectStep::Finished
        );
    }

    #[test]
    fn test_invalid_status() {
        let err = next_step("999", Some("1"), None, ORIGIN).unwrap_err();
        assert!(matches!(err, ConsoleError::InvalidRedirectStatus(999)));

        let err = next_step("304", None, None, ORIGIN).unwrap_err();
        assert!(matches!(err, ConsoleError::InvalidRedirectStatus(304)));
    }

    #[test]
    fn test_to_destination() {
        assert_eq!(
            next_step("307", Some("2"), Some("http://example.com/a b"), ORIGIN).unwrap(),
            RedirectStep::Hop {
                status: 307,
                location: "http://localhost:8080/redirect/307/1?to=http%3A%2F%2Fexample.com%2Fa%20b"
                    .to_string()
            }
        );
        assert_eq!(
            next_step("307", Some("1"), Some("http://example.com/"), ORIGIN).unwrap(),
            RedirectStep::Hop {
                status: 307,
                location: "http://example.com/".to_string()
            }
        );
    }
}
